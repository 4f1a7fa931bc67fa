//! HTTP-level tests for the Clockify client against a mock server.

use std::time::Duration;

use cday_clockify::{Client, ClientConfig};
use cday_core::{
    ActivityGateway, ApiKey, DayOffset, GatewayError, GatewayErrorKind, UserId, UserRecord,
    WorkspaceId, compute_window,
};
use chrono::{TimeZone, Utc};
use serde_json::json;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client_for(server: &MockServer) -> Client {
    client_with_page_size(server, 2)
}

fn client_with_page_size(server: &MockServer, page_size: usize) -> Client {
    Client::new(ClientConfig {
        base_url: server.uri(),
        timeout: Duration::from_secs(5),
        page_size,
    })
    .unwrap()
}

fn api_key() -> ApiKey {
    ApiKey::new("test-key").unwrap()
}

fn workspace_id() -> WorkspaceId {
    WorkspaceId::new("ws-1").unwrap()
}

#[tokio::test]
async fn lists_workspaces_with_api_key_header() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/workspaces"))
        .and(header("X-Api-Key", "test-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": "ws-1", "name": "Acme"},
            {"id": "ws-2", "name": "Side project"}
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let workspaces = client_for(&server).list_workspaces(&api_key()).await.unwrap();

    assert_eq!(workspaces.len(), 2);
    assert_eq!(workspaces[0].id.as_str(), "ws-1");
    assert_eq!(workspaces[1].name, "Side project");
}

#[tokio::test]
async fn unauthorized_maps_to_authorization_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/workspaces/ws-1"))
        .respond_with(
            ResponseTemplate::new(401)
                .set_body_json(json!({"message": "Api key does not exist", "code": 4003})),
        )
        .mount(&server)
        .await;

    let err = client_for(&server)
        .get_workspace(&api_key(), &workspace_id())
        .await
        .unwrap_err();

    assert_eq!(err.kind(), GatewayErrorKind::Authorization);
    assert!(err.to_string().contains("Api key does not exist"));
}

#[tokio::test]
async fn server_error_maps_to_upstream_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/workspaces/ws-1/users"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let err = client_for(&server)
        .list_active_users(&api_key(), &workspace_id())
        .await
        .unwrap_err();

    assert!(matches!(err, GatewayError::Upstream { status: 500, .. }));
}

#[tokio::test]
async fn roster_requests_active_users_and_follows_pages() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/workspaces/ws-1/users"))
        .and(query_param("status", "ACTIVE"))
        .and(query_param("page", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": "u1", "name": "Alice"},
            {"id": "u2", "name": "Bob"}
        ])))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/workspaces/ws-1/users"))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"name": "No id"}
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let users = client_for(&server)
        .list_active_users(&api_key(), &workspace_id())
        .await
        .unwrap();

    assert_eq!(users.len(), 3);
    assert_eq!(users[0].name.as_deref(), Some("Alice"));
    assert_eq!(users[2].id, None);
}

#[tokio::test]
async fn malformed_roster_records_do_not_fail_the_roster() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/workspaces/ws-1/users"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": "u1", "name": "Alice"},
            null,
            {"id": 42, "name": "Bob"},
            {"id": "u4", "name": null}
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let users = client_with_page_size(&server, 10)
        .list_active_users(&api_key(), &workspace_id())
        .await
        .unwrap();

    assert_eq!(users.len(), 4);
    assert_eq!(users[0].id.as_deref(), Some("u1"));
    assert_eq!(users[1], UserRecord::default());
    assert_eq!(users[2], UserRecord::default());
    assert_eq!(users[3].id.as_deref(), Some("u4"));
    assert_eq!(users[3].name, None);
}

#[tokio::test]
async fn malformed_time_entry_is_dropped_not_fatal() {
    let server = MockServer::start().await;
    let now = Utc.with_ymd_and_hms(2024, 5, 10, 12, 0, 0).unwrap();
    let window = compute_window(chrono_tz::Asia::Tehran, now, DayOffset::TODAY).unwrap();

    Mock::given(method("GET"))
        .and(path("/workspaces/ws-1/user/u1/time-entries"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {
                "description": "Broken",
                "timeInterval": {"start": "not a timestamp", "end": null, "duration": null}
            },
            {
                "description": "Standup",
                "timeInterval": {
                    "start": "2024-05-10T05:00:00Z",
                    "end": "2024-05-10T05:15:00Z",
                    "duration": "PT15M"
                }
            }
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let entries = client_with_page_size(&server, 10)
        .list_time_entries(
            &api_key(),
            &workspace_id(),
            &UserId::new("u1").unwrap(),
            &window,
        )
        .await
        .unwrap();

    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].description.as_deref(), Some("Standup"));
}

#[tokio::test]
async fn time_entries_use_window_bounds_and_hydration() {
    let server = MockServer::start().await;
    let now = Utc.with_ymd_and_hms(2024, 5, 10, 12, 0, 0).unwrap();
    let window = compute_window(chrono_tz::Asia::Tehran, now, DayOffset::TODAY).unwrap();

    Mock::given(method("GET"))
        .and(path("/workspaces/ws-1/user/u1/time-entries"))
        .and(query_param("start", "2024-05-09T20:30:00Z"))
        .and(query_param("end", "2024-05-10T20:29:59Z"))
        .and(query_param("hydrated", "true"))
        .and(query_param("consider-duration-format", "true"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {
                "description": "Fix login",
                "timeInterval": {
                    "start": "2024-05-10T05:00:00Z",
                    "end": "2024-05-10T06:30:00Z",
                    "duration": "PT1H30M"
                },
                "project": {"name": "Website", "clientName": "Acme Corp"},
                "task": {"name": "Backend"}
            }
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let entries = client_for(&server)
        .list_time_entries(
            &api_key(),
            &workspace_id(),
            &UserId::new("u1").unwrap(),
            &window,
        )
        .await
        .unwrap();

    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].client_name.as_deref(), Some("Acme Corp"));
    assert_eq!(entries[0].raw_duration.as_deref(), Some("PT1H30M"));
}

#[tokio::test]
async fn malformed_body_is_invalid_response() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/workspaces"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;

    let err = client_for(&server)
        .list_workspaces(&api_key())
        .await
        .unwrap_err();

    assert!(matches!(err, GatewayError::InvalidResponse { .. }));
    assert_eq!(err.kind(), GatewayErrorKind::Upstream);
}

#[tokio::test]
async fn slow_response_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/workspaces"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([]))
                .set_delay(Duration::from_secs(2)),
        )
        .mount(&server)
        .await;

    let client = Client::new(ClientConfig {
        base_url: server.uri(),
        timeout: Duration::from_millis(200),
        page_size: 2,
    })
    .unwrap();
    let err = client.list_workspaces(&api_key()).await.unwrap_err();

    assert_eq!(err, GatewayError::Timeout);
}

#[tokio::test]
async fn unreachable_server_is_transport_error() {
    // Port 9 (discard) on localhost is not served in test environments
    let client = Client::new(ClientConfig {
        base_url: "http://127.0.0.1:9".to_string(),
        timeout: Duration::from_secs(5),
        page_size: 2,
    })
    .unwrap();

    let err = client.list_workspaces(&api_key()).await.unwrap_err();

    assert_eq!(err.kind(), GatewayErrorKind::Transport);
}
