//! Google Calendar gateway tests against a mock HTTP server.

use chrono::{Duration, Utc};
use reminderflow_core::ports::CalendarGateway;
use reminderflow_domain::{Credentials, EventMetadata, EventPayload, GatewayError};
use reminderflow_infra::{GoogleCalendarGateway, GoogleOAuthConfig};
use serde_json::json;
use wiremock::matchers::{body_string_contains, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn gateway(server: &MockServer) -> GoogleCalendarGateway {
    GoogleCalendarGateway::with_base_urls(
        GoogleOAuthConfig { client_id: "client-id".into(), client_secret: "client-secret".into() },
        server.uri(),
        format!("{}/token", server.uri()),
    )
    .expect("gateway builds")
}

fn credentials() -> Credentials {
    Credentials { access_token: "access-token".into(), refresh_token: Some("rt".into()) }
}

fn payload() -> EventPayload {
    let start = Utc::now() + Duration::hours(1);
    EventPayload {
        title: "Standup".into(),
        description: "Daily standup".into(),
        start,
        end: start + Duration::hours(1),
        metadata: EventMetadata::system_tag("task-1"),
    }
}

#[tokio::test]
async fn create_event_posts_payload_and_returns_id() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/calendars/primary/events"))
        .and(header("authorization", "Bearer access-token"))
        .and(body_string_contains("ReminderFlow"))
        .and(body_string_contains("task-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": "evt-123" })))
        .expect(1)
        .mount(&server)
        .await;

    let event_id = gateway(&server).create_event(&credentials(), &payload()).await.unwrap();
    assert_eq!(event_id, "evt-123");
}

#[tokio::test]
async fn create_event_maps_401_to_auth_expired() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/calendars/primary/events"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let err = gateway(&server).create_event(&credentials(), &payload()).await.unwrap_err();
    assert!(matches!(err, GatewayError::AuthExpired(_)));
}

#[tokio::test]
async fn update_event_maps_404_to_not_found() {
    let server = MockServer::start().await;

    Mock::given(method("PUT"))
        .and(path("/calendars/primary/events/evt-gone"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let err = gateway(&server)
        .update_event(&credentials(), "evt-gone", &payload())
        .await
        .unwrap_err();
    assert!(matches!(err, GatewayError::NotFound(_)));
}

#[tokio::test]
async fn server_errors_are_transient() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/calendars/primary/events"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let err = gateway(&server).create_event(&credentials(), &payload()).await.unwrap_err();
    assert!(matches!(err, GatewayError::Transient(_)));
}

#[tokio::test]
async fn list_events_parses_timed_all_day_and_tagged_events() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/calendars/primary/events"))
        .and(query_param("singleEvents", "true"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": [
                {
                    "id": "evt-timed",
                    "summary": "Dentist",
                    "description": "Checkup",
                    "start": { "dateTime": "2026-03-10T14:30:00Z" },
                    "end": { "dateTime": "2026-03-10T15:00:00Z" }
                },
                {
                    "id": "evt-all-day",
                    "summary": "Conference",
                    "start": { "date": "2026-03-11" },
                    "end": { "date": "2026-03-12" }
                },
                {
                    "id": "evt-ours",
                    "summary": "Pushed task",
                    "start": { "dateTime": "2026-03-10T09:00:00Z" },
                    "end": { "dateTime": "2026-03-10T10:00:00Z" },
                    "extendedProperties": {
                        "private": { "source": "ReminderFlow", "taskId": "task-7" }
                    }
                }
            ]
        })))
        .mount(&server)
        .await;

    let now = Utc::now();
    let events = gateway(&server)
        .list_events(&credentials(), now - Duration::hours(24), now + Duration::days(7))
        .await
        .unwrap();

    assert_eq!(events.len(), 3);

    let timed = &events[0];
    assert_eq!(timed.title.as_deref(), Some("Dentist"));
    assert!(!timed.all_day);
    assert!(!timed.is_system_tagged());

    let all_day = &events[1];
    assert!(all_day.all_day);

    let tagged = &events[2];
    assert!(tagged.is_system_tagged());
    assert_eq!(tagged.metadata.task_id.as_deref(), Some("task-7"));
}

#[tokio::test]
async fn list_events_follows_pagination() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/calendars/primary/events"))
        .and(query_param("pageToken", "page-2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": [{
                "id": "evt-2",
                "summary": "Second",
                "start": { "dateTime": "2026-03-11T09:00:00Z" },
                "end": { "dateTime": "2026-03-11T10:00:00Z" }
            }]
        })))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/calendars/primary/events"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": [{
                "id": "evt-1",
                "summary": "First",
                "start": { "dateTime": "2026-03-10T09:00:00Z" },
                "end": { "dateTime": "2026-03-10T10:00:00Z" }
            }],
            "nextPageToken": "page-2"
        })))
        .mount(&server)
        .await;

    let now = Utc::now();
    let events = gateway(&server)
        .list_events(&credentials(), now, now + Duration::days(7))
        .await
        .unwrap();

    assert_eq!(events.len(), 2);
    assert_eq!(events[0].id, "evt-1");
    assert_eq!(events[1].id, "evt-2");
}

#[tokio::test]
async fn malformed_events_are_skipped_not_fatal() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/calendars/primary/events"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": [
                {
                    "id": "evt-bad",
                    "summary": "No start time at all",
                    "start": {},
                    "end": {}
                },
                {
                    "id": "evt-good",
                    "summary": "Fine",
                    "start": { "dateTime": "2026-03-10T09:00:00Z" },
                    "end": { "dateTime": "2026-03-10T10:00:00Z" }
                }
            ]
        })))
        .mount(&server)
        .await;

    let now = Utc::now();
    let events = gateway(&server)
        .list_events(&credentials(), now, now + Duration::days(7))
        .await
        .unwrap();

    assert_eq!(events.len(), 1);
    assert_eq!(events[0].id, "evt-good");
}

#[tokio::test]
async fn refresh_token_exchanges_for_new_access_token() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/token"))
        .and(body_string_contains("grant_type=refresh_token"))
        .and(body_string_contains("refresh_token=rt-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "at-fresh",
            "expires_in": 3600
        })))
        .expect(1)
        .mount(&server)
        .await;

    let before = Utc::now();
    let token = gateway(&server).refresh_token("rt-1").await.unwrap();

    assert_eq!(token.access_token, "at-fresh");
    assert!(token.expires_at >= before + Duration::seconds(3500));
}

#[tokio::test]
async fn invalid_grant_maps_to_auth_expired() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(
            ResponseTemplate::new(400).set_body_json(json!({ "error": "invalid_grant" })),
        )
        .mount(&server)
        .await;

    let err = gateway(&server).refresh_token("rt-dead").await.unwrap_err();
    assert!(matches!(err, GatewayError::AuthExpired(_)));
}

#[tokio::test]
async fn token_endpoint_outage_is_transient() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let err = gateway(&server).refresh_token("rt-1").await.unwrap_err();
    assert!(matches!(err, GatewayError::Transient(_)));
}
