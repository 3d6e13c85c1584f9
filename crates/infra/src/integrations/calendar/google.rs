//! Google Calendar gateway implementation.
//!
//! Thin HTTP client over the Calendar v3 events API and the OAuth token
//! endpoint. All failures are folded into the gateway error taxonomy: the
//! sync engine only distinguishes expired credentials, missing events, and
//! everything-else-is-retryable.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use reminderflow_core::ports::CalendarGateway;
use reminderflow_domain::{
    Credentials, EventMetadata, EventPayload, ExternalEvent, GatewayError, GatewayResult,
    RefreshedToken, ReminderFlowError, Result,
};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

const GOOGLE_CALENDAR_API_BASE: &str = "https://www.googleapis.com/calendar/v3";
const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const PRIMARY_CALENDAR: &str = "primary";
const PAGE_SIZE: u32 = 250;
const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// OAuth client credentials for the token refresh flow.
#[derive(Debug, Clone)]
pub struct GoogleOAuthConfig {
    pub client_id: String,
    pub client_secret: String,
}

/// Google Calendar gateway.
pub struct GoogleCalendarGateway {
    client: Client,
    api_base: String,
    token_url: String,
    oauth: GoogleOAuthConfig,
}

impl GoogleCalendarGateway {
    pub fn new(oauth: GoogleOAuthConfig) -> Result<Self> {
        Self::with_base_urls(oauth, GOOGLE_CALENDAR_API_BASE.into(), GOOGLE_TOKEN_URL.into())
    }

    /// Point the gateway at alternative endpoints, used by tests to target
    /// a local mock server.
    pub fn with_base_urls(
        oauth: GoogleOAuthConfig,
        api_base: String,
        token_url: String,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(HTTP_TIMEOUT)
            .build()
            .map_err(|e| ReminderFlowError::Config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { client, api_base, token_url, oauth })
    }

    fn events_url(&self) -> String {
        format!("{}/calendars/{}/events", self.api_base, PRIMARY_CALENDAR)
    }
}

#[async_trait]
impl CalendarGateway for GoogleCalendarGateway {
    #[instrument(skip_all, fields(title = %payload.title))]
    async fn create_event(
        &self,
        credentials: &Credentials,
        payload: &EventPayload,
    ) -> GatewayResult<String> {
        let response = self
            .client
            .post(self.events_url())
            .bearer_auth(&credentials.access_token)
            .json(&GoogleEventBody::from_payload(payload))
            .send()
            .await
            .map_err(transport_error)?;

        let response = check_status(response, "event create").await?;

        let created: CreatedEvent = response.json().await.map_err(malformed_response)?;
        debug!(event_id = %created.id, "created calendar event");
        Ok(created.id)
    }

    #[instrument(skip_all, fields(event_id))]
    async fn update_event(
        &self,
        credentials: &Credentials,
        event_id: &str,
        payload: &EventPayload,
    ) -> GatewayResult<()> {
        let response = self
            .client
            .put(format!("{}/{}", self.events_url(), event_id))
            .bearer_auth(&credentials.access_token)
            .json(&GoogleEventBody::from_payload(payload))
            .send()
            .await
            .map_err(transport_error)?;

        check_status(response, "event update").await?;
        Ok(())
    }

    #[instrument(skip_all)]
    async fn list_events(
        &self,
        credentials: &Credentials,
        time_min: DateTime<Utc>,
        time_max: DateTime<Utc>,
    ) -> GatewayResult<Vec<ExternalEvent>> {
        let mut events = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut request = self
                .client
                .get(self.events_url())
                .bearer_auth(&credentials.access_token)
                .query(&[
                    ("timeMin", time_min.to_rfc3339_opts(SecondsFormat::Secs, true)),
                    ("timeMax", time_max.to_rfc3339_opts(SecondsFormat::Secs, true)),
                    ("singleEvents", "true".to_string()),
                    ("orderBy", "startTime".to_string()),
                    ("maxResults", PAGE_SIZE.to_string()),
                ]);
            if let Some(token) = &page_token {
                request = request.query(&[("pageToken", token.as_str())]);
            }

            let response = request.send().await.map_err(transport_error)?;
            let response = check_status(response, "event list").await?;

            let page: GoogleEventsResponse =
                response.json().await.map_err(malformed_response)?;

            for item in page.items {
                match item.into_external() {
                    Ok(event) => events.push(event),
                    // A single malformed event never fails the whole pull.
                    Err(err) => warn!(error = %err, "skipping unparseable calendar event"),
                }
            }

            page_token = page.next_page_token;
            if page_token.is_none() {
                break;
            }
        }

        debug!(count = events.len(), "listed calendar events");
        Ok(events)
    }

    #[instrument(skip_all)]
    async fn refresh_token(&self, refresh_token: &str) -> GatewayResult<RefreshedToken> {
        let response = self
            .client
            .post(&self.token_url)
            .form(&[
                ("client_id", self.oauth.client_id.as_str()),
                ("client_secret", self.oauth.client_secret.as_str()),
                ("refresh_token", refresh_token),
                ("grant_type", "refresh_token"),
            ])
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_else(|_| "unknown error".to_string());
            // The token endpoint reports a dead refresh token as 400
            // invalid_grant, not 401.
            return Err(match status.as_u16() {
                400 | 401 | 403 => {
                    GatewayError::AuthExpired(format!("token refresh rejected ({status}): {body}"))
                }
                _ => GatewayError::Transient(format!("token refresh failed ({status}): {body}")),
            });
        }

        let token: TokenRefreshResponse = response.json().await.map_err(malformed_response)?;

        Ok(RefreshedToken {
            access_token: token.access_token,
            expires_at: Utc::now() + chrono::Duration::seconds(token.expires_in),
        })
    }
}

fn transport_error(err: reqwest::Error) -> GatewayError {
    GatewayError::Transient(format!("request failed: {err}"))
}

fn malformed_response(err: reqwest::Error) -> GatewayError {
    GatewayError::Transient(format!("failed to parse response: {err}"))
}

async fn check_status(
    response: reqwest::Response,
    context: &str,
) -> GatewayResult<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_else(|_| "unknown error".to_string());
    Err(match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            GatewayError::AuthExpired(format!("{context} rejected ({status}): {body}"))
        }
        StatusCode::NOT_FOUND => GatewayError::NotFound(format!("{context}: {body}")),
        _ => GatewayError::Transient(format!("{context} failed ({status}): {body}")),
    })
}

/* -------------------------------------------------------------------------- */
/* Wire types */
/* -------------------------------------------------------------------------- */

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GoogleEventBody {
    summary: String,
    description: String,
    start: GoogleEventTime,
    end: GoogleEventTime,
    extended_properties: ExtendedPropertiesOut,
}

impl GoogleEventBody {
    fn from_payload(payload: &EventPayload) -> Self {
        Self {
            summary: payload.title.clone(),
            description: payload.description.clone(),
            start: GoogleEventTime {
                date_time: payload.start.to_rfc3339_opts(SecondsFormat::Secs, true),
            },
            end: GoogleEventTime {
                date_time: payload.end.to_rfc3339_opts(SecondsFormat::Secs, true),
            },
            extended_properties: ExtendedPropertiesOut {
                private: PrivateProperties {
                    source: payload.metadata.source.clone(),
                    task_id: payload.metadata.task_id.clone(),
                },
            },
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GoogleEventTime {
    date_time: String,
}

#[derive(Debug, Serialize)]
struct ExtendedPropertiesOut {
    private: PrivateProperties,
}

#[derive(Debug, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct PrivateProperties {
    #[serde(skip_serializing_if = "Option::is_none")]
    source: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    task_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CreatedEvent {
    id: String,
}

#[derive(Debug, Deserialize)]
struct TokenRefreshResponse {
    access_token: String,
    expires_in: i64,
}

#[derive(Debug, Deserialize)]
struct GoogleEventsResponse {
    #[serde(default)]
    items: Vec<GoogleCalendarEvent>,
    #[serde(rename = "nextPageToken")]
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GoogleCalendarEvent {
    id: String,
    summary: Option<String>,
    description: Option<String>,
    start: EventDateTime,
    end: EventDateTime,
    #[serde(rename = "extendedProperties")]
    extended_properties: Option<ExtendedPropertiesIn>,
}

#[derive(Debug, Deserialize)]
struct EventDateTime {
    #[serde(rename = "dateTime")]
    date_time: Option<String>,
    date: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ExtendedPropertiesIn {
    private: Option<PrivateProperties>,
}

impl GoogleCalendarEvent {
    fn into_external(self) -> GatewayResult<ExternalEvent> {
        let (start, all_day) = parse_event_time(&self.start, &self.id)?;
        let (end, _) = parse_event_time(&self.end, &self.id)?;

        let metadata = self
            .extended_properties
            .and_then(|props| props.private)
            .map(|private| EventMetadata { source: private.source, task_id: private.task_id })
            .unwrap_or_default();

        Ok(ExternalEvent {
            id: self.id,
            title: self.summary.filter(|s| !s.trim().is_empty()),
            description: self.description,
            start,
            end,
            all_day,
            metadata,
        })
    }
}

/// An event carries either a `dateTime` (timed) or a `date` (all-day).
fn parse_event_time(time: &EventDateTime, event_id: &str) -> GatewayResult<(DateTime<Utc>, bool)> {
    if let Some(date_time) = &time.date_time {
        let parsed = DateTime::parse_from_rfc3339(date_time).map_err(|e| {
            GatewayError::Transient(format!("event {event_id} has invalid dateTime: {e}"))
        })?;
        return Ok((parsed.with_timezone(&Utc), false));
    }

    if let Some(date) = &time.date {
        let parsed = NaiveDate::parse_from_str(date, "%Y-%m-%d").map_err(|e| {
            GatewayError::Transient(format!("event {event_id} has invalid date: {e}"))
        })?;
        let midnight = parsed
            .and_hms_opt(0, 0, 0)
            .ok_or_else(|| GatewayError::Transient(format!("event {event_id} date out of range")))?
            .and_utc();
        return Ok((midnight, true));
    }

    Err(GatewayError::Transient(format!("event {event_id} is missing start/end")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timed_event_parses_as_not_all_day() {
        let time = EventDateTime {
            date_time: Some("2026-03-10T14:30:00+02:00".into()),
            date: None,
        };
        let (parsed, all_day) = parse_event_time(&time, "evt-1").unwrap();
        assert!(!all_day);
        assert_eq!(parsed.to_rfc3339_opts(SecondsFormat::Secs, true), "2026-03-10T12:30:00Z");
    }

    #[test]
    fn date_only_event_parses_as_all_day() {
        let time = EventDateTime { date_time: None, date: Some("2026-03-10".into()) };
        let (parsed, all_day) = parse_event_time(&time, "evt-1").unwrap();
        assert!(all_day);
        assert_eq!(parsed.date_naive(), NaiveDate::from_ymd_opt(2026, 3, 10).unwrap());
    }

    #[test]
    fn event_without_any_time_is_rejected() {
        let time = EventDateTime { date_time: None, date: None };
        assert!(parse_event_time(&time, "evt-1").is_err());
    }

    #[test]
    fn event_body_carries_system_metadata() {
        let metadata = EventMetadata::system_tag("task-1");
        let payload = EventPayload {
            title: "Standup".into(),
            description: "Daily".into(),
            start: Utc::now(),
            end: Utc::now(),
            metadata,
        };

        let body = GoogleEventBody::from_payload(&payload);
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["extendedProperties"]["private"]["source"], "ReminderFlow");
        assert_eq!(json["extendedProperties"]["private"]["taskId"], "task-1");
    }
}
