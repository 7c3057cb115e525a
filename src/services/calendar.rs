use std::time::Duration;

use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::Client;
use serde::Deserialize;
use tracing::{error, info};
use url::Url;

use crate::{config::AppConfig, error::AppError, models::summary::CalendarEvent};

pub const NOT_CONFIGURED: &str =
    "Calendar integration not configured. Set GOOGLE_CALENDAR_CREDENTIALS in .env";

const MAX_RESULTS: &str = "50";

/// Upcoming events with a location, read from the Google Calendar API.
#[derive(Clone)]
pub struct CalendarService {
    client: Client,
    api_key: Option<String>,
    calendar_id: String,
    api_base: String,
}

impl CalendarService {
    pub fn new(config: &AppConfig) -> Result<Self, AppError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(20))
            .build()
            .map_err(|err| AppError::Other(err.into()))?;
        Ok(Self {
            client,
            api_key: config.calendar_credentials.clone(),
            calendar_id: config.calendar_id.clone(),
            api_base: config.calendar_api_base.clone(),
        })
    }

    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    pub async fn upcoming_events(&self) -> Result<Vec<CalendarEvent>, AppError> {
        let Some(api_key) = self.api_key.as_deref() else {
            return Err(AppError::NotConfigured(NOT_CONFIGURED.into()));
        };

        let url = self.events_url(api_key, Utc::now())?;
        let response = self.client.get(url).send().await.map_err(|err| {
            error!("Calendar API request failed: {err}");
            AppError::Upstream(format!("Calendar API error: {err}"))
        })?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let snippet: String = text.chars().take(500).collect();
            error!(status = status.as_u16(), body = %snippet, "Calendar API error");
            return Err(AppError::Upstream(format!(
                "Calendar API error {}",
                status.as_u16()
            )));
        }

        let body: EventList = response
            .json()
            .await
            .map_err(|err| AppError::Upstream(format!("Calendar API error: {err}")))?;
        let events = events_with_location(body);
        info!(count = events.len(), "calendar events loaded");
        Ok(events)
    }

    fn events_url(&self, api_key: &str, now: DateTime<Utc>) -> Result<Url, AppError> {
        let mut url = Url::parse(self.api_base.trim_end_matches('/'))
            .map_err(|err| AppError::Config(format!("invalid calendar API base: {err}")))?;
        url.path_segments_mut()
            .map_err(|_| AppError::Config("calendar API base cannot be a base URL".into()))?
            .extend(["calendars", self.calendar_id.as_str(), "events"]);
        url.query_pairs_mut()
            .append_pair("key", api_key)
            .append_pair("singleEvents", "true")
            .append_pair("orderBy", "startTime")
            .append_pair("timeMin", &now.to_rfc3339_opts(SecondsFormat::Secs, true))
            .append_pair("maxResults", MAX_RESULTS);
        Ok(url)
    }
}

#[derive(Debug, Deserialize, Default)]
struct EventList {
    #[serde(default)]
    items: Vec<EventItem>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EventItem {
    summary: Option<String>,
    location: Option<String>,
    start: Option<EventTime>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EventTime {
    date: Option<String>,
    date_time: Option<String>,
}

impl EventTime {
    fn day(&self) -> Option<String> {
        if let Some(date) = self.date.as_deref() {
            return Some(date.to_string());
        }
        self.date_time
            .as_deref()
            .and_then(|raw| raw.get(..10))
            .map(str::to_string)
    }
}

fn events_with_location(list: EventList) -> Vec<CalendarEvent> {
    list.items
        .into_iter()
        .filter_map(|item| {
            let location = item
                .location
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())?;
            let date = item.start.as_ref().and_then(EventTime::day)?;
            let title = item
                .summary
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
                .unwrap_or_else(|| "(uden titel)".to_string());
            Some(CalendarEvent {
                date,
                title,
                location,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn service(api_key: Option<&str>) -> CalendarService {
        service_for(api_key, "work@example.com")
    }

    fn service_for(api_key: Option<&str>, calendar_id: &str) -> CalendarService {
        let mut vars = HashMap::new();
        if let Some(key) = api_key {
            vars.insert("GOOGLE_CALENDAR_CREDENTIALS".to_string(), key.to_string());
        }
        vars.insert("GOOGLE_CALENDAR_ID".to_string(), calendar_id.to_string());
        let config = AppConfig::from_lookup(|key| vars.get(key).cloned()).unwrap();
        CalendarService::new(&config).unwrap()
    }

    #[tokio::test]
    async fn unconfigured_calendar_is_not_implemented() {
        let err = service(None).upcoming_events().await.unwrap_err();
        assert!(err.is_not_configured());
        assert!(err.to_string().contains("not configured"));
    }

    #[test]
    fn events_url_escapes_calendar_id() {
        let svc = service_for(Some("secret"), "team/rejser#2025 dk");
        let now = DateTime::parse_from_rfc3339("2025-01-10T08:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let url = svc.events_url("secret", now).unwrap();
        assert_eq!(
            url.path(),
            "/calendar/v3/calendars/team%2Frejser%232025%20dk/events"
        );
        assert_eq!(url.fragment(), None);
    }

    #[test]
    fn events_url_carries_listing_parameters() {
        let svc = service(Some("secret"));
        let now = DateTime::parse_from_rfc3339("2025-01-10T08:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let url = svc.events_url("secret", now).unwrap();
        assert_eq!(
            url.path(),
            "/calendar/v3/calendars/work@example.com/events"
        );
        let query: HashMap<_, _> = url.query_pairs().into_owned().collect();
        assert_eq!(query["timeMin"], "2025-01-10T08:00:00Z");
        assert_eq!(query["singleEvents"], "true");
    }

    #[test]
    fn keeps_only_events_with_location() {
        let list: EventList = serde_json::from_str(
            r#"{"items":[
                {"summary":"Kundemøde hos TechCorp","location":"Lyngby Hovedgade 72, 2800 Kgs. Lyngby","start":{"dateTime":"2025-01-15T10:00:00+01:00"}},
                {"summary":"Frokost","start":{"date":"2025-01-16"}},
                {"location":"Kanalvej 7, 2800 Kgs. Lyngby","start":{"date":"2025-01-18"}}
            ]}"#,
        )
        .unwrap();
        let events = events_with_location(list);
        assert_eq!(
            events,
            vec![
                CalendarEvent {
                    date: "2025-01-15".into(),
                    title: "Kundemøde hos TechCorp".into(),
                    location: "Lyngby Hovedgade 72, 2800 Kgs. Lyngby".into(),
                },
                CalendarEvent {
                    date: "2025-01-18".into(),
                    title: "(uden titel)".into(),
                    location: "Kanalvej 7, 2800 Kgs. Lyngby".into(),
                },
            ]
        );
    }
}
