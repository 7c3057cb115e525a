use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::{config::AppConfig, error::AppError, models::trip::TravelMode};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(20);
const FIELD_MASK: &str = "routes.distanceMeters,routes.duration";

/// Computes the one-way road distance between two free-text addresses.
#[async_trait]
pub trait DistanceProvider: Send + Sync {
    async fn one_way_km(
        &self,
        origin: &str,
        destination: &str,
        mode: TravelMode,
    ) -> Result<f64, AppError>;

    /// Fails when the provider cannot be called at all, before any input is parsed.
    fn ensure_configured(&self) -> Result<(), AppError> {
        Ok(())
    }
}

/// Google Routes API (`directions/v2:computeRoutes`).
pub struct GoogleRoutes {
    client: Client,
    api_key: Option<String>,
    endpoint: String,
    region_code: String,
}

impl GoogleRoutes {
    pub fn new(config: &AppConfig) -> Result<Self, AppError> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|err| AppError::Other(err.into()))?;
        Ok(Self {
            client,
            api_key: config.google_maps_api_key.clone(),
            endpoint: config.routes_endpoint.clone(),
            region_code: config.region_code.clone(),
        })
    }

    fn api_key(&self) -> Result<&str, AppError> {
        self.api_key
            .as_deref()
            .ok_or_else(|| AppError::MissingCredentials("Missing GOOGLE_MAPS_API_KEY".into()))
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RoutesRequest<'a> {
    origin: Waypoint<'a>,
    destination: Waypoint<'a>,
    travel_mode: &'a str,
    units: &'a str,
    language_code: &'a str,
    region_code: &'a str,
    routing_preference: &'a str,
}

#[derive(Serialize)]
struct Waypoint<'a> {
    address: &'a str,
}

#[derive(Debug, Deserialize, Default)]
struct RoutesResponse {
    #[serde(default)]
    routes: Vec<Route>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Route {
    distance_meters: Option<f64>,
}

fn distance_from_response(body: RoutesResponse) -> Result<f64, AppError> {
    let route = body
        .routes
        .into_iter()
        .next()
        .ok_or_else(|| AppError::Upstream("No routes found".into()))?;
    let meters = route
        .distance_meters
        .ok_or_else(|| AppError::Upstream("Missing distance in response".into()))?;
    Ok(meters / 1000.0)
}

#[async_trait]
impl DistanceProvider for GoogleRoutes {
    fn ensure_configured(&self) -> Result<(), AppError> {
        self.api_key().map(|_| ())
    }

    async fn one_way_km(
        &self,
        origin: &str,
        destination: &str,
        mode: TravelMode,
    ) -> Result<f64, AppError> {
        let api_key = self.api_key()?;

        let payload = RoutesRequest {
            origin: Waypoint { address: origin },
            destination: Waypoint {
                address: destination,
            },
            travel_mode: mode.as_str(),
            units: "METRIC",
            language_code: "da-DK",
            region_code: &self.region_code,
            routing_preference: "TRAFFIC_UNAWARE",
        };

        debug!(%origin, %destination, %mode, "requesting route");
        let response = self
            .client
            .post(&self.endpoint)
            .header("X-Goog-Api-Key", api_key)
            .header("X-Goog-FieldMask", FIELD_MASK)
            .json(&payload)
            .send()
            .await
            .map_err(|err| {
                error!("Routes API request failed: {err}");
                AppError::Upstream(format!("Routes API error: {err}"))
            })?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let snippet: String = text.chars().take(500).collect();
            error!(status = status.as_u16(), body = %snippet, "Routes API error");
            return Err(AppError::Upstream(format!(
                "Routes API error {}",
                status.as_u16()
            )));
        }

        let body: RoutesResponse = response
            .json()
            .await
            .map_err(|err| AppError::Upstream(format!("Routes API error: {err}")))?;
        distance_from_response(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn converts_meters_to_kilometers() {
        let body: RoutesResponse =
            serde_json::from_str(r#"{"routes":[{"distanceMeters":12345,"duration":"900s"}]}"#)
                .unwrap();
        assert!((distance_from_response(body).unwrap() - 12.345).abs() < 1e-9);
    }

    #[test]
    fn empty_response_means_no_routes() {
        let body: RoutesResponse = serde_json::from_str("{}").unwrap();
        let err = distance_from_response(body).unwrap_err();
        assert_eq!(err.to_string(), "No routes found");
    }

    #[test]
    fn route_without_distance_is_an_upstream_error() {
        let body: RoutesResponse =
            serde_json::from_str(r#"{"routes":[{"duration":"60s"}]}"#).unwrap();
        let err = distance_from_response(body).unwrap_err();
        assert_eq!(err.to_string(), "Missing distance in response");
    }

    fn unconfigured() -> GoogleRoutes {
        let config = AppConfig::from_lookup(|_| None).unwrap();
        GoogleRoutes::new(&config).unwrap()
    }

    #[tokio::test]
    async fn missing_api_key_fails_without_calling_out() {
        let routes = unconfigured();
        let err = routes
            .one_way_km("Platanvej 7, 2791", "DTU, 2800", TravelMode::Drive)
            .await
            .unwrap_err();
        assert_eq!(err.status(), axum::http::StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.to_string(), "Missing GOOGLE_MAPS_API_KEY");
        assert!(routes.ensure_configured().is_err());
    }

    #[test]
    fn request_body_uses_camel_case() {
        let payload = RoutesRequest {
            origin: Waypoint { address: "A" },
            destination: Waypoint { address: "B" },
            travel_mode: "DRIVE",
            units: "METRIC",
            language_code: "da-DK",
            region_code: "DK",
            routing_preference: "TRAFFIC_UNAWARE",
        };
        let value = serde_json::to_value(&payload).unwrap();
        assert_eq!(value["travelMode"], "DRIVE");
        assert_eq!(value["origin"]["address"], "A");
        assert_eq!(value["routingPreference"], "TRAFFIC_UNAWARE");
    }
}
