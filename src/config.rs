use std::{env, net::SocketAddr, path::PathBuf};

use crate::error::AppError;

pub const DEFAULT_ROUTES_ENDPOINT: &str =
    "https://routes.googleapis.com/directions/v2:computeRoutes";
pub const DEFAULT_CALENDAR_API_BASE: &str = "https://www.googleapis.com/calendar/v3";

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub listen_addr: SocketAddr,
    pub static_dir: PathBuf,
    pub google_maps_api_key: Option<String>,
    pub region_code: String,
    pub routes_endpoint: String,
    pub calendar_credentials: Option<String>,
    pub calendar_id: String,
    pub calendar_api_base: String,
    pub locations_seed: Option<PathBuf>,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the config from any key lookup; `from_env` passes the process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let database_url =
            non_empty("DATABASE_URL").unwrap_or_else(|| "sqlite://mileage.db".to_string());
        let listen_addr: SocketAddr = non_empty("APP_LISTEN_ADDR")
            .unwrap_or_else(|| "127.0.0.1:3000".to_string())
            .parse()
            .map_err(|err| AppError::Config(format!("invalid APP_LISTEN_ADDR: {err}")))?;

        let static_dir = non_empty("STATIC_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("static"));

        let region_code = non_empty("DEFAULT_REGION_CODE").unwrap_or_else(|| "DK".to_string());
        let routes_endpoint =
            non_empty("ROUTES_ENDPOINT").unwrap_or_else(|| DEFAULT_ROUTES_ENDPOINT.to_string());
        url::Url::parse(&routes_endpoint)
            .map_err(|err| AppError::Config(format!("invalid ROUTES_ENDPOINT: {err}")))?;

        let calendar_api_base = non_empty("CALENDAR_API_BASE")
            .unwrap_or_else(|| DEFAULT_CALENDAR_API_BASE.to_string());
        url::Url::parse(&calendar_api_base)
            .map_err(|err| AppError::Config(format!("invalid CALENDAR_API_BASE: {err}")))?;

        Ok(Self {
            database_url,
            listen_addr,
            static_dir,
            google_maps_api_key: non_empty("GOOGLE_MAPS_API_KEY"),
            region_code,
            routes_endpoint,
            calendar_credentials: non_empty("GOOGLE_CALENDAR_CREDENTIALS"),
            calendar_id: non_empty("GOOGLE_CALENDAR_ID").unwrap_or_else(|| "primary".to_string()),
            calendar_api_base,
            locations_seed: non_empty("LOCATIONS_SEED").map(PathBuf::from),
        })
    }
}
