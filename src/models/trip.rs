use std::{fmt, str::FromStr};

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::error::AppError;

pub const TEXT_MAX_CHARS: usize = 500;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Trip {
    pub id: i64,
    pub trip_date: NaiveDate,
    pub purpose: String,
    pub origin: String,
    pub destination: String,
    pub round_trip: bool,
    pub travel_mode: String,
    pub distance_km: f64,
    pub distance_one_way_km: Option<f64>,
    pub created_at: DateTime<Utc>,
}

impl Trip {
    pub fn year(&self) -> i32 {
        self.trip_date.year()
    }

    /// One-way distance, derived from the total when no one-way value is stored.
    pub fn one_way_km(&self) -> f64 {
        match self.distance_one_way_km {
            Some(km) if km != 0.0 => km,
            _ if self.round_trip => self.distance_km / 2.0,
            _ => self.distance_km,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TravelMode {
    #[default]
    Drive,
    Walk,
    Bicycle,
    Transit,
}

impl TravelMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            TravelMode::Drive => "DRIVE",
            TravelMode::Walk => "WALK",
            TravelMode::Bicycle => "BICYCLE",
            TravelMode::Transit => "TRANSIT",
        }
    }
}

impl fmt::Display for TravelMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for TravelMode {
    type Err = AppError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_uppercase().as_str() {
            "DRIVE" => Ok(TravelMode::Drive),
            "WALK" => Ok(TravelMode::Walk),
            "BICYCLE" => Ok(TravelMode::Bicycle),
            "TRANSIT" => Ok(TravelMode::Transit),
            _ => Err(AppError::BadRequest("Invalid travel_mode".into())),
        }
    }
}

fn default_round_trip() -> bool {
    true
}

fn default_travel_mode() -> String {
    TravelMode::Drive.as_str().to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct TripCreate {
    pub trip_date: NaiveDate,
    pub purpose: String,
    pub origin: String,
    pub destination: String,
    #[serde(default = "default_round_trip")]
    pub round_trip: bool,
    #[serde(default = "default_travel_mode")]
    pub travel_mode: String,
}

/// Only date and purpose can change; the distance is fixed once computed.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TripUpdate {
    pub trip_date: Option<NaiveDate>,
    pub purpose: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DistancePreview {
    pub origin: String,
    pub destination: String,
    #[serde(default = "default_round_trip")]
    pub round_trip: bool,
    #[serde(default = "default_travel_mode")]
    pub travel_mode: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DistancePreviewOut {
    pub one_way_km: f64,
    pub total_km: f64,
    pub round_trip: bool,
}

/// A trip ready for insertion, with distances already computed.
#[derive(Debug, Clone)]
pub struct NewTrip {
    pub trip_date: NaiveDate,
    pub purpose: String,
    pub origin: String,
    pub destination: String,
    pub round_trip: bool,
    pub travel_mode: TravelMode,
    pub distance_km: f64,
    pub distance_one_way_km: f64,
}

/// Trims `value` and checks its length in characters.
pub fn validated_text(
    field: &str,
    value: &str,
    min: usize,
    max: usize,
) -> Result<String, AppError> {
    let trimmed = value.trim();
    let len = trimmed.chars().count();
    if len < min {
        return Err(AppError::Validation(format!(
            "{field} must be at least {min} characters"
        )));
    }
    if len > max {
        return Err(AppError::Validation(format!(
            "{field} must be at most {max} characters"
        )));
    }
    Ok(trimmed.to_string())
}

pub struct RouteRequest {
    pub origin: String,
    pub destination: String,
    pub round_trip: bool,
    pub travel_mode: TravelMode,
}
