use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct SavedLocation {
    pub id: i64,
    pub name: String,
    pub address: String,
    pub postal_code: Option<String>,
    pub is_home: bool,
    pub usage_count: i64,
    #[serde(skip_serializing)]
    pub created_at: DateTime<Utc>,
}

impl SavedLocation {
    pub fn full_address(&self) -> String {
        full_address(&self.address, self.postal_code.as_deref())
    }
}

pub fn full_address(address: &str, postal_code: Option<&str>) -> String {
    match postal_code.map(str::trim).filter(|code| !code.is_empty()) {
        Some(code) => format!("{address}, {code}"),
        None => address.to_string(),
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LocationCreate {
    pub name: String,
    pub address: String,
    #[serde(default)]
    pub postal_code: Option<String>,
    #[serde(default)]
    pub is_home: bool,
}
