use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Summary {
    pub year: i32,
    pub trip_count: i64,
    pub total_km: f64,
    pub reimbursement_dkk: f64,
    pub rate_high: f64,
    pub rate_low: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CalendarEvent {
    pub date: String,
    pub title: String,
    pub location: String,
}
