pub mod calendar;
pub mod distance;
pub mod export;
pub mod import;
pub mod listing;
pub mod locations;
pub mod trips;
