use std::sync::Arc;

use crate::{
    config::AppConfig,
    db::DbPool,
    services::{calendar::CalendarService, distance::DistanceProvider},
};

#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub db: DbPool,
    pub distance: Arc<dyn DistanceProvider>,
    pub calendar: CalendarService,
}

impl AppState {
    pub fn new(
        config: AppConfig,
        db: DbPool,
        distance: Arc<dyn DistanceProvider>,
        calendar: CalendarService,
    ) -> Self {
        Self {
            config,
            db,
            distance,
            calendar,
        }
    }
}
