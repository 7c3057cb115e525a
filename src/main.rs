use std::sync::Arc;

use mileage::config::AppConfig;
use mileage::db::{init_pool, migrate};
use mileage::error::AppError;
use mileage::routes::create_router;
use mileage::services::{calendar::CalendarService, distance::GoogleRoutes, locations};
use mileage::state::AppState;
use tokio::net::TcpListener;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> Result<(), AppError> {
    dotenvy::dotenv().ok();
    init_logging();

    let config = AppConfig::from_env()?;
    let db = init_pool(&config.database_url).await?;

    if let Err(err) = migrate(&db).await {
        error!("migration failed: {err:?}");
        return Err(err);
    }

    if let Some(seed) = config.locations_seed.as_deref() {
        if let Err(err) = locations::seed_from_file(&db, seed).await {
            warn!("could not seed saved locations from {}: {err}", seed.display());
        }
    }

    if config.google_maps_api_key.is_none() {
        warn!("GOOGLE_MAPS_API_KEY is not set; distance lookups will fail");
    }

    let distance = Arc::new(GoogleRoutes::new(&config)?);
    let calendar = CalendarService::new(&config)?;
    let state = AppState::new(config.clone(), db.clone(), distance, calendar);

    let app = create_router(state);

    let listener = TcpListener::bind(config.listen_addr).await?;
    info!("listening on {}", listener.local_addr()?);
    axum::serve(listener, app.into_make_service()).await?;

    Ok(())
}

fn init_logging() {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let fmt_layer = tracing_subscriber::fmt::layer().with_target(false);
    let filter_layer = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,mileage=debug,tower_http=info".into());

    tracing_subscriber::registry()
        .with(filter_layer)
        .with(fmt_layer)
        .init();
}
