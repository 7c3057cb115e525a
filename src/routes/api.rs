use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    http::header,
    response::IntoResponse,
    routing::{delete, get, patch, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::{
    error::AppError,
    models::{
        location::{LocationCreate, SavedLocation},
        summary::{CalendarEvent, Summary},
        trip::{DistancePreview, DistancePreviewOut, Trip, TripCreate, TripUpdate},
    },
    services::{export, locations, trips},
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/locations", get(list_locations).post(create_location))
        .route("/locations/:id", delete(delete_location))
        .route("/trips", get(list_trips).post(create_trip))
        .route("/trips/:id", patch(update_trip).delete(delete_trip))
        .route("/preview-distance", post(preview_distance))
        .route("/summary", get(summary))
        .route("/export.csv", get(export_csv))
        .route("/calendar/events", get(calendar_events))
}

#[derive(Deserialize)]
struct OptionalYear {
    year: Option<i32>,
}

#[derive(Deserialize)]
struct RequiredYear {
    year: i32,
}

type QueryResult<T> = Result<Query<T>, QueryRejection>;
type JsonResult<T> = Result<Json<T>, JsonRejection>;

fn ok() -> Json<Value> {
    Json(json!({ "ok": true }))
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

async fn list_locations(
    State(state): State<AppState>,
) -> Result<Json<Vec<SavedLocation>>, AppError> {
    Ok(Json(locations::list_locations(&state.db).await?))
}

async fn create_location(
    State(state): State<AppState>,
    payload: JsonResult<LocationCreate>,
) -> Result<Json<SavedLocation>, AppError> {
    let Json(payload) = payload?;
    Ok(Json(locations::create_location(&state.db, &payload).await?))
}

async fn delete_location(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Value>, AppError> {
    locations::delete_location(&state.db, id).await?;
    Ok(ok())
}

async fn list_trips(
    State(state): State<AppState>,
    query: QueryResult<OptionalYear>,
) -> Result<Json<Vec<Trip>>, AppError> {
    let Query(query) = query?;
    Ok(Json(trips::list_trips(&state.db, query.year).await?))
}

async fn create_trip(
    State(state): State<AppState>,
    payload: JsonResult<TripCreate>,
) -> Result<Json<Trip>, AppError> {
    let Json(payload) = payload?;
    Ok(Json(trips::create_trip(&state, &payload).await?))
}

async fn update_trip(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    patch: JsonResult<TripUpdate>,
) -> Result<Json<Trip>, AppError> {
    let Json(patch) = patch?;
    Ok(Json(trips::update_trip(&state.db, id, &patch).await?))
}

async fn delete_trip(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Value>, AppError> {
    trips::delete_trip(&state.db, id).await?;
    Ok(ok())
}

async fn preview_distance(
    State(state): State<AppState>,
    payload: JsonResult<DistancePreview>,
) -> Result<Json<DistancePreviewOut>, AppError> {
    let Json(payload) = payload?;
    Ok(Json(
        trips::preview_distance(state.distance.as_ref(), &payload).await?,
    ))
}

async fn summary(
    State(state): State<AppState>,
    query: QueryResult<RequiredYear>,
) -> Result<Json<Summary>, AppError> {
    let Query(query) = query?;
    Ok(Json(trips::summary(&state.db, query.year).await?))
}

async fn export_csv(
    State(state): State<AppState>,
    query: QueryResult<RequiredYear>,
) -> Result<impl IntoResponse, AppError> {
    let Query(query) = query?;
    let rows = trips::trips_for_export(&state.db, query.year).await?;
    let body = export::render_csv(&rows);
    let disposition = format!(
        "attachment; filename=\"{}\"",
        export::filename(query.year)
    );
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        body,
    ))
}

async fn calendar_events(
    State(state): State<AppState>,
) -> Result<Json<Vec<CalendarEvent>>, AppError> {
    Ok(Json(state.calendar.upcoming_events().await?))
}
