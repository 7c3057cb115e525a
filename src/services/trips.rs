use chrono::{NaiveDate, Utc};
use sqlx::{Sqlite, SqliteConnection, Transaction};
use tracing::info;

use crate::{
    db::DbPool,
    error::AppError,
    models::{
        location::SavedLocation,
        summary::Summary,
        trip::{
            validated_text, DistancePreview, DistancePreviewOut, NewTrip, RouteRequest, Trip,
            TripCreate, TripUpdate, TEXT_MAX_CHARS,
        },
    },
    rates::{rates_for, reimbursement, round_to},
    services::distance::DistanceProvider,
    state::AppState,
};

const TRIP_COLUMNS: &str = "id, trip_date, purpose, origin, destination, round_trip, travel_mode, distance_km, distance_one_way_km, created_at";

fn year_bounds(year: i32) -> Result<(NaiveDate, NaiveDate), AppError> {
    let first = NaiveDate::from_ymd_opt(year, 1, 1);
    let last = NaiveDate::from_ymd_opt(year, 12, 31);
    match (first, last) {
        (Some(first), Some(last)) => Ok((first, last)),
        _ => Err(AppError::Validation(format!("year {year} is out of range"))),
    }
}

pub async fn list_trips(db: &DbPool, year: Option<i32>) -> Result<Vec<Trip>, AppError> {
    let trips = match year {
        Some(year) => {
            let (first, last) = year_bounds(year)?;
            sqlx::query_as::<_, Trip>(&format!(
                "SELECT {TRIP_COLUMNS} FROM trips WHERE trip_date >= ?1 AND trip_date <= ?2 ORDER BY trip_date DESC, id DESC"
            ))
            .bind(first)
            .bind(last)
            .fetch_all(db)
            .await?
        }
        None => {
            sqlx::query_as::<_, Trip>(&format!(
                "SELECT {TRIP_COLUMNS} FROM trips ORDER BY trip_date DESC, id DESC"
            ))
            .fetch_all(db)
            .await?
        }
    };
    Ok(trips)
}

/// Trips of one year, oldest first.
pub async fn trips_for_export(db: &DbPool, year: i32) -> Result<Vec<Trip>, AppError> {
    let (first, last) = year_bounds(year)?;
    let trips = sqlx::query_as::<_, Trip>(&format!(
        "SELECT {TRIP_COLUMNS} FROM trips WHERE trip_date >= ?1 AND trip_date <= ?2 ORDER BY trip_date ASC, id ASC"
    ))
    .bind(first)
    .bind(last)
    .fetch_all(db)
    .await?;
    Ok(trips)
}

pub async fn get_trip(db: &DbPool, id: i64) -> Result<Trip, AppError> {
    sqlx::query_as::<_, Trip>(&format!("SELECT {TRIP_COLUMNS} FROM trips WHERE id = ?1"))
        .bind(id)
        .fetch_optional(db)
        .await?
        .ok_or_else(|| AppError::NotFound("Trip not found".into()))
}

/// Distinct years that have at least one trip, newest first.
pub async fn known_years(db: &DbPool) -> Result<Vec<i32>, AppError> {
    let years: Vec<String> = sqlx::query_scalar(
        "SELECT DISTINCT substr(trip_date, 1, 4) AS year FROM trips ORDER BY year DESC",
    )
    .fetch_all(db)
    .await?;
    Ok(years.iter().filter_map(|y| y.parse().ok()).collect())
}

async fn route_distance(
    distance: &dyn DistanceProvider,
    route: &RouteRequest,
) -> Result<DistancePreviewOut, AppError> {
    let one_way = distance
        .one_way_km(&route.origin, &route.destination, route.travel_mode)
        .await?;
    let total = if route.round_trip { one_way * 2.0 } else { one_way };
    Ok(DistancePreviewOut {
        one_way_km: round_to(one_way, 1),
        total_km: round_to(total, 1),
        round_trip: route.round_trip,
    })
}

/// Validates a route in the order callers see errors: addresses, then
/// provider configuration, then travel mode.
fn route_request(
    distance: &dyn DistanceProvider,
    origin: &str,
    destination: &str,
    round_trip: bool,
    travel_mode: &str,
) -> Result<RouteRequest, AppError> {
    let origin = validated_text("origin", origin, 2, TEXT_MAX_CHARS)?;
    let destination = validated_text("destination", destination, 2, TEXT_MAX_CHARS)?;
    distance.ensure_configured()?;
    Ok(RouteRequest {
        origin,
        destination,
        round_trip,
        travel_mode: travel_mode.parse()?,
    })
}

pub async fn preview_distance(
    distance: &dyn DistanceProvider,
    payload: &DistancePreview,
) -> Result<DistancePreviewOut, AppError> {
    let route = route_request(
        distance,
        &payload.origin,
        &payload.destination,
        payload.round_trip,
        &payload.travel_mode,
    )?;
    route_distance(distance, &route).await
}

pub async fn create_trip(state: &AppState, payload: &TripCreate) -> Result<Trip, AppError> {
    let purpose = validated_text("purpose", &payload.purpose, 2, TEXT_MAX_CHARS)?;
    let route = route_request(
        state.distance.as_ref(),
        &payload.origin,
        &payload.destination,
        payload.round_trip,
        &payload.travel_mode,
    )?;
    let computed = route_distance(state.distance.as_ref(), &route).await?;

    let new_trip = NewTrip {
        trip_date: payload.trip_date,
        purpose,
        origin: route.origin,
        destination: route.destination,
        round_trip: route.round_trip,
        travel_mode: route.travel_mode,
        distance_km: computed.total_km,
        distance_one_way_km: computed.one_way_km,
    };

    let mut tx = state.db.begin().await?;
    let trip = insert_trip(&mut tx, &new_trip).await?;
    bump_location_usage(&mut tx, &trip.origin, &trip.destination).await?;
    tx.commit().await?;

    info!(
        id = trip.id,
        date = %trip.trip_date,
        km = trip.distance_km,
        "trip created"
    );
    Ok(trip)
}

pub async fn insert_trip(
    tx: &mut Transaction<'_, Sqlite>,
    trip: &NewTrip,
) -> Result<Trip, AppError> {
    let created = sqlx::query_as::<_, Trip>(&format!(
        "INSERT INTO trips (trip_date, purpose, origin, destination, round_trip, travel_mode, distance_km, distance_one_way_km, created_at) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9) RETURNING {TRIP_COLUMNS}"
    ))
    .bind(trip.trip_date)
    .bind(&trip.purpose)
    .bind(&trip.origin)
    .bind(&trip.destination)
    .bind(trip.round_trip)
    .bind(trip.travel_mode.as_str())
    .bind(trip.distance_km)
    .bind(trip.distance_one_way_km)
    .bind(Utc::now())
    .fetch_one(&mut **tx)
    .await?;
    Ok(created)
}

/// Counts a use for every saved location whose full address appears in the route.
async fn bump_location_usage(
    tx: &mut Transaction<'_, Sqlite>,
    origin: &str,
    destination: &str,
) -> Result<(), AppError> {
    let locations = sqlx::query_as::<_, SavedLocation>(
        "SELECT id, name, address, postal_code, is_home, usage_count, created_at FROM saved_locations",
    )
    .fetch_all(&mut **tx)
    .await?;

    for location in locations {
        let full = location.full_address();
        if origin.contains(&full) || destination.contains(&full) {
            sqlx::query("UPDATE saved_locations SET usage_count = usage_count + 1 WHERE id = ?1")
                .bind(location.id)
                .execute(&mut **tx)
                .await?;
        }
    }
    Ok(())
}

pub async fn update_trip(db: &DbPool, id: i64, patch: &TripUpdate) -> Result<Trip, AppError> {
    let mut trip = get_trip(db, id).await?;
    if let Some(date) = patch.trip_date {
        trip.trip_date = date;
    }
    if let Some(purpose) = patch.purpose.as_deref() {
        trip.purpose = validated_text("purpose", purpose, 2, TEXT_MAX_CHARS)?;
    }

    sqlx::query("UPDATE trips SET trip_date = ?1, purpose = ?2 WHERE id = ?3")
        .bind(trip.trip_date)
        .bind(&trip.purpose)
        .bind(id)
        .execute(db)
        .await?;
    get_trip(db, id).await
}

pub async fn delete_trip(db: &DbPool, id: i64) -> Result<Trip, AppError> {
    let trip = get_trip(db, id).await?;
    sqlx::query("DELETE FROM trips WHERE id = ?1")
        .bind(id)
        .execute(db)
        .await?;
    info!(id, "trip deleted");
    Ok(trip)
}

/// Looks for an existing trip on the same day between the same two addresses.
pub async fn find_duplicate(
    conn: &mut SqliteConnection,
    date: NaiveDate,
    origin: &str,
    destination: &str,
) -> Result<Option<i64>, AppError> {
    let id = sqlx::query_scalar(
        "SELECT id FROM trips WHERE trip_date = ?1 AND origin = ?2 AND destination = ?3 LIMIT 1",
    )
    .bind(date)
    .bind(origin)
    .bind(destination)
    .fetch_optional(&mut *conn)
    .await?;
    Ok(id)
}

pub fn summarize(year: i32, trips: &[Trip]) -> Summary {
    let total_km = round_to(trips.iter().map(|t| t.distance_km).sum(), 1);
    let tier = rates_for(year);
    Summary {
        year,
        trip_count: trips.len() as i64,
        total_km,
        reimbursement_dkk: round_to(reimbursement(total_km, year), 2),
        rate_high: tier.high,
        rate_low: tier.low,
    }
}

pub async fn summary(db: &DbPool, year: i32) -> Result<Summary, AppError> {
    let trips = list_trips(db, Some(year)).await?;
    Ok(summarize(year, &trips))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{config::AppConfig, services::distance::GoogleRoutes};

    fn trip(km: f64) -> Trip {
        Trip {
            id: 1,
            trip_date: NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
            purpose: "Møde".into(),
            origin: "A".into(),
            destination: "B".into(),
            round_trip: false,
            travel_mode: "DRIVE".into(),
            distance_km: km,
            distance_one_way_km: Some(km),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn summary_of_empty_year() {
        let summary = summarize(2024, &[]);
        assert_eq!(summary.trip_count, 0);
        assert_eq!(summary.total_km, 0.0);
        assert_eq!(summary.reimbursement_dkk, 0.0);
        assert_eq!(summary.rate_high, 3.79);
    }

    #[test]
    fn summary_rounds_total_before_reimbursement() {
        let summary = summarize(2024, &[trip(10.04), trip(10.04)]);
        assert_eq!(summary.trip_count, 2);
        assert_eq!(summary.total_km, 20.1);
        assert_eq!(summary.reimbursement_dkk, 76.18);
    }

    fn preview(origin: &str, mode: &str) -> DistancePreview {
        DistancePreview {
            origin: origin.into(),
            destination: "DTU, 2800".into(),
            round_trip: true,
            travel_mode: mode.into(),
        }
    }

    #[tokio::test]
    async fn missing_api_key_is_reported_before_travel_mode() {
        let config = AppConfig::from_lookup(|_| None).unwrap();
        let routes = GoogleRoutes::new(&config).unwrap();

        let err = preview_distance(&routes, &preview("Platanvej 7, 2791", "TELEPORT"))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Missing GOOGLE_MAPS_API_KEY");

        let err = preview_distance(&routes, &preview("x", "TELEPORT"))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "origin must be at least 2 characters");
    }

    #[test]
    fn year_bounds_cover_whole_year() {
        let (first, last) = year_bounds(2025).unwrap();
        assert_eq!(first.to_string(), "2025-01-01");
        assert_eq!(last.to_string(), "2025-12-31");
    }
}
