use std::path::Path;

use chrono::Utc;
use sqlx::SqliteConnection;
use tokio::fs;
use tracing::info;

use crate::{
    db::DbPool,
    error::AppError,
    models::{
        location::{LocationCreate, SavedLocation},
        trip::{validated_text, TEXT_MAX_CHARS},
    },
};

const LOCATION_COLUMNS: &str = "id, name, address, postal_code, is_home, usage_count, created_at";

/// Home first, then the most used.
pub async fn list_locations(db: &DbPool) -> Result<Vec<SavedLocation>, AppError> {
    let locations = sqlx::query_as::<_, SavedLocation>(&format!(
        "SELECT {LOCATION_COLUMNS} FROM saved_locations ORDER BY is_home DESC, usage_count DESC, id ASC"
    ))
    .fetch_all(db)
    .await?;
    Ok(locations)
}

/// Trimmed and length-checked location input, ready to insert.
struct ValidLocation {
    name: String,
    address: String,
    postal_code: Option<String>,
    is_home: bool,
}

fn validate(payload: &LocationCreate) -> Result<ValidLocation, AppError> {
    let name = validated_text("name", &payload.name, 1, 100)?;
    let address = validated_text("address", &payload.address, 2, TEXT_MAX_CHARS)?;
    let postal_code = payload
        .postal_code
        .as_deref()
        .map(str::trim)
        .filter(|code| !code.is_empty())
        .map(str::to_string);
    if postal_code.as_ref().is_some_and(|code| code.chars().count() > 10) {
        return Err(AppError::Validation(
            "postal_code must be at most 10 characters".into(),
        ));
    }
    Ok(ValidLocation {
        name,
        address,
        postal_code,
        is_home: payload.is_home,
    })
}

async fn insert_location(
    conn: &mut SqliteConnection,
    location: &ValidLocation,
) -> Result<SavedLocation, AppError> {
    let saved = sqlx::query_as::<_, SavedLocation>(&format!(
        "INSERT INTO saved_locations (name, address, postal_code, is_home, usage_count, created_at) \
         VALUES (?1, ?2, ?3, ?4, 0, ?5) RETURNING {LOCATION_COLUMNS}"
    ))
    .bind(&location.name)
    .bind(&location.address)
    .bind(&location.postal_code)
    .bind(location.is_home)
    .bind(Utc::now())
    .fetch_one(&mut *conn)
    .await?;
    Ok(saved)
}

pub async fn create_location(
    db: &DbPool,
    payload: &LocationCreate,
) -> Result<SavedLocation, AppError> {
    let valid = validate(payload)?;
    let mut conn = db.acquire().await?;
    let location = insert_location(&mut conn, &valid).await?;
    info!(id = location.id, name = %location.name, "location saved");
    Ok(location)
}

pub async fn delete_location(db: &DbPool, id: i64) -> Result<(), AppError> {
    let result = sqlx::query("DELETE FROM saved_locations WHERE id = ?1")
        .bind(id)
        .execute(db)
        .await?;
    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Location not found".into()));
    }
    Ok(())
}

/// Inserts the locations from a JSON seed file when the table is still empty.
/// Every entry is validated first and all are stored together, or none are.
/// Returns how many were inserted.
pub async fn seed_from_file(db: &DbPool, path: &Path) -> Result<usize, AppError> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM saved_locations")
        .fetch_one(db)
        .await?;
    if count > 0 {
        return Ok(0);
    }

    let raw = fs::read(path).await?;
    let entries: Vec<LocationCreate> =
        serde_json::from_slice(&raw).map_err(|err| AppError::Other(err.into()))?;
    let valid = entries
        .iter()
        .enumerate()
        .map(|(idx, entry)| {
            validate(entry).map_err(|err| {
                AppError::Validation(format!("seed entry {}: {err}", idx + 1))
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    let mut tx = db.begin().await?;
    for location in &valid {
        insert_location(&mut tx, location).await?;
    }
    tx.commit().await?;
    info!(count = valid.len(), path = %path.display(), "seeded saved locations");
    Ok(valid.len())
}
