//! Reads historic trips from a semicolon-separated file in the export layout:
//! `Dato;Beskrivelse;Erhverv;Fra;Til;Frem (km);Tilbage (km);Total (km)`.

use chrono::{NaiveDate, NaiveDateTime};
use tracing::debug;

use crate::{
    db::DbPool,
    error::AppError,
    models::trip::{NewTrip, TravelMode, TEXT_MAX_CHARS},
    rates::round_to,
    services::trips,
};

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d/%m/%y", "%d/%m/%Y", "%d.%m.%Y"];

#[derive(Debug, Default)]
pub struct ParsedImport {
    pub trips: Vec<NewTrip>,
    /// Rows that were present but could not become a trip, with the reason.
    pub skipped: Vec<String>,
}

/// Splits semicolon-separated text into records, honouring double-quoted fields.
pub fn split_records(input: &str) -> Vec<Vec<String>> {
    let mut records = Vec::new();
    let mut record = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut chars = input.chars().peekable();

    while let Some(c) = chars.next() {
        if in_quotes {
            match c {
                '"' if chars.peek() == Some(&'"') => {
                    field.push('"');
                    chars.next();
                }
                '"' => in_quotes = false,
                _ => field.push(c),
            }
            continue;
        }
        match c {
            '"' if field.is_empty() => in_quotes = true,
            ';' => record.push(std::mem::take(&mut field)),
            '\r' => {}
            '\n' => {
                record.push(std::mem::take(&mut field));
                records.push(std::mem::take(&mut record));
            }
            _ => field.push(c),
        }
    }
    if !field.is_empty() || !record.is_empty() {
        record.push(field);
        records.push(record);
    }
    records
        .into_iter()
        .filter(|r| r.iter().any(|f| !f.trim().is_empty()))
        .collect()
}

pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())
        .or_else(|| {
            NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S")
                .ok()
                .map(|dt| dt.date())
        })
}

/// Kilometres with either decimal separator; anything unreadable or
/// non-finite counts as zero.
pub fn parse_km(raw: &str) -> f64 {
    let cleaned: String = raw
        .chars()
        .filter(|c| !c.is_whitespace())
        .map(|c| if c == ',' { '.' } else { c })
        .collect();
    cleaned
        .parse::<f64>()
        .ok()
        .filter(|km| km.is_finite())
        .unwrap_or(0.0)
}

fn clean_text(raw: &str) -> String {
    raw.replace(['\n', '\t', '\r'], " ")
        .trim()
        .chars()
        .take(TEXT_MAX_CHARS)
        .collect()
}

fn row_to_trip(fields: &[String]) -> Result<Option<NewTrip>, String> {
    let get = |idx: usize| fields.get(idx).map(String::as_str).unwrap_or("");

    let Some(trip_date) = parse_date(get(0)) else {
        return Ok(None);
    };
    let purpose = clean_text(get(1));
    if purpose.is_empty() {
        return Err("missing purpose".into());
    }
    let origin = clean_text(get(3));
    if origin.is_empty() {
        return Err("missing origin".into());
    }
    let destination = clean_text(get(4));
    if destination.is_empty() {
        return Err("missing destination".into());
    }
    if destination.contains("Beregnes") {
        return Err("destination not yet calculated".into());
    }

    let km_out = parse_km(get(5));
    let km_back = parse_km(get(6));
    let km_total = parse_km(get(7));
    if km_total <= 0.0 {
        return Err("total distance is zero".into());
    }

    let round_trip = km_out > 0.0 && km_back > 0.0;
    let one_way = if round_trip {
        km_total / 2.0
    } else if km_out > 0.0 {
        km_out
    } else {
        km_total
    };

    Ok(Some(NewTrip {
        trip_date,
        purpose,
        origin,
        destination,
        round_trip,
        travel_mode: TravelMode::Drive,
        distance_km: round_to(km_total, 1),
        distance_one_way_km: round_to(one_way, 1),
    }))
}

/// Turns file contents into trips. Header rows and rows without a date are
/// ignored silently; other unusable rows are reported in `skipped`.
pub fn parse_trips(input: &str) -> ParsedImport {
    let mut parsed = ParsedImport::default();
    for (idx, fields) in split_records(input).iter().enumerate() {
        let line = idx + 1;
        if fields
            .first()
            .is_some_and(|first| first.trim().eq_ignore_ascii_case("dato"))
        {
            continue;
        }
        match row_to_trip(fields) {
            Ok(Some(trip)) => parsed.trips.push(trip),
            Ok(None) => {}
            Err(reason) => parsed.skipped.push(format!("record {line}: {reason}")),
        }
    }
    parsed
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ImportOutcome {
    pub imported: usize,
    pub duplicates: usize,
}

/// Stores `trips` in one transaction, skipping any that already exist
/// (same date, origin and destination).
pub async fn import_trips(db: &DbPool, new_trips: &[NewTrip]) -> Result<ImportOutcome, AppError> {
    let mut outcome = ImportOutcome::default();
    let mut tx = db.begin().await?;
    for trip in new_trips {
        let existing =
            trips::find_duplicate(&mut tx, trip.trip_date, &trip.origin, &trip.destination)
                .await?;
        if let Some(id) = existing {
            debug!(id, date = %trip.trip_date, "duplicate trip skipped");
            outcome.duplicates += 1;
            continue;
        }
        trips::insert_trip(&mut tx, trip).await?;
        outcome.imported += 1;
    }
    tx.commit().await?;
    Ok(outcome)
}
