use askama::Template;
use askama_axum::IntoResponse as AskamaTemplateResponse;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
    routing::{get, post},
    Form, Router,
};
use chrono::{Datelike, Local, NaiveDate};
use serde::Deserialize;
use tracing::warn;
use url::form_urlencoded;

use crate::{
    error::AppError,
    models::{
        location::{LocationCreate, SavedLocation},
        summary::{CalendarEvent, Summary},
        trip::{DistancePreview, DistancePreviewOut, TravelMode, Trip, TripCreate, TripUpdate},
    },
    services::{
        listing::{self, YearGroup},
        locations, trips,
    },
    state::AppState,
};

const TRAVEL_MODES: [TravelMode; 4] = [
    TravelMode::Drive,
    TravelMode::Bicycle,
    TravelMode::Transit,
    TravelMode::Walk,
];

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(index))
        .route("/trips", post(trip_submit))
        .route("/preview", post(preview_submit))
        .route("/trips/:id/edit", get(trip_edit_form).post(trip_edit_submit))
        .route("/trips/:id/delete", post(trip_delete))
        .route("/calendar", get(calendar_page))
        .route("/locations", get(locations_page).post(location_submit))
        .route("/locations/:id/delete", post(location_delete))
}

const YEARS: std::ops::RangeInclusive<i32> = 1900..=9999;

fn current_year() -> i32 {
    Local::now().year()
}

/// Year from the query string; anything unusable falls back to `fallback`
/// together with a message for the page.
fn resolve_year(raw: Option<&str>, fallback: i32) -> (i32, Option<String>) {
    let Some(raw) = raw.map(str::trim).filter(|raw| !raw.is_empty()) else {
        return (fallback, None);
    };
    match raw.parse::<i32>() {
        Ok(year) if YEARS.contains(&year) => (year, None),
        _ => (fallback, Some(format!("Ugyldigt år: {raw}"))),
    }
}

fn year_redirect(year: i32) -> Redirect {
    Redirect::to(&format!("/?year={year}"))
}

fn render_with_status(status: StatusCode, template: impl AskamaTemplateResponse) -> Response {
    (status, AskamaTemplateResponse::into_response(template)).into_response()
}

#[derive(Clone)]
struct SelectOption {
    value: String,
    selected: bool,
}

#[derive(Clone, Default)]
struct TripFormValues {
    trip_date: String,
    purpose: String,
    origin: String,
    destination: String,
    round_trip: bool,
    travel_mode: String,
}

#[derive(Template)]
#[template(path = "index.html")]
struct IndexTemplate {
    year: i32,
    years: Vec<SelectOption>,
    query: String,
    summary: Summary,
    groups: Vec<YearGroup>,
    shown_count: usize,
    locations: Vec<SavedLocation>,
    form: TripFormValues,
    travel_modes: Vec<SelectOption>,
    preview: Option<DistancePreviewOut>,
    show_error: bool,
    error_message: String,
}

#[derive(Deserialize, Default)]
struct IndexQuery {
    year: Option<String>,
    q: Option<String>,
    date: Option<String>,
    purpose: Option<String>,
    destination: Option<String>,
}

struct PageExtras {
    preview: Option<DistancePreviewOut>,
    error: Option<String>,
}

async fn build_index(
    state: &AppState,
    year: i32,
    query: String,
    form: Option<TripFormValues>,
    extras: PageExtras,
) -> Result<IndexTemplate, AppError> {
    let (year_trips, summary) = tokio::try_join!(
        trips::list_trips(&state.db, Some(year)),
        trips::summary(&state.db, year)
    )?;
    let mut known = trips::known_years(&state.db).await?;
    let saved = locations::list_locations(&state.db).await?;

    let today = Local::now().date_naive();
    if !known.contains(&today.year()) {
        known.push(today.year());
    }
    if !known.contains(&year) {
        known.push(year);
    }
    known.sort_unstable_by(|a, b| b.cmp(a));
    let years = known
        .into_iter()
        .map(|y| SelectOption {
            value: y.to_string(),
            selected: y == year,
        })
        .collect();

    let form = form.unwrap_or_else(|| TripFormValues {
        trip_date: today.format("%Y-%m-%d").to_string(),
        origin: saved
            .iter()
            .find(|loc| loc.is_home)
            .map(SavedLocation::full_address)
            .unwrap_or_default(),
        round_trip: true,
        travel_mode: TravelMode::Drive.as_str().to_string(),
        ..TripFormValues::default()
    });
    let travel_modes = TRAVEL_MODES
        .iter()
        .map(|mode| SelectOption {
            value: mode.as_str().to_string(),
            selected: form.travel_mode.eq_ignore_ascii_case(mode.as_str()),
        })
        .collect();

    let filtered = listing::filter_trips(year_trips, &query);
    let shown_count = filtered.len();

    Ok(IndexTemplate {
        year,
        years,
        query,
        summary,
        groups: listing::group_by_month(filtered),
        shown_count,
        locations: saved,
        form,
        travel_modes,
        preview: extras.preview,
        show_error: extras.error.is_some(),
        error_message: extras.error.unwrap_or_default(),
    })
}

async fn index(
    State(state): State<AppState>,
    Query(params): Query<IndexQuery>,
) -> Result<impl IntoResponse, AppError> {
    let (year, year_error) = resolve_year(params.year.as_deref(), current_year());
    let prefilled = params.date.is_some() || params.purpose.is_some() || params.destination.is_some();

    let mut page = build_index(
        &state,
        year,
        params.q.unwrap_or_default(),
        None,
        PageExtras {
            preview: None,
            error: year_error,
        },
    )
    .await?;

    if prefilled {
        if let Some(date) = params.date.filter(|d| !d.trim().is_empty()) {
            page.form.trip_date = date;
        }
        if let Some(purpose) = params.purpose {
            page.form.purpose = purpose;
        }
        if let Some(destination) = params.destination {
            page.form.destination = destination;
        }
    }

    Ok(AskamaTemplateResponse::into_response(page))
}

#[derive(Deserialize)]
struct TripForm {
    trip_date: String,
    purpose: String,
    origin: String,
    destination: String,
    round_trip: Option<String>,
    travel_mode: Option<String>,
}

impl TripForm {
    fn values(&self) -> TripFormValues {
        TripFormValues {
            trip_date: self.trip_date.clone(),
            purpose: self.purpose.clone(),
            origin: self.origin.clone(),
            destination: self.destination.clone(),
            round_trip: self.round_trip.is_some(),
            travel_mode: self.travel_mode(),
        }
    }

    fn travel_mode(&self) -> String {
        self.travel_mode
            .clone()
            .filter(|mode| !mode.trim().is_empty())
            .unwrap_or_else(|| TravelMode::Drive.as_str().to_string())
    }

    fn to_create(&self) -> Result<TripCreate, AppError> {
        Ok(TripCreate {
            trip_date: parse_form_date(&self.trip_date)?,
            purpose: self.purpose.clone(),
            origin: self.origin.clone(),
            destination: self.destination.clone(),
            round_trip: self.round_trip.is_some(),
            travel_mode: self.travel_mode(),
        })
    }
}

fn parse_form_date(raw: &str) -> Result<NaiveDate, AppError> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|_| AppError::Validation("Ugyldig dato".into()))
}

async fn render_form_error(
    state: &AppState,
    form: &TripForm,
    err: AppError,
) -> Result<Response, AppError> {
    warn!("trip form rejected: {err}");
    let year = parse_form_date(&form.trip_date)
        .map(|d| d.year())
        .unwrap_or_else(|_| current_year());
    let page = build_index(
        state,
        year,
        String::new(),
        Some(form.values()),
        PageExtras {
            preview: None,
            error: Some(err.to_string()),
        },
    )
    .await?;
    Ok(render_with_status(err.status(), page))
}

async fn trip_submit(
    State(state): State<AppState>,
    Form(form): Form<TripForm>,
) -> Result<Response, AppError> {
    let created = match form.to_create() {
        Ok(payload) => trips::create_trip(&state, &payload).await,
        Err(err) => Err(err),
    };
    match created {
        Ok(trip) => Ok(year_redirect(trip.year()).into_response()),
        Err(err) => render_form_error(&state, &form, err).await,
    }
}

async fn preview_submit(
    State(state): State<AppState>,
    Form(form): Form<TripForm>,
) -> Result<Response, AppError> {
    let payload = DistancePreview {
        origin: form.origin.clone(),
        destination: form.destination.clone(),
        round_trip: form.round_trip.is_some(),
        travel_mode: form.travel_mode(),
    };
    match trips::preview_distance(state.distance.as_ref(), &payload).await {
        Ok(preview) => {
            let year = parse_form_date(&form.trip_date)
                .map(|d| d.year())
                .unwrap_or_else(|_| current_year());
            let page = build_index(
                &state,
                year,
                String::new(),
                Some(form.values()),
                PageExtras {
                    preview: Some(preview),
                    error: None,
                },
            )
            .await?;
            Ok(AskamaTemplateResponse::into_response(page))
        }
        Err(err) => render_form_error(&state, &form, err).await,
    }
}

#[derive(Template)]
#[template(path = "trip_edit.html")]
struct TripEditTemplate {
    trip: Trip,
    trip_date: String,
    purpose: String,
    show_error: bool,
    error_message: String,
}

async fn trip_edit_form(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let trip = trips::get_trip(&state.db, id).await?;
    Ok(AskamaTemplateResponse::into_response(TripEditTemplate {
        trip_date: trip.trip_date.format("%Y-%m-%d").to_string(),
        purpose: trip.purpose.clone(),
        trip,
        show_error: false,
        error_message: String::new(),
    }))
}

#[derive(Deserialize)]
struct TripEditForm {
    trip_date: String,
    purpose: String,
}

async fn trip_edit_submit(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Form(form): Form<TripEditForm>,
) -> Result<Response, AppError> {
    let updated = match parse_form_date(&form.trip_date) {
        Ok(date) => {
            let patch = TripUpdate {
                trip_date: Some(date),
                purpose: Some(form.purpose.clone()),
            };
            trips::update_trip(&state.db, id, &patch).await
        }
        Err(err) => Err(err),
    };

    match updated {
        Ok(trip) => Ok(year_redirect(trip.year()).into_response()),
        Err(AppError::NotFound(msg)) => Err(AppError::NotFound(msg)),
        Err(err) => {
            let trip = trips::get_trip(&state.db, id).await?;
            Ok(render_with_status(
                err.status(),
                TripEditTemplate {
                    trip,
                    trip_date: form.trip_date,
                    purpose: form.purpose,
                    show_error: true,
                    error_message: err.to_string(),
                },
            ))
        }
    }
}

async fn trip_delete(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Redirect, AppError> {
    let removed = trips::delete_trip(&state.db, id).await?;
    Ok(year_redirect(removed.year()))
}

struct CalendarRow {
    event: CalendarEvent,
    prefill_href: String,
}

#[derive(Template)]
#[template(path = "calendar.html")]
struct CalendarTemplate {
    configured: bool,
    events: Vec<CalendarRow>,
    show_error: bool,
    error_message: String,
}

fn prefill_href(event: &CalendarEvent) -> String {
    let mut query = form_urlencoded::Serializer::new(String::new());
    query
        .append_pair("date", &event.date)
        .append_pair("purpose", &event.title)
        .append_pair("destination", &event.location);
    if let Some(year) = event.date.get(..4).and_then(|y| y.parse::<i32>().ok()) {
        query.append_pair("year", &year.to_string());
    }
    format!("/?{}", query.finish())
}

async fn calendar_page(State(state): State<AppState>) -> impl IntoResponse {
    let template = match state.calendar.upcoming_events().await {
        Ok(events) => CalendarTemplate {
            configured: true,
            events: events
                .into_iter()
                .map(|event| CalendarRow {
                    prefill_href: prefill_href(&event),
                    event,
                })
                .collect(),
            show_error: false,
            error_message: String::new(),
        },
        Err(err) if err.is_not_configured() => CalendarTemplate {
            configured: false,
            events: Vec::new(),
            show_error: false,
            error_message: String::new(),
        },
        Err(err) => {
            warn!("calendar unavailable: {err}");
            CalendarTemplate {
                configured: true,
                events: Vec::new(),
                show_error: true,
                error_message: err.to_string(),
            }
        }
    };
    AskamaTemplateResponse::into_response(template)
}

#[derive(Template)]
#[template(path = "locations.html")]
struct LocationsTemplate {
    locations: Vec<SavedLocation>,
    show_error: bool,
    error_message: String,
}

async fn locations_page(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let saved = locations::list_locations(&state.db).await?;
    Ok(AskamaTemplateResponse::into_response(LocationsTemplate {
        locations: saved,
        show_error: false,
        error_message: String::new(),
    }))
}

#[derive(Deserialize)]
struct LocationForm {
    name: String,
    address: String,
    postal_code: Option<String>,
    is_home: Option<String>,
}

async fn location_submit(
    State(state): State<AppState>,
    Form(form): Form<LocationForm>,
) -> Result<Response, AppError> {
    let payload = LocationCreate {
        name: form.name,
        address: form.address,
        postal_code: form.postal_code,
        is_home: form.is_home.is_some(),
    };
    match locations::create_location(&state.db, &payload).await {
        Ok(_) => Ok(Redirect::to("/locations").into_response()),
        Err(err @ AppError::Validation(_)) => {
            let saved = locations::list_locations(&state.db).await?;
            Ok(render_with_status(
                err.status(),
                LocationsTemplate {
                    locations: saved,
                    show_error: true,
                    error_message: err.to_string(),
                },
            ))
        }
        Err(err) => Err(err),
    }
}

async fn location_delete(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Redirect, AppError> {
    locations::delete_location(&state.db, id).await?;
    Ok(Redirect::to("/locations"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn calendar_prefill_link_is_url_encoded() {
        let href = prefill_href(&CalendarEvent {
            date: "2025-01-22".into(),
            title: "Salgsmøde & frokost".into(),
            location: "Vesterbrogade 1, 1620 København V".into(),
        });
        assert!(href.starts_with("/?date=2025-01-22&purpose=Salgsm%C3%B8de+%26+frokost"));
        assert!(href.contains("destination=Vesterbrogade+1%2C+1620+K%C3%B8benhavn+V"));
        assert!(href.ends_with("&year=2025"));
    }

    #[test]
    fn unusable_years_fall_back_with_a_message() {
        assert_eq!(resolve_year(Some("2024"), 2026), (2024, None));
        assert_eq!(resolve_year(None, 2026), (2026, None));
        assert_eq!(resolve_year(Some(" "), 2026), (2026, None));

        let (year, message) = resolve_year(Some("999999"), 2026);
        assert_eq!(year, 2026);
        assert_eq!(message.as_deref(), Some("Ugyldigt år: 999999"));

        let (year, message) = resolve_year(Some("abc"), 2026);
        assert_eq!(year, 2026);
        assert!(message.is_some());
    }

    #[test]
    fn form_dates_must_be_iso() {
        assert!(parse_form_date("2025-01-22").is_ok());
        assert!(parse_form_date("22/01/2025").is_err());
    }
}
