use chrono::Datelike;

use crate::{models::trip::Trip, rates::round_to};

const MONTHS_DA: [&str; 12] = [
    "januar",
    "februar",
    "marts",
    "april",
    "maj",
    "juni",
    "juli",
    "august",
    "september",
    "oktober",
    "november",
    "december",
];

#[derive(Debug, Clone)]
pub struct MonthGroup {
    pub month: u32,
    pub label: String,
    pub trips: Vec<Trip>,
    pub total_km: f64,
}

#[derive(Debug, Clone)]
pub struct YearGroup {
    pub year: i32,
    pub months: Vec<MonthGroup>,
    pub trip_count: usize,
    pub total_km: f64,
}

pub fn month_label(month: u32) -> &'static str {
    MONTHS_DA
        .get(month.saturating_sub(1) as usize)
        .copied()
        .unwrap_or("")
}

/// Case-insensitive match on purpose, origin and destination. A blank query keeps everything.
pub fn filter_trips(trips: Vec<Trip>, query: &str) -> Vec<Trip> {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return trips;
    }
    trips
        .into_iter()
        .filter(|trip| {
            [&trip.purpose, &trip.origin, &trip.destination]
                .iter()
                .any(|field| field.to_lowercase().contains(&needle))
        })
        .collect()
}

/// Groups trips by year, then month, keeping the incoming order.
pub fn group_by_month(trips: Vec<Trip>) -> Vec<YearGroup> {
    let mut years: Vec<YearGroup> = Vec::new();

    for trip in trips {
        let year = trip.trip_date.year();
        let month = trip.trip_date.month();

        if years.last().map(|g| g.year) != Some(year) {
            years.push(YearGroup {
                year,
                months: Vec::new(),
                trip_count: 0,
                total_km: 0.0,
            });
        }
        let Some(year_group) = years.last_mut() else {
            continue;
        };

        if year_group.months.last().map(|m| m.month) != Some(month) {
            year_group.months.push(MonthGroup {
                month,
                label: format!("{} {year}", month_label(month)),
                trips: Vec::new(),
                total_km: 0.0,
            });
        }
        let Some(month_group) = year_group.months.last_mut() else {
            continue;
        };

        month_group.total_km += trip.distance_km;
        year_group.total_km += trip.distance_km;
        year_group.trip_count += 1;
        month_group.trips.push(trip);
    }

    for year in &mut years {
        year.total_km = round_to(year.total_km, 1);
        for month in &mut year.months {
            month.total_km = round_to(month.total_km, 1);
        }
    }
    years
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, Utc};

    use super::*;

    fn trip(id: i64, date: (i32, u32, u32), purpose: &str, km: f64) -> Trip {
        Trip {
            id,
            trip_date: NaiveDate::from_ymd_opt(date.0, date.1, date.2).unwrap(),
            purpose: purpose.into(),
            origin: "Platanvej 7, 2791".into(),
            destination: "Kanalvej 7, 2800 Kgs. Lyngby".into(),
            round_trip: true,
            travel_mode: "DRIVE".into(),
            distance_km: km,
            distance_one_way_km: Some(km / 2.0),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn blank_query_keeps_everything() {
        let trips = vec![trip(1, (2025, 1, 2), "Møde", 10.0)];
        assert_eq!(filter_trips(trips, "   ").len(), 1);
    }

    #[test]
    fn search_matches_any_text_field_case_insensitively() {
        let trips = vec![
            trip(1, (2025, 1, 2), "Workshop hos Microsoft", 10.0),
            trip(2, (2025, 1, 3), "Salgsmøde", 12.0),
        ];
        let hits = filter_trips(trips.clone(), "MICROSOFT");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, 1);

        assert_eq!(filter_trips(trips, "lyngby").len(), 2);
    }

    #[test]
    fn groups_by_year_and_month_in_order() {
        let trips = vec![
            trip(4, (2025, 3, 20), "a", 10.0),
            trip(3, (2025, 3, 2), "b", 5.6),
            trip(2, (2025, 1, 15), "c", 1.0),
            trip(1, (2024, 12, 31), "d", 2.0),
        ];
        let groups = group_by_month(trips);
        assert_eq!(groups.len(), 2);

        let current = &groups[0];
        assert_eq!(current.year, 2025);
        assert_eq!(current.trip_count, 3);
        assert_eq!(current.months.len(), 2);
        assert_eq!(current.months[0].label, "marts 2025");
        assert_eq!(current.months[0].trips.len(), 2);
        assert_eq!(current.months[0].total_km, 15.6);
        assert_eq!(current.total_km, 16.6);

        assert_eq!(groups[1].months[0].label, "december 2024");
    }

    #[test]
    fn month_labels_are_danish() {
        assert_eq!(month_label(5), "maj");
        assert_eq!(month_label(13), "");
    }
}
