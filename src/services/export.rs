//! Semicolon-separated export in the layout Danish accounting tools expect.

use crate::models::trip::Trip;

pub const HEADER: [&str; 8] = [
    "Dato",
    "Beskrivelse",
    "Erhverv",
    "Fra",
    "Til",
    "Frem (km)",
    "Tilbage (km)",
    "Total (km)",
];

const DELIMITER: char = ';';
const LINE_END: &str = "\r\n";

pub fn filename(year: i32) -> String {
    format!("koerselsgodtgoerelse_{year}.csv")
}

/// One decimal, comma as decimal separator.
pub fn danish_km(km: f64) -> String {
    format!("{km:.1}").replace('.', ",")
}

fn quote(field: &str) -> String {
    if field.contains([DELIMITER, '"', '\r', '\n']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

fn push_record<S: AsRef<str>>(out: &mut String, fields: &[S]) {
    let line = fields
        .iter()
        .map(|field| quote(field.as_ref()))
        .collect::<Vec<_>>()
        .join(";");
    out.push_str(&line);
    out.push_str(LINE_END);
}

pub fn render_csv(trips: &[Trip]) -> String {
    let mut out = String::new();
    push_record(&mut out, &HEADER);

    for trip in trips {
        let one_way = trip.one_way_km();
        let back = if trip.round_trip {
            danish_km(one_way)
        } else {
            "0".to_string()
        };
        push_record(
            &mut out,
            &[
                trip.trip_date.format("%Y-%m-%d").to_string(),
                trip.purpose.clone(),
                "1".to_string(),
                trip.origin.clone(),
                trip.destination.clone(),
                danish_km(one_way),
                back,
                danish_km(trip.distance_km),
            ],
        );
    }
    out
}
