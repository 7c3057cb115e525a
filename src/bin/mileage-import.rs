use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use mileage::{
    db::{init_pool, migrate},
    services::import,
};
use tracing::{info, warn};

/// Import historic trips from a semicolon-separated file in the export layout.
#[derive(Parser, Debug)]
#[command(name = "mileage-import", version, about)]
struct Args {
    /// CSV file to read
    #[arg(long, short)]
    file: PathBuf,

    /// Show what would be imported without writing anything
    #[arg(long)]
    dry_run: bool,

    #[arg(long, env = "DATABASE_URL", default_value = "sqlite://mileage.db")]
    database_url: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with_target(false)
        .init();

    let args = Args::parse();
    let raw = tokio::fs::read(&args.file)
        .await
        .with_context(|| format!("read {}", args.file.display()))?;
    let text = String::from_utf8_lossy(&raw);
    let text = text.trim_start_matches('\u{feff}');

    let parsed = import::parse_trips(text);
    info!(
        found = parsed.trips.len(),
        skipped = parsed.skipped.len(),
        "parsed {}",
        args.file.display()
    );
    for reason in parsed.skipped.iter().take(5) {
        warn!("skipped {reason}");
    }

    if args.dry_run {
        println!("[dry run] would import:");
        for trip in parsed.trips.iter().take(10) {
            let purpose: String = trip.purpose.chars().take(30).collect();
            println!(
                "  {} | {} | {:.1} km",
                trip.trip_date, purpose, trip.distance_km
            );
        }
        if parsed.trips.len() > 10 {
            println!("  ... and {} more", parsed.trips.len() - 10);
        }
        return Ok(());
    }

    let db = init_pool(&args.database_url)
        .await
        .context("open database")?;
    migrate(&db).await.context("run migrations")?;

    let outcome = import::import_trips(&db, &parsed.trips)
        .await
        .context("import trips")?;
    let (imported, duplicates) = (outcome.imported, outcome.duplicates);

    info!(imported, duplicates, skipped = parsed.skipped.len(), "import finished");
    println!("Imported {imported} trips, skipped {duplicates} duplicates");
    Ok(())
}
