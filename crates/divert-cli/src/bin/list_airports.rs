//! Print the airport directory served by the decision server.
//!
//! Usage:
//!   cargo run -p divert-cli --bin list_airports -- --lat 50.0 --lon -45.0

use anyhow::Result;
use clap::Parser;
use divert_core::haversine_distance_nm;
use divert_sdk::DivertClient;

#[derive(Parser, Debug)]
#[command(author, version, about = "List airports known to the decision server")]
struct Args {
    /// Decision server URL
    #[arg(long, default_value = "http://localhost:3000")]
    url: String,

    /// Sort by distance from this latitude
    #[arg(long, requires = "lon", allow_hyphen_values = true)]
    lat: Option<f64>,

    /// Sort by distance from this longitude
    #[arg(long, requires = "lat", allow_hyphen_values = true)]
    lon: Option<f64>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let client = DivertClient::new(&args.url);
    let airports = client.list_airports().await?;

    let mut rows: Vec<_> = airports
        .iter()
        .map(|airport| {
            let distance = match (args.lat, args.lon) {
                (Some(lat), Some(lon)) => Some(haversine_distance_nm(lat, lon, airport.lat, airport.lon)),
                _ => None,
            };
            (airport, distance)
        })
        .collect();
    if args.lat.is_some() {
        rows.sort_by(|a, b| a.1.unwrap_or(f64::MAX).total_cmp(&b.1.unwrap_or(f64::MAX)));
    }

    println!(
        "{:<6} {:<28} {:>8} {:>4} {:>4} {:>4} {:>5} {:>9}",
        "CODE", "NAME", "RWY FT", "MED", "ARFF", "MRO", "24/7", "DIST NM"
    );
    for (airport, distance) in rows {
        let flag = |b: bool| if b { "y" } else { "-" };
        println!(
            "{:<6} {:<28} {:>8.0} {:>4} {:>4} {:>4} {:>5} {:>9}",
            airport.code,
            airport.name,
            airport.runway_length_ft,
            flag(airport.medical_facilities),
            flag(airport.fire_rescue),
            flag(airport.maintenance),
            flag(airport.operating_hours.is_24_7()),
            distance.map(|d| format!("{d:.0}")).unwrap_or_else(|| "-".to_string())
        );
    }
    println!("{} airports", airports.len());
    Ok(())
}
