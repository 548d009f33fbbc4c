//! Example: Download a 3DEP or NASADEM DEM and summarize it.
//!
//! Usage: cargo run --example fetch_dem -- <west> <south> <east> <north> [3dep|nasadem] [out.tif]

use std::env;
use std::time::Instant;
use wbt_dem::{get_3dep, get_nasadem, tif_to_array};

fn main() {
    let args: Vec<String> = env::args().collect();

    if args.len() < 5 {
        eprintln!("Usage: {} <west> <south> <east> <north> [3dep|nasadem] [out.tif]", args[0]);
        eprintln!("Example: {} -95.3 29.6 -95.2 29.7 3dep dem.tif", args[0]);
        std::process::exit(1);
    }

    let coords: Vec<f64> = args[1..5]
        .iter()
        .map(|s| s.parse().expect("Invalid coordinate"))
        .collect();
    let bbox = (coords[0], coords[1], coords[2], coords[3]);
    let source = args.get(5).map(|s| s.as_str()).unwrap_or("3dep");
    let out = args.get(6).map(|s| s.as_str()).unwrap_or("dem.tif");

    println!("Fetching {} DEM for {:?}...", source, bbox);
    let start = Instant::now();

    let result = match source {
        "3dep" => get_3dep(bbox, out, 30, true),
        "nasadem" => get_nasadem(bbox, out, true),
        other => {
            eprintln!("Unknown source: {}", other);
            std::process::exit(1);
        }
    };
    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
    println!("Saved {} in {:.2}s", out, start.elapsed().as_secs_f64());

    match tif_to_array(out, None, Some("elevation"), None, None) {
        Ok(dem) => {
            let (rows, cols) = dem.shape();
            println!("Shape: {} rows x {} cols", rows, cols);
            println!("CRS: EPSG:{}", dem.crs.map_or("unknown".to_string(), |c| c.to_string()));
            if let Some(mean) = dem.mean() {
                println!("Mean elevation: {:.2} meters", mean);
            }
        }
        Err(e) => {
            eprintln!("Error reading {}: {}", out, e);
            std::process::exit(1);
        }
    }
}
