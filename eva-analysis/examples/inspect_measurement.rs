//! Standalone measurement inspector
//!
//! Lists the channels of an MF4/CSV measurement file and, for the
//! signals the built-in requirement catalog needs, prints sample
//! counts and means.
//!
//! Usage:
//!   inspect_measurement <measurement.mf4|.csv> [--signal <name>] [--verbose]
//!
//! Example:
//!   inspect_measurement drive.mf4 --signal SOC_BMS --signal SOC_Affiche

use eva_analysis::catalog::{builtin_catalog, catalog_signals};
use eva_analysis::formats;
use std::env;
use std::path::PathBuf;

fn main() {
    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        eprintln!(
            "Usage: {} <measurement.mf4|.csv> [--signal <name>] [--verbose]",
            args[0]
        );
        eprintln!("\nExample:");
        eprintln!("  {} drive.mf4 --signal SOC_BMS --signal SOC_Affiche", args[0]);
        std::process::exit(1);
    }

    let measurement = PathBuf::from(&args[1]);
    let mut signals: Vec<String> = Vec::new();
    let mut verbose = false;

    // Parse arguments
    let mut i = 2;
    while i < args.len() {
        match args[i].as_str() {
            "--signal" => {
                i += 1;
                if i < args.len() {
                    signals.push(args[i].clone());
                }
            }
            "--verbose" | "-v" => {
                verbose = true;
            }
            other => {
                eprintln!("Unknown argument: {}", other);
            }
        }
        i += 1;
    }

    env_logger::Builder::new()
        .filter_level(if verbose {
            log::LevelFilter::Debug
        } else {
            log::LevelFilter::Warn
        })
        .init();

    if signals.is_empty() {
        signals = catalog_signals(&builtin_catalog());
        println!("No --signal given; using the requirement catalog signals");
    }

    println!("=== CHANNELS ===");
    let channels = formats::list_channels(&measurement);
    let mut names: Vec<&str> = channels.iter().collect();
    names.sort();
    println!("{} channels in {:?}", names.len(), measurement);
    if verbose {
        for name in &names {
            println!("  {}", name);
        }
    }

    println!("\n=== SAMPLES ===");
    let samples = formats::read_samples(&measurement, &signals);
    for name in &signals {
        match samples.get(name) {
            Some(data) if !data.is_empty() => {
                let mean = data.iter().sum::<f64>() / data.len() as f64;
                println!("{}: {} samples, mean {:.3}", name, data.len(), mean);
            }
            _ => println!("{}: not found", name),
        }
    }
}
