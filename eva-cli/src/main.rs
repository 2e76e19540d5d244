//! EVA Report CLI Application
//!
//! Command-line front end for the eva-analysis library. It adds:
//! - Argument parsing with TOML-config defaults
//! - Logging setup
//! - Report writing (HTML, optional JSON of the raw outcome)

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;

use eva_analysis::{render_report, run_analysis, AnalysisContext, SweetMode};

mod config;

/// EVA Report - Cross-reference validation spreadsheets against a measurement file
#[derive(Parser, Debug)]
#[command(name = "eva-cli")]
#[command(about = "Generate the EVA availability report (MF4/CSV measurements)", long_about = None)]
#[command(version)]
struct Args {
    /// Path to the measurement file (MF4 or CSV); omit for a spreadsheet-only run
    #[arg(short, long, value_name = "FILE")]
    mdf: Option<PathBuf>,

    /// Labels workbook with the UC membership sheet (Feuil3)
    #[arg(long, value_name = "FILE")]
    labels: Option<PathBuf>,

    /// Flux workbook with the SWEET signal mapping
    #[arg(long, value_name = "FILE")]
    flux: Option<PathBuf>,

    /// PVAL workbook with the confirmed DOORS requirements
    #[arg(long, value_name = "FILE")]
    pval: Option<PathBuf>,

    /// SWEET mapping generation: sweet400 or sweet500
    #[arg(long, value_name = "MODE")]
    mode: Option<String>,

    /// MyF variant filter (2..5)
    #[arg(long, value_name = "N")]
    myf: Option<String>,

    /// Vehicle identification number shown in the report header
    #[arg(long, value_name = "VIN", default_value = "")]
    vin: String,

    /// Software id shown in the report header
    #[arg(long, value_name = "SWID", default_value = "")]
    swid: String,

    /// Output HTML file (default: rapport_eva.html)
    #[arg(short, long, value_name = "FILE")]
    out: Option<PathBuf>,

    /// Also write the raw outcome as JSON next to the report
    #[arg(long)]
    json: bool,

    /// Path to configuration file (config.toml) supplying defaults
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Verbosity level (can be repeated: -v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long)]
    quiet: bool,
}

fn main() -> Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    // Initialize logging
    init_logging(args.verbose, args.quiet);

    log::info!("EVA Report CLI v{}", env!("CARGO_PKG_VERSION"));
    log::info!("Using analysis library v{}", eva_analysis::VERSION);

    let defaults = match &args.config {
        Some(path) => {
            log::info!("Loading configuration from: {:?}", path);
            config::load_config(path)?
        }
        None => config::AppConfig::default(),
    };

    let Some(ctx) = build_context(&args, &defaults) else {
        // No usable inputs; print a quick start and return cleanly.
        println!("EVA Report - No spreadsheet inputs specified");
        println!("\nQuick Start:");
        println!("  eva-cli --mdf drive.mf4 --labels labels.xlsx --flux flux.xlsm --pval pval.xlsx");
        println!("  eva-cli --config eva.toml --mdf drive.mf4");
        println!("\nUse --help for more options");
        return Ok(());
    };

    let outcome = run_analysis(args.mdf.as_deref(), &ctx);

    let out_path = args
        .out
        .clone()
        .unwrap_or_else(|| PathBuf::from("rapport_eva.html"));
    let html = render_report(&outcome);
    if let Err(e) = std::fs::write(&out_path, html) {
        println!("Could not write report {:?}: {}", out_path, e);
        return Ok(());
    }
    println!("Report written: {:?}", out_path);

    if args.json {
        let json_path = out_path.with_extension("json");
        match serde_json::to_string_pretty(&outcome) {
            Ok(body) => {
                if let Err(e) = std::fs::write(&json_path, body) {
                    println!("Could not write JSON {:?}: {}", json_path, e);
                } else {
                    println!("Outcome written: {:?}", json_path);
                }
            }
            Err(e) => println!("Could not serialize outcome: {}", e),
        }
    }

    println!(
        "{} UCs, {} SWEET rows, {} requirements checked",
        outcome.uc_table.len(),
        outcome.sweet_rows.len(),
        outcome.verification.len()
    );

    Ok(())
}

/// Merge CLI arguments over config-file defaults into an analysis
/// context. Returns None when no spreadsheet path is available at all.
fn build_context(args: &Args, defaults: &config::AppConfig) -> Option<AnalysisContext> {
    let labels = args.labels.clone().or_else(|| defaults.inputs.labels.clone());
    let flux = args.flux.clone().or_else(|| defaults.inputs.flux.clone());
    let pval = args.pval.clone().or_else(|| defaults.inputs.pval.clone());

    if labels.is_none() && flux.is_none() && pval.is_none() && args.mdf.is_none() {
        return None;
    }

    let mode_text = args
        .mode
        .clone()
        .or_else(|| defaults.analysis.mode.clone())
        .unwrap_or_else(|| "sweet400".to_string());
    let mode = match mode_text.parse::<SweetMode>() {
        Ok(mode) => mode,
        Err(_) => {
            println!("Unknown mode '{}', falling back to sweet400", mode_text);
            SweetMode::Sweet400
        }
    };

    let myf = args.myf.clone().or_else(|| defaults.analysis.myf.clone());

    // Missing workbooks degrade to empty tables inside the library;
    // a placeholder path keeps the context total.
    let placeholder = PathBuf::new();
    Some(AnalysisContext {
        labels_path: labels.unwrap_or_else(|| placeholder.clone()),
        flux_path: flux.unwrap_or_else(|| placeholder.clone()),
        pval_path: pval.unwrap_or(placeholder),
        mode,
        myf,
        vin: non_empty(&args.vin)
            .or_else(|| defaults.vehicle.vin.clone())
            .unwrap_or_default(),
        swid: non_empty(&args.swid)
            .or_else(|| defaults.vehicle.swid.clone())
            .unwrap_or_default(),
    })
}

fn non_empty(text: &str) -> Option<String> {
    if text.trim().is_empty() {
        None
    } else {
        Some(text.to_string())
    }
}

/// Initialize logging based on verbosity level
fn init_logging(verbose: u8, quiet: bool) {
    use env_logger::Builder;
    use log::LevelFilter;
    use std::io::Write;

    let level = if quiet {
        LevelFilter::Error
    } else {
        match verbose {
            0 => LevelFilter::Info,
            1 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    };

    Builder::new()
        .filter_level(level)
        .format(|buf, record| {
            writeln!(
                buf,
                "[{} {}] {}",
                record.level(),
                record.target(),
                record.args()
            )
        })
        .init();
}
