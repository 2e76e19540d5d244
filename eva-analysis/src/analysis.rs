//! Analysis pipeline
//!
//! Ties the readers, detector, verifier and sweet-status computer
//! together into one synchronous run. Every stage degrades on its own:
//! a missing workbook or unreadable measurement empties the tables it
//! feeds and the remaining stages still run, so a partial report is
//! always produced.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::catalog::{builtin_catalog, catalog_signals};
use crate::detect::detect_from_presence;
use crate::formats;
use crate::report;
use crate::sweet::{compute_sweet_status, filter_by_myf, filter_by_pval};
use crate::types::{ChannelSet, DetectionRow, MappingRow, SweetMode, UseCaseMap, VerificationRow};
use crate::verify::verify_all;
use crate::workbook;

/// Inputs for one analysis run
#[derive(Debug, Clone)]
pub struct AnalysisContext {
    /// Labels workbook (UC membership, sheet "Feuil3")
    pub labels_path: PathBuf,
    /// Flux workbook (SWEET signal mapping)
    pub flux_path: PathBuf,
    /// PVAL workbook (confirmed DOORS requirements, sheet "REQ")
    pub pval_path: PathBuf,
    /// Which SWEET mapping sheet family to read
    pub mode: SweetMode,
    /// Optional MyF variant filter ("2".."5")
    pub myf: Option<String>,
    /// Vehicle identification number shown in the report header
    pub vin: String,
    /// Software id shown in the report header
    pub swid: String,
}

/// Everything one run produced
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisOutcome {
    /// Channel names found in the measurement file
    pub channels: Vec<String>,
    /// UC -> required signals, as read from the labels workbook
    pub uc_map: UseCaseMap,
    /// Detection result per UC
    pub uc_table: Vec<DetectionRow>,
    /// SWEET mapping rows after MyF/PVAL filtering, statuses filled
    pub sweet_rows: Vec<MappingRow>,
    /// Requirement verification results
    pub verification: Vec<VerificationRow>,
    /// Report header key/value pairs, in display order
    pub meta: Vec<(String, String)>,
}

/// Run the full pipeline over one measurement file.
///
/// `measurement` may be `None` when only the spreadsheet side is of
/// interest; the channel set is then empty and every UC comes out
/// INDISPONIBLE.
pub fn run_analysis(measurement: Option<&Path>, ctx: &AnalysisContext) -> AnalysisOutcome {
    let channels = match measurement {
        Some(path) => formats::list_channels(path),
        None => {
            log::warn!("No measurement file given; channel set is empty");
            ChannelSet::new()
        }
    };

    let uc_map = workbook::read_membership(&ctx.labels_path);
    let uc_table = detect_from_presence(&uc_map, &channels);
    log::info!("{} use cases detected from {:?}", uc_table.len(), ctx.labels_path);

    let mapping = workbook::read_mapping(&ctx.flux_path, ctx.mode);
    let mapping = filter_by_myf(mapping, ctx.myf.as_deref());
    let doors_ids = workbook::read_pval_requirements(&ctx.pval_path);
    let mapping = filter_by_pval(mapping, &doors_ids);
    let sweet_rows = compute_sweet_status(mapping, &channels);

    let catalog = builtin_catalog();
    let samples = match measurement {
        Some(path) => formats::read_samples(path, &catalog_signals(&catalog)),
        None => Default::default(),
    };
    let verification = verify_all(&catalog, &samples);

    let mut meta = vec![
        ("VIN".to_string(), ctx.vin.clone()),
        ("SWID".to_string(), ctx.swid.clone()),
        (
            "Fichier mesure".to_string(),
            measurement
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "(aucun)".to_string()),
        ),
        ("Mode".to_string(), ctx.mode.to_string()),
    ];
    if let Some(variant) = &ctx.myf {
        meta.push(("MyF".to_string(), format!("MyF{variant}")));
    }

    let mut names: Vec<String> = channels.iter().map(str::to_string).collect();
    names.sort();

    AnalysisOutcome {
        channels: names,
        uc_map,
        uc_table,
        sweet_rows,
        verification,
        meta,
    }
}

/// Render the outcome as a standalone HTML document
pub fn render_report(outcome: &AnalysisOutcome) -> String {
    report::render(
        &outcome.meta,
        &outcome.uc_table,
        &outcome.sweet_rows,
        &outcome.uc_map,
        &outcome.verification,
        &[],
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn missing_ctx() -> AnalysisContext {
        AnalysisContext {
            labels_path: PathBuf::from("/nonexistent/labels.xlsx"),
            flux_path: PathBuf::from("/nonexistent/flux.xlsx"),
            pval_path: PathBuf::from("/nonexistent/pval.xlsx"),
            mode: SweetMode::Sweet400,
            myf: None,
            vin: "VF1TEST".to_string(),
            swid: "SW 1.0".to_string(),
        }
    }

    #[test]
    fn test_run_without_any_input_degrades_to_empty_tables() {
        let outcome = run_analysis(None, &missing_ctx());

        assert!(outcome.channels.is_empty());
        assert!(outcome.uc_table.is_empty());
        assert!(outcome.sweet_rows.is_empty());
        // Builtin requirements are still verified; all NOK for lack of data.
        assert!(!outcome.verification.is_empty());
        assert!(outcome
            .verification
            .iter()
            .all(|r| r.status == crate::types::VerificationStatus::Nok));
    }

    #[test]
    fn test_degraded_run_still_renders_a_report() {
        let outcome = run_analysis(None, &missing_ctx());
        let html = render_report(&outcome);

        assert!(html.contains("Aucun UC listé"));
        assert!(html.contains("VF1TEST"));
        assert!(html.contains("sweet400"));
    }

    #[test]
    fn test_meta_includes_myf_only_when_set() {
        let mut ctx = missing_ctx();
        let without = run_analysis(None, &ctx);
        assert!(!without.meta.iter().any(|(k, _)| k == "MyF"));

        ctx.myf = Some("3".to_string());
        let with = run_analysis(None, &ctx);
        assert!(with.meta.iter().any(|(k, v)| k == "MyF" && v == "MyF3"));
    }
}
