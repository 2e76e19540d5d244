//! SWEET mapping filters and status computer
//!
//! Mapping rows come from the flux workbook, get filtered by the MyF
//! variant selection and the PVAL requirement id set, then each row is
//! labeled OK / Fallback / NOK against the measurement's channel set.

use std::collections::HashSet;

use crate::types::{ChannelSet, MappingRow, SweetStatus};

/// Keep only the rows applicable to the selected MyF variant.
///
/// A row applies when its variant column holds "1". `None` keeps every
/// row (the "All MyF versions" selection).
pub fn filter_by_myf(rows: Vec<MappingRow>, myf: Option<&str>) -> Vec<MappingRow> {
    let Some(variant) = myf else {
        return rows;
    };
    let before = rows.len();
    let kept: Vec<MappingRow> = rows
        .into_iter()
        .filter(|row| row.myf_flag(variant) == Some("1"))
        .collect();
    log::debug!("MyF filter '{}': {} → {} rows", variant, before, kept.len());
    kept
}

/// Apply the PVAL requirement filter.
///
/// With a non-empty id set, only rows whose Exigence appears in the
/// set survive, marked confirmed. With an empty set every row is
/// retained but flagged not-confirmed, so the report still shows the
/// full mapping.
pub fn filter_by_pval(mut rows: Vec<MappingRow>, doors_ids: &HashSet<String>) -> Vec<MappingRow> {
    if doors_ids.is_empty() {
        log::warn!("Empty PVAL requirement set; keeping all mapping rows unconfirmed");
        for row in &mut rows {
            row.pval_confirmed = false;
        }
        return rows;
    }
    rows.retain_mut(|row| {
        row.pval_confirmed = doors_ids.contains(&row.exigence);
        row.pval_confirmed
    });
    rows
}

/// Label each row against the channel set.
///
/// OK if the primary ("Signal MDF trouvé") name is an exact channel,
/// Fallback if the "CAN Fallback" name is, NOK otherwise. Empty cell
/// values never match.
pub fn compute_sweet_status(mut rows: Vec<MappingRow>, channels: &ChannelSet) -> Vec<MappingRow> {
    for row in &mut rows {
        let primary = row.found_name.trim();
        let fallback = row.can_fallback.trim();

        let status = if !primary.is_empty() && channels.contains_exact(primary) {
            SweetStatus::Ok
        } else if !fallback.is_empty() && channels.contains_exact(fallback) {
            SweetStatus::Fallback
        } else {
            SweetStatus::Nok
        };
        row.statut = Some(status);
    }
    rows
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mapping_row(found: &str, fallback: &str, exigence: &str) -> MappingRow {
        MappingRow::from_columns([
            format!("{}_SWEET", found),
            found.to_string(),
            fallback.to_string(),
            "Rx".to_string(),
            "1".to_string(),
            "1".to_string(),
            "0".to_string(),
            "N/A".to_string(),
            exigence.to_string(),
            "HV".to_string(),
            "HEVC_001".to_string(),
        ])
    }

    #[test]
    fn test_primary_present_is_ok() {
        let channels = ChannelSet::from_names(["PowerRelayState"]);
        let rows = compute_sweet_status(vec![mapping_row("PowerRelayState", "", "REQ_1")], &channels);
        assert_eq!(rows[0].statut, Some(SweetStatus::Ok));
    }

    #[test]
    fn test_fallback_only_is_fallback_never_ok() {
        let channels = ChannelSet::from_names(["PowerRelayState_CAN"]);
        let rows = compute_sweet_status(
            vec![mapping_row("PowerRelayState", "PowerRelayState_CAN", "REQ_1")],
            &channels,
        );
        assert_eq!(rows[0].statut, Some(SweetStatus::Fallback));
    }

    #[test]
    fn test_neither_present_is_nok() {
        let channels = ChannelSet::from_names(["MotorSpeed"]);
        let rows = compute_sweet_status(
            vec![mapping_row("PowerRelayState", "PowerRelayState_CAN", "REQ_1")],
            &channels,
        );
        assert_eq!(rows[0].statut, Some(SweetStatus::Nok));
    }

    #[test]
    fn test_sweet_status_is_exact_match_only() {
        // Variant tolerance belongs to the detector, not here
        let channels = ChannelSet::from_names(["powerrelaystate"]);
        let rows = compute_sweet_status(vec![mapping_row("PowerRelayState", "", "REQ_1")], &channels);
        assert_eq!(rows[0].statut, Some(SweetStatus::Nok));
    }

    #[test]
    fn test_pval_filter_with_ids() {
        let doors: HashSet<String> = ["REQ_1".to_string()].into_iter().collect();
        let rows = filter_by_pval(
            vec![mapping_row("A", "", "REQ_1"), mapping_row("B", "", "REQ_2")],
            &doors,
        );
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].exigence, "REQ_1");
        assert!(rows[0].pval_confirmed);
    }

    #[test]
    fn test_empty_pval_set_keeps_all_unconfirmed() {
        let rows = filter_by_pval(
            vec![mapping_row("A", "", "REQ_1"), mapping_row("B", "", "REQ_2")],
            &HashSet::new(),
        );
        assert_eq!(rows.len(), 2);
        assert!(rows.iter().all(|r| !r.pval_confirmed));
    }

    #[test]
    fn test_myf_filter() {
        let rows = vec![mapping_row("A", "", "REQ_1")];
        // MyF4 flag is "0" in the fixture
        assert!(filter_by_myf(rows.clone(), Some("MyF4")).is_empty());
        assert_eq!(filter_by_myf(rows.clone(), Some("MyF2")).len(), 1);
        assert_eq!(filter_by_myf(rows, None).len(), 1);
    }
}
