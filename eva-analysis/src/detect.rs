//! Use-case presence detector
//!
//! For each use case, counts how many of its required signals exist in
//! the measurement's channel set (variant-tolerant lookup) and
//! classifies the UC as DETECTABLE, PARTIEL or INDISPONIBLE.

use crate::types::{ChannelSet, DetectionRow, UcStatus, UseCaseMap};

/// Run detection over every use case of the map.
///
/// A use case with zero required signals is reported INDISPONIBLE,
/// never DETECTABLE.
pub fn detect_from_presence(uc_map: &UseCaseMap, channels: &ChannelSet) -> Vec<DetectionRow> {
    let mut rows = Vec::with_capacity(uc_map.len());

    for (uc, pairs) in uc_map.iter() {
        let required = pairs.len();
        let mut present = 0usize;
        let mut missing: Vec<&str> = Vec::new();

        for (name, _bpres) in pairs {
            if channels.contains_variant(name) {
                present += 1;
            } else {
                missing.push(name.as_str());
            }
        }

        let status = if required > 0 && present == required {
            UcStatus::Detectable
        } else if present > 0 {
            UcStatus::Partiel
        } else {
            UcStatus::Indisponible
        };

        log::debug!(
            "UC '{}': {}/{} signals present → {}",
            uc,
            present,
            required,
            status
        );

        rows.push(DetectionRow {
            uc: uc.to_string(),
            required,
            present,
            missing: missing.join(", "),
            status,
        });
    }

    rows
}

#[cfg(test)]
mod tests {
    use super::*;

    fn uc(name: &str, signals: &[&str]) -> (String, Vec<(String, Option<String>)>) {
        (
            name.to_string(),
            signals.iter().map(|s| (s.to_string(), None)).collect(),
        )
    }

    fn map_of(entries: Vec<(String, Vec<(String, Option<String>)>)>) -> UseCaseMap {
        let mut map = UseCaseMap::new();
        for (name, signals) in entries {
            map.insert(name, signals);
        }
        map
    }

    #[test]
    fn test_all_signals_present_is_detectable() {
        let map = map_of(vec![uc("UC 1.1", &["BCM_WakeupSleepCommand", "MotorSpeed"])]);
        let channels = ChannelSet::from_names(["BCM_WakeupSleepCommand", "MotorSpeed"]);

        let rows = detect_from_presence(&map, &channels);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].status, UcStatus::Detectable);
        assert_eq!(rows[0].required, 2);
        assert_eq!(rows[0].present, 2);
        assert!(rows[0].missing.is_empty());
    }

    #[test]
    fn test_partial_presence() {
        let map = map_of(vec![uc("UC 1.2", &["TractionCommand", "MotorSpeed"])]);
        let channels = ChannelSet::from_names(["MotorSpeed"]);

        let rows = detect_from_presence(&map, &channels);
        assert_eq!(rows[0].status, UcStatus::Partiel);
        assert_eq!(rows[0].missing, "TractionCommand");
    }

    #[test]
    fn test_no_signals_present() {
        let map = map_of(vec![uc("UC 1.3", &["StopCommand"])]);
        let channels = ChannelSet::from_names(["MotorSpeed"]);

        let rows = detect_from_presence(&map, &channels);
        assert_eq!(rows[0].status, UcStatus::Indisponible);
    }

    #[test]
    fn test_case_variant_counts_as_present() {
        let map = map_of(vec![uc("UC 1.1", &["Powerrelaystate"])]);
        let channels = ChannelSet::from_names(["powerrelaystate"]);

        let rows = detect_from_presence(&map, &channels);
        assert_eq!(rows[0].status, UcStatus::Detectable);
    }

    #[test]
    fn test_zero_required_signals_is_indisponible() {
        let map = map_of(vec![uc("UC 9.9", &[])]);
        let channels = ChannelSet::from_names(["Anything"]);

        let rows = detect_from_presence(&map, &channels);
        assert_eq!(rows[0].status, UcStatus::Indisponible);
        assert_eq!(rows[0].required, 0);
        assert_eq!(rows[0].present, 0);
    }
}
