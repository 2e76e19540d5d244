//! Core types for the EVA analysis library
//!
//! This module defines the data model shared by every stage of the
//! pipeline: the requirement catalog entries, the per-run channel set,
//! the sample arrays used for rule evaluation, and the transient result
//! rows that end up in the rendered report. Nothing here outlives a
//! single analysis run.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Result type for analysis operations
pub type Result<T> = std::result::Result<T, AnalysisError>;

/// Name → sample array mapping for the signals of one run.
///
/// Only the signals referenced by the requirement catalog are read;
/// a signal that could not be found in the measurement file maps to an
/// empty vector rather than being absent from the map.
pub type SignalSamples = HashMap<String, Vec<f64>>;

/// Errors that can occur during analysis
///
/// Most pipeline stages degrade to empty structures instead of
/// returning these (see the error handling notes in each module); the
/// variants below cover the failures that genuinely stop an operation.
#[derive(Debug, thiserror::Error)]
pub enum AnalysisError {
    #[error("Unsupported measurement file format: {0}")]
    UnsupportedFormat(String),

    #[error("Failed to parse measurement file: {0}")]
    MeasurementParseError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// SWEET signal-naming convention version (400 or 500)
///
/// Selects which workbook sheets the flux-mapping reader tries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SweetMode {
    Sweet400,
    Sweet500,
}

impl SweetMode {
    /// Candidate sheet names, in priority order
    pub fn candidate_sheets(&self) -> [&'static str; 3] {
        match self {
            SweetMode::Sweet400 => [
                "SYNTH_EVA Sweet 400",
                "Sweet 400 HEVC",
                "eva-mapping-sweet400",
            ],
            SweetMode::Sweet500 => [
                "SYNTH_EVA Sweet 500",
                "Sweet 500 HEVC",
                "eva-mapping-sweet500",
            ],
        }
    }
}

impl fmt::Display for SweetMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SweetMode::Sweet400 => write!(f, "sweet400"),
            SweetMode::Sweet500 => write!(f, "sweet500"),
        }
    }
}

impl std::str::FromStr for SweetMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "sweet400" | "400" => Ok(SweetMode::Sweet400),
            "sweet500" | "500" => Ok(SweetMode::Sweet500),
            other => Err(format!("unknown SWEET mode: {}", other)),
        }
    }
}

/// Verification logic attached to a catalog requirement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequirementLogic {
    /// Passes once every required signal is present with data
    AllPresent,
    /// Evaluates a boolean rule expression over the per-signal means
    Custom,
}

/// A single entry of the immutable requirement catalog
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Requirement {
    /// Requirement identifier (DOORS id, e.g. "REQ_6.519")
    pub id: String,
    /// Human readable label
    pub label: String,
    /// Signals that must be present in the measurement
    pub signals: Vec<String>,
    /// How the requirement is verified once signals are present
    pub logic: RequirementLogic,
    /// Rule expression for `Custom` logic (e.g. "abs(A - B) <= 5")
    pub rule: Option<String>,
    /// Free-text description shown in the report
    pub description: String,
}

/// Per-use-case detection status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UcStatus {
    /// Every required signal is present
    Detectable,
    /// Some, but not all, required signals are present
    Partiel,
    /// No required signal is present (or the UC lists none)
    Indisponible,
}

impl fmt::Display for UcStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UcStatus::Detectable => write!(f, "DETECTABLE"),
            UcStatus::Partiel => write!(f, "PARTIEL"),
            UcStatus::Indisponible => write!(f, "INDISPONIBLE"),
        }
    }
}

/// One detector output row (one per use case)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectionRow {
    /// Use case name (e.g. "UC 1.1")
    pub uc: String,
    /// Number of required signals
    pub required: usize,
    /// Number of required signals found in the channel set
    pub present: usize,
    /// Comma-joined names of the missing signals
    pub missing: String,
    /// Detection status
    pub status: UcStatus,
}

/// Verification status of one requirement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VerificationStatus {
    /// Requirement satisfied
    Ok,
    /// Requirement violated or signals missing
    Nok,
    /// Rule evaluation failed (parse error, unknown variable, ...)
    Error,
    /// Requirement logic not recognized
    Unknown,
}

impl fmt::Display for VerificationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VerificationStatus::Ok => write!(f, "OK"),
            VerificationStatus::Nok => write!(f, "NOK"),
            VerificationStatus::Error => write!(f, "ERROR"),
            VerificationStatus::Unknown => write!(f, "UNKNOWN"),
        }
    }
}

/// One verifier output row (one per catalog requirement)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationRow {
    /// Requirement identifier
    pub id: String,
    /// Human readable label
    pub label: String,
    /// Comma-joined required signal names
    pub signals: String,
    /// Verification status
    pub status: VerificationStatus,
    /// Status detail (missing signals, rule text, evaluation error)
    pub message: String,
    /// Catalog description
    pub description: String,
}

/// SWEET mapping status of one signal row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SweetStatus {
    /// Primary signal name found in the channel set
    Ok,
    /// Primary absent, fallback name found
    Fallback,
    /// Neither primary nor fallback found
    Nok,
}

impl fmt::Display for SweetStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SweetStatus::Ok => write!(f, "OK"),
            SweetStatus::Fallback => write!(f, "Fallback"),
            SweetStatus::Nok => write!(f, "NOK"),
        }
    }
}

/// One row of the SWEET signal mapping table
///
/// Column names follow the workbook headers ("Signal SWEET",
/// "Signal MDF trouvé", "CAN Fallback", ...). Missing workbook columns
/// are filled with "N/A" by the reader.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MappingRow {
    pub sweet_name: String,
    pub found_name: String,
    pub can_fallback: String,
    pub tx_rx: String,
    pub myf2: String,
    pub myf3: String,
    pub myf4: String,
    pub myf5: String,
    pub exigence: String,
    pub domaine: String,
    pub hevc: String,
    /// True if the row's Exigence appears in the PVAL requirement set
    pub pval_confirmed: bool,
    /// Filled by the sweet-status computer
    pub statut: Option<SweetStatus>,
}

impl MappingRow {
    /// Build a row from the expected workbook column values, in header
    /// order. Flags and status are filled later by the pipeline.
    pub fn from_columns(values: [String; 11]) -> Self {
        let [sweet_name, found_name, can_fallback, tx_rx, myf2, myf3, myf4, myf5, exigence, domaine, hevc] =
            values;
        Self {
            sweet_name,
            found_name,
            can_fallback,
            tx_rx,
            myf2,
            myf3,
            myf4,
            myf5,
            exigence,
            domaine,
            hevc,
            pval_confirmed: false,
            statut: None,
        }
    }

    /// MyF presence flag for a variant, by column name ("MyF3") or
    /// bare number ("3")
    pub fn myf_flag(&self, variant: &str) -> Option<&str> {
        match variant {
            "MyF2" | "2" => Some(self.myf2.as_str()),
            "MyF3" | "3" => Some(self.myf3.as_str()),
            "MyF4" | "4" => Some(self.myf4.as_str()),
            "MyF5" | "5" => Some(self.myf5.as_str()),
            _ => None,
        }
    }
}

/// Ordered use case → required signal list mapping
///
/// Each entry pairs a signal's internal name with the optional
/// `B_Pres_Sig_UC` presence-flag value carried from the membership
/// sheet. Built once per workbook load, read-only afterward.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UseCaseMap {
    entries: Vec<(String, Vec<(String, Option<String>)>)>,
}

impl UseCaseMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a use case, keeping insertion order. A repeated name
    /// replaces the earlier signal list.
    pub fn insert(&mut self, uc: String, signals: Vec<(String, Option<String>)>) {
        if let Some(entry) = self.entries.iter_mut().find(|(name, _)| *name == uc) {
            entry.1 = signals;
        } else {
            self.entries.push((uc, signals));
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[(String, Option<String>)])> {
        self.entries
            .iter()
            .map(|(name, signals)| (name.as_str(), signals.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// The set of channel names available in one measurement file
///
/// Queried by membership only, never mutated after construction.
/// Besides exact lookup, `contains_variant` matches the five name
/// variants the detector tolerates: exact, lowercase, uppercase,
/// underscores stripped, spaces as underscores.
#[derive(Debug, Clone, Default)]
pub struct ChannelSet {
    exact: std::collections::HashSet<String>,
    lower: std::collections::HashSet<String>,
    compact: std::collections::HashSet<String>,
}

impl ChannelSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut set = Self::new();
        for name in names {
            set.insert(name.into());
        }
        set
    }

    pub fn insert(&mut self, name: String) {
        self.lower.insert(name.to_lowercase());
        self.compact.insert(compact_form(&name));
        self.exact.insert(name);
    }

    /// Exact, case-sensitive membership (used by the SWEET computer)
    pub fn contains_exact(&self, name: &str) -> bool {
        self.exact.contains(name)
    }

    /// Variant-tolerant membership (used by the detector and verifier)
    pub fn contains_variant(&self, name: &str) -> bool {
        self.exact.contains(name)
            || self.lower.contains(&name.to_lowercase())
            || self.compact.contains(&compact_form(name))
    }

    /// Resolve a required name to the exact channel name stored in the
    /// file, trying each variant in order.
    pub fn resolve(&self, name: &str) -> Option<&str> {
        if let Some(found) = self.exact.get(name) {
            return Some(found.as_str());
        }
        let lower = name.to_lowercase();
        if let Some(found) = self.exact.iter().find(|c| c.to_lowercase() == lower) {
            return Some(found.as_str());
        }
        let compact = compact_form(name);
        self.exact
            .iter()
            .find(|c| compact_form(c) == compact)
            .map(|c| c.as_str())
    }

    pub fn len(&self) -> usize {
        self.exact.len()
    }

    pub fn is_empty(&self) -> bool {
        self.exact.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.exact.iter().map(|s| s.as_str())
    }
}

/// Lowercased form with underscores and spaces removed, so that
/// "Power_Relay State" and "powerrelaystate" compare equal.
fn compact_form(name: &str) -> String {
    name.chars()
        .filter(|c| *c != '_' && *c != ' ')
        .collect::<String>()
        .to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_set_variant_matching() {
        let channels = ChannelSet::from_names(["powerrelaystate", "SOC_BMS"]);

        // Case variant: lowercase channel satisfies a mixed-case query
        assert!(channels.contains_variant("Powerrelaystate"));
        // Underscore variant
        assert!(channels.contains_variant("Power_Relay_State"));
        // Exact lookup stays strict
        assert!(!channels.contains_exact("Powerrelaystate"));
        assert!(channels.contains_exact("SOC_BMS"));
        assert!(!channels.contains_variant("MotorSpeed"));
    }

    #[test]
    fn test_channel_set_resolve() {
        let channels = ChannelSet::from_names(["powerrelaystate"]);
        assert_eq!(channels.resolve("Powerrelaystate"), Some("powerrelaystate"));
        assert_eq!(channels.resolve("Power_Relay_State"), Some("powerrelaystate"));
        assert_eq!(channels.resolve("MotorSpeed"), None);
    }

    #[test]
    fn test_use_case_map_insert_order() {
        let mut map = UseCaseMap::new();
        map.insert("UC 1.2".to_string(), vec![("B".to_string(), None)]);
        map.insert("UC 1.1".to_string(), vec![("A".to_string(), None)]);

        let names: Vec<&str> = map.iter().map(|(uc, _)| uc).collect();
        assert_eq!(names, vec!["UC 1.2", "UC 1.1"]);
    }

    #[test]
    fn test_status_display() {
        assert_eq!(UcStatus::Detectable.to_string(), "DETECTABLE");
        assert_eq!(UcStatus::Indisponible.to_string(), "INDISPONIBLE");
        assert_eq!(VerificationStatus::Nok.to_string(), "NOK");
        assert_eq!(SweetStatus::Fallback.to_string(), "Fallback");
    }
}
