//! Requirement verifier
//!
//! Two-step check per catalog entry: a presence gate (every required
//! signal must have non-empty sample data), then the logic evaluation.
//! `AllPresent` passes trivially once the gate is satisfied; `Custom`
//! evaluates the stored rule over a scope binding each signal name to
//! the mean of its samples.
//!
//! Rule comparisons see one scalar per signal per run, not the full
//! time series. Window-level anomalies are invisible to this check.

use std::collections::HashMap;

use crate::rule;
use crate::types::{Requirement, RequirementLogic, SignalSamples, VerificationRow, VerificationStatus};

/// Verify a single requirement against the loaded sample data
pub fn verify_requirement(req: &Requirement, samples: &SignalSamples) -> VerificationRow {
    let mut missing: Vec<&str> = Vec::new();
    let mut scope: HashMap<String, f64> = HashMap::new();

    for name in &req.signals {
        match samples.get(name) {
            Some(data) if !data.is_empty() => {
                scope.insert(name.clone(), mean(data));
            }
            _ => missing.push(name.as_str()),
        }
    }

    // Presence gate: any absent or empty signal short-circuits to NOK,
    // independent of the rule text.
    if !missing.is_empty() {
        return row(
            req,
            VerificationStatus::Nok,
            format!("Signaux manquants: {}", missing.join(", ")),
        );
    }

    match req.logic {
        RequirementLogic::AllPresent => row(
            req,
            VerificationStatus::Ok,
            "Tous les signaux requis sont présents".to_string(),
        ),
        RequirementLogic::Custom => {
            let Some(rule_text) = req.rule.as_deref() else {
                return row(
                    req,
                    VerificationStatus::Unknown,
                    "Exigence custom sans règle".to_string(),
                );
            };
            match rule::evaluate_condition(rule_text, &scope) {
                Ok(true) => row(
                    req,
                    VerificationStatus::Ok,
                    format!("Condition respectée: {}", rule_text),
                ),
                Ok(false) => row(
                    req,
                    VerificationStatus::Nok,
                    format!("Condition non respectée: {}", rule_text),
                ),
                Err(e) => {
                    log::warn!("Rule evaluation failed for {}: {}", req.id, e);
                    row(
                        req,
                        VerificationStatus::Error,
                        format!("Erreur d'évaluation: {}", e),
                    )
                }
            }
        }
    }
}

/// Verify every catalog entry, one row per requirement.
///
/// One malformed rule never aborts the batch: its row carries status
/// ERROR and the remaining requirements are still verified.
pub fn verify_all(catalog: &[Requirement], samples: &SignalSamples) -> Vec<VerificationRow> {
    catalog
        .iter()
        .map(|req| verify_requirement(req, samples))
        .collect()
}

fn row(req: &Requirement, status: VerificationStatus, message: String) -> VerificationRow {
    VerificationRow {
        id: req.id.clone(),
        label: req.label.clone(),
        signals: req.signals.join(", "),
        status,
        message,
        description: req.description.clone(),
    }
}

fn mean(data: &[f64]) -> f64 {
    data.iter().sum::<f64>() / data.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn req_custom(id: &str, signals: &[&str], rule: &str) -> Requirement {
        Requirement {
            id: id.to_string(),
            label: id.to_string(),
            signals: signals.iter().map(|s| s.to_string()).collect(),
            logic: RequirementLogic::Custom,
            rule: Some(rule.to_string()),
            description: String::new(),
        }
    }

    fn req_all_present(id: &str, signals: &[&str]) -> Requirement {
        Requirement {
            id: id.to_string(),
            label: id.to_string(),
            signals: signals.iter().map(|s| s.to_string()).collect(),
            logic: RequirementLogic::AllPresent,
            rule: None,
            description: String::new(),
        }
    }

    fn samples_of(pairs: &[(&str, &[f64])]) -> SignalSamples {
        pairs
            .iter()
            .map(|(name, data)| (name.to_string(), data.to_vec()))
            .collect()
    }

    #[test]
    fn test_all_present_passes_with_data() {
        let req = req_all_present("REQ_SYS_Comm_480", &["A", "B"]);
        let samples = samples_of(&[("A", &[1.0]), ("B", &[2.0, 3.0])]);

        let row = verify_requirement(&req, &samples);
        assert_eq!(row.status, VerificationStatus::Ok);
    }

    #[test]
    fn test_missing_signal_is_nok_regardless_of_rule() {
        let req = req_custom("REQ_X", &["A", "B"], "garbage rule that never parses((");
        let samples = samples_of(&[("A", &[1.0])]);

        let row = verify_requirement(&req, &samples);
        assert_eq!(row.status, VerificationStatus::Nok);
        assert!(row.message.contains("B"));
    }

    #[test]
    fn test_empty_samples_count_as_missing() {
        let req = req_all_present("REQ_Y", &["A"]);
        let samples = samples_of(&[("A", &[])]);

        let row = verify_requirement(&req, &samples);
        assert_eq!(row.status, VerificationStatus::Nok);
        assert!(row.message.contains("Signaux manquants"));
    }

    #[test]
    fn test_soc_deviation_within_band() {
        let req = req_custom(
            "REQ_6.519",
            &["SOC_BMS", "SOC_Affiche"],
            "abs(SOC_BMS - SOC_Affiche) <= 5",
        );
        // Means: 81 and 80.5
        let samples = samples_of(&[
            ("SOC_BMS", &[80.0, 81.0, 82.0]),
            ("SOC_Affiche", &[79.5, 80.5, 81.5]),
        ]);

        let row = verify_requirement(&req, &samples);
        assert_eq!(row.status, VerificationStatus::Ok);
    }

    #[test]
    fn test_temperature_out_of_band() {
        let req = req_custom(
            "REQ_TEMP_001",
            &["Temperature_Battery"],
            "(Temperature_Battery >= -20) and (Temperature_Battery <= 60)",
        );
        // Mean: 71, above the 60 upper bound
        let samples = samples_of(&[("Temperature_Battery", &[70.0, 72.0])]);

        let row = verify_requirement(&req, &samples);
        assert_eq!(row.status, VerificationStatus::Nok);
    }

    #[test]
    fn test_broken_rule_is_error_not_panic() {
        let req = req_custom("REQ_Z", &["A"], "A <=");
        let samples = samples_of(&[("A", &[1.0])]);

        let row = verify_requirement(&req, &samples);
        assert_eq!(row.status, VerificationStatus::Error);
        assert!(row.message.starts_with("Erreur d'évaluation"));
    }

    #[test]
    fn test_custom_without_rule_is_unknown() {
        let mut req = req_custom("REQ_W", &["A"], "A > 0");
        req.rule = None;
        let samples = samples_of(&[("A", &[1.0])]);

        let row = verify_requirement(&req, &samples);
        assert_eq!(row.status, VerificationStatus::Unknown);
    }

    #[test]
    fn test_verify_all_isolates_failures() {
        let catalog = vec![
            req_custom("BAD", &["A"], "(((("),
            req_all_present("GOOD", &["A"]),
        ];
        let samples = samples_of(&[("A", &[1.0])]);

        let rows = verify_all(&catalog, &samples);
        assert_eq!(rows[0].status, VerificationStatus::Error);
        assert_eq!(rows[1].status, VerificationStatus::Ok);
    }
}
