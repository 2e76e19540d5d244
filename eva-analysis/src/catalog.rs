//! Built-in requirement catalog
//!
//! The catalog is static: requirements are defined once and never
//! mutated during a run. Each entry names the signals it needs, its
//! verification logic and, for `Custom` logic, the rule expression
//! evaluated over the per-signal means.

use crate::types::{Requirement, RequirementLogic};

/// The production requirement catalog
pub fn builtin_catalog() -> Vec<Requirement> {
    vec![
        Requirement {
            id: "REQ_SYS_Comm_480".to_string(),
            label: "Communication système stable au réveil".to_string(),
            signals: vec![
                "HevcWakeUpSleepcommand".to_string(),
                "Powerrelaystate".to_string(),
            ],
            logic: RequirementLogic::AllPresent,
            rule: None,
            description: "Tous les signaux doivent être présents".to_string(),
        },
        Requirement {
            id: "REQ_6.519".to_string(),
            label: "Ecart SOC BMS vs affiché dans la bande".to_string(),
            signals: vec!["SOC_BMS".to_string(), "SOC_Affiche".to_string()],
            logic: RequirementLogic::Custom,
            rule: Some("abs(SOC_BMS - SOC_Affiche) <= 5".to_string()),
            description: "L'écart entre SOC_BMS et SOC_Affiche doit être <= 5%".to_string(),
        },
        Requirement {
            id: "REQ_TEMP_001".to_string(),
            label: "Température batterie dans les limites".to_string(),
            signals: vec!["Temperature_Battery".to_string()],
            logic: RequirementLogic::Custom,
            rule: Some("(Temperature_Battery >= -20) and (Temperature_Battery <= 60)".to_string()),
            description: "Température batterie entre -20°C et 60°C".to_string(),
        },
        Requirement {
            id: "REQ_VOLTAGE_001".to_string(),
            label: "Tension batterie stable".to_string(),
            signals: vec!["Battery_Voltage".to_string()],
            logic: RequirementLogic::Custom,
            rule: Some("(Battery_Voltage >= 300) and (Battery_Voltage <= 420)".to_string()),
            description: "Tension batterie entre 300V et 420V".to_string(),
        },
    ]
}

/// Deduplicated union of the signal names referenced by a catalog
pub fn catalog_signals(catalog: &[Requirement]) -> Vec<String> {
    let mut signals: Vec<String> = Vec::new();
    for req in catalog {
        for name in &req.signals {
            if !signals.iter().any(|s| s == name) {
                signals.push(name.clone());
            }
        }
    }
    signals
}
