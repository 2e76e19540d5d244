//! Configuration loading and parsing
//!
//! The TOML file supplies defaults for anything not given on the
//! command line; explicit arguments always win.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Application defaults (loaded from config.toml)
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AppConfig {
    #[serde(default)]
    pub inputs: InputsConfig,
    #[serde(default)]
    pub analysis: AnalysisConfig,
    #[serde(default)]
    pub vehicle: VehicleConfig,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct InputsConfig {
    /// Labels workbook (UC membership)
    pub labels: Option<PathBuf>,
    /// Flux workbook (SWEET mapping)
    pub flux: Option<PathBuf>,
    /// PVAL workbook (confirmed requirements)
    pub pval: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AnalysisConfig {
    /// "sweet400" or "sweet500"
    pub mode: Option<String>,
    /// MyF variant filter ("2".."5")
    pub myf: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct VehicleConfig {
    pub vin: Option<String>,
    pub swid: Option<String>,
}

/// Load configuration from a TOML file
pub fn load_config(path: &Path) -> Result<AppConfig> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;

    let config: AppConfig = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {:?}", path))?;

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_deserialization() {
        let toml_content = r#"
            [inputs]
            labels = "labels.xlsx"
            flux = "flux.xlsm"

            [analysis]
            mode = "sweet500"
            myf = "3"

            [vehicle]
            vin = "VF1AAAAA000000000"
        "#;

        let config: AppConfig = toml::from_str(toml_content).unwrap();
        assert_eq!(config.inputs.labels, Some(PathBuf::from("labels.xlsx")));
        assert!(config.inputs.pval.is_none());
        assert_eq!(config.analysis.mode.as_deref(), Some("sweet500"));
        assert_eq!(config.vehicle.vin.as_deref(), Some("VF1AAAAA000000000"));
    }

    #[test]
    fn test_empty_config_is_all_defaults() {
        let config: AppConfig = toml::from_str("").unwrap();
        assert!(config.inputs.labels.is_none());
        assert!(config.analysis.mode.is_none());
        assert!(config.vehicle.swid.is_none());
    }
}
