//! Delimited measurement files
//!
//! A plain CSV (or .txt with the same layout) stands in for a recorded
//! measurement: the header row carries the channel names, each column
//! a signal's samples.

use std::collections::HashMap;
use std::path::Path;

use crate::types::{ChannelSet, Result, SignalSamples};

/// Column headers as the channel set
pub fn list_columns(path: &Path) -> Result<ChannelSet> {
    let mut reader = ::csv::Reader::from_path(path)
        .map_err(|e| crate::types::AnalysisError::MeasurementParseError(e.to_string()))?;
    let headers = reader
        .headers()
        .map_err(|e| crate::types::AnalysisError::MeasurementParseError(e.to_string()))?;
    Ok(ChannelSet::from_names(
        headers.iter().map(|h| h.trim().to_string()),
    ))
}

/// Read the named columns as f64 sample arrays.
///
/// Column lookup tolerates the same name variants as the detector;
/// cells that do not parse as numbers are skipped. A column absent
/// from the file maps to an empty vector.
pub fn read_columns(path: &Path, names: &[String]) -> Result<SignalSamples> {
    let mut reader = ::csv::Reader::from_path(path)
        .map_err(|e| crate::types::AnalysisError::MeasurementParseError(e.to_string()))?;
    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| crate::types::AnalysisError::MeasurementParseError(e.to_string()))?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();
    let header_set = ChannelSet::from_names(headers.iter().cloned());

    // name → column index for the requested signals only
    let mut indices: HashMap<usize, String> = HashMap::new();
    let mut samples = SignalSamples::new();
    for name in names {
        samples.insert(name.clone(), Vec::new());
        let column = header_set
            .resolve(name)
            .and_then(|found| headers.iter().position(|h| h == found));
        if let Some(idx) = column {
            indices.insert(idx, name.clone());
        } else {
            log::debug!("Column '{}' not found in {:?}", name, path);
        }
    }

    for (row_no, record) in reader.records().enumerate() {
        let record = record
            .map_err(|e| crate::types::AnalysisError::MeasurementParseError(format!(
                "row {}: {}",
                row_no, e
            )))?;
        for (idx, name) in &indices {
            if let Some(cell) = record.get(*idx) {
                if let Ok(value) = cell.trim().parse::<f64>() {
                    samples.get_mut(name).expect("preinserted").push(value);
                }
            }
        }
    }

    Ok(samples)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_fixture(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_list_columns() {
        let file = write_fixture("SOC_BMS,SOC_Affiche,Comment\n80,79.5,start\n81,80.5,\n");
        let channels = list_columns(file.path()).unwrap();
        assert_eq!(channels.len(), 3);
        assert!(channels.contains_exact("SOC_BMS"));
        assert!(channels.contains_exact("Comment"));
    }

    #[test]
    fn test_read_columns_parses_numbers_and_skips_text() {
        let file = write_fixture("SOC_BMS,Comment\n80,start\n81,mid\nnot_a_number,end\n82,\n");
        let samples = read_columns(
            file.path(),
            &["SOC_BMS".to_string(), "Missing".to_string()],
        )
        .unwrap();

        assert_eq!(samples["SOC_BMS"], vec![80.0, 81.0, 82.0]);
        assert!(samples["Missing"].is_empty());
    }

    #[test]
    fn test_read_columns_tolerates_name_variants() {
        let file = write_fixture("powerrelaystate\n1\n0\n");
        let samples = read_columns(file.path(), &["Powerrelaystate".to_string()]).unwrap();
        assert_eq!(samples["Powerrelaystate"], vec![1.0, 0.0]);
    }
}
