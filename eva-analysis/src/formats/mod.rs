//! Measurement file readers (MDF4, CSV)
//!
//! This module answers two questions about a measurement file: which
//! channel names it contains, and what the sample values of a bounded
//! list of signals are. Dispatch is by file extension.
//!
//! Per the pipeline's error policy, the public functions degrade
//! instead of failing: a missing or unreadable file yields an empty
//! channel set / empty sample arrays with a warning log, so one bad
//! input never aborts a report.

use std::path::Path;

use crate::types::{ChannelSet, Result, SignalSamples};

pub mod csv;
pub mod mf4;

pub use mf4::Mf4File;

/// List the channel/column names available in a measurement file.
///
/// Unknown extensions, missing files and parse failures all log a
/// warning and return the empty set.
pub fn list_channels(path: &Path) -> ChannelSet {
    match try_list_channels(path) {
        Ok(channels) => {
            log::info!("{} channels found in {:?}", channels.len(), path);
            channels
        }
        Err(e) => {
            log::warn!("Could not list channels of {:?}: {}", path, e);
            ChannelSet::new()
        }
    }
}

/// Read the sample arrays of the named signals.
///
/// Signal names are matched against the file's channels with the same
/// variant tolerance as the detector. A signal that cannot be found or
/// extracted maps to an empty vector.
pub fn read_samples(path: &Path, names: &[String]) -> SignalSamples {
    match try_read_samples(path, names) {
        Ok(samples) => samples,
        Err(e) => {
            log::warn!("Could not read samples from {:?}: {}", path, e);
            names
                .iter()
                .map(|name| (name.clone(), Vec::new()))
                .collect()
        }
    }
}

fn try_list_channels(path: &Path) -> Result<ChannelSet> {
    match extension_of(path)?.as_str() {
        "mf4" | "mf3" | "mdf" => {
            let mdf = Mf4File::open(path)?;
            Ok(ChannelSet::from_names(
                mdf.channel_names().iter().map(|s| s.to_string()),
            ))
        }
        "csv" | "txt" => csv::list_columns(path),
        other => Err(crate::types::AnalysisError::UnsupportedFormat(
            other.to_string(),
        )),
    }
}

fn try_read_samples(path: &Path, names: &[String]) -> Result<SignalSamples> {
    match extension_of(path)?.as_str() {
        "mf4" | "mf3" | "mdf" => {
            let mdf = Mf4File::open(path)?;
            let channels = ChannelSet::from_names(mdf.channel_names().iter().map(|s| s.to_string()));
            let mut samples = SignalSamples::new();
            for name in names {
                let data = match channels.resolve(name) {
                    Some(found) => mdf.samples(found).unwrap_or_else(|e| {
                        log::warn!("Could not extract samples of '{}': {}", found, e);
                        Vec::new()
                    }),
                    None => Vec::new(),
                };
                samples.insert(name.clone(), data);
            }
            Ok(samples)
        }
        "csv" | "txt" => csv::read_columns(path, names),
        other => Err(crate::types::AnalysisError::UnsupportedFormat(
            other.to_string(),
        )),
    }
}

fn extension_of(path: &Path) -> Result<String> {
    path.extension()
        .and_then(|s| s.to_str())
        .map(|s| s.to_lowercase())
        .ok_or_else(|| {
            crate::types::AnalysisError::UnsupportedFormat(format!("{:?}", path))
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_degrades_to_empty() {
        let channels = list_channels(Path::new("/nonexistent/trace.mf4"));
        assert!(channels.is_empty());

        let samples = read_samples(Path::new("/nonexistent/trace.csv"), &["A".to_string()]);
        assert_eq!(samples.get("A").map(Vec::len), Some(0));
    }

    #[test]
    fn test_unsupported_extension_degrades_to_empty() {
        let channels = list_channels(Path::new("measurement.blob"));
        assert!(channels.is_empty());
    }
}
