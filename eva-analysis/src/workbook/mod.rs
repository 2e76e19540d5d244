//! Spreadsheet readers
//!
//! Three workbook inputs drive an analysis: the UC membership table
//! ("Feuil3"), the SWEET flux mapping, and the PVAL requirement id
//! list. Real-world copies of these files disagree on sheet names and
//! column headers, so each reader works through an explicit prioritized
//! strategy list and logs which fallback it ended up using.
//!
//! None of the readers raises on structural problems: a missing file,
//! sheet or column degrades to an empty/default structure so the rest
//! of the pipeline keeps running.

use calamine::{open_workbook_auto, Data, Range, Reader};
use std::path::Path;

pub mod mapping;
pub mod membership;
pub mod pval;

pub use mapping::read_mapping;
pub use membership::read_membership;
pub use pval::read_pval_requirements;

/// Open a workbook and return the requested sheet's cell range.
///
/// `candidates` is tried in order; the first existing sheet wins and
/// any fallback beyond the first candidate is logged.
fn sheet_range(path: &Path, candidates: &[&str]) -> Option<Range<Data>> {
    let mut workbook = match open_workbook_auto(path) {
        Ok(wb) => wb,
        Err(e) => {
            log::warn!("Could not open workbook {:?}: {}", path, e);
            return None;
        }
    };

    let sheet_names = workbook.sheet_names().to_owned();
    for (rank, candidate) in candidates.iter().enumerate() {
        if let Some(found) = sheet_names.iter().find(|name| name.as_str() == *candidate) {
            if rank > 0 {
                log::warn!(
                    "Sheet '{}' not found in {:?}; using fallback '{}'",
                    candidates[0],
                    path,
                    found
                );
            }
            return match workbook.worksheet_range(found) {
                Ok(range) => Some(range),
                Err(e) => {
                    log::warn!("Could not read sheet '{}' of {:?}: {}", found, path, e);
                    None
                }
            };
        }
    }
    None
}

/// First sheet whose name contains `needle` (case-insensitive)
fn sheet_range_containing(path: &Path, needle: &str) -> Option<(String, Range<Data>)> {
    let mut workbook = match open_workbook_auto(path) {
        Ok(wb) => wb,
        Err(e) => {
            log::warn!("Could not open workbook {:?}: {}", path, e);
            return None;
        }
    };

    let sheet_names = workbook.sheet_names().to_owned();
    let found = sheet_names
        .iter()
        .find(|name| name.to_lowercase().contains(&needle.to_lowercase()))?
        .clone();
    match workbook.worksheet_range(&found) {
        Ok(range) => Some((found, range)),
        Err(e) => {
            log::warn!("Could not read sheet '{}' of {:?}: {}", found, path, e);
            None
        }
    }
}

/// Cell text with the coercions workbook data needs: numbers render
/// without a trailing ".0", booleans as "1"/"0", empty cells as "".
fn cell_string(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.trim().to_string(),
        Data::Float(v) => format!("{v}"),
        Data::Int(v) => format!("{v}"),
        Data::Bool(v) => if *v { "1" } else { "0" }.to_string(),
        other => format!("{other}"),
    }
}

/// Trimmed header strings of the first row
fn header_row(range: &Range<Data>) -> Vec<String> {
    range
        .rows()
        .next()
        .map(|row| row.iter().map(cell_string).collect())
        .unwrap_or_default()
}
