//! SWEET flux-mapping reader
//!
//! The flux workbook maps SWEET signal names to the name actually
//! recorded in the measurement ("Signal MDF trouvé"), a CAN fallback
//! name, the MyF variant flags and the associated requirement id.
//! Sheet names vary per SWEET version and workbook vintage, so each
//! mode carries a candidate list.
//!
//! Sheets that lack the expected headers are normalized: the first
//! two columns are taken as SWEET name / found name and every other
//! expected column is injected with "N/A".

use std::collections::HashSet;
use std::path::Path;

use crate::types::{MappingRow, SweetMode};

use super::{cell_string, header_row, sheet_range};

/// Expected columns, in report order
const EXPECTED_COLUMNS: [&str; 11] = [
    "Signal SWEET",
    "Signal MDF trouvé",
    "CAN Fallback",
    "Tx/Rx",
    "MyF2",
    "MyF3",
    "MyF4",
    "MyF5",
    "Exigence",
    "Domaine",
    "HEVC",
];

/// Load the SWEET signal mapping for the given mode.
///
/// Returns deduplicated rows; no usable sheet yields an empty table.
pub fn read_mapping(path: &Path, mode: SweetMode) -> Vec<MappingRow> {
    let candidates = mode.candidate_sheets();
    let Some(range) = sheet_range(path, &candidates) else {
        log::warn!(
            "No {} mapping sheet in {:?} (tried {:?}); empty mapping",
            mode,
            path,
            candidates
        );
        return Vec::new();
    };

    let headers = header_row(&range);
    if headers.is_empty() {
        return Vec::new();
    }

    // Column index per expected column; None → "N/A" injected below
    let indices: Vec<Option<usize>> = if headers.iter().any(|h| h == EXPECTED_COLUMNS[0]) {
        EXPECTED_COLUMNS
            .iter()
            .map(|expected| headers.iter().position(|h| h == expected))
            .collect()
    } else {
        // Unrecognized layout: first two columns carry the names
        log::warn!(
            "Sheet in {:?} lacks '{}' header; renaming first two columns",
            path,
            EXPECTED_COLUMNS[0]
        );
        let mut indices = vec![None; EXPECTED_COLUMNS.len()];
        if !headers.is_empty() {
            indices[0] = Some(0);
        }
        if headers.len() >= 2 {
            indices[1] = Some(1);
        }
        indices
    };

    let mut seen: HashSet<Vec<String>> = HashSet::new();
    let mut rows = Vec::new();

    for row in range.rows().skip(1) {
        let values: Vec<String> = indices
            .iter()
            .map(|idx| match idx {
                Some(i) => row.get(*i).map(cell_string).unwrap_or_default(),
                None => "N/A".to_string(),
            })
            .collect();

        // Drop rows with no signal names at all
        if values[0].is_empty() && values[1].is_empty() {
            continue;
        }
        // Deduplicate identical rows
        if !seen.insert(values.clone()) {
            continue;
        }

        let columns: [String; 11] = values.try_into().expect("expected column count");
        rows.push(MappingRow::from_columns(columns));
    }

    log::info!("{} mapping rows loaded from {:?} ({})", rows.len(), path, mode);
    rows
}
