//! PVAL requirement id reader
//!
//! The PVAL workbook carries the validation plan; its "REQ" sheet
//! lists the requirement ids in scope under a "DOORS Id" column. The
//! resulting set pre-filters the SWEET mapping rows.

use std::collections::HashSet;
use std::path::Path;

use super::{cell_string, header_row, sheet_range};

const REQ_SHEET: &str = "REQ";
const DOORS_COLUMN: &str = "DOORS Id";

/// Load the DOORS requirement id set.
///
/// Missing file, sheet or column all degrade to an empty set, which
/// downstream means "retain all mapping rows, unconfirmed".
pub fn read_pval_requirements(path: &Path) -> HashSet<String> {
    let Some(range) = sheet_range(path, &[REQ_SHEET]) else {
        log::warn!("No '{}' sheet in {:?}; empty PVAL set", REQ_SHEET, path);
        return HashSet::new();
    };

    let headers = header_row(&range);
    let column = headers
        .iter()
        .position(|h| h == DOORS_COLUMN)
        .or_else(|| {
            headers
                .iter()
                .position(|h| h.to_lowercase().starts_with("doors"))
        });
    let Some(column) = column else {
        log::warn!("No DOORS id column in {:?}; empty PVAL set", path);
        return HashSet::new();
    };

    let ids: HashSet<String> = range
        .rows()
        .skip(1)
        .filter_map(|row| row.get(column).map(cell_string))
        .filter(|s| !s.is_empty())
        .collect();

    log::info!("{} PVAL requirement ids loaded from {:?}", ids.len(), path);
    ids
}
