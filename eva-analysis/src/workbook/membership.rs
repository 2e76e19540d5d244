//! UC membership reader ("Feuil3")
//!
//! The membership sheet lists signal internal names in one column and
//! one column per use case (headers like "1.1", "1.2"), where a 1/True
//! cell marks the signal as required by that UC. An optional
//! `B_Pres_Sig_UC` column carries the presence-flag variable name.
//!
//! Strategies, in order:
//! 1. Sheet named "Feuil3"
//! 2. Any sheet whose name contains "sweet"
//! 3. No usable sheet → empty map
//!
//! If the chosen sheet has no UC columns at all, use cases are
//! synthesized by chunking the signal column in groups of eight.

use std::path::Path;

use crate::types::UseCaseMap;

use super::{cell_string, header_row, sheet_range, sheet_range_containing};

const CANONICAL_SHEET: &str = "Feuil3";
const FALLBACK_SHEET_SUBSTRING: &str = "sweet";
const CHUNK_SIZE: usize = 8;

/// Load the use case → signal mapping from a labels workbook
pub fn read_membership(path: &Path) -> UseCaseMap {
    let range = match sheet_range(path, &[CANONICAL_SHEET]) {
        Some(range) => range,
        None => match sheet_range_containing(path, FALLBACK_SHEET_SUBSTRING) {
            Some((name, range)) => {
                log::warn!(
                    "Sheet '{}' not found in {:?}; using '{}' instead",
                    CANONICAL_SHEET,
                    path,
                    name
                );
                range
            }
            None => {
                log::warn!("No usable membership sheet in {:?}; empty UC map", path);
                return UseCaseMap::new();
            }
        },
    };

    let headers = header_row(&range);
    if headers.is_empty() {
        return UseCaseMap::new();
    }

    let internal_col = headers
        .iter()
        .position(|h| {
            let h = h.to_lowercase();
            h.contains("internal") || h.contains("name") || h.contains("signal")
        })
        .unwrap_or(0);

    let uc_cols: Vec<usize> = headers
        .iter()
        .enumerate()
        .filter(|(_, h)| is_uc_header(h))
        .map(|(i, _)| i)
        .collect();

    let bpres_col = headers
        .iter()
        .position(|h| h.to_lowercase().starts_with("b_pres_sig_uc"));

    let mut map = UseCaseMap::new();

    if uc_cols.is_empty() {
        // No "1.x" columns: chunk the signal list into synthetic UCs
        log::warn!(
            "No UC columns in membership sheet of {:?}; chunking {} column into groups of {}",
            path,
            headers.get(internal_col).map(String::as_str).unwrap_or("?"),
            CHUNK_SIZE
        );
        let signals: Vec<String> = range
            .rows()
            .skip(1)
            .filter_map(|row| row.get(internal_col).map(cell_string))
            .filter(|s| !s.is_empty())
            .collect();
        for (i, chunk) in signals.chunks(CHUNK_SIZE).enumerate() {
            let uc = format!("UC 1.{} — Groupe {}", i + 1, i + 1);
            map.insert(uc, chunk.iter().map(|s| (s.clone(), None)).collect());
        }
        return map;
    }

    for &col in &uc_cols {
        let mut pairs: Vec<(String, Option<String>)> = Vec::new();
        for row in range.rows().skip(1) {
            let flagged = row
                .get(col)
                .map(|cell| is_membership_flag(&cell_string(cell)))
                .unwrap_or(false);
            if !flagged {
                continue;
            }
            let name = row.get(internal_col).map(cell_string).unwrap_or_default();
            if name.is_empty() {
                continue;
            }
            let bpres = bpres_col
                .and_then(|i| row.get(i))
                .map(cell_string)
                .filter(|s| !s.is_empty());
            pairs.push((name, bpres));
        }
        map.insert(format!("UC {}", headers[col]), pairs);
    }

    map
}

/// "1.1", "2.10", ... — digits, a dot, digits, nothing else
fn is_uc_header(header: &str) -> bool {
    let mut parts = header.split('.');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(major), Some(minor), None) => {
            !major.is_empty()
                && !minor.is_empty()
                && major.chars().all(|c| c.is_ascii_digit())
                && minor.chars().all(|c| c.is_ascii_digit())
        }
        _ => false,
    }
}

/// Values that mark a signal as member of a UC column
fn is_membership_flag(value: &str) -> bool {
    matches!(value, "1" | "1.0" | "True" | "true")
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_xlsxwriter::Workbook;

    fn fixture(sheet: &str, headers: &[&str], rows: &[&[&str]]) -> tempfile::NamedTempFile {
        let file = tempfile::Builder::new().suffix(".xlsx").tempfile().unwrap();
        let mut workbook = Workbook::new();
        let ws = workbook.add_worksheet();
        ws.set_name(sheet).unwrap();
        for (c, header) in headers.iter().enumerate() {
            ws.write_string(0, c as u16, *header).unwrap();
        }
        for (r, row) in rows.iter().enumerate() {
            for (c, value) in row.iter().enumerate() {
                ws.write_string(r as u32 + 1, c as u16, *value).unwrap();
            }
        }
        workbook.save(file.path()).unwrap();
        file
    }

    #[test]
    fn test_reads_feuil3_uc_columns() {
        let file = fixture(
            "Feuil3",
            &["internal name", "B_Pres_Sig_UC", "1.1", "1.2"],
            &[
                &["BCM_WakeupSleepCommand", "B_Pres_Sig_UC_1.1", "1", ""],
                &["PowerRelayState_BLMS", "", "1", "1"],
                &["TractionCommand", "", "", "1"],
            ],
        );

        let map = read_membership(file.path());
        assert_eq!(map.len(), 2);

        let entries: Vec<_> = map.iter().collect();
        assert_eq!(entries[0].0, "UC 1.1");
        assert_eq!(entries[0].1.len(), 2);
        assert_eq!(entries[0].1[0].0, "BCM_WakeupSleepCommand");
        assert_eq!(
            entries[0].1[0].1.as_deref(),
            Some("B_Pres_Sig_UC_1.1")
        );
        assert_eq!(entries[1].0, "UC 1.2");
        assert_eq!(entries[1].1.len(), 2);
    }

    #[test]
    fn test_sweet_sheet_fallback() {
        let file = fixture(
            "eva-sweet-labels",
            &["Signal", "1.1"],
            &[&["MotorSpeed", "1"]],
        );

        let map = read_membership(file.path());
        assert_eq!(map.len(), 1);
        let entries: Vec<_> = map.iter().collect();
        assert_eq!(entries[0].1[0].0, "MotorSpeed");
    }

    #[test]
    fn test_chunking_without_uc_columns() {
        let signals: Vec<Vec<&str>> = (0..10).map(|_| vec!["Sig"]).collect();
        let rows: Vec<&[&str]> = signals.iter().map(|r| r.as_slice()).collect();
        let file = fixture("Feuil3", &["internal name"], &rows);

        let map = read_membership(file.path());
        // 10 signals in chunks of 8 → two synthetic UCs
        assert_eq!(map.len(), 2);
        let entries: Vec<_> = map.iter().collect();
        assert_eq!(entries[0].0, "UC 1.1 — Groupe 1");
        assert_eq!(entries[0].1.len(), 8);
        assert_eq!(entries[1].1.len(), 2);
    }

    #[test]
    fn test_missing_file_is_empty_map() {
        let map = read_membership(Path::new("/nonexistent/labels.xlsx"));
        assert!(map.is_empty());
    }

    #[test]
    fn test_uc_header_matching() {
        assert!(is_uc_header("1.1"));
        assert!(is_uc_header("12.34"));
        assert!(!is_uc_header("1.1.1"));
        assert!(!is_uc_header("UC 1.1"));
        assert!(!is_uc_header("1."));
        assert!(!is_uc_header("a.b"));
    }
}
