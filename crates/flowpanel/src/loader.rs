//! Robust CSV loading: delimiter sniffing, header canonicalization and MONTH
//! parsing. No input condition is fatal; everything degrades to
//! [`Dataset::Missing`] with a reason the report can surface.

use std::io::ErrorKind;
use std::path::Path;

use common::types::Month;

use crate::normalize;
use crate::table::{Row, Table};

/// Why a dataset could not be produced from a file.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MissingReason {
    #[error("file not found")]
    NotFound,
    #[error("file could not be read: {0}")]
    Unreadable(String),
    #[error("no candidate delimiter produced a table")]
    Unparseable,
    #[error("file parsed but contained no usable rows")]
    Empty,
}

/// Load outcome. An explicit tagged variant instead of the source's
/// empty-table-as-sentinel convention.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dataset {
    Loaded(Table),
    Missing(MissingReason),
}

/// Candidate delimiters, tried in order; the first parse that yields at
/// least two columns wins.
const DELIMITERS: &[u8] = &[b',', b';', b'\t'];

fn parse_with(text: &str, delimiter: u8) -> Option<(Vec<String>, Vec<Vec<String>>)> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(text.as_bytes());

    let headers: Vec<String> = reader.headers().ok()?.iter().map(String::from).collect();

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.ok()?;
        rows.push(record.iter().map(String::from).collect());
    }
    Some((headers, rows))
}

/// Read a CSV of unknown delimiter and return a normalized, month-sorted
/// table. When a MONTH column is present, rows whose month fails to parse
/// are dropped (counted in `flowpanel_rows_dropped_total`).
pub fn load_dataset(path: &Path) -> Dataset {
    let raw = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            tracing::warn!(path = %path.display(), "dataset file not found");
            metrics::counter!("flowpanel_datasets_missing_total").increment(1);
            return Dataset::Missing(MissingReason::NotFound);
        }
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "dataset file unreadable");
            metrics::counter!("flowpanel_datasets_missing_total").increment(1);
            return Dataset::Missing(MissingReason::Unreadable(e.to_string()));
        }
    };
    let text = String::from_utf8_lossy(&raw);

    let mut parsed = DELIMITERS
        .iter()
        .filter_map(|d| parse_with(&text, *d))
        .find(|(headers, _)| headers.len() > 1);
    if parsed.is_none() {
        // Fall back to a plain comma parse; single-column files are still
        // tables, they just carry no category dimension.
        parsed = parse_with(&text, b',');
    }
    let Some((headers, raw_rows)) = parsed else {
        tracing::warn!(path = %path.display(), "dataset unparseable under all delimiters");
        metrics::counter!("flowpanel_datasets_missing_total").increment(1);
        return Dataset::Missing(MissingReason::Unparseable);
    };

    let rows = raw_rows
        .into_iter()
        .map(|cells| Row { month: None, cells })
        .collect();
    let mut table = Table::new(headers, rows);
    normalize::canonicalize_headers(&mut table);

    if let Some(month_idx) = table.column_index("MONTH") {
        let mut dropped = 0_u64;
        table.rows_mut().retain_mut(|row| {
            let cell = row.cells.get(month_idx).map_or("", String::as_str);
            match Month::parse(cell) {
                Some(m) => {
                    row.month = Some(m);
                    true
                }
                None => {
                    dropped += 1;
                    false
                }
            }
        });
        if dropped > 0 {
            tracing::warn!(path = %path.display(), dropped, "rows dropped for unparseable MONTH");
            metrics::counter!("flowpanel_rows_dropped_total").increment(dropped);
        }
        table.sort_by_month();
    }

    if table.is_empty() {
        metrics::counter!("flowpanel_datasets_missing_total").increment(1);
        return Dataset::Missing(MissingReason::Empty);
    }
    Dataset::Loaded(table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_file(dir: &tempfile::TempDir, name: &str, content: &str) -> std::path::PathBuf {
        let path = dir.path().join(name);
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(content.as_bytes()).unwrap();
        path
    }

    #[test]
    fn test_missing_file_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let got = load_dataset(&dir.path().join("nope.csv"));
        assert_eq!(got, Dataset::Missing(MissingReason::NotFound));
    }

    #[test]
    fn test_comma_delimited_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(
            &dir,
            "v.csv",
            "MONTH,CATEGORY,VOLUME_USD_BILLIONS\n2025-06-01,DEX,10.0\n2025-06-01,Lending,5.0\n",
        );
        let Dataset::Loaded(t) = load_dataset(&path) else {
            panic!("expected loaded table");
        };
        assert_eq!(t.len(), 2);
        assert_eq!(t.headers(), ["MONTH", "CATEGORY", "VOLUME_USD_BILLIONS"]);
        assert_eq!(t.rows()[0].month, Month::new(2025, 6));
    }

    #[test]
    fn test_semicolon_selected_over_comma() {
        let dir = tempfile::tempdir().unwrap();
        // A comma parse yields a single column; the sniffer must pick ';'.
        let path = write_file(
            &dir,
            "semi.csv",
            "MONTH;VALUE\n2025-06-01;1.5\n2025-07-01;2.5\n",
        );
        let Dataset::Loaded(t) = load_dataset(&path) else {
            panic!("expected loaded table");
        };
        assert_eq!(t.headers(), ["MONTH", "VALUE"]);
        assert_eq!(t.len(), 2);
    }

    #[test]
    fn test_tab_delimited_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(&dir, "tab.csv", "MONTH\tVALUE\n2025-06-01\t1.5\n");
        let Dataset::Loaded(t) = load_dataset(&path) else {
            panic!("expected loaded table");
        };
        assert_eq!(t.headers(), ["MONTH", "VALUE"]);
    }

    #[test]
    fn test_loading_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(
            &dir,
            "v.csv",
            "MONTH,CATEGORY,VOLUME_USD_BILLIONS\n2025-07-01,DEX,12.0\n2025-06-01,DEX,10.0\n",
        );
        let first = load_dataset(&path);
        let second = load_dataset(&path);
        assert_eq!(first, second);
    }

    #[test]
    fn test_rows_sorted_ascending_by_month() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(
            &dir,
            "v.csv",
            "MONTH,V\n2025-08-01,3\n2025-06-01,1\n2025-07-01,2\n",
        );
        let Dataset::Loaded(t) = load_dataset(&path) else {
            panic!("expected loaded table");
        };
        let months: Vec<_> = t.rows().iter().filter_map(|r| r.month).collect();
        let mut sorted = months.clone();
        sorted.sort();
        assert_eq!(months, sorted);
    }

    #[test]
    fn test_bad_month_rows_dropped() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(
            &dir,
            "v.csv",
            "MONTH,V\n2025-06-01,1\nnot-a-month,2\n2025-07-01,3\n",
        );
        let Dataset::Loaded(t) = load_dataset(&path) else {
            panic!("expected loaded table");
        };
        assert_eq!(t.len(), 2);
    }

    #[test]
    fn test_header_only_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(&dir, "v.csv", "MONTH,V\n");
        assert_eq!(load_dataset(&path), Dataset::Missing(MissingReason::Empty));
    }

    #[test]
    fn test_date_synonym_header_feeds_month_parse() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(&dir, "v.csv", "DATE,V\n2025-06-15,1\n");
        let Dataset::Loaded(t) = load_dataset(&path) else {
            panic!("expected loaded table");
        };
        assert_eq!(t.rows()[0].month, Month::new(2025, 6));
    }
}
