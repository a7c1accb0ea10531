//! Column-name and value normalization bridging drift across CSV vintages.

use common::types::Unit;

use crate::table::Table;

/// Known header synonyms: (canonical, variants). Matching is done on the
/// uppercased, trimmed header. A variant is only renamed when the canonical
/// column is not already present, so a file carrying both keeps both.
const SYNONYMS: &[(&str, &[&str])] = &[
    ("MONTH", &["DATE", "MONTH_START"]),
    ("CATEGORY", &["SECTOR"]),
    ("AVG_FEE_USD", &["AVG_TX_FEE_USD"]),
    ("TOTAL_TRANSACTIONS", &["MONTHLY_TRANSACTIONS"]),
    ("TRANSACTIONS_MILLIONS", &["TX_MILLIONS"]),
    ("UNIQUE_USERS", &["USERS"]),
    ("VOLUME_USD_BILLIONS", &["VOLUME_BILLIONS"]),
];

/// Uppercase headers and fold known variants onto their canonical names.
pub fn canonicalize_headers(table: &mut Table) {
    for h in table.headers_mut() {
        *h = h.trim().to_ascii_uppercase();
    }
    for (canonical, variants) in SYNONYMS {
        if table.column_index(canonical).is_some() {
            continue;
        }
        let variant_idx = variants.iter().find_map(|v| table.column_index(v));
        if let Some(idx) = variant_idx {
            table.headers_mut()[idx] = (*canonical).to_string();
        }
    }
}

/// Cell values treated as missing rather than malformed.
pub fn is_missing_marker(s: &str) -> bool {
    matches!(
        s.to_ascii_lowercase().as_str(),
        "" | "-" | "—" | "n/a" | "na" | "null" | "none" | "nan"
    )
}

/// Best-effort numeric coercion for export cells.
///
/// Strips thousands separators and leading currency symbols, converts
/// accounting parentheses to negatives, and divides by 100 on a trailing `%`.
/// Missing markers and anything unparseable return `None`.
pub fn coerce_numeric(raw: &str) -> Option<f64> {
    let s = raw.trim();
    if is_missing_marker(s) {
        return None;
    }

    let (s, accounting_negative) = match s.strip_prefix('(').and_then(|t| t.strip_suffix(')')) {
        Some(inner) => (inner.trim(), true),
        None => (s, false),
    };

    let s = s
        .strip_prefix('$')
        .or_else(|| s.strip_prefix('€'))
        .or_else(|| s.strip_prefix('£'))
        .map_or(s, str::trim);

    let (s, percent) = match s.strip_suffix('%') {
        Some(t) => (t.trim(), true),
        None => (s, false),
    };

    let cleaned: String = s.chars().filter(|c| *c != ',' && *c != ' ').collect();
    let mut value: f64 = cleaned.parse().ok()?;
    if accounting_negative {
        value = -value;
    }
    if percent {
        value /= 100.0;
    }
    Some(value)
}

/// Rescale a column of values according to its declared unit.
///
/// `Percent` divides by 100 unconditionally. `Auto` applies the legacy scale
/// sniff (observed finite max > 1.5 means the column is on a 0–100 scale) and
/// exists only for exports whose vintage is unknown.
pub fn rescale_unit(values: &mut [Option<f64>], unit: Unit) {
    let divide = match unit {
        Unit::Fraction => false,
        Unit::Percent => true,
        Unit::Auto => {
            let max = values
                .iter()
                .filter_map(|v| *v)
                .filter(|v| v.is_finite())
                .fold(f64::NEG_INFINITY, f64::max);
            max.is_finite() && max > 1.5
        }
    };
    if divide {
        for v in values.iter_mut().flatten() {
            *v /= 100.0;
        }
    }
}
