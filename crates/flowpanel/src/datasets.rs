//! Typed schemas for the CSV exports under the data directory. Extraction
//! never panics: a file-level failure is [`Extracted::Missing`], absent
//! canonical columns are [`Extracted::Schema`], and per-cell coercion
//! failures degrade to `None` values.

use std::path::Path;

use common::config::Config;
use common::types::Month;

use crate::loader::{self, Dataset};
pub use crate::loader::MissingReason;
use crate::normalize;
use crate::table::{Row, Table};

/// A loaded table was structurally usable but lacked expected columns.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{file}: missing expected columns: {}", missing.join(", "))]
pub struct SchemaIssue {
    pub file: String,
    pub missing: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Extracted<T> {
    Rows(Vec<T>),
    Missing(MissingReason),
    Schema(SchemaIssue),
}

/// One schema per export file: canonical filename, required canonical
/// columns, and row construction from a normalized table.
pub trait DatasetSchema: Sized {
    const FILE: &'static str;
    const REQUIRED: &'static [&'static str];

    fn from_row(table: &Table, row: &Row, month: Month) -> Self;

    /// Invariant check; a `Some` message is logged at warn, the row is kept.
    fn invariant_violation(&self) -> Option<String> {
        None
    }
}

fn text(table: &Table, row: &Row, col: &str) -> String {
    table
        .column_index(col)
        .map(|i| table.cell(row, i).trim().to_string())
        .unwrap_or_default()
}

fn num(table: &Table, row: &Row, col: &str) -> Option<f64> {
    let idx = table.column_index(col)?;
    let raw = table.cell(row, idx);
    let value = normalize::coerce_numeric(raw);
    if value.is_none() && !normalize::is_missing_marker(raw.trim()) {
        tracing::debug!(column = col, cell = raw, "numeric coercion failed");
        metrics::counter!("flowpanel_coercion_failures_total").increment(1);
    }
    value
}

/// Load a dataset from an explicit file name (used by the fees fallback).
pub fn load_rows_at<T: DatasetSchema>(config: &Config, file: &str) -> Extracted<T> {
    let path = Path::new(&config.data.dir).join(file);
    let table = match loader::load_dataset(&path) {
        Dataset::Loaded(t) => t,
        Dataset::Missing(reason) => return Extracted::Missing(reason),
    };

    let missing = table.missing_columns(T::REQUIRED);
    if !missing.is_empty() {
        tracing::warn!(file, missing = ?missing, "dataset missing expected columns");
        metrics::counter!("flowpanel_schema_issues_total").increment(1);
        return Extracted::Schema(SchemaIssue {
            file: file.to_string(),
            missing,
        });
    }

    let rows: Vec<T> = table
        .rows()
        .iter()
        .filter_map(|r| r.month.map(|m| T::from_row(&table, r, m)))
        .collect();
    for r in &rows {
        if let Some(msg) = r.invariant_violation() {
            tracing::warn!(file, "{msg}");
        }
    }
    Extracted::Rows(rows)
}

pub fn load_rows<T: DatasetSchema>(config: &Config) -> Extracted<T> {
    load_rows_at(config, T::FILE)
}

fn warn_negative(what: &str, month: Month, value: Option<f64>) -> Option<String> {
    match value {
        Some(v) if v < 0.0 => Some(format!("{month}: negative {what} ({v})")),
        _ => None,
    }
}

/// `volume_category.csv` — stacked on-chain volume by vertical.
#[derive(Debug, Clone, PartialEq)]
pub struct VolumeRow {
    pub month: Month,
    pub category: String,
    pub volume_usd_billions: Option<f64>,
}

impl DatasetSchema for VolumeRow {
    const FILE: &'static str = "volume_category.csv";
    const REQUIRED: &'static [&'static str] = &["MONTH", "CATEGORY", "VOLUME_USD_BILLIONS"];

    fn from_row(table: &Table, row: &Row, month: Month) -> Self {
        Self {
            month,
            category: text(table, row, "CATEGORY"),
            volume_usd_billions: num(table, row, "VOLUME_USD_BILLIONS"),
        }
    }

    fn invariant_violation(&self) -> Option<String> {
        warn_negative("volume", self.month, self.volume_usd_billions)
    }
}

/// `active_addresses.csv` — breadth (addresses) and intensity (transactions)
/// per category.
#[derive(Debug, Clone, PartialEq)]
pub struct ActivityRow {
    pub month: Month,
    pub category: String,
    pub active_addresses: Option<f64>,
    pub transactions: Option<f64>,
}

impl DatasetSchema for ActivityRow {
    const FILE: &'static str = "active_addresses.csv";
    const REQUIRED: &'static [&'static str] =
        &["MONTH", "CATEGORY", "ACTIVE_ADDRESSES", "TRANSACTIONS"];

    fn from_row(table: &Table, row: &Row, month: Month) -> Self {
        Self {
            month,
            category: text(table, row, "CATEGORY"),
            active_addresses: num(table, row, "ACTIVE_ADDRESSES"),
            transactions: num(table, row, "TRANSACTIONS"),
        }
    }

    fn invariant_violation(&self) -> Option<String> {
        warn_negative("active address count", self.month, self.active_addresses)
            .or_else(|| warn_negative("transaction count", self.month, self.transactions))
    }
}

/// `user_cohort.csv` — volume cohorts (Whale/Large/Small...).
#[derive(Debug, Clone, PartialEq)]
pub struct CohortRow {
    pub month: Month,
    pub cohort: String,
    pub unique_users: Option<f64>,
    pub total_volume: Option<f64>,
}

impl DatasetSchema for CohortRow {
    const FILE: &'static str = "user_cohort.csv";
    const REQUIRED: &'static [&'static str] = &["MONTH", "COHORT", "UNIQUE_USERS", "TOTAL_VOLUME"];

    fn from_row(table: &Table, row: &Row, month: Month) -> Self {
        Self {
            month,
            cohort: text(table, row, "COHORT"),
            unique_users: num(table, row, "UNIQUE_USERS"),
            total_volume: num(table, row, "TOTAL_VOLUME"),
        }
    }

    fn invariant_violation(&self) -> Option<String> {
        warn_negative("unique user count", self.month, self.unique_users)
    }
}

/// `user_typology.csv` — user type x activity level.
#[derive(Debug, Clone, PartialEq)]
pub struct TypologyRow {
    pub month: Month,
    pub user_type: String,
    pub activity_level: String,
    pub unique_users: Option<f64>,
    pub avg_transactions_per_user: Option<f64>,
}

impl DatasetSchema for TypologyRow {
    const FILE: &'static str = "user_typology.csv";
    const REQUIRED: &'static [&'static str] = &[
        "MONTH",
        "USER_TYPE",
        "ACTIVITY_LEVEL",
        "UNIQUE_USERS",
        "AVG_TRANSACTIONS_PER_USER",
    ];

    fn from_row(table: &Table, row: &Row, month: Month) -> Self {
        Self {
            month,
            user_type: text(table, row, "USER_TYPE"),
            activity_level: text(table, row, "ACTIVITY_LEVEL"),
            unique_users: num(table, row, "UNIQUE_USERS"),
            avg_transactions_per_user: num(table, row, "AVG_TRANSACTIONS_PER_USER"),
        }
    }
}

/// `dex_volume.csv` — network-wide DEX totals.
#[derive(Debug, Clone, PartialEq)]
pub struct DexRow {
    pub month: Month,
    pub active_swappers: Option<f64>,
    pub total_volume_billions: Option<f64>,
}

impl DatasetSchema for DexRow {
    const FILE: &'static str = "dex_volume.csv";
    const REQUIRED: &'static [&'static str] = &["MONTH", "ACTIVE_SWAPPERS", "TOTAL_VOLUME_BILLIONS"];

    fn from_row(table: &Table, row: &Row, month: Month) -> Self {
        Self {
            month,
            active_swappers: num(table, row, "ACTIVE_SWAPPERS"),
            total_volume_billions: num(table, row, "TOTAL_VOLUME_BILLIONS"),
        }
    }
}

/// `lending_deposits.csv` — deposits per platform.
#[derive(Debug, Clone, PartialEq)]
pub struct LendingRow {
    pub month: Month,
    pub platform: String,
    pub volume_usd_billions: Option<f64>,
    pub unique_depositors: Option<f64>,
}

impl DatasetSchema for LendingRow {
    const FILE: &'static str = "lending_deposits.csv";
    const REQUIRED: &'static [&'static str] =
        &["MONTH", "PLATFORM", "VOLUME_USD_BILLIONS", "UNIQUE_DEPOSITORS"];

    fn from_row(table: &Table, row: &Row, month: Month) -> Self {
        Self {
            month,
            platform: text(table, row, "PLATFORM"),
            volume_usd_billions: num(table, row, "VOLUME_USD_BILLIONS"),
            unique_depositors: num(table, row, "UNIQUE_DEPOSITORS"),
        }
    }

    fn invariant_violation(&self) -> Option<String> {
        warn_negative("deposit volume", self.month, self.volume_usd_billions)
    }
}

/// `bridged_volume.csv` — total cross-chain bridge volume.
#[derive(Debug, Clone, PartialEq)]
pub struct BridgeRow {
    pub month: Month,
    pub total_bridge_volume_billions: Option<f64>,
}

impl DatasetSchema for BridgeRow {
    const FILE: &'static str = "bridged_volume.csv";
    const REQUIRED: &'static [&'static str] = &["MONTH", "TOTAL_BRIDGE_VOLUME_BILLIONS"];

    fn from_row(table: &Table, row: &Row, month: Month) -> Self {
        Self {
            month,
            total_bridge_volume_billions: num(table, row, "TOTAL_BRIDGE_VOLUME_BILLIONS"),
        }
    }
}

/// `eth_price.csv` — monthly average price plus composite activity index.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceRow {
    pub month: Month,
    pub avg_eth_price_usd: Option<f64>,
    pub activity_index: Option<f64>,
}

impl DatasetSchema for PriceRow {
    const FILE: &'static str = "eth_price.csv";
    const REQUIRED: &'static [&'static str] = &["MONTH", "AVG_ETH_PRICE_USD", "ACTIVITY_INDEX"];

    fn from_row(table: &Table, row: &Row, month: Month) -> Self {
        Self {
            month,
            avg_eth_price_usd: num(table, row, "AVG_ETH_PRICE_USD"),
            activity_index: num(table, row, "ACTIVITY_INDEX"),
        }
    }
}

/// `fees_price.csv` — price vs execution cost. `PRICE_TO_FEE_RATIO` is an
/// optional column on some vintages; absent it is derived at report time.
#[derive(Debug, Clone, PartialEq)]
pub struct FeeRow {
    pub month: Month,
    pub avg_eth_price_usd: Option<f64>,
    pub avg_fee_usd: Option<f64>,
    pub price_to_fee_ratio: Option<f64>,
}

impl DatasetSchema for FeeRow {
    const FILE: &'static str = "fees_price.csv";
    const REQUIRED: &'static [&'static str] = &["MONTH", "AVG_ETH_PRICE_USD", "AVG_FEE_USD"];

    fn from_row(table: &Table, row: &Row, month: Month) -> Self {
        Self {
            month,
            avg_eth_price_usd: num(table, row, "AVG_ETH_PRICE_USD"),
            avg_fee_usd: num(table, row, "AVG_FEE_USD"),
            price_to_fee_ratio: num(table, row, "PRICE_TO_FEE_RATIO"),
        }
    }
}

/// Adoption vs fee level. Primary file `fees_activity.csv`; some exports only
/// ship `fees_price.csv`, whose renamed columns carry the same fields
/// (see [`load_fee_activity`]). Users arrive as a raw unique count or as
/// `USERS_MILLIONS`.
#[derive(Debug, Clone, PartialEq)]
pub struct FeeActivityRow {
    pub month: Month,
    pub unique_users: Option<f64>,
    pub avg_fee_usd: Option<f64>,
}

impl DatasetSchema for FeeActivityRow {
    const FILE: &'static str = "fees_activity.csv";
    const REQUIRED: &'static [&'static str] = &["MONTH", "AVG_FEE_USD"];

    fn from_row(table: &Table, row: &Row, month: Month) -> Self {
        let unique_users = num(table, row, "UNIQUE_USERS")
            .or_else(|| num(table, row, "USERS_MILLIONS").map(|m| m * 1e6));
        Self {
            month,
            unique_users,
            avg_fee_usd: num(table, row, "AVG_FEE_USD"),
        }
    }
}

/// Load the adoption-vs-fee dataset, falling back to `fees_price.csv` when
/// `fees_activity.csv` is absent (source behavior).
pub fn load_fee_activity(config: &Config) -> Extracted<FeeActivityRow> {
    match load_rows::<FeeActivityRow>(config) {
        Extracted::Missing(_) => load_rows_at::<FeeActivityRow>(config, FeeRow::FILE),
        other => other,
    }
}

/// `etf_flows.csv` — spot ETF net flows, USD millions (negative = outflow).
#[derive(Debug, Clone, PartialEq)]
pub struct EtfFlowRow {
    pub month: Month,
    pub etf_net_flow_usd_millions: Option<f64>,
}

impl DatasetSchema for EtfFlowRow {
    const FILE: &'static str = "etf_flows.csv";
    const REQUIRED: &'static [&'static str] = &["MONTH", "ETF_NET_FLOW_USD_MILLIONS"];

    fn from_row(table: &Table, row: &Row, month: Month) -> Self {
        Self {
            month,
            etf_net_flow_usd_millions: num(table, row, "ETF_NET_FLOW_USD_MILLIONS"),
        }
    }
}

/// `fedfunds_history.csv` — historical effective fed funds rate, percent.
#[derive(Debug, Clone, PartialEq)]
pub struct FedFundsRow {
    pub month: Month,
    pub rate_pct: Option<f64>,
}

impl DatasetSchema for FedFundsRow {
    const FILE: &'static str = "fedfunds_history.csv";
    const REQUIRED: &'static [&'static str] = &["MONTH", "FEDFUNDS_RATE_PCT"];

    fn from_row(table: &Table, row: &Row, month: Month) -> Self {
        Self {
            month,
            rate_pct: num(table, row, "FEDFUNDS_RATE_PCT"),
        }
    }
}

/// `rates_expectations.csv` — implied rate-move direction with probability.
/// Probability scale follows the declared unit (`[units]` in config); after
/// rescaling the value must land in [0, 1].
#[derive(Debug, Clone, PartialEq)]
pub struct RatesRow {
    pub month: Month,
    pub direction: String,
    pub probability: Option<f64>,
}

impl DatasetSchema for RatesRow {
    const FILE: &'static str = "rates_expectations.csv";
    const REQUIRED: &'static [&'static str] = &["MONTH", "RATES_DIRECTION", "RATES_PROBABILITY"];

    fn from_row(table: &Table, row: &Row, month: Month) -> Self {
        Self {
            month,
            direction: text(table, row, "RATES_DIRECTION"),
            probability: num(table, row, "RATES_PROBABILITY"),
        }
    }
}

/// Load rates expectations and apply the declared probability unit across
/// the whole column (auto-detection needs the column, not a cell).
pub fn load_rates(config: &Config) -> Extracted<RatesRow> {
    let mut extracted = load_rows::<RatesRow>(config);
    if let Extracted::Rows(rows) = &mut extracted {
        let mut probs: Vec<Option<f64>> = rows.iter().map(|r| r.probability).collect();
        normalize::rescale_unit(&mut probs, config.unit_for("RATES_PROBABILITY"));
        for (row, p) in rows.iter_mut().zip(probs) {
            row.probability = p;
        }
        for row in rows.iter() {
            if let Some(p) = row.probability {
                if !(0.0..=1.0).contains(&p) {
                    tracing::warn!(
                        month = %row.month,
                        probability = p,
                        "rates probability outside [0, 1] after unit rescale"
                    );
                }
            }
        }
    }
    extracted
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::config::Config;
    use std::io::Write;

    fn config_for(dir: &Path) -> Config {
        let toml = format!(
            r#"
[general]
log_level = "info"

[data]
dir = "{}"

[report]
bridge_hub_min_growth_pct = 50.0

[units]
RATES_PROBABILITY = "percent"
"#,
            dir.display()
        );
        Config::from_toml_str(&toml).unwrap()
    }

    fn write_file(dir: &Path, name: &str, content: &str) {
        let mut f = std::fs::File::create(dir.join(name)).unwrap();
        f.write_all(content.as_bytes()).unwrap();
    }

    #[test]
    fn test_volume_rows_extract() {
        let dir = tempfile::tempdir().unwrap();
        write_file(
            dir.path(),
            "volume_category.csv",
            "MONTH,CATEGORY,VOLUME_USD_BILLIONS\n2025-06-01,DEX,10.0\n2025-06-01,Lending,5.0\n",
        );
        let cfg = config_for(dir.path());
        let Extracted::Rows(rows) = load_rows::<VolumeRow>(&cfg) else {
            panic!("expected rows");
        };
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].category, "DEX");
        assert_eq!(rows[0].volume_usd_billions, Some(10.0));
    }

    #[test]
    fn test_sector_synonym_satisfies_category() {
        let dir = tempfile::tempdir().unwrap();
        write_file(
            dir.path(),
            "active_addresses.csv",
            "MONTH,SECTOR,ACTIVE_ADDRESSES,TRANSACTIONS\n2025-06-01,DEX,1000,5000\n",
        );
        let cfg = config_for(dir.path());
        let Extracted::Rows(rows) = load_rows::<ActivityRow>(&cfg) else {
            panic!("expected rows");
        };
        assert_eq!(rows[0].category, "DEX");
        assert_eq!(rows[0].transactions, Some(5000.0));
    }

    #[test]
    fn test_missing_column_is_schema_issue() {
        let dir = tempfile::tempdir().unwrap();
        write_file(
            dir.path(),
            "volume_category.csv",
            "MONTH,CATEGORY\n2025-06-01,DEX\n",
        );
        let cfg = config_for(dir.path());
        let Extracted::Schema(issue) = load_rows::<VolumeRow>(&cfg) else {
            panic!("expected schema issue");
        };
        assert_eq!(issue.missing, vec!["VOLUME_USD_BILLIONS".to_string()]);
    }

    #[test]
    fn test_absent_file_is_missing() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = config_for(dir.path());
        let got = load_rows::<BridgeRow>(&cfg);
        assert_eq!(got, Extracted::Missing(MissingReason::NotFound));
    }

    #[test]
    fn test_unparseable_cell_becomes_none() {
        let dir = tempfile::tempdir().unwrap();
        write_file(
            dir.path(),
            "bridged_volume.csv",
            "MONTH,TOTAL_BRIDGE_VOLUME_BILLIONS\n2025-06-01,12.5\n2025-07-01,oops\n",
        );
        let cfg = config_for(dir.path());
        let Extracted::Rows(rows) = load_rows::<BridgeRow>(&cfg) else {
            panic!("expected rows");
        };
        assert_eq!(rows[0].total_bridge_volume_billions, Some(12.5));
        assert_eq!(rows[1].total_bridge_volume_billions, None);
    }

    #[test]
    fn test_fee_activity_users_millions_scaled() {
        let dir = tempfile::tempdir().unwrap();
        write_file(
            dir.path(),
            "fees_activity.csv",
            "MONTH,USERS_MILLIONS,AVG_FEE_USD\n2025-06-01,1.5,2.10\n",
        );
        let cfg = config_for(dir.path());
        let Extracted::Rows(rows) = load_fee_activity(&cfg) else {
            panic!("expected rows");
        };
        assert_eq!(rows[0].unique_users, Some(1_500_000.0));
    }

    #[test]
    fn test_fee_activity_falls_back_to_fees_price() {
        let dir = tempfile::tempdir().unwrap();
        write_file(
            dir.path(),
            "fees_price.csv",
            "MONTH,AVG_ETH_PRICE_USD,AVG_TX_FEE_USD,UNIQUE_USERS\n2025-06-01,3000,2.50,400000\n",
        );
        let cfg = config_for(dir.path());
        let Extracted::Rows(rows) = load_fee_activity(&cfg) else {
            panic!("expected rows from fallback");
        };
        assert_eq!(rows[0].avg_fee_usd, Some(2.50));
        assert_eq!(rows[0].unique_users, Some(400_000.0));
    }

    #[test]
    fn test_rates_probability_rescaled_by_declared_unit() {
        let dir = tempfile::tempdir().unwrap();
        write_file(
            dir.path(),
            "rates_expectations.csv",
            "MONTH,RATES_DIRECTION,RATES_PROBABILITY\n2025-06-01,cut,87\n2025-07-01,hold,55\n",
        );
        let cfg = config_for(dir.path());
        let Extracted::Rows(rows) = load_rates(&cfg) else {
            panic!("expected rows");
        };
        assert_eq!(rows[0].probability, Some(0.87));
        assert_eq!(rows[1].probability, Some(0.55));
    }

    #[test]
    fn test_fees_price_optional_ratio_column() {
        let dir = tempfile::tempdir().unwrap();
        write_file(
            dir.path(),
            "fees_price.csv",
            "MONTH,AVG_ETH_PRICE_USD,AVG_TX_FEE_USD\n2025-06-01,3000,2.50\n",
        );
        let cfg = config_for(dir.path());
        let Extracted::Rows(rows) = load_rows::<FeeRow>(&cfg) else {
            panic!("expected rows");
        };
        assert_eq!(rows[0].avg_fee_usd, Some(2.50));
        assert_eq!(rows[0].price_to_fee_ratio, None);
    }
}
