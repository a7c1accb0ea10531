//! Builds the panel report: one summary per dashboard section, each carrying
//! its dataset state explicitly instead of an "is it empty" check.

use common::config::Config;
use common::types::Month;

use crate::aggregate::{
    latest_month, mean_by_month, pivot_sum, share_matrix, sum_by_month, MonthlySeries, Pivot,
};
use crate::datasets::{
    self, ActivityRow, BridgeRow, CohortRow, DexRow, EtfFlowRow, Extracted, FeeActivityRow,
    FedFundsRow, FeeRow, LendingRow, MissingReason, PriceRow, RatesRow, SchemaIssue, TypologyRow,
    VolumeRow,
};
use crate::kpi::{self, Growth};

/// Per-section dataset state.
#[derive(Debug, Clone, PartialEq)]
pub enum Section<T> {
    Ready(T),
    Missing(MissingReason),
    Schema(SchemaIssue),
}

impl<T> Section<T> {
    #[cfg(test)]
    pub fn ready(&self) -> Option<&T> {
        match self {
            Section::Ready(t) => Some(t),
            _ => None,
        }
    }
}

fn section<T, S>(extracted: Extracted<T>, summarize: impl FnOnce(Vec<T>) -> S) -> Section<S> {
    match extracted {
        Extracted::Rows(rows) => Section::Ready(summarize(rows)),
        Extracted::Missing(reason) => Section::Missing(reason),
        Extracted::Schema(issue) => Section::Schema(issue),
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct VolumeSummary {
    pub monthly_totals: MonthlySeries,
    pub peak: Option<(Month, f64)>,
    pub dex_dominance_pct: Option<f64>,
    pub shares_latest: Pivot,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MetricSummary {
    pub totals: MonthlySeries,
    pub peak: Option<(Month, f64)>,
    pub dex_share_pct: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ActivitySummary {
    pub addresses: MetricSummary,
    pub transactions: MetricSummary,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CohortSummary {
    pub users_by_cohort: Pivot,
    pub whale_user_share_pct: Option<f64>,
    pub whale_avg_volume_usd: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TypologySummary {
    pub users_by_type: Pivot,
    pub multi_sector_share_pct: Option<f64>,
    pub engagement_multiplier: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DexSummary {
    pub volume: MonthlySeries,
    pub swappers: MonthlySeries,
    pub peak_volume: Option<(Month, f64)>,
    pub volume_growth: Growth,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LendingSummary {
    pub deposits_by_platform: Pivot,
    pub top_platform: Option<(String, f64)>,
    pub depositors_growth: Growth,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BridgeStatus {
    EmergingHub,
    StableMixed,
}

impl BridgeStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::EmergingHub => "Emerging Cross-Chain Hub",
            Self::StableMixed => "Stable / Mixed",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BridgeSummary {
    pub volume: MonthlySeries,
    pub growth: Growth,
    pub status: BridgeStatus,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PriceSummary {
    pub price_range: Option<(f64, f64)>,
    pub pearson_price_activity: Option<f64>,
    pub spearman_price_activity: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FeeAdoptionSummary {
    pub user_growth: Growth,
    pub fee_change: Growth,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FeesPriceSummary {
    pub corr_price_fee: Option<f64>,
    pub price_to_fee_ratio_latest: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EtfSummary {
    pub total_net_flow_millions: Option<f64>,
    pub best_month: Option<(Month, f64)>,
    pub worst_month: Option<(Month, f64)>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RatesSummary {
    pub latest: Option<(Month, String, Option<f64>)>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FedFundsSummary {
    pub latest: Option<(Month, f64)>,
    /// Change in percentage points from the first to the latest observation.
    pub change_pts: Option<f64>,
}

#[derive(Debug)]
pub struct PanelReport {
    pub volume: Section<VolumeSummary>,
    pub activity: Section<ActivitySummary>,
    pub cohorts: Section<CohortSummary>,
    pub typology: Section<TypologySummary>,
    pub dex: Section<DexSummary>,
    pub lending: Section<LendingSummary>,
    pub bridge: Section<BridgeSummary>,
    pub price: Section<PriceSummary>,
    pub fee_adoption: Section<FeeAdoptionSummary>,
    pub fees_price: Section<FeesPriceSummary>,
    pub etf: Section<EtfSummary>,
    pub rates: Section<RatesSummary>,
    pub fedfunds: Section<FedFundsSummary>,
}

pub fn build(config: &Config) -> PanelReport {
    PanelReport {
        volume: volume_section(config),
        activity: activity_section(config),
        cohorts: cohort_section(config),
        typology: typology_section(config),
        dex: dex_section(config),
        lending: lending_section(config),
        bridge: bridge_section(config),
        price: price_section(config),
        fee_adoption: fee_adoption_section(config),
        fees_price: fees_price_section(config),
        etf: etf_section(config),
        rates: rates_section(config),
        fedfunds: fedfunds_section(config),
    }
}

pub fn volume_section(config: &Config) -> Section<VolumeSummary> {
    section(datasets::load_rows::<VolumeRow>(config), volume_summary)
}

pub fn activity_section(config: &Config) -> Section<ActivitySummary> {
    section(datasets::load_rows::<ActivityRow>(config), activity_summary)
}

pub fn cohort_section(config: &Config) -> Section<CohortSummary> {
    section(datasets::load_rows::<CohortRow>(config), cohort_summary)
}

pub fn typology_section(config: &Config) -> Section<TypologySummary> {
    section(datasets::load_rows::<TypologyRow>(config), typology_summary)
}

pub fn dex_section(config: &Config) -> Section<DexSummary> {
    section(datasets::load_rows::<DexRow>(config), dex_summary)
}

pub fn lending_section(config: &Config) -> Section<LendingSummary> {
    section(datasets::load_rows::<LendingRow>(config), lending_summary)
}

pub fn bridge_section(config: &Config) -> Section<BridgeSummary> {
    section(datasets::load_rows::<BridgeRow>(config), |rows| {
        bridge_summary(rows, config.report.bridge_hub_min_growth_pct)
    })
}

pub fn price_section(config: &Config) -> Section<PriceSummary> {
    section(datasets::load_rows::<PriceRow>(config), price_summary)
}

pub fn fee_adoption_section(config: &Config) -> Section<FeeAdoptionSummary> {
    section(datasets::load_fee_activity(config), fee_adoption_summary)
}

pub fn fees_price_section(config: &Config) -> Section<FeesPriceSummary> {
    section(datasets::load_rows::<FeeRow>(config), fees_price_summary)
}

pub fn etf_section(config: &Config) -> Section<EtfSummary> {
    section(datasets::load_rows::<EtfFlowRow>(config), etf_summary)
}

pub fn rates_section(config: &Config) -> Section<RatesSummary> {
    section(datasets::load_rates(config), rates_summary)
}

pub fn fedfunds_section(config: &Config) -> Section<FedFundsSummary> {
    section(datasets::load_rows::<FedFundsRow>(config), fedfunds_summary)
}

fn volume_summary(rows: Vec<VolumeRow>) -> VolumeSummary {
    let monthly_totals = sum_by_month(&rows, |r| r.month, |r| r.volume_usd_billions);
    let by_category = pivot_sum(
        &rows,
        |r| r.month,
        |r| r.category.as_str(),
        |r| r.volume_usd_billions,
    );
    VolumeSummary {
        peak: kpi::peak(&monthly_totals),
        dex_dominance_pct: kpi::dominance_share(&by_category, "dex"),
        shares_latest: share_matrix(&by_category),
        monthly_totals,
    }
}

fn metric_summary(rows: &[ActivityRow], value: impl Fn(&ActivityRow) -> Option<f64>) -> MetricSummary {
    let totals = sum_by_month(rows, |r| r.month, &value);
    let pivot = pivot_sum(rows, |r| r.month, |r| r.category.as_str(), &value);
    MetricSummary {
        peak: kpi::peak(&totals),
        dex_share_pct: kpi::dominance_share(&pivot, "dex"),
        totals,
    }
}

fn activity_summary(rows: Vec<ActivityRow>) -> ActivitySummary {
    ActivitySummary {
        addresses: metric_summary(&rows, |r| r.active_addresses),
        transactions: metric_summary(&rows, |r| r.transactions),
    }
}

fn cohort_summary(rows: Vec<CohortRow>) -> CohortSummary {
    let users_by_cohort = pivot_sum(
        &rows,
        |r| r.month,
        |r| r.cohort.as_str(),
        |r| r.unique_users,
    );
    let whale_user_share_pct = kpi::dominance_share(&users_by_cohort, "whale");

    // Whale average volume in the latest month: whale volume over whale users.
    let whale_avg_volume_usd = users_by_cohort.latest_month().and_then(|latest| {
        let whale = |r: &&CohortRow| {
            r.month == latest && r.cohort.to_ascii_lowercase().contains("whale")
        };
        let users: f64 = rows
            .iter()
            .filter(whale)
            .filter_map(|r| r.unique_users)
            .sum();
        let volume: f64 = rows
            .iter()
            .filter(whale)
            .filter_map(|r| r.total_volume)
            .sum();
        (users > 0.0).then(|| volume / users)
    });

    CohortSummary {
        users_by_cohort,
        whale_user_share_pct,
        whale_avg_volume_usd,
    }
}

fn typology_summary(rows: Vec<TypologyRow>) -> TypologySummary {
    let users_by_type = pivot_sum(
        &rows,
        |r| r.month,
        |r| r.user_type.as_str(),
        |r| r.unique_users,
    );
    let multi_sector_share_pct = kpi::dominance_share(&users_by_type, "multi");

    // Engagement multiplier: mean tx/user of multi-sector types over
    // single-sector types, across all months.
    let mean_for = |needle: &str| {
        let vals: Vec<f64> = rows
            .iter()
            .filter(|r| r.user_type.to_ascii_lowercase().contains(needle))
            .filter_map(|r| r.avg_transactions_per_user)
            .filter(|v| v.is_finite())
            .collect();
        (!vals.is_empty()).then(|| vals.iter().sum::<f64>() / vals.len() as f64)
    };
    let engagement_multiplier = match (mean_for("multi"), mean_for("single")) {
        (Some(multi), Some(single)) if single > 0.0 => Some(multi / single),
        _ => None,
    };

    TypologySummary {
        users_by_type,
        multi_sector_share_pct,
        engagement_multiplier,
    }
}

fn dex_summary(rows: Vec<DexRow>) -> DexSummary {
    let volume = sum_by_month(&rows, |r| r.month, |r| r.total_volume_billions);
    let swappers = sum_by_month(&rows, |r| r.month, |r| r.active_swappers);
    DexSummary {
        peak_volume: kpi::peak(&volume),
        volume_growth: kpi::growth_since_start(&volume),
        volume,
        swappers,
    }
}

fn lending_summary(rows: Vec<LendingRow>) -> LendingSummary {
    let deposits_by_platform = pivot_sum(
        &rows,
        |r| r.month,
        |r| r.platform.as_str(),
        |r| r.volume_usd_billions,
    );
    let depositors = sum_by_month(&rows, |r| r.month, |r| r.unique_depositors);
    LendingSummary {
        top_platform: kpi::top_category(&deposits_by_platform),
        depositors_growth: kpi::growth_since_start(&depositors),
        deposits_by_platform,
    }
}

fn bridge_summary(rows: Vec<BridgeRow>, hub_min_growth_pct: f64) -> BridgeSummary {
    let volume = sum_by_month(&rows, |r| r.month, |r| r.total_bridge_volume_billions);
    let growth = kpi::growth_since_start(&volume);
    let status = if growth.exceeds(hub_min_growth_pct) {
        BridgeStatus::EmergingHub
    } else {
        BridgeStatus::StableMixed
    };
    BridgeSummary {
        volume,
        growth,
        status,
    }
}

fn price_summary(rows: Vec<PriceRow>) -> PriceSummary {
    let prices: Vec<Option<f64>> = rows.iter().map(|r| r.avg_eth_price_usd).collect();
    let activity: Vec<Option<f64>> = rows.iter().map(|r| r.activity_index).collect();

    let finite: Vec<f64> = prices
        .iter()
        .flatten()
        .copied()
        .filter(|v| v.is_finite())
        .collect();
    let price_range = (!finite.is_empty()).then(|| {
        let min = finite.iter().copied().fold(f64::INFINITY, f64::min);
        let max = finite.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        (min, max)
    });

    PriceSummary {
        price_range,
        pearson_price_activity: kpi::pearson(&prices, &activity),
        spearman_price_activity: kpi::spearman(&prices, &activity),
    }
}

fn fee_adoption_summary(rows: Vec<FeeActivityRow>) -> FeeAdoptionSummary {
    let users = sum_by_month(&rows, |r| r.month, |r| r.unique_users);
    let fees = mean_by_month(&rows, |r| r.month, |r| r.avg_fee_usd);
    FeeAdoptionSummary {
        user_growth: kpi::growth_since_start(&users),
        fee_change: kpi::growth_since_start(&fees),
    }
}

fn fees_price_summary(rows: Vec<FeeRow>) -> FeesPriceSummary {
    let prices: Vec<Option<f64>> = rows.iter().map(|r| r.avg_eth_price_usd).collect();
    let fees: Vec<Option<f64>> = rows.iter().map(|r| r.avg_fee_usd).collect();

    // Latest ratio: the declared column when the export carries one,
    // otherwise derived from the latest month's price and fee.
    let price_to_fee_ratio_latest = rows
        .last()
        .and_then(|r| {
            r.price_to_fee_ratio.or_else(|| {
                match (r.avg_eth_price_usd, r.avg_fee_usd) {
                    (Some(p), Some(f)) if f > 0.0 => Some(p / f),
                    _ => None,
                }
            })
        })
        .filter(|v| v.is_finite());

    FeesPriceSummary {
        corr_price_fee: kpi::pearson(&prices, &fees),
        price_to_fee_ratio_latest,
    }
}

fn etf_summary(rows: Vec<EtfFlowRow>) -> EtfSummary {
    let flows = sum_by_month(&rows, |r| r.month, |r| r.etf_net_flow_usd_millions);
    let total = (!flows.is_empty()).then(|| flows.values().sum());
    let best = kpi::peak(&flows);
    let worst = flows
        .iter()
        .min_by(|a, b| a.1.partial_cmp(b.1).unwrap_or(std::cmp::Ordering::Equal))
        .map(|(m, v)| (*m, *v));
    EtfSummary {
        total_net_flow_millions: total,
        best_month: best,
        worst_month: worst,
    }
}

fn fedfunds_summary(rows: Vec<FedFundsRow>) -> FedFundsSummary {
    let rates = mean_by_month(&rows, |r| r.month, |r| r.rate_pct);
    let latest = latest_month(&rates).and_then(|m| rates.get(&m).map(|v| (m, *v)));
    let change_pts = match (rates.values().next(), rates.values().next_back()) {
        (Some(first), Some(last)) if rates.len() >= 2 => Some(last - first),
        _ => None,
    };
    FedFundsSummary { latest, change_pts }
}

fn rates_summary(rows: Vec<RatesRow>) -> RatesSummary {
    // Rows arrive month-sorted from the loader.
    let latest = rows
        .iter()
        .rev()
        .find(|r| !r.direction.is_empty())
        .map(|r| (r.month, r.direction.clone(), r.probability));
    RatesSummary { latest }
}
