//! Monthly group-by aggregation over typed dataset rows. Missing values are
//! skipped the way the source's frame sums/means ignored NaN.

use std::collections::{BTreeMap, BTreeSet};

use common::types::Month;

/// Ordered month -> value series. Months with no finite observation are
/// simply absent.
pub type MonthlySeries = BTreeMap<Month, f64>;

pub fn sum_by_month<T>(
    rows: &[T],
    month: impl Fn(&T) -> Month,
    value: impl Fn(&T) -> Option<f64>,
) -> MonthlySeries {
    let mut out = MonthlySeries::new();
    for r in rows {
        if let Some(v) = value(r).filter(|v| v.is_finite()) {
            *out.entry(month(r)).or_insert(0.0) += v;
        }
    }
    out
}

pub fn mean_by_month<T>(
    rows: &[T],
    month: impl Fn(&T) -> Month,
    value: impl Fn(&T) -> Option<f64>,
) -> MonthlySeries {
    let mut acc: BTreeMap<Month, (f64, u64)> = BTreeMap::new();
    for r in rows {
        if let Some(v) = value(r).filter(|v| v.is_finite()) {
            let slot = acc.entry(month(r)).or_insert((0.0, 0));
            slot.0 += v;
            slot.1 += 1;
        }
    }
    acc.into_iter()
        .map(|(m, (sum, n))| (m, sum / n as f64))
        .collect()
}

/// Month x category matrix with deterministic iteration on both axes.
#[derive(Debug, Clone, PartialEq)]
pub struct Pivot {
    pub categories: BTreeSet<String>,
    pub cells: BTreeMap<Month, BTreeMap<String, f64>>,
}

impl Pivot {
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn latest_month(&self) -> Option<Month> {
        self.cells.keys().next_back().copied()
    }

    pub fn month_total(&self, month: Month) -> f64 {
        self.cells
            .get(&month)
            .map_or(0.0, |by_cat| by_cat.values().sum())
    }
}

/// Pivot rows into (month, category) cells, summing duplicates.
pub fn pivot_sum<T>(
    rows: &[T],
    month: impl Fn(&T) -> Month,
    category: impl Fn(&T) -> &str,
    value: impl Fn(&T) -> Option<f64>,
) -> Pivot {
    let mut categories = BTreeSet::new();
    let mut cells: BTreeMap<Month, BTreeMap<String, f64>> = BTreeMap::new();
    for r in rows {
        let cat = category(r).to_string();
        categories.insert(cat.clone());
        if let Some(v) = value(r).filter(|v| v.is_finite()) {
            *cells.entry(month(r)).or_default().entry(cat).or_insert(0.0) += v;
        }
    }
    Pivot { categories, cells }
}

/// 100%-normalize each month across categories. A month whose total is zero
/// is left as-is rather than divided.
pub fn share_matrix(pivot: &Pivot) -> Pivot {
    let mut cells = BTreeMap::new();
    for (month, by_cat) in &pivot.cells {
        let total: f64 = by_cat.values().sum();
        let shares = if total > 0.0 {
            by_cat
                .iter()
                .map(|(c, v)| (c.clone(), v / total * 100.0))
                .collect()
        } else {
            by_cat.clone()
        };
        cells.insert(*month, shares);
    }
    Pivot {
        categories: pivot.categories.clone(),
        cells,
    }
}

pub fn latest_month(series: &MonthlySeries) -> Option<Month> {
    series.keys().next_back().copied()
}

#[cfg(test)]
mod tests {
    use super::*;

    struct R {
        m: Month,
        cat: &'static str,
        v: Option<f64>,
    }

    fn rows() -> Vec<R> {
        let jun = Month::new(2025, 6).unwrap();
        let jul = Month::new(2025, 7).unwrap();
        vec![
            R { m: jun, cat: "DEX", v: Some(10.0) },
            R { m: jun, cat: "Lending", v: Some(5.0) },
            R { m: jul, cat: "DEX", v: Some(12.0) },
            R { m: jul, cat: "Lending", v: None },
        ]
    }

    #[test]
    fn test_sum_by_month_skips_missing() {
        let rows = rows();
        let s = sum_by_month(&rows, |r| r.m, |r| r.v);
        assert_eq!(s[&Month::new(2025, 6).unwrap()], 15.0);
        assert_eq!(s[&Month::new(2025, 7).unwrap()], 12.0);
    }

    #[test]
    fn test_mean_by_month_ignores_missing_in_count() {
        let jun = Month::new(2025, 6).unwrap();
        let rows = vec![
            R { m: jun, cat: "a", v: Some(2.0) },
            R { m: jun, cat: "b", v: Some(4.0) },
            R { m: jun, cat: "c", v: None },
        ];
        let s = mean_by_month(&rows, |r| r.m, |r| r.v);
        assert_eq!(s[&jun], 3.0);
    }

    #[test]
    fn test_pivot_sums_duplicates() {
        let jun = Month::new(2025, 6).unwrap();
        let rows = vec![
            R { m: jun, cat: "DEX", v: Some(1.0) },
            R { m: jun, cat: "DEX", v: Some(2.0) },
        ];
        let p = pivot_sum(&rows, |r| r.m, |r| r.cat, |r| r.v);
        assert_eq!(p.cells[&jun]["DEX"], 3.0);
    }

    #[test]
    fn test_share_matrix_sums_to_100_per_month() {
        let rows = rows();
        let p = pivot_sum(&rows, |r| r.m, |r| r.cat, |r| r.v);
        let shares = share_matrix(&p);
        for by_cat in shares.cells.values() {
            let total: f64 = by_cat.values().sum();
            assert!((total - 100.0).abs() < 1e-9, "month total was {total}");
        }
        let jun = Month::new(2025, 6).unwrap();
        assert!((shares.cells[&jun]["DEX"] - 200.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_share_matrix_zero_month_left_alone() {
        let jun = Month::new(2025, 6).unwrap();
        let rows = vec![
            R { m: jun, cat: "a", v: Some(0.0) },
            R { m: jun, cat: "b", v: Some(0.0) },
        ];
        let p = pivot_sum(&rows, |r| r.m, |r| r.cat, |r| r.v);
        let shares = share_matrix(&p);
        assert_eq!(shares.cells[&jun]["a"], 0.0);
        assert_eq!(shares.cells[&jun]["b"], 0.0);
    }

    #[test]
    fn test_latest_month_is_max() {
        let rows = rows();
        let s = sum_by_month(&rows, |r| r.m, |r| r.v);
        assert_eq!(latest_month(&s), Month::new(2025, 7));
        let p = pivot_sum(&rows, |r| r.m, |r| r.cat, |r| r.v);
        assert_eq!(p.latest_month(), Month::new(2025, 7));
    }
}
