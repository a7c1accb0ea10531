//! Headline statistics over monthly series: peaks, growth, shares and
//! correlation diagnostics.

use common::types::Month;

use crate::aggregate::{MonthlySeries, Pivot};

/// Growth since the start of a series. `Undefined` replaces the source's
/// clamped-denominator behavior: a baseline of zero or below has no
/// meaningful percent growth.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Growth {
    Pct(f64),
    Undefined,
}

impl Growth {
    pub fn as_pct(self) -> Option<f64> {
        match self {
            Growth::Pct(p) => Some(p),
            Growth::Undefined => None,
        }
    }

    pub fn exceeds(self, threshold: f64) -> bool {
        matches!(self, Growth::Pct(p) if p > threshold)
    }
}

/// `(last/first - 1) * 100` between two observations.
pub fn growth_between(first: f64, last: f64) -> Growth {
    if !first.is_finite() || !last.is_finite() || first <= 0.0 {
        return Growth::Undefined;
    }
    Growth::Pct((last / first - 1.0) * 100.0)
}

/// Growth from the earliest to the latest month of a series. Needs at least
/// two observations.
pub fn growth_since_start(series: &MonthlySeries) -> Growth {
    if series.len() < 2 {
        return Growth::Undefined;
    }
    let first = series.values().next().copied().unwrap_or(f64::NAN);
    let last = series.values().next_back().copied().unwrap_or(f64::NAN);
    growth_between(first, last)
}

/// Maximum of a monthly series; ties keep the earliest month.
pub fn peak(series: &MonthlySeries) -> Option<(Month, f64)> {
    let mut best: Option<(Month, f64)> = None;
    for (m, v) in series {
        match best {
            Some((_, bv)) if *v <= bv => {}
            _ => best = Some((*m, *v)),
        }
    }
    best
}

/// `subset / total * 100`; undefined when the total is not positive.
pub fn share_pct(subset: f64, total: f64) -> Option<f64> {
    (total > 0.0).then(|| subset / total * 100.0)
}

/// Latest-month share of categories whose name contains `needle`
/// (case-insensitive). This is the "DEX dominance" / "whale share" shape
/// of KPI.
pub fn dominance_share(pivot: &Pivot, needle: &str) -> Option<f64> {
    let latest = pivot.latest_month()?;
    let by_cat = pivot.cells.get(&latest)?;
    let needle = needle.to_ascii_lowercase();
    let subset: f64 = by_cat
        .iter()
        .filter(|(c, _)| c.to_ascii_lowercase().contains(&needle))
        .map(|(_, v)| v)
        .sum();
    share_pct(subset, pivot.month_total(latest))
}

/// Latest-month category with the largest value, plus its share of the
/// month total.
pub fn top_category(pivot: &Pivot) -> Option<(String, f64)> {
    let latest = pivot.latest_month()?;
    let by_cat = pivot.cells.get(&latest)?;
    let (name, value) = by_cat
        .iter()
        .max_by(|a, b| a.1.partial_cmp(b.1).unwrap_or(std::cmp::Ordering::Equal))?;
    let share = share_pct(*value, pivot.month_total(latest))?;
    Some((name.clone(), share))
}

fn finite_pairs(xs: &[Option<f64>], ys: &[Option<f64>]) -> Vec<(f64, f64)> {
    xs.iter()
        .zip(ys)
        .filter_map(|(x, y)| match (x, y) {
            (Some(x), Some(y)) if x.is_finite() && y.is_finite() => Some((*x, *y)),
            _ => None,
        })
        .collect()
}

fn pearson_of_pairs(pairs: &[(f64, f64)]) -> Option<f64> {
    let n = pairs.len();
    if n < 2 {
        return None;
    }
    let nf = n as f64;
    let mean_x = pairs.iter().map(|(x, _)| x).sum::<f64>() / nf;
    let mean_y = pairs.iter().map(|(_, y)| y).sum::<f64>() / nf;
    let mut cov = 0.0;
    let mut var_x = 0.0;
    let mut var_y = 0.0;
    for (x, y) in pairs {
        let dx = x - mean_x;
        let dy = y - mean_y;
        cov += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }
    if var_x <= 0.0 || var_y <= 0.0 {
        return None;
    }
    Some(cov / (var_x.sqrt() * var_y.sqrt()))
}

/// Pearson correlation after pairwise dropping of missing values. Requires
/// at least two paired finite observations; zero variance on either side is
/// undefined.
pub fn pearson(xs: &[Option<f64>], ys: &[Option<f64>]) -> Option<f64> {
    pearson_of_pairs(&finite_pairs(xs, ys))
}

/// Average ranks with ties sharing their mean rank (1-based).
fn average_ranks(values: &[f64]) -> Vec<f64> {
    let n = values.len();
    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| {
        values[a]
            .partial_cmp(&values[b])
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    let mut ranks = vec![0.0; n];
    let mut i = 0;
    while i < n {
        let mut j = i;
        while j + 1 < n && values[order[j + 1]] == values[order[i]] {
            j += 1;
        }
        // Tied block [i..=j] shares the mean of ranks i+1..=j+1.
        let avg = (i + j) as f64 / 2.0 + 1.0;
        for k in i..=j {
            ranks[order[k]] = avg;
        }
        i = j + 1;
    }
    ranks
}

/// Spearman rank correlation: Pearson over average ranks, same pairing rules.
pub fn spearman(xs: &[Option<f64>], ys: &[Option<f64>]) -> Option<f64> {
    let pairs = finite_pairs(xs, ys);
    if pairs.len() < 2 {
        return None;
    }
    let rx = average_ranks(&pairs.iter().map(|(x, _)| *x).collect::<Vec<_>>());
    let ry = average_ranks(&pairs.iter().map(|(_, y)| *y).collect::<Vec<_>>());
    let ranked: Vec<(f64, f64)> = rx.into_iter().zip(ry).collect();
    pearson_of_pairs(&ranked)
}
