//! Display formatting for KPI values. Undefined values render as an em-dash,
//! matching how the source exports present missing headline numbers.

pub const EM_DASH: &str = "—";

/// Group an unsigned integer digit string with thousands separators.
fn group_thousands(digits: &str) -> String {
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    let len = digits.len();
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (len - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

fn grouped(x: f64, digits: usize) -> String {
    let s = format!("{:.*}", digits, x.abs());
    let (int_part, frac_part) = match s.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (s.as_str(), None),
    };
    let mut out = String::new();
    if x.is_sign_negative() && x != 0.0 {
        out.push('-');
    }
    out.push_str(&group_thousands(int_part));
    if let Some(f) = frac_part {
        out.push('.');
        out.push_str(f);
    }
    out
}

/// `$1,234.56`, or an em-dash when undefined.
pub fn money(x: Option<f64>, digits: usize) -> String {
    match x {
        Some(v) if v.is_finite() => format!("${}", grouped(v, digits)),
        _ => EM_DASH.to_string(),
    }
}

/// `12.3%`, or an em-dash when undefined.
pub fn pct(x: Option<f64>, digits: usize) -> String {
    match x {
        Some(v) if v.is_finite() => format!("{:.*}%", digits, v),
        _ => EM_DASH.to_string(),
    }
}

/// Integer count with thousands separators (`1,234,567`).
pub fn count(x: Option<f64>) -> String {
    match x {
        Some(v) if v.is_finite() => grouped(v.round(), 0),
        _ => EM_DASH.to_string(),
    }
}

/// Plain grouped number with the given precision (`1,234.56`).
pub fn number(x: Option<f64>, digits: usize) -> String {
    match x {
        Some(v) if v.is_finite() => grouped(v, digits),
        _ => EM_DASH.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_money_groups_thousands() {
        assert_eq!(money(Some(1234567.891), 2), "$1,234,567.89");
        assert_eq!(money(Some(0.5), 2), "$0.50");
        assert_eq!(money(Some(-1234.5), 2), "$-1,234.50");
    }

    #[test]
    fn test_undefined_renders_em_dash() {
        assert_eq!(money(None, 2), EM_DASH);
        assert_eq!(pct(Some(f64::NAN), 1), EM_DASH);
        assert_eq!(count(None), EM_DASH);
    }

    #[test]
    fn test_pct_and_count() {
        assert_eq!(pct(Some(51.234), 1), "51.2%");
        assert_eq!(count(Some(1_234_567.0)), "1,234,567");
        assert_eq!(number(Some(999.999), 2), "1,000.00");
    }
}
