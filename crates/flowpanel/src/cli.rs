use anyhow::Result;
use common::config::Config;
use common::format::{count, money, number, pct, EM_DASH};
use common::types::Month;

use crate::kpi::Growth;
use crate::report::{self, MetricSummary, Section};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivityMetric {
    Addresses,
    Transactions,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Report,
    Volumes,
    Activity(Option<ActivityMetric>),
    Cohorts,
    Typology,
    Dex,
    Lending,
    Bridge,
    Price,
    Fees,
    Etf,
    Rates,
}

pub fn parse_args<I>(mut args: I) -> std::result::Result<Command, String>
where
    I: Iterator<Item = String>,
{
    // Drop argv[0].
    let _ = args.next();

    let Some(cmd) = args.next() else {
        return Ok(Command::Report);
    };

    match cmd.as_str() {
        "report" => Ok(Command::Report),
        "volumes" => Ok(Command::Volumes),
        "activity" => match args.next().as_deref() {
            None => Ok(Command::Activity(None)),
            Some("addresses") => Ok(Command::Activity(Some(ActivityMetric::Addresses))),
            Some("transactions") => Ok(Command::Activity(Some(ActivityMetric::Transactions))),
            Some(other) => Err(format!(
                "usage: flowpanel activity [addresses|transactions] (got: {other})"
            )),
        },
        "cohorts" => Ok(Command::Cohorts),
        "typology" => Ok(Command::Typology),
        "dex" => Ok(Command::Dex),
        "lending" => Ok(Command::Lending),
        "bridge" => Ok(Command::Bridge),
        "price" => Ok(Command::Price),
        "fees" => Ok(Command::Fees),
        "etf" => Ok(Command::Etf),
        "rates" => Ok(Command::Rates),
        other => Err(format!("unknown command: {other}")),
    }
}

pub fn run_command(config: &Config, cmd: Command) -> Result<()> {
    match cmd {
        Command::Report => show_report(config),
        Command::Volumes => show_volumes(config),
        Command::Activity(metric) => show_activity(config, metric),
        Command::Cohorts => show_cohorts(config),
        Command::Typology => show_typology(config),
        Command::Dex => show_dex(config),
        Command::Lending => show_lending(config),
        Command::Bridge => show_bridge(config),
        Command::Price => show_price(config),
        Command::Fees => show_fees(config),
        Command::Etf => show_etf(config),
        Command::Rates => show_rates(config),
    }
    Ok(())
}

fn print_state<T>(section: &Section<T>, show: impl FnOnce(&T)) {
    match section {
        Section::Ready(t) => show(t),
        Section::Missing(reason) => println!("  no data: {reason}"),
        Section::Schema(issue) => println!("  warning: {issue}"),
    }
}

fn growth(g: Growth) -> String {
    pct(g.as_pct(), 1)
}

fn month_value(p: Option<(Month, f64)>, unit: &str) -> String {
    p.map_or_else(
        || EM_DASH.to_string(),
        |(m, v)| format!("{}{unit} ({m})", number(Some(v), 2)),
    )
}

fn show_report(config: &Config) {
    show_volumes(config);
    show_activity(config, None);
    show_cohorts(config);
    show_typology(config);
    show_dex(config);
    show_lending(config);
    show_bridge(config);
    show_price(config);
    show_fees(config);
    show_etf(config);
    show_rates(config);
}

fn show_volumes(config: &Config) {
    println!("Monthly on-chain volume by category:");
    print_state(&report::volume_section(config), |s| {
        println!("  peak volume:            {}", month_value(s.peak, "B"));
        println!(
            "  DEX dominance (latest): {}",
            pct(s.dex_dominance_pct, 1)
        );
        for (m, v) in &s.monthly_totals {
            println!("  {m}  {:>12}B", number(Some(*v), 2));
        }
    });
}

fn show_metric(label: &str, s: &MetricSummary) {
    println!("  {label}:");
    println!("    peak (monthly):      {}", month_value(s.peak, ""));
    println!("    DEX share (latest):  {}", pct(s.dex_share_pct, 1));
}

fn show_activity(config: &Config, metric: Option<ActivityMetric>) {
    println!("Monthly active addresses and transactions by category:");
    print_state(&report::activity_section(config), |s| {
        match metric {
            Some(ActivityMetric::Addresses) => show_metric("active addresses", &s.addresses),
            Some(ActivityMetric::Transactions) => show_metric("transactions", &s.transactions),
            None => {
                show_metric("active addresses", &s.addresses);
                show_metric("transactions", &s.transactions);
            }
        }
    });
}

fn show_cohorts(config: &Config) {
    println!("User mix by volume cohort:");
    print_state(&report::cohort_section(config), |s| {
        println!(
            "  whale user share (latest):  {}",
            pct(s.whale_user_share_pct, 1)
        );
        println!(
            "  whale avg volume (latest):  {}",
            money(s.whale_avg_volume_usd, 2)
        );
    });
}

fn show_typology(config: &Config) {
    println!("User mix by activity typology:");
    print_state(&report::typology_section(config), |s| {
        println!(
            "  multi-sector user share (latest): {}",
            pct(s.multi_sector_share_pct, 1)
        );
        let mult = s
            .engagement_multiplier
            .map_or_else(|| EM_DASH.to_string(), |m| format!("{m:.2}x"));
        println!("  engagement multiplier (multi/single): {mult}");
    });
}

fn show_dex(config: &Config) {
    println!("DEX volume and active swappers (monthly):");
    print_state(&report::dex_section(config), |s| {
        println!("  peak DEX volume:            {}", month_value(s.peak_volume, "B"));
        println!("  volume growth since start:  {}", growth(s.volume_growth));
        for (m, v) in &s.volume {
            let swappers = s.swappers.get(m).copied();
            println!(
                "  {m}  volume {:>10}B  swappers {:>12}",
                number(Some(*v), 2),
                count(swappers)
            );
        }
    });
}

fn show_lending(config: &Config) {
    println!("Lending deposits per platform:");
    print_state(&report::lending_section(config), |s| {
        match &s.top_platform {
            Some((name, share)) => println!(
                "  top platform (latest):  {name} ({})",
                pct(Some(*share), 1)
            ),
            None => println!("  top platform (latest):  {EM_DASH}"),
        }
        println!(
            "  depositors growth since start: {}",
            growth(s.depositors_growth)
        );
    });
}

fn show_bridge(config: &Config) {
    println!("Total bridge volume (monthly):");
    print_state(&report::bridge_section(config), |s| {
        println!("  growth since start:  {}", growth(s.growth));
        println!("  status:              {}", s.status.as_str());
    });
}

fn show_price(config: &Config) {
    println!("ETH price vs activity index:");
    print_state(&report::price_section(config), |s| {
        let range = s.price_range.map_or_else(
            || EM_DASH.to_string(),
            |(lo, hi)| format!("{} - {}", money(Some(lo), 0), money(Some(hi), 0)),
        );
        println!("  price range:            {range}");
        println!(
            "  corr(price, activity):  {}",
            number(s.pearson_price_activity, 2)
        );
        println!(
            "  rank corr (spearman):   {}",
            number(s.spearman_price_activity, 2)
        );
    });
}

fn show_fees(config: &Config) {
    println!("User adoption during fee evolution:");
    print_state(&report::fee_adoption_section(config), |s| {
        println!("  user growth since start:  {}", growth(s.user_growth));
        println!("  fee change since start:   {}", growth(s.fee_change));
    });
    println!("Price vs fee correlation:");
    print_state(&report::fees_price_section(config), |s| {
        println!("  corr(price, fee):             {}", number(s.corr_price_fee, 2));
        println!(
            "  price-to-fee ratio (latest):  {}",
            number(s.price_to_fee_ratio_latest, 2)
        );
    });
}

fn show_etf(config: &Config) {
    println!("Spot ETF net flows (USD millions):");
    print_state(&report::etf_section(config), |s| {
        println!(
            "  cumulative net flow:  {}M",
            money(s.total_net_flow_millions, 0)
        );
        println!("  best month:           {}", month_value(s.best_month, "M"));
        println!("  worst month:          {}", month_value(s.worst_month, "M"));
    });
}

fn show_rates(config: &Config) {
    println!("Rates expectations:");
    print_state(&report::rates_section(config), |s| {
        match &s.latest {
            Some((m, direction, prob)) => {
                let prob_pct = pct(prob.map(|p| p * 100.0), 0);
                println!("  latest ({m}):  {direction} at {prob_pct}");
            }
            None => println!("  latest:  {EM_DASH}"),
        }
    });
    println!("Fed funds rate history:");
    print_state(&report::fedfunds_section(config), |s| {
        let latest = s.latest.map_or_else(
            || EM_DASH.to_string(),
            |(m, v)| format!("{} ({m})", pct(Some(v), 2)),
        );
        println!("  latest rate:         {latest}");
        let change = s
            .change_pts
            .map_or_else(|| EM_DASH.to_string(), |c| format!("{c:+.2} pts"));
        println!("  change since start:  {change}");
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn argv(args: &[&str]) -> impl Iterator<Item = String> {
        std::iter::once("flowpanel".to_string())
            .chain(args.iter().map(|s| (*s).to_string()).collect::<Vec<_>>())
    }

    #[test]
    fn test_no_args_defaults_to_report() {
        assert_eq!(parse_args(argv(&[])), Ok(Command::Report));
    }

    #[test]
    fn test_section_commands_parse() {
        assert_eq!(parse_args(argv(&["volumes"])), Ok(Command::Volumes));
        assert_eq!(parse_args(argv(&["bridge"])), Ok(Command::Bridge));
        assert_eq!(parse_args(argv(&["rates"])), Ok(Command::Rates));
    }

    #[test]
    fn test_activity_metric_parse() {
        assert_eq!(parse_args(argv(&["activity"])), Ok(Command::Activity(None)));
        assert_eq!(
            parse_args(argv(&["activity", "addresses"])),
            Ok(Command::Activity(Some(ActivityMetric::Addresses)))
        );
        assert_eq!(
            parse_args(argv(&["activity", "transactions"])),
            Ok(Command::Activity(Some(ActivityMetric::Transactions)))
        );
        assert!(parse_args(argv(&["activity", "bogus"])).is_err());
    }

    #[test]
    fn test_unknown_command_is_usage_error() {
        let err = parse_args(argv(&["frobnicate"])).unwrap_err();
        assert!(err.contains("unknown command"));
    }
}
