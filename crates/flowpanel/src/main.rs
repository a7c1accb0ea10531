use anyhow::Result;

mod aggregate;
mod cli;
mod datasets;
mod kpi;
mod loader;
mod metrics;
mod normalize;
mod report;
mod table;

fn main() -> Result<()> {
    let config = common::config::Config::load()?;

    let dispatch = common::observability::build_dispatch(&config.general.log_level);
    tracing::dispatcher::set_global_default(dispatch).map_err(anyhow::Error::msg)?;

    tracing::info!("flowpanel starting");
    metrics::describe();

    let cmd = cli::parse_args(std::env::args()).map_err(anyhow::Error::msg)?;
    cli::run_command(&config, cmd)?;
    Ok(())
}
