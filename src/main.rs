use clap::Parser;
use matrix_power_bench::benchmark;
use matrix_power_bench::config::Args;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

fn main() -> eyre::Result<()> {
    let env_filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy();
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    let config = Args::parse().into_config()?;
    let report = benchmark::run(&config)?;
    tracing::info!(seed = report.seed, phases = report.phases.len(), "benchmark finished");

    print!("{report}");

    Ok(())
}
