use anyhow::Result;
use clap::Parser;
use colored::*;
use fleet_ops::{commands, Args, Settings};
use fleet_sync::Connectivity;
use std::env;
use tracing::{info, Level};
use tracing_subscriber::{
    fmt::{self, time::ChronoUtc},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

#[tokio::main]
async fn main() -> Result<()> {
    // A missing .env file is fine
    let _ = dotenvy::dotenv();

    let args = Args::parse();
    init_tracing(args.verbose);

    info!("📋 Version: {}", env!("CARGO_PKG_VERSION"));

    let settings = Settings::load(args.config.as_deref())?;
    let connectivity = Connectivity::from_online(!args.offline);
    let engine = commands::build_engine(&settings, connectivity, args.dry_run).await?;

    if let Err(e) = commands::execute(&engine, args.command).await {
        tracing::error!("❌ {}: {:#}", "Command failed".bright_red(), e);
        return Err(e);
    }

    Ok(())
}

fn init_tracing(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::INFO };

    // Check if we're in development or production
    let is_development =
        env::var("FLEET_ENV").unwrap_or_else(|_| "development".to_string()) == "development";
    let use_colors = env::var("NO_COLOR").is_err() && atty::is(atty::Stream::Stderr);

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!("fleet_sync={},fleet_ops={},fleetsync={},sqlx=warn,reqwest=info", level, level, level).into()
    });

    if is_development {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(true)
                    .with_timer(ChronoUtc::rfc_3339())
                    .with_ansi(use_colors)
                    .with_level(true),
            )
            .init();
    } else {
        // Structured JSON logging for production
        tracing_subscriber::registry()
            .with(env_filter)
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(false)
                    .with_timer(ChronoUtc::rfc_3339())
                    .with_ansi(false)
                    .json(),
            )
            .init();
    }
}
