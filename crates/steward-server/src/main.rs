// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Steward server binary.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use steward_server::Steward;
use steward_server_config::LoggingConfig;
use tokio::sync::broadcast;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Steward - job scheduler with a self-healing health monitor.
#[derive(Parser, Debug)]
#[command(name = "steward-server", about = "Steward job scheduler and health monitor", version)]
struct Args {
	/// Path to a TOML config file (defaults to /etc/steward/steward.toml)
	#[arg(long, env = "STEWARD_CONFIG")]
	config: Option<PathBuf>,

	#[command(subcommand)]
	command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
	/// Show version information
	Version,
	/// Print the resolved configuration and exit
	CheckConfig,
}

fn init_tracing(logging: &LoggingConfig) {
	let filter = tracing_subscriber::EnvFilter::try_from_default_env()
		.unwrap_or_else(|_| logging.level.clone().into());
	let registry = tracing_subscriber::registry().with(filter);

	if logging.json {
		registry.with(tracing_subscriber::fmt::layer().json()).init();
	} else {
		registry.with(tracing_subscriber::fmt::layer()).init();
	}
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
	// .env may set STEWARD_CONFIG
	dotenvy::dotenv().ok();

	let args = Args::parse();

	if let Some(Command::Version) = args.command {
		println!("steward-server {}", env!("CARGO_PKG_VERSION"));
		return Ok(());
	}

	let config = match &args.config {
		Some(path) => steward_server_config::load_config_with_file(path)?,
		None => steward_server_config::load_config()?,
	};

	if let Some(Command::CheckConfig) = args.command {
		println!("{config:#?}");
		return Ok(());
	}

	init_tracing(&config.logging);

	tracing::info!(
		scheduler_tick_secs = config.scheduler.tick_interval_secs,
		monitor_tick_secs = config.monitor.tick_interval_secs,
		database = config.database.url.as_deref().unwrap_or("none"),
		"starting steward-server"
	);

	let steward = Arc::new(Steward::build(&config).await?);
	let mut alerts = steward.subscribe_alerts();
	steward.start().await;

	let forward = tokio::spawn(async move {
		loop {
			match alerts.recv().await {
				Ok(alert) => tracing::info!(
					alert_id = %alert.id,
					severity = %alert.severity,
					component = %alert.component,
					"alert notification"
				),
				Err(broadcast::error::RecvError::Lagged(skipped)) => {
					tracing::warn!(skipped, "alert subscriber lagged")
				}
				Err(broadcast::error::RecvError::Closed) => break,
			}
		}
	});

	tokio::signal::ctrl_c().await?;
	tracing::info!("Received shutdown signal");

	steward.stop().await;
	forward.abort();

	tracing::info!("Server shutdown complete");
	Ok(())
}
