//! Farmlore daemon binary.
//!
//! The daemon:
//! - keeps the durable knowledge base of items, locations, pets, the player and the activity log
//! - ingests pages observed by connected views or fetched on a schedule
//! - serves the aggregate state to every view over a Unix socket

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context as _;
use clap::Parser;
use farmlore_hub::{Hub, HubConfig, HubContext, HttpRemote, ipc, scheduler};
use farmlore_store::{RecordStore, farm_schema, seed_from_dir};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Daemon command line arguments.
#[derive(Parser, Debug)]
#[command(name = "farmlore")]
#[command(about = "Learns the farm game's world from observed pages and serves it to sidebar views")]
struct Args {
	/// Config file (TOML)
	#[arg(short, long, value_name = "PATH")]
	config: Option<PathBuf>,

	/// Socket path for IPC
	#[arg(short, long, value_name = "PATH")]
	socket: Option<PathBuf>,

	/// Directory for the store and log exports
	#[arg(short, long, value_name = "DIR")]
	data_dir: Option<PathBuf>,

	/// Skip the initial page fetches
	#[arg(long)]
	no_prime: bool,

	/// Verbose logging
	#[arg(short, long)]
	verbose: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
	let args = Args::parse();

	setup_tracing(args.verbose);

	info!("starting farmlore");

	let mut config = match args.config.or_else(farmlore_proto::paths::default_config_path) {
		Some(path) => HubConfig::load(&path)?,
		None => HubConfig::default(),
	};
	if let Some(dir) = args.data_dir {
		config.data_dir = Some(dir);
	}

	let db_path = config.db_path();
	info!(db = %db_path.display(), "opening store");
	let store = Arc::new(RecordStore::open(&db_path)?);
	store.ensure_schema(&farm_schema())?;

	if let Some(dir) = &config.fixtures_dir {
		let report = seed_from_dir(&store, dir)?;
		info!(files = report.files, records = report.records, written = report.written, "seeded fixtures");
	}

	let socket_path = args.socket.unwrap_or_else(farmlore_proto::paths::default_socket_path);
	if let Some(parent) = socket_path.parent()
		&& !parent.exists()
	{
		std::fs::create_dir_all(parent).with_context(|| format!("creating {}", parent.display()))?;
	}
	info!(socket = %socket_path.display(), "IPC socket path");

	let remote = HttpRemote::new(&config.base_url)?;
	let ctx = Arc::new(HubContext::new(config, store, Arc::new(remote))?);
	let hub = Hub::new(Arc::clone(&ctx))?;

	let shutdown = CancellationToken::new();
	let (events, rx) = mpsc::unbounded_channel();

	tokio::spawn({
		let shutdown = shutdown.clone();
		async move {
			if let Err(error) = tokio::signal::ctrl_c().await {
				tracing::error!(%error, "cannot listen for ctrl-c");
				return;
			}
			info!("interrupt received, shutting down");
			shutdown.cancel();
		}
	});

	let triggers = scheduler::spawn(&ctx.config.schedule, events.clone(), shutdown.clone());

	info!("starting IPC server");
	let server = tokio::spawn(ipc::serve(socket_path, events, shutdown.clone()));

	if !args.no_prime {
		hub.prime().await;
	}
	hub.run(rx, shutdown.clone()).await;

	shutdown.cancel();
	server.await??;
	for trigger in triggers {
		trigger.await?;
	}
	info!("farmlore stopped");
	Ok(())
}

fn setup_tracing(verbose: bool) {
	use std::fs::OpenOptions;

	use tracing_subscriber::EnvFilter;
	use tracing_subscriber::fmt::format::FmtSpan;
	use tracing_subscriber::prelude::*;

	if let Some(log_dir) = std::env::var("FARMLORE_LOG_DIR").ok().map(PathBuf::from)
		&& std::fs::create_dir_all(&log_dir).is_ok()
	{
		let pid = std::process::id();
		let log_path = log_dir.join(format!("farmlore.{pid}.log"));

		if let Ok(file) = OpenOptions::new().create(true).append(true).open(&log_path) {
			let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
				if verbose {
					EnvFilter::new("farmlore=trace,debug")
				} else {
					EnvFilter::new("farmlore=debug,info")
				}
			});

			let file_layer = tracing_subscriber::fmt::layer()
				.with_writer(file)
				.with_ansi(false)
				.with_span_events(FmtSpan::CLOSE)
				.with_target(true);

			tracing_subscriber::registry().with(filter).with(file_layer).init();

			tracing::info!(path = ?log_path, "tracing initialized");
			return;
		}
	}

	let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
		EnvFilter::new(if verbose { "debug" } else { "info" })
	});
	tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
}
