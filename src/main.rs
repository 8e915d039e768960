mod app;
mod cache;
mod config;
mod event;
mod sync;
mod ui;
mod users;

use clap::Parser;
use color_eyre::{eyre::eyre, Result};
use std::path::PathBuf;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

use crate::app::UserSync;
use crate::cache::{MemoryStorage, SqliteStorage, UserStore};
use crate::config::Config;
use crate::sync::{ConnectivityProbe, StaticProbe, SyncPolicy, TcpProbe};
use crate::users::UserApiClient;

#[derive(Parser, Debug)]
#[command(name = "roster")]
#[command(about = "A terminal user roster with offline-first sync")]
#[command(version)]
struct Args {
  /// Path to config file (default: $XDG_CONFIG_HOME/roster/config.yaml)
  #[arg(short, long)]
  config: Option<PathBuf>,

  /// Treat the network as unreachable
  #[arg(long)]
  offline: bool,

  /// Sync policy (overrides sync.policy from config)
  #[arg(long, value_enum)]
  policy: Option<SyncPolicy>,

  /// Keep the cache in memory instead of on disk
  #[arg(long)]
  ephemeral: bool,

  /// Refresh once, print the users and exit
  #[arg(short, long)]
  list: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;

  let args = Args::parse();

  // Load configuration
  let config = Config::load(args.config.as_deref())?;

  let _log_guard = init_logging()?;

  let sync = build_sync(&config, &args)?;
  info!(policy = ?sync.policy(), offline = args.offline, "roster starting");

  if args.list {
    return print_users(&sync).await;
  }

  let mut app = app::App::new(&config, sync);
  app.run().await?;

  Ok(())
}

/// Wire store, remote source and probe into the orchestrator.
fn build_sync(config: &Config, args: &Args) -> Result<UserSync> {
  let store: Box<dyn UserStore> = if args.ephemeral {
    Box::new(MemoryStorage::new())
  } else {
    Box::new(SqliteStorage::open(config.cache.path.as_deref())?)
  };

  let remote = UserApiClient::new(config)?;

  let probe: Box<dyn ConnectivityProbe> = if args.offline {
    Box::new(StaticProbe(false))
  } else {
    let (host, port) = config.probe_target()?;
    Box::new(TcpProbe::new(host, port, config.probe_timeout()))
  };

  let policy = args.policy.unwrap_or(config.sync.policy);
  Ok(UserSync::new(store, remote, probe, policy))
}

async fn print_users(sync: &UserSync) -> Result<()> {
  sync
    .refresh_now()
    .await
    .map_err(|e| eyre!("Failed to load users: {}", e))?;

  let users = sync.state().result().unwrap_or_default();
  for user in &users {
    println!("{}\t{}\t{}", user.id, user.name, user.username);
  }

  Ok(())
}

/// Log to a file under the data dir; the terminal belongs to the UI.
fn init_logging() -> Result<WorkerGuard> {
  let log_dir = Config::data_dir()?;
  std::fs::create_dir_all(&log_dir)
    .map_err(|e| eyre!("Failed to create log directory {}: {}", log_dir.display(), e))?;

  let appender = tracing_appender::rolling::never(&log_dir, "roster.log");
  let (writer, guard) = tracing_appender::non_blocking(appender);

  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("roster=info"));

  tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_writer(writer)
    .with_ansi(false)
    .try_init()
    .map_err(|e| eyre!("Failed to initialize logging: {}", e))?;
  Ok(guard)
}
