use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{info, level_filters::LevelFilter, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use pushfan_server::background_jobs::create_scheduler;
use pushfan_server::background_jobs::jobs::ExpiredRecordPurgeJob;
use pushfan_server::config::{self, AppConfig, FileConfig};
use pushfan_server::directory::{RecipientDirectory, SqliteRecipientDirectory};
use pushfan_server::fanout::FanOutDispatcher;
use pushfan_server::purge::{RecordStore, SqliteRecordStore};
use pushfan_server::server::{metrics, run_server, RequestsLoggingLevel, ServerConfig};
use pushfan_server::transport::{HttpPushTransport, LoggingTransport, PushTransport};

fn parse_path(s: &str) -> Result<PathBuf, String> {
    let path_buf = PathBuf::from(s);
    let resolved = match path_buf.canonicalize() {
        Ok(path) => path,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => path_buf,
        Err(e) => return Err(format!("Error resolving path '{}': {}", s, e)),
    };
    if resolved.is_absolute() {
        return Ok(resolved);
    }
    let cwd = std::env::current_dir().map_err(|e| format!("Failed to get current dir: {}", e))?;
    Ok(cwd.join(resolved))
}

#[derive(Parser, Debug)]
struct CliArgs {
    /// Path to TOML configuration file. Values in the file override CLI arguments.
    #[clap(long, value_parser = parse_path)]
    pub config: Option<PathBuf>,

    /// Directory holding directory.db and records.db.
    /// Can also be specified in config file.
    #[clap(long, value_parser = parse_path)]
    pub db_dir: Option<PathBuf>,

    /// The port to listen on.
    #[clap(short, long, default_value_t = 3001)]
    pub port: u16,

    /// The port for the metrics server (Prometheus scraping).
    #[clap(long, default_value_t = 9091)]
    pub metrics_port: u16,

    /// The level of logging to perform on each request.
    #[clap(long, default_value = "path")]
    pub logging_level: RequestsLoggingLevel,

    /// URL of the push provider batch endpoint. Without it pushes are only logged.
    #[clap(long)]
    pub push_endpoint: Option<String>,

    /// Timeout in seconds for a single provider batch call.
    #[clap(long, default_value_t = config::DEFAULT_PUSH_TIMEOUT_SEC)]
    pub push_timeout_sec: u64,

    /// Overall deadline in seconds for one fan-out invocation.
    #[clap(long, default_value_t = config::DEFAULT_DISPATCH_TIMEOUT_SEC)]
    pub dispatch_timeout_sec: u64,

    /// Days to keep records before the purge job removes them.
    #[clap(long)]
    pub retention_days: Option<u64>,
}

impl From<&CliArgs> for config::CliConfig {
    fn from(args: &CliArgs) -> Self {
        config::CliConfig {
            db_dir: args.db_dir.clone(),
            port: args.port,
            metrics_port: args.metrics_port,
            logging_level: args.logging_level.clone(),
            push_endpoint: args.push_endpoint.clone(),
            push_timeout_sec: args.push_timeout_sec,
            dispatch_timeout_sec: args.dispatch_timeout_sec,
            retention_days: args.retention_days,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli_args = CliArgs::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .with_env_var("LOG_LEVEL")
                .from_env_lossy(),
        )
        .try_init()?;

    let file_config = match &cli_args.config {
        Some(path) => {
            info!("Loading config from {:?}", path);
            Some(FileConfig::load(path)?)
        }
        None => None,
    };
    let app_config = AppConfig::resolve(&(&cli_args).into(), file_config)?;

    info!("Initializing metrics...");
    metrics::init_metrics();

    info!(
        "Opening recipient directory at {:?}...",
        app_config.directory_db_path()
    );
    let directory: Arc<dyn RecipientDirectory> = Arc::new(SqliteRecipientDirectory::new(
        app_config.directory_db_path(),
    )?);

    info!("Opening record store at {:?}...", app_config.records_db_path());
    let record_store: Arc<dyn RecordStore> =
        Arc::new(SqliteRecordStore::new(app_config.records_db_path())?);

    let transport: Arc<dyn PushTransport> = match &app_config.push_endpoint {
        Some(endpoint) => {
            info!("Push provider configured at {}", endpoint);
            Arc::new(HttpPushTransport::new(
                endpoint.clone(),
                app_config.push_timeout_sec,
            )?)
        }
        None => {
            warn!("No push endpoint configured, notifications will only be logged");
            Arc::new(LoggingTransport)
        }
    };

    let dispatcher = Arc::new(FanOutDispatcher::new(
        directory,
        transport,
        Duration::from_secs(app_config.dispatch_timeout_sec),
    ));

    let shutdown_token = CancellationToken::new();
    let (mut scheduler, scheduler_handle) = create_scheduler(shutdown_token.clone());

    if app_config.purge.enabled {
        info!(
            "Record purge enabled: retaining {} days, daily at {} ({})",
            app_config.purge.retention_days,
            app_config.purge.run_at.format("%H:%M"),
            app_config.purge.utc_offset
        );
        scheduler
            .register_job(Arc::new(ExpiredRecordPurgeJob::from_settings(
                record_store,
                &app_config.purge,
            )))
            .await;
    } else {
        info!("Record purge disabled");
    }

    let server_config = ServerConfig {
        requests_logging_level: app_config.logging_level.clone(),
        port: app_config.port,
        metrics_port: app_config.metrics_port,
    };

    let scheduler_task = tokio::spawn(async move { scheduler.run().await });

    let server = run_server(
        server_config,
        dispatcher,
        Some(scheduler_handle),
        shutdown_token.clone(),
    );
    tokio::pin!(server);

    let result = tokio::select! {
        result = &mut server => {
            info!("HTTP server stopped: {:?}", result);
            result
        },
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, initiating graceful shutdown");
            shutdown_token.cancel();
            server.await
        }
    };

    shutdown_token.cancel();
    if let Err(e) = scheduler_task.await {
        warn!("Scheduler task ended abnormally: {}", e);
    }
    info!("Shutdown complete");
    result
}
