//! Test server lifecycle management
//!
//! Each test gets an isolated server with its own databases, a recording
//! transport and a running job scheduler.

use super::constants::*;
use super::fixtures::{seed_recipients, seed_records, RecordingTransport};
use pushfan_server::background_jobs::jobs::ExpiredRecordPurgeJob;
use pushfan_server::background_jobs::create_scheduler;
use pushfan_server::config::PurgeSettings;
use pushfan_server::directory::SqliteRecipientDirectory;
use pushfan_server::fanout::FanOutDispatcher;
use pushfan_server::purge::SqliteRecordStore;
use pushfan_server::server::{make_app, RequestsLoggingLevel, ServerConfig};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

pub struct TestServer {
    /// Base URL for making requests (e.g., "http://127.0.0.1:12345")
    pub base_url: String,

    pub directory: Arc<SqliteRecipientDirectory>,
    pub records: Arc<SqliteRecordStore>,
    pub transport: Arc<RecordingTransport>,

    _temp_db_dir: TempDir,
    shutdown: CancellationToken,
}

impl TestServer {
    pub async fn spawn() -> Self {
        Self::spawn_with_timeout(Duration::from_secs(60)).await
    }

    /// Spawns a server whose fan-out invocations end after `dispatch_timeout`.
    pub async fn spawn_with_timeout(dispatch_timeout: Duration) -> Self {
        let temp_db_dir = TempDir::new().expect("Failed to create temp dir");

        let directory = Arc::new(
            SqliteRecipientDirectory::new(temp_db_dir.path().join("directory.db"))
                .expect("Failed to open recipient directory"),
        );
        let records = Arc::new(
            SqliteRecordStore::new(temp_db_dir.path().join("records.db"))
                .expect("Failed to open record store"),
        );
        let transport = Arc::new(RecordingTransport::default());

        let dispatcher = Arc::new(FanOutDispatcher::new(
            directory.clone(),
            transport.clone(),
            dispatch_timeout,
        ));

        let shutdown = CancellationToken::new();
        let (mut scheduler, scheduler_handle) = create_scheduler(shutdown.clone());

        // Daily schedule, so tests drive runs through the trigger route.
        let purge_job =
            ExpiredRecordPurgeJob::from_settings(records.clone(), &PurgeSettings::default());
        scheduler.register_job(Arc::new(purge_job)).await;
        tokio::spawn(async move { scheduler.run().await });

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind to random port");
        let port = listener
            .local_addr()
            .expect("Failed to get local address")
            .port();
        let base_url = format!("http://127.0.0.1:{}", port);

        let config = ServerConfig {
            requests_logging_level: RequestsLoggingLevel::None,
            port,
            metrics_port: 0,
        };
        let app = make_app(
            config,
            dispatcher,
            Some(scheduler_handle),
            "test".to_string(),
        );

        let server_shutdown = shutdown.clone();
        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(server_shutdown.cancelled_owned())
                .await
                .expect("Server failed");
        });

        let server = Self {
            base_url,
            directory,
            records,
            transport,
            _temp_db_dir: temp_db_dir,
            shutdown,
        };
        server.wait_for_ready().await;
        server
    }

    pub fn with_recipients(self, prefix: &str, count: usize) -> Self {
        seed_recipients(&self.directory, prefix, count);
        self
    }

    pub fn with_records(self, prefix: &str, count: usize, age_days: i64) -> Self {
        seed_records(&self.records, prefix, count, age_days);
        self
    }

    async fn wait_for_ready(&self) {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(100))
            .build()
            .expect("Failed to build reqwest client");

        let start = std::time::Instant::now();
        let timeout = Duration::from_millis(SERVER_READY_TIMEOUT_MS);

        loop {
            if start.elapsed() > timeout {
                panic!(
                    "Server did not become ready within {}ms",
                    SERVER_READY_TIMEOUT_MS
                );
            }

            match client.get(format!("{}/", self.base_url)).send().await {
                Ok(response) if response.status().is_success() => return,
                _ => {
                    tokio::time::sleep(Duration::from_millis(SERVER_READY_POLL_INTERVAL_MS)).await;
                }
            }
        }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}
