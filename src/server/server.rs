use anyhow::{Context, Result};
use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use axum::{extract::State, middleware, response::IntoResponse, routing::get, Json, Router};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::info;

use super::job_routes::job_routes;
use super::metrics::metrics_handler;
use super::notify_routes::notify_routes;
use super::{log_requests, state::*, ServerConfig};
use crate::background_jobs::SchedulerHandle;
use crate::fanout::FanOutDispatcher;

#[derive(Serialize)]
struct ServerStats {
    pub uptime: String,
    pub hash: String,
}

fn format_uptime(duration: Duration) -> String {
    let total_seconds = duration.as_secs();

    let days = total_seconds / 86_400;
    let hours = (total_seconds % 86_400) / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;

    format!("{}d {:02}:{:02}:{:02}", days, hours, minutes, seconds)
}

async fn home(State(state): State<ServerState>) -> impl IntoResponse {
    Json(ServerStats {
        uptime: format_uptime(state.start_time.elapsed()),
        hash: state.hash.clone(),
    })
}

/// Build hash baked in at compile time.
pub fn build_hash() -> String {
    option_env!("PUSHFAN_BUILD_HASH")
        .unwrap_or("unknown")
        .to_string()
}

pub fn make_app(
    config: ServerConfig,
    dispatcher: Arc<FanOutDispatcher>,
    scheduler_handle: Option<SchedulerHandle>,
    hash: String,
) -> Router {
    let state = ServerState {
        config,
        start_time: Instant::now(),
        dispatcher,
        scheduler_handle,
        hash,
    };

    Router::new()
        .route("/", get(home))
        .nest("/v1", notify_routes().nest("/admin", job_routes()))
        .layer(middleware::from_fn_with_state(state.clone(), log_requests))
        .with_state(state)
}

fn make_metrics_app() -> Router {
    Router::new().route("/metrics", get(metrics_handler))
}

/// Serves the API and the metrics endpoint until `shutdown` is cancelled.
pub async fn run_server(
    config: ServerConfig,
    dispatcher: Arc<FanOutDispatcher>,
    scheduler_handle: Option<SchedulerHandle>,
    shutdown: CancellationToken,
) -> Result<()> {
    let port = config.port;
    let metrics_port = config.metrics_port;
    let app = make_app(config, dispatcher, scheduler_handle, build_hash());

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port))
        .await
        .with_context(|| format!("Failed to bind port {}", port))?;
    let metrics_listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", metrics_port))
        .await
        .with_context(|| format!("Failed to bind metrics port {}", metrics_port))?;

    info!("Ready to serve at port {}!", port);
    info!("Metrics available at port {}!", metrics_port);

    let metrics_shutdown = shutdown.clone();
    let metrics_server = tokio::spawn(async move {
        axum::serve(metrics_listener, make_metrics_app())
            .with_graceful_shutdown(metrics_shutdown.cancelled_owned())
            .await
    });

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown.cancelled_owned())
        .await?;

    metrics_server
        .await
        .context("Metrics server task failed")??;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory::SqliteRecipientDirectory;
    use crate::transport::LoggingTransport;
    use axum::body::Body;
    use axum::http::{Method, Request, StatusCode};
    use tower::ServiceExt;

    fn app() -> Router {
        let directory = Arc::new(SqliteRecipientDirectory::in_memory().unwrap());
        let dispatcher = Arc::new(FanOutDispatcher::new(
            directory,
            Arc::new(LoggingTransport),
            Duration::from_secs(5),
        ));
        make_app(ServerConfig::default(), dispatcher, None, "abc123".to_string())
    }

    #[tokio::test]
    async fn home_reports_hash() {
        let response = app()
            .oneshot(Request::get("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let stats: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(stats["hash"], "abc123");
    }

    #[tokio::test]
    async fn notify_rejects_other_methods() {
        for method in [Method::GET, Method::PUT, Method::DELETE] {
            let response = app()
                .oneshot(
                    Request::builder()
                        .method(method.clone())
                        .uri("/v1/notify")
                        .body(Body::empty())
                        .unwrap(),
                )
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED, "{}", method);
        }
    }

    #[tokio::test]
    async fn job_routes_without_scheduler() {
        let response = app()
            .oneshot(
                Request::post("/v1/admin/jobs/expired_record_purge/trigger")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn uptime_formatting() {
        assert_eq!(format_uptime(Duration::from_secs(0)), "0d 00:00:00");
        assert_eq!(
            format_uptime(Duration::from_secs(2 * 86_400 + 3 * 3600 + 4 * 60 + 5)),
            "2d 03:04:05"
        );
    }
}
