//! Fan-out trigger route.
//!
//! - POST /v1/notify

use axum::{
    body::Bytes, extract::State, http::StatusCode, response::IntoResponse, routing::post, Json,
    Router,
};
use serde::Serialize;
use tracing::{info, warn};

use crate::fanout::{DispatchStatus, FanOutError, FanOutReport, NotifyRequest};
use crate::server::state::{GuardedDispatcher, ServerState};

#[derive(Debug, Serialize)]
pub struct NotifyResponse {
    pub status: &'static str,
    pub message: String,
    pub success_count: usize,
    pub failure_count: usize,
}

impl From<&FanOutReport> for NotifyResponse {
    fn from(report: &FanOutReport) -> Self {
        let status = match report.status {
            DispatchStatus::Sent => "ok",
            DispatchStatus::NoRecipients => "no_recipients",
        };
        NotifyResponse {
            status,
            message: report.result.summary(),
            success_count: report.result.total_success,
            failure_count: report.result.total_failure,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub status: &'static str,
    pub message: String,
}

fn error_response(status: StatusCode, message: String) -> axum::response::Response {
    (
        status,
        Json(ErrorResponse {
            status: "error",
            message,
        }),
    )
        .into_response()
}

/// POST /v1/notify - Send one notification to every eligible recipient
async fn notify(State(dispatcher): State<GuardedDispatcher>, body: Bytes) -> impl IntoResponse {
    let request: NotifyRequest = match serde_json::from_slice(&body) {
        Ok(request) => request,
        Err(e) => {
            warn!("Rejecting unparseable notify body: {}", e);
            return error_response(StatusCode::BAD_REQUEST, format!("Invalid JSON body: {}", e));
        }
    };

    match dispatcher.dispatch(request).await {
        Ok(report) => {
            if !report.flagged_for_removal.is_empty() {
                info!(
                    "{} addresses flagged for removal",
                    report.flagged_for_removal.len()
                );
            }
            (StatusCode::OK, Json(NotifyResponse::from(&report))).into_response()
        }
        Err(e @ FanOutError::InvalidRequest(_)) => {
            warn!("{}", e);
            error_response(StatusCode::BAD_REQUEST, e.to_string())
        }
        Err(e @ FanOutError::UpstreamUnavailable(_)) => {
            error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
    }
}

/// Build the notify routes. Methods other than POST get 405 from the router.
pub fn notify_routes() -> Router<ServerState> {
    Router::new().route("/notify", post(notify))
}
