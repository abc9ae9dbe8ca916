//! Admin routes for background jobs.
//!
//! - GET /v1/admin/jobs
//! - GET /v1/admin/jobs/{job_id}
//! - POST /v1/admin/jobs/{job_id}/trigger

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use tracing::{info, warn};

use crate::background_jobs::{JobError, SchedulerHandle};
use crate::server::state::{OptionalSchedulerHandle, ServerState};

#[derive(Debug, Serialize)]
pub struct TriggerResponse {
    pub job_id: String,
    pub triggered: bool,
    pub message: String,
}

fn require_scheduler(
    handle: &OptionalSchedulerHandle,
) -> Result<&SchedulerHandle, axum::response::Response> {
    handle.as_ref().ok_or_else(|| {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            "Background jobs are not running",
        )
            .into_response()
    })
}

/// GET /v1/admin/jobs - List registered jobs
async fn list_jobs(State(handle): State<OptionalSchedulerHandle>) -> impl IntoResponse {
    let scheduler = match require_scheduler(&handle) {
        Ok(s) => s,
        Err(e) => return e,
    };
    Json(scheduler.list_jobs().await).into_response()
}

/// GET /v1/admin/jobs/{job_id}
async fn get_job(
    State(handle): State<OptionalSchedulerHandle>,
    Path(job_id): Path<String>,
) -> impl IntoResponse {
    let scheduler = match require_scheduler(&handle) {
        Ok(s) => s,
        Err(e) => return e,
    };
    match scheduler.get_job(&job_id).await {
        Some(info) => Json(info).into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

/// POST /v1/admin/jobs/{job_id}/trigger - Run a job now
async fn trigger_job(
    State(handle): State<OptionalSchedulerHandle>,
    Path(job_id): Path<String>,
) -> impl IntoResponse {
    let scheduler = match require_scheduler(&handle) {
        Ok(s) => s,
        Err(e) => return e,
    };

    let (status, triggered, message) = match scheduler.trigger_job(&job_id).await {
        Ok(()) => {
            info!("Job {} triggered manually", job_id);
            (StatusCode::ACCEPTED, true, "Job triggered".to_string())
        }
        Err(e @ JobError::NotFound) => (StatusCode::NOT_FOUND, false, e.to_string()),
        Err(e @ JobError::AlreadyRunning) => (StatusCode::CONFLICT, false, e.to_string()),
        Err(e) => {
            warn!("Failed to trigger job {}: {}", job_id, e);
            (StatusCode::SERVICE_UNAVAILABLE, false, e.to_string())
        }
    };

    (
        status,
        Json(TriggerResponse {
            job_id,
            triggered,
            message,
        }),
    )
        .into_response()
}

pub fn job_routes() -> Router<ServerState> {
    Router::new()
        .route("/jobs", get(list_jobs))
        .route("/jobs/{job_id}", get(get_job))
        .route("/jobs/{job_id}/trigger", post(trigger_job))
}
