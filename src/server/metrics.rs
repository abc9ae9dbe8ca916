use axum::{http::StatusCode, response::IntoResponse};
use lazy_static::lazy_static;
use prometheus::{
    CounterVec, Encoder, Gauge, GaugeVec, HistogramOpts, HistogramVec, IntCounter, Opts, Registry,
    TextEncoder,
};
use std::time::Duration;

/// Metric name prefix for all push fan-out metrics
const PREFIX: &str = "pushfan";

lazy_static! {
    pub static ref REGISTRY: Registry = Registry::new();

    // HTTP Request Metrics
    pub static ref HTTP_REQUESTS_TOTAL: CounterVec = CounterVec::new(
        Opts::new(format!("{PREFIX}_http_requests_total"), "Total number of HTTP requests"),
        &["method", "endpoint", "status"]
    ).expect("Failed to create http_requests_total metric");

    pub static ref HTTP_REQUEST_DURATION_SECONDS: HistogramVec = HistogramVec::new(
        HistogramOpts::new(
            format!("{PREFIX}_http_request_duration_seconds"),
            "HTTP request duration in seconds"
        )
        .buckets(vec![0.001, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0, 30.0, 120.0, 600.0]),
        &["method", "endpoint"]
    ).expect("Failed to create http_request_duration_seconds metric");

    // Fan-out Metrics
    pub static ref FANOUT_INVOCATIONS_TOTAL: CounterVec = CounterVec::new(
        Opts::new(format!("{PREFIX}_fanout_invocations_total"), "Fan-out invocations by result"),
        &["result"]
    ).expect("Failed to create fanout_invocations_total metric");

    pub static ref FANOUT_MESSAGES_TOTAL: CounterVec = CounterVec::new(
        Opts::new(format!("{PREFIX}_fanout_messages_total"), "Messages dispatched by outcome"),
        &["outcome"]
    ).expect("Failed to create fanout_messages_total metric");

    pub static ref FANOUT_CHUNKS_TOTAL: CounterVec = CounterVec::new(
        Opts::new(format!("{PREFIX}_fanout_chunks_total"), "Chunk dispatches by result"),
        &["result"]
    ).expect("Failed to create fanout_chunks_total metric");

    pub static ref RECIPIENT_FAILURES_TOTAL: CounterVec = CounterVec::new(
        Opts::new(
            format!("{PREFIX}_recipient_failures_total"),
            "Per-recipient delivery failures by classification"
        ),
        &["class"]
    ).expect("Failed to create recipient_failures_total metric");

    // Purge Metrics
    pub static ref PURGE_RUNS_TOTAL: CounterVec = CounterVec::new(
        Opts::new(format!("{PREFIX}_purge_runs_total"), "Purge runs by outcome"),
        &["outcome"]
    ).expect("Failed to create purge_runs_total metric");

    pub static ref PURGE_DELETED_RECORDS_TOTAL: IntCounter = IntCounter::new(
        format!("{PREFIX}_purge_deleted_records_total"),
        "Records deleted by the retention purge"
    ).expect("Failed to create purge_deleted_records_total metric");

    // Background Job Metrics
    pub static ref BACKGROUND_JOB_EXECUTIONS_TOTAL: CounterVec = CounterVec::new(
        Opts::new(format!("{PREFIX}_background_job_executions_total"), "Background job executions"),
        &["job_id", "status"]
    ).expect("Failed to create background_job_executions_total metric");

    pub static ref BACKGROUND_JOB_DURATION_SECONDS: HistogramVec = HistogramVec::new(
        HistogramOpts::new(
            format!("{PREFIX}_background_job_duration_seconds"),
            "Background job duration in seconds"
        )
        .buckets(vec![0.01, 0.1, 0.5, 1.0, 5.0, 30.0, 120.0]),
        &["job_id"]
    ).expect("Failed to create background_job_duration_seconds metric");

    pub static ref BACKGROUND_JOB_RUNNING: GaugeVec = GaugeVec::new(
        Opts::new(format!("{PREFIX}_background_job_running"), "Whether a background job is running"),
        &["job_id"]
    ).expect("Failed to create background_job_running metric");

    pub static ref PROCESS_MEMORY_BYTES: Gauge = Gauge::new(
        format!("{PREFIX}_process_memory_bytes"),
        "Process memory usage in bytes"
    ).expect("Failed to create process_memory_bytes metric");
}

/// Initialize all metrics and register them with the Prometheus registry
pub fn init_metrics() {
    // Already-registered errors are expected when tests call this repeatedly
    let _ = REGISTRY.register(Box::new(HTTP_REQUESTS_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(HTTP_REQUEST_DURATION_SECONDS.clone()));
    let _ = REGISTRY.register(Box::new(FANOUT_INVOCATIONS_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(FANOUT_MESSAGES_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(FANOUT_CHUNKS_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(RECIPIENT_FAILURES_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(PURGE_RUNS_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(PURGE_DELETED_RECORDS_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(BACKGROUND_JOB_EXECUTIONS_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(BACKGROUND_JOB_DURATION_SECONDS.clone()));
    let _ = REGISTRY.register(Box::new(BACKGROUND_JOB_RUNNING.clone()));
    let _ = REGISTRY.register(Box::new(PROCESS_MEMORY_BYTES.clone()));

    tracing::info!("Metrics system initialized successfully");
}

/// Maps a request path onto a fixed endpoint label.
pub fn categorize_endpoint(path: &str) -> &'static str {
    match path {
        "/" => "home",
        "/v1/notify" => "notify",
        "/v1/admin/jobs" => "admin_jobs",
        p if p.starts_with("/v1/admin/jobs/") => "admin_job_trigger",
        _ => "other",
    }
}

pub fn record_http_request(method: &str, endpoint: &str, status: u16, duration: Duration) {
    HTTP_REQUESTS_TOTAL
        .with_label_values(&[method, endpoint, &status.to_string()])
        .inc();

    HTTP_REQUEST_DURATION_SECONDS
        .with_label_values(&[method, endpoint])
        .observe(duration.as_secs_f64());
}

/// `result` is one of "sent", "no_recipients", "upstream_unavailable".
pub fn record_fanout_invocation(result: &str) {
    FANOUT_INVOCATIONS_TOTAL.with_label_values(&[result]).inc();
}

pub fn record_fanout_messages(success: usize, failure: usize) {
    FANOUT_MESSAGES_TOTAL
        .with_label_values(&["success"])
        .inc_by(success as f64);
    FANOUT_MESSAGES_TOTAL
        .with_label_values(&["failure"])
        .inc_by(failure as f64);
}

pub fn record_chunk_dispatch(result: &str) {
    FANOUT_CHUNKS_TOTAL.with_label_values(&[result]).inc();
}

pub fn record_recipient_failure(class: &str) {
    RECIPIENT_FAILURES_TOTAL.with_label_values(&[class]).inc();
}

pub fn record_purge_run(outcome: &str) {
    PURGE_RUNS_TOTAL.with_label_values(&[outcome]).inc();
}

pub fn record_purge_deleted(count: usize) {
    PURGE_DELETED_RECORDS_TOTAL.inc_by(count as u64);
}

pub fn record_background_job_execution(job_id: &str, status: &str, duration: Duration) {
    BACKGROUND_JOB_EXECUTIONS_TOTAL
        .with_label_values(&[job_id, status])
        .inc();
    BACKGROUND_JOB_DURATION_SECONDS
        .with_label_values(&[job_id])
        .observe(duration.as_secs_f64());
}

pub fn set_background_job_running(job_id: &str, running: bool) {
    BACKGROUND_JOB_RUNNING
        .with_label_values(&[job_id])
        .set(if running { 1.0 } else { 0.0 });
}

/// Update process memory usage
pub fn update_memory_usage() {
    #[cfg(target_os = "linux")]
    {
        if let Ok(status) = std::fs::read_to_string("/proc/self/status") {
            let rss_kb = status
                .lines()
                .find(|line| line.starts_with("VmRSS:"))
                .and_then(|line| line.split_whitespace().nth(1))
                .and_then(|kb| kb.parse::<f64>().ok());
            if let Some(kb) = rss_kb {
                PROCESS_MEMORY_BYTES.set(kb * 1024.0);
            }
        }
    }
}

/// Handler for the /metrics endpoint
pub async fn metrics_handler() -> impl IntoResponse {
    update_memory_usage();

    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();

    let mut buffer = vec![];
    match encoder.encode(&metric_families, &mut buffer) {
        Ok(()) => {
            let response = String::from_utf8(buffer).unwrap_or_default();
            (StatusCode::OK, response)
        }
        Err(e) => {
            tracing::error!("Failed to encode metrics: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to encode metrics: {}", e),
            )
        }
    }
}
