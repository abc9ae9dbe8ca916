use super::chunking::{build_chunks, partition_eligible};
use super::classify::{classify_failure, FailureClass};
use super::error::FanOutError;
use super::models::{
    AggregateResult, DispatchOutcome, DispatchStatus, FanOutReport, Message, NotifyRequest,
    RecipientFailure,
};
use crate::directory::RecipientDirectory;
use crate::server::metrics;
use crate::transport::{BatchResponse, PushTransport};
use futures::future::join_all;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{timeout_at, Instant};
use tracing::{debug, error, info, warn};

/// Code recorded for a message the provider returned no result for.
const MISSING_RESPONSE_CODE: &str = "missing-response";

/// Sends one notification to every eligible recipient in the directory.
///
/// Holds its collaborators explicitly; a single instance is built at startup
/// and shared by all requests.
pub struct FanOutDispatcher {
    directory: Arc<dyn RecipientDirectory>,
    transport: Arc<dyn PushTransport>,
    invocation_timeout: Duration,
}

impl FanOutDispatcher {
    pub fn new(
        directory: Arc<dyn RecipientDirectory>,
        transport: Arc<dyn PushTransport>,
        invocation_timeout: Duration,
    ) -> Self {
        Self {
            directory,
            transport,
            invocation_timeout,
        }
    }

    /// Runs one fan-out invocation.
    ///
    /// Only an invalid request or an unreadable directory produce an error;
    /// chunk and recipient failures are folded into the report.
    pub async fn dispatch(&self, request: NotifyRequest) -> Result<FanOutReport, FanOutError> {
        // The budget covers the directory read as well as the sends.
        let deadline = Instant::now() + self.invocation_timeout;
        let notification = Arc::new(request.into_notification()?);

        let recipients = self.directory.list_recipients().map_err(|e| {
            error!("Failed to read recipient directory: {:#}", e);
            metrics::record_fanout_invocation("upstream_unavailable");
            FanOutError::UpstreamUnavailable(e.to_string())
        })?;

        let (addresses, excluded_count) = partition_eligible(recipients);
        if addresses.is_empty() {
            info!(
                "No eligible recipients for {:?} ({} excluded)",
                notification.title, excluded_count
            );
            metrics::record_fanout_invocation("no_recipients");
            return Ok(FanOutReport::no_recipients(excluded_count));
        }

        let chunks = build_chunks(&addresses, &notification);
        let chunk_count = chunks.len();
        info!(
            "Dispatching {:?} to {} recipients in {} chunks via {} transport",
            notification.title,
            addresses.len(),
            chunk_count,
            self.transport.name()
        );

        let tasks = chunks.into_iter().enumerate().map(|(chunk_index, chunk)| {
            let chunk_len = chunk.len();
            let transport = Arc::clone(&self.transport);
            let handle = tokio::spawn(dispatch_chunk(transport, chunk_index, chunk, deadline));
            async move {
                match handle.await {
                    Ok(outcome) => outcome,
                    Err(e) => {
                        error!("Chunk {} task did not complete: {}", chunk_index, e);
                        DispatchOutcome::chunk_failed(chunk_index, chunk_len, e.to_string())
                    }
                }
            }
        });
        let outcomes = join_all(tasks).await;

        let result: AggregateResult = outcomes.iter().collect();
        let mut flagged_for_removal = Vec::new();
        let mut failed_chunks = Vec::new();
        for outcome in &outcomes {
            if let Some(e) = &outcome.transport_error {
                failed_chunks.push(format!("#{} ({})", outcome.chunk_index, e));
            }
            for failure in &outcome.failures {
                let class = classify_failure(&failure.error_code, &failure.error_message);
                metrics::record_recipient_failure(class.as_str());
                match class {
                    FailureClass::Permanent => {
                        warn!(
                            "Chunk {}: address {} permanently rejected ({}: {}), flagging for removal",
                            outcome.chunk_index,
                            failure.address,
                            failure.error_code,
                            failure.error_message
                        );
                        flagged_for_removal.push(failure.clone());
                    }
                    FailureClass::Transient => {
                        info!(
                            "Chunk {}: transient failure for {} ({}: {})",
                            outcome.chunk_index,
                            failure.address,
                            failure.error_code,
                            failure.error_message
                        );
                    }
                }
            }
        }

        if !failed_chunks.is_empty() {
            warn!(
                "{} of {} chunks failed as a whole: {}",
                failed_chunks.len(),
                chunk_count,
                failed_chunks.join(", ")
            );
        }

        if !flagged_for_removal.is_empty() {
            match self.directory.flag_for_removal(&flagged_for_removal) {
                Ok(count) => info!("Flagged {} addresses for removal", count),
                Err(e) => error!(
                    "Failed to flag {} addresses for removal: {:#}",
                    flagged_for_removal.len(),
                    e
                ),
            }
        }

        metrics::record_fanout_messages(result.total_success, result.total_failure);
        metrics::record_fanout_invocation("sent");
        info!("{}", result.summary());

        Ok(FanOutReport {
            status: DispatchStatus::Sent,
            result,
            chunk_count,
            excluded_count,
            flagged_for_removal,
        })
    }
}

/// Sends one chunk. Never fails: a transport error or the invocation deadline
/// turns into an all-failed outcome for this chunk only.
async fn dispatch_chunk(
    transport: Arc<dyn PushTransport>,
    chunk_index: usize,
    chunk: Vec<Message>,
    deadline: Instant,
) -> DispatchOutcome {
    match timeout_at(deadline, transport.send_batch(&chunk)).await {
        Ok(Ok(response)) => {
            metrics::record_chunk_dispatch("ok");
            fold_response(chunk_index, &chunk, response)
        }
        Ok(Err(e)) => {
            error!(
                "Chunk {} ({} messages) failed as a whole: {}",
                chunk_index,
                chunk.len(),
                e
            );
            metrics::record_chunk_dispatch("transport_error");
            DispatchOutcome::chunk_failed(chunk_index, chunk.len(), e.to_string())
        }
        Err(_) => {
            error!(
                "Chunk {} ({} messages) still pending at invocation deadline",
                chunk_index,
                chunk.len()
            );
            metrics::record_chunk_dispatch("timeout");
            DispatchOutcome::chunk_failed(
                chunk_index,
                chunk.len(),
                "invocation deadline exceeded".to_string(),
            )
        }
    }
}

/// Correlates per-message results with the chunk, by position.
fn fold_response(chunk_index: usize, chunk: &[Message], response: BatchResponse) -> DispatchOutcome {
    if response.responses.len() != chunk.len() {
        warn!(
            "Chunk {}: provider returned {} results for {} messages",
            chunk_index,
            response.responses.len(),
            chunk.len()
        );
    }

    let mut outcome = DispatchOutcome {
        chunk_index,
        ..Default::default()
    };

    for (position, message) in chunk.iter().enumerate() {
        match response.responses.get(position) {
            Some(r) if r.success => outcome.success_count += 1,
            Some(r) => {
                outcome.failure_count += 1;
                outcome.failures.push(RecipientFailure {
                    address: message.address.clone(),
                    error_code: r.error_code.clone().unwrap_or_else(|| "unknown".to_string()),
                    error_message: r.error_message.clone().unwrap_or_default(),
                });
            }
            None => {
                outcome.failure_count += 1;
                outcome.failures.push(RecipientFailure {
                    address: message.address.clone(),
                    error_code: MISSING_RESPONSE_CODE.to_string(),
                    error_message: String::new(),
                });
            }
        }
    }

    if outcome.success_count != response.success_count
        || outcome.failure_count != response.failure_count
    {
        debug!(
            "Chunk {}: provider counts {}/{} differ from per-message results {}/{}",
            chunk_index,
            response.success_count,
            response.failure_count,
            outcome.success_count,
            outcome.failure_count
        );
    }

    outcome
}
