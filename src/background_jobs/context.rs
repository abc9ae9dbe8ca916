use tokio_util::sync::CancellationToken;

/// Context handed to a job for one execution.
#[derive(Clone)]
pub struct JobContext {
    /// Cancelled when the job should stop early, e.g. on shutdown.
    pub cancellation_token: CancellationToken,

    /// What started this run: "schedule" or "manual".
    pub triggered_by: String,
}

impl JobContext {
    pub fn new(cancellation_token: CancellationToken, triggered_by: impl Into<String>) -> Self {
        Self {
            cancellation_token,
            triggered_by: triggered_by.into(),
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancellation_token.is_cancelled()
    }
}
