use axum::extract::FromRef;

use crate::background_jobs::SchedulerHandle;
use crate::fanout::FanOutDispatcher;
use std::sync::Arc;
use std::time::Instant;

use super::ServerConfig;

pub type GuardedDispatcher = Arc<FanOutDispatcher>;
pub type OptionalSchedulerHandle = Option<SchedulerHandle>;

#[derive(Clone)]
pub struct ServerState {
    pub config: ServerConfig,
    pub start_time: Instant,
    pub dispatcher: GuardedDispatcher,
    pub scheduler_handle: OptionalSchedulerHandle,
    pub hash: String,
}

impl FromRef<ServerState> for GuardedDispatcher {
    fn from_ref(input: &ServerState) -> Self {
        input.dispatcher.clone()
    }
}

impl FromRef<ServerState> for ServerConfig {
    fn from_ref(input: &ServerState) -> Self {
        input.config.clone()
    }
}

impl FromRef<ServerState> for OptionalSchedulerHandle {
    fn from_ref(input: &ServerState) -> Self {
        input.scheduler_handle.clone()
    }
}
