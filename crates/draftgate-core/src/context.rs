//! Request Context: per-call metadata shared by the orchestrator stages
use chrono::{DateTime, Utc};
use tokio_util::sync::CancellationToken;

/// Admin actor attribution taken from `x-actor-id` / `x-actor-role`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    pub id: String,
    pub role: String,
}

#[derive(Debug, Clone)]
pub struct RequestContext {
    pub trace_id: String,
    pub received_at: DateTime<Utc>,
    pub actor: Option<Actor>,
    /// Cancelled when the caller goes away; propagated into the model call.
    pub cancel: CancellationToken,
}

impl RequestContext {
    pub fn new() -> Self {
        Self {
            trace_id: uuid::Uuid::new_v4().to_string(),
            received_at: Utc::now(),
            actor: None,
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_actor(mut self, actor: Actor) -> Self {
        self.actor = Some(actor);
        self
    }

    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

impl Default for RequestContext {
    fn default() -> Self {
        Self::new()
    }
}
