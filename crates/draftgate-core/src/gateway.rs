//! Model Gateway: the seam to the external generative model
//!
//! A gateway turns a [`ModelCall`] into raw model text. It carries no business
//! logic; the orchestrator bounds every call with a timeout and the caller's
//! cancellation token via [`invoke_bounded`].
use crate::data_model::{PipelineMode, ReferenceArticle};
use async_trait::async_trait;
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

/// Everything a gateway needs to produce one completion.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelCall {
    pub mode: PipelineMode,
    pub system: String,
    pub prompt: String,
    pub keyword: String,
    pub reference: Option<ReferenceArticle>,
    pub citation_pool: Vec<String>,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GatewayError {
    #[error("model credentials missing")]
    KeyMissing,

    #[error("transport: {0}")]
    Transport(String),

    #[error("upstream status {status}: {body}")]
    Upstream { status: u16, body: String },
}

/// Contract for every model backend.
#[async_trait]
pub trait ModelGateway: Send + Sync {
    /// Backend name used in logs (ex: "openai-compatible", "scenario:success")
    fn name(&self) -> &str;

    /// Produce raw model output for the call.
    async fn invoke(&self, call: &ModelCall) -> Result<String, GatewayError>;
}

/// Why a bounded call produced no output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallFailure {
    Timeout(Duration),
    Cancelled,
    Gateway(GatewayError),
}

/// Invoke `gateway` under `timeout`, racing the caller's cancellation token.
/// The gateway future is dropped on timeout or cancellation. A response that
/// is already ready wins over a cancellation observed in the same poll.
pub async fn invoke_bounded(
    gateway: &dyn ModelGateway,
    call: &ModelCall,
    timeout: Duration,
    cancel: &CancellationToken,
) -> Result<String, CallFailure> {
    tokio::select! {
        biased;
        res = tokio::time::timeout(timeout, gateway.invoke(call)) => match res {
            Ok(Ok(text)) => Ok(text),
            Ok(Err(e)) => Err(CallFailure::Gateway(e)),
            Err(_) => Err(CallFailure::Timeout(timeout)),
        },
        _ = cancel.cancelled() => Err(CallFailure::Cancelled),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Slow;

    #[async_trait]
    impl ModelGateway for Slow {
        fn name(&self) -> &str {
            "slow"
        }

        async fn invoke(&self, _call: &ModelCall) -> Result<String, GatewayError> {
            tokio::time::sleep(Duration::from_secs(120)).await;
            Ok("late".to_string())
        }
    }

    struct Echo;

    #[async_trait]
    impl ModelGateway for Echo {
        fn name(&self) -> &str {
            "echo"
        }

        async fn invoke(&self, call: &ModelCall) -> Result<String, GatewayError> {
            Ok(call.prompt.clone())
        }
    }

    fn call() -> ModelCall {
        ModelCall {
            mode: PipelineMode::Draft,
            system: String::new(),
            prompt: "hello".to_string(),
            keyword: "k".to_string(),
            reference: None,
            citation_pool: vec![],
        }
    }

    #[tokio::test]
    async fn test_returns_output_within_budget() {
        let token = CancellationToken::new();
        let out = invoke_bounded(&Echo, &call(), Duration::from_secs(8), &token).await;
        assert_eq!(out, Ok("hello".to_string()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_times_out() {
        let token = CancellationToken::new();
        let out = invoke_bounded(&Slow, &call(), Duration::from_secs(8), &token).await;
        assert_eq!(out, Err(CallFailure::Timeout(Duration::from_secs(8))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancellation_wins_over_slow_gateway() {
        let token = CancellationToken::new();
        let child = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(1)).await;
            child.cancel();
        });
        let out = invoke_bounded(&Slow, &call(), Duration::from_secs(30), &token).await;
        assert_eq!(out, Err(CallFailure::Cancelled));
    }

    #[tokio::test]
    async fn test_ready_response_kept_when_already_cancelled() {
        let token = CancellationToken::new();
        token.cancel();
        for _ in 0..32 {
            let out = invoke_bounded(&Echo, &call(), Duration::from_secs(8), &token).await;
            assert_eq!(out, Ok("hello".to_string()));
        }
    }
}
