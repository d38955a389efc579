//! Invocation engine.
//!
//! # Responsibilities
//! - Run a function route's handler against a canonical event
//! - Enforce the route's wall-clock timeout
//! - Classify the outcome: result, `Timeout`, or `Handler` error
//!
//! # Design Decisions
//! - Knows nothing about HTTP
//! - Timeout drops the runtime future; runtimes must cancel on drop
//! - The runtime is a trait object so dispatch can be tested in-process

use std::sync::Arc;
use std::time::{Duration, Instant};

use futures_util::future::BoxFuture;
use thiserror::Error;

use crate::config::FunctionRoute;
use crate::invoke::event::{InvocationEvent, InvocationResult};
use crate::observability::metrics;

/// Failure raised by the handler itself.
#[derive(Debug, Error)]
pub enum HandlerError {
    #[error("failed to start handler: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("handler I/O failed: {0}")]
    Io(#[source] std::io::Error),

    #[error("handler exited with status {code:?}: {stderr}")]
    Exited { code: Option<i32>, stderr: String },

    #[error("failed to encode event: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("malformed handler result: {0}")]
    MalformedResult(#[source] serde_json::Error),

    #[error("handler output exceeds {0} bytes")]
    OutputTooLarge(u64),

    #[error("{0}")]
    Failed(String),
}

/// Outcome of an invocation that did not produce a result.
#[derive(Debug, Error)]
pub enum InvocationError {
    #[error("handler timed out after {0:?}")]
    Timeout(Duration),

    #[error(transparent)]
    Handler(#[from] HandlerError),
}

/// Executes handlers. Dropping the returned future must cancel the handler.
pub trait FunctionRuntime: Send + Sync {
    fn invoke<'a>(
        &'a self,
        function: &'a FunctionRoute,
        event: &'a InvocationEvent,
    ) -> BoxFuture<'a, Result<InvocationResult, HandlerError>>;
}

/// Timeout-enforcing front of a `FunctionRuntime`.
#[derive(Clone)]
pub struct InvocationEngine {
    runtime: Arc<dyn FunctionRuntime>,
}

impl InvocationEngine {
    pub fn new(runtime: Arc<dyn FunctionRuntime>) -> Self {
        Self { runtime }
    }

    pub async fn invoke(
        &self,
        function: &FunctionRoute,
        event: &InvocationEvent,
    ) -> Result<InvocationResult, InvocationError> {
        let timeout = function.timeout();
        let start = Instant::now();

        let outcome = match tokio::time::timeout(timeout, self.runtime.invoke(function, event)).await {
            Ok(Ok(result)) => Ok(result),
            Ok(Err(e)) => Err(InvocationError::Handler(e)),
            Err(_) => Err(InvocationError::Timeout(timeout)),
        };

        let label = match &outcome {
            Ok(_) => "success",
            Err(InvocationError::Timeout(_)) => "timeout",
            Err(InvocationError::Handler(_)) => "error",
        };
        metrics::record_invocation(&function.name, label, start);

        match &outcome {
            Ok(result) => tracing::debug!(
                function = %function.name,
                status = result.status_code,
                elapsed_ms = start.elapsed().as_millis() as u64,
                "Invocation completed"
            ),
            Err(e) => tracing::error!(function = %function.name, error = %e, "Invocation failed"),
        }

        outcome
    }
}
