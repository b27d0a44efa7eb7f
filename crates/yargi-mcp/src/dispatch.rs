//! Tool dispatch: validation, deadlines, the uniform envelope and the
//! per-call telemetry line.
//!
//! Argument validation happens before any adapter code runs; a schema
//! violation therefore never causes network traffic. Every call returns
//! the same envelope shape whether it succeeded or failed, and the
//! envelope never carries backend-internal state.

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use yargi_core::{Error, ErrorKind, Result, Telemetry};

use crate::gateway::Gateway;
use crate::limits::Limits;
use crate::registry::ToolRegistry;

/// Uniform result envelope for every tool call.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope {
    /// Whether the call succeeded.
    pub ok: bool,
    /// Tool payload; absent on failure.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,
    /// Call metadata.
    pub diagnostics: Diagnostics,
}

/// Call metadata attached to every envelope.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Diagnostics {
    /// Backend the tool is bound to, when there is exactly one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_id: Option<String>,
    /// Tool name that was invoked.
    pub operation: String,
    /// Wall-clock duration of the call.
    pub duration_ms: u64,
    /// Failure details; absent on success.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorInfo>,
}

/// Machine-readable failure details.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorInfo {
    /// Closed-set failure kind.
    pub kind: ErrorKind,
    /// One-line human message (English).
    pub message: String,
}

/// Deserialize tool arguments, reporting the failing field path.
pub fn parse_args<T: DeserializeOwned>(args: Value) -> Result<T> {
    let result: std::result::Result<T, _> = serde_path_to_error::deserialize(args);
    result.map_err(|e| {
        let path = e.path().to_string();
        let field = if path.is_empty() || path == "." {
            "arguments".to_string()
        } else {
            path
        };
        Error::invalid_argument(field, e.inner().to_string())
    })
}

/// Serialize a tool payload.
pub fn to_payload<T: Serialize>(value: &T) -> Result<Value> {
    serde_json::to_value(value).map_err(|e| Error::BackendFailure {
        status: None,
        excerpt: format!("payload serialization failed: {e}"),
    })
}

/// Reentrant dispatcher over a frozen registry.
#[derive(Clone)]
pub struct Dispatcher {
    registry: Arc<ToolRegistry>,
    gateway: Arc<Gateway>,
    limits: Limits,
}

impl Dispatcher {
    /// Build over a frozen registry and an assembled gateway.
    pub fn new(registry: Arc<ToolRegistry>, gateway: Arc<Gateway>) -> Self {
        Self {
            registry,
            gateway,
            limits: Limits::new(),
        }
    }

    /// Replace the worker limits (tests).
    pub fn with_limits(mut self, limits: Limits) -> Self {
        self.limits = limits;
        self
    }

    /// The registry backing this dispatcher.
    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    /// The gateway backing this dispatcher.
    pub fn gateway(&self) -> &Arc<Gateway> {
        &self.gateway
    }

    /// Invoke a tool and wrap the outcome in the uniform envelope.
    pub async fn dispatch(
        &self,
        name: &str,
        args: Value,
        caller_deadline: Option<Duration>,
    ) -> Envelope {
        let start = Instant::now();
        let input_tokens = yargi_core::telemetry::estimate_tokens(&args.to_string());

        let Some(entry) = self.registry.get(name) else {
            return finish(
                name,
                None,
                start,
                input_tokens,
                &self.gateway.telemetry,
                Err(Error::NotFound(format!("unknown tool `{name}`"))),
            );
        };
        let source = entry.source;

        // The registry only holds read-only operations; refuse anything
        // else outright rather than trusting the handler.
        if !entry.descriptor.annotations.read_only {
            return finish(
                name,
                source,
                start,
                input_tokens,
                &self.gateway.telemetry,
                Err(Error::invalid_argument(
                    "tool",
                    "non-read-only operations are not dispatched",
                )),
            );
        }

        let permit = match self.limits.acquire().await {
            Ok(p) => p,
            Err(e) => {
                return finish(name, source, start, input_tokens, &self.gateway.telemetry, Err(e));
            },
        };

        let deadline = match caller_deadline {
            Some(d) => d.min(entry.default_deadline),
            None => entry.default_deadline,
        };

        let outcome = match tokio::time::timeout(
            deadline,
            (entry.handler)(self.gateway.as_ref(), args),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => Err(Error::Timeout(format!(
                "tool `{name}` exceeded its {deadline:?} deadline"
            ))),
        };
        drop(permit);

        finish(name, source, start, input_tokens, &self.gateway.telemetry, outcome)
    }
}

fn finish(
    name: &str,
    source: Option<yargi_core::SourceId>,
    start: Instant,
    input_tokens: u64,
    telemetry: &Telemetry,
    outcome: Result<Value>,
) -> Envelope {
    let duration = start.elapsed();
    let duration_ms = u64::try_from(duration.as_millis()).unwrap_or(u64::MAX);

    let (ok, payload, error, output_tokens) = match outcome {
        Ok(payload) => {
            let output_tokens = yargi_core::telemetry::estimate_tokens(&payload.to_string());
            (true, Some(payload), None, output_tokens)
        },
        Err(e) => (
            false,
            None,
            Some(ErrorInfo {
                kind: e.kind(),
                message: e.to_string(),
            }),
            0,
        ),
    };

    match source {
        Some(source) => telemetry.record_call(
            source,
            name,
            input_tokens,
            output_tokens,
            duration,
            error.as_ref().map(|e| e.kind),
        ),
        None => tracing::info!(
            target: "yargi::telemetry",
            operation = name,
            input_tokens,
            output_tokens,
            duration_ms,
            outcome = if ok { "ok" } else { "error" },
            "tool call"
        ),
    }

    Envelope {
        ok,
        payload,
        diagnostics: Diagnostics {
            source_id: source.map(|s| s.to_string()),
            operation: name.to_string(),
            duration_ms,
            error,
        },
    }
}
