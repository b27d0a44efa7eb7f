//! Aggregate health probe.

use std::time::Duration;

use futures::future::BoxFuture;
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::Value;
use yargi_core::{HealthReport, HealthSample, Result};

use crate::dispatch::{parse_args, to_payload};
use crate::gateway::Gateway;

/// Per-backend probe cutoff; a slow backend counts as unhealthy rather
/// than delaying the aggregate.
const PROBE_TIMEOUT: Duration = Duration::from_secs(15);

/// Arguments of `health` (none).
#[derive(Debug, Default, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct HealthParams {}

/// `health` handler: probe all enabled backends in parallel and apply the
/// all/any/none aggregation rule.
pub fn probe(gateway: &Gateway, args: Value) -> BoxFuture<'_, Result<Value>> {
    Box::pin(async move {
        let _params: HealthParams = parse_args(args)?;
        let adapters = gateway.enabled_adapters();
        let probes = adapters.into_iter().map(|adapter| async move {
            let source = adapter.source();
            match tokio::time::timeout(PROBE_TIMEOUT, adapter.health()).await {
                Ok(sample) => sample,
                Err(_) => HealthSample::unhealthy(
                    source,
                    u64::try_from(PROBE_TIMEOUT.as_millis()).unwrap_or(u64::MAX),
                    "probe timed out",
                ),
            }
        });

        let samples = futures::future::join_all(probes).await;
        let report = HealthReport::aggregate(samples);
        to_payload(&report)
    })
}
