//! Health probe types shared by the adapters and the `health` tool.

use schemars::JsonSchema;
use serde::Serialize;

use crate::types::SourceId;

/// Probe outcome for one backend or for the aggregate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    /// 2xx response with a positive record count on a trivial query.
    Healthy,
    /// Some backends healthy, some not (aggregate only).
    Degraded,
    /// Probe failed, timed out, or returned an error payload.
    Unhealthy,
}

/// One backend's probe result.
#[derive(Debug, Clone, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct HealthSample {
    /// Probed backend.
    pub source: SourceId,
    /// Probe outcome.
    pub status: HealthStatus,
    /// Wall-clock latency of the probe.
    pub latency_ms: u64,
    /// Failure reason; `None` when healthy.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl HealthSample {
    /// A passing sample.
    pub const fn healthy(source: SourceId, latency_ms: u64) -> Self {
        Self {
            source,
            status: HealthStatus::Healthy,
            latency_ms,
            reason: None,
        }
    }

    /// A failing sample with a reason.
    pub fn unhealthy(source: SourceId, latency_ms: u64, reason: impl Into<String>) -> Self {
        Self {
            source,
            status: HealthStatus::Unhealthy,
            latency_ms,
            reason: Some(reason.into()),
        }
    }
}

/// Aggregate report across all probed backends.
#[derive(Debug, Clone, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct HealthReport {
    /// `healthy` iff all samples are healthy, `unhealthy` iff none are,
    /// `degraded` otherwise.
    pub overall_status: HealthStatus,
    /// Count of healthy backends.
    pub healthy_count: usize,
    /// Count of probed backends.
    pub total_count: usize,
    /// Per-backend samples, in probe order.
    pub samples: Vec<HealthSample>,
}

impl HealthReport {
    /// Aggregate samples using the all/any/none rule.
    pub fn aggregate(samples: Vec<HealthSample>) -> Self {
        let healthy_count = samples
            .iter()
            .filter(|s| s.status == HealthStatus::Healthy)
            .count();
        let total_count = samples.len();
        let overall_status = if total_count > 0 && healthy_count == total_count {
            HealthStatus::Healthy
        } else if healthy_count > 0 {
            HealthStatus::Degraded
        } else {
            HealthStatus::Unhealthy
        };
        Self {
            overall_status,
            healthy_count,
            total_count,
            samples,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_healthy_is_healthy() {
        let report = HealthReport::aggregate(vec![
            HealthSample::healthy(SourceId::Yargitay, 120),
            HealthSample::healthy(SourceId::Danistay, 340),
        ]);
        assert_eq!(report.overall_status, HealthStatus::Healthy);
        assert_eq!(report.healthy_count, 2);
    }

    #[test]
    fn mixed_is_degraded_with_reason_kept() {
        let report = HealthReport::aggregate(vec![
            HealthSample::healthy(SourceId::Yargitay, 120),
            HealthSample::unhealthy(SourceId::Bedesten, 5_000, "total is 0 or missing"),
        ]);
        assert_eq!(report.overall_status, HealthStatus::Degraded);
        let failing = &report.samples[1];
        assert_eq!(failing.status, HealthStatus::Unhealthy);
        assert!(failing.reason.is_some());
    }

    #[test]
    fn none_healthy_is_unhealthy() {
        let report = HealthReport::aggregate(vec![
            HealthSample::unhealthy(SourceId::Kik, 0, "connect error"),
        ]);
        assert_eq!(report.overall_status, HealthStatus::Unhealthy);
    }

    #[test]
    fn empty_probe_set_is_unhealthy() {
        let report = HealthReport::aggregate(Vec::new());
        assert_eq!(report.overall_status, HealthStatus::Unhealthy);
    }
}
