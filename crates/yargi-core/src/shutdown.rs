//! Ordered gateway shutdown.
//!
//! The browser pool goes first so its OS processes are released, then the
//! HTTP session pool, then the telemetry sink flushes. Each step is
//! idempotent, so a partially-completed shutdown can simply be re-run.

use crate::browser::BrowserPool;
use crate::session::SessionPool;
use crate::telemetry::Telemetry;

/// Run the full shutdown sequence.
pub async fn shutdown(browser: &BrowserPool, sessions: &SessionPool, telemetry: &Telemetry) {
    tracing::info!("gateway shutdown started");
    browser.shutdown().await;
    sessions.shutdown();
    telemetry.flush();
    tracing::info!("gateway shutdown complete");
}
