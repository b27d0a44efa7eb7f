//! # yargi-core
//!
//! Adapter framework and document pipeline for a unified gateway over
//! Turkish legal databases: the supreme court, the council of state, the
//! constitutional court, the court of accounts, the jurisdictional-dispute
//! court, the procurement and competition authorities, the banking and
//! data-protection regulators, the UYAP precedent index and the Bedesten
//! federated index.
//!
//! The crate is organized around a few components:
//!
//! - **Adapters** ([`adapters`]): one module per backend, translating the
//!   typed search contract into each backend's private request shape and
//!   parsing responses into canonical result pages.
//! - **Normalization** ([`normalize`]): HTML/PDF to Markdown with
//!   deterministic fixed-window pagination.
//! - **Sessions** ([`session`]): per-backend HTTP clients with cookie
//!   jars, CSRF caches and TLS policies; [`browser`] adds a headless pool
//!   for the JS-rendered backends.
//! - **Errors** ([`error`]): a closed taxonomy every failure maps into.
//!
//! Search contracts are validated before any network traffic, handles
//! returned by searches are stable and URL-safe, and identical document
//! bytes always chunk identically.

/// Backend adapters, one module per source.
pub mod adapters;
/// Headless browser pool for JS-rendered backends.
pub mod browser;
/// Closed chamber-code set and native-name mapping.
pub mod chambers;
/// Environment-derived configuration.
pub mod config;
/// Error taxonomy and result alias.
pub mod error;
/// Health probe types and aggregation.
pub mod health;
/// HTML/PDF to chunked-Markdown pipeline.
pub mod normalize;
/// Per-backend HTTP session pool.
pub mod session;
/// Ordered shutdown sequence.
pub mod shutdown;
/// Per-source telemetry counters.
pub mod telemetry;
/// Canonical data types.
pub mod types;

pub use adapters::Adapter;
pub use browser::{BrowserPool, FormPlan, FormStep, WaitCondition};
pub use chambers::ChamberCode;
pub use config::GatewayConfig;
pub use error::{Error, ErrorKind, Result};
pub use health::{HealthReport, HealthSample, HealthStatus};
pub use normalize::{ChunkedMarkdown, ConverterProfile, Normalizer};
pub use session::{Session, SessionPool, SourceProfile, TlsPolicy};
pub use telemetry::Telemetry;
pub use types::{
    ContainerKind, DocumentHandle, NormalizedDocument, SearchEntry, SearchPage, SourceId,
};
