//! Environment-derived gateway configuration.
//!
//! All keys are optional except the third-party search credentials, which
//! are required unless their backend is disabled: the gateway refuses to
//! start with a silently broken adapter.

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::time::Duration;

use crate::error::{Error, Result};
use crate::types::SourceId;

/// Runtime configuration, read once at startup.
#[derive(Debug, Clone, Default)]
pub struct GatewayConfig {
    timeouts: HashMap<SourceId, Duration>,
    disabled: HashSet<SourceId>,
    /// Tavily API key for the BDDK adapter.
    pub tavily_api_key: Option<String>,
    /// Brave Search API token for the KVKK adapter.
    pub brave_api_token: Option<String>,
    /// Directory for file-based log output; stderr only when unset.
    pub log_dir: Option<PathBuf>,
    /// Whether the external auth collaborator is enabled (transport-layer
    /// concern; carried through for the host runtime).
    pub auth_enabled: bool,
}

impl GatewayConfig {
    /// Load configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Fails when a per-source timeout override is unparseable, or when a
    /// required backend credential is absent and that backend has not been
    /// disabled via `YARGI_DISABLED_SOURCES`.
    pub fn from_env() -> Result<Self> {
        let mut config = Self {
            tavily_api_key: non_empty_env("TAVILY_API_KEY"),
            brave_api_token: non_empty_env("BRAVE_API_TOKEN"),
            log_dir: non_empty_env("LOG_DIRECTORY").map(PathBuf::from),
            auth_enabled: std::env::var("ENABLE_AUTH")
                .map(|v| v.eq_ignore_ascii_case("true"))
                .unwrap_or(false),
            ..Self::default()
        };

        if let Some(list) = non_empty_env("YARGI_DISABLED_SOURCES") {
            for name in list.split(',').map(str::trim).filter(|s| !s.is_empty()) {
                let source = parse_source(name)?;
                config.disabled.insert(source);
            }
        }

        for source in SourceId::ALL {
            let key = format!("YARGI_TIMEOUT_{}", source.as_str().to_uppercase());
            if let Some(raw) = non_empty_env(&key) {
                let secs: u64 = raw.parse().map_err(|_| {
                    Error::invalid_argument(&key, format!("expected seconds, got `{raw}`"))
                })?;
                config.timeouts.insert(source, Duration::from_secs(secs));
            }
        }

        config.require_credentials()?;
        Ok(config)
    }

    fn require_credentials(&self) -> Result<()> {
        if !self.is_disabled(SourceId::Bddk) && self.tavily_api_key.is_none() {
            return Err(Error::invalid_argument(
                "TAVILY_API_KEY",
                "missing credential for the bddk backend; set it or disable the backend",
            ));
        }
        if !self.is_disabled(SourceId::Kvkk) && self.brave_api_token.is_none() {
            return Err(Error::invalid_argument(
                "BRAVE_API_TOKEN",
                "missing credential for the kvkk backend; set it or disable the backend",
            ));
        }
        Ok(())
    }

    /// Per-source timeout override, when configured.
    pub fn timeout_override(&self, source: SourceId) -> Option<Duration> {
        self.timeouts.get(&source).copied()
    }

    /// Whether the backend has been disabled by configuration.
    pub fn is_disabled(&self, source: SourceId) -> bool {
        self.disabled.contains(&source)
    }

    /// Backends that remain enabled, in probe order.
    pub fn enabled_sources(&self) -> Vec<SourceId> {
        SourceId::ALL
            .into_iter()
            .filter(|s| !self.is_disabled(*s))
            .collect()
    }

    /// Test constructor with explicit credentials and no overrides.
    pub fn for_tests() -> Self {
        Self {
            tavily_api_key: Some("test-tavily".to_string()),
            brave_api_token: Some("test-brave".to_string()),
            ..Self::default()
        }
    }

    /// Disable a backend (builder-style, used by tests and embedders).
    pub fn disable(mut self, source: SourceId) -> Self {
        self.disabled.insert(source);
        self
    }
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parse_source(name: &str) -> Result<SourceId> {
    SourceId::ALL
        .into_iter()
        .find(|s| s.as_str() == name)
        .ok_or_else(|| {
            Error::invalid_argument(
                "YARGI_DISABLED_SOURCES",
                format!("unknown source `{name}`"),
            )
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disabled_backend_waives_its_credential() {
        let config = GatewayConfig::default()
            .disable(SourceId::Bddk)
            .disable(SourceId::Kvkk);
        assert!(config.require_credentials().is_ok());
    }

    #[test]
    fn missing_credential_refuses_start() {
        let config = GatewayConfig::default().disable(SourceId::Kvkk);
        let err = config.require_credentials().unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::InvalidArgument);
        assert!(err.to_string().contains("TAVILY_API_KEY"));
    }

    #[test]
    fn enabled_sources_excludes_disabled() {
        let config = GatewayConfig::for_tests().disable(SourceId::Emsal);
        let enabled = config.enabled_sources();
        assert!(!enabled.contains(&SourceId::Emsal));
        assert!(enabled.contains(&SourceId::Yargitay));
        assert_eq!(enabled.len(), SourceId::ALL.len() - 1);
    }
}
