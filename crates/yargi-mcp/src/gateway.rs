//! Gateway assembly: pools, adapters and telemetry, constructed once at
//! startup and shared behind `Arc`.

use std::collections::HashMap;
use std::sync::Arc;

use yargi_core::adapters::anayasa::AnayasaAdapter;
use yargi_core::adapters::bddk::BddkAdapter;
use yargi_core::adapters::bedesten::BedestenAdapter;
use yargi_core::adapters::danistay::DanistayAdapter;
use yargi_core::adapters::emsal::EmsalAdapter;
use yargi_core::adapters::kik::KikAdapter;
use yargi_core::adapters::kvkk::KvkkAdapter;
use yargi_core::adapters::rekabet::RekabetAdapter;
use yargi_core::adapters::sayistay::SayistayAdapter;
use yargi_core::adapters::uyusmazlik::UyusmazlikAdapter;
use yargi_core::adapters::yargitay::YargitayAdapter;
use yargi_core::adapters::{self, Adapter};
use yargi_core::{BrowserPool, Error, GatewayConfig, Result, SessionPool, SourceId, Telemetry};

/// Everything a tool handler needs, shared behind `Arc`.
pub struct Gateway {
    /// Runtime configuration.
    pub config: GatewayConfig,
    /// Shared HTTP session pool.
    pub sessions: SessionPool,
    /// Shared headless browser pool.
    pub browser: BrowserPool,
    /// Telemetry counters.
    pub telemetry: Telemetry,
    /// Yargıtay adapter.
    pub yargitay: Arc<YargitayAdapter>,
    /// Danıştay adapter.
    pub danistay: Arc<DanistayAdapter>,
    /// UYAP Emsal adapter.
    pub emsal: Arc<EmsalAdapter>,
    /// Jurisdictional-dispute court adapter.
    pub uyusmazlik: Arc<UyusmazlikAdapter>,
    /// Bedesten federated-index adapter.
    pub bedesten: Arc<BedestenAdapter>,
    /// Constitutional court adapter.
    pub anayasa: Arc<AnayasaAdapter>,
    /// Court of accounts adapter.
    pub sayistay: Arc<SayistayAdapter>,
    /// Procurement authority adapter.
    pub kik: Arc<KikAdapter>,
    /// Competition authority adapter.
    pub rekabet: Arc<RekabetAdapter>,
    /// Banking regulator adapter.
    pub bddk: Arc<BddkAdapter>,
    /// Data-protection authority adapter.
    pub kvkk: Arc<KvkkAdapter>,
    by_source: HashMap<SourceId, Arc<dyn Adapter>>,
}

impl Gateway {
    /// Assemble the gateway from configuration.
    ///
    /// # Errors
    ///
    /// Fails when a required backend credential is missing and the backend
    /// is not disabled.
    pub fn new(config: GatewayConfig) -> Result<Self> {
        let sessions = SessionPool::new(adapters::session_profiles(), &config);
        Self::with_pools(config, sessions, BrowserPool::new())
    }

    /// Assemble the gateway over explicit pools (tests point the session
    /// pool at doubles).
    pub fn with_pools(
        config: GatewayConfig,
        sessions: SessionPool,
        browser: BrowserPool,
    ) -> Result<Self> {
        let telemetry = Telemetry::new();

        let tavily = config.tavily_api_key.clone().ok_or_else(|| {
            Error::invalid_argument("TAVILY_API_KEY", "missing credential for the bddk backend")
        });
        let brave = config.brave_api_token.clone().ok_or_else(|| {
            Error::invalid_argument("BRAVE_API_TOKEN", "missing credential for the kvkk backend")
        });

        let yargitay = Arc::new(YargitayAdapter::new(sessions.clone()));
        let danistay = Arc::new(DanistayAdapter::new(sessions.clone()));
        let emsal = Arc::new(EmsalAdapter::new(sessions.clone()));
        let uyusmazlik = Arc::new(UyusmazlikAdapter::new(sessions.clone()));
        let bedesten = Arc::new(BedestenAdapter::new(sessions.clone()));
        let anayasa = Arc::new(AnayasaAdapter::new(sessions.clone()));
        let sayistay = Arc::new(SayistayAdapter::new(sessions.clone()));
        let kik = Arc::new(KikAdapter::new(sessions.clone(), browser.clone()));
        let rekabet = Arc::new(RekabetAdapter::new(sessions.clone()));
        let bddk = if config.is_disabled(SourceId::Bddk) {
            Arc::new(BddkAdapter::new(sessions.clone(), String::new()))
        } else {
            Arc::new(BddkAdapter::new(sessions.clone(), tavily?))
        };
        let kvkk = if config.is_disabled(SourceId::Kvkk) {
            Arc::new(KvkkAdapter::new(sessions.clone(), String::new()))
        } else {
            Arc::new(KvkkAdapter::new(sessions.clone(), brave?))
        };

        let mut by_source: HashMap<SourceId, Arc<dyn Adapter>> = HashMap::new();
        by_source.insert(SourceId::Yargitay, yargitay.clone());
        by_source.insert(SourceId::Danistay, danistay.clone());
        by_source.insert(SourceId::Emsal, emsal.clone());
        by_source.insert(SourceId::Uyusmazlik, uyusmazlik.clone());
        by_source.insert(SourceId::Bedesten, bedesten.clone());
        by_source.insert(SourceId::Anayasa, anayasa.clone());
        by_source.insert(SourceId::Sayistay, sayistay.clone());
        by_source.insert(SourceId::Kik, kik.clone());
        by_source.insert(SourceId::Rekabet, rekabet.clone());
        by_source.insert(SourceId::Bddk, bddk.clone());
        by_source.insert(SourceId::Kvkk, kvkk.clone());

        Ok(Self {
            config,
            sessions,
            browser,
            telemetry,
            yargitay,
            danistay,
            emsal,
            uyusmazlik,
            bedesten,
            anayasa,
            sayistay,
            kik,
            rekabet,
            bddk,
            kvkk,
            by_source,
        })
    }

    /// Resolve the adapter owning a source, for handle-routed operations.
    pub fn adapter_for(&self, source: SourceId) -> Result<&Arc<dyn Adapter>> {
        if self.config.is_disabled(source) {
            return Err(Error::NotFound(format!("backend {source} is disabled")));
        }
        self.by_source
            .get(&source)
            .ok_or_else(|| Error::NotFound(format!("no adapter for {source}")))
    }

    /// Adapters of all enabled backends, in probe order.
    pub fn enabled_adapters(&self) -> Vec<Arc<dyn Adapter>> {
        self.config
            .enabled_sources()
            .into_iter()
            .filter_map(|s| self.by_source.get(&s).cloned())
            .collect()
    }

    /// Run the ordered shutdown sequence.
    pub async fn shutdown(&self) {
        yargi_core::shutdown::shutdown(&self.browser, &self.sessions, &self.telemetry).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gateway_builds_with_test_credentials() {
        let gateway = Gateway::new(GatewayConfig::for_tests()).unwrap();
        assert_eq!(gateway.enabled_adapters().len(), SourceId::ALL.len());
        assert!(gateway.adapter_for(SourceId::Yargitay).is_ok());
    }

    #[test]
    fn disabled_backend_is_not_routable() {
        let config = GatewayConfig::for_tests().disable(SourceId::Bddk);
        let gateway = Gateway::new(config).unwrap();
        let err = gateway.adapter_for(SourceId::Bddk).unwrap_err();
        assert_eq!(err.kind(), yargi_core::ErrorKind::NotFound);
        assert_eq!(gateway.enabled_adapters().len(), SourceId::ALL.len() - 1);
    }
}
