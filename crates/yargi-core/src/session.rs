//! Per-backend HTTP session pool.
//!
//! One long-lived [`reqwest::Client`] per source, each carrying its own
//! cookie jar, headers profile, TLS policy and timeout. Adapters borrow a
//! session for one logical operation; concurrent borrows of the same source
//! share the cookie jar and CSRF cache. CSRF warm-up is serialized per
//! source so that N concurrent cold callers trigger exactly one
//! landing-page fetch.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use once_cell::sync::OnceCell;
use reqwest::cookie::Jar;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use tokio::sync::{Mutex, RwLock, Semaphore};
use url::Url;

use crate::config::GatewayConfig;
use crate::error::{Error, Result};
use crate::types::SourceId;

/// Browser UA presented to every backend.
pub const USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/137.0.0.0 Safari/537.36";

/// `Accept-Language` presented to every backend.
pub const ACCEPT_LANGUAGE: &str = "tr-TR,tr;q=0.9,en;q=0.8";

/// TLS posture for one backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TlsPolicy {
    /// Full certificate verification (default).
    #[default]
    Strict,
    /// Certificate verification disabled, legacy-renegotiation-tolerant
    /// native TLS. Required by a handful of court servers with broken
    /// chains or pre-RFC-8446 stacks.
    InsecureLegacy,
}

/// Request profile for one backend.
#[derive(Debug, Clone)]
pub struct SourceProfile {
    /// Backend this profile belongs to.
    pub source: SourceId,
    /// Base URL all relative requests resolve against.
    pub base_url: String,
    /// `Referer` header, when the backend validates it.
    pub referer: Option<String>,
    /// `Origin` header, when the backend validates it.
    pub origin: Option<String>,
    /// Additional static headers (e.g. `X-Requested-With`). Names must be
    /// lowercase.
    pub extra_headers: &'static [(&'static str, &'static str)],
    /// TLS posture.
    pub tls: TlsPolicy,
    /// Default request timeout; config may override per source.
    pub default_timeout: Duration,
    /// Maximum in-flight operations against this backend.
    pub max_concurrency: usize,
}

impl SourceProfile {
    /// Profile with strict TLS, a 60 s timeout and no special headers.
    pub fn plain(source: SourceId, base_url: impl Into<String>) -> Self {
        Self {
            source,
            base_url: base_url.into(),
            referer: None,
            origin: None,
            extra_headers: &[],
            tls: TlsPolicy::Strict,
            default_timeout: Duration::from_secs(60),
            max_concurrency: 8,
        }
    }

    /// Rebase this profile onto another root URL (test doubles).
    pub fn rebased(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self.referer = None;
        self.origin = None;
        self
    }
}

/// Maximum callers allowed to wait for a session permit before the pool
/// answers `ResourceExhausted` outright.
const MAX_QUEUE_DEPTH: usize = 32;

struct SourceEntry {
    profile: SourceProfile,
    timeout: Duration,
    jar: Arc<Jar>,
    client: OnceCell<reqwest::Client>,
    /// `{sub_endpoint -> anti-forgery token}`; reads are cheap and
    /// frequent, updates rare.
    csrf: RwLock<HashMap<String, String>>,
    /// Serializes Cold -> Warm transitions; at most one landing fetch.
    warmup: Mutex<()>,
    permits: Arc<Semaphore>,
    waiters: AtomicUsize,
}

impl SourceEntry {
    fn client(&self) -> Result<&reqwest::Client> {
        self.client.get_or_try_init(|| {
            let mut headers = HeaderMap::new();
            headers.insert(
                reqwest::header::ACCEPT_LANGUAGE,
                HeaderValue::from_static(ACCEPT_LANGUAGE),
            );
            if let Some(referer) = self.profile.referer.as_deref() {
                if let Ok(value) = HeaderValue::from_str(referer) {
                    headers.insert(reqwest::header::REFERER, value);
                }
            }
            if let Some(origin) = self.profile.origin.as_deref() {
                if let Ok(value) = HeaderValue::from_str(origin) {
                    headers.insert(reqwest::header::ORIGIN, value);
                }
            }
            for (name, value) in self.profile.extra_headers {
                headers.insert(
                    HeaderName::from_static(name),
                    HeaderValue::from_static(value),
                );
            }

            let mut builder = reqwest::Client::builder()
                .user_agent(USER_AGENT)
                .default_headers(headers)
                .cookie_provider(Arc::clone(&self.jar))
                .timeout(self.timeout)
                .gzip(true)
                .brotli(true);

            if self.profile.tls == TlsPolicy::InsecureLegacy {
                builder = builder
                    .use_native_tls()
                    .danger_accept_invalid_certs(true)
                    .danger_accept_invalid_hostnames(true);
            }

            builder.build().map_err(|e| Error::BackendFailure {
                status: None,
                excerpt: format!("client construction failed: {e}"),
            })
        })
    }
}

/// A borrowed session: the backend's client plus a concurrency permit.
///
/// Dropping the session returns the permit to the pool.
#[derive(Debug)]
pub struct Session {
    client: reqwest::Client,
    base_url: String,
    _permit: tokio::sync::OwnedSemaphorePermit,
}

impl Session {
    /// The backend's shared HTTP client.
    pub fn client(&self) -> &reqwest::Client {
        &self.client
    }

    /// Resolve a path against the backend's base URL.
    pub fn url(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            return path.to_string();
        }
        format!("{}{path}", self.base_url)
    }
}

/// Pool of per-source sessions. Construct once at startup; clone freely.
#[derive(Clone)]
pub struct SessionPool {
    entries: Arc<HashMap<SourceId, Arc<SourceEntry>>>,
}

impl SessionPool {
    /// Build the pool from static profiles and config overrides. Clients
    /// themselves are constructed lazily on first borrow.
    pub fn new(profiles: Vec<SourceProfile>, config: &GatewayConfig) -> Self {
        let mut entries = HashMap::new();
        for profile in profiles {
            let timeout = config
                .timeout_override(profile.source)
                .unwrap_or(profile.default_timeout);
            let max = profile.max_concurrency;
            entries.insert(
                profile.source,
                Arc::new(SourceEntry {
                    profile,
                    timeout,
                    jar: Arc::new(Jar::default()),
                    client: OnceCell::new(),
                    csrf: RwLock::new(HashMap::new()),
                    warmup: Mutex::new(()),
                    permits: Arc::new(Semaphore::new(max)),
                    waiters: AtomicUsize::new(0),
                }),
            );
        }
        Self {
            entries: Arc::new(entries),
        }
    }

    fn entry(&self, source: SourceId) -> Result<&Arc<SourceEntry>> {
        self.entries
            .get(&source)
            .ok_or_else(|| Error::NotFound(format!("no session profile for {source}")))
    }

    /// Borrow a session for one logical operation.
    ///
    /// Blocks while the per-source concurrency cap is reached; when the
    /// wait queue itself is full, fails immediately with
    /// [`Error::ResourceExhausted`].
    pub async fn borrow(&self, source: SourceId) -> Result<Session> {
        let entry = Arc::clone(self.entry(source)?);

        if entry.permits.available_permits() == 0 {
            let waiting = entry.waiters.fetch_add(1, Ordering::SeqCst);
            if waiting >= MAX_QUEUE_DEPTH {
                entry.waiters.fetch_sub(1, Ordering::SeqCst);
                return Err(Error::ResourceExhausted(format!(
                    "{source} session queue is full"
                )));
            }
            let permit = Arc::clone(&entry.permits).acquire_owned().await;
            entry.waiters.fetch_sub(1, Ordering::SeqCst);
            return Self::assemble(&entry, permit);
        }

        let permit = Arc::clone(&entry.permits).acquire_owned().await;
        Self::assemble(&entry, permit)
    }

    fn assemble(
        entry: &Arc<SourceEntry>,
        permit: std::result::Result<tokio::sync::OwnedSemaphorePermit, tokio::sync::AcquireError>,
    ) -> Result<Session> {
        let permit = permit.map_err(|_| {
            Error::ResourceExhausted("session pool is shutting down".to_string())
        })?;
        let client = entry.client()?.clone();
        Ok(Session {
            client,
            base_url: entry.profile.base_url.clone(),
            _permit: permit,
        })
    }

    /// Read the cached CSRF token for `(source, sub_endpoint)`.
    pub async fn cached_token(&self, source: SourceId, sub_endpoint: &str) -> Option<String> {
        let entry = self.entries.get(&source)?;
        entry.csrf.read().await.get(sub_endpoint).cloned()
    }

    /// Return the cached token, or run `warm` to fetch one and cache it.
    ///
    /// The warm-up is serialized per source: callers that lose the race
    /// wait for the winner's fetch and reuse its result, so a cold
    /// sub-endpoint sees exactly one landing-page fetch.
    pub async fn token_or_warm<F, Fut>(
        &self,
        source: SourceId,
        sub_endpoint: &str,
        warm: F,
    ) -> Result<String>
    where
        F: FnOnce(Session) -> Fut,
        Fut: std::future::Future<Output = Result<String>>,
    {
        if let Some(token) = self.cached_token(source, sub_endpoint).await {
            return Ok(token);
        }

        let entry = Arc::clone(self.entry(source)?);
        let _serialize = entry.warmup.lock().await;

        // Double-check: another caller may have warmed while we waited.
        if let Some(token) = entry.csrf.read().await.get(sub_endpoint).cloned() {
            tracing::debug!(%source, sub_endpoint, "csrf warmed by concurrent caller");
            return Ok(token);
        }

        tracing::info!(%source, sub_endpoint, "warming session");
        let session = self.borrow(source).await?;
        let token = warm(session).await?;
        entry
            .csrf
            .write()
            .await
            .insert(sub_endpoint.to_string(), token.clone());
        Ok(token)
    }

    /// Drop the cached token after a backend auth/CSRF rejection; the next
    /// use re-warms. The caller retries the original request at most once.
    pub async fn invalidate_token(&self, source: SourceId, sub_endpoint: &str) {
        if let Some(entry) = self.entries.get(&source) {
            if entry.csrf.write().await.remove(sub_endpoint).is_some() {
                tracing::warn!(%source, sub_endpoint, "csrf token invalidated");
            }
        }
    }

    /// Seed the backend's cookie jar (used to hand browser-acquired
    /// cookies to plain HTTP fetches).
    pub fn seed_cookie(&self, source: SourceId, url: &Url, cookie: &str) -> Result<()> {
        let entry = self.entry(source)?;
        entry.jar.add_cookie_str(cookie, url);
        Ok(())
    }

    /// Close all permits so further borrows fail fast. Idempotent.
    pub fn shutdown(&self) {
        for entry in self.entries.values() {
            entry.permits.close();
        }
        tracing::info!("session pool closed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicU32;

    fn pool_for(source: SourceId, base: &'static str) -> SessionPool {
        SessionPool::new(
            vec![SourceProfile::plain(source, base)],
            &GatewayConfig::default(),
        )
    }

    #[tokio::test]
    async fn borrow_returns_independent_sessions() {
        let pool = pool_for(SourceId::Yargitay, "https://example.invalid");
        let a = pool.borrow(SourceId::Yargitay).await.unwrap();
        let b = pool.borrow(SourceId::Yargitay).await.unwrap();
        assert_eq!(a.url("/x"), "https://example.invalid/x");
        assert_eq!(b.url("https://other.invalid/y"), "https://other.invalid/y");
    }

    #[tokio::test]
    async fn unknown_source_is_not_found() {
        let pool = pool_for(SourceId::Yargitay, "https://example.invalid");
        let err = pool.borrow(SourceId::Kvkk).await.unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn concurrent_cold_warmup_fetches_once() {
        let pool = pool_for(SourceId::Sayistay, "https://example.invalid");
        let fetches = Arc::new(AtomicU32::new(0));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let pool = pool.clone();
            let fetches = Arc::clone(&fetches);
            handles.push(tokio::spawn(async move {
                pool.token_or_warm(SourceId::Sayistay, "genel_kurul", |_session| {
                    let fetches = Arc::clone(&fetches);
                    async move {
                        fetches.fetch_add(1, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(20)).await;
                        Ok("tok-1".to_string())
                    }
                })
                .await
            }));
        }

        for handle in handles {
            assert_eq!(handle.await.unwrap().unwrap(), "tok-1");
        }
        assert_eq!(fetches.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn invalidation_forces_rewarm() {
        let pool = pool_for(SourceId::Sayistay, "https://example.invalid");
        let token = pool
            .token_or_warm(SourceId::Sayistay, "daire", |_s| async {
                Ok("first".to_string())
            })
            .await
            .unwrap();
        assert_eq!(token, "first");

        pool.invalidate_token(SourceId::Sayistay, "daire").await;
        assert!(pool.cached_token(SourceId::Sayistay, "daire").await.is_none());

        let token = pool
            .token_or_warm(SourceId::Sayistay, "daire", |_s| async {
                Ok("second".to_string())
            })
            .await
            .unwrap();
        assert_eq!(token, "second");
    }

    #[tokio::test]
    async fn tokens_are_keyed_by_sub_endpoint() {
        let pool = pool_for(SourceId::Sayistay, "https://example.invalid");
        for sub in ["genel_kurul", "temyiz_kurulu", "daire"] {
            let sub_owned = sub.to_string();
            let token = pool
                .token_or_warm(SourceId::Sayistay, sub, move |_s| async move {
                    Ok(format!("tok-{sub_owned}"))
                })
                .await
                .unwrap();
            assert_eq!(token, format!("tok-{sub}"));
        }
        assert_eq!(
            pool.cached_token(SourceId::Sayistay, "daire").await.as_deref(),
            Some("tok-daire")
        );
    }

    #[tokio::test]
    async fn shutdown_fails_further_borrows() {
        let pool = pool_for(SourceId::Yargitay, "https://example.invalid");
        pool.shutdown();
        pool.shutdown(); // idempotent
        let err = pool.borrow(SourceId::Yargitay).await.unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::ResourceExhausted);
    }
}
