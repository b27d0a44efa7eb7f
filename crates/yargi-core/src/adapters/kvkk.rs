//! KVKK (personal data protection authority) adapter.
//!
//! Decision summaries are published as plain pages under
//! `kvkk.gov.tr/Icerik/...`; discovery goes through the Brave Search API
//! with a `site:` restriction and the board's own `"karar özeti"` marker
//! phrase. Documents are the pages themselves, chunked like every other
//! source.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::Deserialize;
use url::Url;

use crate::error::{Error, Result};
use crate::health::HealthSample;
use crate::normalize::{ConverterProfile, Normalizer};
use crate::session::{SessionPool, SourceProfile, TlsPolicy};
use crate::types::{DocumentHandle, NormalizedDocument, SearchEntry, SearchPage, SourceId};

use super::{Adapter, check_offset, classify_status, elapsed_ms, expect_source, paginate};

const BRAVE_API_URL: &str = "https://api.search.brave.com/res/v1/web/search";

/// Session profile for the authority's site (document retrieval).
pub fn profile() -> SourceProfile {
    SourceProfile {
        source: SourceId::Kvkk,
        base_url: "https://www.kvkk.gov.tr".to_string(),
        referer: None,
        origin: None,
        extra_headers: &[],
        tls: TlsPolicy::Strict,
        default_timeout: Duration::from_secs(60),
        max_concurrency: 4,
    }
}

/// Typed search contract for the authority.
#[derive(Debug, Clone, Default)]
pub struct KvkkQuery {
    /// Turkish keywords appended to the site-restricted query.
    pub keywords: String,
    /// 1-indexed page.
    pub page_index: u32,
    /// Page size, 1..=100 (the search API caps at 20 per request).
    pub page_size: u32,
}

impl KvkkQuery {
    /// Validate before any network call.
    pub fn validate(&self) -> Result<()> {
        check_offset(self.page_index, self.page_size, 1_000)?;
        if self.keywords.trim().is_empty() {
            return Err(Error::invalid_argument(
                "keywords",
                "the web-search adapter requires non-empty keywords",
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
struct BraveHit {
    title: Option<String>,
    url: String,
    #[serde(default)]
    description: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct BraveWeb {
    #[serde(default)]
    results: Vec<BraveHit>,
}

#[derive(Debug, Deserialize)]
struct BraveResponse {
    #[serde(default)]
    web: Option<BraveWeb>,
}

/// `https://www.kvkk.gov.tr/Icerik/7288/2021-1303` → `Icerik/7288/2021-1303`.
fn decision_path(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    let mut segments = parsed.path_segments()?;
    let first = segments.next()?;
    if first != "Icerik" {
        return None;
    }
    let rest: Vec<&str> = segments.filter(|s| !s.is_empty()).collect();
    if rest.is_empty() {
        return None;
    }
    Some(format!("Icerik/{}", rest.join("/")))
}

/// Data-protection-authority adapter: Brave discovery + page fetch.
pub struct KvkkAdapter {
    sessions: SessionPool,
    normalizer: Normalizer,
    api_token: String,
    search_api_url: String,
}

impl KvkkAdapter {
    /// Build against a ready session pool and a Brave credential.
    pub fn new(sessions: SessionPool, api_token: String) -> Self {
        Self {
            sessions,
            normalizer: Normalizer::new().with_profile(ConverterProfile::Plain),
            api_token,
            search_api_url: BRAVE_API_URL.to_string(),
        }
    }

    /// Point the adapter at a different search API root (test doubles).
    pub fn with_search_api_url(mut self, url: impl Into<String>) -> Self {
        self.search_api_url = url.into();
        self
    }

    /// Search board decisions through the web-search API.
    pub async fn search(&self, query: &KvkkQuery) -> Result<SearchPage> {
        query.validate()?;

        let q = format!("site:kvkk.gov.tr \"karar özeti\" {}", query.keywords.trim());
        let count = query.page_size.min(20);
        let offset = (query.page_index - 1) * count;

        let session = self.sessions.borrow(SourceId::Kvkk).await?;
        let response = session
            .client()
            .get(&self.search_api_url)
            .header("x-subscription-token", &self.api_token)
            .header("accept", "application/json")
            .query(&[
                ("q", q.as_str()),
                ("count", &count.to_string()),
                ("offset", &offset.to_string()),
                ("country", "TR"),
                ("search_lang", "tr"),
            ])
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(classify_status(status, &body));
        }

        let parsed: BraveResponse = serde_json::from_str(&body).map_err(|e| {
            Error::backend(Some(status.as_u16()), &format!("unparseable search response: {e}"))
        })?;

        let entries: Vec<SearchEntry> = parsed
            .web
            .unwrap_or_default()
            .results
            .into_iter()
            .filter_map(|hit| {
                let path = decision_path(&hit.url)?;
                let handle = DocumentHandle::new(SourceId::Kvkk, "", path);
                Some(
                    SearchEntry::with_assembled_title(&handle)
                        .display("baslik", hit.title)
                        .display("ozet", hit.description)
                        .display("url", Some(hit.url))
                        .build(),
                )
            })
            .collect();

        Ok(SearchPage {
            source: SourceId::Kvkk,
            subtype: String::new(),
            // Brave's estimated totals are not stable across pages.
            total_records: None,
            page_index: query.page_index,
            page_size: query.page_size,
            entries,
        })
    }
}

#[async_trait]
impl Adapter for KvkkAdapter {
    fn source(&self) -> SourceId {
        SourceId::Kvkk
    }

    async fn fetch(&self, handle: &DocumentHandle, chunk_index: u32) -> Result<NormalizedDocument> {
        expect_source(handle, SourceId::Kvkk)?;

        let session = self.sessions.borrow(SourceId::Kvkk).await?;
        let source_url = session.url(&format!("/{}", handle.native_id));
        let response = session.client().get(&source_url).send().await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(classify_status(status, &body));
        }
        if body.trim().is_empty() {
            return Err(Error::NotFound(format!("empty document at {source_url}")));
        }

        let chunked = self
            .normalizer
            .normalize(body.as_bytes(), crate::types::ContainerKind::HtmlPage)?;
        Ok(paginate(handle, source_url, &chunked, chunk_index))
    }

    async fn health(&self) -> HealthSample {
        let start = Instant::now();
        let query = KvkkQuery {
            keywords: "veri ihlali".to_string(),
            page_index: 1,
            page_size: 1,
        };
        match self.search(&query).await {
            Ok(page) if !page.entries.is_empty() => {
                HealthSample::healthy(SourceId::Kvkk, elapsed_ms(start))
            },
            Ok(_) => HealthSample::unhealthy(
                SourceId::Kvkk,
                elapsed_ms(start),
                "search API returned no usable hits",
            ),
            Err(e) => HealthSample::unhealthy(SourceId::Kvkk, elapsed_ms(start), e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GatewayConfig;
    use serde_json::json;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn adapter_for(server: &MockServer) -> KvkkAdapter {
        let pool = SessionPool::new(
            vec![profile().rebased(server.uri())],
            &GatewayConfig::for_tests(),
        );
        KvkkAdapter::new(pool, "test-brave".to_string())
            .with_search_api_url(format!("{}/res/v1/web/search", server.uri()))
    }

    #[test]
    fn decision_path_extraction() {
        assert_eq!(
            decision_path("https://www.kvkk.gov.tr/Icerik/7288/2021-1303").as_deref(),
            Some("Icerik/7288/2021-1303")
        );
        assert!(decision_path("https://www.kvkk.gov.tr/hakkimizda").is_none());
        assert!(decision_path("not a url").is_none());
    }

    #[tokio::test]
    async fn search_sends_site_restricted_query() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/res/v1/web/search"))
            .and(header("x-subscription-token", "test-brave"))
            .and(query_param(
                "q",
                "site:kvkk.gov.tr \"karar özeti\" ifade özgürlüğü",
            ))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "web": {
                    "results": [
                        {
                            "title": "Karar Özeti 2021/1303",
                            "url": "https://www.kvkk.gov.tr/Icerik/7288/2021-1303",
                            "description": "İfade özgürlüğü hakkında karar özeti"
                        },
                        {
                            "title": "Kurum ana sayfası",
                            "url": "https://www.kvkk.gov.tr/",
                            "description": "…"
                        }
                    ]
                }
            })))
            .mount(&server)
            .await;

        let adapter = adapter_for(&server).await;
        let page = adapter
            .search(&KvkkQuery {
                keywords: "ifade özgürlüğü".to_string(),
                page_index: 1,
                page_size: 10,
            })
            .await
            .unwrap();

        assert_eq!(page.entries.len(), 1);
        let handle = DocumentHandle::parse(&page.entries[0].handle).unwrap();
        assert_eq!(handle.native_id, "Icerik/7288/2021-1303");
    }

    #[tokio::test]
    async fn pagination_maps_to_offset() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/res/v1/web/search"))
            .and(query_param("count", "10"))
            .and(query_param("offset", "20"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "web": { "results": [] } })))
            .mount(&server)
            .await;

        let adapter = adapter_for(&server).await;
        let page = adapter
            .search(&KvkkQuery {
                keywords: "aydınlatma yükümlülüğü".to_string(),
                page_index: 3,
                page_size: 10,
            })
            .await
            .unwrap();
        assert!(page.entries.is_empty());
    }

    #[tokio::test]
    async fn fetch_normalizes_decision_page() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/Icerik/7288/2021-1303"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                "<html><body><h1>Karar Özeti</h1><p>Veri sorumlusu hakkında</p></body></html>",
            ))
            .mount(&server)
            .await;

        let adapter = adapter_for(&server).await;
        let handle = DocumentHandle::new(SourceId::Kvkk, "", "Icerik/7288/2021-1303");
        let doc = adapter.fetch(&handle, 1).await.unwrap();
        assert!(doc.chunk_text.contains("Veri sorumlusu"));
        assert!(doc.source_url.contains("/Icerik/7288/2021-1303"));
    }

    #[tokio::test]
    async fn rate_limited_search_is_access_denied() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/res/v1/web/search"))
            .respond_with(ResponseTemplate::new(429))
            .mount(&server)
            .await;

        let adapter = adapter_for(&server).await;
        let err = adapter
            .search(&KvkkQuery {
                keywords: "ceza".to_string(),
                page_index: 1,
                page_size: 10,
            })
            .await
            .unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::AccessDenied);
    }
}
