//! BDDK (banking regulation authority) adapter.
//!
//! The regulator has no search API of its own, so discovery goes through
//! the Tavily web-search API constrained to `site:bddk.org.tr`. Documents
//! are addressed by the numeric id embedded in the regulator's URLs and
//! served from one of three path families; the first 2xx whose body yields
//! real content wins.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use serde_json::json;

use crate::error::{Error, Result};
use crate::health::HealthSample;
use crate::normalize::{ConverterProfile, Normalizer};
use crate::session::{SessionPool, SourceProfile, TlsPolicy};
use crate::types::{ContainerKind, DocumentHandle, NormalizedDocument, SearchEntry, SearchPage, SourceId};

use super::{Adapter, check_offset, classify_status, elapsed_ms, expect_source, paginate};

const TAVILY_API_URL: &str = "https://api.tavily.com/search";

/// Document path families tried in order when fetching by id.
const DOCUMENT_PATTERNS: [&str; 3] = [
    "/Mevzuat/DokumanGetir/{id}",
    "/KurumHakkinda/EkGetir/13?ekId={id}",
    "/Mevzuat/Liste/{id}",
];

/// A 2xx body converting to fewer Markdown characters than this is
/// treated as an error page and the next pattern is tried.
const MIN_DOCUMENT_CHARS: u64 = 100;

static DOCUMENT_ID_PATTERNS: Lazy<[Regex; 3]> = Lazy::new(compile_id_patterns);

#[allow(clippy::unwrap_used)] // literal patterns, cannot fail
fn compile_id_patterns() -> [Regex; 3] {
    [
        Regex::new(r"/DokumanGetir/(\d+)").unwrap(),
        Regex::new(r"/Liste/(\d+)").unwrap(),
        Regex::new(r"ekId=(\d+)").unwrap(),
    ]
}

/// Session profile for the regulator's own site (document retrieval).
pub fn profile() -> SourceProfile {
    SourceProfile {
        source: SourceId::Bddk,
        base_url: "https://www.bddk.org.tr".to_string(),
        referer: None,
        origin: None,
        extra_headers: &[],
        tls: TlsPolicy::Strict,
        default_timeout: Duration::from_secs(60),
        max_concurrency: 4,
    }
}

/// Typed search contract for the regulator.
#[derive(Debug, Clone, Default)]
pub struct BddkQuery {
    /// Turkish keywords; operators are forwarded to the search API.
    pub keywords: String,
    /// 1-indexed page.
    pub page_index: u32,
    /// Page size, 1..=100.
    pub page_size: u32,
}

impl BddkQuery {
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
struct TavilyHit {
    title: Option<String>,
    url: String,
}

#[derive(Debug, Deserialize)]
struct TavilyResponse {
    #[serde(default)]
    results: Vec<TavilyHit>,
}

/// Extract the regulator's numeric document id from one of its URL forms.
fn extract_document_id(url: &str) -> Option<String> {
    DOCUMENT_ID_PATTERNS
        .iter()
        .find_map(|re| re.captures(url).map(|c| c[1].to_string()))
}

/// Banking-regulator adapter: Tavily discovery + direct document fetch.
pub struct BddkAdapter {
    sessions: SessionPool,
    normalizer: Normalizer,
    api_key: String,
    search_api_url: String,
}

impl BddkAdapter {
    /// Build against a ready session pool and a Tavily credential.
    pub fn new(sessions: SessionPool, api_key: String) -> Self {
        Self {
            sessions,
            normalizer: Normalizer::new().with_profile(ConverterProfile::Plain),
            api_key,
            search_api_url: TAVILY_API_URL.to_string(),
        }
    }

    /// Point the adapter at a different search API root (test doubles).
    pub fn with_search_api_url(mut self, url: impl Into<String>) -> Self {
        self.search_api_url = url.into();
        self
    }

    /// Search regulator decisions through the web-search API.
    pub async fn search(&self, query: &BddkQuery) -> Result<SearchPage> {
        query.validate()?;

        let payload = json!({
            "query": format!("site:bddk.org.tr kurul kararı {}", query.keywords.trim()),
            "search_depth": "advanced",
            "max_results": query.page_size,
            "include_domains": ["bddk.org.tr"],
        });

        let session = self.sessions.borrow(SourceId::Bddk).await?;
        let response = session
            .client()
            .post(&self.search_api_url)
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(classify_status(status, &body));
        }

        let parsed: TavilyResponse = serde_json::from_str(&body).map_err(|e| {
            Error::backend(Some(status.as_u16()), &format!("unparseable search response: {e}"))
        })?;

        let entries: Vec<SearchEntry> = parsed
            .results
            .into_iter()
            .filter_map(|hit| {
                let id = extract_document_id(&hit.url)?;
                let handle = DocumentHandle::new(SourceId::Bddk, "", id);
                Some(
                    SearchEntry::with_assembled_title(&handle)
                        .display("baslik", hit.title)
                        .display("url", Some(hit.url))
                        .build(),
                )
            })
            .collect();

        Ok(SearchPage {
            source: SourceId::Bddk,
            subtype: String::new(),
            // Web search exposes no total for the underlying corpus.
            total_records: None,
            page_index: query.page_index,
            page_size: query.page_size,
            entries,
        })
    }
}

#[async_trait]
impl Adapter for BddkAdapter {
    fn source(&self) -> SourceId {
        SourceId::Bddk
    }

    async fn fetch(&self, handle: &DocumentHandle, chunk_index: u32) -> Result<NormalizedDocument> {
        expect_source(handle, SourceId::Bddk)?;

        let session = self.sessions.borrow(SourceId::Bddk).await?;
        let mut last_error: Option<Error> = None;

        for pattern in DOCUMENT_PATTERNS {
            let source_url = session.url(&pattern.replace("{id}", &handle.native_id));
            let response = match session.client().get(&source_url).send().await {
                Ok(r) => r,
                Err(e) => {
                    last_error = Some(e.into());
                    continue;
                },
            };
            let status = response.status();
            if !status.is_success() {
                last_error = Some(classify_status(status, ""));
                continue;
            }

            let bytes = response.bytes().await?;
            let container = if bytes.starts_with(b"%PDF") {
                ContainerKind::Pdf
            } else {
                ContainerKind::HtmlPage
            };
            let chunked = match self.normalizer.normalize(&bytes, container) {
                Ok(c) => c,
                Err(e) => {
                    last_error = Some(e);
                    continue;
                },
            };
            // Guard against 2xx error pages from the regulator.
            if chunked.full_char_count() < MIN_DOCUMENT_CHARS {
                tracing::warn!(%source_url, "document body too short, trying next URL pattern");
                last_error = Some(Error::backend(
                    Some(status.as_u16()),
                    "document body too short to be a decision",
                ));
                continue;
            }

            return Ok(paginate(handle, source_url, &chunked, chunk_index));
        }

        Err(last_error.unwrap_or_else(|| {
            Error::NotFound(format!("no document for id {}", handle.native_id))
        }))
    }

    async fn health(&self) -> HealthSample {
        let start = Instant::now();
        let query = BddkQuery {
            keywords: "kurul kararı".to_string(),
            page_index: 1,
            page_size: 1,
        };
        match self.search(&query).await {
            Ok(page) if !page.entries.is_empty() => {
                HealthSample::healthy(SourceId::Bddk, elapsed_ms(start))
            },
            Ok(_) => HealthSample::unhealthy(
                SourceId::Bddk,
                elapsed_ms(start),
                "search API returned no usable hits",
            ),
            Err(e) => HealthSample::unhealthy(SourceId::Bddk, elapsed_ms(start), e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GatewayConfig;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn adapter_for(server: &MockServer) -> BddkAdapter {
        let pool = SessionPool::new(
            vec![profile().rebased(server.uri())],
            &GatewayConfig::for_tests(),
        );
        BddkAdapter::new(pool, "test-tavily".to_string())
            .with_search_api_url(format!("{}/search", server.uri()))
    }

    #[test]
    fn document_id_extraction_patterns() {
        assert_eq!(
            extract_document_id("https://www.bddk.org.tr/Mevzuat/DokumanGetir/310").as_deref(),
            Some("310")
        );
        assert_eq!(
            extract_document_id("https://www.bddk.org.tr/Mevzuat/Liste/55").as_deref(),
            Some("55")
        );
        assert_eq!(
            extract_document_id("https://www.bddk.org.tr/KurumHakkinda/EkGetir/13?ekId=381").as_deref(),
            Some("381")
        );
        assert!(extract_document_id("https://www.bddk.org.tr/hakkinda").is_none());
    }

    #[tokio::test]
    async fn search_constrains_to_domain_and_maps_hits() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/search"))
            .and(header("authorization", "Bearer test-tavily"))
            .and(body_partial_json(json!({
                "include_domains": ["bddk.org.tr"]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "results": [
                    {
                        "title": "Kurul Kararı 10537",
                        "url": "https://www.bddk.org.tr/Mevzuat/DokumanGetir/310",
                        "content": "…",
                        "score": 0.92
                    },
                    {
                        "title": "Hakkımızda",
                        "url": "https://www.bddk.org.tr/hakkinda",
                        "content": "…",
                        "score": 0.11
                    }
                ]
            })))
            .mount(&server)
            .await;

        let adapter = adapter_for(&server).await;
        let page = adapter
            .search(&BddkQuery {
                keywords: "faiz oranı".to_string(),
                page_index: 1,
                page_size: 10,
            })
            .await
            .unwrap();

        // The hit without an extractable id is dropped.
        assert_eq!(page.entries.len(), 1);
        let handle = DocumentHandle::parse(&page.entries[0].handle).unwrap();
        assert_eq!(handle.native_id, "310");
        assert_eq!(page.total_records, None);
    }

    #[tokio::test]
    async fn fetch_falls_through_url_patterns() {
        let server = MockServer::start().await;
        // First pattern 404s, second serves a short error page, third wins.
        Mock::given(method("GET"))
            .and(path("/Mevzuat/DokumanGetir/310"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/KurumHakkinda/EkGetir/13"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>hata</html>"))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/Mevzuat/Liste/310"))
            .respond_with(ResponseTemplate::new(200).set_body_string(format!(
                "<html><body><p>{}</p></body></html>",
                "Kurul kararı gerekçesi ".repeat(20)
            )))
            .mount(&server)
            .await;

        let adapter = adapter_for(&server).await;
        let handle = DocumentHandle::new(SourceId::Bddk, "", "310");
        let doc = adapter.fetch(&handle, 1).await.unwrap();
        assert!(doc.source_url.ends_with("/Mevzuat/Liste/310"));
        assert!(doc.chunk_text.contains("Kurul kararı"));
    }

    #[tokio::test]
    async fn all_patterns_failing_surfaces_last_error() {
        let server = MockServer::start().await;
        for p in ["/Mevzuat/DokumanGetir/9", "/Mevzuat/Liste/9"] {
            Mock::given(method("GET"))
                .and(path(p))
                .respond_with(ResponseTemplate::new(404))
                .mount(&server)
                .await;
        }
        Mock::given(method("GET"))
            .and(path("/KurumHakkinda/EkGetir/13"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let adapter = adapter_for(&server).await;
        let handle = DocumentHandle::new(SourceId::Bddk, "", "9");
        let err = adapter.fetch(&handle, 1).await.unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn empty_keywords_rejected_locally() {
        let server = MockServer::start().await;
        let adapter = adapter_for(&server).await;
        let err = adapter
            .search(&BddkQuery {
                keywords: "  ".to_string(),
                page_index: 1,
                page_size: 10,
            })
            .await
            .unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::InvalidArgument);
        assert!(server.received_requests().await.unwrap().is_empty());
    }
}
