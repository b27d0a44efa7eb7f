//! Danıştay (council of state) adapter.
//!
//! Same JSON family as Yargıtay, with two search modes: a keyword search
//! taking AND/OR/NOT keyword lists, and a detailed search over chamber,
//! case-number and legislation filters. Both nest the filter object under
//! a `data` key.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

use crate::chambers::{ChamberCode, Court};
use crate::error::{Error, Result};
use crate::health::HealthSample;
use crate::normalize::{ConverterProfile, Normalizer};
use crate::session::{SessionPool, SourceProfile, TlsPolicy};
use crate::types::{DocumentHandle, NormalizedDocument, SearchEntry, SearchPage, SourceId, dates};

use super::{Adapter, check_offset, classify_status, elapsed_ms, expect_source, paginate};

const KEYWORD_SEARCH_ENDPOINT: &str = "/aramalist";
const DETAILED_SEARCH_ENDPOINT: &str = "/aramadetaylist";
const DOCUMENT_ENDPOINT: &str = "/getDokuman";

const MAX_OFFSET: u64 = 10_000;

/// Session profile; the AJAX headers mirror the site's own frontend.
pub fn profile() -> SourceProfile {
    SourceProfile {
        source: SourceId::Danistay,
        base_url: "https://karararamadanistay.danistay.gov.tr".to_string(),
        referer: Some("https://karararamadanistay.danistay.gov.tr/".to_string()),
        origin: None,
        extra_headers: &[
            ("x-requested-with", "XMLHttpRequest"),
            ("accept", "application/json, text/plain, */*"),
        ],
        tls: TlsPolicy::InsecureLegacy,
        default_timeout: Duration::from_secs(60),
        max_concurrency: 8,
    }
}

/// Keyword-mode query: lists are combined by the backend itself.
#[derive(Debug, Clone, Default)]
pub struct DanistayKeywordQuery {
    /// Keywords all of which must appear.
    pub and_keywords: Vec<String>,
    /// Keywords any of which may appear.
    pub or_keywords: Vec<String>,
    /// Excluded keywords (conjunctive).
    pub not_and_keywords: Vec<String>,
    /// Excluded keywords (disjunctive).
    pub not_or_keywords: Vec<String>,
    /// 1-indexed page.
    pub page_index: u32,
    /// Page size, 1..=100.
    pub page_size: u32,
}

impl DanistayKeywordQuery {
    /// Validate before any network call.
    pub fn validate(&self) -> Result<()> {
        check_offset(self.page_index, self.page_size, MAX_OFFSET)?;
        if self.and_keywords.is_empty()
            && self.or_keywords.is_empty()
            && self.not_and_keywords.is_empty()
            && self.not_or_keywords.is_empty()
        {
            return Err(Error::invalid_argument(
                "and_keywords",
                "at least one keyword list must be non-empty",
            ));
        }
        Ok(())
    }
}

/// Detailed-mode query over structured filters.
#[derive(Debug, Clone, Default)]
pub struct DanistayDetailedQuery {
    /// Chamber filter; must be a Danıştay chamber or `All`.
    pub chamber: ChamberCode,
    /// Case-number year (`esasYil`).
    pub case_year: Option<String>,
    /// First case sequence number.
    pub case_no_start: Option<String>,
    /// Last case sequence number.
    pub case_no_end: Option<String>,
    /// Decision-number year (`kararYil`).
    pub decision_year: Option<String>,
    /// First decision sequence number.
    pub decision_no_start: Option<String>,
    /// Last decision sequence number.
    pub decision_no_end: Option<String>,
    /// Inclusive start date, ISO `YYYY-MM-DD`.
    pub start_date: Option<String>,
    /// Inclusive end date, ISO `YYYY-MM-DD`.
    pub end_date: Option<String>,
    /// Legislation number filter.
    pub legislation_number: Option<String>,
    /// Legislation name filter.
    pub legislation_name: Option<String>,
    /// Legislation article filter.
    pub article: Option<String>,
    /// 1-indexed page.
    pub page_index: u32,
    /// Page size, 1..=100.
    pub page_size: u32,
}

impl DanistayDetailedQuery {
    /// Validate before any network call.
    pub fn validate(&self) -> Result<()> {
        check_offset(self.page_index, self.page_size, MAX_OFFSET)?;
        if let Some(c) = self.chamber.court() {
            if c != Court::Danistay {
                return Err(Error::invalid_argument(
                    "chamber",
                    format!("{:?} is not a Danıştay chamber", self.chamber),
                ));
            }
        }
        let any_filter = self.chamber != ChamberCode::All
            || self.case_year.is_some()
            || self.decision_year.is_some()
            || self.start_date.is_some()
            || self.end_date.is_some()
            || self.legislation_number.is_some()
            || self.legislation_name.is_some()
            || self.article.is_some();
        if !any_filter {
            return Err(Error::invalid_argument(
                "chamber",
                "detailed search requires at least one structured filter",
            ));
        }
        for (field, value) in [("start_date", &self.start_date), ("end_date", &self.end_date)] {
            if let Some(v) = value {
                dates::validate_iso(field, v)?;
            }
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
struct WireEntry {
    id: String,
    #[serde(default)]
    daire: Option<String>,
    #[serde(default, rename = "esasNo")]
    esas_no: Option<String>,
    #[serde(default, rename = "kararNo")]
    karar_no: Option<String>,
    #[serde(default, rename = "kararTarihi")]
    karar_tarihi: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct WireInner {
    #[serde(default)]
    data: Vec<WireEntry>,
    #[serde(default, rename = "recordsTotal")]
    records_total: u64,
}

#[derive(Debug, Deserialize)]
struct WireSearchResponse {
    #[serde(default)]
    data: Option<WireInner>,
}

#[derive(Debug, Deserialize)]
struct WireDocumentResponse {
    #[serde(default)]
    data: Option<String>,
}

/// Danıştay adapter over the shared session pool.
pub struct DanistayAdapter {
    sessions: SessionPool,
    normalizer: Normalizer,
}

impl DanistayAdapter {
    /// Build against a ready session pool.
    pub fn new(sessions: SessionPool) -> Self {
        Self {
            sessions,
            normalizer: Normalizer::new().with_profile(ConverterProfile::TableAware),
        }
    }

    /// Keyword-mode search.
    pub async fn search_keyword(&self, query: &DanistayKeywordQuery) -> Result<SearchPage> {
        query.validate()?;
        let payload = json!({
            "data": {
                "andKelimeler": query.and_keywords,
                "orKelimeler": query.or_keywords,
                "notAndKelimeler": query.not_and_keywords,
                "notOrKelimeler": query.not_or_keywords,
                "pageSize": query.page_size,
                "pageNumber": query.page_index,
            }
        });
        self.execute_search(KEYWORD_SEARCH_ENDPOINT, payload, query.page_index, query.page_size)
            .await
    }

    /// Detailed-mode search.
    pub async fn search_detailed(&self, query: &DanistayDetailedQuery) -> Result<SearchPage> {
        query.validate()?;
        let payload = json!({
            "data": {
                "daire": query.chamber.native_or_empty(),
                "esasYil": query.case_year.clone().unwrap_or_default(),
                "esasIlkSiraNo": query.case_no_start.clone().unwrap_or_default(),
                "esasSonSiraNo": query.case_no_end.clone().unwrap_or_default(),
                "kararYil": query.decision_year.clone().unwrap_or_default(),
                "kararIlkSiraNo": query.decision_no_start.clone().unwrap_or_default(),
                "kararSonSiraNo": query.decision_no_end.clone().unwrap_or_default(),
                "baslangicTarihi": query.start_date.as_deref().map(dates::to_dotted).unwrap_or_default(),
                "bitisTarihi": query.end_date.as_deref().map(dates::to_dotted).unwrap_or_default(),
                "mevzuatNumarasi": query.legislation_number.clone().unwrap_or_default(),
                "mevzuatAdi": query.legislation_name.clone().unwrap_or_default(),
                "madde": query.article.clone().unwrap_or_default(),
                "pageSize": query.page_size,
                "pageNumber": query.page_index,
            }
        });
        self.execute_search(DETAILED_SEARCH_ENDPOINT, payload, query.page_index, query.page_size)
            .await
    }

    async fn execute_search(
        &self,
        endpoint: &str,
        payload: serde_json::Value,
        page_index: u32,
        page_size: u32,
    ) -> Result<SearchPage> {
        let session = self.sessions.borrow(SourceId::Danistay).await?;
        let response = session
            .client()
            .post(session.url(endpoint))
            .json(&payload)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(classify_status(status, &body));
        }

        let parsed: WireSearchResponse = serde_json::from_str(&body).map_err(|e| {
            Error::backend(Some(status.as_u16()), &format!("unparseable search response: {e}"))
        })?;
        let inner = parsed.data.unwrap_or_default();

        let entries = inner
            .data
            .into_iter()
            .map(|e| {
                let handle = DocumentHandle::new(SourceId::Danistay, "", e.id);
                SearchEntry::with_assembled_title(&handle)
                    .chamber(e.daire)
                    .case_number(e.esas_no)
                    .decision_number(e.karar_no)
                    .decision_date(e.karar_tarihi)
                    .build()
            })
            .collect();

        Ok(SearchPage {
            source: SourceId::Danistay,
            subtype: String::new(),
            total_records: Some(inner.records_total),
            page_index,
            page_size,
            entries,
        })
    }
}

#[async_trait]
impl Adapter for DanistayAdapter {
    fn source(&self) -> SourceId {
        SourceId::Danistay
    }

    async fn fetch(&self, handle: &DocumentHandle, chunk_index: u32) -> Result<NormalizedDocument> {
        expect_source(handle, SourceId::Danistay)?;

        let session = self.sessions.borrow(SourceId::Danistay).await?;
        let source_url = session.url(&format!("{DOCUMENT_ENDPOINT}?id={}", handle.native_id));
        let response = session.client().get(&source_url).send().await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(classify_status(status, &body));
        }

        let parsed: WireDocumentResponse = serde_json::from_str(&body).map_err(|e| {
            Error::backend(Some(status.as_u16()), &format!("unparseable document envelope: {e}"))
        })?;
        let html = parsed.data.ok_or_else(|| {
            Error::backend(Some(status.as_u16()), "document envelope has no `data` field")
        })?;

        let chunked = self
            .normalizer
            .normalize(html.as_bytes(), crate::types::ContainerKind::HtmlPage)?;
        Ok(paginate(handle, source_url, &chunked, chunk_index))
    }

    async fn health(&self) -> HealthSample {
        let start = Instant::now();
        let query = DanistayKeywordQuery {
            and_keywords: vec!["karar".to_string()],
            page_index: 1,
            page_size: 1,
            ..Default::default()
        };
        match self.search_keyword(&query).await {
            Ok(page) if page.total_records.unwrap_or(0) > 0 => {
                HealthSample::healthy(SourceId::Danistay, elapsed_ms(start))
            },
            Ok(_) => HealthSample::unhealthy(
                SourceId::Danistay,
                elapsed_ms(start),
                "trivial query returned zero records",
            ),
            Err(e) => HealthSample::unhealthy(SourceId::Danistay, elapsed_ms(start), e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GatewayConfig;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn adapter_for(server: &MockServer) -> DanistayAdapter {
        let pool = SessionPool::new(
            vec![profile().rebased(server.uri())],
            &GatewayConfig::for_tests(),
        );
        DanistayAdapter::new(pool)
    }

    fn response_body() -> serde_json::Value {
        json!({
            "data": {
                "data": [
                    {
                        "id": "d-777",
                        "daire": "5. Daire",
                        "esasNo": "2022/9",
                        "kararNo": "2023/41",
                        "kararTarihi": "05.06.2023"
                    }
                ],
                "recordsTotal": 12,
                "recordsFiltered": 12,
                "draw": 1
            }
        })
    }

    #[tokio::test]
    async fn keyword_search_posts_lists() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/aramalist"))
            .and(body_partial_json(json!({
                "data": {
                    "andKelimeler": ["imar", "planı"],
                    "notAndKelimeler": ["vergi"]
                }
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(response_body()))
            .mount(&server)
            .await;

        let adapter = adapter_for(&server).await;
        let page = adapter
            .search_keyword(&DanistayKeywordQuery {
                and_keywords: vec!["imar".to_string(), "planı".to_string()],
                not_and_keywords: vec!["vergi".to_string()],
                page_index: 1,
                page_size: 10,
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(page.total_records, Some(12));
        assert_eq!(page.entries[0].chamber.as_deref(), Some("5. Daire"));
    }

    #[tokio::test]
    async fn detailed_search_uses_chamber_mapping() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/aramadetaylist"))
            .and(body_partial_json(json!({
                "data": { "daire": "13. Daire", "mevzuatNumarasi": "2577" }
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(response_body()))
            .mount(&server)
            .await;

        let adapter = adapter_for(&server).await;
        let page = adapter
            .search_detailed(&DanistayDetailedQuery {
                chamber: ChamberCode::D13,
                legislation_number: Some("2577".to_string()),
                page_index: 1,
                page_size: 10,
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(page.entries.len(), 1);
    }

    #[tokio::test]
    async fn keyword_query_requires_some_list() {
        let server = MockServer::start().await;
        let adapter = adapter_for(&server).await;
        let err = adapter
            .search_keyword(&DanistayKeywordQuery {
                page_index: 1,
                page_size: 10,
                ..Default::default()
            })
            .await
            .unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::InvalidArgument);
        assert!(server.received_requests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn detailed_rejects_yargitay_chamber() {
        let server = MockServer::start().await;
        let adapter = adapter_for(&server).await;
        let err = adapter
            .search_detailed(&DanistayDetailedQuery {
                chamber: ChamberCode::H3,
                page_index: 1,
                page_size: 10,
                ..Default::default()
            })
            .await
            .unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::InvalidArgument);
    }
}
