//! Yargıtay (supreme court) adapter.
//!
//! JSON-over-HTTP against the official decision search. The search endpoint
//! expects the filter object nested under a `data` key with exact key
//! casing; documents come back as `{"data": "<html>"}` from `/getDokuman`.

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

const SEARCH_ENDPOINT: &str = "/aramadetaylist";
const DOCUMENT_ENDPOINT: &str = "/getDokuman";

/// Deepest record the backend will page to.
const MAX_OFFSET: u64 = 10_000;

/// Session profile: relaxed TLS (the server's chain does not verify) and
/// the AJAX headers the endpoint checks.
pub fn profile() -> SourceProfile {
    SourceProfile {
        source: SourceId::Yargitay,
        base_url: "https://karararama.yargitay.gov.tr".to_string(),
        referer: Some("https://karararama.yargitay.gov.tr/".to_string()),
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

/// Typed search contract for Yargıtay.
#[derive(Debug, Clone, Default)]
pub struct YargitayQuery {
    /// Free-text phrase; `+term -term "exact" AND/OR/NOT` forwarded verbatim.
    pub phrase: String,
    /// Chamber filter from the closed set; `All` sends the backend's `ALL`.
    pub chamber: ChamberCode,
    /// Case-number year filter (`esasYil`).
    pub case_year: Option<String>,
    /// First case sequence number of the range.
    pub case_no_start: Option<String>,
    /// Last case sequence number of the range.
    pub case_no_end: Option<String>,
    /// Decision-number year filter (`kararYil`).
    pub decision_year: Option<String>,
    /// First decision sequence number of the range.
    pub decision_no_start: Option<String>,
    /// Last decision sequence number of the range.
    pub decision_no_end: Option<String>,
    /// Inclusive start date, ISO `YYYY-MM-DD`.
    pub start_date: Option<String>,
    /// Inclusive end date, ISO `YYYY-MM-DD`.
    pub end_date: Option<String>,
    /// 1-indexed page.
    pub page_index: u32,
    /// Page size, 1..=100.
    pub page_size: u32,
}

impl YargitayQuery {
    fn has_structured_filter(&self) -> bool {
        self.chamber != ChamberCode::All
            || self.case_year.is_some()
            || self.decision_year.is_some()
            || self.start_date.is_some()
            || self.end_date.is_some()
    }

    /// Validate everything that can fail before a network call.
    pub fn validate(&self) -> Result<()> {
        check_offset(self.page_index, self.page_size, MAX_OFFSET)?;
        if self.phrase.trim().is_empty() && !self.has_structured_filter() {
            return Err(Error::invalid_argument(
                "phrase",
                "an empty phrase requires at least one structured filter",
            ));
        }
        if let Some(c) = self.chamber.court() {
            if c != Court::Yargitay {
                return Err(Error::invalid_argument(
                    "chamber",
                    format!("{:?} is not a Yargıtay chamber", self.chamber),
                ));
            }
        }
        for (field, value) in [("start_date", &self.start_date), ("end_date", &self.end_date)] {
            if let Some(v) = value {
                dates::validate_iso(field, v)?;
            }
        }
        Ok(())
    }

    fn chamber_value(&self) -> String {
        match self.chamber.native_name() {
            Some(name) => name.to_string(),
            None => "ALL".to_string(),
        }
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

/// Adapter over the session pool; construct once, share via `Arc`.
pub struct YargitayAdapter {
    sessions: SessionPool,
    normalizer: Normalizer,
}

impl YargitayAdapter {
    /// Build against a ready session pool.
    pub fn new(sessions: SessionPool) -> Self {
        Self {
            sessions,
            normalizer: Normalizer::new().with_profile(ConverterProfile::TableAware),
        }
    }

    /// Run a detailed search.
    pub async fn search(&self, query: &YargitayQuery) -> Result<SearchPage> {
        query.validate()?;

        let payload = json!({
            "data": {
                "arananKelime": query.phrase,
                "birimYrgKurulDaire": query.chamber_value(),
                "esasYil": query.case_year.clone().unwrap_or_default(),
                "esasIlkSiraNo": query.case_no_start.clone().unwrap_or_default(),
                "esasSonSiraNo": query.case_no_end.clone().unwrap_or_default(),
                "kararYil": query.decision_year.clone().unwrap_or_default(),
                "kararIlkSiraNo": query.decision_no_start.clone().unwrap_or_default(),
                "kararSonSiraNo": query.decision_no_end.clone().unwrap_or_default(),
                "baslangicTarihi": query.start_date.as_deref().map(dates::to_dotted).unwrap_or_default(),
                "bitisTarihi": query.end_date.as_deref().map(dates::to_dotted).unwrap_or_default(),
                "pageSize": query.page_size,
                "pageNumber": query.page_index,
            }
        });

        let session = self.sessions.borrow(SourceId::Yargitay).await?;
        tracing::debug!(page = query.page_index, "yargitay search");
        let response = session
            .client()
            .post(session.url(SEARCH_ENDPOINT))
            .json(&payload)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(classify_status(status, &body));
        }

        let parsed: WireSearchResponse =
            serde_json::from_str(&body).map_err(|e| Error::backend(Some(status.as_u16()), &format!("unparseable search response: {e}")))?;
        let inner = parsed.data.unwrap_or_default();

        let entries = inner
            .data
            .into_iter()
            .map(|e| {
                let handle = DocumentHandle::new(SourceId::Yargitay, "", e.id);
                SearchEntry::with_assembled_title(&handle)
                    .chamber(e.daire)
                    .case_number(e.esas_no)
                    .decision_number(e.karar_no)
                    .decision_date(e.karar_tarihi)
                    .build()
            })
            .collect();

        Ok(SearchPage {
            source: SourceId::Yargitay,
            subtype: String::new(),
            total_records: Some(inner.records_total),
            page_index: query.page_index,
            page_size: query.page_size,
            entries,
        })
    }
}

#[async_trait]
impl Adapter for YargitayAdapter {
    fn source(&self) -> SourceId {
        SourceId::Yargitay
    }

    async fn fetch(&self, handle: &DocumentHandle, chunk_index: u32) -> Result<NormalizedDocument> {
        expect_source(handle, SourceId::Yargitay)?;

        let session = self.sessions.borrow(SourceId::Yargitay).await?;
        let source_url = session.url(&format!("{DOCUMENT_ENDPOINT}?id={}", handle.native_id));
        let response = session.client().get(&source_url).send().await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(classify_status(status, &body));
        }

        let parsed: WireDocumentResponse = serde_json::from_str(&body)
            .map_err(|e| Error::backend(Some(status.as_u16()), &format!("unparseable document envelope: {e}")))?;
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
        let query = YargitayQuery {
            phrase: "karar".to_string(),
            page_index: 1,
            page_size: 1,
            ..Default::default()
        };
        match self.search(&query).await {
            Ok(page) if page.total_records.unwrap_or(0) > 0 => {
                HealthSample::healthy(SourceId::Yargitay, elapsed_ms(start))
            },
            Ok(_) => HealthSample::unhealthy(
                SourceId::Yargitay,
                elapsed_ms(start),
                "trivial query returned zero records",
            ),
            Err(e) => HealthSample::unhealthy(SourceId::Yargitay, elapsed_ms(start), e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GatewayConfig;
    use wiremock::matchers::{body_partial_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn adapter_for(server: &MockServer) -> YargitayAdapter {
        let pool = SessionPool::new(
            vec![profile().rebased(server.uri())],
            &GatewayConfig::for_tests(),
        );
        YargitayAdapter::new(pool)
    }

    fn search_body() -> serde_json::Value {
        json!({
            "data": {
                "data": [
                    {
                        "id": "123456",
                        "daire": "1. Hukuk Dairesi",
                        "esasNo": "2023/100",
                        "kararNo": "2024/55",
                        "kararTarihi": "12.03.2024"
                    }
                ],
                "recordsTotal": 4321,
                "recordsFiltered": 4321
            }
        })
    }

    #[tokio::test]
    async fn search_maps_entries_and_total() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/aramadetaylist"))
            .and(body_partial_json(json!({
                "data": {
                    "arananKelime": "mülkiyet",
                    "birimYrgKurulDaire": "1. Hukuk Dairesi",
                    "pageSize": 10,
                    "pageNumber": 1
                }
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(search_body()))
            .mount(&server)
            .await;

        let adapter = adapter_for(&server).await;
        let page = adapter
            .search(&YargitayQuery {
                phrase: "mülkiyet".to_string(),
                chamber: ChamberCode::H1,
                page_index: 1,
                page_size: 10,
                ..Default::default()
            })
            .await
            .unwrap();

        assert_eq!(page.total_records, Some(4321));
        assert_eq!(page.entries.len(), 1);
        let entry = &page.entries[0];
        assert_eq!(entry.title, "1. Hukuk Dairesi 2023/100 2024/55 12.03.2024");
        let handle = DocumentHandle::parse(&entry.handle).unwrap();
        assert_eq!(handle.source, SourceId::Yargitay);
        assert_eq!(handle.native_id, "123456");
    }

    #[tokio::test]
    async fn dates_are_sent_dotted() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/aramadetaylist"))
            .and(body_partial_json(json!({
                "data": { "baslangicTarihi": "01.01.2023", "bitisTarihi": "31.12.2023" }
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(search_body()))
            .mount(&server)
            .await;

        let adapter = adapter_for(&server).await;
        let page = adapter
            .search(&YargitayQuery {
                phrase: "tazminat".to_string(),
                start_date: Some("2023-01-01".to_string()),
                end_date: Some("2023-12-31".to_string()),
                page_index: 1,
                page_size: 10,
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(page.entries.len(), 1);
    }

    #[tokio::test]
    async fn validation_rejects_before_any_request() {
        let server = MockServer::start().await;
        let adapter = adapter_for(&server).await;

        // Danıştay chamber against Yargıtay.
        let err = adapter
            .search(&YargitayQuery {
                phrase: "x".to_string(),
                chamber: ChamberCode::D5,
                page_index: 1,
                page_size: 10,
                ..Default::default()
            })
            .await
            .unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::InvalidArgument);

        // Empty phrase with no structured filter.
        let err = adapter
            .search(&YargitayQuery {
                page_index: 1,
                page_size: 10,
                ..Default::default()
            })
            .await
            .unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::InvalidArgument);

        // Offset beyond the backend maximum.
        let err = adapter
            .search(&YargitayQuery {
                phrase: "x".to_string(),
                page_index: 500,
                page_size: 100,
                ..Default::default()
            })
            .await
            .unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::InvalidArgument);

        // No request reached the server.
        assert!(server.received_requests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn null_data_means_empty_page() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/aramadetaylist"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": null })))
            .mount(&server)
            .await;

        let adapter = adapter_for(&server).await;
        let page = adapter
            .search(&YargitayQuery {
                phrase: "bulunamayan".to_string(),
                page_index: 1,
                page_size: 10,
                ..Default::default()
            })
            .await
            .unwrap();
        assert!(page.entries.is_empty());
        assert_eq!(page.total_records, Some(0));
    }

    #[tokio::test]
    async fn fetch_unwraps_envelope_and_paginates() {
        let server = MockServer::start().await;
        let long_body = format!(
            "<html><body><p>{}</p></body></html>",
            "karar metni ".repeat(1_000)
        );
        Mock::given(method("GET"))
            .and(path("/getDokuman"))
            .and(query_param("id", "123456"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({ "data": long_body })),
            )
            .mount(&server)
            .await;

        let adapter = adapter_for(&server).await;
        let handle = DocumentHandle::new(SourceId::Yargitay, "", "123456");
        let doc = adapter.fetch(&handle, 1).await.unwrap();
        assert!(doc.is_paginated);
        assert_eq!(doc.chunk_index, 1);
        assert!(doc.chunk_text.contains("karar metni"));

        // Clamped chunk request.
        let clamped = adapter.fetch(&handle, 9_999).await.unwrap();
        assert_eq!(clamped.chunk_index, clamped.total_chunks);
    }

    #[tokio::test]
    async fn backend_5xx_is_backend_failure() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/aramadetaylist"))
            .respond_with(ResponseTemplate::new(502).set_body_string("bad gateway"))
            .mount(&server)
            .await;

        let adapter = adapter_for(&server).await;
        let err = adapter
            .search(&YargitayQuery {
                phrase: "x".to_string(),
                page_index: 1,
                page_size: 10,
                ..Default::default()
            })
            .await
            .unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::BackendFailure);
    }

    #[tokio::test]
    async fn missing_document_data_is_backend_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/getDokuman"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "metadata": {} })))
            .mount(&server)
            .await;

        let adapter = adapter_for(&server).await;
        let handle = DocumentHandle::new(SourceId::Yargitay, "", "1");
        let err = adapter.fetch(&handle, 1).await.unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::BackendFailure);
    }
}
