//! Bedesten adapter — the cross-court federated index.
//!
//! One JSON surface covering Yargıtay, Danıştay, local civil courts,
//! appellate civil courts and extraordinary appeals. Search and document
//! retrieval both wrap their payloads in `{"data": ..., "applicationName":
//! "UyapMevzuat"}`; documents arrive base64-encoded with an explicit mime
//! type that selects the HTML or PDF normalization path.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

use crate::chambers::ChamberCode;
use crate::error::{Error, Result};
use crate::health::HealthSample;
use crate::normalize::{ConverterProfile, Normalizer};
use crate::session::{SessionPool, SourceProfile, TlsPolicy};
use crate::types::{
    ContainerKind, DocumentHandle, NormalizedDocument, SearchEntry, SearchPage, SourceId, dates,
};

use super::{Adapter, check_offset, classify_status, elapsed_ms, expect_source, paginate};

const SEARCH_ENDPOINT: &str = "/emsal-karar/searchDocuments";
const DOCUMENT_ENDPOINT: &str = "/emsal-karar/getDocumentContent";
const DOCUMENT_PORTAL: &str = "https://mevzuat.adalet.gov.tr/ictihat";

const MAX_OFFSET: u64 = 10_000;

/// Session profile for the federated index.
pub fn profile() -> SourceProfile {
    SourceProfile {
        source: SourceId::Bedesten,
        base_url: "https://bedesten.adalet.gov.tr".to_string(),
        referer: None,
        origin: None,
        extra_headers: &[("accept", "application/json")],
        tls: TlsPolicy::Strict,
        default_timeout: Duration::from_secs(30),
        max_concurrency: 8,
    }
}

/// Court-type filter values accepted by the index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum CourtType {
    /// Yargıtay decisions.
    #[serde(rename = "YARGITAYKARARI")]
    Yargitay,
    /// Danıştay decisions.
    #[serde(rename = "DANISTAYKARAR")]
    Danistay,
    /// Local civil courts.
    #[serde(rename = "YERELHUKUK")]
    LocalCivil,
    /// Civil courts of appeals.
    #[serde(rename = "ISTINAFHUKUK")]
    AppellateCivil,
    /// Extraordinary appeals (kanun yararına bozma).
    #[serde(rename = "KYB")]
    ExtraordinaryAppeal,
}

impl CourtType {
    const fn wire_name(self) -> &'static str {
        match self {
            Self::Yargitay => "YARGITAYKARARI",
            Self::Danistay => "DANISTAYKARAR",
            Self::LocalCivil => "YERELHUKUK",
            Self::AppellateCivil => "ISTINAFHUKUK",
            Self::ExtraordinaryAppeal => "KYB",
        }
    }

    /// Human-readable court name for result entries.
    const fn display_name(self) -> &'static str {
        match self {
            Self::Yargitay => "Yargıtay",
            Self::Danistay => "Danıştay",
            Self::LocalCivil => "Yerel Hukuk Mahkemesi",
            Self::AppellateCivil => "İstinaf Hukuk Mahkemesi",
            Self::ExtraordinaryAppeal => "Kanun Yararına Bozma",
        }
    }

    fn from_wire(name: &str) -> Option<Self> {
        [
            Self::Yargitay,
            Self::Danistay,
            Self::LocalCivil,
            Self::AppellateCivil,
            Self::ExtraordinaryAppeal,
        ]
        .into_iter()
        .find(|c| c.wire_name() == name)
    }
}

/// Typed search contract for the federated index.
#[derive(Debug, Clone, Default)]
pub struct BedestenQuery {
    /// Search phrase. `"exact phrase"`, `+required`, `-excluded` and
    /// `AND/OR/NOT` are forwarded verbatim.
    pub phrase: String,
    /// Court types to include; empty means all.
    pub court_types: Vec<CourtType>,
    /// Chamber filter from the closed set.
    pub chamber: ChamberCode,
    /// Inclusive start date, ISO `YYYY-MM-DD`; promoted to midnight UTC.
    pub start_date: Option<String>,
    /// Inclusive end date, ISO `YYYY-MM-DD`; promoted to end of day UTC.
    pub end_date: Option<String>,
    /// 1-indexed page.
    pub page_index: u32,
    /// Page size, 1..=100.
    pub page_size: u32,
}

impl BedestenQuery {
    /// Validate before any network call.
    pub fn validate(&self) -> Result<()> {
        check_offset(self.page_index, self.page_size, MAX_OFFSET)?;
        if self.phrase.trim().is_empty() {
            return Err(Error::invalid_argument(
                "phrase",
                "the federated index requires a non-empty phrase",
            ));
        }
        for (field, value) in [("start_date", &self.start_date), ("end_date", &self.end_date)] {
            if let Some(v) = value {
                dates::validate_iso(field, v)?;
            }
        }
        Ok(())
    }

    fn wire_data(&self) -> Value {
        let item_types: Vec<&str> = if self.court_types.is_empty() {
            vec![
                CourtType::Yargitay.wire_name(),
                CourtType::Danistay.wire_name(),
                CourtType::LocalCivil.wire_name(),
                CourtType::AppellateCivil.wire_name(),
                CourtType::ExtraordinaryAppeal.wire_name(),
            ]
        } else {
            self.court_types.iter().map(|c| c.wire_name()).collect()
        };

        let mut data = Map::new();
        data.insert("pageSize".to_string(), json!(self.page_size));
        data.insert("pageNumber".to_string(), json!(self.page_index));
        data.insert("itemTypeList".to_string(), json!(item_types));
        data.insert("phrase".to_string(), json!(self.phrase));
        if let Some(name) = self.chamber.native_name() {
            data.insert("birimAdi".to_string(), json!(name));
        }
        if let Some(start) = self.start_date.as_deref() {
            data.insert("kararTarihiStart".to_string(), json!(dates::promote_start(start)));
        }
        if let Some(end) = self.end_date.as_deref() {
            data.insert("kararTarihiEnd".to_string(), json!(dates::promote_end(end)));
        }
        data.insert("sortFields".to_string(), json!(["KARAR_TARIHI"]));
        data.insert("sortDirection".to_string(), json!("desc"));
        Value::Object(data)
    }
}

#[derive(Debug, Deserialize)]
struct WireItemType {
    name: String,
}

#[derive(Debug, Deserialize)]
struct WireEntry {
    #[serde(rename = "documentId")]
    document_id: String,
    #[serde(rename = "itemType")]
    item_type: WireItemType,
    #[serde(default, rename = "birimAdi")]
    birim_adi: Option<String>,
    #[serde(default, rename = "esasNo")]
    esas_no: Option<String>,
    #[serde(default, rename = "kararNo")]
    karar_no: Option<String>,
    #[serde(default, rename = "kararTarihiStr")]
    karar_tarihi_str: Option<String>,
    #[serde(default, rename = "kesinlesmeDurumu")]
    kesinlesme_durumu: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct WireSearchData {
    #[serde(default, rename = "emsalKararList")]
    emsal_karar_list: Vec<WireEntry>,
    #[serde(default)]
    total: u64,
}

#[derive(Debug, Deserialize)]
struct WireSearchResponse {
    #[serde(default)]
    data: Option<WireSearchData>,
}

#[derive(Debug, Deserialize)]
struct WireDocumentData {
    content: String,
    #[serde(rename = "mimeType")]
    mime_type: String,
}

#[derive(Debug, Deserialize)]
struct WireDocumentResponse {
    #[serde(default)]
    data: Option<WireDocumentData>,
}

/// Federated-index adapter over the shared session pool.
pub struct BedestenAdapter {
    sessions: SessionPool,
    normalizer: Normalizer,
}

impl BedestenAdapter {
    /// Build against a ready session pool.
    pub fn new(sessions: SessionPool) -> Self {
        Self {
            sessions,
            normalizer: Normalizer::new().with_profile(ConverterProfile::TableAware),
        }
    }

    /// Run a federated search.
    pub async fn search(&self, query: &BedestenQuery) -> Result<SearchPage> {
        query.validate()?;
        let payload = json!({
            "data": query.wire_data(),
            "applicationName": "UyapMevzuat",
            "paging": true,
        });

        let session = self.sessions.borrow(SourceId::Bedesten).await?;
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

        let parsed: WireSearchResponse = serde_json::from_str(&body).map_err(|e| {
            Error::backend(Some(status.as_u16()), &format!("unparseable search response: {e}"))
        })?;
        let data = parsed.data.unwrap_or_default();

        let entries = data
            .emsal_karar_list
            .into_iter()
            .map(|e| {
                let handle = DocumentHandle::new(SourceId::Bedesten, "", e.document_id);
                let court = CourtType::from_wire(&e.item_type.name)
                    .map(|c| c.display_name().to_string())
                    .unwrap_or_else(|| e.item_type.name.clone());
                SearchEntry::with_assembled_title(&handle)
                    .chamber(e.birim_adi)
                    .case_number(e.esas_no)
                    .decision_number(e.karar_no)
                    .decision_date(e.karar_tarihi_str)
                    .display("court", Some(court))
                    .display("kesinlesmeDurumu", e.kesinlesme_durumu)
                    .build()
            })
            .collect();

        Ok(SearchPage {
            source: SourceId::Bedesten,
            subtype: String::new(),
            total_records: Some(data.total),
            page_index: query.page_index,
            page_size: query.page_size,
            entries,
        })
    }
}

#[async_trait]
impl Adapter for BedestenAdapter {
    fn source(&self) -> SourceId {
        SourceId::Bedesten
    }

    async fn fetch(&self, handle: &DocumentHandle, chunk_index: u32) -> Result<NormalizedDocument> {
        expect_source(handle, SourceId::Bedesten)?;

        let payload = json!({
            "data": { "documentId": handle.native_id },
            "applicationName": "UyapMevzuat",
        });

        let session = self.sessions.borrow(SourceId::Bedesten).await?;
        let response = session
            .client()
            .post(session.url(DOCUMENT_ENDPOINT))
            .json(&payload)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(classify_status(status, &body));
        }

        let parsed: WireDocumentResponse = serde_json::from_str(&body).map_err(|e| {
            Error::backend(Some(status.as_u16()), &format!("unparseable document envelope: {e}"))
        })?;
        let data = parsed
            .data
            .ok_or_else(|| Error::NotFound(format!("no document for id {}", handle.native_id)))?;

        let bytes = STANDARD.decode(data.content.as_bytes()).map_err(|e| {
            Error::backend(Some(status.as_u16()), &format!("document content is not base64: {e}"))
        })?;

        let container = match data.mime_type.as_str() {
            "application/pdf" => ContainerKind::Pdf,
            _ => ContainerKind::HtmlPage,
        };

        let chunked = self.normalizer.normalize(&bytes, container)?;
        let source_url = format!("{DOCUMENT_PORTAL}/{}", handle.native_id);
        Ok(paginate(handle, source_url, &chunked, chunk_index))
    }

    async fn health(&self) -> HealthSample {
        let start = Instant::now();
        let query = BedestenQuery {
            phrase: "karar".to_string(),
            court_types: vec![CourtType::Yargitay],
            page_index: 1,
            page_size: 1,
            ..Default::default()
        };
        match self.search(&query).await {
            Ok(page) if page.total_records.unwrap_or(0) > 0 => {
                HealthSample::healthy(SourceId::Bedesten, elapsed_ms(start))
            },
            Ok(_) => HealthSample::unhealthy(
                SourceId::Bedesten,
                elapsed_ms(start),
                "total is 0 or missing in data field",
            ),
            Err(e) => HealthSample::unhealthy(SourceId::Bedesten, elapsed_ms(start), e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GatewayConfig;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn adapter_for(server: &MockServer) -> BedestenAdapter {
        let pool = SessionPool::new(
            vec![profile().rebased(server.uri())],
            &GatewayConfig::for_tests(),
        );
        BedestenAdapter::new(pool)
    }

    fn search_body() -> Value {
        json!({
            "data": {
                "emsalKararList": [
                    {
                        "documentId": "doc-abc",
                        "itemType": { "name": "YARGITAYKARARI", "description": "Yargıtay Kararı" },
                        "birimAdi": "1. Hukuk Dairesi",
                        "esasNo": "2023/1",
                        "kararNo": "2024/2",
                        "kararTarihi": "2024-03-12T00:00:00.000Z",
                        "kararTarihiStr": "12.03.2024"
                    },
                    {
                        "documentId": "doc-def",
                        "itemType": { "name": "DANISTAYKARAR", "description": "Danıştay Kararı" },
                        "birimAdi": "5. Daire",
                        "kararTarihi": "2024-02-01T00:00:00.000Z",
                        "kararTarihiStr": "01.02.2024"
                    }
                ],
                "total": 42,
                "start": 0
            },
            "metadata": {}
        })
    }

    #[tokio::test]
    async fn search_filters_and_promotes_dates() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/emsal-karar/searchDocuments"))
            .and(body_partial_json(json!({
                "data": {
                    "phrase": "\"mülkiyet hakkı\"",
                    "itemTypeList": ["YARGITAYKARARI", "DANISTAYKARAR"],
                    "kararTarihiStart": "2023-01-01T00:00:00.000Z",
                    "kararTarihiEnd": "2023-12-31T23:59:59.999Z",
                    "sortDirection": "desc"
                },
                "applicationName": "UyapMevzuat",
                "paging": true
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(search_body()))
            .mount(&server)
            .await;

        let adapter = adapter_for(&server).await;
        let page = adapter
            .search(&BedestenQuery {
                phrase: "\"mülkiyet hakkı\"".to_string(),
                court_types: vec![CourtType::Yargitay, CourtType::Danistay],
                start_date: Some("2023-01-01".to_string()),
                end_date: Some("2023-12-31".to_string()),
                page_index: 1,
                page_size: 10,
                ..Default::default()
            })
            .await
            .unwrap();

        assert_eq!(page.total_records, Some(42));
        assert!(page.entries.len() <= 10);
        for entry in &page.entries {
            let court = entry
                .display_fields
                .iter()
                .find(|(k, _)| k == "court")
                .map(|(_, v)| v.as_str())
                .unwrap();
            assert!(["Yargıtay", "Danıştay"].contains(&court));
        }
    }

    #[tokio::test]
    async fn chamber_filter_sends_native_name() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/emsal-karar/searchDocuments"))
            .and(body_partial_json(json!({
                "data": { "birimAdi": "Hukuk Genel Kurulu" }
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(search_body()))
            .mount(&server)
            .await;

        let adapter = adapter_for(&server).await;
        adapter
            .search(&BedestenQuery {
                phrase: "tazminat".to_string(),
                chamber: ChamberCode::Hgk,
                page_index: 1,
                page_size: 10,
                ..Default::default()
            })
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn all_chamber_is_omitted() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/emsal-karar/searchDocuments"))
            .respond_with(ResponseTemplate::new(200).set_body_json(search_body()))
            .mount(&server)
            .await;

        let adapter = adapter_for(&server).await;
        adapter
            .search(&BedestenQuery {
                phrase: "tazminat".to_string(),
                page_index: 1,
                page_size: 10,
                ..Default::default()
            })
            .await
            .unwrap();

        let requests = server.received_requests().await.unwrap();
        let body: Value = serde_json::from_slice(&requests[0].body).unwrap();
        assert!(body["data"].get("birimAdi").is_none());
    }

    #[tokio::test]
    async fn html_document_is_decoded_and_normalized() {
        let server = MockServer::start().await;
        let html = "<html><body><h2>Karar</h2><p>gerekçe</p></body></html>";
        Mock::given(method("POST"))
            .and(path("/emsal-karar/getDocumentContent"))
            .and(body_partial_json(json!({
                "data": { "documentId": "doc-abc" }
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": {
                    "content": STANDARD.encode(html),
                    "mimeType": "text/html",
                    "version": 1
                },
                "metadata": {}
            })))
            .mount(&server)
            .await;

        let adapter = adapter_for(&server).await;
        let handle = DocumentHandle::new(SourceId::Bedesten, "", "doc-abc");
        let doc = adapter.fetch(&handle, 1).await.unwrap();
        assert!(doc.chunk_text.contains("gerekçe"));
        assert!(doc.source_url.ends_with("/ictihat/doc-abc"));
        assert!(!doc.is_paginated);
    }

    #[tokio::test]
    async fn missing_document_is_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/emsal-karar/getDocumentContent"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": null, "metadata": {}
            })))
            .mount(&server)
            .await;

        let adapter = adapter_for(&server).await;
        let handle = DocumentHandle::new(SourceId::Bedesten, "", "ghost");
        let err = adapter.fetch(&handle, 1).await.unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn empty_phrase_is_rejected_locally() {
        let server = MockServer::start().await;
        let adapter = adapter_for(&server).await;
        let err = adapter
            .search(&BedestenQuery {
                page_index: 1,
                page_size: 10,
                ..Default::default()
            })
            .await
            .unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::InvalidArgument);
        assert!(server.received_requests().await.unwrap().is_empty());
    }
}
