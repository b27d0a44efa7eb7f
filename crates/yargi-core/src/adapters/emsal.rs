//! UYAP Emsal (precedent index) adapter.
//!
//! Same wire family as Yargıtay, with local-court and regional-chamber
//! filters. The backend rejects some requests carrying empty-string fields,
//! so the payload only includes populated filters.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Map, Value, json};

use crate::error::{Error, Result};
use crate::health::HealthSample;
use crate::normalize::{ConverterProfile, Normalizer};
use crate::session::{SessionPool, SourceProfile, TlsPolicy};
use crate::types::{DocumentHandle, NormalizedDocument, SearchEntry, SearchPage, SourceId, dates};

use super::{Adapter, check_offset, classify_status, elapsed_ms, expect_source, paginate};

const SEARCH_ENDPOINT: &str = "/aramadetaylist";
const DOCUMENT_ENDPOINT: &str = "/getDokuman";

const MAX_OFFSET: u64 = 10_000;

/// Session profile for the UYAP precedent index.
pub fn profile() -> SourceProfile {
    SourceProfile {
        source: SourceId::Emsal,
        base_url: "https://emsal.uyap.gov.tr".to_string(),
        referer: None,
        origin: None,
        extra_headers: &[
            ("x-requested-with", "XMLHttpRequest"),
            ("accept", "application/json, text/plain, */*"),
        ],
        tls: TlsPolicy::InsecureLegacy,
        default_timeout: Duration::from_secs(30),
        max_concurrency: 8,
    }
}

/// Typed search contract for the precedent index.
#[derive(Debug, Clone, Default)]
pub struct EmsalQuery {
    /// Free-text phrase (`arananKelime`).
    pub phrase: String,
    /// Regional appellate civil court filter (`Bam Hukuk Mahkemeleri`).
    pub bam_civil_court: Option<String>,
    /// First-instance civil court filter (`Hukuk Mahkemeleri`).
    pub civil_court: Option<String>,
    /// Regional civil chambers, joined with `+` on the wire.
    pub regional_chambers: Vec<String>,
    /// Case-number year.
    pub case_year: Option<String>,
    /// First case sequence number.
    pub case_no_start: Option<String>,
    /// Last case sequence number.
    pub case_no_end: Option<String>,
    /// Decision-number year.
    pub decision_year: Option<String>,
    /// First decision sequence number.
    pub decision_no_start: Option<String>,
    /// Last decision sequence number.
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

impl EmsalQuery {
    /// Validate before any network call.
    pub fn validate(&self) -> Result<()> {
        check_offset(self.page_index, self.page_size, MAX_OFFSET)?;
        let any_filter = self.bam_civil_court.is_some()
            || self.civil_court.is_some()
            || !self.regional_chambers.is_empty()
            || self.case_year.is_some()
            || self.decision_year.is_some()
            || self.start_date.is_some()
            || self.end_date.is_some();
        if self.phrase.trim().is_empty() && !any_filter {
            return Err(Error::invalid_argument(
                "phrase",
                "an empty phrase requires at least one structured filter",
            ));
        }
        for (field, value) in [("start_date", &self.start_date), ("end_date", &self.end_date)] {
            if let Some(v) = value {
                dates::validate_iso(field, v)?;
            }
        }
        Ok(())
    }

    /// Build the `data` object, omitting empty fields entirely.
    fn wire_data(&self) -> Value {
        let mut data = Map::new();
        let mut put = |key: &str, value: String| {
            if !value.is_empty() {
                data.insert(key.to_string(), Value::String(value));
            }
        };
        put("arananKelime", self.phrase.clone());
        put("Bam Hukuk Mahkemeleri", self.bam_civil_court.clone().unwrap_or_default());
        put("Hukuk Mahkemeleri", self.civil_court.clone().unwrap_or_default());
        put("birimHukukMah", self.regional_chambers.join("+"));
        put("esasYil", self.case_year.clone().unwrap_or_default());
        put("esasIlkSiraNo", self.case_no_start.clone().unwrap_or_default());
        put("esasSonSiraNo", self.case_no_end.clone().unwrap_or_default());
        put("kararYil", self.decision_year.clone().unwrap_or_default());
        put("kararIlkSiraNo", self.decision_no_start.clone().unwrap_or_default());
        put("kararSonSiraNo", self.decision_no_end.clone().unwrap_or_default());
        put("baslangicTarihi", self.start_date.as_deref().map(dates::to_dotted).unwrap_or_default());
        put("bitisTarihi", self.end_date.as_deref().map(dates::to_dotted).unwrap_or_default());
        data.insert("siralama".to_string(), json!("1"));
        data.insert("siralamaDirection".to_string(), json!("desc"));
        data.insert("pageSize".to_string(), json!(self.page_size));
        data.insert("pageNumber".to_string(), json!(self.page_index));
        Value::Object(data)
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
    #[serde(default)]
    durum: Option<String>,
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

/// Emsal adapter over the shared session pool.
pub struct EmsalAdapter {
    sessions: SessionPool,
    normalizer: Normalizer,
}

impl EmsalAdapter {
    /// Build against a ready session pool.
    pub fn new(sessions: SessionPool) -> Self {
        Self {
            sessions,
            normalizer: Normalizer::new().with_profile(ConverterProfile::TableAware),
        }
    }

    /// Run a detailed search.
    pub async fn search(&self, query: &EmsalQuery) -> Result<SearchPage> {
        query.validate()?;
        let payload = json!({ "data": query.wire_data() });

        let session = self.sessions.borrow(SourceId::Emsal).await?;
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
        let inner = parsed.data.unwrap_or_default();

        let entries = inner
            .data
            .into_iter()
            .map(|e| {
                let handle = DocumentHandle::new(SourceId::Emsal, "", e.id);
                SearchEntry::with_assembled_title(&handle)
                    .chamber(e.daire)
                    .case_number(e.esas_no)
                    .decision_number(e.karar_no)
                    .decision_date(e.karar_tarihi)
                    .display("durum", e.durum)
                    .build()
            })
            .collect();

        Ok(SearchPage {
            source: SourceId::Emsal,
            subtype: String::new(),
            total_records: Some(inner.records_total),
            page_index: query.page_index,
            page_size: query.page_size,
            entries,
        })
    }
}

#[async_trait]
impl Adapter for EmsalAdapter {
    fn source(&self) -> SourceId {
        SourceId::Emsal
    }

    async fn fetch(&self, handle: &DocumentHandle, chunk_index: u32) -> Result<NormalizedDocument> {
        expect_source(handle, SourceId::Emsal)?;

        let session = self.sessions.borrow(SourceId::Emsal).await?;
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
        let query = EmsalQuery {
            phrase: "karar".to_string(),
            page_index: 1,
            page_size: 1,
            ..Default::default()
        };
        match self.search(&query).await {
            Ok(page) if page.total_records.unwrap_or(0) > 0 => {
                HealthSample::healthy(SourceId::Emsal, elapsed_ms(start))
            },
            Ok(_) => HealthSample::unhealthy(
                SourceId::Emsal,
                elapsed_ms(start),
                "trivial query returned zero records",
            ),
            Err(e) => HealthSample::unhealthy(SourceId::Emsal, elapsed_ms(start), e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GatewayConfig;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, Request, ResponseTemplate};

    async fn adapter_for(server: &MockServer) -> EmsalAdapter {
        let pool = SessionPool::new(
            vec![profile().rebased(server.uri())],
            &GatewayConfig::for_tests(),
        );
        EmsalAdapter::new(pool)
    }

    #[tokio::test]
    async fn empty_filters_are_omitted_from_payload() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/aramadetaylist"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": { "data": [], "recordsTotal": 0 }
            })))
            .mount(&server)
            .await;

        let adapter = adapter_for(&server).await;
        adapter
            .search(&EmsalQuery {
                phrase: "kira".to_string(),
                page_index: 1,
                page_size: 10,
                ..Default::default()
            })
            .await
            .unwrap();

        let requests = server.received_requests().await.unwrap();
        let request: &Request = &requests[0];
        let body: Value = serde_json::from_slice(&request.body).unwrap();
        let data = body.get("data").unwrap().as_object().unwrap();
        assert!(data.contains_key("arananKelime"));
        assert!(!data.contains_key("esasYil"));
        assert!(!data.contains_key("Bam Hukuk Mahkemeleri"));
        assert_eq!(data.get("siralamaDirection"), Some(&json!("desc")));
    }

    #[tokio::test]
    async fn regional_chambers_join_with_plus() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/aramadetaylist"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": { "data": [], "recordsTotal": 0 }
            })))
            .mount(&server)
            .await;

        let adapter = adapter_for(&server).await;
        adapter
            .search(&EmsalQuery {
                regional_chambers: vec!["1. Hukuk Dairesi".to_string(), "2. Hukuk Dairesi".to_string()],
                page_index: 1,
                page_size: 10,
                ..Default::default()
            })
            .await
            .unwrap();

        let requests = server.received_requests().await.unwrap();
        let body: Value = serde_json::from_slice(&requests[0].body).unwrap();
        assert_eq!(
            body["data"]["birimHukukMah"],
            json!("1. Hukuk Dairesi+2. Hukuk Dairesi")
        );
    }

    #[tokio::test]
    async fn entry_status_lands_in_display_fields() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/aramadetaylist"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": {
                    "data": [{
                        "id": "em-9",
                        "daire": "Ankara BAM 3. Hukuk Dairesi",
                        "esasNo": "2021/5",
                        "kararNo": "2021/77",
                        "kararTarihi": "01.02.2021",
                        "durum": "KESİNLEŞTİ"
                    }],
                    "recordsTotal": 1
                }
            })))
            .mount(&server)
            .await;

        let adapter = adapter_for(&server).await;
        let page = adapter
            .search(&EmsalQuery {
                phrase: "kira".to_string(),
                page_index: 1,
                page_size: 10,
                ..Default::default()
            })
            .await
            .unwrap();
        let entry = &page.entries[0];
        assert!(entry
            .display_fields
            .iter()
            .any(|(k, v)| k == "durum" && v == "KESİNLEŞTİ"));
    }

    #[tokio::test]
    async fn bare_query_is_rejected_locally() {
        let server = MockServer::start().await;
        let adapter = adapter_for(&server).await;
        let err = adapter
            .search(&EmsalQuery {
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
