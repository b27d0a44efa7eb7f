//! KİK (public procurement authority) adapter.
//!
//! Searches go to the EKAP v2 JSON API, one endpoint per decision subtype,
//! with the site's custom security headers and a SOAP-shaped key/value
//! payload. Documents live behind a JS-rendered viewer: a `GetSorgulamaUrl`
//! call yields the viewer URL (with a hardcoded legacy fallback), the
//! browser pool renders it, and any iframe the viewer creates is fetched
//! over plain HTTP with the browser's cookies seeded into the session jar.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use scraper::{Html, Selector};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use url::Url;

use crate::browser::{BrowserPool, FormPlan, FormStep, WaitCondition};
use crate::error::{Error, Result};
use crate::health::HealthSample;
use crate::normalize::{ConverterProfile, Normalizer};
use crate::session::{SessionPool, SourceProfile, TlsPolicy};
use crate::types::{DocumentHandle, NormalizedDocument, SearchEntry, SearchPage, SourceId, dates};

use super::{Adapter, classify_status, elapsed_ms, expect_source, paginate};

const URL_LOOKUP_ENDPOINT: &str = "/b_ihalearaclari/api/KurulKararlari/GetSorgulamaUrl";

/// Undocumented legacy viewer; used only when `GetSorgulamaUrl` fails.
const LEGACY_DOCUMENT_URL: &str = "https://ekap.kik.gov.tr/EKAP/Vatandas/KurulKararGoster.aspx";

/// Legacy search UI, re-driven for handles that carry a decision number.
const LEGACY_SEARCH_URL: &str = "https://ekap.kik.gov.tr/EKAP/Vatandas/KurulKararSorgu.aspx";

/// Session profile. The server runs a pre-RFC-8446 TLS stack and requires
/// legacy renegotiation, hence the relaxed policy.
pub fn profile() -> SourceProfile {
    SourceProfile {
        source: SourceId::Kik,
        base_url: "https://ekapv2.kik.gov.tr".to_string(),
        referer: Some("https://ekapv2.kik.gov.tr/sorgulamalar/kurul-kararlari".to_string()),
        origin: Some("https://ekapv2.kik.gov.tr".to_string()),
        extra_headers: &[
            ("accept", "application/json"),
            ("api-version", "v1"),
        ],
        tls: TlsPolicy::InsecureLegacy,
        default_timeout: Duration::from_secs(60),
        max_concurrency: 4,
    }
}

/// Decision subtypes served by the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum BoardDecisionType {
    /// Procurement dispute decisions.
    Uyusmazlik,
    /// Regulatory board decisions.
    Duzenleyici,
    /// Court rulings the board publishes.
    Mahkeme,
}

impl BoardDecisionType {
    /// Key used in handles and the CSRF-free subtype dispatch.
    pub const fn key(self) -> &'static str {
        match self {
            Self::Uyusmazlik => "uyusmazlik",
            Self::Duzenleyici => "duzenleyici",
            Self::Mahkeme => "mahkeme",
        }
    }

    const fn endpoint(self) -> &'static str {
        match self {
            Self::Uyusmazlik => "/b_ihalearaclari/api/KurulKararlari/GetKurulKararlari",
            Self::Duzenleyici => "/b_ihalearaclari/api/KurulKararlari/GetKurulKararlariDk",
            Self::Mahkeme => "/b_ihalearaclari/api/KurulKararlari/GetKurulKararlariMk",
        }
    }

    const fn payload_key(self) -> &'static str {
        match self {
            Self::Uyusmazlik => "sorgulaKurulKararlari",
            Self::Duzenleyici => "sorgulaKurulKararlariDk",
            Self::Mahkeme => "sorgulaKurulKararlariMk",
        }
    }

    const fn response_key(self) -> &'static str {
        match self {
            Self::Uyusmazlik => "SorgulaKurulKararlariResponse",
            Self::Duzenleyici => "SorgulaKurulKararlariDkResponse",
            Self::Mahkeme => "SorgulaKurulKararlariMkResponse",
        }
    }

    const fn result_key(self) -> &'static str {
        match self {
            Self::Uyusmazlik => "SorgulaKurulKararlariResult",
            Self::Duzenleyici => "SorgulaKurulKararlariDkResult",
            Self::Mahkeme => "SorgulaKurulKararlariMkResult",
        }
    }
}

/// Typed search contract for board decisions.
#[derive(Debug, Clone)]
pub struct KikQuery {
    /// Decision register to search.
    pub decision_type: BoardDecisionType,
    /// Full-text search over decision bodies.
    pub decision_text: Option<String>,
    /// Decision number, e.g. `2025/UH.II-1801`.
    pub decision_no: Option<String>,
    /// Applicant name filter.
    pub applicant: Option<String>,
    /// Contracting-administration name filter.
    pub administration: Option<String>,
    /// Inclusive start date, ISO `YYYY-MM-DD`.
    pub start_date: Option<String>,
    /// Inclusive end date, ISO `YYYY-MM-DD`.
    pub end_date: Option<String>,
}

impl KikQuery {
    /// Validate before any network call.
    pub fn validate(&self) -> Result<()> {
        let any = [
            &self.decision_text,
            &self.decision_no,
            &self.applicant,
            &self.administration,
            &self.start_date,
            &self.end_date,
        ]
        .iter()
        .any(|f| f.as_deref().is_some_and(|v| !v.trim().is_empty()));
        if !any {
            return Err(Error::invalid_argument(
                "decision_text",
                "at least one search criterion is required",
            ));
        }
        for (field, value) in [("start_date", &self.start_date), ("end_date", &self.end_date)] {
            if let Some(v) = value {
                dates::validate_iso(field, v)?;
            }
        }
        Ok(())
    }

    fn key_value_pairs(&self) -> Vec<Value> {
        let mut pairs = Vec::new();
        let mut push = |key: &str, value: &Option<String>| {
            if let Some(v) = value.as_deref().filter(|v| !v.trim().is_empty()) {
                pairs.push(json!({ "key": key, "value": v }));
            }
        };
        push("KararMetni", &self.decision_text);
        push("KararNo", &self.decision_no);
        push("BasvuranAdi", &self.applicant);
        push("IdareAdi", &self.administration);
        push("BaslangicTarihi", &self.start_date);
        push("BitisTarihi", &self.end_date);
        pairs
    }
}

/// Per-request security headers the v2 API validates. The opaque values
/// are replayed from the site's own frontend; the GUID is fresh per call.
fn security_headers() -> [(&'static str, String); 4] {
    [
        ("X-Custom-Request-Guid", uuid::Uuid::new_v4().to_string()),
        (
            "X-Custom-Request-R8id",
            "hwnOjsN8qdgtDw70x3sKkxab0rj2bQ8Uph4+C+oU+9AMmQqRN3eMOEEeet748DOf".to_string(),
        ),
        ("X-Custom-Request-Siv", "p2IQRTitF8z7I39nBjdAqA==".to_string()),
        ("X-Custom-Request-Ts", "1vB3Wwrt8YQ5U6t3XAzZ+Q==".to_string()),
    ]
}

/// Procurement-board adapter: JSON search plus browser-driven documents.
pub struct KikAdapter {
    sessions: SessionPool,
    browser: BrowserPool,
    normalizer: Normalizer,
}

impl KikAdapter {
    /// Build against the shared pools.
    pub fn new(sessions: SessionPool, browser: BrowserPool) -> Self {
        Self {
            sessions,
            browser,
            normalizer: Normalizer::new().with_profile(ConverterProfile::TableAware),
        }
    }

    /// Search one decision register.
    pub async fn search(&self, query: &KikQuery) -> Result<SearchPage> {
        query.validate()?;
        let kind = query.decision_type;

        let payload = json!({
            kind.payload_key(): {
                "keyValuePairs": {
                    "keyValueOfstringanyType": query.key_value_pairs(),
                }
            }
        });

        let session = self.sessions.borrow(SourceId::Kik).await?;
        let mut request = session.client().post(session.url(kind.endpoint())).json(&payload);
        for (name, value) in security_headers() {
            request = request.header(name, value);
        }
        let response = request.send().await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(classify_status(status, &body));
        }

        let parsed: Value = serde_json::from_str(&body).map_err(|e| {
            Error::backend(Some(status.as_u16()), &format!("unparseable search response: {e}"))
        })?;
        let result = &parsed[kind.response_key()][kind.result_key()];

        let error_code = result["hataKodu"].as_str().unwrap_or("0");
        if !error_code.is_empty() && error_code != "0" {
            let message = result["hataMesaji"].as_str().unwrap_or("unknown API error");
            return Err(Error::backend(Some(status.as_u16()), &format!(
                "API error {error_code}: {message}"
            )));
        }

        let mut entries = Vec::new();
        if let Some(groups) = result["KurulKararTutanakDetayListesi"].as_array() {
            for group in groups {
                let details = group["kurulKararTutanakDetayi"].as_array().cloned().unwrap_or_default();
                for detail in details {
                    let Some(id) = detail["gundemMaddesiId"].as_str().filter(|s| !s.is_empty())
                    else {
                        continue;
                    };
                    let handle = DocumentHandle::new(SourceId::Kik, kind.key(), id);
                    let text = |key: &str| {
                        detail[key]
                            .as_str()
                            .map(|s| s.trim().to_string())
                            .filter(|s| !s.is_empty())
                    };
                    entries.push(
                        SearchEntry::with_assembled_title(&handle)
                            .decision_number(text("kararNo"))
                            .decision_date(text("kararTarihi"))
                            .display("basvuran", text("basvuran"))
                            .display("idareAdi", text("idareAdi"))
                            .display("basvuruKonusu", text("basvuruKonusu"))
                            .build(),
                    );
                }
            }
        }

        let total = u64::try_from(entries.len()).unwrap_or(u64::MAX);
        let page_size = u32::try_from(entries.len().max(1)).unwrap_or(u32::MAX).min(100);
        Ok(SearchPage {
            source: SourceId::Kik,
            subtype: kind.key().to_string(),
            total_records: Some(total),
            page_index: 1,
            page_size,
            entries,
        })
    }

    /// Re-drive the legacy search UI for a decision addressed by number:
    /// fill the decision-number field, submit, wait for the results grid,
    /// open the row's preview and let the viewer populate its iframe.
    async fn legacy_document_page(
        &self,
        decision_no: &str,
    ) -> Result<(String, crate::browser::RenderedPage)> {
        let search_url = LEGACY_SEARCH_URL.to_string();
        let plan = FormPlan {
            url: search_url.clone(),
            steps: vec![
                FormStep::Fill {
                    selector: "input[id$='txtKararNo']".to_string(),
                    value: decision_no.to_string(),
                },
                FormStep::Click {
                    selector: "input[id$='btnAra']".to_string(),
                },
                FormStep::WaitFor {
                    predicate: "document.querySelector(\"table[id$='grdKurulKararlari'] tr td a\")"
                        .to_string(),
                },
                FormStep::Click {
                    selector: "table[id$='grdKurulKararlari'] tr td a".to_string(),
                },
                FormStep::WaitFor {
                    predicate: "document.querySelector('iframe') && document.querySelector('iframe').src"
                        .to_string(),
                },
            ],
            fast_mode: false,
        };

        let rendered = self
            .browser
            .fill_and_submit(&plan, Duration::from_secs(90))
            .await?;
        Ok((search_url, rendered))
    }

    /// Resolve the viewer URL, falling back to the legacy ASPX page.
    async fn document_url(&self, document_id: &str) -> String {
        let resolved: Result<String> = async {
            let session = self.sessions.borrow(SourceId::Kik).await?;
            let mut request = session
                .client()
                .post(session.url(URL_LOOKUP_ENDPOINT))
                .json(&json!({ "sorguSayfaTipi": 2 }));
            for (name, value) in security_headers() {
                request = request.header(name, value);
            }
            let response = request.send().await?;
            let status = response.status();
            let body = response.text().await?;
            if !status.is_success() {
                return Err(classify_status(status, &body));
            }
            let parsed: Value = serde_json::from_str(&body)
                .map_err(|e| Error::backend(Some(status.as_u16()), &e.to_string()))?;
            parsed["sorgulamaUrl"]
                .as_str()
                .filter(|u| !u.is_empty())
                .map(ToString::to_string)
                .ok_or_else(|| Error::backend(Some(status.as_u16()), "no sorgulamaUrl in response"))
        }
        .await;

        match resolved {
            Ok(base) => format!("{base}?KararId={document_id}"),
            Err(e) => {
                // The legacy path is undocumented upstream and may break
                // silently; make every fallback loud.
                tracing::warn!(
                    document_id,
                    error = %e,
                    "GetSorgulamaUrl failed, falling back to legacy viewer URL"
                );
                format!("{LEGACY_DOCUMENT_URL}?KararId={document_id}")
            },
        }
    }
}

/// Whether a native id is a v2 agenda-item GUID (as opposed to a legacy
/// decision number such as `2019/UH.II-834`).
fn is_agenda_guid(native_id: &str) -> bool {
    native_id.len() == 36 && native_id.chars().all(|c| c.is_ascii_hexdigit() || c == '-')
}

/// First iframe src in a rendered viewer page, if any.
fn iframe_src(html: &str) -> Option<String> {
    let document = Html::parse_document(html);
    let selector = Selector::parse("iframe[src]").ok()?;
    document
        .select(&selector)
        .next()
        .and_then(|f| f.value().attr("src"))
        .filter(|src| !src.is_empty() && !src.starts_with("about:"))
        .map(ToString::to_string)
}

#[async_trait]
impl Adapter for KikAdapter {
    fn source(&self) -> SourceId {
        SourceId::Kik
    }

    async fn fetch(&self, handle: &DocumentHandle, chunk_index: u32) -> Result<NormalizedDocument> {
        expect_source(handle, SourceId::Kik)?;

        // Legacy handles carry the decision number itself; those documents
        // are only reachable by re-driving the old search UI.
        let (viewer_url, rendered) = if is_agenda_guid(&handle.native_id) {
            let viewer_url = self.document_url(&handle.native_id).await;
            let rendered = self
                .browser
                .navigate(
                    &viewer_url,
                    WaitCondition::Predicate(
                        "document.body && document.body.innerText.trim().length > 200".to_string(),
                    ),
                    Duration::from_secs(45),
                )
                .await?;
            (viewer_url, rendered)
        } else {
            self.legacy_document_page(&handle.native_id).await?
        };

        // The viewer sometimes loads the decision body into an iframe; in
        // that case the iframe URL is fetched over plain HTTP with the
        // browser's cookies, which is both faster and yields cleaner HTML.
        let html = if let Some(src) = iframe_src(&rendered.html) {
            let absolute = Url::parse(&viewer_url)
                .and_then(|base| base.join(&src))
                .map_err(|e| Error::ParseFailure {
                    container: crate::types::ContainerKind::HtmlPage,
                    message: format!("iframe src is not a URL: {e}"),
                })?;
            for cookie in &rendered.cookies {
                let pair = format!("{}={}; Domain={}", cookie.name, cookie.value, cookie.domain);
                let _ = self.sessions.seed_cookie(SourceId::Kik, &absolute, &pair);
            }
            let session = self.sessions.borrow(SourceId::Kik).await?;
            let response = session.client().get(absolute.as_str()).send().await?;
            let status = response.status();
            let body = response.text().await?;
            if !status.is_success() {
                return Err(classify_status(status, &body));
            }
            body
        } else {
            rendered.html
        };

        let chunked = self
            .normalizer
            .normalize(html.as_bytes(), crate::types::ContainerKind::HtmlPage)?;
        Ok(paginate(handle, viewer_url, &chunked, chunk_index))
    }

    async fn health(&self) -> HealthSample {
        let start = Instant::now();
        let query = KikQuery {
            decision_type: BoardDecisionType::Uyusmazlik,
            decision_text: Some("ihale".to_string()),
            decision_no: None,
            applicant: None,
            administration: None,
            start_date: None,
            end_date: None,
        };
        match self.search(&query).await {
            Ok(page) if !page.entries.is_empty() => {
                HealthSample::healthy(SourceId::Kik, elapsed_ms(start))
            },
            Ok(_) => HealthSample::unhealthy(
                SourceId::Kik,
                elapsed_ms(start),
                "trivial query returned no decisions",
            ),
            Err(e) => HealthSample::unhealthy(SourceId::Kik, elapsed_ms(start), e.to_string()),
        }
    }
}
