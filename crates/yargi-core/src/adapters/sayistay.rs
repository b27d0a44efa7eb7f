//! Sayıştay (court of accounts) adapter.
//!
//! ASP.NET WebForms with DataTables: each of the three decision subtypes
//! (general assembly, appeals board, chamber) has its own page, its own
//! anti-forgery token and its own column schema. A cold sub-endpoint is
//! warmed by loading its page and harvesting the hidden
//! `__RequestVerificationToken`; a 403/419 on search invalidates the token
//! and the request is retried exactly once against a fresh one.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use scraper::{Html, Selector};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};
use crate::health::HealthSample;
use crate::normalize::{ConverterProfile, Normalizer};
use crate::session::{Session, SessionPool, SourceProfile, TlsPolicy};
use crate::types::{DocumentHandle, NormalizedDocument, SearchEntry, SearchPage, SourceId, dates};

use super::{Adapter, classify_status, elapsed_ms, expect_source, paginate};

/// Deepest row offset the DataTables endpoints will serve.
const MAX_OFFSET: u64 = 10_000;

/// Session profile; the endpoints expect the same AJAX headers as the
/// site's own DataTables requests.
pub fn profile() -> SourceProfile {
    SourceProfile {
        source: SourceId::Sayistay,
        base_url: "https://www.sayistay.gov.tr".to_string(),
        referer: None,
        origin: None,
        extra_headers: &[
            ("x-requested-with", "XMLHttpRequest"),
            ("accept", "application/json, text/javascript, */*; q=0.01"),
        ],
        tls: TlsPolicy::Strict,
        default_timeout: Duration::from_secs(60),
        max_concurrency: 4,
    }
}

/// Decision subtypes, each backed by its own endpoint pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum DecisionKind {
    /// Precedent-setting interpretive decisions of the general assembly.
    GenelKurul,
    /// Appeals-board rulings on chamber decisions.
    TemyizKurulu,
    /// First-instance chamber findings and sanctions.
    Daire,
}

impl DecisionKind {
    /// Key used for the CSRF cache and the handle subtype.
    pub const fn key(self) -> &'static str {
        match self {
            Self::GenelKurul => "genel_kurul",
            Self::TemyizKurulu => "temyiz_kurulu",
            Self::Daire => "daire",
        }
    }

    const fn page_path(self) -> &'static str {
        match self {
            Self::GenelKurul => "/KararlarGenelKurul",
            Self::TemyizKurulu => "/KararlarTemyiz",
            Self::Daire => "/KararlarDaire",
        }
    }

    const fn search_path(self) -> &'static str {
        match self {
            Self::GenelKurul => "/KararlarGenelKurul/DataTablesList",
            Self::TemyizKurulu => "/KararlarTemyiz/DataTablesList",
            Self::Daire => "/KararlarDaire/DataTablesList",
        }
    }

    fn parse(key: &str) -> Option<Self> {
        [Self::GenelKurul, Self::TemyizKurulu, Self::Daire]
            .into_iter()
            .find(|k| k.key() == key)
    }
}

/// Typed search contract covering all three subtypes; fields that do not
/// apply to the selected subtype are ignored by the form builder.
#[derive(Debug, Clone)]
pub struct SayistayQuery {
    /// Which decision register to search.
    pub kind: DecisionKind,
    /// Full-text phrase over the decision body.
    pub phrase: Option<String>,
    /// Decision number (general assembly) or appeals-minutes number.
    pub decision_no: Option<String>,
    /// Account/decision year filter.
    pub year: Option<String>,
    /// Chamber name filter for appeals-board and chamber searches
    /// (`"1"`..`"8"` or the site's `Tüm Daireler` sentinel when absent).
    pub chamber: Option<String>,
    /// Inclusive start date, ISO `YYYY-MM-DD`.
    pub start_date: Option<String>,
    /// Inclusive end date, ISO `YYYY-MM-DD`.
    pub end_date: Option<String>,
    /// DataTables row offset (0-based).
    pub start: u32,
    /// DataTables page length, 1..=100.
    pub length: u32,
}

impl SayistayQuery {
    /// Validate before any network call.
    pub fn validate(&self) -> Result<()> {
        if self.length == 0 || self.length > 100 {
            return Err(Error::invalid_argument(
                "length",
                "page length must be between 1 and 100",
            ));
        }
        if u64::from(self.start) + u64::from(self.length) > MAX_OFFSET {
            return Err(Error::invalid_argument(
                "start",
                format!("row window exceeds the backend's maximum offset of {MAX_OFFSET}"),
            ));
        }
        let any_filter = self.phrase.as_deref().is_some_and(|p| !p.trim().is_empty())
            || self.decision_no.is_some()
            || self.year.is_some()
            || self.chamber.is_some()
            || self.start_date.is_some()
            || self.end_date.is_some();
        if !any_filter {
            return Err(Error::invalid_argument(
                "phrase",
                "at least one of phrase, decision_no, year, chamber or a date bound is required",
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

/// DataTables column descriptors, copied from the site's own requests.
fn datatables_columns(columns: &[(&str, bool)], form: &mut Vec<(String, String)>) {
    for (i, (name, orderable)) in columns.iter().enumerate() {
        form.push((format!("columns[{i}][data]"), (*name).to_string()));
        form.push((format!("columns[{i}][name]"), String::new()));
        form.push((format!("columns[{i}][searchable]"), "true".to_string()));
        form.push((
            format!("columns[{i}][orderable]"),
            if *orderable { "true" } else { "false" }.to_string(),
        ));
        form.push((format!("columns[{i}][search][value]"), String::new()));
        form.push((format!("columns[{i}][search][regex]"), "false".to_string()));
    }
}

fn base_datatables_params(start: u32, length: u32) -> Vec<(String, String)> {
    vec![
        ("draw".to_string(), "1".to_string()),
        ("start".to_string(), start.to_string()),
        ("length".to_string(), length.to_string()),
        ("search[value]".to_string(), String::new()),
        ("search[regex]".to_string(), "false".to_string()),
    ]
}

/// Court-of-accounts adapter with per-subtype warm sessions.
pub struct SayistayAdapter {
    sessions: SessionPool,
    normalizer: Normalizer,
}

impl SayistayAdapter {
    /// Build against a ready session pool.
    pub fn new(sessions: SessionPool) -> Self {
        Self {
            sessions,
            normalizer: Normalizer::new().with_profile(ConverterProfile::TableAware),
        }
    }

    /// Search one decision register.
    pub async fn search(&self, query: &SayistayQuery) -> Result<SearchPage> {
        query.validate()?;

        match self.search_once(query).await {
            Err(Error::AuthExpired { source_id, sub_endpoint }) => {
                // One recovery: re-warm and replay, then surface any second
                // failure as a backend fault.
                self.sessions.invalidate_token(source_id, &sub_endpoint).await;
                self.search_once(query).await.map_err(|e| match e {
                    Error::AuthExpired { .. } => Error::BackendFailure {
                        status: Some(403),
                        excerpt: "auth failure persisted after session re-warm".to_string(),
                    },
                    other => other,
                })
            },
            other => other,
        }
    }

    async fn search_once(&self, query: &SayistayQuery) -> Result<SearchPage> {
        let kind = query.kind;
        let token = self
            .sessions
            .token_or_warm(SourceId::Sayistay, kind.key(), |session| async move {
                warm_token(&session, kind).await
            })
            .await?;

        let form = build_form(query, &token);
        let session = self.sessions.borrow(SourceId::Sayistay).await?;
        let response = session
            .client()
            .post(session.url(kind.search_path()))
            .form(&form)
            .send()
            .await?;

        let status = response.status();
        if status.as_u16() == 403 || status.as_u16() == 419 {
            return Err(Error::AuthExpired {
                source_id: SourceId::Sayistay,
                sub_endpoint: kind.key().to_string(),
            });
        }
        let body = response.text().await?;
        if !status.is_success() {
            return Err(classify_status(status, &body));
        }

        let parsed: Value = serde_json::from_str(&body).map_err(|e| {
            Error::backend(Some(status.as_u16()), &format!("unparseable DataTables response: {e}"))
        })?;
        let total = parsed.get("recordsTotal").and_then(Value::as_u64);
        let rows = parsed
            .get("data")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();

        let entries = rows
            .iter()
            .filter_map(|row| row_to_entry(kind, row))
            .collect();

        Ok(SearchPage {
            source: SourceId::Sayistay,
            subtype: kind.key().to_string(),
            total_records: total,
            page_index: query.start / query.length + 1,
            page_size: query.length,
            entries,
        })
    }
}

async fn warm_token(session: &Session, kind: DecisionKind) -> Result<String> {
    let response = session
        .client()
        .get(session.url(kind.page_path()))
        .send()
        .await?;
    let status = response.status();
    let body = response.text().await?;
    if !status.is_success() {
        return Err(classify_status(status, &body));
    }
    extract_verification_token(&body).ok_or_else(|| {
        Error::backend(
            Some(status.as_u16()),
            "landing page has no __RequestVerificationToken",
        )
    })
}

/// Pull the hidden anti-forgery field out of a WebForms page.
fn extract_verification_token(html: &str) -> Option<String> {
    let document = Html::parse_document(html);
    let selector = Selector::parse("input[name=\"__RequestVerificationToken\"]").ok()?;
    document
        .select(&selector)
        .next()
        .and_then(|input| input.value().attr("value"))
        .filter(|v| !v.is_empty())
        .map(ToString::to_string)
}

fn build_form(query: &SayistayQuery, token: &str) -> Vec<(String, String)> {
    let mut form = base_datatables_params(query.start, query.length);
    let start_date = query.start_date.as_deref().map(dates::to_slashed);
    let end_date = query.end_date.as_deref().map(dates::to_slashed);

    match query.kind {
        DecisionKind::GenelKurul => {
            datatables_columns(
                &[
                    ("KARARNO", false),
                    ("KARARNO", true),
                    ("KARARTARIH", true),
                    ("KARAROZETI", false),
                    ("", false),
                ],
                &mut form,
            );
            form.push(("order[0][column]".to_string(), "2".to_string()));
            form.push(("order[0][dir]".to_string(), "desc".to_string()));
            form.push((
                "KararlarGenelKurulAra.KARARNO".to_string(),
                query.decision_no.clone().unwrap_or_default(),
            ));
            form.push((
                "__Invariant[]".to_string(),
                "KararlarGenelKurulAra.KARARNO".to_string(),
            ));
            form.push((
                "KararlarGenelKurulAra.KARARTARIHBaslangic".to_string(),
                start_date.unwrap_or_else(|| "Başlangıç Tarihi".to_string()),
            ));
            form.push((
                "KararlarGenelKurulAra.KARARTARIHBitis".to_string(),
                end_date.unwrap_or_else(|| "Bitiş Tarihi".to_string()),
            ));
            form.push((
                "KararlarGenelKurulAra.KARARTAMAMI".to_string(),
                query.phrase.clone().unwrap_or_default(),
            ));
        },
        DecisionKind::TemyizKurulu => {
            datatables_columns(
                &[
                    ("TEMYIZTUTANAKTARIHI", false),
                    ("TEMYIZTUTANAKTARIHI", true),
                    ("ILAMDAIRESI", true),
                    ("TEMYIZKARAR", false),
                    ("", false),
                ],
                &mut form,
            );
            form.push(("order[0][column]".to_string(), "1".to_string()));
            form.push(("order[0][dir]".to_string(), "desc".to_string()));
            form.push((
                "KararlarTemyizAra.ILAMDAIRESI".to_string(),
                query.chamber.clone().unwrap_or_else(|| "Tüm Daireler".to_string()),
            ));
            form.push((
                "KararlarTemyizAra.YILI".to_string(),
                query.year.clone().unwrap_or_default(),
            ));
            form.push((
                "KararlarTemyizAra.KARARTRHBaslangic".to_string(),
                start_date.unwrap_or_default(),
            ));
            form.push((
                "KararlarTemyizAra.KARARTRHBitis".to_string(),
                end_date.unwrap_or_default(),
            ));
            form.push((
                "KararlarTemyizAra.TEMYIZTUTANAKNO".to_string(),
                query.decision_no.clone().unwrap_or_default(),
            ));
            form.push((
                "__Invariant".to_string(),
                "KararlarTemyizAra.TEMYIZTUTANAKNO".to_string(),
            ));
            form.push((
                "KararlarTemyizAra.TEMYIZKARAR".to_string(),
                query.phrase.clone().unwrap_or_default(),
            ));
        },
        DecisionKind::Daire => {
            datatables_columns(
                &[
                    ("YARGILAMADAIRESI", false),
                    ("KARARTRH", true),
                    ("KARARNO", true),
                    ("YARGILAMADAIRESI", true),
                    ("WEBKARARMETNI", false),
                ],
                &mut form,
            );
            form.push(("order[0][column]".to_string(), "2".to_string()));
            form.push(("order[0][dir]".to_string(), "desc".to_string()));
            form.push((
                "KararlarDaireAra.YARGILAMADAIRESI".to_string(),
                query.chamber.clone().unwrap_or_else(|| "Tüm Daireler".to_string()),
            ));
            form.push((
                "KararlarDaireAra.KARARTRHBaslangic".to_string(),
                start_date.unwrap_or_default(),
            ));
            form.push((
                "KararlarDaireAra.KARARTRHBitis".to_string(),
                end_date.unwrap_or_default(),
            ));
            form.push((
                "KararlarDaireAra.ILAMNO".to_string(),
                query.decision_no.clone().unwrap_or_default(),
            ));
            form.push((
                "KararlarDaireAra.HESAPYILI".to_string(),
                query.year.clone().unwrap_or_default(),
            ));
            form.push((
                "KararlarDaireAra.WEBKARARMETNI".to_string(),
                query.phrase.clone().unwrap_or_default(),
            ));
        },
    }

    form.push(("__RequestVerificationToken".to_string(), token.to_string()));
    form
}

fn row_to_entry(kind: DecisionKind, row: &Value) -> Option<SearchEntry> {
    let id = match row.get("Id") {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        _ => return None,
    };
    let text = |key: &str| -> Option<String> {
        row.get(key)
            .and_then(Value::as_str)
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
    };

    let handle = DocumentHandle::new(SourceId::Sayistay, kind.key(), id);
    let entry = match kind {
        DecisionKind::GenelKurul => SearchEntry::with_assembled_title(&handle)
            .decision_number(text("KARARNO"))
            .decision_date(text("KARARTARIH"))
            .display("kararOzeti", text("KARAROZETI")),
        DecisionKind::TemyizKurulu => SearchEntry::with_assembled_title(&handle)
            .chamber(text("ILAMDAIRESI"))
            .decision_date(text("TEMYIZTUTANAKTARIHI"))
            .display("temyizKarar", text("TEMYIZKARAR")),
        DecisionKind::Daire => SearchEntry::with_assembled_title(&handle)
            .chamber(text("YARGILAMADAIRESI"))
            .decision_number(text("KARARNO"))
            .decision_date(text("KARARTRH"))
            .display("hesapYili", text("HESAPYILI"))
            .display("webKararKonusu", text("WEBKARARKONUSU")),
    };
    Some(entry.build())
}

#[async_trait]
impl Adapter for SayistayAdapter {
    fn source(&self) -> SourceId {
        SourceId::Sayistay
    }

    async fn fetch(&self, handle: &DocumentHandle, chunk_index: u32) -> Result<NormalizedDocument> {
        expect_source(handle, SourceId::Sayistay)?;
        let kind = DecisionKind::parse(&handle.subtype).ok_or_else(|| {
            Error::invalid_argument(
                "document_handle",
                format!("unknown sayistay subtype `{}`", handle.subtype),
            )
        })?;

        let session = self.sessions.borrow(SourceId::Sayistay).await?;
        let source_url = session.url(&format!("{}/Detay/{}/", kind.page_path(), handle.native_id));
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
        let query = SayistayQuery {
            kind: DecisionKind::GenelKurul,
            phrase: Some("karar".to_string()),
            decision_no: None,
            year: None,
            chamber: None,
            start_date: None,
            end_date: None,
            start: 0,
            length: 1,
        };
        match self.search(&query).await {
            Ok(page) if page.total_records.unwrap_or(0) > 0 => {
                HealthSample::healthy(SourceId::Sayistay, elapsed_ms(start))
            },
            Ok(_) => HealthSample::unhealthy(
                SourceId::Sayistay,
                elapsed_ms(start),
                "trivial query returned zero records",
            ),
            Err(e) => HealthSample::unhealthy(SourceId::Sayistay, elapsed_ms(start), e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GatewayConfig;
    use serde_json::json;
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const LANDING: &str = r#"
        <html><body><form>
        <input name="__RequestVerificationToken" type="hidden" value="tok-abc123" />
        </form></body></html>
    "#;

    async fn adapter_for(server: &MockServer) -> SayistayAdapter {
        let pool = SessionPool::new(
            vec![profile().rebased(server.uri())],
            &GatewayConfig::for_tests(),
        );
        SayistayAdapter::new(pool)
    }

    fn genel_kurul_rows() -> Value {
        json!({
            "draw": 1,
            "recordsTotal": 9,
            "recordsFiltered": 9,
            "data": [
                {
                    "Id": 5312,
                    "KARARNO": "5415/1",
                    "KARARTARIH": "14.02.2022",
                    "KARAROZETI": "Harcama yetkisinin devri hakkında"
                }
            ]
        })
    }

    fn query(kind: DecisionKind) -> SayistayQuery {
        SayistayQuery {
            kind,
            phrase: Some("harcama".to_string()),
            decision_no: None,
            year: None,
            chamber: None,
            start_date: None,
            end_date: None,
            start: 0,
            length: 10,
        }
    }

    #[tokio::test]
    async fn first_search_warms_then_posts_token() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/KararlarGenelKurul"))
            .respond_with(ResponseTemplate::new(200).set_body_string(LANDING))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/KararlarGenelKurul/DataTablesList"))
            .and(body_string_contains("__RequestVerificationToken=tok-abc123"))
            .respond_with(ResponseTemplate::new(200).set_body_json(genel_kurul_rows()))
            .expect(2)
            .mount(&server)
            .await;

        let adapter = adapter_for(&server).await;
        let page = adapter.search(&query(DecisionKind::GenelKurul)).await.unwrap();
        assert_eq!(page.total_records, Some(9));
        assert_eq!(page.subtype, "genel_kurul");
        let handle = DocumentHandle::parse(&page.entries[0].handle).unwrap();
        assert_eq!(handle.native_id, "5312");

        // Second call reuses the cached token: still one landing fetch.
        adapter.search(&query(DecisionKind::GenelKurul)).await.unwrap();
    }

    #[tokio::test]
    async fn auth_failure_rewarmed_once() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/KararlarDaire"))
            .respond_with(ResponseTemplate::new(200).set_body_string(LANDING))
            .expect(2)
            .mount(&server)
            .await;
        // First POST rejects the token, second succeeds.
        Mock::given(method("POST"))
            .and(path("/KararlarDaire/DataTablesList"))
            .respond_with(ResponseTemplate::new(403))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/KararlarDaire/DataTablesList"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "draw": 1, "recordsTotal": 1, "recordsFiltered": 1,
                "data": [{ "Id": "77", "YARGILAMADAIRESI": "1. Daire", "KARARTRH": "2021", "KARARNO": "10", "WEBKARARMETNI": "metin" }]
            })))
            .mount(&server)
            .await;

        let adapter = adapter_for(&server).await;
        let page = adapter.search(&query(DecisionKind::Daire)).await.unwrap();
        assert_eq!(page.entries.len(), 1);
    }

    #[tokio::test]
    async fn persistent_auth_failure_is_backend_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/KararlarTemyiz"))
            .respond_with(ResponseTemplate::new(200).set_body_string(LANDING))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/KararlarTemyiz/DataTablesList"))
            .respond_with(ResponseTemplate::new(403))
            .mount(&server)
            .await;

        let adapter = adapter_for(&server).await;
        let err = adapter.search(&query(DecisionKind::TemyizKurulu)).await.unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::BackendFailure);
    }

    #[tokio::test]
    async fn subtypes_use_distinct_endpoints_and_tokens() {
        let server = MockServer::start().await;
        for (page_path, token) in [
            ("/KararlarGenelKurul", "tok-gk"),
            ("/KararlarTemyiz", "tok-tk"),
            ("/KararlarDaire", "tok-dr"),
        ] {
            Mock::given(method("GET"))
                .and(path(page_path))
                .respond_with(ResponseTemplate::new(200).set_body_string(format!(
                    "<input name=\"__RequestVerificationToken\" value=\"{token}\" />"
                )))
                .expect(1)
                .mount(&server)
                .await;
            Mock::given(method("POST"))
                .and(path(format!("{page_path}/DataTablesList")))
                .and(body_string_contains(format!(
                    "__RequestVerificationToken={token}"
                )))
                .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                    "draw": 1, "recordsTotal": 0, "recordsFiltered": 0, "data": []
                })))
                .expect(1)
                .mount(&server)
                .await;
        }

        let adapter = adapter_for(&server).await;
        for kind in [DecisionKind::GenelKurul, DecisionKind::TemyizKurulu, DecisionKind::Daire] {
            adapter.search(&query(kind)).await.unwrap();
        }
    }

    #[tokio::test]
    async fn unfiltered_query_is_rejected_locally() {
        let server = MockServer::start().await;
        let adapter = adapter_for(&server).await;
        let bare = SayistayQuery {
            kind: DecisionKind::GenelKurul,
            phrase: None,
            decision_no: None,
            year: None,
            chamber: None,
            start_date: None,
            end_date: None,
            start: 0,
            length: 10,
        };
        let err = adapter.search(&bare).await.unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::InvalidArgument);
        assert!(server.received_requests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn fetch_builds_detail_url_per_subtype() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/KararlarGenelKurul/Detay/5312/"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                "<html><body><p>Genel kurul kararı tam metni</p></body></html>",
            ))
            .mount(&server)
            .await;

        let adapter = adapter_for(&server).await;
        let handle = DocumentHandle::new(SourceId::Sayistay, "genel_kurul", "5312");
        let doc = adapter.fetch(&handle, 1).await.unwrap();
        assert!(doc.chunk_text.contains("tam metni"));
        assert!(doc.source_url.contains("/KararlarGenelKurul/Detay/5312/"));
    }

    #[test]
    fn token_extraction() {
        assert_eq!(
            extract_verification_token(LANDING).as_deref(),
            Some("tok-abc123")
        );
        assert!(extract_verification_token("<html><body/></html>").is_none());
    }
}
