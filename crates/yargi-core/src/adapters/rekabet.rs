//! Rekabet Kurumu (competition authority) adapter.
//!
//! The public decision search is a server-rendered page: filters travel as
//! query parameters (decision types as the site's dropdown GUIDs) and the
//! results arrive as an HTML table. A decision document is reached through
//! its landing page, which links the actual PDF; the PDF feeds the
//! normalizer's PDF path.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use scraper::{Html, Selector};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::health::HealthSample;
use crate::normalize::{ConverterProfile, Normalizer};
use crate::session::{SessionPool, SourceProfile, TlsPolicy};
use crate::types::{ContainerKind, DocumentHandle, NormalizedDocument, SearchEntry, SearchPage, SourceId};

use super::{Adapter, classify_status, elapsed_ms, expect_source, paginate};

const SEARCH_PATH: &str = "/tr/Kararlar";
const DOCUMENT_PATH: &str = "/Karar";

/// Session profile for the authority's public site.
pub fn profile() -> SourceProfile {
    SourceProfile {
        source: SourceId::Rekabet,
        base_url: "https://www.rekabet.gov.tr".to_string(),
        referer: None,
        origin: None,
        extra_headers: &[],
        tls: TlsPolicy::Strict,
        default_timeout: Duration::from_secs(60),
        max_concurrency: 4,
    }
}

/// Decision-type filter; values are the GUIDs behind the site's dropdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum CompetitionDecisionType {
    /// All decision types.
    #[default]
    All,
    /// Merger and acquisition control.
    MergerAcquisition,
    /// Negative clearance and exemption.
    NegativeClearanceExemption,
    /// Privatization reviews.
    Privatization,
    /// Competition infringement.
    Infringement,
    /// Everything else.
    Other,
}

impl CompetitionDecisionType {
    /// Dropdown GUID; empty for `All`.
    const fn guid(self) -> &'static str {
        match self {
            Self::All => "",
            Self::MergerAcquisition => "2fff0979-9f9d-42d7-8c2e-a30705889542",
            Self::NegativeClearanceExemption => "95ccd210-5304-49c5-b9e0-8ee53c50d4e8",
            Self::Privatization => "e1f14505-842b-4af5-95d1-312d6de1a541",
            Self::Infringement => "720614bf-efd1-4dca-9785-b98eb65f2677",
            Self::Other => "dda8feaf-c919-405c-9da1-823f22b45ad9",
        }
    }
}

/// Typed search contract for the authority.
#[derive(Debug, Clone, Default)]
pub struct RekabetQuery {
    /// Title words (`sayfaAdi`).
    pub title: Option<String>,
    /// Full-text search within decision PDFs (`PdfText`).
    pub pdf_text: Option<String>,
    /// Decision-type filter.
    pub decision_type: CompetitionDecisionType,
    /// Decision number filter.
    pub decision_no: Option<String>,
    /// Decision date filter (site format).
    pub decision_date: Option<String>,
    /// Publication date filter (site format).
    pub publication_date: Option<String>,
    /// 1-indexed page.
    pub page_index: u32,
}

impl RekabetQuery {
    /// Validate before any network call.
    pub fn validate(&self) -> Result<()> {
        if self.page_index < 1 {
            return Err(Error::invalid_argument("page_index", "pages are 1-indexed"));
        }
        let any = self.title.is_some()
            || self.pdf_text.is_some()
            || self.decision_type != CompetitionDecisionType::All
            || self.decision_no.is_some()
            || self.decision_date.is_some()
            || self.publication_date.is_some();
        if !any {
            return Err(Error::invalid_argument(
                "pdf_text",
                "at least one search criterion is required",
            ));
        }
        Ok(())
    }
}

/// Competition-authority adapter over the shared session pool.
pub struct RekabetAdapter {
    sessions: SessionPool,
    normalizer: Normalizer,
}

impl RekabetAdapter {
    /// Build against a ready session pool.
    pub fn new(sessions: SessionPool) -> Self {
        Self {
            sessions,
            // Decisions are PDFs; the landing pages are plain HTML.
            normalizer: Normalizer::new().with_profile(ConverterProfile::Plain),
        }
    }

    /// Run a search against the server-rendered results page.
    pub async fn search(&self, query: &RekabetQuery) -> Result<SearchPage> {
        query.validate()?;

        let session = self.sessions.borrow(SourceId::Rekabet).await?;
        let response = session
            .client()
            .get(session.url(SEARCH_PATH))
            .query(&[
                ("sayfaAdi", query.title.clone().unwrap_or_default()),
                ("YayinlanmaTarihi", query.publication_date.clone().unwrap_or_default()),
                ("PdfText", query.pdf_text.clone().unwrap_or_default()),
                ("KararTuruID", query.decision_type.guid().to_string()),
                ("KararSayisi", query.decision_no.clone().unwrap_or_default()),
                ("KararTarihi", query.decision_date.clone().unwrap_or_default()),
                ("page", query.page_index.to_string()),
            ])
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(classify_status(status, &body));
        }

        let entries = parse_results(&body);
        let page_size = u32::try_from(entries.len().max(1)).unwrap_or(u32::MAX).min(100);
        Ok(SearchPage {
            source: SourceId::Rekabet,
            subtype: String::new(),
            // The site paginates without exposing a reliable total.
            total_records: None,
            page_index: query.page_index,
            page_size,
            entries,
        })
    }
}

fn parse_results(html: &str) -> Vec<SearchEntry> {
    let document = Html::parse_document(html);
    let mut entries = Vec::new();

    let (Ok(row_sel), Ok(cell_sel), Ok(link_sel)) = (
        Selector::parse("table tbody tr"),
        Selector::parse("td"),
        Selector::parse("a[href*=\"kararId=\"]"),
    ) else {
        return entries;
    };

    for row in document.select(&row_sel) {
        let cells: Vec<_> = row.select(&cell_sel).collect();
        if cells.len() < 5 {
            continue;
        }
        let Some(href) = row
            .select(&link_sel)
            .next()
            .and_then(|a| a.value().attr("href"))
        else {
            continue;
        };
        let Some(karar_id) = href.split("kararId=").nth(1).map(|s| {
            s.split('&').next().unwrap_or(s).to_string()
        }) else {
            continue;
        };

        let text_of = |i: usize| -> Option<String> {
            cells
                .get(i)
                .map(|c| c.text().collect::<String>().trim().to_string())
                .filter(|s| !s.is_empty())
        };

        let handle = DocumentHandle::new(SourceId::Rekabet, "", karar_id);
        entries.push(
            SearchEntry::with_assembled_title(&handle)
                .decision_number(text_of(1))
                .decision_date(text_of(2))
                .display("yayinlanmaTarihi", text_of(0))
                .display("kararTuru", text_of(3))
                .display("baslik", text_of(4))
                .build(),
        );
    }

    entries
}

/// Title and PDF link scraped from a decision landing page.
fn parse_landing(html: &str) -> (Option<String>, Option<String>) {
    let document = Html::parse_document(html);
    let title = Selector::parse("title")
        .ok()
        .and_then(|sel| document.select(&sel).next())
        .map(|t| t.text().collect::<String>().trim().to_string())
        .filter(|t| !t.is_empty());
    let pdf = Selector::parse("a[href]")
        .ok()
        .and_then(|sel| {
            document
                .select(&sel)
                .filter_map(|a| a.value().attr("href"))
                .find(|href| href.to_ascii_lowercase().ends_with(".pdf") || href.contains("/Dosya/"))
                .map(ToString::to_string)
        });
    (title, pdf)
}

#[async_trait]
impl Adapter for RekabetAdapter {
    fn source(&self) -> SourceId {
        SourceId::Rekabet
    }

    async fn fetch(&self, handle: &DocumentHandle, chunk_index: u32) -> Result<NormalizedDocument> {
        expect_source(handle, SourceId::Rekabet)?;

        let session = self.sessions.borrow(SourceId::Rekabet).await?;
        let landing_url = session.url(&format!("{DOCUMENT_PATH}?kararId={}", handle.native_id));
        let response = session.client().get(&landing_url).send().await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(classify_status(status, &body));
        }

        let (_title, pdf_href) = parse_landing(&body);
        let chunked = if let Some(href) = pdf_href {
            let pdf_url = session.url(&href);
            let pdf_response = session.client().get(&pdf_url).send().await?;
            let pdf_status = pdf_response.status();
            if !pdf_status.is_success() {
                let excerpt = pdf_response.text().await.unwrap_or_default();
                return Err(classify_status(pdf_status, &excerpt));
            }
            let bytes = pdf_response.bytes().await?;
            self.normalizer.normalize(&bytes, ContainerKind::Pdf)?
        } else {
            // No PDF link on the landing page; fall back to the page body
            // itself. Loud, because the PDF link disappearing usually means
            // the site changed shape.
            tracing::warn!(karar_id = %handle.native_id, "no PDF link on landing page, normalizing the page itself");
            self.normalizer.normalize(body.as_bytes(), ContainerKind::HtmlPage)?
        };

        Ok(paginate(handle, landing_url, &chunked, chunk_index))
    }

    async fn health(&self) -> HealthSample {
        let start = Instant::now();
        let query = RekabetQuery {
            pdf_text: Some("rekabet".to_string()),
            page_index: 1,
            ..Default::default()
        };
        match self.search(&query).await {
            Ok(page) if !page.entries.is_empty() => {
                HealthSample::healthy(SourceId::Rekabet, elapsed_ms(start))
            },
            Ok(_) => HealthSample::unhealthy(
                SourceId::Rekabet,
                elapsed_ms(start),
                "trivial query returned no rows",
            ),
            Err(e) => HealthSample::unhealthy(SourceId::Rekabet, elapsed_ms(start), e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GatewayConfig;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const RESULTS_HTML: &str = r#"
        <html><body>
        <table><tbody>
            <tr>
                <td>02.05.2024</td>
                <td>24-20/450-195</td>
                <td>25.04.2024</td>
                <td>Birleşme ve Devralma</td>
                <td><a href="/Karar?kararId=aaaa-bbbb-cccc">Devralma işlemi hakkında</a></td>
            </tr>
        </tbody></table>
        </body></html>
    "#;

    async fn adapter_for(server: &MockServer) -> RekabetAdapter {
        let pool = SessionPool::new(
            vec![profile().rebased(server.uri())],
            &GatewayConfig::for_tests(),
        );
        RekabetAdapter::new(pool)
    }

    #[tokio::test]
    async fn search_sends_guid_and_parses_rows() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/tr/Kararlar"))
            .and(query_param("KararTuruID", "2fff0979-9f9d-42d7-8c2e-a30705889542"))
            .and(query_param("page", "1"))
            .respond_with(ResponseTemplate::new(200).set_body_string(RESULTS_HTML))
            .mount(&server)
            .await;

        let adapter = adapter_for(&server).await;
        let page = adapter
            .search(&RekabetQuery {
                pdf_text: Some("devralma".to_string()),
                decision_type: CompetitionDecisionType::MergerAcquisition,
                page_index: 1,
                ..Default::default()
            })
            .await
            .unwrap();

        assert_eq!(page.total_records, None);
        assert_eq!(page.entries.len(), 1);
        let entry = &page.entries[0];
        assert_eq!(entry.decision_number.as_deref(), Some("24-20/450-195"));
        let handle = DocumentHandle::parse(&entry.handle).unwrap();
        assert_eq!(handle.native_id, "aaaa-bbbb-cccc");
    }

    #[tokio::test]
    async fn fetch_follows_landing_to_pdf() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/Karar"))
            .and(query_param("kararId", "aaaa-bbbb-cccc"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"<html><head><title>24-20/450-195</title></head>
                   <body><a href="/Dosya/karar-450.pdf">Kararı indir</a></body></html>"#,
            ))
            .mount(&server)
            .await;
        // An invalid PDF body exercises the ParseFailure path.
        Mock::given(method("GET"))
            .and(path("/Dosya/karar-450.pdf"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"not a pdf".to_vec()))
            .mount(&server)
            .await;

        let adapter = adapter_for(&server).await;
        let handle = DocumentHandle::new(SourceId::Rekabet, "", "aaaa-bbbb-cccc");
        let err = adapter.fetch(&handle, 1).await.unwrap_err();
        match err {
            Error::ParseFailure { container, .. } => assert_eq!(container, ContainerKind::Pdf),
            other => unreachable!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn fetch_without_pdf_link_normalizes_landing() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/Karar"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                "<html><body><h1>Karar metni</h1><p>gerekçe paragrafı</p></body></html>",
            ))
            .mount(&server)
            .await;

        let adapter = adapter_for(&server).await;
        let handle = DocumentHandle::new(SourceId::Rekabet, "", "dddd");
        let doc = adapter.fetch(&handle, 1).await.unwrap();
        assert!(doc.chunk_text.contains("gerekçe"));
    }

    #[tokio::test]
    async fn criterionless_query_rejected_locally() {
        let server = MockServer::start().await;
        let adapter = adapter_for(&server).await;
        let err = adapter
            .search(&RekabetQuery {
                page_index: 1,
                ..Default::default()
            })
            .await
            .unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::InvalidArgument);
        assert!(server.received_requests().await.unwrap().is_empty());
    }
}
