//! Uyuşmazlık Mahkemesi (jurisdictional-dispute court) adapter.
//!
//! The search endpoint takes URL-encoded form data and answers with an HTML
//! results table; section and dispute-type filters travel as the form GUIDs
//! behind the site's dropdowns. Documents are fetched by the full URL the
//! results table links to.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use scraper::{Html, Selector};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::health::HealthSample;
use crate::normalize::{ConverterProfile, Normalizer};
use crate::session::{SessionPool, SourceProfile, TlsPolicy};
use crate::types::{DocumentHandle, NormalizedDocument, SearchEntry, SearchPage, SourceId, dates};

use super::{Adapter, classify_status, elapsed_ms, expect_source, paginate};

const SEARCH_ENDPOINT: &str = "/Arama/Search";

/// Session profile; the endpoint checks `Origin` and `X-Requested-With`.
pub fn profile() -> SourceProfile {
    SourceProfile {
        source: SourceId::Uyusmazlik,
        base_url: "https://kararlar.uyusmazlik.gov.tr".to_string(),
        referer: Some("https://kararlar.uyusmazlik.gov.tr/".to_string()),
        origin: Some("https://kararlar.uyusmazlik.gov.tr".to_string()),
        extra_headers: &[("x-requested-with", "XMLHttpRequest")],
        tls: TlsPolicy::InsecureLegacy,
        default_timeout: Duration::from_secs(60),
        max_concurrency: 4,
    }
}

/// Court section filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Section {
    /// No section filter.
    #[default]
    All,
    /// Criminal section.
    Criminal,
    /// General assembly decisions.
    GeneralAssembly,
    /// Civil section.
    Civil,
}

impl Section {
    /// Form GUID behind the section dropdown; empty for `All`.
    const fn form_id(self) -> &'static str {
        match self {
            Self::All => "",
            Self::Criminal => "f6b74320-f2d7-4209-ad6e-c6df180d4e7c",
            Self::GeneralAssembly => "e4ca658d-a75a-4719-b866-b2d2f1c3b1d9",
            Self::Civil => "96b26fc4-ef8e-4a4f-a9cc-a3de89952aa1",
        }
    }
}

/// Dispute-type filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum DisputeType {
    /// No dispute-type filter.
    #[default]
    All,
    /// Jurisdictional dispute (görev uyuşmazlığı).
    Jurisdiction,
    /// Judgment dispute (hüküm uyuşmazlığı).
    Judgment,
}

impl DisputeType {
    const fn form_id(self) -> &'static str {
        match self {
            Self::All => "",
            Self::Jurisdiction => "7b1e2cd3-8f09-418a-921c-bbe501e1740c",
            Self::Judgment => "19b88402-172b-4c1d-8339-595c942a89f5",
        }
    }
}

/// Typed search contract for the dispute court.
#[derive(Debug, Clone, Default)]
pub struct UyusmazlikQuery {
    /// Free-text search over decision content (`Icerik`).
    pub phrase: String,
    /// Section filter.
    pub section: Section,
    /// Dispute-type filter.
    pub dispute_type: DisputeType,
    /// Case-number year.
    pub case_year: Option<String>,
    /// Case sequence number.
    pub case_no: Option<String>,
    /// Decision-number year.
    pub decision_year: Option<String>,
    /// Decision sequence number.
    pub decision_no: Option<String>,
    /// Statute number filter (`KanunNo`).
    pub statute_no: Option<String>,
    /// Inclusive start date, ISO `YYYY-MM-DD`.
    pub start_date: Option<String>,
    /// Inclusive end date, ISO `YYYY-MM-DD`.
    pub end_date: Option<String>,
}

impl UyusmazlikQuery {
    /// Validate before any network call.
    pub fn validate(&self) -> Result<()> {
        let any_filter = self.section != Section::All
            || self.dispute_type != DisputeType::All
            || self.case_year.is_some()
            || self.decision_year.is_some()
            || self.statute_no.is_some()
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

    fn form_pairs(&self) -> Vec<(&'static str, String)> {
        vec![
            ("BolumId", self.section.form_id().to_string()),
            ("UyusmazlikId", self.dispute_type.form_id().to_string()),
            ("EsasYil", self.case_year.clone().unwrap_or_default()),
            ("EsasSayisi", self.case_no.clone().unwrap_or_default()),
            ("KararYil", self.decision_year.clone().unwrap_or_default()),
            ("KararSayisi", self.decision_no.clone().unwrap_or_default()),
            ("KanunNo", self.statute_no.clone().unwrap_or_default()),
            (
                "KararDateBegin",
                self.start_date.as_deref().map(dates::to_slashed).unwrap_or_default(),
            ),
            (
                "KararDateEnd",
                self.end_date.as_deref().map(dates::to_slashed).unwrap_or_default(),
            ),
            ("ResmiGazeteSayi", String::new()),
            ("ResmiGazeteDate", String::new()),
            ("Icerik", self.phrase.clone()),
            ("Tumce", String::new()),
            ("WildCard", String::new()),
            ("Hepsi", String::new()),
            ("Herhangibirisi", String::new()),
            ("NotHepsi", String::new()),
        ]
    }
}

/// Dispute-court adapter over the shared session pool.
pub struct UyusmazlikAdapter {
    sessions: SessionPool,
    normalizer: Normalizer,
}

impl UyusmazlikAdapter {
    /// Build against a ready session pool.
    pub fn new(sessions: SessionPool) -> Self {
        Self {
            sessions,
            normalizer: Normalizer::new().with_profile(ConverterProfile::Plain),
        }
    }

    /// Run a search and parse the HTML results table.
    ///
    /// The backend does not paginate this endpoint; it returns one table.
    pub async fn search(&self, query: &UyusmazlikQuery) -> Result<SearchPage> {
        query.validate()?;

        let session = self.sessions.borrow(SourceId::Uyusmazlik).await?;
        let response = session
            .client()
            .post(session.url(SEARCH_ENDPOINT))
            .form(&query.form_pairs())
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(classify_status(status, &body));
        }

        let (total, entries) = parse_results_table(&body);
        let page_size = u32::try_from(entries.len().max(1)).unwrap_or(u32::MAX).min(100);
        Ok(SearchPage {
            source: SourceId::Uyusmazlik,
            subtype: String::new(),
            total_records: total,
            page_index: 1,
            page_size,
            entries,
        })
    }
}

/// Pull the record count and the decision rows out of the results HTML.
fn parse_results_table(html: &str) -> (Option<u64>, Vec<SearchEntry>) {
    let document = Html::parse_document(html);

    let total = Selector::parse("div.pull-right.label.label-important")
        .ok()
        .and_then(|sel| {
            document.select(&sel).next().and_then(|node| {
                let text = node.text().collect::<String>();
                let digits: String = text
                    .trim()
                    .chars()
                    .take_while(char::is_ascii_digit)
                    .collect();
                digits.parse::<u64>().ok()
            })
        });

    let mut entries = Vec::new();
    let (Ok(table_sel), Ok(row_sel), Ok(cell_sel), Ok(link_sel)) = (
        Selector::parse("table.table-hover"),
        Selector::parse("tr"),
        Selector::parse("td"),
        Selector::parse("a[href]"),
    ) else {
        return (total, entries);
    };

    let Some(table) = document.select(&table_sel).next() else {
        return (total, entries);
    };

    for row in table.select(&row_sel).skip(1) {
        let cells: Vec<_> = row.select(&cell_sel).collect();
        if cells.len() < 5 {
            continue;
        }
        let Some(href) = cells[0]
            .select(&link_sel)
            .next()
            .and_then(|a| a.value().attr("href"))
        else {
            continue;
        };

        let text_of = |i: usize| -> String {
            cells
                .get(i)
                .map(|c| c.text().collect::<String>().trim().to_string())
                .unwrap_or_default()
        };

        let pdf_url = cells.get(5).and_then(|cell| {
            cell.select(&link_sel)
                .filter_map(|a| a.value().attr("href"))
                .find(|href| href.to_ascii_lowercase().ends_with(".pdf"))
                .map(ToString::to_string)
        });

        let handle = DocumentHandle::new(SourceId::Uyusmazlik, "", href.to_string());
        let entry = SearchEntry::with_assembled_title(&handle)
            .chamber(Some(text_of(2)))
            .case_number(Some(text_of(1)))
            .decision_number(Some(text_of(0)))
            .display("uyusmazlikKonusu", Some(text_of(3)))
            .display("kararSonucu", Some(text_of(4)))
            .display("pdfUrl", pdf_url)
            .build();
        entries.push(entry);
    }

    (total, entries)
}

#[async_trait]
impl Adapter for UyusmazlikAdapter {
    fn source(&self) -> SourceId {
        SourceId::Uyusmazlik
    }

    async fn fetch(&self, handle: &DocumentHandle, chunk_index: u32) -> Result<NormalizedDocument> {
        expect_source(handle, SourceId::Uyusmazlik)?;

        let session = self.sessions.borrow(SourceId::Uyusmazlik).await?;
        let source_url = session.url(&handle.native_id);
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
        let query = UyusmazlikQuery {
            phrase: "uyuşmazlık".to_string(),
            ..Default::default()
        };
        match self.search(&query).await {
            Ok(page) if !page.entries.is_empty() => {
                HealthSample::healthy(SourceId::Uyusmazlik, elapsed_ms(start))
            },
            Ok(_) => HealthSample::unhealthy(
                SourceId::Uyusmazlik,
                elapsed_ms(start),
                "trivial query returned no rows",
            ),
            Err(e) => {
                HealthSample::unhealthy(SourceId::Uyusmazlik, elapsed_ms(start), e.to_string())
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GatewayConfig;
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const RESULTS_HTML: &str = r#"
        <html><body>
        <div class="pull-right label label-important">27 adet kayıt bulundu</div>
        <table class="table-hover">
            <tr><th>Karar</th><th>Esas</th><th>Bölüm</th><th>Konu</th><th>Sonuç</th></tr>
            <tr>
                <td><a href="/Karar/Goster/41722">2024/55</a></td>
                <td>2024/12</td>
                <td>Hukuk Bölümü</td>
                <td>Görev uyuşmazlığı</td>
                <td>Adli yargı görevli</td>
                <td><a href="/pdf/41722.pdf">PDF</a></td>
            </tr>
        </table>
        </body></html>
    "#;

    async fn adapter_for(server: &MockServer) -> UyusmazlikAdapter {
        let pool = SessionPool::new(
            vec![profile().rebased(server.uri())],
            &GatewayConfig::for_tests(),
        );
        UyusmazlikAdapter::new(pool)
    }

    #[tokio::test]
    async fn search_parses_rows_and_total() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/Arama/Search"))
            .and(body_string_contains("Icerik=g%C3%B6rev"))
            .respond_with(ResponseTemplate::new(200).set_body_string(RESULTS_HTML))
            .mount(&server)
            .await;

        let adapter = adapter_for(&server).await;
        let page = adapter
            .search(&UyusmazlikQuery {
                phrase: "görev".to_string(),
                ..Default::default()
            })
            .await
            .unwrap();

        assert_eq!(page.total_records, Some(27));
        assert_eq!(page.entries.len(), 1);
        let entry = &page.entries[0];
        assert_eq!(entry.decision_number.as_deref(), Some("2024/55"));
        assert_eq!(entry.chamber.as_deref(), Some("Hukuk Bölümü"));

        let handle = DocumentHandle::parse(&entry.handle).unwrap();
        assert_eq!(handle.native_id, "/Karar/Goster/41722");
        assert!(entry
            .display_fields
            .iter()
            .any(|(k, v)| k == "pdfUrl" && v == "/pdf/41722.pdf"));
    }

    #[tokio::test]
    async fn section_filter_sends_form_guid() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/Arama/Search"))
            .and(body_string_contains("BolumId=96b26fc4-ef8e-4a4f-a9cc-a3de89952aa1"))
            .respond_with(ResponseTemplate::new(200).set_body_string(RESULTS_HTML))
            .mount(&server)
            .await;

        let adapter = adapter_for(&server).await;
        adapter
            .search(&UyusmazlikQuery {
                phrase: "görev".to_string(),
                section: Section::Civil,
                ..Default::default()
            })
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn fetch_follows_handle_url() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/Karar/Goster/41722"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                "<html><body><h3>UYUŞMAZLIK MAHKEMESİ</h3><p>karar gerekçesi</p></body></html>",
            ))
            .mount(&server)
            .await;

        let adapter = adapter_for(&server).await;
        let handle = DocumentHandle::new(SourceId::Uyusmazlik, "", "/Karar/Goster/41722");
        let doc = adapter.fetch(&handle, 1).await.unwrap();
        assert!(doc.chunk_text.contains("karar gerekçesi"));
    }

    #[tokio::test]
    async fn missing_table_means_no_entries() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/Arama/Search"))
            .respond_with(
                ResponseTemplate::new(200).set_body_string("<html><body>hata</body></html>"),
            )
            .mount(&server)
            .await;

        let adapter = adapter_for(&server).await;
        let page = adapter
            .search(&UyusmazlikQuery {
                phrase: "görev".to_string(),
                ..Default::default()
            })
            .await
            .unwrap();
        assert!(page.entries.is_empty());
        assert_eq!(page.total_records, None);
    }

    #[tokio::test]
    async fn bare_query_rejected_locally() {
        let server = MockServer::start().await;
        let adapter = adapter_for(&server).await;
        let err = adapter.search(&UyusmazlikQuery::default()).await.unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::InvalidArgument);
        assert!(server.received_requests().await.unwrap().is_empty());
    }
}
