//! Anayasa Mahkemesi (constitutional court) adapter.
//!
//! Two decision banks behind one adapter: norm-control decisions on the
//! `normkararlarbilgibankasi` subdomain and individual applications on
//! `kararlarbilgibankasi`. Both are server-rendered search pages queried
//! with repeated `KelimeAra[]`-style parameters; documents are the decision
//! pages themselves, which routinely run to hundreds of kilobytes and rely
//! on the chunked pagination.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{Html, Selector};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::health::HealthSample;
use crate::normalize::{ConverterProfile, Normalizer};
use crate::session::{SessionPool, SourceProfile, TlsPolicy};
use crate::types::{DocumentHandle, NormalizedDocument, SearchEntry, SearchPage, SourceId, dates};

use super::{Adapter, check_offset, classify_status, elapsed_ms, expect_source, paginate};

const NORM_BASE: &str = "https://normkararlarbilgibankasi.anayasa.gov.tr";
const BIREYSEL_BASE: &str = "https://kararlarbilgibankasi.anayasa.gov.tr";

static TOTAL_RE: Lazy<Regex> = Lazy::new(compile_total_pattern);

#[allow(clippy::unwrap_used)] // literal pattern, cannot fail
fn compile_total_pattern() -> Regex {
    Regex::new(r"(\d[\d.]*)\s*[Kk]arar").unwrap()
}

/// Session profile; both subdomains share the cookie jar.
pub fn profile() -> SourceProfile {
    SourceProfile {
        source: SourceId::Anayasa,
        base_url: NORM_BASE.to_string(),
        referer: None,
        origin: None,
        extra_headers: &[],
        tls: TlsPolicy::Strict,
        default_timeout: Duration::from_secs(60),
        max_concurrency: 4,
    }
}

/// Decision banks of the court.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ConstitutionalDecisionType {
    /// Abstract/concrete norm control (norm denetimi).
    NormDenetimi,
    /// Individual applications (bireysel başvuru).
    BireyselBasvuru,
}

impl ConstitutionalDecisionType {
    /// Key used for handle subtypes.
    pub const fn key(self) -> &'static str {
        match self {
            Self::NormDenetimi => "norm_denetimi",
            Self::BireyselBasvuru => "bireysel_basvuru",
        }
    }

    /// Path prefix decision links carry in each bank.
    const fn link_prefix(self) -> &'static str {
        match self {
            Self::NormDenetimi => "/ND/",
            Self::BireyselBasvuru => "/BB/",
        }
    }
}

/// Typed search contract spanning both banks.
#[derive(Debug, Clone)]
pub struct AnayasaQuery {
    /// Which decision bank to search.
    pub decision_type: ConstitutionalDecisionType,
    /// Keywords all of which must appear (`KelimeAra[]`).
    pub keywords: Vec<String>,
    /// Keywords any of which may appear (`HerhangiBirKelimeAra[]`).
    pub keywords_any: Vec<String>,
    /// Excluded keywords (`BulunmayanKelimeAra[]`).
    pub keywords_exclude: Vec<String>,
    /// Case registry number (`EsasNo`), norm control only.
    pub case_number: Option<String>,
    /// Decision number (`KararNo`).
    pub decision_number: Option<String>,
    /// Decision date range start, ISO `YYYY-MM-DD`.
    pub start_date: Option<String>,
    /// Decision date range end, ISO `YYYY-MM-DD`.
    pub end_date: Option<String>,
    /// Subject category code, individual applications only.
    pub subject_category: Option<String>,
    /// 1-indexed page.
    pub page_index: u32,
    /// Page size, 1..=100 (the banks serve at most 10 per page).
    pub page_size: u32,
}

impl AnayasaQuery {
    /// Validate before any network call.
    pub fn validate(&self) -> Result<()> {
        check_offset(self.page_index, self.page_size, 10_000)?;
        let any = !self.keywords.is_empty()
            || !self.keywords_any.is_empty()
            || self.case_number.is_some()
            || self.decision_number.is_some()
            || self.start_date.is_some()
            || self.end_date.is_some()
            || self.subject_category.is_some();
        if !any {
            return Err(Error::invalid_argument(
                "keywords",
                "at least one keyword or structured filter is required",
            ));
        }
        for (field, value) in [("start_date", &self.start_date), ("end_date", &self.end_date)] {
            if let Some(v) = value {
                dates::validate_iso(field, v)?;
            }
        }
        Ok(())
    }

    fn query_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = Vec::new();
        for k in &self.keywords {
            pairs.push(("KelimeAra[]".to_string(), k.clone()));
        }
        for k in &self.keywords_any {
            pairs.push(("HerhangiBirKelimeAra[]".to_string(), k.clone()));
        }
        for k in &self.keywords_exclude {
            pairs.push(("BulunmayanKelimeAra[]".to_string(), k.clone()));
        }
        if let Some(v) = &self.case_number {
            pairs.push(("EsasNo".to_string(), v.clone()));
        }
        if let Some(v) = &self.decision_number {
            pairs.push(("KararNo".to_string(), v.clone()));
        }
        if let Some(v) = self.start_date.as_deref() {
            pairs.push(("KararTarihiIlk".to_string(), dates::to_slashed(v)));
        }
        if let Some(v) = self.end_date.as_deref() {
            pairs.push(("KararTarihiSon".to_string(), dates::to_slashed(v)));
        }
        if let Some(v) = &self.subject_category {
            pairs.push(("KonuId".to_string(), v.clone()));
        }
        pairs.push(("page".to_string(), self.page_index.to_string()));
        pairs
    }
}

/// Constitutional-court adapter over both decision banks.
pub struct AnayasaAdapter {
    sessions: SessionPool,
    normalizer: Normalizer,
    norm_base: String,
    bireysel_base: String,
}

impl AnayasaAdapter {
    /// Build against a ready session pool.
    pub fn new(sessions: SessionPool) -> Self {
        Self {
            sessions,
            normalizer: Normalizer::new().with_profile(ConverterProfile::Plain),
            norm_base: NORM_BASE.to_string(),
            bireysel_base: BIREYSEL_BASE.to_string(),
        }
    }

    /// Rebase both banks onto test doubles.
    pub fn with_bases(mut self, norm: impl Into<String>, bireysel: impl Into<String>) -> Self {
        self.norm_base = norm.into();
        self.bireysel_base = bireysel.into();
        self
    }

    fn base_for(&self, decision_type: ConstitutionalDecisionType) -> &str {
        match decision_type {
            ConstitutionalDecisionType::NormDenetimi => &self.norm_base,
            ConstitutionalDecisionType::BireyselBasvuru => &self.bireysel_base,
        }
    }

    /// Search one decision bank.
    pub async fn search(&self, query: &AnayasaQuery) -> Result<SearchPage> {
        query.validate()?;
        let base = self.base_for(query.decision_type);
        let url = format!("{base}/Ara");

        let session = self.sessions.borrow(SourceId::Anayasa).await?;
        let response = session
            .client()
            .get(&url)
            .query(&query.query_pairs())
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(classify_status(status, &body));
        }

        let (total, entries) = parse_bank_results(&body, base, query.decision_type);
        Ok(SearchPage {
            source: SourceId::Anayasa,
            subtype: query.decision_type.key().to_string(),
            total_records: total,
            page_index: query.page_index,
            page_size: query.page_size,
            entries,
        })
    }
}

/// Parse a bank's server-rendered results: decision links plus the
/// "N Karar Bulundu" label.
fn parse_bank_results(
    html: &str,
    base: &str,
    decision_type: ConstitutionalDecisionType,
) -> (Option<u64>, Vec<SearchEntry>) {
    let document = Html::parse_document(html);

    let total = TOTAL_RE.captures(html).and_then(|c| {
        c[1].replace('.', "").parse::<u64>().ok()
    });

    let mut entries = Vec::new();
    let Ok(link_sel) = Selector::parse("a[href]") else {
        return (total, entries);
    };

    let prefix = decision_type.link_prefix();
    let mut seen = std::collections::HashSet::new();
    for link in document.select(&link_sel) {
        let Some(href) = link.value().attr("href") else {
            continue;
        };
        if !href.starts_with(prefix) {
            continue;
        }
        if !seen.insert(href.to_string()) {
            continue;
        }
        let absolute = format!("{base}{href}");
        let handle = DocumentHandle::new(SourceId::Anayasa, decision_type.key(), absolute);
        let reference = href.trim_start_matches('/').replace('/', " ");
        let label = link.text().collect::<String>().trim().to_string();
        entries.push(
            SearchEntry::with_assembled_title(&handle)
                .decision_number(Some(reference))
                .display("baslik", Some(label).filter(|l| !l.is_empty()))
                .build(),
        );
    }

    (total, entries)
}

#[async_trait]
impl Adapter for AnayasaAdapter {
    fn source(&self) -> SourceId {
        SourceId::Anayasa
    }

    async fn fetch(&self, handle: &DocumentHandle, chunk_index: u32) -> Result<NormalizedDocument> {
        expect_source(handle, SourceId::Anayasa)?;

        let session = self.sessions.borrow(SourceId::Anayasa).await?;
        let source_url = handle.native_id.clone();
        if !source_url.starts_with("http") {
            return Err(Error::invalid_argument(
                "document_handle",
                "anayasa handles carry the decision page URL",
            ));
        }
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
        let query = AnayasaQuery {
            decision_type: ConstitutionalDecisionType::NormDenetimi,
            keywords: vec!["anayasa".to_string()],
            keywords_any: Vec::new(),
            keywords_exclude: Vec::new(),
            case_number: None,
            decision_number: None,
            start_date: None,
            end_date: None,
            subject_category: None,
            page_index: 1,
            page_size: 1,
        };
        match self.search(&query).await {
            Ok(page) if page.total_records.unwrap_or(0) > 0 || !page.entries.is_empty() => {
                HealthSample::healthy(SourceId::Anayasa, elapsed_ms(start))
            },
            Ok(_) => HealthSample::unhealthy(
                SourceId::Anayasa,
                elapsed_ms(start),
                "trivial query returned no decisions",
            ),
            Err(e) => HealthSample::unhealthy(SourceId::Anayasa, elapsed_ms(start), e.to_string()),
        }
    }
}
