//! Danıştay search and document tools.
//!
//! One tool covers both of the backend's search modes: keyword lists run
//! the keyword search, anything else runs the detailed search.

use futures::future::BoxFuture;
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::Value;
use yargi_core::adapters::danistay::{DanistayDetailedQuery, DanistayKeywordQuery};
use yargi_core::{ChamberCode, Result, SourceId};

use crate::dispatch::{parse_args, to_payload};
use crate::gateway::Gateway;

/// Arguments of `search_danistay`.
#[derive(Debug, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct SearchParams {
    /// Keywords all of which must appear (keyword mode).
    #[serde(default)]
    pub and_keywords: Vec<String>,
    /// Keywords any of which may appear (keyword mode).
    #[serde(default)]
    pub or_keywords: Vec<String>,
    /// Excluded keywords, conjunctive (keyword mode).
    #[serde(default)]
    pub not_and_keywords: Vec<String>,
    /// Excluded keywords, disjunctive (keyword mode).
    #[serde(default)]
    pub not_or_keywords: Vec<String>,
    /// Chamber code (`D1`..`D17`, `IDDK`, `VDDK`, ...), detailed mode.
    #[serde(default)]
    pub chamber: ChamberCode,
    /// Case year (`YYYY`), detailed mode.
    #[serde(default)]
    pub case_year: Option<String>,
    /// First case sequence number.
    #[serde(default)]
    pub case_no_start: Option<String>,
    /// Last case sequence number.
    #[serde(default)]
    pub case_no_end: Option<String>,
    /// Decision year (`YYYY`).
    #[serde(default)]
    pub decision_year: Option<String>,
    /// First decision sequence number.
    #[serde(default)]
    pub decision_no_start: Option<String>,
    /// Last decision sequence number.
    #[serde(default)]
    pub decision_no_end: Option<String>,
    /// Inclusive start date, `YYYY-MM-DD`.
    #[serde(default)]
    pub start_date: Option<String>,
    /// Inclusive end date, `YYYY-MM-DD`.
    #[serde(default)]
    pub end_date: Option<String>,
    /// Legislation number filter.
    #[serde(default)]
    pub legislation_number: Option<String>,
    /// Legislation name filter.
    #[serde(default)]
    pub legislation_name: Option<String>,
    /// Legislation article filter.
    #[serde(default)]
    pub article: Option<String>,
    /// 1-indexed result page.
    #[serde(rename = "pageNumber", default = "super::default_page_index")]
    pub page_number: u32,
    /// Results per page (1-100).
    #[serde(rename = "pageSize", default = "super::default_page_size")]
    pub page_size: u32,
}

impl SearchParams {
    fn is_keyword_mode(&self) -> bool {
        !self.and_keywords.is_empty()
            || !self.or_keywords.is_empty()
            || !self.not_and_keywords.is_empty()
            || !self.not_or_keywords.is_empty()
    }
}

/// `search_danistay` handler.
pub fn search(gateway: &Gateway, args: Value) -> BoxFuture<'_, Result<Value>> {
    Box::pin(async move {
        let params: SearchParams = parse_args(args)?;
        let page = if params.is_keyword_mode() {
            let query = DanistayKeywordQuery {
                and_keywords: params.and_keywords,
                or_keywords: params.or_keywords,
                not_and_keywords: params.not_and_keywords,
                not_or_keywords: params.not_or_keywords,
                page_index: params.page_number,
                page_size: params.page_size,
            };
            gateway.danistay.search_keyword(&query).await?
        } else {
            let query = DanistayDetailedQuery {
                chamber: params.chamber,
                case_year: params.case_year,
                case_no_start: params.case_no_start,
                case_no_end: params.case_no_end,
                decision_year: params.decision_year,
                decision_no_start: params.decision_no_start,
                decision_no_end: params.decision_no_end,
                start_date: params.start_date,
                end_date: params.end_date,
                legislation_number: params.legislation_number,
                legislation_name: params.legislation_name,
                article: params.article,
                page_index: params.page_number,
                page_size: params.page_size,
            };
            gateway.danistay.search_detailed(&query).await?
        };
        to_payload(&page)
    })
}

/// `get_danistay_document` handler.
pub fn get_document(gateway: &Gateway, args: Value) -> BoxFuture<'_, Result<Value>> {
    super::fetch_document(gateway, SourceId::Danistay, args)
}
