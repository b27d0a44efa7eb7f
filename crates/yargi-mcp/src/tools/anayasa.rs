//! Anayasa Mahkemesi search and document tools.

use futures::future::BoxFuture;
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::Value;
use yargi_core::adapters::anayasa::{AnayasaQuery, ConstitutionalDecisionType};
use yargi_core::{Result, SourceId};

use crate::dispatch::{parse_args, to_payload};
use crate::gateway::Gateway;

/// Arguments of `search_anayasa_unified`.
#[derive(Debug, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct SearchParams {
    /// Decision bank: `norm_denetimi` or `bireysel_basvuru`.
    pub decision_type: ConstitutionalDecisionType,
    /// Keywords all of which must appear.
    #[serde(default)]
    pub keywords: Vec<String>,
    /// Keywords any of which may appear.
    #[serde(default)]
    pub keywords_any: Vec<String>,
    /// Excluded keywords.
    #[serde(default)]
    pub keywords_exclude: Vec<String>,
    /// Case registry number (`2023/123`), norm control only.
    #[serde(default)]
    pub case_number: Option<String>,
    /// Decision number (`2023/456`).
    #[serde(default)]
    pub decision_number: Option<String>,
    /// Decision date range start, `YYYY-MM-DD`.
    #[serde(default)]
    pub start_date: Option<String>,
    /// Decision date range end, `YYYY-MM-DD`.
    #[serde(default)]
    pub end_date: Option<String>,
    /// Subject category code, individual applications only.
    #[serde(default)]
    pub subject_category: Option<String>,
    /// 1-indexed page of the result list.
    #[serde(default = "super::default_page_index")]
    pub page_to_fetch: u32,
    /// Results per page (the banks serve at most 10).
    #[serde(default = "super::default_page_size")]
    pub results_per_page: u32,
}

/// `search_anayasa_unified` handler.
pub fn search(gateway: &Gateway, args: Value) -> BoxFuture<'_, Result<Value>> {
    Box::pin(async move {
        let params: SearchParams = parse_args(args)?;
        let query = AnayasaQuery {
            decision_type: params.decision_type,
            keywords: params.keywords,
            keywords_any: params.keywords_any,
            keywords_exclude: params.keywords_exclude,
            case_number: params.case_number,
            decision_number: params.decision_number,
            start_date: params.start_date,
            end_date: params.end_date,
            subject_category: params.subject_category,
            page_index: params.page_to_fetch,
            page_size: params.results_per_page,
        };
        let page = gateway.anayasa.search(&query).await?;
        to_payload(&page)
    })
}

/// `get_anayasa_document` handler.
pub fn get_document(gateway: &Gateway, args: Value) -> BoxFuture<'_, Result<Value>> {
    super::fetch_document(gateway, SourceId::Anayasa, args)
}
