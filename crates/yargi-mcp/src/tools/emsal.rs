//! UYAP Emsal search and document tools.

use futures::future::BoxFuture;
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::Value;
use yargi_core::adapters::emsal::EmsalQuery;
use yargi_core::{Result, SourceId};

use crate::dispatch::{parse_args, to_payload};
use crate::gateway::Gateway;

/// Arguments of `search_emsal`.
#[derive(Debug, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct SearchParams {
    /// Keywords to search for.
    #[serde(default)]
    pub keyword: String,
    /// Regional appellate civil court filter.
    #[serde(default)]
    pub bam_civil_court: Option<String>,
    /// First-instance civil court filter.
    #[serde(default)]
    pub civil_court: Option<String>,
    /// Regional civil chamber names.
    #[serde(default)]
    pub regional_chambers: Vec<String>,
    /// Case year (`YYYY`).
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
    /// 1-indexed result page.
    #[serde(default = "super::default_page_index")]
    pub page_number: u32,
    /// Results per page (1-100).
    #[serde(default = "super::default_page_size")]
    pub page_size: u32,
}

/// `search_emsal` handler.
pub fn search(gateway: &Gateway, args: Value) -> BoxFuture<'_, Result<Value>> {
    Box::pin(async move {
        let params: SearchParams = parse_args(args)?;
        let query = EmsalQuery {
            phrase: params.keyword,
            bam_civil_court: params.bam_civil_court,
            civil_court: params.civil_court,
            regional_chambers: params.regional_chambers,
            case_year: params.case_year,
            case_no_start: params.case_no_start,
            case_no_end: params.case_no_end,
            decision_year: params.decision_year,
            decision_no_start: params.decision_no_start,
            decision_no_end: params.decision_no_end,
            start_date: params.start_date,
            end_date: params.end_date,
            page_index: params.page_number,
            page_size: params.page_size,
        };
        let page = gateway.emsal.search(&query).await?;
        to_payload(&page)
    })
}

/// `get_emsal_document` handler.
pub fn get_document(gateway: &Gateway, args: Value) -> BoxFuture<'_, Result<Value>> {
    super::fetch_document(gateway, SourceId::Emsal, args)
}
