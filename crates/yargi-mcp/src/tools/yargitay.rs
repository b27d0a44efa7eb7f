//! Yargıtay search and document tools.

use futures::future::BoxFuture;
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::Value;
use yargi_core::adapters::yargitay::YargitayQuery;
use yargi_core::{ChamberCode, Result, SourceId};

use crate::dispatch::{parse_args, to_payload};
use crate::gateway::Gateway;

/// Arguments of `search_yargitay`.
#[derive(Debug, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct SearchParams {
    /// Keywords; supports `+required -excluded "exact phrase"` operators.
    #[serde(default)]
    pub phrase: String,
    /// Chamber code (`H1`..`H23`, `C1`..`C23`, `HGK`, `CGK`, ...); omit
    /// for all chambers.
    #[serde(default)]
    pub chamber: ChamberCode,
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
    #[serde(rename = "pageNumber", default = "super::default_page_index")]
    pub page_number: u32,
    /// Results per page (1-100).
    #[serde(rename = "pageSize", default = "super::default_page_size")]
    pub page_size: u32,
}

impl SearchParams {
    fn into_query(self) -> YargitayQuery {
        YargitayQuery {
            phrase: self.phrase,
            chamber: self.chamber,
            case_year: self.case_year,
            case_no_start: self.case_no_start,
            case_no_end: self.case_no_end,
            decision_year: self.decision_year,
            decision_no_start: self.decision_no_start,
            decision_no_end: self.decision_no_end,
            start_date: self.start_date,
            end_date: self.end_date,
            page_index: self.page_number,
            page_size: self.page_size,
        }
    }
}

/// `search_yargitay` handler.
pub fn search(gateway: &Gateway, args: Value) -> BoxFuture<'_, Result<Value>> {
    Box::pin(async move {
        let params: SearchParams = parse_args(args)?;
        let page = gateway.yargitay.search(&params.into_query()).await?;
        to_payload(&page)
    })
}

/// `get_yargitay_document` handler.
pub fn get_document(gateway: &Gateway, args: Value) -> BoxFuture<'_, Result<Value>> {
    super::fetch_document(gateway, SourceId::Yargitay, args)
}
