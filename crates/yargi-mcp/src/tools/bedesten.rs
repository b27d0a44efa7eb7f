//! Bedesten federated-index search and document tools.

use futures::future::BoxFuture;
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::Value;
use yargi_core::adapters::bedesten::{BedestenQuery, CourtType};
use yargi_core::{ChamberCode, Result, SourceId};

use crate::dispatch::{parse_args, to_payload};
use crate::gateway::Gateway;

/// Arguments of `search_bedesten_unified` and `search_unified`.
#[derive(Debug, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct SearchParams {
    /// Search phrase; `"exact phrase"`, `+required`, `-excluded` and
    /// `AND/OR/NOT` are honored, wildcards are not.
    pub phrase: String,
    /// Court types to include (`YARGITAYKARARI`, `DANISTAYKARAR`,
    /// `YERELHUKUK`, `ISTINAFHUKUK`, `KYB`); empty means all.
    #[serde(default)]
    pub court_types: Vec<CourtType>,
    /// Chamber code filter; omit for all chambers.
    #[serde(default)]
    pub chamber: ChamberCode,
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

/// `search_bedesten_unified` / `search_unified` handler.
pub fn search(gateway: &Gateway, args: Value) -> BoxFuture<'_, Result<Value>> {
    Box::pin(async move {
        let params: SearchParams = parse_args(args)?;
        let query = BedestenQuery {
            phrase: params.phrase,
            court_types: params.court_types,
            chamber: params.chamber,
            start_date: params.start_date,
            end_date: params.end_date,
            page_index: params.page_number,
            page_size: params.page_size,
        };
        let page = gateway.bedesten.search(&query).await?;
        to_payload(&page)
    })
}

/// `get_bedesten_document` handler.
pub fn get_document(gateway: &Gateway, args: Value) -> BoxFuture<'_, Result<Value>> {
    super::fetch_document(gateway, SourceId::Bedesten, args)
}
