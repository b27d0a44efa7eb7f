//! Sayıştay search and document tools.

use futures::future::BoxFuture;
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::Value;
use yargi_core::adapters::sayistay::{DecisionKind, SayistayQuery};
use yargi_core::{Result, SourceId};

use crate::dispatch::{parse_args, to_payload};
use crate::gateway::Gateway;

/// Arguments of `search_sayistay_unified`.
#[derive(Debug, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct SearchParams {
    /// Decision register: `genel_kurul`, `temyiz_kurulu` or `daire`.
    pub decision_type: DecisionKind,
    /// Full-text phrase over the decision body.
    #[serde(default)]
    pub phrase: Option<String>,
    /// Decision number (general assembly) or appeals-minutes number.
    #[serde(default)]
    pub karar_no: Option<String>,
    /// Account/decision year filter.
    #[serde(default)]
    pub year: Option<String>,
    /// Chamber name filter for appeals-board and chamber registers.
    #[serde(default)]
    pub chamber: Option<String>,
    /// Inclusive start date, `YYYY-MM-DD`.
    #[serde(default)]
    pub start_date: Option<String>,
    /// Inclusive end date, `YYYY-MM-DD`.
    #[serde(default)]
    pub end_date: Option<String>,
    /// 0-based row offset.
    #[serde(default)]
    pub start: u32,
    /// Rows per page (1-100).
    #[serde(default = "super::default_page_size")]
    pub length: u32,
}

/// `search_sayistay_unified` handler.
pub fn search(gateway: &Gateway, args: Value) -> BoxFuture<'_, Result<Value>> {
    Box::pin(async move {
        let params: SearchParams = parse_args(args)?;
        let query = SayistayQuery {
            kind: params.decision_type,
            phrase: params.phrase,
            decision_no: params.karar_no,
            year: params.year,
            chamber: params.chamber,
            start_date: params.start_date,
            end_date: params.end_date,
            start: params.start,
            length: params.length,
        };
        let page = gateway.sayistay.search(&query).await?;
        to_payload(&page)
    })
}

/// `get_sayistay_document` handler.
pub fn get_document(gateway: &Gateway, args: Value) -> BoxFuture<'_, Result<Value>> {
    super::fetch_document(gateway, SourceId::Sayistay, args)
}
