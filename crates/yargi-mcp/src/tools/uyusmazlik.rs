//! Uyuşmazlık Mahkemesi search and document tools.

use futures::future::BoxFuture;
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::Value;
use yargi_core::adapters::uyusmazlik::{DisputeType, Section, UyusmazlikQuery};
use yargi_core::{Result, SourceId};

use crate::dispatch::{parse_args, to_payload};
use crate::gateway::Gateway;

/// Arguments of `search_uyusmazlik`.
#[derive(Debug, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct SearchParams {
    /// Free-text search over decision content.
    #[serde(default)]
    pub phrase: String,
    /// Court section (`criminal`, `general_assembly`, `civil`).
    #[serde(default)]
    pub section: Section,
    /// Dispute type (`jurisdiction`, `judgment`).
    #[serde(default)]
    pub dispute_type: DisputeType,
    /// Case year.
    #[serde(default)]
    pub case_year: Option<String>,
    /// Case sequence number.
    #[serde(default)]
    pub case_no: Option<String>,
    /// Decision year.
    #[serde(default)]
    pub decision_year: Option<String>,
    /// Decision sequence number.
    #[serde(default)]
    pub decision_no: Option<String>,
    /// Statute number filter.
    #[serde(default)]
    pub statute_no: Option<String>,
    /// Inclusive start date, `YYYY-MM-DD`.
    #[serde(default)]
    pub start_date: Option<String>,
    /// Inclusive end date, `YYYY-MM-DD`.
    #[serde(default)]
    pub end_date: Option<String>,
}

/// `search_uyusmazlik` handler.
pub fn search(gateway: &Gateway, args: Value) -> BoxFuture<'_, Result<Value>> {
    Box::pin(async move {
        let params: SearchParams = parse_args(args)?;
        let query = UyusmazlikQuery {
            phrase: params.phrase,
            section: params.section,
            dispute_type: params.dispute_type,
            case_year: params.case_year,
            case_no: params.case_no,
            decision_year: params.decision_year,
            decision_no: params.decision_no,
            statute_no: params.statute_no,
            start_date: params.start_date,
            end_date: params.end_date,
        };
        let page = gateway.uyusmazlik.search(&query).await?;
        to_payload(&page)
    })
}

/// `get_uyusmazlik_document` handler.
pub fn get_document(gateway: &Gateway, args: Value) -> BoxFuture<'_, Result<Value>> {
    super::fetch_document(gateway, SourceId::Uyusmazlik, args)
}
