//! Rekabet Kurumu search and document tools.

use futures::future::BoxFuture;
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::Value;
use yargi_core::adapters::rekabet::{CompetitionDecisionType, RekabetQuery};
use yargi_core::{Result, SourceId};

use crate::dispatch::{parse_args, to_payload};
use crate::gateway::Gateway;

/// Arguments of `search_rekabet`.
#[derive(Debug, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct SearchParams {
    /// Title words.
    #[serde(default)]
    pub title: Option<String>,
    /// Full-text search within decision PDFs.
    #[serde(default)]
    pub pdf_text: Option<String>,
    /// Decision type (`merger_acquisition`, `infringement`, ...).
    #[serde(default)]
    pub decision_type: CompetitionDecisionType,
    /// Decision number filter.
    #[serde(default)]
    pub decision_no: Option<String>,
    /// Decision date filter.
    #[serde(default)]
    pub decision_date: Option<String>,
    /// Publication date filter.
    #[serde(default)]
    pub publication_date: Option<String>,
    /// 1-indexed result page.
    #[serde(default = "super::default_page_index")]
    pub page: u32,
}

/// `search_rekabet` handler.
pub fn search(gateway: &Gateway, args: Value) -> BoxFuture<'_, Result<Value>> {
    Box::pin(async move {
        let params: SearchParams = parse_args(args)?;
        let query = RekabetQuery {
            title: params.title,
            pdf_text: params.pdf_text,
            decision_type: params.decision_type,
            decision_no: params.decision_no,
            decision_date: params.decision_date,
            publication_date: params.publication_date,
            page_index: params.page,
        };
        let page = gateway.rekabet.search(&query).await?;
        to_payload(&page)
    })
}

/// `get_rekabet_document` handler.
pub fn get_document(gateway: &Gateway, args: Value) -> BoxFuture<'_, Result<Value>> {
    super::fetch_document(gateway, SourceId::Rekabet, args)
}
