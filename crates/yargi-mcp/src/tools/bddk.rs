//! BDDK search and document tools.

use futures::future::BoxFuture;
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::Value;
use yargi_core::adapters::bddk::BddkQuery;
use yargi_core::{Result, SourceId};

use crate::dispatch::{parse_args, to_payload};
use crate::gateway::Gateway;

/// Arguments of `search_bddk`.
#[derive(Debug, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct SearchParams {
    /// Turkish keywords.
    pub keywords: String,
    /// 1-indexed result page.
    #[serde(default = "super::default_page_index")]
    pub page: u32,
    /// Results per page (1-100).
    #[serde(rename = "pageSize", default = "super::default_page_size")]
    pub page_size: u32,
}

/// `search_bddk` handler.
pub fn search(gateway: &Gateway, args: Value) -> BoxFuture<'_, Result<Value>> {
    Box::pin(async move {
        let params: SearchParams = parse_args(args)?;
        let query = BddkQuery {
            keywords: params.keywords,
            page_index: params.page,
            page_size: params.page_size,
        };
        let page = gateway.bddk.search(&query).await?;
        to_payload(&page)
    })
}

/// `get_bddk_document` handler.
pub fn get_document(gateway: &Gateway, args: Value) -> BoxFuture<'_, Result<Value>> {
    super::fetch_document(gateway, SourceId::Bddk, args)
}
