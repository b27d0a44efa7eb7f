//! KVKK search and document tools.

use futures::future::BoxFuture;
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::Value;
use yargi_core::adapters::kvkk::KvkkQuery;
use yargi_core::{Result, SourceId};

use crate::dispatch::{parse_args, to_payload};
use crate::gateway::Gateway;

/// Arguments of `search_kvkk`.
#[derive(Debug, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct SearchParams {
    /// Turkish keywords; `+required -excluded "exact phrase"` operators
    /// are forwarded to the search API.
    pub keywords: String,
    /// 1-indexed result page.
    #[serde(default = "super::default_page_index")]
    pub page: u32,
    /// Results per page (the search API caps at 20).
    #[serde(rename = "pageSize", default = "super::default_page_size")]
    pub page_size: u32,
}

/// `search_kvkk` handler.
pub fn search(gateway: &Gateway, args: Value) -> BoxFuture<'_, Result<Value>> {
    Box::pin(async move {
        let params: SearchParams = parse_args(args)?;
        let query = KvkkQuery {
            keywords: params.keywords,
            page_index: params.page,
            page_size: params.page_size,
        };
        let page = gateway.kvkk.search(&query).await?;
        to_payload(&page)
    })
}

/// `get_kvkk_document` handler.
pub fn get_document(gateway: &Gateway, args: Value) -> BoxFuture<'_, Result<Value>> {
    super::fetch_document(gateway, SourceId::Kvkk, args)
}
