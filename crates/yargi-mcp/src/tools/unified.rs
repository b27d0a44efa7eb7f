//! Handle-routed document retrieval across every backend.

use futures::future::BoxFuture;
use serde_json::Value;
use yargi_core::{DocumentHandle, Result};

use crate::dispatch::{parse_args, to_payload};
use crate::gateway::Gateway;
use crate::tools::FetchParams;

/// `fetch_unified` / `get_document_unified` handler: parse the handle,
/// resolve the owning backend's adapter, delegate.
pub fn fetch(gateway: &Gateway, args: Value) -> BoxFuture<'_, Result<Value>> {
    Box::pin(async move {
        let params: FetchParams = parse_args(args)?;
        let handle = DocumentHandle::parse(&params.handle)?;
        let adapter = gateway.adapter_for(handle.source)?;
        let document = adapter.fetch(&handle, params.page_number).await?;
        to_payload(&document)
    })
}
