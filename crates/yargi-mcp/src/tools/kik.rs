//! KİK (procurement authority) search and document tools.

use futures::future::BoxFuture;
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::Value;
use yargi_core::adapters::kik::{BoardDecisionType, KikQuery};
use yargi_core::{Result, SourceId};

use crate::dispatch::{parse_args, to_payload};
use crate::gateway::Gateway;

/// Arguments of `search_kik_v2`.
#[derive(Debug, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct SearchParams {
    /// Decision register: `uyusmazlik`, `duzenleyici` or `mahkeme`.
    pub decision_type: BoardDecisionType,
    /// Full-text search over decision bodies.
    #[serde(default)]
    pub karar_metni: Option<String>,
    /// Decision number, e.g. `2025/UH.II-1801`.
    #[serde(default)]
    pub karar_no: Option<String>,
    /// Applicant name filter.
    #[serde(default)]
    pub basvuran: Option<String>,
    /// Contracting-administration name filter.
    #[serde(default)]
    pub idare_adi: Option<String>,
    /// Inclusive start date, `YYYY-MM-DD`.
    #[serde(default)]
    pub start_date: Option<String>,
    /// Inclusive end date, `YYYY-MM-DD`.
    #[serde(default)]
    pub end_date: Option<String>,
}

/// `search_kik_v2` handler.
pub fn search(gateway: &Gateway, args: Value) -> BoxFuture<'_, Result<Value>> {
    Box::pin(async move {
        let params: SearchParams = parse_args(args)?;
        let query = KikQuery {
            decision_type: params.decision_type,
            decision_text: params.karar_metni,
            decision_no: params.karar_no,
            applicant: params.basvuran,
            administration: params.idare_adi,
            start_date: params.start_date,
            end_date: params.end_date,
        };
        let page = gateway.kik.search(&query).await?;
        to_payload(&page)
    })
}

/// `get_kik_document` handler.
pub fn get_document(gateway: &Gateway, args: Value) -> BoxFuture<'_, Result<Value>> {
    super::fetch_document(gateway, SourceId::Kik, args)
}
