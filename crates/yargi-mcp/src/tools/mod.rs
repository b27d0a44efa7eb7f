//! Tool surface: per-backend parameter structs and handlers, plus the
//! startup registration of every tool into the immutable registry.

use std::time::Duration;

use futures::future::BoxFuture;
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::Value;
use yargi_core::{DocumentHandle, Error, Result, SourceId};

use crate::dispatch::{parse_args, to_payload};
use crate::gateway::Gateway;
use crate::registry::{
    FETCH_ANNOTATIONS, SEARCH_ANNOTATIONS, ToolRegistry, schema_value,
};

pub mod anayasa;
pub mod bddk;
pub mod bedesten;
pub mod danistay;
pub mod emsal;
pub mod health;
pub mod kik;
pub mod kvkk;
pub mod rekabet;
pub mod sayistay;
pub mod unified;
pub mod uyusmazlik;
pub mod yargitay;

/// Arguments shared by every document-fetch tool.
#[derive(Debug, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct FetchParams {
    /// Opaque document handle from a search result.
    pub handle: String,
    /// 1-indexed chunk of the paginated Markdown; out-of-range values are
    /// clamped to the nearest valid chunk.
    #[serde(default = "default_page_number")]
    pub page_number: u32,
}

pub(crate) const fn default_page_number() -> u32 {
    1
}

pub(crate) const fn default_page_index() -> u32 {
    1
}

pub(crate) const fn default_page_size() -> u32 {
    10
}

/// Shared implementation of the per-source document-fetch tools: parse
/// the handle, pin it to the expected backend, and delegate.
pub(crate) fn fetch_document(
    gateway: &Gateway,
    expected: SourceId,
    args: Value,
) -> BoxFuture<'_, Result<Value>> {
    Box::pin(async move {
        let params: FetchParams = parse_args(args)?;
        let handle = DocumentHandle::parse(&params.handle)?;
        if handle.source != expected {
            return Err(Error::invalid_argument(
                "handle",
                format!("handle belongs to {}, this tool serves {expected}", handle.source),
            ));
        }
        let adapter = gateway.adapter_for(expected)?;
        let document = adapter.fetch(&handle, params.page_number).await?;
        to_payload(&document)
    })
}

const SEARCH_DEADLINE: Duration = Duration::from_secs(60);
const FETCH_DEADLINE: Duration = Duration::from_secs(60);
/// Browser-driven retrieval needs room for a full page render.
const BROWSER_FETCH_DEADLINE: Duration = Duration::from_secs(120);
const HEALTH_DEADLINE: Duration = Duration::from_secs(30);

/// Register every tool. Called once at startup; the returned registry is
/// immutable.
pub fn register_all() -> ToolRegistry {
    ToolRegistry::builder()
        // Yargıtay
        .register(
            "search_yargitay",
            "Search Yargıtay (supreme court) decisions with chamber, case-number and date filters",
            schema_value::<yargitay::SearchParams>(),
            Some(SourceId::Yargitay),
            SEARCH_DEADLINE,
            SEARCH_ANNOTATIONS,
            yargitay::search,
        )
        .register(
            "get_yargitay_document",
            "Fetch a Yargıtay decision as paginated Markdown",
            schema_value::<FetchParams>(),
            Some(SourceId::Yargitay),
            FETCH_DEADLINE,
            FETCH_ANNOTATIONS,
            yargitay::get_document,
        )
        // Danıştay
        .register(
            "search_danistay",
            "Search Danıştay (council of state) decisions by keyword lists or detailed filters",
            schema_value::<danistay::SearchParams>(),
            Some(SourceId::Danistay),
            SEARCH_DEADLINE,
            SEARCH_ANNOTATIONS,
            danistay::search,
        )
        .register(
            "get_danistay_document",
            "Fetch a Danıştay decision as paginated Markdown",
            schema_value::<FetchParams>(),
            Some(SourceId::Danistay),
            FETCH_DEADLINE,
            FETCH_ANNOTATIONS,
            danistay::get_document,
        )
        // Emsal
        .register(
            "search_emsal",
            "Search the UYAP Emsal precedent index of local and appellate courts",
            schema_value::<emsal::SearchParams>(),
            Some(SourceId::Emsal),
            SEARCH_DEADLINE,
            SEARCH_ANNOTATIONS,
            emsal::search,
        )
        .register(
            "get_emsal_document",
            "Fetch an Emsal decision as paginated Markdown",
            schema_value::<FetchParams>(),
            Some(SourceId::Emsal),
            FETCH_DEADLINE,
            FETCH_ANNOTATIONS,
            emsal::get_document,
        )
        // Uyuşmazlık
        .register(
            "search_uyusmazlik",
            "Search Uyuşmazlık Mahkemesi (jurisdictional-dispute court) decisions",
            schema_value::<uyusmazlik::SearchParams>(),
            Some(SourceId::Uyusmazlik),
            SEARCH_DEADLINE,
            SEARCH_ANNOTATIONS,
            uyusmazlik::search,
        )
        .register(
            "get_uyusmazlik_document",
            "Fetch an Uyuşmazlık Mahkemesi decision as paginated Markdown",
            schema_value::<FetchParams>(),
            Some(SourceId::Uyusmazlik),
            FETCH_DEADLINE,
            FETCH_ANNOTATIONS,
            uyusmazlik::get_document,
        )
        // Bedesten federated index
        .register(
            "search_bedesten_unified",
            "Search the Bedesten cross-court index (Yargıtay, Danıştay, local and appellate courts, KYB)",
            schema_value::<bedesten::SearchParams>(),
            Some(SourceId::Bedesten),
            SEARCH_DEADLINE,
            SEARCH_ANNOTATIONS,
            bedesten::search,
        )
        .register(
            "get_bedesten_document",
            "Fetch a Bedesten document (HTML or PDF) as paginated Markdown",
            schema_value::<FetchParams>(),
            Some(SourceId::Bedesten),
            FETCH_DEADLINE,
            FETCH_ANNOTATIONS,
            bedesten::get_document,
        )
        // Anayasa
        .register(
            "search_anayasa_unified",
            "Search Anayasa Mahkemesi norm-control or individual-application decisions",
            schema_value::<anayasa::SearchParams>(),
            Some(SourceId::Anayasa),
            SEARCH_DEADLINE,
            SEARCH_ANNOTATIONS,
            anayasa::search,
        )
        .register(
            "get_anayasa_document",
            "Fetch an Anayasa Mahkemesi decision as paginated Markdown (5,000-character pages)",
            schema_value::<FetchParams>(),
            Some(SourceId::Anayasa),
            FETCH_DEADLINE,
            FETCH_ANNOTATIONS,
            anayasa::get_document,
        )
        // Sayıştay
        .register(
            "search_sayistay_unified",
            "Search Sayıştay general-assembly, appeals-board or chamber decisions",
            schema_value::<sayistay::SearchParams>(),
            Some(SourceId::Sayistay),
            SEARCH_DEADLINE,
            SEARCH_ANNOTATIONS,
            sayistay::search,
        )
        .register(
            "get_sayistay_document",
            "Fetch a Sayıştay decision as paginated Markdown",
            schema_value::<FetchParams>(),
            Some(SourceId::Sayistay),
            FETCH_DEADLINE,
            FETCH_ANNOTATIONS,
            sayistay::get_document,
        )
        // KİK
        .register(
            "search_kik_v2",
            "Search KİK (procurement authority) board decisions by subtype",
            schema_value::<kik::SearchParams>(),
            Some(SourceId::Kik),
            SEARCH_DEADLINE,
            SEARCH_ANNOTATIONS,
            kik::search,
        )
        .register(
            "get_kik_document",
            "Fetch a KİK board decision via the rendered viewer as paginated Markdown",
            schema_value::<FetchParams>(),
            Some(SourceId::Kik),
            BROWSER_FETCH_DEADLINE,
            FETCH_ANNOTATIONS,
            kik::get_document,
        )
        // Rekabet
        .register(
            "search_rekabet",
            "Search Rekabet Kurumu (competition authority) decisions",
            schema_value::<rekabet::SearchParams>(),
            Some(SourceId::Rekabet),
            SEARCH_DEADLINE,
            SEARCH_ANNOTATIONS,
            rekabet::search,
        )
        .register(
            "get_rekabet_document",
            "Fetch a Rekabet Kurumu decision PDF as paginated Markdown",
            schema_value::<FetchParams>(),
            Some(SourceId::Rekabet),
            FETCH_DEADLINE,
            FETCH_ANNOTATIONS,
            rekabet::get_document,
        )
        // BDDK
        .register(
            "search_bddk",
            "Search BDDK (banking regulator) board decisions",
            schema_value::<bddk::SearchParams>(),
            Some(SourceId::Bddk),
            SEARCH_DEADLINE,
            SEARCH_ANNOTATIONS,
            bddk::search,
        )
        .register(
            "get_bddk_document",
            "Fetch a BDDK decision document as paginated Markdown",
            schema_value::<FetchParams>(),
            Some(SourceId::Bddk),
            FETCH_DEADLINE,
            FETCH_ANNOTATIONS,
            bddk::get_document,
        )
        // KVKK
        .register(
            "search_kvkk",
            "Search KVKK (data-protection authority) decision summaries",
            schema_value::<kvkk::SearchParams>(),
            Some(SourceId::Kvkk),
            SEARCH_DEADLINE,
            SEARCH_ANNOTATIONS,
            kvkk::search,
        )
        .register(
            "get_kvkk_document",
            "Fetch a KVKK decision summary as paginated Markdown",
            schema_value::<FetchParams>(),
            Some(SourceId::Kvkk),
            FETCH_DEADLINE,
            FETCH_ANNOTATIONS,
            kvkk::get_document,
        )
        // Federated aliases
        .register(
            "search_unified",
            "Federated search over the cross-court index, for clients that cannot enumerate backends",
            schema_value::<bedesten::SearchParams>(),
            Some(SourceId::Bedesten),
            SEARCH_DEADLINE,
            SEARCH_ANNOTATIONS,
            bedesten::search,
        )
        .register(
            "fetch_unified",
            "Fetch any document by its opaque handle, routed to the owning backend",
            schema_value::<FetchParams>(),
            None,
            BROWSER_FETCH_DEADLINE,
            FETCH_ANNOTATIONS,
            unified::fetch,
        )
        .register(
            "get_document_unified",
            "Alias of fetch_unified: fetch any document by its opaque handle",
            schema_value::<FetchParams>(),
            None,
            BROWSER_FETCH_DEADLINE,
            FETCH_ANNOTATIONS,
            unified::fetch,
        )
        // Health
        .register(
            "health",
            "Probe every enabled backend with a trivial query and report aggregate health",
            schema_value::<health::HealthParams>(),
            None,
            HEALTH_DEADLINE,
            SEARCH_ANNOTATIONS,
            health::probe,
        )
        .build()
}
