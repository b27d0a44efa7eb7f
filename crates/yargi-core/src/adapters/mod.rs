//! Backend adapters: one module per legal database.
//!
//! Each adapter translates the gateway's typed search contract into its
//! backend's private request shape, parses the response into the canonical
//! [`SearchPage`], and retrieves documents in their native container for
//! the normalizer. Adapters are safe under concurrent invocation against
//! the same source.

use async_trait::async_trait;

use crate::error::{Error, Result};
use crate::health::HealthSample;
use crate::normalize::ChunkedMarkdown;
use crate::session::SourceProfile;
use crate::types::{DocumentHandle, NormalizedDocument, SourceId};

pub mod anayasa;
pub mod bddk;
pub mod bedesten;
pub mod danistay;
pub mod emsal;
pub mod kik;
pub mod kvkk;
pub mod rekabet;
pub mod sayistay;
pub mod uyusmazlik;
pub mod yargitay;

/// Capability set shared by every backend adapter.
///
/// `search` is not part of the trait: each adapter exposes its own typed
/// query, and the dispatcher binds tools to concrete adapters. The trait
/// covers the operations that are dispatched dynamically — document
/// retrieval by parsed handle and the health fan-out.
#[async_trait]
pub trait Adapter: Send + Sync {
    /// Backend this adapter serves.
    fn source(&self) -> SourceId;

    /// Fetch and normalize the document a handle refers to.
    async fn fetch(&self, handle: &DocumentHandle, chunk_index: u32) -> Result<NormalizedDocument>;

    /// Probe a representative endpoint with a trivial query.
    async fn health(&self) -> HealthSample;
}

impl std::fmt::Debug for dyn Adapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Adapter").field(&self.source()).finish()
    }
}

/// Check a handle belongs to this adapter before using its native id.
pub(crate) fn expect_source(handle: &DocumentHandle, source: SourceId) -> Result<()> {
    if handle.source != source {
        return Err(Error::invalid_argument(
            "document_handle",
            format!("handle belongs to {}, not {source}", handle.source),
        ));
    }
    Ok(())
}

/// Enforce `page_index * page_size <= max_offset` before any network call.
pub(crate) fn check_offset(page_index: u32, page_size: u32, max_offset: u64) -> Result<()> {
    if page_index < 1 {
        return Err(Error::invalid_argument("page_index", "pages are 1-indexed"));
    }
    if !(1..=100).contains(&page_size) {
        return Err(Error::invalid_argument(
            "page_size",
            "page size must be between 1 and 100",
        ));
    }
    let offset = u64::from(page_index) * u64::from(page_size);
    if offset > max_offset {
        return Err(Error::invalid_argument(
            "page_index",
            format!("page window exceeds the backend's maximum offset of {max_offset}"),
        ));
    }
    Ok(())
}

/// Map a non-success HTTP status to the error taxonomy. Used by adapters
/// that have no CSRF recovery; form-backed adapters map 403/419 to
/// [`Error::AuthExpired`] themselves before falling back to this.
pub(crate) fn classify_status(status: reqwest::StatusCode, body: &str) -> Error {
    if status == reqwest::StatusCode::NOT_FOUND {
        return Error::NotFound("backend reports no such document".to_string());
    }
    if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
        return Error::AccessDenied("backend rate limit".to_string());
    }
    if status == reqwest::StatusCode::FORBIDDEN {
        return Error::AccessDenied("backend refused the request".to_string());
    }
    Error::backend(Some(status.as_u16()), body)
}

/// Milliseconds elapsed since `start`, saturating.
pub(crate) fn elapsed_ms(start: std::time::Instant) -> u64 {
    u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX)
}

/// Assemble the wire document from a chunked rendition, clamping the
/// requested chunk.
pub(crate) fn paginate(
    handle: &DocumentHandle,
    source_url: String,
    doc: &ChunkedMarkdown,
    requested_chunk: u32,
) -> NormalizedDocument {
    let (chunk_index, chunk_text) = doc.chunk(requested_chunk);
    NormalizedDocument {
        handle: handle.encode(),
        source_url,
        total_chunks: doc.total_chunks(),
        chunk_index,
        chunk_text,
        is_paginated: doc.is_paginated(),
        full_char_count: Some(doc.full_char_count()),
    }
}

/// Session profiles for every backend, consumed by the session pool.
pub fn session_profiles() -> Vec<SourceProfile> {
    vec![
        yargitay::profile(),
        danistay::profile(),
        emsal::profile(),
        uyusmazlik::profile(),
        bedesten::profile(),
        anayasa::profile(),
        sayistay::profile(),
        kik::profile(),
        rekabet::profile(),
        bddk::profile(),
        kvkk::profile(),
    ]
}
