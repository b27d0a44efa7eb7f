//! Core data types shared by the adapters, the normalizer, and the tool
//! surface.
//!
//! The types here are the gateway's canonical contract: adapters translate
//! between these shapes and each backend's private request/response forms.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Registered backends, one per adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum SourceId {
    /// Yargıtay — supreme court (civil and criminal chambers).
    Yargitay,
    /// Danıştay — council of state.
    Danistay,
    /// UYAP Emsal — precedent index of local and appellate courts.
    Emsal,
    /// Uyuşmazlık Mahkemesi — jurisdictional-dispute court.
    Uyusmazlik,
    /// Bedesten — cross-court federated index.
    Bedesten,
    /// Anayasa Mahkemesi — constitutional court.
    Anayasa,
    /// Sayıştay — court of accounts.
    Sayistay,
    /// KİK — public procurement authority.
    Kik,
    /// Rekabet Kurumu — competition authority.
    Rekabet,
    /// BDDK — banking regulation authority.
    Bddk,
    /// KVKK — personal data protection authority.
    Kvkk,
}

impl SourceId {
    /// Stable wire name, used in handles and telemetry.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Yargitay => "yargitay",
            Self::Danistay => "danistay",
            Self::Emsal => "emsal",
            Self::Uyusmazlik => "uyusmazlik",
            Self::Bedesten => "bedesten",
            Self::Anayasa => "anayasa",
            Self::Sayistay => "sayistay",
            Self::Kik => "kik",
            Self::Rekabet => "rekabet",
            Self::Bddk => "bddk",
            Self::Kvkk => "kvkk",
        }
    }

    /// All registered backends, in probe order.
    pub const ALL: [Self; 11] = [
        Self::Yargitay,
        Self::Danistay,
        Self::Emsal,
        Self::Uyusmazlik,
        Self::Bedesten,
        Self::Anayasa,
        Self::Sayistay,
        Self::Kik,
        Self::Rekabet,
        Self::Bddk,
        Self::Kvkk,
    ];

    fn parse(s: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|id| id.as_str() == s)
    }
}

impl std::fmt::Display for SourceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Declared container of a raw document as it leaves a backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContainerKind {
    /// Bare HTML fragment (no `<html>` wrapper guaranteed).
    HtmlFragment,
    /// Full HTML page.
    HtmlPage,
    /// PDF bytes.
    Pdf,
}

impl std::fmt::Display for ContainerKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::HtmlFragment => "html_fragment",
            Self::HtmlPage => "html_page",
            Self::Pdf => "pdf",
        };
        f.write_str(name)
    }
}

/// Opaque, URL-safe token identifying a decision for re-fetch.
///
/// Wire form is `<source_id>:<subtype>:<native_id>` where `native_id` is
/// URL-safe base64 (no padding) of the backend-native composite key. Two
/// searches returning the same underlying decision yield equal handles.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DocumentHandle {
    /// Owning backend.
    pub source: SourceId,
    /// Decision subtype within the backend; empty when the backend has none.
    pub subtype: String,
    /// Backend-native id: numeric id, URL path, or packed composite key.
    pub native_id: String,
}

impl DocumentHandle {
    /// Build a handle from its parts.
    pub fn new(source: SourceId, subtype: impl Into<String>, native_id: impl Into<String>) -> Self {
        Self {
            source,
            subtype: subtype.into(),
            native_id: native_id.into(),
        }
    }

    /// Encode to the wire form.
    pub fn encode(&self) -> String {
        let native = URL_SAFE_NO_PAD.encode(self.native_id.as_bytes());
        format!("{}:{}:{native}", self.source, self.subtype)
    }

    /// Parse a wire-form handle.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] when the shape, the source id, or
    /// the base64 payload is malformed.
    pub fn parse(token: &str) -> Result<Self> {
        let mut parts = token.splitn(3, ':');
        let (source, subtype, native) = match (parts.next(), parts.next(), parts.next()) {
            (Some(s), Some(t), Some(n)) => (s, t, n),
            _ => {
                return Err(Error::invalid_argument(
                    "document_handle",
                    format!("expected `source:subtype:id`, got `{token}`"),
                ));
            },
        };

        let source = SourceId::parse(source).ok_or_else(|| {
            Error::invalid_argument("document_handle", format!("unknown source `{source}`"))
        })?;

        let decoded = URL_SAFE_NO_PAD.decode(native).map_err(|_| {
            Error::invalid_argument("document_handle", "native id is not URL-safe base64")
        })?;
        let native_id = String::from_utf8(decoded).map_err(|_| {
            Error::invalid_argument("document_handle", "native id is not valid UTF-8")
        })?;

        Ok(Self {
            source,
            subtype: subtype.to_string(),
            native_id,
        })
    }
}

/// One decision in a search result page.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SearchEntry {
    /// Opaque wire-form handle, sufficient to re-fetch the document.
    pub handle: String,
    /// Human-readable title assembled from backend metadata.
    pub title: String,
    /// Chamber or deciding body, when the backend exposes it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chamber: Option<String>,
    /// Case number (esas no).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub case_number: Option<String>,
    /// Decision number (karar no).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub decision_number: Option<String>,
    /// Decision date as reported by the backend.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub decision_date: Option<String>,
    /// Applicant, subject, outcome and similar display-only fields.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub display_fields: Vec<(String, String)>,
}

impl SearchEntry {
    /// Build an entry with the title assembled from whatever metadata is
    /// available, in `chamber, case no, decision no, date` order.
    pub fn with_assembled_title(handle: &DocumentHandle) -> SearchEntryBuilder {
        SearchEntryBuilder {
            handle: handle.encode(),
            chamber: None,
            case_number: None,
            decision_number: None,
            decision_date: None,
            display_fields: Vec::new(),
        }
    }
}

/// Incremental builder for [`SearchEntry`] used by adapters.
#[derive(Debug)]
pub struct SearchEntryBuilder {
    handle: String,
    chamber: Option<String>,
    case_number: Option<String>,
    decision_number: Option<String>,
    decision_date: Option<String>,
    display_fields: Vec<(String, String)>,
}

impl SearchEntryBuilder {
    /// Set the chamber / deciding body.
    pub fn chamber(mut self, value: impl Into<Option<String>>) -> Self {
        self.chamber = value.into().filter(|s| !s.is_empty());
        self
    }

    /// Set the case number.
    pub fn case_number(mut self, value: impl Into<Option<String>>) -> Self {
        self.case_number = value.into().filter(|s| !s.is_empty());
        self
    }

    /// Set the decision number.
    pub fn decision_number(mut self, value: impl Into<Option<String>>) -> Self {
        self.decision_number = value.into().filter(|s| !s.is_empty());
        self
    }

    /// Set the decision date.
    pub fn decision_date(mut self, value: impl Into<Option<String>>) -> Self {
        self.decision_date = value.into().filter(|s| !s.is_empty());
        self
    }

    /// Attach a display-only field.
    pub fn display(mut self, key: &str, value: impl Into<Option<String>>) -> Self {
        if let Some(v) = value.into().filter(|s| !s.is_empty()) {
            self.display_fields.push((key.to_string(), v));
        }
        self
    }

    /// Finish, assembling the title from the populated parts.
    pub fn build(self) -> SearchEntry {
        let mut parts: Vec<&str> = Vec::new();
        if let Some(c) = self.chamber.as_deref() {
            parts.push(c);
        }
        if let Some(e) = self.case_number.as_deref() {
            parts.push(e);
        }
        if let Some(k) = self.decision_number.as_deref() {
            parts.push(k);
        }
        if let Some(d) = self.decision_date.as_deref() {
            parts.push(d);
        }
        let title = if parts.is_empty() {
            "(kayıt)".to_string()
        } else {
            parts.join(" ")
        };
        SearchEntry {
            handle: self.handle,
            title,
            chamber: self.chamber,
            case_number: self.case_number,
            decision_number: self.decision_number,
            decision_date: self.decision_date,
            display_fields: self.display_fields,
        }
    }
}

/// One page of search results in backend order.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SearchPage {
    /// Backend that produced this page.
    pub source: SourceId,
    /// Decision subtype searched; empty when the backend has none.
    pub subtype: String,
    /// Total matching records; `None` when the backend does not expose it.
    pub total_records: Option<u64>,
    /// 1-indexed page number that was fetched.
    pub page_index: u32,
    /// Requested page size.
    pub page_size: u32,
    /// Entries in backend order; `entries.len() <= page_size`.
    pub entries: Vec<SearchEntry>,
}

/// A normalized, chunked document ready for the tool surface.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedDocument {
    /// Wire-form handle this document was fetched by.
    pub handle: String,
    /// URL the source bytes were retrieved from.
    pub source_url: String,
    /// Total number of chunks.
    pub total_chunks: u32,
    /// 1-indexed chunk that is being returned (clamped).
    pub chunk_index: u32,
    /// Markdown text of the returned chunk.
    pub chunk_text: String,
    /// Whether the document spans more than one chunk.
    pub is_paginated: bool,
    /// Character count of the full Markdown document.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_char_count: Option<u64>,
}

/// Wire-date helpers.
///
/// The canonical argument form is ISO `YYYY-MM-DD`; each backend gets the
/// shape it expects.
pub mod dates {
    use crate::error::{Error, Result};

    /// Validate a canonical `YYYY-MM-DD` date argument.
    pub fn validate_iso(field: &str, value: &str) -> Result<()> {
        if chrono::NaiveDate::parse_from_str(value, "%Y-%m-%d").is_err() {
            return Err(Error::invalid_argument(
                field,
                format!("expected YYYY-MM-DD, got `{value}`"),
            ));
        }
        Ok(())
    }

    /// `YYYY-MM-DD` → `DD.MM.YYYY` (Yargıtay/Danıştay form fields).
    pub fn to_dotted(value: &str) -> String {
        match chrono::NaiveDate::parse_from_str(value, "%Y-%m-%d") {
            Ok(d) => d.format("%d.%m.%Y").to_string(),
            Err(_) => value.to_string(),
        }
    }

    /// `YYYY-MM-DD` → `DD/MM/YYYY` (WebForms date pickers).
    pub fn to_slashed(value: &str) -> String {
        match chrono::NaiveDate::parse_from_str(value, "%Y-%m-%d") {
            Ok(d) => d.format("%d/%m/%Y").to_string(),
            Err(_) => value.to_string(),
        }
    }

    /// Promote a start-of-range date to ISO-8601 midnight.
    pub fn promote_start(value: &str) -> String {
        format!("{value}T00:00:00.000Z")
    }

    /// Promote an end-of-range date to ISO-8601 end of day.
    pub fn promote_end(value: &str) -> String {
        format!("{value}T23:59:59.999Z")
    }
}
