//! JSON output formatting
//!
//! Everything printed with `--format json` has the same envelope:
//! `{"data": ..., "meta": {"timestamp", "version", "page"?}}`.

use chrono::Utc;
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct JsonOutput<T> {
    pub data: T,
    pub meta: Metadata,
}

#[derive(Debug, Serialize)]
pub struct Metadata {
    /// When the CLI produced the output (RFC 3339)
    pub timestamp: String,

    /// CLI version
    pub version: String,

    /// Present only for paginated listings
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<PageMeta>,
}

/// Position of a listing within the catalog
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageMeta {
    pub page: u32,
    pub last_page: u32,
    pub total: u64,
    pub has_next: bool,
}

impl<T> JsonOutput<T> {
    pub fn new(data: T) -> Self {
        Self {
            data,
            meta: Metadata {
                timestamp: Utc::now().to_rfc3339(),
                version: env!("CARGO_PKG_VERSION").to_string(),
                page: None,
            },
        }
    }

    pub fn with_page(mut self, page: PageMeta) -> Self {
        self.meta.page = Some(page);
        self
    }
}

/// Format data as pretty-printed JSON
pub fn format_json<T: Serialize + ?Sized>(data: &T) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(&JsonOutput::new(data))
}

/// Format one page of a listing; the rows go in `data`, the position in `meta.page`
pub fn format_json_page<T: Serialize>(
    rows: &[T],
    page: PageMeta,
) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(&JsonOutput::new(rows).with_page(page))
}
