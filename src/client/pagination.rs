//! Pagination parameters for movie listing
//!
//! The catalog paginates with 1-based `page` and a `limit` of items per page.

/// First page number
pub const DEFAULT_PAGE: u32 = 1;

/// Items per page when none is requested
pub const DEFAULT_LIMIT: u32 = 10;

/// Pagination parameters for `GET /movies`.
///
/// Zero values are clamped to 1 so every instance maps to a real page.
///
/// # Example
/// ```ignore
/// let params = PaginationParams::new().page(2).limit(25);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PaginationParams {
    pub page: u32,
    pub limit: u32,
}

impl Default for PaginationParams {
    fn default() -> Self {
        Self {
            page: DEFAULT_PAGE,
            limit: DEFAULT_LIMIT,
        }
    }
}

impl PaginationParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the page number (1-based).
    pub fn page(mut self, page: u32) -> Self {
        self.page = page.max(1);
        self
    }

    /// Set the number of items per page.
    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = limit.max(1);
        self
    }

    /// Query string pairs in the backend's parameter names.
    pub fn to_query_params(&self) -> Vec<(&'static str, String)> {
        vec![
            ("page", self.page.to_string()),
            ("limit", self.limit.to_string()),
        ]
    }
}

/// Number of pages needed for `total` items at `limit` per page
#[cfg(test)]
pub fn page_count(total: u64, limit: u32) -> u32 {
    let limit = u64::from(limit.max(1));
    u32::try_from(total.div_ceil(limit)).unwrap_or(u32::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let params = PaginationParams::new();
        assert_eq!(params.page, 1);
        assert_eq!(params.limit, 10);

        let query = params.to_query_params();
        assert_eq!(query, vec![("page", "1".to_string()), ("limit", "10".to_string())]);
    }

    #[test]
    fn test_builder_clamps_zero() {
        let params = PaginationParams::new().page(0).limit(0);
        assert_eq!(params.page, 1);
        assert_eq!(params.limit, 1);
    }

    #[test]
    fn test_page_count() {
        assert_eq!(page_count(25, 10), 3);
        assert_eq!(page_count(30, 10), 3);
        assert_eq!(page_count(0, 10), 0);
        assert_eq!(page_count(1, 0), 1);
    }
}
