//! Request helpers shared by list endpoints

/// Default page size for list endpoints
pub const DEFAULT_PAGE_SIZE: u32 = 20;
/// Upper bound for `limit`
pub const MAX_PAGE_SIZE: u32 = 100;

/// Normalized pagination window
///
/// Query structs carry raw `page`/`limit` options and convert through
/// [`Page::new`] so out-of-range values are clamped instead of rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub page: u32,
    pub limit: u32,
}

impl Page {
    pub fn new(page: Option<u32>, limit: Option<u32>) -> Self {
        Self {
            page: page.unwrap_or(1).max(1),
            limit: limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE),
        }
    }

    pub fn offset(&self) -> i64 {
        i64::from(self.page - 1) * i64::from(self.limit)
    }

    pub fn limit(&self) -> i64 {
        i64::from(self.limit)
    }
}

impl Default for Page {
    fn default() -> Self {
        Self::new(None, None)
    }
}
