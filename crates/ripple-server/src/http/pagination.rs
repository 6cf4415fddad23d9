//! Page/limit query parameters and the paginated response envelope.

use serde::{Deserialize, Serialize};

/// `?page=&limit=` query parameters.
#[derive(Clone, Copy, Debug, Deserialize)]
#[serde(default)]
pub struct PageQuery {
    /// 1-based page number.
    pub page: i64,
    /// Items per page.
    pub limit: i64,
}

impl Default for PageQuery {
    fn default() -> Self {
        Self { page: 1, limit: 20 }
    }
}

impl PageQuery {
    /// Clamp to sane bounds and resolve the SQL offset.
    pub fn clamp(self, default_limit: i64, max_limit: i64) -> (i64, i64, i64) {
        let page = self.page.max(1);
        let limit = if self.limit <= 0 {
            default_limit
        } else {
            self.limit.min(max_limit)
        };
        let offset = (page - 1) * limit;
        (page, limit, offset)
    }
}

/// Paginated response envelope.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Paginated<T> {
    /// The page of items.
    pub items: Vec<T>,
    /// Total matching items.
    pub total: i64,
    /// 1-based page number.
    pub page: i64,
    /// Items per page.
    pub limit: i64,
    /// Total pages.
    pub pages: i64,
    /// Whether another page follows.
    pub has_more: bool,
}

impl<T> Paginated<T> {
    /// Wrap a page of items with the derived page counts.
    pub fn new(items: Vec<T>, total: i64, page: i64, limit: i64) -> Self {
        let pages = if total == 0 { 0 } else { (total + limit - 1) / limit };
        Self {
            items,
            total,
            page,
            limit,
            pages,
            has_more: page < pages,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
