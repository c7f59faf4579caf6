//! Page/per-page handling for list endpoints.

use serde::{Deserialize, Serialize};

pub const MAX_PER_PAGE: u32 = 100;

/// 1-based page request as it arrives from a query string.
#[derive(Clone, Copy, Debug, Deserialize)]
pub struct Pagination {
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_per_page")]
    pub per_page: u32,
}

fn default_page() -> u32 { 1 }
fn default_per_page() -> u32 { 20 }

impl Pagination {
    /// Clamped copy: page >= 1, per_page within 1..=100.
    pub fn normalized(self) -> Self {
        Self { page: self.page.max(1), per_page: self.per_page.clamp(1, MAX_PER_PAGE) }
    }

    /// Row offset and limit for the normalized request.
    pub fn offset_limit(self) -> (u64, u64) {
        let n = self.normalized();
        ((n.page as u64 - 1) * n.per_page as u64, n.per_page as u64)
    }
}

impl Default for Pagination {
    fn default() -> Self { Self { page: default_page(), per_page: default_per_page() } }
}

/// One page of results plus the total row count across all pages.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u32,
    pub per_page: u32,
}
