//! Pagination types for listing queries.

use serde::{Deserialize, Serialize};

/// Default number of items per page.
pub const DEFAULT_PAGE_SIZE: u32 = 20;

/// Maximum allowed items per page.
pub const MAX_PAGE_SIZE: u32 = 200;

/// Pagination options for listing queries.
///
/// Deserialized values go through [`Pagination::from_query`], so a request
/// body can never carry a zero page size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "PaginationQuery")]
pub struct Pagination {
    /// Page number (1-indexed).
    pub page: u32,
    /// Items per page.
    pub page_size: u32,
}

/// Wire form of [`Pagination`]; both fields optional.
#[derive(Deserialize)]
struct PaginationQuery {
    #[serde(default)]
    page: Option<u32>,
    #[serde(default)]
    page_size: Option<u32>,
}

impl From<PaginationQuery> for Pagination {
    fn from(query: PaginationQuery) -> Self {
        Self::from_query(query.page, query.page_size)
    }
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl Pagination {
    /// Creates a Pagination, clamping `page` to at least 1 and `page_size`
    /// to `1..=MAX_PAGE_SIZE`.
    pub fn new(page: u32, page_size: u32) -> Self {
        Self {
            page: page.max(1),
            page_size: page_size.clamp(1, MAX_PAGE_SIZE),
        }
    }

    /// Creates a Pagination from optional query parameters with defaults.
    pub fn from_query(page: Option<u32>, page_size: Option<u32>) -> Self {
        Self::new(page.unwrap_or(1), page_size.unwrap_or(DEFAULT_PAGE_SIZE))
    }

    /// Number of items skipped before this page.
    pub fn offset(&self) -> usize {
        (self.page.saturating_sub(1) as usize) * self.page_size as usize
    }

    pub fn limit(&self) -> usize {
        self.page_size as usize
    }

    /// Total pages for `total_items`; zero when there is nothing to show.
    pub fn total_pages(&self, total_items: u64) -> u32 {
        total_items.div_ceil(self.page_size.max(1) as u64) as u32
    }

    /// Cuts the requested page out of a fully filtered result set.
    pub fn apply<T>(&self, items: Vec<T>) -> Page<T> {
        let total = items.len() as u64;
        let page_items = items
            .into_iter()
            .skip(self.offset())
            .take(self.limit())
            .collect();
        Page::new(page_items, total, self)
    }
}

/// One page of results plus pagination metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// Total number of items matching the query (across all pages).
    pub total: u64,
    pub page: u32,
    pub page_size: u32,
    pub total_pages: u32,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, total: u64, pagination: &Pagination) -> Self {
        Self {
            items,
            total,
            page: pagination.page,
            page_size: pagination.page_size,
            total_pages: pagination.total_pages(total),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn has_next_page(&self) -> bool {
        self.page < self.total_pages
    }

    pub fn has_previous_page(&self) -> bool {
        self.page > 1
    }

    /// Maps the items to a different type.
    pub fn map<U, F>(self, f: F) -> Page<U>
    where
        F: FnMut(T) -> U,
    {
        Page {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            page: self.page,
            page_size: self.page_size,
            total_pages: self.total_pages,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pagination_clamping() {
        assert_eq!(Pagination::new(0, 0), Pagination::new(1, 1));
        assert_eq!(Pagination::new(3, 1000).page_size, MAX_PAGE_SIZE);
        assert_eq!(Pagination::from_query(None, None), Pagination::default());
        assert_eq!(Pagination::default().page_size, 20);
    }

    #[test]
    fn test_offset_and_total_pages() {
        let p = Pagination::new(3, 20);
        assert_eq!(p.offset(), 40);
        assert_eq!(p.total_pages(0), 0);
        assert_eq!(p.total_pages(20), 1);
        assert_eq!(p.total_pages(41), 3);
    }

    #[test]
    fn test_deserialize_clamps_page_size() {
        let p: Pagination = serde_json::from_str(r#"{"page": 1, "page_size": 0}"#).unwrap();
        assert_eq!(p.page_size, 1);

        let page = p.apply(vec![1, 2, 3]);
        assert_eq!(page.items, vec![1]);
        assert_eq!(page.total_pages, 3);

        let p: Pagination = serde_json::from_str(r#"{"page_size": 5000}"#).unwrap();
        assert_eq!(p, Pagination::new(1, MAX_PAGE_SIZE));
        let p: Pagination = serde_json::from_str("{}").unwrap();
        assert_eq!(p, Pagination::default());
    }

    #[test]
    fn test_zero_page_size_literal_does_not_panic() {
        let p = Pagination {
            page: 1,
            page_size: 0,
        };
        assert_eq!(p.total_pages(3), 3);
    }

    #[test]
    fn test_apply() {
        let page = Pagination::new(2, 3).apply((1..=7).collect::<Vec<_>>());
        assert_eq!(page.items, vec![4, 5, 6]);
        assert_eq!(page.total, 7);
        assert_eq!(page.total_pages, 3);
        assert!(page.has_next_page());
        assert!(page.has_previous_page());

        let last = Pagination::new(3, 3).apply((1..=7).collect::<Vec<_>>());
        assert_eq!(last.items, vec![7]);
        assert!(!last.has_next_page());

        let beyond = Pagination::new(9, 3).apply((1..=7).collect::<Vec<_>>());
        assert!(beyond.is_empty());
    }

    #[test]
    fn test_map() {
        let page = Pagination::default().apply(vec![1, 2]).map(|n| n * 10);
        assert_eq!(page.items, vec![10, 20]);
        assert_eq!(page.len(), 2);
    }
}
