//! Paging of search and history results.

use serde::{Deserialize, Serialize};

/// A request for one page of results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PagingRequest {
    first: usize,
    size: usize,
}

impl PagingRequest {
    /// A zero-size request: returns the total count without materializing
    /// any document. Used for existence-only queries.
    pub const NONE: Self = Self { first: 0, size: 0 };

    /// A request for every result.
    pub const ALL: Self = Self {
        first: 0,
        size: usize::MAX,
    };

    /// Request `size` results starting at zero-based index `first`.
    #[must_use]
    pub fn of_index(first: usize, size: usize) -> Self {
        Self { first, size }
    }

    /// Request the first `size` results.
    #[must_use]
    pub fn of_size(size: usize) -> Self {
        Self { first: 0, size }
    }

    /// Zero-based index of the first requested result.
    #[must_use]
    pub fn first(&self) -> usize {
        self.first
    }

    /// Requested page size.
    #[must_use]
    pub fn size(&self) -> usize {
        self.size
    }

    /// Exclusive end index of the requested window.
    #[must_use]
    pub fn end(&self) -> usize {
        self.first.saturating_add(self.size)
    }

    /// Slice `items` down to this window.
    #[must_use]
    pub fn select<T>(&self, items: Vec<T>) -> Vec<T> {
        items
            .into_iter()
            .skip(self.first)
            .take(self.size)
            .collect()
    }
}

impl Default for PagingRequest {
    fn default() -> Self {
        Self { first: 0, size: 20 }
    }
}

/// Paging metadata attached to a result: the request that produced it plus
/// the total number of matching items.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Paging {
    request: PagingRequest,
    total: usize,
}

impl Paging {
    /// Pair a request with the total match count.
    #[must_use]
    pub fn of(request: PagingRequest, total: usize) -> Self {
        Self { request, total }
    }

    /// The request that produced this page.
    #[must_use]
    pub fn request(&self) -> PagingRequest {
        self.request
    }

    /// Total number of matching items across all pages.
    #[must_use]
    pub fn total(&self) -> usize {
        self.total
    }

    /// Reduce the total, used when a permission decorator drops records.
    pub fn reduce_total(&mut self, by: usize) {
        self.total = self.total.saturating_sub(by);
    }

    /// Whether further pages exist beyond this one.
    #[must_use]
    pub fn has_more(&self) -> bool {
        self.request.end() < self.total
    }
}
