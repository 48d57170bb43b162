//! Page/limit/offset resolution.

/// Resolved pagination. Immutable once built.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    limit: i64,
    page: i64,
    offset: i64,
}

impl Pagination {
    /// Default page size used when the requested limit is not positive.
    pub const DEFAULT_LIMIT: i64 = 10;

    /// Build from a 1-based page and a page size.
    ///
    /// `page < 1` becomes 1 and `limit < 1` becomes [`Self::DEFAULT_LIMIT`].
    ///
    /// ```
    /// use pgfilter::Pagination;
    ///
    /// let p = Pagination::new(3, 20);
    /// assert_eq!((p.page(), p.limit(), p.offset()), (3, 20, 40));
    ///
    /// let p = Pagination::new(0, 0);
    /// assert_eq!((p.page(), p.limit(), p.offset()), (1, 10, 0));
    /// ```
    pub fn new(page: i64, limit: i64) -> Self {
        let page = page.max(1);
        let limit = if limit < 1 { Self::DEFAULT_LIMIT } else { limit };
        Self {
            limit,
            page,
            offset: (page - 1).saturating_mul(limit),
        }
    }

    pub fn limit(&self) -> i64 {
        self.limit
    }

    pub fn page(&self) -> i64 {
        self.page
    }

    pub fn offset(&self) -> i64 {
        self.offset
    }
}
