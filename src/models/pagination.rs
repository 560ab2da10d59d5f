use serde::Serialize;

/// A 1-indexed page request. Page numbers below 1 are clamped to 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Pagination {
    page: u32,
    per_page: u32,
}

impl Pagination {
    pub fn new(page: i64, per_page: u32) -> Self {
        Self {
            page: page.clamp(1, i64::from(u32::MAX)) as u32,
            per_page: per_page.max(1),
        }
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn per_page(&self) -> u32 {
        self.per_page
    }

    pub fn offset(&self) -> u64 {
        u64::from(self.page - 1) * u64::from(self.per_page)
    }

    /// Number of pages needed for `total` rows, i.e. ceil(total / per_page).
    pub fn page_count(&self, total: i64) -> u32 {
        if total <= 0 {
            return 0;
        }
        let per_page = i64::from(self.per_page);
        ((total + per_page - 1) / per_page) as u32
    }
}

/// What a paged index template needs besides the rows themselves.
#[derive(Debug, Clone, Serialize)]
pub struct PageInfo {
    pub page: u32,
    pub pages: u32,
    pub total: i64,
}

impl PageInfo {
    pub fn new(pagination: &Pagination, total: i64) -> Self {
        Self {
            page: pagination.page(),
            pages: pagination.page_count(total),
            total,
        }
    }
}
