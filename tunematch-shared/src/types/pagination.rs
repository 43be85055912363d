use serde::{Deserialize, Serialize};

pub const DEFAULT_PER_PAGE: u64 = 6;
pub const MAX_PER_PAGE: u64 = 50;

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct PaginationParams {
    #[serde(default = "default_page")]
    pub page: u64,
    #[serde(default = "default_per_page")]
    pub per_page: u64,
}

fn default_page() -> u64 { 1 }
fn default_per_page() -> u64 { DEFAULT_PER_PAGE }

impl PaginationParams {
    pub fn new(page: u64, per_page: u64) -> Self {
        Self { page, per_page }
    }

    /// Page numbers are 1-based; page 0 is treated as page 1.
    pub fn offset(&self) -> u64 {
        (self.page.max(1) - 1) * self.limit()
    }

    pub fn limit(&self) -> u64 {
        self.per_page.clamp(1, MAX_PER_PAGE)
    }
}

impl Default for PaginationParams {
    fn default() -> Self {
        Self { page: 1, per_page: DEFAULT_PER_PAGE }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Paginated<T: Serialize> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u64,
    pub per_page: u64,
    pub total_pages: u64,
}

impl<T: Serialize> Paginated<T> {
    pub fn new(items: Vec<T>, total: u64, params: &PaginationParams) -> Self {
        let per_page = params.limit();
        Self {
            items,
            total,
            page: params.page.max(1),
            per_page,
            total_pages: total.div_ceil(per_page),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offset_and_limit() {
        let params = PaginationParams::new(3, 6);
        assert_eq!(params.offset(), 12);
        assert_eq!(params.limit(), 6);

        let params = PaginationParams::new(0, 500);
        assert_eq!(params.offset(), 0);
        assert_eq!(params.limit(), MAX_PER_PAGE);
    }

    #[test]
    fn total_pages_rounds_up() {
        let params = PaginationParams::default();
        let page = Paginated::new(vec![1, 2, 3, 4, 5, 6], 13, &params);
        assert_eq!(page.total_pages, 3);

        let empty: Paginated<i32> = Paginated::new(vec![], 0, &params);
        assert_eq!(empty.total_pages, 0);
    }
}
