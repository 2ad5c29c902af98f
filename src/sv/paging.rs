use serde::{Deserialize, Serialize};

pub const DEFAULT_PER_PAGE: u64 = 10;
pub const MAX_PER_PAGE: u64 = 100;
pub const MAX_PAGE: u64 = 1_000_000;

/// 1-based page request as it arrives from a query string.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct PageQuery {
  pub page: Option<u64>,
  pub per_page: Option<u64>,
}

impl PageQuery {
  pub fn page(&self) -> u64 {
    self.page.unwrap_or(1).clamp(1, MAX_PAGE)
  }

  pub fn per_page(&self) -> u64 {
    self.per_page.unwrap_or(DEFAULT_PER_PAGE).clamp(1, MAX_PER_PAGE)
  }

  pub fn offset(&self) -> u64 {
    (self.page() - 1).saturating_mul(self.per_page())
  }
}

#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
  pub items: Vec<T>,
  pub page: u64,
  pub per_page: u64,
  pub total: u64,
  pub pages: u64,
}

impl<T> Page<T> {
  pub fn new(items: Vec<T>, query: PageQuery, total: u64) -> Self {
    let per_page = query.per_page();
    Self {
      items,
      page: query.page(),
      per_page,
      total,
      pages: total.div_ceil(per_page),
    }
  }
}
