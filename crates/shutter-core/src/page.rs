//! Offset pagination shared by every list endpoint.

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

pub const MAX_PAGE_SIZE: u32 = 100;

/// A validated request for one page. Page numbers start at 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
  number: u32,
  size:   u32,
}

impl PageRequest {
  pub fn new(number: u32, size: u32) -> Result<Self> {
    if number == 0 {
      return Err(Error::InvalidPageRequest("page number starts at 1".into()));
    }
    if size == 0 || size > MAX_PAGE_SIZE {
      return Err(Error::InvalidPageRequest(format!(
        "page size must be between 1 and {MAX_PAGE_SIZE}"
      )));
    }
    Ok(Self { number, size })
  }

  pub fn number(&self) -> u32 { self.number }

  pub fn size(&self) -> u32 { self.size }

  /// Number of items to skip.
  pub fn offset(&self) -> u64 { u64::from(self.number - 1) * u64::from(self.size) }

  pub fn limit(&self) -> u64 { u64::from(self.size) }
}

impl Default for PageRequest {
  fn default() -> Self { Self { number: 1, size: 10 } }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
  pub items:       Vec<T>,
  pub number:      u32,
  pub size:        u32,
  pub total_items: u64,
  pub total_pages: u64,
}

impl<T> Page<T> {
  pub fn new(items: Vec<T>, request: PageRequest, total_items: u64) -> Self {
    Self {
      items,
      number: request.number,
      size: request.size,
      total_items,
      total_pages: total_items.div_ceil(u64::from(request.size)),
    }
  }

  pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
    Page {
      items:       self.items.into_iter().map(f).collect(),
      number:      self.number,
      size:        self.size,
      total_items: self.total_items,
      total_pages: self.total_pages,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn rejects_page_zero_and_bad_sizes() {
    assert!(PageRequest::new(0, 10).is_err());
    assert!(PageRequest::new(1, 0).is_err());
    assert!(PageRequest::new(1, MAX_PAGE_SIZE + 1).is_err());
    assert!(PageRequest::new(1, MAX_PAGE_SIZE).is_ok());
  }

  #[test]
  fn offset_skips_previous_pages() {
    let req = PageRequest::new(3, 25).unwrap();
    assert_eq!(req.offset(), 50);
    assert_eq!(req.limit(), 25);
  }

  #[test]
  fn total_pages_rounds_up() {
    let req = PageRequest::new(1, 10).unwrap();
    assert_eq!(Page::<()>::new(vec![], req, 0).total_pages, 0);
    assert_eq!(Page::<()>::new(vec![], req, 10).total_pages, 1);
    assert_eq!(Page::<()>::new(vec![], req, 11).total_pages, 2);
  }

  #[test]
  fn map_keeps_metadata() {
    let req = PageRequest::new(2, 2).unwrap();
    let page = Page::new(vec![1, 2], req, 5).map(|n| n * 10);
    assert_eq!(page.items, vec![10, 20]);
    assert_eq!(page.number, 2);
    assert_eq!(page.total_pages, 3);
  }
}
