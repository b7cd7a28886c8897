//! Business operations behind the HTTP routes
//!
//! Each service authorizes the calling principal, validates input, and talks
//! to its record stores. Handlers never touch a store directly.

pub mod articles;
pub mod categories;
pub mod users;

use serde::Serialize;

pub use articles::{ArticleService, ArticleUpdate, NewArticle};
pub use categories::CategoryService;
pub use users::{LoginOutcome, NewUser, UserService, UserUpdate};

pub const DEFAULT_PAGE_SIZE: u64 = 10;
pub const MAX_PAGE_SIZE: u64 = 100;
const MAX_OFFSET: u64 = i64::MAX as u64;

/// A requested page of results
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub size: u64,
    pub num: u64,
}

impl Page {
    /// Apply defaults: size 10 (capped at 100), page 1
    pub fn new(size: Option<u64>, num: Option<u64>) -> Self {
        let size = match size {
            None | Some(0) => DEFAULT_PAGE_SIZE,
            Some(s) => s.min(MAX_PAGE_SIZE),
        };
        let num = match num {
            None | Some(0) => 1,
            Some(n) => n,
        };
        Self { size, num }
    }

    pub fn limit(&self) -> u64 {
        self.size
    }

    /// Records to skip, capped at the largest skip a MongoDB query can carry
    pub fn offset(&self) -> u64 {
        (self.num - 1).saturating_mul(self.size).min(MAX_OFFSET)
    }
}

impl Default for Page {
    fn default() -> Self {
        Self::new(None, None)
    }
}

/// One page of items plus the total across all pages
#[derive(Debug, Clone, Serialize)]
pub struct Paged<T> {
    pub items: Vec<T>,
    pub total: u64,
}

impl<T> Paged<T> {
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Paged<U> {
        Paged {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_defaults_and_cap() {
        assert_eq!(Page::new(None, None), Page { size: 10, num: 1 });
        assert_eq!(Page::new(Some(0), Some(0)), Page { size: 10, num: 1 });
        assert_eq!(Page::new(Some(500), Some(2)).size, 100);
        assert_eq!(Page::new(Some(20), Some(3)).offset(), 40);
        assert_eq!(Page::default().offset(), 0);
    }

    #[test]
    fn test_offset_fits_a_store_skip() {
        let page = Page::new(Some(100), Some(u64::MAX));
        assert_eq!(page.offset(), i64::MAX as u64);
        assert!(i64::try_from(page.offset()).is_ok());
    }
}
