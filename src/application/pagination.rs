//! Offset pagination over the product collection.

use serde::Serialize;
use thiserror::Error;

use crate::cache::QueryKey;

pub const DEFAULT_PAGE_SIZE: u32 = 10;

/// A 1-based page of `page_size` products.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PageRequest {
    page: u32,
    page_size: u32,
}

impl PageRequest {
    pub fn new(page: u32, page_size: u32) -> Result<Self, PaginationError> {
        if page == 0 {
            return Err(PaginationError::ZeroPage);
        }
        if page_size == 0 {
            return Err(PaginationError::ZeroPageSize);
        }
        Ok(Self { page, page_size })
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    /// Offset of the first product on this page.
    pub fn skip(&self) -> Result<u32, PaginationError> {
        (self.page - 1)
            .checked_mul(self.page_size)
            .ok_or(PaginationError::OffsetOverflow {
                page: self.page,
                page_size: self.page_size,
            })
    }

    pub fn query_key(&self) -> Result<QueryKey, PaginationError> {
        Ok(QueryKey::Products {
            limit: self.page_size,
            skip: self.skip()?,
        })
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

/// Number of pages needed to show `total` products.
pub fn page_count(total: u64, page_size: u32) -> u64 {
    if page_size == 0 {
        return 0;
    }
    total.div_ceil(u64::from(page_size))
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PaginationError {
    #[error("pages are numbered from 1")]
    ZeroPage,
    #[error("page size must be positive")]
    ZeroPageSize,
    #[error("page {page} with size {page_size} is out of range")]
    OffsetOverflow { page: u32, page_size: u32 },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn skip_follows_page_and_size() {
        let request = PageRequest::new(3, 10).expect("valid page");
        assert_eq!(request.skip(), Ok(20));
        assert_eq!(
            request.query_key(),
            Ok(QueryKey::Products {
                limit: 10,
                skip: 20
            })
        );
        assert_eq!(PageRequest::default().skip(), Ok(0));
    }

    #[test]
    fn page_count_rounds_up() {
        assert_eq!(page_count(194, 10), 20);
        assert_eq!(page_count(190, 10), 19);
        assert_eq!(page_count(0, 10), 0);
        assert_eq!(page_count(5, 0), 0);
    }

    #[test]
    fn rejects_zero_and_overflowing_pages() {
        assert_eq!(PageRequest::new(0, 10), Err(PaginationError::ZeroPage));
        assert_eq!(PageRequest::new(1, 0), Err(PaginationError::ZeroPageSize));

        let huge = PageRequest::new(u32::MAX, 100).expect("valid numbers");
        assert!(matches!(huge.skip(), Err(PaginationError::OffsetOverflow { .. })));
    }
}
