//! Transactional orchestration over the store.
//!
//! Every mutating operation opens one sqlx transaction, does all of its
//! reads and writes inside it, and commits at the end; any error unwinds
//! the whole transaction so no partial state is ever visible.

use serde::{Deserialize, Serialize};

pub mod cart;
pub mod catalog;
pub mod orders;
pub mod users;

/// 1-based pagination query parameters.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct PageParams {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

impl PageParams {
    pub fn page(&self) -> u32 {
        self.page.unwrap_or(1).max(1)
    }

    pub fn per_page(&self) -> u32 {
        self.per_page.unwrap_or(10).min(100)
    }

    pub fn limit(&self) -> i64 {
        i64::from(self.per_page())
    }

    pub fn offset(&self) -> i64 {
        // Widen before multiplying; page * per_page can exceed u32.
        (i64::from(self.page()) - 1) * i64::from(self.per_page())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub data: Vec<T>,
    pub total: i64,
    pub page: u32,
    pub per_page: u32,
}

impl<T> Page<T> {
    pub fn new(data: Vec<T>, total: i64, params: PageParams) -> Self {
        Self {
            data,
            total,
            page: params.page(),
            per_page: params.per_page(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_params_clamp_and_offset() {
        let p = PageParams {
            page: Some(3),
            per_page: Some(20),
        };
        assert_eq!(p.limit(), 20);
        assert_eq!(p.offset(), 40);

        let p = PageParams {
            page: Some(0),
            per_page: Some(500),
        };
        assert_eq!(p.page(), 1);
        assert_eq!(p.per_page(), 100);
        assert_eq!(p.offset(), 0);
    }

    #[test]
    fn huge_page_numbers_do_not_overflow() {
        let p = PageParams {
            page: Some(u32::MAX),
            per_page: Some(100),
        };
        assert_eq!(p.offset(), (i64::from(u32::MAX) - 1) * 100);
    }
}
