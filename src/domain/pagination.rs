//! Page arithmetic shared by every list endpoint.

use serde::{Deserialize, Serialize};

/// Clamped page index plus the index of the last page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Pagination {
    pub limit: u64,
    pub page: u64,
}

/// Compute the last page index (`count / page_size`, floored) and clamp the
/// requested page to it.
///
/// A zero `page_size` yields `{limit: 0, page: 0}`.
pub fn paginate(count: u64, page_size: u64, page: u64) -> Pagination {
    if page_size == 0 {
        return Pagination { limit: 0, page: 0 };
    }
    let limit = count / page_size;
    Pagination {
        limit,
        page: page.min(limit),
    }
}

/// One page of rows together with the numbers the envelope reports.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub count: u64,
    pub page: u64,
    pub limit: u64,
}

impl<T> Page<T> {
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            count: self.count,
            page: self.page,
            limit: self.limit,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn first_page_is_kept() {
        assert_eq!(paginate(55, 20, 0), Pagination { limit: 2, page: 0 });
    }

    #[test]
    fn page_past_the_end_is_clamped() {
        assert_eq!(paginate(55, 20, 3), Pagination { limit: 2, page: 2 });
    }

    #[test]
    fn empty_table() {
        assert_eq!(paginate(0, 20, 5), Pagination { limit: 0, page: 0 });
    }

    #[test]
    fn zero_page_size_does_not_panic() {
        assert_eq!(paginate(10, 0, 4), Pagination { limit: 0, page: 0 });
    }

    proptest! {
        #[test]
        fn limit_is_floor_and_page_is_min(count in 0u64..1_000_000, page_size in 1u64..500, page in 0u64..10_000) {
            let p = paginate(count, page_size, page);
            prop_assert_eq!(p.limit, count / page_size);
            prop_assert_eq!(p.page, page.min(count / page_size));
        }
    }
}
