//! Pagination over a counted table.
use crate::model::Limit;
use serde::Serialize;

pub const DEFAULT_PAGE_SIZE: u32 = 10;

/// One page of a listing: which rows to fetch and how to navigate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Page {
    pub item_count: u32,
    pub page_index: u32,
    pub page_size: u32,
    pub page_count: u32,
    pub offset: u32,
    pub limit: u32,
    pub has_next: bool,
    pub has_previous: bool,
}

impl Page {
    /// Computes the page for a 1-based `page_index`.
    ///
    /// An empty listing, or an index past the last page, yields page 1 with
    /// a zero limit.
    pub fn new(item_count: u32, page_index: u32, page_size: u32) -> Self {
        let page_size = page_size.max(1);
        let page_count = item_count.div_ceil(page_size);
        let (page_index, offset, limit) =
            if item_count == 0 || page_index == 0 || page_index > page_count {
                (1, 0, 0)
            } else {
                (page_index, page_size * (page_index - 1), page_size)
            };
        Page {
            item_count,
            page_index,
            page_size,
            page_count,
            offset,
            limit,
            has_next: page_index < page_count,
            has_previous: page_index > 1,
        }
    }

    /// `LIMIT offset, limit` for `find_all`.
    pub fn to_limit(&self) -> Limit {
        Limit::Range {
            offset: self.offset,
            count: self.limit,
        }
    }

    /// Parses a page index from a query string value, falling back to 1.
    pub fn parse_index(text: &str) -> u32 {
        text.trim().parse::<u32>().ok().filter(|p| *p >= 1).unwrap_or(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_bounds() {
        let page = Page::new(91, 1, DEFAULT_PAGE_SIZE);
        assert_eq!(page.page_count, 10);
        assert_eq!((page.offset, page.limit), (0, 10));
        assert!(page.has_next);
        assert!(!page.has_previous);

        let last = Page::new(91, 10, DEFAULT_PAGE_SIZE);
        assert_eq!((last.offset, last.limit), (90, 10));
        assert!(!last.has_next);
        assert!(last.has_previous);
    }

    #[test]
    fn test_out_of_range_page() {
        let empty = Page::new(0, 1, DEFAULT_PAGE_SIZE);
        assert_eq!(empty.page_count, 0);
        assert_eq!((empty.page_index, empty.offset, empty.limit), (1, 0, 0));
        assert!(!empty.has_next);

        let past = Page::new(5, 3, DEFAULT_PAGE_SIZE);
        assert_eq!((past.page_index, past.limit), (1, 0));
        assert_eq!(past.to_limit(), Limit::Range { offset: 0, count: 0 });
    }

    #[test]
    fn test_parse_index() {
        assert_eq!(Page::parse_index("3"), 3);
        assert_eq!(Page::parse_index("0"), 1);
        assert_eq!(Page::parse_index("abc"), 1);
    }
}
