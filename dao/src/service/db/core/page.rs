//! 페이지 결과 모듈
//!
//! 한 페이지의 결과와 페이지 계산 정보를 담는 불변 값 객체입니다.

use serde::Serialize;

/// One page of query results plus derived pagination metadata.
///
/// All derived values are computed once in [`Page::new`]:
///
/// * `page_count = max(1, ceil(total_count / page_size))`
/// * `current_page` is the requested page clamped to `1..=page_count`
///   (always 1 when there are no rows)
/// * `next_page` / `previous_page` stay inside `1..=page_count`
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    list: Vec<T>,
    requested_page_number: i64,
    page_size: i64,
    total_count: i64,
    page_count: i64,
    current_page: i64,
    next_page: i64,
    previous_page: i64,
}

impl<T> Page<T> {
    pub fn new(list: Vec<T>, requested_page_number: i64, page_size: i64, total_count: i64) -> Self {
        let page_count = if page_size > 0 && total_count > 0 {
            total_count / page_size + i64::from(total_count % page_size != 0)
        } else {
            0
        };

        let (page_count, current_page) = if page_count == 0 {
            (1, 1)
        } else {
            (page_count, requested_page_number.clamp(1, page_count))
        };

        let next_page = (current_page + 1).min(page_count);
        let previous_page = (current_page - 1).max(1);

        Self {
            list,
            requested_page_number,
            page_size,
            total_count,
            page_count,
            current_page,
            next_page,
            previous_page,
        }
    }

    /// Page without rows.
    pub fn empty(requested_page_number: i64, page_size: i64) -> Self {
        Self::new(Vec::new(), requested_page_number, page_size, 0)
    }

    pub fn list(&self) -> &[T] {
        &self.list
    }

    pub fn into_list(self) -> Vec<T> {
        self.list
    }

    pub fn requested_page_number(&self) -> i64 {
        self.requested_page_number
    }

    pub fn page_size(&self) -> i64 {
        self.page_size
    }

    pub fn total_count(&self) -> i64 {
        self.total_count
    }

    pub fn page_count(&self) -> i64 {
        self.page_count
    }

    pub fn current_page(&self) -> i64 {
        self.current_page
    }

    pub fn next_page(&self) -> i64 {
        self.next_page
    }

    pub fn previous_page(&self) -> i64 {
        self.previous_page
    }

    pub fn is_first(&self) -> bool {
        self.current_page == 1
    }

    pub fn is_last(&self) -> bool {
        self.current_page == self.page_count
    }

    /// Converts the rows, keeping the pagination metadata.
    pub fn map<U, F: FnMut(T) -> U>(self, f: F) -> Page<U> {
        Page {
            list: self.list.into_iter().map(f).collect(),
            requested_page_number: self.requested_page_number,
            page_size: self.page_size,
            total_count: self.total_count,
            page_count: self.page_count,
            current_page: self.current_page,
            next_page: self.next_page,
            previous_page: self.previous_page,
        }
    }
}

impl<T> Default for Page<T> {
    fn default() -> Self {
        Self::empty(1, 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_count_rounds_up() {
        assert_eq!(Page::<()>::new(vec![], 1, 10, 25).page_count(), 3);
        assert_eq!(Page::<()>::new(vec![], 1, 10, 30).page_count(), 3);
        assert_eq!(Page::<()>::new(vec![], 1, 10, 31).page_count(), 4);
        assert_eq!(Page::<()>::new(vec![], 1, 10, 1).page_count(), 1);
    }

    #[test]
    fn test_page_count_property() {
        for total in 0..200i64 {
            for size in 1..25i64 {
                let page = Page::<()>::new(vec![], 1, size, total);
                let expected = ((total as f64) / (size as f64)).ceil().max(1.0) as i64;
                assert_eq!(page.page_count(), expected, "total={total} size={size}");
            }
        }
    }

    #[test]
    fn test_current_page_is_clamped() {
        for requested in -5..20i64 {
            let page = Page::<()>::new(vec![], requested, 10, 35);
            assert!(page.current_page() >= 1);
            assert!(page.current_page() <= page.page_count());
            assert_eq!(page.next_page(), (page.current_page() + 1).min(page.page_count()));
            assert_eq!(page.previous_page(), (page.current_page() - 1).max(1));
        }

        assert_eq!(Page::<()>::new(vec![], 9, 10, 35).current_page(), 4);
        assert_eq!(Page::<()>::new(vec![], 0, 10, 35).current_page(), 1);
        assert_eq!(Page::<()>::new(vec![], -3, 10, 35).current_page(), 1);
    }

    #[test]
    fn test_empty_count_forces_first_page() {
        for requested in [-1, 0, 1, 2, 50] {
            let page = Page::<()>::new(vec![], requested, 10, 0);
            assert_eq!(page.page_count(), 1);
            assert_eq!(page.current_page(), 1);
            assert_eq!(page.next_page(), 1);
            assert_eq!(page.previous_page(), 1);
        }

        let page = Page::<()>::new(vec![], 3, 10, -4);
        assert_eq!(page.page_count(), 1);
        assert_eq!(page.current_page(), 1);
    }

    #[test]
    fn test_non_positive_page_size_does_not_divide_by_zero() {
        let page = Page::<()>::new(vec![], 2, 0, 25);
        assert_eq!(page.page_count(), 1);
        assert_eq!(page.current_page(), 1);
    }

    #[test]
    fn test_neighbours_of_middle_page() {
        let page = Page::new(vec![1, 2, 3], 2, 10, 25);
        assert_eq!(page.page_count(), 3);
        assert_eq!(page.current_page(), 2);
        assert_eq!(page.next_page(), 3);
        assert_eq!(page.previous_page(), 1);
        assert_eq!(page.list(), &[1, 2, 3]);
        assert!(!page.is_first());
        assert!(!page.is_last());
    }

    #[test]
    fn test_map_keeps_metadata() {
        let page = Page::new(vec![1, 2], 2, 2, 4).map(|v| v * 10);
        assert_eq!(page.list(), &[10, 20]);
        assert_eq!(page.current_page(), 2);
        assert!(page.is_last());
    }

    #[test]
    fn test_serializes_camel_case() {
        let json = serde_json::to_value(Page::new(vec!["a"], 1, 10, 1)).unwrap();
        assert_eq!(json["pageCount"], 1);
        assert_eq!(json["totalCount"], 1);
        assert_eq!(json["list"][0], "a");
    }
}
