use serde::{Deserialize, Serialize};

pub const DEFAULT_LIMIT: i64 = 10;
pub const MAX_LIMIT: i64 = 100;

/// `page` / `limit` query parameters. Missing, zero or negative values fall
/// back to page 1 and the default limit.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct PageParams {
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

impl PageParams {
    pub fn page(&self) -> i64 {
        self.page.filter(|p| *p >= 1).unwrap_or(1)
    }

    pub fn limit(&self) -> i64 {
        self.limit
            .filter(|l| *l >= 1)
            .map(|l| l.min(MAX_LIMIT))
            .unwrap_or(DEFAULT_LIMIT)
    }

    pub fn offset(&self) -> i64 {
        (self.page() - 1).saturating_mul(self.limit())
    }

    pub fn envelope(&self, total: i64) -> Pagination {
        Pagination::new(self.page(), self.limit(), total)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub current: i64,
    pub pages: i64,
    pub total: i64,
    pub has_next: bool,
    pub has_prev: bool,
}

impl Pagination {
    pub fn new(current: i64, limit: i64, total: i64) -> Self {
        let limit = limit.max(1);
        let pages = (total + limit - 1) / limit;
        Pagination {
            current,
            pages,
            total,
            has_next: current < pages,
            has_prev: current > 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_and_clamping() {
        let params = PageParams::default();
        assert_eq!((params.page(), params.limit(), params.offset()), (1, 10, 0));

        let params = PageParams { page: Some(0), limit: Some(500) };
        assert_eq!((params.page(), params.limit()), (1, 100));

        let params = PageParams { page: Some(3), limit: Some(20) };
        assert_eq!(params.offset(), 40);
    }

    #[test]
    fn test_offset_saturates_for_huge_pages() {
        let params = PageParams { page: Some(i64::MAX), limit: Some(10) };
        assert_eq!(params.offset(), i64::MAX);

        let p = params.envelope(5);
        assert_eq!(p.pages, 1);
        assert!(!p.has_next);
        assert!(p.has_prev);
    }

    #[test]
    fn test_envelope_flags() {
        let p = Pagination::new(1, 10, 25);
        assert_eq!(p.pages, 3);
        assert!(p.has_next);
        assert!(!p.has_prev);

        let p = Pagination::new(3, 10, 25);
        assert!(!p.has_next);
        assert!(p.has_prev);

        let p = Pagination::new(1, 10, 0);
        assert_eq!(p.pages, 0);
        assert!(!p.has_next);
    }

    #[test]
    fn test_serializes_camel_case() {
        let json = serde_json::to_value(Pagination::new(2, 10, 30)).unwrap();
        assert_eq!(json["hasNext"], true);
        assert_eq!(json["hasPrev"], true);
        assert_eq!(json["pages"], 3);
    }
}
