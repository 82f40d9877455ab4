//! Page/size query planning.

/// Default page size, also the hard cap. There is no larger tier.
pub const DEFAULT_PAGE_SIZE: i64 = 10;

/// Safe query plan derived from raw `page`/`size` inputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PagePlan {
    pub page: i64,
    pub size: i64,
}

impl PagePlan {
    /// Clamp untyped query inputs into a plan.
    ///
    /// `page`: unparsable becomes 0, negatives clamp to 0.
    /// `size`: values inside `[1, DEFAULT_PAGE_SIZE]` are honored; anything
    /// else collapses to exactly `DEFAULT_PAGE_SIZE`, not the nearest bound.
    pub fn from_raw(page: Option<&str>, size: Option<&str>) -> Self {
        let page = page
            .and_then(|raw| raw.trim().parse::<i64>().ok())
            .unwrap_or(0)
            .max(0);

        let size = match size.and_then(|raw| raw.trim().parse::<i64>().ok()) {
            Some(size) if (1..=DEFAULT_PAGE_SIZE).contains(&size) => size,
            _ => DEFAULT_PAGE_SIZE,
        };

        Self { page, size }
    }

    pub fn offset(&self) -> i64 {
        self.page * self.size
    }

    pub fn limit(&self) -> i64 {
        self.size
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_when_absent() {
        let plan = PagePlan::from_raw(None, None);
        assert_eq!(plan, PagePlan { page: 0, size: 10 });
        assert_eq!(plan.offset(), 0);
        assert_eq!(plan.limit(), 10);
    }

    #[test]
    fn test_page_clamping() {
        assert_eq!(PagePlan::from_raw(Some("-5"), None).page, 0);
        assert_eq!(PagePlan::from_raw(Some("abc"), None).page, 0);
        assert_eq!(PagePlan::from_raw(Some("3"), None).page, 3);
    }

    #[test]
    fn test_size_collapses_to_default_not_nearest_bound() {
        for raw in ["0", "-1", "1000", "11", "abc", ""] {
            let plan = PagePlan::from_raw(None, Some(raw));
            assert_eq!(plan.size, DEFAULT_PAGE_SIZE, "size: {raw:?}");
        }
    }

    #[test]
    fn test_smaller_valid_size_is_honored() {
        assert_eq!(PagePlan::from_raw(None, Some("5")).size, 5);
        assert_eq!(PagePlan::from_raw(None, Some("1")).size, 1);
        assert_eq!(PagePlan::from_raw(None, Some("10")).size, 10);
    }

    #[test]
    fn test_offset_is_page_times_size() {
        let plan = PagePlan::from_raw(Some("2"), Some("5"));
        assert_eq!(plan.offset(), 10);
        assert_eq!(plan.limit(), 5);
    }
}
