//! Common types for the shared crate

use serde::{Deserialize, Serialize};

/// Timestamp type (Unix milliseconds)
pub type Timestamp = i64;

/// Permission type
///
/// `"all"` (or `"*"`) grants everything, `"menu:*"` grants every `menu:` action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Permission(pub String);

impl Permission {
    /// Check if this permission grants access to the given resource action
    pub fn grants(&self, action: &str) -> bool {
        if self.0 == "all" || self.0 == "*" {
            return true;
        }
        if let Some(prefix) = self.0.strip_suffix(":*") {
            return action
                .strip_prefix(prefix)
                .is_some_and(|rest| rest.starts_with(':'));
        }
        self.0 == action
    }
}

impl std::fmt::Display for Permission {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Pagination query shared by list endpoints
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

impl PageQuery {
    /// `(limit, offset)` with `per_page` clamped to 1..=200 (default 50)
    pub fn limit_offset(&self) -> (i64, i64) {
        let per_page = self.per_page.unwrap_or(50).clamp(1, 200);
        let page = self.page.unwrap_or(1).max(1);
        (per_page, (page - 1) * per_page)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn permission_wildcards() {
        assert!(Permission("*".into()).grants("staff:manage"));
        assert!(Permission("all".into()).grants("payments:refund"));
        assert!(Permission("menu:*".into()).grants("menu:manage"));
        assert!(!Permission("menu:*".into()).grants("menus:manage"));
        assert!(Permission("kds:operate".into()).grants("kds:operate"));
        assert!(!Permission("kds:operate".into()).grants("kds:manage"));
    }

    #[test]
    fn page_query_clamps() {
        let q = PageQuery {
            page: Some(3),
            per_page: Some(1000),
        };
        assert_eq!(q.limit_offset(), (200, 400));
        assert_eq!(PageQuery::default().limit_offset(), (50, 0));
    }
}
