//! List query parameters and filter expressions.
//!
//! Filter values are always emitted as single-quoted literals with embedded
//! quotes escaped, so user input can never change the shape of a filter.
//! The backend reads any quote preceded by a backslash as escaped and never
//! unescapes backslashes themselves, so trailing backslashes are dropped
//! rather than doubled.

use std::fmt;

/// Page size used when iterating a whole collection.
pub const FULL_LIST_BATCH: u32 = 500;

/// Quote a value as a filter string literal.
#[must_use]
pub fn quote(value: &str) -> String {
    let value = value.trim_end_matches('\\');
    format!("'{}'", value.replace('\'', "\\'"))
}

/// A backend filter expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Filter(String);

impl Filter {
    /// `field = 'value'`
    #[must_use]
    pub fn eq(field: &str, value: impl AsRef<str>) -> Self {
        Self(format!("{field} = {}", quote(value.as_ref())))
    }

    /// `field != 'value'`
    #[must_use]
    pub fn ne(field: &str, value: impl AsRef<str>) -> Self {
        Self(format!("{field} != {}", quote(value.as_ref())))
    }

    /// `field ~ 'value'` (contains, case-insensitive).
    #[must_use]
    pub fn like(field: &str, value: impl AsRef<str>) -> Self {
        Self(format!("{field} ~ {}", quote(value.as_ref())))
    }

    /// `field = true|false`
    #[must_use]
    pub fn is(field: &str, value: bool) -> Self {
        Self(format!("{field} = {value}"))
    }

    /// Both conditions must hold.
    #[must_use]
    pub fn and(self, other: Self) -> Self {
        Self(format!("{} && {}", self.0, other.0))
    }

    /// Either condition holds. The result is parenthesized so it composes
    /// safely with [`Filter::and`].
    #[must_use]
    pub fn or(self, other: Self) -> Self {
        Self(format!("({} || {})", self.0, other.0))
    }

    /// The expression as sent to the backend.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Parameters for a record list request.
#[derive(Debug, Clone, Default)]
pub struct ListQuery {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
    pub sort: Option<String>,
    pub filter: Option<Filter>,
    pub expand: Option<String>,
    pub skip_total: bool,
}

impl ListQuery {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub const fn page(mut self, page: u32) -> Self {
        self.page = Some(page);
        self
    }

    #[must_use]
    pub const fn per_page(mut self, per_page: u32) -> Self {
        self.per_page = Some(per_page);
        self
    }

    #[must_use]
    pub fn sort(mut self, sort: impl Into<String>) -> Self {
        self.sort = Some(sort.into());
        self
    }

    #[must_use]
    pub fn filter(mut self, filter: Filter) -> Self {
        self.filter = Some(filter);
        self
    }

    /// Set the filter only when one is given.
    #[must_use]
    pub fn maybe_filter(mut self, filter: Option<Filter>) -> Self {
        self.filter = filter;
        self
    }

    #[must_use]
    pub fn expand(mut self, expand: impl Into<String>) -> Self {
        self.expand = Some(expand.into());
        self
    }

    /// Skip the total count query (`totalItems` comes back as -1).
    #[must_use]
    pub const fn skip_total(mut self) -> Self {
        self.skip_total = true;
        self
    }

    /// Render as URL query pairs.
    #[must_use]
    pub fn to_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        if let Some(page) = self.page {
            pairs.push(("page", page.to_string()));
        }
        if let Some(per_page) = self.per_page {
            pairs.push(("perPage", per_page.to_string()));
        }
        if let Some(sort) = &self.sort {
            pairs.push(("sort", sort.clone()));
        }
        if let Some(filter) = &self.filter {
            pairs.push(("filter", filter.as_str().to_string()));
        }
        if let Some(expand) = &self.expand {
            pairs.push(("expand", expand.clone()));
        }
        if self.skip_total {
            pairs.push(("skipTotal", "1".to_string()));
        }
        pairs
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_quote_escapes_single_quotes() {
        assert_eq!(quote("abc"), "'abc'");
        assert_eq!(quote("it's"), r"'it\'s'");
    }

    #[test]
    fn test_trailing_backslash_cannot_escape_closing_quote() {
        assert_eq!(quote(r"rose\"), "'rose'");
        assert_eq!(quote(r"rose\\\"), "'rose'");
        assert_eq!(quote(r"it's\"), r"'it\'s'");
        assert_eq!(Filter::like("name", r"rose\").as_str(), "name ~ 'rose'");
        // Inner backslashes are kept.
        assert_eq!(quote(r"a\b"), r"'a\b'");
    }

    #[test]
    fn test_injection_stays_inside_literal() {
        let filter = Filter::eq("user", "x' || id != '");
        assert_eq!(filter.as_str(), r"user = 'x\' || id != \''");
    }

    #[test]
    fn test_search_filter_composition() {
        let filter = Filter::eq("category", "c1").and(
            Filter::like("name", "rose").or(Filter::like("description", "rose")),
        );
        assert_eq!(
            filter.as_str(),
            "category = 'c1' && (name ~ 'rose' || description ~ 'rose')"
        );
    }

    #[test]
    fn test_bool_filter() {
        assert_eq!(Filter::is("featured", true).as_str(), "featured = true");
    }

    #[test]
    fn test_list_query_pairs() {
        let query = ListQuery::new()
            .page(2)
            .per_page(50)
            .sort("-created")
            .filter(Filter::ne("id", "p1"))
            .expand("category")
            .skip_total();
        let pairs = query.to_pairs();
        assert_eq!(
            pairs,
            vec![
                ("page", "2".to_string()),
                ("perPage", "50".to_string()),
                ("sort", "-created".to_string()),
                ("filter", "id != 'p1'".to_string()),
                ("expand", "category".to_string()),
                ("skipTotal", "1".to_string()),
            ]
        );
    }

    #[test]
    fn test_empty_query_has_no_pairs() {
        assert!(ListQuery::new().to_pairs().is_empty());
    }
}
