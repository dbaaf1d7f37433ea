//! Result attributes: ordering, pagination and grouping.

/// Order direction for sorting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderDirection {
    /// Ascending order (ASC)
    Asc,
    /// Descending order (DESC)
    Desc,
}

/// An ordering specification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderBy {
    /// Column to order by
    pub column: String,
    /// Order direction
    pub direction: OrderDirection,
}

impl OrderBy {
    /// Creates a new ascending order specification.
    #[must_use]
    pub fn asc(column: &str) -> Self {
        Self {
            column: column.to_string(),
            direction: OrderDirection::Asc,
        }
    }

    /// Creates a new descending order specification.
    #[must_use]
    pub fn desc(column: &str) -> Self {
        Self {
            column: column.to_string(),
            direction: OrderDirection::Desc,
        }
    }

    /// Parses a prefixed order specification.
    ///
    /// Prefix with `-` for descending order.
    /// Example: `"-year"` for descending, `"title"` for ascending.
    #[must_use]
    pub fn parse(spec: &str) -> Self {
        spec.strip_prefix('-')
            .map_or_else(|| Self::asc(spec), Self::desc)
    }

    pub(crate) const fn keyword(&self) -> &'static str {
        match self.direction {
            OrderDirection::Asc => "ASC",
            OrderDirection::Desc => "DESC",
        }
    }
}

/// Attributes attached to a result set.
///
/// Every field is optional so that attributes passed to a search can be
/// merged over the receiver's: set fields override, unset fields inherit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Attributes {
    /// Ordering; the first entry is the primary sort key.
    pub ordering: Option<Vec<OrderBy>>,
    /// Maximum number of rows.
    pub row_limit: Option<u64>,
    /// Number of rows to skip.
    pub offset: Option<u64>,
    /// Grouping columns.
    pub grouping: Option<Vec<String>>,
}

impl Attributes {
    /// Creates empty attributes.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the ordering from prefixed specifications (`"-year"`, `"title"`).
    #[must_use]
    pub fn order_by(mut self, specs: &[&str]) -> Self {
        self.ordering = Some(specs.iter().map(|s| OrderBy::parse(s)).collect());
        self
    }

    /// Sets the row limit.
    #[must_use]
    pub const fn rows(mut self, n: u64) -> Self {
        self.row_limit = Some(n);
        self
    }

    /// Sets the offset.
    #[must_use]
    pub const fn offset(mut self, n: u64) -> Self {
        self.offset = Some(n);
        self
    }

    /// Sets the grouping columns.
    #[must_use]
    pub fn group_by(mut self, columns: &[&str]) -> Self {
        self.grouping = Some(columns.iter().map(|c| (*c).to_string()).collect());
        self
    }

    /// Returns `self` merged over `base`.
    #[must_use]
    pub fn merged_over(&self, base: &Self) -> Self {
        Self {
            ordering: self.ordering.clone().or_else(|| base.ordering.clone()),
            row_limit: self.row_limit.or(base.row_limit),
            offset: self.offset.or(base.offset),
            grouping: self.grouping.clone().or_else(|| base.grouping.clone()),
        }
    }

    /// Returns whether rows are restricted by position or grouped.
    ///
    /// Such sets cannot be mutated with a plain `WHERE` clause.
    #[must_use]
    pub const fn is_windowed(&self) -> bool {
        self.row_limit.is_some() || self.offset.is_some() || self.grouping.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_by_parsing() {
        assert_eq!(OrderBy::parse("-year").direction, OrderDirection::Desc);
        assert_eq!(OrderBy::parse("-year").column, "year");
        assert_eq!(OrderBy::parse("title").direction, OrderDirection::Asc);
    }

    #[test]
    fn test_merge_overrides_and_inherits() {
        let base = Attributes::new().order_by(&["title"]).rows(10);
        let new = Attributes::new().offset(20).order_by(&["-year"]);
        let merged = new.merged_over(&base);
        assert_eq!(merged.ordering, Some(vec![OrderBy::desc("year")]));
        assert_eq!(merged.row_limit, Some(10));
        assert_eq!(merged.offset, Some(20));
        assert_eq!(merged.grouping, None);
    }

    #[test]
    fn test_windowed() {
        assert!(!Attributes::new().order_by(&["title"]).is_windowed());
        assert!(Attributes::new().rows(1).is_windowed());
        assert!(Attributes::new().group_by(&["artist"]).is_windowed());
    }
}
