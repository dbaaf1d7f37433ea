//! Condition trees for filtering result sets.
//!
//! A [`Condition`] is an immutable predicate tree. Combining two trees builds a
//! new node and never touches either input, so a result set's condition can be
//! shared freely between the sets derived from it.

use std::fmt;

use crate::value::{SqlValue, ToSqlValue};

/// Comparison operators for [`Condition::Compare`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    /// Not equal (!=)
    Ne,
    /// Greater than (>)
    Gt,
    /// Greater than or equal (>=)
    Gte,
    /// Less than (<)
    Lt,
    /// Less than or equal (<=)
    Lte,
    /// Pattern match (LIKE)
    Like,
    /// Negated pattern match (NOT LIKE)
    NotLike,
}

impl fmt::Display for CompareOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let op = match self {
            Self::Ne => "!=",
            Self::Gt => ">",
            Self::Gte => ">=",
            Self::Lt => "<",
            Self::Lte => "<=",
            Self::Like => "LIKE",
            Self::NotLike => "NOT LIKE",
        };
        f.write_str(op)
    }
}

/// A filter predicate.
///
/// # Example
///
/// ```
/// use oxide_rowset_core::Condition;
///
/// let old = Condition::lt("year", 1980);
/// let picked = Condition::is_in("albumid", vec![1, 14, 15]);
/// let both = old.clone().and(picked);
///
/// assert_eq!(both, Condition::And(vec![old, Condition::is_in("albumid", vec![1, 14, 15])]));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    /// `column = value`; a NULL value compiles to `IS NULL`.
    Equals {
        /// Column name, optionally qualified.
        column: String,
        /// Compared value.
        value: SqlValue,
    },
    /// `column op value`.
    Compare {
        /// Column name, optionally qualified.
        column: String,
        /// Operator.
        op: CompareOp,
        /// Compared value.
        value: SqlValue,
    },
    /// Membership test; an empty set never matches.
    In {
        /// Column name, optionally qualified.
        column: String,
        /// Candidate values.
        values: Vec<SqlValue>,
    },
    /// Negation.
    Not(Box<Condition>),
    /// Conjunction; empty means always true.
    And(Vec<Condition>),
    /// Disjunction; empty means always false.
    Or(Vec<Condition>),
    /// Opaque SQL fragment with positionally bound values.
    ///
    /// Inserted verbatim by the compiler; nothing inside is checked.
    Raw {
        /// SQL fragment using `?` placeholders.
        fragment: String,
        /// Bound values, in placeholder order.
        params: Vec<SqlValue>,
    },
}

impl Default for Condition {
    /// The always-true condition.
    fn default() -> Self {
        Self::And(Vec::new())
    }
}

impl Condition {
    /// Creates an equality condition (column = value).
    pub fn eq<V: ToSqlValue>(column: &str, value: V) -> Self {
        Self::Equals {
            column: column.to_string(),
            value: value.to_sql_value(),
        }
    }

    fn compare<V: ToSqlValue>(column: &str, op: CompareOp, value: V) -> Self {
        Self::Compare {
            column: column.to_string(),
            op,
            value: value.to_sql_value(),
        }
    }

    /// Creates an inequality condition (column != value).
    pub fn ne<V: ToSqlValue>(column: &str, value: V) -> Self {
        Self::compare(column, CompareOp::Ne, value)
    }

    /// Creates a greater-than condition (column > value).
    pub fn gt<V: ToSqlValue>(column: &str, value: V) -> Self {
        Self::compare(column, CompareOp::Gt, value)
    }

    /// Creates a greater-than-or-equal condition (column >= value).
    pub fn gte<V: ToSqlValue>(column: &str, value: V) -> Self {
        Self::compare(column, CompareOp::Gte, value)
    }

    /// Creates a less-than condition (column < value).
    pub fn lt<V: ToSqlValue>(column: &str, value: V) -> Self {
        Self::compare(column, CompareOp::Lt, value)
    }

    /// Creates a less-than-or-equal condition (column <= value).
    pub fn lte<V: ToSqlValue>(column: &str, value: V) -> Self {
        Self::compare(column, CompareOp::Lte, value)
    }

    /// Creates a LIKE condition. Use `%` for wildcard matching.
    pub fn like(column: &str, pattern: &str) -> Self {
        Self::compare(column, CompareOp::Like, pattern)
    }

    /// Creates a NOT LIKE condition.
    pub fn not_like(column: &str, pattern: &str) -> Self {
        Self::compare(column, CompareOp::NotLike, pattern)
    }

    /// Creates an IS NULL condition.
    pub fn is_null(column: &str) -> Self {
        Self::eq(column, SqlValue::Null)
    }

    /// Creates an IS NOT NULL condition.
    pub fn is_not_null(column: &str) -> Self {
        Self::ne(column, SqlValue::Null)
    }

    /// Creates an IN condition.
    pub fn is_in<V: ToSqlValue>(column: &str, values: Vec<V>) -> Self {
        Self::In {
            column: column.to_string(),
            values: values.into_iter().map(ToSqlValue::to_sql_value).collect(),
        }
    }

    /// Creates a NOT IN condition.
    pub fn not_in<V: ToSqlValue>(column: &str, values: Vec<V>) -> Self {
        Self::is_in(column, values).not()
    }

    /// Creates a raw SQL fragment with bound values.
    ///
    /// **Warning**: the fragment is not validated; pass user input only
    /// through `params`.
    pub fn raw(fragment: &str, params: Vec<SqlValue>) -> Self {
        Self::Raw {
            fragment: fragment.to_string(),
            params,
        }
    }

    /// Conjunction of equalities, one per `(column, value)` pair.
    pub fn matching<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: ToSqlValue,
    {
        Self::And(
            pairs
                .into_iter()
                .map(|(column, value)| Self::eq(column.as_ref(), value))
                .collect(),
        )
    }

    /// Identity predicate over key columns, as stored in a row's key snapshot.
    pub fn identity<'a, I>(key: I) -> Self
    where
        I: IntoIterator<Item = (&'a String, &'a SqlValue)>,
    {
        Self::And(
            key.into_iter()
                .map(|(column, value)| Self::eq(column, value))
                .collect(),
        )
    }

    /// Conjunction of all given conditions.
    pub fn all_of(conditions: impl IntoIterator<Item = Self>) -> Self {
        Self::And(conditions.into_iter().collect())
    }

    /// Disjunction of all given conditions.
    pub fn any_of(conditions: impl IntoIterator<Item = Self>) -> Self {
        Self::Or(conditions.into_iter().collect())
    }

    /// Combines this condition with another using AND.
    #[must_use]
    pub fn and(self, other: Self) -> Self {
        Self::And(vec![self, other])
    }

    /// Combines this condition with another using OR.
    #[must_use]
    pub fn or(self, other: Self) -> Self {
        Self::Or(vec![self, other])
    }

    /// Negates this condition with NOT.
    #[must_use]
    #[allow(clippy::should_implement_trait)]
    pub fn not(self) -> Self {
        Self::Not(Box::new(self))
    }

    /// Returns whether the condition trivially matches every row.
    #[must_use]
    pub fn is_always_true(&self) -> bool {
        match self {
            Self::And(children) => children.iter().all(Self::is_always_true),
            Self::Or(children) => children.iter().any(Self::is_always_true),
            _ => false,
        }
    }

    /// Rewrites every equality leaf into a LIKE comparison.
    ///
    /// NULL equalities are kept as they are: there is no pattern to match.
    #[must_use]
    pub fn into_like(self) -> Self {
        match self {
            Self::Equals { column, value } if !value.is_null() => Self::Compare {
                column,
                op: CompareOp::Like,
                value,
            },
            Self::Not(inner) => Self::Not(Box::new(inner.into_like())),
            Self::And(children) => Self::And(children.into_iter().map(Self::into_like).collect()),
            Self::Or(children) => Self::Or(children.into_iter().map(Self::into_like).collect()),
            other => other,
        }
    }
}
