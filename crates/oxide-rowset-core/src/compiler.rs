//! Query compiler: condition trees and attributes to parameterized SQL.
//!
//! Compilation is deterministic and side-effect free. Values never appear in
//! the SQL text; every one of them is a `?` placeholder with a matching entry
//! in [`CompiledQuery::params`].

use std::fmt::Write as _;
use std::sync::Arc;

use indexmap::IndexMap;

use crate::attributes::{Attributes, OrderBy};
use crate::condition::{CompareOp, Condition};
use crate::error::{Error, Result};
use crate::schema::Schema;
use crate::value::SqlValue;

/// Alias of the base descriptor when a query joins other descriptors.
pub const BASE_ALIAS: &str = "me";

/// Predicate that never matches.
const ALWAYS_FALSE: &str = "1 = 0";

/// SQL text plus positional parameters, ready for a connection provider.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledQuery {
    /// SQL with `?` placeholders.
    pub sql: String,
    /// Bound values, in placeholder order.
    pub params: Vec<SqlValue>,
}

impl CompiledQuery {
    /// Creates a query from SQL and parameters.
    pub fn new(sql: impl Into<String>, params: Vec<SqlValue>) -> Self {
        Self {
            sql: sql.into(),
            params,
        }
    }

    /// Renders the SQL with parameters inlined, for logs and assertions.
    ///
    /// Never send the result to a database.
    #[must_use]
    pub fn inline_sql(&self) -> String {
        let mut params = self.params.iter();
        let mut out = String::with_capacity(self.sql.len());
        for ch in self.sql.chars() {
            match (ch, params.len()) {
                ('?', n) if n > 0 => {
                    if let Some(value) = params.next() {
                        out.push_str(&value.to_sql_inline());
                    }
                }
                _ => out.push(ch),
            }
        }
        out
    }
}

/// A descriptor joined into a query under an alias.
#[derive(Debug, Clone, PartialEq)]
pub struct Join {
    /// Alias used to qualify the joined columns.
    pub alias: String,
    /// The joined descriptor.
    pub schema: Arc<Schema>,
}

/// Compiles queries against one base descriptor and optional joins.
#[derive(Debug, Clone, Copy)]
pub struct Compiler<'a> {
    schema: &'a Schema,
    joins: &'a [Join],
}

impl<'a> Compiler<'a> {
    /// Creates a compiler for the base descriptor.
    #[must_use]
    pub const fn new(schema: &'a Schema) -> Self {
        Self { schema, joins: &[] }
    }

    /// Adds joined descriptors to the column namespace.
    #[must_use]
    pub const fn with_joins(mut self, joins: &'a [Join]) -> Self {
        self.joins = joins;
        self
    }

    /// Compiles a `SELECT` of every base column.
    pub fn select(&self, condition: &Condition, attrs: &Attributes) -> Result<CompiledQuery> {
        let columns: Vec<String> = self
            .schema
            .column_names()
            .map(|c| self.base_column(c))
            .collect();
        let mut params = Vec::new();
        let sql = self.select_sql(&columns, condition, attrs, &mut params)?;
        Ok(CompiledQuery { sql, params })
    }

    /// Compiles a `SELECT` of the named columns only.
    ///
    /// Names may be qualified with a join alias or descriptor name.
    pub fn select_columns(
        &self,
        columns: &[&str],
        condition: &Condition,
        attrs: &Attributes,
    ) -> Result<CompiledQuery> {
        if columns.is_empty() {
            return Err(Error::compilation("select needs at least one column"));
        }
        let columns = columns
            .iter()
            .map(|c| self.attribute_column(c, "select"))
            .collect::<Result<Vec<_>>>()?;
        let mut params = Vec::new();
        let sql = self.select_sql(&columns, condition, attrs, &mut params)?;
        Ok(CompiledQuery { sql, params })
    }

    /// Compiles a counting query; no rows are materialized.
    pub fn count(&self, condition: &Condition, attrs: &Attributes) -> Result<CompiledQuery> {
        let mut params = Vec::new();
        let sql = if attrs.is_windowed() {
            let columns: Vec<String> = self
                .schema
                .column_names()
                .map(|c| self.base_column(c))
                .collect();
            let inner = self.select_sql(&columns, condition, attrs, &mut params)?;
            format!("SELECT COUNT(*) FROM ({inner}) AS count_subq")
        } else {
            let from = self.from_clause()?;
            let where_clause = self.where_clause(condition, &mut params)?;
            format!("SELECT COUNT(*) FROM {from}{where_clause}")
        };
        Ok(CompiledQuery { sql, params })
    }

    /// Compiles a bulk `UPDATE` of every row matching the condition.
    pub fn update(
        &self,
        condition: &Condition,
        attrs: &Attributes,
        assignments: &[(String, SqlValue)],
    ) -> Result<CompiledQuery> {
        if self.schema.updatable_columns().next().is_none() {
            return Err(Error::compilation(format!(
                "`{}` declares no updatable columns",
                self.schema.name()
            )));
        }
        if assignments.is_empty() {
            return Err(Error::compilation("update needs at least one column value"));
        }

        let mut params = Vec::with_capacity(assignments.len());
        let mut sets = Vec::with_capacity(assignments.len());
        for (column, value) in assignments {
            if !self.schema.has_column(column) {
                return Err(Error::UnknownColumn(column.clone()));
            }
            sets.push(format!("{column} = ?"));
            params.push(value.clone());
        }

        let where_clause = self.mutation_where(condition, attrs, &mut params, "update")?;
        let sql = format!(
            "UPDATE {} SET {}{where_clause}",
            self.schema.name(),
            sets.join(", ")
        );
        Ok(CompiledQuery { sql, params })
    }

    /// Compiles a bulk `DELETE` of every row matching the condition.
    pub fn delete(&self, condition: &Condition, attrs: &Attributes) -> Result<CompiledQuery> {
        let mut params = Vec::new();
        let where_clause = self.mutation_where(condition, attrs, &mut params, "delete")?;
        let sql = format!("DELETE FROM {}{where_clause}", self.schema.name());
        Ok(CompiledQuery { sql, params })
    }

    /// Compiles an `INSERT` returning every column of the new row.
    ///
    /// NULL values for generated columns are left out so the store fills them.
    pub fn insert(&self, values: &IndexMap<String, SqlValue>) -> Result<CompiledQuery> {
        if let Some(unknown) = values.keys().find(|c| !self.schema.has_column(c)) {
            return Err(Error::UnknownColumn(unknown.clone()));
        }

        let mut columns = Vec::new();
        let mut params = Vec::new();
        for (column, def) in self.schema.columns() {
            let Some(value) = values.get(column) else {
                continue;
            };
            if def.auto_generated && value.is_null() {
                continue;
            }
            columns.push(column.as_str());
            params.push(value.clone());
        }

        let table = self.schema.name();
        let returning = self.schema.column_names().collect::<Vec<_>>().join(", ");
        let sql = if columns.is_empty() {
            format!("INSERT INTO {table} DEFAULT VALUES RETURNING {returning}")
        } else {
            let placeholders = vec!["?"; columns.len()].join(", ");
            format!(
                "INSERT INTO {table} ({}) VALUES ({placeholders}) RETURNING {returning}",
                columns.join(", ")
            )
        };
        Ok(CompiledQuery { sql, params })
    }

    /// Compiles the condition alone into a predicate.
    ///
    /// Returns `None` when the condition matches every row.
    pub fn predicate(&self, condition: &Condition) -> Result<Option<CompiledQuery>> {
        let mut params = Vec::new();
        Ok(self
            .condition_sql(condition, &mut params)?
            .map(|sql| CompiledQuery { sql, params }))
    }

    fn select_sql(
        &self,
        columns: &[String],
        condition: &Condition,
        attrs: &Attributes,
        params: &mut Vec<SqlValue>,
    ) -> Result<String> {
        let mut sql = format!("SELECT {} FROM {}", columns.join(", "), self.from_clause()?);
        sql.push_str(&self.where_clause(condition, params)?);

        if let Some(grouping) = attrs.grouping.as_deref().filter(|g| !g.is_empty()) {
            let columns = grouping
                .iter()
                .map(|c| self.attribute_column(c, "group by"))
                .collect::<Result<Vec<_>>>()?;
            let _ = write!(sql, " GROUP BY {}", columns.join(", "));
        }

        if let Some(ordering) = attrs.ordering.as_deref().filter(|o| !o.is_empty()) {
            let parts = ordering
                .iter()
                .map(|o| self.order_term(o))
                .collect::<Result<Vec<_>>>()?;
            let _ = write!(sql, " ORDER BY {}", parts.join(", "));
        }

        let limit = attrs.row_limit.map(|n| sql_integer(n, "row limit")).transpose()?;
        let offset = attrs.offset.map(|n| sql_integer(n, "offset")).transpose()?;
        match (limit, offset) {
            (Some(limit), Some(offset)) => {
                let _ = write!(sql, " LIMIT {limit} OFFSET {offset}");
            }
            (Some(limit), None) => {
                let _ = write!(sql, " LIMIT {limit}");
            }
            // SQLite only accepts OFFSET after a LIMIT; -1 means unbounded.
            (None, Some(offset)) => {
                let _ = write!(sql, " LIMIT -1 OFFSET {offset}");
            }
            (None, None) => {}
        }

        Ok(sql)
    }

    fn mutation_where(
        &self,
        condition: &Condition,
        attrs: &Attributes,
        params: &mut Vec<SqlValue>,
        action: &str,
    ) -> Result<String> {
        if self.joins.is_empty() && !attrs.is_windowed() {
            return self.where_clause(condition, params);
        }

        let pk = self.schema.primary_key();
        if pk.is_empty() {
            return Err(Error::compilation(format!(
                "{action} over a paginated, grouped or joined result set needs a primary key on `{}`",
                self.schema.name()
            )));
        }
        let key_columns: Vec<String> = pk.iter().map(|c| self.base_column(c)).collect();
        let inner = self.select_sql(&key_columns, condition, attrs, params)?;
        let target = match pk {
            [single] => single.clone(),
            _ => format!("({})", pk.join(", ")),
        };
        Ok(format!(" WHERE {target} IN ({inner})"))
    }

    fn from_clause(&self) -> Result<String> {
        if self.joins.is_empty() {
            return Ok(self.schema.name().to_string());
        }

        let mut from = format!("{} AS {BASE_ALIAS}", self.schema.name());
        for (i, join) in self.joins.iter().enumerate() {
            let clash = join.alias == BASE_ALIAS
                || self.joins[..i].iter().any(|other| other.alias == join.alias);
            if clash {
                return Err(Error::compilation(format!(
                    "join alias `{}` is used twice",
                    join.alias
                )));
            }
            let _ = write!(from, ", {} AS {}", join.schema.name(), join.alias);
        }
        Ok(from)
    }

    fn where_clause(&self, condition: &Condition, params: &mut Vec<SqlValue>) -> Result<String> {
        Ok(self
            .condition_sql(condition, params)?
            .map(|sql| format!(" WHERE {sql}"))
            .unwrap_or_default())
    }

    fn base_column(&self, column: &str) -> String {
        if self.joins.is_empty() {
            column.to_string()
        } else {
            format!("{BASE_ALIAS}.{column}")
        }
    }

    /// Resolves a possibly qualified column name to its SQL reference.
    fn column_ref(&self, name: &str) -> Result<String> {
        let unknown = || Error::UnknownColumn(name.to_string());

        if let Some((qualifier, column)) = name.split_once('.') {
            if qualifier == BASE_ALIAS || qualifier == self.schema.name() {
                return if self.schema.has_column(column) {
                    Ok(self.base_column(column))
                } else {
                    Err(unknown())
                };
            }
            let join = self
                .joins
                .iter()
                .find(|j| j.alias == qualifier || j.schema.name() == qualifier)
                .ok_or_else(unknown)?;
            return if join.schema.has_column(column) {
                Ok(format!("{}.{column}", join.alias))
            } else {
                Err(unknown())
            };
        }

        let in_base = self.schema.has_column(name);
        let mut owners = self.joins.iter().filter(|j| j.schema.has_column(name));
        match (in_base, owners.next()) {
            (true, None) => Ok(self.base_column(name)),
            (false, None) => Err(unknown()),
            (false, Some(join)) if owners.next().is_none() => Ok(format!("{}.{name}", join.alias)),
            _ => Err(Error::compilation(format!(
                "column `{name}` is ambiguous; qualify it with a descriptor name"
            ))),
        }
    }

    fn attribute_column(&self, name: &str, clause: &str) -> Result<String> {
        self.column_ref(name).map_err(|err| match err {
            Error::UnknownColumn(column) => {
                Error::compilation(format!("cannot {clause} unknown column `{column}`"))
            }
            other => other,
        })
    }

    fn order_term(&self, order: &OrderBy) -> Result<String> {
        let column = self.attribute_column(&order.column, "order by")?;
        Ok(format!("{column} {}", order.keyword()))
    }

    /// Compiles a condition; `None` means it matches every row.
    ///
    /// Parameters are only pushed for SQL that ends up in the output.
    fn condition_sql(
        &self,
        condition: &Condition,
        params: &mut Vec<SqlValue>,
    ) -> Result<Option<String>> {
        let sql = match condition {
            Condition::Equals { column, value } => {
                let column = self.column_ref(column)?;
                if value.is_null() {
                    format!("{column} IS NULL")
                } else {
                    params.push(value.clone());
                    format!("{column} = ?")
                }
            }
            Condition::Compare { column, op, value } => {
                let column = self.column_ref(column)?;
                if *op == CompareOp::Ne && value.is_null() {
                    format!("{column} IS NOT NULL")
                } else {
                    params.push(value.clone());
                    format!("{column} {op} ?")
                }
            }
            Condition::In { column, values } => {
                let column = self.column_ref(column)?;
                if values.is_empty() {
                    ALWAYS_FALSE.to_string()
                } else {
                    params.extend(values.iter().cloned());
                    format!("{column} IN ({})", vec!["?"; values.len()].join(", "))
                }
            }
            Condition::Not(inner) => match self.condition_sql(inner, params)? {
                Some(inner) => format!("NOT ({inner})"),
                None => ALWAYS_FALSE.to_string(),
            },
            Condition::And(children) => {
                let mut parts = Vec::with_capacity(children.len());
                for child in children {
                    let wrap = matches!(child, Condition::Or(_) | Condition::Raw { .. });
                    if let Some(part) = self.operand(child, wrap, params)? {
                        parts.push(part);
                    }
                }
                if parts.is_empty() {
                    return Ok(None);
                }
                parts.join(" AND ")
            }
            Condition::Or(children) => {
                if children.is_empty() {
                    return Ok(Some(ALWAYS_FALSE.to_string()));
                }
                if children.iter().any(Condition::is_always_true) {
                    return Ok(None);
                }
                let bound = params.len();
                let mut parts = Vec::with_capacity(children.len());
                for child in children {
                    let wrap = matches!(child, Condition::And(_) | Condition::Raw { .. });
                    match self.operand(child, wrap, params)? {
                        Some(part) => parts.push(part),
                        None => {
                            params.truncate(bound);
                            return Ok(None);
                        }
                    }
                }
                parts.join(" OR ")
            }
            Condition::Raw {
                fragment,
                params: bound,
            } => {
                if fragment.trim().is_empty() {
                    return Err(Error::compilation("raw fragment is empty"));
                }
                params.extend(bound.iter().cloned());
                fragment.clone()
            }
        };
        Ok(Some(sql))
    }

    fn operand(
        &self,
        child: &Condition,
        wrap: bool,
        params: &mut Vec<SqlValue>,
    ) -> Result<Option<String>> {
        Ok(self
            .condition_sql(child, params)?
            .map(|sql| if wrap { format!("({sql})") } else { sql }))
    }
}

/// SQLite integers are signed 64-bit.
fn sql_integer(n: u64, what: &str) -> Result<i64> {
    i64::try_from(n).map_err(|_| Error::compilation(format!("{what} {n} is out of range")))
}
