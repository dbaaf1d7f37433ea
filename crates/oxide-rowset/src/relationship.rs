//! Relationship resolution between descriptors of a [`Catalog`].
//!
//! Related sets are built from a row's current values, not from its key
//! snapshot: a relationship follows the logical value the caller sees.

use std::sync::Arc;

use oxide_rowset_core::{Condition, Error, Join, Result, SqlValue, BASE_ALIAS};

use crate::catalog::Catalog;
use crate::connection::Connection;
use crate::resultset::ResultSet;
use crate::row::Row;

impl Catalog {
    /// Returns the set of rows related to `row` through `relationship`.
    ///
    /// Fails with [`Error::IncompleteKey`] when a local key column is null.
    pub fn related(&self, row: &Row, relationship: &str) -> Result<ResultSet> {
        let rel = row.source().relationship(relationship)?;
        let target = self.resultset(&rel.target)?;
        let mut pairs: Vec<(&str, SqlValue)> = Vec::with_capacity(rel.local_columns.len());
        for (local, foreign) in rel.column_pairs() {
            let value = row.get_column(local)?;
            if value.is_null() {
                return Err(Error::IncompleteKey {
                    column: local.to_string(),
                });
            }
            pairs.push((foreign, value.clone()));
        }
        Ok(target.search(Condition::matching(pairs)))
    }

    /// Fetches the single row related to `row`.
    ///
    /// Returns `None` without I/O when the local key is null.
    pub async fn related_one<C: Connection>(
        &self,
        conn: &mut C,
        row: &Row,
        relationship: &str,
    ) -> Result<Option<Row>> {
        match self.related(row, relationship) {
            Ok(related) => related.first(conn).await,
            Err(Error::IncompleteKey { .. }) => Ok(None),
            Err(err) => Err(err),
        }
    }

    /// Joins the relationship's target into `rs`.
    ///
    /// The target is aliased by the relationship name, and the key equality
    /// is added to the condition. Rows produced are still rows of the base
    /// descriptor; the join only widens what conditions may refer to.
    pub fn join(&self, rs: &ResultSet, relationship: &str) -> Result<ResultSet> {
        let rel = rs.source().relationship(relationship)?;
        let target = self.schema(&rel.target)?;
        let on = rel
            .column_pairs()
            .map(|(local, foreign)| format!("{BASE_ALIAS}.{local} = {relationship}.{foreign}"))
            .collect::<Vec<_>>()
            .join(" AND ");
        let join = Join {
            alias: relationship.to_string(),
            schema: Arc::clone(target),
        };
        Ok(rs.with_join(join, Condition::raw(&on, Vec::new())))
    }

    /// Returns the target rows related to any row of `rs`.
    ///
    /// Compiles to `foreign IN (SELECT local FROM ...)`; only single-column
    /// relationships are supported.
    pub fn search_related(&self, rs: &ResultSet, relationship: &str) -> Result<ResultSet> {
        let rel = rs.source().relationship(relationship)?;
        let (local, foreign) = match (rel.local_columns.as_slice(), rel.foreign_columns.as_slice())
        {
            ([local], [foreign]) => (local, foreign),
            _ => {
                return Err(Error::Compilation(format!(
                    "search_related over `{relationship}` needs a single-column relationship"
                )))
            }
        };
        let target = self.resultset(&rel.target)?;
        let inner = rs.columns_query(&[local.as_str()])?;
        let fragment = format!("{foreign} IN ({})", inner.sql);
        Ok(target.search(Condition::raw(&fragment, inner.params)))
    }
}
