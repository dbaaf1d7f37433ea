//! Lazy, composable result sets.
//!
//! A [`ResultSet`] describes a query over one descriptor. Every
//! refinement returns a new set and leaves the receiver untouched; nothing
//! runs until a method taking a connection is awaited.

use std::sync::Arc;

use futures::stream::{BoxStream, StreamExt, TryStreamExt};
use oxide_rowset_core::{
    Attributes, CompiledQuery, Compiler, Condition, Error, FromSqlValue, Join, Result, Schema,
    SqlValue, ToSqlValue,
};
use tracing::debug;

use crate::connection::Connection;
use crate::row::Row;

/// Rows per page when [`ResultSet::page`] is used without [`ResultSet::rows`].
pub const DEFAULT_PAGE_SIZE: u64 = 10;

/// An immutable, not yet executed query over one descriptor.
///
/// # Example
///
/// ```ignore
/// let albums = catalog.resultset("album")?;
/// let old = albums
///     .search(Condition::lt("year", 1980))
///     .search(Condition::is_in("albumid", vec![1, 14, 15]))
///     .order_by(&["-year"]);
///
/// for row in old.collect_all(&mut conn).await? {
///     println!("{}", row.get::<String>("title")?);
/// }
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct ResultSet {
    source: Arc<Schema>,
    condition: Condition,
    attributes: Attributes,
    joins: Vec<Join>,
}

impl ResultSet {
    /// Creates the unfiltered set over a descriptor.
    #[must_use]
    pub fn new(source: Arc<Schema>) -> Self {
        Self {
            source,
            condition: Condition::default(),
            attributes: Attributes::default(),
            joins: Vec::new(),
        }
    }

    /// Returns the descriptor rows are produced from.
    #[must_use]
    pub const fn source(&self) -> &Arc<Schema> {
        &self.source
    }

    /// Returns the accumulated condition.
    #[must_use]
    pub const fn condition(&self) -> &Condition {
        &self.condition
    }

    /// Returns the accumulated attributes.
    #[must_use]
    pub const fn attributes(&self) -> &Attributes {
        &self.attributes
    }

    /// Returns the joined descriptors.
    #[must_use]
    pub fn joins(&self) -> &[Join] {
        &self.joins
    }

    /// Narrows the set: the new condition is `And(self.condition, condition)`.
    #[must_use]
    pub fn search(&self, condition: Condition) -> Self {
        self.search_with(condition, &Attributes::default())
    }

    /// Narrows the set and merges `attrs` over the current attributes.
    ///
    /// Attributes set in `attrs` override, the others are inherited.
    #[must_use]
    pub fn search_with(&self, condition: Condition, attrs: &Attributes) -> Self {
        Self {
            source: Arc::clone(&self.source),
            condition: Condition::And(vec![self.condition.clone(), condition]),
            attributes: attrs.merged_over(&self.attributes),
            joins: self.joins.clone(),
        }
    }

    /// Like [`ResultSet::search`], with equalities turned into `LIKE`.
    #[must_use]
    pub fn search_like(&self, condition: Condition) -> Self {
        self.search(condition.into_like())
    }

    /// Narrows the set with an opaque SQL fragment and its bound values.
    ///
    /// The fragment is inserted verbatim and is not checked.
    #[must_use]
    pub fn search_literal(&self, fragment: &str, params: Vec<SqlValue>) -> Self {
        self.search(Condition::raw(fragment, params))
    }

    /// Replaces the ordering (`"-year"` sorts descending).
    #[must_use]
    pub fn order_by(&self, specs: &[&str]) -> Self {
        self.with_attributes(&Attributes::new().order_by(specs))
    }

    /// Limits the number of rows.
    #[must_use]
    pub fn rows(&self, n: u64) -> Self {
        self.with_attributes(&Attributes::new().rows(n))
    }

    /// Skips the first `n` rows.
    #[must_use]
    pub fn offset(&self, n: u64) -> Self {
        self.with_attributes(&Attributes::new().offset(n))
    }

    /// Selects a 1-based page of [`ResultSet::rows`] rows each.
    #[must_use]
    pub fn page(&self, page: u64) -> Self {
        let size = self.attributes.row_limit.unwrap_or(DEFAULT_PAGE_SIZE);
        self.with_attributes(
            &Attributes::new()
                .rows(size)
                .offset(page.saturating_sub(1).saturating_mul(size)),
        )
    }

    /// Groups rows by the given columns.
    #[must_use]
    pub fn group_by(&self, columns: &[&str]) -> Self {
        self.with_attributes(&Attributes::new().group_by(columns))
    }

    fn with_attributes(&self, attrs: &Attributes) -> Self {
        Self {
            source: Arc::clone(&self.source),
            condition: self.condition.clone(),
            attributes: attrs.merged_over(&self.attributes),
            joins: self.joins.clone(),
        }
    }

    /// Adds a joined descriptor together with its join condition.
    pub(crate) fn with_join(&self, join: Join, on: Condition) -> Self {
        let mut joined = self.search(on);
        joined.joins.push(join);
        joined
    }

    fn compiler(&self) -> Compiler<'_> {
        Compiler::new(&self.source).with_joins(&self.joins)
    }

    /// Compiles the `SELECT` this set stands for.
    pub fn to_query(&self) -> Result<CompiledQuery> {
        self.compiler().select(&self.condition, &self.attributes)
    }

    /// Compiles a `SELECT` of the named columns, for use as a subquery.
    pub fn columns_query(&self, columns: &[&str]) -> Result<CompiledQuery> {
        self.compiler()
            .select_columns(columns, &self.condition, &self.attributes)
    }

    /// Streams the matching rows, one cursor fetch per item.
    ///
    /// Compilation errors are reported before any I/O. Dropping the stream
    /// releases the cursor; calling again runs the query again.
    pub fn stream<'c, C: Connection>(
        &self,
        conn: &'c mut C,
    ) -> Result<BoxStream<'c, Result<Row>>> {
        let query = self.to_query()?;
        debug!(sql = %query.sql, params = query.params.len(), "Streaming rows");
        let source = Arc::clone(&self.source);
        Ok(conn
            .fetch(query)
            .map_ok(move |record| Row::from_record(Arc::clone(&source), record))
            .boxed())
    }

    /// Fetches every matching row.
    pub async fn collect_all<C: Connection>(&self, conn: &mut C) -> Result<Vec<Row>> {
        self.stream(conn)?.try_collect().await
    }

    /// Fetches the first matching row.
    ///
    /// The row limit is clamped to one; an offset is kept.
    pub async fn first<C: Connection>(&self, conn: &mut C) -> Result<Option<Row>> {
        let limit = self.attributes.row_limit.map_or(1, |n| n.min(1));
        let mut attrs = self.attributes.clone();
        attrs.row_limit = Some(limit);
        let query = self.compiler().select(&self.condition, &attrs)?;
        debug!(sql = %query.sql, params = query.params.len(), "Fetching first row");
        let record = conn.fetch_optional(query).await?;
        Ok(record.map(|record| Row::from_record(Arc::clone(&self.source), record)))
    }

    /// Fetches a row by primary key values, in key column order.
    pub async fn find<C, V>(&self, conn: &mut C, key: Vec<V>) -> Result<Option<Row>>
    where
        C: Connection,
        V: ToSqlValue,
    {
        let pk = self.source.require_primary_key()?;
        if pk.len() != key.len() {
            return Err(Error::Compilation(format!(
                "`{}` has a {}-column primary key, got {} values",
                self.source.name(),
                pk.len(),
                key.len()
            )));
        }
        let identity = Condition::matching(pk.iter().zip(key));
        self.search(identity).first(conn).await
    }

    /// Counts the matching rows without materializing them.
    pub async fn count<C: Connection>(&self, conn: &mut C) -> Result<u64> {
        let query = self.compiler().count(&self.condition, &self.attributes)?;
        debug!(sql = %query.sql, params = query.params.len(), "Counting rows");
        let Some(record) = conn.fetch_optional(query).await? else {
            return Ok(0);
        };
        let count = match record.get_index(0) {
            Some((column, value)) => i64::from_sql_value(column, value)?,
            None => 0,
        };
        Ok(u64::try_from(count).unwrap_or_default())
    }

    /// Returns whether any row matches.
    pub async fn exists<C: Connection>(&self, conn: &mut C) -> Result<bool> {
        Ok(self.first(conn).await?.is_some())
    }

    /// Assigns `values` to every matching row in one statement.
    ///
    /// No rows are materialized. Returns the number of affected rows.
    pub async fn update<C, I, K, V>(&self, conn: &mut C, values: I) -> Result<u64>
    where
        C: Connection,
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: ToSqlValue,
    {
        let assignments = values
            .into_iter()
            .map(|(column, value)| {
                let column = self.source.resolve_column(column.as_ref())?;
                Ok((column.to_string(), value.to_sql_value()))
            })
            .collect::<Result<Vec<_>>>()?;
        let query = self
            .compiler()
            .update(&self.condition, &self.attributes, &assignments)?;
        debug!(sql = %query.sql, params = query.params.len(), "Bulk update");
        let affected = conn.execute(query).await?;
        debug!(affected, "Bulk update done");
        Ok(affected)
    }

    /// Deletes every matching row in one statement.
    ///
    /// No rows are materialized. Returns the number of affected rows.
    pub async fn delete<C: Connection>(&self, conn: &mut C) -> Result<u64> {
        let query = self.compiler().delete(&self.condition, &self.attributes)?;
        debug!(sql = %query.sql, params = query.params.len(), "Bulk delete");
        let affected = conn.execute(query).await?;
        debug!(affected, "Bulk delete done");
        Ok(affected)
    }

    /// Builds a row of this set's descriptor that is not stored yet.
    pub fn new_row<I, K, V>(&self, values: I) -> Result<Row>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: ToSqlValue,
    {
        Row::new(Arc::clone(&self.source), values)
    }

    /// Builds a row and inserts it.
    pub async fn create<C, I, K, V>(&self, conn: &mut C, values: I) -> Result<Row>
    where
        C: Connection,
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: ToSqlValue,
    {
        let mut row = self.new_row(values)?;
        row.insert(conn).await?;
        Ok(row)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use oxide_rowset_core::ColumnDef;

    fn albums() -> ResultSet {
        ResultSet::new(Arc::new(
            Schema::builder("album")
                .column("albumid", ColumnDef::integer().auto_generated())
                .column("artist", ColumnDef::text())
                .column("title", ColumnDef::text())
                .column("year", ColumnDef::integer().nullable())
                .primary_key(&["albumid"])
                .build()
                .unwrap(),
        ))
    }

    #[test]
    fn test_search_does_not_touch_receiver() {
        let all = albums();
        let falco = all.search(Condition::eq("artist", "Falco"));
        assert_eq!(all.condition(), &Condition::default());
        assert_eq!(
            falco.condition(),
            &Condition::And(vec![Condition::default(), Condition::eq("artist", "Falco")])
        );
    }

    #[test]
    fn test_search_with_merges_attributes() {
        let sorted = albums().order_by(&["title"]).rows(5);
        let refined = sorted.search_with(Condition::gt("year", 1970), &Attributes::new().rows(2));
        assert_eq!(refined.attributes().row_limit, Some(2));
        assert_eq!(refined.attributes().ordering, sorted.attributes().ordering);
    }

    #[test]
    fn test_chained_searches_compile_left_to_right() {
        let query = albums()
            .search(Condition::lt("year", 1980))
            .search(Condition::is_in("albumid", vec![1, 14, 15]))
            .to_query()
            .unwrap();
        assert_eq!(
            query.inline_sql(),
            "SELECT albumid, artist, title, year FROM album \
             WHERE year < 1980 AND albumid IN (1, 14, 15)"
        );
    }

    #[test]
    fn test_search_like_and_literal() {
        let query = albums()
            .search_like(Condition::eq("title", "Wish%"))
            .search_literal("year % 2 = ?", vec![SqlValue::Int(0)])
            .to_query()
            .unwrap();
        assert_eq!(
            query.inline_sql(),
            "SELECT albumid, artist, title, year FROM album \
             WHERE title LIKE 'Wish%' AND (year % 2 = 0)"
        );
    }

    #[test]
    fn test_page() {
        let page = albums().rows(20).page(3);
        assert_eq!(page.attributes().row_limit, Some(20));
        assert_eq!(page.attributes().offset, Some(40));
        assert_eq!(albums().page(1).attributes().offset, Some(0));
        assert_eq!(albums().page(2).attributes().row_limit, Some(DEFAULT_PAGE_SIZE));
    }

    #[test]
    fn test_huge_page_fails_to_compile() {
        let err = albums().page(u64::MAX).to_query().unwrap_err();
        assert!(matches!(err, Error::Compilation(msg) if msg.contains("offset")));
    }
}
