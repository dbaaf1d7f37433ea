//! Materialized rows with identity tracking.
//!
//! A [`Row`] remembers the primary key values it was fetched or last written
//! with (its key snapshot). Single-row writes are always predicated on that
//! snapshot, never on the current values, so editing a key column and then
//! calling [`Row::update`] changes the row that was loaded.

use std::sync::Arc;

use indexmap::{IndexMap, IndexSet};
use oxide_rowset_core::{
    Attributes, Compiler, Condition, Error, FromSqlValue, Result, Schema, SqlValue, ToSqlValue,
};
use tracing::{debug, warn};

use crate::connection::{Connection, Record};

static NULL: SqlValue = SqlValue::Null;

/// A record of one descriptor, with change and identity tracking.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    source: Arc<Schema>,
    values: Record,
    pk_snapshot: IndexMap<String, SqlValue>,
    dirty: IndexSet<String>,
    persisted: bool,
    deleted: bool,
}

impl Row {
    /// Builds a persisted row from a fetched record.
    #[must_use]
    pub fn from_record(source: Arc<Schema>, values: Record) -> Self {
        let mut row = Self {
            source,
            values,
            pk_snapshot: IndexMap::new(),
            dirty: IndexSet::new(),
            persisted: true,
            deleted: false,
        };
        row.refresh_snapshot();
        row
    }

    /// Builds a row that is not in storage yet.
    ///
    /// Every supplied column counts as changed until [`Row::insert`] succeeds.
    pub fn new<I, K, V>(source: Arc<Schema>, values: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: ToSqlValue,
    {
        let mut row = Self {
            source,
            values: Record::new(),
            pk_snapshot: IndexMap::new(),
            dirty: IndexSet::new(),
            persisted: false,
            deleted: false,
        };
        for (column, value) in values {
            row.set_column(column.as_ref(), value)?;
        }
        Ok(row)
    }

    /// Returns the descriptor this row belongs to.
    #[must_use]
    pub const fn source(&self) -> &Arc<Schema> {
        &self.source
    }

    /// Reads a column by name or accessor name; unset columns read as NULL.
    pub fn get_column(&self, name: &str) -> Result<&SqlValue> {
        self.ensure_live()?;
        let column = self.source.resolve_column(name)?;
        Ok(self.values.get(column).unwrap_or(&NULL))
    }

    /// Reads a column converted to `T`.
    pub fn get<T: FromSqlValue>(&self, name: &str) -> Result<T> {
        T::from_sql_value(name, self.get_column(name)?)
    }

    /// Sets a column value and marks it changed. No I/O.
    pub fn set_column(&mut self, name: &str, value: impl ToSqlValue) -> Result<()> {
        self.ensure_live()?;
        let column = self.source.resolve_column(name)?.to_string();
        self.values.insert(column.clone(), value.to_sql_value());
        self.dirty.insert(column);
        Ok(())
    }

    /// Returns whether any column changed since the last fetch or write.
    #[must_use]
    pub fn is_changed(&self) -> bool {
        !self.dirty.is_empty()
    }

    /// Returns the changed columns with their current values.
    pub fn dirty_columns(&self) -> impl Iterator<Item = (&str, &SqlValue)> {
        self.dirty
            .iter()
            .map(|column| (column.as_str(), self.values.get(column).unwrap_or(&NULL)))
    }

    /// Returns the current column values.
    #[must_use]
    pub const fn values(&self) -> &Record {
        &self.values
    }

    /// Returns the key values captured at the last fetch or write.
    #[must_use]
    pub const fn pk_snapshot(&self) -> &IndexMap<String, SqlValue> {
        &self.pk_snapshot
    }

    /// Returns whether the row exists in storage.
    #[must_use]
    pub const fn is_persisted(&self) -> bool {
        self.persisted
    }

    /// Returns whether [`Row::delete`] succeeded on this row.
    #[must_use]
    pub const fn is_deleted(&self) -> bool {
        self.deleted
    }

    /// Writes the changed columns to the row identified by the key snapshot.
    ///
    /// Does nothing when no column changed. On failure the row keeps its
    /// changes and snapshot, so the call can be retried.
    pub async fn update<C: Connection>(&mut self, conn: &mut C) -> Result<()> {
        self.ensure_live()?;
        if !self.persisted {
            return Err(Error::NotInStorage);
        }
        if self.dirty.is_empty() {
            return Ok(());
        }
        let identity = self.identity()?;

        let assignments: Vec<(String, SqlValue)> = self
            .source
            .column_names()
            .filter(|column| self.dirty.contains(*column))
            .map(|column| {
                let value = self.values.get(column).unwrap_or(&NULL).clone();
                (column.to_string(), value)
            })
            .collect();
        let query =
            Compiler::new(&self.source).update(&identity, &Attributes::default(), &assignments)?;
        debug!(sql = %query.sql, params = query.params.len(), "Updating row");

        let affected = conn.execute(query).await?;
        debug!(affected, "Row update done");
        if affected == 0 {
            warn!(schema = self.source.name(), key = ?self.pk_snapshot, "Row update matched nothing");
            return Err(Error::NotFound);
        }
        self.dirty.clear();
        self.refresh_snapshot();
        Ok(())
    }

    /// Deletes the row identified by the key snapshot.
    ///
    /// Afterwards every operation on the row fails with [`Error::RowDeleted`].
    pub async fn delete<C: Connection>(&mut self, conn: &mut C) -> Result<()> {
        self.ensure_live()?;
        if !self.persisted {
            return Err(Error::NotInStorage);
        }
        let identity = self.identity()?;
        let query = Compiler::new(&self.source).delete(&identity, &Attributes::default())?;
        debug!(sql = %query.sql, params = query.params.len(), "Deleting row");

        let affected = conn.execute(query).await?;
        debug!(affected, "Row delete done");
        if affected == 0 {
            warn!(schema = self.source.name(), key = ?self.pk_snapshot, "Row delete matched nothing");
            return Err(Error::NotFound);
        }
        self.deleted = true;
        self.persisted = false;
        Ok(())
    }

    /// Drops local changes by re-fetching the row.
    ///
    /// Does nothing when no column changed.
    pub async fn discard_changes<C: Connection>(&mut self, conn: &mut C) -> Result<()> {
        self.ensure_live()?;
        if self.dirty.is_empty() {
            return Ok(());
        }
        if !self.persisted {
            return Err(Error::NotInStorage);
        }
        let identity = self.identity()?;
        let query = Compiler::new(&self.source).select(&identity, &Attributes::new().rows(1))?;
        debug!(sql = %query.sql, params = query.params.len(), "Re-fetching row");

        let record = conn.fetch_optional(query).await?.ok_or(Error::NotFound)?;
        self.values = record;
        self.dirty.clear();
        self.refresh_snapshot();
        Ok(())
    }

    /// Inserts a new row and merges the stored values back, generated keys
    /// and defaults included.
    pub async fn insert<C: Connection>(&mut self, conn: &mut C) -> Result<()> {
        self.ensure_live()?;
        if self.persisted {
            return Err(Error::AlreadyInStorage);
        }
        let query = Compiler::new(&self.source).insert(&self.values)?;
        debug!(sql = %query.sql, params = query.params.len(), "Inserting row");

        let stored = conn.fetch_optional(query).await?.ok_or(Error::NotFound)?;
        self.values.extend(stored);
        self.persisted = true;
        self.dirty.clear();
        self.refresh_snapshot();
        Ok(())
    }

    /// Inserts the row when it is new, updates it otherwise.
    pub async fn save<C: Connection>(&mut self, conn: &mut C) -> Result<()> {
        if self.persisted {
            self.update(conn).await
        } else {
            self.insert(conn).await
        }
    }

    const fn ensure_live(&self) -> Result<()> {
        if self.deleted {
            return Err(Error::RowDeleted);
        }
        Ok(())
    }

    /// Identity predicate over the key snapshot.
    fn identity(&self) -> Result<Condition> {
        self.source.require_primary_key()?;
        if let Some((column, _)) = self.pk_snapshot.iter().find(|(_, value)| value.is_null()) {
            return Err(Error::IncompleteKey {
                column: column.clone(),
            });
        }
        Ok(Condition::identity(&self.pk_snapshot))
    }

    fn refresh_snapshot(&mut self) {
        self.pk_snapshot = self
            .source
            .primary_key()
            .iter()
            .map(|column| {
                let value = self.values.get(column).unwrap_or(&NULL).clone();
                (column.clone(), value)
            })
            .collect();
    }
}
