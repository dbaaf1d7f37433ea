//! Schema descriptors: static table metadata consumed by the compiler.
//!
//! Descriptors are built explicitly with [`Schema::builder`]; nothing is
//! discovered from the database. Column order is preserved and is the default
//! column order of every generated statement.

use indexmap::IndexMap;

use crate::error::{Error, Result};
use crate::value::SqlValue;

/// Declared storage type of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataType {
    /// INTEGER
    Integer,
    /// REAL
    Real,
    /// TEXT
    Text,
    /// BLOB
    Blob,
    /// BOOLEAN (stored as 0/1)
    Boolean,
}

impl DataType {
    /// Returns the SQL type name.
    #[must_use]
    pub const fn to_sql(self) -> &'static str {
        match self {
            Self::Integer => "INTEGER",
            Self::Real => "REAL",
            Self::Text => "TEXT",
            Self::Blob => "BLOB",
            Self::Boolean => "BOOLEAN",
        }
    }
}

/// Definition of a single column.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnDef {
    /// Declared type.
    pub data_type: DataType,
    /// Whether NULL is allowed.
    pub nullable: bool,
    /// Default value applied by the store.
    pub default: Option<SqlValue>,
    /// Whether the store generates the value (autoincrement keys).
    pub auto_generated: bool,
    /// Optional display accessor name.
    pub accessor: Option<String>,
}

impl ColumnDef {
    /// Creates a NOT NULL column of the given type.
    #[must_use]
    pub const fn new(data_type: DataType) -> Self {
        Self {
            data_type,
            nullable: false,
            default: None,
            auto_generated: false,
            accessor: None,
        }
    }

    /// Shorthand for an INTEGER column.
    #[must_use]
    pub const fn integer() -> Self {
        Self::new(DataType::Integer)
    }

    /// Shorthand for a TEXT column.
    #[must_use]
    pub const fn text() -> Self {
        Self::new(DataType::Text)
    }

    /// Shorthand for a REAL column.
    #[must_use]
    pub const fn real() -> Self {
        Self::new(DataType::Real)
    }

    /// Shorthand for a BLOB column.
    #[must_use]
    pub const fn blob() -> Self {
        Self::new(DataType::Blob)
    }

    /// Allows NULL.
    #[must_use]
    pub const fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    /// Sets the default value.
    #[must_use]
    pub fn default_value(mut self, value: SqlValue) -> Self {
        self.default = Some(value);
        self
    }

    /// Marks the column as generated by the store.
    #[must_use]
    pub const fn auto_generated(mut self) -> Self {
        self.auto_generated = true;
        self
    }

    /// Sets the display accessor name.
    #[must_use]
    pub fn accessor(mut self, name: &str) -> Self {
        self.accessor = Some(name.to_string());
        self
    }
}

/// Cardinality of a relationship.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelationshipKind {
    /// At most one related row (`belongs_to`, `has_one`).
    ToOne,
    /// Any number of related rows (`has_many`).
    ToMany,
}

/// A declared relationship to another descriptor.
///
/// The target is referenced by name and resolved through the catalog, so
/// descriptors may reference each other in both directions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relationship {
    /// Cardinality.
    pub kind: RelationshipKind,
    /// Name of the target descriptor.
    pub target: String,
    /// Columns on this descriptor.
    pub local_columns: Vec<String>,
    /// Matching columns on the target, pairwise with `local_columns`.
    pub foreign_columns: Vec<String>,
}

impl Relationship {
    /// Returns `(local, foreign)` column pairs.
    pub fn column_pairs(&self) -> impl Iterator<Item = (&str, &str)> {
        self.local_columns
            .iter()
            .map(String::as_str)
            .zip(self.foreign_columns.iter().map(String::as_str))
    }
}

/// Static metadata for one table.
#[derive(Debug, Clone, PartialEq)]
pub struct Schema {
    name: String,
    columns: IndexMap<String, ColumnDef>,
    primary_key: Vec<String>,
    relationships: IndexMap<String, Relationship>,
}

impl Schema {
    /// Starts building a descriptor for the named table.
    #[must_use]
    pub fn builder(name: &str) -> SchemaBuilder {
        SchemaBuilder {
            name: name.to_string(),
            columns: IndexMap::new(),
            primary_key: PrimaryKey::Unset,
            relationships: IndexMap::new(),
        }
    }

    /// Returns the table name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the columns in declaration order.
    #[must_use]
    pub const fn columns(&self) -> &IndexMap<String, ColumnDef> {
        &self.columns
    }

    /// Returns the column names in declaration order.
    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.keys().map(String::as_str)
    }

    /// Returns whether the column exists.
    #[must_use]
    pub fn has_column(&self, name: &str) -> bool {
        self.columns.contains_key(name)
    }

    /// Returns the column definition.
    #[must_use]
    pub fn column(&self, name: &str) -> Option<&ColumnDef> {
        self.columns.get(name)
    }

    /// Resolves a column name or display accessor name to the column name.
    pub fn resolve_column<'a>(&'a self, name: &str) -> Result<&'a str> {
        if let Some((column, _)) = self.columns.get_key_value(name) {
            return Ok(column.as_str());
        }
        self.columns
            .iter()
            .find(|(_, def)| def.accessor.as_deref() == Some(name))
            .map(|(column, _)| column.as_str())
            .ok_or_else(|| Error::UnknownColumn(name.to_string()))
    }

    /// Returns the primary key columns; empty when unset.
    #[must_use]
    pub fn primary_key(&self) -> &[String] {
        &self.primary_key
    }

    /// Returns whether a primary key is declared.
    #[must_use]
    pub fn has_primary_key(&self) -> bool {
        !self.primary_key.is_empty()
    }

    /// Returns whether the column is part of the primary key.
    #[must_use]
    pub fn is_primary_key(&self, column: &str) -> bool {
        self.primary_key.iter().any(|pk| pk == column)
    }

    /// Returns the columns a bulk update may assign.
    pub fn updatable_columns(&self) -> impl Iterator<Item = &str> {
        self.columns
            .iter()
            .filter(|(_, def)| !def.auto_generated)
            .map(|(name, _)| name.as_str())
    }

    /// Returns the declared relationships.
    #[must_use]
    pub const fn relationships(&self) -> &IndexMap<String, Relationship> {
        &self.relationships
    }

    /// Returns a relationship by name.
    pub fn relationship(&self, name: &str) -> Result<&Relationship> {
        self.relationships
            .get(name)
            .ok_or_else(|| Error::UnknownRelationship(name.to_string()))
    }

    /// Fails with [`Error::NoPrimaryKey`] when no key is declared.
    pub fn require_primary_key(&self) -> Result<&[String]> {
        if self.primary_key.is_empty() {
            return Err(Error::NoPrimaryKey {
                schema: self.name.clone(),
            });
        }
        Ok(&self.primary_key)
    }
}

#[derive(Debug)]
enum PrimaryKey {
    Unset,
    Columns(Vec<String>),
    AllColumns,
}

/// Builder returned by [`Schema::builder`].
#[derive(Debug)]
pub struct SchemaBuilder {
    name: String,
    columns: IndexMap<String, ColumnDef>,
    primary_key: PrimaryKey,
    relationships: IndexMap<String, Relationship>,
}

impl SchemaBuilder {
    /// Appends a column.
    #[must_use]
    pub fn column(mut self, name: &str, def: ColumnDef) -> Self {
        self.columns.insert(name.to_string(), def);
        self
    }

    /// Declares the primary key columns, in order.
    #[must_use]
    pub fn primary_key(mut self, columns: &[&str]) -> Self {
        self.primary_key = PrimaryKey::Columns(columns.iter().map(|c| (*c).to_string()).collect());
        self
    }

    /// Uses every column as a composite primary key.
    #[must_use]
    pub fn primary_key_all_columns(mut self) -> Self {
        self.primary_key = PrimaryKey::AllColumns;
        self
    }

    /// Declares a to-many relationship.
    #[must_use]
    pub fn has_many(self, name: &str, target: &str, local: &[&str], foreign: &[&str]) -> Self {
        self.relationship(name, RelationshipKind::ToMany, target, local, foreign)
    }

    /// Declares a to-one relationship owned by the target (`foreign` holds the key).
    #[must_use]
    pub fn has_one(self, name: &str, target: &str, local: &[&str], foreign: &[&str]) -> Self {
        self.relationship(name, RelationshipKind::ToOne, target, local, foreign)
    }

    /// Declares a to-one relationship through a local foreign key.
    #[must_use]
    pub fn belongs_to(self, name: &str, target: &str, local: &[&str], foreign: &[&str]) -> Self {
        self.relationship(name, RelationshipKind::ToOne, target, local, foreign)
    }

    fn relationship(
        mut self,
        name: &str,
        kind: RelationshipKind,
        target: &str,
        local: &[&str],
        foreign: &[&str],
    ) -> Self {
        let owned = |cols: &[&str]| cols.iter().map(|c| (*c).to_string()).collect();
        self.relationships.insert(
            name.to_string(),
            Relationship {
                kind,
                target: target.to_string(),
                local_columns: owned(local),
                foreign_columns: owned(foreign),
            },
        );
        self
    }

    /// Validates and builds the descriptor.
    pub fn build(self) -> Result<Schema> {
        if self.columns.is_empty() {
            return Err(Error::InvalidSchema(format!(
                "`{}` declares no columns",
                self.name
            )));
        }

        let primary_key = match self.primary_key {
            PrimaryKey::Unset => Vec::new(),
            PrimaryKey::Columns(columns) => columns,
            PrimaryKey::AllColumns => self.columns.keys().cloned().collect(),
        };

        for column in &primary_key {
            if !self.columns.contains_key(column) {
                return Err(Error::InvalidSchema(format!(
                    "primary key column `{column}` is not a column of `{}`",
                    self.name
                )));
            }
        }

        for (rel_name, rel) in &self.relationships {
            if rel.local_columns.is_empty() || rel.local_columns.len() != rel.foreign_columns.len()
            {
                return Err(Error::InvalidSchema(format!(
                    "relationship `{rel_name}` on `{}` must pair local and foreign columns",
                    self.name
                )));
            }
            if let Some(missing) = rel
                .local_columns
                .iter()
                .find(|c| !self.columns.contains_key(*c))
            {
                return Err(Error::InvalidSchema(format!(
                    "relationship `{rel_name}` uses `{missing}`, which is not a column of `{}`",
                    self.name
                )));
            }
        }

        Ok(Schema {
            name: self.name,
            columns: self.columns,
            primary_key,
            relationships: self.relationships,
        })
    }
}
