//! # oxide-rowset
//!
//! Lazy, composable result sets and identity-tracked rows over SQLite.
//!
//! This crate provides:
//! - [`Catalog`], an explicit collection of schema descriptors
//! - [`ResultSet`] for immutable, chainable queries and bulk mutations
//! - [`Row`] for single-row writes keyed by the primary key snapshot
//! - relationship resolution (`related`, `join`, `search_related`)
//! - [`SqliteDriver`], a sqlx-backed [`Connection`]
//!
//! Compilation lives in [`oxide_rowset_core`] and is re-exported here.
//!
//! ## Quick Start
//!
//! ```ignore
//! use oxide_rowset::{Catalog, ColumnDef, Condition, Config, Schema, SqliteDriver};
//!
//! async fn example() -> oxide_rowset::Result<()> {
//!     let album = Schema::builder("album")
//!         .column("albumid", ColumnDef::integer().auto_generated())
//!         .column("artist", ColumnDef::text())
//!         .column("title", ColumnDef::text())
//!         .primary_key(&["albumid"])
//!         .build()?;
//!     let catalog = Catalog::new([album])?;
//!     let mut conn = SqliteDriver::connect(&Config::from_env()?).await?;
//!
//!     let albums = catalog.resultset("album")?;
//!     let mut row = albums
//!         .create(&mut conn, [("artist", "Pink Floyd"), ("title", "Wish You Were Here")])
//!         .await?;
//!
//!     // Single-row write, keyed by the generated albumid.
//!     row.set_column("title", "Animals")?;
//!     row.update(&mut conn).await?;
//!
//!     // Bulk delete, no rows materialized.
//!     albums
//!         .search(Condition::eq("artist", "Falco"))
//!         .delete(&mut conn)
//!         .await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Bulk and single-row mutation
//!
//! [`ResultSet::update`] and [`ResultSet::delete`] act on every row matching
//! the set's condition. [`Row::update`] and [`Row::delete`] act on exactly the
//! row identified by the key snapshot, and need a primary key.

mod catalog;
pub mod config;
mod connection;
mod relationship;
mod resultset;
mod row;
mod sqlite;

pub use catalog::Catalog;
pub use config::Config;
pub use connection::{Connection, Record, RecordStream};
pub use resultset::{ResultSet, DEFAULT_PAGE_SIZE};
pub use row::Row;
pub use sqlite::SqliteDriver;

pub use oxide_rowset_core::{
    Attributes, ColumnDef, CompareOp, CompiledQuery, Condition, DataType, Error, FromSqlValue,
    Join, OrderBy, OrderDirection, Relationship, RelationshipKind, Result, Schema, SchemaBuilder,
    SqlValue, ToSqlValue,
};
