//! # oxide-rowset-core
//!
//! The I/O-free half of oxide-rowset: schema descriptors, condition trees,
//! result attributes and the query compiler.
//!
//! Everything here is pure and allocation-only. Compiled queries are SQL text
//! with `?` placeholders plus a positional parameter list; values are never
//! interpolated.
//!
//! ## Example
//!
//! ```rust
//! use oxide_rowset_core::{Attributes, ColumnDef, Compiler, Condition, Schema};
//!
//! let album = Schema::builder("album")
//!     .column("albumid", ColumnDef::integer().auto_generated())
//!     .column("artist", ColumnDef::text())
//!     .column("year", ColumnDef::integer())
//!     .primary_key(&["albumid"])
//!     .build()
//!     .unwrap();
//!
//! let condition = Condition::lt("year", 1980).and(Condition::is_in("albumid", vec![1, 14, 15]));
//! let query = Compiler::new(&album)
//!     .select(&condition, &Attributes::new().order_by(&["-year"]))
//!     .unwrap();
//!
//! assert_eq!(
//!     query.sql,
//!     "SELECT albumid, artist, year FROM album \
//!      WHERE year < ? AND albumid IN (?, ?, ?) ORDER BY year DESC"
//! );
//! assert_eq!(query.params.len(), 4);
//! ```

pub mod attributes;
pub mod compiler;
pub mod condition;
mod error;
pub mod schema;
pub mod value;

pub use attributes::{Attributes, OrderBy, OrderDirection};
pub use compiler::{CompiledQuery, Compiler, Join, BASE_ALIAS};
pub use condition::{CompareOp, Condition};
pub use error::{BoxError, Error, Result};
pub use schema::{ColumnDef, DataType, Relationship, RelationshipKind, Schema, SchemaBuilder};
pub use value::{FromSqlValue, SqlValue, ToSqlValue};
