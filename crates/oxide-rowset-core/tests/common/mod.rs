#![allow(dead_code)]

use std::sync::Arc;

use oxide_rowset_core::{
    Attributes, ColumnDef, CompiledQuery, Compiler, Condition, Join, Schema, SqlValue,
};

pub fn album() -> Schema {
    Schema::builder("album")
        .column("albumid", ColumnDef::integer().auto_generated())
        .column("artist", ColumnDef::text())
        .column("title", ColumnDef::text())
        .column("year", ColumnDef::integer().nullable())
        .primary_key(&["albumid"])
        .build()
        .unwrap_or_else(|e| panic!("album schema: {e}"))
}

pub fn track() -> Schema {
    Schema::builder("track")
        .column("cd", ColumnDef::integer())
        .column("position", ColumnDef::integer())
        .column("title", ColumnDef::text())
        .primary_key(&["cd", "position"])
        .build()
        .unwrap_or_else(|e| panic!("track schema: {e}"))
}

pub fn cd() -> Arc<Schema> {
    Arc::new(
        Schema::builder("cd")
            .column("cdid", ColumnDef::integer().auto_generated())
            .column("title", ColumnDef::text())
            .column("year", ColumnDef::integer())
            .primary_key(&["cdid"])
            .build()
            .unwrap_or_else(|e| panic!("cd schema: {e}")),
    )
}

pub fn select(schema: &Schema, condition: &Condition) -> CompiledQuery {
    Compiler::new(schema)
        .select(condition, &Attributes::default())
        .unwrap_or_else(|e| panic!("Failed to compile {condition:?}: {e}"))
}

pub fn predicate(schema: &Schema, condition: &Condition) -> String {
    Compiler::new(schema)
        .predicate(condition)
        .unwrap_or_else(|e| panic!("Failed to compile {condition:?}: {e}"))
        .map(|q| q.inline_sql())
        .unwrap_or_default()
}

pub fn joined(alias: &str, schema: Arc<Schema>) -> Vec<Join> {
    vec![Join {
        alias: alias.to_string(),
        schema,
    }]
}

pub fn text(s: &str) -> SqlValue {
    SqlValue::Text(s.to_string())
}
