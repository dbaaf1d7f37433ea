//! Tests for bulk and single-row statement compilation.

mod common;
use common::*;

use indexmap::IndexMap;
use oxide_rowset_core::{Attributes, Compiler, Condition, Error, SqlValue};

#[test]
fn test_bulk_delete_compiles_condition_only() {
    let schema = album();
    let q = Compiler::new(&schema)
        .delete(&Condition::eq("artist", "Falco"), &Attributes::default())
        .unwrap();
    assert_eq!(q.sql, "DELETE FROM album WHERE artist = ?");
    assert_eq!(q.inline_sql(), "DELETE FROM album WHERE artist = 'Falco'");
}

#[test]
fn test_bulk_delete_ignores_ordering() {
    let schema = album();
    let q = Compiler::new(&schema)
        .delete(&Condition::default(), &Attributes::new().order_by(&["title"]))
        .unwrap();
    assert_eq!(q.sql, "DELETE FROM album");
}

#[test]
fn test_single_row_update_by_key_snapshot() {
    let schema = album();
    let key = [("albumid".to_string(), SqlValue::Int(42))];
    let q = Compiler::new(&schema)
        .update(
            &Condition::identity(key.iter().map(|(c, v)| (c, v))),
            &Attributes::default(),
            &[("title".to_string(), text("Animals"))],
        )
        .unwrap();
    assert_eq!(q.inline_sql(), "UPDATE album SET title = 'Animals' WHERE albumid = 42");
}

#[test]
fn test_update_of_unknown_column() {
    let schema = album();
    let err = Compiler::new(&schema)
        .update(
            &Condition::default(),
            &Attributes::default(),
            &[("rating".to_string(), SqlValue::Int(5))],
        )
        .unwrap_err();
    assert!(matches!(err, Error::UnknownColumn(c) if c == "rating"));
}

#[test]
fn test_update_without_values_fails() {
    let schema = album();
    let err = Compiler::new(&schema)
        .update(&Condition::default(), &Attributes::default(), &[])
        .unwrap_err();
    assert!(matches!(err, Error::Compilation(_)));
}

#[test]
fn test_paginated_update_with_composite_key() {
    let schema = track();
    let q = Compiler::new(&schema)
        .update(
            &Condition::eq("cd", 1),
            &Attributes::new().order_by(&["position"]).rows(1).offset(1),
            &[("title".to_string(), text("Dogs"))],
        )
        .unwrap();
    assert_eq!(
        q.sql,
        "UPDATE track SET title = ? WHERE (cd, position) IN \
         (SELECT cd, position FROM track WHERE cd = ? ORDER BY position ASC LIMIT 1 OFFSET 1)"
    );
    assert_eq!(q.params, vec![text("Dogs"), SqlValue::Int(1)]);
}

#[test]
fn test_joined_delete_uses_key_subquery() {
    let schema = album();
    let joins = joined("cd", cd());
    let condition = Condition::raw("me.title = cd.title", vec![]).and(Condition::eq("cd.year", 1975));
    let q = Compiler::new(&schema)
        .with_joins(&joins)
        .delete(&condition, &Attributes::default())
        .unwrap();
    assert_eq!(
        q.sql,
        "DELETE FROM album WHERE albumid IN (SELECT me.albumid FROM album AS me, cd AS cd \
         WHERE (me.title = cd.title) AND cd.year = ?)"
    );
}

#[test]
fn test_duplicate_join_alias_fails() {
    let schema = album();
    let mut joins = joined("cd", cd());
    joins.extend(joined("cd", cd()));
    let err = Compiler::new(&schema)
        .with_joins(&joins)
        .select(&Condition::default(), &Attributes::default())
        .unwrap_err();
    assert!(matches!(err, Error::Compilation(_)));
}

#[test]
fn test_insert_returns_all_columns() {
    let schema = album();
    let mut values = IndexMap::new();
    values.insert("artist".to_string(), text("Pink Floyd"));
    values.insert("title".to_string(), text("Wish You Were Here"));
    let q = Compiler::new(&schema).insert(&values).unwrap();
    assert_eq!(
        q.inline_sql(),
        "INSERT INTO album (artist, title) VALUES ('Pink Floyd', 'Wish You Were Here') \
         RETURNING albumid, artist, title, year"
    );
}

#[test]
fn test_insert_of_unknown_column() {
    let schema = album();
    let mut values = IndexMap::new();
    values.insert("rating".to_string(), SqlValue::Int(5));
    let err = Compiler::new(&schema).insert(&values).unwrap_err();
    assert!(matches!(err, Error::UnknownColumn(c) if c == "rating"));
}
