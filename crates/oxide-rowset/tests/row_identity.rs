//! Single-row mutation keyed by the primary key snapshot.

mod common;

use std::sync::Arc;

use common::setup;
use oxide_rowset::{Condition, Error, Record, Row, SqlValue};

#[tokio::test]
async fn test_update_after_create_is_keyed_by_generated_id() {
    let (catalog, mut conn) = setup().await;
    let albums = catalog.resultset("album").unwrap();
    let mut row = albums
        .create(
            &mut conn,
            [("artist", "Pink Floyd"), ("title", "Wish You Were Here")],
        )
        .await
        .unwrap();
    conn.clear();

    row.set_column("title", "Animals").unwrap();
    assert!(row.is_changed());
    row.update(&mut conn).await.unwrap();

    assert_eq!(
        conn.statements(),
        ["UPDATE album SET title = 'Animals' WHERE albumid = 7"]
    );
    assert!(!row.is_changed());
    assert_eq!(row.dirty_columns().count(), 0);
}

#[tokio::test]
async fn test_key_edit_targets_the_loaded_row() {
    let (catalog, mut conn) = setup().await;
    let albums = catalog.resultset("album").unwrap();
    let mut row = albums.find(&mut conn, vec![3]).await.unwrap().unwrap();
    conn.clear();

    row.set_column("title", "Einzelhaft (Remaster)").unwrap();
    row.set_column("albumid", 100).unwrap();
    row.update(&mut conn).await.unwrap();

    assert_eq!(
        conn.statements(),
        ["UPDATE album SET albumid = 100, title = 'Einzelhaft (Remaster)' WHERE albumid = 3"]
    );
    assert_eq!(row.pk_snapshot()["albumid"], SqlValue::Int(100));
    assert!(albums.find(&mut conn, vec![3]).await.unwrap().is_none());
    let moved = albums.find(&mut conn, vec![100]).await.unwrap().unwrap();
    assert_eq!(moved.get::<String>("title").unwrap(), "Einzelhaft (Remaster)");
}

#[tokio::test]
async fn test_composite_key_is_snapshotted_as_a_whole() {
    let (catalog, mut conn) = setup().await;
    let tracks = catalog.resultset("track").unwrap();
    let mut track = tracks.find(&mut conn, vec![1, 2]).await.unwrap().unwrap();
    conn.clear();

    track.set_column("position", 3).unwrap();
    track.update(&mut conn).await.unwrap();

    assert_eq!(
        conn.statements(),
        ["UPDATE track SET position = 3 WHERE cd = 1 AND position = 2"]
    );
    assert_eq!(track.pk_snapshot()["cd"], SqlValue::Int(1));
    assert_eq!(track.pk_snapshot()["position"], SqlValue::Int(3));
}

#[tokio::test]
async fn test_clean_update_does_no_io() {
    let (catalog, mut conn) = setup().await;
    let mut row = catalog
        .resultset("album")
        .unwrap()
        .find(&mut conn, vec![1])
        .await
        .unwrap()
        .unwrap();
    conn.clear();

    row.update(&mut conn).await.unwrap();
    row.discard_changes(&mut conn).await.unwrap();

    assert!(conn.queries.is_empty());
}

#[tokio::test]
async fn test_deleted_row_rejects_everything() {
    let (catalog, mut conn) = setup().await;
    let albums = catalog.resultset("album").unwrap();
    let mut row = albums.find(&mut conn, vec![2]).await.unwrap().unwrap();

    row.delete(&mut conn).await.unwrap();

    assert!(row.is_deleted());
    assert!(!row.is_persisted());
    assert!(matches!(row.get_column("title"), Err(Error::RowDeleted)));
    assert!(matches!(row.update(&mut conn).await, Err(Error::RowDeleted)));
    assert!(matches!(row.delete(&mut conn).await, Err(Error::RowDeleted)));
    assert!(matches!(
        row.set_column("title", "Meddle"),
        Err(Error::RowDeleted)
    ));
    assert!(matches!(row.save(&mut conn).await, Err(Error::RowDeleted)));
    assert!(albums.find(&mut conn, vec![2]).await.unwrap().is_none());
}

#[tokio::test]
async fn test_delete_is_keyed_by_snapshot() {
    let (catalog, mut conn) = setup().await;
    let mut row = catalog
        .resultset("album")
        .unwrap()
        .find(&mut conn, vec![4])
        .await
        .unwrap()
        .unwrap();
    row.set_column("albumid", 40).unwrap();
    conn.clear();

    row.delete(&mut conn).await.unwrap();

    assert_eq!(conn.statements(), ["DELETE FROM album WHERE albumid = 4"]);
}

#[tokio::test]
async fn test_source_without_primary_key() {
    let (catalog, mut conn) = setup().await;
    let mut entry = catalog
        .resultset("log")
        .unwrap()
        .search(Condition::eq("message", "disk full"))
        .first(&mut conn)
        .await
        .unwrap()
        .unwrap();
    assert!(entry.pk_snapshot().is_empty());

    entry.set_column("level", "warn").unwrap();
    assert!(matches!(
        entry.update(&mut conn).await,
        Err(Error::NoPrimaryKey { schema }) if schema == "log"
    ));
    assert!(matches!(
        entry.delete(&mut conn).await,
        Err(Error::NoPrimaryKey { .. })
    ));
    assert!(matches!(
        entry.discard_changes(&mut conn).await,
        Err(Error::NoPrimaryKey { .. })
    ));
    assert!(entry.is_changed());
}

#[tokio::test]
async fn test_discard_changes_refetches() {
    let (catalog, mut conn) = setup().await;
    let mut row = catalog
        .resultset("album")
        .unwrap()
        .find(&mut conn, vec![5])
        .await
        .unwrap()
        .unwrap();
    row.set_column("title", "Falco 4").unwrap();
    row.set_column("albumid", 50).unwrap();
    conn.clear();

    row.discard_changes(&mut conn).await.unwrap();

    assert!(!row.is_changed());
    assert_eq!(row.get::<String>("title").unwrap(), "Falco 3");
    assert_eq!(row.get::<i64>("albumid").unwrap(), 5);
    assert_eq!(
        conn.statements(),
        ["SELECT albumid, artist, title, year FROM album WHERE albumid = 5 LIMIT 1"]
    );
}

#[tokio::test]
async fn test_failed_write_leaves_state_unchanged() {
    let (catalog, mut conn) = setup().await;
    let albums = catalog.resultset("album").unwrap();
    let mut row = albums.find(&mut conn, vec![1]).await.unwrap().unwrap();
    albums
        .search(Condition::eq("albumid", 1))
        .delete(&mut conn)
        .await
        .unwrap();

    row.set_column("albumid", 10).unwrap();
    row.set_column("year", 1974).unwrap();

    assert!(matches!(row.update(&mut conn).await, Err(Error::NotFound)));
    assert!(row.is_changed());
    assert_eq!(row.pk_snapshot()["albumid"], SqlValue::Int(1));
    assert!(matches!(
        row.discard_changes(&mut conn).await,
        Err(Error::NotFound)
    ));
    assert!(matches!(row.delete(&mut conn).await, Err(Error::NotFound)));
    assert!(!row.is_deleted());
}

#[tokio::test]
async fn test_connectivity_failure_keeps_changes() {
    let (catalog, mut conn) = setup().await;
    let mut row = catalog
        .resultset("album")
        .unwrap()
        .find(&mut conn, vec![1])
        .await
        .unwrap()
        .unwrap();
    conn.inner.execute_script("DROP TABLE album").await.unwrap();

    row.set_column("title", "Meddle").unwrap();
    let err = row.update(&mut conn).await.unwrap_err();

    assert!(matches!(err, Error::Connectivity(_)));
    let dirty: Vec<_> = row.dirty_columns().collect();
    assert_eq!(dirty, [("title", &SqlValue::Text("Meddle".into()))]);
    assert_eq!(row.pk_snapshot()["albumid"], SqlValue::Int(1));
}

#[tokio::test]
async fn test_insert_lifecycle() {
    let (catalog, mut conn) = setup().await;
    let logs = catalog.resultset("log").unwrap();
    let albums = catalog.resultset("album").unwrap();

    let mut entry = logs.new_row([("message", "rebooted")]).unwrap();
    assert!(matches!(
        entry.update(&mut conn).await,
        Err(Error::NotInStorage)
    ));
    entry.insert(&mut conn).await.unwrap();
    assert_eq!(entry.get::<String>("level").unwrap(), "info");
    assert!(matches!(
        entry.insert(&mut conn).await,
        Err(Error::AlreadyInStorage)
    ));

    let mut album = albums.new_row([("title", "Meddle")]).unwrap();
    album.save(&mut conn).await.unwrap();
    assert_eq!(album.get::<i64>("albumid").unwrap(), 7);
    album.set_column("artist", "Pink Floyd").unwrap();
    album.save(&mut conn).await.unwrap();
    let stored = albums.find(&mut conn, vec![7]).await.unwrap().unwrap();
    assert_eq!(stored.get::<Option<String>>("artist").unwrap().as_deref(), Some("Pink Floyd"));
    assert_eq!(stored, album);
}

#[tokio::test]
async fn test_null_key_component_is_incomplete() {
    let (catalog, mut conn) = setup().await;
    let source = Arc::clone(catalog.schema("album").unwrap());
    let record: Record = [
        ("albumid".to_string(), SqlValue::Null),
        ("title".to_string(), SqlValue::Text("Ghost".into())),
    ]
    .into_iter()
    .collect();
    let mut row = Row::from_record(source, record);

    row.set_column("title", "Ghost II").unwrap();
    assert!(matches!(
        row.update(&mut conn).await,
        Err(Error::IncompleteKey { column }) if column == "albumid"
    ));
    assert!(conn.queries.is_empty());
}
