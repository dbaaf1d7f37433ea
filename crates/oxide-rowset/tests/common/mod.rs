//! Shared fixtures for the engine integration tests.

#![allow(dead_code)]

use oxide_rowset::{
    Catalog, ColumnDef, CompiledQuery, Config, Connection, RecordStream, Result, Schema,
    SqlValue, SqliteDriver,
};

const DDL: &str = "
    CREATE TABLE artist (
        artistid INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL UNIQUE
    );
    CREATE TABLE album (
        albumid INTEGER PRIMARY KEY AUTOINCREMENT,
        artist TEXT,
        title TEXT NOT NULL,
        year INTEGER
    );
    CREATE TABLE cd (
        cdid INTEGER PRIMARY KEY AUTOINCREMENT,
        title TEXT NOT NULL
    );
    CREATE TABLE track (
        cd INTEGER NOT NULL,
        position INTEGER NOT NULL,
        title TEXT NOT NULL,
        PRIMARY KEY (cd, position)
    );
    CREATE TABLE log (
        message TEXT NOT NULL,
        level TEXT NOT NULL DEFAULT 'info'
    );
";

const SEED: &str = "
    INSERT INTO artist (name) VALUES ('Pink Floyd'), ('Falco');
    INSERT INTO album (artist, title, year) VALUES
        ('Pink Floyd', 'The Dark Side of the Moon', 1973),
        ('Pink Floyd', 'Wish You Were Here', 1975),
        ('Falco', 'Einzelhaft', 1982),
        ('Falco', 'Junge Roemer', 1984),
        ('Falco', 'Falco 3', 1985),
        (NULL, 'Unknown Pleasures', NULL);
    INSERT INTO cd (title) VALUES ('Live at Pompeii');
    INSERT INTO track (cd, position, title) VALUES
        (1, 1, 'Echoes, Part 1'),
        (1, 2, 'Careful with That Axe, Eugene');
    INSERT INTO log (message, level) VALUES ('started', 'info'), ('disk full', 'error');
";

pub fn artist() -> Schema {
    Schema::builder("artist")
        .column("artistid", ColumnDef::integer().auto_generated())
        .column("name", ColumnDef::text())
        .primary_key(&["artistid"])
        .has_many("albums", "album", &["name"], &["artist"])
        .build()
        .unwrap()
}

pub fn album() -> Schema {
    Schema::builder("album")
        .column("albumid", ColumnDef::integer().auto_generated())
        .column("artist", ColumnDef::text().nullable())
        .column("title", ColumnDef::text().accessor("name"))
        .column("year", ColumnDef::integer().nullable())
        .primary_key(&["albumid"])
        .belongs_to("artist", "artist", &["artist"], &["name"])
        .build()
        .unwrap()
}

pub fn cd() -> Schema {
    Schema::builder("cd")
        .column("cdid", ColumnDef::integer().auto_generated())
        .column("title", ColumnDef::text())
        .primary_key(&["cdid"])
        .has_many("tracks", "track", &["cdid"], &["cd"])
        .build()
        .unwrap()
}

pub fn track() -> Schema {
    Schema::builder("track")
        .column("cd", ColumnDef::integer())
        .column("position", ColumnDef::integer())
        .column("title", ColumnDef::text())
        .primary_key(&["cd", "position"])
        .belongs_to("cd", "cd", &["cd"], &["cdid"])
        .build()
        .unwrap()
}

/// A source without a primary key.
pub fn log() -> Schema {
    Schema::builder("log")
        .column("message", ColumnDef::text())
        .column("level", ColumnDef::text().default_value(SqlValue::Text("info".into())))
        .build()
        .unwrap()
}

pub fn catalog() -> Catalog {
    Catalog::new([artist(), album(), cd(), track(), log()]).unwrap()
}

/// Opens an in-memory database with the fixture tables and rows.
pub async fn setup() -> (Catalog, RecordingConnection<SqliteDriver>) {
    let mut driver = SqliteDriver::connect(&Config::in_memory())
        .await
        .expect("Failed to open in-memory SQLite connection");
    driver.execute_script(DDL).await.unwrap();
    driver.execute_script(SEED).await.unwrap();
    (catalog(), RecordingConnection::new(driver))
}

/// Connection wrapper that records every compiled query it is handed.
pub struct RecordingConnection<C> {
    pub inner: C,
    pub queries: Vec<CompiledQuery>,
}

impl<C: Connection> RecordingConnection<C> {
    pub const fn new(inner: C) -> Self {
        Self {
            inner,
            queries: Vec::new(),
        }
    }

    /// Recorded queries with values inlined.
    pub fn statements(&self) -> Vec<String> {
        self.queries.iter().map(CompiledQuery::inline_sql).collect()
    }

    pub fn clear(&mut self) {
        self.queries.clear();
    }
}

impl<C: Connection> Connection for RecordingConnection<C> {
    fn fetch(&mut self, query: CompiledQuery) -> RecordStream<'_> {
        self.queries.push(query.clone());
        self.inner.fetch(query)
    }

    async fn execute(&mut self, query: CompiledQuery) -> Result<u64> {
        self.queries.push(query.clone());
        self.inner.execute(query).await
    }
}

/// Text values of one column, in row order.
pub fn texts(rows: &[oxide_rowset::Row], column: &str) -> Vec<String> {
    rows.iter()
        .map(|row| row.get::<String>(column).unwrap())
        .collect()
}
