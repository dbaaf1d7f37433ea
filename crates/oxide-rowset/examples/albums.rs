//! Album catalog walkthrough.
//!
//! Creates the `artist` and `album` tables when missing, then exercises
//! single-row and bulk mutations against them.
//!
//! ```sh
//! cargo run -p oxide-rowset --example albums -- --database sqlite::memory: --verbose
//! ```

use std::time::Duration;

use clap::{Parser, Subcommand};
use futures::TryStreamExt;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use oxide_rowset::{Catalog, ColumnDef, Condition, Config, Schema, SqliteDriver, ToSqlValue};

const DDL: &str = "
    CREATE TABLE IF NOT EXISTS artist (
        artistid INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL UNIQUE
    );
    CREATE TABLE IF NOT EXISTS album (
        albumid INTEGER PRIMARY KEY AUTOINCREMENT,
        artist TEXT REFERENCES artist(name),
        title TEXT NOT NULL,
        year INTEGER
    );
";

/// Walk through result sets and rows on an album catalog.
#[derive(Parser)]
#[command(name = "albums")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Database URL.
    #[arg(short, long, env = "DATABASE_URL", default_value = "sqlite::memory:")]
    database: String,

    /// Busy timeout in milliseconds.
    #[arg(long, default_value_t = 5000)]
    busy_timeout_ms: u64,

    /// Enable verbose output (logs compiled SQL).
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Insert the sample artists and albums.
    Seed,

    /// List albums, optionally for one artist.
    List {
        /// Artist name.
        #[arg(short, long)]
        artist: Option<String>,
    },

    /// Rename an album by id.
    Rename {
        /// Album id.
        id: i64,
        /// New title.
        title: String,
    },

    /// Delete every album of an artist.
    Purge {
        /// Artist name.
        artist: String,
    },
}

fn catalog() -> oxide_rowset::Result<Catalog> {
    let artist = Schema::builder("artist")
        .column("artistid", ColumnDef::integer().auto_generated())
        .column("name", ColumnDef::text())
        .primary_key(&["artistid"])
        .has_many("albums", "album", &["name"], &["artist"])
        .build()?;
    let album = Schema::builder("album")
        .column("albumid", ColumnDef::integer().auto_generated())
        .column("artist", ColumnDef::text().nullable())
        .column("title", ColumnDef::text())
        .column("year", ColumnDef::integer().nullable())
        .primary_key(&["albumid"])
        .belongs_to("artist", "artist", &["artist"], &["name"])
        .build()?;
    Catalog::new([artist, album])
}

async fn seed(catalog: &Catalog, conn: &mut SqliteDriver) -> anyhow::Result<()> {
    let artists = catalog.resultset("artist")?;
    let albums = catalog.resultset("album")?;
    for name in ["Pink Floyd", "Falco"] {
        if !artists.search(Condition::eq("name", name)).exists(conn).await? {
            artists.create(conn, [("name", name)]).await?;
        }
    }
    for (artist, title, year) in [
        ("Pink Floyd", "The Dark Side of the Moon", 1973),
        ("Pink Floyd", "Wish You Were Here", 1975),
        ("Falco", "Einzelhaft", 1982),
        ("Falco", "Junge Roemer", 1984),
        ("Falco", "Falco 3", 1985),
    ] {
        let existing = albums.search(Condition::matching([("artist", artist), ("title", title)]));
        if existing.exists(conn).await? {
            continue;
        }
        let row = albums
            .create(
                conn,
                [
                    ("artist", artist.to_sql_value()),
                    ("title", title.to_sql_value()),
                    ("year", year.to_sql_value()),
                ],
            )
            .await?;
        info!(albumid = row.get::<i64>("albumid")?, title, "Created album");
    }
    Ok(())
}

async fn list(
    catalog: &Catalog,
    conn: &mut SqliteDriver,
    artist: Option<String>,
) -> anyhow::Result<()> {
    let artists = catalog.resultset("artist")?;
    let artists = match artist {
        Some(name) => artists.search(Condition::eq("name", name)),
        None => artists,
    };
    for artist in artists.order_by(&["name"]).collect_all(conn).await? {
        let name: String = artist.get("name")?;
        let albums = catalog.related(&artist, "albums")?.order_by(&["year"]);
        println!("{name} ({} albums)", albums.count(conn).await?);
        let mut rows = albums.stream(conn)?;
        while let Some(album) = rows.try_next().await? {
            let year: Option<i64> = album.get("year")?;
            let year = year.map_or_else(|| "----".to_string(), |y| y.to_string());
            println!("  {year}  {}", album.get::<String>("title")?);
        }
    }
    Ok(())
}

async fn rename(
    catalog: &Catalog,
    conn: &mut SqliteDriver,
    id: i64,
    title: String,
) -> anyhow::Result<()> {
    let albums = catalog.resultset("album")?;
    let Some(mut album) = albums.find(conn, vec![id]).await? else {
        anyhow::bail!("no album with id {id}");
    };
    let old: String = album.get("title")?;
    album.set_column("title", title.as_str())?;
    album.update(conn).await?;
    info!(albumid = id, from = %old, to = %title, "Renamed album");
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let log_level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .without_time()
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config = Config::new(cli.database).busy_timeout(Duration::from_millis(cli.busy_timeout_ms));
    let mut conn = SqliteDriver::connect(&config).await?;
    conn.execute_script(DDL).await?;
    let catalog = catalog()?;

    match cli.command {
        Some(Commands::Seed) => seed(&catalog, &mut conn).await?,
        Some(Commands::List { artist }) => list(&catalog, &mut conn, artist).await?,
        Some(Commands::Rename { id, title }) => rename(&catalog, &mut conn, id, title).await?,
        Some(Commands::Purge { artist }) => {
            let deleted = catalog
                .resultset("album")?
                .search(Condition::eq("artist", artist.as_str()))
                .delete(&mut conn)
                .await?;
            info!(deleted, artist = %artist, "Purged albums");
        }
        None => {
            info!("No command given, running the full walkthrough on {}", config.url);
            seed(&catalog, &mut conn).await?;
            rename(&catalog, &mut conn, 2, "Animals".to_string()).await?;
            let deleted = catalog
                .resultset("album")?
                .search(Condition::eq("artist", "Falco"))
                .delete(&mut conn)
                .await?;
            info!(deleted, "Deleted Falco albums in one statement");
            list(&catalog, &mut conn, None).await?;
        }
    }
    Ok(())
}
