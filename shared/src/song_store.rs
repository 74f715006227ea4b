//! SQLite-backed catalog store and its forward-only schema migrations.

use std::{fs, path::Path, time::Duration};

use anyhow::{bail, Context, Result};
use chrono::Utc;
use parking_lot::Mutex;
use rusqlite::{
    functions::FunctionFlags, params, params_from_iter, types::Value, Connection,
    OptionalExtension, Row,
};

use crate::{NewSong, Song, SongFilter};

const SONG_COLUMNS: &str =
    "id, group_name, song_name, release_date, text, youtube_link, created_at, updated_at";

struct Migration {
    version: u32,
    name: &'static str,
    sql: &'static str,
}

// Forward-only. Append new entries, never edit applied ones.
const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        name: "create_songs",
        sql: include_str!("../migrations/0001_create_songs.sql"),
    },
    Migration {
        version: 2,
        name: "index_song_names",
        sql: include_str!("../migrations/0002_index_song_names.sql"),
    },
];

/// Narrow persistence interface for songs.
///
/// Every method is a single blocking call; async callers should run them on
/// a blocking thread.
pub trait SongRepository: Send + Sync {
    /// Inserts a song and returns it with its generated id and timestamps.
    fn create(&self, song: NewSong) -> Result<Song>;

    /// Looks up a song by primary key.
    fn get_by_id(&self, id: i64) -> Result<Option<Song>>;

    /// Overwrites every mutable field of the row with `song.id` and refreshes
    /// `song.updated_at`.
    fn update(&self, song: &mut Song) -> Result<()>;

    /// Removes the row if it exists. Missing ids are not an error.
    fn delete(&self, id: i64) -> Result<()>;

    /// Returns one page of songs matching `filter` (ordered by id) and the
    /// number of matching rows before pagination.
    fn list(&self, page: u32, size: u32, filter: &SongFilter) -> Result<(Vec<Song>, u64)>;
}

/// [`SongRepository`] backed by an SQLite database.
pub struct SqliteSongStore {
    conn: Mutex<Connection>,
}

impl SqliteSongStore {
    /// Opens (creating if needed) the database file at `path` and applies
    /// pending migrations.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        let conn = Connection::open(path)
            .with_context(|| format!("failed to open song database {}", path.display()))?;
        Self::from_connection(conn)
    }

    /// Opens a private in-memory database with the schema applied.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("failed to open in-memory database")?;
        Self::from_connection(conn)
    }

    fn from_connection(mut conn: Connection) -> Result<Self> {
        conn.busy_timeout(Duration::from_secs(5))
            .context("failed to set sqlite busy timeout")?;
        register_casefold(&conn)?;
        apply_migrations(&mut conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Highest migration version recorded in the database.
    pub fn schema_version(&self) -> Result<u32> {
        let conn = self.conn.lock();
        let version: Option<u32> = conn
            .query_row("SELECT MAX(version) FROM schema_migrations", [], |row| row.get(0))
            .context("failed to read schema version")?;
        Ok(version.unwrap_or(0))
    }
}

impl SongRepository for SqliteSongStore {
    fn create(&self, song: NewSong) -> Result<Song> {
        let now = Utc::now().timestamp_millis();
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO songs (group_name, song_name, release_date, text, youtube_link, \
             created_at, updated_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)",
            params![song.group, song.title, song.release_date, song.text, song.link, now],
        )
        .context("failed to insert song")?;
        let id = conn.last_insert_rowid();
        tracing::debug!(song_id = id, "song row inserted");

        Ok(Song {
            id,
            group: song.group,
            title: song.title,
            release_date: song.release_date,
            text: song.text,
            link: song.link,
            created_at: now,
            updated_at: now,
        })
    }

    fn get_by_id(&self, id: i64) -> Result<Option<Song>> {
        let conn = self.conn.lock();
        conn.query_row(
            &format!("SELECT {SONG_COLUMNS} FROM songs WHERE id = ?1"),
            params![id],
            row_to_song,
        )
        .optional()
        .with_context(|| format!("failed to load song {id}"))
    }

    fn update(&self, song: &mut Song) -> Result<()> {
        let now = Utc::now().timestamp_millis();
        let conn = self.conn.lock();
        let changed = conn
            .execute(
                "UPDATE songs SET group_name = ?1, song_name = ?2, release_date = ?3, text = ?4, \
                 youtube_link = ?5, updated_at = ?6 WHERE id = ?7",
                params![song.group, song.title, song.release_date, song.text, song.link, now, song.id],
            )
            .with_context(|| format!("failed to update song {}", song.id))?;
        if changed == 0 {
            bail!("song {} no longer exists", song.id);
        }
        song.updated_at = now;
        Ok(())
    }

    fn delete(&self, id: i64) -> Result<()> {
        let conn = self.conn.lock();
        let removed = conn
            .execute("DELETE FROM songs WHERE id = ?1", params![id])
            .with_context(|| format!("failed to delete song {id}"))?;
        tracing::debug!(song_id = id, removed, "song delete executed");
        Ok(())
    }

    fn list(&self, page: u32, size: u32, filter: &SongFilter) -> Result<(Vec<Song>, u64)> {
        let mut clauses = Vec::new();
        let mut values = Vec::new();
        if let Some(group) = filter.group.as_deref() {
            clauses.push("casefold(group_name) LIKE ? ESCAPE '\\'");
            values.push(Value::Text(like_pattern(group)));
        }
        if let Some(song) = filter.song.as_deref() {
            clauses.push("casefold(song_name) LIKE ? ESCAPE '\\'");
            values.push(Value::Text(like_pattern(song)));
        }
        let where_sql = if clauses.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", clauses.join(" AND "))
        };

        let conn = self.conn.lock();
        let total: i64 = conn
            .query_row(
                &format!("SELECT COUNT(*) FROM songs{where_sql}"),
                params_from_iter(values.iter()),
                |row| row.get(0),
            )
            .context("failed to count songs")?;

        let offset = i64::from(page.saturating_sub(1)).saturating_mul(i64::from(size));
        values.push(Value::Integer(i64::from(size)));
        values.push(Value::Integer(offset));
        let mut stmt = conn
            .prepare(&format!(
                "SELECT {SONG_COLUMNS} FROM songs{where_sql} ORDER BY id LIMIT ? OFFSET ?"
            ))
            .context("failed to prepare song listing")?;
        let songs = stmt
            .query_map(params_from_iter(values.iter()), row_to_song)
            .context("failed to list songs")?
            .collect::<rusqlite::Result<Vec<_>>>()
            .context("failed to read song rows")?;

        Ok((songs, total.max(0) as u64))
    }
}

fn row_to_song(row: &Row<'_>) -> rusqlite::Result<Song> {
    Ok(Song {
        id: row.get(0)?,
        group: row.get(1)?,
        title: row.get(2)?,
        release_date: row.get(3)?,
        text: row.get(4)?,
        link: row.get(5)?,
        created_at: row.get(6)?,
        updated_at: row.get(7)?,
    })
}

/// `%value%` with LIKE wildcards in `value` matched literally.
fn like_pattern(value: &str) -> String {
    let mut pattern = String::with_capacity(value.len() + 2);
    pattern.push('%');
    for ch in value.to_lowercase().chars() {
        if matches!(ch, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(ch);
    }
    pattern.push('%');
    pattern
}

// SQLite's own lower()/LIKE only fold ASCII.
fn register_casefold(conn: &Connection) -> Result<()> {
    conn.create_scalar_function(
        "casefold",
        1,
        FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
        |ctx| {
            let value: Option<String> = ctx.get(0)?;
            Ok(value.map(|value| value.to_lowercase()))
        },
    )
    .context("failed to register casefold function")
}

fn apply_migrations(conn: &mut Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            applied_at INTEGER NOT NULL
        );",
    )
    .context("failed to create schema_migrations table")?;

    for migration in MIGRATIONS {
        let applied: bool = conn
            .query_row(
                "SELECT EXISTS(SELECT 1 FROM schema_migrations WHERE version = ?1)",
                params![migration.version],
                |row| row.get(0),
            )
            .with_context(|| format!("failed to check migration {}", migration.version))?;
        if applied {
            continue;
        }

        let tx = conn.transaction().context("failed to begin migration")?;
        tx.execute_batch(migration.sql)
            .with_context(|| format!("migration {} ({}) failed", migration.version, migration.name))?;
        tx.execute(
            "INSERT INTO schema_migrations (version, name, applied_at) VALUES (?1, ?2, ?3)",
            params![migration.version, migration.name, Utc::now().timestamp_millis()],
        )
        .context("failed to record migration")?;
        tx.commit().context("failed to commit migration")?;
        tracing::info!(version = migration.version, name = migration.name, "applied migration");
    }
    Ok(())
}
