//! SQLite-backed song store.

use super::error::{StoreError, StoreResult};
use super::models::{Song, SongFeatures, TagKind, TitleMatch};
use super::schema::{register_functions, CASE_FOLD_FUNCTION, SONG_CATALOG_VERSIONED_SCHEMAS};
use super::trait_def::SongStore;
use super::validation::{validate_features, validate_song};
use crate::sqlite_persistence::open_schema;
use anyhow::{Context, Result};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension};
use std::collections::BTreeSet;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

const SONG_COLUMNS: &str = "s.track_id, s.title, s.artist, s.year, s.release, s.genre";

/// SQLite-backed store for songs, their tags and feature vectors.
#[derive(Clone)]
pub struct SqliteSongStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteSongStore {
    /// Open (creating if needed) the song database at `db_path`.
    ///
    /// A new file gets the current schema; an existing one must already match it.
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let db_path = db_path.as_ref();
        let conn = Connection::open_with_flags(
            db_path,
            rusqlite::OpenFlags::SQLITE_OPEN_READ_WRITE
                | rusqlite::OpenFlags::SQLITE_OPEN_CREATE
                | rusqlite::OpenFlags::SQLITE_OPEN_URI
                | rusqlite::OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .with_context(|| format!("Failed to open song database at {:?}", db_path))?;
        conn.pragma_update(None, "journal_mode", "WAL")?;

        Self::from_connection(conn)
    }

    /// An empty store that lives only as long as the returned value.
    pub fn open_in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        // Enforcement is per connection and off by default
        conn.pragma_update(None, "foreign_keys", "ON")?;
        register_functions(&conn).context("Failed to register SQL functions")?;
        open_schema(&conn, SONG_CATALOG_VERSIONED_SCHEMAS)
            .context("Song database schema check failed")?;

        let store = SqliteSongStore {
            conn: Arc::new(Mutex::new(conn)),
        };
        info!(
            "Opened song catalog: {} songs, {} feature vectors",
            store.songs_count(),
            store.features_count()
        );
        Ok(store)
    }

    // =========================================================================
    // Internal Helper Methods
    // =========================================================================

    fn write_tags(
        conn: &Connection,
        kind: TagKind,
        track_id: &str,
        tags: &[String],
    ) -> StoreResult<()> {
        conn.execute(
            &format!("DELETE FROM {} WHERE track_id = ?1", kind.table()),
            params![track_id],
        )?;
        let mut stmt = conn.prepare_cached(&format!(
            "INSERT INTO {} (track_id, position, {}) VALUES (?1, ?2, ?3)",
            kind.table(),
            kind.value_column()
        ))?;
        for (position, tag) in tags.iter().enumerate() {
            stmt.execute(params![track_id, position as i64, tag])
                .map_err(|e| StoreError::from_sqlite(e, track_id))?;
        }
        Ok(())
    }

    fn load_tags(conn: &Connection, kind: TagKind, track_id: &str) -> StoreResult<Vec<String>> {
        let mut stmt = conn.prepare_cached(&format!(
            "SELECT {} FROM {} WHERE track_id = ?1 ORDER BY position",
            kind.value_column(),
            kind.table()
        ))?;
        let tags = stmt
            .query_map(params![track_id], |r| r.get(0))?
            .collect::<Result<Vec<String>, _>>()?;
        Ok(tags)
    }

    /// Parse a Song from a row selected with `SONG_COLUMNS`, without tags.
    fn parse_song_row(row: &rusqlite::Row) -> rusqlite::Result<Song> {
        Ok(Song {
            track_id: row.get(0)?,
            title: row.get(1)?,
            artist: row.get(2)?,
            year: row.get(3)?,
            release: row.get(4)?,
            genre: row.get(5)?,
            artist_terms_top: Vec::new(),
            artist_mbtags_top: Vec::new(),
        })
    }

    fn with_tags(conn: &Connection, mut song: Song) -> StoreResult<Song> {
        song.artist_terms_top = Self::load_tags(conn, TagKind::ArtistTerm, &song.track_id)?;
        song.artist_mbtags_top = Self::load_tags(conn, TagKind::MusicBrainzTag, &song.track_id)?;
        Ok(song)
    }

    /// Run a query selecting `SONG_COLUMNS` from `songs s` and resolve tags for each row.
    fn query_songs<P: rusqlite::Params>(
        conn: &Connection,
        sql: &str,
        params: P,
    ) -> StoreResult<Vec<Song>> {
        let mut stmt = conn.prepare(sql)?;
        let songs = stmt
            .query_map(params, Self::parse_song_row)?
            .collect::<Result<Vec<_>, _>>()?;
        songs
            .into_iter()
            .map(|song| Self::with_tags(conn, song))
            .collect()
    }

    fn find_by_lowered(
        &self,
        column: &str,
        query: &str,
        mode: TitleMatch,
        limit: usize,
    ) -> StoreResult<Vec<Song>> {
        // The WHERE side must read unicode_lower(<column>) verbatim for the expression index to apply
        let fold = CASE_FOLD_FUNCTION;
        let condition = match mode {
            TitleMatch::Exact => format!("{fold}(s.{column}) = {fold}(?1)"),
            TitleMatch::Prefix => format!(
                "{fold}(s.{column}) >= {fold}(?1) AND {fold}(s.{column}) < {fold}(?1) || char(1114111)"
            ),
        };
        let sql = format!(
            "SELECT {SONG_COLUMNS} FROM songs s WHERE {condition} ORDER BY s.track_id LIMIT ?2"
        );

        let conn = self.conn.lock().unwrap();
        Self::query_songs(&conn, &sql, params![query, limit as i64])
    }

    fn count(&self, table: &str) -> usize {
        let conn = self.conn.lock().unwrap();
        conn.query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |r| {
            r.get::<_, i64>(0)
        })
        .unwrap_or(0) as usize
    }
}

impl SongStore for SqliteSongStore {
    fn insert_song(&self, song: &Song) -> StoreResult<()> {
        validate_song(song)?;
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;

        tx.execute(
            "INSERT INTO songs (track_id, title, artist, year, release, genre)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                &song.track_id,
                &song.title,
                &song.artist,
                song.known_year(),
                &song.release,
                &song.genre
            ],
        )
        .map_err(|e| StoreError::from_sqlite(e, &song.track_id))?;
        Self::write_tags(&tx, TagKind::ArtistTerm, &song.track_id, &song.artist_terms_top)?;
        Self::write_tags(&tx, TagKind::MusicBrainzTag, &song.track_id, &song.artist_mbtags_top)?;

        tx.commit()?;
        debug!("Inserted song {}", song.track_id);
        Ok(())
    }

    fn upsert_song(&self, song: &Song) -> StoreResult<()> {
        validate_song(song)?;
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;

        tx.execute(
            "INSERT INTO songs (track_id, title, artist, year, release, genre)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT(track_id) DO UPDATE SET
                title = excluded.title,
                artist = excluded.artist,
                year = excluded.year,
                release = excluded.release,
                genre = excluded.genre",
            params![
                &song.track_id,
                &song.title,
                &song.artist,
                song.known_year(),
                &song.release,
                &song.genre
            ],
        )
        .map_err(|e| StoreError::from_sqlite(e, &song.track_id))?;
        Self::write_tags(&tx, TagKind::ArtistTerm, &song.track_id, &song.artist_terms_top)?;
        Self::write_tags(&tx, TagKind::MusicBrainzTag, &song.track_id, &song.artist_mbtags_top)?;

        tx.commit()?;
        debug!("Upserted song {}", song.track_id);
        Ok(())
    }

    fn get_song(&self, track_id: &str) -> StoreResult<Option<Song>> {
        let conn = self.conn.lock().unwrap();
        let song = conn
            .query_row(
                &format!("SELECT {SONG_COLUMNS} FROM songs s WHERE s.track_id = ?1"),
                params![track_id],
                Self::parse_song_row,
            )
            .optional()?;

        match song {
            Some(song) => Ok(Some(Self::with_tags(&conn, song)?)),
            None => Ok(None),
        }
    }

    fn delete_song(&self, track_id: &str) -> StoreResult<bool> {
        let conn = self.conn.lock().unwrap();
        let deleted = conn.execute("DELETE FROM songs WHERE track_id = ?1", params![track_id])?;
        if deleted > 0 {
            debug!("Deleted song {}", track_id);
        }
        Ok(deleted > 0)
    }

    fn insert_features(&self, features: &SongFeatures) -> StoreResult<()> {
        validate_features(features)?;
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO song_features (track_id, features) VALUES (?1, ?2)",
            params![&features.track_id, features.to_blob()],
        )
        .map_err(|e| StoreError::from_sqlite(e, &features.track_id))?;
        Ok(())
    }

    fn upsert_features(&self, features: &SongFeatures) -> StoreResult<()> {
        validate_features(features)?;
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO song_features (track_id, features) VALUES (?1, ?2)
             ON CONFLICT(track_id) DO UPDATE SET features = excluded.features",
            params![&features.track_id, features.to_blob()],
        )
        .map_err(|e| StoreError::from_sqlite(e, &features.track_id))?;
        Ok(())
    }

    fn get_features(&self, track_id: &str) -> StoreResult<Option<SongFeatures>> {
        let conn = self.conn.lock().unwrap();
        let blob: Option<Vec<u8>> = conn
            .query_row(
                "SELECT features FROM song_features WHERE track_id = ?1",
                params![track_id],
                |r| r.get(0),
            )
            .optional()?;

        blob.map(|blob| {
            SongFeatures::from_blob(track_id, &blob)
                .ok_or_else(|| StoreError::CorruptFeatures(track_id.to_string()))
        })
        .transpose()
    }

    fn list_features(&self) -> StoreResult<Vec<SongFeatures>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt =
            conn.prepare("SELECT track_id, features FROM song_features ORDER BY track_id")?;
        let rows = stmt
            .query_map([], |r| Ok((r.get::<_, String>(0)?, r.get::<_, Vec<u8>>(1)?)))?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(|(track_id, blob)| {
                SongFeatures::from_blob(track_id.as_str(), &blob)
                    .ok_or(StoreError::CorruptFeatures(track_id))
            })
            .collect()
    }

    fn find_by_title(
        &self,
        query: &str,
        mode: TitleMatch,
        limit: usize,
    ) -> StoreResult<Vec<Song>> {
        self.find_by_lowered("title", query, mode, limit)
    }

    fn find_by_artist(
        &self,
        query: &str,
        mode: TitleMatch,
        limit: usize,
    ) -> StoreResult<Vec<Song>> {
        self.find_by_lowered("artist", query, mode, limit)
    }

    fn find_by_tag(&self, kind: TagKind, tag: &str, limit: usize) -> StoreResult<Vec<Song>> {
        let sql = format!(
            "SELECT {SONG_COLUMNS} FROM songs s
             WHERE s.track_id IN (SELECT track_id FROM {} WHERE {} = ?1)
             ORDER BY s.track_id LIMIT ?2",
            kind.table(),
            kind.value_column()
        );
        let conn = self.conn.lock().unwrap();
        Self::query_songs(&conn, &sql, params![tag, limit as i64])
    }

    fn find_containing_all(
        &self,
        kind: TagKind,
        tags: &[String],
        limit: usize,
    ) -> StoreResult<Vec<Song>> {
        let wanted: BTreeSet<&str> = tags.iter().map(String::as_str).collect();
        let conn = self.conn.lock().unwrap();

        if wanted.is_empty() {
            // Every sequence contains the empty set
            return Self::query_songs(
                &conn,
                &format!("SELECT {SONG_COLUMNS} FROM songs s ORDER BY s.track_id LIMIT ?1"),
                params![limit as i64],
            );
        }

        let placeholders = vec!["?"; wanted.len()].join(", ");
        let sql = format!(
            "SELECT {SONG_COLUMNS} FROM songs s
             WHERE s.track_id IN (
                SELECT track_id FROM {table} WHERE {column} IN ({placeholders})
                GROUP BY track_id HAVING COUNT(DISTINCT {column}) = ?
             )
             ORDER BY s.track_id LIMIT ?",
            table = kind.table(),
            column = kind.value_column(),
        );

        let mut values: Vec<Value> = wanted
            .iter()
            .map(|tag| Value::Text(tag.to_string()))
            .collect();
        values.push(Value::Integer(wanted.len() as i64));
        values.push(Value::Integer(limit as i64));

        Self::query_songs(&conn, &sql, params_from_iter(values.iter()))
    }

    fn songs_count(&self) -> usize {
        self.count("songs")
    }

    fn features_count(&self) -> usize {
        self.count("song_features")
    }

    fn clear(&self) -> StoreResult<usize> {
        let conn = self.conn.lock().unwrap();
        let removed = conn.execute("DELETE FROM songs", [])?;
        info!("Cleared song catalog, {} songs removed", removed);
        Ok(removed)
    }
}
