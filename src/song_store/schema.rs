//! SQLite schema definitions for the song catalog database.
//!
//! `songs` holds one metadata row per track. The two per-artist tag sequences
//! are normalized into position-ordered child tables with an index on the tag
//! value, which serves "does this song carry tag X" lookups. `song_features`
//! stores the feature vector as a little-endian f64 blob. Every dependent table
//! cascades on song deletion.

use crate::sqlite_column;
use crate::sqlite_persistence::{
    Column, ForeignKey, ForeignKeyOnChange, Index, SqlType, Table, VersionedSchema,
};
use rusqlite::functions::FunctionFlags;
use rusqlite::Connection;

/// Unicode-aware replacement for SQLite's ASCII-only `lower()`.
pub const CASE_FOLD_FUNCTION: &str = "unicode_lower";

/// Register the SQL functions the schema's expression indexes depend on.
///
/// Must run on every connection before it reads or writes `songs`.
pub fn register_functions(conn: &Connection) -> rusqlite::Result<()> {
    conn.create_scalar_function(
        CASE_FOLD_FUNCTION,
        1,
        FunctionFlags::SQLITE_UTF8
            | FunctionFlags::SQLITE_DETERMINISTIC
            | FunctionFlags::SQLITE_INNOCUOUS,
        |ctx| {
            let value: Option<String> = ctx.get(0)?;
            Ok(value.map(|v| v.to_lowercase()))
        },
    )
}

const SONG_FK: ForeignKey = ForeignKey {
    foreign_table: "songs",
    foreign_column: "track_id",
    on_delete: ForeignKeyOnChange::Cascade,
};

// =============================================================================
// Core Tables
// =============================================================================

const SONGS_TABLE: Table = Table {
    name: "songs",
    columns: &[
        // NOT NULL is explicit, SQLite allows NULL in non-integer primary keys
        sqlite_column!(
            "track_id",
            &SqlType::Text,
            is_primary_key = true,
            non_null = true
        ),
        sqlite_column!("title", &SqlType::Text, non_null = true),
        sqlite_column!("artist", &SqlType::Text, non_null = true),
        sqlite_column!("year", &SqlType::Integer),
        sqlite_column!("release", &SqlType::Text),
        sqlite_column!("genre", &SqlType::Text),
    ],
    indices: &[
        Index {
            name: "idx_songs_title_lower",
            on: "unicode_lower(title)",
        },
        Index {
            name: "idx_songs_artist_lower",
            on: "unicode_lower(artist)",
        },
    ],
    unique_constraints: &[],
};

const SONG_FEATURES_TABLE: Table = Table {
    name: "song_features",
    columns: &[
        sqlite_column!(
            "track_id",
            &SqlType::Text,
            is_primary_key = true,
            non_null = true,
            foreign_key = Some(&SONG_FK)
        ),
        sqlite_column!("features", &SqlType::Blob, non_null = true),
    ],
    indices: &[],
    unique_constraints: &[],
};

// =============================================================================
// Tag Tables
// =============================================================================

/// Elements of `artist_terms_top`, one row per term.
const SONG_ARTIST_TERMS_TABLE: Table = Table {
    name: "song_artist_terms",
    columns: &[
        sqlite_column!(
            "track_id",
            &SqlType::Text,
            non_null = true,
            foreign_key = Some(&SONG_FK)
        ),
        sqlite_column!("position", &SqlType::Integer, non_null = true),
        sqlite_column!("term", &SqlType::Text, non_null = true),
    ],
    indices: &[Index {
        name: "idx_songs_terms_gin",
        on: "term",
    }],
    unique_constraints: &[&["track_id", "position"]],
};

/// Elements of `artist_mbtags_top`, one row per tag.
const SONG_ARTIST_MBTAGS_TABLE: Table = Table {
    name: "song_artist_mbtags",
    columns: &[
        sqlite_column!(
            "track_id",
            &SqlType::Text,
            non_null = true,
            foreign_key = Some(&SONG_FK)
        ),
        sqlite_column!("position", &SqlType::Integer, non_null = true),
        sqlite_column!("tag", &SqlType::Text, non_null = true),
    ],
    indices: &[Index {
        name: "idx_songs_mbtags_gin",
        on: "tag",
    }],
    unique_constraints: &[&["track_id", "position"]],
};

// =============================================================================
// Versioned Schema Definition
// =============================================================================

pub const SONG_CATALOG_VERSIONED_SCHEMAS: &[VersionedSchema] = &[VersionedSchema {
    version: 0,
    tables: &[
        SONGS_TABLE,
        SONG_FEATURES_TABLE,
        SONG_ARTIST_TERMS_TABLE,
        SONG_ARTIST_MBTAGS_TABLE,
    ],
}];

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::{params, ErrorCode};

    fn create_db() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        register_functions(&conn).unwrap();
        let schema = &SONG_CATALOG_VERSIONED_SCHEMAS[0];
        schema.create(&conn).unwrap();
        conn
    }

    fn insert_song(conn: &Connection, track_id: &str, title: &str, artist: &str) {
        conn.execute(
            "INSERT INTO songs (track_id, title, artist) VALUES (?1, ?2, ?3)",
            params![track_id, title, artist],
        )
        .unwrap();
    }

    fn constraint_code(err: rusqlite::Error) -> (ErrorCode, i32) {
        match err {
            rusqlite::Error::SqliteFailure(e, _) => (e.code, e.extended_code),
            other => panic!("expected sqlite failure, got {:?}", other),
        }
    }

    #[test]
    fn test_schema_creates_successfully() {
        let conn = create_db();
        SONG_CATALOG_VERSIONED_SCHEMAS[0].validate(&conn).unwrap();
    }

    #[test]
    fn test_named_indexes_exist_on_expected_tables() {
        let conn = create_db();
        for (index, table) in [
            ("idx_songs_title_lower", "songs"),
            ("idx_songs_artist_lower", "songs"),
            ("idx_songs_terms_gin", "song_artist_terms"),
            ("idx_songs_mbtags_gin", "song_artist_mbtags"),
        ] {
            let tbl_name: String = conn
                .query_row(
                    "SELECT tbl_name FROM sqlite_master WHERE type = 'index' AND name = ?1",
                    params![index],
                    |r| r.get(0),
                )
                .unwrap();
            assert_eq!(tbl_name, table, "index {}", index);
        }
    }

    #[test]
    fn test_duplicate_track_id_is_primary_key_violation() {
        let conn = create_db();
        insert_song(&conn, "T1", "Song", "Artist");
        let err = conn
            .execute(
                "INSERT INTO songs (track_id, title, artist) VALUES ('T1', 'Other', 'Other')",
                [],
            )
            .unwrap_err();
        assert_eq!(
            constraint_code(err),
            (
                ErrorCode::ConstraintViolation,
                rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY
            )
        );
    }

    #[test]
    fn test_null_columns_are_not_null_violations() {
        let conn = create_db();
        for sql in [
            "INSERT INTO songs (track_id, title, artist) VALUES (NULL, 'Song', 'Artist')",
            "INSERT INTO songs (track_id, title, artist) VALUES ('T1', NULL, 'Artist')",
            "INSERT INTO songs (track_id, title, artist) VALUES ('T1', 'Song', NULL)",
        ] {
            let err = conn.execute(sql, []).unwrap_err();
            assert_eq!(
                constraint_code(err),
                (
                    ErrorCode::ConstraintViolation,
                    rusqlite::ffi::SQLITE_CONSTRAINT_NOTNULL
                ),
                "{}",
                sql
            );
        }
    }

    #[test]
    fn test_features_without_song_is_foreign_key_violation() {
        let conn = create_db();
        let err = conn
            .execute(
                "INSERT INTO song_features (track_id, features) VALUES ('missing', x'00')",
                [],
            )
            .unwrap_err();
        assert_eq!(
            constraint_code(err),
            (
                ErrorCode::ConstraintViolation,
                rusqlite::ffi::SQLITE_CONSTRAINT_FOREIGNKEY
            )
        );
    }

    #[test]
    fn test_null_features_rejected() {
        let conn = create_db();
        insert_song(&conn, "T1", "Song", "Artist");
        let err = conn
            .execute(
                "INSERT INTO song_features (track_id, features) VALUES ('T1', NULL)",
                [],
            )
            .unwrap_err();
        assert_eq!(
            constraint_code(err).1,
            rusqlite::ffi::SQLITE_CONSTRAINT_NOTNULL
        );
    }

    #[test]
    fn test_song_delete_cascades() {
        let conn = create_db();
        insert_song(&conn, "T1", "Song", "Artist");
        conn.execute(
            "INSERT INTO song_features (track_id, features) VALUES ('T1', x'0000000000000000')",
            [],
        )
        .unwrap();
        conn.execute(
            "INSERT INTO song_artist_terms (track_id, position, term) VALUES ('T1', 0, 'rock')",
            [],
        )
        .unwrap();
        conn.execute(
            "INSERT INTO song_artist_mbtags (track_id, position, tag) VALUES ('T1', 0, 'british')",
            [],
        )
        .unwrap();

        conn.execute("DELETE FROM songs WHERE track_id = 'T1'", [])
            .unwrap();

        for table in ["song_features", "song_artist_terms", "song_artist_mbtags"] {
            let count: i64 = conn
                .query_row(
                    &format!("SELECT COUNT(*) FROM {} WHERE track_id = 'T1'", table),
                    [],
                    |r| r.get(0),
                )
                .unwrap();
            assert_eq!(count, 0, "{} still has rows", table);
        }
    }

    #[test]
    fn test_folded_title_lookup_ignores_stored_casing() {
        let conn = create_db();
        insert_song(&conn, "T1", "ABC", "Artist");
        insert_song(&conn, "T2", "Abc", "Artist");
        insert_song(&conn, "T3", "abc", "Artist");
        insert_song(&conn, "T4", "abcd", "Artist");
        insert_song(&conn, "T5", "JÓGA", "Björk");
        insert_song(&conn, "T6", "Jóga", "BJÖRK");

        let query = |title: &str| -> Vec<String> {
            let mut stmt = conn
                .prepare(
                    "SELECT track_id FROM songs WHERE unicode_lower(title) = unicode_lower(?1) \
                     ORDER BY track_id",
                )
                .unwrap();
            let ids: Vec<String> = stmt
                .query_map(params![title], |r| r.get(0))
                .unwrap()
                .collect::<Result<_, _>>()
                .unwrap();
            ids
        };

        assert_eq!(query("abc"), vec!["T1", "T2", "T3"]);
        assert_eq!(query("jóga"), vec!["T5", "T6"]);
    }

    #[test]
    fn test_builtin_lower_does_not_fold_non_ascii() {
        let conn = create_db();
        let (builtin, folded): (String, String) = conn
            .query_row("SELECT lower('BJÖRK'), unicode_lower('BJÖRK')", [], |r| {
                Ok((r.get(0)?, r.get(1)?))
            })
            .unwrap();
        assert_eq!(builtin, "bjÖrk");
        assert_eq!(folded, "björk");
    }

    #[test]
    fn test_folded_lookups_use_expression_indexes() {
        let conn = create_db();
        for (column, index) in [
            ("title", "idx_songs_title_lower"),
            ("artist", "idx_songs_artist_lower"),
        ] {
            let mut stmt = conn
                .prepare(&format!(
                    "EXPLAIN QUERY PLAN SELECT track_id FROM songs \
                     WHERE unicode_lower({column}) = unicode_lower(?1)"
                ))
                .unwrap();
            let plan: Vec<String> = stmt
                .query_map(params!["abc"], |r| r.get(3))
                .unwrap()
                .collect::<Result<_, _>>()
                .unwrap();
            assert!(
                plan.iter().any(|step| step.contains(index)),
                "{:?}",
                plan
            );
        }
    }

    #[test]
    fn test_tag_uniqueness_per_position() {
        let conn = create_db();
        insert_song(&conn, "T1", "Song", "Artist");
        conn.execute(
            "INSERT INTO song_artist_terms (track_id, position, term) VALUES ('T1', 0, 'rock')",
            [],
        )
        .unwrap();
        let err = conn
            .execute(
                "INSERT INTO song_artist_terms (track_id, position, term) VALUES ('T1', 0, 'pop')",
                [],
            )
            .unwrap_err();
        assert_eq!(
            constraint_code(err).1,
            rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
        );
    }
}
