use super::validation::ValidationError;
use rusqlite::ffi;
use thiserror::Error;

/// Errors returned by song store operations.
///
/// Integrity violations reported by SQLite are mapped onto dedicated variants
/// so callers can tell them apart without inspecting error strings.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Song with track_id '{0}' already exists")]
    DuplicateTrackId(String),

    #[error("Column '{0}' must not be null")]
    NotNull(String),

    #[error("Song with track_id '{0}' does not exist")]
    MissingSong(String),

    #[error("Invalid input: {0}")]
    Invalid(#[from] ValidationError),

    #[error("Corrupt feature vector for '{0}'")]
    CorruptFeatures(String),

    #[error("Database error: {0}")]
    Sqlite(rusqlite::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

impl StoreError {
    /// Classify a SQLite error raised while writing the row keyed by `track_id`.
    pub(crate) fn from_sqlite(err: rusqlite::Error, track_id: &str) -> Self {
        if let rusqlite::Error::SqliteFailure(ref failure, ref message) = err {
            match failure.extended_code {
                ffi::SQLITE_CONSTRAINT_PRIMARYKEY | ffi::SQLITE_CONSTRAINT_UNIQUE => {
                    return StoreError::DuplicateTrackId(track_id.to_string());
                }
                ffi::SQLITE_CONSTRAINT_NOTNULL => {
                    return StoreError::NotNull(not_null_column(message.as_deref()));
                }
                ffi::SQLITE_CONSTRAINT_FOREIGNKEY => {
                    return StoreError::MissingSong(track_id.to_string());
                }
                _ => {}
            }
        }
        StoreError::Sqlite(err)
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        StoreError::Sqlite(err)
    }
}

// "NOT NULL constraint failed: songs.title" -> "title"
fn not_null_column(message: Option<&str>) -> String {
    message
        .and_then(|m| m.rsplit(": ").next())
        .map(|qualified| qualified.rsplit('.').next().unwrap_or(qualified))
        .unwrap_or("unknown")
        .to_string()
}
