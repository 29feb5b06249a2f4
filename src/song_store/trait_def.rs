//! SongStore trait definition.

use super::error::StoreResult;
use super::models::{Song, SongFeatures, TagKind, TitleMatch};

/// Storage backend for songs and their feature vectors.
pub trait SongStore: Send + Sync {
    // =========================================================================
    // Songs
    // =========================================================================

    /// Insert a new song. Fails with `DuplicateTrackId` if it already exists.
    fn insert_song(&self, song: &Song) -> StoreResult<()>;

    /// Insert a song or replace every column and tag of an existing one.
    /// The song's feature vector, if any, is left untouched.
    fn upsert_song(&self, song: &Song) -> StoreResult<()>;

    fn get_song(&self, track_id: &str) -> StoreResult<Option<Song>>;

    /// Delete a song together with its features and tags.
    /// Returns false if no such song existed.
    fn delete_song(&self, track_id: &str) -> StoreResult<bool>;

    // =========================================================================
    // Features
    // =========================================================================

    /// Insert the feature vector of an existing song.
    fn insert_features(&self, features: &SongFeatures) -> StoreResult<()>;

    /// Insert or replace the feature vector of an existing song.
    fn upsert_features(&self, features: &SongFeatures) -> StoreResult<()>;

    fn get_features(&self, track_id: &str) -> StoreResult<Option<SongFeatures>>;

    /// All stored feature vectors, ordered by track id.
    fn list_features(&self) -> StoreResult<Vec<SongFeatures>>;

    // =========================================================================
    // Lookups
    // =========================================================================

    /// Case-insensitive lookup on the song title.
    fn find_by_title(&self, query: &str, mode: TitleMatch, limit: usize)
        -> StoreResult<Vec<Song>>;

    /// Case-insensitive lookup on the artist name.
    fn find_by_artist(
        &self,
        query: &str,
        mode: TitleMatch,
        limit: usize,
    ) -> StoreResult<Vec<Song>>;

    /// Songs whose `kind` sequence contains `tag`, at any position.
    fn find_by_tag(&self, kind: TagKind, tag: &str, limit: usize) -> StoreResult<Vec<Song>>;

    /// Songs whose `kind` sequence contains every one of `tags`.
    fn find_containing_all(
        &self,
        kind: TagKind,
        tags: &[String],
        limit: usize,
    ) -> StoreResult<Vec<Song>>;

    // =========================================================================
    // Maintenance
    // =========================================================================

    fn songs_count(&self) -> usize;

    fn features_count(&self) -> usize;

    /// Delete every song and everything depending on it.
    /// Returns the number of songs removed.
    fn clear(&self) -> StoreResult<usize>;
}
