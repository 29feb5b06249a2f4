//! Song Catalog Library
//!
//! Schema, storage and lookup for a music-metadata dataset: one `songs` row per
//! track, an optional numeric feature vector per song, case-insensitive
//! title/artist lookup and tag containment search.

pub mod config;
pub mod similarity;
pub mod song_store;
pub mod sqlite_persistence;
pub mod tags;

// Re-export commonly used types for convenience
pub use similarity::SimilarityIndex;
pub use song_store::{Song, SongFeatures, SongStore, SqliteSongStore, StoreError};
