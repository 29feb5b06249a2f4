//! Song catalog models.
//!
//! `Song` and `SongFeatures` mirror the logical `songs` / `song_features`
//! entities. The tag sequences live in child tables but are exposed here as
//! plain ordered vectors.

use serde::{Deserialize, Serialize};

/// Order of the values in a feature vector as produced by the dataset loader.
pub const FEATURE_COLUMNS: [&str; 8] = [
    "duration",
    "tempo",
    "loudness",
    "key",
    "mode",
    "time_signature",
    "danceability",
    "energy",
];

/// Canonical metadata record for a track.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Song {
    pub track_id: String,
    pub title: String,
    pub artist: String,
    pub year: Option<i32>,
    pub release: Option<String>,
    pub genre: Option<String>,
    /// Top Echo Nest descriptive terms for the artist, most relevant first.
    #[serde(default)]
    pub artist_terms_top: Vec<String>,
    /// Top MusicBrainz community tags for the artist, most used first.
    #[serde(default)]
    pub artist_mbtags_top: Vec<String>,
}

impl Song {
    /// A song with only the required fields set.
    pub fn new(
        track_id: impl Into<String>,
        title: impl Into<String>,
        artist: impl Into<String>,
    ) -> Self {
        Song {
            track_id: track_id.into(),
            title: title.into(),
            artist: artist.into(),
            year: None,
            release: None,
            genre: None,
            artist_terms_top: Vec::new(),
            artist_mbtags_top: Vec::new(),
        }
    }

    /// `year` as stored: the dataset writes 0 for an unknown year, so
    /// non-positive values become `None`.
    pub fn known_year(&self) -> Option<i32> {
        self.year.filter(|year| *year > 0)
    }

    pub fn tags(&self, kind: TagKind) -> &[String] {
        match kind {
            TagKind::ArtistTerm => &self.artist_terms_top,
            TagKind::MusicBrainzTag => &self.artist_mbtags_top,
        }
    }
}

/// Numeric feature vector for a track.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SongFeatures {
    pub track_id: String,
    pub features: Vec<f64>,
}

impl SongFeatures {
    pub fn new(track_id: impl Into<String>, features: Vec<f64>) -> Self {
        SongFeatures {
            track_id: track_id.into(),
            features,
        }
    }

    /// Pairs each value with its column name when the vector has the
    /// standard layout, `None` otherwise.
    pub fn labeled(&self) -> Option<Vec<(&'static str, f64)>> {
        if self.features.len() != FEATURE_COLUMNS.len() {
            return None;
        }
        Some(
            FEATURE_COLUMNS
                .iter()
                .copied()
                .zip(self.features.iter().copied())
                .collect(),
        )
    }

    /// Serialize to the `song_features.features` blob: little-endian f64s.
    pub fn to_blob(&self) -> Vec<u8> {
        self.features
            .iter()
            .flat_map(|value| value.to_le_bytes())
            .collect()
    }

    /// Parse a `song_features.features` blob. Returns `None` if the blob length
    /// is not a whole number of f64 values.
    pub fn from_blob(track_id: impl Into<String>, blob: &[u8]) -> Option<Self> {
        if blob.len() % 8 != 0 {
            return None;
        }
        let features = blob
            .chunks_exact(8)
            .map(|chunk| {
                let mut bytes = [0u8; 8];
                bytes.copy_from_slice(chunk);
                f64::from_le_bytes(bytes)
            })
            .collect();
        Some(SongFeatures::new(track_id, features))
    }
}

/// Which of the two per-artist tag sequences a query targets.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TagKind {
    ArtistTerm,
    MusicBrainzTag,
}

impl TagKind {
    pub(crate) fn table(&self) -> &'static str {
        match self {
            TagKind::ArtistTerm => "song_artist_terms",
            TagKind::MusicBrainzTag => "song_artist_mbtags",
        }
    }

    pub(crate) fn value_column(&self) -> &'static str {
        match self {
            TagKind::ArtistTerm => "term",
            TagKind::MusicBrainzTag => "tag",
        }
    }
}

/// How a case-insensitive title/artist lookup compares against the query.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TitleMatch {
    #[default]
    Exact,
    Prefix,
}
