//! Validation for song catalog entities.
//!
//! Catches input the schema would accept but the dataset never contains,
//! before anything reaches the database.

use super::models::{Song, SongFeatures, TagKind};
use std::fmt;

#[derive(Debug, PartialEq)]
pub enum ValidationError {
    EmptyField { field: &'static str },
    EmptyTag { kind: TagKind, position: usize },
    EmptyFeatures,
    NonFiniteFeature { position: usize, value: f64 },
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::EmptyField { field } => {
                write!(f, "Field '{}' is required but was empty", field)
            }
            ValidationError::EmptyTag { kind, position } => {
                write!(f, "{:?} at position {} is empty", kind, position)
            }
            ValidationError::EmptyFeatures => write!(f, "Feature vector is empty"),
            ValidationError::NonFiniteFeature { position, value } => {
                write!(
                    f,
                    "Feature vector value at position {} is not finite: {}",
                    position, value
                )
            }
        }
    }
}

impl std::error::Error for ValidationError {}

pub type ValidationResult<T> = Result<T, ValidationError>;

fn require(field: &'static str, value: &str) -> ValidationResult<()> {
    if value.trim().is_empty() {
        return Err(ValidationError::EmptyField { field });
    }
    Ok(())
}

pub fn validate_song(song: &Song) -> ValidationResult<()> {
    require("track_id", &song.track_id)?;
    require("title", &song.title)?;
    require("artist", &song.artist)?;

    for kind in [TagKind::ArtistTerm, TagKind::MusicBrainzTag] {
        if let Some(position) = song.tags(kind).iter().position(|t| t.trim().is_empty()) {
            return Err(ValidationError::EmptyTag { kind, position });
        }
    }
    Ok(())
}

pub fn validate_features(features: &SongFeatures) -> ValidationResult<()> {
    require("track_id", &features.track_id)?;
    if features.features.is_empty() {
        return Err(ValidationError::EmptyFeatures);
    }
    if let Some((position, value)) = features
        .features
        .iter()
        .copied()
        .enumerate()
        .find(|(_, v)| !v.is_finite())
    {
        return Err(ValidationError::NonFiniteFeature { position, value });
    }
    Ok(())
}
