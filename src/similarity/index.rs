use super::scaler::{l2_normalize, StandardScaler};
use crate::song_store::{SongFeatures, FEATURE_COLUMNS};
use anyhow::{bail, Context, Result};
use chrono::{SecondsFormat, Utc};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fs;
use std::path::Path;
use thiserror::Error;
use tracing::info;

const INDEX_FILE_NAME: &str = "index.json";
const METADATA_FILE_NAME: &str = "config.json";

#[derive(Debug, Error, PartialEq)]
pub enum SimilarityError {
    #[error("No feature vectors to index")]
    Empty,

    #[error("Feature vector of '{track_id}' has {actual} values, expected {expected}")]
    DimensionMismatch {
        track_id: String,
        expected: usize,
        actual: usize,
    },

    #[error("Query vector has {actual} values, expected {expected}")]
    QueryDimensionMismatch { expected: usize, actual: usize },

    #[error("Track '{0}' is not in the similarity index")]
    UnknownTrack(String),
}

/// A similar track and its cosine similarity to the query, in `[-1, 1]`.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Neighbor {
    pub track_id: String,
    pub similarity: f64,
}

/// Human-readable description of a built index, written next to it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct IndexMetadata {
    pub created_at: String,
    pub n_songs: usize,
    pub raw_dim: usize,
    pub final_dim: usize,
    pub metric: String,
    pub algorithm: String,
    pub vector_cols_order: Vec<String>,
}

/// Brute-force cosine nearest-neighbour index over song feature vectors.
///
/// Vectors are standardized per column, then L2-normalized, so the dot product
/// of two embeddings is their cosine similarity.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SimilarityIndex {
    track_ids: Vec<String>,
    scaler: StandardScaler,
    embeddings: Vec<Vec<f64>>,
    created_at: String,
}

impl SimilarityIndex {
    pub fn build(features: &[SongFeatures]) -> Result<Self, SimilarityError> {
        let first = features.first().ok_or(SimilarityError::Empty)?;
        let dim = first.features.len();
        if let Some(bad) = features.iter().find(|f| f.features.len() != dim) {
            return Err(SimilarityError::DimensionMismatch {
                track_id: bad.track_id.clone(),
                expected: dim,
                actual: bad.features.len(),
            });
        }

        let rows: Vec<Vec<f64>> = features.iter().map(|f| f.features.clone()).collect();
        let scaler = StandardScaler::fit(&rows);
        let embeddings = rows
            .par_iter()
            .map(|row| l2_normalize(scaler.transform(row)))
            .collect();

        info!("Built similarity index: {} vectors of dimension {}", rows.len(), dim);
        Ok(SimilarityIndex {
            track_ids: features.iter().map(|f| f.track_id.clone()).collect(),
            scaler,
            embeddings,
            created_at: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
        })
    }

    pub fn len(&self) -> usize {
        self.track_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.track_ids.is_empty()
    }

    pub fn dim(&self) -> usize {
        self.scaler.dim()
    }

    pub fn contains(&self, track_id: &str) -> bool {
        self.position(track_id).is_some()
    }

    fn position(&self, track_id: &str) -> Option<usize> {
        self.track_ids.iter().position(|id| id == track_id)
    }

    /// The `k` tracks most similar to an indexed track, excluding itself.
    pub fn nearest(&self, track_id: &str, k: usize) -> Result<Vec<Neighbor>, SimilarityError> {
        let position = self
            .position(track_id)
            .ok_or_else(|| SimilarityError::UnknownTrack(track_id.to_string()))?;
        Ok(self.rank(&self.embeddings[position], Some(position), k))
    }

    /// The `k` indexed tracks most similar to a raw, unscaled feature vector.
    pub fn nearest_to(&self, features: &[f64], k: usize) -> Result<Vec<Neighbor>, SimilarityError> {
        if features.len() != self.dim() {
            return Err(SimilarityError::QueryDimensionMismatch {
                expected: self.dim(),
                actual: features.len(),
            });
        }
        let query = l2_normalize(self.scaler.transform(features));
        Ok(self.rank(&query, None, k))
    }

    fn rank(&self, query: &[f64], exclude: Option<usize>, k: usize) -> Vec<Neighbor> {
        let mut scored: Vec<(usize, f64)> = self
            .embeddings
            .par_iter()
            .enumerate()
            .filter(|(i, _)| Some(*i) != exclude)
            .map(|(i, embedding)| (i, dot(query, embedding)))
            .collect();

        scored.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(Ordering::Equal)
                .then_with(|| self.track_ids[a.0].cmp(&self.track_ids[b.0]))
        });
        scored
            .into_iter()
            .take(k)
            .map(|(i, similarity)| Neighbor {
                track_id: self.track_ids[i].clone(),
                similarity,
            })
            .collect()
    }

    pub fn metadata(&self) -> IndexMetadata {
        let vector_cols_order = if self.dim() == FEATURE_COLUMNS.len() {
            FEATURE_COLUMNS.iter().map(|c| c.to_string()).collect()
        } else {
            Vec::new()
        };
        IndexMetadata {
            created_at: self.created_at.clone(),
            n_songs: self.len(),
            raw_dim: self.dim(),
            final_dim: self.dim(),
            metric: "cosine".to_string(),
            algorithm: "brute".to_string(),
            vector_cols_order,
        }
    }

    /// Write the index and its metadata into `dir`, creating it if needed.
    pub fn save(&self, dir: &Path) -> Result<()> {
        fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create index directory {:?}", dir))?;

        let index_path = dir.join(INDEX_FILE_NAME);
        fs::write(&index_path, serde_json::to_vec(self)?)
            .with_context(|| format!("Failed to write {:?}", index_path))?;

        let metadata_path = dir.join(METADATA_FILE_NAME);
        fs::write(&metadata_path, serde_json::to_vec_pretty(&self.metadata())?)
            .with_context(|| format!("Failed to write {:?}", metadata_path))?;

        info!("Saved similarity index to {:?}", dir);
        Ok(())
    }

    pub fn load(dir: &Path) -> Result<Self> {
        let index_path = dir.join(INDEX_FILE_NAME);
        let content = fs::read(&index_path)
            .with_context(|| format!("Failed to read similarity index {:?}", index_path))?;
        let index: SimilarityIndex = serde_json::from_slice(&content)
            .with_context(|| format!("Failed to parse similarity index {:?}", index_path))?;
        index
            .check_consistency()
            .with_context(|| format!("Malformed similarity index {:?}", index_path))?;
        Ok(index)
    }

    fn check_consistency(&self) -> Result<()> {
        if self.scaler.mean.len() != self.scaler.scale.len() {
            bail!(
                "scaler has {} means but {} scales",
                self.scaler.mean.len(),
                self.scaler.scale.len()
            );
        }
        if self.track_ids.len() != self.embeddings.len() {
            bail!(
                "{} track ids but {} embeddings",
                self.track_ids.len(),
                self.embeddings.len()
            );
        }
        if let Some((i, embedding)) = self
            .embeddings
            .iter()
            .enumerate()
            .find(|(_, e)| e.len() != self.dim())
        {
            bail!(
                "embedding of '{}' has {} values, expected {}",
                self.track_ids[i],
                embedding.len(),
                self.dim()
            );
        }
        Ok(())
    }
}

fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}
