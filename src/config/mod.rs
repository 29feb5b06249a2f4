mod file_config;

pub use file_config::{FileConfig, SimilarityConfig};

use anyhow::{bail, Result};
use std::path::{Path, PathBuf};

pub const DEFAULT_LIMIT: usize = 20;
pub const DEFAULT_SIMILAR_K: usize = 10;

/// CLI arguments that can be used for config resolution.
/// Mirrors the command-line options that the TOML config can override.
#[derive(Debug, Clone)]
pub struct CliConfig {
    pub db_path: Option<PathBuf>,
    pub index_dir: Option<PathBuf>,
    pub limit: usize,
    pub similar_k: usize,
}

impl Default for CliConfig {
    fn default() -> Self {
        CliConfig {
            db_path: None,
            index_dir: None,
            limit: DEFAULT_LIMIT,
            similar_k: DEFAULT_SIMILAR_K,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub db_path: PathBuf,
    pub index_dir: PathBuf,
    pub limit: usize,
    pub similar_k: usize,
}

impl AppConfig {
    /// Resolve configuration from CLI arguments and optional TOML file config.
    /// TOML values override CLI values where present.
    pub fn resolve(cli: &CliConfig, file_config: Option<FileConfig>) -> Result<Self> {
        let file = file_config.unwrap_or_default();

        let db_path = file
            .db_path
            .map(PathBuf::from)
            .or_else(|| cli.db_path.clone())
            .ok_or_else(|| {
                anyhow::anyhow!(
                    "db_path must be specified via --db, SONG_CATALOG_DB or in config file"
                )
            })?;

        // The file itself may not exist yet, its directory must
        let db_dir = db_path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        if !db_dir.is_dir() {
            bail!("Database directory does not exist: {:?}", db_dir);
        }
        if db_path.is_dir() {
            bail!("db_path is a directory: {:?}", db_path);
        }

        let index_dir = file
            .index_dir
            .map(PathBuf::from)
            .or_else(|| cli.index_dir.clone())
            .unwrap_or_else(|| db_dir.join("models"));

        let limit = file.limit.unwrap_or(cli.limit);
        if limit == 0 {
            bail!("limit must be greater than zero");
        }

        let similar_k = file
            .similarity
            .unwrap_or_default()
            .k
            .unwrap_or(cli.similar_k);
        if similar_k == 0 {
            bail!("similarity k must be greater than zero");
        }

        Ok(Self {
            db_path,
            index_dir,
            limit,
            similar_k,
        })
    }
}
