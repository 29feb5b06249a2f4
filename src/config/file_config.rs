use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct FileConfig {
    // Core settings (can override CLI)
    pub db_path: Option<String>,
    pub index_dir: Option<String>,
    pub limit: Option<usize>,

    // Feature configs
    pub similarity: Option<SimilarityConfig>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct SimilarityConfig {
    /// Neighbours returned by `similar` when `-k` is not given.
    pub k: Option<usize>,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        toml::from_str(&content).with_context(|| format!("Failed to parse config file: {:?}", path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_file() {
        let config: FileConfig = toml::from_str(
            r#"
            db_path = "/data/songs.db"
            index_dir = "/data/models"
            limit = 50

            [similarity]
            k = 25
            "#,
        )
        .unwrap();

        assert_eq!(config.db_path.as_deref(), Some("/data/songs.db"));
        assert_eq!(config.index_dir.as_deref(), Some("/data/models"));
        assert_eq!(config.limit, Some(50));
        assert_eq!(config.similarity.unwrap().k, Some(25));
    }

    #[test]
    fn test_parse_empty_file() {
        let config: FileConfig = toml::from_str("").unwrap();
        assert!(config.db_path.is_none());
        assert!(config.similarity.is_none());
    }
}
