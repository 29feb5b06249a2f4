use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use serde_json::json;
use std::path::PathBuf;
use tracing::{info, level_filters::LevelFilter};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use song_catalog::config::{AppConfig, CliConfig, FileConfig, DEFAULT_LIMIT, DEFAULT_SIMILAR_K};
use song_catalog::similarity::SimilarityIndex;
use song_catalog::song_store::{Song, SongStore, SqliteSongStore, TagKind, TitleMatch};

fn parse_path(s: &str) -> Result<PathBuf> {
    let path_buf = PathBuf::from(s);
    let original_path = match path_buf.canonicalize() {
        Ok(path) => path,
        Err(msg) => {
            if msg.kind() == std::io::ErrorKind::NotFound {
                path_buf
            } else {
                return Err(msg).with_context(|| format!("Error resolving path: {}", s));
            }
        }
    };
    if original_path.is_absolute() {
        return Ok(original_path);
    }
    let cwd = std::env::current_dir()?;
    Ok(cwd.join(original_path))
}

fn positive_count(s: &str) -> Result<usize> {
    let value: usize = s.parse().with_context(|| format!("Not a number: {}", s))?;
    if value == 0 {
        bail!("must be greater than zero");
    }
    Ok(value)
}

#[derive(Parser, Debug)]
#[command(version, about = "Query and maintain a song metadata catalog")]
struct CliArgs {
    /// Path to the SQLite song database file.
    #[clap(long, env = "SONG_CATALOG_DB", value_parser = parse_path, global = true)]
    pub db: Option<PathBuf>,

    /// Path to a TOML config file, its values override command line options.
    #[clap(long, value_parser = parse_path, global = true)]
    pub config: Option<PathBuf>,

    /// Directory holding the similarity index files.
    #[clap(long, value_parser = parse_path, global = true)]
    pub index_dir: Option<PathBuf>,

    /// Maximum number of songs printed by lookups.
    #[clap(long, default_value_t = DEFAULT_LIMIT, value_parser = positive_count, global = true)]
    pub limit: usize,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Creates the database schema, or checks an existing database against it.
    Init,

    /// Shows the number of songs and feature vectors.
    Stats,

    /// Shows a song and its feature vector.
    Show { track_id: String },

    /// Finds songs by title, ignoring case.
    FindTitle {
        query: String,
        /// Match titles starting with the query instead of equal to it.
        #[clap(long)]
        prefix: bool,
    },

    /// Finds songs by artist name, ignoring case.
    FindArtist {
        query: String,
        /// Match artists starting with the query instead of equal to it.
        #[clap(long)]
        prefix: bool,
    },

    /// Finds songs whose artist carries every given tag.
    FindTag {
        #[clap(required = true)]
        tags: Vec<String>,
        /// Search MusicBrainz tags instead of Echo Nest artist terms.
        #[clap(long)]
        mbtag: bool,
    },

    /// Deletes a song together with its feature vector.
    Delete { track_id: String },

    /// Builds the similarity index from all stored feature vectors.
    BuildIndex,

    /// Lists the songs most similar to the given one.
    Similar {
        track_id: String,
        /// Number of songs to list.
        #[clap(short, value_parser = positive_count)]
        k: Option<usize>,
    },
}

fn print_songs(songs: &[Song]) {
    if songs.is_empty() {
        println!("No songs found.");
        return;
    }
    for song in songs {
        let year = song.year.map(|y| format!(" ({})", y)).unwrap_or_default();
        println!(
            "{}  {} - {}{}",
            song.track_id, song.artist, song.title, year
        );
    }
}

fn main() -> Result<()> {
    let cli_args = CliArgs::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .with_env_var("LOG_LEVEL")
                .from_env_lossy(),
        )
        .try_init()?;

    let file_config = cli_args
        .config
        .as_deref()
        .map(FileConfig::load)
        .transpose()?;
    let cli_config = CliConfig {
        db_path: cli_args.db.clone(),
        index_dir: cli_args.index_dir.clone(),
        limit: cli_args.limit,
        similar_k: DEFAULT_SIMILAR_K,
    };
    let config = AppConfig::resolve(&cli_config, file_config)?;

    info!("Opening song database at {:?}...", config.db_path);
    let store = SqliteSongStore::new(&config.db_path)?;

    match cli_args.command {
        Command::Init => {
            println!("Database ready at {}", config.db_path.display());
        }
        Command::Stats => {
            println!("songs:           {}", store.songs_count());
            println!("feature vectors: {}", store.features_count());
        }
        Command::Show { track_id } => {
            let Some(song) = store.get_song(&track_id)? else {
                bail!("No song with track_id '{}'", track_id);
            };
            let features = store.get_features(&track_id)?;
            let features_json = match &features {
                Some(f) => match f.labeled() {
                    Some(labeled) => json!(labeled
                        .into_iter()
                        .map(|(name, value)| (name.to_string(), json!(value)))
                        .collect::<serde_json::Map<_, _>>()),
                    None => json!(f.features),
                },
                None => serde_json::Value::Null,
            };
            let output = json!({ "song": song, "features": features_json });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        Command::FindTitle { query, prefix } => {
            let mode = if prefix { TitleMatch::Prefix } else { TitleMatch::Exact };
            print_songs(&store.find_by_title(&query, mode, config.limit)?);
        }
        Command::FindArtist { query, prefix } => {
            let mode = if prefix { TitleMatch::Prefix } else { TitleMatch::Exact };
            print_songs(&store.find_by_artist(&query, mode, config.limit)?);
        }
        Command::FindTag { tags, mbtag } => {
            let kind = if mbtag {
                TagKind::MusicBrainzTag
            } else {
                TagKind::ArtistTerm
            };
            print_songs(&store.find_containing_all(kind, &tags, config.limit)?);
        }
        Command::Delete { track_id } => {
            if store.delete_song(&track_id)? {
                println!("Deleted {}", track_id);
            } else {
                bail!("No song with track_id '{}'", track_id);
            }
        }
        Command::BuildIndex => {
            let features = store.list_features()?;
            info!("Loaded {} feature vectors", features.len());
            let index = SimilarityIndex::build(&features)?;
            index.save(&config.index_dir)?;
            println!(
                "Indexed {} songs into {}",
                index.len(),
                config.index_dir.display()
            );
        }
        Command::Similar { track_id, k } => {
            let index = SimilarityIndex::load(&config.index_dir)?;
            let k = k.unwrap_or(config.similar_k);
            let neighbors = index.nearest(&track_id, k)?;
            for neighbor in neighbors {
                let label = store
                    .get_song(&neighbor.track_id)?
                    .map(|s| format!("{} - {}", s.artist, s.title))
                    .unwrap_or_else(|| "<deleted>".to_string());
                println!(
                    "{:.4}  {}  {}",
                    neighbor.similarity, neighbor.track_id, label
                );
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_counts_rejected() {
        for args in [
            vec!["song-catalog", "similar", "T1", "-k", "0"],
            vec!["song-catalog", "--limit", "0", "stats"],
            vec!["song-catalog", "find-title", "abc", "--limit", "0"],
        ] {
            assert!(CliArgs::try_parse_from(args.clone()).is_err(), "{:?}", args);
        }
    }

    #[test]
    fn test_positive_counts_accepted() {
        let args = CliArgs::try_parse_from([
            "song-catalog", "--limit", "5", "similar", "T1", "-k", "3",
        ])
        .unwrap();
        assert_eq!(args.limit, 5);
        assert!(matches!(args.command, Command::Similar { k: Some(3), .. }));

        let args = CliArgs::try_parse_from(["song-catalog", "stats"]).unwrap();
        assert_eq!(args.limit, DEFAULT_LIMIT);
    }

    #[test]
    fn test_positive_count_parser() {
        assert_eq!(positive_count("7").unwrap(), 7);
        assert!(positive_count("0").is_err());
        assert!(positive_count("-1").is_err());
        assert!(positive_count("ten").is_err());
    }
}
