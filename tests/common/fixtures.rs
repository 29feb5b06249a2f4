//! Test fixture creation for the song database

#![allow(dead_code)]

use super::constants::*;
use song_catalog::{Song, SongFeatures, SongStore, SqliteSongStore};
use tempfile::TempDir;

/// Build a song with the given tags.
pub fn song(track_id: &str, title: &str, artist: &str, terms: &[&str], mbtags: &[&str]) -> Song {
    let mut song = Song::new(track_id, title, artist);
    song.artist_terms_top = terms.iter().map(|t| t.to_string()).collect();
    song.artist_mbtags_top = mbtags.iter().map(|t| t.to_string()).collect();
    song
}

/// Creates an empty on-disk store.
/// The returned TempDir must outlive the store.
pub fn empty_store() -> (TempDir, SqliteSongStore) {
    let dir = TempDir::new().unwrap();
    let store = SqliteSongStore::new(dir.path().join("songs.db")).unwrap();
    (dir, store)
}

/// Creates an on-disk store with 4 songs, 3 of which have feature vectors.
pub fn seeded_store() -> (TempDir, SqliteSongStore) {
    let (dir, store) = empty_store();

    let mut paranoid = song(
        TRACK_1_ID,
        "Paranoid",
        "Black Sabbath",
        &["heavy metal", "hard rock", "doom metal"],
        &["british", "metal"],
    );
    paranoid.year = Some(1970);
    paranoid.release = Some("Paranoid".to_string());
    paranoid.genre = Some("heavy metal".to_string());

    let mut android = song(
        TRACK_2_ID,
        "PARANOID ANDROID",
        "Radiohead",
        &["alternative rock", "art rock", "hard rock"],
        &["british", "rock"],
    );
    android.year = Some(1997);

    let casual = song(
        TRACK_3_ID,
        "paranoid",
        "Casual",
        &["hip hop", "underground rap"],
        &[],
    );

    let karma = song(
        TRACK_4_ID,
        "Karma Police",
        "Radiohead",
        &["art rock", "alternative rock"],
        &["rock"],
    );

    for s in [&paranoid, &android, &casual, &karma] {
        store.insert_song(s).unwrap();
    }

    store
        .insert_features(&SongFeatures::new(
            TRACK_1_ID,
            vec![170.0, 163.0, -4.5, 4.0, 0.0, 4.0, 0.0, 0.0],
        ))
        .unwrap();
    store
        .insert_features(&SongFeatures::new(
            TRACK_2_ID,
            vec![387.0, 82.0, -9.1, 7.0, 0.0, 4.0, 0.0, 0.0],
        ))
        .unwrap();
    store
        .insert_features(&SongFeatures::new(
            TRACK_3_ID,
            vec![218.9, 92.2, -11.2, 1.0, 0.0, 4.0, 0.0, 0.0],
        ))
        .unwrap();

    (dir, store)
}
