//! Common test infrastructure
//!
//! Tests should only import from this module, not from internal submodules.
//!
//! # Example
//!
//! ```no_run
//! mod common;
//! use common::{seeded_store, TRACK_1_ID};
//! use song_catalog::SongStore;
//!
//! #[test]
//! fn test_get_song() {
//!     let (_dir, store) = seeded_store();
//!     assert!(store.get_song(TRACK_1_ID).unwrap().is_some());
//! }
//! ```

mod constants;
mod fixtures;

#[allow(unused_imports)]
pub use constants::*;
#[allow(unused_imports)]
pub use fixtures::{empty_store, seeded_store, song};
