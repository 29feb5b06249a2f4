mod error;
mod models;
mod schema;
mod store;
mod trait_def;
mod validation;

pub use error::{StoreError, StoreResult};
pub use models::*;
pub use schema::{register_functions, CASE_FOLD_FUNCTION, SONG_CATALOG_VERSIONED_SCHEMAS};
pub use store::SqliteSongStore;
pub use trait_def::SongStore;
pub use validation::{validate_features, validate_song, ValidationError};
