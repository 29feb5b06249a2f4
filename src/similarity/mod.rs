//! Feature-vector similarity search over the song catalog.

mod index;
mod scaler;

pub use index::{IndexMetadata, Neighbor, SimilarityError, SimilarityIndex};
pub use scaler::{l2_normalize, StandardScaler};
