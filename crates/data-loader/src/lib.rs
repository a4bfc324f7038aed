//! # Data Loader Crate
//!
//! The feature store behind the recommender: loads the movie table, keeps it
//! in memory, and owns the write path used by ingestion.
//!
//! ## Main Components
//!
//! - **types**: Domain types (Movie, BinaryVector, Catalogue)
//! - **parser**: Read and write the `::`-separated data file
//! - **encoder**: Master vocabularies and binary vector encoding
//! - **index**: Catalogue loading, popularity normalization, append and rebuild
//! - **error**: Error types for data loading
//!
//! ## Example Usage
//!
//! ```ignore
//! use data_loader::{Catalogue, MalformedPolicy};
//! use std::path::Path;
//!
//! let catalogue = Catalogue::load_from_file(Path::new("data/movie_data.dat"), MalformedPolicy::Abort)?;
//!
//! for id in catalogue.all_ids().into_iter().take(10) {
//!     println!("{} {}", id, catalogue.title_of(id));
//! }
//! ```

pub mod encoder;
pub mod error;
pub mod index;
pub mod parser;
pub mod types;

// Re-export commonly used types for convenience
pub use encoder::{build_vocabulary, encode, Vocabularies, Vocabulary};
pub use error::{DataLoadError, Result};
pub use types::{
    BinaryVector, Catalogue, Facet, FeatureVectors, MalformedPolicy, Movie, MovieId, NewMovie,
    RebuildSummary, TOP_ACTOR_LIMIT, UNKNOWN_TITLE,
};
