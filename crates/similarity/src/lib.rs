//! # Similarity Crate
//!
//! Content-based "more like this" search over a movie catalogue.
//!
//! ## Components
//!
//! ### Distance
//! Sum of three cosine distances over binary genre/actor/director vectors
//! plus the absolute difference of normalized popularity.
//!
//! ### Engine
//! Brute-force nearest neighbours: every other movie is scored against the
//! query (in parallel with Rayon) and the `k` closest are returned.
//!
//! ## Example Usage
//!
//! ```ignore
//! use similarity::SimilarityEngine;
//! use data_loader::{Catalogue, MalformedPolicy};
//! use std::sync::Arc;
//!
//! let catalogue = Arc::new(Catalogue::load_from_file(path, MalformedPolicy::Abort)?);
//! let engine = SimilarityEngine::new(catalogue);
//!
//! for neighbour in engine.recommend(155, 5)? {
//!     println!("{} at {:.3}", neighbour.movie_id, neighbour.distance);
//! }
//! ```

pub mod distance;
pub mod engine;
pub mod error;

pub use distance::{breakdown, cosine_distance, distance, facet_distance, DistanceBreakdown};
pub use engine::{Neighbour, SimilarityEngine};
pub use error::{Result, SimilarityError};
