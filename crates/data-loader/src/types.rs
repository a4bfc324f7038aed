//! Core domain types for the movie catalogue.
//!
//! Key Rust concepts demonstrated here:
//! - Type aliases for domain clarity (MovieId)
//! - Newtypes that guard an invariant (BinaryVector only holds 0/1)
//! - Movie records with their list features and derived binary vectors
//! - The Catalogue, an in-memory table with O(1) id lookups that remembers
//!   the order rows were loaded in

use crate::encoder::Vocabularies;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

// =============================================================================
// Type Aliases and Constants
// =============================================================================

/// Unique identifier for a movie (TMDB id in the shipped dataset)
pub type MovieId = u32;

/// Title returned for ids that are not in the catalogue
pub const UNKNOWN_TITLE: &str = "Unknown Title";

/// Number of billed actors kept per movie on the write path
pub const TOP_ACTOR_LIMIT: usize = 3;

// =============================================================================
// Feature Types
// =============================================================================

/// The three categorical facets a movie is described by
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Facet {
    Genre,
    Actor,
    Director,
}

impl Facet {
    pub const ALL: [Facet; 3] = [Facet::Genre, Facet::Actor, Facet::Director];
}

impl fmt::Display for Facet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Facet::Genre => "genre",
            Facet::Actor => "actor",
            Facet::Director => "director",
        };
        f.write_str(name)
    }
}

/// Presence vector over a vocabulary: entry `i` is 1 iff term `i` is present.
///
/// Rust concept: the field is private, so the only ways to build one are
/// `zeros`, `from_bits` and the encoder. Serialization is one-way; there is
/// no `Deserialize` that could smuggle in a 2.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BinaryVector(Vec<u8>);

impl BinaryVector {
    /// All-zero vector of the given length
    pub fn zeros(len: usize) -> Self {
        Self(vec![0; len])
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.0
    }

    pub(crate) fn set(&mut self, index: usize) {
        self.0[index] = 1;
    }

    /// Number of set entries (the squared L2 norm of a 0/1 vector)
    pub fn count_ones(&self) -> u32 {
        self.0.iter().map(|&b| u32::from(b)).sum()
    }

    /// Number of positions set in both vectors.
    ///
    /// Callers are responsible for checking lengths first; extra trailing
    /// entries of the longer vector are ignored.
    pub fn dot(&self, other: &BinaryVector) -> u32 {
        self.0
            .iter()
            .zip(other.0.iter())
            .map(|(&a, &b)| u32::from(a & b))
            .sum()
    }

    /// Build from raw bits; every entry must be 0 or 1.
    pub fn from_bits(bits: Vec<u8>) -> Option<Self> {
        bits.iter().all(|&b| b <= 1).then_some(Self(bits))
    }
}

/// The three binary vectors of a movie, one per facet
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FeatureVectors {
    pub genres: BinaryVector,
    pub actors: BinaryVector,
    pub directors: BinaryVector,
}

impl FeatureVectors {
    pub fn get(&self, facet: Facet) -> &BinaryVector {
        match facet {
            Facet::Genre => &self.genres,
            Facet::Actor => &self.actors,
            Facet::Director => &self.directors,
        }
    }
}

// =============================================================================
// Movie Types
// =============================================================================

/// One row of the catalogue
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Movie {
    pub id: MovieId,
    pub title: String,
    /// Raw popularity as supplied by the ingestion side
    pub popularity: f64,
    /// Popularity rescaled to [0, 1] over the whole catalogue
    pub normalized_popularity: f64,
    /// `None` when the row had an empty poster field
    pub poster: Option<String>,
    pub genres: Vec<String>,
    pub actors: Vec<String>,
    pub directors: Vec<String>,
    pub features: FeatureVectors,
}

impl Movie {
    pub fn list(&self, facet: Facet) -> &[String] {
        match facet {
            Facet::Genre => &self.genres,
            Facet::Actor => &self.actors,
            Facet::Director => &self.directors,
        }
    }
}

/// A movie handed to the write path, before vectors are encoded
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewMovie {
    pub id: MovieId,
    pub title: String,
    pub popularity: f64,
    pub poster: Option<String>,
    pub genres: Vec<String>,
    pub actors: Vec<String>,
    pub directors: Vec<String>,
}

/// What to do with a row that fails to parse
///
/// Rust concept: `#[serde(rename_all = "lowercase")]` lets configuration say
/// `skip` instead of `Skip`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MalformedPolicy {
    /// Fail the whole load with `MalformedRecord`
    #[default]
    Abort,
    /// Drop the row and log a warning
    Skip,
}

/// Vocabulary sizes after a rebuild
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RebuildSummary {
    pub genres: usize,
    pub actors: usize,
    pub directors: usize,
}

// =============================================================================
// Catalogue - The In-Memory Feature Store
// =============================================================================

/// The whole movie table plus its vocabularies.
///
/// A catalogue is treated as an immutable snapshot once built. Writers clone
/// it, change the clone, and publish the clone.
///
/// Rust concept: `pub(crate)` fields are visible to the loader in `index.rs`
/// but not to other crates, which must go through the methods below.
#[derive(Debug, Clone, Default)]
pub struct Catalogue {
    pub(crate) movies: HashMap<MovieId, Movie>,
    /// Ids in the order rows were loaded or appended
    pub(crate) order: Vec<MovieId>,
    pub(crate) vocabularies: Vocabularies,
    /// Malformed rows dropped by `MalformedPolicy::Skip` at load time
    pub(crate) skipped_rows: usize,
}

impl Catalogue {
    /// Creates a new, empty Catalogue
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: MovieId) -> Option<&Movie> {
        self.movies.get(&id)
    }

    pub fn contains(&self, id: MovieId) -> bool {
        self.movies.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Every id, newest first.
    ///
    /// Rows are appended at the end of the file, so reverse load order is
    /// treated as recency; there is no explicit date sort.
    pub fn all_ids(&self) -> Vec<MovieId> {
        self.order.iter().rev().copied().collect()
    }

    /// Ids in load order (oldest first)
    pub fn ids(&self) -> &[MovieId] {
        &self.order
    }

    /// Movies in load order
    pub fn iter(&self) -> impl Iterator<Item = &Movie> + Clone + '_ {
        self.order.iter().filter_map(|id| self.movies.get(id))
    }

    /// Title for an id, or [`UNKNOWN_TITLE`] if the id is not present
    pub fn title_of(&self, id: MovieId) -> &str {
        self.movies
            .get(&id)
            .map(|m| m.title.as_str())
            .unwrap_or(UNKNOWN_TITLE)
    }

    /// Poster URL for an id, or `default` if the id is absent or has no poster
    pub fn poster_of<'a>(&'a self, id: MovieId, default: &'a str) -> &'a str {
        self.movies
            .get(&id)
            .and_then(|m| m.poster.as_deref())
            .unwrap_or(default)
    }

    pub fn vocabularies(&self) -> &Vocabularies {
        &self.vocabularies
    }

    /// Number of malformed rows the load skipped; a non-zero count blocks saving
    pub fn skipped_rows(&self) -> usize {
        self.skipped_rows
    }

    /// Ids whose vectors do not match the current vocabulary lengths, in load order
    pub fn stale_movies(&self) -> Vec<MovieId> {
        self.iter()
            .filter(|m| !self.vocabularies.matches(&m.features))
            .map(|m| m.id)
            .collect()
    }
}
