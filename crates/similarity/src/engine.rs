//! Brute-force nearest-neighbour search over the catalogue.
//!
//! ## Algorithm
//! 1. Look up the query movie (`UnknownMovie` if absent)
//! 2. Compute the distance from the query to every other movie, in parallel
//! 3. Stable-sort ascending by distance and keep the first `k`
//!
//! Cost is O(N * V) per query where V is the total vocabulary size. Ties keep
//! catalogue load order; that order is deterministic but carries no meaning.

use crate::distance::{breakdown, distance, DistanceBreakdown};
use crate::error::{Result, SimilarityError};
use data_loader::{Catalogue, MovieId};
use rayon::prelude::*;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, instrument};

/// One result of a similarity query
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Neighbour {
    pub movie_id: MovieId,
    pub distance: f64,
}

/// Answers "movies like this one" queries against a catalogue snapshot
///
/// Rust concept: holding an `Arc<Catalogue>` makes the engine cheap to clone
/// and safe to share across threads; every clone reads the same snapshot.
#[derive(Clone)]
pub struct SimilarityEngine {
    /// Shared, read-only snapshot
    catalogue: Arc<Catalogue>,
}

impl SimilarityEngine {
    pub fn new(catalogue: Arc<Catalogue>) -> Self {
        Self { catalogue }
    }

    pub fn catalogue(&self) -> &Arc<Catalogue> {
        &self.catalogue
    }

    /// The `k` movies closest to `query_id`, nearest first.
    ///
    /// Returns `min(k, N - 1)` results and never the query itself. `k == 0`
    /// gives an empty list. Any stale vector pair fails the whole query with
    /// `IncompatibleFeatureVector`.
    #[instrument(skip(self), fields(catalogue_size = self.catalogue.len()))]
    pub fn recommend(&self, query_id: MovieId, k: usize) -> Result<Vec<Neighbour>> {
        if !self.catalogue.contains(query_id) {
            return Err(SimilarityError::UnknownMovie { id: query_id });
        }
        if k == 0 {
            return Ok(Vec::new());
        }

        let mut neighbours = self.distances_from(query_id)?;
        // sort_by is stable, so equal distances stay in load order
        neighbours.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        neighbours.truncate(k);

        debug!(
            "Selected {} neighbours for movie {}",
            neighbours.len(),
            query_id
        );
        Ok(neighbours)
    }

    /// Distance from `query_id` to every other movie, in catalogue load order
    pub fn distances_from(&self, query_id: MovieId) -> Result<Vec<Neighbour>> {
        let query = self
            .catalogue
            .get(query_id)
            .ok_or(SimilarityError::UnknownMovie { id: query_id })?;

        // rayon collects in input order, which keeps ties in load order
        self.catalogue
            .ids()
            .par_iter()
            .filter(|&&id| id != query_id)
            .filter_map(|&id| self.catalogue.get(id))
            .map(|movie| {
                distance(query, movie).map(|d| Neighbour {
                    movie_id: movie.id,
                    distance: d,
                })
            })
            .collect()
    }

    /// Per-term distance between two catalogue movies
    pub fn explain(&self, left: MovieId, right: MovieId) -> Result<DistanceBreakdown> {
        let a = self
            .catalogue
            .get(left)
            .ok_or(SimilarityError::UnknownMovie { id: left })?;
        let b = self
            .catalogue
            .get(right)
            .ok_or(SimilarityError::UnknownMovie { id: right })?;
        breakdown(a, b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use data_loader::{BinaryVector, Facet, FeatureVectors, Movie};

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn movie(id: MovieId, genres: &[&str], actors: &[&str], popularity: f64) -> Movie {
        Movie {
            id,
            title: format!("Movie {}", id),
            popularity,
            normalized_popularity: 0.0,
            poster: None,
            genres: strings(genres),
            actors: strings(actors),
            directors: vec![],
            features: FeatureVectors::default(),
        }
    }

    /// A, B, C and D, where D is a near copy of A, with vectors encoded
    fn scenario_engine() -> SimilarityEngine {
        let mut catalogue = Catalogue::from_movies(vec![
            movie(1, &["Action", "Drama"], &["X", "Y"], 10.0), // A
            movie(2, &["Action"], &["X"], 8.0),                // B
            movie(3, &["Comedy"], &["Z"], 1.0),                // C
            movie(4, &["Action", "Drama"], &["X", "Y"], 9.0),  // D
        ])
        .unwrap();
        catalogue.rebuild_vectors();
        SimilarityEngine::new(Arc::new(catalogue))
    }

    #[test]
    fn test_nearest_neighbour_scenario() {
        let engine = scenario_engine();

        let top = engine.recommend(1, 1).unwrap();
        assert_eq!(top.len(), 1);
        assert_eq!(top[0].movie_id, 4);

        let all = engine.recommend(1, 3).unwrap();
        let ids: Vec<MovieId> = all.iter().map(|n| n.movie_id).collect();
        assert_eq!(ids, vec![4, 2, 3]);
        assert!(all.windows(2).all(|w| w[0].distance <= w[1].distance));
    }

    #[test]
    fn test_query_is_never_returned() {
        let engine = scenario_engine();
        for id in [1, 2, 3, 4] {
            let results = engine.recommend(id, 10).unwrap();
            assert!(results.iter().all(|n| n.movie_id != id));
        }
    }

    #[test]
    fn test_k_zero_and_clamping() {
        let engine = scenario_engine();
        assert!(engine.recommend(1, 0).unwrap().is_empty());
        assert_eq!(engine.recommend(1, 3).unwrap().len(), 3);
        assert_eq!(engine.recommend(1, 100).unwrap().len(), 3);
    }

    #[test]
    fn test_unknown_movie() {
        let engine = scenario_engine();
        assert_eq!(
            engine.recommend(9_999_999, 5).unwrap_err(),
            SimilarityError::UnknownMovie { id: 9_999_999 }
        );
    }

    #[test]
    fn test_single_movie_catalogue() {
        let mut catalogue = Catalogue::from_movies(vec![movie(1, &["Drama"], &[], 1.0)]).unwrap();
        catalogue.rebuild_vectors();
        let engine = SimilarityEngine::new(Arc::new(catalogue));

        assert!(engine.recommend(1, 5).unwrap().is_empty());
    }

    #[test]
    fn test_ties_keep_load_order() {
        let mut catalogue = Catalogue::from_movies(vec![
            movie(50, &["Drama"], &["X"], 1.0),
            movie(10, &["Drama"], &["X"], 1.0),
            movie(30, &["Drama"], &["X"], 1.0),
            movie(20, &["Drama"], &["X"], 1.0),
        ])
        .unwrap();
        catalogue.rebuild_vectors();
        let engine = SimilarityEngine::new(Arc::new(catalogue));

        let ids: Vec<MovieId> = engine
            .recommend(30, 3)
            .unwrap()
            .iter()
            .map(|n| n.movie_id)
            .collect();
        assert_eq!(ids, vec![50, 10, 20]);
    }

    #[test]
    fn test_repeated_queries_are_identical() {
        let engine = scenario_engine();
        assert_eq!(engine.recommend(2, 3).unwrap(), engine.recommend(2, 3).unwrap());
    }

    #[test]
    fn test_stale_vectors_fail_until_rebuilt() {
        let bits = |b: &[u8]| BinaryVector::from_bits(b.to_vec()).unwrap();
        let encoded = |g: &[u8], a: &[u8]| FeatureVectors {
            genres: bits(g),
            actors: bits(a),
            directors: bits(&[]),
        };

        // Vocabulary was {Action, Comedy, Drama} x {X, Y, Z} when A-C were
        // encoded; D was encoded before Comedy and Z existed.
        let mut a = movie(1, &["Action", "Drama"], &["X", "Y"], 10.0);
        a.features = encoded(&[1, 0, 1], &[1, 1, 0]);
        let mut b = movie(2, &["Action"], &["X"], 8.0);
        b.features = encoded(&[1, 0, 0], &[1, 0, 0]);
        let mut c = movie(3, &["Comedy"], &["Z"], 1.0);
        c.features = encoded(&[0, 1, 0], &[0, 0, 1]);
        let mut d = movie(4, &["Action", "Drama"], &["X", "Y"], 9.0);
        d.features = encoded(&[1, 1], &[1, 1]);

        let mut catalogue = Catalogue::from_movies(vec![a, b, c, d]).unwrap();
        assert_eq!(catalogue.stale_movies(), vec![4]);

        let stale_engine = SimilarityEngine::new(Arc::new(catalogue.clone()));
        let err = stale_engine.recommend(1, 3).unwrap_err();
        assert!(matches!(
            err,
            SimilarityError::IncompatibleFeatureVector { facet: Facet::Genre, right: 4, .. }
        ));
        assert!(stale_engine.explain(4, 2).is_err());

        catalogue.rebuild_vectors();
        let engine = SimilarityEngine::new(Arc::new(catalogue));
        let top = engine.recommend(1, 1).unwrap();
        assert_eq!(top[0].movie_id, 4);
        assert_eq!(engine.recommend(4, 3).unwrap().len(), 3);
    }
}
