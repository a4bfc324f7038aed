//! Content distance between two movies.
//!
//! The distance is the plain sum of four terms:
//! - cosine distance of the genre vectors
//! - cosine distance of the actor vectors
//! - cosine distance of the director vectors
//! - absolute difference of normalized popularity
//!
//! Lower is more similar. Each term is symmetric, so the sum is too, but it is
//! not a metric (no triangle inequality).

use crate::error::{Result, SimilarityError};
use data_loader::{BinaryVector, Facet, Movie};
use serde::Serialize;

/// The four terms of a distance, kept apart for explanations
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DistanceBreakdown {
    pub genre: f64,
    pub actor: f64,
    pub director: f64,
    pub popularity: f64,
}

impl DistanceBreakdown {
    pub fn total(&self) -> f64 {
        self.genre + self.actor + self.director + self.popularity
    }
}

/// Cosine distance `1 - u.v / (|u| |v|)` between two equal-length 0/1 vectors.
///
/// The ratio is undefined when a vector has no set bits:
/// - both empty of features: 0.0 (indistinguishable profiles)
/// - only one empty: 1.0 (maximal distance)
pub fn cosine_distance(u: &BinaryVector, v: &BinaryVector) -> f64 {
    let norm_u = u.count_ones();
    let norm_v = v.count_ones();
    match (norm_u, norm_v) {
        (0, 0) => 0.0,
        (0, _) | (_, 0) => 1.0,
        _ => {
            let dot = f64::from(u.dot(v));
            // Squared norms of 0/1 vectors are the bit counts; the product is
            // an exact integer so sqrt is exact for identical vectors.
            let similarity = dot / (f64::from(norm_u) * f64::from(norm_v)).sqrt();
            (1.0 - similarity).max(0.0)
        }
    }
}

/// Cosine distance for one facet, rejecting vectors of different lengths
pub fn facet_distance(a: &Movie, b: &Movie, facet: Facet) -> Result<f64> {
    let u = a.features.get(facet);
    let v = b.features.get(facet);
    if u.len() != v.len() {
        return Err(SimilarityError::IncompatibleFeatureVector {
            facet,
            left: a.id,
            right: b.id,
            left_len: u.len(),
            right_len: v.len(),
        });
    }
    Ok(cosine_distance(u, v))
}

/// All four distance terms between two movies
pub fn breakdown(a: &Movie, b: &Movie) -> Result<DistanceBreakdown> {
    Ok(DistanceBreakdown {
        genre: facet_distance(a, b, Facet::Genre)?,
        actor: facet_distance(a, b, Facet::Actor)?,
        director: facet_distance(a, b, Facet::Director)?,
        popularity: (a.normalized_popularity - b.normalized_popularity).abs(),
    })
}

/// Total distance between two movies (always >= 0)
pub fn distance(a: &Movie, b: &Movie) -> Result<f64> {
    breakdown(a, b).map(|parts| parts.total())
}

#[cfg(test)]
mod tests {
    use super::*;
    use data_loader::FeatureVectors;

    fn bits(b: &[u8]) -> BinaryVector {
        BinaryVector::from_bits(b.to_vec()).unwrap()
    }

    fn movie(id: u32, genres: &[u8], actors: &[u8], directors: &[u8], pop: f64) -> Movie {
        Movie {
            id,
            title: format!("Movie {}", id),
            popularity: pop,
            normalized_popularity: pop,
            poster: None,
            genres: vec![],
            actors: vec![],
            directors: vec![],
            features: FeatureVectors {
                genres: bits(genres),
                actors: bits(actors),
                directors: bits(directors),
            },
        }
    }

    #[test]
    fn test_cosine_identical_is_zero() {
        let v = bits(&[1, 0, 1, 1]);
        assert_eq!(cosine_distance(&v, &v), 0.0);
    }

    #[test]
    fn test_cosine_disjoint_is_one() {
        assert_eq!(cosine_distance(&bits(&[1, 0]), &bits(&[0, 1])), 1.0);
    }

    #[test]
    fn test_cosine_partial_overlap() {
        let d = cosine_distance(&bits(&[1, 1, 0]), &bits(&[1, 0, 0]));
        assert!((d - (1.0 - 1.0 / 2f64.sqrt())).abs() < 1e-12);
    }

    #[test]
    fn test_cosine_zero_vector_fallbacks() {
        let zero = bits(&[0, 0]);
        assert_eq!(cosine_distance(&zero, &zero), 0.0);
        assert_eq!(cosine_distance(&zero, &bits(&[1, 0])), 1.0);
        assert_eq!(cosine_distance(&bits(&[1, 0]), &zero), 1.0);
        assert_eq!(cosine_distance(&bits(&[]), &bits(&[])), 0.0);
    }

    #[test]
    fn test_distance_to_self_is_zero() {
        let movies = [
            movie(1, &[1, 0, 1], &[1, 1, 0], &[0, 1], 0.3),
            movie(2, &[0, 0, 0], &[0, 0, 0], &[0, 0], 0.0),
            movie(3, &[1, 1, 1], &[0, 0, 1], &[1, 1], 1.0),
        ];
        for m in &movies {
            assert_eq!(distance(m, m).unwrap(), 0.0);
        }
    }

    #[test]
    fn test_distance_is_symmetric() {
        let movies = [
            movie(1, &[1, 0, 1], &[1, 1, 0], &[0, 1], 0.3),
            movie(2, &[0, 1, 0], &[1, 0, 0], &[0, 0], 0.9),
            movie(3, &[1, 1, 1], &[0, 0, 1], &[1, 1], 0.0),
        ];
        for a in &movies {
            for b in &movies {
                assert_eq!(distance(a, b).unwrap(), distance(b, a).unwrap());
                assert!(distance(a, b).unwrap() >= 0.0);
            }
        }
    }

    #[test]
    fn test_breakdown_terms() {
        let a = movie(1, &[1, 0], &[1, 0], &[1], 0.75);
        let b = movie(2, &[0, 1], &[1, 0], &[0], 0.25);
        let parts = breakdown(&a, &b).unwrap();

        assert_eq!(parts.genre, 1.0);
        assert_eq!(parts.actor, 0.0);
        assert_eq!(parts.director, 1.0);
        assert_eq!(parts.popularity, 0.5);
        assert_eq!(parts.total(), 2.5);
    }

    #[test]
    fn test_length_mismatch_fails_fast() {
        let a = movie(1, &[1, 0, 1], &[1], &[1], 0.0);
        let b = movie(2, &[1, 0, 1], &[1, 0], &[1], 0.0);

        let err = distance(&a, &b).unwrap_err();
        assert_eq!(
            err,
            SimilarityError::IncompatibleFeatureVector {
                facet: Facet::Actor,
                left: 1,
                right: 2,
                left_len: 1,
                right_len: 2,
            }
        );
    }
}
