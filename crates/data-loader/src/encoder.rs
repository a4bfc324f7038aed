//! Binary vector encoding against master vocabularies.
//!
//! A vocabulary is the sorted set of every distinct term seen in one list
//! column (genres, actors or directors). The sort order fixes which vector
//! index a term maps to, so encoding is reproducible across runs.

use crate::types::{BinaryVector, Facet, FeatureVectors, Movie};
use serde::Serialize;
use std::collections::{BTreeSet, HashMap};

/// Sorted, deduplicated terms with an index for O(1) lookups
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Vocabulary {
    terms: Vec<String>,
    #[serde(skip)]
    positions: HashMap<String, usize>,
}

impl Vocabulary {
    /// Build from already sorted, unique terms
    fn from_sorted(terms: Vec<String>) -> Self {
        let positions = terms
            .iter()
            .enumerate()
            .map(|(i, t)| (t.clone(), i))
            .collect();
        Self { terms, positions }
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    pub fn terms(&self) -> &[String] {
        &self.terms
    }

    /// Vector index of a term, if known
    pub fn position(&self, term: &str) -> Option<usize> {
        self.positions.get(term).copied()
    }
}

/// Build a vocabulary from any number of term lists.
///
/// Runs in O(total items); duplicates collapse in the set and the result is
/// sorted, so building twice from the same lists gives the same vocabulary.
pub fn build_vocabulary<'a, I, L>(lists: I) -> Vocabulary
where
    I: IntoIterator<Item = L>,
    L: IntoIterator<Item = &'a String>,
{
    let set: BTreeSet<&String> = lists.into_iter().flatten().collect();
    Vocabulary::from_sorted(set.into_iter().cloned().collect())
}

/// Encode a term list as a presence vector of length `vocabulary.len()`.
///
/// Terms missing from the vocabulary are ignored. This is how a movie with a
/// brand-new actor ends up with fewer set bits rather than an error.
pub fn encode<S: AsRef<str>>(items: &[S], vocabulary: &Vocabulary) -> BinaryVector {
    let mut vector = BinaryVector::zeros(vocabulary.len());
    for item in items {
        if let Some(index) = vocabulary.position(item.as_ref()) {
            vector.set(index);
        }
    }
    vector
}

/// The three master vocabularies of a catalogue
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Vocabularies {
    pub genres: Vocabulary,
    pub actors: Vocabulary,
    pub directors: Vocabulary,
}

impl Vocabularies {
    /// Build all three vocabularies from the movies' list columns
    pub fn from_movies<'a, I>(movies: I) -> Self
    where
        I: IntoIterator<Item = &'a Movie> + Clone,
    {
        Self {
            genres: build_vocabulary(movies.clone().into_iter().map(|m| &m.genres)),
            actors: build_vocabulary(movies.clone().into_iter().map(|m| &m.actors)),
            directors: build_vocabulary(movies.into_iter().map(|m| &m.directors)),
        }
    }

    pub fn get(&self, facet: Facet) -> &Vocabulary {
        match facet {
            Facet::Genre => &self.genres,
            Facet::Actor => &self.actors,
            Facet::Director => &self.directors,
        }
    }

    /// Encode the three lists of a movie
    pub fn encode_lists<S: AsRef<str>>(
        &self,
        genres: &[S],
        actors: &[S],
        directors: &[S],
    ) -> FeatureVectors {
        FeatureVectors {
            genres: encode(genres, &self.genres),
            actors: encode(actors, &self.actors),
            directors: encode(directors, &self.directors),
        }
    }

    /// Terms of `movie` that have no position in the vocabularies.
    ///
    /// These were dropped when the movie was encoded; they only count once
    /// the vectors are rebuilt.
    pub fn unknown_terms<'m>(&self, movie: &'m Movie) -> Vec<(Facet, &'m str)> {
        Facet::ALL
            .iter()
            .flat_map(|&facet| {
                movie
                    .list(facet)
                    .iter()
                    .filter(move |term| self.get(facet).position(term).is_none())
                    .map(move |term| (facet, term.as_str()))
            })
            .collect()
    }

    /// True when every vector has the length of its vocabulary
    pub fn matches(&self, features: &FeatureVectors) -> bool {
        Facet::ALL
            .iter()
            .all(|&facet| features.get(facet).len() == self.get(facet).len())
    }
}
