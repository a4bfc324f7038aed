//! Catalogue building, normalization, and the ingestion write path.
//!
//! Loading parses the file, applies the malformed-row policy, rejects
//! duplicate ids, normalizes popularity over the whole table and builds the
//! master vocabularies. Vectors are kept exactly as stored so that a stale
//! file is detected downstream instead of silently re-encoded.

use crate::encoder::Vocabularies;
use crate::error::{DataLoadError, Result};
use crate::parser;
use crate::types::*;
use rayon::prelude::*;
use std::fs;
use std::io::Write;
use std::path::Path;
use tracing::{info, warn};

impl Catalogue {
    /// Load the catalogue from a data file.
    ///
    /// Steps:
    /// 1. Parse the file (missing file or bad header is `DataUnavailable`)
    /// 2. Apply `policy` to rows that failed to parse
    /// 3. Insert rows in file order, rejecting duplicate ids
    /// 4. Normalize popularity and build vocabularies
    pub fn load_from_file(path: &Path, policy: MalformedPolicy) -> Result<Self> {
        info!("Loading movie catalogue from {:?}", path);

        let parser::ParsedFile { rows, mut failures } = parser::parse_file(path)?;
        let skipped = failures.len();

        if !failures.is_empty() {
            match policy {
                MalformedPolicy::Abort => return Err(failures.remove(0)),
                MalformedPolicy::Skip => {
                    for failure in &failures {
                        warn!("Skipping row: {}", failure);
                    }
                    warn!("Skipped {} malformed rows", failures.len());
                }
            }
        }

        let mut catalogue = Self::from_movies(rows.into_iter().map(|row| row.movie))?;
        catalogue.skipped_rows = skipped;

        let stale = catalogue.stale_movies();
        if !stale.is_empty() {
            warn!(
                "{} movies have vectors that do not match the vocabularies; rebuild vectors before serving",
                stale.len()
            );
        }

        info!(
            "Loaded {} movies ({} genres, {} actors, {} directors)",
            catalogue.len(),
            catalogue.vocabularies.genres.len(),
            catalogue.vocabularies.actors.len(),
            catalogue.vocabularies.directors.len()
        );
        Ok(catalogue)
    }

    /// Build a catalogue from movies in load order.
    ///
    /// Vectors are taken as given. Fails with `DuplicateKey` on a repeated id.
    pub fn from_movies<I>(movies: I) -> Result<Self>
    where
        I: IntoIterator<Item = Movie>,
    {
        let mut catalogue = Catalogue::new();
        for movie in movies {
            catalogue.insert(movie)?;
        }
        catalogue.normalize_popularity();
        catalogue.vocabularies = Vocabularies::from_movies(catalogue.iter());
        Ok(catalogue)
    }

    fn insert(&mut self, movie: Movie) -> Result<()> {
        if self.movies.contains_key(&movie.id) {
            return Err(DataLoadError::DuplicateKey { id: movie.id });
        }
        self.order.push(movie.id);
        self.movies.insert(movie.id, movie);
        Ok(())
    }

    /// Rescale popularity to [0, 1] with the table's min and max.
    ///
    /// When every movie has the same popularity (or there is at most one
    /// movie) all normalized values are 0.0.
    pub fn normalize_popularity(&mut self) {
        let (min, max) = self
            .movies
            .values()
            .map(|m| m.popularity)
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), p| {
                (lo.min(p), hi.max(p))
            });
        let range = max - min;

        self.movies.par_iter_mut().for_each(|(_, movie)| {
            movie.normalized_popularity = if range > 0.0 {
                (movie.popularity - min) / range
            } else {
                0.0
            };
        });
    }

    /// Append a movie the way the ingestion script does.
    ///
    /// Vectors are encoded against the current vocabularies, which are not
    /// grown: terms the catalogue has never seen are dropped from the vectors
    /// until [`rebuild_vectors`](Self::rebuild_vectors) runs.
    pub fn append_movie(&mut self, new: NewMovie) -> Result<()> {
        if new.title.trim().is_empty() {
            return Err(DataLoadError::InvalidValue {
                field: "title".to_string(),
                value: new.title,
            });
        }
        if !new.popularity.is_finite() {
            return Err(DataLoadError::InvalidValue {
                field: "popularity".to_string(),
                value: new.popularity.to_string(),
            });
        }

        let id = new.id;
        let mut actors = new.actors;
        actors.truncate(TOP_ACTOR_LIMIT);
        let features = self
            .vocabularies
            .encode_lists(&new.genres, &actors, &new.directors);

        self.insert(Movie {
            id: new.id,
            title: new.title,
            popularity: new.popularity,
            normalized_popularity: 0.0,
            poster: new.poster.filter(|p| !p.trim().is_empty()),
            genres: new.genres,
            actors,
            directors: new.directors,
            features,
        })?;
        self.normalize_popularity();

        info!("Appended movie {} ({} movies total)", id, self.len());
        Ok(())
    }

    /// Rebuild the three vocabularies from the list columns and re-encode
    /// every movie against them.
    pub fn rebuild_vectors(&mut self) -> RebuildSummary {
        let vocabularies = Vocabularies::from_movies(self.iter());

        self.movies.par_iter_mut().for_each(|(_, movie)| {
            movie.features =
                vocabularies.encode_lists(&movie.genres, &movie.actors, &movie.directors);
        });
        self.vocabularies = vocabularies;

        let summary = RebuildSummary {
            genres: self.vocabularies.genres.len(),
            actors: self.vocabularies.actors.len(),
            directors: self.vocabularies.directors.len(),
        };
        info!(
            "Rebuilt binary vectors: {} genres, {} actors, {} directors",
            summary.genres, summary.actors, summary.directors
        );
        summary
    }

    /// Write the catalogue in load order.
    ///
    /// The file is written next to the target and renamed into place so a
    /// reader never sees a half-written table. A catalogue that skipped
    /// malformed rows on load is refused with `IncompleteCatalogue`, since
    /// those rows are not in memory and would vanish from the file.
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        if self.skipped_rows > 0 {
            warn!(
                "Not saving to {:?}: {} rows were skipped on load",
                path, self.skipped_rows
            );
            return Err(DataLoadError::IncompleteCatalogue {
                skipped: self.skipped_rows,
            });
        }

        let tmp_path = path.with_extension("tmp");
        {
            let mut file = fs::File::create(&tmp_path)?;
            writeln!(file, "{}", parser::format_header())?;
            for movie in self.iter() {
                writeln!(file, "{}", parser::format_row(movie))?;
            }
            file.sync_all()?;
        }
        fs::rename(&tmp_path, path)?;

        info!("Saved {} movies to {:?}", self.len(), path);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn movie(id: MovieId, popularity: f64, genres: &[&str], actors: &[&str]) -> Movie {
        Movie {
            id,
            title: format!("Movie {}", id),
            popularity,
            normalized_popularity: 0.0,
            poster: None,
            genres: genres.iter().map(|s| s.to_string()).collect(),
            actors: actors.iter().map(|s| s.to_string()).collect(),
            directors: vec![],
            features: FeatureVectors::default(),
        }
    }

    #[test]
    fn test_normalize_popularity() {
        let catalogue = Catalogue::from_movies(vec![
            movie(1, 10.0, &[], &[]),
            movie(2, 5.5, &[], &[]),
            movie(3, 1.0, &[], &[]),
        ])
        .unwrap();

        assert_eq!(catalogue.get(1).unwrap().normalized_popularity, 1.0);
        assert_eq!(catalogue.get(2).unwrap().normalized_popularity, 0.5);
        assert_eq!(catalogue.get(3).unwrap().normalized_popularity, 0.0);
    }

    #[test]
    fn test_identical_popularity_normalizes_to_zero() {
        let catalogue = Catalogue::from_movies(vec![
            movie(1, 7.0, &[], &[]),
            movie(2, 7.0, &[], &[]),
        ])
        .unwrap();

        for m in catalogue.iter() {
            assert_eq!(m.normalized_popularity, 0.0);
            assert!(m.normalized_popularity.is_finite());
        }
    }

    #[test]
    fn test_duplicate_id_is_rejected() {
        let err = Catalogue::from_movies(vec![movie(1, 1.0, &[], &[]), movie(1, 2.0, &[], &[])])
            .unwrap_err();
        assert!(matches!(err, DataLoadError::DuplicateKey { id: 1 }));
    }

    #[test]
    fn test_all_ids_newest_first() {
        let catalogue = Catalogue::from_movies(vec![
            movie(30, 1.0, &[], &[]),
            movie(10, 1.0, &[], &[]),
            movie(20, 1.0, &[], &[]),
        ])
        .unwrap();
        assert_eq!(catalogue.all_ids(), vec![20, 10, 30]);
    }

    #[test]
    fn test_append_uses_current_vocabulary() {
        let mut catalogue = Catalogue::from_movies(vec![movie(1, 1.0, &["Action"], &["X"])]).unwrap();
        catalogue.rebuild_vectors();

        catalogue
            .append_movie(NewMovie {
                id: 2,
                title: "Sequel".to_string(),
                popularity: 3.0,
                poster: Some(String::new()),
                genres: vec!["Action".to_string(), "Horror".to_string()],
                actors: vec!["X", "A", "B", "C"].into_iter().map(String::from).collect(),
                directors: vec![],
            })
            .unwrap();

        let sequel = catalogue.get(2).unwrap();
        // Horror and the new actors are not in the vocabulary yet
        assert_eq!(sequel.features.genres.as_slice(), &[1]);
        assert_eq!(sequel.features.actors.as_slice(), &[1]);
        assert_eq!(sequel.actors.len(), TOP_ACTOR_LIMIT);
        assert_eq!(sequel.poster, None);
        assert_eq!(sequel.normalized_popularity, 1.0);
        assert_eq!(catalogue.all_ids()[0], 2);
    }

    #[test]
    fn test_append_duplicate_is_rejected() {
        let mut catalogue = Catalogue::from_movies(vec![movie(1, 1.0, &[], &[])]).unwrap();
        let err = catalogue
            .append_movie(NewMovie {
                id: 1,
                title: "Again".to_string(),
                popularity: 1.0,
                poster: None,
                genres: vec![],
                actors: vec![],
                directors: vec![],
            })
            .unwrap_err();
        assert!(matches!(err, DataLoadError::DuplicateKey { id: 1 }));
        assert_eq!(catalogue.len(), 1);
    }

    #[test]
    fn test_rebuild_grows_vectors() {
        let mut catalogue = Catalogue::from_movies(vec![
            movie(1, 1.0, &["Drama"], &["X"]),
            movie(2, 2.0, &["Action", "Drama"], &["Y"]),
        ])
        .unwrap();
        assert_eq!(catalogue.stale_movies(), vec![1, 2]);

        let summary = catalogue.rebuild_vectors();
        assert_eq!(summary.genres, 2);
        assert_eq!(summary.actors, 2);
        assert!(catalogue.stale_movies().is_empty());
        assert_eq!(catalogue.get(2).unwrap().features.genres.as_slice(), &[1, 1]);

        // Rebuilding again changes nothing
        let before = catalogue.get(1).unwrap().features.clone();
        catalogue.rebuild_vectors();
        assert_eq!(catalogue.get(1).unwrap().features, before);
    }
}
