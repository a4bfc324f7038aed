//! # Recommendation Service
//!
//! The facade the presentation layer talks to. It owns:
//! 1. The current catalogue snapshot (an `Arc<Catalogue>` behind a `RwLock`)
//! 2. The result cache
//! 3. The write path (append, rebuild, reload), done copy-on-write
//!
//! Readers clone the snapshot `Arc` and compute without holding any lock.
//! Writers build a new catalogue off to the side, then swap it in and
//! invalidate the cache under the snapshot write lock.

use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::time::Instant;

use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use crate::cache::{CacheStats, RecommendationCache};
use crate::config::Config;
use crate::error::{Result, ServiceError};
use data_loader::{Catalogue, Movie, MovieId, NewMovie, RebuildSummary};
use similarity::{SimilarityEngine, SimilarityError};

/// One recommended movie, ready for display
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MovieRecommendation {
    pub movie_id: MovieId,
    pub title: String,
    pub genres: Vec<String>,
    pub actors: Vec<String>,
    pub directors: Vec<String>,
    pub distance: f64,
}

#[derive(Clone)]
struct Snapshot {
    catalogue: Arc<Catalogue>,
    generation: u64,
}

pub struct RecommendationService {
    config: Config,
    snapshot: RwLock<Snapshot>,
    cache: RecommendationCache,
    /// Serializes writers so concurrent copy-on-write updates are not lost
    writer: Mutex<()>,
}

impl RecommendationService {
    /// Load the catalogue named by `config` and build the service around it
    pub fn from_config(config: Config) -> Result<Self> {
        let start = Instant::now();
        let catalogue = Catalogue::load_from_file(&config.movie_data_path, config.malformed_records)?;
        info!(
            "Loaded {} movies from {:?} in {:.2?}",
            catalogue.len(),
            config.movie_data_path,
            start.elapsed()
        );
        Ok(Self::with_catalogue(config, catalogue))
    }

    pub fn with_catalogue(config: Config, catalogue: Catalogue) -> Self {
        let cache = RecommendationCache::new(config.cache_capacity());
        let generation = cache.generation();
        Self {
            config,
            snapshot: RwLock::new(Snapshot {
                catalogue: Arc::new(catalogue),
                generation,
            }),
            cache,
            writer: Mutex::new(()),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The catalogue currently being served
    pub fn catalogue(&self) -> Arc<Catalogue> {
        self.snapshot().catalogue
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    fn snapshot(&self) -> Snapshot {
        self.snapshot
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    // ========================================================================
    // Read path
    // ========================================================================

    /// Every `(id, title)` pair, newest first
    pub fn list_movies(&self) -> Vec<(MovieId, String)> {
        let catalogue = self.catalogue();
        catalogue
            .all_ids()
            .into_iter()
            .map(|id| (id, catalogue.title_of(id).to_string()))
            .collect()
    }

    /// The `k` movies most similar to `movie_id`, nearest first.
    ///
    /// Served from the cache when possible. If the snapshot has stale vectors
    /// and `rebuild_on_stale` is set, vectors are rebuilt and the query is
    /// retried once.
    #[instrument(skip(self))]
    pub fn recommend(&self, movie_id: MovieId, k: usize) -> Result<Vec<MovieRecommendation>> {
        let key = (movie_id, k);
        if let Some(hit) = self.cache.get(&key) {
            debug!("Cache hit for movie {} (k={})", movie_id, k);
            return Ok(hit.to_vec());
        }

        let snapshot = self.snapshot();
        let results = match Self::compute(&snapshot.catalogue, movie_id, k) {
            Err(ServiceError::Similarity(err @ SimilarityError::IncompatibleFeatureVector { .. }))
                if self.config.rebuild_on_stale =>
            {
                warn!("{}; rebuilding vectors and retrying", err);
                self.rebuild_if_current(snapshot.generation);
                let snapshot = self.snapshot();
                let results = Self::compute(&snapshot.catalogue, movie_id, k)?;
                self.cache
                    .insert(key, snapshot.generation, results.clone().into());
                return Ok(results);
            }
            other => other?,
        };

        self.cache
            .insert(key, snapshot.generation, results.clone().into());
        Ok(results)
    }

    /// `recommend` with the configured number of results
    pub fn recommend_default(&self, movie_id: MovieId) -> Result<Vec<MovieRecommendation>> {
        self.recommend(movie_id, self.config.num_recommendations)
    }

    /// `recommend`, degrading to an empty list on any failure
    pub fn recommend_or_empty(&self, movie_id: MovieId, k: usize) -> Vec<MovieRecommendation> {
        match self.recommend(movie_id, k) {
            Ok(results) => results,
            Err(e) => {
                warn!("Recommendations for movie {} failed: {}", movie_id, e);
                Vec::new()
            }
        }
    }

    fn compute(catalogue: &Arc<Catalogue>, movie_id: MovieId, k: usize) -> Result<Vec<MovieRecommendation>> {
        let engine = SimilarityEngine::new(Arc::clone(catalogue));
        let neighbours = engine.recommend(movie_id, k)?;

        Ok(neighbours
            .into_iter()
            .filter_map(|n| {
                let movie = catalogue.get(n.movie_id)?;
                Some(MovieRecommendation {
                    movie_id: n.movie_id,
                    title: movie.title.clone(),
                    genres: movie.genres.clone(),
                    actors: movie.actors.clone(),
                    directors: movie.directors.clone(),
                    distance: n.distance,
                })
            })
            .collect())
    }

    /// Poster URL, or the configured placeholder
    pub fn poster_url(&self, movie_id: MovieId) -> String {
        self.catalogue()
            .poster_of(movie_id, &self.config.default_poster_url)
            .to_string()
    }

    /// Title, or "Unknown Title"
    pub fn title(&self, movie_id: MovieId) -> String {
        self.catalogue().title_of(movie_id).to_string()
    }

    pub fn movie(&self, movie_id: MovieId) -> Option<Movie> {
        self.catalogue().get(movie_id).cloned()
    }

    // ========================================================================
    // Write path
    // ========================================================================

    /// Append a movie to a copy of the catalogue and publish it
    pub fn add_movie(&self, new: NewMovie) -> Result<()> {
        let _writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        let mut catalogue = Catalogue::clone(&self.catalogue());
        catalogue.append_movie(new)?;
        self.publish(catalogue);
        Ok(())
    }

    /// Rebuild vocabularies and vectors on a copy of the catalogue and publish it
    pub fn rebuild_vectors(&self) -> RebuildSummary {
        let _writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        let mut catalogue = Catalogue::clone(&self.catalogue());
        let summary = catalogue.rebuild_vectors();
        self.publish(catalogue);
        summary
    }

    /// Re-read the data file and publish it
    pub fn reload(&self) -> Result<()> {
        let _writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        let catalogue =
            Catalogue::load_from_file(&self.config.movie_data_path, self.config.malformed_records)?;
        self.publish(catalogue);
        Ok(())
    }

    /// Publish an externally built catalogue
    pub fn replace_catalogue(&self, catalogue: Catalogue) {
        let _writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        self.publish(catalogue);
    }

    /// Write the current snapshot to the configured data file
    pub fn save(&self) -> Result<()> {
        let _writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        self.catalogue().save_to_file(&self.config.movie_data_path)?;
        Ok(())
    }

    /// Rebuild after a stale-vector failure, unless another writer already
    /// replaced the snapshot the failure was seen on.
    fn rebuild_if_current(&self, seen_generation: u64) {
        let _writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        let current = self.snapshot();
        if current.generation != seen_generation {
            debug!("Snapshot already replaced, skipping rebuild");
            return;
        }
        let mut catalogue = Catalogue::clone(&current.catalogue);
        catalogue.rebuild_vectors();
        self.publish(catalogue);
    }

    /// Swap in a new catalogue. Callers hold the writer lock.
    fn publish(&self, catalogue: Catalogue) {
        let size = catalogue.len();
        let mut snapshot = self
            .snapshot
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let generation = self.cache.invalidate();
        *snapshot = Snapshot {
            catalogue: Arc::new(catalogue),
            generation,
        };
        info!("Published catalogue generation {} ({} movies)", generation, size);
    }
}
