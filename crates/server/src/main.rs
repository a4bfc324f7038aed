//! Test harness for the recommendation service.
//!
//! Loads the catalogue named by the environment (or `.env`), then fires a
//! batch of concurrent requests for the newest movie through the same facade
//! the presentation layer uses.

use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use server::{Config, RecommendationService};

const CONCURRENT_REQUESTS: usize = 8;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,server=debug,similarity=debug")),
        )
        .init();

    info!("Starting CineSphere service test harness");

    let config = Config::from_env().context("Failed to load configuration")?;
    info!("Loading catalogue from {:?}", config.movie_data_path);
    let service = tokio::task::spawn_blocking(move || RecommendationService::from_config(config))
        .await
        .context("Catalogue load task panicked")?
        .context("Failed to load catalogue")?;
    let service = Arc::new(service);

    let movies = service.list_movies();
    info!("Catalogue ready with {} movies", movies.len());

    let Some((newest, title)) = movies.first().cloned() else {
        warn!("Catalogue is empty, nothing to recommend");
        return Ok(());
    };

    info!(
        "Requesting recommendations for \"{}\" ({}) x{}",
        title, newest, CONCURRENT_REQUESTS
    );
    let start = Instant::now();
    let handles: Vec<_> = (0..CONCURRENT_REQUESTS)
        .map(|_| {
            let service = Arc::clone(&service);
            tokio::task::spawn_blocking(move || service.recommend_default(newest))
        })
        .collect();

    let mut last = Vec::new();
    for handle in handles {
        last = handle
            .await
            .context("Recommendation task panicked")?
            .context("Recommendation failed")?;
    }
    info!(
        "Served {} requests in {:.2?}",
        CONCURRENT_REQUESTS,
        start.elapsed()
    );

    for (i, rec) in last.iter().enumerate() {
        info!(
            "{}. {} - distance {:.3}",
            i + 1,
            rec.title,
            rec.distance
        );
        info!("   Genres: {}", rec.genres.join(", "));
        info!("   Poster: {}", service.poster_url(rec.movie_id));
    }

    let stats = service.cache_stats();
    info!(
        "Cache: {} hits, {} misses, {}/{} entries",
        stats.hits, stats.misses, stats.entries, stats.capacity
    );

    Ok(())
}
