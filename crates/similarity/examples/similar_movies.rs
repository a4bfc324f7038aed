//! Example: Find movies similar to a given title
//!
//! Run with: cargo run --example similar_movies -p similarity -- <movie_id>
//!
//! Reads the catalogue from data/movie_data.dat.

use data_loader::{Catalogue, MalformedPolicy};
use similarity::SimilarityEngine;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter("info,similarity=debug")
        .init();

    let movie_id: u32 = std::env::args()
        .nth(1)
        .map(|s| s.parse())
        .transpose()?
        .unwrap_or(19995);

    println!("=== Similar Movies Demo ===\n");

    let start = Instant::now();
    let mut catalogue =
        Catalogue::load_from_file(Path::new("data/movie_data.dat"), MalformedPolicy::Skip)?;
    if !catalogue.stale_movies().is_empty() {
        catalogue.rebuild_vectors();
    }
    println!("Loaded {} movies in {:?}\n", catalogue.len(), start.elapsed());

    let engine = SimilarityEngine::new(Arc::new(catalogue));
    let catalogue = engine.catalogue();

    println!("Because you watched {}:", catalogue.title_of(movie_id));
    let start = Instant::now();
    let neighbours = engine.recommend(movie_id, 10)?;
    let elapsed = start.elapsed();

    for (rank, neighbour) in neighbours.iter().enumerate() {
        let parts = engine.explain(movie_id, neighbour.movie_id)?;
        println!(
            "  {:2}. {:<40} distance {:.3} (genre {:.2}, cast {:.2}, director {:.2}, popularity {:.2})",
            rank + 1,
            catalogue.title_of(neighbour.movie_id),
            neighbour.distance,
            parts.genre,
            parts.actor,
            parts.director,
            parts.popularity
        );
    }
    println!("\nQuery time: {:?}", elapsed);

    Ok(())
}
