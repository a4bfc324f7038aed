use data_loader::{Catalogue, MalformedPolicy};
use std::path::Path;
use std::time::Instant;

fn main() {
    let path = Path::new("data/movie_data.dat");

    println!("Loading movie catalogue...\n");

    let start = Instant::now();
    let mut catalogue = Catalogue::load_from_file(path, MalformedPolicy::Skip)
        .expect("Failed to load catalogue");
    let elapsed = start.elapsed();

    let rebuild_start = Instant::now();
    let summary = catalogue.rebuild_vectors();
    let rebuild_elapsed = rebuild_start.elapsed();

    println!("\n=== Load Complete ===");
    println!("Time taken: {:?}", elapsed);
    println!("Movies: {}", catalogue.len());
    println!("Genres: {}", summary.genres);
    println!("Actors: {}", summary.actors);
    println!("Directors: {}", summary.directors);
    println!("Vector rebuild: {:?}", rebuild_elapsed);
    println!("\nPerformance: {:.0} movies/second",
             catalogue.len() as f64 / elapsed.as_secs_f64());
}
