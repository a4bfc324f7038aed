use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use data_loader::{Catalogue, MovieId, NewMovie};
use server::{Config, MovieRecommendation, RecommendationService};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tracing::debug;

/// CineSphere - "more like this" movie recommendations
#[derive(Parser)]
#[command(name = "cinesphere")]
#[command(about = "Content-based movie similarity engine", long_about = None)]
struct Cli {
    /// Path to the movie data file (overrides MOVIE_DATA_PATH)
    #[arg(short, long, global = true)]
    data_path: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List movies, newest first
    List {
        #[arg(long, default_value = "20")]
        limit: usize,
    },

    /// Recommend movies similar to a given movie
    Recommend {
        #[arg(long)]
        movie_id: MovieId,

        /// Number of recommendations (defaults to NUM_RECOMMENDATIONS)
        #[arg(long)]
        k: Option<usize>,

        /// Print the results as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show the details of one movie
    Show {
        #[arg(long)]
        movie_id: MovieId,
    },

    /// Search for movies by title
    Search {
        /// Movie title to search for (case-insensitive substring match)
        #[arg(long)]
        title: String,
    },

    /// Append a movie to the data file
    Add {
        #[arg(long)]
        id: MovieId,

        #[arg(long)]
        title: String,

        #[arg(long)]
        popularity: f64,

        /// Pipe-separated, e.g. "Action|Drama"
        #[arg(long, default_value = "")]
        genres: String,

        /// Pipe-separated; only the first three are kept
        #[arg(long, default_value = "")]
        actors: String,

        /// Pipe-separated
        #[arg(long, default_value = "")]
        directors: String,

        #[arg(long)]
        poster: Option<String>,
    },

    /// Rebuild vocabularies and binary vectors, then save the data file
    Rebuild,

    /// Run benchmark to test performance
    Benchmark {
        /// Number of requests to make
        #[arg(long, default_value = "100")]
        requests: usize,

        /// Number of concurrent requests
        #[arg(long, default_value = "10")]
        concurrent: usize,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();

    let mut config = Config::from_env().context("Failed to load configuration")?;
    if let Some(path) = cli.data_path {
        config.movie_data_path = path;
    }

    println!("Loading catalogue from {}...", config.movie_data_path.display());
    let start = Instant::now();
    let service = Arc::new(
        RecommendationService::from_config(config).context("Failed to load movie catalogue")?,
    );
    println!(
        "{} Loaded {} movies in {:?}",
        "✓".green(),
        service.catalogue().len(),
        start.elapsed()
    );

    match cli.command {
        Commands::List { limit } => handle_list(&service, limit),
        Commands::Recommend { movie_id, k, json } => handle_recommend(&service, movie_id, k, json)?,
        Commands::Show { movie_id } => handle_show(&service, movie_id)?,
        Commands::Search { title } => handle_search(&service, &title),
        Commands::Add {
            id,
            title,
            popularity,
            genres,
            actors,
            directors,
            poster,
        } => {
            let movie = NewMovie {
                id,
                title,
                popularity,
                poster,
                genres: split_list(&genres),
                actors: split_list(&actors),
                directors: split_list(&directors),
            };
            handle_add(&service, movie)?
        }
        Commands::Rebuild => handle_rebuild(&service)?,
        Commands::Benchmark {
            requests,
            concurrent,
        } => handle_benchmark(service, requests, concurrent).await?,
    }

    Ok(())
}

/// Split a pipe-separated argument, dropping empty items
fn split_list(value: &str) -> Vec<String> {
    value
        .split('|')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

/// Handle the 'list' command
fn handle_list(service: &RecommendationService, limit: usize) {
    let movies = service.list_movies();
    println!("{}", format!("Movies ({} total):", movies.len()).bold().blue());
    for (id, title) in movies.iter().take(limit) {
        println!("  {:>8}  {}", id.to_string().cyan(), title);
    }
}

/// Handle the 'recommend' command
fn handle_recommend(
    service: &RecommendationService,
    movie_id: MovieId,
    k: Option<usize>,
    json: bool,
) -> Result<()> {
    let k = k.unwrap_or(service.config().num_recommendations);
    let recommendations = service
        .recommend(movie_id, k)
        .with_context(|| format!("Failed to recommend movies like {}", movie_id))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&recommendations)?);
    } else {
        println!(
            "{}",
            format!("Because you liked {}:", service.title(movie_id))
                .bold()
                .blue()
        );
        print_recommendations(&recommendations);
    }
    Ok(())
}

/// Handle the 'show' command
fn handle_show(service: &RecommendationService, movie_id: MovieId) -> Result<()> {
    let movie = service
        .movie(movie_id)
        .ok_or_else(|| anyhow!("Movie {} not found", movie_id))?;

    println!("{}", format!("{} ({})", movie.title, movie.id).bold().blue());
    println!("{}Poster: {}", "• ".green(), service.poster_url(movie_id));
    println!(
        "{}Popularity: {:.2} (normalized {:.3})",
        "• ".green(),
        movie.popularity,
        movie.normalized_popularity
    );
    println!("{}Genres: {}", "• ".cyan(), movie.genres.join(", "));
    println!("{}Cast: {}", "• ".cyan(), movie.actors.join(", "));
    println!("{}Directed by: {}", "• ".cyan(), movie.directors.join(", "));
    Ok(())
}

/// Handle the 'search' command
fn handle_search(service: &RecommendationService, title: &str) {
    let catalogue = service.catalogue();
    let needle = title.to_lowercase();

    // (exact match rank, popularity, id, title)
    let mut matches: Vec<(u8, f64, MovieId, &str)> = catalogue
        .iter()
        .filter_map(|movie| {
            let haystack = movie.title.to_lowercase();
            let rank = if haystack == needle {
                0
            } else if haystack.contains(&needle) {
                1
            } else {
                return None;
            };
            Some((rank, movie.popularity, movie.id, movie.title.as_str()))
        })
        .collect();

    // Exact matches first, then most popular
    matches.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| b.1.total_cmp(&a.1)));

    println!("{}", format!("Search results for '{}':", title).bold().blue());
    if matches.is_empty() {
        println!("  (no matches)");
    }
    for (_, popularity, id, movie_title) in matches.iter().take(20) {
        println!(
            "  {:>8}  {} (popularity {:.1})",
            id.to_string().cyan(),
            movie_title,
            popularity
        );
    }
}

/// Handle the 'add' command
fn handle_add(service: &RecommendationService, movie: NewMovie) -> Result<()> {
    let id = movie.id;
    service
        .add_movie(movie)
        .with_context(|| format!("Failed to add movie {}", id))?;
    service.save().context("Failed to save data file")?;

    println!(
        "{} Added {} ({}) to {}",
        "✓".green(),
        service.title(id),
        id,
        service.config().movie_data_path.display()
    );
    let warnings = vocabulary_warnings(&service.catalogue(), id);
    for warning in &warnings {
        println!("{} {}", "!".yellow(), warning);
    }
    if !warnings.is_empty() {
        println!("  Run `cinesphere rebuild` to re-encode every movie");
    }
    Ok(())
}

/// Why a freshly added movie may not compare the way its lists suggest
fn vocabulary_warnings(catalogue: &Catalogue, id: MovieId) -> Vec<String> {
    let mut warnings = vec![];

    let unknown = catalogue
        .get(id)
        .map(|movie| catalogue.vocabularies().unknown_terms(movie))
        .unwrap_or_default();
    if !unknown.is_empty() {
        let terms = unknown
            .iter()
            .map(|(facet, term)| format!("{} '{}'", facet, term))
            .collect::<Vec<_>>()
            .join(", ");
        warnings.push(format!(
            "Not in the vocabularies yet, ignored for similarity: {}",
            terms
        ));
    }

    let stale = catalogue.stale_movies();
    if !stale.is_empty() {
        warnings.push(format!(
            "{} movies have vectors from an older vocabulary",
            stale.len()
        ));
    }
    warnings
}

/// Handle the 'rebuild' command
fn handle_rebuild(service: &RecommendationService) -> Result<()> {
    let summary = service.rebuild_vectors();
    service.save().context("Failed to save data file")?;

    println!("{} Rebuilt binary vectors", "✓".green());
    println!("{}Genres: {}", "• ".cyan(), summary.genres);
    println!("{}Actors: {}", "• ".cyan(), summary.actors);
    println!("{}Directors: {}", "• ".cyan(), summary.directors);
    Ok(())
}

/// Handle the 'benchmark' command
async fn handle_benchmark(
    service: Arc<RecommendationService>,
    requests: usize,
    concurrent: usize,
) -> Result<()> {
    let ids = service.catalogue().ids().to_vec();
    if ids.is_empty() {
        return Err(anyhow!("Catalogue is empty"));
    }
    let k = service.config().num_recommendations;

    // Random catalogue ids, with repeats so the cache gets exercised
    let movie_ids: Vec<MovieId> = (0..requests)
        .map(|_| ids[rand::random::<u32>() as usize % ids.len()])
        .collect();

    let permits = Arc::new(Semaphore::new(concurrent.max(1)));
    let wall_start = Instant::now();

    let mut handles = vec![];
    for movie_id in movie_ids {
        let service = Arc::clone(&service);
        let permits = Arc::clone(&permits);
        let handle = tokio::spawn(async move {
            let _permit = permits.acquire_owned().await?;
            tokio::task::spawn_blocking(move || {
                let start = Instant::now();
                service.recommend(movie_id, k)?;
                Ok::<_, anyhow::Error>(start.elapsed())
            })
            .await?
        });
        handles.push(handle);
    }

    let mut timings: Vec<Duration> = vec![];
    for handle in handles {
        let elapsed = handle.await??;
        timings.push(elapsed);
    }
    let wall_time = wall_start.elapsed();
    debug!("Collected {} timings", timings.len());

    if timings.is_empty() {
        println!("No requests were made");
        return Ok(());
    }

    let total: Duration = timings.iter().sum();
    let avg_latency = total / (timings.len() as u32);
    timings.sort();
    let percentile = |p: f64| timings[((timings.len() as f64 * p) as usize).min(timings.len() - 1)];
    let throughput = requests as f64 / wall_time.as_secs_f64();
    let stats = service.cache_stats();

    println!("{}", "Benchmark results:".bold().blue());
    println!("Total time: {:?}", wall_time);
    println!("Average latency: {:?}", avg_latency);
    println!("P50 latency: {:?}", percentile(0.50));
    println!("P95 latency: {:?}", percentile(0.95));
    println!("P99 latency: {:?}", percentile(0.99));
    println!("Throughput: {:.2} requests/second", throughput);
    println!(
        "Cache: {} hits, {} misses, {}/{} entries",
        stats.hits, stats.misses, stats.entries, stats.capacity
    );

    Ok(())
}

/// Format and print recommendations
fn print_recommendations(recommendations: &[MovieRecommendation]) {
    if recommendations.is_empty() {
        println!("  (no recommendations)");
    }
    for (i, rec) in recommendations.iter().enumerate() {
        println!(
            "{}. {} [{}] - distance {:.3}",
            (i + 1).to_string().green(),
            rec.title,
            rec.genres.join(", "),
            rec.distance
        );
        if !rec.actors.is_empty() {
            println!("   Cast: {}", rec.actors.join(", "));
        }
        if !rec.directors.is_empty() {
            println!("   Directed by: {}", rec.directors.join(", "));
        }
    }
}
