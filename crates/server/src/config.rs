use crate::error::{Result, ServiceError};
use data_loader::MalformedPolicy;
use serde::{Deserialize, Deserializer};
use std::path::PathBuf;

/// Service configuration loaded from environment variables
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct Config {
    /// How many recommendations `recommend_default` returns
    #[serde(default = "default_num_recommendations")]
    pub num_recommendations: usize,

    /// Location of the catalogue data file
    #[serde(default = "default_movie_data_path")]
    pub movie_data_path: PathBuf,

    /// Poster shown when a movie has none or is unknown
    #[serde(default = "default_poster_url")]
    pub default_poster_url: String,

    #[serde(default = "default_true", deserialize_with = "flag")]
    pub enable_cache: bool,

    /// Maximum number of cached `(movie, k)` results
    #[serde(default = "default_max_cache_size")]
    pub max_cache_size: usize,

    /// `abort` fails the load on a bad row, `skip` drops it with a warning
    #[serde(default)]
    pub malformed_records: MalformedPolicy,

    /// Rebuild vectors and retry once when a query hits stale vectors
    #[serde(default = "default_true", deserialize_with = "flag")]
    pub rebuild_on_stale: bool,
}

fn default_num_recommendations() -> usize {
    5
}

fn default_movie_data_path() -> PathBuf {
    PathBuf::from("data/movie_data.dat")
}

fn default_poster_url() -> String {
    "https://via.placeholder.com/250x375?text=No+Poster".to_string()
}

fn default_true() -> bool {
    true
}

fn default_max_cache_size() -> usize {
    1000
}

/// On/off switch: `true` in any case is on, every other value is off
///
/// Rust concept: `deserialize_with` swaps in a custom parser for one field
/// while the rest of the struct keeps the derived behaviour.
fn flag<'de, D>(deserializer: D) -> std::result::Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let value = String::deserialize(deserializer)?;
    Ok(value.trim().eq_ignore_ascii_case("true"))
}

impl Default for Config {
    fn default() -> Self {
        Self {
            num_recommendations: default_num_recommendations(),
            movie_data_path: default_movie_data_path(),
            default_poster_url: default_poster_url(),
            enable_cache: true,
            max_cache_size: default_max_cache_size(),
            malformed_records: MalformedPolicy::default(),
            rebuild_on_stale: true,
        }
    }
}

impl Config {
    /// Load configuration from environment variables (and `.env` if present)
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        envy::from_env::<Config>().map_err(|e| ServiceError::Config(e.to_string()))
    }

    /// Load configuration from explicit key/value pairs
    pub fn from_vars<I>(vars: I) -> Result<Self>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        envy::from_iter::<_, Config>(vars).map_err(|e| ServiceError::Config(e.to_string()))
    }

    /// Effective cache capacity; 0 means caching is off
    pub fn cache_capacity(&self) -> usize {
        if self.enable_cache {
            self.max_cache_size
        } else {
            0
        }
    }
}
