//! Server crate for the CineSphere similarity engine.
//!
//! This crate contains the service facade that the presentation layer (and
//! the `cinesphere` CLI) use: configuration, the result cache, and the
//! snapshot-swapping recommendation service.

pub mod cache;
pub mod config;
pub mod error;
pub mod service;

pub use cache::{CacheStats, RecommendationCache};
pub use config::Config;
pub use error::{Result, ServiceError};
pub use service::{MovieRecommendation, RecommendationService};
