//! Error type for the recommendation service.

use data_loader::DataLoadError;
use similarity::SimilarityError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error(transparent)]
    Data(#[from] DataLoadError),

    #[error(transparent)]
    Similarity(#[from] SimilarityError),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, ServiceError>;
