use thiserror::Error as ThisError;

#[derive(ThisError, Debug)]
pub enum Error {
    #[error("Persistence error: {0}")]
    Persistence(#[from] sea_orm::DbErr),

    #[error("Already tracked: {0}")]
    Duplicate(String),

    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("Unexpected response format: {0}")]
    Format(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, Error>;
