use thiserror::Error;

#[derive(Error, Debug)]
pub enum ModelError {
    #[error("Malformed dataset: {0}")]
    Dataset(String),

    #[error("Malformed fold file: {0}")]
    Folds(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Training set is empty")]
    EmptyTrainingSet,

    #[error("No samples recorded yet; call run() first")]
    NoSamples,

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerdeError(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ModelError>;
