use std::io;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SimError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Config error: {0}")]
    InvalidConfig(String),

    #[error("Numeric divergence: {0}")]
    NumericDivergence(String),

    #[error("Crash: {0}")]
    Crash(String),

    #[error("Unknown engine type: {0}")]
    UnknownEngineType(String),

    #[error("Unknown gear type: {0}")]
    UnknownGearType(String),

    #[error("Property error: {0}")]
    PropertyError(String),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_yaml::Error),

    #[error("Output error: {0}")]
    OutputError(#[from] serde_json::Error),
}
