// src/error.rs

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SchedError {

    #[error("Configuration error: {message}")]
    InvalidConfig {
        message: String,
    },

    #[error("Workers disagree on {what}: {message}")]
    ConfigMismatch {
        what: String,
        message: String,
    },

    #[error("Worker {worker} pipeline error: {message}")]
    Pipeline {
        worker: usize,
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

pub type Result<T> = std::result::Result<T, SchedError>;

// Convenience constructors
impl SchedError {

    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }

    pub fn mismatch(what: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConfigMismatch {
            what: what.into(),
            message: message.into(),
        }
    }

    pub fn pipeline(worker: usize, message: impl Into<String>) -> Self {
        Self::Pipeline {
            worker,
            message: message.into(),
            source: None,
        }
    }

    pub fn pipeline_with_source(
        worker: usize,
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Pipeline {
            worker,
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }
}
