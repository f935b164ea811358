use thiserror::Error;

/// Failures of the alignment engine and the pipeline, tagged by the stage
/// that raised them.
#[derive(Error, Debug)]
pub enum SwalnError {
    #[error("Scoring lookup: residue '{residue}' at position {position} of {seq} is not in the scoring table")]
    UnknownResidue {
        residue: char,
        position: usize,
        seq: String,
    },

    #[error("Scoring table: {message}")]
    Matrix { message: String },

    #[error("Configuration: {message}")]
    Config { message: String },

    #[error("Job source: {message}")]
    JobSource { message: String },

    #[error("Batch commit #{batch} ({rows} rows): {message}")]
    Commit {
        batch: usize,
        rows: usize,
        message: String,
    },

    #[error("Pipeline: {message}")]
    Pipeline { message: String },

    #[error("I/O: {0}")]
    Io(#[from] std::io::Error),
}

impl SwalnError {
    pub fn matrix<S: Into<String>>(message: S) -> Self {
        Self::Matrix {
            message: message.into(),
        }
    }

    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    pub fn job_source<S: Into<String>>(message: S) -> Self {
        Self::JobSource {
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, SwalnError>;
