//! Unified error type for the timer, the record store and the alarm.
//! None of these are fatal: callers show, log, or fall back.

use std::io;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FlowError {
    /// Bad user input: empty task name, unparsable break length, or an
    /// operation requested in the wrong timer state.
    #[error("{0}")]
    Validation(String),

    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("Playback error: {0}")]
    Playback(String),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Export error: {0}")]
    Export(#[from] csv::Error),
}

impl FlowError {
    pub fn is_validation(&self) -> bool {
        matches!(self, FlowError::Validation(_))
    }
}

pub type FlowResult<T> = Result<T, FlowError>;
