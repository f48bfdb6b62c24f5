use std::any::Any;
use thiserror::Error;

use crate::extractor::ExtractError;
use crate::fetcher::FetchError;
use crate::urls::SourceError;

/// Wiring errors; the only failures `Pipeline::run` reports.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PipelineError {
    #[error("invalid pipeline spec: {0}")]
    InvalidSpec(String),
}

#[derive(Error, Debug)]
pub enum ProcessError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Extract(#[from] ExtractError),
}

impl ProcessError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Fetch(err) if err.is_cancelled())
    }
}

/// Failure taxonomy reported to observers. Cancellation is never a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// First-stage producer failed.
    Source,
    /// A later stage failed on one input URL.
    Fetch,
    /// A filter errored instead of answering.
    Filter,
    /// Title or text extraction failed for one article.
    Extract,
    /// Persisting one article failed.
    Store,
    /// An adapter panicked on one input. The worker keeps going.
    Panic,
}

impl ErrorKind {
    pub fn of_source(err: &SourceError, first_stage: bool) -> Self {
        if err.is_filter() {
            Self::Filter
        } else if first_stage {
            Self::Source
        } else {
            Self::Fetch
        }
    }

    pub fn of_process(err: &ProcessError) -> Self {
        match err {
            ProcessError::Fetch(_) => Self::Fetch,
            ProcessError::Extract(_) => Self::Extract,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Source => "source",
            Self::Fetch => "fetch",
            Self::Filter => "filter",
            Self::Extract => "extract",
            Self::Store => "store",
            Self::Panic => "panic",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Message carried by a caught panic payload.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        format!("panicked: {message}")
    } else if let Some(message) = payload.downcast_ref::<String>() {
        format!("panicked: {message}")
    } else {
        "panicked".to_string()
    }
}
