//! Error types for page-replica.
//!
//! This module defines the error types returned by extraction jobs. Only a
//! few of them ever reach the caller: every stage after `loading` isolates its
//! own failures and records them as warnings instead.

use std::path::PathBuf;
use std::time::Duration;

/// Error type for extraction jobs.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Navigation did not finish before the load timeout.
    ///
    /// Tolerated: the job continues with whatever DOM has loaded.
    #[error("Navigation to {url} timed out after {timeout_ms} ms")]
    NavigationTimeout {
        /// URL being loaded.
        url: String,
        /// Timeout that elapsed.
        timeout_ms: u64,
    },

    /// A selector matched nothing where a match was required.
    ///
    /// Tolerated: the sub-extractor yields an empty result.
    #[error("Selector matched nothing: {0}")]
    SelectorNotFound(String),

    /// A sub-extractor failed.
    ///
    /// Caught per stage, logged, and never propagated.
    #[error("Extraction failed in {stage}: {message}")]
    ExtractionFailure {
        /// Pipeline stage that failed.
        stage: &'static str,
        /// Failure detail.
        message: String,
    },

    /// An artifact could not be written. Fatal.
    #[error("Failed to write {path}: {source}")]
    WriteFailure {
        /// Artifact path.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The browser session died or could not be started. Fatal.
    #[error("Browser session crashed: {0}")]
    SessionCrash(String),

    /// The job-level timeout guard fired. Fatal; partial output is discarded.
    #[error("Extraction job exceeded {0:?}")]
    JobTimeout(Duration),

    /// The slug cannot be used as a file basename.
    #[error("Invalid slug: {0:?}")]
    InvalidSlug(String),

    /// The URL is not an absolute http(s) URL.
    #[error("Invalid URL: {0:?}")]
    InvalidUrl(String),

    /// An object store key is empty or escapes the store root.
    #[error("Invalid object key: {0:?}")]
    InvalidObjectKey(String),
}

impl Error {
    /// Whether this error must end the job.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::WriteFailure { .. }
                | Self::SessionCrash(_)
                | Self::JobTimeout(_)
                | Self::InvalidSlug(_)
                | Self::InvalidUrl(_)
                | Self::InvalidObjectKey(_)
        )
    }

    pub(crate) fn extraction(stage: &'static str, message: impl Into<String>) -> Self {
        Self::ExtractionFailure {
            stage,
            message: message.into(),
        }
    }
}

/// Result type alias for extraction operations.
pub type Result<T> = std::result::Result<T, Error>;
