//! Typed errors for the resolution pipeline.
//!
//! Uses `thiserror` for library errors (not `anyhow`) to provide
//! strongly-typed, composable error handling.
//!
//! Most failure modes here are per-entity and non-fatal: a failed document
//! fetch or synthesis call degrades that one entity's record and is counted
//! in the run report. The only fatal condition is total unavailability of
//! the upstream filing source.

use thiserror::Error;

/// Errors that can occur during pipeline operations.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The filing listing source is unreachable. Fatal to the ingest
    /// stage; partial output is preserved.
    #[error("filing source unavailable: {0}")]
    SourceUnavailable(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// A single document could not be fetched. Non-fatal; recorded for
    /// later retry.
    #[error("document fetch failed: {locator}")]
    FetchFailed {
        locator: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Text extraction failed for a document. Non-fatal; the field stays
    /// empty.
    #[error("text extraction failed: {filename}")]
    ExtractionFailed { filename: String },

    /// The synthesis collaborator returned a value outside the enrichment
    /// schema. The value is coerced to Unknown; this error only surfaces
    /// when the candidate cannot be parsed at all.
    #[error("synthesis returned invalid candidate: {reason}")]
    SynthesisInvalid { reason: String },

    /// The synthesis collaborator timed out or errored. The entity's
    /// enrichment stays undetermined.
    #[error("synthesis unavailable: {0}")]
    SynthesisUnavailable(String),

    /// Web search failed for an entity. Treated like empty results.
    #[error("web search failed: {0}")]
    SearchFailed(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// Storage operation failed.
    #[error("storage error: {0}")]
    Storage(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// HTTP transport error.
    #[error("HTTP error: {0}")]
    Http(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// Operation was cancelled.
    #[error("operation cancelled")]
    Cancelled,

    /// JSON parsing error.
    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),

    /// Configuration error.
    #[error("config error: {0}")]
    Config(String),
}

impl PipelineError {
    /// Whether this failure should abort the whole run.
    ///
    /// Everything except source unavailability and explicit cancellation
    /// degrades a single entity and lets the run continue.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            PipelineError::SourceUnavailable(_) | PipelineError::Cancelled
        )
    }
}

/// Result type alias for pipeline operations.
pub type Result<T> = std::result::Result<T, PipelineError>;
