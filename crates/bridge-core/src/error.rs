//! Error taxonomy for the summary pipeline
//!
//! Two layers with different propagation rules: retrieval-layer errors
//! ([`EmbeddingError`], [`StoreError`]) are recovered inside the retriever and
//! never reach a caller; generation-layer errors ([`StreamFailure`]) always
//! surface as the terminal state of the affected stream and nowhere else.

use thiserror::Error;

/// Errors visible at the pipeline boundary.
#[derive(Debug, Error)]
pub enum SummarizeError {
    /// A required input was missing or blank. Raised before any pipeline
    /// work begins; no network call is attempted.
    #[error("invalid request: {0}")]
    InvalidRequest(&'static str),

    /// A stream reached its failure terminal while being drained on the
    /// caller's behalf (the non-streaming `summarize_one` path).
    #[error(transparent)]
    Stream(#[from] StreamFailure),
}

/// Terminal failure of a single summary stream.
///
/// Affects only the stream that carries it; sibling role streams keep
/// running. Cloneable so the aggregate result can hold it per role.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StreamFailure {
    /// The generation credential is absent from configuration. Every role
    /// pipeline that needs it fails independently with this cause.
    #[error("generation credential is not configured")]
    ConfigurationMissing,

    /// Generation failed after being attempted: rejected credential, quota,
    /// transport failure, or a malformed model response mid-stream.
    #[error("generation failed: {0}")]
    GenerationFailed(String),
}

/// Failure inside a generation provider. Converted into [`StreamFailure`]
/// by the task that owns the stream.
#[derive(Debug, Error)]
pub enum GenerateError {
    #[error("generation credential is not configured")]
    MissingCredential,
    #[error("{0}")]
    Failed(String),
}

impl From<GenerateError> for StreamFailure {
    fn from(err: GenerateError) -> Self {
        match err {
            GenerateError::MissingCredential => StreamFailure::ConfigurationMissing,
            GenerateError::Failed(message) => StreamFailure::GenerationFailed(message),
        }
    }
}

/// The embedding endpoint was unreachable or returned a malformed response.
/// Recovered inside the retriever; callers observe an empty context instead.
#[derive(Debug, Error)]
#[error("embedding unavailable: {0}")]
pub struct EmbeddingError(pub String);

/// The vector store rejected or failed a similarity query. Recovered inside
/// the retriever the same way as [`EmbeddingError`].
#[derive(Debug, Error)]
#[error("vector store query failed: {0}")]
pub struct StoreError(pub String);
