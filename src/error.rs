use thiserror::Error;

/// Structural pipeline failures. Anything here is fatal for the whole
/// document: the caller gets no partial output.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// The input buffer is not a well-formed container of the expected
    /// format (bad zip, missing mandatory part, unparseable XML).
    #[error("invalid container: {0}")]
    InvalidContainer(String),

    /// A translated location handle no longer resolves inside the document
    /// model. This is a contract violation between extract and apply.
    #[error("rewrite failed: {0}")]
    Rewrite(String),

    /// The mutated model could not be written back to its container format.
    #[error("serialization failed: {0}")]
    Serialization(String),
}

/// Failures of a single translation call. These never propagate to the
/// pipeline caller: the chunk executor absorbs them via the unit-level
/// fallback, and a unit that fails even there keeps its source text.
#[derive(Error, Debug)]
pub enum ClientError {
    #[error("translation request failed: {0}")]
    Request(String),

    #[error("translation API responded with status {status}: {message}")]
    Api { status: u16, message: String },

    /// The model reply did not parse as a JSON array of strings with the
    /// same length as the input batch.
    #[error("malformed batch response: {0}")]
    MalformedResponse(String),
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        Self::Request(err.to_string())
    }
}
