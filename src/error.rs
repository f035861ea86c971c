//! Error types for `promptrag`.

use thiserror::Error;

use crate::prompt::errors::{PlaceholderNotExist, UnfilledPlaceholders};

/// Errors surfaced by retrieval-augmented answering, signatures and LLM configuration.
#[derive(Debug, Error)]
pub enum RagError {
    /// The question failed validation. Raised before any generation call.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The generation capability returned empty or all-whitespace text.
    #[error("the generation returned an empty answer")]
    EmptyGeneration,

    /// Any failure of the generation capability after it reached the LLM, passed through unchanged.
    #[error(transparent)]
    Generation(anyhow::Error),

    /// A signature string could not be parsed.
    #[error("invalid signature: {0}")]
    Signature(String),

    /// A prediction was called without a value for one of its input fields.
    #[error("missing value for input field `{0}`")]
    MissingInput(String),

    /// The LLM reply did not contain one of the declared output fields.
    #[error("missing output field `{0}` in the reply")]
    MissingOutputField(String),

    /// Neither Azure OpenAI nor OpenAI credentials are set.
    #[error("no LLM credentials found, set AZURE_OPENAI_API_KEY and AZURE_OPENAI_ENDPOINT, or OPENAI_API_KEY")]
    MissingCredentials,

    /// A configuration value is malformed.
    #[error("configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    UnfilledPlaceholders(#[from] UnfilledPlaceholders),

    #[error(transparent)]
    PlaceholderNotExist(#[from] PlaceholderNotExist),
}

impl RagError {
    /// Whether the error was raised before the LLM was called.
    ///
    /// Errors a generator reports as a [RagError] of this kind, such as a missing input of a signature, keep their
    /// variant through [RagError::from_generation]. Any other generator failure counts as after the call.
    pub fn is_before_generation(&self) -> bool {
        !matches!(self, RagError::EmptyGeneration | RagError::Generation(_) | RagError::MissingOutputField(_))
    }

    /// Classify a failure of the generation capability.
    pub fn from_generation(error: anyhow::Error) -> Self {
        match error.downcast::<RagError>() {
            Ok(e) if e.is_before_generation() => e,
            Ok(e) => RagError::Generation(e.into()),
            Err(e) => RagError::Generation(e),
        }
    }
}

/// A convenience result type for `promptrag` operations.
pub type Result<T> = std::result::Result<T, RagError>;
