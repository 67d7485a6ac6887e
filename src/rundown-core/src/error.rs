//! Error types for the narration pipeline.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum RundownError {
    /// Generation or voice service unreachable, timed out, or returned
    /// a non-success status.
    #[error("service unavailable: {0}")]
    ServiceUnavailable(String),

    /// The service replied, but the reply could not be parsed into any
    /// recognizable structure.
    #[error("malformed service response: {0}")]
    MalformedResponse(String),

    /// A required external tool or engine is absent. Fatal only at the
    /// point it is actually needed.
    #[error("missing prerequisite: {0}")]
    MissingPrerequisite(String),

    /// A generated script failed its post-fallback invariants. The
    /// fallback path is defined to never produce this; observing it is a
    /// defect, not a recoverable condition.
    #[error("structural violation in generated script: {0}")]
    StructuralViolation(String),

    #[error("OpenAI API error: {0}")]
    OpenAIError(#[from] async_openai::error::OpenAIError),

    #[error("audio error: {0}")]
    AudioError(String),

    #[error("configuration error: {0}")]
    ConfigError(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// A fatal failure wrapped with the phase it occurred in, for the
    /// orchestrator's abort report.
    #[error("phase '{phase}' failed for document '{document}': {source}")]
    Phase {
        document: String,
        phase: &'static str,
        #[source]
        source: Box<RundownError>,
    },
}

impl RundownError {
    /// Wrap an error with phase context for the orchestrator's report.
    pub fn in_phase(self, document: impl Into<String>, phase: &'static str) -> Self {
        RundownError::Phase {
            document: document.into(),
            phase,
            source: Box::new(self),
        }
    }
}
