//! Error types for the RepCoach engine.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("definition '{definition}': duplicate feature name '{name}'")]
    DuplicateFeature { definition: String, name: String },

    #[error("definition '{definition}': duplicate stage name '{name}'")]
    DuplicateStage { definition: String, name: String },

    #[error("definition '{definition}': '{referenced_by}' references unknown feature '{feature}'")]
    UnknownFeature {
        definition: String,
        referenced_by: String,
        feature: String,
    },

    #[error("definition '{definition}': edge from '{from}' targets undeclared stage '{to}'")]
    DanglingEdge {
        definition: String,
        from: String,
        to: String,
    },

    #[error("definition '{definition}': start stage '{start}' is not declared")]
    UnknownStartStage { definition: String, start: String },

    #[error("definition '{definition}': stage '{stage}' is unreachable from '{start}'")]
    UnreachableStage {
        definition: String,
        stage: String,
        start: String,
    },

    #[error("definition '{definition}': feature '{feature}' smoothing window {window} outside 1..=32")]
    InvalidWindow {
        definition: String,
        feature: String,
        window: usize,
    },

    #[error(
        "definition '{definition}': edge from '{from}' on '{feature}' has a confirm threshold looser than its enter threshold"
    )]
    InvalidConfirm {
        definition: String,
        from: String,
        feature: String,
    },

    #[error("definition '{definition}': hold duration must be positive, got {hold_ms}ms")]
    InvalidHold { definition: String, hold_ms: i64 },

    #[error("definition '{definition}': negative rep debounce {interval_ms}ms")]
    InvalidDebounce { definition: String, interval_ms: i64 },

    #[error("unknown exercise '{0}'")]
    UnknownExercise(String),

    #[error("unknown session {0}")]
    UnknownSession(crate::types::SessionId),

    #[error("catalog error: {0}")]
    Catalog(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}
