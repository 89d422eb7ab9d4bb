use crate::calc::record::RecordKey;
use serde::Serialize;
use thiserror::Error;

/// One rejected field of a submission, addressed by its JSON path
/// (e.g. `formative[2].score`).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("submission rejected: {} invalid field(s)", .0.len())]
    Validation(Vec<FieldError>),

    #[error("record key mismatch: existing {existing}, incoming {incoming}")]
    InconsistentKey {
        existing: Box<RecordKey>,
        incoming: Box<RecordKey>,
    },
}

impl EngineError {
    pub fn code(&self) -> &'static str {
        match self {
            EngineError::Validation(_) => "validation_failed",
            EngineError::InconsistentKey { .. } => "inconsistent_key",
        }
    }
}

/// Failure of a whole submit cycle: load existing, merge, store.
#[derive(Error, Debug)]
pub enum SubmitError {
    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error("storage error: {0}")]
    Storage(#[from] anyhow::Error),
}

impl SubmitError {
    pub fn code(&self) -> &'static str {
        match self {
            SubmitError::Engine(e) => e.code(),
            SubmitError::Storage(_) => "db_update_failed",
        }
    }

    pub fn details(&self) -> Option<serde_json::Value> {
        match self {
            SubmitError::Engine(EngineError::Validation(fields)) => {
                Some(serde_json::json!({ "fields": fields }))
            }
            SubmitError::Engine(EngineError::InconsistentKey { existing, incoming }) => {
                Some(serde_json::json!({ "existing": existing, "incoming": incoming }))
            }
            SubmitError::Storage(_) => None,
        }
    }
}
