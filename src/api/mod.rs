//! Caller-facing entry points. Each one runs an export and folds the result
//! into an [`ExportResponse`] envelope instead of returning an error.

pub mod customexport;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domains::export::types::{ExportOutcome, ExportResult};

/// Result envelope of an entry point
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportResponse {
    pub is_error: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub values: Option<Value>,
}

impl ExportResponse {
    pub fn success(values: Value) -> Self {
        Self {
            is_error: false,
            message: None,
            error_code: None,
            values: Some(values),
        }
    }

    /// Error envelope; an empty `message` is replaced by `default_message`
    pub fn error(message: impl Into<String>, error_code: &str, default_message: &str) -> Self {
        let message = message.into();
        let message = if message.trim().is_empty() {
            default_message.to_string()
        } else {
            message
        };
        Self {
            is_error: true,
            message: Some(message),
            error_code: Some(error_code.to_string()),
            values: None,
        }
    }

    pub fn from_result(result: ExportResult<ExportOutcome>, default_message: &str) -> Self {
        match result {
            Ok(outcome) => match serde_json::to_value(&outcome) {
                Ok(values) => Self::success(values),
                Err(e) => Self::error(format!("Failed to serialize export outcome: {}", e), "internal_error", default_message),
            },
            Err(e) => {
                log::error!("Export failed: {}", e);
                Self::error(e.to_string(), e.error_code(), default_message)
            }
        }
    }
}
