//! Errores de validación del mensaje en el borde (template / evento).

use thiserror::Error;

#[derive(Debug, Error)]
pub enum MessageError {
    #[error("invalid message shape: {0}")]
    InvalidShape(String),
    #[error("missing required field: {0}")]
    MissingField(&'static str),
}

impl From<serde_json::Error> for MessageError {
    fn from(err: serde_json::Error) -> Self {
        Self::InvalidShape(err.to_string())
    }
}
