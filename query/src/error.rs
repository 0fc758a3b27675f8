use serde_json::Value;

/// An error object raised by a remote function.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{message}")]
pub struct ServerError {
    /// Human readable message.
    pub message: String,
    /// Structured payload attached by the function, if any.
    pub data: Option<Value>,
}

impl ServerError {
    /// Creates a server error without a payload.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            data: None,
        }
    }

    /// Attaches a structured payload.
    pub fn with_data(self, data: Value) -> Self {
        Self {
            data: Some(data),
            ..self
        }
    }
}

/// Errors surfaced by queries and mutations.
///
/// `Clone + PartialEq` so it can be held inside signals and memos.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Error {
    /// The remote function raised an error object.
    #[error(transparent)]
    Server(#[from] ServerError),
    /// The remote function failed with something that was not an error object.
    #[error("Unknown error")]
    Unknown,
    /// Arguments could not be encoded as JSON.
    #[error("failed to encode arguments: {0}")]
    Encode(String),
    /// The returned value did not match the expected type.
    #[error("failed to decode result: {0}")]
    Decode(String),
}

impl Error {
    /// The server error, if this is one.
    pub fn server_error(&self) -> Option<&ServerError> {
        match self {
            Error::Server(error) => Some(error),
            _ => None,
        }
    }

    pub(crate) fn encode(error: serde_json::Error) -> Self {
        Error::Encode(error.to_string())
    }

    pub(crate) fn decode(error: serde_json::Error) -> Self {
        Error::Decode(error.to_string())
    }
}
