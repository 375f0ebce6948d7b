//! Error types for talking to the chat service.

use thiserror::Error;

/// Banner text shown for any failure that is not reported by the server itself.
pub const CONNECT_FAILURE: &str = "Failed to connect to server";

/// Errors that can occur while calling the chat service.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The service answered with `success: false`.
    #[error("{0}")]
    Server(String),

    /// Network failure or an HTTP client error.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The response body was not the JSON we expected.
    #[error("Invalid response body: {0}")]
    Decode(#[from] serde_json::Error),

    /// The service reported success but left out a required field.
    #[error("Response missing field `{0}`")]
    MissingField(&'static str),
}

impl ClientError {
    /// Text to show the user.
    ///
    /// Server-reported errors are shown verbatim; everything else collapses
    /// into the generic connection message.
    pub fn user_message(&self) -> String {
        match self {
            ClientError::Server(message) => message.clone(),
            _ => CONNECT_FAILURE.to_string(),
        }
    }

    pub fn is_server_reported(&self) -> bool {
        matches!(self, ClientError::Server(_))
    }
}
