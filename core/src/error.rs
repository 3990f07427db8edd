//! Error types for the Kirini API client.
//!
//! # Design
//! `ApiError` covers everything the request core can fail with: no response
//! at all (`Network`), a non-2xx status (`Http`), or a body that claimed to
//! be JSON but was not (`Decode`). Each variant renders a message that can be
//! shown to a user as-is.
//!
//! `ValidationError` is different: façade methods that check an identifier
//! before touching the network hand it back inside `Validated::Invalid`
//! instead of failing the call. Callers written against the site's pages
//! branch on that shape, so the two classes stay separate.

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::token::StorageError;

/// Errors returned by `ApiClient` and the service façades.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The transport could not obtain a response (DNS, refused, reset).
    #[error("network error: {message}")]
    Network { message: String },

    /// The server answered with a status outside 200..300.
    ///
    /// `data` is the parsed JSON error body, or a
    /// `{"message", "details"}` object built from the raw text.
    #[error("{message}")]
    Http {
        status: u16,
        message: String,
        data: Value,
        raw_body: String,
    },

    /// A success response declared JSON but the body did not decode, or
    /// decoded into the wrong shape.
    #[error("{message}")]
    Decode { message: String, raw_body: String },

    /// The request payload could not be encoded.
    #[error("serialization failed: {0}")]
    Serialization(String),

    /// The board has no endpoint for this operation.
    #[error("Unsupported board type for {operation}: {board}")]
    UnsupportedBoard {
        operation: &'static str,
        board: String,
    },

    /// Reading or writing the stored token failed.
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl ApiError {
    /// HTTP status, when a response was received.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Parsed error body of an `Http` error.
    pub fn data(&self) -> Option<&Value> {
        match self {
            ApiError::Http { data, .. } => Some(data),
            _ => None,
        }
    }

    pub fn is_network(&self) -> bool {
        matches!(self, ApiError::Network { .. })
    }
}

impl From<crate::transport::TransportError> for ApiError {
    fn from(err: crate::transport::TransportError) -> Self {
        ApiError::Network {
            message: err.to_string(),
        }
    }
}

/// Client-side rejection of caller input, produced before any request.
///
/// Serializes as `{"status": "error", "message": ...}`, the shape the
/// pages already render.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Error)]
#[error("{message}")]
pub struct ValidationError {
    pub status: &'static str,
    pub message: String,
}

impl ValidationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            status: "error",
            message: message.into(),
        }
    }
}

/// Outcome of a façade call that validates its input locally.
#[derive(Debug, Clone, PartialEq)]
pub enum Validated<T> {
    Valid(T),
    Invalid(ValidationError),
}

impl<T> Validated<T> {
    pub fn is_invalid(&self) -> bool {
        matches!(self, Validated::Invalid(_))
    }

    pub fn into_result(self) -> Result<T, ValidationError> {
        match self {
            Validated::Valid(v) => Ok(v),
            Validated::Invalid(e) => Err(e),
        }
    }
}
