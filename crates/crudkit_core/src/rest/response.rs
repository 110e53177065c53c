//! Response envelope and its builders.

use serde::{Deserialize, Serialize};

pub const STATUS_OK: u16 = 200;
pub const STATUS_INTERNAL_SERVER_ERROR: u16 = 500;

/// Uniform response body: status code plus payload or error code.
///
/// Only the builder functions of this module construct envelopes, so a
/// success never carries an error code and an error never carries a payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
pub struct Envelope<T> {
    status_code: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    payload: Option<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    error_code: Option<String>,
}

impl<T> Envelope<T> {
    pub fn status_code(&self) -> u16 {
        self.status_code
    }

    pub fn payload(&self) -> Option<&T> {
        self.payload.as_ref()
    }

    pub fn error_code(&self) -> Option<&str> {
        self.error_code.as_deref()
    }

    /// Consumes the envelope and returns its payload, if any.
    pub fn into_payload(self) -> Option<T> {
        self.payload
    }

    /// Whether the status code is in the 2xx class.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status_code)
    }
}

impl<T: Serialize> Envelope<T> {
    /// Serializes the envelope as the JSON body of an HTTP response.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

/// `200` with no payload.
pub fn success_response<T>() -> Envelope<T> {
    Envelope {
        status_code: STATUS_OK,
        payload: None,
        error_code: None,
    }
}

/// `200` carrying `payload`.
pub fn success_response_with<T>(payload: T) -> Envelope<T> {
    Envelope {
        status_code: STATUS_OK,
        payload: Some(payload),
        error_code: None,
    }
}

/// `500` with no error code.
pub fn error_response<T>() -> Envelope<T> {
    Envelope {
        status_code: STATUS_INTERNAL_SERVER_ERROR,
        payload: None,
        error_code: None,
    }
}

/// `500` carrying `error_code`.
pub fn error_response_with_code<T>(error_code: impl Into<String>) -> Envelope<T> {
    Envelope {
        status_code: STATUS_INTERNAL_SERVER_ERROR,
        payload: None,
        error_code: Some(error_code.into()),
    }
}
