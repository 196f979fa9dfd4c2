//! The uniform result/error carrier returned by every handler.
//!
//! Wire shape: `{"code":<int>,"message":"<string>","data":<T>|null}`.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Shared response codes. Codes in the 2xx range are success; anything else
/// is surfaced to callers as `RpcError::Response` with the code preserved.
pub mod codes {
    pub const OK: i32 = 200;
    pub const BAD_REQUEST: i32 = 400;
    pub const NOT_FOUND: i32 = 404;
    pub const UNPROCESSABLE: i32 = 422;
    pub const INTERNAL_ERROR: i32 = 500;
    pub const UNAVAILABLE: i32 = 503;
}

/// Uniform handler result carried inside reply envelopes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response<T> {
    pub code: i32,
    pub message: String,
    #[serde(default = "none")]
    pub data: Option<T>,
}

fn none<T>() -> Option<T> {
    None
}

impl<T> Response<T> {
    /// Successful response with data.
    pub fn success(data: T) -> Self {
        Self {
            code: codes::OK,
            message: "Success".to_string(),
            data: Some(data),
        }
    }

    /// Error response with a non-success code and no data.
    pub fn error(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }

    /// Whether the remote handler reported success.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.code)
    }
}

impl Response<serde_json::Value> {
    /// Narrow an untyped response into the caller's expected data type.
    ///
    /// Unknown fields inside `data` are ignored, matching envelope decoding.
    pub fn into_typed<T: DeserializeOwned>(self) -> Result<Response<T>, serde_json::Error> {
        let data = match self.data {
            Some(value) if !value.is_null() => Some(serde_json::from_value(value)?),
            _ => None,
        };
        Ok(Response {
            code: self.code,
            message: self.message,
            data,
        })
    }
}
