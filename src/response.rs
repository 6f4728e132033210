//! Response types.
//!
//! Every dispatched call resolves to an [`ApiResponse`]: either the declared
//! success schema or a [`RequestErrorResponse`]. Callers must handle both
//! arms; neither one is reported through [`crate::Error`].

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// The message attached to an error value when a success reply does not
/// match the expected schema.
pub const RESPONSE_TYPE_MISMATCH: &str =
    "The response type doesn't match expected one! See `object_data` for the raw response.";

/// A typed success schema returned by a horde endpoint.
///
/// Implementors are plain serde types. The `'static` bound lets the resolver
/// check the runtime type of a parsed reply against the type the caller
/// asked for.
pub trait HordeResponse: DeserializeOwned + 'static {
    /// The name of the model in the horde's v2 API documentation, if it has one.
    fn api_model_name() -> Option<&'static str> {
        None
    }
}

impl HordeResponse for serde_json::Value {}

/// An error reported as a value: either the service's own `{"message": ...}`
/// reply, or a success reply that did not match the declared schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestErrorResponse {
    /// The error message.
    pub message: String,

    /// Diagnostic data such as the raw response body or a parse error.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub object_data: Option<serde_json::Value>,
}

impl RequestErrorResponse {
    /// Creates an error value with no diagnostic payload.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            object_data: None,
        }
    }

    /// Attaches a diagnostic payload.
    pub fn with_object_data(mut self, object_data: serde_json::Value) -> Self {
        self.object_data = Some(object_data);
        self
    }

    /// Returns `true` if this value was produced because the reply did not
    /// match the expected schema.
    pub fn is_type_mismatch(&self) -> bool {
        self.message == RESPONSE_TYPE_MISMATCH
    }

    /// The raw reply attached to a mismatch, if any.
    pub fn raw_response(&self) -> Option<&serde_json::Value> {
        self.object_data.as_ref()?.get("raw_response")
    }
}

/// The outcome of one horde API call.
///
/// # Examples
///
/// ```
/// use horde_client::{ApiResponse, RequestErrorResponse};
///
/// let ok: ApiResponse<u32> = ApiResponse::Success(42);
/// assert_eq!(ok.map(|n| n.to_string()).success(), Some("42".to_string()));
///
/// let err: ApiResponse<u32> = ApiResponse::Error(RequestErrorResponse::new("invalid apikey"));
/// assert!(err.is_error());
/// assert_eq!(err.into_result().unwrap_err().message, "invalid apikey");
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum ApiResponse<T> {
    /// The reply matched the expected schema.
    Success(T),
    /// The service reported an error, or the reply did not match.
    Error(RequestErrorResponse),
}

impl<T> ApiResponse<T> {
    pub fn is_success(&self) -> bool {
        matches!(self, ApiResponse::Success(_))
    }

    pub fn is_error(&self) -> bool {
        matches!(self, ApiResponse::Error(_))
    }

    /// Returns the success value, discarding an error.
    pub fn success(self) -> Option<T> {
        match self {
            ApiResponse::Success(data) => Some(data),
            ApiResponse::Error(_) => None,
        }
    }

    /// Returns the error value, discarding a success.
    pub fn error(self) -> Option<RequestErrorResponse> {
        match self {
            ApiResponse::Success(_) => None,
            ApiResponse::Error(e) => Some(e),
        }
    }

    pub fn as_success(&self) -> Option<&T> {
        match self {
            ApiResponse::Success(data) => Some(data),
            ApiResponse::Error(_) => None,
        }
    }

    /// Converts into a `Result` for callers that want `?`.
    pub fn into_result(self) -> std::result::Result<T, RequestErrorResponse> {
        match self {
            ApiResponse::Success(data) => Ok(data),
            ApiResponse::Error(e) => Err(e),
        }
    }

    /// Maps the success value, leaving an error untouched.
    pub fn map<U, F>(self, f: F) -> ApiResponse<U>
    where
        F: FnOnce(T) -> U,
    {
        match self {
            ApiResponse::Success(data) => ApiResponse::Success(f(data)),
            ApiResponse::Error(e) => ApiResponse::Error(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_error_response_from_wire() {
        let err: RequestErrorResponse =
            serde_json::from_value(json!({"message": "invalid apikey"})).unwrap();
        assert_eq!(err, RequestErrorResponse::new("invalid apikey"));
        assert!(!err.is_type_mismatch());
        assert!(err.raw_response().is_none());
    }

    #[test]
    fn test_mismatch_exposes_raw_response() {
        let err = RequestErrorResponse::new(RESPONSE_TYPE_MISMATCH)
            .with_object_data(json!({"raw_response": {"kudos": 1}}));
        assert!(err.is_type_mismatch());
        assert_eq!(err.raw_response(), Some(&json!({"kudos": 1})));
    }

    #[test]
    fn test_accessors() {
        let ok: ApiResponse<&str> = ApiResponse::Success("done");
        assert!(ok.is_success());
        assert_eq!(ok.as_success(), Some(&"done"));
        assert!(ok.clone().error().is_none());

        assert_eq!(ok.into_result(), Ok("done"));
    }
}
