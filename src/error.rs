//! Error types for horde API calls.
//!
//! Only failures that interrupt control flow live here: programming errors in
//! how a request type was declared, transport failures, and error replies the
//! API contract does not allow. A structured `{"message": ...}` error from the
//! service, or a success reply that does not match the declared schema, is a
//! value ([`crate::ApiResponse::Error`]) rather than an [`Error`].

use http::StatusCode;

/// The main error type for horde API calls.
///
/// # Examples
///
/// ```no_run
/// use horde_client::{ApiResponse, Error, HordeClient};
/// use horde_client::models::ImageGenerateAsyncRequest;
///
/// # async fn example() -> Result<(), Error> {
/// let client = HordeClient::builder().build()?;
/// let request = ImageGenerateAsyncRequest::new("0000000000", "a cat in a hat");
///
/// match client.submit(&request).await {
///     Ok(ApiResponse::Success(job)) => println!("queued {}", job.id),
///     Ok(ApiResponse::Error(e)) => eprintln!("horde said no: {}", e.message),
///     Err(Error::UnexpectedErrorShape { status, raw_response }) => {
///         eprintln!("unrecognised error {}: {}", status, raw_response);
///     }
///     Err(e) => eprintln!("Other error: {}", e),
/// }
/// # Ok(())
/// # }
/// ```
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// A network-level error occurred (connection failed, DNS lookup failed, etc.).
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// The request failed its own validation or does not serialize to a field map.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// The endpoint template still has a placeholder after path substitution.
    ///
    /// Raised before any network call is attempted.
    #[error("No value for path placeholder {{{placeholder}}} in endpoint `{endpoint}`")]
    MissingPathField {
        /// The placeholder name without braces
        placeholder: String,
        /// The endpoint template as declared by the request type
        endpoint: String,
    },

    /// A GET request marshalled to a non-empty body.
    ///
    /// The request type put a field outside the header/path/query registries
    /// and forgot to declare it in `extra_header_fields()`.
    #[error("GET requests cannot have a body (request `{request}`, fields: {fields:?})")]
    GetWithBody {
        /// The request type name
        request: &'static str,
        /// The body keys that should have been claimed
        fields: Vec<String>,
    },

    /// The server returned a failure status without a single-key `message` body.
    #[error("Received HTTP {status} without a `message` error body: {raw_response}")]
    UnexpectedErrorShape {
        /// The HTTP status code
        status: StatusCode,
        /// The raw response body
        raw_response: String,
    },

    /// Invalid configuration was provided.
    ///
    /// This indicates a problem with how the client was configured,
    /// such as invalid header values or unreadable environment settings.
    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    /// Failed to serialize the request.
    #[error("Failed to serialize request: {0}")]
    SerializationFailed(String),

    /// An invalid URL was provided or assembled.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

impl Error {
    /// Returns `true` if this error signals a bug in how a request was declared
    /// or built, rather than anything the remote side did.
    ///
    /// # Examples
    ///
    /// ```
    /// use horde_client::Error;
    ///
    /// let err = Error::MissingPathField {
    ///     placeholder: "id".to_string(),
    ///     endpoint: "/v2/generate/status/{id}".to_string(),
    /// };
    /// assert!(err.is_programming_error());
    /// ```
    pub fn is_programming_error(&self) -> bool {
        match self {
            Error::InvalidRequest(_)
            | Error::MissingPathField { .. }
            | Error::GetWithBody { .. }
            | Error::SerializationFailed(_) => true,
            Error::Network(_)
            | Error::UnexpectedErrorShape { .. }
            | Error::ConfigurationError(_)
            | Error::InvalidUrl(_) => false,
        }
    }

    /// Returns the HTTP status code if this error has one.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Error::UnexpectedErrorShape { status, .. } => Some(*status),
            Error::Network(e) => e.status(),
            _ => None,
        }
    }

    /// Returns the raw response body if this error has one.
    pub fn raw_response(&self) -> Option<&str> {
        match self {
            Error::UnexpectedErrorShape { raw_response, .. } => Some(raw_response),
            _ => None,
        }
    }
}

/// A specialized `Result` type for horde API calls.
///
/// This is a convenience alias for `Result<T, Error>`.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unexpected_shape_exposes_status_and_body() {
        let err = Error::UnexpectedErrorShape {
            status: StatusCode::NOT_FOUND,
            raw_response: r#"{"message":"x","code":"y"}"#.to_string(),
        };

        assert_eq!(err.status(), Some(StatusCode::NOT_FOUND));
        assert_eq!(err.raw_response(), Some(r#"{"message":"x","code":"y"}"#));
        assert!(!err.is_programming_error());
    }

    #[test]
    fn test_missing_path_field_message() {
        let err = Error::MissingPathField {
            placeholder: "id".to_string(),
            endpoint: "/v2/generate/status/{id}".to_string(),
        };

        assert_eq!(
            err.to_string(),
            "No value for path placeholder {id} in endpoint `/v2/generate/status/{id}`"
        );
        assert!(err.is_programming_error());
        assert_eq!(err.status(), None);
    }
}
