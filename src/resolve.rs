//! Response resolution.
//!
//! Maps a raw reply onto the declared success schema or a typed error value.
//! Only a failure status without the `{"message": ...}` body the API
//! promises is reported as an [`Error`]; everything else is an
//! [`ApiResponse`].

use crate::response::{ApiResponse, HordeResponse, RequestErrorResponse, RESPONSE_TYPE_MISMATCH};
use crate::{Error, Result};
use http::StatusCode;
use serde_json::{json, Value};
use std::any::Any;

/// Resolves a raw reply.
///
/// `Declared` is the schema the request type declares for success; `Expected`
/// is the type the caller asked for. The reply is parsed as `Declared` and
/// handed back only if it is also an `Expected`.
///
/// # Errors
///
/// Returns [`Error::UnexpectedErrorShape`] when `status >= 400` and the body
/// is not a single-key `{"message": string}` object.
///
/// # Examples
///
/// ```
/// use horde_client::{resolve, ApiResponse};
/// use http::StatusCode;
///
/// let resolved = resolve::<serde_json::Value, serde_json::Value>(
///     StatusCode::BAD_REQUEST,
///     r#"{"message":"invalid apikey"}"#,
/// )
/// .unwrap();
///
/// match resolved {
///     ApiResponse::Error(e) => assert_eq!(e.message, "invalid apikey"),
///     ApiResponse::Success(_) => unreachable!(),
/// }
/// ```
pub fn resolve<Declared, Expected>(status: StatusCode, raw_body: &str) -> Result<ApiResponse<Expected>>
where
    Declared: HordeResponse,
    Expected: HordeResponse,
{
    if status.as_u16() >= 400 {
        return resolve_failure(status, raw_body);
    }

    let raw_json: Value = match serde_json::from_str(raw_body) {
        Ok(value) => value,
        Err(e) => {
            tracing::warn!(
                status = status.as_u16(),
                error = %e,
                raw_response = %raw_body,
                "Success reply is not JSON"
            );
            return Ok(mismatch(Value::String(raw_body.to_string()), Some(e.to_string())));
        }
    };

    match parse_one_or_wrapped::<Declared>(&raw_json) {
        Ok(parsed) => {
            let parsed: Box<dyn Any> = Box::new(parsed);
            match parsed.downcast::<Expected>() {
                Ok(expected) => Ok(ApiResponse::Success(*expected)),
                Err(_) => {
                    tracing::warn!(
                        status = status.as_u16(),
                        declared = crate::request::short_type_name::<Declared>(),
                        expected = crate::request::short_type_name::<Expected>(),
                        model = Declared::api_model_name(),
                        "Reply parsed as a different type than expected"
                    );
                    Ok(mismatch(raw_json, None))
                }
            }
        }
        Err(e) => {
            tracing::warn!(
                status = status.as_u16(),
                error = %e,
                model = Declared::api_model_name(),
                raw_response = %raw_body,
                "Reply does not match the declared schema"
            );
            Ok(mismatch(raw_json, Some(e.to_string())))
        }
    }
}

fn resolve_failure<T>(status: StatusCode, raw_body: &str) -> Result<ApiResponse<T>> {
    if let Ok(Value::Object(body)) = serde_json::from_str::<Value>(raw_body) {
        if body.len() == 1 {
            if let Some(Value::String(message)) = body.get("message") {
                tracing::info!(
                    status = status.as_u16(),
                    message = %message,
                    "Horde returned an error"
                );
                return Ok(ApiResponse::Error(RequestErrorResponse::new(message.clone())));
            }
        }
    }

    tracing::error!(
        status = status.as_u16(),
        response = %raw_body,
        "Failure reply without a `message` body"
    );

    Err(Error::UnexpectedErrorShape {
        status,
        raw_response: raw_body.to_string(),
    })
}

/// Parses `value` as `T`, or as the only element of a one-element array.
fn parse_one_or_wrapped<T: HordeResponse>(value: &Value) -> serde_json::Result<T> {
    match T::deserialize(value) {
        Ok(parsed) => Ok(parsed),
        Err(e) => match value {
            Value::Array(items) if items.len() == 1 => T::deserialize(&items[0]),
            _ => Err(e),
        },
    }
}

fn mismatch<T>(raw_response: Value, exception: Option<String>) -> ApiResponse<T> {
    let object_data = match exception {
        Some(exception) => json!({ "exception": exception, "raw_response": raw_response }),
        None => json!({ "raw_response": raw_response }),
    };
    ApiResponse::Error(RequestErrorResponse::new(RESPONSE_TYPE_MISMATCH).with_object_data(object_data))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Job {
        id: String,
        kudos: f64,
    }

    impl HordeResponse for Job {}

    #[derive(Debug, Deserialize, PartialEq)]
    struct OtherJob {
        id: String,
    }

    impl HordeResponse for OtherJob {}

    #[test]
    fn test_success_object() {
        let resolved =
            resolve::<Job, Job>(StatusCode::ACCEPTED, r#"{"id":"abc","kudos":10.0}"#).unwrap();
        assert_eq!(
            resolved,
            ApiResponse::Success(Job {
                id: "abc".to_string(),
                kudos: 10.0
            })
        );
    }

    #[test]
    fn test_success_wrapped_in_array() {
        let resolved =
            resolve::<Job, Job>(StatusCode::OK, r#"[{"id":"abc","kudos":10.0}]"#).unwrap();
        assert_eq!(resolved.success().map(|job| job.id), Some("abc".to_string()));
    }

    #[test]
    fn test_list_schema_is_not_unwrapped() {
        let resolved = resolve::<Vec<OtherJobList>, Vec<OtherJobList>>(
            StatusCode::OK,
            r#"[{"id":"a"}]"#,
        )
        .unwrap();
        assert_eq!(resolved.success().map(|jobs| jobs.len()), Some(1));
    }

    #[derive(Debug, Deserialize, PartialEq)]
    struct OtherJobList {
        id: String,
    }

    impl HordeResponse for Vec<OtherJobList> {}

    #[test]
    fn test_service_error_is_a_value() {
        let resolved =
            resolve::<Job, Job>(StatusCode::BAD_REQUEST, r#"{"message":"invalid apikey"}"#)
                .unwrap();
        assert_eq!(
            resolved,
            ApiResponse::Error(RequestErrorResponse::new("invalid apikey"))
        );
    }

    #[test]
    fn test_two_key_error_body_is_fatal() {
        let err = resolve::<Job, Job>(StatusCode::NOT_FOUND, r#"{"message":"x","code":"y"}"#)
            .unwrap_err();
        match err {
            Error::UnexpectedErrorShape { status, .. } => assert_eq!(status, StatusCode::NOT_FOUND),
            other => panic!("Expected UnexpectedErrorShape, got {:?}", other),
        }
    }

    #[test]
    fn test_non_json_error_body_is_fatal() {
        let result = resolve::<Job, Job>(StatusCode::INTERNAL_SERVER_ERROR, "Bad Gateway");
        assert!(matches!(result, Err(Error::UnexpectedErrorShape { .. })));
    }

    #[test]
    fn test_schema_mismatch_is_a_value() {
        let resolved = resolve::<Job, Job>(StatusCode::OK, r#"{"kudos":10.0}"#).unwrap();
        let err = resolved.error().unwrap();
        assert!(err.is_type_mismatch());
        assert_eq!(err.raw_response(), Some(&json!({"kudos": 10.0})));
        assert!(err.object_data.unwrap()["exception"]
            .as_str()
            .unwrap()
            .contains("id"));
    }

    #[test]
    fn test_wrong_expected_type_is_a_value() {
        let resolved =
            resolve::<Job, OtherJob>(StatusCode::OK, r#"{"id":"abc","kudos":10.0}"#).unwrap();
        let err = resolved.error().unwrap();
        assert!(err.is_type_mismatch());
        assert!(err.object_data.unwrap().get("exception").is_none());
    }

    #[test]
    fn test_non_json_success_is_a_value() {
        let resolved = resolve::<Job, Job>(StatusCode::OK, "not json").unwrap();
        let err = resolved.error().unwrap();
        assert!(err.is_type_mismatch());
        assert_eq!(err.raw_response(), Some(&json!("not json")));
    }
}
