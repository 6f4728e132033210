//! Recovery hints for failed calls.
//!
//! Some operations leave server-side state behind when the caller fails
//! halfway through; an async image generation keeps running (and costing
//! kudos) until someone cancels it. [`with_recovery`] and
//! [`with_recovery_async`] wrap a unit of work that uses a request and, on
//! failure, project the request's shared fields onto the cleanup request its
//! type declares. They compute the parameters only. Sending the cleanup
//! request is left to the caller.

use crate::request::HordeRequest;
use http::Method;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::fmt;
use std::future::Future;

/// A group of fields shared by many request types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldGroup {
    /// Requests that carry an API key.
    Authenticated,
    /// Requests made on behalf of a specific user.
    UserSpecific,
    /// Requests that steer which workers may pick up a job.
    WorkerDriven,
}

impl FieldGroup {
    /// All groups that recovery can map between.
    pub const MAPPABLE: [FieldGroup; 3] = [
        FieldGroup::Authenticated,
        FieldGroup::UserSpecific,
        FieldGroup::WorkerDriven,
    ];

    /// The internal names of the fields in this group.
    pub fn fields(self) -> &'static [&'static str] {
        match self {
            FieldGroup::Authenticated => &["apikey"],
            FieldGroup::UserSpecific => &["user_id"],
            FieldGroup::WorkerDriven => &[
                "trusted_workers",
                "slow_workers",
                "workers",
                "worker_blacklist",
                "models",
            ],
        }
    }
}

/// The cleanup request a request type points at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecoveryTarget {
    pub name: &'static str,
    pub method: Method,
    pub endpoint: &'static str,
    pub field_groups: &'static [FieldGroup],
}

impl RecoveryTarget {
    /// Describes request type `R` as a recovery target.
    pub fn of<R: HordeRequest>() -> Self {
        Self {
            name: R::request_name(),
            method: R::http_method(),
            endpoint: R::endpoint_subpath(),
            field_groups: R::field_groups(),
        }
    }
}

/// Parameters for a cleanup request, mapped from the request that failed.
#[derive(Debug, Clone, PartialEq)]
pub struct RecoveryParams {
    pub target: RecoveryTarget,
    pub params: Map<String, Value>,
}

impl RecoveryParams {
    /// Builds the cleanup request from the mapped parameters plus `extra`
    /// fields only the caller knows, such as the id of the job to cancel.
    ///
    /// `extra` wins over mapped parameters with the same name.
    pub fn into_request<T>(
        self,
        extra: impl IntoIterator<Item = (String, Value)>,
    ) -> serde_json::Result<T>
    where
        T: DeserializeOwned,
    {
        let mut params = self.params;
        params.extend(extra);
        serde_json::from_value(Value::Object(params))
    }
}

/// A failure that went through a recovery wrapper.
#[derive(Debug)]
pub struct RecoveryFailure<E> {
    /// The error the wrapped call returned, unchanged.
    pub error: E,
    /// Cleanup parameters, if the request type has recovery enabled.
    pub recovery: Option<RecoveryParams>,
}

impl<E: fmt::Display> fmt::Display for RecoveryFailure<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.recovery {
            Some(recovery) => write!(
                f,
                "{} (recovery available via {})",
                self.error, recovery.target.name
            ),
            None => write!(f, "{}", self.error),
        }
    }
}

impl<E> std::error::Error for RecoveryFailure<E>
where
    E: std::error::Error + 'static,
{
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}

/// Runs `body` with `request`; on failure attaches recovery parameters.
///
/// # Examples
///
/// ```
/// use horde_client::recovery::with_recovery;
/// use horde_client::models::ImageGenerateAsyncRequest;
///
/// let request = ImageGenerateAsyncRequest::new("0000000000", "a cat in a hat");
/// let failure = with_recovery(&request, |_| Err::<(), _>("connection reset")).unwrap_err();
///
/// let recovery = failure.recovery.unwrap();
/// assert_eq!(recovery.target.name, "DeleteImageGenerateRequest");
/// assert_eq!(recovery.params["apikey"], "0000000000");
/// ```
pub fn with_recovery<R, T, E, F>(request: &R, body: F) -> Result<T, RecoveryFailure<E>>
where
    R: HordeRequest,
    E: fmt::Display,
    F: FnOnce(&R) -> Result<T, E>,
{
    body(request).map_err(|error| recover(request, error))
}

/// Awaits `work`; on failure attaches recovery parameters derived from `request`.
pub async fn with_recovery_async<R, T, E, Fut>(
    request: &R,
    work: Fut,
) -> Result<T, RecoveryFailure<E>>
where
    R: HordeRequest,
    E: fmt::Display,
    Fut: Future<Output = Result<T, E>>,
{
    work.await.map_err(|error| recover(request, error))
}

fn recover<R, E>(request: &R, error: E) -> RecoveryFailure<E>
where
    R: HordeRequest,
    E: fmt::Display,
{
    tracing::warn!(
        request = R::request_name(),
        error = %error,
        "Request failed"
    );

    if !R::is_recovery_enabled() {
        return RecoveryFailure {
            error,
            recovery: None,
        };
    }

    let recovery = R::recovery().map(|target| {
        let params = recovery_params(request, &target);
        tracing::info!(
            request = R::request_name(),
            recovery = target.name,
            params = params.len(),
            "Mapped recovery parameters"
        );
        RecoveryParams { target, params }
    });

    RecoveryFailure { error, recovery }
}

fn recovery_params<R: HordeRequest>(request: &R, target: &RecoveryTarget) -> Map<String, Value> {
    let fields = match serde_json::to_value(request) {
        Ok(Value::Object(fields)) => fields,
        _ => return Map::new(),
    };

    FieldGroup::MAPPABLE
        .iter()
        .filter(|group| target.field_groups.contains(*group))
        .flat_map(|group| group.fields().iter())
        .filter_map(|key| fields.get(*key).map(|value| (key.to_string(), value.clone())))
        .collect()
}

impl fmt::Display for FieldGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            FieldGroup::Authenticated => "authenticated",
            FieldGroup::UserSpecific => "user-specific",
            FieldGroup::WorkerDriven => "worker-driven",
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::GenerationId;
    use crate::models::{DeleteImageGenerateRequest, ImageGenerateAsyncRequest, ImageGenerateStatusRequest};
    use serde_json::json;

    const JOB_ID: &str = "00000000-0000-4000-8000-000000000000";

    #[test]
    fn test_success_passes_through() {
        let request = ImageGenerateAsyncRequest::new("0000000000", "a cat in a hat");
        let result: Result<u32, RecoveryFailure<&str>> = with_recovery(&request, |_| Ok(7));
        assert_eq!(result.unwrap(), 7);
    }

    #[test]
    fn test_failure_maps_only_groups_the_target_shares() {
        let request = ImageGenerateAsyncRequest::new("0000000000", "a cat in a hat")
            .with_models(["Deliberate"]);

        let failure = with_recovery(&request, |_| Err::<(), _>("boom")).unwrap_err();
        assert_eq!(failure.error, "boom");

        let recovery = failure.recovery.unwrap();
        assert_eq!(recovery.target, RecoveryTarget::of::<DeleteImageGenerateRequest>());
        assert_eq!(recovery.target.method, Method::DELETE);
        assert_eq!(
            Value::Object(recovery.params.clone()),
            json!({"apikey": "0000000000"})
        );
    }

    #[test]
    fn test_recovery_params_build_cleanup_request() {
        let request = ImageGenerateAsyncRequest::new("0000000000", "a cat in a hat");
        let recovery = with_recovery(&request, |_| Err::<(), _>("boom"))
            .unwrap_err()
            .recovery
            .unwrap();

        let cancel: DeleteImageGenerateRequest = recovery
            .into_request([("id".to_string(), json!(JOB_ID))])
            .unwrap();
        assert_eq!(cancel.apikey, "0000000000");
        assert_eq!(cancel.id, GenerationId::parse(JOB_ID).unwrap());
    }

    #[test]
    fn test_disabled_recovery_propagates_error_only() {
        let request = ImageGenerateStatusRequest::new(GenerationId::parse(JOB_ID).unwrap());
        let failure = with_recovery(&request, |_| Err::<(), _>("boom")).unwrap_err();
        assert_eq!(failure.error, "boom");
        assert!(failure.recovery.is_none());
        assert_eq!(failure.to_string(), "boom");
    }

    #[tokio::test]
    async fn test_async_failure_maps_params() {
        let request = ImageGenerateAsyncRequest::new("0000000000", "a cat in a hat");
        let failure = with_recovery_async(&request, async { Err::<(), _>("timed out") })
            .await
            .unwrap_err();

        assert!(failure.to_string().contains("DeleteImageGenerateRequest"));
        assert_eq!(failure.recovery.unwrap().params["apikey"], "0000000000");
    }

    #[test]
    fn test_group_fields() {
        assert_eq!(FieldGroup::Authenticated.fields(), &["apikey"]);
        assert!(FieldGroup::WorkerDriven.fields().contains(&"models"));
        assert_eq!(FieldGroup::UserSpecific.to_string(), "user-specific");
    }
}
