//! The request model trait.
//!
//! A request type is a plain serde struct plus a static declaration of the
//! operation it describes. Which bucket each field lands in is decided by the
//! client's [`crate::FieldRegistries`]; the request only names the exceptions
//! (extra header fields) and the things a registry cannot know: the verb,
//! the endpoint template and the success schema.

use crate::recovery::{FieldGroup, RecoveryTarget};
use crate::response::HordeResponse;
use crate::Result;
use http::{Method, StatusCode};
use serde::Serialize;

/// One horde API operation.
///
/// # Examples
///
/// ```
/// use horde_client::{HordeRequest, HordeResponse};
/// use http::Method;
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Serialize)]
/// struct FindUserRequest {
///     apikey: String,
/// }
///
/// #[derive(Deserialize)]
/// struct UserDetails {
///     username: String,
///     kudos: f64,
/// }
///
/// impl HordeResponse for UserDetails {}
///
/// impl HordeRequest for FindUserRequest {
///     type Response = UserDetails;
///
///     fn http_method() -> Method {
///         Method::GET
///     }
///
///     fn endpoint_subpath() -> &'static str {
///         "/v2/find_user"
///     }
/// }
/// ```
pub trait HordeRequest: Serialize {
    /// The success schema the endpoint declares.
    type Response: HordeResponse;

    /// The HTTP verb of the operation.
    fn http_method() -> Method;

    /// The endpoint path template, relative to the client's base URL.
    ///
    /// `{name}` placeholders are filled from path-registry fields.
    fn endpoint_subpath() -> &'static str;

    /// The name of the model in the horde's v2 API documentation, if it has one.
    fn api_model_name() -> Option<&'static str> {
        None
    }

    /// Fields sent as headers even though no header registry lists them.
    ///
    /// One trailing `_` is stripped to get the wire name, so a field that
    /// would clash with a reserved word can still map to it.
    fn extra_header_fields() -> &'static [&'static str] {
        &[]
    }

    /// Status codes on which the endpoint returns [`Self::Response`].
    fn success_status_codes() -> &'static [StatusCode] {
        &[StatusCode::OK]
    }

    /// Shared field groups this request carries.
    fn field_groups() -> &'static [FieldGroup] {
        &[]
    }

    /// The cleanup request to derive when a call made with this request fails.
    fn recovery() -> Option<RecoveryTarget> {
        None
    }

    fn is_recovery_enabled() -> bool {
        Self::recovery().is_some()
    }

    /// Checks constraints serde cannot express. Runs before marshalling.
    fn validate(&self) -> Result<()> {
        Ok(())
    }

    /// A short name for logs and errors.
    fn request_name() -> &'static str {
        short_type_name::<Self>()
    }
}

pub(crate) fn short_type_name<T: ?Sized>() -> &'static str {
    let full = std::any::type_name::<T>();
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Plain;
    struct Generic<T>(T);

    #[test]
    fn test_short_type_name() {
        assert_eq!(short_type_name::<Plain>(), "Plain");
        assert_eq!(short_type_name::<Generic<Plain>>(), "Generic");
    }
}
