//! Request marshalling.
//!
//! Turns a request value into the pieces an HTTP call needs: the endpoint
//! with path placeholders filled in, header and query maps keyed by wire
//! name, and the JSON body made of every field no registry claimed.

use crate::fields::{FieldRegistries, FieldRegistry};
use crate::request::HordeRequest;
use crate::{Error, Result};
use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet};

/// A request split into its HTTP parts.
///
/// All maps are ordered, so marshalling the same request twice gives equal
/// values.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ParsedRequest {
    /// The endpoint path with placeholders substituted and no query string.
    pub endpoint: String,
    /// Header wire name → value.
    pub headers: BTreeMap<String, String>,
    /// Query wire name → value.
    pub queries: BTreeMap<String, String>,
    /// Fields no registry claimed, by internal name. Informational only.
    pub params: BTreeMap<String, Value>,
    /// The JSON body, or `None` when no field is left for it.
    pub body: Option<Map<String, Value>>,
}

impl ParsedRequest {
    /// Returns `true` if there is a body to send.
    pub fn has_body(&self) -> bool {
        self.body.is_some()
    }
}

/// Splits `request` into header, path, query and body parts.
///
/// # Errors
///
/// * [`Error::InvalidRequest`] if the request fails its own validation or
///   does not serialize to a JSON object.
/// * [`Error::MissingPathField`] if a placeholder in the endpoint template has
///   no non-null field to fill it.
///
/// # Examples
///
/// ```
/// use horde_client::{marshal, FieldRegistries};
/// use horde_client::models::ImageGenerateAsyncRequest;
///
/// let request = ImageGenerateAsyncRequest::new("0000000000", "a cat in a hat")
///     .with_models(["Deliberate"]);
/// let parsed = marshal(&request, &FieldRegistries::ai_horde()).unwrap();
///
/// assert_eq!(parsed.endpoint, "/v2/generate/async");
/// assert_eq!(parsed.headers["apikey"], "0000000000");
/// assert_eq!(parsed.body.unwrap().len(), 2);
/// ```
pub fn marshal<R>(request: &R, registries: &FieldRegistries) -> Result<ParsedRequest>
where
    R: HordeRequest,
{
    request.validate()?;

    let fields = match serde_json::to_value(request) {
        Ok(Value::Object(fields)) => fields,
        Ok(other) => {
            return Err(Error::InvalidRequest(format!(
                "{} serialized to {} instead of an object",
                R::request_name(),
                json_kind(&other)
            )))
        }
        Err(e) => return Err(Error::SerializationFailed(e.to_string())),
    };

    let template = R::endpoint_subpath();

    let mut claimed_headers = claimed(&registries.header, &fields);
    // A path field only counts when the template has a slot for it; otherwise
    // it is an ordinary field that happens to share the name.
    let claimed_paths: BTreeMap<_, _> = claimed(&registries.path, &fields)
        .into_iter()
        .filter(|(_, wire)| template.contains(&placeholder(wire)))
        .collect();
    let claimed_queries = claimed(&registries.query, &fields);

    let endpoint = substitute_path(template, &claimed_paths, &fields)?;

    let extra_headers = R::extra_header_fields();
    let mut parsed = ParsedRequest {
        endpoint,
        ..ParsedRequest::default()
    };

    for (key, value) in &fields {
        if claimed_paths.contains_key(key.as_str()) {
            continue;
        }
        if let Some(wire) = claimed_headers.get(key.as_str()) {
            parsed.headers.insert(wire.to_string(), value_to_string(value));
            continue;
        }
        if let Some(&extra) = extra_headers.iter().find(|name| **name == key.as_str()) {
            let wire: &'static str = extra.strip_suffix('_').unwrap_or(extra);
            claimed_headers.insert(extra, wire);
            if !value.is_null() {
                parsed.headers.insert(wire.to_string(), value_to_string(value));
            }
            continue;
        }
        if let Some(wire) = claimed_queries.get(key.as_str()) {
            parsed.queries.insert(wire.to_string(), value_to_string(value));
            continue;
        }
        parsed.params.insert(key.clone(), value.clone());
    }

    let excluded: BTreeSet<&str> = claimed_headers
        .keys()
        .chain(claimed_paths.keys())
        .chain(claimed_queries.keys())
        .copied()
        .chain(extra_headers.iter().copied())
        .collect();

    let body: Map<String, Value> = fields
        .into_iter()
        .filter(|(key, value)| !value.is_null() && !excluded.contains(key.as_str()))
        .collect();

    parsed.body = if body.is_empty() { None } else { Some(body) };

    tracing::debug!(
        request = R::request_name(),
        model = R::api_model_name(),
        endpoint = %parsed.endpoint,
        headers = parsed.headers.len(),
        queries = parsed.queries.len(),
        has_body = parsed.has_body(),
        "Marshalled request"
    );

    Ok(parsed)
}

/// Registry entries whose field is present and non-null on the request.
fn claimed(
    registry: &FieldRegistry,
    fields: &Map<String, Value>,
) -> BTreeMap<&'static str, &'static str> {
    registry
        .iter()
        .filter(|(internal, _)| fields.get(*internal).is_some_and(|v| !v.is_null()))
        .fold(BTreeMap::new(), |mut claimed, (internal, wire)| {
            claimed.entry(internal).or_insert(wire);
            claimed
        })
}

/// Fills every `{wire}` slot of `template` in one pass.
///
/// Values are percent-encoded as a single path segment, so their content
/// can never add segments, start a query or look like another slot.
fn substitute_path(
    template: &str,
    claimed_paths: &BTreeMap<&'static str, &'static str>,
    fields: &Map<String, Value>,
) -> Result<String> {
    let mut endpoint = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find('{') {
        endpoint.push_str(&rest[..start]);
        let slot = &rest[start + 1..];
        let end = slot.find('}').unwrap_or(slot.len());
        let name = &slot[..end];

        let value = claimed_paths
            .iter()
            .find(|(_, wire)| **wire == name)
            .and_then(|(internal, _)| fields.get(*internal));
        match value {
            Some(value) => endpoint.push_str(&path_segment(name, value)?),
            None => {
                return Err(Error::MissingPathField {
                    placeholder: name.to_string(),
                    endpoint: template.to_string(),
                })
            }
        }

        rest = slot.get(end + 1..).unwrap_or("");
    }
    endpoint.push_str(rest);

    Ok(endpoint)
}

const PATH_SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'/')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'\\')
    .add(b'`')
    .add(b'{')
    .add(b'}');

fn path_segment(name: &str, value: &Value) -> Result<String> {
    let raw = value_to_string(value);
    // URL parsers resolve these even when percent-encoded.
    if raw.is_empty() || raw == "." || raw == ".." {
        return Err(Error::InvalidRequest(format!(
            "{:?} is not a valid value for path field {}",
            raw, name
        )));
    }
    Ok(utf8_percent_encode(&raw, PATH_SEGMENT).to_string())
}

fn placeholder(wire: &str) -> String {
    format!("{{{wire}}}")
}

/// Renders a field for a header, query or path segment.
///
/// Strings are used verbatim, arrays are comma-joined, everything else is
/// its JSON text.
fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Array(items) => items
            .iter()
            .map(value_to_string)
            .collect::<Vec<_>>()
            .join(","),
        other => other.to_string(),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
