//! HTTP dispatch for horde requests.
//!
//! [`HordeClient`] (async) and [`BlockingHordeClient`] share one pipeline:
//! marshal the request with the client's field registries, send it with the
//! request's verb, and resolve the reply into an [`ApiResponse`]. Use
//! [`ClientBuilder`] to configure and create either one.

use crate::config::{HordeConfig, AI_HORDE_BASE_URL, RATINGS_BASE_URL};
use crate::fields::FieldRegistries;
use crate::ids::GenerationId;
use crate::marshal::{marshal, ParsedRequest};
use crate::models::{DeleteImageGenerateRequest, ImageGenerateStatusResponse};
use crate::request::HordeRequest;
use crate::resolve::resolve;
use crate::response::{ApiResponse, HordeResponse};
use crate::{Error, Result};
use http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode};
use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::{Duration, Instant};
use url::Url;

/// The `Client-Agent` sent when none is configured.
pub const DEFAULT_CLIENT_AGENT: &str = concat!("horde-client:", env!("CARGO_PKG_VERSION"), ":anonymous");

const MAX_REDIRECTS: usize = 10;

/// An async client for horde APIs.
///
/// The client is cheap to clone and meant to be reused; clones share one
/// connection pool.
///
/// # Examples
///
/// ```no_run
/// use horde_client::{ApiResponse, HordeClient};
/// use horde_client::models::ImageGenerateAsyncRequest;
///
/// # async fn example() -> Result<(), horde_client::Error> {
/// let client = HordeClient::builder()
///     .client_agent("my-bot:1.0:me@example.com")?
///     .build()?;
///
/// let request = ImageGenerateAsyncRequest::new("0000000000", "a cat in a hat")
///     .with_models(["Deliberate"]);
///
/// match client.submit(&request).await? {
///     ApiResponse::Success(job) => println!("queued {} for {} kudos", job.id, job.kudos),
///     ApiResponse::Error(e) => eprintln!("rejected: {}", e.message),
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct HordeClient {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    http_client: reqwest::Client,
    pipeline: Pipeline,
}

/// A blocking client for horde APIs.
///
/// Must not be built or used from inside an async runtime.
#[derive(Clone)]
pub struct BlockingHordeClient {
    inner: Arc<BlockingInner>,
}

struct BlockingInner {
    http_client: reqwest::blocking::Client,
    pipeline: Pipeline,
}

/// The transport-independent half of a call.
struct Pipeline {
    base_url: String,
    registries: FieldRegistries,
    default_headers: HeaderMap,
}

/// A marshalled request ready to hand to reqwest.
struct Prepared {
    url: Url,
    headers: HeaderMap,
    body: Option<Map<String, Value>>,
}

impl Pipeline {
    fn prepare<R>(&self, method: &Method, request: &R) -> Result<Prepared>
    where
        R: HordeRequest,
    {
        let parsed = marshal(request, &self.registries)?;

        if *method == Method::GET {
            if let Some(body) = &parsed.body {
                return Err(Error::GetWithBody {
                    request: R::request_name(),
                    fields: body.keys().cloned().collect(),
                });
            }
        }

        let mut url = Url::parse(&format!("{}{}", self.base_url, parsed.endpoint))?;
        if !parsed.queries.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in &parsed.queries {
                pairs.append_pair(key, value);
            }
        }

        let mut headers = self.default_headers.clone();
        for (name, value) in &parsed.headers {
            let name = HeaderName::try_from(name.as_str()).map_err(|e| {
                Error::InvalidRequest(format!("Invalid header name {}: {}", name, e))
            })?;
            let value = HeaderValue::try_from(value.as_str()).map_err(|e| {
                Error::InvalidRequest(format!("Invalid value for header {}: {}", name, e))
            })?;
            headers.insert(name, value);
        }

        tracing::debug!(
            method = %method,
            url = %url,
            request = R::request_name(),
            "Executing HTTP request"
        );

        Ok(Prepared {
            url,
            headers,
            body: parsed.body,
        })
    }

    fn finish<R, Res>(
        &self,
        status: StatusCode,
        raw_body: &str,
        latency: Duration,
    ) -> Result<ApiResponse<Res>>
    where
        R: HordeRequest,
        Res: HordeResponse,
    {
        tracing::info!(
            status = status.as_u16(),
            latency_ms = latency.as_millis(),
            request = R::request_name(),
            "Received HTTP response"
        );

        if status.is_success() && !R::success_status_codes().contains(&status) {
            tracing::debug!(
                status = status.as_u16(),
                expected = ?R::success_status_codes(),
                "Success status not declared by the request type"
            );
        }

        resolve::<R::Response, Res>(status, raw_body)
    }
}

fn unsupported_method<T>(method: &Method) -> Result<T> {
    Err(Error::InvalidRequest(format!(
        "Unsupported HTTP method {}",
        method
    )))
}

impl HordeClient {
    /// Creates a new `ClientBuilder` for configuring a client.
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    /// A client for the AI Horde with default settings.
    pub fn new() -> Result<Self> {
        ClientBuilder::new().build()
    }

    /// The base URL every endpoint is appended to.
    pub fn base_url(&self) -> &str {
        &self.inner.pipeline.base_url
    }

    pub fn registries(&self) -> &FieldRegistries {
        &self.inner.pipeline.registries
    }

    /// Marshals `request` with this client's registries without sending it.
    pub fn parse_request<R: HordeRequest>(&self, request: &R) -> Result<ParsedRequest> {
        marshal(request, &self.inner.pipeline.registries)
    }

    /// Sends `request` with its declared verb and expects its declared
    /// success type.
    pub async fn submit<R>(&self, request: &R) -> Result<ApiResponse<R::Response>>
    where
        R: HordeRequest,
    {
        self.submit_request::<R, R::Response>(request).await
    }

    /// Sends `request` with its declared verb.
    ///
    /// `Res` is the type the caller expects. A reply that parses as the
    /// declared type but is not a `Res` comes back as a mismatch
    /// [`ApiResponse::Error`].
    pub async fn submit_request<R, Res>(&self, request: &R) -> Result<ApiResponse<Res>>
    where
        R: HordeRequest,
        Res: HordeResponse,
    {
        let method = R::http_method();
        match method.as_str() {
            "GET" => self.get(request).await,
            "POST" => self.post(request).await,
            "PUT" => self.put(request).await,
            "PATCH" => self.patch(request).await,
            "DELETE" => self.delete(request).await,
            _ => unsupported_method(&method),
        }
    }

    /// Sends `request` as a GET. Fails if it would need a body.
    pub async fn get<R, Res>(&self, request: &R) -> Result<ApiResponse<Res>>
    where
        R: HordeRequest,
        Res: HordeResponse,
    {
        self.call(Method::GET, request).await
    }

    pub async fn post<R, Res>(&self, request: &R) -> Result<ApiResponse<Res>>
    where
        R: HordeRequest,
        Res: HordeResponse,
    {
        self.call(Method::POST, request).await
    }

    pub async fn put<R, Res>(&self, request: &R) -> Result<ApiResponse<Res>>
    where
        R: HordeRequest,
        Res: HordeResponse,
    {
        self.call(Method::PUT, request).await
    }

    pub async fn patch<R, Res>(&self, request: &R) -> Result<ApiResponse<Res>>
    where
        R: HordeRequest,
        Res: HordeResponse,
    {
        self.call(Method::PATCH, request).await
    }

    pub async fn delete<R, Res>(&self, request: &R) -> Result<ApiResponse<Res>>
    where
        R: HordeRequest,
        Res: HordeResponse,
    {
        self.call(Method::DELETE, request).await
    }

    /// Cancels a queued or running image generation.
    pub async fn delete_pending_image(
        &self,
        apikey: impl Into<String>,
        id: GenerationId,
    ) -> Result<ApiResponse<ImageGenerateStatusResponse>> {
        self.submit(&DeleteImageGenerateRequest::new(apikey, id)).await
    }

    async fn call<R, Res>(&self, method: Method, request: &R) -> Result<ApiResponse<Res>>
    where
        R: HordeRequest,
        Res: HordeResponse,
    {
        let pipeline = &self.inner.pipeline;
        let prepared = pipeline.prepare(&method, request)?;

        let mut builder = self
            .inner
            .http_client
            .request(method, prepared.url)
            .headers(prepared.headers);
        if let Some(body) = &prepared.body {
            builder = builder.json(body);
        }

        let start_time = Instant::now();
        let response = builder.send().await?;
        let status = response.status();
        let raw_body = response.text().await?;

        pipeline.finish::<R, Res>(status, &raw_body, start_time.elapsed())
    }
}

impl BlockingHordeClient {
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    pub fn new() -> Result<Self> {
        ClientBuilder::new().build_blocking()
    }

    pub fn base_url(&self) -> &str {
        &self.inner.pipeline.base_url
    }

    pub fn registries(&self) -> &FieldRegistries {
        &self.inner.pipeline.registries
    }

    pub fn parse_request<R: HordeRequest>(&self, request: &R) -> Result<ParsedRequest> {
        marshal(request, &self.inner.pipeline.registries)
    }

    pub fn submit<R>(&self, request: &R) -> Result<ApiResponse<R::Response>>
    where
        R: HordeRequest,
    {
        self.submit_request::<R, R::Response>(request)
    }

    /// Blocking counterpart of [`HordeClient::submit_request`].
    pub fn submit_request<R, Res>(&self, request: &R) -> Result<ApiResponse<Res>>
    where
        R: HordeRequest,
        Res: HordeResponse,
    {
        let method = R::http_method();
        match method.as_str() {
            "GET" => self.get(request),
            "POST" => self.post(request),
            "PUT" => self.put(request),
            "PATCH" => self.patch(request),
            "DELETE" => self.delete(request),
            _ => unsupported_method(&method),
        }
    }

    pub fn get<R, Res>(&self, request: &R) -> Result<ApiResponse<Res>>
    where
        R: HordeRequest,
        Res: HordeResponse,
    {
        self.call(Method::GET, request)
    }

    pub fn post<R, Res>(&self, request: &R) -> Result<ApiResponse<Res>>
    where
        R: HordeRequest,
        Res: HordeResponse,
    {
        self.call(Method::POST, request)
    }

    pub fn put<R, Res>(&self, request: &R) -> Result<ApiResponse<Res>>
    where
        R: HordeRequest,
        Res: HordeResponse,
    {
        self.call(Method::PUT, request)
    }

    pub fn patch<R, Res>(&self, request: &R) -> Result<ApiResponse<Res>>
    where
        R: HordeRequest,
        Res: HordeResponse,
    {
        self.call(Method::PATCH, request)
    }

    pub fn delete<R, Res>(&self, request: &R) -> Result<ApiResponse<Res>>
    where
        R: HordeRequest,
        Res: HordeResponse,
    {
        self.call(Method::DELETE, request)
    }

    pub fn delete_pending_image(
        &self,
        apikey: impl Into<String>,
        id: GenerationId,
    ) -> Result<ApiResponse<ImageGenerateStatusResponse>> {
        self.submit(&DeleteImageGenerateRequest::new(apikey, id))
    }

    fn call<R, Res>(&self, method: Method, request: &R) -> Result<ApiResponse<Res>>
    where
        R: HordeRequest,
        Res: HordeResponse,
    {
        let pipeline = &self.inner.pipeline;
        let prepared = pipeline.prepare(&method, request)?;

        let mut builder = self
            .inner
            .http_client
            .request(method, prepared.url)
            .headers(prepared.headers);
        if let Some(body) = &prepared.body {
            builder = builder.json(body);
        }

        let start_time = Instant::now();
        let response = builder.send()?;
        let status = response.status();
        let raw_body = response.text()?;

        pipeline.finish::<R, Res>(status, &raw_body, start_time.elapsed())
    }
}

/// Builder for configuring and creating a [`HordeClient`] or
/// [`BlockingHordeClient`].
///
/// # Examples
///
/// ```no_run
/// use horde_client::ClientBuilder;
///
/// # fn example() -> Result<(), horde_client::Error> {
/// let client = ClientBuilder::new()
///     .base_url("https://aihorde.net/api")?
///     .client_agent("my-bot:1.0:me@example.com")?
///     .build()?;
/// # Ok(())
/// # }
/// ```
pub struct ClientBuilder {
    base_url: String,
    registries: FieldRegistries,
    default_headers: HeaderMap,
}

impl ClientBuilder {
    /// Creates a builder for the AI Horde with default settings.
    pub fn new() -> Self {
        Self {
            base_url: AI_HORDE_BASE_URL.to_string(),
            registries: FieldRegistries::ai_horde(),
            default_headers: HeaderMap::new(),
        }
    }

    /// Creates a builder for the image ratings API.
    pub fn ratings() -> Self {
        Self {
            base_url: RATINGS_BASE_URL.to_string(),
            registries: FieldRegistries::ratings(),
            default_headers: HeaderMap::new(),
        }
    }

    /// Creates a builder from `HORDE_*` environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_config(&HordeConfig::from_env()?)
    }

    /// Applies the settings present in `config` over the defaults.
    pub fn from_config(config: &HordeConfig) -> Result<Self> {
        let mut builder = Self::new();
        if let Some(base_url) = &config.base_url {
            builder = builder.base_url(base_url)?;
        }
        if let Some(client_agent) = &config.client_agent {
            builder = builder.client_agent(client_agent)?;
        }
        if let Some(api_key) = &config.api_key {
            builder = builder.api_key(api_key)?;
        }
        Ok(builder)
    }

    /// Sets the base URL endpoints are appended to.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is invalid.
    pub fn base_url(mut self, url: impl AsRef<str>) -> Result<Self> {
        let url = url.as_ref();
        Url::parse(url)?;
        self.base_url = url.trim_end_matches('/').to_string();
        Ok(self)
    }

    /// Sets the field registries requests are marshalled with.
    pub fn registries(mut self, registries: FieldRegistries) -> Self {
        self.registries = registries;
        self
    }

    /// Adds a default header that will be included in all requests.
    ///
    /// Request fields routed to a header with the same name win.
    ///
    /// # Errors
    ///
    /// Returns an error if the header name or value is invalid.
    pub fn default_header(mut self, name: impl AsRef<str>, value: impl AsRef<str>) -> Result<Self> {
        let name = HeaderName::try_from(name.as_ref())
            .map_err(|e| Error::ConfigurationError(format!("Invalid header name: {}", e)))?;
        let value = HeaderValue::try_from(value.as_ref())
            .map_err(|e| Error::ConfigurationError(format!("Invalid header value: {}", e)))?;
        self.default_headers.insert(name, value);
        Ok(self)
    }

    /// Sends `apikey` with every request that does not carry its own.
    pub fn api_key(self, key: impl AsRef<str>) -> Result<Self> {
        self.default_header("apikey", key)
    }

    /// Sets the `Client-Agent` header, conventionally `name:version:contact`.
    pub fn client_agent(self, agent: impl AsRef<str>) -> Result<Self> {
        self.default_header("Client-Agent", agent)
    }

    /// Builds an async client.
    pub fn build(self) -> Result<HordeClient> {
        let http_client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
            .build()
            .map_err(|e| {
                Error::ConfigurationError(format!("Failed to build HTTP client: {}", e))
            })?;

        Ok(HordeClient {
            inner: Arc::new(ClientInner {
                http_client,
                pipeline: self.into_pipeline(),
            }),
        })
    }

    /// Builds a blocking client.
    pub fn build_blocking(self) -> Result<BlockingHordeClient> {
        let http_client = reqwest::blocking::Client::builder()
            .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
            .build()
            .map_err(|e| {
                Error::ConfigurationError(format!("Failed to build HTTP client: {}", e))
            })?;

        Ok(BlockingHordeClient {
            inner: Arc::new(BlockingInner {
                http_client,
                pipeline: self.into_pipeline(),
            }),
        })
    }

    fn into_pipeline(mut self) -> Pipeline {
        if !self.default_headers.contains_key("client-agent") {
            self.default_headers.insert(
                HeaderName::from_static("client-agent"),
                HeaderValue::from_static(DEFAULT_CLIENT_AGENT),
            );
        }

        Pipeline {
            base_url: self.base_url,
            registries: self.registries,
            default_headers: self.default_headers,
        }
    }
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AllWorkersDetailsRequest, ImageGenerateAsyncRequest, WorkerType};

    fn pipeline() -> Pipeline {
        ClientBuilder::new()
            .base_url("http://localhost:7001/api/")
            .unwrap()
            .into_pipeline()
    }

    #[test]
    fn test_prepare_joins_base_url_and_query() {
        let request = AllWorkersDetailsRequest::new(Some(WorkerType::Text));
        let prepared = pipeline().prepare(&Method::GET, &request).unwrap();

        assert_eq!(
            prepared.url.as_str(),
            "http://localhost:7001/api/v2/workers?type=text"
        );
        assert_eq!(prepared.headers["client-agent"], DEFAULT_CLIENT_AGENT);
        assert!(prepared.body.is_none());
    }

    #[test]
    fn test_prepare_rejects_get_with_body() {
        let request = ImageGenerateAsyncRequest::new("0000000000", "a cat in a hat");
        let err = pipeline().prepare(&Method::GET, &request).err().unwrap();

        match err {
            Error::GetWithBody { request, fields } => {
                assert_eq!(request, "ImageGenerateAsyncRequest");
                assert_eq!(fields, vec!["prompt".to_string()]);
            }
            other => panic!("Expected GetWithBody, got {:?}", other),
        }
    }

    #[test]
    fn test_request_header_overrides_default() {
        let pipeline = ClientBuilder::new()
            .default_header("apikey", "default")
            .unwrap()
            .into_pipeline();
        let request = ImageGenerateAsyncRequest::new("0000000000", "a cat in a hat");
        let prepared = pipeline.prepare(&Method::POST, &request).unwrap();
        assert_eq!(prepared.headers["apikey"], "0000000000");
    }

    #[test]
    fn test_invalid_header_value_is_a_request_error() {
        let request = ImageGenerateAsyncRequest::new("bad\nkey", "a cat in a hat");
        let err = pipeline().prepare(&Method::POST, &request).err().unwrap();
        assert!(matches!(err, Error::InvalidRequest(_)));
    }

    #[test]
    fn test_builder_from_config() {
        let config = HordeConfig {
            base_url: Some("http://localhost:7001/api".to_string()),
            client_agent: Some("tester:1:me".to_string()),
            api_key: Some("s3cret".to_string()),
        };
        let pipeline = ClientBuilder::from_config(&config).unwrap().into_pipeline();
        assert_eq!(pipeline.base_url, "http://localhost:7001/api");
        assert_eq!(pipeline.default_headers["client-agent"], "tester:1:me");
        assert_eq!(pipeline.default_headers["apikey"], "s3cret");
    }

    #[test]
    fn test_configured_key_fills_requests_without_one() {
        let pipeline = ClientBuilder::new().api_key("s3cret").unwrap().into_pipeline();

        let status = crate::models::ImageGenerateStatusRequest::new(GenerationId::new_v4());
        let prepared = pipeline.prepare(&Method::GET, &status).unwrap();
        assert_eq!(prepared.headers["apikey"], "s3cret");

        let request = ImageGenerateAsyncRequest::new("0000000000", "a cat in a hat");
        let prepared = pipeline.prepare(&Method::POST, &request).unwrap();
        assert_eq!(prepared.headers["apikey"], "0000000000");
    }

    #[test]
    fn test_invalid_base_url() {
        assert!(matches!(
            ClientBuilder::new().base_url("not a url"),
            Err(Error::InvalidUrl(_))
        ));
    }

    #[test]
    fn test_ratings_preset() {
        let pipeline = ClientBuilder::ratings().into_pipeline();
        assert_eq!(pipeline.base_url, RATINGS_BASE_URL);
        assert_eq!(pipeline.registries, FieldRegistries::ratings());
    }
}
