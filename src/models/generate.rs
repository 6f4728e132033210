//! Image generation endpoints: `/v2/generate/*`.

use crate::ids::{GenerationId, ImageId, WorkerId};
use crate::recovery::{FieldGroup, RecoveryTarget};
use crate::{Error, HordeRequest, HordeResponse, Result};
use http::{Method, StatusCode};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// How a source image is used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceProcessing {
    Txt2img,
    Img2img,
    Inpainting,
    Outpainting,
}

/// The state of a single finished image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GenerationState {
    Ok,
    Censored,
    Faulted,
    #[serde(other)]
    Unknown,
}

/// Generation parameters (`ModelGenerationInputStable`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
pub struct ImageGenerationInputPayload {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sampler_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(range(min = 0.0, max = 100.0))]
    pub cfg_scale: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(range(min = 0.01, max = 1.0))]
    pub denoising_strength: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(range(min = 64, max = 3072))]
    pub width: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(range(min = 64, max = 3072))]
    pub height: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(range(min = 1, max = 500))]
    pub steps: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub karras: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hires_fix: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub clip_skip: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub post_processing: Option<Vec<String>>,
    /// Number of images to generate.
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(range(min = 1, message = "n must be at least 1"))]
    pub n: Option<u32>,
}

/// Reply to an accepted async generation (`RequestAsync`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageGenerateAsyncResponse {
    /// The id to poll, or cancel, this generation with.
    pub id: GenerationId,
    pub kudos: f64,
    #[serde(default)]
    pub message: Option<String>,
}

impl HordeResponse for ImageGenerateAsyncResponse {
    fn api_model_name() -> Option<&'static str> {
        Some("RequestAsync")
    }
}

/// Queues an image generation (`POST /v2/generate/async`).
///
/// Unset options are left out of the body so the horde applies its own
/// defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageGenerateAsyncRequest {
    pub apikey: String,
    pub prompt: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<ImageGenerationInputPayload>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nsfw: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub censor_nsfw: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub r2: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shared: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub replacement_filter: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_image: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_processing: Option<SourceProcessing>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_mask: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trusted_workers: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slow_workers: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workers: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub worker_blacklist: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub models: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dry_run: Option<bool>,
}

impl ImageGenerateAsyncRequest {
    pub fn new(apikey: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            apikey: apikey.into(),
            prompt: prompt.into(),
            params: None,
            nsfw: None,
            censor_nsfw: None,
            r2: None,
            shared: None,
            replacement_filter: None,
            source_image: None,
            source_processing: None,
            source_mask: None,
            trusted_workers: None,
            slow_workers: None,
            workers: None,
            worker_blacklist: None,
            models: None,
            dry_run: None,
        }
    }

    pub fn with_models<I, S>(mut self, models: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.models = Some(models.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_workers<I, S>(mut self, workers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.workers = Some(workers.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_params(mut self, params: ImageGenerationInputPayload) -> Self {
        self.params = Some(params);
        self
    }

    pub fn with_nsfw(mut self, nsfw: bool) -> Self {
        self.nsfw = Some(nsfw);
        self
    }

    pub fn with_censor_nsfw(mut self, censor_nsfw: bool) -> Self {
        self.censor_nsfw = Some(censor_nsfw);
        self
    }

    pub fn with_trusted_workers(mut self, trusted_workers: bool) -> Self {
        self.trusted_workers = Some(trusted_workers);
        self
    }

    pub fn with_source_image(
        mut self,
        source_image: impl Into<String>,
        processing: SourceProcessing,
    ) -> Self {
        self.source_image = Some(source_image.into());
        self.source_processing = Some(processing);
        self
    }

    pub fn with_r2(mut self, r2: bool) -> Self {
        self.r2 = Some(r2);
        self
    }

    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = Some(dry_run);
        self
    }
}

impl HordeRequest for ImageGenerateAsyncRequest {
    type Response = ImageGenerateAsyncResponse;

    fn http_method() -> Method {
        Method::POST
    }

    fn endpoint_subpath() -> &'static str {
        "/v2/generate/async"
    }

    fn api_model_name() -> Option<&'static str> {
        Some("GenerationInputStable")
    }

    fn success_status_codes() -> &'static [StatusCode] {
        &[StatusCode::ACCEPTED]
    }

    fn field_groups() -> &'static [FieldGroup] {
        &[FieldGroup::Authenticated, FieldGroup::WorkerDriven]
    }

    fn recovery() -> Option<RecoveryTarget> {
        Some(RecoveryTarget::of::<DeleteImageGenerateRequest>())
    }

    fn validate(&self) -> Result<()> {
        if self.censor_nsfw == Some(true) && self.nsfw == Some(true) {
            return Err(Error::InvalidRequest(
                "censor_nsfw is only valid when nsfw is false".to_string(),
            ));
        }
        if let Some(params) = &self.params {
            Validate::validate(params).map_err(|e| Error::InvalidRequest(e.to_string()))?;
        }
        Ok(())
    }
}

/// Progress of a generation without the images (`RequestStatusCheck`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageGenerateCheckResponse {
    pub finished: u32,
    pub processing: u32,
    pub restarted: u32,
    pub waiting: u32,
    pub done: bool,
    pub faulted: bool,
    pub wait_time: u32,
    pub queue_position: u32,
    pub kudos: f64,
    pub is_possible: bool,
}

impl HordeResponse for ImageGenerateCheckResponse {
    fn api_model_name() -> Option<&'static str> {
        Some("RequestStatusCheck")
    }
}

/// One finished image (`GenerationStable`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageGeneration {
    pub id: ImageId,
    pub worker_id: WorkerId,
    pub worker_name: String,
    pub model: String,
    pub state: GenerationState,
    /// Base64 webp, or an R2 download URL when `r2` was requested.
    pub img: String,
    pub seed: String,
    /// The worker's safety filter replaced this image.
    #[serde(default)]
    pub censored: bool,
}

/// Full status of a generation (`RequestStatusStable`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageGenerateStatusResponse {
    #[serde(flatten)]
    pub check: ImageGenerateCheckResponse,
    #[serde(default)]
    pub generations: Vec<ImageGeneration>,
    #[serde(default)]
    pub shared: Option<bool>,
}

impl HordeResponse for ImageGenerateStatusResponse {
    fn api_model_name() -> Option<&'static str> {
        Some("RequestStatusStable")
    }
}

/// Polls a generation (`GET /v2/generate/status/{id}`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageGenerateStatusRequest {
    pub id: GenerationId,
}

impl ImageGenerateStatusRequest {
    pub fn new(id: GenerationId) -> Self {
        Self { id }
    }
}

impl HordeRequest for ImageGenerateStatusRequest {
    type Response = ImageGenerateStatusResponse;

    fn http_method() -> Method {
        Method::GET
    }

    fn endpoint_subpath() -> &'static str {
        "/v2/generate/status/{id}"
    }
}

/// Cancels a generation (`DELETE /v2/generate/status/{id}`).
///
/// Replies with the generation's final status, including anything that
/// already finished.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeleteImageGenerateRequest {
    pub apikey: String,
    pub id: GenerationId,
}

impl DeleteImageGenerateRequest {
    pub fn new(apikey: impl Into<String>, id: GenerationId) -> Self {
        Self {
            apikey: apikey.into(),
            id,
        }
    }
}

impl HordeRequest for DeleteImageGenerateRequest {
    type Response = ImageGenerateStatusResponse;

    fn http_method() -> Method {
        Method::DELETE
    }

    fn endpoint_subpath() -> &'static str {
        "/v2/generate/status/{id}"
    }

    fn field_groups() -> &'static [FieldGroup] {
        &[FieldGroup::Authenticated]
    }
}

/// Reply to a worker's job submission (`GenerationSubmitted`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageGenerationJobSubmitResponse {
    /// Kudos earned for the job.
    pub reward: f64,
}

impl HordeResponse for ImageGenerationJobSubmitResponse {
    fn api_model_name() -> Option<&'static str> {
        Some("GenerationSubmitted")
    }
}

/// A worker hands back a finished job (`POST /v2/generate/submit`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageGenerationJobSubmitRequest {
    pub apikey: String,
    pub id: GenerationId,
    /// `"R2"` if the result was uploaded to R2, otherwise the image itself.
    pub generation: String,
    pub state: GenerationState,
    pub seed: String,
    #[serde(default)]
    pub censored: bool,
}

impl HordeRequest for ImageGenerationJobSubmitRequest {
    type Response = ImageGenerationJobSubmitResponse;

    fn http_method() -> Method {
        Method::POST
    }

    fn endpoint_subpath() -> &'static str {
        "/v2/generate/submit"
    }

    fn api_model_name() -> Option<&'static str> {
        Some("SubmitInputStable")
    }

    fn field_groups() -> &'static [FieldGroup] {
        &[FieldGroup::Authenticated]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::marshal::marshal;
    use crate::FieldRegistries;
    use serde_json::json;

    const JOB_ID: &str = "6ad2c2b4-d5b5-4c2e-a2e6-4c1b0c7e3b1f";

    #[test]
    fn test_async_request_body() {
        let request = ImageGenerateAsyncRequest::new("0000000000", "a cat in a hat")
            .with_models(["Deliberate"]);
        let parsed = marshal(&request, &FieldRegistries::ai_horde()).unwrap();

        assert_eq!(parsed.endpoint, "/v2/generate/async");
        assert_eq!(
            parsed.headers.get("apikey").map(String::as_str),
            Some("0000000000")
        );
        assert_eq!(
            serde_json::Value::Object(parsed.body.unwrap()),
            json!({"prompt": "a cat in a hat", "models": ["Deliberate"]})
        );
    }

    #[test]
    fn test_censor_nsfw_requires_sfw() {
        let request = ImageGenerateAsyncRequest::new("0000000000", "a cat in a hat")
            .with_nsfw(true)
            .with_censor_nsfw(true);
        let err = marshal(&request, &FieldRegistries::ai_horde()).unwrap_err();
        assert!(matches!(err, Error::InvalidRequest(msg) if msg.contains("censor_nsfw")));

        let request = request.with_nsfw(false);
        assert!(marshal(&request, &FieldRegistries::ai_horde()).is_ok());
    }

    #[test]
    fn test_params_are_validated() {
        let request = ImageGenerateAsyncRequest::new("0000000000", "a cat in a hat")
            .with_params(ImageGenerationInputPayload {
                n: Some(0),
                ..Default::default()
            });
        let err = marshal(&request, &FieldRegistries::ai_horde()).unwrap_err();
        assert!(matches!(err, Error::InvalidRequest(_)));
    }

    #[test]
    fn test_status_request_has_no_body() {
        let request = ImageGenerateStatusRequest::new(GenerationId::parse(JOB_ID).unwrap());
        let parsed = marshal(&request, &FieldRegistries::ai_horde()).unwrap();
        assert_eq!(parsed.endpoint, format!("/v2/generate/status/{}", JOB_ID));
        assert_eq!(parsed.body, None);
    }

    #[test]
    fn test_submit_keeps_id_in_body() {
        let request = ImageGenerationJobSubmitRequest {
            apikey: "0000000000".to_string(),
            id: GenerationId::parse(JOB_ID).unwrap(),
            generation: "R2".to_string(),
            state: GenerationState::Ok,
            seed: "1312".to_string(),
            censored: false,
        };
        let parsed = marshal(&request, &FieldRegistries::ai_horde()).unwrap();
        let body = parsed.body.unwrap();
        assert_eq!(body["id"], JOB_ID);
        assert_eq!(body["state"], "ok");
        assert!(!body.contains_key("apikey"));
    }

    #[test]
    fn test_status_response_parses() {
        let raw = json!({
            "finished": 1, "processing": 0, "restarted": 0, "waiting": 0,
            "done": true, "faulted": false, "wait_time": 0, "queue_position": 0,
            "kudos": 10.0, "is_possible": true,
            "generations": [{
                "id": JOB_ID, "worker_id": JOB_ID, "worker_name": "w",
                "model": "Deliberate", "state": "ok", "img": "aGk=", "seed": "1",
                "censored": false
            }]
        });
        let status: ImageGenerateStatusResponse = serde_json::from_value(raw).unwrap();
        assert!(status.check.done);
        assert_eq!(status.generations[0].state, GenerationState::Ok);
        assert_eq!(status.shared, None);
    }
}
