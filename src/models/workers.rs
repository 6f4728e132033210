//! Worker endpoints: `/v2/workers`.

use crate::ids::{TeamId, WorkerId};
use crate::{HordeRequest, HordeResponse};
use http::Method;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkerType {
    Image,
    Text,
    Interrogation,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TeamDetailsLite {
    #[serde(default)]
    pub id: Option<TeamId>,
    #[serde(default)]
    pub name: Option<String>,
}

/// Public details of one worker (`WorkerDetails`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkerDetailItem {
    #[serde(rename = "type")]
    pub worker_type: WorkerType,
    pub name: String,
    pub id: WorkerId,
    #[serde(default)]
    pub online: Option<bool>,
    #[serde(default)]
    pub requests_fulfilled: Option<u64>,
    #[serde(default)]
    pub kudos_rewards: Option<f64>,
    #[serde(default)]
    pub performance: Option<String>,
    #[serde(default)]
    pub threads: Option<u32>,
    #[serde(default)]
    pub uptime: Option<u64>,
    #[serde(default)]
    pub maintenance_mode: bool,
    #[serde(default)]
    pub paused: Option<bool>,
    #[serde(default)]
    pub info: Option<String>,
    #[serde(default)]
    pub nsfw: Option<bool>,
    #[serde(default)]
    pub trusted: Option<bool>,
    #[serde(default)]
    pub flagged: Option<bool>,
    #[serde(default)]
    pub models: Option<Vec<String>>,
    #[serde(default)]
    pub team: Option<TeamDetailsLite>,
}

impl HordeResponse for WorkerDetailItem {
    fn api_model_name() -> Option<&'static str> {
        Some("WorkerDetails")
    }
}

/// Every worker currently known to the horde.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AllWorkersDetailsResponse(pub Vec<WorkerDetailItem>);

impl HordeResponse for AllWorkersDetailsResponse {}

impl AllWorkersDetailsResponse {
    pub fn workers(&self) -> &[WorkerDetailItem] {
        &self.0
    }
}

/// Lists workers (`GET /v2/workers?type=...`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AllWorkersDetailsRequest {
    /// Sent as the `type` query parameter.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub worker_type: Option<WorkerType>,
}

impl AllWorkersDetailsRequest {
    pub fn new(worker_type: Option<WorkerType>) -> Self {
        Self { worker_type }
    }
}

impl HordeRequest for AllWorkersDetailsRequest {
    type Response = AllWorkersDetailsResponse;

    fn http_method() -> Method {
        Method::GET
    }

    fn endpoint_subpath() -> &'static str {
        "/v2/workers"
    }
}

/// Details of one worker (`GET /v2/workers/{id}`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SingleWorkerDetailsRequest {
    pub id: WorkerId,
}

impl HordeRequest for SingleWorkerDetailsRequest {
    type Response = WorkerDetailItem;

    fn http_method() -> Method {
        Method::GET
    }

    fn endpoint_subpath() -> &'static str {
        "/v2/workers/{id}"
    }
}
