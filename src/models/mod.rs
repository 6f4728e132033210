//! Request and response models for AI Horde endpoints.

mod generate;
mod workers;

pub use generate::{
    DeleteImageGenerateRequest, GenerationState, ImageGenerateAsyncRequest,
    ImageGenerateAsyncResponse, ImageGenerateCheckResponse, ImageGenerateStatusRequest,
    ImageGenerateStatusResponse, ImageGeneration, ImageGenerationInputPayload,
    ImageGenerationJobSubmitRequest, ImageGenerationJobSubmitResponse, SourceProcessing,
};
pub use workers::{
    AllWorkersDetailsRequest, AllWorkersDetailsResponse, SingleWorkerDetailsRequest,
    TeamDetailsLite, WorkerDetailItem, WorkerType,
};
