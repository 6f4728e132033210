//! # horde-client - A typed client for the AI Horde
//!
//! Requests are plain serde structs. Each request type declares its verb,
//! its endpoint template and its expected reply; the client decides where
//! every field travels (path, header, query string or JSON body) and turns
//! the reply into an [`ApiResponse`].
//!
//! ## Quick Start
//!
//! ```no_run
//! use horde_client::{ApiResponse, HordeClient};
//! use horde_client::models::{ImageGenerateAsyncRequest, ImageGenerateStatusRequest};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), horde_client::Error> {
//!     let client = HordeClient::builder()
//!         .client_agent("my-bot:1.0:me@example.com")?
//!         .build()?;
//!
//!     let request = ImageGenerateAsyncRequest::new("0000000000", "a lighthouse at dusk")
//!         .with_models(["Deliberate"]);
//!
//!     let job = match client.submit(&request).await? {
//!         ApiResponse::Success(job) => job,
//!         ApiResponse::Error(e) => {
//!             eprintln!("horde refused the job: {}", e.message);
//!             return Ok(());
//!         }
//!     };
//!
//!     let status = client.submit(&ImageGenerateStatusRequest::new(job.id)).await?;
//!     if let ApiResponse::Success(status) = status {
//!         println!("done: {}, images: {}", status.check.done, status.generations.len());
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Error Handling
//!
//! Failures the server explains come back as [`ApiResponse::Error`] with the
//! server's message. Replies that are not the expected type come back the same
//! way, with [`RESPONSE_TYPE_MISMATCH`] as the message and the raw reply in
//! `object_data`. [`Error`] is reserved for transport failures, malformed
//! requests and error replies of an unknown shape.
//!
//! ```no_run
//! use horde_client::{ApiResponse, Error, HordeClient};
//! use horde_client::models::AllWorkersDetailsRequest;
//!
//! # async fn example() -> Result<(), Error> {
//! # let client = HordeClient::new()?;
//! match client.submit(&AllWorkersDetailsRequest::default()).await {
//!     Ok(ApiResponse::Success(workers)) => println!("{} workers", workers.workers().len()),
//!     Ok(ApiResponse::Error(e)) if e.is_type_mismatch() => {
//!         eprintln!("unexpected reply: {:?}", e.raw_response());
//!     }
//!     Ok(ApiResponse::Error(e)) => eprintln!("horde said: {}", e.message),
//!     Err(Error::UnexpectedErrorShape { status, raw_response }) => {
//!         eprintln!("HTTP {}: {}", status, raw_response);
//!     }
//!     Err(e) => eprintln!("request failed: {}", e),
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Recovery
//!
//! Requests that start server-side work (such as queueing a generation) name a
//! cleanup request. [`recovery::with_recovery`] runs a block and, if it fails,
//! hands back the parameters for that cleanup request alongside the error.

mod client;
mod config;
mod error;
mod fields;
mod ids;
mod marshal;
pub mod models;
pub mod recovery;
mod request;
mod resolve;
mod response;

pub use client::{BlockingHordeClient, ClientBuilder, HordeClient, DEFAULT_CLIENT_AGENT};
pub use config::{HordeConfig, AI_HORDE_BASE_URL, RATINGS_BASE_URL};
pub use error::{Error, Result};
pub use fields::{FieldRegistries, FieldRegistry};
pub use ids::{GenerationId, ImageId, TeamId, WorkerId};
pub use marshal::{marshal, ParsedRequest};
pub use request::HordeRequest;
pub use resolve::resolve;
pub use response::{ApiResponse, HordeResponse, RequestErrorResponse, RESPONSE_TYPE_MISMATCH};
