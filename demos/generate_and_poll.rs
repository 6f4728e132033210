//! Queue an image generation and poll it until it finishes.
//!
//! This example shows how to:
//! - Build a client from `HORDE_*` environment variables
//! - Submit a typed request and handle both response arms
//! - Poll a job by id with a path-substituted GET
//!
//! Run with: `HORDE_API_KEY=... cargo run --example generate_and_poll`

use horde_client::models::{
    ImageGenerateAsyncRequest, ImageGenerateStatusRequest, ImageGenerationInputPayload,
};
use horde_client::{ApiResponse, ClientBuilder, HordeConfig};
use std::time::Duration;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter("horde_client=info")
        .init();

    let config = HordeConfig::from_env()?;
    let client = ClientBuilder::from_config(&config)?.build()?;

    let request = ImageGenerateAsyncRequest::new(
        config.api_key_or_anonymous(),
        "a lighthouse on a cliff at dusk, oil painting",
    )
    .with_models(["Deliberate"])
    .with_params(ImageGenerationInputPayload {
        width: Some(512),
        height: Some(512),
        steps: Some(25),
        n: Some(1),
        ..Default::default()
    })
    .with_r2(true);

    println!("=== Submitting ===");
    let job = match client.submit(&request).await? {
        ApiResponse::Success(job) => job,
        ApiResponse::Error(e) => {
            eprintln!("The horde refused the job: {}", e.message);
            return Ok(());
        }
    };
    println!("Queued {} ({} kudos)", job.id, job.kudos);

    println!("=== Polling ===");
    let status_request = ImageGenerateStatusRequest::new(job.id);
    loop {
        match client.submit(&status_request).await? {
            ApiResponse::Success(status) if status.check.done => {
                for generation in &status.generations {
                    println!(
                        "{} by {} ({:?}): {}",
                        generation.model, generation.worker_name, generation.state, generation.img
                    );
                }
                break;
            }
            ApiResponse::Success(status) => {
                println!(
                    "queue position {}, about {}s left",
                    status.check.queue_position, status.check.wait_time
                );
            }
            ApiResponse::Error(e) if e.is_type_mismatch() => {
                eprintln!("Unexpected status reply: {:?}", e.raw_response());
                break;
            }
            ApiResponse::Error(e) => {
                eprintln!("Status check failed: {}", e.message);
                break;
            }
        }
        tokio::time::sleep(Duration::from_secs(5)).await;
    }

    Ok(())
}
