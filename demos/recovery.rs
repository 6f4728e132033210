//! Cancel a queued generation when the code waiting on it fails.
//!
//! This example shows how to:
//! - Wrap work on a request with `with_recovery_async`
//! - Turn the returned recovery parameters into the cleanup request
//! - Send the cleanup request with the same client
//!
//! Run with: `HORDE_API_KEY=... cargo run --example recovery`

use horde_client::models::{
    DeleteImageGenerateRequest, ImageGenerateAsyncRequest, ImageGenerateStatusRequest,
};
use horde_client::recovery::with_recovery_async;
use horde_client::{ApiResponse, ClientBuilder, GenerationId, HordeClient, HordeConfig};
use serde_json::json;
use std::time::Duration;

/// Waits for a job, giving up after a few polls.
async fn wait_briefly(client: &HordeClient, id: GenerationId) -> Result<usize, String> {
    let request = ImageGenerateStatusRequest::new(id);
    for _ in 0..3 {
        let reply = client.submit(&request).await.map_err(|e| e.to_string())?;
        if let ApiResponse::Success(status) = reply {
            if status.check.done {
                return Ok(status.generations.len());
            }
        }
        tokio::time::sleep(Duration::from_secs(2)).await;
    }
    Err(format!("job {} did not finish in time", id))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter("horde_client=info")
        .init();

    let config = HordeConfig::from_env()?;
    let client = ClientBuilder::from_config(&config)?.build()?;

    let request = ImageGenerateAsyncRequest::new(
        config.api_key_or_anonymous(),
        "a very detailed city skyline, 8k",
    );

    let job = match client.submit(&request).await? {
        ApiResponse::Success(job) => job,
        ApiResponse::Error(e) => {
            eprintln!("The horde refused the job: {}", e.message);
            return Ok(());
        }
    };

    match with_recovery_async(&request, wait_briefly(&client, job.id)).await {
        Ok(images) => println!("Finished with {} images", images),
        Err(failure) => {
            println!("Giving up: {}", failure);
            let Some(recovery) = failure.recovery else {
                return Ok(());
            };

            let cleanup: DeleteImageGenerateRequest =
                recovery.into_request([("id".to_string(), json!(job.id))])?;
            match client.submit(&cleanup).await? {
                ApiResponse::Success(status) => {
                    println!("Cancelled; {} images were already done", status.generations.len())
                }
                ApiResponse::Error(e) => eprintln!("Cancel failed: {}", e.message),
            }
        }
    }

    Ok(())
}
