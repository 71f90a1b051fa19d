//! Ask the configured hairstyle provider for recommendations and render
//! the first one onto the same image.
//!
//! Uses the workflow API when `MIRRORMUSE_HAIRSTYLE_WORKFLOW_ID` and
//! `MIRRORMUSE_HAIRSTYLE_TOKEN` are set, the first-party endpoints otherwise.
//!
//! ```sh
//! cargo run --example hairstyle_workflow -- https://cdn.example.com/tryon.png
//! ```

use mirrormuse::{retry, HairstyleBackend, HairstyleClient, RetryPolicy, StylistConfig};
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    let Some(image_url) = std::env::args().nth(1) else {
        eprintln!("usage: hairstyle_workflow <try-on image url>");
        return Ok(());
    };

    let config = StylistConfig::from_env()?;
    let client = HairstyleClient::from_config(&config);
    println!("Provider: {:?}", client.provider());

    let cancel = CancellationToken::new();
    let policy = RetryPolicy::default();
    let hairstyles = retry::retry(&policy, &cancel, "recommend_hairstyle", |_| {
        client.recommend(&image_url, "休闲")
    })
    .await?;

    for (i, style) in hairstyles.iter().enumerate() {
        println!("{}. {} - {}", i + 1, style.hairstyle, style.reasons);
    }

    if let Some(first) = hairstyles.first() {
        match HairstyleBackend::try_on(&client, &image_url, first).await {
            Ok(url) => println!("Try-on: {}", url),
            Err(e) => eprintln!("Try-on failed: {}", e),
        }
    }
    Ok(())
}
