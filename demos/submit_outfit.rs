//! Submit three images and measurements to a running generation service.
//!
//! Requires the service at `MIRRORMUSE_API_URL` (default http://127.0.0.1:8000).
//!
//! ```sh
//! cargo run --example submit_outfit -- person.jpg top.png bottom.png
//! ```

use mirrormuse::render::{render_progress, render_snapshot};
use mirrormuse::{
    GenerationClient, HairstyleClient, HairstylePlan, MeasurementField,
    StylistConfig, StylistSession, SubmitOutcome, UploadSlot,
};
use std::path::PathBuf;
use std::time::Duration;

#[tokio::main]
async fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    let paths: Vec<PathBuf> = std::env::args().skip(1).map(PathBuf::from).collect();
    if paths.len() != 3 {
        eprintln!("usage: submit_outfit <person> <top> <bottom>");
        return Ok(());
    }

    let env = StylistConfig::from_env()?;
    let config = StylistConfig::builder()
        .with_base_url(env.base_url.clone())
        .with_hairstyles(HairstylePlan::disabled())
        .build();

    let session = StylistSession::new(
        GenerationClient::from_config(&config),
        HairstyleClient::from_config(&config),
        config,
    );

    for (slot, path) in UploadSlot::ALL.into_iter().zip(&paths) {
        let upload = session.config().upload_policy.load(path)?;
        if let Err(e) = session.select_upload(slot, upload) {
            eprintln!("{}: {}", path.display(), e);
            return Ok(());
        }
    }
    for (field, value) in MeasurementField::ALL
        .into_iter()
        .zip(["165", "50", "84", "64", "90"])
    {
        session.set_measurement(field, value);
    }
    session.set_style("休闲");

    let runner = session.clone();
    let handle = tokio::spawn(async move { runner.submit().await });

    // Poll the snapshot for progress while the submission runs
    while !handle.is_finished() {
        if let Some(progress) = session.snapshot().progress {
            println!("{}", render_progress(&progress));
        }
        tokio::time::sleep(Duration::from_millis(500)).await;
    }

    match handle.await? {
        SubmitOutcome::Completed => {
            println!("{}", render_snapshot(&session.snapshot(), &session.config().messages));
        }
        other => eprintln!("Submission did not complete: {:?}", other),
    }
    Ok(())
}
