//! # MirrorMuse
//!
//! Async client for an AI outfit try-on service, with staged progress,
//! hairstyle recommendations, retries and cancellation.
//!
//! A session collects three images (a person photo, a top and a bottom
//! garment) and body measurements, submits them to the generation service,
//! and reports two outfit results: the user's own combination and an
//! AI-recommended one. An optional second phase asks a hairstyle service
//! for recommendations against each try-on image.
//!
//! ## Features
//!
//! - **Upload validation**: size and MIME checks before anything is stored
//! - **Staged progress**: twelve named stages with monotonic percentages
//! - **Cancellation**: each submission owns a `CancellationToken`; a newer
//!   submission supersedes the older one
//! - **Hairstyle phase**: serial or parallel recommendations with retry,
//!   optional per-candidate try-on
//! - **Bilingual**: every user-facing string exists in English and Chinese
//!
//! ## Quick Start
//!
//! ```no_run
//! use mirrormuse::{
//!     GenerationClient, HairstyleClient, MeasurementField, StylistConfig, StylistSession,
//!     SubmitOutcome, UploadSlot,
//! };
//! use std::path::Path;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = StylistConfig::from_env()?;
//!     let session = StylistSession::new(
//!         GenerationClient::from_config(&config),
//!         HairstyleClient::from_config(&config),
//!         config,
//!     );
//!
//!     for (slot, path) in [
//!         (UploadSlot::PersonPhoto, "me.jpg"),
//!         (UploadSlot::TopGarment, "top.png"),
//!         (UploadSlot::BottomGarment, "bottom.png"),
//!     ] {
//!         let upload = session.config().upload_policy.load(Path::new(path))?;
//!         session.select_upload(slot, upload)?;
//!     }
//!     for (field, value) in MeasurementField::ALL.into_iter().zip(["165", "50", "84", "64", "90"]) {
//!         session.set_measurement(field, value);
//!     }
//!
//!     if session.submit().await == SubmitOutcome::Completed {
//!         let snapshot = session.snapshot();
//!         println!("{}", mirrormuse::render::render_snapshot(&snapshot, &session.config().messages));
//!     }
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod hairstyle;
pub mod locale;
pub mod measurements;
pub mod progress;
pub mod render;
pub mod retry;
pub mod session;
pub mod types;
pub mod upload;
pub mod workflow;

pub use client::{GenerationBackend, GenerationClient, HairstyleBackend, SubmissionRequest};
pub use config::{
    HairstyleFailure, HairstyleMode, HairstylePlan, HairstyleProvider, StylistConfig,
    StylistConfigBuilder,
};
pub use error::{Result, StylistError};
pub use hairstyle::HairstyleClient;
pub use locale::{Language, Localized, Messages};
pub use measurements::{MeasurementError, MeasurementField, MeasurementForm, StyleCatalog};
pub use progress::{ProgressStage, ProgressState, ProgressTable, ProgressTracker};
pub use retry::{Backoff, RetryPolicy};
pub use session::{SessionSnapshot, StylistSession, SubmitOutcome};
pub use types::{Commentary, GenerationResult, Grading, Hairstyle, HairstyleSet, OutfitKind, OutfitResult};
pub use upload::{ImageUpload, PreviewRegistry, UploadError, UploadPolicy, UploadSlot, Uploads};
pub use workflow::{StylingWorkflow, WorkflowOutcome};
