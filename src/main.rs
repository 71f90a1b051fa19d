//! `mirrormuse` command-line front end.
//!
//! Loads three images and a set of measurements, submits them, streams
//! progress to stderr and prints the rendered results.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Parser, ValueEnum};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use mirrormuse::render::{render_progress, render_snapshot};
use mirrormuse::{
    GenerationClient, HairstyleClient, HairstyleFailure, HairstyleMode, HairstylePlan, Language,
    MeasurementField, StylistConfig, StylistError, StylistSession, SubmitOutcome, UploadSlot,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum HairstyleArg {
    Serial,
    Parallel,
    Off,
}

/// Try outfits on from the command line
#[derive(Parser, Debug)]
#[command(name = "mirrormuse")]
#[command(about = "Submit a photo, two garments and measurements for an AI try-on")]
#[command(version)]
struct Args {
    /// Photo of the person
    #[arg(long)]
    person: PathBuf,

    /// Top garment image
    #[arg(long)]
    top: PathBuf,

    /// Bottom garment image
    #[arg(long)]
    bottom: PathBuf,

    /// Height in cm
    #[arg(long)]
    height: String,

    /// Weight in kg
    #[arg(long)]
    weight: String,

    /// Bust in cm
    #[arg(long)]
    bust: String,

    /// Waist in cm
    #[arg(long)]
    waist: String,

    /// Hips in cm
    #[arg(long)]
    hips: String,

    /// Style preference, in either language (e.g. 休闲 or Casual)
    #[arg(long)]
    style: Option<String>,

    /// Display language (zh or en)
    #[arg(long)]
    lang: Option<String>,

    /// Base URL of the generation service
    #[arg(long, env = "MIRRORMUSE_API_URL")]
    api_url: Option<String>,

    /// Hairstyle recommendation scheduling
    #[arg(long, value_enum, default_value = "parallel")]
    hairstyles: HairstyleArg,

    /// Render every recommended hairstyle onto the try-on images
    #[arg(long)]
    hairstyle_tryon: bool,

    /// Fail the whole submission when hairstyle recommendations fail
    #[arg(long)]
    fatal_hairstyle_errors: bool,

    /// Pause between progress stages, in milliseconds
    #[arg(long, default_value = "500")]
    stage_delay_ms: u64,
}

fn build_config(args: &Args) -> Result<StylistConfig> {
    let base = StylistConfig::from_env().context("Invalid environment configuration")?;

    let language = match &args.lang {
        Some(lang) => lang
            .parse::<Language>()
            .map_err(anyhow::Error::msg)
            .context("Invalid --lang")?,
        None => base.language,
    };

    let plan = match args.hairstyles {
        HairstyleArg::Off => HairstylePlan::disabled(),
        mode => HairstylePlan {
            mode: if mode == HairstyleArg::Serial {
                HairstyleMode::Serial
            } else {
                HairstyleMode::Parallel
            },
            failure: if args.fatal_hairstyle_errors {
                HairstyleFailure::Fatal
            } else {
                HairstyleFailure::Isolated
            },
            try_on: args.hairstyle_tryon,
            ..base.hairstyles.clone()
        },
    };

    let mut builder = StylistConfig::builder()
        .with_base_url(base.base_url.clone())
        .with_generate_path(base.generate_path.clone())
        .with_hairstyle_provider(base.hairstyle_provider.clone())
        .with_language(language)
        .with_hairstyles(plan)
        .with_stage_delay(Duration::from_millis(args.stage_delay_ms));
    if let Some(url) = &args.api_url {
        builder = builder.with_base_url(url.clone());
    }
    Ok(builder.build())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "mirrormuse=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();
    let config = build_config(&args)?;
    info!(url = %config.generate_url(), language = %config.language, "Starting MirrorMuse");

    let session = StylistSession::new(
        GenerationClient::from_config(&config),
        HairstyleClient::from_config(&config),
        config,
    );

    for (slot, path) in [
        (UploadSlot::PersonPhoto, &args.person),
        (UploadSlot::TopGarment, &args.top),
        (UploadSlot::BottomGarment, &args.bottom),
    ] {
        let upload = session
            .config()
            .upload_policy
            .load(path)
            .map_err(StylistError::from)
            .and_then(|upload| session.select_upload(slot, upload));
        if let Err(e) = upload {
            let message = e.user_message(&session.config().messages, session.language());
            bail!("{} ({}): {}: {}", slot, path.display(), message, e);
        }
    }

    for (field, value) in MeasurementField::ALL.into_iter().zip([
        &args.height,
        &args.weight,
        &args.bust,
        &args.waist,
        &args.hips,
    ]) {
        session.set_measurement(field, value.as_str());
    }
    if let Some(style) = &args.style {
        if !session.set_style(style) {
            bail!("Unknown style preference: {}", style);
        }
    }

    let runner = session.clone();
    let mut submission = tokio::spawn(async move { runner.submit().await });
    let mut ticker = tokio::time::interval(Duration::from_millis(100));
    let mut last_progress = None;

    let outcome = loop {
        tokio::select! {
            joined = &mut submission => break joined.context("Submission task panicked")?,
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted, cancelling submission");
                session.cancel();
            }
            _ = ticker.tick() => {
                let progress = session.snapshot().progress;
                if progress.is_some() && progress != last_progress {
                    if let Some(state) = &progress {
                        eprintln!("{}", render_progress(state));
                    }
                    last_progress = progress;
                }
            }
        }
    };

    let snapshot = session.snapshot();
    if let Some(state) = snapshot.progress.as_ref().filter(|p| Some(*p) != last_progress.as_ref()) {
        eprintln!("{}", render_progress(state));
    }

    match outcome {
        SubmitOutcome::Completed => {
            println!("{}", render_snapshot(&snapshot, &session.config().messages));
            Ok(())
        }
        SubmitOutcome::Cancelled => bail!("Submission cancelled"),
        SubmitOutcome::Rejected(message) | SubmitOutcome::Failed(message) => bail!(message),
    }
}
