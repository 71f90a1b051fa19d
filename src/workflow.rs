use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::client::{GenerationBackend, HairstyleBackend, SubmissionRequest};
use crate::config::{HairstyleFailure, HairstyleMode, StylistConfig};
use crate::error::{Result, StylistError};
use crate::locale::Language;
use crate::measurements::MeasurementForm;
use crate::progress::{ProgressStage, ProgressState, ProgressTracker};
use crate::retry::retry;
use crate::types::{GenerationResult, Hairstyle, HairstyleSet, OutfitKind};
use crate::upload::Uploads;

/// Result of a completed submission.
#[derive(Debug)]
pub struct WorkflowOutcome {
    pub outfits: GenerationResult,
    /// Empty when the hairstyle phase is disabled or failed in isolation.
    pub hairstyles: HairstyleSet,
    /// Set when the hairstyle phase failed under [`HairstyleFailure::Isolated`].
    pub hairstyle_error: Option<StylistError>,
}

/// The submission pipeline: generation, paced progress, hairstyle phase.
///
/// Generic over its backends so the same orchestration runs against the
/// HTTP clients in production and in-process fakes in tests.
pub struct StylingWorkflow<G, H> {
    generation: G,
    hairstyles: H,
    config: Arc<StylistConfig>,
}

impl<G, H> StylingWorkflow<G, H>
where
    G: GenerationBackend,
    H: HairstyleBackend,
{
    pub fn new(generation: G, hairstyles: H, config: Arc<StylistConfig>) -> Self {
        Self {
            generation,
            hairstyles,
            config,
        }
    }

    pub fn config(&self) -> &StylistConfig {
        &self.config
    }

    /// Assemble a request, rejecting missing uploads and then an incomplete
    /// form. Never touches the network.
    pub fn prepare(uploads: &Uploads, form: &MeasurementForm) -> Result<SubmissionRequest> {
        let images = uploads.images().map_err(StylistError::MissingUploads)?;
        form.validate()?;
        Ok(SubmissionRequest {
            images,
            form: form.clone(),
        })
    }

    /// Run one submission to completion.
    ///
    /// `on_progress` receives every stage transition. `on_outfits` fires once,
    /// after the generation response and its paced stages, before the
    /// hairstyle phase starts. Cancelling `cancel` at any await point ends
    /// the run with [`StylistError::Cancelled`].
    pub async fn run<P, O>(
        &self,
        request: &SubmissionRequest,
        lang: Language,
        cancel: &CancellationToken,
        on_progress: P,
        on_outfits: O,
    ) -> Result<WorkflowOutcome>
    where
        P: FnMut(ProgressState) + Send,
        O: FnOnce(&GenerationResult) + Send,
    {
        let mut progress = Progress {
            tracker: ProgressTracker::new(self.config.progress.clone(), lang),
            sink: on_progress,
        };

        ensure_active(cancel)?;
        progress.advance(ProgressStage::Upload);

        let outfits = tokio::select! {
            _ = cancel.cancelled() => return Err(StylistError::Cancelled),
            r = self.generation.generate(request) => r?,
        };

        progress.advance(ProgressStage::Analysis);
        for stage in ProgressStage::GENERATION_PACED {
            pause(cancel, self.config.stage_delay).await?;
            progress.advance(stage);
        }
        on_outfits(&outfits);

        let plan = &self.config.hairstyles;
        let (hairstyles, hairstyle_error) = if plan.enabled {
            let style = request.form.style_preference.as_str();
            match self
                .hairstyle_phase(&outfits, style, cancel, &mut progress)
                .await
            {
                Ok(set) => (set, None),
                Err(e) if e.is_cancelled() => return Err(e),
                Err(e) if plan.failure == HairstyleFailure::Fatal => {
                    tracing::error!(error = %e, "Hairstyle phase failed");
                    return Err(StylistError::Hairstyle(Box::new(e)));
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Hairstyle phase failed, keeping outfit results");
                    (HairstyleSet::default(), Some(e))
                }
            }
        } else {
            (HairstyleSet::default(), None)
        };

        ensure_active(cancel)?;
        progress.advance(ProgressStage::Complete);
        tracing::info!(
            custom = hairstyles.custom.len(),
            generated = hairstyles.generated.len(),
            "Submission complete"
        );

        Ok(WorkflowOutcome {
            outfits,
            hairstyles,
            hairstyle_error,
        })
    }

    async fn hairstyle_phase<P>(
        &self,
        outfits: &GenerationResult,
        style: &str,
        cancel: &CancellationToken,
        progress: &mut Progress<P>,
    ) -> Result<HairstyleSet>
    where
        P: FnMut(ProgressState) + Send,
    {
        let plan = &self.config.hairstyles;

        pause(cancel, self.config.stage_delay).await?;
        progress.advance(ProgressStage::HairstyleAnalysis);

        let custom_image = outfits.custom.try_on_url.as_str();
        let generated_image = outfits.generated.try_on_url.as_str();

        let (custom, generated) = match plan.mode {
            HairstyleMode::Parallel => {
                let (custom, generated) = futures::join!(
                    self.recommend(custom_image, style, cancel),
                    self.recommend(generated_image, style, cancel),
                );
                (custom?, generated?)
            }
            HairstyleMode::Serial => {
                let custom = self.recommend(custom_image, style, cancel).await?;
                pause(cancel, plan.inter_call_delay).await?;
                let generated = self.recommend(generated_image, style, cancel).await?;
                (custom, generated)
            }
        };
        progress.advance(ProgressStage::HairstyleGeneration);

        let mut set = HairstyleSet { custom, generated };
        if plan.try_on {
            let mut first = true;
            for (kind, stage) in [
                (OutfitKind::Custom, ProgressStage::HairstyleCustom),
                (OutfitKind::Generated, ProgressStage::HairstyleGenerated),
            ] {
                progress.advance(stage);
                let image = outfits.outfit(kind).try_on_url.as_str();
                for candidate in set.get_mut(kind).iter_mut() {
                    if !first {
                        pause(cancel, plan.inter_call_delay).await?;
                    }
                    first = false;
                    self.apply_try_on(image, candidate, cancel).await?;
                }
            }
        }

        Ok(set)
    }

    async fn recommend(
        &self,
        image: &str,
        style: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<Hairstyle>> {
        let backend = &self.hairstyles;
        retry(&self.config.hairstyles.retry, cancel, "recommend_hairstyle", move |_| {
            backend.recommend(image, style)
        })
        .await
    }

    /// Replace the candidate's image with its try-on render. A candidate
    /// whose render fails keeps its original image; only cancellation
    /// propagates.
    async fn apply_try_on(
        &self,
        image: &str,
        candidate: &mut Hairstyle,
        cancel: &CancellationToken,
    ) -> Result<()> {
        let backend = &self.hairstyles;
        let current = candidate.clone();
        let current = &current;
        let rendered = retry(&self.config.hairstyles.retry, cancel, "hairstyle_tryon", move |_| {
            backend.try_on(image, current)
        })
        .await;

        match rendered {
            Ok(url) => {
                candidate.img = url;
                Ok(())
            }
            Err(e) if e.is_cancelled() => Err(e),
            Err(e) => {
                tracing::warn!(
                    hairstyle = %candidate.hairstyle,
                    error = %e,
                    "Hairstyle try-on failed, keeping original image"
                );
                Ok(())
            }
        }
    }
}

struct Progress<P> {
    tracker: ProgressTracker,
    sink: P,
}

impl<P: FnMut(ProgressState)> Progress<P> {
    fn advance(&mut self, stage: ProgressStage) {
        if let Some(state) = self.tracker.advance(stage) {
            tracing::debug!(stage = %state.stage, percent = state.percent, "Progress");
            (self.sink)(state);
        }
    }
}

fn ensure_active(cancel: &CancellationToken) -> Result<()> {
    if cancel.is_cancelled() {
        Err(StylistError::Cancelled)
    } else {
        Ok(())
    }
}

/// Sleep for `delay` unless cancelled first.
async fn pause(cancel: &CancellationToken, delay: Duration) -> Result<()> {
    ensure_active(cancel)?;
    if delay.is_zero() {
        return Ok(());
    }
    tokio::select! {
        _ = cancel.cancelled() => Err(StylistError::Cancelled),
        _ = tokio::time::sleep(delay) => Ok(()),
    }
}
