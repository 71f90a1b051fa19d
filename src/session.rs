use std::sync::{Arc, Mutex, MutexGuard};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::client::{GenerationBackend, HairstyleBackend};
use crate::config::StylistConfig;
use crate::error::StylistError;
use crate::locale::Language;
use crate::measurements::{MeasurementField, MeasurementForm};
use crate::progress::ProgressState;
use crate::types::{GenerationResult, HairstyleSet};
use crate::upload::{ImageUpload, UploadSlot, Uploads};
use crate::workflow::StylingWorkflow;

/// How a call to [`StylistSession::submit`] ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    Completed,
    /// Cancelled explicitly or superseded by a newer submission.
    Cancelled,
    /// Refused before any network call (missing uploads, invalid form).
    Rejected(String),
    Failed(String),
}

/// What the page shows at a point in time.
#[derive(Debug, Clone, Default)]
pub struct SessionSnapshot {
    pub language: Language,
    pub loading: bool,
    pub progress: Option<ProgressState>,
    pub result: Option<GenerationResult>,
    pub hairstyles: HairstyleSet,
    pub hairstyle_error: Option<String>,
    /// Visible error banner, if one was raised less than `error_ttl` ago.
    pub error: Option<String>,
}

#[derive(Debug)]
struct Banner {
    message: String,
    raised_at: Instant,
}

#[derive(Debug)]
struct SessionState {
    uploads: Uploads,
    form: MeasurementForm,
    language: Language,
    loading: bool,
    progress: Option<ProgressState>,
    result: Option<GenerationResult>,
    hairstyles: HairstyleSet,
    hairstyle_error: Option<String>,
    banner: Option<Banner>,
    generation: u64,
    cancel: CancellationToken,
}

impl SessionState {
    fn raise(&mut self, message: String) {
        tracing::debug!(%message, "Error banner raised");
        self.banner = Some(Banner {
            message,
            raised_at: Instant::now(),
        });
    }
}

/// One stylist page: uploads, the form, and the visible state of the
/// latest submission.
///
/// Cheap to clone; clones share state, so a submission can be driven from
/// one task while another cancels it or takes snapshots.
pub struct StylistSession<G, H> {
    workflow: Arc<StylingWorkflow<G, H>>,
    config: Arc<StylistConfig>,
    state: Arc<Mutex<SessionState>>,
}

impl<G, H> Clone for StylistSession<G, H> {
    fn clone(&self) -> Self {
        Self {
            workflow: Arc::clone(&self.workflow),
            config: Arc::clone(&self.config),
            state: Arc::clone(&self.state),
        }
    }
}

impl<G, H> StylistSession<G, H>
where
    G: GenerationBackend,
    H: HairstyleBackend,
{
    pub fn new(generation: G, hairstyles: H, config: StylistConfig) -> Self {
        let config = Arc::new(config);
        let state = SessionState {
            uploads: Uploads::new(),
            form: MeasurementForm::new(&config.styles),
            language: config.language,
            loading: false,
            progress: None,
            result: None,
            hairstyles: HairstyleSet::default(),
            hairstyle_error: None,
            banner: None,
            generation: 0,
            cancel: CancellationToken::new(),
        };
        Self {
            workflow: Arc::new(StylingWorkflow::new(generation, hairstyles, Arc::clone(&config))),
            config,
            state: Arc::new(Mutex::new(state)),
        }
    }

    pub fn config(&self) -> &StylistConfig {
        &self.config
    }

    fn lock(&self) -> MutexGuard<'_, SessionState> {
        lock(&self.state)
    }

    /// Validate and store an upload, returning its preview URL. A rejected
    /// file raises the localized banner and leaves the slot as it was.
    pub fn select_upload(&self, slot: UploadSlot, upload: ImageUpload) -> Result<String, StylistError> {
        let mut state = self.lock();
        match state.uploads.set(slot, upload, &self.config.upload_policy) {
            Ok(preview) => Ok(preview.preview.url().to_string()),
            Err(e) => {
                tracing::warn!(slot = %slot, error = %e, "Upload rejected");
                let err = StylistError::from(e);
                let message = err.user_message(&self.config.messages, state.language);
                state.raise(message);
                Err(err)
            }
        }
    }

    pub fn clear_upload(&self, slot: UploadSlot) {
        self.lock().uploads.clear(slot);
    }

    pub fn set_measurement(&self, field: MeasurementField, value: impl Into<String>) {
        self.lock().form.set(field, value);
    }

    /// Select a style by its stored value or either localized label.
    /// Returns `false` (and keeps the current style) for unknown input.
    pub fn set_style(&self, style: &str) -> bool {
        match self.config.styles.resolve(style) {
            Some(value) => {
                let value = value.to_string();
                self.lock().form.set_style(value);
                true
            }
            None => false,
        }
    }

    pub fn set_language(&self, lang: Language) {
        self.lock().language = lang;
    }

    pub fn language(&self) -> Language {
        self.lock().language
    }

    pub fn live_previews(&self) -> usize {
        self.lock().uploads.registry().live()
    }

    /// Cancel the in-flight submission, if any.
    pub fn cancel(&self) {
        let state = self.lock();
        if state.loading {
            tracing::info!(generation = state.generation, "Cancelling submission");
        }
        state.cancel.cancel();
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let state = self.lock();
        let error = state
            .banner
            .as_ref()
            .filter(|b| b.raised_at.elapsed() < self.config.error_ttl)
            .map(|b| b.message.clone());
        SessionSnapshot {
            language: state.language,
            loading: state.loading,
            progress: state.progress.clone(),
            result: state.result.clone(),
            hairstyles: state.hairstyles.clone(),
            hairstyle_error: state.hairstyle_error.clone(),
            error,
        }
    }

    /// Submit the current uploads and form.
    ///
    /// Supersedes any earlier submission: its token is cancelled and its
    /// late updates are discarded. Only the newest submission commits state.
    pub async fn submit(&self) -> SubmitOutcome {
        let (request, cancel, generation, lang, previous) = {
            let mut state = self.lock();
            let request = match StylingWorkflow::<G, H>::prepare(&state.uploads, &state.form) {
                Ok(request) => request,
                Err(e) => {
                    tracing::info!(error = %e, "Submission rejected");
                    let message = e.user_message(&self.config.messages, state.language);
                    state.raise(message.clone());
                    return SubmitOutcome::Rejected(message);
                }
            };

            state.cancel.cancel();
            state.cancel = CancellationToken::new();
            state.generation += 1;
            state.loading = true;
            state.banner = None;
            state.hairstyle_error = None;
            state.progress = None;
            (
                request,
                state.cancel.clone(),
                state.generation,
                state.language,
                state.result.clone(),
            )
        };
        tracing::info!(generation, "Submission started");

        let progress_state = Arc::clone(&self.state);
        let on_progress = move |progress: ProgressState| {
            let mut state = lock(&progress_state);
            if state.generation == generation {
                state.progress = Some(progress);
            }
        };
        let outfit_state = Arc::clone(&self.state);
        let on_outfits = move |outfits: &GenerationResult| {
            let mut state = lock(&outfit_state);
            if state.generation == generation {
                state.result = Some(outfits.clone());
                state.hairstyles = HairstyleSet::default();
            }
        };

        let result = self
            .workflow
            .run(&request, lang, &cancel, on_progress, on_outfits)
            .await;

        let mut state = self.lock();
        if state.generation != generation {
            tracing::debug!(generation, current = state.generation, "Discarding superseded submission");
            return SubmitOutcome::Cancelled;
        }
        state.loading = false;

        match result {
            Ok(outcome) => {
                state.result = Some(outcome.outfits);
                state.hairstyles = outcome.hairstyles;
                if let Some(e) = outcome.hairstyle_error {
                    let message = self.config.messages.hairstyle_failed.get(state.language).to_string();
                    tracing::warn!(error = %e, "Hairstyle recommendations unavailable");
                    state.hairstyle_error = Some(e.to_string());
                    state.raise(message);
                }
                SubmitOutcome::Completed
            }
            Err(e) if e.is_cancelled() => {
                tracing::info!(generation, "Submission cancelled");
                state.progress = None;
                SubmitOutcome::Cancelled
            }
            Err(e) => {
                tracing::error!(generation, error = %e, "Submission failed");
                state.result = previous;
                state.progress = None;
                let message = e.user_message(&self.config.messages, state.language);
                state.raise(message.clone());
                SubmitOutcome::Failed(message)
            }
        }
    }
}

fn lock(state: &Mutex<SessionState>) -> MutexGuard<'_, SessionState> {
    state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::SubmissionRequest;
    use crate::config::HairstylePlan;
    use crate::error::Result;
    use crate::types::Hairstyle;
    use crate::upload::UploadError;
    use std::time::Duration;

    struct Unreachable;

    impl GenerationBackend for Unreachable {
        async fn generate(&self, _request: &SubmissionRequest) -> Result<GenerationResult> {
            panic!("generation must not be called");
        }
    }

    impl HairstyleBackend for Unreachable {
        async fn recommend(&self, _image: &str, _style: &str) -> Result<Vec<Hairstyle>> {
            panic!("recommend must not be called");
        }

        async fn try_on(&self, _image: &str, _hairstyle: &Hairstyle) -> Result<String> {
            panic!("try_on must not be called");
        }
    }

    fn session() -> StylistSession<Unreachable, Unreachable> {
        let config = StylistConfig::builder()
            .with_language(Language::En)
            .with_stage_delay(Duration::ZERO)
            .with_hairstyles(HairstylePlan::disabled())
            .build();
        StylistSession::new(Unreachable, Unreachable, config)
    }

    #[test]
    fn test_oversized_upload_rejected_without_state_change() {
        let session = session();
        let big = ImageUpload::new("huge.png", "image/png", vec![0; 6 * 1024 * 1024]);
        let err = session.select_upload(UploadSlot::PersonPhoto, big).unwrap_err();

        assert!(matches!(
            err,
            StylistError::Upload(UploadError::TooLarge { size, limit, .. })
                if size == 6 * 1024 * 1024 && limit == 5 * 1024 * 1024
        ));
        assert_eq!(session.live_previews(), 0);
        assert_eq!(
            session.snapshot().error.as_deref(),
            Some("File size must be less than 5MB")
        );
    }

    #[test]
    fn test_replacing_upload_releases_previous_preview() {
        let session = session();
        let first = session
            .select_upload(UploadSlot::TopGarment, ImageUpload::new("a.png", "image/png", vec![1]))
            .unwrap();
        let second = session
            .select_upload(UploadSlot::TopGarment, ImageUpload::new("b.png", "image/png", vec![2]))
            .unwrap();
        assert_ne!(first, second);
        assert_eq!(session.live_previews(), 1);
    }

    #[tokio::test]
    async fn test_submit_with_missing_uploads_makes_no_call() {
        let session = session();
        let outcome = session.submit().await;

        assert_eq!(
            outcome,
            SubmitOutcome::Rejected("Please upload all required images".into())
        );
        let snapshot = session.snapshot();
        assert!(!snapshot.loading);
        assert!(snapshot.result.is_none());
    }

    #[test]
    fn test_set_style_accepts_labels() {
        let session = session();
        assert!(session.set_style("Vintage"));
        assert!(!session.set_style("Punk"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_banner_expires_after_ttl() {
        let session = session();
        session.submit().await;
        assert!(session.snapshot().error.is_some());

        tokio::time::advance(Duration::from_secs(6)).await;
        assert!(session.snapshot().error.is_none());
    }
}
