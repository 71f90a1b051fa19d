use std::fmt;
use std::time::Duration;

use crate::error::{Result, StylistError};
use crate::locale::{Language, Messages};
use crate::measurements::StyleCatalog;
use crate::progress::ProgressTable;
use crate::retry::{Backoff, RetryPolicy};
use crate::upload::UploadPolicy;

pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8000";
pub const DEFAULT_GENERATE_PATH: &str = "/api/generate-clothing";
pub const DEFAULT_RECOMMEND_PATH: &str = "/api/recommend-hairstyle";
pub const DEFAULT_TRYON_PATH: &str = "/api/hairstyle-tryon";
pub const DEFAULT_WORKFLOW_ENDPOINT: &str = "https://api.coze.cn";

pub const ENV_API_URL: &str = "MIRRORMUSE_API_URL";
pub const ENV_HAIRSTYLE_API_URL: &str = "MIRRORMUSE_HAIRSTYLE_API_URL";
pub const ENV_HAIRSTYLE_WORKFLOW_ID: &str = "MIRRORMUSE_HAIRSTYLE_WORKFLOW_ID";
pub const ENV_HAIRSTYLE_TRYON_WORKFLOW_ID: &str = "MIRRORMUSE_HAIRSTYLE_TRYON_WORKFLOW_ID";
pub const ENV_HAIRSTYLE_TOKEN: &str = "MIRRORMUSE_HAIRSTYLE_TOKEN";

/// Where hairstyle recommendations come from.
#[derive(Clone, PartialEq, Eq)]
pub enum HairstyleProvider {
    /// Endpoints served next to the generation endpoint.
    FirstParty {
        recommend_path: String,
        tryon_path: String,
    },
    /// A third-party workflow-execution API authenticated with a bearer token.
    Workflow {
        endpoint: String,
        workflow_id: String,
        tryon_workflow_id: Option<String>,
        token: String,
    },
}

impl Default for HairstyleProvider {
    fn default() -> Self {
        HairstyleProvider::FirstParty {
            recommend_path: DEFAULT_RECOMMEND_PATH.to_string(),
            tryon_path: DEFAULT_TRYON_PATH.to_string(),
        }
    }
}

impl fmt::Debug for HairstyleProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HairstyleProvider::FirstParty {
                recommend_path,
                tryon_path,
            } => f
                .debug_struct("FirstParty")
                .field("recommend_path", recommend_path)
                .field("tryon_path", tryon_path)
                .finish(),
            HairstyleProvider::Workflow {
                endpoint,
                workflow_id,
                tryon_workflow_id,
                ..
            } => f
                .debug_struct("Workflow")
                .field("endpoint", endpoint)
                .field("workflow_id", workflow_id)
                .field("tryon_workflow_id", tryon_workflow_id)
                .field("token", &"<redacted>")
                .finish(),
        }
    }
}

/// How the two hairstyle recommendation requests are scheduled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HairstyleMode {
    /// One after the other, separated by the inter-call delay.
    Serial,
    #[default]
    Parallel,
}

/// What a hairstyle-phase failure does to the submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HairstyleFailure {
    /// Keep the outfit results, report the error, show empty hairstyle grids.
    #[default]
    Isolated,
    /// Abort the whole submission.
    Fatal,
}

/// Settings for the secondary hairstyle phase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HairstylePlan {
    pub enabled: bool,
    pub mode: HairstyleMode,
    pub failure: HairstyleFailure,
    /// Render each candidate through the virtual try-on call.
    pub try_on: bool,
    /// Pause between consecutive calls to the same provider.
    pub inter_call_delay: Duration,
    pub retry: RetryPolicy,
}

impl Default for HairstylePlan {
    fn default() -> Self {
        Self {
            enabled: true,
            mode: HairstyleMode::default(),
            failure: HairstyleFailure::default(),
            try_on: false,
            inter_call_delay: Duration::from_secs(2),
            retry: RetryPolicy::new(3, Backoff::Fixed(Duration::from_secs(2))),
        }
    }
}

impl HairstylePlan {
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Default::default()
        }
    }
}

/// Immutable configuration for clients, workflow and session.
///
/// Use [`StylistConfig::builder()`] for construction, [`StylistConfig::from_env()`]
/// to pick up deployment overrides, or [`StylistConfig::default()`].
#[derive(Debug, Clone)]
pub struct StylistConfig {
    /// Base URL of the generation service.
    pub base_url: String,
    /// Path of the multipart generation endpoint.
    pub generate_path: String,
    /// Per-request timeout for all outbound calls.
    pub request_timeout: Duration,
    /// Pause between client-paced progress stages.
    pub stage_delay: Duration,
    /// How long an error banner stays visible.
    pub error_ttl: Duration,
    pub language: Language,
    pub upload_policy: UploadPolicy,
    pub hairstyle_provider: HairstyleProvider,
    pub hairstyles: HairstylePlan,
    pub messages: Messages,
    pub progress: ProgressTable,
    pub styles: StyleCatalog,
}

impl Default for StylistConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            generate_path: DEFAULT_GENERATE_PATH.to_string(),
            request_timeout: Duration::from_secs(180),
            stage_delay: Duration::from_millis(500),
            error_ttl: Duration::from_secs(5),
            language: Language::default(),
            upload_policy: UploadPolicy::default(),
            hairstyle_provider: HairstyleProvider::default(),
            hairstyles: HairstylePlan::default(),
            messages: Messages::default(),
            progress: ProgressTable::default(),
            styles: StyleCatalog::default(),
        }
    }
}

impl StylistConfig {
    pub fn builder() -> StylistConfigBuilder {
        StylistConfigBuilder::default()
    }

    /// Defaults overridden by `MIRRORMUSE_*` environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Like [`from_env`](Self::from_env) but reading variables through `lookup`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let mut builder = Self::builder();

        if let Some(url) = get(ENV_API_URL) {
            builder = builder.with_base_url(url);
        }

        match (get(ENV_HAIRSTYLE_WORKFLOW_ID), get(ENV_HAIRSTYLE_TOKEN)) {
            (Some(workflow_id), Some(token)) => {
                builder = builder.with_hairstyle_provider(HairstyleProvider::Workflow {
                    endpoint: get(ENV_HAIRSTYLE_API_URL)
                        .unwrap_or_else(|| DEFAULT_WORKFLOW_ENDPOINT.to_string()),
                    workflow_id,
                    tryon_workflow_id: get(ENV_HAIRSTYLE_TRYON_WORKFLOW_ID),
                    token,
                });
            }
            (Some(_), None) => {
                return Err(StylistError::InvalidConfig(format!(
                    "{} is set but {} is missing",
                    ENV_HAIRSTYLE_WORKFLOW_ID, ENV_HAIRSTYLE_TOKEN
                )));
            }
            _ => {}
        }

        Ok(builder.build())
    }

    /// Full URL of the generation endpoint.
    pub fn generate_url(&self) -> String {
        join_url(&self.base_url, &self.generate_path)
    }
}

pub(crate) fn join_url(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

/// Builder for [`StylistConfig`].
#[derive(Default)]
pub struct StylistConfigBuilder {
    config: StylistConfig,
}

impl StylistConfigBuilder {
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.config.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_generate_path(mut self, path: impl Into<String>) -> Self {
        self.config.generate_path = path.into();
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.config.request_timeout = timeout;
        self
    }

    /// Set the pause between client-paced progress stages (zero disables pacing).
    pub fn with_stage_delay(mut self, delay: Duration) -> Self {
        self.config.stage_delay = delay;
        self
    }

    pub fn with_error_ttl(mut self, ttl: Duration) -> Self {
        self.config.error_ttl = ttl;
        self
    }

    pub fn with_language(mut self, lang: Language) -> Self {
        self.config.language = lang;
        self
    }

    pub fn with_upload_policy(mut self, policy: UploadPolicy) -> Self {
        self.config.upload_policy = policy;
        self
    }

    pub fn with_hairstyle_provider(mut self, provider: HairstyleProvider) -> Self {
        self.config.hairstyle_provider = provider;
        self
    }

    pub fn with_hairstyles(mut self, plan: HairstylePlan) -> Self {
        self.config.hairstyles = plan;
        self
    }

    pub fn with_messages(mut self, messages: Messages) -> Self {
        self.config.messages = messages;
        self
    }

    pub fn with_progress_table(mut self, table: ProgressTable) -> Self {
        self.config.progress = table;
        self
    }

    pub fn with_styles(mut self, styles: StyleCatalog) -> Self {
        self.config.styles = styles;
        self
    }

    pub fn build(self) -> StylistConfig {
        self.config
    }
}
