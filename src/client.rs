use reqwest::multipart::{Form, Part};
use reqwest::{Client, Response};
use serde_json::Value;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use crate::config::StylistConfig;
use crate::error::{Result, StylistError};
use crate::measurements::MeasurementForm;
use crate::types::{GenerationResult, Hairstyle};
use crate::upload::{UploadImages, UploadSlot};

/// Everything one submission sends to the generation service.
#[derive(Debug, Clone)]
pub struct SubmissionRequest {
    pub images: UploadImages,
    pub form: MeasurementForm,
}

/// Produces outfit results from uploaded images and measurements.
///
/// Implemented by [`GenerationClient`] over HTTP; tests substitute
/// in-process fakes.
pub trait GenerationBackend: Send + Sync {
    fn generate(
        &self,
        request: &SubmissionRequest,
    ) -> impl Future<Output = Result<GenerationResult>> + Send;
}

/// Produces hairstyle candidates for a try-on image and renders them.
pub trait HairstyleBackend: Send + Sync {
    /// Recommend hairstyles for the person shown in `image_url`.
    fn recommend(
        &self,
        image_url: &str,
        style_preference: &str,
    ) -> impl Future<Output = Result<Vec<Hairstyle>>> + Send;

    /// Render `hairstyle` onto `image_url`, returning the new image reference.
    fn try_on(
        &self,
        image_url: &str,
        hairstyle: &Hairstyle,
    ) -> impl Future<Output = Result<String>> + Send;
}

impl<T: GenerationBackend> GenerationBackend for Arc<T> {
    fn generate(
        &self,
        request: &SubmissionRequest,
    ) -> impl Future<Output = Result<GenerationResult>> + Send {
        (**self).generate(request)
    }
}

impl<T: HairstyleBackend> HairstyleBackend for Arc<T> {
    fn recommend(
        &self,
        image_url: &str,
        style_preference: &str,
    ) -> impl Future<Output = Result<Vec<Hairstyle>>> + Send {
        (**self).recommend(image_url, style_preference)
    }

    fn try_on(
        &self,
        image_url: &str,
        hairstyle: &Hairstyle,
    ) -> impl Future<Output = Result<String>> + Send {
        (**self).try_on(image_url, hairstyle)
    }
}

/// Async client for the multipart generation endpoint.
///
/// # Example
/// ```no_run
/// use mirrormuse::{GenerationClient, StylistConfig};
///
/// let config = StylistConfig::builder()
///     .with_base_url("http://127.0.0.1:8000")
///     .build();
/// let client = GenerationClient::from_config(&config);
/// assert!(client.url().ends_with("/api/generate-clothing"));
/// ```
#[derive(Debug, Clone)]
pub struct GenerationClient {
    http: Client,
    url: String,
    timeout: Duration,
}

impl GenerationClient {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            http: Client::new(),
            url: url.into(),
            timeout: Duration::from_secs(180),
        }
    }

    pub fn from_config(config: &StylistConfig) -> Self {
        Self::new(config.generate_url()).with_timeout(config.request_timeout)
    }

    /// Use a custom `reqwest::Client` (for connection pooling, proxies, TLS).
    pub fn with_http_client(mut self, client: Client) -> Self {
        self.http = client;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Build the multipart body: three images followed by the flattened form.
    fn build_form(request: &SubmissionRequest) -> Result<Form> {
        let mut form = Form::new();
        for slot in UploadSlot::ALL {
            let image = request.images.get(slot);
            let part = Part::bytes(image.bytes.as_ref().clone())
                .file_name(image.file_name.clone())
                .mime_str(&image.content_type)
                .map_err(|e| {
                    StylistError::Other(format!(
                        "Invalid content type '{}' for {}: {}",
                        image.content_type, slot, e
                    ))
                })?;
            form = form.part(slot.field_name(), part);
        }
        for (name, value) in request.form.to_fields() {
            form = form.text(name, value);
        }
        Ok(form)
    }

    pub async fn generate(&self, request: &SubmissionRequest) -> Result<GenerationResult> {
        let form = Self::build_form(request)?;
        tracing::info!(url = %self.url, "Submitting generation request");

        let resp = self
            .http
            .post(&self.url)
            .timeout(self.timeout)
            .multipart(form)
            .send()
            .await
            .map_err(|e| StylistError::Network {
                context: format!("Failed to reach generation service at {}", self.url),
                source: e,
            })?;

        let resp = ensure_success(resp).await?;
        let bytes = resp.bytes().await.map_err(|e| StylistError::Network {
            context: "Failed to read generation response".into(),
            source: e,
        })?;

        let result: GenerationResult = serde_json::from_slice(&bytes).inspect_err(|e| {
            tracing::error!(error = %e, len = bytes.len(), "Malformed generation response")
        })?;
        tracing::info!(
            custom_score = result.custom.score,
            generated_score = result.generated.score,
            "Generation finished"
        );
        Ok(result)
    }
}

impl GenerationBackend for GenerationClient {
    async fn generate(&self, request: &SubmissionRequest) -> Result<GenerationResult> {
        GenerationClient::generate(self, request).await
    }
}

/// Turn a non-2xx response into [`StylistError::Http`].
///
/// The message is the JSON `error` (or `message`) field when the body has
/// one, otherwise `Server error: <status>`.
pub(crate) async fn ensure_success(resp: Response) -> Result<Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    Err(StylistError::Http {
        status: status.as_u16(),
        message: error_message(status.as_u16(), &body),
    })
}

pub(crate) fn error_message(status: u16, body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|json| {
            json.get("error")
                .or_else(|| json.get("message"))
                .and_then(|v| v.as_str())
                .map(String::from)
        })
        .filter(|msg| !msg.is_empty())
        .unwrap_or_else(|| format!("Server error: {}", status))
}
