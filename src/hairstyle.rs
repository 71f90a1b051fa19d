use reqwest::Client;
use serde_json::{json, Value};
use std::time::Duration;

use crate::client::{ensure_success, HairstyleBackend};
use crate::config::{join_url, HairstyleProvider, StylistConfig};
use crate::error::{Result, StylistError};
use crate::types::Hairstyle;

/// Client for hairstyle recommendation and virtual hairstyle try-on.
///
/// Talks either to first-party endpoints next to the generation service or
/// to a third-party workflow-execution API, depending on the configured
/// [`HairstyleProvider`].
#[derive(Debug, Clone)]
pub struct HairstyleClient {
    http: Client,
    base_url: String,
    provider: HairstyleProvider,
    timeout: Duration,
    default_name: String,
    default_reason: String,
}

impl HairstyleClient {
    pub fn new(base_url: impl Into<String>, provider: HairstyleProvider) -> Self {
        Self {
            http: Client::new(),
            base_url: base_url.into(),
            provider,
            timeout: Duration::from_secs(120),
            default_name: "Recommended hairstyle".to_string(),
            default_reason: String::new(),
        }
    }

    /// Build from config; fallback name and reason follow the configured language.
    pub fn from_config(config: &StylistConfig) -> Self {
        let lang = config.language;
        Self::new(config.base_url.clone(), config.hairstyle_provider.clone())
            .with_timeout(config.request_timeout)
            .with_defaults(
                config.messages.default_hairstyle_name.get(lang),
                config.messages.default_hairstyle_reason.get(lang),
            )
    }

    pub fn with_http_client(mut self, client: Client) -> Self {
        self.http = client;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Text used when a candidate arrives without a name or reason.
    pub fn with_defaults(mut self, name: impl Into<String>, reason: impl Into<String>) -> Self {
        self.default_name = name.into();
        self.default_reason = reason.into();
        self
    }

    pub fn provider(&self) -> &HairstyleProvider {
        &self.provider
    }

    pub async fn recommend(&self, image_url: &str, style_preference: &str) -> Result<Vec<Hairstyle>> {
        let payload = match &self.provider {
            HairstyleProvider::FirstParty { recommend_path, .. } => {
                let url = join_url(&self.base_url, recommend_path);
                let body = json!({
                    "image": image_url,
                    "style_preference": style_preference,
                });
                self.post_json(&url, None, &body).await?
            }
            HairstyleProvider::Workflow {
                endpoint,
                workflow_id,
                token,
                ..
            } => {
                let parameters = json!({
                    "input_image": image_url,
                    "image_type": "portrait",
                    "style_preference": style_preference,
                });
                let data = self
                    .run_workflow(endpoint, token, workflow_id, parameters)
                    .await?;
                decode_workflow_json(data)?
            }
        };

        let hairstyles = normalize_hairstyles(
            candidate_list(&payload),
            &self.default_name,
            &self.default_reason,
        );
        tracing::debug!(count = hairstyles.len(), "Hairstyle recommendations received");
        Ok(hairstyles)
    }

    pub async fn try_on(&self, image_url: &str, hairstyle: &Hairstyle) -> Result<String> {
        let payload = match &self.provider {
            HairstyleProvider::FirstParty { tryon_path, .. } => {
                let url = join_url(&self.base_url, tryon_path);
                let body = json!({
                    "image": image_url,
                    "hairstyle": hairstyle.hairstyle,
                });
                self.post_json(&url, None, &body).await?
            }
            HairstyleProvider::Workflow {
                endpoint,
                tryon_workflow_id,
                token,
                ..
            } => {
                let workflow_id = tryon_workflow_id.as_deref().ok_or_else(|| {
                    StylistError::InvalidConfig(
                        "Hairstyle try-on requested but no try-on workflow is configured".into(),
                    )
                })?;
                let parameters = json!({
                    "input_image": image_url,
                    "hairstyle": hairstyle.hairstyle,
                });
                self.run_workflow(endpoint, token, workflow_id, parameters)
                    .await?
            }
        };

        extract_image_url(&payload).ok_or_else(|| {
            StylistError::InvalidResponse(format!(
                "Try-on for '{}' returned no image",
                hairstyle.hairstyle
            ))
        })
    }

    async fn post_json(&self, url: &str, bearer: Option<&str>, body: &Value) -> Result<Value> {
        let mut req = self.http.post(url).timeout(self.timeout).json(body);
        if let Some(token) = bearer {
            req = req.bearer_auth(token);
        }

        let resp = req.send().await.map_err(|e| StylistError::Network {
            context: format!("Failed to reach hairstyle service at {}", url),
            source: e,
        })?;
        let resp = ensure_success(resp).await?;
        let bytes = resp.bytes().await.map_err(|e| StylistError::Network {
            context: "Failed to read hairstyle service response".into(),
            source: e,
        })?;

        Ok(serde_json::from_slice(&bytes)?)
    }

    /// Run a workflow and return its `data` payload.
    async fn run_workflow(
        &self,
        endpoint: &str,
        token: &str,
        workflow_id: &str,
        parameters: Value,
    ) -> Result<Value> {
        let url = join_url(endpoint, "/v1/workflow/run");
        let body = json!({
            "workflow_id": workflow_id,
            "parameters": parameters,
        });
        tracing::debug!(workflow_id, "Running hairstyle workflow");
        let response = self.post_json(&url, Some(token), &body).await?;
        workflow_data(response)
    }
}

impl HairstyleBackend for HairstyleClient {
    async fn recommend(&self, image_url: &str, style_preference: &str) -> Result<Vec<Hairstyle>> {
        HairstyleClient::recommend(self, image_url, style_preference).await
    }

    async fn try_on(&self, image_url: &str, hairstyle: &Hairstyle) -> Result<String> {
        HairstyleClient::try_on(self, image_url, hairstyle).await
    }
}

/// Unwrap a workflow envelope `{code, msg, data}`.
///
/// Only `code == 0` with non-null `data` counts; anything else is a
/// retryable [`StylistError::Workflow`]. String data is returned as-is.
fn workflow_data(response: Value) -> Result<Value> {
    let code = response.get("code").and_then(|c| c.as_i64()).unwrap_or(-1);
    let message = response
        .get("msg")
        .or_else(|| response.get("message"))
        .and_then(|m| m.as_str())
        .unwrap_or("")
        .to_string();

    if code != 0 {
        return Err(StylistError::Workflow { code, message });
    }

    match response.get("data") {
        None | Some(Value::Null) => Err(StylistError::Workflow {
            code,
            message: "Workflow response has no data".into(),
        }),
        Some(Value::String(s)) if s.trim().is_empty() => Err(StylistError::Workflow {
            code,
            message: "Workflow response has empty data".into(),
        }),
        Some(data) => Ok(data.clone()),
    }
}

/// Decode workflow data that carries structured output as a JSON string.
///
/// A string that does not parse is a retryable [`StylistError::Workflow`]
/// rather than an empty result.
fn decode_workflow_json(data: Value) -> Result<Value> {
    match data {
        Value::String(s) => serde_json::from_str(&s).map_err(|e| {
            tracing::warn!(error = %e, len = s.len(), "Workflow data is not valid JSON");
            StylistError::Workflow {
                code: 0,
                message: format!("Workflow data is not valid JSON: {}", e),
            }
        }),
        other => Ok(other),
    }
}

/// Locate the list of candidates: the value itself if it is an array,
/// otherwise its `output`, `hairstyles` or `data` member. Empty when none fit.
fn candidate_list(value: &Value) -> Vec<Value> {
    match value {
        Value::Array(items) => items.clone(),
        Value::String(s) => match serde_json::from_str::<Value>(s) {
            Ok(inner) if !inner.is_string() => candidate_list(&inner),
            _ => Vec::new(),
        },
        Value::Object(map) => ["output", "hairstyles", "data"]
            .iter()
            .filter_map(|key| map.get(*key))
            .map(candidate_list)
            .find(|list| !list.is_empty())
            .unwrap_or_default(),
        _ => Vec::new(),
    }
}

fn normalize_hairstyles(items: Vec<Value>, default_name: &str, default_reason: &str) -> Vec<Hairstyle> {
    items
        .into_iter()
        .filter_map(|item| match item {
            Value::String(name) if !name.trim().is_empty() => Some(Hairstyle {
                hairstyle: name,
                reasons: default_reason.to_string(),
                img: String::new(),
            }),
            Value::Object(map) => {
                let text = |keys: &[&str]| {
                    keys.iter()
                        .filter_map(|k| map.get(*k).and_then(|v| v.as_str()))
                        .find(|s| !s.trim().is_empty())
                        .map(String::from)
                };
                Some(Hairstyle {
                    hairstyle: text(&["hairstyle", "name"])
                        .unwrap_or_else(|| default_name.to_string()),
                    reasons: text(&["reasons", "reason"])
                        .unwrap_or_else(|| default_reason.to_string()),
                    img: text(&["img", "image", "url"]).unwrap_or_default(),
                })
            }
            _ => None,
        })
        .collect()
}

fn extract_image_url(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => match serde_json::from_str::<Value>(s) {
            Ok(inner) if inner.is_object() => extract_image_url(&inner),
            _ if !s.trim().is_empty() => Some(s.trim().to_string()),
            _ => None,
        },
        Value::Object(map) => ["output", "image", "img", "url"]
            .iter()
            .filter_map(|key| map.get(*key))
            .find_map(extract_image_url),
        Value::Array(items) => items.iter().find_map(extract_image_url),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_workflow_data_object() {
        let data = workflow_data(json!({"code": 0, "data": {"output": []}})).unwrap();
        assert!(data.get("output").is_some());
    }

    #[test]
    fn test_workflow_data_string_payload() {
        let data = workflow_data(json!({
            "code": 0,
            "data": "{\"hairstyles\": [{\"hairstyle\": \"Bob\"}]}"
        }))
        .unwrap();
        let data = decode_workflow_json(data).unwrap();
        assert_eq!(data["hairstyles"][0]["hairstyle"], "Bob");
    }

    #[test]
    fn test_truncated_workflow_json_is_retryable() {
        let data = workflow_data(json!({
            "code": 0,
            "data": "{\"hairstyles\": [{\"hairstyle\": \"Bo"
        }))
        .unwrap();
        let err = decode_workflow_json(data).unwrap_err();
        assert!(matches!(err, StylistError::Workflow { code: 0, .. }));
        assert!(err.is_retryable());
    }

    #[test]
    fn test_raw_url_data_is_kept_for_try_on() {
        let data = workflow_data(json!({"code": 0, "data": "https://img/tryon.png"})).unwrap();
        assert_eq!(extract_image_url(&data).as_deref(), Some("https://img/tryon.png"));
    }

    #[test]
    fn test_workflow_data_nonzero_code() {
        let err = workflow_data(json!({"code": 4100, "msg": "token invalid"})).unwrap_err();
        match err {
            StylistError::Workflow { code, message } => {
                assert_eq!(code, 4100);
                assert_eq!(message, "token invalid");
            }
            other => panic!("Expected Workflow error, got {:?}", other),
        }
    }

    #[test]
    fn test_workflow_data_missing_data_is_retryable() {
        let err = workflow_data(json!({"code": 0})).unwrap_err();
        assert!(err.is_retryable());
    }

    #[test]
    fn test_candidate_list_shapes() {
        assert_eq!(candidate_list(&json!(["a", "b"])).len(), 2);
        assert_eq!(candidate_list(&json!({"output": ["a"]})).len(), 1);
        assert_eq!(candidate_list(&json!({"hairstyles": [{}, {}, {}]})).len(), 3);
        assert_eq!(candidate_list(&json!({"data": "[\"x\"]"})).len(), 1);
        assert!(candidate_list(&json!({"unexpected": 1})).is_empty());
        assert!(candidate_list(&json!(42)).is_empty());
    }

    #[test]
    fn test_normalize_hairstyles_defaults() {
        let items = vec![
            json!("Pixie cut"),
            json!({"name": "Long layers", "reason": "Softens the jawline", "image": "https://img/1.png"}),
            json!({"reasons": ""}),
            json!(7),
        ];
        let styles = normalize_hairstyles(items, "推荐发型", "根据您的面部特征和整体造型推荐");
        assert_eq!(styles.len(), 3);
        assert_eq!(styles[0].hairstyle, "Pixie cut");
        assert_eq!(styles[0].reasons, "根据您的面部特征和整体造型推荐");
        assert_eq!(styles[1].hairstyle, "Long layers");
        assert_eq!(styles[1].img, "https://img/1.png");
        assert_eq!(styles[2].hairstyle, "推荐发型");
        assert_eq!(styles[2].img, "");
    }

    #[test]
    fn test_extract_image_url() {
        assert_eq!(extract_image_url(&json!("https://img/a.png")).as_deref(), Some("https://img/a.png"));
        assert_eq!(
            extract_image_url(&json!({"output": "https://img/b.png"})).as_deref(),
            Some("https://img/b.png")
        );
        assert_eq!(
            extract_image_url(&json!("{\"image\": \"https://img/c.png\"}")).as_deref(),
            Some("https://img/c.png")
        );
        assert_eq!(extract_image_url(&json!({"nothing": true})), None);
        assert_eq!(extract_image_url(&json!("  ")), None);
    }

    #[test]
    fn test_client_from_config_uses_language_defaults() {
        let config = StylistConfig::builder()
            .with_language(crate::locale::Language::En)
            .build();
        let client = HairstyleClient::from_config(&config);
        assert_eq!(client.default_name, "Recommended hairstyle");
        assert!(matches!(client.provider(), HairstyleProvider::FirstParty { .. }));
    }
}
