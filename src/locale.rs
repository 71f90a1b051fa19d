use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Display language for every user-facing string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    En,
    #[default]
    Zh,
}

impl Language {
    pub fn as_str(&self) -> &'static str {
        match self {
            Language::En => "en",
            Language::Zh => "zh",
        }
    }

    /// The other language. Mirrors the language switch button.
    pub fn toggle(self) -> Self {
        match self {
            Language::En => Language::Zh,
            Language::Zh => Language::En,
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Language {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "en" | "english" => Ok(Language::En),
            "zh" | "cn" | "chinese" | "中文" => Ok(Language::Zh),
            other => Err(format!("Unknown language '{}', expected 'en' or 'zh'", other)),
        }
    }
}

/// A string available in both supported languages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Localized {
    pub en: String,
    pub zh: String,
}

impl Localized {
    pub fn new(en: impl Into<String>, zh: impl Into<String>) -> Self {
        Self {
            en: en.into(),
            zh: zh.into(),
        }
    }

    pub fn get(&self, lang: Language) -> &str {
        match lang {
            Language::En => &self.en,
            Language::Zh => &self.zh,
        }
    }

    /// True if either translation equals `value` (English compared case-insensitively).
    pub fn matches(&self, value: &str) -> bool {
        let value = value.trim();
        self.zh == value || self.en.eq_ignore_ascii_case(value)
    }
}

/// Immutable table of user-visible messages.
///
/// Carried inside [`StylistConfig`](crate::StylistConfig) and passed to the
/// session and renderer explicitly, so workflow logic can be exercised
/// without any rendering context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Messages {
    pub missing_uploads: Localized,
    pub general_error: Localized,
    pub file_too_large: Localized,
    pub file_type_not_allowed: Localized,
    pub upload_failed: Localized,
    pub processing_failed: Localized,
    pub hairstyle_failed: Localized,
    pub missing_measurement: Localized,
    pub custom_outfit_title: Localized,
    pub generated_outfit_title: Localized,
    pub score_label: Localized,
    pub commentary_label: Localized,
    pub ai_review_tag: Localized,
    pub try_on_alt: Localized,
    pub custom_hairstyles_title: Localized,
    pub generated_hairstyles_title: Localized,
    pub no_custom_hairstyles: Localized,
    pub no_generated_hairstyles: Localized,
    pub default_hairstyle_name: Localized,
    pub default_hairstyle_reason: Localized,
}

impl Default for Messages {
    fn default() -> Self {
        Self {
            missing_uploads: Localized::new(
                "Please upload all required images",
                "请上传所有必要的图片",
            ),
            general_error: Localized::new("An error occurred", "发生错误"),
            file_too_large: Localized::new(
                "File size must be less than 5MB",
                "文件大小必须小于5MB",
            ),
            file_type_not_allowed: Localized::new(
                "Only JPG, PNG and WebP images are allowed",
                "仅支持JPG、PNG和WebP格式的图片",
            ),
            upload_failed: Localized::new("Failed to upload file", "文件上传失败"),
            processing_failed: Localized::new("Processing failed", "处理失败"),
            hairstyle_failed: Localized::new(
                "Failed to get hairstyle recommendations",
                "获取发型推荐失败",
            ),
            missing_measurement: Localized::new(
                "All measurements are required",
                "请填写所有身材数据",
            ),
            custom_outfit_title: Localized::new("Your Selected Outfit", "你的选择"),
            generated_outfit_title: Localized::new("AI Recommended Outfit", "AI推荐"),
            score_label: Localized::new("Style Score", "时尚指数"),
            commentary_label: Localized::new("Expert Commentary", "专业点评"),
            ai_review_tag: Localized::new("AI Professional Review", "AI 专业点评"),
            try_on_alt: Localized::new("Try-on result", "试穿效果"),
            custom_hairstyles_title: Localized::new("Recommended Hairstyles", "推荐发型"),
            generated_hairstyles_title: Localized::new(
                "AI Recommended Hairstyles",
                "AI推荐发型",
            ),
            no_custom_hairstyles: Localized::new(
                "No hairstyle recommendations found for your selected outfit.",
                "没有找到适合自选搭配的发型推荐。",
            ),
            no_generated_hairstyles: Localized::new(
                "No hairstyle recommendations found for AI-generated outfit.",
                "没有找到适合 AI 搭配的发型推荐。",
            ),
            default_hairstyle_name: Localized::new("Recommended hairstyle", "推荐发型"),
            default_hairstyle_reason: Localized::new(
                "Recommended for your facial features and overall look",
                "根据您的面部特征和整体造型推荐",
            ),
        }
    }
}
