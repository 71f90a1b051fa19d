use serde::{Deserialize, Serialize};

use crate::locale::{Language, Localized};

/// Commentary text, either a single string or per-language variants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Commentary {
    Text(String),
    Localized(Localized),
}

impl Commentary {
    pub fn text(&self, lang: Language) -> &str {
        match self {
            Commentary::Text(s) => s,
            Commentary::Localized(l) => l.get(lang),
        }
    }
}

impl Default for Commentary {
    fn default() -> Self {
        Commentary::Text(String::new())
    }
}

/// Optional per-aspect scores returned by some generation backends.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Grading {
    pub overall: f64,
    pub color: f64,
    pub style: f64,
    pub fit: f64,
}

/// Server-computed result for one garment combination.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutfitResult {
    #[serde(default)]
    pub top_url: String,
    #[serde(default)]
    pub bottom_url: String,
    pub try_on_url: String,
    #[serde(default)]
    pub commentary: Commentary,
    #[serde(default)]
    pub score: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grading: Option<Grading>,
}

/// Response of the generation endpoint: the user's combination and the
/// AI-recommended one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationResult {
    pub custom: OutfitResult,
    pub generated: OutfitResult,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recommendations: Option<String>,
}

impl GenerationResult {
    pub fn outfit(&self, kind: OutfitKind) -> &OutfitResult {
        match kind {
            OutfitKind::Custom => &self.custom,
            OutfitKind::Generated => &self.generated,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutfitKind {
    Custom,
    Generated,
}

impl OutfitKind {
    pub const BOTH: [OutfitKind; 2] = [OutfitKind::Custom, OutfitKind::Generated];

    pub fn as_str(&self) -> &'static str {
        match self {
            OutfitKind::Custom => "custom",
            OutfitKind::Generated => "generated",
        }
    }
}

/// A candidate hairstyle with its rationale and (after try-on) a preview image.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Hairstyle {
    pub hairstyle: String,
    pub reasons: String,
    #[serde(default)]
    pub img: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct HairstyleSet {
    pub custom: Vec<Hairstyle>,
    pub generated: Vec<Hairstyle>,
}

impl HairstyleSet {
    pub fn get(&self, kind: OutfitKind) -> &[Hairstyle] {
        match kind {
            OutfitKind::Custom => &self.custom,
            OutfitKind::Generated => &self.generated,
        }
    }

    pub fn get_mut(&mut self, kind: OutfitKind) -> &mut Vec<Hairstyle> {
        match kind {
            OutfitKind::Custom => &mut self.custom,
            OutfitKind::Generated => &mut self.generated,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.custom.is_empty() && self.generated.is_empty()
    }
}
