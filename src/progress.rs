use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

use crate::locale::{Language, Localized};

/// Named steps of a submission, in the order they are applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProgressStage {
    Upload,
    Analysis,
    GenerateTop,
    GenerateBottom,
    TryonCustom,
    TryonGenerated,
    Commentary,
    HairstyleAnalysis,
    HairstyleGeneration,
    HairstyleCustom,
    HairstyleGenerated,
    Complete,
}

impl ProgressStage {
    pub const ALL: [ProgressStage; 12] = [
        ProgressStage::Upload,
        ProgressStage::Analysis,
        ProgressStage::GenerateTop,
        ProgressStage::GenerateBottom,
        ProgressStage::TryonCustom,
        ProgressStage::TryonGenerated,
        ProgressStage::Commentary,
        ProgressStage::HairstyleAnalysis,
        ProgressStage::HairstyleGeneration,
        ProgressStage::HairstyleCustom,
        ProgressStage::HairstyleGenerated,
        ProgressStage::Complete,
    ];

    /// Stages paced on the client after the generation response arrives.
    pub const GENERATION_PACED: [ProgressStage; 5] = [
        ProgressStage::GenerateTop,
        ProgressStage::GenerateBottom,
        ProgressStage::TryonCustom,
        ProgressStage::TryonGenerated,
        ProgressStage::Commentary,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProgressStage::Upload => "UPLOAD",
            ProgressStage::Analysis => "ANALYSIS",
            ProgressStage::GenerateTop => "GENERATE_TOP",
            ProgressStage::GenerateBottom => "GENERATE_BOTTOM",
            ProgressStage::TryonCustom => "TRYON_CUSTOM",
            ProgressStage::TryonGenerated => "TRYON_GENERATED",
            ProgressStage::Commentary => "COMMENTARY",
            ProgressStage::HairstyleAnalysis => "HAIRSTYLE_ANALYSIS",
            ProgressStage::HairstyleGeneration => "HAIRSTYLE_GENERATION",
            ProgressStage::HairstyleCustom => "HAIRSTYLE_CUSTOM",
            ProgressStage::HairstyleGenerated => "HAIRSTYLE_GENERATED",
            ProgressStage::Complete => "COMPLETE",
        }
    }
}

impl fmt::Display for ProgressStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageInfo {
    pub percent: u8,
    pub message: Localized,
}

/// Immutable mapping from stage to target percentage and message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressTable {
    stages: HashMap<ProgressStage, StageInfo>,
}

impl Default for ProgressTable {
    fn default() -> Self {
        let entries = [
            (ProgressStage::Upload, 5, "Uploading files...", "正在上传文件..."),
            (ProgressStage::Analysis, 15, "Analyzing...", "正在分析图片..."),
            (ProgressStage::GenerateTop, 25, "Generating top...", "正在生成上衣..."),
            (ProgressStage::GenerateBottom, 35, "Generating bottom...", "正在生成下装..."),
            (ProgressStage::TryonCustom, 45, "Trying on custom outfit...", "正在试穿自选搭配..."),
            (
                ProgressStage::TryonGenerated,
                55,
                "Trying on AI-generated outfit...",
                "正在试穿AI推荐搭配...",
            ),
            (ProgressStage::Commentary, 65, "Generating commentary...", "正在生成点评..."),
            (ProgressStage::HairstyleAnalysis, 75, "Analyzing hairstyle...", "正在分析发型..."),
            (
                ProgressStage::HairstyleGeneration,
                85,
                "Generating hairstyle recommendations...",
                "正在生成发型推荐...",
            ),
            (
                ProgressStage::HairstyleCustom,
                90,
                "Applying custom hairstyles...",
                "正在应用自选发型...",
            ),
            (
                ProgressStage::HairstyleGenerated,
                95,
                "Applying AI-generated hairstyles...",
                "正在应用AI推荐发型...",
            ),
            (ProgressStage::Complete, 100, "Complete!", "完成！"),
        ];

        Self {
            stages: entries
                .into_iter()
                .map(|(stage, percent, en, zh)| {
                    (
                        stage,
                        StageInfo {
                            percent,
                            message: Localized::new(en, zh),
                        },
                    )
                })
                .collect(),
        }
    }
}

impl ProgressTable {
    pub fn info(&self, stage: ProgressStage) -> Option<&StageInfo> {
        self.stages.get(&stage)
    }

    /// Override one stage. Used to customize messages or pacing targets.
    pub fn with_stage(mut self, stage: ProgressStage, percent: u8, message: Localized) -> Self {
        self.stages.insert(
            stage,
            StageInfo {
                percent: percent.min(100),
                message,
            },
        );
        self
    }

    pub fn state(&self, stage: ProgressStage, lang: Language) -> ProgressState {
        match self.info(stage) {
            Some(info) => ProgressState {
                stage,
                percent: info.percent,
                message: info.message.get(lang).to_string(),
            },
            None => ProgressState {
                stage,
                percent: 0,
                message: stage.as_str().to_string(),
            },
        }
    }
}

/// What the progress overlay shows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressState {
    pub stage: ProgressStage,
    pub percent: u8,
    pub message: String,
}

/// Applies stages in declared order and never lets the percentage go down.
#[derive(Debug, Clone)]
pub struct ProgressTracker {
    table: ProgressTable,
    lang: Language,
    current: ProgressState,
}

impl ProgressTracker {
    pub fn new(table: ProgressTable, lang: Language) -> Self {
        let mut current = table.state(ProgressStage::Upload, lang);
        current.percent = 0;
        Self {
            table,
            lang,
            current,
        }
    }

    pub fn current(&self) -> &ProgressState {
        &self.current
    }

    /// Move to `stage`. Returns `None` (and changes nothing) if `stage`
    /// is behind the current stage.
    pub fn advance(&mut self, stage: ProgressStage) -> Option<ProgressState> {
        if stage < self.current.stage {
            tracing::debug!(
                requested = %stage,
                current = %self.current.stage,
                "Ignoring out-of-order progress stage"
            );
            return None;
        }
        let mut next = self.table.state(stage, self.lang);
        next.percent = next.percent.max(self.current.percent);
        self.current = next.clone();
        Some(next)
    }

    pub fn reset(&mut self) {
        *self = Self::new(self.table.clone(), self.lang);
    }
}

/// Text progress bar, e.g. `[#####.....]  50% message`.
pub fn render_bar(state: &ProgressState, width: usize) -> String {
    let filled = (state.percent as usize * width) / 100;
    format!(
        "[{}{}] {:>3}% {}",
        "#".repeat(filled),
        ".".repeat(width.saturating_sub(filled)),
        state.percent,
        state.message
    )
}
