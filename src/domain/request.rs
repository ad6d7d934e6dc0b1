use super::analysis::{AnalysisDiff, TextAnalysis};
use super::history::HistoryEntry;
use super::quota::QuotaState;
use super::style::{AdvancedConfig, GenerationStyle, RewriteStyle, TextLength};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RewriteRequest {
    pub text: String,
    pub style: RewriteStyle,
    #[serde(default)]
    pub advanced: AdvancedConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationRequest {
    pub topic: String,
    pub style: GenerationStyle,
    pub length: TextLength,
    #[serde(default)]
    pub advanced: AdvancedConfig,
}

#[derive(Debug, Clone, Serialize)]
pub struct RewriteOutcome {
    pub rewritten_text: String,
    pub original_analysis: TextAnalysis,
    pub analysis: TextAnalysis,
    pub differences: AnalysisDiff,
    pub entry: HistoryEntry,
    pub quota: QuotaState,
}

#[derive(Debug, Clone, Serialize)]
pub struct GenerationOutcome {
    pub generated_text: String,
    pub analysis: TextAnalysis,
    pub entry: HistoryEntry,
    pub quota: QuotaState,
}
