use crate::application::{ExportedDocument, PlanResolution};
use crate::domain::{
    AnalysisDiff, GenerationOutcome, HistoryEntry, PlanEntitlements, PlanTier, QuotaState,
    RewriteOutcome, TextAnalysis,
};
use super::http_auth::is_valid_user_id;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::{Validate, ValidationError};

fn validate_user_id(id: &str) -> Result<(), ValidationError> {
    if is_valid_user_id(id) {
        Ok(())
    } else {
        Err(ValidationError::new("user_id"))
    }
}

#[derive(Serialize, ToSchema)]
pub(super) struct HealthResponse {
    pub(super) status: String,
    pub(super) active_sessions: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(super) error: Option<String>,
}

#[derive(Deserialize, Validate, ToSchema, Default)]
pub(super) struct AdvancedOptionsBody {
    #[schema(example = "positive")]
    pub(super) sentiment: Option<String>,
    #[validate(range(max = 100000))]
    pub(super) target_char_count: Option<u32>,
    #[validate(range(max = 20000))]
    pub(super) target_word_count: Option<u32>,
    #[validate(range(max = 120))]
    pub(super) target_read_time_minutes: Option<u32>,
    #[validate(length(max = 2000))]
    pub(super) freeform_instructions: Option<String>,
}

#[derive(Deserialize, Validate, ToSchema)]
pub(super) struct RewriteBody {
    #[validate(length(min = 1, max = 50000))]
    #[schema(example = "teh quick brown fox jumpd over the lazy dog")]
    pub(super) text: String,
    #[schema(example = "grammar_correction")]
    pub(super) style: String,
    #[serde(default)]
    #[validate]
    pub(super) advanced: Option<AdvancedOptionsBody>,
}

#[derive(Deserialize, Validate, ToSchema)]
pub(super) struct GenerateBody {
    #[validate(length(min = 1, max = 500))]
    #[schema(example = "Urban gardens and community health")]
    pub(super) topic: String,
    #[schema(example = "informative")]
    pub(super) style: String,
    #[schema(example = "medium")]
    pub(super) length: String,
    #[serde(default)]
    #[validate]
    pub(super) advanced: Option<AdvancedOptionsBody>,
}

#[derive(Deserialize, Validate, ToSchema)]
pub(super) struct AnalyzeBody {
    #[validate(length(min = 1, max = 50000))]
    pub(super) text: String,
}

#[derive(Deserialize, Validate, ToSchema)]
pub(super) struct SetPlanBody {
    #[validate(custom = "validate_user_id")]
    #[schema(example = "user-123")]
    pub(super) user_id: String,
    #[schema(example = "plus")]
    pub(super) tier: String,
}

#[derive(Deserialize, Debug, IntoParams)]
pub(super) struct HistoryParams {
    /// `rewrite` or `generation`
    #[param(example = "rewrite")]
    pub(super) kind: String,
}

#[derive(Deserialize, Debug, IntoParams)]
pub(super) struct ExportParams {
    /// `txt`, `md` or `json`
    #[param(example = "md")]
    pub(super) format: String,
}

#[derive(Serialize, ToSchema)]
pub(super) struct EntitlementsResponse {
    pub(super) tier: String,
    /// `null` means unlimited.
    pub(super) rewrites_per_day: Option<u32>,
    pub(super) generations_per_day: Option<u32>,
    pub(super) max_words_per_text: Option<u32>,
    pub(super) unlocked_style_count: usize,
    pub(super) advanced_options_allowed: bool,
    pub(super) export_formats: Vec<String>,
    pub(super) history_retention_days: Option<u32>,
}

impl EntitlementsResponse {
    pub(super) fn new(tier: PlanTier, entitlements: PlanEntitlements) -> Self {
        Self {
            tier: tier.to_string(),
            rewrites_per_day: entitlements.rewrites_per_day.as_option(),
            generations_per_day: entitlements.generations_per_day.as_option(),
            max_words_per_text: entitlements.max_words_per_text.as_option(),
            unlocked_style_count: entitlements.unlocked_style_count,
            advanced_options_allowed: entitlements.advanced_options_allowed,
            export_formats: entitlements
                .export_formats
                .iter()
                .map(ToString::to_string)
                .collect(),
            history_retention_days: entitlements.history_retention_days.as_option(),
        }
    }
}

#[derive(Serialize, ToSchema)]
pub(super) struct PlanResponse {
    pub(super) tier: String,
    /// `remote`, `cache` or `default`, as last resolved.
    pub(super) source: String,
    pub(super) entitlements: EntitlementsResponse,
}

impl PlanResponse {
    pub(super) fn new(tier: PlanTier, resolution: PlanResolution) -> Self {
        Self {
            tier: tier.to_string(),
            source: resolution.source.to_string(),
            entitlements: EntitlementsResponse::new(tier, tier.entitlements()),
        }
    }
}

#[derive(Serialize, ToSchema)]
pub(super) struct QuotaResponse {
    pub(super) plan_tier: String,
    /// `null` means unlimited.
    pub(super) remaining_rewrites: Option<u32>,
    pub(super) remaining_generations: Option<u32>,
    #[schema(value_type = String, format = Date)]
    pub(super) last_reset_date: chrono::NaiveDate,
}

impl From<QuotaState> for QuotaResponse {
    fn from(state: QuotaState) -> Self {
        Self {
            plan_tier: state.plan_tier.to_string(),
            remaining_rewrites: state.remaining_rewrites.as_option(),
            remaining_generations: state.remaining_generations.as_option(),
            last_reset_date: state.last_reset_date,
        }
    }
}

#[derive(Serialize, ToSchema)]
pub(super) struct AnalysisResponse {
    pub(super) word_count: usize,
    pub(super) char_count: usize,
    pub(super) sentence_count: usize,
    pub(super) read_time_minutes: usize,
    pub(super) sentiment_score: i64,
    pub(super) sentiment: String,
}

impl From<TextAnalysis> for AnalysisResponse {
    fn from(a: TextAnalysis) -> Self {
        Self {
            word_count: a.word_count,
            char_count: a.char_count,
            sentence_count: a.sentence_count,
            read_time_minutes: a.read_time_minutes,
            sentiment_score: a.sentiment_score,
            sentiment: a.sentiment.to_string(),
        }
    }
}

/// Percent change per metric, original to rewritten.
#[derive(Serialize, ToSchema)]
pub(super) struct DifferencesResponse {
    pub(super) word_count: i64,
    pub(super) char_count: i64,
    pub(super) sentence_count: i64,
    pub(super) read_time_minutes: i64,
}

impl From<AnalysisDiff> for DifferencesResponse {
    fn from(d: AnalysisDiff) -> Self {
        Self {
            word_count: d.word_count,
            char_count: d.char_count,
            sentence_count: d.sentence_count,
            read_time_minutes: d.read_time_minutes,
        }
    }
}

#[derive(Serialize, ToSchema)]
pub(super) struct HistoryEntryResponse {
    pub(super) id: Uuid,
    pub(super) kind: String,
    pub(super) input: String,
    pub(super) output: String,
    pub(super) style: String,
    pub(super) length: Option<String>,
    pub(super) created_at: chrono::DateTime<chrono::Utc>,
}

impl From<HistoryEntry> for HistoryEntryResponse {
    fn from(e: HistoryEntry) -> Self {
        Self {
            id: e.id,
            kind: e.kind.to_string(),
            input: e.input,
            output: e.output,
            style: e.style,
            length: e.length,
            created_at: e.created_at,
        }
    }
}

#[derive(Serialize, ToSchema)]
pub(super) struct RewriteResponse {
    pub(super) rewritten_text: String,
    pub(super) original_analysis: AnalysisResponse,
    pub(super) analysis: AnalysisResponse,
    pub(super) differences: DifferencesResponse,
    pub(super) entry_id: Uuid,
    pub(super) quota: QuotaResponse,
}

impl From<RewriteOutcome> for RewriteResponse {
    fn from(o: RewriteOutcome) -> Self {
        Self {
            rewritten_text: o.rewritten_text,
            original_analysis: o.original_analysis.into(),
            analysis: o.analysis.into(),
            differences: o.differences.into(),
            entry_id: o.entry.id,
            quota: o.quota.into(),
        }
    }
}

#[derive(Serialize, ToSchema)]
pub(super) struct GenerateResponse {
    pub(super) generated_text: String,
    pub(super) analysis: AnalysisResponse,
    pub(super) entry_id: Uuid,
    pub(super) quota: QuotaResponse,
}

impl From<GenerationOutcome> for GenerateResponse {
    fn from(o: GenerationOutcome) -> Self {
        Self {
            generated_text: o.generated_text,
            analysis: o.analysis.into(),
            entry_id: o.entry.id,
            quota: o.quota.into(),
        }
    }
}

pub(super) fn content_disposition(doc: &ExportedDocument) -> String {
    format!("attachment; filename=\"{}\"", doc.file_name)
}

#[derive(Deserialize, Validate, ToSchema)]
pub(super) struct ResetQuotaBody {
    #[validate(custom = "validate_user_id")]
    #[schema(example = "user-123")]
    pub(super) user_id: String,
}
