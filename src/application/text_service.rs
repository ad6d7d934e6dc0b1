use super::gate::{
    can_perform_generation, can_perform_rewrite, can_use_advanced_options, can_use_style,
    can_use_word_count, DenialReason, GateVerdict,
};
use super::prompt::{generation_prompt, rewrite_prompt};
use super::session::UserSession;
use crate::domain::{
    analyze, analyze_generated, word_count, AdvancedConfig, AnalysisDiff, GenerationOutcome,
    GenerationRequest, HistoryEntry, HistoryKind, PlanTier, RewriteOutcome, RewriteRequest,
};
use crate::infrastructure::{GenerationError, KeyValueStore, TextGenerator};
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info, warn};

#[derive(Error, Debug)]
pub enum TextServiceError {
    #[error("Validation failed: {0}")]
    Validation(String),
    #[error("{0}")]
    EntitlementDenied(DenialReason),
    #[error("Generation failed: {0}")]
    Generation(#[from] GenerationError),
}

impl From<DenialReason> for TextServiceError {
    fn from(reason: DenialReason) -> Self {
        TextServiceError::EntitlementDenied(reason)
    }
}

/// Rewrite and generation, end to end.
///
/// Each call runs: validation, entitlement checks, the language model call,
/// the quota decrement, then the history append. The quota is spent only
/// after the model returned text.
pub struct TextService<G>
where
    G: TextGenerator,
{
    generator: Arc<G>,
}

impl<G> TextService<G>
where
    G: TextGenerator,
{
    pub fn new(generator: Arc<G>) -> Self {
        Self { generator }
    }

    pub async fn rewrite<S: KeyValueStore>(
        &self,
        session: &UserSession<S>,
        request: RewriteRequest,
    ) -> Result<RewriteOutcome, TextServiceError> {
        let request = RewriteRequest {
            advanced: request.advanced.normalized(),
            ..request
        };
        if request.text.trim().is_empty() {
            return Err(TextServiceError::Validation("text must not be empty".to_string()));
        }
        let words = to_u32(word_count(&request.text));

        let _actions = session.lock_actions().await;
        let state = session.quota().current_state().await;
        let tier = state.plan_tier;

        check_all(&[
            can_perform_rewrite(&state),
            can_use_style(tier, request.style.index()),
            can_use_word_count(tier, words),
            advanced_verdict(tier, &request.advanced),
        ])
        .map_err(|reason| denied(session.user_id(), reason))?;

        let rewritten_text = self
            .generator
            .complete(&rewrite_prompt(&request))
            .await
            .map_err(|e| {
                error!(user_id = %session.user_id(), error = %e, "Rewrite generation failed");
                e
            })?;

        let quota = session.quota().decrement_rewrite().await;
        info!(
            user_id = %session.user_id(),
            style = %request.style,
            remaining = %quota.remaining_rewrites,
            "Rewrite completed"
        );

        let original_analysis = analyze(&request.text);
        let analysis = analyze(&rewritten_text);
        let differences = AnalysisDiff::between(&original_analysis, &analysis);

        let entry = HistoryEntry::new(
            HistoryKind::Rewrite,
            request.text,
            rewritten_text.clone(),
            request.style.to_string(),
            None,
            session.now(),
        );
        record(session, &entry).await;

        Ok(RewriteOutcome {
            rewritten_text,
            original_analysis,
            analysis,
            differences,
            entry,
            quota,
        })
    }

    pub async fn generate<S: KeyValueStore>(
        &self,
        session: &UserSession<S>,
        request: GenerationRequest,
    ) -> Result<GenerationOutcome, TextServiceError> {
        let request = GenerationRequest {
            advanced: request.advanced.normalized(),
            ..request
        };
        if request.topic.trim().is_empty() {
            return Err(TextServiceError::Validation("topic must not be empty".to_string()));
        }

        let _actions = session.lock_actions().await;
        let state = session.quota().current_state().await;
        let tier = state.plan_tier;

        let mut verdicts = vec![
            can_perform_generation(&state),
            can_use_style(tier, request.style.index()),
            advanced_verdict(tier, &request.advanced),
        ];
        if let Some(target) = request.advanced.target_word_count {
            verdicts.push(can_use_word_count(tier, target));
        }
        check_all(&verdicts).map_err(|reason| denied(session.user_id(), reason))?;

        let generated_text = self
            .generator
            .complete(&generation_prompt(&request))
            .await
            .map_err(|e| {
                error!(user_id = %session.user_id(), error = %e, "Text generation failed");
                e
            })?;

        let quota = session.quota().decrement_generation().await;
        info!(
            user_id = %session.user_id(),
            style = %request.style,
            length = %request.length,
            remaining = %quota.remaining_generations,
            "Generation completed"
        );

        let analysis = analyze_generated(&generated_text);
        let entry = HistoryEntry::new(
            HistoryKind::Generation,
            request.topic,
            generated_text.clone(),
            request.style.to_string(),
            Some(request.length.to_string()),
            session.now(),
        );
        record(session, &entry).await;

        Ok(GenerationOutcome {
            generated_text,
            analysis,
            entry,
            quota,
        })
    }
}

fn advanced_verdict(tier: PlanTier, advanced: &AdvancedConfig) -> GateVerdict {
    if advanced.is_empty() {
        GateVerdict::Allowed
    } else {
        can_use_advanced_options(tier)
    }
}

/// First denial, in check order.
fn check_all(verdicts: &[GateVerdict]) -> Result<(), DenialReason> {
    match verdicts.iter().find_map(GateVerdict::reason) {
        Some(reason) => Err(reason.clone()),
        None => Ok(()),
    }
}

fn denied(user_id: &str, reason: DenialReason) -> TextServiceError {
    info!(user_id = %user_id, code = reason.code(), "Action denied by plan");
    TextServiceError::EntitlementDenied(reason)
}

async fn record<S: KeyValueStore>(session: &UserSession<S>, entry: &HistoryEntry) {
    if let Err(e) = session.history_log().append(entry.clone()).await {
        warn!(user_id = %session.user_id(), error = %e, "Failed to persist history entry");
    }
}

fn to_u32(n: usize) -> u32 {
    u32::try_from(n).unwrap_or(u32::MAX)
}
