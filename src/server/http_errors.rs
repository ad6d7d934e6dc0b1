use crate::application::{DenialReason, ExportError, TextServiceError};
use crate::domain::PlanTier;
use axum::http::StatusCode;
use validator::ValidationErrors;

/// Where the front end sends users who hit a plan limit.
pub(super) const UPGRADE_URL: &str = "/plans";

pub(super) fn validation_error(err: &ValidationErrors) -> (StatusCode, serde_json::Value) {
    (
        StatusCode::BAD_REQUEST,
        serde_json::json!({
            "error": "Validation failed",
            "details": err.to_string(),
        }),
    )
}

pub(super) fn invalid_choice(field: &str, allowed: Vec<String>) -> (StatusCode, serde_json::Value) {
    (
        StatusCode::BAD_REQUEST,
        serde_json::json!({
            "error": format!("Invalid {}", field),
            "allowed": allowed,
        }),
    )
}

pub(super) fn map_denial(reason: &DenialReason, tier: PlanTier) -> (StatusCode, serde_json::Value) {
    (
        StatusCode::FORBIDDEN,
        serde_json::json!({
            "error": "Not available on your plan",
            "code": reason.code(),
            "reason": reason.to_string(),
            "details": reason,
            "plan_tier": tier,
            "upgrade_to": tier.upgrade(),
            "upgrade_url": UPGRADE_URL,
        }),
    )
}

pub(super) fn map_text_error(err: &TextServiceError, tier: PlanTier) -> (StatusCode, serde_json::Value) {
    match err {
        TextServiceError::Validation(msg) => {
            (StatusCode::BAD_REQUEST, serde_json::json!({ "error": msg }))
        }
        TextServiceError::EntitlementDenied(reason) => map_denial(reason, tier),
        TextServiceError::Generation(_) => (
            StatusCode::BAD_GATEWAY,
            serde_json::json!({
                "error": "Text generation failed, please try again",
                "retryable": true,
            }),
        ),
    }
}

pub(super) fn map_export_error(err: &ExportError, tier: PlanTier) -> (StatusCode, serde_json::Value) {
    match err {
        ExportError::NotFound(_) => (
            StatusCode::NOT_FOUND,
            serde_json::json!({ "error": "History entry not found" }),
        ),
        ExportError::Denied(reason) => map_denial(reason, tier),
        ExportError::Encoding(_) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            serde_json::json!({ "error": "Failed to export entry" }),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::GenerationError;

    #[test]
    fn denial_carries_code_reason_and_upgrade() {
        let (status, body) = map_text_error(
            &TextServiceError::EntitlementDenied(DenialReason::RewriteQuotaExhausted),
            PlanTier::Free,
        );
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["code"], "rewrite_quota_exhausted");
        assert_eq!(body["reason"], "You have used all of today's rewrites");
        assert_eq!(body["upgrade_to"], "plus");
        assert_eq!(body["upgrade_url"], UPGRADE_URL);
    }

    #[test]
    fn generation_failure_is_retryable() {
        let (status, body) = map_text_error(
            &TextServiceError::Generation(GenerationError::Timeout),
            PlanTier::Pro,
        );
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body["retryable"], true);
    }

    #[test]
    fn unknown_history_entry_is_not_found() {
        let (status, _) = map_export_error(&ExportError::NotFound(uuid::Uuid::nil()), PlanTier::Free);
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
