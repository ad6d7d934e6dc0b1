use super::http_types::AdvancedOptionsBody;
use crate::domain::{
    AdvancedConfig, ExportFormat, GenerationStyle, HistoryKind, PlanTier, RewriteStyle, Sentiment,
    TextLength,
};
use std::str::FromStr;
use strum::IntoEnumIterator;

/// Accepted spellings of an enum, for "allowed" lists in 400 responses.
pub(super) fn allowed<T>() -> Vec<String>
where
    T: IntoEnumIterator + AsRef<str>,
{
    T::iter().map(|v| v.as_ref().to_string()).collect()
}

fn parse_exact<T: FromStr>(raw: &str) -> Option<T> {
    raw.parse::<T>().ok()
}

pub(super) fn parse_plan_tier(tier: &str) -> Option<PlanTier> {
    parse_exact(tier)
}

pub(super) fn parse_rewrite_style(style: &str) -> Option<RewriteStyle> {
    parse_exact(style)
}

pub(super) fn parse_generation_style(style: &str) -> Option<GenerationStyle> {
    parse_exact(style)
}

pub(super) fn parse_length(length: &str) -> Option<TextLength> {
    parse_exact(length)
}

pub(super) fn parse_sentiment(sentiment: &str) -> Option<Sentiment> {
    parse_exact(sentiment)
}

pub(super) fn parse_history_kind(kind: &str) -> Option<HistoryKind> {
    parse_exact(kind)
}

pub(super) fn parse_export_format(format: &str) -> Option<ExportFormat> {
    parse_exact(format)
}

/// `Err` carries the rejected sentiment value.
pub(super) fn parse_advanced(body: Option<AdvancedOptionsBody>) -> Result<AdvancedConfig, String> {
    let body = body.unwrap_or_default();
    let sentiment = match body.sentiment.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(raw) => Some(parse_sentiment(raw).ok_or_else(|| raw.to_string())?),
    };

    Ok(AdvancedConfig {
        sentiment,
        target_char_count: body.target_char_count,
        target_word_count: body.target_word_count,
        target_read_time_minutes: body.target_read_time_minutes,
        freeform_instructions: body.freeform_instructions,
    }
    .normalized())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_invalid_inputs_return_none() {
        assert!(parse_plan_tier("basic").is_none());
        assert!(parse_rewrite_style("shouty").is_none());
        assert!(parse_generation_style("grammar_correction").is_none());
        assert!(parse_length("huge").is_none());
        assert!(parse_sentiment("angry").is_none());
        assert!(parse_history_kind("drafts").is_none());
        assert!(parse_export_format("pdf").is_none());
    }

    #[test]
    fn allowed_lists_follow_catalog_order() {
        assert_eq!(allowed::<PlanTier>(), vec!["free", "plus", "pro"]);
        assert_eq!(allowed::<TextLength>(), vec!["short", "medium", "long"]);
        assert_eq!(allowed::<RewriteStyle>()[0], "grammar_correction");
    }

    #[test]
    fn advanced_body_parsing() {
        assert_eq!(parse_advanced(None), Ok(AdvancedConfig::default()));

        let parsed = parse_advanced(Some(AdvancedOptionsBody {
            sentiment: Some("negative".to_string()),
            target_word_count: Some(0),
            ..Default::default()
        }))
        .unwrap();
        assert_eq!(parsed.sentiment, Some(Sentiment::Negative));
        assert_eq!(parsed.target_word_count, None);

        let rejected = parse_advanced(Some(AdvancedOptionsBody {
            sentiment: Some("furious".to_string()),
            ..Default::default()
        }));
        assert_eq!(rejected, Err("furious".to_string()));
    }
}
