use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString};

/// Rewrite styles in catalog order. The discriminant is the style index the
/// feature gate checks against `unlocked_style_count`.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum RewriteStyle {
    GrammarCorrection = 0,
    Formal = 1,
    Simplified = 2,
    Persuasive = 3,
    SocialMedia = 4,
    Academic = 5,
    Journalistic = 6,
    CreativeNarrative = 7,
    Technical = 8,
    SeoOptimized = 9,
}

impl RewriteStyle {
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn instructions(self) -> &'static str {
        match self {
            RewriteStyle::GrammarCorrection => {
                "Fix grammar, spelling and punctuation mistakes while keeping the original meaning."
            }
            RewriteStyle::Formal => {
                "Rewrite the text in a more formal, professional register suitable for business or academic communication."
            }
            RewriteStyle::Simplified => {
                "Simplify the text so it is clear and easy to follow, using plain words and short sentences."
            }
            RewriteStyle::Persuasive => {
                "Make the text more persuasive and convincing so that it motivates the reader to act, keeping its core message."
            }
            RewriteStyle::SocialMedia => {
                "Adapt the text for social media: concise, engaging and attention-grabbing, with relevant hashtags where they fit."
            }
            RewriteStyle::Academic => {
                "Rewrite in an academic style: formal, precise and objective, with field-appropriate terminology, no colloquialisms and a neutral analytical tone."
            }
            RewriteStyle::Journalistic => {
                "Adapt the text to a news format with short direct paragraphs, following the inverted pyramid and keeping a factual, impartial tone."
            }
            RewriteStyle::CreativeNarrative => {
                "Turn the text into an engaging narrative using metaphors, analogies and vivid description to build an emotional connection with the reader."
            }
            RewriteStyle::Technical => {
                "Rewrite in a technical register with precise terminology, logically sequenced information and a neutral, exact tone."
            }
            RewriteStyle::SeoOptimized => {
                "Optimise the text for search engines while keeping natural language: place relevant keywords strategically, use informative subheadings and short paragraphs, and add calls to action where appropriate."
            }
        }
    }
}

/// Generation styles in catalog order.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum GenerationStyle {
    Formal = 0,
    Casual = 1,
    Informative = 2,
    Persuasive = 3,
    CreativeNarrative = 4,
    Academic = 5,
    Journalistic = 6,
    Poetic = 7,
    Technical = 8,
    Motivational = 9,
}

impl GenerationStyle {
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn instructions(self) -> &'static str {
        match self {
            GenerationStyle::Formal => {
                "Use formal, precise and structured language. Avoid slang and keep a professional, objective tone."
            }
            GenerationStyle::Casual => {
                "Use casual, conversational language, as if talking to a friend."
            }
            GenerationStyle::Informative => {
                "Focus on clear, accurate information organised logically, with a neutral tone like an informative article."
            }
            GenerationStyle::Persuasive => {
                "Write convincingly with strong arguments and calls to action that highlight benefits and motivate the reader."
            }
            GenerationStyle::CreativeNarrative => {
                "Write an engaging narrative with storytelling elements, vivid descriptions and metaphors."
            }
            GenerationStyle::Academic => {
                "Use formal academic language with field-specific terminology and evidence-based arguments in an analytical tone."
            }
            GenerationStyle::Journalistic => {
                "Write like a news report: short paragraphs, key facts first, quotes where appropriate, direct and informative."
            }
            GenerationStyle::Poetic => {
                "Use poetic devices such as rhythm, metaphor and figurative language, favouring expressive beauty and emotional impact."
            }
            GenerationStyle::Technical => {
                "Use precise technical language, organise information clearly and sequentially, and favour exactness."
            }
            GenerationStyle::Motivational => {
                "Write an inspiring text that encourages the reader, with stories of overcoming adversity and positive calls to action."
            }
        }
    }
}

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum TextLength {
    Short,
    Medium,
    Long,
}

impl TextLength {
    pub fn instructions(self) -> &'static str {
        match self {
            TextLength::Short => "Write a short text of roughly 100-150 words (one paragraph).",
            TextLength::Medium => {
                "Write a medium-length text of roughly 250-350 words (3-4 paragraphs)."
            }
            TextLength::Long => "Write a longer text of roughly 500-700 words (5-7 paragraphs).",
        }
    }
}

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Sentiment {
    Positive,
    Neutral,
    Negative,
}

impl Sentiment {
    pub fn instructions(self) -> &'static str {
        match self {
            Sentiment::Positive => {
                "Use optimistic, hopeful language. Emphasise positive aspects, solutions and possibilities; mention problems only to show how they were overcome."
            }
            Sentiment::Neutral => {
                "Keep a balanced, objective tone. Present facts and perspectives without strong emotional bias in either direction."
            }
            Sentiment::Negative => {
                "Use critical, sceptical language. Emphasise problems, risks and failures and avoid easy optimism or simple solutions."
            }
        }
    }

    /// Tone requested in freeform instructions, if any.
    pub fn infer_from_instructions(instructions: &str) -> Option<Sentiment> {
        let lowered = instructions.to_lowercase();
        let asks_for = |label: &str| {
            lowered.contains(&format!("{} tone", label))
                || lowered.contains(&format!("predominantly {}", label))
        };

        if asks_for("positive") {
            Some(Sentiment::Positive)
        } else if asks_for("negative") {
            Some(Sentiment::Negative)
        } else if asks_for("neutral") {
            Some(Sentiment::Neutral)
        } else {
            None
        }
    }
}

/// Optional constraints a caller can attach to a rewrite or generation.
///
/// Zero targets and blank instructions count as unset.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdvancedConfig {
    pub sentiment: Option<Sentiment>,
    pub target_char_count: Option<u32>,
    pub target_word_count: Option<u32>,
    pub target_read_time_minutes: Option<u32>,
    pub freeform_instructions: Option<String>,
}

impl AdvancedConfig {
    pub fn normalized(self) -> Self {
        let non_zero = |v: Option<u32>| v.filter(|n| *n > 0);
        Self {
            sentiment: self.sentiment,
            target_char_count: non_zero(self.target_char_count),
            target_word_count: non_zero(self.target_word_count),
            target_read_time_minutes: non_zero(self.target_read_time_minutes),
            freeform_instructions: self
                .freeform_instructions
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty()),
        }
    }

    /// True when no option is in use.
    pub fn is_empty(&self) -> bool {
        self.sentiment.is_none()
            && self.target_char_count.unwrap_or(0) == 0
            && self.target_word_count.unwrap_or(0) == 0
            && self.target_read_time_minutes.unwrap_or(0) == 0
            && self
                .freeform_instructions
                .as_deref()
                .map_or(true, |s| s.trim().is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn style_indices_follow_catalog_order() {
        for (i, style) in RewriteStyle::iter().enumerate() {
            assert_eq!(style.index(), i);
        }
        for (i, style) in GenerationStyle::iter().enumerate() {
            assert_eq!(style.index(), i);
        }
    }

    #[test]
    fn unknown_style_is_rejected() {
        assert_eq!(
            "seo_optimized".parse::<RewriteStyle>().ok(),
            Some(RewriteStyle::SeoOptimized)
        );
        assert!("shouting".parse::<RewriteStyle>().is_err());
        assert!("grammar_correction".parse::<GenerationStyle>().is_err());
    }

    #[test]
    fn zero_targets_count_as_unset() {
        let config = AdvancedConfig {
            target_char_count: Some(0),
            target_word_count: Some(0),
            freeform_instructions: Some("   ".to_string()),
            ..Default::default()
        };
        assert!(config.is_empty());
        assert_eq!(config.normalized(), AdvancedConfig::default());
    }

    #[test]
    fn sentiment_inferred_from_freeform_instructions() {
        assert_eq!(
            Sentiment::infer_from_instructions("Keep a Positive tone throughout"),
            Some(Sentiment::Positive)
        );
        assert_eq!(
            Sentiment::infer_from_instructions("predominantly negative sentiment"),
            Some(Sentiment::Negative)
        );
        assert_eq!(Sentiment::infer_from_instructions("use bullet points"), None);
    }
}
