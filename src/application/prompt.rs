//! Prompt instruction assembly.
//!
//! Turns a request's style, length, sentiment and advanced constraints into
//! the instruction block of a fixed prompt template. The language model sees
//! only the final string.

use crate::domain::{AdvancedConfig, GenerationRequest, RewriteRequest, Sentiment};

/// Instruction lines for the optional constraints, in a stable order.
///
/// An explicit sentiment wins; otherwise the tone is inferred from the
/// freeform instructions when they ask for one.
pub fn advanced_instructions(advanced: &AdvancedConfig) -> Vec<String> {
    let mut lines = Vec::new();

    let sentiment = advanced.sentiment.or_else(|| {
        advanced
            .freeform_instructions
            .as_deref()
            .and_then(Sentiment::infer_from_instructions)
    });
    if let Some(sentiment) = sentiment {
        lines.push(format!("Tone: {}", sentiment.instructions()));
    }

    if let Some(chars) = advanced.target_char_count {
        lines.push(format!(
            "The text must have approximately {} characters.",
            chars
        ));
    }
    if let Some(words) = advanced.target_word_count {
        lines.push(format!("The text must have approximately {} words.", words));
    }
    if let Some(minutes) = advanced.target_read_time_minutes {
        lines.push(format!(
            "The text should take about {} minute(s) to read (roughly {} words).",
            minutes,
            minutes.saturating_mul(200)
        ));
    }
    if let Some(freeform) = advanced.freeform_instructions.as_deref() {
        lines.push(format!("Additional instructions: {}", freeform));
    }

    lines
}

pub fn rewrite_prompt(request: &RewriteRequest) -> String {
    let mut instructions = vec![request.style.instructions().to_string()];
    instructions.extend(advanced_instructions(&request.advanced));

    format!(
        "You are an expert editor. Rewrite the text below following these instructions:\n\
         {}\n\n\
         Keep the language of the original text. Return only the rewritten text, \
         without preamble or commentary.\n\n\
         Text:\n\"\"\"\n{}\n\"\"\"",
        bullet_list(&instructions),
        request.text.trim()
    )
}

pub fn generation_prompt(request: &GenerationRequest) -> String {
    let mut instructions = vec![
        request.style.instructions().to_string(),
        request.length.instructions().to_string(),
    ];
    instructions.extend(advanced_instructions(&request.advanced));

    format!(
        "You are an experienced writer. Write an original text about the topic below \
         following these instructions:\n\
         {}\n\n\
         Return only the text itself, without a title, preamble or commentary.\n\n\
         Topic: {}",
        bullet_list(&instructions),
        request.topic.trim()
    )
}

fn bullet_list(lines: &[String]) -> String {
    lines
        .iter()
        .map(|line| format!("- {}", line))
        .collect::<Vec<_>>()
        .join("\n")
}
