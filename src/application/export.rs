use super::gate::DenialReason;
use crate::domain::{ExportFormat, HistoryEntry, HistoryKind};
use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("History entry not found: {0}")]
    NotFound(Uuid),
    #[error("{0}")]
    Denied(DenialReason),
    #[error("Failed to encode export: {0}")]
    Encoding(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportedDocument {
    pub file_name: String,
    pub content_type: &'static str,
    pub body: String,
}

pub fn render(entry: &HistoryEntry, format: ExportFormat) -> Result<ExportedDocument, ExportError> {
    let body = match format {
        ExportFormat::Txt => entry.output.clone(),
        ExportFormat::Md => render_markdown(entry),
        ExportFormat::Json => serde_json::to_string_pretty(entry)?,
    };

    Ok(ExportedDocument {
        file_name: format!(
            "{}-{}.{}",
            entry.kind,
            entry.created_at.format("%Y%m%d-%H%M%S"),
            format.extension()
        ),
        content_type: format.content_type(),
        body,
    })
}

fn render_markdown(entry: &HistoryEntry) -> String {
    let (title, input_label) = match entry.kind {
        HistoryKind::Rewrite => ("Rewritten text", "Original"),
        HistoryKind::Generation => ("Generated text", "Topic"),
    };

    let mut tags = vec![format!("style: {}", entry.style)];
    if let Some(length) = &entry.length {
        tags.push(format!("length: {}", length));
    }

    format!(
        "# {}\n\n_{} · {}_\n\n{}\n\n## {}\n\n{}\n",
        title,
        tags.join(" · "),
        entry.created_at.format("%Y-%m-%d %H:%M UTC"),
        entry.output,
        input_label,
        entry.input
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn generation() -> HistoryEntry {
        HistoryEntry::new(
            HistoryKind::Generation,
            "tide pools".to_string(),
            "Small worlds at the edge of the sea.".to_string(),
            "poetic".to_string(),
            Some("short".to_string()),
            Utc.with_ymd_and_hms(2024, 4, 2, 9, 30, 0).unwrap(),
        )
    }

    #[test]
    fn txt_export_is_the_output_only() {
        let doc = render(&generation(), ExportFormat::Txt).unwrap();
        assert_eq!(doc.body, "Small worlds at the edge of the sea.");
        assert_eq!(doc.file_name, "generation-20240402-093000.txt");
        assert_eq!(doc.content_type, "text/plain; charset=utf-8");
    }

    #[test]
    fn markdown_export_carries_tags_and_input() {
        let doc = render(&generation(), ExportFormat::Md).unwrap();
        assert!(doc.body.starts_with("# Generated text\n"));
        assert!(doc.body.contains("style: poetic · length: short"));
        assert!(doc.body.contains("## Topic\n\ntide pools"));
    }

    #[test]
    fn json_export_parses_back() {
        let entry = generation();
        let doc = render(&entry, ExportFormat::Json).unwrap();
        let parsed: HistoryEntry = serde_json::from_str(&doc.body).unwrap();
        assert_eq!(parsed, entry);
    }
}
