use crate::document::DocumentTree;
use crate::error::DocumentError;
use crate::models::DocumentDto;
use crate::palette::ColorAssigner;

/// `# title`, `## pillar`, `### section` + verbatim content, blank-line
/// separated, trailing whitespace trimmed.
pub fn to_markdown(doc: &DocumentTree) -> String {
    dto_to_markdown(&doc.to_dto())
}

pub fn dto_to_markdown(dto: &DocumentDto) -> String {
    let mut md = format!("# {}\n\n", dto.main_title);
    for p in &dto.pillars {
        md.push_str(&format!("## {}\n\n", p.title));
        for s in &p.subsections {
            md.push_str(&format!("### {}\n\n{}\n\n", s.title, s.content));
        }
    }
    md.trim_end().to_string()
}

pub fn to_json(doc: &DocumentTree) -> String {
    dto_to_json(&doc.to_dto())
}

/// Pretty-printed exchanged document.
pub fn dto_to_json(dto: &DocumentDto) -> String {
    // Plain strings, bools and vectors: serialization cannot fail.
    serde_json::to_string_pretty(dto).unwrap_or_default()
}

pub fn from_json(text: &str, colors: ColorAssigner) -> Result<DocumentTree, DocumentError> {
    let value: serde_json::Value = serde_json::from_str(text).map_err(DocumentError::malformed)?;
    DocumentTree::from_value(&value, colors)
}

/// `DDMMYY-HHMM`, as used in generated file names.
pub fn timestamp_label(day: u32, month: u32, year: u32, hour: u32, minute: u32) -> String {
    format!(
        "{:02}{:02}{:02}-{:02}{:02}",
        day,
        month,
        year % 100,
        hour,
        minute
    )
}

/// Lowercased title with every non-alphanumeric ASCII character replaced by
/// `-`. Empty titles become `project`.
pub fn safe_file_stem(title: &str) -> String {
    if title.is_empty() {
        return "project".to_string();
    }
    title
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_lowercase()
            } else {
                '-'
            }
        })
        .collect()
}

/// Name for a local JSON download.
pub fn export_file_name(timestamp: &str) -> String {
    format!("project_{timestamp}.json")
}

/// Name for a document saved to the storage account.
pub fn remote_file_name(title: &str, timestamp: &str) -> String {
    format!("{}_{timestamp}.json", safe_file_stem(title))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::LeafSeed;

    #[test]
    fn test_markdown_scenario() {
        let mut doc = DocumentTree::new("T", ColorAssigner::default());
        doc.add_group("G1", None, vec![LeafSeed::new("L1", "body")]);
        assert_eq!(to_markdown(&doc), "# T\n\n## G1\n\n### L1\n\nbody");
    }

    #[test]
    fn test_markdown_keeps_content_verbatim_and_empty_groups() {
        let mut doc = DocumentTree::new("Doc", ColorAssigner::default());
        doc.add_group("Empty", None, vec![]);
        doc.add_group(
            "Full",
            None,
            vec![LeafSeed::new("A", "- item\n- item 2"), LeafSeed::new("B", "")],
        );
        assert_eq!(
            to_markdown(&doc),
            "# Doc\n\n## Empty\n\n## Full\n\n### A\n\n- item\n- item 2\n\n### B"
        );
    }

    #[test]
    fn test_json_round_trip() {
        let mut doc = DocumentTree::new("T", ColorAssigner::default());
        let g = doc.add_group("G", None, vec![LeafSeed::new("L", "c")]);
        doc.toggle_group_collapsed(g);

        let text = to_json(&doc);
        assert!(text.contains("\n  \"mainTitle\": \"T\""));

        let back = from_json(&text, ColorAssigner::default()).expect("should parse");
        assert_eq!(back.to_dto(), doc.to_dto());
    }

    #[test]
    fn test_from_json_rejects_invalid_text() {
        let err = from_json("not json", ColorAssigner::default()).unwrap_err();
        assert!(matches!(err, DocumentError::Malformed(_)));

        let err = from_json("\"just a string\"", ColorAssigner::default()).unwrap_err();
        assert!(matches!(err, DocumentError::Malformed(_)));
    }

    #[test]
    fn test_timestamp_label() {
        assert_eq!(timestamp_label(5, 3, 2024, 9, 7), "050324-0907");
    }

    #[test]
    fn test_file_names() {
        assert_eq!(safe_file_stem("My Gem: v2!"), "my-gem--v2-");
        assert_eq!(safe_file_stem(""), "project");
        assert_eq!(remote_file_name("Été", "010124-1200"), "-t-_010124-1200.json");
        assert_eq!(export_file_name("010124-1200"), "project_010124-1200.json");
    }
}
