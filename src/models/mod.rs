use serde::{Deserialize, Serialize};

/// Visual identity of a pillar and all of its subsections.
///
/// Field names follow the exchanged JSON document, which predates this crate.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct ColorSet {
    pub bg: String,
    pub text: String,
    pub border: String,
    pub ring: String,
    #[serde(rename = "easymdeBg")]
    pub easymde_bg: String,
    #[serde(rename = "printBg")]
    pub print_bg: String,
    #[serde(rename = "printText")]
    pub print_text: String,
}

/// Exchanged document shape (JSON import/export and remote storage).
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct DocumentDto {
    #[serde(rename = "mainTitle", default)]
    pub main_title: String,
    #[serde(default)]
    pub pillars: Vec<PillarDto>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct PillarDto {
    #[serde(default)]
    pub title: String,
    #[serde(rename = "colorSet", default, skip_serializing_if = "Option::is_none")]
    pub color_set: Option<ColorSet>,
    #[serde(rename = "isClosed", default)]
    pub is_closed: bool,
    #[serde(default)]
    pub subsections: Vec<SubsectionDto>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct SubsectionDto {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(rename = "isClosed", default)]
    pub is_closed: bool,
}

/// Entry of the remote document listing.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct DriveFile {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(rename = "modifiedTime", default)]
    pub modified_time: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct DriveFolder {
    pub id: String,
    #[serde(default)]
    pub name: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_dto_contract_serialize() {
        let dto = DocumentDto {
            main_title: "T".to_string(),
            pillars: vec![PillarDto {
                title: "P".to_string(),
                color_set: None,
                is_closed: true,
                subsections: vec![SubsectionDto {
                    title: "S".to_string(),
                    content: "c".to_string(),
                    is_closed: false,
                }],
            }],
        };
        let v = serde_json::to_value(&dto).expect("should serialize");
        assert_eq!(v["mainTitle"], "T");
        assert_eq!(v["pillars"][0]["isClosed"], true);
        assert!(v["pillars"][0].get("colorSet").is_none());
        assert_eq!(v["pillars"][0]["subsections"][0]["content"], "c");
    }

    #[test]
    fn test_color_set_contract_keys() {
        let json = r##"{
            "bg": "bg-blue-100", "text": "text-blue-800", "border": "border-blue-300",
            "ring": "focus:ring-blue-400", "easymdeBg": "#EFF6FF",
            "printBg": "#EFF6FF", "printText": "#1E40AF"
        }"##;
        let parsed: ColorSet = serde_json::from_str(json).expect("color set should parse");
        assert_eq!(parsed.easymde_bg, "#EFF6FF");
        assert_eq!(parsed.print_text, "#1E40AF");
    }

    #[test]
    fn test_drive_file_listing_contract_deserialize() {
        let json = r#"{"id": "f1", "name": "doc.json", "modifiedTime": "2024-05-01T10:00:00Z"}"#;
        let parsed: DriveFile = serde_json::from_str(json).expect("file entry should parse");
        assert_eq!(parsed.id, "f1");
        assert_eq!(parsed.modified_time, "2024-05-01T10:00:00Z");
    }
}
