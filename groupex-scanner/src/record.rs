use serde::{Deserialize, Serialize};

/// One exported group. Serialized with the keys `name`, `link` and `groupId`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupRecord {
    #[serde(rename = "name")]
    pub display_name: String,
    #[serde(rename = "link")]
    pub canonical_link: String,
    #[serde(rename = "groupId")]
    pub identifier: String,
}

impl GroupRecord {
    pub fn new(identifier: String, canonical_link: String, display_name: String) -> Self {
        Self {
            display_name,
            canonical_link,
            identifier,
        }
    }
}

/// Pretty-prints records as a JSON array with two-space indentation.
pub fn to_json(records: &[GroupRecord]) -> serde_json::Result<String> {
    serde_json::to_string_pretty(records)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serializes_with_export_keys_in_order() {
        let records = vec![GroupRecord::new(
            "bookclub".to_string(),
            "https://www.facebook.com/groups/bookclub".to_string(),
            "Book Club".to_string(),
        )];

        let json = to_json(&records).unwrap();

        let expected = "[\n  {\n    \"name\": \"Book Club\",\n    \"link\": \"https://www.facebook.com/groups/bookclub\",\n    \"groupId\": \"bookclub\"\n  }\n]";
        assert_eq!(json, expected);
    }

    #[test]
    fn test_non_latin_text_is_kept_verbatim() {
        let records = vec![GroupRecord::new(
            "123".to_string(),
            "https://www.facebook.com/groups/123".to_string(),
            "מועדון קריאה".to_string(),
        )];

        let json = to_json(&records).unwrap();
        assert!(json.contains("מועדון קריאה"));
        assert!(!json.contains("\\u"));
    }
}
