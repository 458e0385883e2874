use serde::{Deserialize, Serialize};
use std::fmt;

/// Backend record identifier.
///
/// The REST collaborator hands out numeric ids for seeded records and string
/// ids for records it creates, so both shapes are accepted and written back
/// unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RecordId {
    Number(i64),
    Text(String),
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordId::Number(n) => write!(f, "{}", n),
            RecordId::Text(s) => f.write_str(s),
        }
    }
}

impl From<i64> for RecordId {
    fn from(n: i64) -> Self {
        RecordId::Number(n)
    }
}

impl From<&str> for RecordId {
    fn from(s: &str) -> Self {
        RecordId::Text(s.to_string())
    }
}

impl RecordId {
    /// Ids compare by their textual form, so `1` and `"1"` name the same record.
    pub fn matches(&self, other: &str) -> bool {
        self.to_string() == other
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_numeric_and_string_ids() {
        let n: RecordId = serde_json::from_str("7").unwrap();
        let s: RecordId = serde_json::from_str("\"a1b2\"").unwrap();
        assert_eq!(n, RecordId::Number(7));
        assert_eq!(s, RecordId::Text("a1b2".to_string()));
        assert_eq!(serde_json::to_string(&n).unwrap(), "7");
    }

    #[test]
    fn numeric_and_text_forms_match() {
        assert!(RecordId::Number(3).matches("3"));
        assert!(!RecordId::Number(3).matches("30"));
    }
}
