use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Note {
    pub id: i64,
    pub problem_id: Option<String>,
    pub content: String,
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Note {
    pub fn matches(&self, query: &str) -> bool {
        let needle = query.trim().to_lowercase();
        needle.is_empty()
            || self.content.to_lowercase().contains(&needle)
            || self.tags.iter().any(|t| t.to_lowercase().contains(&needle))
    }

    /// First non-empty line, used as the list title.
    pub fn headline(&self) -> &str {
        self.content
            .lines()
            .map(str::trim)
            .find(|l| !l.is_empty())
            .unwrap_or("(empty)")
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewNote {
    pub problem_id: Option<String>,
    pub content: String,
    pub tags: Vec<String>,
}

/// Splits comma separated input into trimmed, non-empty tags.
pub fn parse_tags(input: &str) -> Vec<String> {
    input
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tags_are_trimmed_and_blank_entries_dropped() {
        assert_eq!(parse_tags(" dp, graphs ,, "), vec!["dp", "graphs"]);
        assert!(parse_tags("").is_empty());
    }

    #[test]
    fn note_search_covers_content_and_tags() {
        let now = Utc::now();
        let note = Note {
            id: 1,
            problem_id: None,
            content: "\n  Sliding window recap\nKeep two pointers".to_string(),
            tags: vec!["Window".to_string()],
            created_at: now,
            updated_at: now,
        };
        assert!(note.matches("POINTERS"));
        assert!(note.matches("wind"));
        assert!(!note.matches("heap"));
        assert_eq!(note.headline(), "Sliding window recap");
    }
}
