use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::null_as_default;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub enum Difficulty {
    #[default]
    #[serde(alias = "easy")]
    Easy,
    #[serde(alias = "medium")]
    Medium,
    #[serde(alias = "hard")]
    Hard,
}

impl Difficulty {
    pub const ALL: [Difficulty; 3] = [Difficulty::Easy, Difficulty::Medium, Difficulty::Hard];

    pub fn label(&self) -> &'static str {
        match self {
            Difficulty::Easy => "Easy",
            Difficulty::Medium => "Medium",
            Difficulty::Hard => "Hard",
        }
    }

    pub fn cycle(&self) -> Self {
        match self {
            Difficulty::Easy => Difficulty::Medium,
            Difficulty::Medium => Difficulty::Hard,
            Difficulty::Hard => Difficulty::Easy,
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Difficulty {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "easy" => Ok(Difficulty::Easy),
            "medium" => Ok(Difficulty::Medium),
            "hard" => Ok(Difficulty::Hard),
            other => Err(format!("unknown difficulty: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub enum ProblemStatus {
    #[default]
    #[serde(rename = "Not Started")]
    NotStarted,
    #[serde(rename = "In Progress")]
    InProgress,
    Completed,
    Failed,
}

impl ProblemStatus {
    pub const ALL: [ProblemStatus; 4] = [
        ProblemStatus::NotStarted,
        ProblemStatus::InProgress,
        ProblemStatus::Completed,
        ProblemStatus::Failed,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            ProblemStatus::NotStarted => "Not Started",
            ProblemStatus::InProgress => "In Progress",
            ProblemStatus::Completed => "Completed",
            ProblemStatus::Failed => "Failed",
        }
    }

    pub fn cycle(&self) -> Self {
        match self {
            ProblemStatus::NotStarted => ProblemStatus::InProgress,
            ProblemStatus::InProgress => ProblemStatus::Completed,
            ProblemStatus::Completed => ProblemStatus::Failed,
            ProblemStatus::Failed => ProblemStatus::NotStarted,
        }
    }
}

impl fmt::Display for ProblemStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A row of the backend `problems` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Problem {
    pub id: String,
    pub title: String,
    pub difficulty: Difficulty,
    #[serde(default, deserialize_with = "null_as_default")]
    pub category: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub url: String,
    pub status: ProblemStatus,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub attempts: u32,
    #[serde(default, deserialize_with = "null_as_default")]
    pub notes: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub solution: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub language: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub time_complexity: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub space_complexity: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub tags: Vec<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub is_starred: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Problem {
    /// The writable part of the record, used for full-record saves.
    pub fn to_new(&self) -> NewProblem {
        NewProblem {
            title: self.title.clone(),
            difficulty: self.difficulty,
            category: self.category.clone(),
            url: self.url.clone(),
            status: self.status,
            completed_at: self.completed_at,
            attempts: self.attempts,
            notes: self.notes.clone(),
            solution: self.solution.clone(),
            language: self.language.clone(),
            time_complexity: self.time_complexity.clone(),
            space_complexity: self.space_complexity.clone(),
            tags: self.tags.clone(),
            description: self.description.clone(),
            is_starred: self.is_starred,
        }
    }

    /// Replaces every writable field with `fields`, keeping identity and creation time.
    pub fn apply(&mut self, fields: NewProblem, now: DateTime<Utc>) {
        self.title = fields.title;
        self.difficulty = fields.difficulty;
        self.category = fields.category;
        self.url = fields.url;
        self.status = fields.status;
        self.completed_at = fields.completed_at;
        self.attempts = fields.attempts;
        self.notes = fields.notes;
        self.solution = fields.solution;
        self.language = fields.language;
        self.time_complexity = fields.time_complexity;
        self.space_complexity = fields.space_complexity;
        self.tags = fields.tags;
        self.description = fields.description;
        self.is_starred = fields.is_starred;
        self.updated_at = now;
    }

    /// A status change counts as an attempt; completing stamps the time.
    pub fn with_status(&self, status: ProblemStatus, now: DateTime<Utc>) -> Problem {
        let mut next = self.clone();
        next.status = status;
        next.attempts = self.attempts.saturating_add(1);
        next.completed_at = match status {
            ProblemStatus::Completed => Some(now),
            _ => self.completed_at,
        };
        next.updated_at = now;
        next
    }

    pub fn with_star_toggled(&self, now: DateTime<Utc>) -> Problem {
        let mut next = self.clone();
        next.is_starred = !self.is_starred;
        next.updated_at = now;
        next
    }

    pub fn is_completed(&self) -> bool {
        self.status == ProblemStatus::Completed
    }
}

/// Form input for a problem; everything but id and timestamps.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct NewProblem {
    pub title: String,
    pub difficulty: Difficulty,
    pub category: String,
    pub url: String,
    pub status: ProblemStatus,
    pub completed_at: Option<DateTime<Utc>>,
    pub attempts: u32,
    pub notes: String,
    pub solution: String,
    pub language: String,
    pub time_complexity: String,
    pub space_complexity: String,
    pub tags: Vec<String>,
    pub description: Option<String>,
    pub is_starred: bool,
}

impl NewProblem {
    /// Title and category are required.
    pub fn validate(&self) -> Result<(), String> {
        if self.title.trim().is_empty() || self.category.trim().is_empty() {
            return Err("Please fill in all required fields".to_string());
        }
        Ok(())
    }

    /// Saving a form as Completed stamps completion when it has none.
    pub fn stamp_completion(&mut self, now: DateTime<Utc>) {
        match self.status {
            ProblemStatus::Completed => {
                self.completed_at.get_or_insert(now);
            }
            _ => self.completed_at = None,
        }
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use chrono::TimeZone;

    use super::*;

    pub fn problem(id: &str, title: &str, difficulty: Difficulty, category: &str) -> Problem {
        let created = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
        Problem {
            id: id.to_string(),
            title: title.to_string(),
            difficulty,
            category: category.to_string(),
            url: String::new(),
            status: ProblemStatus::NotStarted,
            completed_at: None,
            attempts: 0,
            notes: String::new(),
            solution: String::new(),
            language: String::new(),
            time_complexity: String::new(),
            space_complexity: String::new(),
            tags: Vec::new(),
            description: None,
            is_starred: false,
            created_at: created,
            updated_at: created,
        }
    }
}
