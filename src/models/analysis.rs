use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::{null_as_default, Difficulty};

/// A row of the backend `ai_analyses` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AiAnalysis {
    pub id: String,
    pub problem_id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub analysis: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CodeAnalysisReport {
    pub time_complexity: String,
    pub space_complexity: String,
    pub code_quality: String,
    pub strengths: Vec<String>,
    pub weaknesses: Vec<String>,
    pub optimization_suggestions: Vec<String>,
    pub best_practices: Vec<String>,
    pub alternative_approaches: Vec<String>,
    pub performance_score: u32,
    pub readability_score: u32,
    pub maintainability_score: u32,
}

impl CodeAnalysisReport {
    /// Plain-text rendering, stored as the opaque analysis text.
    pub fn to_text(&self) -> String {
        let mut out = format!(
            "Quality: {}\nTime: {}  Space: {}\nScores: performance {} / readability {} / maintainability {}\n",
            self.code_quality,
            self.time_complexity,
            self.space_complexity,
            self.performance_score,
            self.readability_score,
            self.maintainability_score,
        );
        let sections = [
            ("Strengths", &self.strengths),
            ("Weaknesses", &self.weaknesses),
            ("Optimizations", &self.optimization_suggestions),
            ("Best practices", &self.best_practices),
            ("Alternatives", &self.alternative_approaches),
        ];
        for (title, items) in sections {
            if items.is_empty() {
                continue;
            }
            out.push_str(&format!("\n{title}:\n"));
            for item in items {
                out.push_str(&format!("  - {item}\n"));
            }
        }
        out
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CodeAnalysis {
    pub problem_id: String,
    pub analysis: CodeAnalysisReport,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Priority {
    #[serde(alias = "high")]
    High,
    #[default]
    #[serde(alias = "medium")]
    Medium,
    #[serde(alias = "low")]
    Low,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PracticeRecommendation {
    #[serde(default)]
    pub id: String,
    pub category: String,
    pub difficulty: Difficulty,
    #[serde(default)]
    pub reason: String,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub estimated_time: u32,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PlanStatus {
    #[default]
    Pending,
    #[serde(rename = "In Progress")]
    InProgress,
    Completed,
}

impl PlanStatus {
    pub fn cycle(&self) -> Self {
        match self {
            PlanStatus::Pending => PlanStatus::InProgress,
            PlanStatus::InProgress => PlanStatus::Completed,
            PlanStatus::Completed => PlanStatus::Pending,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DifficultyDistribution {
    pub easy: u32,
    pub medium: u32,
    pub hard: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlannedProblem {
    #[serde(default)]
    pub id: String,
    pub category: String,
    pub difficulty: Difficulty,
    #[serde(default)]
    pub reason: String,
    #[serde(default)]
    pub estimated_time: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyPracticePlan {
    #[serde(default)]
    pub id: String,
    pub date: DateTime<Utc>,
    #[serde(default)]
    pub status: PlanStatus,
    #[serde(default)]
    pub estimated_total_time: u32,
    #[serde(default)]
    pub difficulty_distribution: DifficultyDistribution,
    #[serde(default)]
    pub focus_areas: Vec<String>,
    #[serde(default)]
    pub problems: Vec<PlannedProblem>,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

impl DailyPracticePlan {
    pub fn is_for(&self, day: NaiveDate) -> bool {
        self.date.date_naive() == day
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OverallProgress {
    pub completion_rate: f64,
    pub average_attempts: f64,
    pub strongest_category: String,
    pub weakest_category: String,
    pub improvement_trend: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StudyPlan {
    pub daily_goal: u32,
    pub weekly_goal: u32,
    pub focus_areas: Vec<String>,
    pub recommended_difficulty: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AiInsights {
    pub overall_progress: OverallProgress,
    pub study_plan: StudyPlan,
    pub last_updated: Option<DateTime<Utc>>,
}
