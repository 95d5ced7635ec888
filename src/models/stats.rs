use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::{Difficulty, Problem, ProblemStatus};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BucketStats {
    pub total: usize,
    pub completed: usize,
}

impl BucketStats {
    fn count(&mut self, completed: bool) {
        self.total += 1;
        if completed {
            self.completed += 1;
        }
    }

    pub fn percent(&self) -> f64 {
        percentage(self.completed, self.total)
    }
}

/// Derived counts over the whole problem list.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProgressStats {
    pub total: usize,
    pub completed: usize,
    pub in_progress: usize,
    pub not_started: usize,
    pub failed: usize,
    pub easy: BucketStats,
    pub medium: BucketStats,
    pub hard: BucketStats,
    pub categories: BTreeMap<String, BucketStats>,
}

impl ProgressStats {
    pub fn completion_rate(&self) -> f64 {
        percentage(self.completed, self.total)
    }

    pub fn difficulty(&self, difficulty: Difficulty) -> BucketStats {
        match difficulty {
            Difficulty::Easy => self.easy,
            Difficulty::Medium => self.medium,
            Difficulty::Hard => self.hard,
        }
    }

    pub fn status(&self, status: ProblemStatus) -> usize {
        match status {
            ProblemStatus::NotStarted => self.not_started,
            ProblemStatus::InProgress => self.in_progress,
            ProblemStatus::Completed => self.completed,
            ProblemStatus::Failed => self.failed,
        }
    }
}

fn percentage(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 * 100.0 / whole as f64
    }
}

pub fn calculate_stats(problems: &[Problem]) -> ProgressStats {
    let mut stats = ProgressStats {
        total: problems.len(),
        ..Default::default()
    };

    for problem in problems {
        let completed = problem.is_completed();

        match problem.status {
            ProblemStatus::Completed => stats.completed += 1,
            ProblemStatus::InProgress => stats.in_progress += 1,
            ProblemStatus::NotStarted => stats.not_started += 1,
            ProblemStatus::Failed => stats.failed += 1,
        }

        let bucket = match problem.difficulty {
            Difficulty::Easy => &mut stats.easy,
            Difficulty::Medium => &mut stats.medium,
            Difficulty::Hard => &mut stats.hard,
        };
        bucket.count(completed);

        stats
            .categories
            .entry(problem.category.clone())
            .or_default()
            .count(completed);
    }

    stats
}
