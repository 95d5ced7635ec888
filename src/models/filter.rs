use std::cmp::Ordering;

use chrono::{DateTime, Utc};

use super::{Difficulty, Problem, ProblemStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StarFilter {
    #[default]
    Any,
    Starred,
    Unstarred,
}

impl StarFilter {
    pub fn cycle(&self) -> Self {
        match self {
            StarFilter::Any => StarFilter::Starred,
            StarFilter::Starred => StarFilter::Unstarred,
            StarFilter::Unstarred => StarFilter::Any,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            StarFilter::Any => "Any",
            StarFilter::Starred => "Starred",
            StarFilter::Unstarred => "Unstarred",
        }
    }

    fn matches(&self, starred: bool) -> bool {
        match self {
            StarFilter::Any => true,
            StarFilter::Starred => starred,
            StarFilter::Unstarred => !starred,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProblemFilter {
    pub search: String,
    pub difficulty: Option<Difficulty>,
    pub status: Option<ProblemStatus>,
    pub starred: StarFilter,
}

impl ProblemFilter {
    pub fn matches(&self, problem: &Problem) -> bool {
        self.matches_search(problem)
            && self.difficulty.is_none_or(|d| problem.difficulty == d)
            && self.status.is_none_or(|s| problem.status == s)
            && self.starred.matches(problem.is_starred)
    }

    /// Case-insensitive substring match over title, category and tags.
    fn matches_search(&self, problem: &Problem) -> bool {
        let needle = self.search.trim().to_lowercase();
        if needle.is_empty() {
            return true;
        }
        problem.title.to_lowercase().contains(&needle)
            || problem.category.to_lowercase().contains(&needle)
            || problem
                .tags
                .iter()
                .any(|tag| tag.to_lowercase().contains(&needle))
    }

    /// Steps through no filter and then each status.
    pub fn cycle_status(&mut self) {
        self.status = cycle_option(self.status, &ProblemStatus::ALL);
    }

    pub fn cycle_difficulty(&mut self) {
        self.difficulty = cycle_option(self.difficulty, &Difficulty::ALL);
    }

    pub fn label(&self) -> String {
        let mut parts = Vec::new();
        if let Some(status) = self.status {
            parts.push(status.label().to_string());
        }
        if let Some(difficulty) = self.difficulty {
            parts.push(difficulty.label().to_string());
        }
        if self.starred != StarFilter::Any {
            parts.push(self.starred.label().to_string());
        }
        if !self.search.trim().is_empty() {
            parts.push(format!("\"{}\"", self.search.trim()));
        }
        if parts.is_empty() {
            "All".to_string()
        } else {
            parts.join(", ")
        }
    }
}

fn cycle_option<T: Copy + PartialEq>(current: Option<T>, all: &[T]) -> Option<T> {
    match current {
        None => all.first().copied(),
        Some(value) => {
            let pos = all.iter().position(|v| *v == value)?;
            all.get(pos + 1).copied()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortField {
    #[default]
    Title,
    Difficulty,
    Status,
    Attempts,
    CompletedAt,
    CreatedAt,
    UpdatedAt,
}

impl SortField {
    pub fn cycle(&self) -> Self {
        match self {
            SortField::Title => SortField::Difficulty,
            SortField::Difficulty => SortField::Status,
            SortField::Status => SortField::Attempts,
            SortField::Attempts => SortField::CompletedAt,
            SortField::CompletedAt => SortField::CreatedAt,
            SortField::CreatedAt => SortField::UpdatedAt,
            SortField::UpdatedAt => SortField::Title,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            SortField::Title => "title",
            SortField::Difficulty => "difficulty",
            SortField::Status => "status",
            SortField::Attempts => "attempts",
            SortField::CompletedAt => "completed",
            SortField::CreatedAt => "created",
            SortField::UpdatedAt => "updated",
        }
    }

    fn compare(&self, a: &Problem, b: &Problem) -> Ordering {
        match self {
            SortField::Title => a.title.to_lowercase().cmp(&b.title.to_lowercase()),
            SortField::Difficulty => a.difficulty.cmp(&b.difficulty),
            SortField::Status => a.status.cmp(&b.status),
            SortField::Attempts => a.attempts.cmp(&b.attempts),
            SortField::CompletedAt => {
                let epoch = DateTime::<Utc>::UNIX_EPOCH;
                a.completed_at
                    .unwrap_or(epoch)
                    .cmp(&b.completed_at.unwrap_or(epoch))
            }
            SortField::CreatedAt => a.created_at.cmp(&b.created_at),
            SortField::UpdatedAt => a.updated_at.cmp(&b.updated_at),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    pub fn flip(&self) -> Self {
        match self {
            SortDirection::Asc => SortDirection::Desc,
            SortDirection::Desc => SortDirection::Asc,
        }
    }

    pub fn arrow(&self) -> &'static str {
        match self {
            SortDirection::Asc => "↑",
            SortDirection::Desc => "↓",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SortKey {
    pub field: SortField,
    pub direction: SortDirection,
}

impl SortKey {
    /// Same field flips the direction, a new field starts ascending.
    pub fn toggle(&mut self, field: SortField) {
        if self.field == field {
            self.direction = self.direction.flip();
        } else {
            self.field = field;
            self.direction = SortDirection::Asc;
        }
    }

    pub fn compare(&self, a: &Problem, b: &Problem) -> Ordering {
        let ordering = self.field.compare(a, b);
        match self.direction {
            SortDirection::Asc => ordering,
            SortDirection::Desc => ordering.reverse(),
        }
    }

    pub fn label(&self) -> String {
        format!("{} {}", self.field.label(), self.direction.arrow())
    }
}

/// The visible slice of the list: filtered, then stably sorted.
pub fn filter_and_sort<'a>(
    problems: &'a [Problem],
    filter: &ProblemFilter,
    sort: &SortKey,
) -> Vec<&'a Problem> {
    let mut visible: Vec<&Problem> = problems.iter().filter(|p| filter.matches(p)).collect();
    visible.sort_by(|a, b| sort.compare(a, b));
    visible
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone};

    use super::*;
    use crate::models::problem::fixtures::problem;

    fn sample() -> Vec<Problem> {
        let mut a = problem("1", "two sum", Difficulty::Easy, "Arrays");
        a.tags = vec!["Hash Table".to_string()];
        a.attempts = 3;
        let mut b = problem("2", "LRU Cache", Difficulty::Medium, "Design");
        b.is_starred = true;
        b.status = ProblemStatus::Completed;
        b.completed_at = Some(Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap());
        let mut c = problem("3", "Binary Tree Paths", Difficulty::Hard, "Trees");
        c.tags = vec!["DFS".to_string()];
        c.created_at += Duration::days(1);
        vec![a, b, c]
    }

    fn ids(view: &[&Problem]) -> Vec<String> {
        view.iter().map(|p| p.id.clone()).collect()
    }

    #[test]
    fn search_matches_title_category_and_tags() {
        let problems = sample();
        let sort = SortKey::default();

        let mut filter = ProblemFilter {
            search: "HASH".to_string(),
            ..Default::default()
        };
        assert_eq!(ids(&filter_and_sort(&problems, &filter, &sort)), ["1"]);

        filter.search = "design".to_string();
        assert_eq!(ids(&filter_and_sort(&problems, &filter, &sort)), ["2"]);

        filter.search = "tree".to_string();
        assert_eq!(ids(&filter_and_sort(&problems, &filter, &sort)), ["3"]);
    }

    #[test]
    fn exact_filters_combine_with_search() {
        let problems = sample();
        let filter = ProblemFilter {
            starred: StarFilter::Starred,
            status: Some(ProblemStatus::Completed),
            ..Default::default()
        };
        assert_eq!(
            ids(&filter_and_sort(&problems, &filter, &SortKey::default())),
            ["2"]
        );

        let filter = ProblemFilter {
            difficulty: Some(Difficulty::Hard),
            search: "cache".to_string(),
            ..Default::default()
        };
        assert!(filter_and_sort(&problems, &filter, &SortKey::default()).is_empty());
    }

    #[test]
    fn title_sort_ignores_case() {
        let problems = sample();
        let view = filter_and_sort(&problems, &ProblemFilter::default(), &SortKey::default());
        assert_eq!(ids(&view), ["3", "2", "1"]);
    }

    #[test]
    fn missing_completion_sorts_first_ascending() {
        let problems = sample();
        let mut sort = SortKey::default();
        sort.toggle(SortField::CompletedAt);
        let view = filter_and_sort(&problems, &ProblemFilter::default(), &sort);
        assert_eq!(view.last().map(|p| p.id.as_str()), Some("2"));
    }

    #[test]
    fn toggle_flips_same_field_and_resets_new_field() {
        let mut sort = SortKey::default();
        sort.toggle(SortField::Title);
        assert_eq!(sort.direction, SortDirection::Desc);

        sort.toggle(SortField::Attempts);
        assert_eq!(sort.field, SortField::Attempts);
        assert_eq!(sort.direction, SortDirection::Asc);

        sort.toggle(SortField::Attempts);
        let problems = sample();
        let view = filter_and_sort(&problems, &ProblemFilter::default(), &sort);
        assert_eq!(view[0].id, "1");
    }

    #[test]
    fn equal_keys_keep_list_order() {
        let problems = sample();
        let mut sort = SortKey::default();
        sort.toggle(SortField::UpdatedAt);
        let view = filter_and_sort(&problems, &ProblemFilter::default(), &sort);
        assert_eq!(ids(&view), ["1", "2", "3"]);
    }

    #[test]
    fn status_filter_cycles_back_to_none() {
        let mut filter = ProblemFilter::default();
        for _ in 0..ProblemStatus::ALL.len() {
            filter.cycle_status();
            assert!(filter.status.is_some());
        }
        filter.cycle_status();
        assert_eq!(filter.status, None);
        assert_eq!(filter.label(), "All");
    }
}
