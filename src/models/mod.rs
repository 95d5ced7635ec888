mod analysis;
mod execution;
mod filter;
mod note;
mod problem;
mod stats;

pub use analysis::{
    AiAnalysis, AiInsights, CodeAnalysis, CodeAnalysisReport, DailyPracticePlan, OverallProgress,
    PlanStatus, PracticeRecommendation, Priority,
};
pub use execution::{CodeExecutionResult, Language};
pub use filter::{filter_and_sort, ProblemFilter, SortKey, StarFilter};
pub use note::{parse_tags, NewNote, Note};
pub use problem::{Difficulty, NewProblem, Problem, ProblemStatus};
pub use stats::{calculate_stats, ProgressStats};

#[cfg(test)]
pub(crate) use problem::fixtures;

use serde::{Deserialize, Deserializer};

/// Backend rows use `null` where the app wants an empty value.
pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Option::unwrap_or_default)
}
