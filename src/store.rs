//! Reducer-style state containers kept in sync with the backend.
//!
//! The problem list is fully loaded in memory; every mutation replaces the
//! affected record and recomputes the derived stats from scratch.

use chrono::NaiveDate;

use crate::models::{
    calculate_stats, AiInsights, CodeAnalysis, DailyPracticePlan, PracticeRecommendation,
    Problem, ProgressStats,
};

#[derive(Debug, Clone)]
pub enum ProblemAction {
    SetProblems(Vec<Problem>),
    AddProblem(Problem),
    UpdateProblem(Problem),
    DeleteProblem(String),
    SetLoading(bool),
}

#[derive(Debug, Clone, Default)]
pub struct ProblemState {
    pub problems: Vec<Problem>,
    pub stats: ProgressStats,
    pub loading: bool,
}

impl ProblemState {
    pub fn reduce(&mut self, action: ProblemAction) {
        match action {
            ProblemAction::SetProblems(problems) => {
                self.problems = problems;
            }
            ProblemAction::AddProblem(problem) => {
                self.problems.push(problem);
            }
            ProblemAction::UpdateProblem(problem) => {
                if let Some(slot) = self.problems.iter_mut().find(|p| p.id == problem.id) {
                    *slot = problem;
                }
            }
            ProblemAction::DeleteProblem(id) => {
                self.problems.retain(|p| p.id != id);
            }
            ProblemAction::SetLoading(loading) => {
                self.loading = loading;
                return;
            }
        }
        self.stats = calculate_stats(&self.problems);
    }

    pub fn get(&self, id: &str) -> Option<&Problem> {
        self.problems.iter().find(|p| p.id == id)
    }
}

#[derive(Debug, Clone)]
pub enum AssistantAction {
    SetCodeAnalyses(Vec<CodeAnalysis>),
    AddCodeAnalysis(CodeAnalysis),
    SetRecommendations(Vec<PracticeRecommendation>),
    SetPracticePlans(Vec<DailyPracticePlan>),
    AddPracticePlan(DailyPracticePlan),
    UpdatePracticePlan(DailyPracticePlan),
    SetInsights(AiInsights),
}

#[derive(Debug, Clone, Default)]
pub struct AssistantState {
    pub code_analyses: Vec<CodeAnalysis>,
    pub recommendations: Vec<PracticeRecommendation>,
    pub practice_plans: Vec<DailyPracticePlan>,
    pub insights: Option<AiInsights>,
}

impl AssistantState {
    pub fn reduce(&mut self, action: AssistantAction) {
        match action {
            AssistantAction::SetCodeAnalyses(analyses) => self.code_analyses = analyses,
            AssistantAction::AddCodeAnalysis(analysis) => self.code_analyses.insert(0, analysis),
            AssistantAction::SetRecommendations(recs) => self.recommendations = recs,
            AssistantAction::SetPracticePlans(plans) => self.practice_plans = plans,
            AssistantAction::AddPracticePlan(plan) => {
                let day = plan.date.date_naive();
                self.practice_plans.retain(|p| !p.is_for(day));
                self.practice_plans.insert(0, plan);
            }
            AssistantAction::UpdatePracticePlan(plan) => {
                if let Some(slot) = self.practice_plans.iter_mut().find(|p| p.id == plan.id) {
                    *slot = plan;
                }
            }
            AssistantAction::SetInsights(insights) => self.insights = Some(insights),
        }
    }

    pub fn recommendations_for_category(&self, category: &str) -> Vec<&PracticeRecommendation> {
        self.recommendations
            .iter()
            .filter(|r| r.category == category)
            .collect()
    }

    pub fn plan_for(&self, day: NaiveDate) -> Option<&DailyPracticePlan> {
        self.practice_plans.iter().find(|p| p.is_for(day))
    }

    pub fn today_plan(&self) -> Option<&DailyPracticePlan> {
        self.plan_for(chrono::Local::now().date_naive())
    }

    pub fn latest_analysis(&self, problem_id: &str) -> Option<&CodeAnalysis> {
        self.code_analyses.iter().find(|a| a.problem_id == problem_id)
    }
}
