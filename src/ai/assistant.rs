use std::collections::BTreeSet;
use std::sync::OnceLock;
use std::time::Duration;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use regex::Regex;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{AppError, Result};
use crate::models::{
    AiInsights, CodeAnalysis, CodeAnalysisReport, DailyPracticePlan, PracticeRecommendation,
    Problem, ProblemStatus,
};

const SYSTEM_PROMPT: &str = "You are a helpful AI assistant specialized in analyzing LeetCode problems and providing coding advice.";
const TEMPERATURE: f32 = 0.7;
const MAX_TOKENS: u32 = 2000;

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Option<ReplyMessage>,
}

#[derive(Debug, Deserialize)]
struct ReplyMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RecommendationReply {
    recommendations: Vec<PracticeRecommendation>,
}

/// Chat-completions client with the prompt-engineered study features.
#[derive(Clone)]
pub struct Assistant {
    client: Client,
    api_key: String,
    model: String,
    api_url: String,
}

impl Assistant {
    pub fn new(api_key: String, model: &str, api_url: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(60))
            .build()?;
        Ok(Self {
            client,
            api_key,
            model: model.to_string(),
            api_url: api_url.to_string(),
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// One system + user exchange, returning the first choice's text.
    pub async fn chat(&self, system: &str, prompt: &str) -> Result<String> {
        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system,
                },
                ChatMessage {
                    role: "user",
                    content: prompt,
                },
            ],
            temperature: TEMPERATURE,
            max_tokens: MAX_TOKENS,
        };

        let response = self
            .client
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body: Value = response.json().await.unwrap_or_default();
            let message = body
                .pointer("/error/message")
                .and_then(Value::as_str)
                .unwrap_or("Unknown error");
            return Err(AppError::AiApi(format!("{} - {}", status.as_u16(), message)));
        }

        let chat: ChatResponse = response.json().await?;
        chat.choices
            .into_iter()
            .next()
            .and_then(|c| c.message)
            .and_then(|m| m.content)
            .ok_or_else(|| AppError::AiApi("Invalid response format from chat API".to_string()))
    }

    pub async fn analyze_code(&self, problem: &Problem) -> Result<CodeAnalysis> {
        let reply = self.chat(SYSTEM_PROMPT, &analysis_prompt(problem)).await?;
        let analysis: CodeAnalysisReport = parse_json_reply(&reply)?;
        tracing::info!("Analyzed solution for {}", problem.title);

        Ok(CodeAnalysis {
            problem_id: problem.id.clone(),
            analysis,
            created_at: Utc::now(),
        })
    }

    pub async fn recommend(&self, problems: &[Problem]) -> Result<Vec<PracticeRecommendation>> {
        let reply = self
            .chat(SYSTEM_PROMPT, &recommendation_prompt(problems))
            .await?;
        let parsed: RecommendationReply = parse_json_reply(&reply)?;

        let now = Utc::now();
        let recommendations = parsed
            .recommendations
            .into_iter()
            .enumerate()
            .map(|(i, mut rec)| {
                if rec.id.is_empty() {
                    rec.id = format!("rec{}", i + 1);
                }
                rec.created_at = now;
                rec
            })
            .collect();
        Ok(recommendations)
    }

    /// The plan is pinned to `day` whatever date the model echoes back.
    pub async fn daily_plan(&self, day: NaiveDate) -> Result<DailyPracticePlan> {
        let date = plan_timestamp(day);
        let reply = self.chat(SYSTEM_PROMPT, &plan_prompt(day)).await?;
        let mut body: Value = parse_json_reply(&reply)?;

        let mut plan = body
            .get_mut("plan")
            .map(Value::take)
            .ok_or_else(|| AppError::AiParse("missing `plan` object".to_string()))?;
        if let Some(obj) = plan.as_object_mut() {
            obj.insert("date".to_string(), Value::String(date.to_rfc3339()));
        }

        let mut plan: DailyPracticePlan =
            serde_json::from_value(plan).map_err(|e| AppError::AiParse(e.to_string()))?;
        if plan.id.is_empty() {
            plan.id = format!("plan-{}", day.format("%Y%m%d"));
        }
        plan.created_at = Utc::now();
        Ok(plan)
    }

    pub async fn insights(&self, problems: &[Problem]) -> Result<AiInsights> {
        let reply = self.chat(SYSTEM_PROMPT, &insights_prompt(problems)).await?;
        let mut insights: AiInsights = parse_json_reply(&reply)?;
        insights.last_updated = Some(Utc::now());
        Ok(insights)
    }
}

/// Parses a reply that is either bare JSON or JSON inside a Markdown code fence.
pub fn parse_json_reply<T: DeserializeOwned>(reply: &str) -> Result<T> {
    static FENCE: OnceLock<Regex> = OnceLock::new();
    let fence = FENCE.get_or_init(|| {
        Regex::new(r"(?s)^```[A-Za-z]*\s*(.*?)\s*```$").expect("fence pattern is valid")
    });

    let trimmed = reply.trim();
    let body = fence
        .captures(trimmed)
        .and_then(|c| c.get(1))
        .map_or(trimmed, |m| m.as_str());

    serde_json::from_str(body).map_err(|e| {
        tracing::error!("Failed to parse AI response as JSON: {}", reply);
        AppError::AiParse(e.to_string())
    })
}

fn or_placeholder<'a>(value: &'a str, placeholder: &'a str) -> &'a str {
    if value.trim().is_empty() {
        placeholder
    } else {
        value
    }
}

fn analysis_prompt(problem: &Problem) -> String {
    format!(
        r#"Analyze this LeetCode problem solution:

Problem: {title}
Category: {category}
Difficulty: {difficulty}
Status: {status}
Code: {code}
Notes: {notes}

Please provide a detailed analysis including:
1. Code quality assessment (Excellent/Good/Fair/Poor)
2. Time complexity analysis
3. Space complexity analysis
4. Strengths of the solution
5. Areas for improvement
6. Optimization suggestions
7. Alternative approaches

Respond in JSON format with this structure:
{{
  "timeComplexity": "O(n)",
  "spaceComplexity": "O(1)",
  "codeQuality": "Good",
  "strengths": ["Clear variable names", "Efficient algorithm"],
  "weaknesses": ["Could use better error handling"],
  "optimizationSuggestions": ["Use a more efficient data structure"],
  "bestPractices": ["Add input validation", "Use meaningful variable names"],
  "alternativeApproaches": ["Dynamic programming approach"],
  "performanceScore": 85,
  "readabilityScore": 90,
  "maintainabilityScore": 80
}}"#,
        title = problem.title,
        category = problem.category,
        difficulty = problem.difficulty,
        status = problem.status,
        code = or_placeholder(&problem.solution, "No code provided"),
        notes = or_placeholder(&problem.notes, "No notes provided"),
    )
}

fn count_status(problems: &[Problem], status: ProblemStatus) -> usize {
    problems.iter().filter(|p| p.status == status).count()
}

fn joined<'a>(values: impl Iterator<Item = &'a str>) -> String {
    values.collect::<BTreeSet<_>>().into_iter().collect::<Vec<_>>().join(", ")
}

fn recommendation_prompt(problems: &[Problem]) -> String {
    let completed: Vec<&Problem> = problems.iter().filter(|p| p.is_completed()).collect();

    format!(
        r#"Based on the user's LeetCode progress, generate personalized practice recommendations.

Completed Problems: {completed}
In Progress Problems: {in_progress}
Total Problems: {total}

Completed problem categories: {categories}
Completed problem difficulties: {difficulties}

Please generate 5 personalized practice recommendations. Consider:
1. Weak areas based on completed problems
2. Difficulty progression
3. Category balance
4. Common interview topics

Respond in JSON format with this structure:
{{
  "recommendations": [
    {{
      "id": "rec1",
      "category": "Arrays",
      "difficulty": "Medium",
      "reason": "You've completed many easy array problems, time to challenge yourself",
      "priority": "High",
      "estimatedTime": 30
    }}
  ]
}}"#,
        completed = completed.len(),
        in_progress = count_status(problems, ProblemStatus::InProgress),
        total = problems.len(),
        categories = joined(completed.iter().map(|p| p.category.as_str())),
        difficulties = joined(completed.iter().map(|p| p.difficulty.label())),
    )
}

/// Noon UTC keeps the calendar day stable when the plan is read back.
fn plan_timestamp(day: NaiveDate) -> DateTime<Utc> {
    day.and_time(NaiveTime::from_hms_opt(12, 0, 0).unwrap_or_default()).and_utc()
}

fn plan_prompt(day: NaiveDate) -> String {
    format!(
        r#"Create a daily practice plan for LeetCode problems. The plan should include:
1. 3-5 problems of varying difficulty
2. Focus on different categories
3. Estimated time for each problem
4. Learning objectives

Date: {day}

Respond in JSON format with this structure:
{{
  "plan": {{
    "id": "plan1",
    "date": "{iso}",
    "status": "Pending",
    "estimatedTotalTime": 120,
    "difficultyDistribution": {{
      "easy": 1,
      "medium": 2,
      "hard": 1
    }},
    "focusAreas": ["Arrays", "Strings", "Dynamic Programming"],
    "problems": [
      {{
        "id": "prob1",
        "category": "Arrays",
        "difficulty": "Medium",
        "reason": "Practice two-pointer technique",
        "estimatedTime": 30
      }}
    ]
  }}
}}"#,
        day = day.format("%a %b %d %Y"),
        iso = plan_timestamp(day).to_rfc3339(),
    )
}

fn insights_prompt(problems: &[Problem]) -> String {
    format!(
        r#"Analyze the user's LeetCode progress and provide insights.

Total Problems: {total}
Completed: {completed}
In Progress: {in_progress}
Failed: {failed}

Categories: {categories}
Difficulties: {difficulties}

Please provide insights in JSON format:
{{
  "overallProgress": {{
    "completionRate": 75.5,
    "averageAttempts": 2.3,
    "strongestCategory": "Arrays",
    "weakestCategory": "Dynamic Programming",
    "improvementTrend": "Improving"
  }},
  "studyPlan": {{
    "dailyGoal": 3,
    "weeklyGoal": 15,
    "focusAreas": ["Dynamic Programming", "Graphs"],
    "recommendedDifficulty": "Medium"
  }}
}}"#,
        total = problems.len(),
        completed = count_status(problems, ProblemStatus::Completed),
        in_progress = count_status(problems, ProblemStatus::InProgress),
        failed = count_status(problems, ProblemStatus::Failed),
        categories = joined(problems.iter().map(|p| p.category.as_str())),
        difficulties = joined(problems.iter().map(|p| p.difficulty.label())),
    )
}
