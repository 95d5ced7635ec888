use std::sync::OnceLock;
use std::time::Duration;

use regex::Regex;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::{AppError, Result};
use crate::models::{Difficulty, NewProblem};

const QUESTION_QUERY: &str = r#"query getQuestionDetail($titleSlug: String!) {
  question(titleSlug: $titleSlug) {
    title
    difficulty
    content
    topicTags { name }
  }
}"#;

/// Posts the question query upstream and returns `data.question`, or `{}` when absent.
pub async fn fetch_question(client: &Client, graphql_url: &str, slug: &str) -> Result<Value> {
    let response = client
        .post(graphql_url)
        .json(&json!({
            "query": QUESTION_QUERY,
            "variables": { "titleSlug": slug },
        }))
        .send()
        .await?;

    if !response.status().is_success() {
        let status = response.status();
        let error_text = response.text().await?;
        return Err(AppError::LeetCode(format!("HTTP {}: {}", status, error_text)));
    }

    let mut body: Value = response.json().await?;
    let question = body
        .pointer_mut("/data/question")
        .map(Value::take)
        .filter(|q| !q.is_null())
        .unwrap_or_else(|| json!({}));
    Ok(question)
}

#[derive(Debug, Deserialize)]
struct TopicTag {
    name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawQuestion {
    title: Option<String>,
    difficulty: Option<String>,
    content: Option<String>,
    #[serde(default)]
    topic_tags: Vec<TopicTag>,
}

/// Problem metadata imported from LeetCode.
#[derive(Debug, Clone, PartialEq)]
pub struct LeetCodeQuestion {
    pub slug: String,
    pub title: String,
    pub difficulty: Difficulty,
    pub description: String,
    pub tags: Vec<String>,
}

impl LeetCodeQuestion {
    /// Prefills a new problem. The first topic tag becomes the category.
    pub fn to_new_problem(&self) -> NewProblem {
        NewProblem {
            title: self.title.clone(),
            difficulty: self.difficulty,
            category: self.tags.first().cloned().unwrap_or_default(),
            url: problem_url(&self.slug),
            tags: self.tags.clone(),
            description: (!self.description.is_empty()).then(|| self.description.clone()),
            ..Default::default()
        }
    }
}

/// Client for the local pass-through proxy.
pub struct ProxyClient {
    client: Client,
    base_url: String,
}

impl ProxyClient {
    pub fn new(base_url: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(20))
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub async fn question(&self, slug: &str) -> Result<LeetCodeQuestion> {
        let response = self
            .client
            .post(format!("{}/leetcode", self.base_url))
            .json(&json!({ "slug": slug }))
            .send()
            .await
            .map_err(|e| {
                AppError::LeetCode(format!(
                    "Proxy unreachable at {} ({}). Is `leet-tracker proxy` running?",
                    self.base_url, e
                ))
            })?;

        if !response.status().is_success() {
            let body: Value = response.json().await.unwrap_or_default();
            let message = body
                .get("error")
                .and_then(Value::as_str)
                .unwrap_or("proxy request failed");
            return Err(AppError::LeetCode(message.to_string()));
        }

        let raw: RawQuestion = response.json().await?;
        question_from_raw(slug, raw)
    }
}

fn question_from_raw(slug: &str, raw: RawQuestion) -> Result<LeetCodeQuestion> {
    let title = raw
        .title
        .filter(|t| !t.is_empty())
        .ok_or_else(|| AppError::LeetCode(format!("No problem found for '{}'", slug)))?;

    let difficulty = raw
        .difficulty
        .as_deref()
        .and_then(|d| d.parse().ok())
        .unwrap_or(Difficulty::Medium);

    let description = raw
        .content
        .as_deref()
        .and_then(|html| html2text::from_read(html.as_bytes(), 100).ok())
        .map(|text| text.trim().to_string())
        .unwrap_or_default();

    Ok(LeetCodeQuestion {
        slug: slug.to_string(),
        title,
        difficulty,
        description,
        tags: raw.topic_tags.into_iter().map(|t| t.name).collect(),
    })
}

/// Accepts either a bare slug or a problem URL.
pub fn slug_from_input(input: &str) -> Option<String> {
    static SLUG: OnceLock<Regex> = OnceLock::new();
    let slug_re = SLUG.get_or_init(|| Regex::new(r"^[a-z0-9]+(?:-[a-z0-9]+)*$").expect("slug pattern is valid"));

    let input = input.trim();
    if input.is_empty() {
        return None;
    }

    let candidate = match url::Url::parse(input) {
        Ok(url) => {
            let mut segments = url.path_segments()?;
            segments.find(|s| *s == "problems")?;
            segments.next()?.to_string()
        }
        Err(_) => input.to_string(),
    };

    let candidate = candidate.to_lowercase();
    slug_re.is_match(&candidate).then_some(candidate)
}

pub fn problem_url(slug: &str) -> String {
    format!("https://leetcode.com/problems/{}/", slug)
}
