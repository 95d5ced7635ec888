use std::time::Duration;

use chrono::{DateTime, Utc};
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::error::{AppError, Result};
use crate::models::{AiAnalysis, NewProblem, Problem};

use super::auth::{error_message, Session};

/// Authenticated PostgREST access scoped to the signed-in user.
#[derive(Clone)]
pub struct Backend {
    client: Client,
    base_url: String,
    anon_key: String,
    access_token: String,
    user_id: String,
}

impl Backend {
    pub fn new(base_url: &str, anon_key: &str, session: &Session) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            anon_key: anon_key.to_string(),
            access_token: session.access_token.clone(),
            user_id: session.user.id.clone(),
        })
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    fn table(&self, method: reqwest::Method, table: &str) -> RequestBuilder {
        self.client
            .request(method, format!("{}/rest/v1/{}", self.base_url, table))
            .header("apikey", &self.anon_key)
            .bearer_auth(&self.access_token)
    }

    fn owned(&self) -> (&'static str, String) {
        ("user_id", format!("eq.{}", self.user_id))
    }
}

async fn rows<T: DeserializeOwned>(response: Response) -> Result<Vec<T>> {
    if !response.status().is_success() {
        return Err(AppError::Backend(error_message(response).await));
    }
    Ok(response.json().await?)
}

async fn expect_success(response: Response) -> Result<()> {
    if !response.status().is_success() {
        return Err(AppError::Backend(error_message(response).await));
    }
    Ok(())
}

/// PostgREST's `or` filter uses these as syntax.
fn sanitize_pattern(query: &str) -> String {
    query
        .chars()
        .filter(|c| !matches!(c, ',' | '(' | ')' | '*' | '"' | '\\'))
        .collect::<String>()
        .trim()
        .to_string()
}

#[derive(Serialize)]
struct InsertProblem<'a> {
    #[serde(flatten)]
    fields: &'a NewProblem,
    user_id: &'a str,
}

#[derive(Serialize)]
struct ReplaceProblem {
    #[serde(flatten)]
    fields: NewProblem,
    updated_at: DateTime<Utc>,
}

#[derive(Deserialize)]
struct StarRow {
    #[serde(default)]
    is_starred: Option<bool>,
}

/// CRUD over the `problems` table.
pub struct ProblemService {
    backend: Backend,
}

impl ProblemService {
    pub fn new(backend: Backend) -> Self {
        Self { backend }
    }

    pub async fn list(&self) -> Result<Vec<Problem>> {
        let response = self
            .backend
            .table(reqwest::Method::GET, "problems")
            .query(&[("select", "*".to_string()), self.backend.owned()])
            .query(&[("order", "created_at.desc")])
            .send()
            .await?;
        rows(response).await
    }

    pub async fn get(&self, id: &str) -> Result<Option<Problem>> {
        let response = self
            .backend
            .table(reqwest::Method::GET, "problems")
            .query(&[
                ("select", "*".to_string()),
                ("id", format!("eq.{id}")),
                self.backend.owned(),
            ])
            .send()
            .await?;
        Ok(rows(response).await?.into_iter().next())
    }

    pub async fn create(&self, problem: &NewProblem) -> Result<Problem> {
        let body = InsertProblem {
            fields: problem,
            user_id: &self.backend.user_id,
        };
        let response = self
            .backend
            .table(reqwest::Method::POST, "problems")
            .header("Prefer", "return=representation")
            .json(&body)
            .send()
            .await?;

        rows(response)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| AppError::Backend("Insert returned no row".to_string()))
    }

    /// Full-record replace. Concurrent edits are not reconciled: last write wins.
    pub async fn update(&self, problem: &Problem) -> Result<Problem> {
        let body = ReplaceProblem {
            fields: problem.to_new(),
            updated_at: Utc::now(),
        };
        let response = self
            .backend
            .table(reqwest::Method::PATCH, "problems")
            .query(&[("id", format!("eq.{}", problem.id)), self.backend.owned()])
            .header("Prefer", "return=representation")
            .json(&body)
            .send()
            .await?;

        rows(response)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| AppError::Backend(format!("Problem {} not found", problem.id)))
    }

    pub async fn delete(&self, id: &str) -> Result<()> {
        let response = self
            .backend
            .table(reqwest::Method::DELETE, "problems")
            .query(&[("id", format!("eq.{id}")), self.backend.owned()])
            .send()
            .await?;
        expect_success(response).await
    }

    /// Reads the current flag and writes its negation.
    pub async fn toggle_star(&self, id: &str) -> Result<bool> {
        let response = self
            .backend
            .table(reqwest::Method::GET, "problems")
            .query(&[
                ("select", "is_starred".to_string()),
                ("id", format!("eq.{id}")),
                self.backend.owned(),
            ])
            .send()
            .await?;
        let current = rows::<StarRow>(response)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| AppError::Backend(format!("Problem {id} not found")))?;
        let starred = !current.is_starred.unwrap_or(false);

        let response = self
            .backend
            .table(reqwest::Method::PATCH, "problems")
            .query(&[("id", format!("eq.{id}")), self.backend.owned()])
            .json(&json!({ "is_starred": starred }))
            .send()
            .await?;
        expect_success(response).await?;

        Ok(starred)
    }

    /// Server-side case-insensitive match over title and category.
    pub async fn search(&self, query: &str) -> Result<Vec<Problem>> {
        let pattern = sanitize_pattern(query);
        if pattern.is_empty() {
            return self.list().await;
        }
        let response = self
            .backend
            .table(reqwest::Method::GET, "problems")
            .query(&[
                ("select", "*".to_string()),
                self.backend.owned(),
                (
                    "or",
                    format!("(title.ilike.*{pattern}*,category.ilike.*{pattern}*)"),
                ),
                ("order", "created_at.desc".to_string()),
            ])
            .send()
            .await?;
        rows(response).await
    }
}

/// Stored AI commentary, linked to problems by id.
pub struct AnalysisService {
    backend: Backend,
}

impl AnalysisService {
    pub fn new(backend: Backend) -> Self {
        Self { backend }
    }

    pub async fn save(&self, problem_id: &str, analysis: &str) -> Result<()> {
        let response = self
            .backend
            .table(reqwest::Method::POST, "ai_analyses")
            .json(&json!({
                "problem_id": problem_id,
                "analysis": analysis,
                "user_id": self.backend.user_id,
            }))
            .send()
            .await?;
        expect_success(response).await
    }

    pub async fn list(&self, problem_id: &str) -> Result<Vec<AiAnalysis>> {
        let response = self
            .backend
            .table(reqwest::Method::GET, "ai_analyses")
            .query(&[
                ("select", "*".to_string()),
                ("problem_id", format!("eq.{problem_id}")),
                self.backend.owned(),
                ("order", "created_at.desc".to_string()),
            ])
            .send()
            .await?;
        rows(response).await
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    use axum::extract::{Query, State};
    use axum::http::{HeaderMap, StatusCode};
    use axum::routing::get;
    use axum::{Json, Router};
    use serde_json::Value;

    use super::*;
    use crate::services::auth::User;
    use crate::test_support::spawn_stub;

    type Rows = Arc<Mutex<Vec<Value>>>;

    fn row(id: &str, user: &str, title: &str, category: &str) -> Value {
        json!({
            "id": id, "user_id": user, "title": title, "difficulty": "Medium",
            "category": category, "status": "Not Started", "tags": ["dp"],
            "is_starred": false, "attempts": 0,
            "created_at": "2024-01-01T00:00:00Z", "updated_at": "2024-01-01T00:00:00Z"
        })
    }

    fn eq(q: &HashMap<String, String>, key: &str) -> Option<String> {
        q.get(key).and_then(|v| v.strip_prefix("eq.")).map(str::to_string)
    }

    fn authorized(headers: &HeaderMap) -> bool {
        headers.get("authorization").and_then(|v| v.to_str().ok()) == Some("Bearer token")
            && headers.get("apikey").is_some()
    }

    fn matching<'a>(rows: &'a [Value], q: &HashMap<String, String>) -> Vec<&'a Value> {
        rows.iter()
            .filter(|r| eq(q, "user_id").is_none_or(|u| r["user_id"] == u.as_str()))
            .filter(|r| eq(q, "id").is_none_or(|id| r["id"] == id.as_str()))
            .collect()
    }

    async fn list(
        State(rows): State<Rows>,
        headers: HeaderMap,
        Query(q): Query<HashMap<String, String>>,
    ) -> (StatusCode, Json<Value>) {
        if !authorized(&headers) {
            return (StatusCode::UNAUTHORIZED, Json(json!({ "message": "JWT expired" })));
        }
        let rows = rows.lock().unwrap();
        let mut found: Vec<Value> = matching(&rows, &q).into_iter().cloned().collect();
        if let Some(or) = q.get("or") {
            let needle = or
                .split("ilike.*")
                .nth(1)
                .and_then(|s| s.split('*').next())
                .unwrap_or_default()
                .to_lowercase();
            found.retain(|r| {
                r["title"].as_str().unwrap_or_default().to_lowercase().contains(&needle)
                    || r["category"].as_str().unwrap_or_default().to_lowercase().contains(&needle)
            });
        }
        if q.get("select").map(String::as_str) == Some("is_starred") {
            found = found
                .into_iter()
                .map(|r| json!({ "is_starred": r["is_starred"] }))
                .collect();
        }
        (StatusCode::OK, Json(Value::Array(found)))
    }

    async fn insert(State(rows): State<Rows>, Json(mut body): Json<Value>) -> (StatusCode, Json<Value>) {
        let mut rows = rows.lock().unwrap();
        body["id"] = json!(format!("p{}", rows.len() + 1));
        body["created_at"] = json!("2024-02-01T00:00:00Z");
        body["updated_at"] = json!("2024-02-01T00:00:00Z");
        rows.push(body.clone());
        (StatusCode::CREATED, Json(json!([body])))
    }

    async fn patch(
        State(rows): State<Rows>,
        Query(q): Query<HashMap<String, String>>,
        Json(body): Json<Value>,
    ) -> Json<Value> {
        let mut rows = rows.lock().unwrap();
        let mut changed = Vec::new();
        for r in rows.iter_mut() {
            if eq(&q, "id").is_some_and(|id| r["id"] == id.as_str())
                && eq(&q, "user_id").is_some_and(|u| r["user_id"] == u.as_str())
            {
                for (k, v) in body.as_object().unwrap() {
                    r[k] = v.clone();
                }
                changed.push(r.clone());
            }
        }
        Json(Value::Array(changed))
    }

    async fn remove(State(rows): State<Rows>, Query(q): Query<HashMap<String, String>>) -> StatusCode {
        let mut rows = rows.lock().unwrap();
        rows.retain(|r| eq(&q, "id").is_none_or(|id| r["id"] != id.as_str()));
        StatusCode::NO_CONTENT
    }

    fn backend(base: &str) -> Backend {
        let session = Session {
            access_token: "token".to_string(),
            refresh_token: "r".to_string(),
            expires_at: None,
            user: User {
                id: "u1".to_string(),
                email: None,
                user_metadata: Value::Null,
            },
        };
        Backend::new(base, "anon", &session).unwrap()
    }

    async fn service(seed: Vec<Value>) -> (ProblemService, Rows) {
        let rows: Rows = Arc::new(Mutex::new(seed));
        let router = Router::new()
            .route("/rest/v1/problems", get(list).post(insert).patch(patch).delete(remove))
            .with_state(rows.clone());
        let base = spawn_stub(router).await;
        (ProblemService::new(backend(&base)), rows)
    }

    #[derive(Clone, Default)]
    struct Analyses {
        rows: Rows,
        queries: Arc<Mutex<Vec<HashMap<String, String>>>>,
    }

    fn analysis_row(id: &str, user: &str, problem: &str, created_at: &str) -> Value {
        json!({
            "id": id, "user_id": user, "problem_id": problem,
            "analysis": format!("analysis {id}"), "created_at": created_at
        })
    }

    async fn list_analyses(
        State(state): State<Analyses>,
        headers: HeaderMap,
        Query(q): Query<HashMap<String, String>>,
    ) -> (StatusCode, Json<Value>) {
        if !authorized(&headers) {
            return (StatusCode::UNAUTHORIZED, Json(json!({ "message": "JWT expired" })));
        }
        state.queries.lock().unwrap().push(q.clone());
        let rows = state.rows.lock().unwrap();
        let mut found: Vec<Value> = matching(&rows, &q)
            .into_iter()
            .filter(|r| eq(&q, "problem_id").is_none_or(|p| r["problem_id"] == p.as_str()))
            .cloned()
            .collect();
        if q.get("order").map(String::as_str) == Some("created_at.desc") {
            found.sort_by(|a, b| b["created_at"].as_str().cmp(&a["created_at"].as_str()));
        }
        (StatusCode::OK, Json(Value::Array(found)))
    }

    async fn insert_analysis(
        State(state): State<Analyses>,
        headers: HeaderMap,
        Json(mut body): Json<Value>,
    ) -> StatusCode {
        if !authorized(&headers) {
            return StatusCode::UNAUTHORIZED;
        }
        let mut rows = state.rows.lock().unwrap();
        body["id"] = json!(format!("a{}", rows.len() + 1));
        body["created_at"] = json!("2024-03-01T00:00:00Z");
        rows.push(body);
        StatusCode::CREATED
    }

    async fn analyses(seed: Vec<Value>) -> (AnalysisService, Analyses) {
        let state = Analyses {
            rows: Arc::new(Mutex::new(seed)),
            ..Default::default()
        };
        let router = Router::new()
            .route("/rest/v1/ai_analyses", get(list_analyses).post(insert_analysis))
            .with_state(state.clone());
        let base = spawn_stub(router).await;
        (AnalysisService::new(backend(&base)), state)
    }

    #[tokio::test]
    async fn list_is_scoped_to_the_signed_in_user() {
        let (service, _) = service(vec![
            row("a", "u1", "Coin Change", "DP"),
            row("b", "u2", "Someone else", "DP"),
        ])
        .await;

        let problems = service.list().await.unwrap();
        assert_eq!(problems.len(), 1);
        assert_eq!(problems[0].id, "a");
        assert_eq!(problems[0].tags, vec!["dp"]);
    }

    #[tokio::test]
    async fn create_sends_user_id_and_returns_row() {
        let (service, rows) = service(vec![]).await;
        let form = NewProblem {
            title: "Two Sum".to_string(),
            category: "Arrays".to_string(),
            ..Default::default()
        };

        let created = service.create(&form).await.unwrap();

        assert_eq!(created.title, "Two Sum");
        assert_eq!(rows.lock().unwrap()[0]["user_id"], "u1");
        assert_eq!(rows.lock().unwrap()[0]["status"], "Not Started");
    }

    #[tokio::test]
    async fn toggle_star_flips_backend_flag() {
        let (service, rows) = service(vec![row("a", "u1", "Coin Change", "DP")]).await;

        assert!(service.toggle_star("a").await.unwrap());
        assert_eq!(rows.lock().unwrap()[0]["is_starred"], true);
        assert!(!service.toggle_star("a").await.unwrap());
    }

    #[tokio::test]
    async fn update_of_missing_row_is_an_error() {
        let (service, _) = service(vec![row("a", "u2", "Not mine", "DP")]).await;
        let mut problem: Problem = serde_json::from_value(row("a", "u2", "Not mine", "DP")).unwrap();
        problem.title = "Hijacked".to_string();

        let err = service.update(&problem).await.unwrap_err();
        assert!(matches!(err, AppError::Backend(_)));
    }

    #[tokio::test]
    async fn update_then_delete() {
        let (service, rows) = service(vec![row("a", "u1", "Coin Change", "DP")]).await;
        let mut problem = service.get("a").await.unwrap().unwrap();
        problem.notes = "use bottom-up table".to_string();

        let saved = service.update(&problem).await.unwrap();
        assert_eq!(saved.notes, "use bottom-up table");

        service.delete("a").await.unwrap();
        assert!(rows.lock().unwrap().is_empty());
        assert!(service.get("a").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn search_matches_title_or_category() {
        let (service, _) = service(vec![
            row("a", "u1", "Coin Change", "DP"),
            row("b", "u1", "Clone Graph", "Graphs"),
        ])
        .await;

        let found = service.search("graph").await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, "b");
        assert_eq!(service.search(" (,) ").await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn analysis_save_posts_owned_row() {
        let (service, state) = analyses(vec![]).await;

        service.save("p1", "Use a hash map").await.unwrap();

        let rows = state.rows.lock().unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["user_id"], "u1");
        assert_eq!(rows[0]["problem_id"], "p1");
        assert_eq!(rows[0]["analysis"], "Use a hash map");
    }

    #[tokio::test]
    async fn analysis_list_is_scoped_and_newest_first() {
        let (service, state) = analyses(vec![
            analysis_row("old", "u1", "p1", "2024-01-01T00:00:00Z"),
            analysis_row("theirs", "u2", "p1", "2024-06-01T00:00:00Z"),
            analysis_row("other", "u1", "p2", "2024-06-01T00:00:00Z"),
            analysis_row("new", "u1", "p1", "2024-05-01T00:00:00Z"),
        ])
        .await;

        let found = service.list("p1").await.unwrap();
        let ids: Vec<&str> = found.iter().map(|a| a.id.as_str()).collect();
        assert_eq!(ids, vec!["new", "old"]);
        assert_eq!(found[0].analysis, "analysis new");

        let queries = state.queries.lock().unwrap();
        assert_eq!(eq(&queries[0], "user_id").as_deref(), Some("u1"));
        assert_eq!(eq(&queries[0], "problem_id").as_deref(), Some("p1"));
        assert_eq!(queries[0]["order"], "created_at.desc");
    }

    #[tokio::test]
    async fn analysis_save_then_list_round_trips() {
        let (service, _) = analyses(vec![]).await;

        service.save("p7", "Two pointers").await.unwrap();

        let found = service.list("p7").await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].problem_id, "p7");
        assert_eq!(found[0].analysis, "Two pointers");
    }

    #[test]
    fn search_pattern_strips_filter_syntax() {
        assert_eq!(sanitize_pattern("a,(b)*c"), "abc");
    }
}
