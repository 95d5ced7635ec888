use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use reqwest::{Client, Response};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::error::{AppError, Result};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub user_metadata: Value,
}

impl User {
    pub fn username(&self) -> &str {
        self.user_metadata
            .get("username")
            .and_then(Value::as_str)
            .or(self.email.as_deref())
            .unwrap_or("unknown")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub access_token: String,
    pub refresh_token: String,
    #[serde(default)]
    pub expires_at: Option<i64>,
    pub user: User,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SignUpOutcome {
    /// The backend auto-confirmed the account and opened a session.
    SignedIn(Session),
    /// A confirmation email was sent; sign in after confirming.
    ConfirmationRequired { email: String },
}

/// Password auth against the hosted GoTrue endpoints.
pub struct AuthClient {
    client: Client,
    base_url: String,
    anon_key: String,
}

impl AuthClient {
    pub fn new(base_url: &str, anon_key: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            anon_key: anon_key.to_string(),
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/auth/v1/{}", self.base_url, path)
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> Result<Session> {
        let response = self
            .client
            .post(self.endpoint("token"))
            .query(&[("grant_type", "password")])
            .header("apikey", &self.anon_key)
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await?;

        let session: Session = auth_json(response).await?;
        tracing::info!("Signed in as {}", session.user.username());
        Ok(session)
    }

    pub async fn sign_up(&self, username: &str, email: &str, password: &str) -> Result<SignUpOutcome> {
        let response = self
            .client
            .post(self.endpoint("signup"))
            .header("apikey", &self.anon_key)
            .json(&json!({
                "email": email,
                "password": password,
                "data": { "username": username },
            }))
            .send()
            .await?;

        let body: Value = auth_json(response).await?;
        if body.get("access_token").is_some() {
            let session: Session = serde_json::from_value(body)?;
            return Ok(SignUpOutcome::SignedIn(session));
        }

        Ok(SignUpOutcome::ConfirmationRequired {
            email: email.to_string(),
        })
    }

    /// Exchanges a stored refresh token for a fresh session.
    pub async fn refresh(&self, refresh_token: &str) -> Result<Session> {
        let response = self
            .client
            .post(self.endpoint("token"))
            .query(&[("grant_type", "refresh_token")])
            .header("apikey", &self.anon_key)
            .json(&json!({ "refresh_token": refresh_token }))
            .send()
            .await?;

        auth_json(response).await
    }

    pub async fn sign_out(&self, session: &Session) -> Result<()> {
        let response = self
            .client
            .post(self.endpoint("logout"))
            .header("apikey", &self.anon_key)
            .bearer_auth(&session.access_token)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(AppError::Auth(error_message(response).await));
        }
        Ok(())
    }
}

async fn auth_json<T: serde::de::DeserializeOwned>(response: Response) -> Result<T> {
    if !response.status().is_success() {
        return Err(AppError::Auth(error_message(response).await));
    }
    Ok(response.json().await?)
}

/// Pulls the human readable message out of a GoTrue or PostgREST error body.
pub(crate) async fn error_message(response: Response) -> String {
    let status = response.status();
    let text = response.text().await.unwrap_or_default();
    extract_message(&text).unwrap_or_else(|| format!("HTTP {status}: {text}"))
}

fn extract_message(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    ["error_description", "msg", "message", "error"]
        .iter()
        .find_map(|key| value.get(*key).and_then(Value::as_str))
        .map(str::to_string)
}

/// Keeps the session between runs so the UI can restore it.
pub struct SessionStore {
    path: PathBuf,
}

impl SessionStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> Result<Option<Session>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let content = std::fs::read_to_string(&self.path)?;
        match serde_json::from_str(&content) {
            Ok(session) => Ok(Some(session)),
            Err(e) => {
                tracing::warn!("Ignoring unreadable session file: {}", e);
                Ok(None)
            }
        }
    }

    pub fn save(&self, session: &Session) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(session)?;

        let mut options = std::fs::OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }
        let mut file = options.open(&self.path)?;
        // mode() only applies on creation
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            file.set_permissions(std::fs::Permissions::from_mode(0o600))?;
        }
        file.write_all(content.as_bytes())?;
        Ok(())
    }

    pub fn clear(&self) -> Result<()> {
        if self.path.exists() {
            std::fs::remove_file(&self.path)?;
        }
        Ok(())
    }
}

/// Refreshes the stored session, clearing it when the backend rejects it.
pub async fn restore_session(auth: &AuthClient, store: &SessionStore) -> Result<Session> {
    let Some(stored) = store.load()? else {
        return Err(AppError::NotSignedIn);
    };

    match auth.refresh(&stored.refresh_token).await {
        Ok(session) => {
            store.save(&session)?;
            Ok(session)
        }
        Err(AppError::Auth(msg)) => {
            tracing::warn!("Stored session rejected: {}", msg);
            store.clear()?;
            Err(AppError::Auth(format!("{msg}. Please sign in again")))
        }
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use axum::extract::Query;
    use axum::http::{HeaderMap, StatusCode};
    use axum::routing::post;
    use axum::{Json, Router};
    use std::collections::HashMap;

    use super::*;
    use crate::test_support::spawn_stub;

    fn session_json(user_id: &str, access: &str) -> Value {
        json!({
            "access_token": access,
            "token_type": "bearer",
            "expires_in": 3600,
            "expires_at": 1_900_000_000,
            "refresh_token": format!("refresh-{access}"),
            "user": { "id": user_id, "email": "ada@example.com", "user_metadata": { "username": "ada" } }
        })
    }

    async fn token(
        headers: HeaderMap,
        Query(q): Query<HashMap<String, String>>,
        Json(body): Json<Value>,
    ) -> (StatusCode, Json<Value>) {
        if headers.get("apikey").and_then(|v| v.to_str().ok()) != Some("anon") {
            return (StatusCode::UNAUTHORIZED, Json(json!({ "message": "No API key found" })));
        }
        match q.get("grant_type").map(String::as_str) {
            Some("password") if body["password"] == "secret" => {
                (StatusCode::OK, Json(session_json("u1", "a1")))
            }
            Some("refresh_token") if body["refresh_token"] == "refresh-a1" => {
                (StatusCode::OK, Json(session_json("u1", "a2")))
            }
            _ => (
                StatusCode::BAD_REQUEST,
                Json(json!({ "error": "invalid_grant", "error_description": "Invalid login credentials" })),
            ),
        }
    }

    async fn signup(Json(body): Json<Value>) -> Json<Value> {
        if body["email"] == "auto@example.com" {
            Json(session_json("u2", "a3"))
        } else {
            Json(json!({ "id": "u3", "email": body["email"], "confirmation_sent_at": "2024-01-01T00:00:00Z" }))
        }
    }

    async fn stub() -> AuthClient {
        let router = Router::new()
            .route("/auth/v1/token", post(token))
            .route("/auth/v1/signup", post(signup));
        let base = spawn_stub(router).await;
        AuthClient::new(&base, "anon").unwrap()
    }

    #[tokio::test]
    async fn password_sign_in_returns_session() {
        let auth = stub().await;
        let session = auth.sign_in("ada@example.com", "secret").await.unwrap();
        assert_eq!(session.user.id, "u1");
        assert_eq!(session.user.username(), "ada");
        assert_eq!(session.expires_at, Some(1_900_000_000));
    }

    #[tokio::test]
    async fn bad_password_surfaces_backend_message() {
        let auth = stub().await;
        let err = auth.sign_in("ada@example.com", "wrong").await.unwrap_err();
        match err {
            AppError::Auth(msg) => assert_eq!(msg, "Invalid login credentials"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn sign_up_reports_pending_confirmation() {
        let auth = stub().await;
        let outcome = auth.sign_up("bob", "bob@example.com", "pw").await.unwrap();
        assert_eq!(
            outcome,
            SignUpOutcome::ConfirmationRequired {
                email: "bob@example.com".to_string()
            }
        );

        let outcome = auth.sign_up("auto", "auto@example.com", "pw").await.unwrap();
        assert!(matches!(outcome, SignUpOutcome::SignedIn(s) if s.user.id == "u2"));
    }

    #[tokio::test]
    async fn restore_refreshes_and_persists_session() {
        let auth = stub().await;
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::new(dir.path().join("session.json"));

        assert!(matches!(
            restore_session(&auth, &store).await,
            Err(AppError::NotSignedIn)
        ));

        let session = auth.sign_in("ada@example.com", "secret").await.unwrap();
        store.save(&session).unwrap();

        let restored = restore_session(&auth, &store).await.unwrap();
        assert_eq!(restored.access_token, "a2");
        assert_eq!(store.load().unwrap().unwrap().access_token, "a2");
    }

    #[tokio::test]
    async fn rejected_session_is_cleared() {
        let auth = stub().await;
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::new(dir.path().join("session.json"));
        let mut session: Session = serde_json::from_value(session_json("u1", "stale")).unwrap();
        session.refresh_token = "revoked".to_string();
        store.save(&session).unwrap();

        let err = restore_session(&auth, &store).await.unwrap_err();
        assert!(matches!(err, AppError::Auth(_)));
        assert!(!store.path().exists());
    }

    #[cfg(unix)]
    #[test]
    fn session_file_is_private_to_the_owner() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("session.json");
        let store = SessionStore::new(path.clone());
        let session: Session = serde_json::from_value(session_json("u1", "a1")).unwrap();

        store.save(&session).unwrap();
        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);

        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o644)).unwrap();
        store.save(&session).unwrap();
        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
        assert_eq!(store.load().unwrap().unwrap().access_token, "a1");
    }

    #[test]
    fn message_extraction_prefers_description() {
        let body = r#"{"error":"invalid_grant","error_description":"Email not confirmed"}"#;
        assert_eq!(extract_message(body).as_deref(), Some("Email not confirmed"));
        assert_eq!(extract_message("<html>").as_deref(), None);
    }
}
