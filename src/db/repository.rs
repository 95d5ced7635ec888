use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, OptionalExtension, Row};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio_rusqlite::Connection;

use crate::error::Result;
use crate::models::{NewNote, Note};

use super::schema::SCHEMA;

pub const RECOMMENDATIONS_KEY: &str = "recommendations";
pub const PRACTICE_PLANS_KEY: &str = "practice_plans";
pub const INSIGHTS_KEY: &str = "insights";
pub const CODE_ANALYSES_KEY: &str = "code_analyses";

/// Local storage for the records that never reach the hosted backend.
pub struct Repository {
    conn: Connection,
}

impl Repository {
    pub async fn new(db_path: &str) -> Result<Self> {
        let conn = Connection::open(db_path).await?;
        Self::init(conn).await
    }

    #[cfg(test)]
    pub async fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().await?;
        Self::init(conn).await
    }

    async fn init(conn: Connection) -> Result<Self> {
        conn.call(|conn| {
            conn.execute_batch(SCHEMA)?;
            Ok(())
        })
        .await?;

        Ok(Self { conn })
    }

    // Note operations

    pub async fn insert_note(&self, note: NewNote) -> Result<Note> {
        let tags_json = serde_json::to_string(&note.tags)?;
        let now = Utc::now();
        let id = self
            .conn
            .call(move |conn| {
                conn.execute(
                    "INSERT INTO notes (problem_id, content, tags, created_at, updated_at) VALUES (?1, ?2, ?3, ?4, ?4)",
                    params![note.problem_id, note.content, tags_json, timestamp(now)],
                )?;
                Ok(conn.last_insert_rowid())
            })
            .await?;

        self.get_note(id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("Note {id} vanished after insert").into())
    }

    pub async fn get_note(&self, id: i64) -> Result<Option<Note>> {
        let note = self
            .conn
            .call(move |conn| {
                let mut stmt = conn.prepare(
                    "SELECT id, problem_id, content, tags, created_at, updated_at FROM notes WHERE id = ?1",
                )?;
                let note = stmt.query_row(params![id], note_from_row).optional()?;
                Ok(note)
            })
            .await?;
        Ok(note)
    }

    pub async fn get_all_notes(&self) -> Result<Vec<Note>> {
        let notes = self
            .conn
            .call(|conn| {
                let mut stmt = conn.prepare(
                    "SELECT id, problem_id, content, tags, created_at, updated_at FROM notes ORDER BY updated_at DESC, id DESC",
                )?;
                let notes = stmt
                    .query_map([], note_from_row)?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                Ok(notes)
            })
            .await?;
        Ok(notes)
    }

    pub async fn update_note(&self, id: i64, content: String, tags: Vec<String>) -> Result<()> {
        let tags_json = serde_json::to_string(&tags)?;
        let now = timestamp(Utc::now());
        self.conn
            .call(move |conn| {
                conn.execute(
                    "UPDATE notes SET content = ?1, tags = ?2, updated_at = ?3 WHERE id = ?4",
                    params![content, tags_json, now, id],
                )?;
                Ok(())
            })
            .await?;
        Ok(())
    }

    pub async fn delete_note(&self, id: i64) -> Result<()> {
        self.conn
            .call(move |conn| {
                conn.execute("DELETE FROM notes WHERE id = ?1", params![id])?;
                Ok(())
            })
            .await?;
        Ok(())
    }

    // Assistant cache

    pub async fn save_cached<T: Serialize>(&self, key: &'static str, value: &T) -> Result<()> {
        let json = serde_json::to_string(value)?;
        self.conn
            .call(move |conn| {
                conn.execute(
                    r#"INSERT INTO assistant_cache (key, value) VALUES (?1, ?2)
                       ON CONFLICT(key) DO UPDATE SET
                           value = excluded.value,
                           updated_at = datetime('now')"#,
                    params![key, json],
                )?;
                Ok(())
            })
            .await?;
        Ok(())
    }

    /// A corrupt cache entry is logged and treated as missing.
    pub async fn load_cached<T: DeserializeOwned>(&self, key: &'static str) -> Result<Option<T>> {
        let raw: Option<String> = self
            .conn
            .call(move |conn| {
                let value = conn
                    .query_row(
                        "SELECT value FROM assistant_cache WHERE key = ?1",
                        params![key],
                        |row| row.get(0),
                    )
                    .optional()?;
                Ok(value)
            })
            .await?;

        Ok(raw.and_then(|json| match serde_json::from_str(&json) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!("Discarding cached {}: {}", key, e);
                None
            }
        }))
    }
}

/// Fixed-width so that text ordering matches time ordering.
fn timestamp(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_datetime(s: &str) -> Option<DateTime<Utc>> {
    // Try RFC3339 first (e.g., "2026-01-11T12:34:56+00:00")
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    // Try SQLite datetime format (e.g., "2026-01-11 12:34:56")
    if let Ok(naive) = chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return Some(naive.and_utc());
    }
    None
}

fn note_from_row(row: &Row) -> rusqlite::Result<Note> {
    let tags: String = row.get(3)?;
    Ok(Note {
        id: row.get(0)?,
        problem_id: row.get(1)?,
        content: row.get(2)?,
        tags: serde_json::from_str(&tags).unwrap_or_default(),
        created_at: row
            .get::<_, String>(4)
            .ok()
            .and_then(|s| parse_datetime(&s))
            .unwrap_or_else(Utc::now),
        updated_at: row
            .get::<_, String>(5)
            .ok()
            .and_then(|s| parse_datetime(&s))
            .unwrap_or_else(Utc::now),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AiInsights, OverallProgress};

    fn new_note(content: &str, tags: &[&str]) -> NewNote {
        NewNote {
            problem_id: None,
            content: content.to_string(),
            tags: tags.iter().map(|t| t.to_string()).collect(),
        }
    }

    #[tokio::test]
    async fn note_lifecycle() {
        let repo = Repository::in_memory().await.unwrap();

        let note = repo
            .insert_note(new_note("Monotonic stack", &["stack"]))
            .await
            .unwrap();
        assert_eq!(note.tags, vec!["stack"]);

        repo.update_note(note.id, "Monotonic deque".to_string(), vec![])
            .await
            .unwrap();
        let updated = repo.get_note(note.id).await.unwrap().unwrap();
        assert_eq!(updated.content, "Monotonic deque");
        assert!(updated.tags.is_empty());
        assert!(updated.updated_at >= note.updated_at);

        repo.delete_note(note.id).await.unwrap();
        assert!(repo.get_all_notes().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn notes_are_listed_newest_first() {
        let repo = Repository::in_memory().await.unwrap();
        let first = repo.insert_note(new_note("first", &[])).await.unwrap();
        let second = repo.insert_note(new_note("second", &[])).await.unwrap();

        let ids: Vec<i64> = repo
            .get_all_notes()
            .await
            .unwrap()
            .iter()
            .map(|n| n.id)
            .collect();
        assert_eq!(ids, vec![second.id, first.id]);
    }

    #[tokio::test]
    async fn cache_round_trips_and_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tracker.db");
        let repo = Repository::new(path.to_str().unwrap()).await.unwrap();

        assert!(repo
            .load_cached::<AiInsights>(INSIGHTS_KEY)
            .await
            .unwrap()
            .is_none());

        let mut insights = AiInsights {
            overall_progress: OverallProgress {
                completion_rate: 40.0,
                ..Default::default()
            },
            ..Default::default()
        };
        repo.save_cached(INSIGHTS_KEY, &insights).await.unwrap();
        insights.overall_progress.completion_rate = 55.5;
        repo.save_cached(INSIGHTS_KEY, &insights).await.unwrap();

        let loaded: AiInsights = repo.load_cached(INSIGHTS_KEY).await.unwrap().unwrap();
        assert_eq!(loaded.overall_progress.completion_rate, 55.5);
    }

    #[tokio::test]
    async fn corrupt_cache_entry_reads_as_missing() {
        let repo = Repository::in_memory().await.unwrap();
        repo.save_cached(INSIGHTS_KEY, &"not an object").await.unwrap();
        let loaded = repo.load_cached::<AiInsights>(INSIGHTS_KEY).await.unwrap();
        assert!(loaded.is_none());
    }
}
