//! SQLite session store.
//!
//! Uses a single SQLite database file with two tables:
//! - `sessions`: one row per session, holding the JSON state map
//! - `events`: every message, in append order, as JSON
//!
//! A turn's messages and state delta are written in one transaction.

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use fitcoach_core::error::SessionError;
use fitcoach_core::message::Message;
use fitcoach_core::session::{Session, SessionKey, SessionStore, SessionSummary};
use serde_json::{Map, Value};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Row, SqlitePool};
use std::str::FromStr;
use tracing::{debug, info};

/// Fixed-width RFC 3339 so stored timestamps sort as text.
fn stamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// A persistent session store backed by an embedded SQLite file.
pub struct SqliteSessionStore {
    pool: SqlitePool,
}

impl SqliteSessionStore {
    /// Open (or create) the database at `url`, e.g. `sqlite://agent_data.db`.
    ///
    /// Pass `"sqlite::memory:"` for an in-process ephemeral database.
    pub async fn new(url: &str) -> Result<Self, SessionError> {
        let options = SqliteConnectOptions::from_str(url)
            .map_err(|e| SessionError::Storage(format!("Invalid SQLite URL: {e}")))?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .pragma("foreign_keys", "ON");

        // Every connection to `:memory:` would see its own empty database.
        let max_connections = if url.contains(":memory:") { 1 } else { 4 };

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await
            .map_err(|e| SessionError::Storage(format!("Failed to open SQLite: {e}")))?;

        let store = Self { pool };
        store.run_migrations().await?;
        info!("SQLite session store initialized at {url}");
        Ok(store)
    }

    /// Create from an existing pool.
    pub async fn from_pool(pool: SqlitePool) -> Result<Self, SessionError> {
        let store = Self { pool };
        store.run_migrations().await?;
        Ok(store)
    }

    async fn run_migrations(&self) -> Result<(), SessionError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS sessions (
                app_name    TEXT NOT NULL,
                user_id     TEXT NOT NULL,
                id          TEXT NOT NULL,
                state       TEXT NOT NULL DEFAULT '{}',
                created_at  TEXT NOT NULL,
                updated_at  TEXT NOT NULL,
                PRIMARY KEY (app_name, user_id, id)
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| SessionError::MigrationFailed(format!("sessions table: {e}")))?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS events (
                seq         INTEGER PRIMARY KEY AUTOINCREMENT,
                id          TEXT NOT NULL,
                app_name    TEXT NOT NULL,
                user_id     TEXT NOT NULL,
                session_id  TEXT NOT NULL,
                author      TEXT NOT NULL,
                message     TEXT NOT NULL,
                timestamp   TEXT NOT NULL,
                FOREIGN KEY (app_name, user_id, session_id)
                    REFERENCES sessions (app_name, user_id, id) ON DELETE CASCADE
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| SessionError::MigrationFailed(format!("events table: {e}")))?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_events_session ON events(app_name, user_id, session_id, seq)",
        )
        .execute(&self.pool)
        .await
        .map_err(|e| SessionError::MigrationFailed(format!("events index: {e}")))?;

        debug!("SQLite session migrations complete");
        Ok(())
    }

    fn parse_time(row: &sqlx::sqlite::SqliteRow, column: &str) -> Result<DateTime<Utc>, SessionError> {
        let raw: String = row
            .try_get(column)
            .map_err(|e| SessionError::QueryFailed(format!("{column} column: {e}")))?;
        DateTime::parse_from_rfc3339(&raw)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| SessionError::QueryFailed(format!("{column} {raw:?}: {e}")))
    }

    fn row_to_key(row: &sqlx::sqlite::SqliteRow) -> Result<SessionKey, SessionError> {
        let get = |column: &str| -> Result<String, SessionError> {
            row.try_get(column)
                .map_err(|e| SessionError::QueryFailed(format!("{column} column: {e}")))
        };
        Ok(SessionKey::new(get("app_name")?, get("user_id")?, get("id")?))
    }

    fn row_to_session(row: &sqlx::sqlite::SqliteRow) -> Result<Session, SessionError> {
        let key = Self::row_to_key(row)?;
        let state_json: String = row
            .try_get("state")
            .map_err(|e| SessionError::QueryFailed(format!("state column: {e}")))?;
        let state: Map<String, Value> = serde_json::from_str(&state_json)
            .map_err(|e| SessionError::QueryFailed(format!("state is not a JSON object: {e}")))?;

        Ok(Session {
            key,
            state,
            events: Vec::new(),
            created_at: Self::parse_time(row, "created_at")?,
            updated_at: Self::parse_time(row, "updated_at")?,
        })
    }

    async fn load_events(&self, key: &SessionKey) -> Result<Vec<Message>, SessionError> {
        let rows = sqlx::query(
            "SELECT message FROM events WHERE app_name = ?1 AND user_id = ?2 AND session_id = ?3 ORDER BY seq",
        )
        .bind(&key.app_name)
        .bind(&key.user_id)
        .bind(&key.session_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| SessionError::QueryFailed(format!("Load events: {e}")))?;

        rows.iter()
            .map(|row| {
                let json: String = row
                    .try_get("message")
                    .map_err(|e| SessionError::QueryFailed(format!("message column: {e}")))?;
                serde_json::from_str(&json)
                    .map_err(|e| SessionError::QueryFailed(format!("Corrupt event: {e}")))
            })
            .collect()
    }
}

#[async_trait]
impl SessionStore for SqliteSessionStore {
    fn name(&self) -> &str {
        "sqlite"
    }

    async fn create(&self, key: &SessionKey) -> Result<Session, SessionError> {
        let session = Session::new(key.clone());
        let now = stamp(session.created_at);

        sqlx::query(
            "INSERT INTO sessions (app_name, user_id, id, state, created_at, updated_at) VALUES (?1, ?2, ?3, '{}', ?4, ?4)",
        )
        .bind(&key.app_name)
        .bind(&key.user_id)
        .bind(&key.session_id)
        .bind(&now)
        .execute(&self.pool)
        .await
        .map_err(|e| match e.as_database_error() {
            Some(db) if db.is_unique_violation() => SessionError::AlreadyExists(key.to_string()),
            _ => SessionError::Storage(format!("INSERT session failed: {e}")),
        })?;

        debug!(session = %key, "Created session");
        Ok(session)
    }

    async fn get(&self, key: &SessionKey) -> Result<Option<Session>, SessionError> {
        let row = sqlx::query("SELECT * FROM sessions WHERE app_name = ?1 AND user_id = ?2 AND id = ?3")
            .bind(&key.app_name)
            .bind(&key.user_id)
            .bind(&key.session_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| SessionError::QueryFailed(format!("GET session: {e}")))?;

        let Some(row) = row else {
            return Ok(None);
        };

        let mut session = Self::row_to_session(&row)?;
        session.events = self.load_events(key).await?;
        Ok(Some(session))
    }

    async fn list(&self, app_name: &str, user_id: &str) -> Result<Vec<SessionSummary>, SessionError> {
        let rows = sqlx::query(
            r#"
            SELECT s.app_name, s.user_id, s.id, s.created_at, s.updated_at,
                   (SELECT COUNT(*) FROM events e
                     WHERE e.app_name = s.app_name AND e.user_id = s.user_id AND e.session_id = s.id) AS event_count
            FROM sessions s
            WHERE s.app_name = ?1 AND s.user_id = ?2
            ORDER BY s.updated_at DESC
            "#,
        )
        .bind(app_name)
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| SessionError::QueryFailed(format!("LIST sessions: {e}")))?;

        rows.iter()
            .map(|row| {
                let event_count: i64 = row
                    .try_get("event_count")
                    .map_err(|e| SessionError::QueryFailed(format!("event_count column: {e}")))?;
                Ok(SessionSummary {
                    key: Self::row_to_key(row)?,
                    event_count: event_count as usize,
                    created_at: Self::parse_time(row, "created_at")?,
                    updated_at: Self::parse_time(row, "updated_at")?,
                })
            })
            .collect()
    }

    async fn append(
        &self,
        session: &mut Session,
        events: Vec<Message>,
        delta: Map<String, Value>,
    ) -> Result<(), SessionError> {
        let key = session.key.clone();
        let mut state = session.state.clone();
        state.extend(delta.clone());
        let state_json = serde_json::to_string(&state)
            .map_err(|e| SessionError::Storage(format!("State serialization: {e}")))?;
        let now = stamp(Utc::now());

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| SessionError::Storage(format!("BEGIN failed: {e}")))?;

        for event in &events {
            let json = serde_json::to_string(event)
                .map_err(|e| SessionError::Storage(format!("Event serialization: {e}")))?;
            sqlx::query(
                r#"
                INSERT INTO events (id, app_name, user_id, session_id, author, message, timestamp)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                "#,
            )
            .bind(&event.id)
            .bind(&key.app_name)
            .bind(&key.user_id)
            .bind(&key.session_id)
            .bind(event.author())
            .bind(&json)
            .bind(stamp(event.timestamp))
            .execute(&mut *tx)
            .await
            .map_err(|e| SessionError::Storage(format!("INSERT event failed: {e}")))?;
        }

        let updated = sqlx::query(
            "UPDATE sessions SET state = ?1, updated_at = ?2 WHERE app_name = ?3 AND user_id = ?4 AND id = ?5",
        )
        .bind(&state_json)
        .bind(&now)
        .bind(&key.app_name)
        .bind(&key.user_id)
        .bind(&key.session_id)
        .execute(&mut *tx)
        .await
        .map_err(|e| SessionError::Storage(format!("UPDATE session failed: {e}")))?;

        if updated.rows_affected() == 0 {
            return Err(SessionError::NotFound(key.to_string()));
        }

        tx.commit()
            .await
            .map_err(|e| SessionError::Storage(format!("COMMIT failed: {e}")))?;

        debug!(session = %key, events = events.len(), keys = delta.len(), "Appended turn");
        session.apply(events, delta);
        Ok(())
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}
