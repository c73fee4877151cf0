//! SQLite-backed review storage.
//!
//! Each request gets its own connection through a [`StoreSession`]. The
//! connection is closed when the session is dropped, on every exit path.
//! Concurrent writers are serialized by SQLite itself.

use anyhow::{Context, Result};
use rusqlite::{params, Connection};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::models::Review;

/// How long a session waits on a locked database before failing.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Handle to the review database.
#[derive(Debug, Clone)]
pub struct ReviewStore {
    db_path: PathBuf,
}

impl ReviewStore {
    /// Open the store at `db_path`, creating the file and schema if needed.
    pub fn new(db_path: impl Into<PathBuf>) -> Result<Self> {
        let db_path = db_path.into();

        if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }

        let store = Self { db_path };
        let session = store.session()?;
        session
            .conn
            .execute_batch(include_str!("schema.sql"))
            .context("Failed to initialize review database schema")?;

        tracing::info!(path = %store.db_path.display(), "Review store ready");
        Ok(store)
    }

    /// Path of the database file.
    pub fn path(&self) -> &Path {
        &self.db_path
    }

    /// Open a dedicated connection for one unit of work.
    pub fn session(&self) -> Result<StoreSession> {
        let conn = Connection::open(&self.db_path)
            .with_context(|| format!("Failed to open {}", self.db_path.display()))?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        Ok(StoreSession { conn })
    }

    /// Run `f` with a fresh session on a blocking worker thread.
    ///
    /// The session is dropped before this returns, whether `f` succeeds,
    /// fails or panics.
    pub async fn with_session<T, F>(&self, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut StoreSession) -> Result<T> + Send + 'static,
    {
        let store = self.clone();
        tokio::task::spawn_blocking(move || -> Result<T> {
            let mut session = store.session()?;
            f(&mut session)
        })
        .await
        .context("Store task panicked")?
    }
}

/// A single connection scoped to one request.
pub struct StoreSession {
    conn: Connection,
}

impl StoreSession {
    /// Insert a fully analyzed review and return the stored record.
    pub fn create(
        &mut self,
        rating: i64,
        review: &str,
        summary: &str,
        action: &str,
        reply: &str,
    ) -> Result<Review> {
        let tx = self.conn.transaction()?;

        tx.execute(
            r"
            INSERT INTO reviews (rating, review, ai_response, ai_summary, ai_action)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ",
            params![rating, review, reply, summary, action],
        )
        .context("Failed to insert review")?;

        let id = tx.last_insert_rowid();
        tx.commit().context("Failed to commit review")?;

        Ok(Review {
            id,
            rating,
            review: review.to_string(),
            ai_summary: summary.to_string(),
            ai_action: action.to_string(),
            ai_response: reply.to_string(),
        })
    }

    /// Every review, newest first.
    pub fn list_all(&self) -> Result<Vec<Review>> {
        let mut stmt = self.conn.prepare(
            r"
            SELECT id, rating, review, ai_summary, ai_action, ai_response
            FROM reviews
            ORDER BY id DESC
            ",
        )?;

        let reviews = stmt
            .query_map([], |row| {
                Ok(Review {
                    id: row.get(0)?,
                    rating: row.get(1)?,
                    review: row.get(2)?,
                    ai_summary: row.get(3)?,
                    ai_action: row.get(4)?,
                    ai_response: row.get(5)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()
            .context("Failed to read reviews")?;

        Ok(reviews)
    }
}
