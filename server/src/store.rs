use serde::Serialize;
use std::path::PathBuf;
use thiserror::Error;
use tokio_rusqlite::{Connection, Error as TokioSqlError};

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS comments (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    user TEXT NOT NULL,
    text TEXT NOT NULL,
    timestamp INTEGER NOT NULL
)";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoredComment {
    pub user: String,
    pub text: String,
    pub timestamp: i64,
}

#[derive(Debug, Error)]
#[error("comment store failure: {0}")]
pub struct StoreError(#[from] TokioSqlError);

/// Comments persisted in SQLite on tokio-rusqlite's connection thread.
#[derive(Clone)]
pub struct CommentStore {
    connection: Connection,
}

impl CommentStore {
    pub async fn open(path: PathBuf) -> Result<Self, StoreError> {
        let connection = Connection::open(path).await?;
        Self::init(connection).await
    }

    pub async fn open_in_memory() -> Result<Self, StoreError> {
        let connection = Connection::open_in_memory().await?;
        Self::init(connection).await
    }

    async fn init(connection: Connection) -> Result<Self, StoreError> {
        connection
            .call(|conn: &mut rusqlite::Connection| -> Result<(), TokioSqlError> {
                conn.execute(SCHEMA, [])?;
                Ok(())
            })
            .await?;
        Ok(Self { connection })
    }

    pub async fn insert(&self, comment: StoredComment) -> Result<(), StoreError> {
        self.connection
            .call(move |conn: &mut rusqlite::Connection| -> Result<(), TokioSqlError> {
                conn.execute(
                    "INSERT INTO comments (user, text, timestamp) VALUES (?1, ?2, ?3)",
                    rusqlite::params![comment.user, comment.text, comment.timestamp],
                )?;
                Ok(())
            })
            .await?;
        Ok(())
    }

    /// Every comment, newest first.
    pub async fn list(&self) -> Result<Vec<StoredComment>, StoreError> {
        let comments = self
            .connection
            .call(
                |conn: &mut rusqlite::Connection| -> Result<Vec<StoredComment>, TokioSqlError> {
                    let mut stmt = conn.prepare(
                        "SELECT user, text, timestamp FROM comments ORDER BY timestamp DESC, id DESC",
                    )?;
                    let rows = stmt.query_map([], |row| {
                        Ok(StoredComment {
                            user: row.get(0)?,
                            text: row.get(1)?,
                            timestamp: row.get(2)?,
                        })
                    })?;
                    let mut comments = Vec::new();
                    for row in rows {
                        comments.push(row?);
                    }
                    Ok(comments)
                },
            )
            .await?;
        Ok(comments)
    }
}
