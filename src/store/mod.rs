//! Persistent annotation storage.
//!
//! Playlists, videos and segments live in SQLite. Videos are keyed by
//! `(video id, playlist id)` so annotations belong to one playlist
//! membership; segments hang off that compound key. Every write publishes a
//! [`StoreChange`] on a broadcast channel, which [`Subscription`]s turn into
//! fresh snapshots of their query.

pub mod models;
mod playlists;
mod segments;
mod subscription;
mod videos;

pub use models::{
    AnnotatedVideo, Playlist, PlaylistFields, Segment, TagSet, Video, VideoFields, VideoKey,
};
pub use subscription::{Snapshot, StoreQuery, Subscription};

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Pool, Sqlite};
use std::fs;
use std::path::Path;
use tokio::sync::broadcast;

use crate::config::CHANGE_FEED_CAPACITY;
use crate::errors::AppError;

/// What a write touched, used to wake matching subscriptions.
#[derive(Debug, Clone, PartialEq)]
pub enum StoreChange {
    Playlists { owner: String },
    Videos { owner: String, playlist_id: String },
    Segments { key: VideoKey },
}

#[derive(Debug, Clone)]
pub struct AnnotationStore {
    pool: Pool<Sqlite>,
    changes: broadcast::Sender<StoreChange>,
}

impl AnnotationStore {
    pub async fn open(db_path: &Path) -> Result<Self, AppError> {
        if let Some(dir) = db_path.parent() {
            if !dir.as_os_str().is_empty() && !dir.exists() {
                fs::create_dir_all(dir)?;
            }
        }

        log::info!("Connecting to database at: {:?}", db_path);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(
                SqliteConnectOptions::new()
                    .filename(db_path)
                    .create_if_missing(true),
            )
            .await
            .map_err(|e| AppError::Store(format!("Failed to connect to database: {}", e)))?;

        Self::with_pool(pool).await
    }

    /// A private in-memory database; a single pinned connection keeps it alive.
    pub async fn in_memory() -> Result<Self, AppError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await?;

        Self::with_pool(pool).await
    }

    async fn with_pool(pool: Pool<Sqlite>) -> Result<Self, AppError> {
        let schema = include_str!("schema.sql");

        for statement in schema.split(';') {
            let stmt = statement.trim();
            if !stmt.is_empty() {
                sqlx::query(stmt).execute(&pool).await.map_err(|e| {
                    AppError::Store(format!(
                        "Failed to execute schema statement '{}': {}",
                        stmt, e
                    ))
                })?;
            }
        }

        let (changes, _) = broadcast::channel(CHANGE_FEED_CAPACITY);
        Ok(Self { pool, changes })
    }

    pub fn subscribe(&self, query: StoreQuery) -> Subscription {
        Subscription::new(self.clone(), query, self.changes.subscribe())
    }

    fn notify(&self, change: StoreChange) {
        // No receivers is fine; nobody is watching.
        let _ = self.changes.send(change);
    }
}

fn encode_tags(tags: &TagSet) -> Result<String, AppError> {
    Ok(serde_json::to_string(tags)?)
}

fn decode_tags(raw: &str) -> Result<TagSet, AppError> {
    Ok(serde_json::from_str(raw)?)
}
