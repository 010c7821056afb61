use sqlx::query::Query;
use sqlx::sqlite::{SqliteArguments, SqliteRow};
use sqlx::{Row, Sqlite};

use super::{AnnotationStore, Playlist, PlaylistFields, StoreChange};
use crate::errors::AppError;

const PLAYLIST_COLUMNS: &str = "id, owner, remote_id, title, description, thumbnail_url, \
                                video_count, sort_order, last_synced_at";

fn playlist_from_row(row: &SqliteRow) -> Result<Playlist, AppError> {
    Ok(Playlist {
        id: row.try_get("id")?,
        owner: row.try_get("owner")?,
        remote_id: row.try_get("remote_id")?,
        title: row.try_get("title")?,
        description: row.try_get("description")?,
        thumbnail_url: row.try_get("thumbnail_url")?,
        video_count: row.try_get("video_count")?,
        order: row.try_get("sort_order")?,
        last_synced_at: row.try_get("last_synced_at")?,
    })
}

impl AnnotationStore {
    pub async fn get_playlist(&self, id: &str) -> Result<Option<Playlist>, AppError> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM playlists WHERE id = ?",
            PLAYLIST_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(playlist_from_row).transpose()
    }

    /// All of an owner's playlists in display order.
    pub async fn list_playlists(&self, owner: &str) -> Result<Vec<Playlist>, AppError> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM playlists WHERE owner = ? ORDER BY sort_order ASC, id ASC",
            PLAYLIST_COLUMNS
        ))
        .bind(owner)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(playlist_from_row).collect()
    }

    pub async fn max_playlist_order(&self, owner: &str) -> Result<Option<i64>, AppError> {
        let (max,): (Option<i64>,) =
            sqlx::query_as("SELECT MAX(sort_order) FROM playlists WHERE owner = ?")
                .bind(owner)
                .fetch_one(&self.pool)
                .await?;
        Ok(max)
    }

    /// Full replace of a playlist record.
    pub async fn put_playlist(&self, playlist: &Playlist) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT OR REPLACE INTO playlists
                (id, owner, remote_id, title, description, thumbnail_url,
                 video_count, sort_order, last_synced_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&playlist.id)
        .bind(&playlist.owner)
        .bind(&playlist.remote_id)
        .bind(&playlist.title)
        .bind(&playlist.description)
        .bind(&playlist.thumbnail_url)
        .bind(playlist.video_count.max(0))
        .bind(playlist.order)
        .bind(playlist.last_synced_at)
        .execute(&self.pool)
        .await?;

        self.notify(StoreChange::Playlists {
            owner: playlist.owner.clone(),
        });
        Ok(())
    }

    /// Merge remote-derived fields into a playlist.
    ///
    /// `order` and the remote item count are only used when the playlist is
    /// new; an existing record keeps its order and its count, which video sync
    /// recomputes from the stored videos.
    pub async fn upsert_playlist_fields(
        &self,
        owner: &str,
        fields: &PlaylistFields,
        order: i64,
        synced_at: i64,
    ) -> Result<Playlist, AppError> {
        let row = sqlx::query(&format!(
            r#"
            INSERT INTO playlists
                (id, owner, remote_id, title, description, thumbnail_url,
                 video_count, sort_order, last_synced_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                title = excluded.title,
                description = excluded.description,
                thumbnail_url = excluded.thumbnail_url,
                last_synced_at = excluded.last_synced_at
            RETURNING {}
            "#,
            PLAYLIST_COLUMNS
        ))
        .bind(&fields.id)
        .bind(owner)
        .bind(&fields.id)
        .bind(&fields.title)
        .bind(&fields.description)
        .bind(&fields.thumbnail_url)
        .bind(fields.video_count.max(0))
        .bind(order)
        .bind(synced_at)
        .fetch_one(&self.pool)
        .await?;

        self.notify(StoreChange::Playlists {
            owner: owner.to_string(),
        });
        playlist_from_row(&row)
    }

    pub async fn set_playlist_title(&self, id: &str, title: &str) -> Result<(), AppError> {
        self.update_playlist_returning_owner(
            sqlx::query("UPDATE playlists SET title = ? WHERE id = ? RETURNING owner")
                .bind(title)
                .bind(id),
            id,
        )
        .await
    }

    pub async fn set_playlist_order(&self, id: &str, order: i64) -> Result<(), AppError> {
        self.update_playlist_returning_owner(
            sqlx::query("UPDATE playlists SET sort_order = ? WHERE id = ? RETURNING owner")
                .bind(order)
                .bind(id),
            id,
        )
        .await
    }

    /// Shift the cached video count, never below zero.
    pub async fn adjust_video_count(&self, id: &str, delta: i64) -> Result<(), AppError> {
        self.update_playlist_returning_owner(
            sqlx::query(
                "UPDATE playlists SET video_count = MAX(video_count + ?, 0) WHERE id = ? RETURNING owner",
            )
            .bind(delta)
            .bind(id),
            id,
        )
        .await
    }

    /// Reset the cached video count to the number of stored Video records.
    pub async fn recompute_video_count(&self, id: &str) -> Result<i64, AppError> {
        let row = sqlx::query(
            r#"
            UPDATE playlists
            SET video_count = (SELECT COUNT(*) FROM videos WHERE playlist_id = ?)
            WHERE id = ?
            RETURNING owner, video_count
            "#,
        )
        .bind(id)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Playlist {}", id)))?;

        let owner: String = row.try_get("owner")?;
        let count: i64 = row.try_get("video_count")?;
        self.notify(StoreChange::Playlists { owner });
        Ok(count)
    }

    pub async fn count_videos(&self, playlist_id: &str) -> Result<i64, AppError> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM videos WHERE playlist_id = ?")
            .bind(playlist_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    pub async fn touch_playlist_synced(&self, id: &str, synced_at: i64) -> Result<(), AppError> {
        self.update_playlist_returning_owner(
            sqlx::query("UPDATE playlists SET last_synced_at = ? WHERE id = ? RETURNING owner")
                .bind(synced_at)
                .bind(id),
            id,
        )
        .await
    }

    /// Delete a playlist along with every video and segment stored under it.
    ///
    /// Returns false when no such playlist was stored.
    pub async fn delete_playlist_cascade(&self, id: &str) -> Result<bool, AppError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM segments WHERE playlist_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        let removed_videos = sqlx::query("DELETE FROM videos WHERE playlist_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        let owner: Option<String> =
            sqlx::query_scalar("DELETE FROM playlists WHERE id = ? RETURNING owner")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?;

        tx.commit().await?;

        log::debug!(
            "Deleted playlist {} with {} stored videos",
            id,
            removed_videos
        );

        match owner {
            Some(owner) => {
                self.notify(StoreChange::Videos {
                    owner: owner.clone(),
                    playlist_id: id.to_string(),
                });
                self.notify(StoreChange::Playlists { owner });
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn update_playlist_returning_owner<'q>(
        &self,
        query: Query<'q, Sqlite, SqliteArguments<'q>>,
        id: &str,
    ) -> Result<(), AppError> {
        let row = query
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Playlist {}", id)))?;

        let owner: String = row.try_get("owner")?;
        self.notify(StoreChange::Playlists { owner });
        Ok(())
    }
}
