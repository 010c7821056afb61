use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use std::collections::HashMap;

use super::{
    decode_tags, encode_tags, AnnotatedVideo, AnnotationStore, Segment, StoreChange, TagSet,
    Video, VideoFields, VideoKey,
};
use crate::errors::AppError;

const VIDEO_COLUMNS: &str = "id, owner, playlist_id, remote_item_id, title, description, \
                             thumbnail_url, published_at, tags, notes";

fn video_from_row(row: &SqliteRow) -> Result<Video, AppError> {
    let tags: String = row.try_get("tags")?;
    Ok(Video {
        id: row.try_get("id")?,
        owner: row.try_get("owner")?,
        playlist_id: row.try_get("playlist_id")?,
        remote_item_id: row.try_get("remote_item_id")?,
        title: row.try_get("title")?,
        description: row.try_get("description")?,
        thumbnail_url: row.try_get("thumbnail_url")?,
        published_at: row.try_get("published_at")?,
        tags: decode_tags(&tags)?,
        notes: row.try_get("notes")?,
    })
}

impl AnnotationStore {
    pub async fn get_video(&self, key: &VideoKey) -> Result<Option<Video>, AppError> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM videos WHERE id = ? AND playlist_id = ?",
            VIDEO_COLUMNS
        ))
        .bind(&key.video_id)
        .bind(&key.playlist_id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(video_from_row).transpose()
    }

    pub async fn list_videos(
        &self,
        owner: &str,
        playlist_id: &str,
    ) -> Result<Vec<Video>, AppError> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM videos WHERE owner = ? AND playlist_id = ? ORDER BY rowid ASC",
            VIDEO_COLUMNS
        ))
        .bind(owner)
        .bind(playlist_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(video_from_row).collect()
    }

    pub async fn list_videos_by_owner(&self, owner: &str) -> Result<Vec<Video>, AppError> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM videos WHERE owner = ? ORDER BY playlist_id ASC, rowid ASC",
            VIDEO_COLUMNS
        ))
        .bind(owner)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(video_from_row).collect()
    }

    /// Videos of one playlist, each with its segments in start-time order.
    pub async fn list_annotated_videos(
        &self,
        owner: &str,
        playlist_id: &str,
    ) -> Result<Vec<AnnotatedVideo>, AppError> {
        let videos = self.list_videos(owner, playlist_id).await?;
        let mut by_video: HashMap<String, Vec<Segment>> = HashMap::new();
        for segment in self.list_segments_in_playlist(playlist_id).await? {
            by_video
                .entry(segment.video_id.clone())
                .or_default()
                .push(segment);
        }

        Ok(videos
            .into_iter()
            .map(|video| AnnotatedVideo {
                segments: by_video.remove(&video.id).unwrap_or_default(),
                video,
            })
            .collect())
    }

    /// Merge remote-derived fields into a video record.
    ///
    /// A new record starts with no tags and empty notes; an existing record
    /// keeps its tags, notes and segments untouched.
    pub async fn upsert_video_fields(
        &self,
        owner: &str,
        fields: &VideoFields,
    ) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO videos
                (id, playlist_id, owner, remote_item_id, title, description,
                 thumbnail_url, published_at, tags, notes)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, '[]', '')
            ON CONFLICT(id, playlist_id) DO UPDATE SET
                remote_item_id = excluded.remote_item_id,
                title = excluded.title,
                description = excluded.description,
                thumbnail_url = excluded.thumbnail_url,
                published_at = excluded.published_at
            "#,
        )
        .bind(&fields.id)
        .bind(&fields.playlist_id)
        .bind(owner)
        .bind(&fields.remote_item_id)
        .bind(&fields.title)
        .bind(&fields.description)
        .bind(&fields.thumbnail_url)
        .bind(fields.published_at)
        .execute(&self.pool)
        .await?;

        self.notify(StoreChange::Videos {
            owner: owner.to_string(),
            playlist_id: fields.playlist_id.clone(),
        });
        Ok(())
    }

    /// Full replace of a video record (segments are stored separately).
    pub async fn put_video(&self, video: &Video) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT OR REPLACE INTO videos
                (id, playlist_id, owner, remote_item_id, title, description,
                 thumbnail_url, published_at, tags, notes)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&video.id)
        .bind(&video.playlist_id)
        .bind(&video.owner)
        .bind(&video.remote_item_id)
        .bind(&video.title)
        .bind(&video.description)
        .bind(&video.thumbnail_url)
        .bind(video.published_at)
        .bind(encode_tags(&video.tags)?)
        .bind(&video.notes)
        .execute(&self.pool)
        .await?;

        self.notify(StoreChange::Videos {
            owner: video.owner.clone(),
            playlist_id: video.playlist_id.clone(),
        });
        Ok(())
    }

    pub async fn set_video_tags(&self, key: &VideoKey, tags: &TagSet) -> Result<(), AppError> {
        let owner: Option<String> = sqlx::query_scalar(
            "UPDATE videos SET tags = ? WHERE id = ? AND playlist_id = ? RETURNING owner",
        )
        .bind(encode_tags(tags)?)
        .bind(&key.video_id)
        .bind(&key.playlist_id)
        .fetch_optional(&self.pool)
        .await?;

        self.notify_video_updated(key, owner)
    }

    pub async fn set_video_notes(&self, key: &VideoKey, notes: &str) -> Result<(), AppError> {
        let owner: Option<String> = sqlx::query_scalar(
            "UPDATE videos SET notes = ? WHERE id = ? AND playlist_id = ? RETURNING owner",
        )
        .bind(notes)
        .bind(&key.video_id)
        .bind(&key.playlist_id)
        .fetch_optional(&self.pool)
        .await?;

        self.notify_video_updated(key, owner)
    }

    /// Delete a video record and its segments.
    ///
    /// Returns false when the record did not exist, which makes a retried
    /// delete harmless.
    pub async fn delete_video(&self, key: &VideoKey) -> Result<bool, AppError> {
        let mut tx = self.pool.begin().await?;

        let segments = sqlx::query("DELETE FROM segments WHERE video_id = ? AND playlist_id = ?")
            .bind(&key.video_id)
            .bind(&key.playlist_id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        let owner: Option<String> = sqlx::query_scalar(
            "DELETE FROM videos WHERE id = ? AND playlist_id = ? RETURNING owner",
        )
        .bind(&key.video_id)
        .bind(&key.playlist_id)
        .fetch_optional(&mut *tx)
        .await?;

        tx.commit().await?;

        if segments > 0 {
            self.notify(StoreChange::Segments { key: key.clone() });
        }

        match owner {
            Some(owner) => {
                log::debug!("Deleted video {} with {} segments", key, segments);
                self.notify(StoreChange::Videos {
                    owner,
                    playlist_id: key.playlist_id.clone(),
                });
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn notify_video_updated(&self, key: &VideoKey, owner: Option<String>) -> Result<(), AppError> {
        let owner = owner.ok_or_else(|| AppError::NotFound(format!("Video {}", key)))?;
        self.notify(StoreChange::Videos {
            owner,
            playlist_id: key.playlist_id.clone(),
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields(video_id: &str, playlist_id: &str, title: &str) -> VideoFields {
        VideoFields {
            id: video_id.to_string(),
            playlist_id: playlist_id.to_string(),
            remote_item_id: format!("item-{}", video_id),
            title: title.to_string(),
            description: String::new(),
            thumbnail_url: format!("{}.jpg", title),
            published_at: Some(1_700_000_000),
        }
    }

    fn tags(list: &[&str]) -> TagSet {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_upsert_preserves_tags_and_notes() {
        let store = AnnotationStore::in_memory().await.unwrap();
        let key = VideoKey::new("v1", "PL1");
        store.upsert_video_fields("u1", &fields("v1", "PL1", "first")).await.unwrap();
        store.set_video_tags(&key, &tags(&["drill"])).await.unwrap();
        store.set_video_notes(&key, "watch the hips").await.unwrap();

        store.upsert_video_fields("u1", &fields("v1", "PL1", "renamed")).await.unwrap();

        let video = store.get_video(&key).await.unwrap().unwrap();
        assert_eq!(video.title, "renamed");
        assert_eq!(video.thumbnail_url, "renamed.jpg");
        assert_eq!(video.tags, tags(&["drill"]));
        assert_eq!(video.notes, "watch the hips");
    }

    #[tokio::test]
    async fn test_same_video_in_two_playlists_keeps_separate_annotations() {
        let store = AnnotationStore::in_memory().await.unwrap();
        store.upsert_video_fields("u1", &fields("v1", "PL1", "t")).await.unwrap();
        store.upsert_video_fields("u1", &fields("v1", "PL2", "t")).await.unwrap();

        store
            .set_video_tags(&VideoKey::new("v1", "PL1"), &tags(&["a"]))
            .await
            .unwrap();

        let other = store.get_video(&VideoKey::new("v1", "PL2")).await.unwrap().unwrap();
        assert!(other.tags.is_empty());
        assert_eq!(store.list_videos_by_owner("u1").await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_delete_video_removes_segments_and_is_repeatable() {
        let store = AnnotationStore::in_memory().await.unwrap();
        let key = VideoKey::new("v1", "PL1");
        store.upsert_video_fields("u1", &fields("v1", "PL1", "t")).await.unwrap();
        store
            .insert_segment(&Segment {
                id: "s1".to_string(),
                video_id: "v1".to_string(),
                playlist_id: "PL1".to_string(),
                start_time: 1.0,
                end_time: 2.0,
                tags: TagSet::new(),
                notes: String::new(),
                created_at: 0,
            })
            .await
            .unwrap();

        assert!(store.delete_video(&key).await.unwrap());
        assert!(store.list_segments(&key).await.unwrap().is_empty());
        assert!(!store.delete_video(&key).await.unwrap());
    }

    #[tokio::test]
    async fn test_tagging_missing_video_is_not_found() {
        let store = AnnotationStore::in_memory().await.unwrap();
        let result = store
            .set_video_tags(&VideoKey::new("nope", "PL1"), &tags(&["a"]))
            .await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }
}
