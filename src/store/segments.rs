use sqlx::sqlite::SqliteRow;
use sqlx::Row;

use super::{decode_tags, encode_tags, AnnotationStore, Segment, StoreChange, TagSet, VideoKey};
use crate::errors::AppError;

const SEGMENT_COLUMNS: &str =
    "id, video_id, playlist_id, start_time, end_time, tags, notes, created_at";

fn segment_from_row(row: &SqliteRow) -> Result<Segment, AppError> {
    let tags: String = row.try_get("tags")?;
    Ok(Segment {
        id: row.try_get("id")?,
        video_id: row.try_get("video_id")?,
        playlist_id: row.try_get("playlist_id")?,
        start_time: row.try_get("start_time")?,
        end_time: row.try_get("end_time")?,
        tags: decode_tags(&tags)?,
        notes: row.try_get("notes")?,
        created_at: row.try_get("created_at")?,
    })
}

fn key_from_row(row: &SqliteRow) -> Result<VideoKey, AppError> {
    Ok(VideoKey {
        video_id: row.try_get("video_id")?,
        playlist_id: row.try_get("playlist_id")?,
    })
}

impl AnnotationStore {
    pub async fn get_segment(&self, id: &str) -> Result<Option<Segment>, AppError> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM segments WHERE id = ?",
            SEGMENT_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(segment_from_row).transpose()
    }

    /// Segments of one video record, ascending by start time.
    pub async fn list_segments(&self, key: &VideoKey) -> Result<Vec<Segment>, AppError> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT {} FROM segments
            WHERE video_id = ? AND playlist_id = ?
            ORDER BY start_time ASC, created_at ASC, id ASC
            "#,
            SEGMENT_COLUMNS
        ))
        .bind(&key.video_id)
        .bind(&key.playlist_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(segment_from_row).collect()
    }

    pub async fn list_segments_in_playlist(
        &self,
        playlist_id: &str,
    ) -> Result<Vec<Segment>, AppError> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT {} FROM segments
            WHERE playlist_id = ?
            ORDER BY video_id ASC, start_time ASC, created_at ASC, id ASC
            "#,
            SEGMENT_COLUMNS
        ))
        .bind(playlist_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(segment_from_row).collect()
    }

    /// Full replace of a segment record.
    pub async fn insert_segment(&self, segment: &Segment) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT OR REPLACE INTO segments
                (id, video_id, playlist_id, start_time, end_time, tags, notes, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&segment.id)
        .bind(&segment.video_id)
        .bind(&segment.playlist_id)
        .bind(segment.start_time)
        .bind(segment.end_time)
        .bind(encode_tags(&segment.tags)?)
        .bind(&segment.notes)
        .bind(segment.created_at)
        .execute(&self.pool)
        .await?;

        self.notify(StoreChange::Segments {
            key: segment.video_key(),
        });
        Ok(())
    }

    pub async fn set_segment_tags(&self, id: &str, tags: &TagSet) -> Result<(), AppError> {
        let row = sqlx::query(
            "UPDATE segments SET tags = ? WHERE id = ? RETURNING video_id, playlist_id",
        )
        .bind(encode_tags(tags)?)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        self.notify_segment_row(id, row)
    }

    pub async fn set_segment_notes(&self, id: &str, notes: &str) -> Result<(), AppError> {
        let row = sqlx::query(
            "UPDATE segments SET notes = ? WHERE id = ? RETURNING video_id, playlist_id",
        )
        .bind(notes)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        self.notify_segment_row(id, row)
    }

    pub async fn delete_segment(&self, id: &str) -> Result<(), AppError> {
        let row = sqlx::query("DELETE FROM segments WHERE id = ? RETURNING video_id, playlist_id")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        self.notify_segment_row(id, row)
    }

    /// Move every segment of one video record under another.
    pub async fn reparent_segments(&self, from: &VideoKey, to: &VideoKey) -> Result<u64, AppError> {
        let moved = sqlx::query(
            r#"
            UPDATE segments SET video_id = ?, playlist_id = ?
            WHERE video_id = ? AND playlist_id = ?
            "#,
        )
        .bind(&to.video_id)
        .bind(&to.playlist_id)
        .bind(&from.video_id)
        .bind(&from.playlist_id)
        .execute(&self.pool)
        .await?
        .rows_affected();

        if moved > 0 {
            self.notify(StoreChange::Segments { key: from.clone() });
            self.notify(StoreChange::Segments { key: to.clone() });
        }
        Ok(moved)
    }

    fn notify_segment_row(&self, id: &str, row: Option<SqliteRow>) -> Result<(), AppError> {
        let row = row.ok_or_else(|| AppError::NotFound(format!("Segment {}", id)))?;
        self.notify(StoreChange::Segments {
            key: key_from_row(&row)?,
        });
        Ok(())
    }
}
