//! Time-range segments of a video and the per-video annotations edited next
//! to them.

pub mod playback;
pub mod time;

pub use playback::{Player, SegmentPlayback};
pub use time::{format_time, parse_time};

use chrono::Utc;
use uuid::Uuid;

use crate::errors::AppError;
use crate::store::{AnnotationStore, Segment, TagSet, VideoKey};
use crate::tags::{with_tag, without_tag};

/// Mark-in state for the video currently open.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SegmentMarker {
    pending_start: Option<f64>,
}

impl SegmentMarker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pending_start(&self) -> Option<f64> {
        self.pending_start
    }

    pub fn mark_start(&mut self, time: f64) -> Result<(), AppError> {
        if !time.is_finite() || time < 0.0 {
            return Err(AppError::Validation(
                "Start time cannot be negative".to_string(),
            ));
        }
        self.pending_start = Some(time);
        Ok(())
    }

    /// The range ending at `time`. The pending start stays set until
    /// [`clear`](Self::clear) so a failed save can be retried.
    pub fn range_to(&self, time: f64) -> Result<(f64, f64), AppError> {
        let start = self.pending_start.ok_or_else(|| {
            AppError::Validation("Please set a start time first".to_string())
        })?;
        if time <= start {
            return Err(AppError::Validation(
                "End time must be after start time".to_string(),
            ));
        }
        Ok((start, time))
    }

    pub fn clear(&mut self) {
        self.pending_start = None;
    }
}

pub struct SegmentManager {
    store: AnnotationStore,
}

impl SegmentManager {
    pub fn new(store: AnnotationStore) -> Self {
        Self { store }
    }

    pub async fn segments(&self, key: &VideoKey) -> Result<Vec<Segment>, AppError> {
        self.store.list_segments(key).await
    }

    /// Close the marked range at `time` and store it as a segment.
    pub async fn mark_end(
        &self,
        marker: &mut SegmentMarker,
        key: &VideoKey,
        time: f64,
    ) -> Result<Segment, AppError> {
        let (start, end) = marker.range_to(time)?;
        let segment = self.create_segment(key, start, end).await?;
        marker.clear();
        Ok(segment)
    }

    /// Create a segment from typed `MM:SS` times. `duration` is the video's
    /// length when the player knows it.
    pub async fn manual_create(
        &self,
        key: &VideoKey,
        start: &str,
        end: &str,
        duration: Option<f64>,
    ) -> Result<Segment, AppError> {
        let start = parse_time(start.trim())?;
        let end = parse_time(end.trim())?;
        if end <= start {
            return Err(AppError::Validation(
                "End time must be after start time".to_string(),
            ));
        }
        if let Some(duration) = duration.filter(|d| d.is_finite() && *d > 0.0) {
            if end > duration {
                return Err(AppError::Validation(
                    "End time cannot exceed video duration".to_string(),
                ));
            }
        }
        self.create_segment(key, start, end).await
    }

    pub async fn create_segment(
        &self,
        key: &VideoKey,
        start: f64,
        end: f64,
    ) -> Result<Segment, AppError> {
        if !(start.is_finite() && end.is_finite()) || start < 0.0 || start >= end {
            return Err(AppError::Validation(
                "End time must be after start time".to_string(),
            ));
        }
        if self.store.get_video(key).await?.is_none() {
            return Err(AppError::NotFound(format!("Video {}", key)));
        }

        let segment = Segment {
            id: Uuid::new_v4().to_string(),
            video_id: key.video_id.clone(),
            playlist_id: key.playlist_id.clone(),
            start_time: start,
            end_time: end,
            tags: TagSet::new(),
            notes: String::new(),
            created_at: Utc::now().timestamp(),
        };
        self.store.insert_segment(&segment).await?;

        log::info!(
            "Added segment {} to {} ({} - {})",
            segment.id,
            key,
            format_time(Some(start)),
            format_time(Some(end))
        );
        Ok(segment)
    }

    pub async fn delete_segment(&self, segment_id: &str) -> Result<(), AppError> {
        self.store.delete_segment(segment_id).await
    }

    /// Returns the segment's tags after the change.
    pub async fn add_segment_tag(&self, segment_id: &str, tag: &str) -> Result<TagSet, AppError> {
        let segment = self.load_segment(segment_id).await?;
        match with_tag(&segment.tags, tag) {
            Some(tags) => {
                self.store.set_segment_tags(segment_id, &tags).await?;
                Ok(tags)
            }
            None => Ok(segment.tags),
        }
    }

    pub async fn remove_segment_tag(
        &self,
        segment_id: &str,
        tag: &str,
    ) -> Result<TagSet, AppError> {
        let segment = self.load_segment(segment_id).await?;
        match without_tag(&segment.tags, tag) {
            Some(tags) => {
                self.store.set_segment_tags(segment_id, &tags).await?;
                Ok(tags)
            }
            None => Ok(segment.tags),
        }
    }

    pub async fn set_segment_notes(&self, segment_id: &str, notes: &str) -> Result<(), AppError> {
        self.store.set_segment_notes(segment_id, notes).await
    }

    pub async fn add_video_tag(&self, key: &VideoKey, tag: &str) -> Result<TagSet, AppError> {
        let current = self.video_tags(key).await?;
        match with_tag(&current, tag) {
            Some(tags) => {
                self.store.set_video_tags(key, &tags).await?;
                Ok(tags)
            }
            None => Ok(current),
        }
    }

    pub async fn remove_video_tag(&self, key: &VideoKey, tag: &str) -> Result<TagSet, AppError> {
        let current = self.video_tags(key).await?;
        match without_tag(&current, tag) {
            Some(tags) => {
                self.store.set_video_tags(key, &tags).await?;
                Ok(tags)
            }
            None => Ok(current),
        }
    }

    pub async fn set_video_notes(&self, key: &VideoKey, notes: &str) -> Result<(), AppError> {
        self.store.set_video_notes(key, notes).await
    }

    async fn video_tags(&self, key: &VideoKey) -> Result<TagSet, AppError> {
        self.store
            .get_video(key)
            .await?
            .map(|video| video.tags)
            .ok_or_else(|| AppError::NotFound(format!("Video {}", key)))
    }

    async fn load_segment(&self, id: &str) -> Result<Segment, AppError> {
        self.store
            .get_segment(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Segment {}", id)))
    }
}
