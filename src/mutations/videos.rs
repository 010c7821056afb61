use super::{batch_failure, require_selection, BatchSummary, MutationEngine};
use crate::errors::{AppError, BatchOperation};
use crate::store::{Video, VideoFields, VideoKey};

impl MutationEngine {
    /// Remove a video from its playlist, remotely and then locally.
    pub async fn delete_video(&self, key: &VideoKey) -> Result<(), AppError> {
        let video = self.load_video(key).await?;

        if !video.remote_item_id.is_empty() {
            self.api.remove_item(&video.remote_item_id).await?;
        }

        if self.store.delete_video(key).await? {
            self.adjust_count(&key.playlist_id, -1).await;
        }
        log::info!("Deleted video {}", key);
        Ok(())
    }

    /// Move videos from `source` to `target`, carrying their annotations.
    ///
    /// On failure the videos handled before the failing one stay moved and
    /// the counts reflect them. A video already in `target` merges into its
    /// record there and does not add to the target's count.
    pub async fn move_videos(
        &self,
        source: &str,
        video_ids: &[String],
        target: &str,
    ) -> Result<BatchSummary, AppError> {
        require_selection(video_ids)?;
        if source == target {
            return Err(AppError::Validation(
                "Videos are already in that playlist".to_string(),
            ));
        }
        self.require_playlist(target).await?;

        let mut moved = Vec::new();
        let mut created = 0i64;
        let mut failure = None;
        for video_id in video_ids {
            match self.move_one(&VideoKey::new(video_id, source), target).await {
                Ok(new_record) => {
                    moved.push(video_id.clone());
                    created += i64::from(new_record);
                }
                Err(e) => {
                    log::warn!("Moving {} to {} failed: {}", video_id, target, e);
                    failure = Some((video_id.clone(), e));
                    break;
                }
            }
        }

        self.adjust_count(source, -(moved.len() as i64)).await;
        self.adjust_count(target, created).await;

        if let Some((failed, e)) = failure {
            return Err(batch_failure(BatchOperation::Move, moved, &failed, e));
        }

        log::info!("Moved {} videos from {} to {}", moved.len(), source, target);
        Ok(BatchSummary {
            operation: BatchOperation::Move,
            videos: moved,
            playlists: 1,
        })
    }

    /// Returns whether the target gained a new record.
    async fn move_one(&self, from: &VideoKey, target: &str) -> Result<bool, AppError> {
        let video = self.load_video(from).await?;
        let to = VideoKey::new(&from.video_id, target);

        let item_id = self.api.add_item(target, &from.video_id).await?;
        if !video.remote_item_id.is_empty() {
            self.api.remove_item(&video.remote_item_id).await?;
        }

        // The video may already be a member of the target; its record there
        // keeps what it had and gains the moved annotations.
        let existing = self.store.get_video(&to).await?;
        let new_record = existing.is_none();
        let mut tags = video.tags.clone();
        let mut notes = video.notes.clone();
        if let Some(existing) = existing {
            tags.extend(existing.tags);
            if !existing.notes.is_empty() {
                notes = existing.notes;
            }
        }

        self.store
            .put_video(&Video {
                playlist_id: target.to_string(),
                remote_item_id: item_id,
                tags,
                notes,
                ..video
            })
            .await?;
        self.store.reparent_segments(from, &to).await?;
        self.store.delete_video(from).await?;
        Ok(new_record)
    }

    /// Add videos to every target playlist. The source is left as it is and
    /// copies start without annotations of their own. A target that already
    /// holds the video keeps its record and its count.
    pub async fn copy_videos(
        &self,
        owner: &str,
        source: &str,
        video_ids: &[String],
        targets: &[String],
    ) -> Result<BatchSummary, AppError> {
        require_selection(video_ids)?;
        if targets.is_empty() {
            return Err(AppError::Validation(
                "Select at least one playlist".to_string(),
            ));
        }
        if targets.iter().any(|t| t == source) {
            return Err(AppError::Validation(
                "Cannot copy videos into the playlist they are in".to_string(),
            ));
        }
        for target in targets {
            self.require_playlist(target).await?;
        }

        let mut added = vec![0i64; targets.len()];
        let mut copied = Vec::new();
        let mut failure = None;

        'videos: for video_id in video_ids {
            let video = match self.load_video(&VideoKey::new(video_id, source)).await {
                Ok(video) => video,
                Err(e) => {
                    failure = Some((video_id.clone(), e));
                    break;
                }
            };

            for (i, target) in targets.iter().enumerate() {
                match self.copy_one(owner, &video, target).await {
                    Ok(new_record) => added[i] += i64::from(new_record),
                    Err(e) => {
                        log::warn!("Copying {} to {} failed: {}", video_id, target, e);
                        failure = Some((video_id.clone(), e));
                        break 'videos;
                    }
                }
            }
            copied.push(video_id.clone());
        }

        for (target, count) in targets.iter().zip(&added) {
            self.adjust_count(target, *count).await;
        }

        if let Some((failed, e)) = failure {
            return Err(batch_failure(BatchOperation::Copy, copied, &failed, e));
        }

        log::info!(
            "Copied {} videos from {} to {} playlists",
            copied.len(),
            source,
            targets.len()
        );
        Ok(BatchSummary {
            operation: BatchOperation::Copy,
            videos: copied,
            playlists: targets.len(),
        })
    }

    async fn copy_one(&self, owner: &str, video: &Video, target: &str) -> Result<bool, AppError> {
        let item_id = self.api.add_item(target, &video.id).await?;
        let new_record = self
            .store
            .get_video(&VideoKey::new(&video.id, target))
            .await?
            .is_none();
        let fields = VideoFields {
            playlist_id: target.to_string(),
            remote_item_id: item_id,
            ..VideoFields::from(video)
        };
        self.store.upsert_video_fields(owner, &fields).await?;
        Ok(new_record)
    }

    async fn load_video(&self, key: &VideoKey) -> Result<Video, AppError> {
        self.store
            .get_video(key)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Video {}", key)))
    }

    async fn require_playlist(&self, id: &str) -> Result<(), AppError> {
        match self.store.get_playlist(id).await? {
            Some(_) => Ok(()),
            None => Err(AppError::NotFound(format!("Playlist {}", id))),
        }
    }
}
