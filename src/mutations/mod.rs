//! User-driven changes that must land on both the remote service and the
//! annotation store.
//!
//! The remote call always goes first; local state only changes once the
//! service has accepted the change. Batches run one video at a time and stop
//! at the first failure without rolling back what already succeeded.

mod playlists;
mod selection;
mod videos;

pub use playlists::move_item;
pub use selection::{Selection, SelectionPhase};

use serde::Serialize;
use std::sync::Arc;

use crate::errors::{AppError, BatchOperation};
use crate::remote::PlaylistApi;
use crate::store::AnnotationStore;

pub struct MutationEngine {
    api: Arc<dyn PlaylistApi>,
    store: AnnotationStore,
}

impl MutationEngine {
    pub fn new(api: Arc<dyn PlaylistApi>, store: AnnotationStore) -> Self {
        Self { api, store }
    }

    /// Apply a count delta after the records have changed. A failure here
    /// only leaves drift that the next video sync recomputes.
    async fn adjust_count(&self, playlist_id: &str, delta: i64) {
        if delta == 0 {
            return;
        }
        if let Err(e) = self.store.adjust_video_count(playlist_id, delta).await {
            log::warn!(
                "Could not adjust video count of {} by {}: {}",
                playlist_id,
                delta,
                e
            );
        }
    }
}

/// What a completed move or copy did.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchSummary {
    pub operation: BatchOperation,
    pub videos: Vec<String>,
    pub playlists: usize,
}

impl BatchSummary {
    /// The confirmation shown once the batch went through.
    pub fn notice(&self) -> String {
        let videos = plural(self.videos.len(), "video");
        match self.operation {
            BatchOperation::Move => format!("Successfully moved {}", videos),
            BatchOperation::Copy => format!(
                "Successfully copied {} to {}",
                videos,
                plural(self.playlists, "playlist")
            ),
        }
    }
}

fn plural(count: usize, noun: &str) -> String {
    if count == 1 {
        format!("1 {}", noun)
    } else {
        format!("{} {}s", count, noun)
    }
}

/// Close out a batch that stopped on `error` after `succeeded` went through.
///
/// Credential problems are passed through untouched so the caller can prompt
/// for a reconnect.
fn batch_failure(
    operation: BatchOperation,
    succeeded: Vec<String>,
    failed: &str,
    error: AppError,
) -> AppError {
    if error.requires_reconnect() {
        return error;
    }
    AppError::PartialBatch {
        operation,
        succeeded,
        failed: failed.to_string(),
        reason: error.to_string(),
    }
}

fn require_selection(video_ids: &[String]) -> Result<(), AppError> {
    if video_ids.is_empty() {
        return Err(AppError::Validation(
            "Select at least one video".to_string(),
        ));
    }
    Ok(())
}
