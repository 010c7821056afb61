//! Reconciles the remote playlist service into the annotation store.
//!
//! Remote data is authoritative for membership and metadata; the store owns
//! order, tags, notes and segments. Sync only ever overwrites the former.

use chrono::{DateTime, Utc};
use futures_util::StreamExt;
use std::collections::HashMap;
use std::sync::Arc;

use crate::errors::AppError;
use crate::remote::pager::collect_all;
use crate::remote::{PlaylistApi, RemotePlaylist, RemotePlaylistItem};
use crate::store::{AnnotationStore, PlaylistFields, VideoFields};

#[derive(Debug, Default)]
pub struct SyncReport {
    pub updated: usize,
    pub error: Option<AppError>,
}

impl SyncReport {
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }

    fn failed(updated: usize, error: AppError) -> Self {
        Self {
            updated,
            error: Some(error),
        }
    }
}

#[derive(Debug, Default)]
pub struct SyncSummary {
    pub playlists: SyncReport,
    pub videos: Vec<(String, SyncReport)>,
}

impl SyncSummary {
    pub fn videos_updated(&self) -> usize {
        self.videos.iter().map(|(_, r)| r.updated).sum()
    }

    pub fn failures(&self) -> impl Iterator<Item = &AppError> {
        self.playlists
            .error
            .iter()
            .chain(self.videos.iter().filter_map(|(_, r)| r.error.as_ref()))
    }
}

pub struct SyncEngine {
    api: Arc<dyn PlaylistApi>,
    store: AnnotationStore,
}

impl SyncEngine {
    pub fn new(api: Arc<dyn PlaylistApi>, store: AnnotationStore) -> Self {
        Self { api, store }
    }

    /// Pull every remote playlist into the store.
    ///
    /// Known playlists keep their order. Newly discovered ones are appended
    /// after the current maximum in the order the service lists them.
    /// Playlists that vanished remotely are left alone.
    pub async fn sync_playlists(&self, owner: &str) -> SyncReport {
        let remote = match collect_all(self.api.playlist_pages()).await {
            Ok(list) => list,
            Err(e) => {
                log::warn!("Playlist sync for {} failed while listing: {}", owner, e);
                return SyncReport::failed(0, e);
            }
        };

        let existing: HashMap<String, i64> = match self.store.list_playlists(owner).await {
            Ok(list) => list.into_iter().map(|p| (p.id, p.order)).collect(),
            Err(e) => return SyncReport::failed(0, e),
        };
        let base = existing.values().copied().max().unwrap_or(-1);

        let now = Utc::now().timestamp();
        let mut appended = 0;
        let mut updated = 0;

        for playlist in &remote {
            let order = match existing.get(&playlist.id) {
                Some(order) => *order,
                None => {
                    appended += 1;
                    base + appended
                }
            };

            if let Err(e) = self
                .store
                .upsert_playlist_fields(owner, &playlist_fields(playlist), order, now)
                .await
            {
                log::warn!("Failed to store playlist {}: {}", playlist.id, e);
                return SyncReport::failed(updated, e);
            }
            updated += 1;
        }

        log::info!(
            "Synced {} playlists for {} ({} new)",
            updated,
            owner,
            appended
        );
        SyncReport {
            updated,
            error: None,
        }
    }

    /// Pull one playlist's items into the store, page by page.
    ///
    /// Each page is written as soon as it arrives, so a failure part way
    /// through keeps what was already stored.
    pub async fn sync_videos(&self, owner: &str, playlist_id: &str) -> SyncReport {
        let mut pages = self.api.playlist_item_pages(playlist_id);
        let mut updated = 0;

        while let Some(page) = pages.next().await {
            let page = match page {
                Ok(page) => page,
                Err(e) => {
                    log::warn!(
                        "Video sync for {} stopped after {} videos: {}",
                        playlist_id,
                        updated,
                        e
                    );
                    return SyncReport::failed(updated, e);
                }
            };

            log::debug!("Storing {} items of {}", page.items.len(), playlist_id);
            for item in &page.items {
                if let Err(e) = self
                    .store
                    .upsert_video_fields(owner, &video_fields(playlist_id, item))
                    .await
                {
                    return SyncReport::failed(updated, e);
                }
                updated += 1;
            }
        }

        if let Err(e) = self.finish_playlist(playlist_id).await {
            return SyncReport::failed(updated, e);
        }

        log::info!("Synced {} videos of {}", updated, playlist_id);
        SyncReport {
            updated,
            error: None,
        }
    }

    /// Playlist sync followed by a video sync of every stored playlist.
    ///
    /// Stops early when the credential is rejected, since every later call
    /// would fail the same way.
    pub async fn sync_all(&self, owner: &str) -> SyncSummary {
        let playlists = self.sync_playlists(owner).await;
        let mut summary = SyncSummary {
            playlists,
            videos: Vec::new(),
        };
        if summary
            .playlists
            .error
            .as_ref()
            .is_some_and(AppError::requires_reconnect)
        {
            return summary;
        }

        let stored = match self.store.list_playlists(owner).await {
            Ok(list) => list,
            Err(e) => {
                summary.playlists.error.get_or_insert(e);
                return summary;
            }
        };

        for playlist in stored {
            let report = self.sync_videos(owner, &playlist.id).await;
            let stop = report
                .error
                .as_ref()
                .is_some_and(AppError::requires_reconnect);
            summary.videos.push((playlist.id, report));
            if stop {
                break;
            }
        }

        summary
    }

    async fn finish_playlist(&self, playlist_id: &str) -> Result<(), AppError> {
        match self.store.recompute_video_count(playlist_id).await {
            Ok(count) => log::debug!("Playlist {} now holds {} videos", playlist_id, count),
            // Items synced ahead of their playlist record; nothing to heal yet.
            Err(AppError::NotFound(_)) => return Ok(()),
            Err(e) => return Err(e),
        }
        self.store
            .touch_playlist_synced(playlist_id, Utc::now().timestamp())
            .await
    }
}

fn playlist_fields(playlist: &RemotePlaylist) -> PlaylistFields {
    PlaylistFields {
        id: playlist.id.clone(),
        title: playlist.title.clone(),
        description: playlist.description.clone(),
        thumbnail_url: playlist.thumbnail_url.clone(),
        video_count: playlist.item_count,
    }
}

fn video_fields(playlist_id: &str, item: &RemotePlaylistItem) -> VideoFields {
    VideoFields {
        id: item.video_id.clone(),
        playlist_id: playlist_id.to_string(),
        remote_item_id: item.item_id.clone(),
        title: item.title.clone(),
        description: item.description.clone(),
        thumbnail_url: item.thumbnail_url.clone(),
        published_at: item.published_at.as_deref().and_then(parse_published_at),
    }
}

fn parse_published_at(raw: &str) -> Option<i64> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.timestamp())
        .map_err(|e| log::debug!("Ignoring unparseable publish date '{}': {}", raw, e))
        .ok()
}
