use tokio::sync::broadcast;
use tokio::sync::broadcast::error::{RecvError, TryRecvError};

use super::{AnnotatedVideo, AnnotationStore, Playlist, Segment, StoreChange, Video, VideoKey};
use crate::errors::AppError;

/// A live query over the store.
#[derive(Debug, Clone, PartialEq)]
pub enum StoreQuery {
    Playlists { owner: String },
    Videos { owner: String, playlist_id: String },
    AnnotatedVideos { owner: String, playlist_id: String },
    Segments(VideoKey),
}

impl StoreQuery {
    fn matches(&self, change: &StoreChange) -> bool {
        match (self, change) {
            (StoreQuery::Playlists { owner }, StoreChange::Playlists { owner: changed }) => {
                owner == changed
            }
            (
                StoreQuery::Videos { owner, playlist_id },
                StoreChange::Videos {
                    owner: changed_owner,
                    playlist_id: changed_playlist,
                },
            )
            | (
                StoreQuery::AnnotatedVideos { owner, playlist_id },
                StoreChange::Videos {
                    owner: changed_owner,
                    playlist_id: changed_playlist,
                },
            ) => owner == changed_owner && playlist_id == changed_playlist,
            (StoreQuery::AnnotatedVideos { playlist_id, .. }, StoreChange::Segments { key }) => {
                *playlist_id == key.playlist_id
            }
            (StoreQuery::Segments(key), StoreChange::Segments { key: changed }) => key == changed,
            _ => false,
        }
    }
}

/// The full result of a [`StoreQuery`] at one point in time.
#[derive(Debug, Clone, PartialEq)]
pub enum Snapshot {
    Playlists(Vec<Playlist>),
    Videos(Vec<Video>),
    AnnotatedVideos(Vec<AnnotatedVideo>),
    Segments(Vec<Segment>),
}

impl AnnotationStore {
    pub async fn snapshot(&self, query: &StoreQuery) -> Result<Snapshot, AppError> {
        Ok(match query {
            StoreQuery::Playlists { owner } => {
                Snapshot::Playlists(self.list_playlists(owner).await?)
            }
            StoreQuery::Videos { owner, playlist_id } => {
                Snapshot::Videos(self.list_videos(owner, playlist_id).await?)
            }
            StoreQuery::AnnotatedVideos { owner, playlist_id } => {
                Snapshot::AnnotatedVideos(self.list_annotated_videos(owner, playlist_id).await?)
            }
            StoreQuery::Segments(key) => Snapshot::Segments(self.list_segments(key).await?),
        })
    }
}

/// Emits the current snapshot of a query, then a fresh one after every
/// matching write. Dropping the subscription releases it.
pub struct Subscription {
    store: AnnotationStore,
    query: StoreQuery,
    changes: broadcast::Receiver<StoreChange>,
    primed: bool,
}

impl Subscription {
    pub(super) fn new(
        store: AnnotationStore,
        query: StoreQuery,
        changes: broadcast::Receiver<StoreChange>,
    ) -> Self {
        Self {
            store,
            query,
            changes,
            primed: false,
        }
    }

    pub fn query(&self) -> &StoreQuery {
        &self.query
    }

    /// Wait for the next snapshot. Returns `None` if the change feed closes.
    pub async fn next(&mut self) -> Option<Result<Snapshot, AppError>> {
        if !self.primed {
            self.primed = true;
            return Some(self.store.snapshot(&self.query).await);
        }

        loop {
            match self.changes.recv().await {
                Ok(change) if self.query.matches(&change) => break,
                Ok(_) => continue,
                Err(RecvError::Lagged(skipped)) => {
                    log::debug!("Subscription lagged by {} changes, refreshing", skipped);
                    break;
                }
                Err(RecvError::Closed) => return None,
            }
        }

        // Collapse a burst of writes into one refresh.
        while let Ok(_) | Err(TryRecvError::Lagged(_)) = self.changes.try_recv() {}

        Some(self.store.snapshot(&self.query).await)
    }
}
