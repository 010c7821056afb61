//! Display state held between store snapshots.
//!
//! Optimistic edits go into the `pending` half of a [`Tracked`] value and are
//! replaced wholesale by the next confirmed snapshot from the store. Loads
//! carry a [`Ticket`] so a response for a playlist the user already left is
//! dropped.

use serde::Serialize;

use crate::action::{Epoch, Ticket};
use crate::errors::AppError;
use crate::mutations::move_item;
use crate::store::{AnnotatedVideo, Playlist};
use crate::tags::{vocabulary, TagFilter};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Tracked<T> {
    confirmed: T,
    pending: Option<T>,
}

impl<T> Tracked<T> {
    pub fn new(confirmed: T) -> Self {
        Self {
            confirmed,
            pending: None,
        }
    }

    /// The value to display: pending if there is one.
    pub fn current(&self) -> &T {
        self.pending.as_ref().unwrap_or(&self.confirmed)
    }

    pub fn confirmed(&self) -> &T {
        &self.confirmed
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    pub fn set_pending(&mut self, value: T) {
        self.pending = Some(value);
    }

    /// A confirmed value always wins over whatever is pending.
    pub fn confirm(&mut self, value: T) {
        self.confirmed = value;
        self.pending = None;
    }

    pub fn revert(&mut self) {
        self.pending = None;
    }
}

impl<T: Default> Default for Tracked<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

/// Playlists to list; empty ones only when `show_empty` is on.
pub fn visible_playlists(playlists: &[Playlist], show_empty: bool) -> Vec<&Playlist> {
    playlists
        .iter()
        .filter(|p| show_empty || p.video_count > 0)
        .collect()
}

#[derive(Debug, Default)]
pub struct PlaylistListView {
    playlists: Tracked<Vec<Playlist>>,
    show_empty: bool,
}

impl PlaylistListView {
    pub fn new(show_empty: bool) -> Self {
        Self {
            playlists: Tracked::default(),
            show_empty,
        }
    }

    pub fn visible(&self) -> Vec<&Playlist> {
        visible_playlists(self.playlists.current(), self.show_empty)
    }

    pub fn visible_ids(&self) -> Vec<String> {
        self.visible().into_iter().map(|p| p.id.clone()).collect()
    }

    pub fn apply_snapshot(&mut self, playlists: Vec<Playlist>) {
        self.playlists.confirm(playlists);
    }

    /// Show a drag result before it is persisted. Positions index the
    /// visible list.
    pub fn reorder_pending(&mut self, from: usize, to: usize) -> Result<Vec<String>, AppError> {
        let ids = move_item(&self.visible_ids(), from, to)?;

        let mut reordered = self.playlists.current().clone();
        for playlist in reordered.iter_mut() {
            if let Some(rank) = ids.iter().position(|id| *id == playlist.id) {
                playlist.order = rank as i64;
            }
        }
        reordered.sort_by_key(|p| p.order);
        self.playlists.set_pending(reordered);
        Ok(ids)
    }

    pub fn revert(&mut self) {
        self.playlists.revert();
    }
}

/// The video collection of the playlist being viewed.
#[derive(Debug, Default)]
pub struct VideoListView {
    playlist_id: Option<String>,
    videos: Tracked<Vec<AnnotatedVideo>>,
    filter: TagFilter,
    epoch: Epoch,
}

impl VideoListView {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn playlist_id(&self) -> Option<&str> {
        self.playlist_id.as_deref()
    }

    /// Switch to another playlist. Responses issued for earlier playlists
    /// will be refused.
    pub fn open(&mut self, playlist_id: &str) -> Ticket {
        self.playlist_id = Some(playlist_id.to_string());
        self.videos = Tracked::default();
        self.filter.clear();
        self.epoch.advance()
    }

    /// A fresh load of the current playlist, invalidating loads in flight.
    pub fn reload(&self) -> Ticket {
        self.epoch.advance()
    }

    /// Returns false when the response is stale and was ignored.
    pub fn apply_loaded(&mut self, ticket: Ticket, videos: Vec<AnnotatedVideo>) -> bool {
        if !self.epoch.is_current(ticket) {
            log::debug!("Dropping stale video list response");
            return false;
        }
        self.videos.confirm(videos);
        true
    }

    /// Hide videos that are being moved or deleted.
    pub fn remove_pending(&mut self, video_ids: &[String]) {
        let remaining = self
            .videos
            .current()
            .iter()
            .filter(|v| !video_ids.contains(&v.video.id))
            .cloned()
            .collect();
        self.videos.set_pending(remaining);
    }

    pub fn revert(&mut self) {
        self.videos.revert();
    }

    pub fn videos(&self) -> &[AnnotatedVideo] {
        self.videos.current()
    }

    pub fn filter(&self) -> &TagFilter {
        &self.filter
    }

    pub fn filter_mut(&mut self) -> &mut TagFilter {
        &mut self.filter
    }

    pub fn visible(&self) -> Vec<&AnnotatedVideo> {
        self.filter.apply(self.videos.current())
    }

    pub fn vocabulary(&self) -> Vec<String> {
        vocabulary(self.videos.current())
    }
}
