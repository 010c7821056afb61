//! Scripted in-process playlist service for tests.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap};

use super::models::*;
use super::PlaylistApi;
use crate::errors::AppError;

#[derive(Debug, Clone, Copy)]
pub enum FakeFailure {
    Remote,
    Expired,
}

impl FakeFailure {
    fn to_error(self, key: &str) -> AppError {
        match self {
            FakeFailure::Remote => AppError::RemoteApi(format!("{} failed: HTTP 500", key)),
            FakeFailure::Expired => AppError::CredentialExpired,
        }
    }
}

#[derive(Default)]
struct FakeState {
    playlists: Vec<RemotePlaylist>,
    items: BTreeMap<String, Vec<RemotePlaylistItem>>,
    failures: HashMap<String, FakeFailure>,
    calls: Vec<String>,
    next_id: u64,
}

/// Failure keys: `list_playlists:<page>`, `list_items:<playlist>:<page>`,
/// `create_playlist:<title>`, `rename_playlist:<id>`, `delete_playlist:<id>`,
/// `add_item:<playlist>:<video>`, `remove_item:<item>`.
pub struct FakePlaylistApi {
    page_size: usize,
    state: Mutex<FakeState>,
}

impl Default for FakePlaylistApi {
    fn default() -> Self {
        Self::new(2)
    }
}

impl FakePlaylistApi {
    pub fn new(page_size: usize) -> Self {
        Self {
            page_size,
            state: Mutex::new(FakeState::default()),
        }
    }

    pub fn with_playlist(self, id: &str, title: &str) -> Self {
        self.state.lock().playlists.push(RemotePlaylist {
            id: id.to_string(),
            title: title.to_string(),
            description: String::new(),
            thumbnail_url: format!("https://img.test/{}.jpg", id),
            item_count: 0,
        });
        self
    }

    pub fn with_video(self, playlist_id: &str, video_id: &str, title: &str) -> Self {
        self.push_video(playlist_id, video_id, title);
        self
    }

    pub fn push_video(&self, playlist_id: &str, video_id: &str, title: &str) -> String {
        let mut state = self.state.lock();
        state.next_id += 1;
        let item_id = format!("item-{}", state.next_id);
        state
            .items
            .entry(playlist_id.to_string())
            .or_default()
            .push(RemotePlaylistItem {
                item_id: item_id.clone(),
                video_id: video_id.to_string(),
                title: title.to_string(),
                description: String::new(),
                thumbnail_url: format!("https://img.test/{}.jpg", video_id),
                published_at: Some("2024-01-02T03:04:05Z".to_string()),
            });
        if let Some(p) = state.playlists.iter_mut().find(|p| p.id == playlist_id) {
            p.item_count += 1;
        }
        item_id
    }

    pub fn set_video_title(&self, playlist_id: &str, video_id: &str, title: &str) {
        let mut state = self.state.lock();
        if let Some(items) = state.items.get_mut(playlist_id) {
            for item in items.iter_mut().filter(|i| i.video_id == video_id) {
                item.title = title.to_string();
            }
        }
    }

    pub fn reverse_playlists(&self) {
        self.state.lock().playlists.reverse();
    }

    pub fn fail_on(&self, key: &str, failure: FakeFailure) {
        self.state.lock().failures.insert(key.to_string(), failure);
    }

    pub fn clear_failures(&self) {
        self.state.lock().failures.clear();
    }

    pub fn calls(&self) -> Vec<String> {
        self.state.lock().calls.clone()
    }

    pub fn item_ids(&self, playlist_id: &str) -> Vec<String> {
        self.state
            .lock()
            .items
            .get(playlist_id)
            .map(|items| items.iter().map(|i| i.item_id.clone()).collect())
            .unwrap_or_default()
    }

    pub fn video_ids(&self, playlist_id: &str) -> Vec<String> {
        self.state
            .lock()
            .items
            .get(playlist_id)
            .map(|items| items.iter().map(|i| i.video_id.clone()).collect())
            .unwrap_or_default()
    }

    pub fn has_playlist(&self, playlist_id: &str) -> bool {
        self.state.lock().playlists.iter().any(|p| p.id == playlist_id)
    }

    fn enter(&self, key: String) -> Result<parking_lot::MutexGuard<'_, FakeState>, AppError> {
        let mut state = self.state.lock();
        state.calls.push(key.clone());
        if let Some(failure) = state.failures.get(&key) {
            return Err(failure.to_error(&key));
        }
        Ok(state)
    }

    fn page_of<T: Clone>(&self, all: &[T], token: Option<String>) -> Page<T> {
        let index: usize = token.and_then(|t| t.parse().ok()).unwrap_or(0);
        let start = index * self.page_size;
        let end = (start + self.page_size).min(all.len());
        let items = all.get(start..end).map(|s| s.to_vec()).unwrap_or_default();
        Page {
            items,
            next_page_token: (end < all.len()).then(|| (index + 1).to_string()),
        }
    }
}

fn page_label(token: &Option<String>) -> String {
    token.clone().unwrap_or_else(|| "0".to_string())
}

#[async_trait]
impl PlaylistApi for FakePlaylistApi {
    async fn list_playlists_page(
        &self,
        page_token: Option<String>,
    ) -> Result<Page<RemotePlaylist>, AppError> {
        let state = self.enter(format!("list_playlists:{}", page_label(&page_token)))?;
        Ok(self.page_of(&state.playlists, page_token))
    }

    async fn list_playlist_items_page(
        &self,
        playlist_id: &str,
        page_token: Option<String>,
    ) -> Result<Page<RemotePlaylistItem>, AppError> {
        let state = self.enter(format!(
            "list_items:{}:{}",
            playlist_id,
            page_label(&page_token)
        ))?;
        let items = state.items.get(playlist_id).cloned().unwrap_or_default();
        Ok(self.page_of(&items, page_token))
    }

    async fn create_playlist(
        &self,
        title: &str,
        description: &str,
    ) -> Result<CreatedPlaylist, AppError> {
        let mut state = self.enter(format!("create_playlist:{}", title))?;
        state.next_id += 1;
        let id = format!("PLnew{}", state.next_id);
        state.playlists.push(RemotePlaylist {
            id: id.clone(),
            title: title.to_string(),
            description: description.to_string(),
            thumbnail_url: String::new(),
            item_count: 0,
        });
        Ok(CreatedPlaylist {
            id,
            title: title.to_string(),
            description: description.to_string(),
        })
    }

    async fn rename_playlist(
        &self,
        playlist_id: &str,
        title: &str,
        description: &str,
    ) -> Result<(), AppError> {
        let mut state = self.enter(format!("rename_playlist:{}", playlist_id))?;
        let playlist = state
            .playlists
            .iter_mut()
            .find(|p| p.id == playlist_id)
            .ok_or_else(|| AppError::RemoteApi("HTTP 404".to_string()))?;
        playlist.title = title.to_string();
        playlist.description = description.to_string();
        Ok(())
    }

    async fn delete_playlist(&self, playlist_id: &str) -> Result<(), AppError> {
        let mut state = self.enter(format!("delete_playlist:{}", playlist_id))?;
        state.playlists.retain(|p| p.id != playlist_id);
        state.items.remove(playlist_id);
        Ok(())
    }

    async fn add_item(&self, playlist_id: &str, video_id: &str) -> Result<String, AppError> {
        drop(self.enter(format!("add_item:{}:{}", playlist_id, video_id))?);
        let title = {
            let state = self.state.lock();
            state
                .items
                .values()
                .flatten()
                .find(|i| i.video_id == video_id)
                .map(|i| i.title.clone())
                .unwrap_or_default()
        };
        Ok(self.push_video(playlist_id, video_id, &title))
    }

    async fn remove_item(&self, item_id: &str) -> Result<(), AppError> {
        let mut state = self.enter(format!("remove_item:{}", item_id))?;
        let mut owner = None;
        for (playlist_id, items) in state.items.iter_mut() {
            let before = items.len();
            items.retain(|i| i.item_id != item_id);
            if items.len() != before {
                owner = Some(playlist_id.clone());
            }
        }
        match owner {
            Some(playlist_id) => {
                if let Some(p) = state.playlists.iter_mut().find(|p| p.id == playlist_id) {
                    p.item_count -= 1;
                }
                Ok(())
            }
            None => Err(AppError::RemoteApi("HTTP 404".to_string())),
        }
    }
}
