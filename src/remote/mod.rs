pub mod client;
pub mod models;
pub mod pager;

#[cfg(test)]
pub(crate) mod fake;

pub use client::YouTubeClient;
pub use models::{CreatedPlaylist, Page, RemotePlaylist, RemotePlaylistItem};

use async_trait::async_trait;
use futures_util::stream::{BoxStream, StreamExt};

use crate::errors::AppError;

/// Request/response contract of the external playlist service.
///
/// Implementations must report an auth rejection as
/// [`AppError::CredentialExpired`] and every other failure as
/// [`AppError::RemoteApi`].
#[async_trait]
pub trait PlaylistApi: Send + Sync {
    /// One page of the signed-in account's playlists.
    async fn list_playlists_page(
        &self,
        page_token: Option<String>,
    ) -> Result<Page<RemotePlaylist>, AppError>;

    /// One page of a playlist's items.
    async fn list_playlist_items_page(
        &self,
        playlist_id: &str,
        page_token: Option<String>,
    ) -> Result<Page<RemotePlaylistItem>, AppError>;

    async fn create_playlist(
        &self,
        title: &str,
        description: &str,
    ) -> Result<CreatedPlaylist, AppError>;

    async fn rename_playlist(
        &self,
        playlist_id: &str,
        title: &str,
        description: &str,
    ) -> Result<(), AppError>;

    async fn delete_playlist(&self, playlist_id: &str) -> Result<(), AppError>;

    /// Add a video to a playlist, returning the new playlist item id.
    async fn add_item(&self, playlist_id: &str, video_id: &str) -> Result<String, AppError>;

    async fn remove_item(&self, item_id: &str) -> Result<(), AppError>;

    fn playlist_pages(&self) -> BoxStream<'_, Result<Page<RemotePlaylist>, AppError>> {
        pager::paginate(move |token| self.list_playlists_page(token)).boxed()
    }

    fn playlist_item_pages<'a>(
        &'a self,
        playlist_id: &'a str,
    ) -> BoxStream<'a, Result<Page<RemotePlaylistItem>, AppError>> {
        pager::paginate(move |token| self.list_playlist_items_page(playlist_id, token)).boxed()
    }
}
