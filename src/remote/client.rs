use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::json;
use std::time::Duration;

use super::models::*;
use super::PlaylistApi;
use crate::config::AppConfig;
use crate::errors::AppError;
use crate::session::Session;

/// HTTP client for the hosted playlist service.
///
/// Holds no state beyond the shared [`Session`]; an auth rejection
/// disconnects that session before the error is returned.
pub struct YouTubeClient {
    client: Client,
    session: Session,
    base_url: String,
    page_size: u32,
}

impl YouTubeClient {
    pub fn new(session: Session, config: &AppConfig) -> Result<Self, AppError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_seconds))
            .user_agent(concat!("reelmark/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            session,
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
            page_size: config.page_size,
        })
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.client
            .request(method, format!("{}/{}", self.base_url, path))
    }

    async fn send(&self, request: RequestBuilder, operation: &str) -> Result<Response, AppError> {
        let token = self.session.bearer()?;

        log::debug!("Sending {} request", operation);
        let response = request.bearer_auth(token).send().await?;
        let status = response.status();

        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            log::warn!("{} rejected with {}, disconnecting", operation, status);
            self.session.disconnect();
            return Err(AppError::CredentialExpired);
        }

        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            log::warn!("{} failed ({}): {}", operation, status, text);
            return Err(AppError::RemoteApi(format!(
                "{} failed: HTTP {}",
                operation,
                status.as_u16()
            )));
        }

        Ok(response)
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        operation: &str,
    ) -> Result<T, AppError> {
        let response = self.send(request, operation).await?;
        response
            .json::<T>()
            .await
            .map_err(|e| AppError::RemoteApi(format!("{}: invalid response: {}", operation, e)))
    }

    fn paged_query<'a>(
        &self,
        params: &mut Vec<(&'a str, String)>,
        page_token: Option<String>,
    ) {
        params.push(("maxResults", self.page_size.to_string()));
        if let Some(token) = page_token {
            params.push(("pageToken", token));
        }
    }
}

#[async_trait]
impl PlaylistApi for YouTubeClient {
    async fn list_playlists_page(
        &self,
        page_token: Option<String>,
    ) -> Result<Page<RemotePlaylist>, AppError> {
        let mut params = vec![
            ("part", "snippet,contentDetails".to_string()),
            ("mine", "true".to_string()),
        ];
        self.paged_query(&mut params, page_token);

        let resp: ApiListResponse<ApiPlaylist> = self
            .send_json(
                self.request(Method::GET, "playlists").query(&params),
                "list_playlists",
            )
            .await?;

        Ok(Page {
            items: resp.items.into_iter().map(RemotePlaylist::from).collect(),
            next_page_token: resp.next_page_token,
        })
    }

    async fn list_playlist_items_page(
        &self,
        playlist_id: &str,
        page_token: Option<String>,
    ) -> Result<Page<RemotePlaylistItem>, AppError> {
        let mut params = vec![
            ("part", "snippet,contentDetails".to_string()),
            ("playlistId", playlist_id.to_string()),
        ];
        self.paged_query(&mut params, page_token);

        let resp: ApiListResponse<ApiPlaylistItem> = self
            .send_json(
                self.request(Method::GET, "playlistItems").query(&params),
                "list_playlist_items",
            )
            .await?;

        Ok(Page {
            items: resp
                .items
                .into_iter()
                .filter_map(ApiPlaylistItem::into_remote)
                .collect(),
            next_page_token: resp.next_page_token,
        })
    }

    async fn create_playlist(
        &self,
        title: &str,
        description: &str,
    ) -> Result<CreatedPlaylist, AppError> {
        let body = json!({
            "snippet": { "title": title, "description": description },
            "status": { "privacyStatus": "private" }
        });

        let created: ApiInsertedResource = self
            .send_json(
                self.request(Method::POST, "playlists")
                    .query(&[("part", "snippet,status")])
                    .json(&body),
                "create_playlist",
            )
            .await?;

        log::info!("Created remote playlist {}", created.id);
        Ok(CreatedPlaylist {
            id: created.id,
            title: created.snippet.title,
            description: created.snippet.description,
        })
    }

    async fn rename_playlist(
        &self,
        playlist_id: &str,
        title: &str,
        description: &str,
    ) -> Result<(), AppError> {
        let body = json!({
            "id": playlist_id,
            "snippet": { "title": title, "description": description }
        });

        self.send(
            self.request(Method::PUT, "playlists")
                .query(&[("part", "snippet")])
                .json(&body),
            "rename_playlist",
        )
        .await?;
        Ok(())
    }

    async fn delete_playlist(&self, playlist_id: &str) -> Result<(), AppError> {
        self.send(
            self.request(Method::DELETE, "playlists")
                .query(&[("id", playlist_id)]),
            "delete_playlist",
        )
        .await?;
        Ok(())
    }

    async fn add_item(&self, playlist_id: &str, video_id: &str) -> Result<String, AppError> {
        let body = json!({
            "snippet": {
                "playlistId": playlist_id,
                "resourceId": { "kind": "youtube#video", "videoId": video_id }
            }
        });

        let inserted: ApiInsertedResource = self
            .send_json(
                self.request(Method::POST, "playlistItems")
                    .query(&[("part", "snippet")])
                    .json(&body),
                "add_item",
            )
            .await?;
        Ok(inserted.id)
    }

    async fn remove_item(&self, item_id: &str) -> Result<(), AppError> {
        self.send(
            self.request(Method::DELETE, "playlistItems")
                .query(&[("id", item_id)]),
            "remove_item",
        )
        .await?;
        Ok(())
    }
}
