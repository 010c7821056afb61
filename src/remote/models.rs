use serde::{Deserialize, Serialize};

/// One page of a paginated remote listing.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub next_page_token: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemotePlaylist {
    pub id: String,
    pub title: String,
    pub description: String,
    pub thumbnail_url: String,
    pub item_count: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemotePlaylistItem {
    pub item_id: String,
    pub video_id: String,
    pub title: String,
    pub description: String,
    pub thumbnail_url: String,
    /// RFC 3339 timestamp as reported by the service.
    pub published_at: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreatedPlaylist {
    pub id: String,
    pub title: String,
    pub description: String,
}

// Wire format of the playlist service (YouTube Data API v3).

#[derive(Debug, Deserialize)]
pub(crate) struct ApiListResponse<T> {
    #[serde(default = "Vec::new")]
    pub items: Vec<T>,
    #[serde(rename = "nextPageToken")]
    pub next_page_token: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct ApiThumbnail {
    #[serde(default)]
    pub url: String,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct ApiThumbnails {
    pub medium: Option<ApiThumbnail>,
    pub default: Option<ApiThumbnail>,
}

impl ApiThumbnails {
    fn best_url(self) -> String {
        self.medium
            .or(self.default)
            .map(|t| t.url)
            .unwrap_or_default()
    }
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct ApiSnippet {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub thumbnails: ApiThumbnails,
    #[serde(rename = "publishedAt")]
    pub published_at: Option<String>,
    #[serde(rename = "resourceId")]
    pub resource_id: Option<ApiResourceId>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ApiResourceId {
    #[serde(rename = "videoId")]
    pub video_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct ApiContentDetails {
    #[serde(rename = "itemCount")]
    pub item_count: Option<i64>,
    #[serde(rename = "videoId")]
    pub video_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ApiPlaylist {
    pub id: String,
    #[serde(default)]
    pub snippet: ApiSnippet,
    #[serde(rename = "contentDetails", default)]
    pub content_details: ApiContentDetails,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ApiPlaylistItem {
    pub id: String,
    #[serde(default)]
    pub snippet: ApiSnippet,
    #[serde(rename = "contentDetails", default)]
    pub content_details: ApiContentDetails,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ApiInsertedResource {
    pub id: String,
    #[serde(default)]
    pub snippet: ApiSnippet,
}

impl From<ApiPlaylist> for RemotePlaylist {
    fn from(p: ApiPlaylist) -> Self {
        Self {
            id: p.id,
            title: p.snippet.title,
            description: p.snippet.description,
            thumbnail_url: p.snippet.thumbnails.best_url(),
            item_count: p.content_details.item_count.unwrap_or(0),
        }
    }
}

impl ApiPlaylistItem {
    /// Items whose video id is missing (deleted or private videos) are dropped.
    pub(crate) fn into_remote(self) -> Option<RemotePlaylistItem> {
        let video_id = self
            .snippet
            .resource_id
            .and_then(|r| r.video_id)
            .or(self.content_details.video_id)?;

        Some(RemotePlaylistItem {
            item_id: self.id,
            video_id,
            title: self.snippet.title,
            description: self.snippet.description,
            thumbnail_url: self.snippet.thumbnails.best_url(),
            published_at: self.snippet.published_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_playlist_from_wire() {
        let raw = serde_json::json!({
            "items": [{
                "id": "PL1",
                "snippet": {
                    "title": "Drills",
                    "description": "footwork",
                    "thumbnails": { "default": { "url": "d.jpg" }, "medium": { "url": "m.jpg" } }
                },
                "contentDetails": { "itemCount": 7 }
            }],
            "nextPageToken": "CAUQAA"
        });

        let resp: ApiListResponse<ApiPlaylist> = serde_json::from_value(raw).unwrap();
        assert_eq!(resp.next_page_token.as_deref(), Some("CAUQAA"));

        let playlist: RemotePlaylist = resp.items.into_iter().next().unwrap().into();
        assert_eq!(playlist.id, "PL1");
        assert_eq!(playlist.thumbnail_url, "m.jpg");
        assert_eq!(playlist.item_count, 7);
    }

    #[test]
    fn test_item_without_video_is_dropped() {
        let raw = serde_json::json!({
            "items": [
                {
                    "id": "item-1",
                    "snippet": {
                        "title": "Clip",
                        "publishedAt": "2024-03-01T10:00:00Z",
                        "resourceId": { "kind": "youtube#video", "videoId": "vid1" }
                    }
                },
                { "id": "item-2", "snippet": { "title": "Deleted video" } }
            ]
        });

        let resp: ApiListResponse<ApiPlaylistItem> = serde_json::from_value(raw).unwrap();
        let items: Vec<_> = resp
            .items
            .into_iter()
            .filter_map(ApiPlaylistItem::into_remote)
            .collect();

        assert_eq!(items.len(), 1);
        assert_eq!(items[0].video_id, "vid1");
        assert_eq!(items[0].thumbnail_url, "");
        assert_eq!(items[0].published_at.as_deref(), Some("2024-03-01T10:00:00Z"));
    }
}
