use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Tags are kept as an ordered set of lowercase strings.
pub type TagSet = BTreeSet<String>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Playlist {
    pub id: String,
    pub owner: String,
    pub remote_id: String,
    pub title: String,
    pub description: String,
    pub thumbnail_url: String,
    pub video_count: i64,
    pub order: i64,
    pub last_synced_at: i64, // unix seconds
}

/// Identifies one Video record: a video as a member of one playlist.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct VideoKey {
    pub video_id: String,
    pub playlist_id: String,
}

impl VideoKey {
    pub fn new(video_id: impl Into<String>, playlist_id: impl Into<String>) -> Self {
        Self {
            video_id: video_id.into(),
            playlist_id: playlist_id.into(),
        }
    }
}

impl std::fmt::Display for VideoKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}@{}", self.video_id, self.playlist_id)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Video {
    pub id: String,
    pub owner: String,
    pub playlist_id: String,
    pub remote_item_id: String,
    pub title: String,
    pub description: String,
    pub thumbnail_url: String,
    pub published_at: Option<i64>,
    pub tags: TagSet,
    pub notes: String,
}

impl Video {
    pub fn key(&self) -> VideoKey {
        VideoKey::new(&self.id, &self.playlist_id)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub id: String,
    pub video_id: String,
    pub playlist_id: String,
    pub start_time: f64,
    pub end_time: f64,
    pub tags: TagSet,
    pub notes: String,
    pub created_at: i64,
}

impl Segment {
    pub fn video_key(&self) -> VideoKey {
        VideoKey::new(&self.video_id, &self.playlist_id)
    }
}

/// Remote-derived playlist fields written by sync and create.
#[derive(Debug, Clone, PartialEq)]
pub struct PlaylistFields {
    pub id: String,
    pub title: String,
    pub description: String,
    pub thumbnail_url: String,
    pub video_count: i64,
}

/// Remote-derived video fields written by sync, move and copy.
#[derive(Debug, Clone, PartialEq)]
pub struct VideoFields {
    pub id: String,
    pub playlist_id: String,
    pub remote_item_id: String,
    pub title: String,
    pub description: String,
    pub thumbnail_url: String,
    pub published_at: Option<i64>,
}

impl From<&Video> for VideoFields {
    fn from(v: &Video) -> Self {
        Self {
            id: v.id.clone(),
            playlist_id: v.playlist_id.clone(),
            remote_item_id: v.remote_item_id.clone(),
            title: v.title.clone(),
            description: v.description.clone(),
            thumbnail_url: v.thumbnail_url.clone(),
            published_at: v.published_at,
        }
    }
}

/// A video together with its segments, the unit tag aggregation works on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnotatedVideo {
    pub video: Video,
    pub segments: Vec<Segment>,
}
