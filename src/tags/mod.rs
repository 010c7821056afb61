//! Tag normalisation, aggregation and filtering.
//!
//! A video's effective tags are its own tags plus the tags of all of its
//! segments. The vocabulary of a collection is the sorted union of those.

use serde::Serialize;

use crate::store::{AnnotatedVideo, TagSet};

/// Trim and lowercase a user-entered tag. Blank input yields `None`.
pub fn normalize_tag(raw: &str) -> Option<String> {
    let tag = raw.trim().to_lowercase();
    (!tag.is_empty()).then_some(tag)
}

/// Returns the updated set, or `None` when there is nothing to add.
pub fn with_tag(tags: &TagSet, raw: &str) -> Option<TagSet> {
    let tag = normalize_tag(raw)?;
    if tags.contains(&tag) {
        return None;
    }
    let mut updated = tags.clone();
    updated.insert(tag);
    Some(updated)
}

/// Returns the updated set, or `None` when the tag was not present.
pub fn without_tag(tags: &TagSet, raw: &str) -> Option<TagSet> {
    let tag = normalize_tag(raw)?;
    if !tags.contains(&tag) {
        return None;
    }
    let mut updated = tags.clone();
    updated.remove(&tag);
    Some(updated)
}

pub fn effective_tags(video: &AnnotatedVideo) -> TagSet {
    let mut tags = video.video.tags.clone();
    for segment in &video.segments {
        tags.extend(segment.tags.iter().cloned());
    }
    tags
}

/// Every distinct effective tag in the collection, lexicographically sorted.
pub fn vocabulary<'a>(videos: impl IntoIterator<Item = &'a AnnotatedVideo>) -> Vec<String> {
    let mut all = TagSet::new();
    for video in videos {
        all.extend(effective_tags(video));
    }
    all.into_iter().collect()
}

/// Which videos a collection view shows.
///
/// The two modes are exclusive: choosing tags clears "untagged only" and
/// the other way round.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TagFilter {
    selected: TagSet,
    untagged_only: bool,
}

impl TagFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn selected(&self) -> &TagSet {
        &self.selected
    }

    pub fn untagged_only(&self) -> bool {
        self.untagged_only
    }

    pub fn is_active(&self) -> bool {
        self.untagged_only || !self.selected.is_empty()
    }

    pub fn toggle_tag(&mut self, tag: &str) {
        let Some(tag) = normalize_tag(tag) else {
            return;
        };
        if !self.selected.remove(&tag) {
            self.selected.insert(tag);
        }
        self.untagged_only = false;
    }

    pub fn toggle_untagged(&mut self) {
        self.untagged_only = !self.untagged_only;
        if self.untagged_only {
            self.selected.clear();
        }
    }

    pub fn clear(&mut self) {
        self.selected.clear();
        self.untagged_only = false;
    }

    /// "Untagged" looks at the video's own tags only; tag selection matches
    /// any effective tag.
    pub fn matches(&self, video: &AnnotatedVideo) -> bool {
        if self.untagged_only {
            return video.video.tags.is_empty();
        }
        if self.selected.is_empty() {
            return true;
        }
        effective_tags(video)
            .iter()
            .any(|tag| self.selected.contains(tag))
    }

    pub fn apply<'a>(&self, videos: &'a [AnnotatedVideo]) -> Vec<&'a AnnotatedVideo> {
        videos.iter().filter(|v| self.matches(v)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{Segment, Video};

    fn set(tags: &[&str]) -> TagSet {
        tags.iter().map(|s| s.to_string()).collect()
    }

    fn annotated(id: &str, own: &[&str], segment_tags: &[&[&str]]) -> AnnotatedVideo {
        AnnotatedVideo {
            video: Video {
                id: id.to_string(),
                owner: "u1".to_string(),
                playlist_id: "PL1".to_string(),
                remote_item_id: String::new(),
                title: id.to_string(),
                description: String::new(),
                thumbnail_url: String::new(),
                published_at: None,
                tags: set(own),
                notes: String::new(),
            },
            segments: segment_tags
                .iter()
                .enumerate()
                .map(|(i, tags)| Segment {
                    id: format!("{}-s{}", id, i),
                    video_id: id.to_string(),
                    playlist_id: "PL1".to_string(),
                    start_time: i as f64,
                    end_time: i as f64 + 1.0,
                    tags: set(tags),
                    notes: String::new(),
                    created_at: 0,
                })
                .collect(),
        }
    }

    fn ids(videos: Vec<&AnnotatedVideo>) -> Vec<&str> {
        videos.into_iter().map(|v| v.video.id.as_str()).collect()
    }

    #[test]
    fn test_normalize_trims_and_lowercases() {
        assert_eq!(normalize_tag("  Footwork ").as_deref(), Some("footwork"));
        assert_eq!(normalize_tag("   "), None);
    }

    #[test]
    fn test_adding_existing_tag_is_noop() {
        let tags = set(&["spin"]);
        assert_eq!(with_tag(&tags, " SPIN"), None);
        assert_eq!(with_tag(&tags, " "), None);
        assert_eq!(with_tag(&tags, "turn"), Some(set(&["spin", "turn"])));
        assert_eq!(without_tag(&tags, "Spin"), Some(TagSet::new()));
        assert_eq!(without_tag(&tags, "other"), None);
    }

    #[test]
    fn test_effective_tags_and_vocabulary() {
        let a = annotated("a", &["x"], &[&["y"], &["x", "z"]]);
        let b = annotated("b", &[], &[&["w"]]);

        assert_eq!(effective_tags(&a), set(&["x", "y", "z"]));
        assert_eq!(vocabulary([&a, &b]), vec!["w", "x", "y", "z"]);
    }

    #[test]
    fn test_tag_filter_matches_any_effective_tag() {
        let videos = vec![
            annotated("a", &["x"], &[]),
            annotated("b", &[], &[&["y"]]),
            annotated("c", &["z"], &[]),
        ];
        let mut filter = TagFilter::new();
        assert_eq!(ids(filter.apply(&videos)), vec!["a", "b", "c"]);

        filter.toggle_tag("x");
        filter.toggle_tag("Y");
        assert_eq!(ids(filter.apply(&videos)), vec!["a", "b"]);

        filter.toggle_tag("x");
        assert_eq!(ids(filter.apply(&videos)), vec!["b"]);
    }

    #[test]
    fn test_untagged_uses_own_tags_and_clears_selection() {
        // "b" has segment tags but no tags of its own.
        let videos = vec![annotated("a", &["x"], &[]), annotated("b", &[], &[&["y"]])];
        let mut filter = TagFilter::new();
        filter.toggle_tag("x");

        filter.toggle_untagged();
        assert!(filter.selected().is_empty());
        assert_eq!(ids(filter.apply(&videos)), vec!["b"]);

        filter.toggle_tag("x");
        assert!(!filter.untagged_only());
        assert_eq!(ids(filter.apply(&videos)), vec!["a"]);
    }
}
