use chrono::Utc;

use super::MutationEngine;
use crate::errors::AppError;
use crate::store::Playlist;

fn require_title(title: &str) -> Result<String, AppError> {
    let title = title.trim();
    if title.is_empty() {
        return Err(AppError::Validation(
            "Playlist title cannot be empty".to_string(),
        ));
    }
    Ok(title.to_string())
}

/// Move one element of a list to a new position, shifting the rest.
pub fn move_item<T: Clone>(items: &[T], from: usize, to: usize) -> Result<Vec<T>, AppError> {
    if from >= items.len() || to >= items.len() {
        return Err(AppError::Validation(format!(
            "Cannot move position {} to {} in a list of {}",
            from,
            to,
            items.len()
        )));
    }
    let mut moved = items.to_vec();
    let item = moved.remove(from);
    moved.insert(to, item);
    Ok(moved)
}

impl MutationEngine {
    /// Create a private playlist and append it after the owner's others.
    pub async fn create_playlist(
        &self,
        owner: &str,
        title: &str,
        description: &str,
    ) -> Result<Playlist, AppError> {
        let title = require_title(title)?;
        let created = self.api.create_playlist(&title, description).await?;

        let order = self
            .store
            .max_playlist_order(owner)
            .await?
            .map_or(0, |max| max + 1);

        let playlist = Playlist {
            id: created.id.clone(),
            owner: owner.to_string(),
            remote_id: created.id,
            title: created.title,
            description: created.description,
            thumbnail_url: String::new(),
            video_count: 0,
            order,
            last_synced_at: Utc::now().timestamp(),
        };
        self.store.put_playlist(&playlist).await?;

        log::info!("Created playlist {} at position {}", playlist.id, order);
        Ok(playlist)
    }

    pub async fn rename_playlist(&self, playlist_id: &str, title: &str) -> Result<(), AppError> {
        let title = require_title(title)?;
        let playlist = self.load_playlist(playlist_id).await?;

        self.api
            .rename_playlist(playlist_id, &title, &playlist.description)
            .await?;
        self.store.set_playlist_title(playlist_id, &title).await
    }

    /// Delete the remote playlist, then everything stored under it.
    pub async fn delete_playlist(&self, playlist_id: &str) -> Result<(), AppError> {
        self.load_playlist(playlist_id).await?;

        self.api.delete_playlist(playlist_id).await?;
        self.store.delete_playlist_cascade(playlist_id).await?;

        log::info!("Deleted playlist {}", playlist_id);
        Ok(())
    }

    /// Move a playlist within the displayed sequence and persist a dense
    /// 0..n-1 ranking for every displayed playlist.
    ///
    /// Returns the ids in their new order.
    pub async fn reorder_playlists(
        &self,
        displayed: &[String],
        from: usize,
        to: usize,
    ) -> Result<Vec<String>, AppError> {
        let reordered = move_item(displayed, from, to)?;
        for (order, id) in reordered.iter().enumerate() {
            self.store.set_playlist_order(id, order as i64).await?;
        }
        Ok(reordered)
    }

    /// Playlists a selection can be moved or copied into.
    pub async fn target_playlists(
        &self,
        owner: &str,
        current: &str,
    ) -> Result<Vec<Playlist>, AppError> {
        Ok(self
            .store
            .list_playlists(owner)
            .await?
            .into_iter()
            .filter(|p| p.id != current)
            .collect())
    }

    async fn load_playlist(&self, id: &str) -> Result<Playlist, AppError> {
        self.store
            .get_playlist(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Playlist {}", id)))
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{ids, synced};
    use super::*;
    use crate::remote::fake::{FakeFailure, FakePlaylistApi};
    use crate::store::VideoKey;

    fn playlists() -> FakePlaylistApi {
        FakePlaylistApi::new(10)
            .with_playlist("A", "Alpha")
            .with_playlist("B", "Beta")
            .with_playlist("C", "Gamma")
            .with_video("B", "v1", "one")
    }

    #[test]
    fn test_move_item() {
        let list = vec!['a', 'b', 'c', 'd'];
        assert_eq!(move_item(&list, 0, 2).unwrap(), vec!['b', 'c', 'a', 'd']);
        assert_eq!(move_item(&list, 3, 0).unwrap(), vec!['d', 'a', 'b', 'c']);
        assert!(matches!(move_item(&list, 4, 0), Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_create_appends_after_highest_order() {
        let (api, store, engine) = synced(playlists()).await;
        store.set_playlist_order("A", 10).await.unwrap();

        let created = engine.create_playlist("u1", "  Drills ", "mine").await.unwrap();

        assert_eq!(created.title, "Drills");
        assert_eq!(created.order, 11);
        assert_eq!(created.video_count, 0);
        assert!(api.has_playlist(&created.id));
        assert_eq!(store.get_playlist(&created.id).await.unwrap(), Some(created));
    }

    #[tokio::test]
    async fn test_create_with_blank_title_makes_no_call() {
        let (api, _store, engine) = synced(playlists()).await;
        let before = api.calls().len();
        assert!(matches!(
            engine.create_playlist("u1", "  ", "").await,
            Err(AppError::Validation(_))
        ));
        assert_eq!(api.calls().len(), before);
    }

    #[tokio::test]
    async fn test_rename_failure_keeps_local_title() {
        let (api, store, engine) = synced(playlists()).await;
        api.fail_on("rename_playlist:A", FakeFailure::Remote);
        assert!(engine.rename_playlist("A", "New").await.is_err());
        assert_eq!(store.get_playlist("A").await.unwrap().unwrap().title, "Alpha");

        api.clear_failures();
        engine.rename_playlist("A", "New").await.unwrap();
        assert_eq!(store.get_playlist("A").await.unwrap().unwrap().title, "New");
    }

    #[tokio::test]
    async fn test_delete_playlist_cascades() {
        let (api, store, engine) = synced(playlists()).await;

        engine.delete_playlist("B").await.unwrap();

        assert!(!api.has_playlist("B"));
        assert!(store.get_playlist("B").await.unwrap().is_none());
        assert!(store
            .get_video(&VideoKey::new("v1", "B"))
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_delete_playlist_remote_failure_keeps_local() {
        let (api, store, engine) = synced(playlists()).await;
        api.fail_on("delete_playlist:B", FakeFailure::Remote);

        assert!(engine.delete_playlist("B").await.is_err());
        assert!(store.get_playlist("B").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_reorder_writes_dense_ranking() {
        let (_api, store, engine) = synced(playlists()).await;
        store.set_playlist_order("C", 40).await.unwrap();

        let order = engine
            .reorder_playlists(&ids(&["A", "B", "C"]), 2, 0)
            .await
            .unwrap();
        assert_eq!(order, ids(&["C", "A", "B"]));

        let stored: Vec<_> = store
            .list_playlists("u1")
            .await
            .unwrap()
            .into_iter()
            .map(|p| (p.id, p.order))
            .collect();
        assert_eq!(
            stored,
            vec![("C".to_string(), 0), ("A".to_string(), 1), ("B".to_string(), 2)]
        );
    }

    #[tokio::test]
    async fn test_targets_exclude_current() {
        let (_api, _store, engine) = synced(playlists()).await;
        let targets: Vec<_> = engine
            .target_playlists("u1", "B")
            .await
            .unwrap()
            .into_iter()
            .map(|p| p.id)
            .collect();
        assert_eq!(targets, vec!["A", "C"]);
    }
}
