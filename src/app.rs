//! One entry point per user action.
//!
//! Every method here is an action boundary: it is rejected while another
//! action is running, it never panics or propagates an error, and it
//! reports an [`ActionOutcome`] carrying either the result or the message
//! to show inline. A credential rejection anywhere disconnects the session.

use std::future::Future;
use std::sync::Arc;

use crate::action::{ActionGate, ActionOutcome};
use crate::config::AppConfig;
use crate::errors::AppError;
use crate::mutations::{BatchSummary, MutationEngine, Selection};
use crate::remote::{PlaylistApi, YouTubeClient};
use crate::segments::{Player, SegmentManager, SegmentMarker, SegmentPlayback};
use crate::session::{ConnectionStatus, Session};
use crate::store::{
    AnnotationStore, Playlist, Segment, StoreQuery, Subscription, TagSet, VideoKey,
};
use crate::sync::{SyncEngine, SyncReport, SyncSummary};
use crate::view::VideoListView;

pub struct AppState {
    config: AppConfig,
    session: Session,
    store: AnnotationStore,
    sync: SyncEngine,
    mutations: MutationEngine,
    segments: SegmentManager,
    gate: ActionGate,
}

impl AppState {
    pub fn new(
        config: AppConfig,
        session: Session,
        api: Arc<dyn PlaylistApi>,
        store: AnnotationStore,
    ) -> Self {
        Self {
            sync: SyncEngine::new(api.clone(), store.clone()),
            mutations: MutationEngine::new(api, store.clone()),
            segments: SegmentManager::new(store.clone()),
            config,
            session,
            store,
            gate: ActionGate::new(),
        }
    }

    /// Open the configured database and talk to the real playlist service.
    pub async fn open(config: AppConfig, session: Session) -> Result<Self, AppError> {
        config.validate()?;
        let store = AnnotationStore::open(&config.database_path()).await?;
        let api = Arc::new(YouTubeClient::new(session.clone(), &config)?);
        Ok(Self::new(config, session, api, store))
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn store(&self) -> &AnnotationStore {
        &self.store
    }

    pub fn owner(&self) -> &str {
        self.session.owner()
    }

    pub fn connection_status(&self) -> ConnectionStatus {
        self.session.status()
    }

    pub fn is_busy(&self) -> bool {
        self.gate.is_busy()
    }

    /// Segment playback on `player`, starting at the configured speed.
    pub fn segment_playback(&self, player: Arc<dyn Player>) -> SegmentPlayback {
        player.set_playback_rate(self.config.default_playback_speed);
        SegmentPlayback::new(player)
    }

    pub fn subscribe(&self, query: StoreQuery) -> Subscription {
        self.store.subscribe(query)
    }

    pub fn playlists_query(&self) -> StoreQuery {
        StoreQuery::Playlists {
            owner: self.owner().to_string(),
        }
    }

    pub fn videos_query(&self, playlist_id: &str) -> StoreQuery {
        StoreQuery::AnnotatedVideos {
            owner: self.owner().to_string(),
            playlist_id: playlist_id.to_string(),
        }
    }

    async fn run<T, F>(&self, label: &str, action: F) -> ActionOutcome<T>
    where
        F: Future<Output = Result<T, AppError>>,
    {
        let outcome = self.gate.run(label, action).await;
        if matches!(outcome.error(), Some(AppError::CredentialExpired)) {
            self.session.disconnect();
        }
        outcome
    }

    /// Like [`run`](Self::run), for actions that call the remote service.
    /// An already elapsed credential fails before any request is made.
    async fn run_remote<T, F>(&self, label: &str, action: F) -> ActionOutcome<T>
    where
        F: Future<Output = Result<T, AppError>>,
    {
        let session = &self.session;
        self.run(label, async move {
            session.bearer()?;
            action.await
        })
        .await
    }

    // Sync

    pub async fn sync_playlists(&self) -> ActionOutcome<usize> {
        let owner = self.owner();
        self.run_remote("sync playlists", async {
            report_result(self.sync.sync_playlists(owner).await)
        })
        .await
    }

    pub async fn sync_videos(&self, playlist_id: &str) -> ActionOutcome<usize> {
        let owner = self.owner();
        self.run_remote("sync videos", async {
            report_result(self.sync.sync_videos(owner, playlist_id).await)
        })
        .await
    }

    /// Completes even when single playlists failed; the summary lists them.
    pub async fn sync_all(&self) -> ActionOutcome<SyncSummary> {
        let owner = self.owner();
        self.run_remote("sync all", async {
            let summary = self.sync.sync_all(owner).await;
            let expired = summary.failures().any(AppError::requires_reconnect);
            if expired {
                Err(AppError::CredentialExpired)
            } else {
                Ok(summary)
            }
        })
        .await
    }

    // Playlists

    pub async fn create_playlist(
        &self,
        title: &str,
        description: &str,
    ) -> ActionOutcome<Playlist> {
        self.run_remote(
            "create playlist",
            self.mutations.create_playlist(self.owner(), title, description),
        )
        .await
    }

    pub async fn rename_playlist(&self, playlist_id: &str, title: &str) -> ActionOutcome<()> {
        self.run_remote(
            "rename playlist",
            self.mutations.rename_playlist(playlist_id, title),
        )
        .await
    }

    pub async fn delete_playlist(&self, playlist_id: &str) -> ActionOutcome<()> {
        self.run_remote(
            "delete playlist",
            self.mutations.delete_playlist(playlist_id),
        )
        .await
    }

    pub async fn reorder_playlists(
        &self,
        displayed: &[String],
        from: usize,
        to: usize,
    ) -> ActionOutcome<Vec<String>> {
        self.run(
            "reorder playlists",
            self.mutations.reorder_playlists(displayed, from, to),
        )
        .await
    }

    pub async fn target_playlists(&self, current: &str) -> Result<Vec<Playlist>, AppError> {
        self.mutations.target_playlists(self.owner(), current).await
    }

    // Videos

    pub async fn delete_video(&self, key: &VideoKey) -> ActionOutcome<()> {
        self.run_remote("delete video", self.mutations.delete_video(key)).await
    }

    /// Move the confirmed selection out of the playlist on view.
    ///
    /// Moved videos disappear from the view straight away; a failure puts
    /// back whatever did not go through.
    pub async fn move_selected(
        &self,
        selection: &mut Selection,
        view: &mut VideoListView,
        target: &str,
    ) -> ActionOutcome<BatchSummary> {
        let (source, video_ids) = match confirm_selection(selection, view) {
            Ok(confirmed) => confirmed,
            Err(e) => return ActionOutcome::failed(e),
        };
        view.remove_pending(&video_ids);

        let outcome = self
            .run_remote(
                "move videos",
                self.mutations.move_videos(&source, &video_ids, target),
            )
            .await;
        finish_batch(selection, view, &outcome);
        outcome
    }

    pub async fn copy_selected(
        &self,
        selection: &mut Selection,
        view: &mut VideoListView,
        targets: &[String],
    ) -> ActionOutcome<BatchSummary> {
        let (source, video_ids) = match confirm_selection(selection, view) {
            Ok(confirmed) => confirmed,
            Err(e) => return ActionOutcome::failed(e),
        };

        let outcome = self
            .run_remote(
                "copy videos",
                self.mutations
                    .copy_videos(self.owner(), &source, &video_ids, targets),
            )
            .await;
        finish_batch(selection, view, &outcome);
        outcome
    }

    pub async fn add_video_tag(&self, key: &VideoKey, tag: &str) -> ActionOutcome<TagSet> {
        self.run("add tag", self.segments.add_video_tag(key, tag)).await
    }

    pub async fn remove_video_tag(&self, key: &VideoKey, tag: &str) -> ActionOutcome<TagSet> {
        self.run("remove tag", self.segments.remove_video_tag(key, tag))
            .await
    }

    pub async fn set_video_notes(&self, key: &VideoKey, notes: &str) -> ActionOutcome<()> {
        self.run("save notes", self.segments.set_video_notes(key, notes)).await
    }

    // Segments

    pub async fn mark_segment_end(
        &self,
        marker: &mut SegmentMarker,
        key: &VideoKey,
        time: f64,
    ) -> ActionOutcome<Segment> {
        self.run("add segment", self.segments.mark_end(marker, key, time)).await
    }

    pub async fn create_segment_manually(
        &self,
        key: &VideoKey,
        start: &str,
        end: &str,
        duration: Option<f64>,
    ) -> ActionOutcome<Segment> {
        self.run(
            "add segment",
            self.segments.manual_create(key, start, end, duration),
        )
        .await
    }

    pub async fn delete_segment(&self, segment_id: &str) -> ActionOutcome<()> {
        self.run("delete segment", self.segments.delete_segment(segment_id))
            .await
    }

    pub async fn add_segment_tag(&self, segment_id: &str, tag: &str) -> ActionOutcome<TagSet> {
        self.run(
            "add segment tag",
            self.segments.add_segment_tag(segment_id, tag),
        )
        .await
    }

    pub async fn remove_segment_tag(&self, segment_id: &str, tag: &str) -> ActionOutcome<TagSet> {
        self.run(
            "remove segment tag",
            self.segments.remove_segment_tag(segment_id, tag),
        )
        .await
    }

    pub async fn set_segment_notes(&self, segment_id: &str, notes: &str) -> ActionOutcome<()> {
        self.run(
            "save segment notes",
            self.segments.set_segment_notes(segment_id, notes),
        )
        .await
    }
}

fn report_result(report: SyncReport) -> Result<usize, AppError> {
    match report.error {
        Some(e) => Err(e),
        None => Ok(report.updated),
    }
}

fn confirm_selection(
    selection: &mut Selection,
    view: &VideoListView,
) -> Result<(String, Vec<String>), AppError> {
    let source = view
        .playlist_id()
        .ok_or_else(|| AppError::Validation("No playlist is open".to_string()))?
        .to_string();
    let video_ids = selection.confirm()?;
    Ok((source, video_ids))
}

fn finish_batch(
    selection: &mut Selection,
    view: &mut VideoListView,
    outcome: &ActionOutcome<BatchSummary>,
) {
    match outcome {
        ActionOutcome::Completed { .. } => selection.succeed(),
        ActionOutcome::Failed { message, error } => {
            let done: &[String] = match error {
                AppError::PartialBatch { succeeded, .. } => succeeded.as_slice(),
                _ => &[],
            };
            selection.fail(message.clone(), done);
            view.revert();
            view.remove_pending(done);
        }
    }
}
