use anyhow::Context;
use std::env;

use reelmark::action::ActionOutcome;
use reelmark::config::{ACCESS_TOKEN_ENV, OWNER_ENV};
use reelmark::store::Snapshot;
use reelmark::view::visible_playlists;
use reelmark::{AppConfig, AppState, Session};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = AppConfig::load().context("failed to load configuration")?;
    let owner = env::var(OWNER_ENV).with_context(|| format!("{} is not set", OWNER_ENV))?;
    let token = env::var(ACCESS_TOKEN_ENV)
        .with_context(|| format!("{} is not set", ACCESS_TOKEN_ENV))?;

    let session = Session::new(owner);
    session.connect(token, None);

    let app = AppState::open(config, session).await?;

    match app.sync_all().await {
        ActionOutcome::Completed { value: summary } => {
            log::info!(
                "Sync finished: {} playlists, {} videos",
                summary.playlists.updated,
                summary.videos_updated()
            );
            for error in summary.failures() {
                log::warn!("{}", error.user_message());
            }
        }
        ActionOutcome::Failed { message, .. } => anyhow::bail!(message),
    }

    let mut playlists = app.subscribe(app.playlists_query());
    if let Some(Snapshot::Playlists(list)) = playlists.next().await.transpose()? {
        for playlist in visible_playlists(&list, app.config().show_empty_playlists) {
            println!("{:>5}  {}", playlist.video_count, playlist.title);
        }
    }

    Ok(())
}
