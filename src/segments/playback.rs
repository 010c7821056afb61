//! Playing a single segment of a video.
//!
//! The embedded player is reached through [`Player`]. Stopping at a
//! segment's end is a one-shot timer armed for the remaining media time
//! divided by the playback rate. Seeking or changing speed re-arms it.
//! Changing speed must go through [`SegmentPlayback::set_speed`].

use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

use crate::errors::AppError;
use crate::store::Segment;

/// Control surface of the embedded video player.
pub trait Player: Send + Sync + 'static {
    /// Current media position in seconds.
    fn current_time(&self) -> f64;
    fn playback_rate(&self) -> f64;
    fn set_playback_rate(&self, rate: f64);
    fn seek_to(&self, seconds: f64);
    fn play(&self);
    fn pause(&self);
}

struct StopTimer {
    end_time: f64,
    handle: JoinHandle<()>,
}

/// Must be used from within a Tokio runtime.
pub struct SegmentPlayback {
    player: Arc<dyn Player>,
    timer: Mutex<Option<StopTimer>>,
}

impl SegmentPlayback {
    pub fn new(player: Arc<dyn Player>) -> Self {
        Self {
            player,
            timer: Mutex::new(None),
        }
    }

    /// Seek to the segment's start, play, and pause at its end.
    pub fn play_segment(&self, segment: &Segment) {
        log::debug!(
            "Playing segment {} ({:.1}s to {:.1}s)",
            segment.id,
            segment.start_time,
            segment.end_time
        );
        self.player.seek_to(segment.start_time);
        self.player.play();
        self.arm(segment.end_time);
    }

    /// Change the playback speed, keeping a running segment's stop on time.
    pub fn set_speed(&self, rate: f64) -> Result<(), AppError> {
        if !rate.is_finite() || rate <= 0.0 {
            return Err(AppError::Validation(format!(
                "Invalid playback speed {}",
                rate
            )));
        }
        self.player.set_playback_rate(rate);
        self.rearm();
        Ok(())
    }

    /// Call after the user seeks while a segment is playing.
    pub fn on_seek(&self) {
        self.rearm();
    }

    /// Forget the current segment without touching the player.
    pub fn cancel(&self) {
        if let Some(timer) = self.timer.lock().take() {
            timer.handle.abort();
        }
    }

    pub fn is_active(&self) -> bool {
        self.timer
            .lock()
            .as_ref()
            .is_some_and(|timer| !timer.handle.is_finished())
    }

    fn rearm(&self) {
        let end_time = match self.timer.lock().as_ref() {
            Some(timer) if !timer.handle.is_finished() => timer.end_time,
            _ => return,
        };
        self.arm(end_time);
    }

    fn arm(&self, end_time: f64) {
        let rate = self.player.playback_rate();
        let rate = if rate.is_finite() && rate > 0.0 { rate } else { 1.0 };
        let remaining = (end_time - self.player.current_time()) / rate;
        // Past the end, or a position the player could not report.
        let delay = Duration::try_from_secs_f64(remaining).unwrap_or(Duration::ZERO);

        let player = self.player.clone();
        let handle = tokio::spawn(async move {
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            player.pause();
        });

        let previous = self.timer.lock().replace(StopTimer { end_time, handle });
        if let Some(previous) = previous {
            previous.handle.abort();
        }
    }
}

impl Drop for SegmentPlayback {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::TagSet;

    #[derive(Default)]
    struct FakePlayerState {
        time: f64,
        rate: f64,
        playing: bool,
        pauses: usize,
    }

    #[derive(Default)]
    struct FakePlayer {
        state: Mutex<FakePlayerState>,
    }

    impl FakePlayer {
        fn new() -> Arc<Self> {
            let player = Self::default();
            player.state.lock().rate = 1.0;
            Arc::new(player)
        }

        fn playing(&self) -> bool {
            self.state.lock().playing
        }

        fn pauses(&self) -> usize {
            self.state.lock().pauses
        }
    }

    impl Player for FakePlayer {
        fn current_time(&self) -> f64 {
            self.state.lock().time
        }

        fn playback_rate(&self) -> f64 {
            self.state.lock().rate
        }

        fn set_playback_rate(&self, rate: f64) {
            self.state.lock().rate = rate;
        }

        fn seek_to(&self, seconds: f64) {
            self.state.lock().time = seconds;
        }

        fn play(&self) {
            self.state.lock().playing = true;
        }

        fn pause(&self) {
            let mut state = self.state.lock();
            state.playing = false;
            state.pauses += 1;
        }
    }

    fn segment(start: f64, end: f64) -> Segment {
        Segment {
            id: "s1".to_string(),
            video_id: "v1".to_string(),
            playlist_id: "PL1".to_string(),
            start_time: start,
            end_time: end,
            tags: TagSet::new(),
            notes: String::new(),
            created_at: 0,
        }
    }

    async fn advance(seconds: f64) {
        tokio::time::sleep(Duration::from_secs_f64(seconds)).await;
        tokio::task::yield_now().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_pauses_at_segment_end() {
        let player = FakePlayer::new();
        let playback = SegmentPlayback::new(player.clone());

        playback.play_segment(&segment(10.0, 20.0));
        assert_eq!(player.current_time(), 10.0);
        assert!(player.playing());

        advance(9.9).await;
        assert!(player.playing());
        advance(0.2).await;
        assert!(!player.playing());
        assert!(!playback.is_active());
    }

    #[tokio::test(start_paused = true)]
    async fn test_faster_rate_stops_sooner() {
        let player = FakePlayer::new();
        player.set_playback_rate(2.0);
        let playback = SegmentPlayback::new(player.clone());

        playback.play_segment(&segment(0.0, 10.0));
        advance(5.1).await;
        assert!(!player.playing());
    }

    #[tokio::test(start_paused = true)]
    async fn test_speed_change_mid_segment() {
        let player = FakePlayer::new();
        let playback = SegmentPlayback::new(player.clone());
        playback.play_segment(&segment(0.0, 10.0));

        assert!(playback.set_speed(0.0).is_err());
        playback.set_speed(0.5).unwrap();

        advance(19.9).await;
        assert!(player.playing());
        advance(0.2).await;
        assert!(!player.playing());
    }

    #[tokio::test(start_paused = true)]
    async fn test_seek_rearms_timer() {
        let player = FakePlayer::new();
        let playback = SegmentPlayback::new(player.clone());
        playback.play_segment(&segment(10.0, 20.0));

        advance(2.0).await;
        player.seek_to(15.0);
        playback.on_seek();

        advance(4.9).await;
        assert!(player.playing());
        advance(0.2).await;
        assert!(!player.playing());

        advance(10.0).await;
        assert_eq!(player.pauses(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_seek_past_end_pauses_immediately() {
        let player = FakePlayer::new();
        let playback = SegmentPlayback::new(player.clone());
        playback.play_segment(&segment(10.0, 20.0));

        player.seek_to(25.0);
        playback.on_seek();
        tokio::task::yield_now().await;

        assert!(!player.playing());
    }

    #[tokio::test(start_paused = true)]
    async fn test_unreported_position_pauses_immediately() {
        let player = FakePlayer::new();
        let playback = SegmentPlayback::new(player.clone());
        playback.play_segment(&segment(10.0, 20.0));

        player.seek_to(f64::NAN);
        playback.on_seek();
        tokio::task::yield_now().await;
        assert!(!player.playing());

        // Too far away to wait for.
        playback.play_segment(&segment(0.0, 1e300));
        assert!(player.playing());
        tokio::task::yield_now().await;
        assert!(!player.playing());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_leaves_player_running() {
        let player = FakePlayer::new();
        let playback = SegmentPlayback::new(player.clone());
        playback.play_segment(&segment(0.0, 5.0));

        playback.cancel();
        advance(10.0).await;

        assert!(player.playing());
        assert_eq!(player.pauses(), 0);
        // A seek after cancelling must not resurrect the timer.
        playback.on_seek();
        assert!(!playback.is_active());
    }
}
