use std::time::Instant;

use stageconfig::StageConfig;
use tracing::{debug, info};

use crate::catalog::{Catalog, ExerciseEntry};
use crate::crossfade::{PlaybackState, Sequencer, SequencerTiming};
use crate::fade::FadeCurve;
use crate::layout::{LayoutController, ViewMode};
use crate::media::{Player, Rendition};
use crate::notify::SelectionNotifier;
use crate::{SequencerError, StageEvent};

#[derive(Debug, Clone, PartialEq)]
pub struct SlotFrame {
    pub index: usize,
    pub rendition: Rendition,
    pub uri: String,
    pub opacity: f32,
}

/// What the presentation layer should draw at one instant.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub view: ViewMode,
    pub layout_opacity: f32,
    pub video: Vec<SlotFrame>,
    pub webcam_feed: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageStatus {
    pub playback: PlaybackState,
    pub label: String,
    pub view: ViewMode,
    pub layout_pending: Option<ViewMode>,
}

/// The fitness demo screen: exercise sequencer plus layout controller.
///
/// Every operation takes the current instant; nothing in here sleeps.
pub struct Stage<P: Player> {
    sequencer: Sequencer<P>,
    layout: LayoutController,
    webcam_feed: String,
    closed: bool,
}

impl<P: Player> Stage<P> {
    pub fn new<F>(config: &StageConfig, mount: F) -> Result<Self, SequencerError>
    where
        F: FnMut(&ExerciseEntry, Rendition) -> P,
    {
        let catalog = Catalog::from_config(config)?;
        let curve = FadeCurve::from(config.timing.curve);
        let timing = SequencerTiming {
            exercise_fade: config.timing.exercise_fade,
            rendition_fade: config.timing.rendition_fade,
            curve,
        };
        info!(
            exercises = catalog.len(),
            fade_ms = timing.exercise_fade.as_millis() as u64,
            "stage mounted"
        );
        Ok(Self {
            sequencer: Sequencer::new(catalog, timing, mount),
            layout: LayoutController::new(config.timing.layout_transition, curve),
            webcam_feed: config.webcam_feed_url(),
            closed: false,
        })
    }

    pub fn with_notifier(mut self, notifier: Box<dyn SelectionNotifier>) -> Self {
        self.sequencer.set_notifier(notifier);
        self
    }

    pub fn catalog(&self) -> &Catalog {
        self.sequencer.catalog()
    }

    pub fn sequencer(&self) -> &Sequencer<P> {
        &self.sequencer
    }

    pub fn sequencer_mut(&mut self) -> &mut Sequencer<P> {
        &mut self.sequencer
    }

    pub fn layout(&self) -> &LayoutController {
        &self.layout
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn select(&mut self, index: usize, now: Instant) -> Result<Vec<StageEvent>, SequencerError> {
        if self.closed {
            return Err(SequencerError::ShutDown);
        }
        self.sequencer.select(index, now)
    }

    pub fn select_id(&mut self, id: &str, now: Instant) -> Result<Vec<StageEvent>, SequencerError> {
        if self.closed {
            return Err(SequencerError::ShutDown);
        }
        let index = self
            .catalog()
            .position(id)
            .ok_or_else(|| SequencerError::UnknownExerciseId(id.to_string()))?;
        self.select(index, now)
    }

    pub fn clip_ended(&mut self, now: Instant) -> Vec<StageEvent> {
        if self.closed {
            return Vec::new();
        }
        self.sequencer.clip_ended(now)
    }

    pub fn toggle_rendition(&mut self, now: Instant) -> Vec<StageEvent> {
        if self.closed {
            return Vec::new();
        }
        self.sequencer.toggle_rendition(now)
    }

    pub fn cycle_layout(&mut self, now: Instant) -> Vec<StageEvent> {
        if self.closed {
            return Vec::new();
        }
        self.layout.request_cycle(now).into_iter().collect()
    }

    pub fn back(&self) -> StageEvent {
        self.layout.back()
    }

    pub fn tick(&mut self, now: Instant) -> Vec<StageEvent> {
        if self.closed {
            return Vec::new();
        }
        let mut events = self.sequencer.tick(now);
        events.extend(self.layout.tick(now));
        events
    }

    pub fn status(&self) -> StageStatus {
        let playback = self.sequencer.state();
        let label = self
            .catalog()
            .get(playback.active)
            .map(|entry| entry.label.clone())
            .unwrap_or_default();
        StageStatus {
            playback,
            label,
            view: self.layout.view(),
            layout_pending: self.layout.pending(),
        }
    }

    pub fn frame(&self, now: Instant) -> Frame {
        let view = self.layout.view();
        let regions = view.regions();
        let video = if regions.video {
            self.sequencer
                .opacities(now)
                .into_iter()
                .filter_map(|(index, rendition, opacity)| {
                    let slot = self.sequencer.slot(index, rendition)?;
                    Some(SlotFrame {
                        index,
                        rendition,
                        uri: slot.uri().to_string(),
                        opacity,
                    })
                })
                .collect()
        } else {
            Vec::new()
        };
        Frame {
            view,
            layout_opacity: self.layout.opacity(now),
            video,
            webcam_feed: regions.webcam.then(|| self.webcam_feed.clone()),
        }
    }

    /// Stops playback and invalidates anything still in flight.
    pub fn shutdown(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        self.sequencer.shutdown();
        debug!("stage shut down");
    }
}

impl<P: Player> Drop for Stage<P> {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::mpsc;
    use std::time::Duration;

    use super::*;
    use crate::media::testing::FakePlayer;
    use crate::notify::{SyncOutcome, SyncReply};

    const FADE: Duration = Duration::from_millis(330);

    struct ChannelNotifier {
        replies: mpsc::Sender<SyncReply>,
    }

    impl SelectionNotifier for ChannelNotifier {
        fn dispatch(&self, reply: SyncReply) {
            self.replies.send(reply).unwrap();
        }
    }

    fn stage() -> Stage<FakePlayer> {
        Stage::new(&StageConfig::default(), |entry, rendition| {
            FakePlayer::new(entry.source(rendition))
        })
        .unwrap()
    }

    #[test]
    fn plank_selection_with_slow_success() {
        let (tx, rx) = mpsc::channel();
        let mut stage = stage().with_notifier(Box::new(ChannelNotifier { replies: tx }));
        let start = Instant::now();

        stage.select_id("plank", start).unwrap();
        assert_eq!(stage.status().playback.fading_to, Some(2));

        let reply = rx.try_recv().expect("notification dispatched");
        assert_eq!(reply.label(), "Plank");
        stage.tick(start + FADE);
        assert_eq!(stage.status().playback.active, 0);

        reply.resolve(SyncOutcome::Delivered);
        stage.tick(start + Duration::from_millis(500));
        let status = stage.status();
        assert_eq!(status.playback.active, 2);
        assert_eq!(status.playback.fading_to, None);
        assert_eq!(status.label, "Plank");
    }

    #[test]
    fn plank_selection_with_fast_failure() {
        let (tx, rx) = mpsc::channel();
        let mut stage = stage().with_notifier(Box::new(ChannelNotifier { replies: tx }));
        let start = Instant::now();

        stage.select(2, start).unwrap();
        rx.try_recv()
            .unwrap()
            .resolve(SyncOutcome::Failed("503 Service Unavailable".into()));
        stage.tick(start + Duration::from_millis(100));
        assert_eq!(stage.status().playback.active, 0);
        stage.tick(start + FADE);
        assert_eq!(stage.status().playback.active, 2);
    }

    #[test]
    fn unknown_id_is_an_error() {
        let mut stage = stage();
        assert!(matches!(
            stage.select_id("burpees", Instant::now()),
            Err(SequencerError::UnknownExerciseId(_))
        ));
    }

    #[test]
    fn axes_run_independently() {
        let mut stage = stage();
        let start = Instant::now();
        stage.select(1, start).unwrap();
        assert_eq!(stage.toggle_rendition(start).len(), 1);
        assert_eq!(stage.cycle_layout(start).len(), 1);

        let events = stage.tick(start + FADE);
        assert!(events.contains(&StageEvent::ExerciseChanged { index: 1 }));
        assert!(events.contains(&StageEvent::LayoutChanged {
            view: ViewMode::VideoOnly
        }));
        let status = stage.status();
        assert_eq!(status.playback.rendition, Rendition::Raw);
        assert_eq!(status.view, ViewMode::VideoOnly);
    }

    #[test]
    fn toggle_mid_fade_keeps_target_and_position() {
        let mut stage = stage();
        let start = Instant::now();
        let seq = stage.sequencer_mut();
        seq.slot_mut(0, Rendition::Processed).unwrap().player_mut().position = Duration::from_secs(3);
        let stale = seq.slot_mut(1, Rendition::Raw).unwrap().player_mut();
        stale.position = Duration::from_secs(12);
        stale.ended = true;

        stage.select_id("pushups", start).unwrap();
        let halfway = start + Duration::from_millis(165);
        stage
            .sequencer_mut()
            .slot_mut(1, Rendition::Processed)
            .unwrap()
            .player_mut()
            .position = Duration::from_millis(165);
        assert_eq!(
            stage.toggle_rendition(halfway),
            [StageEvent::RenditionChanged {
                rendition: Rendition::Raw
            }]
        );

        let outgoing_raw = stage.sequencer().slot(0, Rendition::Raw).unwrap();
        assert_eq!(outgoing_raw.position(), Duration::from_secs(3));
        let incoming_raw = stage.sequencer().slot(1, Rendition::Raw).unwrap();
        assert_eq!(incoming_raw.position(), Duration::from_millis(165));
        assert!(!incoming_raw.ended());

        let events = stage.tick(start + FADE);
        assert_eq!(events, [StageEvent::ExerciseChanged { index: 1 }]);
        let status = stage.status();
        assert_eq!(status.playback.active, 1);
        assert_eq!(status.playback.fading_to, None);
        assert_eq!(status.label, "Pushups");
    }

    #[test]
    fn frame_follows_layout_regions() {
        let mut stage = stage();
        let start = Instant::now();
        let frame = stage.frame(start);
        assert_eq!(frame.view, ViewMode::Split);
        assert_eq!(frame.video.len(), 1);
        assert_eq!(frame.video[0].uri, "videos/squats_processed.mp4");
        assert_eq!(
            frame.webcam_feed.as_deref(),
            Some("http://localhost:5001/video_feed")
        );

        stage.cycle_layout(start);
        stage.tick(start + FADE);
        let frame = stage.frame(start + FADE);
        assert_eq!(frame.webcam_feed, None);
        assert_eq!(frame.video.len(), 1);

        stage.cycle_layout(start + FADE);
        stage.tick(start + FADE * 2);
        let frame = stage.frame(start + FADE * 2);
        assert!(frame.video.is_empty());
        assert!(frame.webcam_feed.is_some());
    }

    #[test]
    fn back_leaves_state_untouched() {
        let stage = stage();
        let before = stage.status();
        assert_eq!(
            stage.back(),
            StageEvent::Navigate(crate::NavigationIntent::Back)
        );
        assert_eq!(stage.status(), before);
    }

    #[test]
    fn shutdown_stops_playback_and_rejects_requests() {
        let mut stage = stage();
        let now = Instant::now();
        stage.shutdown();
        assert!(stage.is_closed());
        assert!(!stage
            .sequencer()
            .slot(0, Rendition::Processed)
            .unwrap()
            .player()
            .playing);
        assert!(matches!(
            stage.select(1, now),
            Err(SequencerError::ShutDown)
        ));
        assert!(matches!(
            stage.select_id("burpees", now),
            Err(SequencerError::ShutDown)
        ));
        assert!(stage.toggle_rendition(now).is_empty());
        assert!(stage.tick(now).is_empty());
    }
}
