use std::fmt;
use std::time::Duration;

use tracing::{debug, warn};

/// One of the two encodings of an exercise clip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Rendition {
    /// Footage with the pose overlay burned in.
    #[default]
    Processed,
    Raw,
}

impl Rendition {
    pub const ALL: [Rendition; 2] = [Rendition::Processed, Rendition::Raw];

    pub fn other(self) -> Self {
        match self {
            Rendition::Processed => Rendition::Raw,
            Rendition::Raw => Rendition::Processed,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Rendition::Processed => "processed",
            Rendition::Raw => "raw",
        }
    }
}

impl fmt::Display for Rendition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MediaError {
    #[error("playback of '{uri}' was rejected: {reason}")]
    Rejected { uri: String, reason: String },
    #[error("media '{0}' is unavailable")]
    Unavailable(String),
}

/// Host playback seam. Implementations wrap whatever actually decodes the clip.
pub trait Player {
    fn play(&mut self) -> Result<(), MediaError>;
    fn pause(&mut self);
    fn position(&self) -> Duration;
    fn seek(&mut self, position: Duration);
    fn ended(&self) -> bool;
}

/// A mounted source plus its visibility. Visible slots play, hidden slots pause.
pub struct MediaSlot<P> {
    uri: String,
    rendition: Rendition,
    visible: bool,
    player: P,
}

impl<P: Player> MediaSlot<P> {
    pub fn new(uri: impl Into<String>, rendition: Rendition, player: P) -> Self {
        Self {
            uri: uri.into(),
            rendition,
            visible: false,
            player,
        }
    }

    pub fn uri(&self) -> &str {
        &self.uri
    }

    pub fn rendition(&self) -> Rendition {
        self.rendition
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    /// Playback failures here are not fatal; the slot stays visible and the
    /// failure is only logged.
    pub fn set_visible(&mut self, visible: bool) {
        if self.visible == visible {
            return;
        }
        self.visible = visible;
        if visible {
            if let Err(err) = self.player.play() {
                warn!(uri = %self.uri, rendition = %self.rendition, %err, "media slot failed to start");
            } else {
                debug!(uri = %self.uri, rendition = %self.rendition, "media slot playing");
            }
        } else {
            self.player.pause();
            debug!(uri = %self.uri, rendition = %self.rendition, "media slot paused");
        }
    }

    /// Starts playback and reports the outcome; only marks the slot visible on success.
    pub fn start(&mut self) -> Result<(), MediaError> {
        self.player.play()?;
        self.visible = true;
        Ok(())
    }

    /// Rewinds to the beginning and plays again if the slot is on screen.
    pub fn restart(&mut self) {
        self.player.seek(Duration::ZERO);
        if !self.visible {
            return;
        }
        if let Err(err) = self.player.play() {
            warn!(uri = %self.uri, %err, "media slot failed to restart");
        }
    }

    pub fn position(&self) -> Duration {
        self.player.position()
    }

    pub fn seek(&mut self, position: Duration) {
        self.player.seek(position);
    }

    pub fn ended(&self) -> bool {
        self.player.ended()
    }

    pub fn player(&self) -> &P {
        &self.player
    }

    pub fn player_mut(&mut self) -> &mut P {
        &mut self.player
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;

    /// Deterministic player: position only moves when a test says so.
    #[derive(Debug, Default)]
    pub struct FakePlayer {
        pub uri: String,
        pub playing: bool,
        pub position: Duration,
        pub ended: bool,
        pub reject: bool,
        pub play_calls: usize,
    }

    impl FakePlayer {
        pub fn new(uri: &str) -> Self {
            Self {
                uri: uri.to_string(),
                ..Self::default()
            }
        }
    }

    impl Player for FakePlayer {
        fn play(&mut self) -> Result<(), MediaError> {
            self.play_calls += 1;
            if self.reject {
                return Err(MediaError::Rejected {
                    uri: self.uri.clone(),
                    reason: "autoplay blocked".into(),
                });
            }
            self.playing = true;
            self.ended = false;
            Ok(())
        }

        fn pause(&mut self) {
            self.playing = false;
        }

        fn position(&self) -> Duration {
            self.position
        }

        fn seek(&mut self, position: Duration) {
            self.position = position;
            self.ended = false;
        }

        fn ended(&self) -> bool {
            self.ended
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::FakePlayer;
    use super::*;

    #[test]
    fn visibility_drives_playback() {
        let mut slot = MediaSlot::new("a.mp4", Rendition::Processed, FakePlayer::new("a.mp4"));
        slot.set_visible(true);
        assert!(slot.player().playing);
        slot.set_visible(true);
        assert_eq!(slot.player().play_calls, 1, "unchanged visibility must not replay");
        slot.set_visible(false);
        assert!(!slot.player().playing);
    }

    #[test]
    fn rejected_autoplay_is_swallowed() {
        let mut player = FakePlayer::new("a.mp4");
        player.reject = true;
        let mut slot = MediaSlot::new("a.mp4", Rendition::Raw, player);
        slot.set_visible(true);
        assert!(slot.is_visible());
        assert!(!slot.player().playing);
    }

    #[test]
    fn failed_start_keeps_slot_hidden() {
        let mut player = FakePlayer::new("a.mp4");
        player.reject = true;
        let mut slot = MediaSlot::new("a.mp4", Rendition::Raw, player);
        assert!(matches!(slot.start(), Err(MediaError::Rejected { .. })));
        assert!(!slot.is_visible());
    }

    #[test]
    fn rendition_other_flips() {
        assert_eq!(Rendition::Processed.other(), Rendition::Raw);
        assert_eq!(Rendition::Raw.other(), Rendition::Processed);
        assert_eq!(Rendition::default(), Rendition::Processed);
    }
}
