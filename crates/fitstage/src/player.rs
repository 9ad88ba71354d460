use std::time::{Duration, Instant};

use sequencer::{MediaError, Player};

/// Wall-clock stand-in for a video element: position advances while playing
/// and stops at the clip length.
#[derive(Debug)]
pub struct SimulatedPlayer {
    uri: String,
    clip_length: Duration,
    offset: Duration,
    playing_since: Option<Instant>,
    reject: bool,
}

impl SimulatedPlayer {
    pub fn new(uri: impl Into<String>, clip_length: Duration, reject: bool) -> Self {
        Self {
            uri: uri.into(),
            clip_length,
            offset: Duration::ZERO,
            playing_since: None,
            reject,
        }
    }

    pub fn is_playing(&self) -> bool {
        self.playing_since.is_some()
    }
}

impl Player for SimulatedPlayer {
    fn play(&mut self) -> Result<(), MediaError> {
        if self.reject {
            return Err(MediaError::Rejected {
                uri: self.uri.clone(),
                reason: "simulated autoplay rejection".into(),
            });
        }
        if self.playing_since.is_none() {
            self.playing_since = Some(Instant::now());
        }
        Ok(())
    }

    fn pause(&mut self) {
        self.offset = self.position();
        self.playing_since = None;
    }

    fn position(&self) -> Duration {
        let running = self
            .playing_since
            .map(|since| since.elapsed())
            .unwrap_or_default();
        (self.offset + running).min(self.clip_length)
    }

    fn seek(&mut self, position: Duration) {
        self.offset = position.min(self.clip_length);
        if self.playing_since.is_some() {
            self.playing_since = Some(Instant::now());
        }
    }

    fn ended(&self) -> bool {
        self.position() >= self.clip_length
    }
}
