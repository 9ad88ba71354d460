use std::fmt;
use std::time::{Duration, Instant};

use tracing::debug;

use crate::fade::{mix_at, FadeCurve};
use crate::StageEvent;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ViewMode {
    #[default]
    Split,
    VideoOnly,
    WebcamOnly,
}

/// Which screen regions a view mode shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Regions {
    pub video: bool,
    pub webcam: bool,
}

impl ViewMode {
    pub fn next(self) -> Self {
        match self {
            ViewMode::Split => ViewMode::VideoOnly,
            ViewMode::VideoOnly => ViewMode::WebcamOnly,
            ViewMode::WebcamOnly => ViewMode::Split,
        }
    }

    pub fn regions(self) -> Regions {
        match self {
            ViewMode::Split => Regions {
                video: true,
                webcam: true,
            },
            ViewMode::VideoOnly => Regions {
                video: true,
                webcam: false,
            },
            ViewMode::WebcamOnly => Regions {
                video: false,
                webcam: true,
            },
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ViewMode::Split => "split",
            ViewMode::VideoOnly => "video",
            ViewMode::WebcamOnly => "webcam",
        }
    }
}

impl fmt::Display for ViewMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outward requests for the host's router.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavigationIntent {
    Back,
}

#[derive(Debug, Clone, Copy)]
enum LayoutAxis {
    Idle { applied_at: Option<Instant> },
    Transitioning { next: ViewMode, started_at: Instant },
}

/// Cycles split / video-only / webcam-only, fading out before the swap and
/// back in afterwards.
#[derive(Debug)]
pub struct LayoutController {
    view: ViewMode,
    axis: LayoutAxis,
    transition: Duration,
    curve: FadeCurve,
}

impl LayoutController {
    pub fn new(transition: Duration, curve: FadeCurve) -> Self {
        Self {
            view: ViewMode::default(),
            axis: LayoutAxis::Idle { applied_at: None },
            transition,
            curve,
        }
    }

    pub fn view(&self) -> ViewMode {
        self.view
    }

    pub fn is_transitioning(&self) -> bool {
        matches!(self.axis, LayoutAxis::Transitioning { .. })
    }

    /// The target mode while a transition is in flight.
    pub fn pending(&self) -> Option<ViewMode> {
        match self.axis {
            LayoutAxis::Transitioning { next, .. } => Some(next),
            LayoutAxis::Idle { .. } => None,
        }
    }

    pub fn request_cycle(&mut self, now: Instant) -> Option<StageEvent> {
        if self.is_transitioning() {
            debug!(view = %self.view, "layout transition already in flight; ignoring request");
            return None;
        }
        let next = self.view.next();
        self.axis = LayoutAxis::Transitioning {
            next,
            started_at: now,
        };
        debug!(from = %self.view, to = %next, "layout transition started");
        Some(StageEvent::LayoutChanging { next })
    }

    pub fn tick(&mut self, now: Instant) -> Option<StageEvent> {
        let LayoutAxis::Transitioning { next, started_at } = self.axis else {
            return None;
        };
        if now.saturating_duration_since(started_at) < self.transition {
            return None;
        }
        self.view = next;
        self.axis = LayoutAxis::Idle {
            applied_at: Some(now),
        };
        debug!(view = %next, "layout applied");
        Some(StageEvent::LayoutChanged { view: next })
    }

    /// Overall opacity of the layout: fades to black before the swap, then back in.
    pub fn opacity(&self, now: Instant) -> f32 {
        match self.axis {
            LayoutAxis::Transitioning { started_at, .. } => {
                mix_at(self.transition, self.curve, started_at, now).outgoing
            }
            LayoutAxis::Idle {
                applied_at: Some(applied_at),
            } => mix_at(self.transition, self.curve, applied_at, now).incoming,
            LayoutAxis::Idle { applied_at: None } => 1.0,
        }
    }

    pub fn back(&self) -> StageEvent {
        StageEvent::Navigate(NavigationIntent::Back)
    }
}
