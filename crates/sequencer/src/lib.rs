//! Exercise demonstration sequencing: which clip is on screen, which
//! rendition of it is shown, and how the screen is laid out.

mod catalog;
mod crossfade;
mod fade;
mod layout;
mod media;
mod notify;
mod stage;

pub use catalog::{Catalog, ExerciseEntry};
pub use crossfade::{AdvanceCause, PlaybackState, Sequencer, SequencerTiming};
pub use fade::{mix_at, FadeCurve, FadeEnvelope, Mix};
pub use layout::{LayoutController, NavigationIntent, Regions, ViewMode};
pub use media::{MediaError, MediaSlot, Player, Rendition};
pub use notify::{RequestId, SelectionNotifier, SyncOutcome, SyncReply, SyncReport};
pub use stage::{Frame, SlotFrame, Stage, StageStatus};

#[derive(Debug, thiserror::Error)]
pub enum SequencerError {
    #[error("catalog must contain at least one exercise")]
    EmptyCatalog,
    #[error("exercise {field} '{value}' appears more than once in the catalog")]
    DuplicateExercise { field: &'static str, value: String },
    #[error("exercise index {index} is out of range for a catalog of {len}")]
    UnknownExercise { index: usize, len: usize },
    #[error("exercise '{0}' not found in catalog")]
    UnknownExerciseId(String),
    #[error("stage has been shut down")]
    ShutDown,
}

/// Something the host may want to react to or render.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StageEvent {
    FadeStarted {
        from: usize,
        to: usize,
        cause: AdvanceCause,
    },
    ExerciseChanged {
        index: usize,
    },
    ClipRestarted {
        index: usize,
    },
    RenditionChanged {
        rendition: Rendition,
    },
    RenditionRejected {
        rendition: Rendition,
    },
    SyncResolved {
        label: String,
        delivered: bool,
    },
    LayoutChanging {
        next: ViewMode,
    },
    LayoutChanged {
        view: ViewMode,
    },
    Navigate(NavigationIntent),
}
