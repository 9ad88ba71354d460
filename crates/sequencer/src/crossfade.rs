use std::time::{Duration, Instant};

use crossbeam_channel::{unbounded, Receiver, Sender};
use tracing::{debug, info, warn};

use crate::catalog::{Catalog, ExerciseEntry};
use crate::fade::{mix_at, FadeCurve};
use crate::media::{MediaSlot, Player, Rendition};
use crate::notify::{RequestId, SelectionNotifier, SyncOutcome, SyncReply, SyncReport};
use crate::{SequencerError, StageEvent};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdvanceCause {
    /// Explicit pick from the catalog; reported to the backend.
    Selected,
    /// The active clip finished; local autoplay only.
    ClipEnded,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Completion {
    At(Instant),
    AwaitingSync(RequestId),
}

#[derive(Debug, Clone, Copy)]
struct Fade {
    target: usize,
    started_at: Instant,
    cause: AdvanceCause,
    completion: Completion,
}

#[derive(Debug, Clone, Copy)]
enum ExerciseAxis {
    Idle,
    Fading(Fade),
}

#[derive(Debug, Clone, Copy)]
enum RenditionAxis {
    Idle,
    Settling {
        index: usize,
        from: Rendition,
        started_at: Instant,
    },
}

struct SlotPair<P> {
    processed: MediaSlot<P>,
    raw: MediaSlot<P>,
}

impl<P: Player> SlotPair<P> {
    fn get(&self, rendition: Rendition) -> &MediaSlot<P> {
        match rendition {
            Rendition::Processed => &self.processed,
            Rendition::Raw => &self.raw,
        }
    }

    fn get_mut(&mut self, rendition: Rendition) -> &mut MediaSlot<P> {
        match rendition {
            Rendition::Processed => &mut self.processed,
            Rendition::Raw => &mut self.raw,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct SequencerTiming {
    pub exercise_fade: Duration,
    pub rendition_fade: Duration,
    pub curve: FadeCurve,
}

/// Read-only view of the playback state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlaybackState {
    pub active: usize,
    pub fading_to: Option<usize>,
    pub rendition: Rendition,
    pub rendition_transitioning: bool,
}

/// Owns which exercise is on screen, which rendition is shown, and every
/// mounted media slot.
///
/// Both renditions of every catalog entry stay mounted for the lifetime of
/// the sequencer; switching only changes visibility.
pub struct Sequencer<P> {
    catalog: Catalog,
    slots: Vec<SlotPair<P>>,
    active: usize,
    exercise: ExerciseAxis,
    rendition: Rendition,
    rendition_axis: RenditionAxis,
    timing: SequencerTiming,
    notifier: Option<Box<dyn SelectionNotifier>>,
    outcomes_tx: Sender<SyncReport>,
    outcomes_rx: Receiver<SyncReport>,
    next_request: u64,
}

impl<P: Player> Sequencer<P> {
    pub fn new<F>(catalog: Catalog, timing: SequencerTiming, mut mount: F) -> Self
    where
        F: FnMut(&ExerciseEntry, Rendition) -> P,
    {
        let slots = catalog
            .iter()
            .map(|entry| SlotPair {
                processed: MediaSlot::new(
                    entry.processed.clone(),
                    Rendition::Processed,
                    mount(entry, Rendition::Processed),
                ),
                raw: MediaSlot::new(entry.raw.clone(), Rendition::Raw, mount(entry, Rendition::Raw)),
            })
            .collect();
        let (outcomes_tx, outcomes_rx) = unbounded();
        let mut sequencer = Self {
            catalog,
            slots,
            active: 0,
            exercise: ExerciseAxis::Idle,
            rendition: Rendition::Processed,
            rendition_axis: RenditionAxis::Idle,
            timing,
            notifier: None,
            outcomes_tx,
            outcomes_rx,
            next_request: 0,
        };
        sequencer.sync_visibility();
        sequencer
    }

    pub fn set_notifier(&mut self, notifier: Box<dyn SelectionNotifier>) {
        self.notifier = Some(notifier);
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn state(&self) -> PlaybackState {
        PlaybackState {
            active: self.active,
            fading_to: self.fading_to(),
            rendition: self.rendition,
            rendition_transitioning: matches!(self.rendition_axis, RenditionAxis::Settling { .. }),
        }
    }

    pub fn active(&self) -> usize {
        self.active
    }

    pub fn fading_to(&self) -> Option<usize> {
        match self.exercise {
            ExerciseAxis::Fading(fade) => Some(fade.target),
            ExerciseAxis::Idle => None,
        }
    }

    pub fn rendition(&self) -> Rendition {
        self.rendition
    }

    pub fn slot(&self, index: usize, rendition: Rendition) -> Option<&MediaSlot<P>> {
        self.slots.get(index).map(|pair| pair.get(rendition))
    }

    pub fn slot_mut(&mut self, index: usize, rendition: Rendition) -> Option<&mut MediaSlot<P>> {
        self.slots.get_mut(index).map(|pair| pair.get_mut(rendition))
    }

    /// Explicit user pick. Re-selecting the active exercise, or selecting
    /// anything while a fade is in flight, does nothing.
    pub fn select(&mut self, index: usize, now: Instant) -> Result<Vec<StageEvent>, SequencerError> {
        let entry = self
            .catalog
            .get(index)
            .ok_or(SequencerError::UnknownExercise {
                index,
                len: self.catalog.len(),
            })?;

        if let ExerciseAxis::Fading(fade) = self.exercise {
            debug!(
                requested = index,
                fading_to = fade.target,
                "exercise fade in flight; ignoring selection"
            );
            return Ok(Vec::new());
        }
        if index == self.active {
            debug!(index, "exercise already active; ignoring selection");
            return Ok(Vec::new());
        }

        let label = entry.label.clone();
        let completion = match &self.notifier {
            Some(notifier) => {
                self.next_request += 1;
                let request = RequestId::new(self.next_request);
                debug!(%request, label = %label, "dispatching exercise selection");
                notifier.dispatch(SyncReply::new(request, label, self.outcomes_tx.clone()));
                Completion::AwaitingSync(request)
            }
            None => Completion::At(now + self.timing.exercise_fade),
        };

        Ok(vec![self.begin_fade(index, AdvanceCause::Selected, completion, now)])
    }

    /// The active clip reached its end: fade to the next entry in catalog order.
    pub fn clip_ended(&mut self, now: Instant) -> Vec<StageEvent> {
        if let ExerciseAxis::Fading(fade) = self.exercise {
            debug!(
                active = self.active,
                fading_to = fade.target,
                "clip ended during fade; outgoing clip already replaced"
            );
            return Vec::new();
        }

        if self.catalog.len() == 1 {
            let active = self.active;
            let rendition = self.rendition;
            self.slots[active].get_mut(rendition).restart();
            debug!(index = active, "single exercise catalog; replaying clip");
            return vec![StageEvent::ClipRestarted { index: active }];
        }

        let target = self.catalog.next_after(self.active);
        let completion = Completion::At(now + self.timing.exercise_fade);
        vec![self.begin_fade(target, AdvanceCause::ClipEnded, completion, now)]
    }

    /// Swaps processed/raw for the active exercise, carrying the playback position over.
    pub fn toggle_rendition(&mut self, now: Instant) -> Vec<StageEvent> {
        if let RenditionAxis::Settling { .. } = self.rendition_axis {
            debug!(rendition = %self.rendition, "rendition toggle in flight; ignoring request");
            return Vec::new();
        }

        let from = self.rendition;
        let target = from.other();
        let pair = &mut self.slots[self.active];
        let position = pair.get(from).position();
        let incoming = pair.get_mut(target);
        incoming.seek(position);

        match incoming.start() {
            Ok(()) => {
                if let ExerciseAxis::Fading(fade) = self.exercise {
                    // The clip fading in must switch rendition at its own position too.
                    let fading_in = &mut self.slots[fade.target];
                    let aligned = fading_in.get(from).position();
                    fading_in.get_mut(target).seek(aligned);
                }
                self.rendition = target;
                self.rendition_axis = RenditionAxis::Settling {
                    index: self.active,
                    from,
                    started_at: now,
                };
                self.sync_visibility();
                info!(
                    index = self.active,
                    rendition = %target,
                    position_ms = position.as_millis() as u64,
                    "rendition switched"
                );
                vec![StageEvent::RenditionChanged { rendition: target }]
            }
            Err(err) => {
                warn!(index = self.active, rendition = %target, %err, "rendition toggle abandoned");
                vec![StageEvent::RenditionRejected { rendition: target }]
            }
        }
    }

    pub fn tick(&mut self, now: Instant) -> Vec<StageEvent> {
        let mut events = Vec::new();
        self.drain_outcomes(now, &mut events);
        self.complete_due_fade(now, &mut events);
        self.settle_rendition(now);

        if matches!(self.exercise, ExerciseAxis::Idle) && self.active_slot().ended() {
            events.extend(self.clip_ended(now));
        }
        events
    }

    /// Per-slot opacity for every visible slot at `now`.
    pub fn opacities(&self, now: Instant) -> Vec<(usize, Rendition, f32)> {
        let (exercise_out, exercise_in) = match self.exercise {
            ExerciseAxis::Fading(fade) => {
                let mix = mix_at(self.timing.exercise_fade, self.timing.curve, fade.started_at, now);
                (mix.outgoing, mix.incoming)
            }
            ExerciseAxis::Idle => (1.0, 0.0),
        };
        let (rendition_out, rendition_in) = match self.rendition_axis {
            RenditionAxis::Settling {
                index, started_at, ..
            } if index == self.active => {
                let mix = mix_at(self.timing.rendition_fade, self.timing.curve, started_at, now);
                (mix.outgoing, mix.incoming)
            }
            _ => (0.0, 1.0),
        };

        self.visible_set()
            .into_iter()
            .map(|(index, rendition)| {
                let opacity = if index == self.active {
                    let rendition_mix = if rendition == self.rendition {
                        rendition_in
                    } else {
                        rendition_out
                    };
                    exercise_out * rendition_mix
                } else {
                    exercise_in
                };
                (index, rendition, opacity)
            })
            .collect()
    }

    /// Pauses every slot and detaches pending notifications. Reports that
    /// arrive afterwards go nowhere.
    pub fn shutdown(&mut self) {
        self.exercise = ExerciseAxis::Idle;
        self.rendition_axis = RenditionAxis::Idle;
        self.notifier = None;
        let (tx, rx) = unbounded();
        self.outcomes_tx = tx;
        self.outcomes_rx = rx;
        for pair in &mut self.slots {
            pair.processed.set_visible(false);
            pair.raw.set_visible(false);
        }
    }

    fn active_slot(&self) -> &MediaSlot<P> {
        self.slots[self.active].get(self.rendition)
    }

    fn begin_fade(
        &mut self,
        target: usize,
        cause: AdvanceCause,
        completion: Completion,
        now: Instant,
    ) -> StageEvent {
        let from = self.active;
        self.slots[target].get_mut(self.rendition).seek(Duration::ZERO);
        self.exercise = ExerciseAxis::Fading(Fade {
            target,
            started_at: now,
            cause,
            completion,
        });
        self.sync_visibility();
        info!(from, to = target, ?cause, "exercise fade started");
        StageEvent::FadeStarted {
            from,
            to: target,
            cause,
        }
    }

    fn drain_outcomes(&mut self, now: Instant, events: &mut Vec<StageEvent>) {
        while let Ok(report) = self.outcomes_rx.try_recv() {
            match &report.outcome {
                SyncOutcome::Delivered => {
                    debug!(request = %report.request, label = %report.label, "selection acknowledged")
                }
                SyncOutcome::Failed(reason) => {
                    debug!(request = %report.request, label = %report.label, %reason, "selection notification failed; switching anyway")
                }
            }

            match &mut self.exercise {
                ExerciseAxis::Fading(fade)
                    if fade.completion == Completion::AwaitingSync(report.request) =>
                {
                    let earliest = fade.started_at + self.timing.exercise_fade;
                    fade.completion = Completion::At(earliest.max(now));
                }
                _ => {
                    debug!(request = %report.request, "dropping stale selection outcome");
                    continue;
                }
            }

            events.push(StageEvent::SyncResolved {
                label: report.label,
                delivered: report.outcome.is_delivered(),
            });
        }
    }

    fn complete_due_fade(&mut self, now: Instant, events: &mut Vec<StageEvent>) {
        let ExerciseAxis::Fading(fade) = self.exercise else {
            return;
        };
        let Completion::At(deadline) = fade.completion else {
            return;
        };
        if now < deadline {
            return;
        }
        self.active = fade.target;
        self.exercise = ExerciseAxis::Idle;
        self.sync_visibility();
        info!(index = fade.target, cause = ?fade.cause, "exercise fade completed");
        events.push(StageEvent::ExerciseChanged { index: fade.target });
    }

    fn settle_rendition(&mut self, now: Instant) {
        let RenditionAxis::Settling {
            from, started_at, ..
        } = self.rendition_axis
        else {
            return;
        };
        if now.saturating_duration_since(started_at) < self.timing.rendition_fade {
            return;
        }
        self.rendition_axis = RenditionAxis::Idle;
        self.sync_visibility();
        debug!(from = %from, to = %self.rendition, "rendition transition settled");
    }

    fn visible_set(&self) -> Vec<(usize, Rendition)> {
        let mut visible = vec![(self.active, self.rendition)];
        if let RenditionAxis::Settling { index, from, .. } = self.rendition_axis {
            if index == self.active {
                visible.push((index, from));
            }
        }
        if let ExerciseAxis::Fading(fade) = self.exercise {
            visible.push((fade.target, self.rendition));
        }
        visible
    }

    fn sync_visibility(&mut self) {
        let visible = self.visible_set();
        for (index, pair) in self.slots.iter_mut().enumerate() {
            for rendition in Rendition::ALL {
                pair.get_mut(rendition)
                    .set_visible(visible.contains(&(index, rendition)));
            }
        }
    }
}
