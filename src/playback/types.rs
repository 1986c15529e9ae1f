//! Playback type definitions
//!
//! This module defines what the scheduler hands to the outside world: note
//! triggers for the audio collaborator, cursor updates for highlighting, and
//! the single completion outcome.

use super::instrument::InstrumentKind;
use serde::Serialize;
use std::ops::ControlFlow;

/// Lifecycle of a playback session.
///
/// `Idle -> Scheduled -> Playing -> (Completed | Cancelled)`
///
/// A scheduler that has never played, or whose session was replaced, reports
/// `Idle`. `Scheduled` lasts until the first poll after `play()`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    Idle,
    Scheduled,
    Playing,
    Completed,
    Cancelled,
}

/// How a session ended
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Outcome {
    /// All voices finished; `at_ms` is measured from the start of the session.
    Completed {
        #[serde(rename = "atMs")]
        at_ms: f64,
    },
    Cancelled,
}

/// Everything an instrument needs to sound one note
///
/// # Fields
/// - `voice`: index into the slice passed to `play()`
/// - `event_index`: index of the note in that voice's sequence
/// - `at_ms`: session-relative onset, already divided by the speed
/// - `duration_ms`: sounding length, already divided by the speed
/// - `velocity`: the voice's volume (0.0-1.0)
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteTrigger {
    pub voice: usize,
    pub event_index: usize,
    pub midi_note: u8,
    pub frequency_hz: f64,
    pub at_ms: f64,
    pub duration_ms: f64,
    pub velocity: f32,
    pub instrument: InstrumentKind,
}

/// One fired timer, as seen by a [`PlaybackSink`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum PlaybackEvent {
    /// Start a note; the voice's cursor now points at `event_index`.
    NoteOn(NoteTrigger),
    /// The voice has played its last event; its cursor is cleared.
    VoiceFinished { voice: usize },
    /// Every voice has finished. Always the last event of a session.
    Completed {
        #[serde(rename = "atMs")]
        at_ms: f64,
    },
}

/// Receiver for fired timers.
///
/// Returning `ControlFlow::Break(())` stops the session from inside the
/// callback; no further events of that session are delivered.
pub trait PlaybackSink {
    fn on_event(&mut self, event: &PlaybackEvent) -> ControlFlow<()>;
}

impl<F> PlaybackSink for F
where
    F: FnMut(&PlaybackEvent) -> ControlFlow<()>,
{
    fn on_event(&mut self, event: &PlaybackEvent) -> ControlFlow<()> {
        self(event)
    }
}

/// Sink that keeps every event it receives.
#[derive(Debug, Clone, Default)]
pub struct TriggerRecorder {
    pub events: Vec<PlaybackEvent>,
}

impl TriggerRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Recorded note triggers in firing order.
    pub fn triggers(&self) -> impl Iterator<Item = &NoteTrigger> {
        self.events.iter().filter_map(|event| match event {
            PlaybackEvent::NoteOn(trigger) => Some(trigger),
            _ => None,
        })
    }

    /// Time of the `Completed` event, if one was recorded.
    pub fn completed_at_ms(&self) -> Option<f64> {
        self.events.iter().find_map(|event| match event {
            PlaybackEvent::Completed { at_ms } => Some(*at_ms),
            _ => None,
        })
    }
}

impl PlaybackSink for TriggerRecorder {
    fn on_event(&mut self, event: &PlaybackEvent) -> ControlFlow<()> {
        self.events.push(event.clone());
        ControlFlow::Continue(())
    }
}
