//! One `play()` invocation: its pending timers, cursors and completion channel.

use super::types::{NoteTrigger, Outcome, SessionState};
use std::collections::VecDeque;
use std::sync::mpsc;

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum TimerAction {
    NoteOn(NoteTrigger),
    VoiceFinished { voice: usize },
    Complete,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Timer {
    /// Offset from session start in microseconds
    pub due_us: u64,
    pub action: TimerAction,
}

pub(crate) fn ms_to_us(ms: f64) -> u64 {
    (ms * 1000.0).round().max(0.0) as u64
}

/// Single-shot handle returned by `play()`.
///
/// Receives exactly one [`Outcome`] when the session completes or is
/// cancelled.
#[derive(Debug)]
pub struct Completion {
    receiver: mpsc::Receiver<Outcome>,
}

impl Completion {
    /// Non-blocking check.
    pub fn try_outcome(&self) -> Option<Outcome> {
        self.receiver.try_recv().ok()
    }

    /// Block until the session ends.
    ///
    /// Only useful when the scheduler is driven from another thread or has
    /// already run to completion; a single-threaded caller that waits before
    /// driving the scheduler would block forever.
    pub fn wait(self) -> Option<Outcome> {
        self.receiver.recv().ok()
    }
}

/// Pending work for one active `play()`.
#[derive(Debug)]
pub(crate) struct PlaybackSession {
    pub id: u64,
    pub started_at_ms: f64,
    pub state: SessionState,
    timers: VecDeque<Timer>,
    cursors: Vec<Option<usize>>,
    completion: Option<mpsc::Sender<Outcome>>,
}

impl PlaybackSession {
    /// `timers` must already be in firing order.
    pub fn new(
        id: u64,
        started_at_ms: f64,
        timers: Vec<Timer>,
        voice_count: usize,
    ) -> (Self, Completion) {
        let (sender, receiver) = mpsc::channel();
        let session = Self {
            id,
            started_at_ms,
            state: SessionState::Scheduled,
            timers: timers.into(),
            cursors: vec![None; voice_count],
            completion: Some(sender),
        };
        (session, Completion { receiver })
    }

    pub fn pending(&self) -> usize {
        self.timers.len()
    }

    pub fn next_due_us(&self) -> Option<u64> {
        self.timers.front().map(|t| t.due_us)
    }

    /// Remove the next timer if it is due at `elapsed_us`.
    pub fn pop_due(&mut self, elapsed_us: u64) -> Option<Timer> {
        if self.timers.front()?.due_us <= elapsed_us {
            self.timers.pop_front()
        } else {
            None
        }
    }

    pub fn cursor(&self, voice: usize) -> Option<usize> {
        self.cursors.get(voice).copied().flatten()
    }

    pub fn set_cursor(&mut self, voice: usize, event_index: Option<usize>) {
        if let Some(slot) = self.cursors.get_mut(voice) {
            *slot = event_index;
        }
    }

    pub fn is_finished(&self) -> bool {
        matches!(self.state, SessionState::Completed | SessionState::Cancelled)
    }

    /// Drop all pending timers, reset cursors and report `outcome` once.
    pub fn finish(&mut self, outcome: Outcome) {
        self.timers.clear();
        self.cursors.iter_mut().for_each(|c| *c = None);
        self.state = match outcome {
            Outcome::Completed { .. } => SessionState::Completed,
            Outcome::Cancelled => SessionState::Cancelled,
        };
        if let Some(sender) = self.completion.take() {
            // The caller may have dropped its Completion handle
            let _ = sender.send(outcome);
        }
    }
}
