//! Multi-voice playback scheduler
//!
//! Turns validated voices into a timer list and fires it against a [`Clock`].
//! At most one session is active per scheduler; `play()` cancels the previous
//! one before scheduling.

use super::clock::{Clock, SystemClock};
use super::session::{ms_to_us, Completion, PlaybackSession, Timer, TimerAction};
use super::types::{NoteTrigger, Outcome, PlaybackEvent, PlaybackSink, SessionState};
use crate::error::BidiError;
use crate::model::{midi_to_frequency, Voice};
use std::ops::ControlFlow;

pub struct Scheduler<C: Clock> {
    clock: C,
    session: Option<PlaybackSession>,
    next_id: u64,
}

impl Default for Scheduler<SystemClock> {
    fn default() -> Self {
        Self::new(SystemClock::new())
    }
}

/// Voices that will sound: not muted, and soloed whenever any voice is soloed.
fn is_audible(voice: &Voice, any_solo: bool) -> bool {
    !voice.muted && (!any_solo || voice.solo)
}

/// Why an audible voice cannot be scheduled, if it cannot.
fn skip_reason(voice: &Voice) -> Option<&'static str> {
    if !voice.sequence.has_timed_events() {
        Some("empty sequence")
    } else if voice.sequence.has_errors() {
        Some("sequence has errors")
    } else {
        None
    }
}

/// Indices of the voices [`Scheduler::play`] would schedule.
pub fn eligible_voices(voices: &[Voice]) -> Vec<usize> {
    let any_solo = voices.iter().any(|v| v.solo);
    voices
        .iter()
        .enumerate()
        .filter(|(_, voice)| is_audible(voice, any_solo) && skip_reason(voice).is_none())
        .map(|(index, _)| index)
        .collect()
}

impl<C: Clock> Scheduler<C> {
    pub fn new(clock: C) -> Self {
        Self {
            clock,
            session: None,
            next_id: 1,
        }
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// Schedule every eligible voice and return the completion handle.
    ///
    /// A voice is eligible when it is audible (see mute/solo) and its sequence
    /// has at least one timed event and no errors. Audible voices that fail the
    /// other checks are skipped with a warning. Fails without touching the
    /// current session when no voice is eligible or the arguments are out of
    /// range.
    pub fn play(&mut self, voices: &[Voice], speed: f64) -> Result<Completion, BidiError> {
        if !speed.is_finite() || speed <= 0.0 {
            return Err(BidiError::InvalidArgument(format!(
                "playback speed must be a positive number, got {}",
                speed
            )));
        }

        let any_solo = voices.iter().any(|v| v.solo);
        let mut eligible = Vec::new();
        for (index, voice) in voices.iter().enumerate() {
            if !is_audible(voice, any_solo) {
                continue;
            }
            if let Some(reason) = skip_reason(voice) {
                log::warn!("voice {} skipped: {}", index, reason);
                continue;
            }
            voice.validate_volume()?;
            eligible.push(index);
        }
        if eligible.is_empty() {
            return Err(BidiError::Playback(
                "no unmuted voice with a non-empty, error-free sequence".to_string(),
            ));
        }

        self.stop();

        let mut timers = Vec::new();
        let mut end_ms: f64 = 0.0;
        for &index in &eligible {
            let voice = &voices[index];
            for (event_index, event) in voice.sequence.iter().enumerate() {
                let Some(midi_note) = event.midi_note() else {
                    continue;
                };
                let at_ms = event.start_ms / speed;
                timers.push(Timer {
                    due_us: ms_to_us(at_ms),
                    action: TimerAction::NoteOn(NoteTrigger {
                        voice: index,
                        event_index,
                        midi_note,
                        frequency_hz: midi_to_frequency(midi_note as i32),
                        at_ms,
                        duration_ms: event.duration_ms / speed,
                        velocity: voice.volume,
                        instrument: voice.instrument,
                    }),
                });
            }
            let voice_end = voice.sequence.total_duration_ms() / speed;
            timers.push(Timer {
                due_us: ms_to_us(voice_end),
                action: TimerAction::VoiceFinished { voice: index },
            });
            end_ms = end_ms.max(voice_end);
        }
        timers.push(Timer {
            due_us: ms_to_us(end_ms),
            action: TimerAction::Complete,
        });
        // Stable: keeps per-voice order and leaves Complete last on ties
        timers.sort_by_key(|t| t.due_us);

        let id = self.next_id;
        self.next_id += 1;
        let started_at_ms = self.clock.now_ms();
        let (session, completion) =
            PlaybackSession::new(id, started_at_ms, timers, voices.len());
        log::info!(
            "session {}: {} voice(s), {} timer(s), ends at {} ms (speed {})",
            id,
            eligible.len(),
            session.pending(),
            end_ms,
            speed
        );
        self.session = Some(session);
        Ok(completion)
    }

    /// Fire every timer that is due at the clock's current time.
    ///
    /// Returns the number of events delivered to `sink`.
    pub fn poll<S: PlaybackSink + ?Sized>(&mut self, sink: &mut S) -> usize {
        let now_ms = self.clock.now_ms();
        let mut fired = 0;
        loop {
            let event = {
                let Some(session) = self.session.as_mut() else {
                    break;
                };
                if session.is_finished() {
                    break;
                }
                if session.state == SessionState::Scheduled {
                    session.state = SessionState::Playing;
                }
                let elapsed_us = ms_to_us(now_ms - session.started_at_ms);
                let Some(timer) = session.pop_due(elapsed_us) else {
                    break;
                };
                match timer.action {
                    TimerAction::NoteOn(trigger) => {
                        log::debug!(
                            "session {}: voice {} note {} at {} ms",
                            session.id,
                            trigger.voice,
                            trigger.midi_note,
                            trigger.at_ms
                        );
                        session.set_cursor(trigger.voice, Some(trigger.event_index));
                        PlaybackEvent::NoteOn(trigger)
                    }
                    TimerAction::VoiceFinished { voice } => {
                        session.set_cursor(voice, None);
                        PlaybackEvent::VoiceFinished { voice }
                    }
                    TimerAction::Complete => {
                        let at_ms = timer.due_us as f64 / 1000.0;
                        log::info!("session {}: completed at {} ms", session.id, at_ms);
                        session.finish(Outcome::Completed { at_ms });
                        PlaybackEvent::Completed { at_ms }
                    }
                }
            };
            fired += 1;
            if let ControlFlow::Break(()) = sink.on_event(&event) {
                self.stop();
                break;
            }
        }
        fired
    }

    /// Absolute clock time of the next pending timer.
    pub fn next_deadline_ms(&self) -> Option<f64> {
        let session = self.session.as_ref()?;
        if session.is_finished() {
            return None;
        }
        session
            .next_due_us()
            .map(|due| session.started_at_ms + due as f64 / 1000.0)
    }

    /// Drive the current session to its end, sleeping on the clock between
    /// timers. Returns the final state.
    pub fn run<S: PlaybackSink + ?Sized>(&mut self, sink: &mut S) -> SessionState {
        while let Some(deadline) = self.next_deadline_ms() {
            self.clock.sleep_until(deadline);
            self.poll(sink);
        }
        self.state()
    }

    /// Cancel the active session, dropping every pending timer.
    ///
    /// Safe to call at any time, including from inside a sink callback and
    /// when nothing is playing.
    pub fn stop(&mut self) {
        if let Some(session) = self.session.as_mut() {
            if !session.is_finished() {
                log::info!(
                    "session {}: cancelled with {} timer(s) pending",
                    session.id,
                    session.pending()
                );
                session.finish(Outcome::Cancelled);
            }
        }
    }

    pub fn state(&self) -> SessionState {
        self.session
            .as_ref()
            .map(|s| s.state)
            .unwrap_or(SessionState::Idle)
    }

    pub fn is_playing(&self) -> bool {
        matches!(self.state(), SessionState::Scheduled | SessionState::Playing)
    }

    /// Index of the event currently sounding in `voice`.
    pub fn cursor(&self, voice: usize) -> Option<usize> {
        self.session.as_ref()?.cursor(voice)
    }

    /// Copy the session's cursors into the caller's voices.
    pub fn sync_cursors(&self, voices: &mut [Voice]) {
        for (index, voice) in voices.iter_mut().enumerate() {
            voice.current_event = self.cursor(index);
        }
    }
}
