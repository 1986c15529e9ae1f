//! Polyphonic note lists -> monophonic voices -> notation

use crate::model::{Event, Pitch};
use crate::serializer::serialize;
use serde::Serialize;

/// A note with absolute timing, as read from a MIDI track.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimedNote {
    pub start_ms: f64,
    pub end_ms: f64,
    pub midi_note: u8,
}

impl TimedNote {
    pub fn new(start_ms: f64, end_ms: f64, midi_note: u8) -> Self {
        Self {
            start_ms,
            end_ms,
            midi_note,
        }
    }

    pub fn duration_ms(&self) -> f64 {
        self.end_ms - self.start_ms
    }
}

/// Split notes into voices with no overlaps, first fit.
///
/// Notes are taken in start order (lower pitch first on ties) and placed in
/// the first voice whose last note has ended by the new note's start, give or
/// take `epsilon_ms`. A new voice is opened when none qualifies. The result is
/// deterministic but not guaranteed minimal for every input.
pub fn split_monophonic(notes: &[TimedNote], epsilon_ms: f64) -> Vec<Vec<TimedNote>> {
    let mut sorted = notes.to_vec();
    sorted.sort_by(|a, b| {
        a.start_ms
            .total_cmp(&b.start_ms)
            .then(a.midi_note.cmp(&b.midi_note))
    });

    let mut voices: Vec<Vec<TimedNote>> = Vec::new();
    for note in sorted {
        let slot = voices.iter_mut().find(|voice| {
            voice
                .last()
                .map_or(true, |last| last.end_ms <= note.start_ms + epsilon_ms)
        });
        match slot {
            Some(voice) => voice.push(note),
            None => voices.push(vec![note]),
        }
    }
    voices
}

/// Write one monophonic voice as notation.
///
/// Gaps longer than `epsilon_ms` (including one before the first note) become
/// pauses. Shorter gaps and overlaps are absorbed by starting the note where
/// the previous one ended, so note ends stay where the file put them.
pub fn voice_to_notation(notes: &[TimedNote], epsilon_ms: f64) -> String {
    let mut events = Vec::with_capacity(notes.len() * 2);
    let mut cursor = 0.0;
    for note in notes {
        let gap = note.start_ms - cursor;
        if gap > epsilon_ms {
            events.push(Event::pause(gap, cursor));
            cursor = note.start_ms;
        }
        let duration = note.end_ms - cursor;
        if duration <= 0.0 {
            log::warn!("dropping note {} swallowed by overlap", note.midi_note);
            continue;
        }
        let (pitch, octave) = Pitch::from_midi_number(note.midi_note);
        events.push(Event::note(pitch, octave, duration, cursor));
        cursor = note.end_ms;
    }
    serialize(&events)
}
