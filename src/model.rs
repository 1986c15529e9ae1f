//! # Data Model
//!
//! Types shared by every stage of the pipeline.
//!
//! ## Type Hierarchy
//! ```text
//! Voice
//!   ├── instrument / volume / muted / solo
//!   ├── current_event: Option<usize> (playback cursor, UI-owned)
//!   └── Sequence
//!         └── Vec<Event>
//!               ├── kind: EventKind (Note | Pause | Comment | Invalid)
//!               ├── pitch: Option<Pitch> (letter + accidental, notes only)
//!               ├── octave: Option<i32>
//!               ├── duration_ms / start_ms / end_ms
//!               ├── raw_text + span (exact source fragment and location)
//!               └── error: Option<EventError>
//! ```
//!
//! ## Timing
//! The parser threads a running clock through the sequence. Every non-comment
//! event satisfies `end_ms == start_ms + duration_ms`, and consecutive
//! non-comment events touch: `start_ms(e[i+1]) == end_ms(e[i])`.
//! Comments have zero duration and do not move the clock.
//!
//! ## Pitch numbering
//! The chromatic index is the 0-11 position of a pitch class (C=0 .. B=11).
//! Flats are folded onto the sharp below them (`Bb` has the index of `A#`).
//! MIDI numbers follow the usual convention where A4 = 69 and C4 = 60.

use crate::error::{BidiError, EventError};
use crate::playback::InstrumentKind;
use serde::Serialize;
use std::fmt;
use std::ops::Deref;

pub const DEFAULT_OCTAVE: i32 = 4;
pub const DEFAULT_DURATION_MS: f64 = 1000.0;
pub const MIN_OCTAVE: i32 = 0;
pub const MAX_OCTAVE: i32 = 8;

/// Pitch letters A through G
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Letter {
    C,
    D,
    E,
    F,
    G,
    A,
    B,
}

impl Letter {
    /// Case-insensitive lookup.
    pub fn from_char(c: char) -> Option<Self> {
        match c.to_ascii_uppercase() {
            'C' => Some(Letter::C),
            'D' => Some(Letter::D),
            'E' => Some(Letter::E),
            'F' => Some(Letter::F),
            'G' => Some(Letter::G),
            'A' => Some(Letter::A),
            'B' => Some(Letter::B),
            _ => None,
        }
    }

    pub fn as_char(self) -> char {
        match self {
            Letter::C => 'C',
            Letter::D => 'D',
            Letter::E => 'E',
            Letter::F => 'F',
            Letter::G => 'G',
            Letter::A => 'A',
            Letter::B => 'B',
        }
    }

    /// Semitones above C for the natural note
    fn semitone(self) -> i32 {
        match self {
            Letter::C => 0,
            Letter::D => 2,
            Letter::E => 4,
            Letter::F => 5,
            Letter::G => 7,
            Letter::A => 9,
            Letter::B => 11,
        }
    }

    /// Letters that may carry a flat in the notation (`Db Eb Gb Ab Bb`).
    pub fn takes_flat(self) -> bool {
        matches!(
            self,
            Letter::D | Letter::E | Letter::G | Letter::A | Letter::B
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Accidental {
    #[default]
    Natural,
    Sharp,
    Flat,
}

/// A pitch class as written: letter plus accidental.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Pitch {
    pub letter: Letter,
    pub accidental: Accidental,
}

/// Sharp spelling for each chromatic index.
const CHROMATIC_SCALE: [(Letter, Accidental); 12] = [
    (Letter::C, Accidental::Natural),
    (Letter::C, Accidental::Sharp),
    (Letter::D, Accidental::Natural),
    (Letter::D, Accidental::Sharp),
    (Letter::E, Accidental::Natural),
    (Letter::F, Accidental::Natural),
    (Letter::F, Accidental::Sharp),
    (Letter::G, Accidental::Natural),
    (Letter::G, Accidental::Sharp),
    (Letter::A, Accidental::Natural),
    (Letter::A, Accidental::Sharp),
    (Letter::B, Accidental::Natural),
];

impl Pitch {
    pub fn new(letter: Letter, accidental: Accidental) -> Self {
        Self { letter, accidental }
    }

    pub fn natural(letter: Letter) -> Self {
        Self::new(letter, Accidental::Natural)
    }

    /// Semitones above C of the written octave, before folding.
    ///
    /// `B#` gives 12 and `Cb` would give -1, so the accidental can cross into
    /// the neighbouring octave.
    pub fn semitones_from_c(self) -> i32 {
        let offset = match self.accidental {
            Accidental::Natural => 0,
            Accidental::Sharp => 1,
            Accidental::Flat => -1,
        };
        self.letter.semitone() + offset
    }

    /// Position 0-11 within the octave, flats folded onto sharps.
    pub fn chromatic_index(self) -> u8 {
        self.semitones_from_c().rem_euclid(12) as u8
    }

    /// Sharp spelling of a chromatic index (taken modulo 12).
    pub fn from_chromatic_index(index: i32) -> Self {
        let (letter, accidental) = CHROMATIC_SCALE[index.rem_euclid(12) as usize];
        Self { letter, accidental }
    }

    /// Same pitch class, always spelled with a sharp or natural.
    pub fn normalized(self) -> Self {
        Self::from_chromatic_index(self.chromatic_index() as i32)
    }

    /// MIDI note number for this pitch in `octave` (A4 = 69).
    pub fn midi_number(self, octave: i32) -> i32 {
        12 * (octave + 1) + self.semitones_from_c()
    }

    /// Inverse of [`Pitch::midi_number`]: sharp spelling and octave.
    pub fn from_midi_number(note: u8) -> (Self, i32) {
        let note = note as i32;
        (Self::from_chromatic_index(note % 12), note / 12 - 1)
    }
}

impl fmt::Display for Pitch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.letter.as_char())?;
        match self.accidental {
            Accidental::Natural => Ok(()),
            Accidental::Sharp => write!(f, "#"),
            Accidental::Flat => write!(f, "b"),
        }
    }
}

/// Equal-tempered frequency of a MIDI note number.
pub fn midi_to_frequency(note: i32) -> f64 {
    440.0 * 2f64.powf((note - 69) as f64 / 12.0)
}

/// Location of a token in the source text.
///
/// `offset` and `len` are byte positions, `line` and `column` are 1-based
/// character positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Span {
    pub offset: usize,
    pub len: usize,
    pub line: usize,
    pub column: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum EventKind {
    Note,
    Pause,
    Comment,
    Invalid,
}

/// One token's outcome.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub kind: EventKind,
    pub pitch: Option<Pitch>,
    pub octave: Option<i32>,
    pub duration_ms: f64,
    pub start_ms: f64,
    pub end_ms: f64,
    pub raw_text: String,
    pub span: Span,
    pub error: Option<EventError>,
}

impl Event {
    /// A valid note. `raw_text` is left empty; the serializer rebuilds text
    /// from the fields.
    pub fn note(pitch: Pitch, octave: i32, duration_ms: f64, start_ms: f64) -> Self {
        Self {
            kind: EventKind::Note,
            pitch: Some(pitch),
            octave: Some(octave),
            duration_ms,
            start_ms,
            end_ms: start_ms + duration_ms,
            raw_text: String::new(),
            span: Span::default(),
            error: None,
        }
    }

    pub fn pause(duration_ms: f64, start_ms: f64) -> Self {
        Self {
            kind: EventKind::Pause,
            pitch: None,
            octave: None,
            duration_ms,
            start_ms,
            end_ms: start_ms + duration_ms,
            raw_text: String::new(),
            span: Span::default(),
            error: None,
        }
    }

    pub fn is_note(&self) -> bool {
        self.kind == EventKind::Note
    }

    pub fn is_pause(&self) -> bool {
        self.kind == EventKind::Pause
    }

    pub fn is_comment(&self) -> bool {
        self.kind == EventKind::Comment
    }

    pub fn has_error(&self) -> bool {
        self.error.is_some()
    }

    /// A note that will actually produce sound.
    pub fn is_sounding(&self) -> bool {
        self.is_note() && !self.has_error() && self.pitch.is_some() && self.octave.is_some()
    }

    /// MIDI note number, for sounding notes only.
    pub fn midi_note(&self) -> Option<u8> {
        if !self.is_sounding() {
            return None;
        }
        let number = self.pitch?.midi_number(self.octave?);
        u8::try_from(number).ok().filter(|n| *n <= 127)
    }
}

/// Ordered events from one parse.
///
/// Immutable once produced; transforms build new text instead of editing a
/// sequence in place.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(transparent)]
pub struct Sequence {
    events: Vec<Event>,
}

impl Sequence {
    pub(crate) fn new(events: Vec<Event>) -> Self {
        Self { events }
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn into_events(self) -> Vec<Event> {
        self.events
    }

    pub fn has_errors(&self) -> bool {
        self.events.iter().any(Event::has_error)
    }

    /// Erroring events in source order.
    pub fn errors(&self) -> impl Iterator<Item = &Event> {
        self.events.iter().filter(|e| e.has_error())
    }

    /// True when the sequence has at least one event that takes time.
    pub fn has_timed_events(&self) -> bool {
        self.events.iter().any(|e| !e.is_comment())
    }

    /// End of the last timed event, 0 for an empty sequence.
    pub fn total_duration_ms(&self) -> f64 {
        self.events
            .iter()
            .rev()
            .find(|e| !e.is_comment())
            .map(|e| e.end_ms)
            .unwrap_or(0.0)
    }

    /// Fails with [`BidiError::SequenceHasErrors`] if any event carries an error.
    pub fn ensure_error_free(&self) -> Result<(), BidiError> {
        ensure_error_free(&self.events)
    }
}

impl Deref for Sequence {
    type Target = [Event];

    fn deref(&self) -> &[Event] {
        &self.events
    }
}

/// Checked precondition for transforms, playback and export.
pub fn ensure_error_free(events: &[Event]) -> Result<(), BidiError> {
    let mut errors = events.iter().filter_map(|e| e.error.as_ref());
    match errors.next() {
        None => Ok(()),
        Some(first) => Err(BidiError::SequenceHasErrors {
            count: 1 + errors.count(),
            first: first.to_string(),
        }),
    }
}

/// A sequence bound to playback parameters.
///
/// Owned by the UI layer; the core only borrows voices for the duration of a
/// call.
#[derive(Debug, Clone, PartialEq)]
pub struct Voice {
    pub sequence: Sequence,
    pub instrument: InstrumentKind,
    /// Gain in 0.0..=1.0
    pub volume: f32,
    pub muted: bool,
    pub solo: bool,
    /// Index of the event currently sounding, for highlighting.
    pub current_event: Option<usize>,
}

impl Voice {
    pub fn new(sequence: Sequence) -> Self {
        Self {
            sequence,
            instrument: InstrumentKind::default(),
            volume: 1.0,
            muted: false,
            solo: false,
            current_event: None,
        }
    }

    pub fn with_instrument(mut self, instrument: InstrumentKind) -> Self {
        self.instrument = instrument;
        self
    }

    pub fn with_volume(mut self, volume: f32) -> Self {
        self.volume = volume;
        self
    }

    pub fn muted(mut self, muted: bool) -> Self {
        self.muted = muted;
        self
    }

    pub fn solo(mut self, solo: bool) -> Self {
        self.solo = solo;
        self
    }

    /// Whether the sequence has at least one note that makes sound.
    pub fn has_sounding_notes(&self) -> bool {
        self.sequence.iter().any(|e| e.midi_note().is_some())
    }

    /// Fails with [`BidiError::InvalidArgument`] unless volume is within 0-1.
    pub fn validate_volume(&self) -> Result<(), BidiError> {
        if (0.0..=1.0).contains(&self.volume) {
            Ok(())
        } else {
            Err(BidiError::InvalidArgument(format!(
                "voice volume must be within 0-1, got {}",
                self.volume
            )))
        }
    }
}
