//! # Public API
//!
//! Convenience entry points that go straight from notation text (or MIDI
//! bytes) to a result.
//!
//! ## Text Functions
//!
//! - [`check()`] - Parse and fail if any token is invalid
//! - [`transpose()`] - Shift every note by a number of semitones
//! - [`transpose_with_policy()`] - Same, choosing how octaves past 0-8 are handled
//! - [`scale_durations()`] - Multiply every note and pause duration
//!
//! ## Binary Functions
//!
//! - [`export_midi()`] - Voices to Standard MIDI File bytes
//! - [`import_midi()`] - Standard MIDI File bytes to notation, one entry per voice
//!
//! ## Typical Usage
//!
//! ```rust
//! use bidi_midi::{scale_durations, transpose};
//!
//! let up = transpose("C4(1000) G# P(500)", 3)?;
//! assert_eq!(up, "D#BP(500)");
//!
//! let slow = scale_durations(&up, 2.0)?;
//! assert_eq!(slow, "D#(2000)B(2000)P");
//! # Ok::<(), bidi_midi::BidiError>(())
//! ```
//!
//! Every text function returns new notation; parse it again before the next
//! operation.

use crate::config::Settings;
use crate::error::BidiError;
use crate::midi::{export_smf, import_smf, ImportedVoice};
use crate::model::{Sequence, Voice};
use crate::parser::parse;
use crate::scale::scale_events;
use crate::transpose::{transpose_events, OctavePolicy};

/// Parse `source` and require every token to be valid.
///
/// # Example
/// ```rust
/// use bidi_midi::{check, BidiError};
///
/// assert_eq!(check("C D E")?.len(), 3);
/// assert!(matches!(check("C D9"), Err(BidiError::SequenceHasErrors { count: 1, .. })));
/// # Ok::<(), BidiError>(())
/// ```
///
/// # Errors
/// [`BidiError::SequenceHasErrors`] naming the first invalid token. Use
/// [`parse`] instead to get every event, including the invalid ones.
pub fn check(source: &str) -> Result<Sequence, BidiError> {
    let sequence = parse(source);
    sequence.ensure_error_free()?;
    Ok(sequence)
}

/// Transpose notation by `semitones`, wrapping octaves past 0-8.
///
/// Flats come back spelled as sharps (`Bb` becomes `A#`).
///
/// # Example
/// ```rust
/// use bidi_midi::transpose;
///
/// assert_eq!(transpose("B8 Bb", 1)?, "C0B");
/// # Ok::<(), bidi_midi::BidiError>(())
/// ```
pub fn transpose(source: &str, semitones: i32) -> Result<String, BidiError> {
    transpose_with_policy(source, semitones, OctavePolicy::default())
}

/// Transpose notation by `semitones` with an explicit [`OctavePolicy`].
///
/// # Example
/// ```rust
/// use bidi_midi::{transpose_with_policy, OctavePolicy};
///
/// assert_eq!(transpose_with_policy("B8", 1, OctavePolicy::Clamp)?, "C8");
/// # Ok::<(), bidi_midi::BidiError>(())
/// ```
pub fn transpose_with_policy(
    source: &str,
    semitones: i32,
    policy: OctavePolicy,
) -> Result<String, BidiError> {
    transpose_events(&parse(source), semitones, policy)
}

/// Multiply every note and pause duration by `multiplier`, rounding up to
/// whole milliseconds.
///
/// # Errors
/// [`BidiError::InvalidArgument`] for a multiplier that is not a positive
/// number, [`BidiError::SequenceHasErrors`] for invalid notation.
pub fn scale_durations(source: &str, multiplier: f64) -> Result<String, BidiError> {
    scale_events(&parse(source), multiplier)
}

/// Encode voices as a format 1 Standard MIDI File.
///
/// # Example
/// ```rust
/// use bidi_midi::{export_midi, parse, Settings, Voice};
///
/// let voices = vec![Voice::new(parse("C E G"))];
/// let bytes = export_midi(&voices, &Settings::default())?;
/// assert_eq!(&bytes[0..4], b"MThd");
/// # Ok::<(), bidi_midi::BidiError>(())
/// ```
pub fn export_midi(voices: &[Voice], settings: &Settings) -> Result<Vec<u8>, BidiError> {
    export_smf(voices, settings)
}

/// Decode a Standard MIDI File into monophonic voices of notation.
///
/// Tracks that hold chords are split into as many voices as needed so no
/// voice has overlapping notes.
pub fn import_midi(bytes: &[u8], settings: &Settings) -> Result<Vec<ImportedVoice>, BidiError> {
    import_smf(bytes, settings)
}
