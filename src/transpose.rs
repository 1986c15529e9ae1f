use crate::error::BidiError;
use crate::model::{ensure_error_free, Event, Pitch, MAX_OCTAVE, MIN_OCTAVE};
use crate::serializer::serialize;
use serde::Deserialize;

/// What happens when a transposed note leaves the 0-8 octave range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OctavePolicy {
    /// Cycle through the range: octave 9 becomes 0, -1 becomes 8.
    /// Keeps transposition total and reversible.
    #[default]
    Wrap,
    /// Pin to the nearest edge octave, keeping the pitch class.
    Clamp,
}

impl OctavePolicy {
    fn apply(self, octave: i32) -> i32 {
        match self {
            OctavePolicy::Wrap => {
                MIN_OCTAVE + (octave - MIN_OCTAVE).rem_euclid(MAX_OCTAVE - MIN_OCTAVE + 1)
            }
            OctavePolicy::Clamp => octave.clamp(MIN_OCTAVE, MAX_OCTAVE),
        }
    }
}

/// Shift one pitch by `semitones`, carrying into the octave in base 12.
///
/// The result is always spelled with sharps.
pub fn transpose_pitch(
    pitch: Pitch,
    octave: i32,
    semitones: i32,
    policy: OctavePolicy,
) -> (Pitch, i32) {
    let absolute = octave * 12 + pitch.semitones_from_c() + semitones;
    let new_octave = policy.apply(absolute.div_euclid(12));
    (Pitch::from_chromatic_index(absolute.rem_euclid(12)), new_octave)
}

/// Transpose every valid note and return the new notation text.
///
/// Pauses and comments are carried over unchanged. Fails if any event carries
/// an error; nothing is transposed in that case.
pub fn transpose_events(
    events: &[Event],
    semitones: i32,
    policy: OctavePolicy,
) -> Result<String, BidiError> {
    ensure_error_free(events)?;

    let transposed: Vec<Event> = events
        .iter()
        .map(|event| match (event.is_sounding(), event.pitch, event.octave) {
            (true, Some(pitch), Some(octave)) => {
                let (pitch, octave) = transpose_pitch(pitch, octave, semitones, policy);
                Event {
                    pitch: Some(pitch),
                    octave: Some(octave),
                    ..event.clone()
                }
            }
            _ => event.clone(),
        })
        .collect();

    log::debug!("transposed {} event(s) by {} semitone(s)", events.len(), semitones);
    Ok(serialize(&transposed))
}
