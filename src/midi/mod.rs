//! # MIDI Codec
//!
//! Standard MIDI File export and import for voices.
//!
//! ## Export
//! Format 1 (parallel tracks):
//! - Track 0 is the conductor track: name and tempo.
//! - Every voice with at least one sounding note gets its own track, named
//!   `Voice N`, with a program change for its instrument and one note on/off
//!   pair per note. Pauses and comments produce no MIDI events but still move
//!   the following notes, since every note is placed at its absolute start.
//! - Voices are assigned channels by index, skipping the percussion channel.
//!
//! ## Import
//! Every track is read independently. Its notes are split into the fewest
//! monophonic voices a first-fit pass can find, and each voice is written back
//! as notation with explicit pauses in the gaps. See [`split_monophonic`].
//!
//! ## Timing
//! Milliseconds convert to ticks through the tempo and time division, rounding
//! half up. With the default settings one tick is one millisecond, so exported
//! durations survive a round trip exactly.
//!
//! ## Example
//! ```rust
//! use bidi_midi::midi::{export_smf, import_smf};
//! use bidi_midi::{parse, Settings, Voice};
//!
//! let settings = Settings::default();
//! let voices = vec![Voice::new(parse("C D(500) P(250) E5(333)"))];
//! let bytes = export_smf(&voices, &settings)?;
//!
//! let imported = import_smf(&bytes, &settings)?;
//! assert_eq!(imported.len(), 1);
//! assert_eq!(imported[0].notation, "CD(500)P(250)E5(333)");
//! # Ok::<(), bidi_midi::BidiError>(())
//! ```

mod decode;
mod encode;
mod split;

#[cfg(test)]
mod tests;

pub use decode::{import_smf, ImportedVoice};
pub use encode::export_smf;
pub use split::{split_monophonic, voice_to_notation, TimedNote};

/// Channel 10 in one-based numbering; reserved for drums by General MIDI.
pub const PERCUSSION_CHANNEL: u8 = 9;

/// Channel for the voice at `index`, cycling through the 15 melodic channels.
pub fn channel_for_voice(index: usize) -> u8 {
    let channel = (index % 15) as u8;
    if channel >= PERCUSSION_CHANNEL {
        channel + 1
    } else {
        channel
    }
}

/// Round to the nearest integer, halves away from negative infinity.
pub(crate) fn round_half_up(value: f64) -> f64 {
    (value + 0.5).floor()
}
