//! # bidi-midi
//!
//! Compact melody notation (`C4(1000)G#P(500)`) and everything around it:
//! validation with per-token errors, transposition, duration scaling,
//! multi-voice playback scheduling, MIDI export/import and WAV rendering.
//!
//! ## Pipeline
//! ```text
//! text ─► lexer ─► parser ─► Sequence ─┬─► transpose / scale ─► text
//!                                      ├─► playback (Scheduler)
//!                                      ├─► midi export ─► .mid bytes
//!                                      └─► render ─► .wav bytes
//! .mid bytes ─► midi import ─► text (one per monophonic voice)
//! ```
//!
//! ## Example
//! ```rust
//! use bidi_midi::parse;
//!
//! let sequence = parse("C4(1000)G#P(500)");
//! assert_eq!(sequence.len(), 3);
//! assert_eq!(sequence[1].start_ms, 1000.0);
//! assert_eq!(sequence.total_duration_ms(), 2500.0);
//! assert!(!sequence.has_errors());
//! ```

pub mod api;
pub mod config;
pub mod error;
pub mod lexer;
pub mod midi;
pub mod model;
pub mod parser;
pub mod playback;
pub mod render;
pub mod scale;
pub mod serializer;
pub mod transpose;

pub use api::{
    check, export_midi, import_midi, scale_durations, transpose, transpose_with_policy,
};
pub use config::Settings;
pub use error::*;
pub use midi::ImportedVoice;
pub use model::*;
pub use parser::parse;
pub use playback::{InstrumentKind, Outcome, Scheduler};
pub use render::render_wav;
pub use serializer::serialize;
pub use transpose::OctavePolicy;
