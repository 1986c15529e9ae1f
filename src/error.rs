//! # Error Types
//!
//! This module defines the error types for the notation toolchain.
//!
//! There are two layers of errors:
//! - [`ErrorKind`] / [`EventError`] - per-token problems found while parsing.
//!   These are *data*: they are attached to the offending [`Event`](crate::Event)
//!   and never abort a parse.
//! - [`BidiError`] - failures of a whole operation (transform refused, playback
//!   rejected, corrupt MIDI container, bad settings file).
//!
//! ## Usage
//! ```rust
//! use bidi_midi::{transpose, BidiError};
//!
//! match transpose("C4 G9", 2) {
//!     Ok(text) => println!("{}", text),
//!     Err(BidiError::SequenceHasErrors { count, first }) => {
//!         eprintln!("{} error(s), first: {}", count, first);
//!     }
//!     Err(e) => eprintln!("Error: {}", e),
//! }
//! ```

use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Classification of a token that failed validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ErrorKind {
    /// Octave digit outside 0-8 (or not a number at all).
    InvalidOctave,
    /// Note duration in parentheses is not a positive number.
    InvalidDuration,
    /// Pause duration in parentheses is not a positive number.
    InvalidPauseDuration,
    /// Token matches none of the note / pause / comment grammars.
    InvalidFormat,
}

impl ErrorKind {
    /// Stable key handed to the localization layer.
    pub fn message_key(self) -> &'static str {
        match self {
            ErrorKind::InvalidOctave => "invalidOctave",
            ErrorKind::InvalidDuration => "invalidDuration",
            ErrorKind::InvalidPauseDuration => "invalidPauseDuration",
            ErrorKind::InvalidFormat => "invalidFormat",
        }
    }
}

/// A validation error attached to a single event.
///
/// `text` is the offending fragment verbatim (the octave, the duration, or the
/// whole token for [`ErrorKind::InvalidFormat`]).
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventError {
    pub kind: ErrorKind,
    pub text: String,
}

impl EventError {
    pub fn new(kind: ErrorKind, text: impl Into<String>) -> Self {
        Self {
            kind,
            text: text.into(),
        }
    }

    pub fn message_key(&self) -> &'static str {
        self.kind.message_key()
    }
}

impl fmt::Display for EventError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            ErrorKind::InvalidOctave => {
                write!(f, "Invalid octave: {}. Range: 0-8", self.text)
            }
            ErrorKind::InvalidDuration => write!(f, "Invalid duration: {}", self.text),
            ErrorKind::InvalidPauseDuration => {
                write!(f, "Invalid pause duration: {}", self.text)
            }
            ErrorKind::InvalidFormat => write!(f, "Invalid format: {}", self.text),
        }
    }
}

#[derive(Error, Debug)]
pub enum BidiError {
    /// The sequence still contains erroring tokens.
    ///
    /// Transforms, playback and export all refuse such input.
    ///
    /// # Example
    /// ```
    /// # use bidi_midi::BidiError;
    /// let err = BidiError::SequenceHasErrors {
    ///     count: 2,
    ///     first: "Invalid octave: 9. Range: 0-8".to_string(),
    /// };
    /// assert_eq!(
    ///     err.to_string(),
    ///     "Sequence has 2 error(s); first: Invalid octave: 9. Range: 0-8"
    /// );
    /// ```
    #[error("Sequence has {count} error(s); first: {first}")]
    SequenceHasErrors { count: usize, first: String },

    /// A numeric argument (speed, multiplier, volume) is out of range.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// `play()` was rejected before anything was scheduled.
    #[error("Playback rejected: {0}")]
    Playback(String),

    /// MIDI container could not be read or written.
    #[error("MIDI error: {0}")]
    Codec(String),

    #[error("Render error: {0}")]
    Render(#[from] hound::Error),

    /// Settings file is malformed or holds unusable values.
    #[error("Invalid settings: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
