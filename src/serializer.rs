//! Event list -> notation text.
//!
//! Values equal to the parser defaults are omitted (`octave == 4`,
//! `duration == 1000 ms`), so `parse(serialize(events))` reproduces the same
//! notes, octaves, durations and timeline. Comments and erroring tokens are
//! written back verbatim from their source text.

use crate::model::{Accidental, Event, EventKind, DEFAULT_DURATION_MS, DEFAULT_OCTAVE};
use std::fmt::Write;

/// Serialize events back into compact notation.
pub fn serialize(events: &[Event]) -> String {
    let mut out = String::new();
    for event in events {
        write_event(&mut out, event);
    }
    out
}

fn write_event(out: &mut String, event: &Event) {
    if event.has_error() {
        out.push_str(&event.raw_text);
        return;
    }
    match event.kind {
        EventKind::Note => match (event.pitch, event.octave) {
            (Some(pitch), Some(octave)) => {
                out.push(pitch.letter.as_char());
                match pitch.accidental {
                    Accidental::Natural => {}
                    Accidental::Sharp => out.push('#'),
                    Accidental::Flat => out.push('b'),
                }
                if octave != DEFAULT_OCTAVE {
                    let _ = write!(out, "{}", octave);
                }
                write_duration(out, event.duration_ms);
            }
            _ => out.push_str(&event.raw_text),
        },
        EventKind::Pause => {
            out.push('P');
            write_duration(out, event.duration_ms);
        }
        EventKind::Comment | EventKind::Invalid => out.push_str(&event.raw_text),
    }
}

fn write_duration(out: &mut String, duration_ms: f64) {
    if duration_ms != DEFAULT_DURATION_MS {
        let _ = write!(out, "({})", format_number(duration_ms));
    }
}

/// Shortest decimal form accepted by the number grammar (`1000`, `0.5`).
pub fn format_number(value: f64) -> String {
    // f64's Display never uses exponent notation and drops a zero fraction
    format!("{}", value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Letter, Pitch};
    use crate::parser::parse;

    #[test]
    fn test_defaults_are_omitted() {
        let events = vec![
            Event::note(Pitch::natural(Letter::C), 4, 1000.0, 0.0),
            Event::note(Pitch::new(Letter::G, Accidental::Sharp), 5, 250.0, 1000.0),
            Event::pause(1000.0, 1250.0),
            Event::pause(0.5, 2250.0),
        ];
        assert_eq!(serialize(&events), "CG#5(250)PP(0.5)");
    }

    #[test]
    fn test_comments_and_flats_survive() {
        let text = serialize(&parse("// theme // Bb3(500) c"));
        assert_eq!(text, "// theme //Bb3(500)C");
    }

    #[test]
    fn test_roundtrip_preserves_timeline() {
        let original = parse("C4(1000)G#P(500) a2(125.5) // x // p(3)");
        let again = parse(&serialize(&original));
        assert_eq!(original.len(), again.len());
        for (a, b) in original.iter().zip(again.iter()) {
            assert_eq!(a.kind, b.kind);
            assert_eq!(a.pitch, b.pitch);
            assert_eq!(a.octave, b.octave);
            assert_eq!(a.duration_ms, b.duration_ms);
            assert_eq!((a.start_ms, a.end_ms), (b.start_ms, b.end_ms));
        }
    }

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(1000.0), "1000");
        assert_eq!(format_number(0.5), "0.5");
        assert_eq!(format_number(1501.0), "1501");
    }
}
