//! # Parser Module
//!
//! Turns lexer elements into timed [`Event`]s.
//!
//! ## Grammars
//! ```text
//! comment := '//' { any-char } '//'
//! pause   := ('P'|'p') ['(' number ')']
//! note    := letter ['#' | 'b'] [octave] ['(' number ')']
//! octave  := ['-'] digits            (valid range 0-8, checked after matching)
//! number  := digits ['.' digits]
//! ```
//! Omitted octave means 4, omitted duration means 1000 ms.
//!
//! ## Validation order (notes)
//! 1. octave range -> `InvalidOctave`
//! 2. duration positivity -> `InvalidDuration`
//!
//! Pauses with a bad duration get `InvalidPauseDuration`. Anything else is an
//! `Invalid` event with `InvalidFormat` and the element text kept verbatim.
//!
//! ## Error recovery
//! Errors never abort the parse. Every element produces exactly one event, in
//! source order. Erroring events still occupy time on the running clock (their
//! parsed duration if it was usable, otherwise the 1000 ms default) so the
//! timeline of the rest of the sequence stays meaningful for highlighting.
//!
//! ## Example
//! ```rust
//! use bidi_midi::{parse, EventKind};
//!
//! let seq = parse("C4(1000)G#P(500)");
//! assert_eq!(seq.len(), 3);
//! assert_eq!(seq[1].kind, EventKind::Note);
//! assert_eq!(seq[2].start_ms, 2000.0);
//! assert_eq!(seq[2].end_ms, 2500.0);
//! ```

use crate::error::{ErrorKind, EventError};
use crate::lexer::{tokenize, Element};
use crate::model::{
    Accidental, Event, EventKind, Letter, Pitch, Sequence, DEFAULT_DURATION_MS, DEFAULT_OCTAVE,
    MAX_OCTAVE, MIN_OCTAVE,
};

/// Result of matching a note element against the note grammar
struct NoteParts<'a> {
    pitch: Pitch,
    octave: Option<&'a str>,
    duration: Option<&'a str>,
}

/// Parser state: the running clock across elements
pub struct Parser {
    current_time: f64,
}

impl Parser {
    pub fn new() -> Self {
        Self { current_time: 0.0 }
    }

    pub fn parse_elements(&mut self, elements: Vec<Element>) -> Sequence {
        let events = elements
            .into_iter()
            .map(|element| self.parse_element(element))
            .collect();
        Sequence::new(events)
    }

    fn parse_element(&mut self, element: Element) -> Event {
        let text = element.text.as_str();
        let mut event = if text.starts_with("//") {
            Self::parse_comment(text)
        } else if text.starts_with(['P', 'p']) {
            Self::parse_pause(text)
        } else if text.chars().next().and_then(Letter::from_char).is_some() {
            Self::parse_note(text)
        } else {
            Self::invalid_format(text)
        };

        event.start_ms = self.current_time;
        event.end_ms = self.current_time + event.duration_ms;
        if !event.is_comment() {
            self.current_time = event.end_ms;
        }
        event.raw_text = element.text;
        event.span = element.span;

        if let Some(err) = &event.error {
            log::debug!(
                "token '{}' at {}:{} rejected: {}",
                event.raw_text,
                event.span.line,
                event.span.column,
                err
            );
        }
        event
    }

    fn blank(kind: EventKind) -> Event {
        Event {
            kind,
            pitch: None,
            octave: None,
            duration_ms: DEFAULT_DURATION_MS,
            start_ms: 0.0,
            end_ms: 0.0,
            raw_text: String::new(),
            span: Default::default(),
            error: None,
        }
    }

    fn invalid_format(text: &str) -> Event {
        let mut event = Self::blank(EventKind::Invalid);
        event.error = Some(EventError::new(ErrorKind::InvalidFormat, text));
        event
    }

    fn parse_comment(text: &str) -> Event {
        // "////" is the shortest closed comment
        if text.len() < 4 || !text.ends_with("//") {
            return Self::invalid_format(text);
        }
        let mut event = Self::blank(EventKind::Comment);
        event.duration_ms = 0.0;
        event
    }

    fn parse_pause(text: &str) -> Event {
        let rest = &text[1..];
        let mut event = Self::blank(EventKind::Pause);
        if rest.is_empty() {
            return event;
        }
        let Some(inner) = parenthesized(rest) else {
            return Self::invalid_format(text);
        };
        match parse_positive_number(inner) {
            Some(duration) => event.duration_ms = duration,
            None => {
                event.error = Some(EventError::new(ErrorKind::InvalidPauseDuration, inner));
            }
        }
        event
    }

    fn parse_note(text: &str) -> Event {
        let Some(parts) = match_note(text) else {
            return Self::invalid_format(text);
        };

        let mut event = Self::blank(EventKind::Note);
        event.pitch = Some(parts.pitch);

        let octave = match parts.octave {
            None => Some(DEFAULT_OCTAVE),
            Some(digits) => digits.parse::<i32>().ok(),
        };
        event.octave = octave;

        let duration = parts.duration.map(parse_positive_number);
        if let Some(Some(ms)) = duration {
            event.duration_ms = ms;
        }

        match octave {
            Some(o) if (MIN_OCTAVE..=MAX_OCTAVE).contains(&o) => {}
            _ => {
                let shown = parts.octave.unwrap_or_default();
                event.error = Some(EventError::new(ErrorKind::InvalidOctave, shown));
                return event;
            }
        }

        if let (Some(None), Some(inner)) = (duration, parts.duration) {
            event.error = Some(EventError::new(ErrorKind::InvalidDuration, inner));
        }
        event
    }
}

impl Default for Parser {
    fn default() -> Self {
        Self::new()
    }
}

/// Match `letter ['#'|'b'] [['-'] digits] ['(' ... ')']` covering the whole text.
fn match_note(text: &str) -> Option<NoteParts<'_>> {
    let mut chars = text.char_indices().peekable();
    let (_, first) = chars.next()?;
    let letter = Letter::from_char(first)?;

    let mut accidental = Accidental::Natural;
    match chars.peek() {
        Some((_, '#')) => {
            accidental = Accidental::Sharp;
            chars.next();
        }
        Some((_, 'b')) if first.is_ascii_uppercase() && letter.takes_flat() => {
            accidental = Accidental::Flat;
            chars.next();
        }
        _ => {}
    }

    let octave_start = chars.peek().map(|(i, _)| *i).unwrap_or(text.len());
    if let Some((_, '-')) = chars.peek() {
        chars.next();
    }
    while let Some((_, c)) = chars.peek() {
        if !c.is_ascii_digit() {
            break;
        }
        chars.next();
    }
    let octave_end = chars.peek().map(|(i, _)| *i).unwrap_or(text.len());
    let octave = &text[octave_start..octave_end];
    if octave == "-" {
        return None;
    }

    let rest = &text[octave_end..];
    let duration = if rest.is_empty() {
        None
    } else {
        Some(parenthesized(rest)?)
    };

    Some(NoteParts {
        pitch: Pitch::new(letter, accidental),
        octave: (!octave.is_empty()).then_some(octave),
        duration,
    })
}

/// Inner text of `(...)` when `text` is exactly one parenthesized group.
fn parenthesized(text: &str) -> Option<&str> {
    let inner = text.strip_prefix('(')?.strip_suffix(')')?;
    if inner.contains(['(', ')']) {
        return None;
    }
    Some(inner)
}

/// `digits ['.' digits]`, strictly positive.
pub fn parse_positive_number(text: &str) -> Option<f64> {
    let (whole, fraction) = match text.split_once('.') {
        Some((w, f)) => (w, Some(f)),
        None => (text, None),
    };
    let all_digits = |s: &str| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit());
    if !all_digits(whole) || !fraction.map_or(true, all_digits) {
        return None;
    }
    let value: f64 = text.parse().ok()?;
    (value.is_finite() && value > 0.0).then_some(value)
}

/// Parse notation text into a sequence. Never fails; see module docs.
pub fn parse(source: &str) -> Sequence {
    let elements = tokenize(source);
    let sequence = Parser::new().parse_elements(elements);
    log::debug!(
        "parsed {} event(s), {} error(s), {} ms",
        sequence.len(),
        sequence.errors().count(),
        sequence.total_duration_ms()
    );
    sequence
}

#[cfg(test)]
mod tests {
    use super::*;

    fn note_summary(e: &Event) -> (String, i32, f64, f64, f64) {
        (
            e.pitch.map(|p| p.to_string()).unwrap_or_default(),
            e.octave.unwrap_or(-99),
            e.duration_ms,
            e.start_ms,
            e.end_ms,
        )
    }

    #[test]
    fn test_basic_sequence() {
        let seq = parse("C4(1000)G#P(500)");
        assert_eq!(seq.len(), 3);
        assert!(!seq.has_errors());

        assert_eq!(seq[0].kind, EventKind::Note);
        assert_eq!(note_summary(&seq[0]), ("C".into(), 4, 1000.0, 0.0, 1000.0));
        assert_eq!(seq[1].kind, EventKind::Note);
        assert_eq!(note_summary(&seq[1]), ("G#".into(), 4, 1000.0, 1000.0, 2000.0));
        assert_eq!(seq[2].kind, EventKind::Pause);
        assert_eq!(seq[2].duration_ms, 500.0);
        assert_eq!((seq[2].start_ms, seq[2].end_ms), (2000.0, 2500.0));
    }

    #[test]
    fn test_lowercase_is_normalized() {
        let seq = parse("a3(250)");
        assert_eq!(note_summary(&seq[0]), ("A".into(), 3, 250.0, 0.0, 250.0));
        assert_eq!(seq[0].raw_text, "a3(250)");
    }

    #[test]
    fn test_flats_are_kept_as_written() {
        let seq = parse("Bb3Eb");
        assert_eq!(seq.len(), 2);
        assert_eq!(seq[0].pitch, Some(Pitch::new(Letter::B, Accidental::Flat)));
        assert_eq!(seq[0].octave, Some(3));
        assert_eq!(seq[1].pitch, Some(Pitch::new(Letter::E, Accidental::Flat)));
    }

    #[test]
    fn test_fractional_durations() {
        let seq = parse("C(0.5)P(12.25)");
        assert_eq!(seq[0].duration_ms, 0.5);
        assert_eq!(seq[1].duration_ms, 12.25);
        assert_eq!(seq[1].end_ms, 12.75);
    }

    #[test]
    fn test_comment_does_not_advance_clock() {
        let seq = parse("C // intro // D");
        assert_eq!(seq.len(), 3);
        assert_eq!(seq[1].kind, EventKind::Comment);
        assert_eq!(seq[1].duration_ms, 0.0);
        assert_eq!((seq[1].start_ms, seq[1].end_ms), (1000.0, 1000.0));
        assert_eq!((seq[2].start_ms, seq[2].end_ms), (1000.0, 2000.0));
    }

    #[test]
    fn test_unterminated_comment_is_invalid() {
        let seq = parse("C // never closed");
        assert_eq!(seq[1].kind, EventKind::Invalid);
        assert_eq!(seq[1].error.as_ref().map(|e| e.kind), Some(ErrorKind::InvalidFormat));
        assert_eq!(seq[1].raw_text, "// never closed");
    }

    #[test]
    fn test_octave_out_of_range() {
        let seq = parse("C9 C-1 C10(500)");
        for (event, shown) in seq.iter().zip(["9", "-1", "10"]) {
            assert_eq!(event.kind, EventKind::Note);
            let err = event.error.as_ref().expect("octave error");
            assert_eq!(err.kind, ErrorKind::InvalidOctave);
            assert_eq!(err.text, shown);
        }
        assert_eq!(seq[1].raw_text, "C-1");
        assert_eq!(seq[2].duration_ms, 500.0);
        assert_eq!(seq[2].start_ms, 2000.0);
    }

    #[test]
    fn test_octave_checked_before_duration() {
        let seq = parse("C9(0)");
        assert_eq!(seq[0].error.as_ref().map(|e| e.kind), Some(ErrorKind::InvalidOctave));
    }

    #[test]
    fn test_invalid_note_durations() {
        let seq = parse("C(0)D(abc)E()F(-5)");
        for event in seq.iter() {
            assert_eq!(
                event.error.as_ref().map(|e| e.kind),
                Some(ErrorKind::InvalidDuration),
                "{}",
                event.raw_text
            );
            assert_eq!(event.duration_ms, DEFAULT_DURATION_MS);
        }
        assert_eq!(seq[3].end_ms, 4000.0);
    }

    #[test]
    fn test_invalid_pause_durations() {
        let seq = parse("P(0)p(x)");
        assert!(seq
            .iter()
            .all(|e| e.error.as_ref().map(|e| e.kind) == Some(ErrorKind::InvalidPauseDuration)));
        assert!(seq.iter().all(|e| e.kind == EventKind::Pause));
    }

    #[test]
    fn test_invalid_format_preserved_verbatim() {
        let seq = parse("C4 x9 D C4(1)(2) P5");
        assert_eq!(seq.len(), 5);
        for i in [1, 3, 4] {
            assert_eq!(seq[i].kind, EventKind::Invalid);
            assert_eq!(seq[i].error.as_ref().map(|e| e.kind), Some(ErrorKind::InvalidFormat));
        }
        assert_eq!(seq[1].error.as_ref().map(|e| e.text.as_str()), Some("x9"));
        assert_eq!(seq[3].raw_text, "C4(1)(2)");
        // Errors never stop the remaining tokens from parsing
        assert!(!seq[2].has_error());
        assert_eq!(seq[2].start_ms, 2000.0);
    }

    #[test]
    fn test_parse_is_deterministic() {
        let source = "C4(1000)G#P(500) // hi // x Bb2(333.5)";
        assert_eq!(parse(source), parse(source));
    }

    #[test]
    fn test_timeline_is_contiguous() {
        let seq = parse("C(100) P(50) // c // D9 E(250) x F");
        let timed: Vec<&Event> = seq.iter().filter(|e| !e.is_comment()).collect();
        for pair in timed.windows(2) {
            assert_eq!(pair[0].end_ms, pair[1].start_ms);
        }
        for e in &timed {
            assert_eq!(e.end_ms, e.start_ms + e.duration_ms);
        }
    }

    #[test]
    fn test_number_grammar() {
        assert_eq!(parse_positive_number("500"), Some(500.0));
        assert_eq!(parse_positive_number("0.25"), Some(0.25));
        assert_eq!(parse_positive_number("0"), None);
        assert_eq!(parse_positive_number(".5"), None);
        assert_eq!(parse_positive_number("5."), None);
        assert_eq!(parse_positive_number("1e3"), None);
        assert_eq!(parse_positive_number(""), None);
    }
}
