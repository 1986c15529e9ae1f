use crate::error::BidiError;
use crate::model::{ensure_error_free, Event};
use crate::serializer::serialize;

/// Products closer than this to an integer are treated as that integer before
/// rounding up, so `1000 * 1.1` scales to 1100 rather than 1101.
const ROUNDING_TOLERANCE: f64 = 1e-9;

/// `ceil(duration * multiplier)`
pub fn scaled_duration(duration_ms: f64, multiplier: f64) -> f64 {
    let product = duration_ms * multiplier;
    let nearest = product.round();
    if (product - nearest).abs() < ROUNDING_TOLERANCE {
        nearest
    } else {
        product.ceil()
    }
}

/// Multiply every note and pause duration and return the new notation text.
///
/// Comments are unaffected. The multiplier must be positive and finite; the
/// events must be error-free.
pub fn scale_events(events: &[Event], multiplier: f64) -> Result<String, BidiError> {
    if !multiplier.is_finite() || multiplier <= 0.0 {
        return Err(BidiError::InvalidArgument(format!(
            "duration multiplier must be a positive number, got {}",
            multiplier
        )));
    }
    ensure_error_free(events)?;

    let scaled: Vec<Event> = events
        .iter()
        .map(|event| {
            if event.is_comment() {
                return event.clone();
            }
            Event {
                duration_ms: scaled_duration(event.duration_ms, multiplier),
                ..event.clone()
            }
        })
        .collect();

    log::debug!("scaled {} event(s) by {}", events.len(), multiplier);
    Ok(serialize(&scaled))
}
