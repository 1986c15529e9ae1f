//! Voices -> Standard MIDI File bytes

use super::{channel_for_voice, round_half_up};
use crate::config::Settings;
use crate::error::BidiError;
use crate::model::{ensure_error_free, Voice};
use midly::num::u28;
use midly::{Format, Header, MetaMessage, MidiMessage, Smf, Timing, Track, TrackEvent, TrackEventKind};

const CONDUCTOR_NAME: &str = "bidi-midi";

/// Sort rank for events sharing a tick: setup first, then releases, then
/// attacks, so a repeated pitch is released before it is struck again.
const RANK_SETUP: u8 = 0;
const RANK_NOTE_OFF: u8 = 1;
const RANK_NOTE_ON: u8 = 2;

/// Encode voices as a format 1 MIDI file.
///
/// Every voice must be error-free. Voices without a sounding note are left
/// out; mute and solo are playback concerns and do not affect export.
pub fn export_smf(voices: &[Voice], settings: &Settings) -> Result<Vec<u8>, BidiError> {
    settings.validate()?;
    for voice in voices {
        ensure_error_free(&voice.sequence)?;
    }

    let exported: Vec<(usize, &Voice)> = voices
        .iter()
        .enumerate()
        .filter(|(_, voice)| voice.has_sounding_notes())
        .collect();
    if exported.is_empty() {
        return Err(BidiError::Codec("no voice has a note to export".to_string()));
    }

    let names: Vec<String> = exported
        .iter()
        .map(|(index, _)| format!("Voice {}", index + 1))
        .collect();

    let mut tracks = Vec::with_capacity(exported.len() + 1);
    tracks.push(build_conductor_track(settings));
    for ((index, voice), name) in exported.iter().zip(&names) {
        tracks.push(build_voice_track(voice, channel_for_voice(*index), name, settings)?);
    }

    let smf = Smf {
        header: Header {
            format: Format::Parallel,
            timing: Timing::Metrical(settings.ticks_per_quarter.into()),
        },
        tracks,
    };

    let mut bytes = Vec::new();
    smf.write(&mut bytes)
        .map_err(|e| BidiError::Codec(format!("failed to write MIDI: {}", e)))?;

    log::info!(
        "exported {} voice track(s), {} bytes",
        exported.len(),
        bytes.len()
    );
    Ok(bytes)
}

fn build_conductor_track<'a>(settings: &Settings) -> Track<'a> {
    vec![
        TrackEvent {
            delta: 0.into(),
            kind: TrackEventKind::Meta(MetaMessage::TrackName(CONDUCTOR_NAME.as_bytes())),
        },
        TrackEvent {
            delta: 0.into(),
            kind: TrackEventKind::Meta(MetaMessage::Tempo(settings.micros_per_quarter().into())),
        },
        TrackEvent {
            delta: 0.into(),
            kind: TrackEventKind::Meta(MetaMessage::EndOfTrack),
        },
    ]
}

/// Reject tick positions a 28-bit delta time cannot reach from zero.
fn checked_tick(tick: f64, track: &str) -> Result<u32, BidiError> {
    let max = u28::max_value().as_int();
    if !tick.is_finite() || tick < 0.0 || tick > max as f64 {
        return Err(BidiError::Codec(format!(
            "{}: tick {} is past the MIDI limit of {}",
            track, tick, max
        )));
    }
    Ok(tick as u32)
}

fn build_voice_track<'a>(
    voice: &Voice,
    channel: u8,
    name: &'a str,
    settings: &Settings,
) -> Result<Track<'a>, BidiError> {
    voice.validate_volume()?;
    let velocity = ((voice.volume * 127.0).round() as u8).max(1);
    let ticks_per_ms = settings.ticks_per_ms();
    let to_tick = |ms: f64| checked_tick(round_half_up(ms * ticks_per_ms), name);

    let mut events: Vec<(u32, u8, TrackEventKind<'a>)> = vec![
        (0, RANK_SETUP, TrackEventKind::Meta(MetaMessage::TrackName(name.as_bytes()))),
        (
            0,
            RANK_SETUP,
            TrackEventKind::Midi {
                channel: channel.into(),
                message: MidiMessage::ProgramChange {
                    program: voice.instrument.params().program.into(),
                },
            },
        ),
    ];

    for event in voice.sequence.iter() {
        let Some(key) = event.midi_note() else {
            continue;
        };
        let tick_on = to_tick(event.start_ms)?;
        let tick_off = checked_tick(to_tick(event.end_ms)?.max(tick_on + 1) as f64, name)?;
        events.push((
            tick_on,
            RANK_NOTE_ON,
            TrackEventKind::Midi {
                channel: channel.into(),
                message: MidiMessage::NoteOn {
                    key: key.into(),
                    vel: velocity.into(),
                },
            },
        ));
        events.push((
            tick_off,
            RANK_NOTE_OFF,
            TrackEventKind::Midi {
                channel: channel.into(),
                message: MidiMessage::NoteOff {
                    key: key.into(),
                    vel: 0.into(),
                },
            },
        ));
    }

    events.sort_by_key(|(tick, rank, _)| (*tick, *rank));

    // Absolute ticks -> delta times
    let mut track = Track::with_capacity(events.len() + 1);
    let mut last_tick = 0;
    for (tick, _, kind) in events {
        track.push(TrackEvent {
            delta: tick.saturating_sub(last_tick).into(),
            kind,
        });
        last_tick = tick;
    }
    let end_tick = to_tick(voice.sequence.total_duration_ms())?;
    track.push(TrackEvent {
        delta: end_tick.saturating_sub(last_tick).into(),
        kind: TrackEventKind::Meta(MetaMessage::EndOfTrack),
    });

    log::debug!(
        "voice track {:?}: channel {}, {} event(s)",
        name,
        channel,
        track.len()
    );
    Ok(track)
}
