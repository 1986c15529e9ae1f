//! Standard MIDI File bytes -> notation, one entry per monophonic voice

use super::round_half_up;
use super::split::{split_monophonic, voice_to_notation, TimedNote};
use crate::config::Settings;
use crate::error::BidiError;
use crate::model::{MAX_OCTAVE, MIN_OCTAVE};
use midly::{MetaMessage, MidiMessage, Smf, Timing, TrackEvent, TrackEventKind};
use serde::Serialize;
use std::collections::{HashMap, VecDeque};

/// 120 bpm, the Standard MIDI File default when no tempo is given.
const DEFAULT_MICROS_PER_QUARTER: u32 = 500_000;

/// One reconstructed voice.
///
/// A track holding chords yields several voices that share `track` and
/// `name`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportedVoice {
    /// Index of the source track in the file
    pub track: usize,
    /// Track name meta event, if present
    pub name: Option<String>,
    pub notation: String,
}

/// Decode a MIDI file into monophonic voices of notation text.
///
/// Fails when the container is corrupt or has no note-bearing track. Notes
/// that cannot be written in notation are skipped with a warning.
pub fn import_smf(bytes: &[u8], settings: &Settings) -> Result<Vec<ImportedVoice>, BidiError> {
    settings.validate()?;
    let smf = Smf::parse(bytes).map_err(|e| BidiError::Codec(format!("corrupt MIDI file: {}", e)))?;
    let time_map = TimeMap::new(&smf);

    let mut voices = Vec::new();
    for (track_index, track) in smf.tracks.iter().enumerate() {
        let (name, notes) = read_track(track, track_index, &time_map);
        if notes.is_empty() {
            continue;
        }
        let split = split_monophonic(&notes, settings.import_epsilon_ms);
        log::debug!(
            "track {}: {} note(s) in {} voice(s)",
            track_index,
            notes.len(),
            split.len()
        );
        for voice in split {
            voices.push(ImportedVoice {
                track: track_index,
                name: name.clone(),
                notation: voice_to_notation(&voice, settings.import_epsilon_ms),
            });
        }
    }

    if voices.is_empty() {
        return Err(BidiError::Codec(
            "MIDI file has no note-bearing tracks".to_string(),
        ));
    }
    log::info!(
        "imported {} voice(s) from {} track(s)",
        voices.len(),
        smf.tracks.len()
    );
    Ok(voices)
}

/// Collect a track's name and its notes in milliseconds.
fn read_track(
    track: &[TrackEvent],
    track_index: usize,
    time_map: &TimeMap,
) -> (Option<String>, Vec<TimedNote>) {
    let mut name = None;
    let mut open: HashMap<(u8, u8), VecDeque<u64>> = HashMap::new();
    let mut spans: Vec<(u64, u64, u8)> = Vec::new();
    let mut tick: u64 = 0;

    for event in track {
        tick += event.delta.as_int() as u64;
        match &event.kind {
            TrackEventKind::Meta(MetaMessage::TrackName(bytes)) if name.is_none() => {
                name = Some(String::from_utf8_lossy(bytes).into_owned());
            }
            TrackEventKind::Midi { channel, message } => {
                let (key, starts) = match message {
                    MidiMessage::NoteOn { key, vel } if vel.as_int() > 0 => {
                        open.entry((channel.as_int(), key.as_int()))
                            .or_default()
                            .push_back(tick);
                        continue;
                    }
                    MidiMessage::NoteOn { key, .. } | MidiMessage::NoteOff { key, .. } => {
                        (key.as_int(), open.get_mut(&(channel.as_int(), key.as_int())))
                    }
                    _ => continue,
                };
                // Overlapping notes of one key are released in the order struck
                match starts.and_then(|s| s.pop_front()) {
                    Some(start) => spans.push((start, tick, key)),
                    None => log::debug!("track {}: stray note off for key {}", track_index, key),
                }
            }
            _ => {}
        }
    }

    for ((_, key), starts) in open {
        for start in starts {
            log::warn!(
                "track {}: key {} still sounding at end of track, closing it",
                track_index,
                key
            );
            spans.push((start, tick, key));
        }
    }

    let lowest = (12 * (MIN_OCTAVE + 1)) as u8;
    let highest = (12 * (MAX_OCTAVE + 2) - 1) as u8;
    let mut notes = Vec::with_capacity(spans.len());
    for (start, end, key) in spans {
        if !(lowest..=highest).contains(&key) {
            log::warn!(
                "track {}: skipping key {} outside octaves {}-{}",
                track_index,
                key,
                MIN_OCTAVE,
                MAX_OCTAVE
            );
            continue;
        }
        let start_ms = round_half_up(time_map.tick_to_ms(start));
        let end_ms = round_half_up(time_map.tick_to_ms(end));
        if end_ms - start_ms < 1.0 {
            log::warn!(
                "track {}: skipping key {} shorter than 1 ms at tick {}",
                track_index,
                key,
                start
            );
            continue;
        }
        notes.push(TimedNote::new(start_ms, end_ms, key));
    }
    (name, notes)
}

/// One constant-tempo stretch of a metrical file.
#[derive(Debug, Clone, Copy)]
struct TempoSegment {
    tick: u64,
    ms: f64,
    micros_per_quarter: u32,
}

/// Tick -> millisecond conversion for a whole file.
#[derive(Debug)]
enum TimeMap {
    Metrical {
        ticks_per_quarter: f64,
        segments: Vec<TempoSegment>,
    },
    Timecode {
        ms_per_tick: f64,
    },
}

impl TimeMap {
    fn new(smf: &Smf) -> Self {
        match smf.header.timing {
            Timing::Metrical(tpq) => {
                let ticks_per_quarter = tpq.as_int().max(1) as f64;
                let mut changes = Vec::new();
                for track in &smf.tracks {
                    let mut tick: u64 = 0;
                    for event in track {
                        tick += event.delta.as_int() as u64;
                        if let TrackEventKind::Meta(MetaMessage::Tempo(tempo)) = event.kind {
                            if tempo.as_int() > 0 {
                                changes.push((tick, tempo.as_int()));
                            }
                        }
                    }
                }
                changes.sort_by_key(|(tick, _)| *tick);
                Self::Metrical {
                    ticks_per_quarter,
                    segments: build_segments(&changes, ticks_per_quarter),
                }
            }
            Timing::Timecode(fps, subframes) => {
                let ticks_per_second = fps.as_f32() as f64 * subframes.max(1) as f64;
                Self::Timecode {
                    ms_per_tick: 1000.0 / ticks_per_second,
                }
            }
        }
    }

    fn tick_to_ms(&self, tick: u64) -> f64 {
        match self {
            Self::Timecode { ms_per_tick } => tick as f64 * ms_per_tick,
            Self::Metrical {
                ticks_per_quarter,
                segments,
            } => {
                let index = segments.partition_point(|s| s.tick <= tick).saturating_sub(1);
                let segment = segments[index];
                segment.ms
                    + (tick - segment.tick) as f64 * segment.micros_per_quarter as f64
                        / (ticks_per_quarter * 1000.0)
            }
        }
    }
}

/// `changes` must be sorted by tick. The first segment always starts at 0.
fn build_segments(changes: &[(u64, u32)], ticks_per_quarter: f64) -> Vec<TempoSegment> {
    let mut segments = vec![TempoSegment {
        tick: 0,
        ms: 0.0,
        micros_per_quarter: DEFAULT_MICROS_PER_QUARTER,
    }];
    for &(tick, micros_per_quarter) in changes {
        let Some(last) = segments.last_mut() else {
            break;
        };
        if last.tick == tick {
            last.micros_per_quarter = micros_per_quarter;
            continue;
        }
        let ms = last.ms
            + (tick - last.tick) as f64 * last.micros_per_quarter as f64
                / (ticks_per_quarter * 1000.0);
        segments.push(TempoSegment {
            tick,
            ms,
            micros_per_quarter,
        });
    }
    segments
}
