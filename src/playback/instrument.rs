//! Instrument kinds and their synthesis parameters

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Oscillator shape used by the offline renderer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Waveform {
    Sine,
    Triangle,
    Square,
    Sawtooth,
}

impl Waveform {
    /// Sample the waveform at `phase` in cycles (only the fractional part matters).
    pub fn sample(self, phase: f64) -> f64 {
        let p = phase.fract();
        match self {
            Waveform::Sine => (p * std::f64::consts::TAU).sin(),
            Waveform::Triangle => 1.0 - 4.0 * (p - 0.5).abs(),
            Waveform::Square => {
                if p < 0.5 {
                    1.0
                } else {
                    -1.0
                }
            }
            Waveform::Sawtooth => 2.0 * p - 1.0,
        }
    }
}

/// Synthesis parameters for one instrument
///
/// # Fields
/// - `attack_ms`, `decay_ms`, `release_ms`: envelope segment lengths
/// - `sustain`: envelope level held after decay (0.0-1.0)
/// - `gain`: output level relative to other instruments
/// - `program`: General MIDI program number used on export
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SynthParams {
    pub waveform: Waveform,
    pub attack_ms: f64,
    pub decay_ms: f64,
    pub sustain: f64,
    pub release_ms: f64,
    pub gain: f64,
    pub program: u8,
}

impl SynthParams {
    /// Envelope level `t_ms` after note-on for a note held `held_ms`.
    pub fn envelope(&self, t_ms: f64, held_ms: f64) -> f64 {
        if t_ms < 0.0 {
            return 0.0;
        }
        let level_at = |t: f64| {
            if t < self.attack_ms {
                t / self.attack_ms.max(f64::EPSILON)
            } else if t < self.attack_ms + self.decay_ms {
                let progress = (t - self.attack_ms) / self.decay_ms.max(f64::EPSILON);
                1.0 - (1.0 - self.sustain) * progress
            } else {
                self.sustain
            }
        };
        if t_ms < held_ms {
            return level_at(t_ms);
        }
        let released = t_ms - held_ms;
        if released >= self.release_ms {
            return 0.0;
        }
        level_at(held_ms) * (1.0 - released / self.release_ms.max(f64::EPSILON))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InstrumentKind {
    #[default]
    Synth,
    Piano,
    Organ,
    Bass,
    Pluck,
}

impl InstrumentKind {
    pub const ALL: [InstrumentKind; 5] = [
        InstrumentKind::Synth,
        InstrumentKind::Piano,
        InstrumentKind::Organ,
        InstrumentKind::Bass,
        InstrumentKind::Pluck,
    ];

    pub fn params(self) -> SynthParams {
        match self {
            InstrumentKind::Synth => SynthParams {
                waveform: Waveform::Triangle,
                attack_ms: 5.0,
                decay_ms: 100.0,
                sustain: 0.3,
                release_ms: 300.0,
                gain: 0.8,
                program: 80,
            },
            InstrumentKind::Piano => SynthParams {
                waveform: Waveform::Sine,
                attack_ms: 2.0,
                decay_ms: 400.0,
                sustain: 0.2,
                release_ms: 400.0,
                gain: 0.9,
                program: 0,
            },
            InstrumentKind::Organ => SynthParams {
                waveform: Waveform::Square,
                attack_ms: 10.0,
                decay_ms: 50.0,
                sustain: 0.9,
                release_ms: 80.0,
                gain: 0.35,
                program: 19,
            },
            InstrumentKind::Bass => SynthParams {
                waveform: Waveform::Sawtooth,
                attack_ms: 5.0,
                decay_ms: 200.0,
                sustain: 0.6,
                release_ms: 150.0,
                gain: 0.5,
                program: 33,
            },
            InstrumentKind::Pluck => SynthParams {
                waveform: Waveform::Triangle,
                attack_ms: 1.0,
                decay_ms: 150.0,
                sustain: 0.0,
                release_ms: 100.0,
                gain: 0.9,
                program: 24,
            },
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            InstrumentKind::Synth => "synth",
            InstrumentKind::Piano => "piano",
            InstrumentKind::Organ => "organ",
            InstrumentKind::Bass => "bass",
            InstrumentKind::Pluck => "pluck",
        }
    }
}

impl fmt::Display for InstrumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for InstrumentKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        InstrumentKind::ALL
            .into_iter()
            .find(|kind| kind.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("Unknown instrument: {}", s))
    }
}
