//! # Settings
//!
//! Tunables for export, import, rendering and the command-line tool, read from
//! an optional YAML file. Every key is optional:
//!
//! ```yaml
//! ticks-per-quarter: 500   # MIDI time division on export
//! tempo-bpm: 120           # tempo written on export
//! import-epsilon-ms: 1.0   # overlap/gap tolerance when splitting voices
//! sample-rate: 44100       # WAV render rate
//! speed: 1.0               # playback and render speed
//! octave-policy: wrap      # wrap | clamp, used by transpose
//! ```
//!
//! The defaults make one exported tick last exactly one millisecond.

use crate::error::BidiError;
use crate::transpose::OctavePolicy;
use serde::Deserialize;
use std::path::Path;

/// Largest time division a metrical MIDI header can carry (15 bits).
pub const MAX_TICKS_PER_QUARTER: u16 = 0x7fff;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct Settings {
    pub ticks_per_quarter: u16,
    pub tempo_bpm: f64,
    pub import_epsilon_ms: f64,
    pub sample_rate: u32,
    pub speed: f64,
    pub octave_policy: OctavePolicy,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            ticks_per_quarter: 500,
            tempo_bpm: 120.0,
            import_epsilon_ms: 1.0,
            sample_rate: 44_100,
            speed: 1.0,
            octave_policy: OctavePolicy::Wrap,
        }
    }
}

impl Settings {
    /// Parse and validate YAML settings. An empty document yields the defaults.
    pub fn from_yaml_str(content: &str) -> Result<Self, BidiError> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        let settings: Settings =
            serde_yaml::from_str(content).map_err(|e| BidiError::Config(e.to_string()))?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, BidiError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let settings = Self::from_yaml_str(&content)?;
        log::debug!("loaded settings from {}: {:?}", path.display(), settings);
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), BidiError> {
        if self.ticks_per_quarter == 0 || self.ticks_per_quarter > MAX_TICKS_PER_QUARTER {
            return Err(BidiError::Config(format!(
                "ticks-per-quarter must be within 1-{}, got {}",
                MAX_TICKS_PER_QUARTER, self.ticks_per_quarter
            )));
        }
        if self.sample_rate == 0 {
            return Err(BidiError::Config("sample-rate must be positive".to_string()));
        }
        for (name, value) in [
            ("tempo-bpm", self.tempo_bpm),
            ("import-epsilon-ms", self.import_epsilon_ms),
            ("speed", self.speed),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(BidiError::Config(format!(
                    "{} must be a positive number, got {}",
                    name, value
                )));
            }
        }
        Ok(())
    }

    /// Export ticks per millisecond at the configured tempo.
    pub fn ticks_per_ms(&self) -> f64 {
        self.ticks_per_quarter as f64 * self.tempo_bpm / 60_000.0
    }

    /// Tempo meta value: microseconds per quarter note.
    pub fn micros_per_quarter(&self) -> u32 {
        (60_000_000.0 / self.tempo_bpm).round() as u32
    }
}
