//! Offline audio render
//!
//! Plays voices on a virtual clock, records every note trigger, and mixes
//! them into a 16-bit mono WAV file. Each note uses its instrument's waveform
//! and envelope and rings out for the release time after its duration.

use crate::config::Settings;
use crate::error::BidiError;
use crate::model::Voice;
use crate::playback::{ManualClock, NoteTrigger, Scheduler, TriggerRecorder};
use std::io::Cursor;

/// Mix peaks above this are scaled down to it.
const HEADROOM: f64 = 0.99;

/// Longest render accepted, release tails included: one hour.
pub const MAX_RENDER_MS: f64 = 3_600_000.0;

/// Render voices to WAV bytes at `settings.sample_rate`.
///
/// Voice eligibility and argument checks are the same as for live playback.
pub fn render_wav(voices: &[Voice], speed: f64, settings: &Settings) -> Result<Vec<u8>, BidiError> {
    settings.validate()?;

    let mut scheduler = Scheduler::new(ManualClock::new());
    scheduler.play(voices, speed)?;
    let mut recorder = TriggerRecorder::new();
    scheduler.run(&mut recorder);

    let end_ms = recorder.completed_at_ms().unwrap_or(0.0);
    let tail_ms = recorder
        .triggers()
        .map(|t| t.instrument.params().release_ms)
        .fold(0.0, f64::max);
    let total_ms = end_ms + tail_ms;
    if !total_ms.is_finite() || total_ms > MAX_RENDER_MS {
        return Err(BidiError::InvalidArgument(format!(
            "render would last {} ms, the limit is {} ms",
            total_ms, MAX_RENDER_MS
        )));
    }
    let rate = settings.sample_rate as f64;
    let length = (total_ms * rate / 1000.0).ceil() as usize;

    let mut mix = vec![0.0f64; length];
    for trigger in recorder.triggers() {
        mix_note(&mut mix, trigger, rate);
    }

    let peak = mix.iter().fold(0.0f64, |peak, s| peak.max(s.abs()));
    if peak > HEADROOM {
        let scale = HEADROOM / peak;
        mix.iter_mut().for_each(|s| *s *= scale);
    }

    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: settings.sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec)?;
        for sample in &mix {
            writer.write_sample((sample * 32767.0).clamp(-32768.0, 32767.0) as i16)?;
        }
        writer.finalize()?;
    }

    log::info!(
        "rendered {} note(s), {} samples at {} Hz",
        recorder.triggers().count(),
        length,
        settings.sample_rate
    );
    Ok(cursor.into_inner())
}

fn mix_note(mix: &mut [f64], trigger: &NoteTrigger, rate: f64) {
    let params = trigger.instrument.params();
    let first = (trigger.at_ms * rate / 1000.0).round() as usize;
    let count = ((trigger.duration_ms + params.release_ms) * rate / 1000.0).ceil() as usize;
    let level = params.gain * trigger.velocity as f64;

    for (i, slot) in mix.iter_mut().skip(first).take(count).enumerate() {
        let t_ms = i as f64 * 1000.0 / rate;
        let phase = trigger.frequency_hz * t_ms / 1000.0;
        *slot += params.waveform.sample(phase) * params.envelope(t_ms, trigger.duration_ms) * level;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;
    use crate::playback::InstrumentKind;

    fn settings(rate: u32) -> Settings {
        Settings {
            sample_rate: rate,
            ..Settings::default()
        }
    }

    fn read(bytes: Vec<u8>) -> (hound::WavSpec, Vec<i16>) {
        let reader = hound::WavReader::new(Cursor::new(bytes)).unwrap();
        let spec = reader.spec();
        let samples = reader.into_samples::<i16>().map(|s| s.unwrap()).collect();
        (spec, samples)
    }

    #[test]
    fn test_length_covers_release_tail() {
        let voices = vec![Voice::new(parse("C(100)"))];
        let (spec, samples) = read(render_wav(&voices, 1.0, &settings(8000)).unwrap());
        assert_eq!(spec.channels, 1);
        assert_eq!(spec.sample_rate, 8000);
        assert_eq!(spec.bits_per_sample, 16);
        // 100 ms note + 300 ms synth release
        assert_eq!(samples.len(), 3200);
        assert!(samples.iter().any(|s| s.abs() > 1000));
    }

    #[test]
    fn test_speed_shortens_render() {
        let voices = vec![Voice::new(parse("C")).with_instrument(InstrumentKind::Piano)];
        let (_, normal) = read(render_wav(&voices, 1.0, &settings(8000)).unwrap());
        let (_, fast) = read(render_wav(&voices, 2.0, &settings(8000)).unwrap());
        assert_eq!(normal.len(), 11_200);
        assert_eq!(fast.len(), 7_200);
    }

    #[test]
    fn test_pauses_are_silent() {
        let voices = vec![Voice::new(parse("P(500) A(100)")).with_instrument(InstrumentKind::Pluck)];
        let (_, samples) = read(render_wav(&voices, 1.0, &settings(8000)).unwrap());
        assert!(samples[..4000].iter().all(|s| *s == 0));
        assert!(samples[4000..].iter().any(|s| *s != 0));
    }

    #[test]
    fn test_loud_chords_are_normalized() {
        let voices: Vec<Voice> = ["C", "E", "G", "C5"]
            .iter()
            .map(|text| Voice::new(parse(text)).with_instrument(InstrumentKind::Organ))
            .collect();
        let (_, samples) = read(render_wav(&voices, 1.0, &settings(8000)).unwrap());
        let peak = samples.iter().map(|s| (*s as i32).abs()).max().unwrap();
        assert!(peak <= 32_767);
        assert!(peak > 30_000);
    }

    #[test]
    fn test_refuses_renders_past_the_length_limit() {
        let voices = vec![Voice::new(parse("C(1000000000000000000000)"))];
        assert!(matches!(
            render_wav(&voices, 1.0, &settings(8000)),
            Err(BidiError::InvalidArgument(_))
        ));

        // Fits at normal speed, not when slowed down a thousandfold
        let voices = vec![Voice::new(parse("C(60000)"))];
        assert!(render_wav(&voices, 0.001, &settings(8000)).is_err());
    }

    #[test]
    fn test_refuses_unplayable_voices() {
        let voices = vec![Voice::new(parse("C9"))];
        assert!(matches!(
            render_wav(&voices, 1.0, &settings(8000)),
            Err(BidiError::Playback(_))
        ));
    }
}
