use super::*;
use crate::config::Settings;
use crate::error::BidiError;
use crate::model::Voice;
use crate::parser::parse;
use crate::playback::InstrumentKind;
use midly::{
    Format, Fps, Header, MetaMessage, MidiMessage, Smf, Timing, Track, TrackEvent, TrackEventKind,
};

fn voice(text: &str) -> Voice {
    Voice::new(parse(text))
}

fn note_on(delta: u32, key: u8, vel: u8) -> TrackEvent<'static> {
    TrackEvent {
        delta: delta.into(),
        kind: TrackEventKind::Midi {
            channel: 0.into(),
            message: MidiMessage::NoteOn {
                key: key.into(),
                vel: vel.into(),
            },
        },
    }
}

fn note_off(delta: u32, key: u8) -> TrackEvent<'static> {
    TrackEvent {
        delta: delta.into(),
        kind: TrackEventKind::Midi {
            channel: 0.into(),
            message: MidiMessage::NoteOff {
                key: key.into(),
                vel: 0.into(),
            },
        },
    }
}

fn end_of_track(delta: u32) -> TrackEvent<'static> {
    TrackEvent {
        delta: delta.into(),
        kind: TrackEventKind::Meta(MetaMessage::EndOfTrack),
    }
}

/// Format 1 file at 500 tpq with no tempo event (120 bpm), so 1 tick = 1 ms.
fn file_with(timing: Timing, tracks: Vec<Track<'static>>) -> Vec<u8> {
    let smf = Smf {
        header: Header {
            format: Format::Parallel,
            timing,
        },
        tracks,
    };
    let mut bytes = Vec::new();
    smf.write(&mut bytes).unwrap();
    bytes
}

fn notations(bytes: &[u8]) -> Vec<String> {
    import_smf(bytes, &Settings::default())
        .unwrap()
        .into_iter()
        .map(|v| v.notation)
        .collect()
}

#[test]
fn test_round_trip_single_voice() {
    let settings = Settings::default();
    let bytes = export_smf(&[voice("C D(500) P(250) E5(333) // end //")], &settings).unwrap();
    let imported = import_smf(&bytes, &settings).unwrap();

    assert_eq!(imported.len(), 1);
    assert_eq!(imported[0].track, 1);
    assert_eq!(imported[0].name.as_deref(), Some("Voice 1"));
    assert_eq!(imported[0].notation, "CD(500)P(250)E5(333)");
}

#[test]
fn test_round_trip_keeps_leading_pause_and_flats_as_sharps() {
    let bytes = export_smf(&[voice("P(200) Bb3(250) Bb3(250)")], &Settings::default()).unwrap();
    assert_eq!(notations(&bytes), vec!["P(200)A#3(250)A#3(250)"]);
}

#[test]
fn test_round_trip_at_other_time_division() {
    let settings = Settings::from_yaml_str("ticks-per-quarter: 96\ntempo-bpm: 90\n").unwrap();
    let bytes = export_smf(&[voice("G(250) A(750)")], &settings).unwrap();
    let imported = import_smf(&bytes, &settings).unwrap();
    assert_eq!(imported[0].notation, "G(250)A(750)");
}

#[test]
fn test_chord_track_splits_into_voices() {
    let bytes = file_with(
        Timing::Metrical(500.into()),
        vec![vec![
            note_on(0, 60, 100),
            note_on(0, 64, 100),
            note_off(500, 60),
            note_off(0, 64),
            end_of_track(0),
        ]],
    );
    assert_eq!(notations(&bytes), vec!["C(500)", "E(500)"]);
}

#[test]
fn test_note_on_with_zero_velocity_releases() {
    let bytes = file_with(
        Timing::Metrical(500.into()),
        vec![vec![
            note_on(0, 62, 90),
            note_on(250, 62, 0),
            note_on(0, 64, 90),
            note_on(250, 64, 0),
            end_of_track(0),
        ]],
    );
    assert_eq!(notations(&bytes), vec!["D(250)E(250)"]);
}

#[test]
fn test_same_key_overlap_pairs_first_in_first_out() {
    let bytes = file_with(
        Timing::Metrical(500.into()),
        vec![vec![
            note_on(0, 60, 90),
            note_on(100, 60, 90),
            note_off(100, 60),
            note_off(100, 60),
            end_of_track(0),
        ]],
    );
    assert_eq!(notations(&bytes), vec!["C(200)", "P(100)C(200)"]);
}

#[test]
fn test_open_notes_close_at_end_of_track() {
    let bytes = file_with(
        Timing::Metrical(500.into()),
        vec![vec![note_on(0, 69, 90), end_of_track(400)]],
    );
    assert_eq!(notations(&bytes), vec!["A(400)"]);
}

#[test]
fn test_out_of_range_and_tiny_notes_are_skipped() {
    let bytes = file_with(
        Timing::Metrical(500.into()),
        vec![vec![
            note_on(0, 5, 90),
            note_off(100, 5),
            note_on(0, 127, 90),
            note_off(100, 127),
            note_on(0, 60, 90),
            note_off(0, 60),
            note_on(0, 72, 90),
            note_off(300, 72),
            end_of_track(0),
        ]],
    );
    assert_eq!(notations(&bytes), vec!["P(200)C5(300)"]);
}

#[test]
fn test_tempo_map_from_conductor_track() {
    let conductor = vec![
        TrackEvent {
            delta: 0.into(),
            kind: TrackEventKind::Meta(MetaMessage::Tempo(1_000_000.into())),
        },
        TrackEvent {
            delta: 480.into(),
            kind: TrackEventKind::Meta(MetaMessage::Tempo(250_000.into())),
        },
        end_of_track(0),
    ];
    let melody = vec![
        note_on(0, 60, 90),
        note_off(480, 60),
        note_on(0, 62, 90),
        note_off(480, 62),
        end_of_track(0),
    ];
    let bytes = file_with(Timing::Metrical(480.into()), vec![conductor, melody]);
    assert_eq!(notations(&bytes), vec!["CD(250)"]);
}

#[test]
fn test_timecode_division() {
    // 25 fps * 40 subframes = 1000 ticks per second
    let bytes = file_with(
        Timing::Timecode(Fps::Fps25, 40),
        vec![vec![note_on(0, 60, 90), note_off(750, 60), end_of_track(0)]],
    );
    assert_eq!(notations(&bytes), vec!["C(750)"]);
}

#[test]
fn test_export_layout() {
    let voices = vec![
        voice("C D").with_instrument(InstrumentKind::Piano).with_volume(0.5),
        voice("P // nothing sounds //"),
        voice("E"),
    ];
    let bytes = export_smf(&voices, &Settings::default()).unwrap();
    let smf = Smf::parse(&bytes).unwrap();

    assert_eq!(smf.header.timing, Timing::Metrical(500.into()));
    assert_eq!(smf.tracks.len(), 3);
    assert!(smf.tracks[0].iter().any(|e| matches!(
        e.kind,
        TrackEventKind::Meta(MetaMessage::Tempo(t)) if t.as_int() == 500_000
    )));

    let first = &smf.tracks[1];
    assert!(first.iter().any(|e| matches!(
        e.kind,
        TrackEventKind::Meta(MetaMessage::TrackName(name)) if name == b"Voice 1"
    )));
    assert!(first.iter().any(|e| matches!(
        e.kind,
        TrackEventKind::Midi { message: MidiMessage::ProgramChange { program }, .. }
            if program.as_int() == 0
    )));
    assert!(first.iter().any(|e| matches!(
        e.kind,
        TrackEventKind::Midi { message: MidiMessage::NoteOn { vel, .. }, .. }
            if vel.as_int() == 64
    )));

    // The third voice keeps its own index for naming and channel
    let third = &smf.tracks[2];
    assert!(third.iter().any(|e| matches!(
        e.kind,
        TrackEventKind::Meta(MetaMessage::TrackName(name)) if name == b"Voice 3"
    )));
    assert!(third.iter().all(|e| match e.kind {
        TrackEventKind::Midi { channel, .. } => channel.as_int() == 2,
        _ => true,
    }));
}

#[test]
fn test_repeated_pitch_releases_before_restriking() {
    let bytes = export_smf(&[voice("C(100) C(100)")], &Settings::default()).unwrap();
    let smf = Smf::parse(&bytes).unwrap();
    let notes: Vec<bool> = smf.tracks[1]
        .iter()
        .filter_map(|e| match e.kind {
            TrackEventKind::Midi { message: MidiMessage::NoteOn { .. }, .. } => Some(true),
            TrackEventKind::Midi { message: MidiMessage::NoteOff { .. }, .. } => Some(false),
            _ => None,
        })
        .collect();
    assert_eq!(notes, vec![true, false, true, false]);
    assert_eq!(notations(&bytes), vec!["C(100)C(100)"]);
}

#[test]
fn test_export_refuses_errors_and_empty_input() {
    let settings = Settings::default();
    assert!(matches!(
        export_smf(&[voice("C"), voice("C9")], &settings),
        Err(BidiError::SequenceHasErrors { .. })
    ));
    assert!(matches!(
        export_smf(&[voice("P(100)")], &settings),
        Err(BidiError::Codec(_))
    ));
    assert!(matches!(export_smf(&[], &settings), Err(BidiError::Codec(_))));
}

#[test]
fn test_export_refuses_ticks_past_delta_range() {
    let settings = Settings::default();
    // One tick per millisecond: 300 000 000 ticks exceeds 28 bits
    assert!(matches!(
        export_smf(&[voice("C(300000000)")], &settings),
        Err(BidiError::Codec(_))
    ));
    assert!(matches!(
        export_smf(&[voice("C(200000000)")], &settings),
        Ok(_)
    ));
}

#[test]
fn test_export_refuses_volume_out_of_range() {
    let settings = Settings::default();
    assert!(matches!(
        export_smf(&[voice("C").with_volume(1.2)], &settings),
        Err(BidiError::InvalidArgument(_))
    ));
}

#[test]
fn test_import_failures() {
    let settings = Settings::default();
    assert!(matches!(
        import_smf(b"not a midi file", &settings),
        Err(BidiError::Codec(_))
    ));
    let silent = file_with(Timing::Metrical(500.into()), vec![vec![end_of_track(100)]]);
    assert!(matches!(import_smf(&silent, &settings), Err(BidiError::Codec(_))));
}

/// Append a raw `MTrk` chunk after the tracks the header declares.
fn append_track_chunk(bytes: &mut Vec<u8>, body: &[u8]) {
    bytes.extend_from_slice(b"MTrk");
    bytes.extend_from_slice(&(body.len() as u32).to_be_bytes());
    bytes.extend_from_slice(body);
}

#[test]
fn test_import_skips_garbage_tracks() {
    let settings = Settings::default();
    let mut bytes = export_smf(&[voice("C D E")], &settings).unwrap();
    // Delta 0, then a note off status with its data bytes cut off
    append_track_chunk(&mut bytes, &[0x00, 0x80]);

    let imported = import_smf(&bytes, &settings).unwrap();
    assert_eq!(imported.len(), 1);
    assert_eq!(imported[0].notation, "CDE");
}

#[test]
fn test_import_keeps_events_before_a_malformed_tail() {
    let settings = Settings::default();
    let mut bytes = export_smf(&[voice("C D E")], &settings).unwrap();
    // C4 on, note off 100 ticks later, then a truncated event
    append_track_chunk(
        &mut bytes,
        &[0x00, 0x90, 60, 100, 0x64, 0x80, 60, 0, 0x00, 0x90],
    );

    let imported = import_smf(&bytes, &settings).unwrap();
    let notations: Vec<&str> = imported.iter().map(|v| v.notation.as_str()).collect();
    assert_eq!(notations, vec!["CDE", "C(100)"]);
    assert_eq!(imported[1].track, 2);
    assert_eq!(imported[1].name, None);
}

#[test]
fn test_channels_skip_percussion() {
    let channels: Vec<u8> = (0..17).map(channel_for_voice).collect();
    assert_eq!(
        channels,
        vec![0, 1, 2, 3, 4, 5, 6, 7, 8, 10, 11, 12, 13, 14, 15, 0, 1]
    );
}

#[test]
fn test_imported_voice_json_shape() {
    let voice = ImportedVoice {
        track: 1,
        name: Some("Lead".to_string()),
        notation: "C(500)".to_string(),
    };
    assert_eq!(
        serde_json::to_value(&voice).unwrap(),
        serde_json::json!({ "track": 1, "name": "Lead", "notation": "C(500)" })
    );
}
