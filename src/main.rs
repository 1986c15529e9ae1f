use bidi_midi::playback::eligible_voices;
use bidi_midi::{BidiError, Settings, Voice};
use std::env;
use std::fs;
use std::process;

const USAGE: &str = "Usage: bidi-midi [--config <settings.yaml>] <command> ...

Commands:
  check <file>                     validate notation, listing every invalid token
  transpose <file> <semitones>     print the notation shifted by semitones
  scale <file> <multiplier>        print the notation with durations scaled
  export <out.mid> <file>...       write one MIDI track per notation file
  import <in.mid>                  print one notation line per imported voice
  render <out.wav> <file>...       render notation files to a WAV file";

fn main() {
    env_logger::init();

    let mut args: Vec<String> = env::args().skip(1).collect();

    let settings = match take_config(&mut args) {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("Error loading settings: {}", e);
            process::exit(1);
        }
    };

    if args.is_empty() {
        eprintln!("{}", USAGE);
        process::exit(1);
    }

    let result = match (args[0].as_str(), &args[1..]) {
        ("check", [path]) => check(path),
        ("transpose", [path, semitones]) => transpose(path, semitones, &settings),
        ("scale", [path, multiplier]) => scale(path, multiplier),
        ("export", [out, inputs @ ..]) if !inputs.is_empty() => export(out, inputs, &settings),
        ("import", [path]) => import(path, &settings),
        ("render", [out, inputs @ ..]) if !inputs.is_empty() => render(out, inputs, &settings),
        _ => {
            eprintln!("{}", USAGE);
            process::exit(1);
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

/// Remove `--config <path>` from the arguments and load it, or use defaults.
fn take_config(args: &mut Vec<String>) -> Result<Settings, BidiError> {
    let Some(index) = args.iter().position(|a| a == "--config") else {
        return Ok(Settings::default());
    };
    if index + 1 >= args.len() {
        return Err(BidiError::Config("--config needs a file path".to_string()));
    }
    let path = args.remove(index + 1);
    args.remove(index);
    Settings::load(path)
}

fn read_source(path: &str) -> Result<String, BidiError> {
    fs::read_to_string(path).map_err(|e| {
        BidiError::Io(std::io::Error::new(
            e.kind(),
            format!("cannot read '{}': {}", path, e),
        ))
    })
}

fn check(path: &str) -> Result<(), BidiError> {
    let sequence = bidi_midi::parse(&read_source(path)?);
    for event in sequence.errors() {
        if let Some(error) = &event.error {
            eprintln!(
                "{}:{}:{}: {} [{}]",
                path,
                event.span.line,
                event.span.column,
                error,
                error.message_key()
            );
        }
    }
    sequence.ensure_error_free()?;
    println!(
        "{}: {} event(s), {} ms",
        path,
        sequence.len(),
        sequence.total_duration_ms()
    );
    Ok(())
}

fn transpose(path: &str, semitones: &str, settings: &Settings) -> Result<(), BidiError> {
    let semitones: i32 = semitones.parse().map_err(|_| {
        BidiError::InvalidArgument(format!("semitones must be an integer, got '{}'", semitones))
    })?;
    let text = bidi_midi::transpose_with_policy(
        &read_source(path)?,
        semitones,
        settings.octave_policy,
    )?;
    println!("{}", text);
    Ok(())
}

fn scale(path: &str, multiplier: &str) -> Result<(), BidiError> {
    let multiplier: f64 = multiplier.parse().map_err(|_| {
        BidiError::InvalidArgument(format!("multiplier must be a number, got '{}'", multiplier))
    })?;
    println!("{}", bidi_midi::scale_durations(&read_source(path)?, multiplier)?);
    Ok(())
}

fn load_voices(paths: &[String]) -> Result<Vec<Voice>, BidiError> {
    paths
        .iter()
        .map(|path| Ok(Voice::new(bidi_midi::parse(&read_source(path)?))))
        .collect()
}

fn export(out: &str, inputs: &[String], settings: &Settings) -> Result<(), BidiError> {
    let voices = load_voices(inputs)?;
    let bytes = bidi_midi::export_midi(&voices, settings)?;
    fs::write(out, &bytes)?;
    let tracks = voices.iter().filter(|v| v.has_sounding_notes()).count();
    eprintln!("Wrote {} voice track(s) to {}", tracks, out);
    Ok(())
}

fn import(path: &str, settings: &Settings) -> Result<(), BidiError> {
    let bytes = fs::read(path)?;
    for voice in bidi_midi::import_midi(&bytes, settings)? {
        match &voice.name {
            Some(name) => println!("// track {}: {} //{}", voice.track, name, voice.notation),
            None => println!("// track {} //{}", voice.track, voice.notation),
        }
    }
    Ok(())
}

fn render(out: &str, inputs: &[String], settings: &Settings) -> Result<(), BidiError> {
    let voices = load_voices(inputs)?;
    let bytes = bidi_midi::render_wav(&voices, settings.speed, settings)?;
    fs::write(out, &bytes)?;
    let played = eligible_voices(&voices).len();
    eprintln!("Rendered {} of {} voice(s) to {}", played, voices.len(), out);
    Ok(())
}
