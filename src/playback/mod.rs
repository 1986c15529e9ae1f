//! # Playback Module
//!
//! Drive several monophonic voices against a shared clock.
//!
//! ## Purpose
//! The scheduler turns validated voices into time-ordered side effects:
//! 1. **Note triggers** - pitch, onset, duration and instrument for the audio collaborator
//! 2. **Cursor updates** - which event each voice is sounding, for highlighting
//! 3. **Completion** - one outcome per session, delivered through a [`Completion`] handle
//!
//! ## Sub-modules
//! - `types` - NoteTrigger, PlaybackEvent, Outcome and the sink trait
//! - `clock` - Clock trait with system and manual implementations
//! - `instrument` - InstrumentKind and its synthesis parameter table
//! - `session` - Timer list and completion channel of one `play()`
//! - `scheduler` - Voice eligibility, timer construction, firing and cancellation
//!
//! ## Example
//! ```rust
//! use bidi_midi::playback::{Clock, ManualClock, Outcome, Scheduler, TriggerRecorder};
//! use bidi_midi::{parse, Voice};
//!
//! let clock = ManualClock::new();
//! let mut scheduler = Scheduler::new(clock.clone());
//! let voices = vec![Voice::new(parse("C4(1000)G#P(500)"))];
//!
//! let completion = scheduler.play(&voices, 2.0).unwrap();
//! let mut recorder = TriggerRecorder::new();
//! scheduler.run(&mut recorder);
//!
//! assert_eq!(recorder.triggers().count(), 2);
//! assert_eq!(completion.try_outcome(), Some(Outcome::Completed { at_ms: 1250.0 }));
//! assert_eq!(clock.now_ms(), 1250.0);
//! ```
//!
//! ## Timing
//!
//! Every timer is an offset from the session start, stored in whole
//! microseconds. A note fires at `start_ms / speed`; each voice finishes at
//! its total duration divided by the speed, and the session completes at the
//! latest voice end. Within a voice, timers fire in start-time order. Across
//! voices, timers due at the same instant fire in voice order.
//!
//! ## Threading
//!
//! Nothing here spawns threads. A caller either polls from its own event loop
//! ([`Scheduler::poll`] plus [`Scheduler::next_deadline_ms`]) or lets
//! [`Scheduler::run`] sleep on the clock.

mod clock;
mod instrument;
mod scheduler;
mod session;
mod types;


pub use clock::{Clock, ManualClock, SystemClock};
pub use instrument::{InstrumentKind, SynthParams, Waveform};
pub use scheduler::{eligible_voices, Scheduler};
pub use session::Completion;
pub use types::{NoteTrigger, Outcome, PlaybackEvent, PlaybackSink, SessionState, TriggerRecorder};
