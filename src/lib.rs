pub mod config;
pub mod driver;
pub mod keyboard;
pub mod mistake;
pub mod model;
pub mod sequencer;
pub mod sim;
pub mod sink;
pub mod speed;
pub mod trace;

use anyhow::{ensure, Result};
use rand::rngs::StdRng;

use crate::config::{validate_config, SimulatorConfig};
use crate::driver::{run_virtual, RunOutcome};
use crate::model::{Op, Transcript, TranscriptConfig, TRANSCRIPT_VERSION};
use crate::sequencer::TypingSequencer;
use crate::sink::Tape;
use crate::speed::{SpeedControl, SpeedTier};

/// Record a complete session for `text` without waiting in real time.
pub fn record_transcript(
    text: &str,
    cfg: SimulatorConfig,
    speed: SpeedTier,
    seed: Option<u64>,
    rng: StdRng,
) -> Result<Transcript> {
    validate_config(&cfg)?;

    let tape = Tape::new();
    let mut seq = TypingSequencer::new(
        cfg,
        SpeedControl::new(speed),
        rng,
        tape.clone(),
        tape.clone(),
    );
    seq.start(text, 0)?;

    let waits = tape.clone();
    let outcome = run_virtual(&mut seq, 0, |ms| waits.push(Op::Wait { ms }));
    ensure!(
        matches!(outcome, RunOutcome::Completed(_)),
        "session ended without completing: {outcome:?}"
    );

    let transcript = Transcript {
        version: TRANSCRIPT_VERSION,
        config: TranscriptConfig {
            text: text.to_string(),
            speed,
            seed,
        },
        ops: tape.take(),
    };
    sim::verify(&transcript)?;
    Ok(transcript)
}
