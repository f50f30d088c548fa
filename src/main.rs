use std::fs;
use std::io::{self, BufRead, Read};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{anyhow, bail, Context, Result};
use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

use ghosttype::config::{validate_config, SimulatorConfig};
use ghosttype::driver::{run_wall_clock, RunOutcome, WallClock};
use ghosttype::model::{Transcript, TRANSCRIPT_VERSION};
use ghosttype::sequencer::{SessionObserver, TypingSequencer};
use ghosttype::sim;
use ghosttype::sink::{sanitize_for_terminal, LogVisualizer, TerminalSink};
use ghosttype::speed::{SpeedControl, SpeedTier};
use ghosttype::trace::transcript_console_trace;

const LONG_TEXT_WARNING_CHARS: usize = 180;

const RESET: &str = "\x1b[0m";
const TYPING: &str = "\x1b[34m";
const REPLACE: &str = "\x1b[33m";

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum SpeedArg {
    Slow,
    Normal,
    Fast,
}

impl SpeedArg {
    fn to_library(self) -> SpeedTier {
        match self {
            SpeedArg::Slow => SpeedTier::Slow,
            SpeedArg::Normal => SpeedTier::Normal,
            SpeedArg::Fast => SpeedTier::Fast,
        }
    }
}

#[derive(Debug, Args, Clone)]
struct SimArgs {
    /// Simulator config file (JSON). Flags below override its values.
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Initial typing speed.
    #[arg(long, value_enum, default_value_t = SpeedArg::Normal)]
    speed: SpeedArg,

    /// Typo probability per character (0.0-1.0).
    #[arg(long)]
    mistake_rate: Option<f64>,

    /// Probability of deleting and retyping a correct character (0.0-1.0).
    #[arg(long)]
    backspace_rate: Option<f64>,

    /// Optional RNG seed (for debugging)
    #[arg(long)]
    seed: Option<u64>,
}

#[derive(Debug, Parser)]
#[command(name = "ghosttype")]
#[command(about = "Human-like typing animation for the terminal", long_about = None)]
struct Cli {
    /// Raise log verbosity (-v info, -vv debug). RUST_LOG takes precedence.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Record a typing session (JSON transcript) without waiting in real time
    Plan {
        /// Input text file, or '-' for stdin
        #[arg(long, value_name = "PATH")]
        input: PathBuf,

        /// Output transcript file (defaults to stdout)
        #[arg(long, value_name = "PATH")]
        output: Option<PathBuf>,

        #[command(flatten)]
        sim: SimArgs,
    },

    /// Type the text into this terminal in real time
    ///
    /// While running, entering `slow`, `normal` or `fast` on stdin switches
    /// speed (unless the text itself is read from stdin). The terminal echoes
    /// those commands into the rendered text and shifts it; pass
    /// `--no-speed-input` to keep the output clean. Ctrl+C stops.
    Run {
        /// Input text file, or '-' for stdin
        #[arg(long, value_name = "PATH")]
        input: PathBuf,

        /// Countdown seconds before typing starts
        #[arg(long, default_value_t = 5)]
        countdown: u64,

        /// Ignore speed commands on stdin
        #[arg(long)]
        no_speed_input: bool,

        #[command(flatten)]
        sim: SimArgs,
    },

    /// Summarize a saved transcript
    Replay {
        /// Transcript file (JSON)
        #[arg(long, value_name = "PATH")]
        transcript: PathBuf,

        /// Disable console trace output
        #[arg(long)]
        no_trace: bool,
    },
}

/// Shows a "Typing..." indicator for the lifetime of a session.
struct StatusIndicator;

impl SessionObserver for StatusIndicator {
    fn on_start(&mut self) {
        eprintln!("{TYPING}Typing...{RESET}");
    }

    fn on_complete(&mut self) {
        println!();
        eprintln!("Done.");
    }

    fn on_cancel(&mut self) {
        println!();
        eprintln!("Cancelled.");
    }
}

fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn is_stdin(path: &PathBuf) -> bool {
    path.as_os_str() == std::ffi::OsStr::new("-")
}

fn read_input(path: &PathBuf) -> Result<String> {
    if is_stdin(path) {
        let mut buf = String::new();
        io::stdin()
            .read_to_string(&mut buf)
            .context("failed to read stdin")?;
        return Ok(buf);
    }

    fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
}

fn write_output(path: &PathBuf, contents: &str) -> Result<()> {
    fs::write(path, contents).with_context(|| format!("failed to write {}", path.display()))
}

fn prepare_text(raw: &str) -> Result<String> {
    let text = sanitize_for_terminal(raw.trim());
    let text = text.trim();
    if text.is_empty() {
        bail!("input text is empty");
    }

    let len = text.chars().count();
    if len >= LONG_TEXT_WARNING_CHARS {
        eprintln!("Warning: input is {len} characters; typing it will take a while.");
    }

    Ok(text.to_string())
}

fn build_config(args: &SimArgs) -> Result<SimulatorConfig> {
    let mut cfg = match &args.config {
        Some(path) => SimulatorConfig::load(path)?,
        None => SimulatorConfig::default(),
    };

    if let Some(rate) = args.mistake_rate {
        cfg.mistake_probability = rate;
    }
    if let Some(rate) = args.backspace_rate {
        cfg.backspace_probability = rate;
    }

    validate_config(&cfg)?;
    Ok(cfg)
}

fn rng_from_seed(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    }
}

fn print_trace_line(line: &str) {
    if let Some(rest) = line.strip_prefix("Typing") {
        eprintln!("{TYPING}Typing{RESET}{rest}");
    } else if let Some(rest) = line.strip_prefix("Replace") {
        eprintln!("{REPLACE}Replace{RESET}{rest}");
    } else if let Some(rest) = line.strip_prefix("Retype") {
        eprintln!("{REPLACE}Retype{RESET}{rest}");
    } else {
        eprintln!("{line}");
    }
}

fn print_stats(label: &str, transcript: &Transcript) {
    let stats = sim::stats(transcript);
    eprintln!(
        "{label}: {} ops, {} keystrokes, {} backspaces, ~{:.1} s at {} speed",
        stats.ops,
        stats.appends + stats.removals,
        stats.removals,
        (stats.total_wait_ms as f64) / 1000.0,
        transcript.config.speed
    );
}

fn spawn_speed_reader(speed: SpeedControl) {
    std::thread::spawn(move || {
        for line in io::stdin().lock().lines() {
            let Ok(line) = line else {
                break;
            };
            if line.trim().is_empty() {
                continue;
            }
            match line.parse::<SpeedTier>() {
                Ok(tier) => {
                    debug!(%tier, "speed changed");
                    speed.set(tier);
                }
                Err(err) => warn!("{err:#}"),
            }
        }
    });
}

fn countdown(secs: u64, stop: &AtomicBool) -> Result<()> {
    if secs == 0 {
        return Ok(());
    }
    eprintln!("Starting in {secs}s...");
    for remaining in (1..=secs).rev() {
        if stop.load(Ordering::SeqCst) {
            return Err(anyhow!("aborted"));
        }
        eprintln!("{remaining}...");
        std::thread::sleep(std::time::Duration::from_secs(1));
    }
    if stop.load(Ordering::SeqCst) {
        return Err(anyhow!("aborted"));
    }
    Ok(())
}

fn run_live(
    input: &PathBuf,
    countdown_secs: u64,
    speed_input: bool,
    args: &SimArgs,
) -> Result<()> {
    let text = prepare_text(&read_input(input)?)?;
    let cfg = build_config(args)?;
    let speed = SpeedControl::new(args.speed.to_library());

    let stop = Arc::new(AtomicBool::new(false));
    {
        let stop = stop.clone();
        ctrlc::set_handler(move || {
            stop.store(true, Ordering::SeqCst);
        })
        .context("failed to install Ctrl+C handler")?;
    }

    countdown(countdown_secs, &stop)?;

    if speed_input && !is_stdin(input) {
        spawn_speed_reader(speed.clone());
    }

    let mut sink = TerminalSink::new(io::stdout().lock());
    match crossterm::terminal::size() {
        Ok((columns, _)) => sink = sink.with_width(usize::from(columns)),
        Err(err) => debug!(%err, "terminal size unavailable; not wrapping"),
    }

    let mut seq = TypingSequencer::new(
        cfg,
        speed,
        rng_from_seed(args.seed),
        sink,
        LogVisualizer::new(),
    )
    .with_observer(Box::new(StatusIndicator));

    let clock = WallClock::new();
    seq.start(&text, clock.now_ms())?;

    match run_wall_clock(&mut seq, &clock, &stop) {
        RunOutcome::Completed(_) | RunOutcome::Idle => Ok(()),
        RunOutcome::Cancelled(_) => Err(anyhow!("aborted")),
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Command::Plan { input, output, sim } => {
            let text = prepare_text(&read_input(&input)?)?;
            let cfg = build_config(&sim)?;
            let rng = rng_from_seed(sim.seed);

            let transcript = ghosttype::record_transcript(
                &text,
                cfg,
                sim.speed.to_library(),
                sim.seed,
                rng,
            )?;
            print_stats("Planned", &transcript);

            let json = serde_json::to_string_pretty(&transcript)
                .context("failed to serialize transcript")?;
            if let Some(out) = output {
                write_output(&out, &json)?;
            } else {
                println!("{json}");
            }
        }
        Command::Run {
            input,
            countdown,
            no_speed_input,
            sim,
        } => run_live(&input, countdown, !no_speed_input, &sim)?,
        Command::Replay {
            transcript,
            no_trace,
        } => {
            let json = fs::read_to_string(&transcript)
                .with_context(|| format!("failed to read {}", transcript.display()))?;
            let transcript: Transcript =
                serde_json::from_str(&json).context("failed to parse transcript JSON")?;
            if transcript.version != TRANSCRIPT_VERSION {
                bail!(
                    "unsupported transcript version {}; expected {TRANSCRIPT_VERSION}",
                    transcript.version
                );
            }

            if !no_trace {
                for event in transcript_console_trace(&transcript.ops) {
                    print_trace_line(&event.line);
                }
            }
            print_stats("Replayed", &transcript);
            sim::verify(&transcript)?;
            println!("{}", sim::replay_text(&transcript.ops));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prepare_text_strips_controls_but_keeps_line_breaks() {
        let text = prepare_text("\r\n  first\tline\r\nsecond\x1b line \n").expect("text");
        assert_eq!(text, "first line\nsecond line");
    }

    #[test]
    fn prepare_text_rejects_blank_input() {
        assert!(prepare_text(" \r\n\t\x07 ").is_err());
    }

    #[test]
    fn run_accepts_flag_to_ignore_speed_input() {
        let cli = Cli::try_parse_from(["ghosttype", "run", "--input", "t.txt", "--no-speed-input"])
            .expect("parse");
        match cli.command {
            Command::Run { no_speed_input, countdown, .. } => {
                assert!(no_speed_input);
                assert_eq!(countdown, 5);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }
}
