use pretty_assertions::assert_eq;
use rand::rngs::StdRng;
use rand::SeedableRng;

use ghosttype::config::SimulatorConfig;
use ghosttype::model::{Op, Transcript, TRANSCRIPT_VERSION};
use ghosttype::record_transcript;
use ghosttype::sim;
use ghosttype::speed::SpeedTier;
use ghosttype::trace::{transcript_console_trace, TraceEvent};

fn append(s: &str) -> Vec<Op> {
    s.chars().map(|ch| Op::Append { ch }).collect()
}

fn lines(events: &[TraceEvent]) -> Vec<(usize, &str)> {
    events
        .iter()
        .map(|e| (e.op_index, e.line.as_str()))
        .collect()
}

#[test]
fn trace_groups_typing_runs_and_corrections() {
    let mut ops = vec![Op::Reset];
    ops.extend(append("hex"));
    ops.push(Op::Wait { ms: 400 });
    ops.push(Op::RemoveLast);
    ops.push(Op::Wait { ms: 350 });
    ops.extend(append("llo"));

    let events = transcript_console_trace(&ops);
    assert_eq!(
        lines(&events),
        vec![
            (1, "Typing \"hex\"..."),
            (5, "Replace \"x\" with \"l\"..."),
            (8, "Typing \"lo\"..."),
        ]
    );
}

#[test]
fn trace_reports_retyped_text() {
    let mut ops = append("ab");
    ops.push(Op::RemoveLast);
    ops.extend(append("bc"));

    let events = transcript_console_trace(&ops);
    assert_eq!(
        lines(&events),
        vec![
            (0, "Typing \"ab\"..."),
            (2, "Retype \"b\"..."),
            (4, "Typing \"c\"..."),
        ]
    );
}

#[test]
fn trace_escapes_quotes() {
    let events = transcript_console_trace(&append("say \"hi\""));
    assert_eq!(
        lines(&events),
        vec![(0, "Typing \"say \\\"hi\\\"\"...")]
    );
}

#[test]
fn clean_recording_traces_as_one_run() {
    let cfg = SimulatorConfig {
        mistake_probability: 0.0,
        backspace_probability: 0.0,
        ..Default::default()
    };
    let transcript = record_transcript(
        "hello, world",
        cfg,
        SpeedTier::Fast,
        Some(5),
        StdRng::seed_from_u64(5),
    )
    .expect("record");

    let events = transcript_console_trace(&transcript.ops);
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].line, "Typing \"hello, world\"...");
}

#[test]
fn recorded_transcript_replays_to_its_text() {
    let text = "the quick brown fox jumps over the lazy dog";
    let transcript = record_transcript(
        text,
        SimulatorConfig::default(),
        SpeedTier::Normal,
        Some(42),
        StdRng::seed_from_u64(42),
    )
    .expect("record");

    assert_eq!(transcript.version, TRANSCRIPT_VERSION);
    assert_eq!(transcript.config.text, text);
    assert_eq!(transcript.config.seed, Some(42));
    assert_eq!(sim::replay_text(&transcript.ops), text);

    let stats = sim::stats(&transcript);
    assert_eq!(stats.appends - stats.removals, text.chars().count());
    // Warm-up and finish delays alone.
    assert!(stats.total_wait_ms >= 3000);
}

#[test]
fn same_seed_records_same_transcript() {
    let record = |seed| {
        record_transcript(
            "deterministic",
            SimulatorConfig::default(),
            SpeedTier::Slow,
            Some(seed),
            StdRng::seed_from_u64(seed),
        )
        .expect("record")
    };
    assert_eq!(record(7), record(7));
}

#[test]
fn transcript_json_uses_tagged_ops() {
    let transcript = record_transcript(
        "a",
        SimulatorConfig {
            mistake_probability: 0.0,
            backspace_probability: 0.0,
            ..Default::default()
        },
        SpeedTier::Normal,
        None,
        StdRng::seed_from_u64(1),
    )
    .expect("record");

    let json = serde_json::to_value(&transcript).expect("serialize");
    assert_eq!(json["ops"][0], serde_json::json!({ "type": "reset" }));
    assert!(json["ops"]
        .as_array()
        .expect("ops array")
        .contains(&serde_json::json!({ "type": "append", "ch": "a" })));

    let parsed: Transcript = serde_json::from_value(json).expect("deserialize");
    assert_eq!(parsed, transcript);
}

#[test]
fn verify_rejects_transcript_that_drifts_from_text() {
    let mut transcript = record_transcript(
        "abc",
        SimulatorConfig::default(),
        SpeedTier::Fast,
        Some(3),
        StdRng::seed_from_u64(3),
    )
    .expect("record");
    transcript.ops.push(Op::RemoveLast);

    let err = sim::verify(&transcript).unwrap_err();
    assert!(format!("{err:#}").contains("ab"), "unexpected error: {err:#}");
}
