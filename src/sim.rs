use anyhow::{ensure, Result};

use crate::model::{Op, Transcript};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TranscriptStats {
    pub ops: usize,
    pub appends: usize,
    pub removals: usize,
    pub flashes: usize,
    pub total_wait_ms: u64,
}

pub fn stats(transcript: &Transcript) -> TranscriptStats {
    let mut out = TranscriptStats {
        ops: transcript.ops.len(),
        ..Default::default()
    };

    for op in &transcript.ops {
        match op {
            Op::Wait { ms } => out.total_wait_ms = out.total_wait_ms.saturating_add(*ms),
            Op::Append { .. } => out.appends += 1,
            Op::RemoveLast => out.removals += 1,
            Op::Flash { .. } => out.flashes += 1,
            Op::Reset | Op::Cursor { .. } | Op::Keyboard { .. } => {}
        }
    }

    out
}

/// Text left in the sink after applying every op in order.
pub fn replay_text(ops: &[Op]) -> String {
    let mut buf: Vec<char> = Vec::new();
    for op in ops {
        match op {
            Op::Reset => buf.clear(),
            Op::Append { ch } => buf.push(*ch),
            Op::RemoveLast => {
                buf.pop();
            }
            _ => {}
        }
    }
    buf.into_iter().collect()
}

/// Check that a transcript ends with exactly the text it was recorded for.
pub fn verify(transcript: &Transcript) -> Result<()> {
    let replayed = replay_text(&transcript.ops);
    ensure!(
        replayed == transcript.config.text,
        "transcript replays to {:?} but was recorded for {:?}",
        replayed,
        transcript.config.text
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remove_on_empty_buffer_is_ignored() {
        let ops = vec![
            Op::RemoveLast,
            Op::Append { ch: 'x' },
            Op::RemoveLast,
            Op::RemoveLast,
            Op::Append { ch: 'y' },
        ];
        assert_eq!(replay_text(&ops), "y");
    }

    #[test]
    fn reset_discards_earlier_text() {
        let ops = vec![Op::Append { ch: 'a' }, Op::Reset, Op::Append { ch: 'b' }];
        assert_eq!(replay_text(&ops), "b");
    }
}
