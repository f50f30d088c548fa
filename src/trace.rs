use crate::model::Op;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceEvent {
    pub op_index: usize,
    pub line: String,
}

#[derive(Debug, Default, Clone)]
struct PendingCorrection {
    start_op_index: usize,
    deleted: Vec<char>,
    inserted: String,
}

impl PendingCorrection {
    fn deleted_string(&self) -> String {
        self.deleted.iter().rev().collect()
    }

    fn is_settled(&self) -> bool {
        self.inserted.chars().count() >= self.deleted.len()
    }
}

#[derive(Debug, Default, Clone)]
struct TracePlanner {
    last_typed: Vec<char>,
    typing_run_start: Option<usize>,
    typing_run: String,
    correction: Option<PendingCorrection>,
    events: Vec<TraceEvent>,
}

impl TracePlanner {
    fn observe(&mut self, op_index: usize, op: &Op) {
        match op {
            Op::Reset => {
                self.finish_correction();
                self.flush_typing_run();
                self.last_typed.clear();
            }
            Op::RemoveLast => {
                self.flush_typing_run();
                if self
                    .correction
                    .as_ref()
                    .map(|c| !c.inserted.is_empty())
                    .unwrap_or(false)
                {
                    self.finish_correction();
                }
                let correction = self.correction.get_or_insert_with(|| PendingCorrection {
                    start_op_index: op_index,
                    ..Default::default()
                });
                // The deleted character is whatever the run typed last.
                correction.deleted.push(self.last_typed.pop().unwrap_or('?'));
            }
            Op::Append { ch } => {
                self.last_typed.push(*ch);
                if let Some(correction) = &mut self.correction {
                    correction.inserted.push(*ch);
                    if correction.is_settled() {
                        self.finish_correction();
                    }
                    return;
                }
                if self.typing_run.is_empty() {
                    self.typing_run_start = Some(op_index);
                }
                self.typing_run.push(*ch);
            }
            Op::Wait { .. } | Op::Cursor { .. } | Op::Keyboard { .. } | Op::Flash { .. } => {}
        }
    }

    fn finish(&mut self) {
        self.finish_correction();
        self.flush_typing_run();
    }

    fn flush_typing_run(&mut self) {
        let Some(start) = self.typing_run_start.take() else {
            self.typing_run.clear();
            return;
        };
        if self.typing_run.is_empty() {
            return;
        }
        self.events.push(TraceEvent {
            op_index: start,
            line: format!("Typing \"{}\"...", escape_for_log(&self.typing_run)),
        });
        self.typing_run.clear();
    }

    fn finish_correction(&mut self) {
        let Some(correction) = self.correction.take() else {
            return;
        };
        let deleted = correction.deleted_string();
        let line = if deleted == correction.inserted {
            format!("Retype \"{}\"...", escape_for_log(&deleted))
        } else {
            format!(
                "Replace \"{}\" with \"{}\"...",
                escape_for_log(&deleted),
                escape_for_log(&correction.inserted)
            )
        };
        self.events.push(TraceEvent {
            op_index: correction.start_op_index,
            line,
        });
    }
}

/// Summarize a transcript as console lines, each tagged with the op it should
/// be printed before.
pub fn transcript_console_trace(ops: &[Op]) -> Vec<TraceEvent> {
    let mut planner = TracePlanner::default();
    for (op_index, op) in ops.iter().enumerate() {
        planner.observe(op_index, op);
    }
    planner.finish();

    planner.events.sort_by_key(|event| event.op_index);
    planner.events
}

fn escape_for_log(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            _ => out.push(c),
        }
    }
    out
}
