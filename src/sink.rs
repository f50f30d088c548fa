use std::cell::RefCell;
use std::io::Write;
use std::rc::Rc;

use tracing::{debug, trace, warn};

use crate::keyboard::key_position;
use crate::model::Op;

pub trait TextSink {
    fn reset(&mut self);
    fn append_char(&mut self, c: char);
    fn remove_last(&mut self);
    fn set_cursor_visible(&mut self, visible: bool);
}

pub trait KeyPressVisualizer {
    fn set_active(&mut self, active: bool);
    /// `key_label` is a single character or `"Backspace"`.
    fn flash(&mut self, key_label: &str);
}

/// Shared in-memory log of sink operations. Clones append to the same log, so
/// one handle can serve as the text sink and another as the visualizer.
#[derive(Debug, Clone, Default)]
pub struct Tape {
    ops: Rc<RefCell<Vec<Op>>>,
}

impl Tape {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, op: Op) {
        self.ops.borrow_mut().push(op);
    }

    pub fn ops(&self) -> Vec<Op> {
        self.ops.borrow().clone()
    }

    pub fn take(&self) -> Vec<Op> {
        std::mem::take(&mut *self.ops.borrow_mut())
    }
}

impl TextSink for Tape {
    fn reset(&mut self) {
        self.push(Op::Reset);
    }

    fn append_char(&mut self, c: char) {
        self.push(Op::Append { ch: c });
    }

    fn remove_last(&mut self) {
        self.push(Op::RemoveLast);
    }

    fn set_cursor_visible(&mut self, visible: bool) {
        self.push(Op::Cursor { visible });
    }
}

impl KeyPressVisualizer for Tape {
    fn set_active(&mut self, active: bool) {
        self.push(Op::Keyboard { active });
    }

    fn flash(&mut self, key_label: &str) {
        self.push(Op::Flash {
            key: key_label.to_string(),
        });
    }
}

const CURSOR_GLYPH: char = '▌';

/// Keep only what [`TerminalSink`] can draw one cell at a time: tabs become
/// spaces, CRLF becomes LF and other control characters are dropped.
pub fn sanitize_for_terminal(text: &str) -> String {
    text.chars()
        .filter_map(|c| match c {
            '\n' => Some('\n'),
            '\t' => Some(' '),
            c if c.is_control() => None,
            c => Some(c),
        })
        .collect()
}

/// Renders the typed text into the terminal.
///
/// The cursor marker is drawn after the text and the terminal cursor is parked
/// on it, so appends overwrite the marker and then redraw it one cell right.
/// Line breaks and wraps at `width` are tracked per row so a backspace at the
/// start of a row can climb back to the end of the previous one.
#[derive(Debug)]
pub struct TerminalSink<W: Write> {
    out: W,
    typed: Vec<char>,
    rows: Vec<usize>,
    width: Option<usize>,
    cursor_visible: bool,
}

impl<W: Write> TerminalSink<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            typed: Vec::new(),
            rows: vec![0],
            width: None,
            cursor_visible: false,
        }
    }

    pub fn with_width(mut self, columns: usize) -> Self {
        self.width = Some(columns.max(2));
        self
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn write(&mut self, s: &str) {
        let res = self
            .out
            .write_all(s.as_bytes())
            .and_then(|_| self.out.flush());
        if let Err(err) = res {
            warn!(%err, "terminal write failed");
        }
    }

    fn marker(&self) -> char {
        if self.cursor_visible {
            CURSOR_GLYPH
        } else {
            ' '
        }
    }

    fn column(&self) -> usize {
        self.rows.last().copied().unwrap_or(0)
    }

    fn set_column(&mut self, col: usize) {
        if let Some(last) = self.rows.last_mut() {
            *last = col;
        }
    }

    fn break_row(&mut self) {
        self.write(" \r\n");
        self.rows.push(0);
    }

    fn rejoin_row(&mut self) {
        self.rows.pop();
        if self.rows.is_empty() {
            self.rows.push(0);
        }
        let col = self.column();
        self.write(&format!(" \x08\x1b[A\x1b[{}G", col + 1));
    }
}

impl<W: Write> TextSink for TerminalSink<W> {
    fn reset(&mut self) {
        self.typed.clear();
        self.rows = vec![0];
        let marker = self.marker();
        self.write(&format!("\r\x1b[2K{marker}\x08"));
    }

    fn append_char(&mut self, c: char) {
        let marker = self.marker();
        self.typed.push(c);

        if c == '\n' {
            self.break_row();
            self.write(&format!("{marker}\x08"));
            return;
        }

        if self.width.is_some_and(|w| self.column() + 1 >= w) {
            self.break_row();
        }
        self.set_column(self.column() + 1);
        self.write(&format!("{c}{marker}\x08"));
    }

    fn remove_last(&mut self) {
        let Some(removed) = self.typed.pop() else {
            return;
        };
        let marker = self.marker();

        if removed == '\n' {
            self.rejoin_row();
            self.write(&format!("{marker}\x08"));
            return;
        }

        // Wrapped row: the character sits at the end of the row above.
        if self.column() == 0 && self.rows.len() > 1 {
            self.rejoin_row();
        }
        self.set_column(self.column().saturating_sub(1));
        self.write(&format!("\x08{marker} \x08\x08"));
    }

    fn set_cursor_visible(&mut self, visible: bool) {
        self.cursor_visible = visible;
        let marker = self.marker();
        self.write(&format!("{marker}\x08"));
    }
}

/// Reports key flashes through the log instead of drawing them.
#[derive(Debug, Default)]
pub struct LogVisualizer {
    active: bool,
    flashes: u64,
}

impl LogVisualizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn flashes(&self) -> u64 {
        self.flashes
    }
}

impl KeyPressVisualizer for LogVisualizer {
    fn set_active(&mut self, active: bool) {
        self.active = active;
        debug!(active, "keyboard visualizer");
    }

    fn flash(&mut self, key_label: &str) {
        // Keys missing from the layout (space, punctuation) have nothing to light up.
        let Some((row, col)) = key_position(key_label) else {
            return;
        };
        self.flashes += 1;
        trace!(key = key_label, row, col, active = self.active, "key flash");
    }
}
