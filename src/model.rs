use serde::{Deserialize, Serialize};

use crate::speed::SpeedTier;

pub const TRANSCRIPT_VERSION: u32 = 1;

/// A recorded session: every sink operation in order, with the waits between
/// them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transcript {
    pub version: u32,
    pub config: TranscriptConfig,
    pub ops: Vec<Op>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptConfig {
    pub text: String,
    pub speed: SpeedTier,
    pub seed: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Op {
    Wait { ms: u64 },
    Reset,
    Cursor { visible: bool },
    Keyboard { active: bool },
    Append { ch: char },
    RemoveLast,
    Flash { key: String },
}
