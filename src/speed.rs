use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

use anyhow::{anyhow, ensure, Result};
use rand::Rng;
use rand_distr::{Distribution, Uniform};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpeedTier {
    Slow,
    #[default]
    Normal,
    Fast,
}

impl SpeedTier {
    pub const ALL: [SpeedTier; 3] = [SpeedTier::Slow, SpeedTier::Normal, SpeedTier::Fast];

    pub fn as_str(self) -> &'static str {
        match self {
            SpeedTier::Slow => "slow",
            SpeedTier::Normal => "normal",
            SpeedTier::Fast => "fast",
        }
    }

    fn to_u8(self) -> u8 {
        match self {
            SpeedTier::Slow => 0,
            SpeedTier::Normal => 1,
            SpeedTier::Fast => 2,
        }
    }

    fn from_u8(v: u8) -> Self {
        match v {
            0 => SpeedTier::Slow,
            2 => SpeedTier::Fast,
            _ => SpeedTier::Normal,
        }
    }
}

impl fmt::Display for SpeedTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SpeedTier {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "slow" => Ok(SpeedTier::Slow),
            "normal" => Ok(SpeedTier::Normal),
            "fast" => Ok(SpeedTier::Fast),
            other => Err(anyhow!(
                "unknown speed tier {other:?}; expected slow, normal or fast"
            )),
        }
    }
}

/// Half-open millisecond interval `[min_ms, max_ms)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DelayRange {
    pub min_ms: u64,
    pub max_ms: u64,
}

impl DelayRange {
    pub const fn new(min_ms: u64, max_ms: u64) -> Self {
        Self { min_ms, max_ms }
    }

    pub fn validate(&self, name: &str) -> Result<()> {
        ensure!(
            self.min_ms < self.max_ms,
            "{name}: min_ms ({}) must be < max_ms ({})",
            self.min_ms,
            self.max_ms
        );
        Ok(())
    }

    pub fn contains(&self, ms: u64) -> bool {
        (self.min_ms..self.max_ms).contains(&ms)
    }

    pub fn sample(&self, rng: &mut impl Rng) -> u64 {
        if self.max_ms <= self.min_ms {
            return self.min_ms;
        }
        Uniform::new(self.min_ms, self.max_ms).sample(rng)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DelayModel {
    pub slow: DelayRange,
    pub normal: DelayRange,
    pub fast: DelayRange,
}

impl Default for DelayModel {
    fn default() -> Self {
        Self {
            slow: DelayRange::new(150, 250),
            normal: DelayRange::new(50, 100),
            fast: DelayRange::new(20, 40),
        }
    }
}

impl DelayModel {
    pub fn range(&self, tier: SpeedTier) -> DelayRange {
        match tier {
            SpeedTier::Slow => self.slow,
            SpeedTier::Normal => self.normal,
            SpeedTier::Fast => self.fast,
        }
    }

    pub fn delay(&self, tier: SpeedTier, rng: &mut impl Rng) -> u64 {
        self.range(tier).sample(rng)
    }

    pub fn validate(&self) -> Result<()> {
        for tier in SpeedTier::ALL {
            self.range(tier).validate(&format!("{tier} tier"))?;
        }
        Ok(())
    }
}

/// Shared handle to the active tier. Clones observe the same selection, so a
/// control surface can switch tiers while a session is running; the change is
/// picked up the next time a delay is drawn.
#[derive(Debug, Clone)]
pub struct SpeedControl {
    tier: Arc<AtomicU8>,
}

impl Default for SpeedControl {
    fn default() -> Self {
        Self::new(SpeedTier::default())
    }
}

impl SpeedControl {
    pub fn new(tier: SpeedTier) -> Self {
        Self {
            tier: Arc::new(AtomicU8::new(tier.to_u8())),
        }
    }

    pub fn get(&self) -> SpeedTier {
        SpeedTier::from_u8(self.tier.load(Ordering::SeqCst))
    }

    pub fn set(&self, tier: SpeedTier) {
        self.tier.store(tier.to_u8(), Ordering::SeqCst);
    }
}
