use std::fs;
use std::path::Path;

use anyhow::{ensure, Context, Result};
use serde::{Deserialize, Serialize};

use crate::mistake::{
    MistakeModel, DEFAULT_ADJACENT_SHARE, DEFAULT_BACKSPACE_PROBABILITY,
    DEFAULT_MISTAKE_PROBABILITY,
};
use crate::speed::{DelayModel, DelayRange};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulatorConfig {
    pub warmup_ms: u64,
    pub finish_ms: u64,
    pub mistake_probability: f64,
    pub backspace_probability: f64,
    /// Share of typos drawn from neighboring keys rather than the whole alphabet.
    pub adjacent_share: f64,
    /// How long a wrong character stays on screen before it is noticed.
    pub realize_delay: DelayRange,
    pub correct_delay: DelayRange,
    /// Time a backspace takes before the next key can follow.
    pub backspace_settle: DelayRange,
    pub tiers: DelayModel,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            warmup_ms: 2000,
            finish_ms: 1000,
            mistake_probability: DEFAULT_MISTAKE_PROBABILITY,
            backspace_probability: DEFAULT_BACKSPACE_PROBABILITY,
            adjacent_share: DEFAULT_ADJACENT_SHARE,
            realize_delay: DelayRange::new(300, 800),
            correct_delay: DelayRange::new(200, 500),
            backspace_settle: DelayRange::new(100, 200),
            tiers: DelayModel::default(),
        }
    }
}

impl SimulatorConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let json = fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let cfg: SimulatorConfig =
            serde_json::from_str(&json).context("failed to parse simulator config JSON")?;
        validate_config(&cfg)?;
        Ok(cfg)
    }

    pub fn mistake_model(&self) -> MistakeModel {
        MistakeModel::new(
            self.mistake_probability,
            self.backspace_probability,
            self.adjacent_share,
        )
    }
}

fn validate_probability(name: &str, p: f64) -> Result<()> {
    ensure!(p.is_finite(), "{name} must be finite");
    ensure!(
        (0.0..=1.0).contains(&p),
        "{name} must be between 0.0 and 1.0"
    );
    Ok(())
}

pub fn validate_config(cfg: &SimulatorConfig) -> Result<()> {
    validate_probability("mistake_probability", cfg.mistake_probability)?;
    validate_probability("backspace_probability", cfg.backspace_probability)?;
    validate_probability("adjacent_share", cfg.adjacent_share)?;

    cfg.realize_delay.validate("realize_delay")?;
    cfg.correct_delay.validate("correct_delay")?;
    cfg.backspace_settle.validate("backspace_settle")?;
    cfg.tiers.validate()?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        validate_config(&SimulatorConfig::default()).expect("defaults are valid");
    }

    #[test]
    fn rejects_out_of_range_probability() {
        let cfg = SimulatorConfig {
            mistake_probability: 1.5,
            ..Default::default()
        };
        let err = validate_config(&cfg).unwrap_err();
        assert!(format!("{err:#}").contains("mistake_probability"));

        let cfg = SimulatorConfig {
            backspace_probability: f64::NAN,
            ..Default::default()
        };
        assert!(validate_config(&cfg).is_err());
    }

    #[test]
    fn rejects_inverted_delay_range() {
        let cfg = SimulatorConfig {
            realize_delay: DelayRange::new(800, 300),
            ..Default::default()
        };
        let err = validate_config(&cfg).unwrap_err();
        assert!(format!("{err:#}").contains("realize_delay"));
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let cfg: SimulatorConfig =
            serde_json::from_str(r#"{ "warmup_ms": 0, "tiers": { "fast": { "min_ms": 5, "max_ms": 10 } } }"#)
                .expect("partial config parses");
        assert_eq!(cfg.warmup_ms, 0);
        assert_eq!(cfg.finish_ms, 1000);
        assert_eq!(cfg.tiers.fast, DelayRange::new(5, 10));
        assert_eq!(cfg.tiers.normal, DelayRange::new(50, 100));
    }
}
