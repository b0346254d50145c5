//! Learning-rate schedules applied per round by loop specializations.

use serde::{Deserialize, Serialize};

/// Round-indexed learning-rate schedule.
///
/// The usual research flavors: constant, exponential decay (optionally
/// staircased to decay in steps), inverse-linear decay, and inverse
/// square-root decay.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LrSchedule {
    Constant {
        base: f64,
    },
    ExpDecay {
        base: f64,
        decay_rate: f64,
        decay_rounds: u64,
        staircase: bool,
    },
    InvLinDecay {
        base: f64,
        decay_rate: f64,
    },
    InvSqrtDecay {
        base: f64,
        decay_rate: f64,
    },
}

impl LrSchedule {
    pub fn constant(base: f64) -> Self {
        Self::Constant { base }
    }

    /// Learning rate at `round`.
    pub fn lr(&self, round: u64) -> f64 {
        match *self {
            Self::Constant { base } => base,
            Self::ExpDecay {
                base,
                decay_rate,
                decay_rounds,
                staircase,
            } => {
                let mut exponent = round as f64 / decay_rounds.max(1) as f64;
                if staircase {
                    exponent = exponent.floor();
                }
                base * decay_rate.powf(exponent)
            }
            Self::InvLinDecay { base, decay_rate } => base / (1.0 + decay_rate * round as f64),
            Self::InvSqrtDecay { base, decay_rate } => {
                base / (1.0 + decay_rate * round as f64).sqrt()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constant() {
        let s = LrSchedule::constant(0.1);
        assert_eq!(s.lr(0), 0.1);
        assert_eq!(s.lr(1000), 0.1);
    }

    #[test]
    fn test_exp_decay_smooth_and_staircase() {
        let smooth = LrSchedule::ExpDecay {
            base: 1.0,
            decay_rate: 0.5,
            decay_rounds: 10,
            staircase: false,
        };
        assert_eq!(smooth.lr(0), 1.0);
        assert!((smooth.lr(10) - 0.5).abs() < 1e-12);
        assert!(smooth.lr(5) < 1.0 && smooth.lr(5) > 0.5);

        let stepped = LrSchedule::ExpDecay {
            base: 1.0,
            decay_rate: 0.5,
            decay_rounds: 10,
            staircase: true,
        };
        assert_eq!(stepped.lr(9), 1.0);
        assert!((stepped.lr(10) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_inverse_decays() {
        let lin = LrSchedule::InvLinDecay {
            base: 1.0,
            decay_rate: 1.0,
        };
        assert_eq!(lin.lr(0), 1.0);
        assert!((lin.lr(3) - 0.25).abs() < 1e-12);

        let sqrt = LrSchedule::InvSqrtDecay {
            base: 1.0,
            decay_rate: 1.0,
        };
        assert_eq!(sqrt.lr(0), 1.0);
        assert!((sqrt.lr(3) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_toml_round_trip() {
        let s = LrSchedule::InvLinDecay {
            base: 0.1,
            decay_rate: 0.01,
        };
        let text = toml::to_string(&s).unwrap();
        let parsed: LrSchedule = toml::from_str(&text).unwrap();
        assert_eq!(parsed, s);
    }
}
