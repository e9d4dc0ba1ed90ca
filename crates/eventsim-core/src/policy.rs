//! Injection and fault probabilities
//!
//! Every probability the generator rolls against lives here, as a named
//! default plus a plain struct callers can override. Tests set rates to
//! `0.0`/`1.0` and pass a seeded RNG to make outcomes deterministic.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Chance a synthesized record is emitted twice
pub const DEFAULT_DUPLICATE_RATE: f64 = 0.03;
/// Chance a synthesized record has one field corrupted
pub const DEFAULT_DEFECT_RATE: f64 = 0.05;
/// Chance a pull request fails with 503
pub const DEFAULT_ERROR_RATE: f64 = 0.10;
/// Chance a pull request stalls before answering
pub const DEFAULT_LATENCY_RATE: f64 = 0.05;
/// Length of a simulated stall
pub const DEFAULT_STALL: Duration = Duration::from_secs(10);

/// Bernoulli draw that tolerates out-of-range and NaN probabilities.
pub fn roll<R: Rng + ?Sized>(rng: &mut R, probability: f64) -> bool {
    if probability.is_nan() || probability <= 0.0 {
        false
    } else if probability >= 1.0 {
        true
    } else {
        rng.random_bool(probability)
    }
}

// ============================================================================
// Record-level injection
// ============================================================================

/// Data-quality defects applied per synthesized record
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct InjectionPolicy {
    /// Probability of emitting a record twice
    pub duplicate_rate: f64,
    /// Probability of corrupting a record (timestamp or user)
    pub defect_rate: f64,
    /// Master switch for defect injection
    pub defects_enabled: bool,
}

impl Default for InjectionPolicy {
    fn default() -> Self {
        Self {
            duplicate_rate: DEFAULT_DUPLICATE_RATE,
            defect_rate: DEFAULT_DEFECT_RATE,
            defects_enabled: true,
        }
    }
}

impl InjectionPolicy {
    /// Clean output: no duplicates, no defects
    pub fn clean() -> Self {
        Self {
            duplicate_rate: 0.0,
            defect_rate: 0.0,
            defects_enabled: false,
        }
    }

    pub fn without_defects(mut self) -> Self {
        self.defects_enabled = false;
        self
    }

    pub fn effective_defect_rate(&self) -> f64 {
        if self.defects_enabled {
            self.defect_rate
        } else {
            0.0
        }
    }
}

/// Which field a defect corrupts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Defect {
    InvalidTimestamp,
    MissingUser,
}

impl InjectionPolicy {
    /// Roll for a defect; the two kinds are equally likely.
    pub fn roll_defect<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<Defect> {
        if !roll(rng, self.effective_defect_rate()) {
            return None;
        }
        if rng.random_bool(0.5) {
            Some(Defect::InvalidTimestamp)
        } else {
            Some(Defect::MissingUser)
        }
    }

    pub fn roll_duplicate<R: Rng + ?Sized>(&self, rng: &mut R) -> bool {
        roll(rng, self.duplicate_rate)
    }
}

// ============================================================================
// Request-level faults
// ============================================================================

/// Simulated service failures for the pull API, rolled once per request
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FaultPolicy {
    /// Probability of answering 503
    pub error_rate: f64,
    /// Probability of stalling before answering
    pub latency_rate: f64,
    /// Stall length
    pub stall: Duration,
}

impl Default for FaultPolicy {
    fn default() -> Self {
        Self {
            error_rate: DEFAULT_ERROR_RATE,
            latency_rate: DEFAULT_LATENCY_RATE,
            stall: DEFAULT_STALL,
        }
    }
}

/// Outcome of a fault roll
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    None,
    Unavailable,
    Stall(Duration),
}

impl FaultPolicy {
    pub fn disabled() -> Self {
        Self {
            error_rate: 0.0,
            latency_rate: 0.0,
            stall: Duration::ZERO,
        }
    }

    /// An error short-circuits the latency roll.
    pub fn roll<R: Rng + ?Sized>(&self, rng: &mut R) -> Fault {
        if roll(rng, self.error_rate) {
            Fault::Unavailable
        } else if roll(rng, self.latency_rate) {
            Fault::Stall(self.stall)
        } else {
            Fault::None
        }
    }
}
