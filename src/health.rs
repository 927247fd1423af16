//! Probe health classification.
//!
//! | Status | Condition |
//! |--------|-----------|
//! | `Disconnected` | `debounce` consecutive ticks that failed or sat at a rail of the input range |
//! | `OutOfRange` | pH outside 0-14 |
//! | `Normal` | otherwise |
//!
//! A single good reading clears the fault count.

use num_traits::float::FloatCore;

use crate::acquisition::InputRange;

/// Default number of consecutive faulty ticks before `Disconnected`.
pub const DEFAULT_DISCONNECT_DEBOUNCE: u8 = 3;

/// Default distance from either rail that still counts as "at the rail", in mV.
pub const DEFAULT_RAIL_MARGIN_MV: f32 = 5.0;

/// Lowest pH considered in range.
pub const PH_MIN: f32 = 0.0;

/// Highest pH considered in range.
pub const PH_MAX: f32 = 14.0;

/// Health of the probe signal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum ProbeStatus {
    /// Reading is plausible.
    #[default]
    Normal,
    /// pH outside 0-14.
    OutOfRange,
    /// No usable signal.
    Disconnected,
}

impl ProbeStatus {
    /// Text published on the status output.
    pub const fn as_str(&self) -> &'static str {
        match self {
            ProbeStatus::Normal => "normal",
            ProbeStatus::OutOfRange => "out_of_range",
            ProbeStatus::Disconnected => "disconnected",
        }
    }
}

impl core::fmt::Display for ProbeStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Tracks consecutive faulty ticks and classifies each outcome.
#[derive(Clone, Debug)]
pub struct ProbeHealthMonitor {
    debounce: u8,
    rail_margin_mv: f32,
    consecutive_faults: u8,
    status: ProbeStatus,
}

impl Default for ProbeHealthMonitor {
    fn default() -> Self {
        Self::new(DEFAULT_DISCONNECT_DEBOUNCE, DEFAULT_RAIL_MARGIN_MV)
    }
}

impl ProbeHealthMonitor {
    /// Create a monitor. A debounce of 0 is treated as 1.
    pub fn new(debounce: u8, rail_margin_mv: f32) -> Self {
        Self {
            debounce: debounce.max(1),
            rail_margin_mv,
            consecutive_faults: 0,
            status: ProbeStatus::Normal,
        }
    }

    /// Record a tick whose acquisition failed.
    pub fn record_failure(&mut self) -> ProbeStatus {
        self.bump();
        if self.consecutive_faults >= self.debounce {
            self.set(ProbeStatus::Disconnected)
        } else {
            self.status
        }
    }

    /// Record a successful reading.
    ///
    /// `millivolts` is checked against both ends of `range`, `ph` against 0-14.
    pub fn record_reading(&mut self, millivolts: f32, range: InputRange, ph: f32) -> ProbeStatus {
        if self.at_rail(millivolts, range) {
            self.bump();
            if self.consecutive_faults >= self.debounce {
                return self.set(ProbeStatus::Disconnected);
            }
        } else {
            self.consecutive_faults = 0;
        }

        if FloatCore::is_nan(ph) || !(PH_MIN..=PH_MAX).contains(&ph) {
            self.set(ProbeStatus::OutOfRange)
        } else {
            self.set(ProbeStatus::Normal)
        }
    }

    /// Returns true if `millivolts` sits within the rail margin of either end of `range`.
    pub fn at_rail(&self, millivolts: f32, range: InputRange) -> bool {
        range.at_rail(millivolts, self.rail_margin_mv)
    }

    /// Current status.
    pub fn status(&self) -> ProbeStatus {
        self.status
    }

    /// Consecutive faulty ticks so far.
    pub fn consecutive_faults(&self) -> u8 {
        self.consecutive_faults
    }

    /// Debounce count.
    pub fn debounce(&self) -> u8 {
        self.debounce
    }

    /// Forget fault history.
    pub fn reset(&mut self) {
        self.consecutive_faults = 0;
        self.status = ProbeStatus::Normal;
    }

    fn bump(&mut self) {
        self.consecutive_faults = self.consecutive_faults.saturating_add(1);
    }

    fn set(&mut self, status: ProbeStatus) -> ProbeStatus {
        if status != self.status {
            match status {
                ProbeStatus::Normal => log::info!("probe status: {}", status),
                _ => log::warn!("probe status: {}", status),
            }
        }
        self.status = status;
        status
    }
}
