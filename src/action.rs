//! Operator-triggered calibration actions.
//!
//! Each action is invocable by name with no arguments:
//!
//! | Name | Stage | Effect |
//! |------|-------|--------|
//! | `calibrate_ph4` | 4 | Sample now, store as the pH 4 point |
//! | `calibrate_ph7` | 7 | Sample now, store as the pH 7 point |
//! | `calibrate_ph10` | 10 | Sample now, store as the pH 10 point |
//! | `reset_calibration` | 0 | Clear all points, factory coefficients |

use crate::calibration::CalibrationStage;
use crate::error::ConfigurationError;

/// A calibration action.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum CalibrationAction {
    /// Capture the pH 4 buffer point.
    CalibratePh4,
    /// Capture the pH 7 buffer point.
    CalibratePh7,
    /// Capture the pH 10 buffer point.
    CalibratePh10,
    /// Clear all points.
    ResetCalibration,
}

impl CalibrationAction {
    /// All actions.
    pub const ALL: [CalibrationAction; 4] = [
        CalibrationAction::CalibratePh4,
        CalibrationAction::CalibratePh7,
        CalibrationAction::CalibratePh10,
        CalibrationAction::ResetCalibration,
    ];

    /// Action name.
    pub const fn as_str(&self) -> &'static str {
        match self {
            CalibrationAction::CalibratePh4 => "calibrate_ph4",
            CalibrationAction::CalibratePh7 => "calibrate_ph7",
            CalibrationAction::CalibratePh10 => "calibrate_ph10",
            CalibrationAction::ResetCalibration => "reset_calibration",
        }
    }

    /// Look up an action by name. Surrounding whitespace is ignored.
    ///
    /// # Examples
    ///
    /// ```
    /// use ph_meter::action::CalibrationAction;
    ///
    /// assert_eq!(
    ///     CalibrationAction::from_name("calibrate_ph7"),
    ///     Ok(CalibrationAction::CalibratePh7)
    /// );
    /// assert!(CalibrationAction::from_name("calibrate_ph5").is_err());
    /// ```
    pub fn from_name(name: &str) -> Result<Self, ConfigurationError> {
        let name = name.trim();
        Self::ALL
            .into_iter()
            .find(|a| a.as_str() == name)
            .ok_or(ConfigurationError::UnknownAction)
    }

    /// Look up an action by stage number: 4, 7, 10, or 0 for reset.
    pub fn from_stage(stage: u8) -> Result<Self, ConfigurationError> {
        match stage {
            0 => Ok(CalibrationAction::ResetCalibration),
            n => CalibrationStage::from_number(n).map(Self::calibrate),
        }
    }

    /// The capture action for `stage`.
    pub const fn calibrate(stage: CalibrationStage) -> Self {
        match stage {
            CalibrationStage::Ph4 => CalibrationAction::CalibratePh4,
            CalibrationStage::Ph7 => CalibrationAction::CalibratePh7,
            CalibrationStage::Ph10 => CalibrationAction::CalibratePh10,
        }
    }

    /// Stage captured by this action; `None` for reset.
    pub const fn stage(&self) -> Option<CalibrationStage> {
        match self {
            CalibrationAction::CalibratePh4 => Some(CalibrationStage::Ph4),
            CalibrationAction::CalibratePh7 => Some(CalibrationStage::Ph7),
            CalibrationAction::CalibratePh10 => Some(CalibrationStage::Ph10),
            CalibrationAction::ResetCalibration => None,
        }
    }

    /// Stage number: 4, 7, 10, or 0 for reset.
    pub const fn stage_number(&self) -> u8 {
        match self.stage() {
            Some(stage) => stage.number(),
            None => 0,
        }
    }
}

impl core::fmt::Display for CalibrationAction {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}
