//! Shared message types for MQTT communication.
//!
//! These types are `no_std` compatible and can be deserialized using either
//! `serde_json` (desktop) or `serde-json-core` (embedded).
//!
//! # Example
//!
//! ```
//! use ph_meter::messages::CalibrationRequest;
//! use ph_meter::CalibrationAction;
//!
//! // Desktop: using serde_json
//! #[cfg(feature = "mqtt")]
//! {
//!     let json = r#"{"action": "calibrate_ph7"}"#;
//!     let req: CalibrationRequest = serde_json::from_str(json).unwrap();
//!     assert_eq!(req.action, CalibrationAction::CalibratePh7);
//! }
//!
//! // Embedded: using serde-json-core
//! #[cfg(feature = "serde-json-core")]
//! {
//!     let json = br#"{"action": "reset_calibration"}"#;
//!     let (req, _): (CalibrationRequest, _) = serde_json_core::from_slice(json).unwrap();
//!     assert_eq!(req.action, CalibrationAction::ResetCalibration);
//! }
//! ```

use serde::{Deserialize, Serialize};

use crate::action::CalibrationAction;

// ============================================================================
// Request Types
// ============================================================================

/// Request to run a calibration action.
///
/// # JSON Examples
///
/// ```json
/// {"action": "calibrate_ph4"}
/// {"action": "reset_calibration"}
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalibrationRequest {
    /// Action to run
    pub action: CalibrationAction,
}

impl CalibrationRequest {
    /// Create a new calibration request.
    pub fn new(action: CalibrationAction) -> Self {
        Self { action }
    }
}

/// Request to turn calibration mode on or off.
///
/// # JSON Example
///
/// ```json
/// {"enabled": true}
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalibrationModeRequest {
    /// Whether calibration mode should be on
    pub enabled: bool,
}

impl CalibrationModeRequest {
    /// Create a new mode request.
    pub fn new(enabled: bool) -> Self {
        Self { enabled }
    }
}

// ============================================================================
// Parsing Functions (using serde-json-core for no_std compatibility)
// ============================================================================

/// Parse a calibration request from JSON bytes.
///
/// Works in both `std` and `no_std` environments using `serde-json-core`.
///
/// # Example
///
/// ```
/// use ph_meter::messages::parse_calibration_request;
/// use ph_meter::CalibrationAction;
///
/// let json = br#"{"action": "calibrate_ph10"}"#;
/// let req = parse_calibration_request(json).unwrap();
/// assert_eq!(req.action, CalibrationAction::CalibratePh10);
/// ```
#[cfg(feature = "serde-json-core")]
pub fn parse_calibration_request(json: &[u8]) -> Option<CalibrationRequest> {
    serde_json_core::from_slice(json).ok().map(|(req, _)| req)
}

/// Parse a calibration mode request from JSON bytes.
///
/// # Example
///
/// ```
/// use ph_meter::messages::parse_calibration_mode_request;
///
/// let req = parse_calibration_mode_request(br#"{"enabled": false}"#).unwrap();
/// assert!(!req.enabled);
/// ```
#[cfg(feature = "serde-json-core")]
pub fn parse_calibration_mode_request(json: &[u8]) -> Option<CalibrationModeRequest> {
    serde_json_core::from_slice(json).ok().map(|(req, _)| req)
}

/// Parse a calibration command payload: a bare action name
/// (`calibrate_ph4`) or a [`CalibrationRequest`] JSON object.
#[cfg(feature = "serde-json-core")]
pub fn parse_calibration_command(payload: &[u8]) -> Option<CalibrationAction> {
    if let Some(req) = parse_calibration_request(payload) {
        return Some(req.action);
    }
    let text = core::str::from_utf8(payload).ok()?;
    CalibrationAction::from_name(text.trim_matches(|c: char| c.is_whitespace() || c == '"')).ok()
}

/// Parse a calibration mode payload: `on`/`off`, `true`/`false`, `1`/`0`
/// (case-insensitive) or a [`CalibrationModeRequest`] JSON object.
#[cfg(feature = "serde-json-core")]
pub fn parse_calibration_mode_command(payload: &[u8]) -> Option<bool> {
    if let Some(req) = parse_calibration_mode_request(payload) {
        return Some(req.enabled);
    }
    let text = core::str::from_utf8(payload).ok()?.trim();
    if ["on", "true", "1"].iter().any(|s| text.eq_ignore_ascii_case(s)) {
        Some(true)
    } else if ["off", "false", "0"].iter().any(|s| text.eq_ignore_ascii_case(s)) {
        Some(false)
    } else {
        None
    }
}
