//! Network services for MQTT integration.
//!
//! The tick loop and the MQTT command handler share one [`PhMeter`] through
//! [`SharedMeter`], wrapped in `Arc`:
//!
//! ```ignore
//! use std::sync::Arc;
//! use ph_meter::services::{MqttHandler, SharedMeter};
//!
//! let state = Arc::new(SharedMeter::new(meter));
//! let handler = MqttHandler::new(Arc::clone(&state), mqtt_config, tx, rx);
//! ```
//!
//! [`PhMeter`]: crate::PhMeter

pub mod mqtt;
pub mod shared;

pub use mqtt::*;
pub use shared::*;
