// paddock-core/src/lib.rs

//! The control core for the Paddock force-feedback wheel.
//! This crate keeps the persisted parameter profiles consistent with what is
//! pushed to the device, tracks device presence and wheel rotation with two
//! independent polling loops, and drives the guided end-stop calibration.
//! It is completely headless and contains no GUI code; the device backend
//! itself is supplied by the embedding application through
//! [`device::DeviceInterface`].

pub mod calibration;
pub mod channel;
pub mod config;
pub mod controller;
pub mod device;
pub mod encoder;
pub mod error;
pub mod logging;
pub mod mock;
pub mod monitor;
pub mod parameter;
pub mod persist;
pub mod profile;
pub mod runtime;
pub mod store;

pub use calibration::{CalibrationPhase, CalibrationSession};
pub use channel::ParameterChannel;
pub use config::{Config, RuntimeOptions};
pub use controller::{Controller, DisplayData, Message, ViewMode};
pub use device::{DeviceInterface, DeviceReport, DeviceSetting};
pub use error::{PaddockError, TransportError};
pub use monitor::ConnectionState;
pub use parameter::{Parameter, ParameterValues};
pub use profile::{Profile, ProfileDocument, DEFAULT_PROFILE_NAME};
pub use runtime::{Runtime, RuntimeHandle};
pub use store::ProfileStore;
