//! # Device Interface
//!
//! The contract this crate consumes from the native device-control backend.
//! How the backend reaches the wheel (serial transport, firmware commands,
//! unit conversion) is its own business; the core only enumerates, pushes
//! settings and reads the encoder.
//!
//! Implementations are shared between the two polling threads and the control
//! thread, hence the `Send + Sync` bound.

use crate::error::TransportError;
use crate::parameter::Parameter;

/// Outcome of one `enumerate()` call.
///
/// `port` is set when the wheel was found and opened; `message` carries the
/// backend's explanation otherwise (for example `"Access is denied."` when
/// another application holds the port).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeviceReport {
    pub port: Option<String>,
    pub message: Option<String>,
}

impl DeviceReport {
    pub fn connected(port: impl Into<String>) -> Self {
        Self {
            port: Some(port.into()),
            message: None,
        }
    }

    pub fn not_found() -> Self {
        Self {
            port: None,
            message: Some("not_found".to_string()),
        }
    }

    pub fn with_message(message: impl Into<String>) -> Self {
        Self {
            port: None,
            message: Some(message.into()),
        }
    }
}

/// Something that can be pushed to the device: a catalog parameter or the
/// one-shot center action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeviceSetting {
    Parameter(Parameter),
    /// Zero the encoder at the current wheel position. Stateless.
    Center,
}

impl DeviceSetting {
    pub fn key(&self) -> &'static str {
        match self {
            DeviceSetting::Parameter(p) => p.key(),
            DeviceSetting::Center => "center",
        }
    }
}

impl From<Parameter> for DeviceSetting {
    fn from(parameter: Parameter) -> Self {
        DeviceSetting::Parameter(parameter)
    }
}

/// Operations offered by the device-control backend.
pub trait DeviceInterface: Send + Sync {
    /// Looks for the wheel and reports whether it could be opened.
    fn enumerate(&self) -> Result<DeviceReport, TransportError>;

    /// Pushes one already-scaled value.
    fn set_parameter(&self, setting: DeviceSetting, value: f64) -> Result<(), TransportError>;

    /// Raw encoder position, in units to be divided by the encoder ratio.
    fn read_encoder(&self) -> Result<f64, TransportError>;
}
