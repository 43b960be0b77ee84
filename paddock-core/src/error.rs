//! # Error Types
//!
//! Domain rejections surfaced to the operator and transport failures reported
//! by the device backend. Persistence failures never reach this enum: they
//! are logged where they happen and the in-memory state carries on.

use thiserror::Error;

/// Rejections raised by the profile store, the parameter channel and the
/// calibration controller. Every variant leaves state untouched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PaddockError {
    #[error("profile \"{0}\" does not exist")]
    ProfileNotFound(String),

    #[error("a profile named \"{0}\" already exists")]
    DuplicateProfileName(String),

    #[error("the \"Default\" profile cannot be deleted")]
    DefaultProfileProtected,

    /// `name` is profile metadata and must never be transmitted.
    #[error("\"{0}\" is profile metadata, not a device parameter")]
    ReservedKey(String),

    #[error("unknown parameter \"{0}\"")]
    UnknownParameter(String),

    #[error("calibration is not active")]
    CalibrationInactive,

    /// Profile and parameter changes wait until the session has ended.
    #[error("not allowed while calibration is active")]
    CalibrationActive,

    #[error("both end-stops must be reached first (left: {left}, right: {right})")]
    ExtentsNotReached { left: bool, right: bool },

    #[error("the runtime has stopped")]
    RuntimeStopped,
}

/// Failure of a single device call. Logged by the caller and never retried;
/// the next scheduled tick simply tries again.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("device not connected")]
    NotConnected,

    #[error("device I/O failed: {0}")]
    Io(String),
}
