//! # Connection Monitor Module
//!
//! Classifies each `enumerate()` result into a [`ConnectionState`] and turns
//! the stream of states into transitions. The polling itself runs on its own
//! thread (see [`runtime`](crate::runtime)); this module only holds the pure
//! classification and the state the control thread keeps between polls.

use log::{info, warn};

use crate::device::{DeviceInterface, DeviceReport};

/// Message the backend reports when another application holds the port.
pub const ACCESS_DENIED: &str = "Access is denied.";

/// Device presence as seen by the last poll.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connected(String),
    /// Present but unusable, e.g. opened by another application.
    Busy(String),
}

impl ConnectionState {
    pub fn is_connected(&self) -> bool {
        matches!(self, ConnectionState::Connected(_))
    }

    /// Operator-facing status line.
    pub fn status_text(&self) -> &str {
        match self {
            ConnectionState::Disconnected => "Disconnected",
            ConnectionState::Connected(_) => "Connected",
            ConnectionState::Busy(_) => {
                "Device is already being used by other app. Access is denied."
            }
        }
    }
}

/// A change of state worth reacting to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionTransition {
    /// Entered `Connected` from any other state (or from unknown at start-up).
    Connected(String),
    Disconnected,
    Busy(String),
}

/// Maps a backend report onto a connection state.
///
/// "Access denied" wins over everything else; otherwise a non-empty port
/// means connected.
pub fn classify(report: &DeviceReport) -> ConnectionState {
    if let Some(message) = report.message.as_deref() {
        if message == ACCESS_DENIED || message.to_ascii_lowercase().contains("access is denied") {
            return ConnectionState::Busy(message.to_string());
        }
    }
    match report.port.as_deref() {
        Some(port) if !port.is_empty() => ConnectionState::Connected(port.to_string()),
        _ => ConnectionState::Disconnected,
    }
}

/// One enumeration. A transport failure counts as disconnected.
pub fn poll(device: &dyn DeviceInterface) -> ConnectionState {
    match device.enumerate() {
        Ok(report) => classify(&report),
        Err(e) => {
            warn!("[MONITOR] Enumeration failed: {}", e);
            ConnectionState::Disconnected
        }
    }
}

/// Last observed state; `None` until the first poll arrives.
#[derive(Debug, Default)]
pub struct ConnectionMonitor {
    state: Option<ConnectionState>,
}

impl ConnectionMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current state, treating "not yet polled" as disconnected.
    pub fn state(&self) -> ConnectionState {
        self.state.clone().unwrap_or(ConnectionState::Disconnected)
    }

    /// Records a poll result and reports the transition it caused, if any.
    pub fn observe(&mut self, next: ConnectionState) -> Option<ConnectionTransition> {
        let previous = self.state.replace(next.clone());
        if previous.as_ref() == Some(&next) {
            return None;
        }

        match next {
            ConnectionState::Connected(port) => {
                if matches!(previous, Some(ConnectionState::Connected(_))) {
                    info!("[MONITOR] Device moved to {}", port);
                    None
                } else {
                    info!("[MONITOR] Connected on {}", port);
                    Some(ConnectionTransition::Connected(port))
                }
            }
            ConnectionState::Disconnected => {
                // Unknown → Disconnected at start-up is not a transition.
                previous.map(|_| {
                    info!("[MONITOR] Disconnected");
                    ConnectionTransition::Disconnected
                })
            }
            ConnectionState::Busy(reason) => {
                warn!("[MONITOR] Device busy: {}", reason);
                Some(ConnectionTransition::Busy(reason))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockDevice;

    #[test]
    fn access_denied_is_busy_never_connected() {
        let report = DeviceReport {
            port: None,
            message: Some("Access is denied.".into()),
        };
        assert_eq!(classify(&report), ConnectionState::Busy("Access is denied.".into()));

        let with_port = DeviceReport {
            port: Some("COM3".into()),
            message: Some("Access is denied.".into()),
        };
        assert!(!classify(&with_port).is_connected());
    }

    #[test]
    fn port_means_connected() {
        assert_eq!(
            classify(&DeviceReport::connected("COM3")),
            ConnectionState::Connected("COM3".into())
        );
        assert_eq!(classify(&DeviceReport::not_found()), ConnectionState::Disconnected);
        assert_eq!(
            classify(&DeviceReport::connected("")),
            ConnectionState::Disconnected
        );
    }

    #[test]
    fn transitions_fire_once_per_change() {
        let mut monitor = ConnectionMonitor::new();
        assert_eq!(monitor.observe(ConnectionState::Disconnected), None);
        assert_eq!(
            monitor.observe(ConnectionState::Connected("COM3".into())),
            Some(ConnectionTransition::Connected("COM3".into()))
        );
        assert_eq!(monitor.observe(ConnectionState::Connected("COM3".into())), None);
        assert_eq!(monitor.observe(ConnectionState::Connected("COM4".into())), None);
        assert_eq!(
            monitor.observe(ConnectionState::Disconnected),
            Some(ConnectionTransition::Disconnected)
        );
    }

    #[test]
    fn first_poll_connected_is_a_transition() {
        let mut monitor = ConnectionMonitor::new();
        assert_eq!(
            monitor.observe(ConnectionState::Connected("COM3".into())),
            Some(ConnectionTransition::Connected("COM3".into()))
        );
    }

    #[test]
    fn poll_uses_enumerate() {
        let device = MockDevice::connected("COM7");
        assert_eq!(poll(&device), ConnectionState::Connected("COM7".into()));
    }
}
