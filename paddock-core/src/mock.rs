use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard};

use crate::device::{DeviceInterface, DeviceReport, DeviceSetting};
use crate::error::TransportError;

/// A call observed by [`MockDevice`].
#[derive(Debug, Clone, PartialEq)]
pub enum DeviceCall {
    Enumerate,
    SetParameter(DeviceSetting, f64),
    ReadEncoder,
}

struct MockState {
    report: DeviceReport,
    encoder: f64,
    encoder_fails: bool,
    failing: HashSet<DeviceSetting>,
    calls: Vec<DeviceCall>,
}

/// Scriptable in-memory wheel. Records every call so tests (and front ends
/// running without hardware) can inspect what would have been sent.
pub struct MockDevice {
    state: Mutex<MockState>,
}

impl Default for MockDevice {
    fn default() -> Self {
        Self::new()
    }
}

impl MockDevice {
    /// Starts unplugged with the encoder at zero.
    pub fn new() -> Self {
        Self {
            state: Mutex::new(MockState {
                report: DeviceReport::not_found(),
                encoder: 0.0,
                encoder_fails: false,
                failing: HashSet::new(),
                calls: Vec::new(),
            }),
        }
    }

    pub fn connected(port: &str) -> Self {
        let device = Self::new();
        device.set_report(DeviceReport::connected(port));
        device
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// What the next `enumerate()` returns.
    pub fn set_report(&self, report: DeviceReport) {
        self.lock().report = report;
    }

    /// Raw value the next `read_encoder()` returns.
    pub fn set_encoder(&self, raw: f64) {
        self.lock().encoder = raw;
    }

    pub fn fail_encoder(&self, fails: bool) {
        self.lock().encoder_fails = fails;
    }

    /// Makes every push of `setting` fail with a transport error.
    pub fn fail_setting(&self, setting: DeviceSetting) {
        self.lock().failing.insert(setting);
    }

    pub fn calls(&self) -> Vec<DeviceCall> {
        self.lock().calls.clone()
    }

    /// Only the `set_parameter` calls, in order.
    pub fn pushes(&self) -> Vec<(DeviceSetting, f64)> {
        self.lock()
            .calls
            .iter()
            .filter_map(|call| match call {
                DeviceCall::SetParameter(setting, value) => Some((*setting, *value)),
                _ => None,
            })
            .collect()
    }

    pub fn clear_calls(&self) {
        self.lock().calls.clear();
    }
}

impl DeviceInterface for MockDevice {
    fn enumerate(&self) -> Result<DeviceReport, TransportError> {
        let mut s = self.lock();
        s.calls.push(DeviceCall::Enumerate);
        Ok(s.report.clone())
    }

    fn set_parameter(&self, setting: DeviceSetting, value: f64) -> Result<(), TransportError> {
        let mut s = self.lock();
        s.calls.push(DeviceCall::SetParameter(setting, value));
        if s.failing.contains(&setting) {
            return Err(TransportError::Io(format!("mock failure for {}", setting.key())));
        }
        Ok(())
    }

    fn read_encoder(&self) -> Result<f64, TransportError> {
        let mut s = self.lock();
        s.calls.push(DeviceCall::ReadEncoder);
        if s.encoder_fails {
            return Err(TransportError::NotConnected);
        }
        Ok(s.encoder)
    }
}
