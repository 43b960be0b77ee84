//! # Encoder Tracker Module
//!
//! Converts raw encoder readings into whole display degrees. The resulting
//! sample is the only input to calibration end-stop detection.

use log::debug;

use crate::device::DeviceInterface;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EncoderTracker {
    encoder_ratio: f64,
}

impl EncoderTracker {
    /// `encoder_ratio` must be strictly positive; [`Config`](crate::config::Config)
    /// guarantees this for loaded values.
    pub fn new(encoder_ratio: f64) -> Self {
        Self { encoder_ratio }
    }

    /// Divides by the encoder ratio, then floors.
    pub fn to_degrees(&self, raw: f64) -> i32 {
        (raw / self.encoder_ratio).floor() as i32
    }

    /// One encoder read. Failures are logged and yield no sample.
    pub fn poll(&self, device: &dyn DeviceInterface) -> Option<i32> {
        match device.read_encoder() {
            Ok(raw) => Some(self.to_degrees(raw)),
            Err(e) => {
                debug!("[ENCODER] Read failed: {}", e);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockDevice;

    #[test]
    fn divides_then_floors() {
        let tracker = EncoderTracker::new(2.0);
        assert_eq!(tracker.to_degrees(101.0), 50);
        assert_eq!(tracker.to_degrees(-101.0), -51);
        assert_eq!(EncoderTracker::new(1.0).to_degrees(170.9), 170);
    }

    #[test]
    fn failed_read_yields_no_sample() {
        let device = MockDevice::connected("COM3");
        let tracker = EncoderTracker::new(1.0);
        device.set_encoder(-165.2);
        assert_eq!(tracker.poll(&device), Some(-166));

        device.fail_encoder(true);
        assert_eq!(tracker.poll(&device), None);
    }
}
