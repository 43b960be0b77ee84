//! # Parameter Channel Module
//!
//! Translates named settings into [`DeviceInterface`] calls. It owns the
//! record of *live* values, i.e. what has most recently been issued to the
//! device, and applies the unit scaling from [`Config`].
//!
//! Delivery is fire-and-forget: a transport failure is logged and the caller
//! carries on, so one bad field never stops the rest of a profile from being
//! sent.

use log::{debug, warn};
use std::sync::Arc;

use crate::config::Config;
use crate::device::{DeviceInterface, DeviceSetting};
use crate::error::PaddockError;
use crate::parameter::{Parameter, ParameterValues};
use crate::profile::Profile;

pub struct ParameterChannel {
    device: Arc<dyn DeviceInterface>,
    config: Config,
    live: ParameterValues,
}

impl ParameterChannel {
    /// Live values start at the catalog baseline until something is applied.
    pub fn new(device: Arc<dyn DeviceInterface>, config: Config) -> Self {
        Self {
            device,
            config,
            live: ParameterValues::default(),
        }
    }

    pub fn config(&self) -> Config {
        self.config
    }

    /// Values most recently issued, one per catalog parameter.
    pub fn live_values(&self) -> &ParameterValues {
        &self.live
    }

    /// Pushes `raw` for `parameter`, scaling `degrees` by the angle ratio.
    ///
    /// `raw` is first held to the catalog range; a non-finite value is
    /// replaced by the baseline. The live value is recorded as the call is
    /// issued, whether or not the transport accepts it.
    pub fn set(&mut self, parameter: Parameter, raw: f64) {
        let raw = parameter.spec().clamp(raw);
        self.live.set(parameter, raw);
        let value = parameter.spec().transmit(raw, self.config.angle_ratio);
        self.push(DeviceSetting::Parameter(parameter), value);
    }

    /// Pushes a setting addressed by its document key.
    ///
    /// `"name"` is profile metadata and is refused; `"center"` triggers the
    /// center action and ignores `raw`.
    pub fn set_by_key(&mut self, key: &str, raw: f64) -> Result<(), PaddockError> {
        if key == "name" {
            return Err(PaddockError::ReservedKey(key.to_string()));
        }
        if key == DeviceSetting::Center.key() {
            self.center();
            return Ok(());
        }
        let parameter =
            Parameter::from_key(key).ok_or_else(|| PaddockError::UnknownParameter(key.to_string()))?;
        self.set(parameter, raw);
        Ok(())
    }

    /// Zeroes the encoder at the wheel's current position.
    pub fn center(&mut self) {
        self.push(DeviceSetting::Center, 0.0);
    }

    /// Pushes every catalog field in fixed order, one call per field.
    pub fn apply_values(&mut self, values: &ParameterValues) {
        for (parameter, value) in values.iter() {
            self.set(parameter, value);
        }
    }

    pub fn apply_profile(&mut self, profile: &Profile) {
        debug!("[CHANNEL] Applying profile \"{}\"", profile.name);
        self.apply_values(&profile.values);
    }

    fn push(&self, setting: DeviceSetting, value: f64) {
        debug!("[CHANNEL] {} = {}", setting.key(), value);
        if let Err(e) = self.device.set_parameter(setting, value) {
            warn!("[CHANNEL] Failed to send {}: {}", setting.key(), e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockDevice;

    fn channel_with(angle_ratio: f64) -> (Arc<MockDevice>, ParameterChannel) {
        let device = Arc::new(MockDevice::connected("COM3"));
        let channel = ParameterChannel::new(device.clone(), Config::new(1.0, angle_ratio));
        (device, channel)
    }

    #[test]
    fn apply_sends_every_field_in_catalog_order() {
        let (device, mut channel) = channel_with(2.0);
        let profile = Profile::new("Drift", ParameterValues::default().with(Parameter::Degrees, 900.0));

        channel.apply_profile(&profile);

        let pushes = device.pushes();
        assert_eq!(pushes.len(), Parameter::ALL.len());
        for ((setting, _), expected) in pushes.iter().zip(Parameter::ALL) {
            assert_eq!(*setting, DeviceSetting::Parameter(expected));
        }
        assert_eq!(pushes[0].1, 1800.0);
        assert_eq!(channel.live_values()[Parameter::Degrees], 900.0);
    }

    #[test]
    fn name_is_never_transmitted() {
        let (device, mut channel) = channel_with(1.0);
        let err = channel.set_by_key("name", 1.0).unwrap_err();
        assert_eq!(err, PaddockError::ReservedKey("name".into()));
        assert!(device.pushes().is_empty());
    }

    #[test]
    fn unknown_key_is_rejected() {
        let (_, mut channel) = channel_with(1.0);
        assert!(matches!(
            channel.set_by_key("torque", 1.0),
            Err(PaddockError::UnknownParameter(_))
        ));
    }

    #[test]
    fn center_key_triggers_center_action() {
        let (device, mut channel) = channel_with(1.0);
        channel.set_by_key("center", 42.0).unwrap();
        assert_eq!(device.pushes(), vec![(DeviceSetting::Center, 0.0)]);
    }

    #[test]
    fn non_finite_values_never_reach_the_device() {
        let (device, mut channel) = channel_with(2.0);

        channel.set_by_key("degrees", f64::NAN).unwrap();
        channel.set(Parameter::Power, f64::INFINITY);
        channel.set(Parameter::FilterQ, 500.0);

        assert_eq!(
            device.pushes(),
            vec![
                (DeviceSetting::Parameter(Parameter::Degrees), 1080.0),
                (DeviceSetting::Parameter(Parameter::Power), 50.0),
                (DeviceSetting::Parameter(Parameter::FilterQ), 80.0),
            ]
        );
        assert_eq!(channel.live_values()[Parameter::Degrees], 540.0);
    }

    #[test]
    fn transport_failure_does_not_stop_apply() {
        let (device, mut channel) = channel_with(1.0);
        device.fail_setting(DeviceSetting::Parameter(Parameter::Power));

        channel.apply_values(&ParameterValues::default().with(Parameter::Power, 80.0));

        assert_eq!(device.pushes().len(), Parameter::ALL.len());
        assert_eq!(channel.live_values()[Parameter::Power], 80.0);
    }
}
