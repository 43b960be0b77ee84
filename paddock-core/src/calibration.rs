//! # Calibration Module
//!
//! Guided two-point calibration of the wheel's physical rotation range.
//!
//! ```text
//! Idle ──start──▶ Active ──finish (both end-stops seen)──▶ Done ────┐
//!  ▲                │                                              │
//!  │                └──────skip (any time)───────────────▶ Skipped ┤
//!  └───────────────────────acknowledge──────────────────────────────┘
//! ```
//!
//! On entry a reduced-force preset is pushed so the operator can safely turn
//! the wheel into both mechanical end-stops. Either terminal outcome
//! re-applies the selected profile, restoring normal force levels. Once the
//! front end is back on its main view the session is acknowledged and
//! returns to `Idle`; the outcome is kept in `last_outcome`.
//!
//! The session also carries the sticky *first-connect* flag: armed at
//! start-up, it makes the first connection start a calibration, and is only
//! cleared when a session ends (or re-armed by the operator).

use log::info;

use crate::channel::ParameterChannel;
use crate::error::PaddockError;
use crate::parameter::Parameter;
use crate::store::ProfileStore;

/// A sample above this many degrees marks the right end-stop as reached.
pub const RIGHT_THRESHOLD: i32 = 160;
/// A sample below this many degrees marks the left end-stop as reached.
pub const LEFT_THRESHOLD: i32 = -160;

/// Reduced-force preset pushed on entry: near-minimum range, low power,
/// maximal idle spring.
pub const CALIBRATION_PRESET: [(Parameter, f64); 3] = [
    (Parameter::Degrees, 90.0),
    (Parameter::Power, 10.0),
    (Parameter::IdleSpring, 100.0),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CalibrationPhase {
    Idle,
    Active,
    Done,
    Skipped,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalibrationSession {
    pub phase: CalibrationPhase,
    pub left_reached: bool,
    pub right_reached: bool,
    /// Start a calibration on the next connection.
    pub first_connect_armed: bool,
    /// `Done` or `Skipped` for the most recent session that ended.
    pub last_outcome: Option<CalibrationPhase>,
}

impl Default for CalibrationSession {
    fn default() -> Self {
        Self::new()
    }
}

impl CalibrationSession {
    /// Idle, with the first-connect flag armed.
    pub fn new() -> Self {
        Self {
            phase: CalibrationPhase::Idle,
            left_reached: false,
            right_reached: false,
            first_connect_armed: true,
            last_outcome: None,
        }
    }

    pub fn is_active(&self) -> bool {
        self.phase == CalibrationPhase::Active
    }

    /// Enters `Active`, clearing both flags and pushing the preset.
    ///
    /// Calling this while already active restarts the session.
    pub fn start(&mut self, channel: &mut ParameterChannel) {
        self.phase = CalibrationPhase::Active;
        self.left_reached = false;
        self.right_reached = false;
        info!("[CALIBRATION] Started");
        for (parameter, value) in CALIBRATION_PRESET {
            channel.set(parameter, value);
        }
    }

    /// Reacts to a transition into `Connected`. Returns true if a session
    /// was started.
    pub fn on_connected(&mut self, channel: &mut ParameterChannel) -> bool {
        if !self.first_connect_armed || self.is_active() {
            return false;
        }
        info!("[CALIBRATION] First connection, starting calibration");
        self.start(channel);
        true
    }

    /// Feeds a rotation sample. Flags only ever go from false to true.
    pub fn observe(&mut self, degrees: i32) {
        if !self.is_active() {
            return;
        }
        if degrees > RIGHT_THRESHOLD && !self.right_reached {
            info!("[CALIBRATION] Right end-stop reached ({}°)", degrees);
            self.right_reached = true;
        }
        if degrees < LEFT_THRESHOLD && !self.left_reached {
            info!("[CALIBRATION] Left end-stop reached ({}°)", degrees);
            self.left_reached = true;
        }
    }

    /// Completes the session once both end-stops have been seen.
    pub fn finish(
        &mut self,
        store: &ProfileStore,
        channel: &mut ParameterChannel,
    ) -> Result<(), PaddockError> {
        if !self.is_active() {
            return Err(PaddockError::CalibrationInactive);
        }
        if !(self.left_reached && self.right_reached) {
            return Err(PaddockError::ExtentsNotReached {
                left: self.left_reached,
                right: self.right_reached,
            });
        }
        self.end(CalibrationPhase::Done, store, channel);
        Ok(())
    }

    /// Abandons the session without requiring the end-stops.
    pub fn skip(
        &mut self,
        store: &ProfileStore,
        channel: &mut ParameterChannel,
    ) -> Result<(), PaddockError> {
        if !self.is_active() {
            return Err(PaddockError::CalibrationInactive);
        }
        self.end(CalibrationPhase::Skipped, store, channel);
        Ok(())
    }

    /// Returns an ended session to `Idle`. Does nothing otherwise.
    pub fn acknowledge(&mut self) {
        if matches!(self.phase, CalibrationPhase::Done | CalibrationPhase::Skipped) {
            self.phase = CalibrationPhase::Idle;
        }
    }

    /// Forces a calibration on the next connection.
    pub fn rearm(&mut self) {
        self.first_connect_armed = true;
    }

    fn end(
        &mut self,
        outcome: CalibrationPhase,
        store: &ProfileStore,
        channel: &mut ParameterChannel,
    ) {
        self.phase = outcome;
        self.last_outcome = Some(outcome);
        self.first_connect_armed = false;
        info!("[CALIBRATION] Ended: {:?}", outcome);
        if let Some(profile) = store.current_profile() {
            channel.apply_profile(profile);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::device::DeviceSetting;
    use crate::mock::MockDevice;
    use std::sync::Arc;

    fn setup() -> (tempfile::TempDir, Arc<MockDevice>, ParameterChannel, ProfileStore) {
        let dir = tempfile::tempdir().unwrap();
        let device = Arc::new(MockDevice::connected("COM3"));
        let mut channel = ParameterChannel::new(device.clone(), Config::default());
        let store = ProfileStore::open(dir.path().join("profiles.json"), &mut channel);
        device.clear_calls();
        (dir, device, channel, store)
    }

    #[test]
    fn start_pushes_reduced_force_preset() {
        let (_dir, device, mut channel, _store) = setup();
        let mut session = CalibrationSession::new();
        session.left_reached = true;

        session.start(&mut channel);

        assert!(session.is_active());
        assert!(!session.left_reached && !session.right_reached);
        let expected: Vec<_> = CALIBRATION_PRESET
            .iter()
            .map(|(p, v)| (DeviceSetting::Parameter(*p), *v))
            .collect();
        assert_eq!(device.pushes(), expected);
    }

    #[test]
    fn samples_set_flags_at_thresholds() {
        let (_dir, _device, mut channel, store) = setup();
        let mut session = CalibrationSession::new();
        session.start(&mut channel);

        session.observe(10);
        assert!(!session.right_reached && !session.left_reached);
        session.observe(170);
        assert!(session.right_reached && !session.left_reached);

        let err = session.finish(&store, &mut channel).unwrap_err();
        assert_eq!(err, PaddockError::ExtentsNotReached { left: false, right: true });
        assert!(session.is_active());

        session.observe(-5);
        assert!(session.right_reached, "flags never reset within a session");
        session.observe(-165);
        assert!(session.left_reached);

        session.finish(&store, &mut channel).unwrap();
        assert_eq!(session.phase, CalibrationPhase::Done);
        assert!(!session.first_connect_armed);
    }

    #[test]
    fn exact_threshold_does_not_count() {
        let (_dir, _device, mut channel, _store) = setup();
        let mut session = CalibrationSession::new();
        session.start(&mut channel);
        session.observe(160);
        session.observe(-160);
        assert!(!session.right_reached && !session.left_reached);
    }

    #[test]
    fn skip_restores_profile_and_disarms() {
        let (_dir, device, mut channel, store) = setup();
        let mut session = CalibrationSession::new();
        session.start(&mut channel);
        device.clear_calls();

        session.skip(&store, &mut channel).unwrap();

        assert_eq!(session.phase, CalibrationPhase::Skipped);
        assert!(!session.first_connect_armed);
        assert_eq!(device.pushes().len(), Parameter::ALL.len());
        assert_eq!(channel.live_values()[Parameter::Power], 50.0);
    }

    #[test]
    fn acknowledge_returns_ended_session_to_idle() {
        let (_dir, _device, mut channel, store) = setup();
        let mut session = CalibrationSession::new();
        session.acknowledge();
        assert_eq!(session.phase, CalibrationPhase::Idle);

        session.start(&mut channel);
        session.acknowledge();
        assert!(session.is_active());

        session.skip(&store, &mut channel).unwrap();
        session.acknowledge();
        assert_eq!(session.phase, CalibrationPhase::Idle);
        assert_eq!(session.last_outcome, Some(CalibrationPhase::Skipped));
    }

    #[test]
    fn finish_and_skip_need_an_active_session() {
        let (_dir, _device, mut channel, store) = setup();
        let mut session = CalibrationSession::new();
        assert_eq!(session.finish(&store, &mut channel), Err(PaddockError::CalibrationInactive));
        assert_eq!(session.skip(&store, &mut channel), Err(PaddockError::CalibrationInactive));
        assert_eq!(session.phase, CalibrationPhase::Idle);
    }

    #[test]
    fn first_connect_only_while_armed() {
        let (_dir, _device, mut channel, store) = setup();
        let mut session = CalibrationSession::new();
        assert!(session.on_connected(&mut channel));
        session.skip(&store, &mut channel).unwrap();

        assert!(!session.on_connected(&mut channel));
        session.rearm();
        assert!(session.on_connected(&mut channel));
    }
}
