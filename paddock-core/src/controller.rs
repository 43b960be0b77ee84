//! # Controller Module
//!
//! The single logical control thread. Poll results and operator commands
//! arrive as [`Message`]s and are handled one at a time by
//! [`Controller::update`], which is the only code that mutates the profile
//! store, the live values, the connection state, the rotation sample and the
//! calibration session. Nothing here needs a lock.

use log::info;
use std::path::PathBuf;
use std::sync::Arc;

use crate::calibration::CalibrationSession;
use crate::channel::ParameterChannel;
use crate::config::Config;
use crate::device::DeviceInterface;
use crate::error::PaddockError;
use crate::monitor::{ConnectionMonitor, ConnectionState, ConnectionTransition};
use crate::parameter::{Parameter, ParameterValues};
use crate::profile::DEFAULT_PROFILE_NAME;
use crate::store::ProfileStore;

/// Everything the control thread reacts to.
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    // Poll results
    Connection(ConnectionState), // From the connection poll thread
    Rotation(i32),               // Wheel angle in whole degrees

    // Profile management
    SelectProfile(String),
    CreateProfile(String), // New profile cloned from "Default"
    SaveCurrentProfile,    // Store live values into the current profile
    DeleteCurrentProfile,

    // Live editing
    EditParameter(Parameter, f64),
    NudgeParameter(Parameter, i32), // Scroll adjust, in catalog steps
    CenterWheel,

    // Calibration
    StartCalibration,
    FinishCalibration,
    SkipCalibration,
    RearmCalibration, // Calibrate again on the next connection
}

/// Which page the front end should show.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewMode {
    Main,
    Calibration,
}

/// Snapshot of everything a front end renders.
#[derive(Debug, Clone, PartialEq)]
pub struct DisplayData {
    pub status: String,
    pub connection: ConnectionState,
    pub rotation: i32,
    pub live_values: ParameterValues,
    pub current_profile: String,
    pub profiles: Vec<String>,
    pub calibration: CalibrationSession,
    /// Live values differ from the stored profile.
    pub profile_changed: bool,
    pub view: ViewMode,
}

pub struct Controller {
    channel: ParameterChannel,
    store: ProfileStore,
    monitor: ConnectionMonitor,
    calibration: CalibrationSession,
    rotation: i32,
    profile_changed: bool,
    view: ViewMode,
}

impl Controller {
    /// Opens the profile store at `profiles_path` and activates its current
    /// profile.
    pub fn new(
        device: Arc<dyn DeviceInterface>,
        config: Config,
        profiles_path: impl Into<PathBuf>,
    ) -> Self {
        let mut channel = ParameterChannel::new(device, config);
        let store = ProfileStore::open(profiles_path, &mut channel);
        Self {
            channel,
            store,
            monitor: ConnectionMonitor::new(),
            calibration: CalibrationSession::new(),
            rotation: 0,
            profile_changed: false,
            view: ViewMode::Main,
        }
    }

    pub fn store(&self) -> &ProfileStore {
        &self.store
    }

    pub fn channel(&self) -> &ParameterChannel {
        &self.channel
    }

    pub fn calibration(&self) -> &CalibrationSession {
        &self.calibration
    }

    pub fn connection(&self) -> ConnectionState {
        self.monitor.state()
    }

    pub fn rotation(&self) -> i32 {
        self.rotation
    }

    pub fn view(&self) -> ViewMode {
        self.view
    }

    /// Handles one message. Rejections leave every piece of state as it was.
    pub fn update(&mut self, message: Message) -> Result<(), PaddockError> {
        match message {
            Message::Connection(state) => {
                if let Some(ConnectionTransition::Connected(_)) = self.monitor.observe(state) {
                    if self.calibration.on_connected(&mut self.channel) {
                        self.view = ViewMode::Calibration;
                    }
                }
            }
            Message::Rotation(degrees) => {
                self.rotation = degrees;
                self.calibration.observe(degrees);
            }
            Message::SelectProfile(name) => {
                self.ensure_not_calibrating()?;
                self.store.select_profile(&name, &mut self.channel)?;
                self.profile_changed = false;
            }
            Message::CreateProfile(name) => {
                self.ensure_not_calibrating()?;
                let baseline = self
                    .store
                    .document()
                    .find(DEFAULT_PROFILE_NAME)
                    .map(|p| p.values)
                    .unwrap_or_default();
                self.store.create_profile(&name, &baseline, &mut self.channel)?;
                self.profile_changed = false;
            }
            Message::SaveCurrentProfile => {
                self.ensure_not_calibrating()?;
                let live = *self.channel.live_values();
                self.store.update_current_profile(&live);
                self.profile_changed = false;
            }
            Message::DeleteCurrentProfile => {
                self.ensure_not_calibrating()?;
                self.store.delete_current_profile(&mut self.channel)?;
                self.profile_changed = false;
            }
            Message::EditParameter(parameter, value) => {
                self.ensure_not_calibrating()?;
                let value = parameter.spec().normalize(value);
                self.channel.set(parameter, value);
                self.profile_changed = true;
            }
            Message::NudgeParameter(parameter, steps) => {
                self.ensure_not_calibrating()?;
                let current = self.channel.live_values()[parameter];
                let value = parameter.spec().nudge(current, steps);
                self.channel.set(parameter, value);
                self.profile_changed = true;
            }
            Message::CenterWheel => {
                info!("[CONTROL] Centering wheel");
                self.channel.center();
            }
            Message::StartCalibration => {
                self.calibration.start(&mut self.channel);
                self.view = ViewMode::Calibration;
            }
            Message::FinishCalibration => {
                self.calibration.finish(&self.store, &mut self.channel)?;
                self.return_to_main();
            }
            Message::SkipCalibration => {
                self.calibration.skip(&self.store, &mut self.channel)?;
                self.return_to_main();
            }
            Message::RearmCalibration => {
                self.calibration.rearm();
            }
        }
        Ok(())
    }

    /// The reduced-force preset is live during calibration; it must not be
    /// saved or replaced by profile values.
    fn ensure_not_calibrating(&self) -> Result<(), PaddockError> {
        if self.calibration.is_active() {
            return Err(PaddockError::CalibrationActive);
        }
        Ok(())
    }

    fn return_to_main(&mut self) {
        self.calibration.acknowledge();
        self.view = ViewMode::Main;
        // The stored profile was just re-applied.
        self.profile_changed = false;
    }

    pub fn display_data(&self) -> DisplayData {
        let connection = self.monitor.state();
        DisplayData {
            status: connection.status_text().to_string(),
            connection,
            rotation: self.rotation,
            live_values: *self.channel.live_values(),
            current_profile: self.store.current_name().to_string(),
            profiles: self.store.profile_names(),
            calibration: self.calibration.clone(),
            profile_changed: self.profile_changed,
            view: self.view,
        }
    }
}
