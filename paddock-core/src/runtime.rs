//! # Runtime Module
//!
//! Wires the two polling loops to the control thread.
//!
//! ## Architecture
//! - **Connection thread**: ticks every `monitor_interval`, calls
//!   `enumerate()`, sends [`Message::Connection`].
//! - **Encoder thread**: ticks every `encoder_interval`, calls
//!   `read_encoder()`, sends [`Message::Rotation`].
//! - **Control thread**: owns the [`Controller`] and is the single writer of
//!   all state. Operator commands and poll results share one queue.
//! - **Communication**: crossbeam channels only; poll threads never touch
//!   domain state.
//!
//! Each poll thread calls the device synchronously, so at most one call per
//! loop is ever in flight. A `tick` channel holds at most one pending tick,
//! so ticks that fall due while a call is still running are skipped instead
//! of queued.

use anyhow::{Context, Result};
use crossbeam_channel::{bounded, select, tick, unbounded, Receiver, Sender, TryRecvError};
use log::{debug, error, info, warn};
use std::fs;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::config::{Config, RuntimeOptions};
use crate::controller::{Controller, DisplayData, Message};
use crate::device::DeviceInterface;
use crate::encoder::EncoderTracker;
use crate::error::PaddockError;
use crate::monitor;

/// A background thread and the means to stop it.
struct Worker {
    name: &'static str,
    shutdown_tx: Sender<()>,
    thread_handle: Option<JoinHandle<()>>,
}

impl Worker {
    fn stop(&mut self) {
        let _ = self.shutdown_tx.try_send(());
        if let Some(handle) = self.thread_handle.take() {
            if handle.join().is_err() {
                error!("[RUNTIME] {} thread panicked", self.name);
            } else {
                debug!("[RUNTIME] {} thread finished", self.name);
            }
        }
    }
}

/// Cloneable sender for operator commands, usable from any thread.
#[derive(Clone)]
pub struct RuntimeHandle {
    command_tx: Sender<Message>,
}

impl RuntimeHandle {
    pub fn send(&self, message: Message) -> Result<(), PaddockError> {
        self.command_tx
            .send(message)
            .map_err(|_| PaddockError::RuntimeStopped)
    }
}

/// The running control core. Dropping it shuts everything down.
pub struct Runtime {
    command_tx: Sender<Message>,
    snapshot_rx: Receiver<DisplayData>,
    rejection_rx: Receiver<PaddockError>,
    pollers: Vec<Worker>,
    control: Option<Worker>,
}

impl Runtime {
    /// Loads config and profiles from `options.data_dir` and starts all
    /// three threads.
    pub fn start(device: Arc<dyn DeviceInterface>, options: RuntimeOptions) -> Result<Self> {
        fs::create_dir_all(&options.data_dir)
            .with_context(|| format!("creating data directory {}", options.data_dir.display()))?;
        let config = Config::load_or_create(&options.config_path());

        let (command_tx, command_rx) = unbounded::<Message>();
        // Latest-value channel: the control thread evicts a stale snapshot
        // before publishing a new one.
        let (snapshot_tx, snapshot_rx) = bounded::<DisplayData>(1);
        let (rejection_tx, rejection_rx) = unbounded::<PaddockError>();

        let control = spawn_control(
            Arc::clone(&device),
            config,
            options.profiles_path(),
            command_rx,
            snapshot_tx,
            snapshot_rx.clone(),
            rejection_tx,
        )?;

        // From here on an early return drops `runtime`, which stops every
        // worker spawned so far.
        let mut runtime = Self {
            command_tx,
            snapshot_rx,
            rejection_rx,
            pollers: Vec::new(),
            control: Some(control),
        };

        let monitor_device = Arc::clone(&device);
        runtime.add_poller("connection", options.monitor_interval, move || {
            Some(Message::Connection(monitor::poll(monitor_device.as_ref())))
        })?;

        let tracker = EncoderTracker::new(config.encoder_ratio);
        let encoder_device = Arc::clone(&device);
        runtime.add_poller("encoder", options.encoder_interval, move || {
            tracker.poll(encoder_device.as_ref()).map(Message::Rotation)
        })?;

        info!(
            "[RUNTIME] Started (monitor every {:?}, encoder every {:?})",
            options.monitor_interval, options.encoder_interval
        );

        Ok(runtime)
    }

    fn add_poller<F>(&mut self, name: &'static str, interval: Duration, poll: F) -> Result<()>
    where
        F: FnMut() -> Option<Message> + Send + 'static,
    {
        let worker = spawn_poller(name, interval, self.command_tx.clone(), poll)?;
        self.pollers.push(worker);
        Ok(())
    }

    pub fn handle(&self) -> RuntimeHandle {
        RuntimeHandle {
            command_tx: self.command_tx.clone(),
        }
    }

    pub fn send(&self, message: Message) -> Result<(), PaddockError> {
        self.handle().send(message)
    }

    /// Snapshots published after every handled message. Only the newest one
    /// is kept.
    pub fn snapshots(&self) -> &Receiver<DisplayData> {
        &self.snapshot_rx
    }

    /// Operator commands the controller refused.
    pub fn rejections(&self) -> &Receiver<PaddockError> {
        &self.rejection_rx
    }

    /// Stops the poll threads first, then the control thread, joining each.
    /// No device call is issued by a poll thread once this has begun.
    pub fn shutdown(&mut self) {
        if self.control.is_none() {
            return;
        }
        info!("[RUNTIME] Shutting down...");
        for worker in &mut self.pollers {
            worker.stop();
        }
        self.pollers.clear();
        if let Some(mut control) = self.control.take() {
            control.stop();
        }
        info!("[RUNTIME] Shutdown complete");
    }
}

impl Drop for Runtime {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn spawn_control(
    device: Arc<dyn DeviceInterface>,
    config: Config,
    profiles_path: std::path::PathBuf,
    command_rx: Receiver<Message>,
    snapshot_tx: Sender<DisplayData>,
    snapshot_drain: Receiver<DisplayData>,
    rejection_tx: Sender<PaddockError>,
) -> Result<Worker> {
    let (shutdown_tx, shutdown_rx) = bounded::<()>(1);
    let publish = move |data: DisplayData| {
        let _ = snapshot_drain.try_recv();
        let _ = snapshot_tx.try_send(data);
    };

    let thread_handle = thread::Builder::new()
        .name("paddock-control".into())
        .spawn(move || {
            let mut controller = Controller::new(device, config, profiles_path);
            publish(controller.display_data());

            loop {
                select! {
                    recv(command_rx) -> msg => match msg {
                        Ok(message) => {
                            if let Err(e) = controller.update(message) {
                                warn!("[CONTROL] Rejected: {}", e);
                                let _ = rejection_tx.send(e);
                            }
                            publish(controller.display_data());
                        }
                        Err(_) => break,
                    },
                    recv(shutdown_rx) -> _ => break,
                }
            }
            debug!("[CONTROL] Loop exited");
        })
        .context("spawning control thread")?;

    Ok(Worker {
        name: "control",
        shutdown_tx,
        thread_handle: Some(thread_handle),
    })
}

fn spawn_poller<F>(
    name: &'static str,
    interval: Duration,
    command_tx: Sender<Message>,
    mut poll: F,
) -> Result<Worker>
where
    F: FnMut() -> Option<Message> + Send + 'static,
{
    let (shutdown_tx, shutdown_rx) = bounded::<()>(1);

    let thread_handle = thread::Builder::new()
        .name(format!("paddock-{}", name))
        .spawn(move || {
            let ticker = tick(interval);
            loop {
                select! {
                    recv(ticker) -> _ => {
                        // A tick may race the shutdown signal; never poll after it.
                        if !matches!(shutdown_rx.try_recv(), Err(TryRecvError::Empty)) {
                            break;
                        }
                        if let Some(message) = poll() {
                            if command_tx.send(message).is_err() {
                                break;
                            }
                        }
                    },
                    recv(shutdown_rx) -> _ => break,
                }
            }
            debug!("[RUNTIME] {} poller exited", name);
        })
        .with_context(|| format!("spawning {} poller", name))?;

    Ok(Worker {
        name,
        shutdown_tx,
        thread_handle: Some(thread_handle),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockDevice;
    use crate::monitor::ConnectionState;

    #[test]
    fn poller_stops_before_shutdown_returns() {
        let (tx, rx) = unbounded();
        let mut worker = spawn_poller("test", Duration::from_millis(5), tx, || {
            Some(Message::Rotation(1))
        })
        .unwrap();

        assert_eq!(rx.recv_timeout(Duration::from_secs(2)).unwrap(), Message::Rotation(1));
        worker.stop();
        while rx.try_recv().is_ok() {}
        thread::sleep(Duration::from_millis(30));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn runtime_publishes_connection_state() {
        let dir = tempfile::tempdir().unwrap();
        let device = Arc::new(MockDevice::connected("COM3"));
        let options = RuntimeOptions {
            monitor_interval: Duration::from_millis(10),
            encoder_interval: Duration::from_millis(10),
            ..RuntimeOptions::default().with_data_dir(dir.path())
        };
        let mut runtime = Runtime::start(device, options).unwrap();

        let mut connected = false;
        for _ in 0..200 {
            if let Ok(data) = runtime.snapshots().recv_timeout(Duration::from_millis(50)) {
                if data.connection == ConnectionState::Connected("COM3".into()) {
                    connected = true;
                    break;
                }
            }
        }
        runtime.shutdown();
        assert!(connected);
    }

    #[test]
    fn dropping_runtime_stops_every_worker() {
        let dir = tempfile::tempdir().unwrap();
        let device = Arc::new(MockDevice::connected("COM3"));
        let options = RuntimeOptions {
            monitor_interval: Duration::from_millis(5),
            encoder_interval: Duration::from_millis(5),
            ..RuntimeOptions::default().with_data_dir(dir.path())
        };
        let mut runtime = Runtime::start(device.clone(), options).unwrap();
        let extra_device = device.clone();
        runtime
            .add_poller("extra", Duration::from_millis(5), move || {
                Some(Message::Rotation(extra_device.read_encoder().ok()? as i32))
            })
            .unwrap();
        let handle = runtime.handle();
        thread::sleep(Duration::from_millis(30));

        drop(runtime);
        device.clear_calls();
        thread::sleep(Duration::from_millis(40));

        assert!(device.calls().is_empty());
        assert_eq!(handle.send(Message::CenterWheel), Err(PaddockError::RuntimeStopped));
    }
}
