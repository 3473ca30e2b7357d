/*!
Acquisition lifecycle.

[`AcquisitionHandle::spawn`] returns at once. A dedicated worker thread
hosts a single-threaded tokio runtime that runs discovery, configuration and
then the polling loop, so neither slow bus I/O nor the reset settle delay
can ever hold up the caller (typically the render thread).

The handle can be shut down and a new one spawned against the same
[`SharedOrientation`], which is how a host recreating its rendering context
restarts acquisition.
*/

use crate::bus::BusEnumerator;
use crate::driver::DynMpu6050;
use crate::error::{Result, TiltError};
use crate::protocol::{DEFAULT_BUS_SELECTOR, DEFAULT_POLL_PERIOD, MPU6050_ADDR};
use crate::scheduler::{poll_loop, AcquisitionState, TickStats};
use crate::state::SharedOrientation;
use crossbeam_channel::{unbounded, Receiver, Sender};
use parking_lot::Mutex;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tokio::runtime::Builder;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

/// Where to look for the sensor and how often to read it
#[derive(Debug, Clone, PartialEq)]
pub struct AcquisitionConfig {
    /// Bus selector passed to the enumerator
    pub selector: String,
    /// 7-bit device address
    pub address: u8,
    /// Poll period
    pub period: Duration,
}

impl Default for AcquisitionConfig {
    fn default() -> Self {
        Self {
            selector: DEFAULT_BUS_SELECTOR.to_string(),
            address: MPU6050_ADDR,
            period: DEFAULT_POLL_PERIOD,
        }
    }
}

impl AcquisitionConfig {
    pub fn validate(&self) -> Result<()> {
        if self.address > 0x7F {
            return Err(TiltError::config(format!(
                "device address {:#04x} is not a 7-bit address",
                self.address
            )));
        }
        if self.period.is_zero() {
            return Err(TiltError::config("poll period must be non-zero"));
        }
        Ok(())
    }
}

/// Lifecycle notifications for the host application
#[derive(Debug, Clone, PartialEq)]
pub enum AcquisitionEvent {
    /// Sensor configured, polling started
    SensorReady { address: u8 },
    /// Discovery or configuration failed; acquisition stays disabled
    SensorUnavailable(String),
    /// Worker exited
    Stopped { successful_reads: u64 },
}

#[derive(Debug)]
struct Status {
    state: AcquisitionState,
    startup_error: Option<String>,
}

/// Owner of a running acquisition worker
pub struct AcquisitionHandle {
    status: Arc<Mutex<Status>>,
    stats: Arc<TickStats>,
    state: SharedOrientation,
    events: Receiver<AcquisitionEvent>,
    shutdown_tx: watch::Sender<bool>,
    worker: Option<JoinHandle<()>>,
}

impl AcquisitionHandle {
    /// Start discovery in the background and return immediately
    pub fn spawn<E>(enumerator: E, config: AcquisitionConfig, state: SharedOrientation) -> Result<Self>
    where
        E: BusEnumerator + 'static,
    {
        config.validate()?;

        let status = Arc::new(Mutex::new(Status {
            state: AcquisitionState::Disabled,
            startup_error: None,
        }));
        let stats = Arc::new(TickStats::default());
        let (events_tx, events_rx) = unbounded();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let worker = {
            let status = Arc::clone(&status);
            let stats = Arc::clone(&stats);
            let state = state.clone();
            thread::Builder::new()
                .name("tilt-acquisition".to_string())
                .spawn(move || {
                    let rt = match Builder::new_current_thread().enable_time().build() {
                        Ok(rt) => rt,
                        Err(e) => {
                            error!("Failed to start acquisition runtime: {}", e);
                            let reason = TiltError::runtime(e.to_string()).to_string();
                            status.lock().startup_error = Some(reason.clone());
                            let _ = events_tx.send(AcquisitionEvent::SensorUnavailable(reason));
                            return;
                        }
                    };
                    rt.block_on(run_worker(
                        enumerator,
                        config,
                        state,
                        status,
                        stats,
                        events_tx,
                        shutdown_rx,
                    ));
                })
                .map_err(|e| TiltError::runtime(format!("failed to spawn acquisition thread: {e}")))?
        };

        Ok(Self {
            status,
            stats,
            state,
            events: events_rx,
            shutdown_tx,
            worker: Some(worker),
        })
    }

    pub fn state(&self) -> AcquisitionState {
        self.status.lock().state
    }

    /// True once the sensor is configured and being polled
    pub fn is_sensor_available(&self) -> bool {
        self.state() == AcquisitionState::Polling
    }

    /// Why discovery or configuration failed, if it did
    pub fn startup_error(&self) -> Option<String> {
        self.status.lock().startup_error.clone()
    }

    /// Lifecycle events, in order
    pub fn events(&self) -> &Receiver<AcquisitionEvent> {
        &self.events
    }

    /// Timer ticks executed (zero if polling never started)
    pub fn ticks(&self) -> u64 {
        self.stats.ticks()
    }

    /// Ticks dropped because the bus transaction failed
    pub fn skipped_reads(&self) -> u64 {
        self.stats.skipped()
    }

    /// The state this worker publishes into
    pub fn orientation(&self) -> &SharedOrientation {
        &self.state
    }

    /// Stop polling and join the worker. Safe to call more than once.
    pub fn shutdown(&mut self) {
        let Some(worker) = self.worker.take() else {
            return;
        };
        let _ = self.shutdown_tx.send(true);
        if worker.join().is_err() {
            error!("Acquisition worker panicked");
        }
        info!("🛑 Acquisition shut down");
    }

    /// Signal the worker to stop and return without waiting for it
    ///
    /// A bus transaction already in flight finishes on the worker thread;
    /// a detached reaper joins it afterwards. Events keep arriving on
    /// [`events`](Self::events) until the worker exits.
    pub fn stop(&mut self) {
        let Some(worker) = self.worker.take() else {
            return;
        };
        let _ = self.shutdown_tx.send(true);
        let reaper = thread::Builder::new()
            .name("tilt-acquisition-reaper".to_string())
            .spawn(move || {
                if worker.join().is_err() {
                    error!("Acquisition worker panicked");
                }
                debug!("Acquisition worker joined");
            });
        if let Err(e) = reaper {
            warn!("Could not spawn reaper, detaching acquisition worker: {}", e);
        }
        info!("🛑 Acquisition stopping");
    }
}

impl Drop for AcquisitionHandle {
    fn drop(&mut self) {
        self.shutdown();
    }
}

async fn run_worker<E: BusEnumerator>(
    enumerator: E,
    config: AcquisitionConfig,
    state: SharedOrientation,
    status: Arc<Mutex<Status>>,
    stats: Arc<TickStats>,
    events: Sender<AcquisitionEvent>,
    mut shutdown: watch::Receiver<bool>,
) {
    let discovered = tokio::select! {
        result = DynMpu6050::discover(&enumerator, &config.selector, config.address) => result,
        _ = shutdown.changed() => {
            info!("Acquisition stopped during startup");
            let _ = events.send(AcquisitionEvent::Stopped { successful_reads: state.successful_reads() });
            return;
        }
    };

    let mut driver = match discovered {
        Ok(driver) => driver,
        Err(e) => {
            // one-shot: no timer, no retry
            warn!("⚠️ Tilt sensor unavailable, acquisition disabled: {}", e);
            status.lock().startup_error = Some(e.to_string());
            let _ = events.send(AcquisitionEvent::SensorUnavailable(e.to_string()));
            let _ = events.send(AcquisitionEvent::Stopped {
                successful_reads: state.successful_reads(),
            });
            return;
        }
    };

    status.lock().state = AcquisitionState::Polling;
    let _ = events.send(AcquisitionEvent::SensorReady {
        address: driver.address(),
    });

    poll_loop(&mut driver, &state, config.period, stats, shutdown).await;

    drop(driver.release());
    let _ = events.send(AcquisitionEvent::Stopped {
        successful_reads: state.successful_reads(),
    });
}
