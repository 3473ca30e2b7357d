/*!
Acquisition scheduler.

Two states: [`AcquisitionState::Disabled`] until discovery and configuration
succeed, then [`AcquisitionState::Polling`] for the rest of the pipeline's
life. Each tick runs [`run_cycle`]: read, decode, publish. A failed read
skips the tick and changes nothing.
*/

use crate::bus::BusTransport;
use crate::driver::Mpu6050;
use crate::error::BusError;
use crate::frame::decode;
use crate::state::SharedOrientation;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

/// Scheduler state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AcquisitionState {
    /// Sensor absent, misconfigured, or not initialized yet
    Disabled,
    /// Periodic timer active
    Polling,
}

/// Result of one tick
#[derive(Debug, Clone, PartialEq)]
pub enum CycleOutcome {
    /// Sample published; carries the new success count
    Published { successful_reads: u64 },
    /// Transaction failed; state untouched
    Skipped(BusError),
}

/// Read-decode-publish. Never panics, never propagates bus errors.
pub fn run_cycle<B: BusTransport>(driver: &mut Mpu6050<B>, state: &SharedOrientation) -> CycleOutcome {
    match driver.read_frame() {
        Ok(frame) => {
            let sample = decode(&frame);
            let successful_reads = state.publish(sample);
            CycleOutcome::Published { successful_reads }
        }
        Err(e) => {
            debug!("read cycle skipped: {}", e);
            CycleOutcome::Skipped(e)
        }
    }
}

/// Tick counters shared with the owner of the scheduler
#[derive(Debug, Default)]
pub struct TickStats {
    ticks: AtomicU64,
    skipped: AtomicU64,
}

impl TickStats {
    /// Timer ticks executed so far
    pub fn ticks(&self) -> u64 {
        self.ticks.load(Ordering::Relaxed)
    }

    /// Ticks whose bus transaction failed
    pub fn skipped(&self) -> u64 {
        self.skipped.load(Ordering::Relaxed)
    }
}

/// Poll at a fixed period until `shutdown` flips or its sender goes away
///
/// Late ticks are skipped rather than bunched up, so a slow bus never causes
/// a burst of back-to-back reads.
pub async fn poll_loop<B: BusTransport>(
    driver: &mut Mpu6050<B>,
    state: &SharedOrientation,
    period: Duration,
    stats: Arc<TickStats>,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    info!("⏱️ Polling MPU-6050 every {:?}", period);

    loop {
        tokio::select! {
            _ = interval.tick() => {
                stats.ticks.fetch_add(1, Ordering::Relaxed);
                if let CycleOutcome::Skipped(_) = run_cycle(driver, state) {
                    stats.skipped.fetch_add(1, Ordering::Relaxed);
                }
            }
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
            }
        }
    }

    info!(
        "📊 Polling stopped: {} ticks, {} skipped, {} samples",
        stats.ticks(),
        stats.skipped(),
        state.successful_reads()
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::{OrientationSample, RawFrame};
    use crate::mock::MockBus;
    use crate::protocol::MPU6050_ADDR;

    #[test]
    fn test_failed_cycle_leaves_state_unchanged() {
        let bus = MockBus::new(MPU6050_ADDR);
        let state = SharedOrientation::new();
        let mut driver = Mpu6050::new(bus.clone());

        bus.push_frame(RawFrame::from_accel(8192, 0, 16383));
        bus.push_read_error(BusError::BusBusy);

        assert_eq!(
            run_cycle(&mut driver, &state),
            CycleOutcome::Published { successful_reads: 1 }
        );
        let before = state.snapshot();

        assert_eq!(
            run_cycle(&mut driver, &state),
            CycleOutcome::Skipped(BusError::BusBusy)
        );
        assert_eq!(state.snapshot(), before);
        assert_eq!(state.successful_reads(), 1);
    }

    #[test]
    fn test_five_frames_end_to_end() {
        let bus = MockBus::new(MPU6050_ADDR);
        let state = SharedOrientation::new();
        let mut driver = Mpu6050::new(bus.clone());

        let frames: Vec<RawFrame> = (1..=5)
            .map(|i| RawFrame::from_accel(i * 1000, -i * 500, 16000 - i))
            .collect();
        for frame in &frames {
            bus.push_frame(*frame);
        }
        for _ in 0..5 {
            run_cycle(&mut driver, &state);
        }

        let snap = state.snapshot();
        assert_eq!(snap.successful_reads, 5);
        assert_eq!(snap.sample, decode(&frames[4]));
        assert_ne!(snap.sample, OrientationSample::default());
    }

    #[tokio::test]
    async fn test_poll_loop_stops_on_shutdown() {
        let bus = MockBus::new(MPU6050_ADDR);
        for i in 0..3 {
            bus.push_frame(RawFrame::from_accel(i, i, i));
        }
        let state = SharedOrientation::new();
        let stats = Arc::new(TickStats::default());
        let (tx, rx) = watch::channel(false);
        let mut driver = Mpu6050::new(bus.clone());

        let stopper = async {
            tokio::time::sleep(Duration::from_millis(100)).await;
            tx.send(true).unwrap();
        };
        tokio::join!(
            poll_loop(&mut driver, &state, Duration::from_millis(5), stats.clone(), rx),
            stopper
        );

        assert!(stats.ticks() >= 4);
        assert_eq!(state.successful_reads(), 3);
        assert_eq!(stats.skipped(), stats.ticks() - 3);
    }
}
