/*!
Render-side helpers.

The render loop calls [`RotationTransform::from_sample`] once per frame on
the latest sample. The mapping is a small-angle shortcut: roll is the Y
acceleration, pitch is the negated X acceleration, yaw is always zero and Z
is not used.
*/

use crate::frame::OrientationSample;
use crate::state::OrientationState;
use glam::{EulerRot, Mat4, Quat};
use serde::Serialize;
use std::time::{Duration, Instant};

/// Per-frame rotation of the model
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct RotationTransform {
    pub roll: f32,
    pub pitch: f32,
    pub yaw: f32,
}

impl RotationTransform {
    pub fn from_sample(sample: &OrientationSample) -> Self {
        Self {
            roll: sample.accel_y,
            pitch: -sample.accel_x,
            yaw: 0.0,
        }
    }

    /// Yaw-pitch-roll rotation: roll about Z, then pitch about X, then yaw about Y
    pub fn quat(&self) -> Quat {
        Quat::from_euler(EulerRot::YXZ, self.yaw, self.pitch, self.roll)
    }

    /// World matrix for the model
    pub fn matrix(&self) -> Mat4 {
        Mat4::from_quat(self.quat())
    }
}

/// Successful reads per second of wall time since `start`
#[derive(Debug, Clone, Copy)]
pub struct ReadRate {
    start: Instant,
}

impl ReadRate {
    pub fn new(start: Instant) -> Self {
        Self { start }
    }

    pub fn started_now() -> Self {
        Self::new(Instant::now())
    }

    pub fn elapsed(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.start)
    }

    /// `successful_reads / elapsed_seconds`, zero before any time has passed
    pub fn per_second(&self, successful_reads: u64, now: Instant) -> f32 {
        let secs = self.elapsed(now).as_secs_f32();
        if secs <= 0.0 {
            return 0.0;
        }
        successful_reads as f32 / secs
    }
}

/// Values the host shows in its debug overlay
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Diagnostics {
    pub roll: f32,
    pub pitch: f32,
    pub reads_per_second: f32,
    pub successful_reads: u64,
}

impl Diagnostics {
    pub fn collect(state: &OrientationState, rate: &ReadRate, now: Instant) -> Self {
        let rotation = RotationTransform::from_sample(&state.sample);
        Self {
            roll: rotation.roll,
            pitch: rotation.pitch,
            reads_per_second: rate.per_second(state.successful_reads, now),
            successful_reads: state.successful_reads,
        }
    }
}
