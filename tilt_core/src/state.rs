/*!
Shared orientation state.

[`SharedOrientation`] is the only synchronization point between the poll
worker (writer) and the render loop (reader). The sample and the success
counter are published together under one short lock; no bus I/O ever runs
while the lock is held.
*/

use crate::frame::OrientationSample;
use parking_lot::Mutex;
use std::sync::Arc;

/// Latest sample plus the number of successful reads so far
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct OrientationState {
    pub sample: OrientationSample,
    pub successful_reads: u64,
}

/// Cloneable handle to the shared state
#[derive(Debug, Clone, Default)]
pub struct SharedOrientation {
    inner: Arc<Mutex<OrientationState>>,
}

impl SharedOrientation {
    /// Create a zeroed state
    pub fn new() -> Self {
        Self::default()
    }

    /// Publish a fully decoded sample and count the read
    pub fn publish(&self, sample: OrientationSample) -> u64 {
        let mut state = self.inner.lock();
        state.sample = sample;
        state.successful_reads += 1;
        state.successful_reads
    }

    /// Copy of the whole record
    pub fn snapshot(&self) -> OrientationState {
        *self.inner.lock()
    }

    pub fn latest(&self) -> OrientationSample {
        self.inner.lock().sample
    }

    pub fn successful_reads(&self) -> u64 {
        self.inner.lock().successful_reads
    }

    /// Back to the zero sample and zero count
    pub fn reset(&self) {
        *self.inner.lock() = OrientationState::default();
    }
}
