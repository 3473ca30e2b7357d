/*!
# Tilt Core

Sensor acquisition and orientation pipeline for an MPU-6050 class two-axis
tilt sensor on an I2C bus.

## Pipeline

Bus transport → device driver → sample decoder → shared orientation state →
render loop. The poll worker and the render loop run on independent
schedules and meet only in [`SharedOrientation`].

## Core Types

- [`BusTransport`] / [`BusEnumerator`] - raw bus access and discovery
- [`Mpu6050`] - discovery, configuration and frame reads
- [`RawFrame`] / [`OrientationSample`] - wire frame and decoded sample
- [`SharedOrientation`] - latest sample plus success counter
- [`AcquisitionHandle`] - background discovery and periodic polling
- [`RotationTransform`] - per-frame model rotation

## Modules

- [`bus`] - transport traits and the `embedded-hal` adapter
- [`driver`] - MPU-6050 configuration and reads
- [`frame`] - frame layout and decoding
- [`state`] - shared orientation state
- [`scheduler`] - tick body and polling loop
- [`acquisition`] - worker lifecycle
- [`consumer`] - render-side rotation and diagnostics
- [`sim`] - simulated sensor
- [`mock`] - scripted bus for tests
*/

pub mod acquisition;
pub mod bus;
pub mod consumer;
pub mod driver;
pub mod error;
pub mod frame;
pub mod mock;
pub mod scheduler;
pub mod sim;
pub mod state;

// Re-export commonly used types
pub use acquisition::{AcquisitionConfig, AcquisitionEvent, AcquisitionHandle};
pub use bus::{BusDeviceInfo, BusEnumerator, BusTransport, HalBus};
pub use consumer::{Diagnostics, ReadRate, RotationTransform};
pub use driver::{DynMpu6050, Mpu6050};
pub use error::{BusError, Result, TiltError};
pub use frame::{decode, OrientationSample, RawFrame};
pub use scheduler::{run_cycle, AcquisitionState, CycleOutcome};
pub use sim::{SimOptions, SimulatedEnumerator};
pub use state::{OrientationState, SharedOrientation};

/// Version information for the library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// MPU-6050 register map and protocol constants
pub mod protocol {
    use std::time::Duration;

    /// I2C address with AD0 low
    pub const MPU6050_ADDR: u8 = 0x68;

    /// Configuration: digital low-pass filter
    pub const CONFIG: u8 = 0x1A;

    /// Accelerometer full-scale range
    pub const ACCEL_CONFIG: u8 = 0x1C;

    /// First accelerometer data register; a 14-byte burst covers accel, temp, gyro
    pub const ACCEL_XOUT_H: u8 = 0x3B;

    /// Power management 1: reset, sleep, clock source
    pub const PWR_MGMT_1: u8 = 0x6B;

    /// Identity register
    pub const WHO_AM_I: u8 = 0x75;

    pub const PWR_MGMT_1_DEVICE_RESET: u8 = 0x80;
    pub const PWR_MGMT_1_SLEEP: u8 = 0x40;
    /// Awake, PLL with Y gyro reference
    pub const PWR_MGMT_1_CLKSEL_PLL_Y: u8 = 0x02;

    /// DLPF_CFG = 4: accelerometer bandwidth ~21 Hz
    pub const DLPF_21HZ: u8 = 0x04;

    /// AFS_SEL = 0: ±2g
    pub const ACCEL_RANGE_2G: u8 = 0x00;

    /// Bytes in one data burst
    pub const FRAME_LEN: usize = 14;

    /// Full-scale signed count
    pub const ACCEL_RES: f32 = 32767.0;

    /// Configured range in g
    pub const ACCEL_RANGE_G: f32 = 2.0;

    /// Counts per g at ±2g, exact (not integer-truncated)
    pub const UNITS_PER_G: f32 = ACCEL_RES / ACCEL_RANGE_G;

    /// Minimum wait after a device reset
    pub const RESET_SETTLE: Duration = Duration::from_millis(100);

    /// Nominal poll period (25 Hz)
    pub const DEFAULT_POLL_PERIOD: Duration = Duration::from_millis(40);

    /// Linux I2C character device prefix
    pub const DEFAULT_BUS_SELECTOR: &str = "/dev/i2c-";
}
