/*!
MPU-6050 device driver.

Finds the sensor on the bus, runs the configuration register sequence once,
then reads 14-byte frames from the accelerometer data register on demand.
*/

use crate::bus::{BusEnumerator, BusTransport};
use crate::error::{BusError, Result, TiltError};
use crate::frame::RawFrame;
use crate::protocol::{
    ACCEL_CONFIG, ACCEL_RANGE_2G, ACCEL_XOUT_H, CONFIG, DLPF_21HZ, FRAME_LEN, PWR_MGMT_1,
    PWR_MGMT_1_CLKSEL_PLL_Y, PWR_MGMT_1_DEVICE_RESET, RESET_SETTLE,
};
use std::time::Duration;
use tracing::{debug, info, trace, warn};

/// One step of the configuration sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigStep {
    /// Two-byte write `[register, value]`
    Write { register: u8, value: u8 },
    /// Device is unresponsive for at least this long
    Settle(Duration),
}

/// Reset, settle, wake on PLL clock, 21 Hz low-pass, ±2g
pub const CONFIG_SEQUENCE: [ConfigStep; 5] = [
    ConfigStep::Write {
        register: PWR_MGMT_1,
        value: PWR_MGMT_1_DEVICE_RESET,
    },
    ConfigStep::Settle(RESET_SETTLE),
    ConfigStep::Write {
        register: PWR_MGMT_1,
        value: PWR_MGMT_1_CLKSEL_PLL_Y,
    },
    ConfigStep::Write {
        register: CONFIG,
        value: DLPF_21HZ,
    },
    ConfigStep::Write {
        register: ACCEL_CONFIG,
        value: ACCEL_RANGE_2G,
    },
];

/// Driver over a transport chosen at runtime
pub type DynMpu6050 = Mpu6050<Box<dyn BusTransport>>;

/// Driver owning the open bus connection to the sensor
pub struct Mpu6050<B> {
    bus: B,
    configured: bool,
}

impl<B: BusTransport> Mpu6050<B> {
    /// Wrap an already opened transport (unconfigured)
    pub fn new(bus: B) -> Self {
        Self {
            bus,
            configured: false,
        }
    }

    pub fn address(&self) -> u8 {
        self.bus.address()
    }

    pub fn is_configured(&self) -> bool {
        self.configured
    }

    /// Release the bus connection
    pub fn release(self) -> B {
        self.bus
    }

    /// Run [`CONFIG_SEQUENCE`] in order, stopping at the first failed write
    pub async fn configure(&mut self) -> Result<()> {
        for (index, step) in CONFIG_SEQUENCE.iter().enumerate() {
            let step_no = index + 1;
            match *step {
                ConfigStep::Write { register, value } => {
                    self.bus.write(&[register, value]).map_err(|source| {
                        warn!(
                            "⚠️ MPU-6050 config step {} failed ({:#04x} <- {:#04x}): {}",
                            step_no, register, value, source
                        );
                        TiltError::ConfigurationFailed {
                            step: step_no,
                            register,
                            value,
                            source,
                        }
                    })?;
                    debug!("config step {}: {:#04x} <- {:#04x}", step_no, register, value);
                }
                ConfigStep::Settle(delay) => {
                    debug!("config step {}: settling for {:?}", step_no, delay);
                    tokio::time::sleep(delay).await;
                }
            }
        }

        self.configured = true;
        info!("✅ MPU-6050 configured at {:#04x} (±2g, DLPF 21 Hz)", self.address());
        Ok(())
    }

    /// One burst read of the data registers
    pub fn read_frame(&mut self) -> std::result::Result<RawFrame, BusError> {
        let data = self.bus.write_then_read(&[ACCEL_XOUT_H], FRAME_LEN)?;
        let frame = RawFrame::from_slice(&data)?;
        trace!("raw frame {}", hex::encode(frame.as_bytes()));
        Ok(frame)
    }
}

impl DynMpu6050 {
    /// Enumerate buses, open the first match at `address` and configure it
    ///
    /// One-shot: no retries. Zero buses yields `SensorNotFound`; any failed
    /// write yields `ConfigurationFailed` and the transport is dropped.
    pub async fn discover(
        enumerator: &dyn BusEnumerator,
        selector: &str,
        address: u8,
    ) -> Result<Self> {
        let devices = enumerator.find_all(selector)?;
        let Some(device) = devices.first() else {
            warn!("🔍 No bus matched selector '{}'", selector);
            return Err(TiltError::not_found(selector));
        };
        info!(
            "🔍 Found {} bus(es), using {} ({})",
            devices.len(),
            device.id,
            device.name
        );

        let transport = enumerator.open(device, address)?;
        let mut driver = Self::new(transport);
        driver.configure().await?;
        Ok(driver)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::decode;
    use crate::mock::{BusTransaction, MockBus, MockEnumerator};
    use crate::protocol::MPU6050_ADDR;

    fn write(data: &[u8]) -> BusTransaction {
        BusTransaction::Write {
            addr: MPU6050_ADDR,
            data: data.to_vec(),
        }
    }

    #[tokio::test]
    async fn test_configuration_sequence_order() {
        let bus = MockBus::new(MPU6050_ADDR);
        let mut driver = Mpu6050::new(bus.clone());
        driver.configure().await.unwrap();
        assert!(driver.is_configured());

        assert_eq!(
            bus.transactions(),
            vec![
                write(&[0x6B, 0x80]),
                write(&[0x6B, 0x02]),
                write(&[0x1A, 0x04]),
                write(&[0x1C, 0x00]),
            ]
        );
    }

    #[tokio::test]
    async fn test_reset_settle_delay() {
        let bus = MockBus::new(MPU6050_ADDR);
        let mut driver = Mpu6050::new(bus.clone());
        driver.configure().await.unwrap();

        let timed = bus.timed_transactions();
        let gap = timed[1].0.duration_since(timed[0].0);
        assert!(gap >= Duration::from_millis(100), "settle was {:?}", gap);
    }

    #[tokio::test]
    async fn test_failed_write_stops_sequence() {
        let bus = MockBus::new(MPU6050_ADDR);
        bus.fail_write_at(2, BusError::NotResponding { address: MPU6050_ADDR });
        let mut driver = Mpu6050::new(bus.clone());

        let err = driver.configure().await.unwrap_err();
        match err {
            TiltError::ConfigurationFailed {
                step,
                register,
                value,
                ..
            } => {
                assert_eq!(step, 4);
                assert_eq!(register, 0x1A);
                assert_eq!(value, 0x04);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(!driver.is_configured());
        // the range write never happened
        assert_eq!(bus.transactions().len(), 3);
    }

    #[test]
    fn test_read_frame_transaction() {
        let bus = MockBus::new(MPU6050_ADDR);
        let frame = RawFrame::from_accel(1000, -2000, 16383);
        bus.push_frame(frame);

        let mut driver = Mpu6050::new(bus.clone());
        let read = driver.read_frame().unwrap();
        assert_eq!(read, frame);
        assert_eq!(decode(&read), decode(&frame));
        assert_eq!(
            bus.transactions(),
            vec![BusTransaction::WriteRead {
                addr: MPU6050_ADDR,
                write_data: vec![0x3B],
                read_len: 14,
            }]
        );
    }

    #[test]
    fn test_read_frame_short_read() {
        let bus = MockBus::new(MPU6050_ADDR);
        bus.push_read_bytes(&[0u8; 8]);
        let mut driver = Mpu6050::new(bus);
        assert_eq!(
            driver.read_frame(),
            Err(BusError::ShortRead {
                expected: 14,
                actual: 8
            })
        );
    }

    #[tokio::test]
    async fn test_discover_without_devices() {
        let enumerator = MockEnumerator::empty();
        let result = DynMpu6050::discover(&enumerator, "/dev/i2c-", MPU6050_ADDR).await;
        assert!(matches!(result, Err(TiltError::SensorNotFound { .. })));
        assert_eq!(enumerator.open_count(), 0);
    }

    #[tokio::test]
    async fn test_discover_configures_first_device() {
        let bus = MockBus::new(0);
        let enumerator = MockEnumerator::with_bus(bus.clone());
        let driver = DynMpu6050::discover(&enumerator, "/dev/i2c-", MPU6050_ADDR)
            .await
            .unwrap();
        assert!(driver.is_configured());
        assert_eq!(driver.address(), MPU6050_ADDR);
        assert_eq!(bus.transactions().len(), 4);
    }
}
