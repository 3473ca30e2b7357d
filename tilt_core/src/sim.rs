/*!
Simulated MPU-6050.

Emulates enough of the register map to run the whole pipeline without
hardware: a device reset makes the chip deaf for 100 ms, a sleeping chip
returns zeros, and the data registers hold a gravity vector for a slowly
rocking board. Faults can be injected every N reads.
*/

use crate::bus::{BusDeviceInfo, BusEnumerator, BusTransport};
use crate::error::BusError;
use crate::frame::{RawComponents, RawFrame};
use crate::protocol::{
    ACCEL_CONFIG, ACCEL_XOUT_H, FRAME_LEN, MPU6050_ADDR, PWR_MGMT_1, PWR_MGMT_1_DEVICE_RESET,
    PWR_MGMT_1_SLEEP, RESET_SETTLE, UNITS_PER_G, WHO_AM_I,
};
use std::f32::consts::TAU;
use std::time::{Duration, Instant};
use tracing::debug;

const REGISTER_COUNT: usize = 128;

/// Temperature register value for ~25 °C (T = raw / 340 + 36.53)
const TEMP_RAW_25C: i16 = -3920;

/// Knobs for the simulated device
#[derive(Debug, Clone, PartialEq)]
pub struct SimOptions {
    /// Fail every N-th read with `TransferAborted`
    pub fault_every: Option<u32>,
    /// Period of the roll oscillation
    pub motion_period: Duration,
    /// Peak roll and pitch, radians
    pub amplitude: f32,
}

impl Default for SimOptions {
    fn default() -> Self {
        Self {
            fault_every: None,
            motion_period: Duration::from_secs(6),
            amplitude: 0.5,
        }
    }
}

/// Register-level model of the sensor behind one transport
#[derive(Debug)]
pub struct SimulatedMpu6050 {
    /// Address the transport was opened for
    target: u8,
    registers: [u8; REGISTER_COUNT],
    deaf_until: Option<Instant>,
    epoch: Instant,
    reads: u64,
    options: SimOptions,
}

impl SimulatedMpu6050 {
    pub fn new(target: u8, options: SimOptions) -> Self {
        let mut sim = Self {
            target,
            registers: [0; REGISTER_COUNT],
            deaf_until: None,
            epoch: Instant::now(),
            reads: 0,
            options,
        };
        sim.power_on_defaults();
        sim
    }

    fn power_on_defaults(&mut self) {
        self.registers = [0; REGISTER_COUNT];
        self.registers[PWR_MGMT_1 as usize] = PWR_MGMT_1_SLEEP;
        self.registers[WHO_AM_I as usize] = MPU6050_ADDR;
    }

    pub fn register(&self, reg: u8) -> u8 {
        self.registers[reg as usize % REGISTER_COUNT]
    }

    pub fn is_sleeping(&self) -> bool {
        self.register(PWR_MGMT_1) & PWR_MGMT_1_SLEEP != 0
    }

    /// Counts per g for the configured full-scale range
    fn units_per_g(&self) -> f32 {
        let fs_sel = (self.register(ACCEL_CONFIG) >> 3) & 0x03;
        UNITS_PER_G / f32::from(1u8 << fs_sel)
    }

    /// Board attitude at `t` as (roll, pitch) in radians
    pub fn attitude_at(&self, t: Duration) -> (f32, f32) {
        let period = self.options.motion_period.as_secs_f32().max(0.1);
        let phase = TAU * t.as_secs_f32() / period;
        let roll = self.options.amplitude * phase.sin();
        let pitch = 0.7 * self.options.amplitude * (phase / 1.7).sin();
        (roll, pitch)
    }

    /// Data frame the chip would latch at `t`
    pub fn frame_at(&self, t: Duration) -> RawFrame {
        if self.is_sleeping() {
            return RawFrame::new([0; FRAME_LEN]);
        }
        let (roll, pitch) = self.attitude_at(t);
        let gravity = [
            -pitch.sin(),
            roll.sin() * pitch.cos(),
            roll.cos() * pitch.cos(),
        ];
        let scale = self.units_per_g();
        let counts = |g: f32| (g * scale).round().clamp(i16::MIN as f32, i16::MAX as f32) as i16;
        RawFrame::from_components(&RawComponents {
            accel: [counts(gravity[0]), counts(gravity[1]), counts(gravity[2])],
            temperature: TEMP_RAW_25C,
            gyro: [0, 0, 0],
        })
    }

    fn check_responding(&mut self) -> Result<(), BusError> {
        if self.target != MPU6050_ADDR {
            return Err(BusError::NotResponding {
                address: self.target,
            });
        }
        if let Some(until) = self.deaf_until {
            if Instant::now() < until {
                return Err(BusError::NotResponding {
                    address: self.target,
                });
            }
            self.deaf_until = None;
        }
        Ok(())
    }
}

impl BusTransport for SimulatedMpu6050 {
    fn address(&self) -> u8 {
        self.target
    }

    fn write(&mut self, bytes: &[u8]) -> Result<(), BusError> {
        self.check_responding()?;
        let (&reg, values) = bytes
            .split_first()
            .ok_or_else(|| BusError::aborted("empty write"))?;

        if reg == PWR_MGMT_1 && values.first().is_some_and(|v| v & PWR_MGMT_1_DEVICE_RESET != 0) {
            debug!("sim: device reset");
            self.power_on_defaults();
            self.deaf_until = Some(Instant::now() + RESET_SETTLE);
            return Ok(());
        }

        for (offset, value) in values.iter().enumerate() {
            let index = (reg as usize + offset) % REGISTER_COUNT;
            self.registers[index] = *value;
        }
        Ok(())
    }

    fn write_then_read(&mut self, write_bytes: &[u8], read_len: usize) -> Result<Vec<u8>, BusError> {
        self.check_responding()?;
        let reg = *write_bytes
            .first()
            .ok_or_else(|| BusError::aborted("missing register address"))?;

        self.reads += 1;
        if let Some(n) = self.options.fault_every.filter(|n| *n > 0) {
            if self.reads % u64::from(n) == 0 {
                return Err(BusError::aborted("injected fault"));
            }
        }

        let frame = self.frame_at(self.epoch.elapsed());
        let start = ACCEL_XOUT_H as usize;
        self.registers[start..start + FRAME_LEN].copy_from_slice(frame.as_bytes());

        Ok((0..read_len)
            .map(|i| self.registers[(reg as usize + i) % REGISTER_COUNT])
            .collect())
    }
}

/// Enumerator exposing one simulated bus (or none)
#[derive(Debug, Clone)]
pub struct SimulatedEnumerator {
    present: bool,
    options: SimOptions,
}

impl SimulatedEnumerator {
    pub fn new(options: SimOptions) -> Self {
        Self {
            present: true,
            options,
        }
    }

    /// A bus with no sensor attached
    pub fn absent() -> Self {
        Self {
            present: false,
            options: SimOptions::default(),
        }
    }
}

impl BusEnumerator for SimulatedEnumerator {
    fn find_all(&self, _selector: &str) -> Result<Vec<BusDeviceInfo>, BusError> {
        if !self.present {
            return Ok(Vec::new());
        }
        Ok(vec![BusDeviceInfo::new("sim-i2c-0", "Simulated I2C bus")])
    }

    fn open(&self, _device: &BusDeviceInfo, address: u8) -> Result<Box<dyn BusTransport>, BusError> {
        Ok(Box::new(SimulatedMpu6050::new(address, self.options.clone())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::decode;
    use crate::protocol::{ACCEL_RANGE_2G, PWR_MGMT_1_CLKSEL_PLL_Y};

    fn awake_sim(options: SimOptions) -> SimulatedMpu6050 {
        let mut sim = SimulatedMpu6050::new(MPU6050_ADDR, options);
        sim.write(&[PWR_MGMT_1, PWR_MGMT_1_CLKSEL_PLL_Y]).unwrap();
        sim.write(&[ACCEL_CONFIG, ACCEL_RANGE_2G]).unwrap();
        sim
    }

    #[test]
    fn test_reset_makes_device_deaf() {
        let mut sim = SimulatedMpu6050::new(MPU6050_ADDR, SimOptions::default());
        sim.write(&[PWR_MGMT_1, PWR_MGMT_1_DEVICE_RESET]).unwrap();
        assert_eq!(
            sim.write(&[PWR_MGMT_1, PWR_MGMT_1_CLKSEL_PLL_Y]),
            Err(BusError::NotResponding { address: MPU6050_ADDR })
        );
        std::thread::sleep(RESET_SETTLE + Duration::from_millis(5));
        assert!(sim.write(&[PWR_MGMT_1, PWR_MGMT_1_CLKSEL_PLL_Y]).is_ok());
        assert!(!sim.is_sleeping());
    }

    #[test]
    fn test_sleeping_device_reads_zero() {
        let mut sim = SimulatedMpu6050::new(MPU6050_ADDR, SimOptions::default());
        assert!(sim.is_sleeping());
        let data = sim.write_then_read(&[ACCEL_XOUT_H], FRAME_LEN).unwrap();
        assert_eq!(data, vec![0u8; FRAME_LEN]);
    }

    #[test]
    fn test_level_board_reads_one_g_on_z() {
        let sim = awake_sim(SimOptions::default());
        let sample = decode(&sim.frame_at(Duration::ZERO));
        assert!(sample.accel_x.abs() < 1e-3);
        assert!(sample.accel_y.abs() < 1e-3);
        assert!((sample.accel_z - 1.0).abs() < 1e-3);
    }

    #[test]
    fn test_small_tilt_matches_angle_mapping() {
        let sim = awake_sim(SimOptions::default());
        let t = Duration::from_millis(700);
        let (roll, pitch) = sim.attitude_at(t);
        let sample = decode(&sim.frame_at(t));
        // roll ~ accel_y, pitch ~ -accel_x for small angles
        assert!((sample.accel_y - roll.sin() * pitch.cos()).abs() < 1e-3);
        assert!((-sample.accel_x - pitch.sin()).abs() < 1e-3);
    }

    #[test]
    fn test_fault_injection() {
        let mut sim = awake_sim(SimOptions {
            fault_every: Some(3),
            ..Default::default()
        });
        assert!(sim.write_then_read(&[ACCEL_XOUT_H], FRAME_LEN).is_ok());
        assert!(sim.write_then_read(&[ACCEL_XOUT_H], FRAME_LEN).is_ok());
        assert!(matches!(
            sim.write_then_read(&[ACCEL_XOUT_H], FRAME_LEN),
            Err(BusError::TransferAborted(_))
        ));
        assert!(sim.write_then_read(&[ACCEL_XOUT_H], FRAME_LEN).is_ok());
    }

    #[test]
    fn test_wrong_address_never_acks() {
        let mut sim = SimulatedMpu6050::new(0x69, SimOptions::default());
        assert_eq!(
            sim.write(&[PWR_MGMT_1, PWR_MGMT_1_DEVICE_RESET]),
            Err(BusError::NotResponding { address: 0x69 })
        );
    }

    #[test]
    fn test_who_am_i() {
        let mut sim = SimulatedMpu6050::new(MPU6050_ADDR, SimOptions::default());
        assert_eq!(sim.write_then_read(&[WHO_AM_I], 1).unwrap(), vec![MPU6050_ADDR]);
    }

    #[test]
    fn test_absent_enumerator() {
        assert!(SimulatedEnumerator::absent().find_all("").unwrap().is_empty());
        assert_eq!(
            SimulatedEnumerator::new(SimOptions::default())
                .find_all("")
                .unwrap()
                .len(),
            1
        );
    }
}
