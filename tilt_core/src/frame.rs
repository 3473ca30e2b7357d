/*!
Raw sensor frames and the sample decoder.

A [`RawFrame`] is the 14-byte block read from the accelerometer data
registers in one transaction. [`decode`] turns it into a normalized
[`OrientationSample`].
*/

use crate::error::BusError;
use crate::protocol::{FRAME_LEN, UNITS_PER_G};
use serde::{Deserialize, Serialize};

/// One burst read starting at the accelerometer data register
///
/// Layout (big-endian i16 pairs): accel X/Y/Z, temperature, gyro X/Y/Z.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawFrame {
    bytes: [u8; FRAME_LEN],
}

/// Every field of a frame reassembled into signed 16-bit counts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RawComponents {
    pub accel: [i16; 3],
    pub temperature: i16,
    pub gyro: [i16; 3],
}

impl RawFrame {
    /// Wrap a complete frame
    pub fn new(bytes: [u8; FRAME_LEN]) -> Self {
        Self { bytes }
    }

    /// Build a frame from a read buffer, rejecting short reads
    pub fn from_slice(data: &[u8]) -> Result<Self, BusError> {
        let bytes: [u8; FRAME_LEN] = data.try_into().map_err(|_| BusError::ShortRead {
            expected: FRAME_LEN,
            actual: data.len(),
        })?;
        Ok(Self { bytes })
    }

    /// Pack raw counts back into register order
    pub fn from_components(components: &RawComponents) -> Self {
        let mut bytes = [0u8; FRAME_LEN];
        let words = [
            components.accel[0],
            components.accel[1],
            components.accel[2],
            components.temperature,
            components.gyro[0],
            components.gyro[1],
            components.gyro[2],
        ];
        for (chunk, word) in bytes.chunks_exact_mut(2).zip(words) {
            chunk.copy_from_slice(&word.to_be_bytes());
        }
        Self { bytes }
    }

    /// Frame carrying only an acceleration triple (temperature and gyro zero)
    pub fn from_accel(x: i16, y: i16, z: i16) -> Self {
        Self::from_components(&RawComponents {
            accel: [x, y, z],
            ..Default::default()
        })
    }

    pub fn as_bytes(&self) -> &[u8; FRAME_LEN] {
        &self.bytes
    }

    /// Reassemble every big-endian word
    pub fn components(&self) -> RawComponents {
        let word = |i: usize| i16::from_be_bytes([self.bytes[2 * i], self.bytes[2 * i + 1]]);
        RawComponents {
            accel: [word(0), word(1), word(2)],
            temperature: word(3),
            gyro: [word(4), word(5), word(6)],
        }
    }
}

/// Normalized acceleration in G units
///
/// Nominally within [-1.0, 1.0] for the ±2g range. Values are not clamped.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct OrientationSample {
    pub accel_x: f32,
    pub accel_y: f32,
    pub accel_z: f32,
}

impl OrientationSample {
    pub fn new(accel_x: f32, accel_y: f32, accel_z: f32) -> Self {
        Self {
            accel_x,
            accel_y,
            accel_z,
        }
    }
}

/// Convert one signed count into G
pub fn counts_to_g(raw: i16) -> f32 {
    raw as f32 / UNITS_PER_G
}

/// Decode a frame into a sample. Pure; temperature and gyro are dropped.
pub fn decode(frame: &RawFrame) -> OrientationSample {
    let [x, y, z] = frame.components().accel;
    OrientationSample {
        accel_x: counts_to_g(x),
        accel_y: counts_to_g(y),
        accel_z: counts_to_g(z),
    }
}
