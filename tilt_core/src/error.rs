/*!
Error types for the tilt acquisition pipeline.

Per-transaction failures are [`BusError`]s and never leave the read cycle.
Startup failures are [`TiltError`]s and disable acquisition for the lifetime
of the pipeline instance.
*/

use thiserror::Error;

/// Common result type used throughout the library
pub type Result<T> = std::result::Result<T, TiltError>;

/// A single failed bus transaction
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BusError {
    /// Device did not acknowledge its address
    #[error("device at {address:#04x} not responding")]
    NotResponding { address: u8 },

    /// Bus held by another master or arbitration lost
    #[error("bus busy")]
    BusBusy,

    /// Transfer started but did not complete
    #[error("transfer aborted: {0}")]
    TransferAborted(String),

    /// Fewer bytes came back than were asked for
    #[error("short read: expected {expected} bytes, got {actual}")]
    ShortRead { expected: usize, actual: usize },
}

impl BusError {
    /// Create a new transfer aborted error
    pub fn aborted(msg: impl Into<String>) -> Self {
        Self::TransferAborted(msg.into())
    }
}

/// Pipeline-level errors
#[derive(Error, Debug)]
pub enum TiltError {
    /// Enumeration found no candidate device
    #[error("no sensor found on bus matching '{selector}'")]
    SensorNotFound { selector: String },

    /// A register write in the configuration sequence failed
    #[error("configuration step {step} failed (register {register:#04x} <- {value:#04x}): {source}")]
    ConfigurationFailed {
        step: usize,
        register: u8,
        value: u8,
        #[source]
        source: BusError,
    },

    /// Bus errors outside the read cycle (enumeration, open)
    #[error("bus error: {0}")]
    Bus(#[from] BusError),

    /// Worker thread or runtime could not be started
    #[error("runtime error: {0}")]
    Runtime(String),

    /// Configuration errors
    #[error("configuration error: {0}")]
    Config(String),
}

impl TiltError {
    /// Create a new sensor-not-found error
    pub fn not_found(selector: impl Into<String>) -> Self {
        Self::SensorNotFound {
            selector: selector.into(),
        }
    }

    /// Create a new runtime error
    pub fn runtime(msg: impl Into<String>) -> Self {
        Self::Runtime(msg.into())
    }

    /// Create a new configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Startup failures leave the pipeline disabled but the host running
    pub fn disables_acquisition(&self) -> bool {
        matches!(
            self,
            Self::SensorNotFound { .. } | Self::ConfigurationFailed { .. } | Self::Bus(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_configuration_failed_message() {
        let err = TiltError::ConfigurationFailed {
            step: 3,
            register: 0x1A,
            value: 0x04,
            source: BusError::NotResponding { address: 0x68 },
        };
        let msg = err.to_string();
        assert!(msg.contains("step 3"));
        assert!(msg.contains("0x1a"));
        assert!(msg.contains("0x68"));
    }

    #[test]
    fn test_startup_errors_disable_acquisition() {
        assert!(TiltError::not_found("/dev/i2c-").disables_acquisition());
        assert!(TiltError::from(BusError::BusBusy).disables_acquisition());
        assert!(!TiltError::runtime("thread spawn failed").disables_acquisition());
    }
}
