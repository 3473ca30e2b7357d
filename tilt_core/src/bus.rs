/*!
Bus transport and device enumeration.

[`BusTransport`] is pure transport: it moves bytes to and from one
peripheral address and never interprets them. [`BusEnumerator`] finds
candidate buses and opens a transport on one of them.
*/

use crate::error::BusError;
use embedded_hal::i2c::{Error as _, ErrorKind, I2c};

/// Raw transactions against a fixed peripheral address
///
/// # Invariants
///
/// - One owner per transport; the device driver holds it exclusively
/// - Address is 7-bit (0x00..=0x7F)
/// - Failures are returned, never panicked
pub trait BusTransport: Send {
    /// Peripheral address this transport talks to
    fn address(&self) -> u8;

    /// START - ADDR(W) - DATA - STOP
    fn write(&mut self, bytes: &[u8]) -> Result<(), BusError>;

    /// Write then read with a repeated START, returning `read_len` bytes
    fn write_then_read(&mut self, write_bytes: &[u8], read_len: usize) -> Result<Vec<u8>, BusError>;
}

impl BusTransport for Box<dyn BusTransport> {
    fn address(&self) -> u8 {
        (**self).address()
    }

    fn write(&mut self, bytes: &[u8]) -> Result<(), BusError> {
        (**self).write(bytes)
    }

    fn write_then_read(&mut self, write_bytes: &[u8], read_len: usize) -> Result<Vec<u8>, BusError> {
        (**self).write_then_read(write_bytes, read_len)
    }
}

/// A bus controller found during enumeration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BusDeviceInfo {
    /// Platform identifier (device node path, controller id)
    pub id: String,
    /// Human readable name
    pub name: String,
}

impl BusDeviceInfo {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

/// Finds buses and opens transports on them
pub trait BusEnumerator: Send {
    /// All buses matching the selector, in platform order
    fn find_all(&self, selector: &str) -> Result<Vec<BusDeviceInfo>, BusError>;

    /// Open a transport to `address` on the given bus
    fn open(&self, device: &BusDeviceInfo, address: u8) -> Result<Box<dyn BusTransport>, BusError>;
}

impl BusEnumerator for Box<dyn BusEnumerator> {
    fn find_all(&self, selector: &str) -> Result<Vec<BusDeviceInfo>, BusError> {
        (**self).find_all(selector)
    }

    fn open(&self, device: &BusDeviceInfo, address: u8) -> Result<Box<dyn BusTransport>, BusError> {
        (**self).open(device, address)
    }
}

/// Adapter from any `embedded-hal` I2C bus to [`BusTransport`]
pub struct HalBus<I> {
    i2c: I,
    address: u8,
}

impl<I: I2c> HalBus<I> {
    pub fn new(i2c: I, address: u8) -> Self {
        Self { i2c, address }
    }

    pub fn into_inner(self) -> I {
        self.i2c
    }

    fn map_error(&self, kind: ErrorKind) -> BusError {
        match kind {
            ErrorKind::NoAcknowledge(_) => BusError::NotResponding {
                address: self.address,
            },
            ErrorKind::ArbitrationLoss | ErrorKind::Bus => BusError::BusBusy,
            other => BusError::aborted(format!("{other:?}")),
        }
    }
}

impl<I: I2c + Send> BusTransport for HalBus<I> {
    fn address(&self) -> u8 {
        self.address
    }

    fn write(&mut self, bytes: &[u8]) -> Result<(), BusError> {
        let address = self.address;
        match self.i2c.write(address, bytes) {
            Ok(()) => Ok(()),
            Err(e) => Err(self.map_error(e.kind())),
        }
    }

    fn write_then_read(&mut self, write_bytes: &[u8], read_len: usize) -> Result<Vec<u8>, BusError> {
        let address = self.address;
        let mut buffer = vec![0u8; read_len];
        match self.i2c.write_read(address, write_bytes, &mut buffer) {
            Ok(()) => Ok(buffer),
            Err(e) => Err(self.map_error(e.kind())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedded_hal::i2c::{ErrorType, NoAcknowledgeSource, Operation};

    #[derive(Debug)]
    struct FakeError(ErrorKind);

    impl embedded_hal::i2c::Error for FakeError {
        fn kind(&self) -> ErrorKind {
            self.0
        }
    }

    /// Echoes the first written byte back into every read byte
    struct EchoI2c {
        fail_with: Option<ErrorKind>,
        last_address: Option<u8>,
    }

    impl ErrorType for EchoI2c {
        type Error = FakeError;
    }

    impl I2c for EchoI2c {
        fn transaction(
            &mut self,
            address: u8,
            operations: &mut [Operation<'_>],
        ) -> Result<(), Self::Error> {
            self.last_address = Some(address);
            if let Some(kind) = self.fail_with {
                return Err(FakeError(kind));
            }
            let mut seed = 0u8;
            for op in operations {
                match op {
                    Operation::Write(bytes) => seed = bytes.first().copied().unwrap_or(0),
                    Operation::Read(buf) => buf.fill(seed),
                }
            }
            Ok(())
        }
    }

    #[test]
    fn test_hal_bus_write_then_read() {
        let mut bus = HalBus::new(
            EchoI2c {
                fail_with: None,
                last_address: None,
            },
            0x68,
        );
        let data = bus.write_then_read(&[0x3B], 14).unwrap();
        assert_eq!(data, vec![0x3B; 14]);
        bus.write(&[0x6B, 0x80]).unwrap();
        assert_eq!(bus.into_inner().last_address, Some(0x68));
    }

    #[test]
    fn test_hal_bus_error_mapping() {
        let nack = ErrorKind::NoAcknowledge(NoAcknowledgeSource::Address);
        let mut bus = HalBus::new(
            EchoI2c {
                fail_with: Some(nack),
                last_address: None,
            },
            0x68,
        );
        assert_eq!(
            bus.write(&[0x6B, 0x02]),
            Err(BusError::NotResponding { address: 0x68 })
        );

        let mut bus = HalBus::new(
            EchoI2c {
                fail_with: Some(ErrorKind::ArbitrationLoss),
                last_address: None,
            },
            0x68,
        );
        assert_eq!(bus.write_then_read(&[0x3B], 14), Err(BusError::BusBusy));

        let mut bus = HalBus::new(
            EchoI2c {
                fail_with: Some(ErrorKind::Overrun),
                last_address: None,
            },
            0x68,
        );
        assert!(matches!(
            bus.write_then_read(&[0x3B], 14),
            Err(BusError::TransferAborted(_))
        ));
    }
}
