//! Scripted bus for tests
//!
//! Records every transaction and serves queued read results. The handle is
//! cloneable so a test can keep one copy while the driver owns another.

use crate::bus::{BusDeviceInfo, BusEnumerator, BusTransport};
use crate::error::BusError;
use crate::frame::RawFrame;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// Transaction type for logging
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BusTransaction {
    Write { addr: u8, data: Vec<u8> },
    WriteRead { addr: u8, write_data: Vec<u8>, read_len: usize },
}

#[derive(Debug, Default)]
struct MockState {
    transactions: Vec<(Instant, BusTransaction)>,
    reads: VecDeque<Result<Vec<u8>, BusError>>,
    fail_write_at: Option<(usize, BusError)>,
    writes_seen: usize,
}

/// Mock bus transport
#[derive(Debug, Clone)]
pub struct MockBus {
    address: u8,
    state: Arc<Mutex<MockState>>,
}

impl MockBus {
    pub fn new(address: u8) -> Self {
        Self {
            address,
            state: Arc::new(Mutex::new(MockState::default())),
        }
    }

    /// Queue a successful frame read
    pub fn push_frame(&self, frame: RawFrame) {
        self.state.lock().reads.push_back(Ok(frame.as_bytes().to_vec()));
    }

    /// Queue a failed read
    pub fn push_read_error(&self, error: BusError) {
        self.state.lock().reads.push_back(Err(error));
    }

    /// Queue arbitrary read bytes
    pub fn push_read_bytes(&self, bytes: &[u8]) {
        self.state.lock().reads.push_back(Ok(bytes.to_vec()));
    }

    /// Fail the n-th write (0-based) with `error`
    pub fn fail_write_at(&self, index: usize, error: BusError) {
        self.state.lock().fail_write_at = Some((index, error));
    }

    /// Transaction log (for test verification)
    pub fn transactions(&self) -> Vec<BusTransaction> {
        self.state
            .lock()
            .transactions
            .iter()
            .map(|(_, t)| t.clone())
            .collect()
    }

    /// Transaction log with the time each one happened
    pub fn timed_transactions(&self) -> Vec<(Instant, BusTransaction)> {
        self.state.lock().transactions.clone()
    }

    /// Reads still queued
    pub fn pending_reads(&self) -> usize {
        self.state.lock().reads.len()
    }
}

impl BusTransport for MockBus {
    fn address(&self) -> u8 {
        self.address
    }

    fn write(&mut self, bytes: &[u8]) -> Result<(), BusError> {
        let mut state = self.state.lock();
        state.transactions.push((
            Instant::now(),
            BusTransaction::Write {
                addr: self.address,
                data: bytes.to_vec(),
            },
        ));
        let index = state.writes_seen;
        state.writes_seen += 1;
        match &state.fail_write_at {
            Some((at, error)) if *at == index => Err(error.clone()),
            _ => Ok(()),
        }
    }

    fn write_then_read(&mut self, write_bytes: &[u8], read_len: usize) -> Result<Vec<u8>, BusError> {
        let mut state = self.state.lock();
        state.transactions.push((
            Instant::now(),
            BusTransaction::WriteRead {
                addr: self.address,
                write_data: write_bytes.to_vec(),
                read_len,
            },
        ));
        // an empty script behaves like a device that stopped answering
        state.reads.pop_front().unwrap_or(Err(BusError::NotResponding {
            address: self.address,
        }))
    }
}

/// Enumerator exposing zero or one mock bus
#[derive(Debug, Clone)]
pub struct MockEnumerator {
    bus: Option<MockBus>,
    opens: Arc<AtomicUsize>,
}

impl MockEnumerator {
    /// Enumerator with one bus serving `bus`
    pub fn with_bus(bus: MockBus) -> Self {
        Self {
            bus: Some(bus),
            opens: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Enumerator that finds nothing
    pub fn empty() -> Self {
        Self {
            bus: None,
            opens: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Number of successful `open` calls
    pub fn open_count(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }
}

impl BusEnumerator for MockEnumerator {
    fn find_all(&self, _selector: &str) -> Result<Vec<BusDeviceInfo>, BusError> {
        Ok(self
            .bus
            .iter()
            .map(|_| BusDeviceInfo::new("mock-0", "Mock I2C bus"))
            .collect())
    }

    fn open(&self, _device: &BusDeviceInfo, address: u8) -> Result<Box<dyn BusTransport>, BusError> {
        let bus = self
            .bus
            .as_ref()
            .ok_or(BusError::NotResponding { address })?;
        self.opens.fetch_add(1, Ordering::SeqCst);
        let mut bus = bus.clone();
        bus.address = address;
        Ok(Box::new(bus))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_records_transactions() {
        let mut bus = MockBus::new(0x68);
        bus.write(&[0x6B, 0x80]).unwrap();
        bus.push_frame(RawFrame::from_accel(1, 2, 3));
        let data = bus.write_then_read(&[0x3B], 14).unwrap();
        assert_eq!(data.len(), 14);

        assert_eq!(
            bus.transactions(),
            vec![
                BusTransaction::Write {
                    addr: 0x68,
                    data: vec![0x6B, 0x80]
                },
                BusTransaction::WriteRead {
                    addr: 0x68,
                    write_data: vec![0x3B],
                    read_len: 14
                },
            ]
        );
    }

    #[test]
    fn test_mock_scripted_failures() {
        let mut bus = MockBus::new(0x68);
        bus.fail_write_at(1, BusError::BusBusy);
        assert!(bus.write(&[0x01]).is_ok());
        assert_eq!(bus.write(&[0x02]), Err(BusError::BusBusy));
        assert!(bus.write(&[0x03]).is_ok());

        bus.push_read_error(BusError::aborted("glitch"));
        assert!(bus.write_then_read(&[0x3B], 14).is_err());
        // exhausted script
        assert_eq!(
            bus.write_then_read(&[0x3B], 14),
            Err(BusError::NotResponding { address: 0x68 })
        );
    }

    #[test]
    fn test_mock_enumerator() {
        assert!(MockEnumerator::empty().find_all("any").unwrap().is_empty());

        let bus = MockBus::new(0x00);
        let enumerator = MockEnumerator::with_bus(bus.clone());
        let devices = enumerator.find_all("any").unwrap();
        assert_eq!(devices.len(), 1);

        let mut transport = enumerator.open(&devices[0], 0x68).unwrap();
        assert_eq!(transport.address(), 0x68);
        transport.write(&[0xAA]).unwrap();
        assert_eq!(enumerator.open_count(), 1);
        // the clone shares the transaction log
        assert_eq!(bus.transactions().len(), 1);
    }
}
