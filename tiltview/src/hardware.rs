/*!
Sensor sources for the viewer.

On Linux the sensor sits behind an i2c-dev character device
(`/dev/i2c-N`); every other source is the built-in simulation.
*/

use crate::config::{SensorConfig, SensorSource};
use anyhow::Result;
use tilt_core::{BusEnumerator, SimulatedEnumerator};

/// Enumerator for the configured source
pub fn open_enumerator(sensor: &SensorConfig) -> Result<Box<dyn BusEnumerator>> {
    match sensor.source {
        SensorSource::Simulated => Ok(Box::new(SimulatedEnumerator::new(sensor.sim_options()))),
        SensorSource::Linux => linux_enumerator(),
    }
}

#[cfg(target_os = "linux")]
fn linux_enumerator() -> Result<Box<dyn BusEnumerator>> {
    Ok(Box::new(linux::LinuxI2cEnumerator::new()))
}

#[cfg(not(target_os = "linux"))]
fn linux_enumerator() -> Result<Box<dyn BusEnumerator>> {
    anyhow::bail!("the linux sensor source is only available on Linux; use source = \"simulated\"")
}

#[cfg(target_os = "linux")]
pub mod linux {
    use linux_embedded_hal::I2cdev;
    use std::path::{Path, PathBuf};
    use tilt_core::{BusDeviceInfo, BusEnumerator, BusError, BusTransport, HalBus};
    use tracing::debug;

    /// Lists i2c-dev nodes by path prefix
    #[derive(Debug, Clone, Default)]
    pub struct LinuxI2cEnumerator;

    impl LinuxI2cEnumerator {
        pub fn new() -> Self {
            Self
        }
    }

    /// Directory holding the nodes a selector like `/dev/i2c-` refers to
    fn selector_dir(selector: &str) -> PathBuf {
        if selector.ends_with('/') {
            return PathBuf::from(selector);
        }
        match Path::new(selector).parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
            _ => PathBuf::from("."),
        }
    }

    /// Numbered nodes first in bus-number order, then anything else by name
    fn bus_order(path: &str, selector: &str) -> (u32, String) {
        let suffix = path.trim_start_matches(selector);
        (suffix.parse().unwrap_or(u32::MAX), path.to_string())
    }

    impl BusEnumerator for LinuxI2cEnumerator {
        fn find_all(&self, selector: &str) -> Result<Vec<BusDeviceInfo>, BusError> {
            let dir = selector_dir(selector);
            let entries = std::fs::read_dir(&dir).map_err(|e| {
                BusError::aborted(format!("cannot list {}: {}", dir.display(), e))
            })?;

            let mut paths: Vec<String> = entries
                .filter_map(|entry| entry.ok())
                .map(|entry| entry.path().to_string_lossy().into_owned())
                .filter(|path| path.starts_with(selector))
                .collect();
            paths.sort_by_key(|path| bus_order(path, selector));
            debug!("i2c nodes matching {:?}: {:?}", selector, paths);

            Ok(paths
                .into_iter()
                .map(|path| {
                    let name = format!("I2C bus {}", path.trim_start_matches(selector));
                    BusDeviceInfo::new(path, name)
                })
                .collect())
        }

        fn open(&self, device: &BusDeviceInfo, address: u8) -> Result<Box<dyn BusTransport>, BusError> {
            let i2c = I2cdev::new(&device.id)
                .map_err(|e| BusError::aborted(format!("cannot open {}: {}", device.id, e)))?;
            Ok(Box::new(HalBus::new(i2c, address)))
        }
    }

}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simulated_source() {
        let enumerator = open_enumerator(&SensorConfig::default()).unwrap();
        assert_eq!(enumerator.find_all("/dev/i2c-").unwrap().len(), 1);
    }
}
