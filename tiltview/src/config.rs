/*!
Configuration management for the tilt viewer.
*/

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tilt_core::protocol::{DEFAULT_BUS_SELECTOR, MPU6050_ADDR};
use tilt_core::{AcquisitionConfig, SimOptions};

/// Longest accepted rocking cycle for the simulated source
const MAX_MOTION_PERIOD_S: f32 = 86_400.0;

/// Main application configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    pub sensor: SensorConfig,
    pub gui: GuiConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self {
            sensor: SensorConfig::default(),
            gui: GuiConfig::default(),
            logging: LoggingConfig::default(),
        }
    }

    /// Load configuration from a TOML file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: AppConfig =
            toml::from_str(&content).with_context(|| "Failed to parse config file as TOML")?;

        config.sensor.validate()?;
        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content =
            toml::to_string_pretty(self).with_context(|| "Failed to serialize config to TOML")?;

        std::fs::write(path.as_ref(), content)
            .with_context(|| format!("Failed to write config file: {}", path.as_ref().display()))?;

        Ok(())
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Where sensor data comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SensorSource {
    /// Built-in simulated MPU-6050
    Simulated,
    /// Linux i2c-dev character devices
    Linux,
}

impl SensorSource {
    /// Short name shown in the status bar
    pub fn label(&self) -> &'static str {
        match self {
            SensorSource::Simulated => "simulated",
            SensorSource::Linux => "i2c hardware",
        }
    }
}

/// Sensor and acquisition settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorConfig {
    /// Data source; `simulated` by default so the viewer runs without hardware
    pub source: SensorSource,

    /// Bus selector (device node prefix for the Linux source)
    pub bus_selector: String,

    /// 7-bit I2C address of the sensor
    pub device_address: u8,

    /// Poll period in milliseconds
    pub poll_interval_ms: u64,

    /// Simulated source: fail every N-th read
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fault_every: Option<u32>,

    /// Simulated source: seconds per rocking cycle
    pub motion_period_s: f32,
}

impl Default for SensorConfig {
    fn default() -> Self {
        Self {
            source: SensorSource::Simulated,
            bus_selector: DEFAULT_BUS_SELECTOR.to_string(),
            device_address: MPU6050_ADDR,
            poll_interval_ms: 40,
            fault_every: None,
            motion_period_s: 6.0,
        }
    }
}

impl SensorConfig {
    pub fn validate(&self) -> Result<()> {
        if self.poll_interval_ms == 0 {
            bail!("sensor.poll_interval_ms must be greater than zero");
        }
        if self.device_address > 0x7F {
            bail!(
                "sensor.device_address {:#04x} is not a 7-bit I2C address",
                self.device_address
            );
        }
        if !(self.motion_period_s > 0.0 && self.motion_period_s <= MAX_MOTION_PERIOD_S) {
            bail!(
                "sensor.motion_period_s must be in (0, {}], got {}",
                MAX_MOTION_PERIOD_S,
                self.motion_period_s
            );
        }
        Ok(())
    }

    /// Settings handed to the acquisition worker
    pub fn acquisition(&self) -> AcquisitionConfig {
        AcquisitionConfig {
            selector: self.bus_selector.clone(),
            address: self.device_address,
            period: Duration::from_millis(self.poll_interval_ms),
        }
    }

    /// Settings for the simulated source
    pub fn sim_options(&self) -> SimOptions {
        let defaults = SimOptions::default();
        SimOptions {
            fault_every: self.fault_every,
            motion_period: Duration::try_from_secs_f32(self.motion_period_s)
                .unwrap_or(defaults.motion_period),
            ..defaults
        }
    }
}

/// GUI specific configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GuiConfig {
    /// Window width
    pub window_width: f32,

    /// Window height
    pub window_height: f32,

    /// Enable dark mode
    pub dark_mode: bool,

    /// Auto-save configuration on exit
    pub auto_save_config: bool,
}

impl Default for GuiConfig {
    fn default() -> Self {
        Self {
            window_width: 800.0,
            window_height: 600.0,
            dark_mode: true,
            auto_save_config: false,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter when RUST_LOG is unset
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}
