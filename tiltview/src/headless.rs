/*!
Headless runner: polls the sensor and prints the orientation to stdout.

Logging goes to stderr so stdout carries only reports (one line each,
either plain text or JSON).
*/

use anyhow::{bail, Result};
use chrono::Local;
use serde::Serialize;
use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tilt_core::{
    AcquisitionConfig, AcquisitionEvent, AcquisitionHandle, BusEnumerator, Diagnostics, ReadRate,
    SharedOrientation,
};
use tracing::{info, warn};

/// How often a report line is printed
pub const REPORT_INTERVAL: Duration = Duration::from_millis(500);

const IDLE_STEP: Duration = Duration::from_millis(20);

/// One report line
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub timestamp: String,
    #[serde(flatten)]
    pub diagnostics: Diagnostics,
    pub skipped_reads: u64,
}

impl Report {
    pub fn new(diagnostics: Diagnostics, skipped_reads: u64) -> Self {
        Self {
            timestamp: Local::now().format("%Y-%m-%dT%H:%M:%S%.3f").to_string(),
            diagnostics,
            skipped_reads,
        }
    }

    pub fn write_to<W: Write>(&self, out: &mut W, json: bool) -> Result<()> {
        if json {
            serde_json::to_writer(&mut *out, self)?;
            writeln!(out)?;
        } else {
            writeln!(
                out,
                "{} roll={:+.3} pitch={:+.3} reads/s={:.1} ok={} skipped={}",
                self.timestamp,
                self.diagnostics.roll,
                self.diagnostics.pitch,
                self.diagnostics.reads_per_second,
                self.diagnostics.successful_reads,
                self.skipped_reads,
            )?;
        }
        Ok(())
    }
}

/// Headless session settings
#[derive(Debug, Clone)]
pub struct HeadlessOptions {
    pub json: bool,
    pub duration: Option<Duration>,
    pub report_interval: Duration,
}

/// Headless acquisition session
pub struct HeadlessRunner {
    acquisition: AcquisitionConfig,
    options: HeadlessOptions,
    running: Arc<AtomicBool>,
}

impl HeadlessRunner {
    pub fn new(acquisition: AcquisitionConfig, options: HeadlessOptions) -> Self {
        Self {
            acquisition,
            options,
            running: Arc::new(AtomicBool::new(true)),
        }
    }

    /// Get a reference to the running flag for external control
    pub fn get_running_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.running)
    }

    /// Run until stopped, the duration elapses, or the sensor turns out to be missing
    pub fn run<W: Write>(&self, enumerator: Box<dyn BusEnumerator>, out: &mut W) -> Result<()> {
        let rate = ReadRate::started_now();
        let started = Instant::now();
        let mut handle =
            AcquisitionHandle::spawn(enumerator, self.acquisition.clone(), SharedOrientation::new())?;
        let state = handle.orientation().clone();

        let mut next_report = started + self.options.report_interval;
        let mut reports = 0u64;

        while self.running.load(Ordering::SeqCst) {
            let events: Vec<_> = handle.events().try_iter().collect();
            for event in events {
                match event {
                    AcquisitionEvent::SensorReady { address } => {
                        info!("✅ Sensor ready at {:#04x}", address);
                    }
                    AcquisitionEvent::SensorUnavailable(reason) => {
                        handle.shutdown();
                        bail!("sensor unavailable: {}", reason);
                    }
                    AcquisitionEvent::Stopped { .. } => {}
                }
            }

            let now = Instant::now();
            if self.options.duration.is_some_and(|d| now.duration_since(started) >= d) {
                break;
            }

            if now >= next_report {
                let diagnostics = Diagnostics::collect(&state.snapshot(), &rate, now);
                Report::new(diagnostics, handle.skipped_reads()).write_to(out, self.options.json)?;
                out.flush()?;
                reports += 1;
                next_report += self.options.report_interval;
            }

            thread::sleep(IDLE_STEP);
        }

        handle.shutdown();
        if !handle.is_sensor_available() && state.successful_reads() == 0 {
            warn!("No samples were read");
        }
        info!(
            "📊 Session summary: {} reads, {} skipped, {} reports",
            state.successful_reads(),
            handle.skipped_reads(),
            reports
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tilt_core::{SimOptions, SimulatedEnumerator};

    fn options(json: bool) -> HeadlessOptions {
        HeadlessOptions {
            json,
            duration: Some(Duration::from_millis(600)),
            report_interval: Duration::from_millis(100),
        }
    }

    fn fast_acquisition() -> AcquisitionConfig {
        AcquisitionConfig {
            period: Duration::from_millis(10),
            ..Default::default()
        }
    }

    fn sample_diagnostics() -> Diagnostics {
        Diagnostics {
            roll: 0.25,
            pitch: -0.5,
            reads_per_second: 25.0,
            successful_reads: 50,
        }
    }

    #[test]
    fn test_text_report() {
        let mut out = Vec::new();
        Report::new(sample_diagnostics(), 3).write_to(&mut out, false).unwrap();
        let line = String::from_utf8(out).unwrap();
        assert!(line.contains("roll=+0.250 pitch=-0.500 reads/s=25.0 ok=50 skipped=3"));
        assert!(line.ends_with('\n'));
    }

    #[test]
    fn test_json_report() {
        let mut out = Vec::new();
        Report::new(sample_diagnostics(), 3).write_to(&mut out, true).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(value["roll"], 0.25);
        assert_eq!(value["successful_reads"], 50);
        assert_eq!(value["skipped_reads"], 3);
        assert!(value["timestamp"].is_string());
    }

    #[test]
    fn test_simulated_session_reports() {
        let runner = HeadlessRunner::new(fast_acquisition(), options(true));
        let mut out = Vec::new();
        runner
            .run(Box::new(SimulatedEnumerator::new(SimOptions::default())), &mut out)
            .unwrap();

        let text = String::from_utf8(out).unwrap();
        let lines: Vec<_> = text.lines().collect();
        assert!(lines.len() >= 3);
        let last: serde_json::Value = serde_json::from_str(lines[lines.len() - 1]).unwrap();
        assert!(last["successful_reads"].as_u64().unwrap() > 0);
    }

    #[test]
    fn test_missing_sensor_fails() {
        let runner = HeadlessRunner::new(fast_acquisition(), options(false));
        let mut out = Vec::new();
        let err = runner
            .run(Box::new(SimulatedEnumerator::absent()), &mut out)
            .unwrap_err();
        assert!(err.to_string().contains("sensor unavailable"));
    }

    #[test]
    fn test_running_flag_stops_session() {
        let runner = HeadlessRunner::new(
            fast_acquisition(),
            HeadlessOptions {
                duration: None,
                ..options(false)
            },
        );
        let running = runner.get_running_flag();
        let stopper = thread::spawn(move || {
            thread::sleep(Duration::from_millis(250));
            running.store(false, Ordering::SeqCst);
        });

        let mut out = Vec::new();
        runner
            .run(Box::new(SimulatedEnumerator::new(SimOptions::default())), &mut out)
            .unwrap();
        stopper.join().unwrap();
    }
}
