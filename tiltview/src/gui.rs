/*!
GUI implementation for the tilt viewer.

Each frame reads the latest sample, rotates the airplane by it and draws
two small info windows. Acquisition runs on its own worker; the render loop
never waits for the bus.
*/

use crate::config::AppConfig;
use crate::hardware::open_enumerator;
use crate::scene::{airplane_segments, ViewCamera};
use eframe::egui;
use std::path::PathBuf;
use std::time::Instant;
use tilt_core::{
    AcquisitionEvent, AcquisitionHandle, Diagnostics, ReadRate, RotationTransform,
    SharedOrientation,
};
use tracing::{error, info};

const INFO_WINDOW_WIDTH: f32 = 220.0;
const INFO_WINDOW_HEIGHT: f32 = 90.0;

/// Main GUI application state
pub struct TiltViewerGui {
    config: AppConfig,
    config_path: PathBuf,

    // Acquisition
    orientation: SharedOrientation,
    acquisition: Option<AcquisitionHandle>,
    read_rate: ReadRate,

    // Scene
    camera: ViewCamera,
    roll: f32,
    pitch: f32,

    // Status
    status_message: String,
    sensor_ok: bool,
    fps: f32,
    last_frame: Instant,
}

impl TiltViewerGui {
    /// Create a new GUI instance and start looking for the sensor
    pub fn new(config: AppConfig, config_path: PathBuf, cc: &eframe::CreationContext<'_>) -> Self {
        cc.egui_ctx.set_visuals(if config.gui.dark_mode {
            egui::Visuals::dark()
        } else {
            egui::Visuals::light()
        });

        let mut gui = Self {
            config,
            config_path,
            orientation: SharedOrientation::new(),
            acquisition: None,
            read_rate: ReadRate::started_now(),
            camera: ViewCamera::default(),
            roll: 0.0,
            pitch: 0.0,
            status_message: "Starting".to_string(),
            sensor_ok: false,
            fps: 0.0,
            last_frame: Instant::now(),
        };
        gui.start_acquisition();
        gui
    }

    /// Spawn the acquisition worker; returns at once
    fn start_acquisition(&mut self) {
        if self.acquisition.is_some() {
            return;
        }

        let enumerator = match open_enumerator(&self.config.sensor) {
            Ok(enumerator) => enumerator,
            Err(e) => {
                error!("Cannot open sensor source: {:#}", e);
                self.status_message = format!("Sensor source unavailable: {}", e);
                return;
            }
        };

        match AcquisitionHandle::spawn(
            enumerator,
            self.config.sensor.acquisition(),
            self.orientation.clone(),
        ) {
            Ok(handle) => {
                self.acquisition = Some(handle);
                self.status_message = "Looking for sensor...".to_string();
            }
            Err(e) => {
                error!("Failed to start acquisition: {}", e);
                self.status_message = format!("Failed to start acquisition: {}", e);
            }
        }
    }

    /// Signal the worker to stop without waiting on in-flight bus I/O
    fn stop_acquisition(&mut self) {
        if let Some(mut handle) = self.acquisition.take() {
            handle.stop();
        }
        self.sensor_ok = false;
    }

    /// Tear down and start again from a zeroed orientation and read rate
    fn restart_acquisition(&mut self) {
        info!("🔄 Restarting acquisition");
        let orientation = match &self.acquisition {
            Some(handle) => handle.orientation().clone(),
            None => self.orientation.clone(),
        };
        self.stop_acquisition();
        orientation.reset();
        self.read_rate = ReadRate::started_now();
        self.start_acquisition();
    }

    fn drain_events(&mut self) {
        let Some(handle) = &self.acquisition else {
            return;
        };
        for event in handle.events().try_iter() {
            match event {
                AcquisitionEvent::SensorReady { address } => {
                    self.sensor_ok = true;
                    self.status_message = format!("Sensor ready at {:#04x}", address);
                }
                AcquisitionEvent::SensorUnavailable(reason) => {
                    self.sensor_ok = false;
                    self.status_message = format!("Sensor unavailable: {}", reason);
                }
                AcquisitionEvent::Stopped { successful_reads } => {
                    self.sensor_ok = false;
                    if self.status_message.starts_with("Sensor ready") {
                        self.status_message =
                            format!("Acquisition stopped after {} reads", successful_reads);
                    }
                }
            }
        }
    }

    fn update_fps(&mut self) {
        let now = Instant::now();
        let dt = now.duration_since(self.last_frame).as_secs_f32();
        self.last_frame = now;
        if dt > 0.0 {
            let instant = 1.0 / dt;
            self.fps = if self.fps == 0.0 {
                instant
            } else {
                0.9 * self.fps + 0.1 * instant
            };
        }
    }

    fn status_bar(&mut self, ctx: &egui::Context) {
        egui::TopBottomPanel::top("status").show(ctx, |ui| {
            ui.horizontal(|ui| {
                if self.sensor_ok {
                    ui.colored_label(egui::Color32::GREEN, "🟢 Polling");
                } else {
                    ui.colored_label(egui::Color32::RED, "🔴 Disabled");
                }
                ui.label(format!("[{}]", self.config.sensor.source.label()));
                ui.label(&self.status_message);

                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    if ui.button("💾 Save Config").clicked() {
                        match self.config.save_to_file(&self.config_path) {
                            Ok(_) => {
                                self.status_message = "Configuration saved".to_string();
                            }
                            Err(e) => {
                                self.status_message = format!("Failed to save config: {}", e);
                            }
                        }
                    }
                    if ui.button("🔄 Restart").clicked() {
                        self.restart_acquisition();
                    }
                });
            });
        });
    }

    fn info_windows(&mut self, ctx: &egui::Context, diagnostics: &Diagnostics) {
        let screen = ctx.screen_rect();

        egui::Window::new("Performance")
            .default_pos(egui::pos2(screen.left(), screen.bottom() - INFO_WINDOW_HEIGHT))
            .default_size([INFO_WINDOW_WIDTH, INFO_WINDOW_HEIGHT])
            .show(ctx, |ui| {
                ui.label(format!("FPS={:.1}", self.fps));
                ui.label(format!("Accel reads/sec {:.1}", diagnostics.reads_per_second));
            });

        // slider edits only last until the next sample
        egui::Window::new("Accelerometer")
            .default_pos(egui::pos2(
                screen.right() - INFO_WINDOW_WIDTH,
                screen.bottom() - INFO_WINDOW_HEIGHT,
            ))
            .default_size([INFO_WINDOW_WIDTH, INFO_WINDOW_HEIGHT])
            .show(ctx, |ui| {
                ui.add(egui::Slider::new(&mut self.roll, -1.0..=1.0).text("Roll angle"));
                ui.add(egui::Slider::new(&mut self.pitch, -1.0..=1.0).text("Pitch angle"));
            });
    }
}

impl eframe::App for TiltViewerGui {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.update_fps();
        self.drain_events();

        let snapshot = self.orientation.snapshot();
        let diagnostics = Diagnostics::collect(&snapshot, &self.read_rate, Instant::now());
        let rotation = RotationTransform::from_sample(&snapshot.sample);
        self.roll = rotation.roll;
        self.pitch = rotation.pitch;

        self.status_bar(ctx);

        egui::CentralPanel::default().show(ctx, |ui| {
            let (response, painter) =
                ui.allocate_painter(ui.available_size(), egui::Sense::hover());
            let stroke = egui::Stroke::new(1.5, ui.visuals().strong_text_color());
            for segment in airplane_segments(&self.camera, &rotation.matrix(), response.rect) {
                painter.line_segment(segment, stroke);
            }
        });

        self.info_windows(ctx, &diagnostics);

        ctx.request_repaint();
    }

    fn on_exit(&mut self, _gl: Option<&eframe::glow::Context>) {
        self.stop_acquisition();

        // Auto-save configuration if enabled
        if self.config.gui.auto_save_config {
            if let Err(e) = self.config.save_to_file(&self.config_path) {
                error!("Failed to save config: {:#}", e);
            }
        }
    }
}
