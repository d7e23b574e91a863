use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TryRecvError;
use tracing::{error, info};

use crate::app::views::{
    ProcessingView, PromptView, ResultView, UiAction, UploadView, View,
};
use crate::config::Settings;
use crate::error::TrackerError;
use crate::orchestrator::{Command, Orchestrator};
use crate::session::{Session, Step};
use crate::transport::{HttpTransport, Transport};

const STEP_TITLES: [&str; 4] = [
    "Upload Video",
    "Set Detection Prompt",
    "Process Video",
    "Download Result",
];

const ACCENT: egui::Color32 = egui::Color32::from_rgb(25, 118, 210);

/// The desktop front end. Renders whatever session snapshot arrived
/// last and forwards user actions as commands; it never mutates the
/// session itself.
pub struct TrackerApp {
    session: Session,
    prompt_input: String,
    path_input: String,
    save_path_input: String,
    download_url: String,
    transport: Arc<dyn Transport>,
    command_tx: mpsc::Sender<Command>,
    session_rx: mpsc::Receiver<Session>,
}

impl TrackerApp {
    /// Wires the channels, spawns the orchestrator onto the runtime and
    /// hands the window to eframe. Blocks until the window closes.
    pub fn start_gui(settings: Settings) -> Result<(), TrackerError> {
        let options = eframe::NativeOptions {
            viewport: egui::ViewportBuilder::default()
                .with_inner_size(egui::vec2(960.0, 640.0))
                .with_title("Grounded Video Tracker"),
            ..Default::default()
        };

        let (command_tx, command_rx) = mpsc::channel::<Command>(100);
        let (session_tx, session_rx) = mpsc::channel::<Session>(100);

        let transport: Arc<dyn Transport> = Arc::new(HttpTransport::new(&settings.service));
        let default_prompt = settings.ui.default_prompt.clone();
        let orchestrator =
            Orchestrator::new(transport.clone(), settings, command_rx, session_tx);
        tokio::spawn(orchestrator.run());

        let app = TrackerApp {
            session: Session::new(default_prompt.clone()),
            prompt_input: default_prompt,
            path_input: String::new(),
            save_path_input: String::new(),
            download_url: String::new(),
            transport,
            command_tx,
            session_rx,
        };

        eframe::run_native(
            "Grounded Video Tracker",
            options,
            Box::new(move |_cc| Ok(Box::new(app))),
        )
        .map_err(|e| TrackerError::Ui(e.to_string()))
    }

    fn drain_snapshots(&mut self) {
        loop {
            match self.session_rx.try_recv() {
                Ok(session) => self.adopt(session),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    error!("Session snapshot channel disconnected");
                    break;
                }
            }
        }
    }

    // Keep the edit buffers in step with session transitions: a reset
    // restores the default prompt, reaching the result screen seeds the
    // save path and download location.
    fn adopt(&mut self, session: Session) {
        if session.step == Step::Result && self.session.step != Step::Result {
            if let Some(task) = &session.task {
                self.save_path_input = format!("tracked_video_{}.mp4", task.task_id);
                self.download_url = self.transport.download_url(&task.task_id);
            }
        }
        if session.step == Step::Upload && self.session.step != Step::Upload {
            self.prompt_input = session.text_prompt.clone();
            self.path_input.clear();
            self.save_path_input.clear();
            self.download_url.clear();
        }
        self.session = session;
    }

    fn dispatch(&mut self, action: UiAction) {
        let command = match action {
            UiAction::UploadFile(path) => Command::Upload { path },
            UiAction::StartTracking => Command::Submit {
                prompt: self.prompt_input.clone(),
            },
            UiAction::SaveVideo(dest) => {
                info!("Saving result video to {}", dest.display());
                Command::Download { dest }
            }
            UiAction::StartOver => Command::Reset,
        };
        if let Err(e) = self.command_tx.try_send(command) {
            error!("Failed to send command to orchestrator: {}", e);
        }
    }

    fn draw_step_bar(&self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            for (index, title) in STEP_TITLES.iter().enumerate() {
                let reached = index <= self.session.step.index();
                let (fill, text) = if reached {
                    (ACCENT, egui::Color32::WHITE)
                } else {
                    (
                        ui.visuals().widgets.noninteractive.bg_fill,
                        ui.visuals().text_color(),
                    )
                };
                egui::Frame::new()
                    .fill(fill)
                    .corner_radius(4.0)
                    .inner_margin(egui::Margin::symmetric(10, 6))
                    .show(ui, |ui| {
                        ui.colored_label(text, *title);
                    });
            }
        });
    }

    fn draw_error_banner(&self, ui: &mut egui::Ui) {
        if let Some(message) = &self.session.error_message {
            egui::Frame::group(ui.style())
                .fill(egui::Color32::from_rgb(255, 235, 238))
                .show(ui, |ui| {
                    ui.colored_label(egui::Color32::from_rgb(198, 40, 40), message);
                });
            ui.add_space(8.0);
        }
    }
}

impl eframe::App for TrackerApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.drain_snapshots();

        // Native drag-and-drop lands in the window's raw input, not in
        // any widget, so pick it up before drawing.
        let hovering_file = !ctx.input(|i| i.raw.hovered_files.is_empty());
        let mut pending: Option<UiAction> = None;
        if self.session.step == Step::Upload {
            let dropped = ctx.input(|i| i.raw.dropped_files.clone());
            if let Some(path) = dropped.into_iter().find_map(|file| file.path) {
                pending = Some(UiAction::UploadFile(path));
            }
        }

        egui::TopBottomPanel::top("header").show(ctx, |ui| {
            ui.vertical_centered(|ui| {
                ui.heading("Grounded Video Tracker");
                ui.label(
                    "Upload a video, describe the object you want to track, \
                     and get an annotated video with object tracking",
                );
            });
            ui.separator();
            ui.vertical_centered(|ui| self.draw_step_bar(ui));
            ui.add_space(6.0);
        });

        egui::CentralPanel::default().show(ctx, |ui| {
            self.draw_error_banner(ui);

            let action = match self.session.step {
                Step::Upload => UploadView {
                    path_input: &mut self.path_input,
                    hovering_file,
                }
                .draw(ui),
                Step::Prompt => {
                    let file_name = self
                        .session
                        .uploaded_file
                        .as_ref()
                        .map(|file| file.file_name.as_str())
                        .unwrap_or_default();
                    PromptView {
                        file_name,
                        prompt: &mut self.prompt_input,
                        is_processing: self.session.is_processing,
                    }
                    .draw(ui)
                }
                Step::Processing => ProcessingView {
                    task: self.session.task.as_ref(),
                }
                .draw(ui),
                Step::Result => ResultView {
                    download_url: &self.download_url,
                    save_path: &mut self.save_path_input,
                }
                .draw(ui),
            };
            if pending.is_none() {
                pending = action;
            }
        });

        if let Some(action) = pending {
            self.dispatch(action);
        }

        // Snapshots arrive between frames; keep repainting so progress
        // shows up without waiting for mouse movement.
        ctx.request_repaint_after(std::time::Duration::from_millis(100));
    }
}
