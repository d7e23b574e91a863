pub mod processing_view;
pub mod prompt_view;
pub mod result_view;
pub mod upload_view;

pub use processing_view::ProcessingView;
pub use prompt_view::PromptView;
pub use result_view::ResultView;
pub use upload_view::UploadView;

use std::path::PathBuf;

/// What the user asked for this frame, if anything. The app translates
/// these into orchestrator commands; views never talk to the network.
#[derive(Debug, Clone)]
pub enum UiAction {
    UploadFile(PathBuf),
    StartTracking,
    SaveVideo(PathBuf),
    StartOver,
}

pub trait View {
    fn draw(&mut self, ui: &mut egui::Ui) -> Option<UiAction>;
}

pub(crate) fn success_banner(ui: &mut egui::Ui, text: &str) {
    egui::Frame::group(ui.style())
        .fill(egui::Color32::from_rgb(232, 245, 232))
        .show(ui, |ui| {
            ui.colored_label(egui::Color32::from_rgb(46, 125, 50), text);
        });
}
