use std::path::PathBuf;

use crate::app::views::{UiAction, View};

/// First screen: a drop target plus a plain path field for keyboards.
/// Actual file drops arrive through the window's raw input and are
/// handled by the app; this view only renders the affordance.
pub struct UploadView<'a> {
    pub path_input: &'a mut String,
    pub hovering_file: bool,
}

impl View for UploadView<'_> {
    fn draw(&mut self, ui: &mut egui::Ui) -> Option<UiAction> {
        let mut action = None;

        ui.vertical_centered(|ui| {
            let stroke = if self.hovering_file {
                egui::Stroke::new(2.0, egui::Color32::from_rgb(25, 118, 210))
            } else {
                egui::Stroke::new(1.0, ui.visuals().widgets.noninteractive.bg_stroke.color)
            };
            egui::Frame::group(ui.style()).stroke(stroke).show(ui, |ui| {
                ui.set_min_height(160.0);
                ui.vertical_centered(|ui| {
                    ui.add_space(40.0);
                    ui.heading("Drop your video file here");
                    ui.label("Supported formats: MP4, AVI, MOV, MKV, WEBM (max 100 MB)");
                    ui.add_space(40.0);
                });
            });

            ui.add_space(12.0);
            ui.horizontal(|ui| {
                ui.label("Or enter a path:");
                ui.text_edit_singleline(self.path_input);
                let ready = !self.path_input.trim().is_empty();
                if ui.add_enabled(ready, egui::Button::new("Upload")).clicked() {
                    action = Some(UiAction::UploadFile(PathBuf::from(self.path_input.trim())));
                }
            });
        });

        action
    }
}
