use std::path::PathBuf;

use crate::app::views::{success_banner, UiAction, View};

/// Final screen: point at the result stream, save a copy, start over.
pub struct ResultView<'a> {
    pub download_url: &'a str,
    pub save_path: &'a mut String,
}

impl View for ResultView<'_> {
    fn draw(&mut self, ui: &mut egui::Ui) -> Option<UiAction> {
        let mut action = None;

        ui.vertical_centered(|ui| {
            success_banner(ui, "Video processing completed successfully!");
            ui.add_space(12.0);

            ui.horizontal(|ui| {
                ui.label("Result stream:");
                ui.hyperlink(self.download_url);
            });
            ui.add_space(8.0);

            ui.horizontal(|ui| {
                ui.label("Save to:");
                ui.text_edit_singleline(self.save_path);
                let ready = !self.save_path.trim().is_empty();
                if ui
                    .add_enabled(ready, egui::Button::new("Download Video"))
                    .clicked()
                {
                    action = Some(UiAction::SaveVideo(PathBuf::from(self.save_path.trim())));
                }
            });
            ui.add_space(8.0);

            if ui.button("Process Another Video").clicked() {
                action = Some(UiAction::StartOver);
            }
        });

        action
    }
}
