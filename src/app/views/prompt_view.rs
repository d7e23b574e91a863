use crate::app::views::{success_banner, UiAction, View};

/// Second screen: confirm the upload and collect the object description.
pub struct PromptView<'a> {
    pub file_name: &'a str,
    pub prompt: &'a mut String,
    pub is_processing: bool,
}

impl View for PromptView<'_> {
    fn draw(&mut self, ui: &mut egui::Ui) -> Option<UiAction> {
        let mut action = None;

        ui.vertical_centered(|ui| {
            success_banner(
                ui,
                &format!("Video \"{}\" uploaded successfully!", self.file_name),
            );
            ui.add_space(12.0);

            ui.heading("Describe the object you want to track:");
            ui.add(
                egui::TextEdit::singleline(self.prompt)
                    .hint_text("e.g., cat, person, car, dog")
                    .desired_width(360.0),
            );
            ui.add_space(8.0);

            let ready = !self.prompt.trim().is_empty() && !self.is_processing;
            let label = if self.is_processing {
                "Starting..."
            } else {
                "Start Tracking"
            };
            if ui.add_enabled(ready, egui::Button::new(label)).clicked() {
                action = Some(UiAction::StartTracking);
            }
        });

        action
    }
}
