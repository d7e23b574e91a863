use crate::app::views::{UiAction, View};
use crate::task::Task;

/// Third screen: live progress while the service works through the job.
pub struct ProcessingView<'a> {
    pub task: Option<&'a Task>,
}

impl View for ProcessingView<'_> {
    fn draw(&mut self, ui: &mut egui::Ui) -> Option<UiAction> {
        ui.vertical_centered(|ui| {
            ui.heading("Processing Video...");
            ui.add_space(8.0);
            ui.add(egui::Spinner::new().size(32.0));
            ui.add_space(8.0);

            if let Some(task) = self.task {
                if let Some(message) = &task.message {
                    ui.label(message);
                }
                if let Some(progress) = task.progress {
                    ui.add(
                        egui::ProgressBar::new((progress / 100.0) as f32)
                            .desired_width(400.0)
                            .show_percentage(),
                    );
                    ui.label(format!("{}% completed", progress.round()));
                }
                ui.add_space(8.0);
                ui.weak(format!("Task {} — {}", task.task_id, task.status));
            }
        });

        None
    }
}
