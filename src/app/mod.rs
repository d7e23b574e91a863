pub mod tracker_app;
pub mod views;

pub use tracker_app::TrackerApp;
