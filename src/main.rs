use tracing::Level;

use trackbot_rust::app::TrackerApp;
use trackbot_rust::config::Settings;
use trackbot_rust::error::TrackerError;

fn init_logging() {
    tracing_subscriber::fmt().with_max_level(Level::INFO).init();
}

#[tokio::main]
async fn main() -> Result<(), TrackerError> {
    init_logging();
    let settings = Settings::load()?;
    TrackerApp::start_gui(settings)
}
