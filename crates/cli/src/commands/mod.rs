pub mod chat;
pub mod history;
pub mod init;
pub mod sessions;

use fitcoach_config::AppConfig;
use std::path::Path;

/// Load configuration, turning failures into a readable message.
pub fn load_config(path: Option<&Path>) -> Result<AppConfig, Box<dyn std::error::Error>> {
    AppConfig::load_with(path).map_err(|e| format!("Failed to load config: {e}").into())
}
