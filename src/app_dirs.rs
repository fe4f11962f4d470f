use directories::ProjectDirs;
use std::path::PathBuf;

const APP_NAME: &str = "flowtime";

/// Centralized application directory resolution
pub struct AppDirs;

impl AppDirs {
    /// `$HOME/.local/state/flowtime`, falling back to the platform data dir
    pub fn state_dir() -> Option<PathBuf> {
        if let Ok(home) = std::env::var("HOME") {
            Some(
                PathBuf::from(home)
                    .join(".local")
                    .join("state")
                    .join(APP_NAME),
            )
        } else {
            ProjectDirs::from("", "", APP_NAME)
                .map(|proj_dirs| proj_dirs.data_local_dir().to_path_buf())
        }
    }

    pub fn data_path() -> PathBuf {
        Self::state_dir()
            .map(|dir| dir.join("sessions.json"))
            .unwrap_or_else(|| PathBuf::from("flowtime_sessions.json"))
    }

    pub fn log_path() -> PathBuf {
        Self::state_dir()
            .map(|dir| dir.join("flowtime.log"))
            .unwrap_or_else(|| PathBuf::from("flowtime.log"))
    }

    pub fn config_path() -> PathBuf {
        ProjectDirs::from("", "", APP_NAME)
            .map(|pd| pd.config_dir().join("config.json"))
            .unwrap_or_else(|| PathBuf::from("flowtime_config.json"))
    }
}
