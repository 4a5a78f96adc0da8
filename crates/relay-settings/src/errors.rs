//! Settings errors.

/// Convenience alias for settings results.
pub type Result<T> = std::result::Result<T, SettingsError>;

/// Errors that can occur while loading settings.
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    /// Reading the settings file failed.
    #[error("failed to read settings file: {0}")]
    Io(#[from] std::io::Error),

    /// The settings file is not valid JSON or has wrong field types.
    #[error("failed to parse settings: {0}")]
    Parse(#[from] serde_json::Error),
}
