//! CLI error types.

use std::fmt;

use floortrack::config::ConfigError;
use floortrack::log::LogError;
use floortrack::registry::RegistryError;

/// Errors surfaced to the terminal.
#[derive(Debug)]
pub enum CliError {
    /// Scene document could not be loaded or validated.
    Scene(ConfigError),

    /// Engine could not be constructed from the scene.
    Engine(RegistryError),

    /// Logging setup failed.
    Log(LogError),

    /// Everything else: signal handlers, runtime creation, bad flags.
    Config(String),
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::Scene(e) => write!(f, "Invalid scene configuration: {}", e),
            CliError::Engine(e) => write!(f, "Failed to start engine: {}", e),
            CliError::Log(e) => write!(f, "Failed to set up logging: {}", e),
            CliError::Config(msg) => write!(f, "Configuration error: {}", msg),
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::Scene(e) => Some(e),
            CliError::Engine(e) => Some(e),
            CliError::Log(e) => Some(e),
            CliError::Config(_) => None,
        }
    }
}

impl From<ConfigError> for CliError {
    fn from(e: ConfigError) -> Self {
        CliError::Scene(e)
    }
}

impl From<RegistryError> for CliError {
    fn from(e: RegistryError) -> Self {
        CliError::Engine(e)
    }
}

impl From<LogError> for CliError {
    fn from(e: LogError) -> Self {
        CliError::Log(e)
    }
}
