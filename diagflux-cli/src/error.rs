//! CLI-specific error types and exit code mapping

use diagflux_core::error::DiagfluxError;
use diagflux_pipeline::ImportError;

/// CLI-specific error type.
///
/// Each variant carries enough context for a user-friendly message.
/// The `exit_code()` method maps errors to standard Unix exit codes.
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// Configuration loading or validation failure.
    #[error("configuration error: {0}")]
    Config(String),

    /// A subcommand-specific operation failed.
    #[error("{0}")]
    Command(String),

    /// JSON serialisation failed during output rendering.
    #[error("json output error: {0}")]
    JsonSerialize(#[from] serde_json::Error),

    /// IO error (file read, stdout write, etc.).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Wrapped domain error from diagflux-core.
    #[error("{0}")]
    Core(#[from] DiagfluxError),

    /// Import run failed.
    #[error("import failed: {0}")]
    Import(#[from] ImportError),
}

impl CliError {
    /// Map the error to a process exit code.
    ///
    /// | Code | Meaning                              |
    /// |------|--------------------------------------|
    /// | 0    | Success                              |
    /// | 1    | General / command error              |
    /// | 2    | Configuration error                  |
    /// | 3    | Sink unreachable                     |
    /// | 10   | IO error                             |
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Config(_) | Self::Core(DiagfluxError::Config(_)) => 2,
            Self::Import(ImportError::Config { .. }) => 2,
            Self::Import(e) if e.is_fatal() => 3,
            Self::Core(e) if e.is_fatal() => 3,
            Self::Io(_) => 10,
            Self::JsonSerialize(_) | Self::Command(_) | Self::Core(_) | Self::Import(_) => 1,
        }
    }
}
