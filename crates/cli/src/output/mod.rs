//! Output formatting utilities
//!
//! Formatters for human-readable and JSON output, transfer progress bars and
//! interactive prompts.

mod formatter;
mod progress;
mod prompt;

pub use formatter::Formatter;
pub use progress::ProgressBar;
pub use prompt::Prompter;

/// Output configuration derived from CLI flags
#[derive(Debug, Clone, Default)]
pub struct OutputConfig {
    /// Use JSON output format
    pub json: bool,
    /// Disable colored output
    pub no_color: bool,
    /// Disable progress bar
    pub no_progress: bool,
    /// Suppress non-error output
    pub quiet: bool,
}
