pub mod editor;
pub mod error;
pub mod export;
pub mod metrics;
pub mod network;
pub mod render;
pub mod search;
mod secure_storage;
pub mod settings;
pub mod state;
pub mod stats;
pub mod storage;
pub mod terminal;
mod utils;

use tracing_subscriber::EnvFilter;

pub use editor::{EditorController, EditorEvent, EditorHandle, EditorView};
pub use error::AppError;
pub use network::{Checker, Issue, IssueCategory, LanguageToolClient, LanguageToolConfig};
pub use settings::EditorSettings;

const DEFAULT_LOG_FILTER: &str = "info";

/// Installs the global subscriber. Honors `RUST_LOG`, falling back to `info`.
/// Output goes to stderr so it never interleaves with rendered documents.
pub fn init_logging() -> Result<(), AppError> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    tracing_subscriber::fmt()
        .with_target(false)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .try_init()
        .map_err(|err| AppError::LoggingInit(err.to_string()))
}
