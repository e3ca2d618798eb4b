use thiserror::Error;

use crate::export::ExportError;
use crate::network::NetworkError;
use crate::search::SearchError;
use crate::settings::SettingsError;
use crate::storage::StorageError;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("failed to initialize logging: {0}")]
    LoggingInit(String),
    #[error("runtime error: {0}")]
    Runtime(String),
    #[error(transparent)]
    Settings(#[from] SettingsError),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Network(#[from] NetworkError),
    #[error(transparent)]
    Export(#[from] ExportError),
    #[error(transparent)]
    Search(#[from] SearchError),
}
