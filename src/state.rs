//! Shared state handed to every request handler.

use std::sync::Arc;

use crate::bigquery::TableUploader;
use crate::config::AppConfig;

/// Immutable for the life of the server; requests never write to it.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub uploader: Arc<dyn TableUploader>,
}

impl AppState {
    pub fn new(config: AppConfig, uploader: Arc<dyn TableUploader>) -> Self {
        Self {
            config: Arc::new(config),
            uploader,
        }
    }
}
