//! Headless dialog implementations for CLI and test use.

use std::path::PathBuf;

use async_trait::async_trait;

use drawbridge_core::error::Result;
use drawbridge_sync::collab::{OpenRequester, SaveRequester};

/// Accepts every save request by placing the export under a fixed
/// directory, using the suggested name.
pub struct DirectorySaveRequester {
    dir: PathBuf,
}

impl DirectorySaveRequester {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

#[async_trait]
impl SaveRequester for DirectorySaveRequester {
    async fn request_save(&self, suggested_name: &str) -> Result<Option<PathBuf>> {
        tokio::fs::create_dir_all(&self.dir).await?;
        Ok(Some(self.dir.join(suggested_name)))
    }
}

/// Resolves open requests from a preconfigured path when it matches the
/// requested extension filter. `None` behaves like a cancelled dialog.
pub struct StaticOpenRequester {
    path: Option<PathBuf>,
}

impl StaticOpenRequester {
    pub fn new(path: Option<PathBuf>) -> Self {
        Self { path }
    }
}

#[async_trait]
impl OpenRequester for StaticOpenRequester {
    async fn request_open(&self, extension: &str) -> Result<Option<PathBuf>> {
        Ok(self
            .path
            .clone()
            .filter(|p| p.extension().is_some_and(|ext| ext == extension)))
    }
}
