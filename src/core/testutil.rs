//! Shared test doubles for pipeline unit tests.

use crate::adapters::github::DEFAULT_API_BASE;
use crate::core::{ConfigProvider, Storage};
use crate::utils::error::{EtlError, Result};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

#[derive(Clone)]
pub(crate) struct MockStorage {
    files: Arc<Mutex<HashMap<String, Vec<u8>>>>,
}

impl MockStorage {
    pub(crate) fn new() -> Self {
        Self {
            files: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub(crate) async fn get_file(&self, path: &str) -> Option<Vec<u8>> {
        let files = self.files.lock().await;
        files.get(path).cloned()
    }

    pub(crate) async fn put_file(&self, path: &str, data: &[u8]) {
        let mut files = self.files.lock().await;
        files.insert(path.to_string(), data.to_vec());
    }
}

impl Storage for MockStorage {
    async fn read_file(&self, path: &str) -> Result<Vec<u8>> {
        let files = self.files.lock().await;
        files.get(path).cloned().ok_or_else(|| {
            EtlError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("File not found: {}", path),
            ))
        })
    }

    async fn write_file(&self, path: &str, data: &[u8]) -> Result<()> {
        let mut files = self.files.lock().await;
        files.insert(path.to_string(), data.to_vec());
        Ok(())
    }
}

#[derive(Clone, Default)]
pub(crate) struct MockConfig {
    pub api_base: String,
    pub output_path: String,
}

impl ConfigProvider for MockConfig {
    fn api_base(&self) -> &str {
        if self.api_base.is_empty() {
            DEFAULT_API_BASE
        } else {
            &self.api_base
        }
    }

    fn repo(&self) -> &str {
        "google/xls"
    }

    fn filter_repo(&self) -> &str {
        "xlsynth/xlsynth"
    }

    fn watch_label(&self) -> &str {
        "reviewing internally"
    }

    fn output_path(&self) -> &str {
        if self.output_path.is_empty() {
            "test_output"
        } else {
            &self.output_path
        }
    }

    fn token(&self) -> Option<String> {
        Some("test-token".to_string())
    }
}
