// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Storage for files collected from a run's working directory.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use sbx_core::{resolve_within, CommandError, RunId};
use thiserror::Error;

/// Errors from file store operations
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("invalid key `{key}`: {source}")]
    InvalidKey {
        key: String,
        #[source]
        source: CommandError,
    },

    #[error("no stored file for key `{0}`")]
    NotFound(String),

    #[error("failed to store `{key}`: {source}")]
    Io {
        key: String,
        #[source]
        source: std::io::Error,
    },
}

/// A file persisted by the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredFile {
    /// Caller-visible identifier, `<run_id>/<name>`.
    pub key: String,
    pub path: PathBuf,
}

/// Persists collected files and hands them back by key.
#[async_trait]
pub trait FileStore: Send + Sync {
    /// Copy `source` into the store under `<run_id>/<name>`.
    async fn put(&self, run_id: &RunId, name: &str, source: &Path) -> Result<StoredFile, StoreError>;

    /// Local path of a previously stored file.
    async fn get(&self, key: &str) -> Result<PathBuf, StoreError>;
}

/// File store rooted at a local directory.
#[derive(Debug, Clone)]
pub struct LocalFileStore {
    root: PathBuf,
}

impl LocalFileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn locate(&self, key: &str) -> Result<PathBuf, StoreError> {
        resolve_within(&self.root, key)
            .map_err(|source| StoreError::InvalidKey { key: key.to_string(), source })
    }
}

#[async_trait]
impl FileStore for LocalFileStore {
    async fn put(&self, run_id: &RunId, name: &str, source: &Path) -> Result<StoredFile, StoreError> {
        let key = format!("{run_id}/{name}");
        let dest = self.locate(&key)?;
        let io_err = |source| StoreError::Io { key: key.clone(), source };

        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(io_err)?;
        }
        let bytes = tokio::fs::copy(source, &dest).await.map_err(io_err)?;
        tracing::debug!(key = %key, bytes, "stored output file");
        Ok(StoredFile { key, path: dest })
    }

    async fn get(&self, key: &str) -> Result<PathBuf, StoreError> {
        let path = self.locate(key)?;
        match tokio::fs::metadata(&path).await {
            Ok(meta) if meta.is_file() => Ok(path),
            _ => Err(StoreError::NotFound(key.to_string())),
        }
    }
}

#[cfg(test)]
#[path = "file_store_tests.rs"]
mod tests;
