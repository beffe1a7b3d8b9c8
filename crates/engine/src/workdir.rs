// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-run working directories.

use std::path::Path;

use sbx_core::RunId;
use tempfile::TempDir;

use crate::error::StagingError;

/// A fresh directory exclusive to one run, removed on drop unless kept.
#[derive(Debug)]
pub struct WorkingDir {
    dir: TempDir,
    keep: bool,
}

impl WorkingDir {
    /// Create `<root>/<run_id>-XXXXXX`, using the system temp dir when no
    /// root is given.
    pub fn create(root: Option<&Path>, run_id: &RunId, keep: bool) -> Result<Self, StagingError> {
        let prefix = format!("{run_id}-");
        let mut builder = tempfile::Builder::new();
        builder.prefix(&prefix).keep(keep);
        let dir = match root {
            Some(root) => {
                std::fs::create_dir_all(root).map_err(StagingError::WorkingDir)?;
                builder.tempdir_in(root)
            }
            None => builder.tempdir(),
        }
        .map_err(StagingError::WorkingDir)?;
        tracing::debug!(run_id = %run_id, path = %dir.path().display(), keep, "created working directory");
        Ok(Self { dir, keep })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn is_kept(&self) -> bool {
        self.keep
    }
}

#[cfg(test)]
#[path = "workdir_tests.rs"]
mod tests;
