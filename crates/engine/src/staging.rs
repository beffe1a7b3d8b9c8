// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Moving files into and out of a run's working directory.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use sbx_adapters::FileStore;
use sbx_core::{CommandSpec, InputSource, OutputDecl, RunId};

use crate::error::StagingError;

/// Materialize every declared input file inside the working directory.
pub async fn stage_inputs(spec: &CommandSpec) -> Result<Vec<PathBuf>, StagingError> {
    let mut staged = Vec::with_capacity(spec.input_files().len());
    for (name, source) in spec.input_files() {
        let dest = spec
            .resolve(name)
            .map_err(|source| StagingError::InvalidPath { name: name.clone(), source })?;
        let io_err = |source| StagingError::Input { name: name.clone(), source };

        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(io_err)?;
        }
        match source {
            InputSource::Inline(content) => tokio::fs::write(&dest, content).await.map_err(io_err)?,
            InputSource::File(path) => {
                tokio::fs::copy(path, &dest).await.map_err(io_err)?;
            }
        }
        tracing::debug!(name = %name, path = %dest.display(), "staged input file");
        staged.push(dest);
    }
    Ok(staged)
}

/// Outcome of output collection.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Collected {
    /// Logical name (path relative to the working directory) to store key.
    pub files: BTreeMap<String, String>,
    /// Required declarations that matched nothing.
    pub missing: Vec<String>,
}

/// Copy declared outputs from the working directory into the file store.
///
/// Optional outputs that were never produced are skipped; required ones
/// are reported in [`Collected::missing`].
pub async fn collect_outputs(
    spec: &CommandSpec,
    run_id: &RunId,
    store: &dyn FileStore,
) -> Result<Collected, StagingError> {
    let mut collected = Collected::default();
    for decl in spec.output_files() {
        let matches = matching_files(spec, decl)?;
        if matches.is_empty() {
            if decl.required {
                collected.missing.push(decl.pattern.clone());
            } else {
                tracing::debug!(pattern = %decl.pattern, "optional output not produced");
            }
            continue;
        }
        for (name, path) in matches {
            if collected.files.contains_key(&name) {
                continue;
            }
            let stored = store.put(run_id, &name, &path).await?;
            collected.files.insert(name, stored.key);
        }
    }
    Ok(collected)
}

fn matching_files(spec: &CommandSpec, decl: &OutputDecl) -> Result<Vec<(String, PathBuf)>, StagingError> {
    let root = spec.working_dir();
    let target = spec
        .resolve(&decl.pattern)
        .map_err(|source| StagingError::InvalidPath { name: decl.pattern.clone(), source })?;

    let canonical_root = root
        .canonicalize()
        .map_err(|source| StagingError::Output { name: decl.pattern.clone(), source })?;

    if !decl.is_glob() {
        return Ok(if is_contained_file(&canonical_root, &target) {
            vec![(relative_name(root, &target), target)]
        } else {
            Vec::new()
        });
    }

    let pattern = root.join(&decl.pattern).to_string_lossy().into_owned();
    let paths = glob::glob(&pattern)
        .map_err(|e| StagingError::Pattern { pattern: decl.pattern.clone(), message: e.to_string() })?;
    let mut found = Vec::new();
    for entry in paths {
        match entry {
            Ok(path) if path.starts_with(root) && is_contained_file(&canonical_root, &path) => {
                found.push((relative_name(root, &path), path));
            }
            Ok(_) => {}
            Err(e) => tracing::warn!(pattern = %decl.pattern, error = %e, "unreadable path while collecting outputs"),
        }
    }
    Ok(found)
}

/// A regular file, not a symlink, whose real location is under `canonical_root`.
///
/// The working directory may be written by a container through a bind
/// mount, so links (including linked parent directories) can point anywhere
/// on the host.
fn is_contained_file(canonical_root: &Path, path: &Path) -> bool {
    let Ok(meta) = std::fs::symlink_metadata(path) else {
        return false;
    };
    if meta.file_type().is_symlink() {
        tracing::warn!(path = %path.display(), "skipping symlinked output");
        return false;
    }
    if !meta.is_file() {
        return false;
    }
    match path.canonicalize() {
        Ok(real) if real.starts_with(canonical_root) => true,
        Ok(real) => {
            tracing::warn!(path = %path.display(), real = %real.display(), "skipping output outside the working directory");
            false
        }
        Err(_) => false,
    }
}

fn relative_name(root: &Path, path: &Path) -> String {
    let relative = path.strip_prefix(root).unwrap_or(path);
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
#[path = "staging_tests.rs"]
mod tests;
