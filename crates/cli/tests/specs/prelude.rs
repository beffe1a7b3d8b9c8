// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Helpers shared by the CLI specs.

use std::path::{Path, PathBuf};

use tempfile::TempDir;

/// Isolated directories for one spec: config, file store, work root.
pub struct Sandbox {
    dir: TempDir,
}

impl Sandbox {
    pub fn new() -> Self {
        let dir = TempDir::new().unwrap();
        for sub in ["store", "work", "logs"] {
            std::fs::create_dir_all(dir.path().join(sub)).unwrap();
        }
        Self { dir }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn store(&self) -> PathBuf {
        self.path().join("store")
    }

    pub fn work(&self) -> PathBuf {
        self.path().join("work")
    }

    pub fn logs(&self) -> PathBuf {
        self.path().join("logs")
    }

    /// Write a file relative to the sandbox and return its path.
    pub fn file(&self, rel: &str, content: &str) -> PathBuf {
        let path = self.path().join(rel);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(&path, content).unwrap();
        path
    }

    /// `sbx` with a clean, sandboxed environment.
    pub fn sbx(&self) -> Cmd {
        let mut cmd = assert_cmd::Command::new(env!("CARGO_BIN_EXE_sbx"));
        cmd.env_clear()
            .env("PATH", std::env::var("PATH").unwrap_or_default())
            .env("HOME", self.path())
            .env("XDG_CONFIG_HOME", self.path().join("xdg"))
            .env("SBX_STORE_DIR", self.store())
            .env("SBX_WORK_ROOT", self.work())
            .env("SBX_LOG", "warn")
            .env("NO_COLOR", "1");
        Cmd { cmd }
    }
}

pub struct Cmd {
    cmd: assert_cmd::Command,
}

impl Cmd {
    pub fn args(mut self, args: &[&str]) -> Self {
        self.cmd.args(args);
        self
    }

    pub fn env(mut self, key: &str, value: impl AsRef<std::ffi::OsStr>) -> Self {
        self.cmd.env(key, value);
        self
    }

    fn output(mut self) -> Output {
        let out = self.cmd.output().unwrap();
        Output {
            code: out.status.code(),
            stdout: String::from_utf8_lossy(&out.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&out.stderr).into_owned(),
        }
    }

    /// Run and assert exit code 0.
    pub fn passes(self) -> Output {
        self.exits(0)
    }

    /// Run and assert a specific exit code.
    pub fn exits(self, code: i32) -> Output {
        let out = self.output();
        assert_eq!(out.code, Some(code), "unexpected exit code\nstdout:\n{}\nstderr:\n{}", out.stdout, out.stderr);
        out
    }
}

pub struct Output {
    code: Option<i32>,
    stdout: String,
    stderr: String,
}

impl Output {
    pub fn stderr(&self) -> &str {
        &self.stderr
    }

    pub fn stdout_has(self, needle: &str) -> Self {
        assert!(self.stdout.contains(needle), "stdout missing {needle:?}:\n{}", self.stdout);
        self
    }

    pub fn stderr_has(self, needle: &str) -> Self {
        assert!(self.stderr.contains(needle), "stderr missing {needle:?}:\n{}", self.stderr);
        self
    }

    pub fn json(&self) -> serde_json::Value {
        serde_json::from_str(&self.stdout).unwrap_or_else(|e| panic!("invalid json ({e}):\n{}", self.stdout))
    }
}
