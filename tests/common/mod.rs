//! Common test utilities for prestage integration tests.
//!
//! Provides `TestEnv`, an isolated temp project with helpers to write
//! fixtures and run the prestage binary.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;

/// Result of running a prestage CLI command
#[derive(Debug)]
pub struct TestResult {
    pub success: bool,
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl TestResult {
    /// Combine stdout and stderr
    pub fn combined_output(&self) -> String {
        format!("{}\n{}", self.stdout, self.stderr)
    }
}

/// Isolated test environment: temp project root plus temp home,
/// so no user-level config or PRESTAGE_* leakage reaches the binary.
pub struct TestEnv {
    pub project_root: TempDir,
    pub home_dir: TempDir,
}

impl TestEnv {
    pub fn new() -> Self {
        Self {
            project_root: TempDir::new().expect("create project tempdir"),
            home_dir: TempDir::new().expect("create home tempdir"),
        }
    }

    /// Get path relative to project root
    pub fn project_path(&self, relative: &str) -> PathBuf {
        self.project_root.path().join(relative)
    }

    /// Write prestage.toml at the project root
    pub fn write_config(&self, content: &str) {
        std::fs::write(self.project_path("prestage.toml"), content)
            .expect("write prestage.toml");
    }

    /// Write a file under the project root, creating parent directories
    pub fn write_file(&self, relative: &str, content: &str) {
        let path = self.project_path(relative);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("create parent dirs");
        }
        std::fs::write(path, content).expect("write file");
    }

    /// Read a file under the project root
    pub fn read_file(&self, relative: &str) -> String {
        std::fs::read_to_string(self.project_path(relative)).expect("read file")
    }

    /// Write the canonical two-file front-end build output fixture
    pub fn write_build_output(&self) {
        self.write_file("web/build/index.html", "<html>app</html>");
        self.write_file("web/build/static/app.js", "console.log(1);");
    }

    /// Run prestage in this environment from the project root
    pub fn run(&self, args: &[&str]) -> TestResult {
        self.run_with_env(args, &[])
    }

    /// Run prestage from the project root with extra env vars
    pub fn run_with_env(&self, args: &[&str], env_vars: &[(&str, &str)]) -> TestResult {
        let mut cmd = Command::new(env!("CARGO_BIN_EXE_prestage"));
        cmd.current_dir(self.project_root.path())
            .args(args)
            .env("HOME", self.home_dir.path())
            .env("XDG_CONFIG_HOME", self.home_dir.path().join(".config"))
            .env_remove("PRESTAGE_BUILD_OUTPUT")
            .env_remove("PRESTAGE_STAGING")
            .env_remove("PRESTAGE_BUILD_COMMAND")
            .env_remove("PRESTAGE_SKIP_BUILD");

        for (key, value) in env_vars {
            cmd.env(key, value);
        }

        let output = cmd.output().expect("failed to execute prestage");
        output_to_result(output)
    }
}

fn output_to_result(output: Output) -> TestResult {
    TestResult {
        success: output.status.success(),
        exit_code: output.status.code().unwrap_or(-1),
        stdout: String::from_utf8_lossy(&output.stdout).to_string(),
        stderr: String::from_utf8_lossy(&output.stderr).to_string(),
    }
}

/// Collect sorted relative paths of everything under `root` (files and dirs)
pub fn list_rel_paths(root: &Path) -> Vec<String> {
    fn walk(root: &Path, dir: &Path, out: &mut Vec<String>) {
        for entry in std::fs::read_dir(dir).expect("read_dir") {
            let entry = entry.expect("dir entry");
            let path = entry.path();
            let rel = path
                .strip_prefix(root)
                .expect("entry under root")
                .to_string_lossy()
                .replace('\\', "/");
            out.push(rel);
            if entry.file_type().expect("file type").is_dir() {
                walk(root, &path, out);
            }
        }
    }

    let mut out = Vec::new();
    walk(root, root, &mut out);
    out.sort();
    out
}
