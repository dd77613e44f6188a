//! Configuration for prestage
//!
//! Configuration hierarchy:
//! 1. CLI flags (highest priority)
//! 2. Environment variables (PRESTAGE_*)
//! 3. Project config (prestage.toml at the project root)
//! 4. User config (~/.config/prestage/config.toml)
//! 5. Built-in defaults (lowest priority)

use std::fs;
use std::path::{Component, Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{PrestageError, PrestageResult};

/// Project config file name, looked up at the project root
pub const CONFIG_FILE: &str = "prestage.toml";

/// Non-fatal configuration warning surfaced to CLI users.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigWarning {
    pub key: String,
    pub file: PathBuf,
    pub line: Option<usize>,
    pub suggestion: Option<String>,
}

/// Staging and build-output paths, project-root relative
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    /// Directory produced by the front-end build
    #[serde(default = "default_build_output")]
    pub build_output: PathBuf,

    /// Directory consumed by the packaging step
    #[serde(default = "default_staging")]
    pub staging: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            build_output: default_build_output(),
            staging: default_staging(),
        }
    }
}

fn default_build_output() -> PathBuf {
    PathBuf::from("web/build")
}

fn default_staging() -> PathBuf {
    PathBuf::from("data")
}

/// Front-end build command configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildConfig {
    /// Shell command to run before staging; no command means nothing to run
    #[serde(default)]
    pub command: Option<String>,

    /// Working directory for the command, relative to the project root
    #[serde(default)]
    pub cwd: Option<PathBuf>,

    /// Config-level switch for the build step
    #[serde(default = "default_true")]
    pub enabled: bool,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            command: None,
            cwd: None,
            enabled: true,
        }
    }
}

fn default_true() -> bool {
    true
}

/// Top-level prestage configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub paths: PathsConfig,

    #[serde(default)]
    pub build: BuildConfig,
}

impl Config {
    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> PrestageResult<Self> {
        let (config, _warnings) = load_with_warnings(path)?;
        Ok(config)
    }

    /// Resolve the staging directory against the project root
    pub fn staging_dir(&self, project_root: &Path) -> PrestageResult<PathBuf> {
        resolve_under_root(project_root, &self.paths.staging)
    }

    /// Resolve the build-output directory against the project root
    pub fn build_output_dir(&self, project_root: &Path) -> PrestageResult<PathBuf> {
        resolve_under_root(project_root, &self.paths.build_output)
    }
}

/// Load configuration and collect non-fatal warnings (e.g. unknown keys).
pub fn load_with_warnings(path: &Path) -> PrestageResult<(Config, Vec<ConfigWarning>)> {
    let content = fs::read_to_string(path)?;

    let mut unknown_paths: Vec<String> = Vec::new();
    let deserializer = toml::de::Deserializer::new(&content);

    let config: Config = serde_ignored::deserialize(deserializer, |p| {
        unknown_paths.push(p.to_string());
    })
    .map_err(|e| PrestageError::InvalidConfig {
        file: path.to_path_buf(),
        message: e.to_string(),
    })?;

    let warnings = unknown_paths
        .into_iter()
        .map(|path_str| {
            let key = path_str
                .split('.')
                .next_back()
                .unwrap_or(path_str.as_str())
                .to_string();
            ConfigWarning {
                key: key.clone(),
                file: path.to_path_buf(),
                line: find_line_number(&content, &key),
                suggestion: suggest_key(&key),
            }
        })
        .collect();

    Ok((config, warnings))
}

/// Load from project config, user config, or defaults
pub fn load_or_default(project_root: &Path) -> (Config, Vec<ConfigWarning>) {
    let project_config = project_root.join(CONFIG_FILE);
    if project_config.exists() {
        if let Ok((config, warnings)) = load_with_warnings(&project_config) {
            return (with_env_overrides(config), warnings);
        }
    }

    if let Some(config_dir) = dirs::config_dir() {
        let user_config = config_dir.join("prestage/config.toml");
        if user_config.exists() {
            if let Ok((config, warnings)) = load_with_warnings(&user_config) {
                return (with_env_overrides(config), warnings);
            }
        }
    }

    (with_env_overrides(Config::default()), Vec::new())
}

/// Apply environment variable overrides (PRESTAGE_* prefix)
pub fn with_env_overrides(mut config: Config) -> Config {
    if let Ok(dir) = std::env::var("PRESTAGE_BUILD_OUTPUT") {
        if !dir.is_empty() {
            config.paths.build_output = PathBuf::from(dir);
        }
    }

    if let Ok(dir) = std::env::var("PRESTAGE_STAGING") {
        if !dir.is_empty() {
            config.paths.staging = PathBuf::from(dir);
        }
    }

    if let Ok(command) = std::env::var("PRESTAGE_BUILD_COMMAND") {
        if !command.is_empty() {
            config.build.command = Some(command);
        }
    }

    if let Ok(val) = std::env::var("PRESTAGE_SKIP_BUILD") {
        if val == "1" || val.eq_ignore_ascii_case("true") {
            config.build.enabled = false;
        }
    }

    config
}

/// Resolve a configured path against the project root, rejecting escapes.
///
/// Staging removal is recursive, so a path that climbs out of the project
/// root is refused before anything is deleted. Resolution is lexical - the
/// path does not need to exist yet.
pub fn resolve_under_root(root: &Path, path: &Path) -> PrestageResult<PathBuf> {
    if path.is_absolute() {
        if path.starts_with(root) {
            return Ok(path.to_path_buf());
        }
        return Err(PrestageError::PathEscape {
            path: path.to_path_buf(),
            root: root.to_path_buf(),
        });
    }

    let mut depth: i32 = 0;
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                depth -= 1;
                if depth < 0 {
                    return Err(PrestageError::PathEscape {
                        path: path.to_path_buf(),
                        root: root.to_path_buf(),
                    });
                }
                normalized.pop();
            }
            Component::Normal(part) => {
                depth += 1;
                normalized.push(part);
            }
            Component::RootDir | Component::Prefix(_) => {
                return Err(PrestageError::PathEscape {
                    path: path.to_path_buf(),
                    root: root.to_path_buf(),
                });
            }
        }
    }

    if normalized.as_os_str().is_empty() {
        // Resolving to the project root itself would make `clean` delete it
        return Err(PrestageError::PathEscape {
            path: path.to_path_buf(),
            root: root.to_path_buf(),
        });
    }

    Ok(root.join(normalized))
}

/// Template written by `prestage init`
pub const CONFIG_TEMPLATE: &str = r#"# prestage configuration
# https://github.com/prestage-cli/prestage

[paths]
# Directory produced by the front-end build
build_output = "web/build"
# Directory the packaging step reads the filesystem image from
staging = "data"

[build]
# Front-end build command, run before staging (remove to disable)
command = "npm run build"
# Working directory for the build command
cwd = "web"
"#;

fn find_line_number(content: &str, needle: &str) -> Option<usize> {
    for (i, line) in content.lines().enumerate() {
        if line.contains(needle) {
            return Some(i + 1);
        }
    }
    None
}

fn suggest_key(unknown: &str) -> Option<String> {
    const CANDIDATES: &[&str] = &[
        "paths",
        "build_output",
        "staging",
        "build",
        "command",
        "cwd",
        "enabled",
    ];

    let mut best: Option<(&str, usize)> = None;
    for candidate in CANDIDATES {
        let dist = levenshtein(unknown, candidate);
        best = match best {
            None => Some((candidate, dist)),
            Some((_, best_dist)) if dist < best_dist => Some((candidate, dist)),
            Some(current) => Some(current),
        };
    }

    match best {
        Some((candidate, dist)) if dist <= 2 => Some(candidate.to_string()),
        _ => None,
    }
}

fn levenshtein(a: &str, b: &str) -> usize {
    if a == b {
        return 0;
    }

    let a_bytes = a.as_bytes();
    let b_bytes = b.as_bytes();

    let mut prev: Vec<usize> = (0..=b_bytes.len()).collect();
    let mut curr = vec![0usize; b_bytes.len() + 1];

    for (i, &ac) in a_bytes.iter().enumerate() {
        curr[0] = i + 1;
        for (j, &bc) in b_bytes.iter().enumerate() {
            let cost = if ac == bc { 0 } else { 1 };
            curr[j + 1] =
                std::cmp::min(std::cmp::min(prev[j + 1] + 1, curr[j] + 1), prev[j] + cost);
        }
        prev.clone_from_slice(&curr);
    }

    prev[b_bytes.len()]
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn defaults_match_template_paths() {
        let config = Config::default();
        assert_eq!(config.paths.build_output, PathBuf::from("web/build"));
        assert_eq!(config.paths.staging, PathBuf::from("data"));
        assert!(config.build.command.is_none());
        assert!(config.build.enabled);
    }

    #[test]
    fn load_full_config() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        fs::write(
            &path,
            r#"
[paths]
build_output = "frontend/dist"
staging = "image/data"

[build]
command = "yarn build"
cwd = "frontend"
enabled = false
"#,
        )
        .unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.paths.build_output, PathBuf::from("frontend/dist"));
        assert_eq!(config.paths.staging, PathBuf::from("image/data"));
        assert_eq!(config.build.command.as_deref(), Some("yarn build"));
        assert_eq!(config.build.cwd, Some(PathBuf::from("frontend")));
        assert!(!config.build.enabled);
    }

    #[test]
    fn load_partial_config_fills_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        fs::write(&path, "[paths]\nstaging = \"spiffs\"\n").unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.paths.staging, PathBuf::from("spiffs"));
        assert_eq!(config.paths.build_output, PathBuf::from("web/build"));
        assert!(config.build.command.is_none());
    }

    #[test]
    fn invalid_toml_is_invalid_config() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        fs::write(&path, "[paths\nstaging = 3").unwrap();

        let err = Config::load(&path).unwrap_err();
        assert!(matches!(err, PrestageError::InvalidConfig { .. }));
    }

    #[test]
    fn unknown_key_warns_with_suggestion() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        fs::write(&path, "[paths]\nstagging = \"data\"\n").unwrap();

        let (_, warnings) = load_with_warnings(&path).unwrap();
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].key, "stagging");
        assert_eq!(warnings[0].suggestion.as_deref(), Some("staging"));
        assert_eq!(warnings[0].line, Some(2));
    }

    #[test]
    fn unknown_key_without_close_match_has_no_suggestion() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        fs::write(&path, "completely_unrelated = 1\n").unwrap();

        let (_, warnings) = load_with_warnings(&path).unwrap();
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].suggestion.is_none());
    }

    #[test]
    fn template_parses_cleanly() {
        let deserializer = toml::de::Deserializer::new(CONFIG_TEMPLATE);
        let mut unknown = Vec::new();
        let config: Config = serde_ignored::deserialize(deserializer, |p| {
            unknown.push(p.to_string());
        })
        .unwrap();

        assert!(unknown.is_empty(), "template has unknown keys: {unknown:?}");
        assert_eq!(config.build.command.as_deref(), Some("npm run build"));
    }

    #[test]
    fn resolve_relative_path() {
        let root = Path::new("/project");
        let resolved = resolve_under_root(root, Path::new("web/build")).unwrap();
        assert_eq!(resolved, PathBuf::from("/project/web/build"));
    }

    #[test]
    fn resolve_normalizes_dot_segments() {
        let root = Path::new("/project");
        let resolved = resolve_under_root(root, Path::new("./web/../data")).unwrap();
        assert_eq!(resolved, PathBuf::from("/project/data"));
    }

    #[test]
    fn resolve_rejects_escape() {
        let root = Path::new("/project");
        let err = resolve_under_root(root, Path::new("../outside")).unwrap_err();
        assert!(matches!(err, PrestageError::PathEscape { .. }));
    }

    #[test]
    fn resolve_rejects_project_root_itself() {
        let root = Path::new("/project");
        let err = resolve_under_root(root, Path::new("web/..")).unwrap_err();
        assert!(matches!(err, PrestageError::PathEscape { .. }));
    }

    #[test]
    fn resolve_rejects_absolute_outside_root() {
        let root = Path::new("/project");
        let err = resolve_under_root(root, Path::new("/etc")).unwrap_err();
        assert!(matches!(err, PrestageError::PathEscape { .. }));
    }

    #[test]
    fn resolve_accepts_absolute_inside_root() {
        let root = Path::new("/project");
        let resolved = resolve_under_root(root, Path::new("/project/data")).unwrap();
        assert_eq!(resolved, PathBuf::from("/project/data"));
    }
}
