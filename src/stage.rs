//! Staging directory replacement - the hook core
//!
//! One linear sequence per invocation: optionally run the front-end build,
//! delete the staging directory, recursively copy the build output into its
//! place. Each step is fatal on failure and nothing is rolled back; the
//! packaging orchestrator owns overall failure reporting.

use std::fs;
use std::path::{Path, PathBuf};

use filetime::FileTime;
use walkdir::WalkDir;

use crate::build::BuildCommand;
use crate::config::Config;
use crate::error::{PrestageError, PrestageResult};

/// Options for a hook run
#[derive(Debug, Clone, Default)]
pub struct StageOptions {
    /// Skip the front-end build step even if one is configured
    pub skip_build: bool,
    /// Report the plan without touching the filesystem
    pub dry_run: bool,
    /// JSON output mode - silences build tool stdout
    pub json: bool,
}

/// Counters from a recursive copy
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CopyStats {
    pub files: usize,
    pub dirs: usize,
    pub symlinks: usize,
    pub bytes: u64,
}

/// What a hook run did (or, under --dry-run, would do)
#[derive(Debug, Clone)]
pub struct StageOutcome {
    pub build_ran: bool,
    pub staging_removed: bool,
    pub stats: CopyStats,
}

/// Progress events emitted while the hook runs
#[derive(Debug, Clone)]
pub enum HookEvent {
    BuildStarted { command: String },
    BuildFinished,
    StagingRemoved { path: PathBuf, existed: bool },
    CopyStarted { from: PathBuf, to: PathBuf },
    CopyFinished { stats: CopyStats },
}

/// Execute the pre-package hook sequence: build, clean, copy.
///
/// Order matters and is part of the contract: a failed build leaves the
/// staging directory untouched, while a missing build output leaves it
/// deleted - the packaging step must never see stale or merged content.
pub fn run_hook<F>(
    project_root: &Path,
    config: &Config,
    options: &StageOptions,
    mut on_event: F,
) -> PrestageResult<StageOutcome>
where
    F: FnMut(HookEvent),
{
    // Resolve (and escape-check) both paths before any side effect
    let staging = config.staging_dir(project_root)?;
    let build_output = config.build_output_dir(project_root)?;

    let build = if options.skip_build {
        None
    } else {
        BuildCommand::from_config(&config.build, project_root)
    };

    let build_ran = match build {
        Some(build) => {
            on_event(HookEvent::BuildStarted {
                command: build.command.clone(),
            });
            if !options.dry_run {
                build.run(options.json)?;
                on_event(HookEvent::BuildFinished);
            }
            true
        }
        None => false,
    };

    if options.dry_run {
        let existed = staging.exists();
        on_event(HookEvent::StagingRemoved {
            path: staging.clone(),
            existed,
        });
        on_event(HookEvent::CopyStarted {
            from: build_output.clone(),
            to: staging.clone(),
        });
        let stats = count_tree(&build_output)?;
        on_event(HookEvent::CopyFinished { stats });
        return Ok(StageOutcome {
            build_ran,
            staging_removed: existed,
            stats,
        });
    }

    let staging_removed = clean_staging(&staging)?;
    on_event(HookEvent::StagingRemoved {
        path: staging.clone(),
        existed: staging_removed,
    });

    on_event(HookEvent::CopyStarted {
        from: build_output.clone(),
        to: staging.clone(),
    });
    let stats = copy_tree(&build_output, &staging)?;
    on_event(HookEvent::CopyFinished { stats });

    Ok(StageOutcome {
        build_ran,
        staging_removed,
        stats,
    })
}

/// Delete the staging directory recursively.
///
/// Returns `Ok(false)` if there was nothing to delete - a missing staging
/// directory is an already-satisfied precondition, not an error.
pub fn clean_staging(staging: &Path) -> PrestageResult<bool> {
    match fs::symlink_metadata(staging) {
        Ok(meta) if meta.is_dir() => {
            fs::remove_dir_all(staging)?;
            Ok(true)
        }
        Ok(_) => {
            // A stray file or symlink where the staging dir should be
            fs::remove_file(staging)?;
            Ok(true)
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e.into()),
    }
}

/// Recursively copy `src` into `dst`, preserving permission bits and
/// modification times. Symlinks are recreated, never followed.
///
/// `dst` must not exist; the caller deletes it first. There is no merge
/// semantics anywhere in this function.
pub fn copy_tree(src: &Path, dst: &Path) -> PrestageResult<CopyStats> {
    let src_meta = fs::metadata(src).map_err(|_| PrestageError::BuildOutputMissing {
        path: src.to_path_buf(),
    })?;
    if !src_meta.is_dir() {
        return Err(PrestageError::BuildOutputMissing {
            path: src.to_path_buf(),
        });
    }

    let mut stats = CopyStats::default();
    // Directory attributes are restored after their contents are written,
    // deepest first: writing children bumps the parent mtime, and a
    // read-only directory mode would block the writes themselves.
    let mut dir_attrs: Vec<(PathBuf, fs::Metadata)> = Vec::new();

    for entry in WalkDir::new(src).follow_links(false) {
        let entry = entry.map_err(io_from_walkdir)?;
        let rel = entry
            .path()
            .strip_prefix(src)
            .expect("walkdir yields paths under its root");
        let target = dst.join(rel);
        let meta = entry.metadata().map_err(io_from_walkdir)?;

        if entry.file_type().is_dir() {
            fs::create_dir_all(&target)?;
            dir_attrs.push((target, meta));
            stats.dirs += 1;
        } else if entry.file_type().is_symlink() {
            copy_symlink(entry.path(), &target)?;
            stats.symlinks += 1;
        } else {
            stats.bytes += fs::copy(entry.path(), &target)?;
            filetime::set_file_mtime(&target, FileTime::from_last_modification_time(&meta))?;
            stats.files += 1;
        }
    }

    for (dir, meta) in dir_attrs.iter().rev() {
        copy_permissions(meta, dir)?;
        filetime::set_file_mtime(dir, FileTime::from_last_modification_time(meta))?;
    }

    Ok(stats)
}

/// Walk a tree and count what a copy would transfer (dry-run reporting)
fn count_tree(src: &Path) -> PrestageResult<CopyStats> {
    if !src.is_dir() {
        return Err(PrestageError::BuildOutputMissing {
            path: src.to_path_buf(),
        });
    }

    let mut stats = CopyStats::default();
    for entry in WalkDir::new(src).follow_links(false) {
        let entry = entry.map_err(io_from_walkdir)?;
        if entry.file_type().is_dir() {
            stats.dirs += 1;
        } else if entry.file_type().is_symlink() {
            stats.symlinks += 1;
        } else {
            stats.bytes += entry.metadata().map_err(io_from_walkdir)?.len();
            stats.files += 1;
        }
    }
    Ok(stats)
}

#[cfg(unix)]
fn copy_permissions(meta: &fs::Metadata, target: &Path) -> PrestageResult<()> {
    use std::os::unix::fs::PermissionsExt;
    let perms = fs::Permissions::from_mode(meta.permissions().mode());
    fs::set_permissions(target, perms)?;
    Ok(())
}

#[cfg(not(unix))]
fn copy_permissions(_meta: &fs::Metadata, _target: &Path) -> PrestageResult<()> {
    Ok(())
}

#[cfg(unix)]
fn copy_symlink(source: &Path, target: &Path) -> PrestageResult<()> {
    let link = fs::read_link(source)?;
    std::os::unix::fs::symlink(link, target)?;
    Ok(())
}

#[cfg(not(unix))]
fn copy_symlink(source: &Path, target: &Path) -> PrestageResult<()> {
    // No symlink support without extra privileges; copy the bytes instead
    let resolved = fs::read_link(source)?;
    let origin = source.parent().map(|p| p.join(&resolved)).unwrap_or(resolved);
    fs::copy(&origin, target)?;
    Ok(())
}

fn io_from_walkdir(e: walkdir::Error) -> PrestageError {
    PrestageError::Io(e.into())
}
