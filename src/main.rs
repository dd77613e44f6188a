//! Prestage CLI - pre-package staging hook
//!
//! Usage: prestage <COMMAND>
//!
//! Commands:
//!   run     Run the pre-package hook (build, clean, copy)
//!   clean   Remove the staging directory
//!   verify  Check that staging matches the build output
//!   init    Write a starter prestage.toml

use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::{Parser, Subcommand};

/// Prestage - pre-package staging hook
#[derive(Parser, Debug)]
#[command(name = "prestage")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Output machine-readable JSON events
    #[arg(long, default_value = "false")]
    json: bool,

    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the pre-package hook: build front-end, clean staging, copy fresh output
    Run {
        /// Project root directory
        #[arg(short, long, default_value = ".")]
        project: PathBuf,

        /// Skip the front-end build step even if one is configured
        #[arg(long)]
        no_build: bool,

        /// Report the plan without touching the filesystem
        #[arg(long)]
        dry_run: bool,
    },

    /// Remove the staging directory (missing directory is not an error)
    Clean {
        /// Project root directory
        #[arg(short, long, default_value = ".")]
        project: PathBuf,

        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,

        /// Show what would be removed without deleting
        #[arg(long)]
        dry_run: bool,
    },

    /// Check that staging is byte-identical to the build output (exits non-zero on drift)
    Verify {
        /// Project root directory
        #[arg(short, long, default_value = ".")]
        project: PathBuf,
    },

    /// Write a starter prestage.toml to the project root
    Init {
        /// Project root directory
        #[arg(short, long, default_value = ".")]
        project: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            project,
            no_build,
            dry_run,
        } => cmd_run(&project, no_build, dry_run, cli.json, cli.verbose),
        Commands::Clean {
            project,
            yes,
            dry_run,
        } => cmd_clean(&project, yes, dry_run, cli.json),
        Commands::Verify { project } => cmd_verify(&project, cli.json),
        Commands::Init { project } => cmd_init(&project, cli.json),
    }
}

fn print_config_warnings(warnings: &[prestage::ConfigWarning]) {
    for w in warnings {
        if let Some(line) = w.line {
            eprintln!("⚠ Unknown config key '{}' in {}:{}", w.key, w.file.display(), line);
        } else {
            eprintln!("⚠ Unknown config key '{}' in {}", w.key, w.file.display());
        }

        if let Some(suggestion) = &w.suggestion {
            eprintln!("   Did you mean '{}'?\n", suggestion);
        }
    }
}

fn cmd_run(project: &Path, no_build: bool, dry_run: bool, json: bool, verbose: u8) -> Result<()> {
    use prestage::{HookEvent, StageOptions};

    let (config, warnings) = prestage::load_or_default(project);
    print_config_warnings(&warnings);

    if !json {
        println!("📦 Prestage Run");
        println!("Project: {}", project.display());
        if verbose > 0 {
            println!("Build output: {}", config.paths.build_output.display());
            println!("Staging: {}", config.paths.staging.display());
        }
        if dry_run {
            println!("Mode: Dry run");
        }
        if no_build {
            println!("Mode: Skipping front-end build");
        }
        println!();
    }

    let options = StageOptions {
        skip_build: no_build,
        dry_run,
        json,
    };

    let outcome = prestage::run_hook(project, &config, &options, |event| {
        if json {
            let line = match event {
                HookEvent::BuildStarted { command } => {
                    serde_json::json!({"event": "build_started", "command": command})
                }
                HookEvent::BuildFinished => serde_json::json!({"event": "build_finished"}),
                HookEvent::StagingRemoved { path, existed } => serde_json::json!({
                    "event": "staging_removed",
                    "path": path.display().to_string(),
                    "existed": existed,
                }),
                HookEvent::CopyStarted { from, to } => serde_json::json!({
                    "event": "copy_started",
                    "from": from.display().to_string(),
                    "to": to.display().to_string(),
                }),
                HookEvent::CopyFinished { stats } => serde_json::json!({
                    "event": "copy_finished",
                    "files": stats.files,
                    "dirs": stats.dirs,
                    "symlinks": stats.symlinks,
                    "bytes": stats.bytes,
                }),
            };
            println!("{line}");
        } else {
            match event {
                HookEvent::BuildStarted { command } => {
                    if dry_run {
                        println!("🔨 Would build front-end: {command}");
                    } else {
                        println!("🔨 Building front-end: {command}");
                    }
                }
                HookEvent::BuildFinished => {
                    println!("✓ Front-end build finished");
                }
                HookEvent::StagingRemoved { path, existed } => {
                    if existed && dry_run {
                        println!("🗑  Would remove stale staging: {}", path.display());
                    } else if existed {
                        println!("🗑  Removed stale staging: {}", path.display());
                    } else {
                        println!("✓ No stale staging to remove");
                    }
                }
                HookEvent::CopyStarted { from, to } => {
                    if dry_run {
                        println!("📁 Would copy {} to {}", from.display(), to.display());
                    } else {
                        println!("📁 Copying {} to {}", from.display(), to.display());
                    }
                }
                HookEvent::CopyFinished { stats } => {
                    if !dry_run {
                        println!(
                            "✓ Copied {} files ({} bytes) in {} directories",
                            stats.files, stats.bytes, stats.dirs
                        );
                    }
                }
            }
        }
    })?;

    if json {
        let output = serde_json::json!({
            "event": "run_complete",
            "dry_run": dry_run,
            "build_ran": outcome.build_ran,
            "staging_removed": outcome.staging_removed,
            "files": outcome.stats.files,
            "bytes": outcome.stats.bytes,
        });
        println!("{}", serde_json::to_string(&output)?);
    } else {
        println!();
        if dry_run {
            println!(
                "Dry run: would stage {} files ({} bytes)",
                outcome.stats.files, outcome.stats.bytes
            );
        } else {
            println!("🟢 Staging is fresh. Ready to package.");
        }
    }

    Ok(())
}

fn cmd_clean(project: &Path, yes: bool, dry_run: bool, json: bool) -> Result<()> {
    use is_terminal::IsTerminal;

    let (config, warnings) = prestage::load_or_default(project);
    print_config_warnings(&warnings);

    let staging = config.staging_dir(project)?;

    if !json {
        println!("🗑  Prestage Clean");
        println!("Staging: {}", staging.display());
        println!();
    }

    if !staging.exists() {
        if json {
            println!(r#"{{"event":"clean_complete","removed":false}}"#);
        } else {
            println!("Nothing to clean. Staging directory does not exist.");
        }
        return Ok(());
    }

    if dry_run {
        if json {
            println!(
                r#"{{"event":"clean_dry_run","path":"{}"}}"#,
                staging.display()
            );
        } else {
            println!("Dry run: would remove {}", staging.display());
        }
        return Ok(());
    }

    if !yes {
        if !std::io::stdin().is_terminal() {
            anyhow::bail!("refusing to delete without --yes in non-interactive mode");
        }

        use dialoguer::Confirm;
        let confirmed = Confirm::new()
            .with_prompt(format!("Remove staging directory {}?", staging.display()))
            .default(false)
            .interact()?;

        if !confirmed {
            println!("Aborted.");
            return Ok(());
        }
    }

    let removed = prestage::clean_staging(&staging)?;

    if json {
        println!(r#"{{"event":"clean_complete","removed":{removed}}}"#);
    } else {
        println!("✓ Removed {}", staging.display());
    }

    Ok(())
}

fn cmd_verify(project: &Path, json: bool) -> Result<()> {
    let (config, warnings) = prestage::load_or_default(project);
    print_config_warnings(&warnings);

    let build_output = config.build_output_dir(project)?;
    let staging = config.staging_dir(project)?;

    if !json {
        println!("🔍 Prestage Verify");
        println!("Build output: {}", build_output.display());
        println!("Staging: {}", staging.display());
        println!();
    }

    let report = prestage::verify_tree(&build_output, &staging)?;

    if json {
        let output = serde_json::json!({
            "event": "verify",
            "clean": report.is_clean(),
            "matched": report.matched,
            "missing": report.missing.iter().map(|p| p.display().to_string()).collect::<Vec<_>>(),
            "extra": report.extra.iter().map(|p| p.display().to_string()).collect::<Vec<_>>(),
            "mismatched": report.mismatched.iter().map(|p| p.display().to_string()).collect::<Vec<_>>(),
        });
        println!("{}", serde_json::to_string(&output)?);
    } else {
        if !report.missing.is_empty() {
            println!("Missing from staging ({}):", report.missing.len());
            for path in &report.missing {
                println!("  - {}", path.display());
            }
            println!();
        }

        if !report.extra.is_empty() {
            println!("Not in build output ({}):", report.extra.len());
            for path in &report.extra {
                println!("  + {}", path.display());
            }
            println!();
        }

        if !report.mismatched.is_empty() {
            println!("Content differs ({}):", report.mismatched.len());
            for path in &report.mismatched {
                println!("  ~ {}", path.display());
            }
            println!();
        }

        println!(
            "Summary: {} matched, {} missing, {} extra, {} mismatched",
            report.matched,
            report.missing.len(),
            report.extra.len(),
            report.mismatched.len()
        );
    }

    if !report.is_clean() {
        if !json {
            println!();
            println!("🔴 Staging does not match the build output. Run `prestage run`.");
        }
        std::process::exit(1);
    }

    if !json {
        println!();
        println!("🟢 Staging matches the build output.");
    }

    Ok(())
}

fn cmd_init(project: &Path, json: bool) -> Result<()> {
    use prestage::config::{CONFIG_FILE, CONFIG_TEMPLATE};
    use prestage::PrestageError;

    let config_path = project.join(CONFIG_FILE);

    if config_path.exists() {
        return Err(PrestageError::ConfigExists { path: config_path }.into());
    }

    std::fs::write(&config_path, CONFIG_TEMPLATE)?;

    if json {
        println!(
            r#"{{"event":"init_complete","path":"{}"}}"#,
            config_path.display()
        );
    } else {
        println!("✓ Wrote {}", config_path.display());
        println!("Edit the paths to match your project, then run `prestage run`.");
    }

    Ok(())
}
