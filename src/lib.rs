//! prestage - pre-package staging hook
//!
//! A build orchestrator invokes prestage immediately before packaging a
//! filesystem image. It deletes the staging directory the packaging step
//! reads and recreates it from a fresh recursive copy of the front-end
//! build output, optionally running the front-end build first. After a
//! successful run the staging directory is byte-identical to the build
//! output.

pub mod build;
pub mod config;
pub mod error;
pub mod stage;
pub mod verify;

// Re-exports for convenience
pub use build::BuildCommand;
pub use config::{load_or_default, load_with_warnings, Config, ConfigWarning};
pub use error::{PrestageError, PrestageResult};
pub use stage::{clean_staging, copy_tree, run_hook, CopyStats, HookEvent, StageOptions, StageOutcome};
pub use verify::{hash_content, hash_file, verify_tree, VerifyReport};
