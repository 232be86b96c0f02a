//! Subcommand implementations.
//!
//! Each command returns `Ok(true)` on success, `Ok(false)` when the run
//! completed but surfaced definition errors, and `Err` for I/O or usage
//! failures.

pub mod check;
pub mod create;
pub mod inspect;

use kiln_engine::Runtime;

use crate::files;
use crate::output::StyledOutput;

/// Shared setup: build a runtime for the requested environment, load
/// every definition file, and report per-definition failures. Returns
/// the runtime and whether all definitions were accepted.
pub fn load_runtime(
    out: &mut StyledOutput,
    files: &[std::path::PathBuf],
    platform: &str,
    env_pairs: &[String],
) -> anyhow::Result<(Runtime, bool)> {
    let env = files::build_environment(platform, env_pairs)?;
    let mut rt = Runtime::with_environment(env);
    let failures = files::load_definitions(&mut rt, files)?;
    for failure in &failures {
        out.error(failure);
    }
    Ok((rt, failures.is_empty()))
}
