//! `kiln check`: define every class and report finalization status.

use std::path::PathBuf;

use kiln_engine::LifecycleState;

use crate::output::StyledOutput;

pub fn run(
    out: &mut StyledOutput,
    files: &[PathBuf],
    platform: &str,
    env_pairs: &[String],
) -> anyhow::Result<bool> {
    let (mut rt, mut clean) = super::load_runtime(out, files, platform, env_pairs)?;

    let states = rt.class_states();
    let mut finalized = 0usize;
    for (path, state, error) in &states {
        match (state, error) {
            (LifecycleState::Finalized, None) => {
                finalized += 1;
                out.line(&format!("  ok       {}", path));
            }
            (_, Some(err)) => {
                clean = false;
                out.error(&format!("  error    {}: {}", path, err));
            }
            (LifecycleState::Pending, None) => {
                clean = false;
                out.warning(&format!("  pending  {}", path));
            }
            (LifecycleState::Finalizing, None) => {
                clean = false;
                out.error(&format!("  stuck    {}", path));
            }
        }
    }

    for diagnostic in rt.take_diagnostics() {
        clean = false;
        out.error(&format!("diagnostic: {}", diagnostic));
    }
    for warning in rt.take_warnings() {
        out.warning(&format!("warning: {}", warning));
    }

    if clean {
        out.success(&format!("{} class(es) finalized", finalized));
    } else {
        out.error(&format!(
            "{} of {} class(es) finalized",
            finalized,
            states.len()
        ));
    }
    Ok(clean)
}
