//! `kiln create`: construct an instance and print its resolved config.

use std::path::PathBuf;

use anyhow::Context;
use serde_json::Value;

use crate::output::StyledOutput;

pub fn run(
    out: &mut StyledOutput,
    name: &str,
    files: &[PathBuf],
    config: Option<&str>,
    platform: &str,
    env_pairs: &[String],
) -> anyhow::Result<bool> {
    let (mut rt, clean) = super::load_runtime(out, files, platform, env_pairs)?;

    let config = match config {
        Some(text) => {
            let value: Value =
                serde_json::from_str(text).context("--config must be inline JSON")?;
            match value {
                Value::Object(map) => Some(map),
                _ => anyhow::bail!("--config must be a JSON object"),
            }
        }
        None => None,
    };

    let instance = match rt.create(name, config) {
        Ok(instance) => instance,
        Err(err) => {
            out.error(&format!("cannot create '{}': {}", name, err));
            return Ok(false);
        }
    };

    if let Some(deprecation) = rt.deprecation(name) {
        out.warning(&format!(
            "warning: '{}' is deprecated: {}",
            instance.path(),
            Value::Object(deprecation)
        ));
    }

    out.success(&format!("created {}", instance.path()));
    let resolved = instance.resolved_config();
    out.line(
        &serde_json::to_string_pretty(&Value::Object(resolved))
            .context("serializing resolved config")?,
    );
    if let Some(markup) = instance.markup() {
        out.line("markup:");
        out.line(&markup);
    }

    for warning in rt.take_warnings() {
        out.warning(&format!("warning: {}", warning));
    }
    Ok(clean)
}
