//! Definition-file loading and environment assembly.
//!
//! A definition file holds either a single JSON object (a class body
//! carrying its own `"path"` or `"override"` key) or an array of such
//! objects, applied in file order.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use kiln_engine::{Environment, Runtime};
use serde_json::Value;

/// Read every definition file and feed its bodies to the runtime in
/// order. Definition errors are collected, not fatal: the caller reads
/// them back through `class_states` and `take_diagnostics`.
pub fn load_definitions(rt: &mut Runtime, files: &[PathBuf]) -> Result<Vec<String>> {
    let mut failures = Vec::new();
    for file in files {
        let bodies = read_file(file)?;
        for body in bodies {
            let label = body
                .get("path")
                .or_else(|| body.get("override"))
                .and_then(Value::as_str)
                .unwrap_or("<unnamed>")
                .to_string();
            if let Err(err) = rt.define_from_value(body) {
                failures.push(format!("{}: {}: {}", file.display(), label, err));
            }
        }
    }
    Ok(failures)
}

fn read_file(path: &Path) -> Result<Vec<Value>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let parsed: Value = serde_json::from_str(&text)
        .with_context(|| format!("invalid JSON in {}", path.display()))?;
    match parsed {
        Value::Array(items) => {
            for item in &items {
                if !item.is_object() {
                    bail!("{}: array entries must be objects", path.display());
                }
            }
            Ok(items)
        }
        Value::Object(_) => Ok(vec![parsed]),
        _ => bail!("{}: expected a JSON object or array of objects", path.display()),
    }
}

/// Build an environment from the `--platform` flag and `KEY=VALUE` pairs.
/// Values that parse as JSON are taken structurally, anything else as a
/// string, so `--env width=320` yields a number and `--env theme=dark` a
/// string.
pub fn build_environment(platform: &str, pairs: &[String]) -> Result<Environment> {
    let mut env = Environment::new(platform);
    for pair in pairs {
        let (key, raw) = pair
            .split_once('=')
            .with_context(|| format!("--env expects KEY=VALUE, got '{}'", pair))?;
        let value = serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()));
        env = env.with_prop(key, value);
    }
    Ok(env)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_env_values_parse_as_json_or_string() {
        let env = build_environment(
            "phone",
            &["width=320".to_string(), "theme=dark".to_string()],
        )
        .unwrap();
        assert_eq!(env.prop("width"), Some(json!(320)));
        assert_eq!(env.prop("theme"), Some(json!("dark")));
        assert_eq!(env.platform(), "phone");
    }

    #[test]
    fn test_env_rejects_missing_equals() {
        assert!(build_environment("desktop", &["width".to_string()]).is_err());
    }
}
