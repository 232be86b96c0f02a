//! `kiln inspect`: print a finalized class descriptor.

use std::path::PathBuf;

use kiln_engine::MemberOrigin;

use crate::output::StyledOutput;

pub fn run(
    out: &mut StyledOutput,
    class: &str,
    files: &[PathBuf],
    platform: &str,
    env_pairs: &[String],
) -> anyhow::Result<bool> {
    let (rt, clean) = super::load_runtime(out, files, platform, env_pairs)?;

    let descriptor = match rt.descriptor(class) {
        Some(descriptor) => descriptor,
        None => {
            out.error(&format!("no finalized class named '{}'", class));
            return Ok(false);
        }
    };

    out.success(&format!("class {}", descriptor.path));
    if let Some(extend) = &descriptor.extend {
        out.line(&format!("  extend: {}", extend));
    }
    if descriptor.singleton {
        out.line("  singleton: true");
    }
    if let Some(xtype) = &descriptor.xtype {
        out.line(&format!("  xtype: {}", xtype));
    }
    if !descriptor.aliases.is_empty() {
        out.line(&format!("  aliases: {}", descriptor.aliases.join(", ")));
    }
    if !descriptor.alternates.is_empty() {
        out.line(&format!(
            "  alternate names: {}",
            descriptor.alternates.join(", ")
        ));
    }
    if !descriptor.deprecated.is_empty() {
        out.warning(&format!(
            "  deprecated: {}",
            serde_json::Value::Object(descriptor.deprecated.clone())
        ));
    }

    let mut members: Vec<_> = descriptor.members.iter().collect();
    members.sort_by(|a, b| a.0.cmp(b.0));
    if !members.is_empty() {
        out.line("  members:");
        for (name, member) in members {
            let origin = match &member.origin {
                MemberOrigin::Own => "own".to_string(),
                MemberOrigin::Inherited(from) => format!("inherited from {}", from),
                MemberOrigin::Mixin(from) => format!("mixin {}", from),
                MemberOrigin::Override => "override".to_string(),
            };
            let visibility = if member.private { ", private" } else { "" };
            out.line(&format!("    {} ({}{})", name, origin, visibility));
        }
    }

    let mut configs: Vec<_> = descriptor.configs.iter().collect();
    configs.sort_by(|a, b| a.0.cmp(b.0));
    if !configs.is_empty() {
        out.line("  configs:");
        for (key, property) in configs {
            let resolved = descriptor
                .resolved_defaults
                .get(key)
                .or_else(|| descriptor.cached_defaults.get(key))
                .unwrap_or(&property.default);
            let cached = if property.cached { ", cached" } else { "" };
            out.line(&format!("    {} = {}{}", key, resolved, cached));
        }
    }

    if !descriptor.statics.is_empty() {
        out.line(&format!(
            "  statics: {}",
            keys_of(&descriptor.statics).join(", ")
        ));
    }
    if !descriptor.inheritable_statics.is_empty() {
        out.line(&format!(
            "  inheritable statics: {}",
            keys_of(&descriptor.inheritable_statics).join(", ")
        ));
    }

    Ok(clean)
}

fn keys_of(map: &kiln_engine::DirectiveMap) -> Vec<String> {
    map.keys().cloned().collect()
}
