//! Instance construction.
//!
//! Applies the construction-time config merge: the descriptor's resolved
//! defaults (re-resolved when the current environment differs from the one
//! the class finalized under), overlaid with the caller's config object.
//! If the resulting config carries both `tpl` and `data`, the template
//! collaborator renders the markup once and the result is stored on the
//! instance; the engine never executes markup logic itself.

use std::sync::Arc;

use serde_json::Value;

use crate::builder::ClassDescriptor;
use crate::config;
use crate::directive::DirectiveMap;
use crate::environment::Environment;
use crate::instance::Instance;

/// Template collaborator: a pure function from a data value to markup.
pub type TemplateEngine = Box<dyn Fn(&Value) -> String + Send + Sync>;

/// Build an instance of a finalized class.
pub(crate) fn construct(
    descriptor: &Arc<ClassDescriptor>,
    env: &Environment,
    template: Option<&TemplateEngine>,
    config: Option<DirectiveMap>,
) -> Instance {
    // Per-instance defaults: the finalize-time resolution when the
    // environment is unchanged, a fresh conditional pass otherwise.
    // Cached config stays at its class-level resolution either way.
    let mut values = if *env == descriptor.finalized_env {
        descriptor.resolved_defaults.clone()
    } else {
        let resolved = config::resolve_defaults(
            &descriptor.configs,
            &descriptor.platform_config,
            &descriptor.responsive_config,
            env,
        );
        config::split_cached(&resolved, &descriptor.configs).0
    };

    if let Some(overrides) = config {
        for (key, value) in overrides {
            values.insert(key, value);
        }
    }

    let instance = Instance::new(descriptor, values, descriptor.cached_defaults.clone());

    if let Some(render) = template {
        let merged = instance.resolved_config();
        if merged.contains_key("tpl") {
            if let Some(data) = merged.get("data") {
                instance.set_markup(render(data));
            }
        }
    }

    instance
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::ClassBuilder;
    use crate::directive::DirectiveSet;
    use crate::registry::{ClassNode, ClassRegistry};
    use serde_json::json;

    fn descriptor(body: serde_json::Value, env: &Environment) -> Arc<ClassDescriptor> {
        let registry = ClassRegistry::new();
        let mut ds = DirectiveSet::from_value(body).unwrap();
        ds.path = "Widget.Test".to_string();
        let node = ClassNode::new(ds);
        Arc::new(ClassBuilder::new(&registry, env).finalize(&node).unwrap())
    }

    #[test]
    fn test_environment_change_reresolves() {
        let desktop = Environment::new("desktop");
        let desc = descriptor(
            json!({
                "config": { "color": "red" },
                "platformConfig": { "phone": { "color": "blue" } }
            }),
            &desktop,
        );

        let same_env = construct(&desc, &desktop, None, None);
        assert_eq!(same_env.get("color").unwrap(), json!("red"));

        let phone = Environment::new("phone");
        let changed_env = construct(&desc, &phone, None, None);
        assert_eq!(changed_env.get("color").unwrap(), json!("blue"));
    }

    #[test]
    fn test_instance_config_overrides_defaults() {
        let env = Environment::default();
        let desc = descriptor(json!({ "config": { "color": "red", "width": 100 } }), &env);
        let mut config = DirectiveMap::new();
        config.insert("color".to_string(), json!("gold"));
        let inst = construct(&desc, &env, None, Some(config));
        assert_eq!(inst.get("color").unwrap(), json!("gold"));
        assert_eq!(inst.get("width").unwrap(), json!(100));
    }

    #[test]
    fn test_template_collaborator_invoked() {
        let env = Environment::default();
        let desc = descriptor(
            json!({
                "config": { "tpl": "<b>{name}</b>", "data": { "name": "Ada" } }
            }),
            &env,
        );
        let engine: TemplateEngine = Box::new(|data| {
            format!("rendered:{}", data["name"].as_str().unwrap_or_default())
        });
        let inst = construct(&desc, &env, Some(&engine), None);
        assert_eq!(inst.markup().as_deref(), Some("rendered:Ada"));
    }

    #[test]
    fn test_template_skipped_without_data() {
        let env = Environment::default();
        let desc = descriptor(json!({ "config": { "tpl": "<b>x</b>" } }), &env);
        let engine: TemplateEngine = Box::new(|_| "never".to_string());
        let inst = construct(&desc, &env, Some(&engine), None);
        assert!(inst.markup().is_none());
    }
}
