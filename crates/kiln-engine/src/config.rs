//! Config property synthesis and conditional resolution.
//!
//! Every key declared under `config` or `cachedConfig` becomes a
//! [`ConfigProperty`] in the class's accessor table. Resolution merges the
//! declared defaults with every matching `platformConfig` /
//! `responsiveConfig` block in declaration order (later match wins), first
//! at class finalization and again at instance construction when the
//! environment has changed since.
//!
//! `cachedConfig` values are resolved once per class and shared between
//! instances through an `Arc`; `config` values are re-resolved per instance.

use serde_json::Value;

use crate::directive::DirectiveMap;
use crate::environment::Environment;
use crate::rules;

/// One declared config property.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigProperty {
    /// Declared default value (before conditional blocks apply).
    pub default: Value,
    /// Resolved once per class and shared, instead of per instance.
    pub cached: bool,
}

/// Merge matching conditional blocks over the declared defaults.
///
/// `platform_config` blocks apply first, then `responsive_config` blocks,
/// each list in declaration order; a later matching block wins on key
/// conflicts. A block may introduce keys no `config` directive declared;
/// those resolve like ordinary defaults. No match leaves the base untouched.
pub fn resolve_defaults(
    configs: &rustc_hash::FxHashMap<String, ConfigProperty>,
    platform_config: &[(String, DirectiveMap)],
    responsive_config: &[(String, DirectiveMap)],
    env: &Environment,
) -> DirectiveMap {
    let mut resolved = DirectiveMap::new();
    for (key, property) in configs {
        resolved.insert(key.clone(), property.default.clone());
    }
    for (tags, partial) in platform_config {
        if env.platform_matches(tags) {
            for (key, value) in partial {
                resolved.insert(key.clone(), value.clone());
            }
        }
    }
    for (rule, partial) in responsive_config {
        if rules::matches(rule, env) {
            for (key, value) in partial {
                resolved.insert(key.clone(), value.clone());
            }
        }
    }
    resolved
}

/// Split a resolved default map into the per-instance part and the
/// class-shared (cached) part.
pub fn split_cached(
    resolved: &DirectiveMap,
    configs: &rustc_hash::FxHashMap<String, ConfigProperty>,
) -> (DirectiveMap, DirectiveMap) {
    let mut per_instance = DirectiveMap::new();
    let mut cached = DirectiveMap::new();
    for (key, value) in resolved {
        let is_cached = configs.get(key).map(|p| p.cached).unwrap_or(false);
        if is_cached {
            cached.insert(key.clone(), value.clone());
        } else {
            per_instance.insert(key.clone(), value.clone());
        }
    }
    (per_instance, cached)
}

/// A synchronous config change notification.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigChange {
    /// The config key that changed.
    pub key: String,
    /// Value before the set.
    pub old_value: Value,
    /// Value after the set.
    pub new_value: Value,
}
