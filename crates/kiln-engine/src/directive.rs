//! Declarative class-definition surface.
//!
//! A [`DirectiveSet`] is the validated body of one class definition: the
//! inheritance, composition, dependency, config, and override directives the
//! engine consumes. It deserializes from the same JSON shape the original
//! declaration surface uses: single-or-array shorthands for `requires` /
//! `uses` / `alias` / `alternateClassName`, map-or-array `mixins`, and any
//! key that is not a known directive is a plain member.
//!
//! Directive sets are immutable once submitted to the runtime; later
//! corrections arrive only as new `override` directive sets.

use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::error::{EngineError, EngineResult};

/// Ordered string-keyed JSON map (insertion order preserved).
pub type DirectiveMap = serde_json::Map<String, Value>;

/// One mixin reference: a local name plus the target class path.
///
/// Declaration order is significant: on member collisions a later mixin
/// wins over an earlier one.
#[derive(Debug, Clone, PartialEq)]
pub struct MixinEntry {
    /// Local name under which the mixin is composed.
    pub name: String,
    /// Class path of the mixin source.
    pub path: String,
}

/// The validated directive body of one class definition.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct DirectiveSet {
    /// Fully-qualified class path. `define` fills this in; a value present
    /// in the serialized body is kept only when `define` receives none.
    pub path: String,

    /// Parent class path (hard dependency).
    pub extend: Option<String>,

    /// Classes that must finalize before this one (hard dependencies).
    #[serde(deserialize_with = "one_or_many")]
    pub requires: Vec<String>,

    /// Optional dependencies; never block finalization.
    #[serde(deserialize_with = "one_or_many")]
    pub uses: Vec<String>,

    /// Mixins in declaration order (hard dependencies).
    #[serde(deserialize_with = "mixin_entries")]
    pub mixins: Vec<MixinEntry>,

    /// Lookup aliases, e.g. `"widget.window"`.
    #[serde(deserialize_with = "one_or_many")]
    pub alias: Vec<String>,

    /// Component alias for instantiation by xtype name.
    pub xtype: Option<String>,

    /// Static members owned by this class alone (never inherited).
    pub statics: DirectiveMap,

    /// Static members inherited by subclasses.
    #[serde(rename = "inheritableStatics")]
    pub inheritable_statics: DirectiveMap,

    /// Members visible only to the declaring class; excluded from
    /// inheritance and from mixin export.
    pub privates: DirectiveMap,

    /// Config properties re-evaluated per instance at construction.
    pub config: DirectiveMap,

    /// Config properties resolved once per class and shared.
    #[serde(rename = "cachedConfig")]
    pub cached_config: DirectiveMap,

    /// Conditional config blocks keyed by platform tag(s), declaration order.
    #[serde(rename = "platformConfig", deserialize_with = "nested_blocks")]
    pub platform_config: Vec<(String, DirectiveMap)>,

    /// Conditional config blocks keyed by responsive rule, declaration order.
    #[serde(rename = "responsiveConfig", deserialize_with = "nested_blocks")]
    pub responsive_config: Vec<(String, DirectiveMap)>,

    /// Additional class paths resolving to this class once finalized.
    #[serde(rename = "alternateClassName", deserialize_with = "one_or_many")]
    pub alternate_class_name: Vec<String>,

    /// Exactly one lazily-created instance.
    pub singleton: bool,

    /// Explicit opt-in to replace an existing definition at the same path.
    pub replace: bool,

    /// When set, this body is not a class of its own: it patches the named
    /// target class.
    #[serde(rename = "override")]
    pub override_target: Option<String>,

    /// Inline override bodies keyed by target class path.
    pub overrides: DirectiveMap,

    /// Deprecation metadata, carried verbatim onto the descriptor.
    pub deprecated: DirectiveMap,

    /// Plain members: every key that is not a known directive.
    #[serde(flatten)]
    pub members: DirectiveMap,
}

impl DirectiveSet {
    /// Deserialize a directive body from a JSON value.
    pub fn from_value(value: Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(value)
    }

    /// Hard dependency paths: `extend`, every mixin, every `requires` entry.
    /// Deduplicated, declaration order preserved.
    pub fn hard_dependencies(&self) -> Vec<String> {
        let mut deps = Vec::new();
        if let Some(parent) = &self.extend {
            deps.push(parent.clone());
        }
        for mixin in &self.mixins {
            deps.push(mixin.path.clone());
        }
        for req in &self.requires {
            deps.push(req.clone());
        }
        let mut seen = rustc_hash::FxHashSet::default();
        deps.retain(|d| seen.insert(d.clone()));
        deps
    }

    /// Structural sanity checks, run at admission.
    pub fn validate(&self) -> EngineResult<()> {
        if self.path.is_empty() {
            return Err(EngineError::Internal {
                path: String::new(),
                detail: "directive set has no class path".to_string(),
            });
        }
        if self.extend.as_deref() == Some(self.path.as_str()) {
            return Err(EngineError::CyclicDependency {
                path: self.path.clone(),
                cycle: format!("{} -> {}", self.path, self.path),
            });
        }
        let mut names = rustc_hash::FxHashSet::default();
        for mixin in &self.mixins {
            if mixin.path.is_empty() {
                return Err(EngineError::Internal {
                    path: self.path.clone(),
                    detail: format!("mixin '{}' has an empty target path", mixin.name),
                });
            }
            if !names.insert(mixin.name.as_str()) {
                return Err(EngineError::Internal {
                    path: self.path.clone(),
                    detail: format!("duplicate mixin name '{}'", mixin.name),
                });
            }
        }
        if self.override_target.as_deref() == Some("") {
            return Err(EngineError::Internal {
                path: self.path.clone(),
                detail: "override target is empty".to_string(),
            });
        }
        Ok(())
    }

    /// Whether this body is an override patch rather than a class.
    pub fn is_override(&self) -> bool {
        self.override_target.is_some()
    }
}

/// Accept `"x"` or `["x", "y"]`.
fn one_or_many<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    match value {
        Value::Null => Ok(Vec::new()),
        Value::String(s) => Ok(vec![s]),
        Value::Array(items) => items
            .into_iter()
            .map(|item| match item {
                Value::String(s) => Ok(s),
                other => Err(serde::de::Error::custom(format!(
                    "expected string, got {}",
                    other
                ))),
            })
            .collect(),
        other => Err(serde::de::Error::custom(format!(
            "expected string or array of strings, got {}",
            other
        ))),
    }
}

/// Accept `{ "name": "Path" }` or `["Path", ...]` (name defaults to path).
fn mixin_entries<'de, D>(deserializer: D) -> Result<Vec<MixinEntry>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    match value {
        Value::Null => Ok(Vec::new()),
        Value::Object(map) => map
            .into_iter()
            .map(|(name, target)| match target {
                Value::String(path) => Ok(MixinEntry { name, path }),
                other => Err(serde::de::Error::custom(format!(
                    "mixin '{}' must map to a class path, got {}",
                    name, other
                ))),
            })
            .collect(),
        Value::Array(items) => items
            .into_iter()
            .map(|item| match item {
                Value::String(path) => Ok(MixinEntry {
                    name: path.clone(),
                    path,
                }),
                other => Err(serde::de::Error::custom(format!(
                    "expected mixin class path, got {}",
                    other
                ))),
            })
            .collect(),
        other => Err(serde::de::Error::custom(format!(
            "expected mixin map or array, got {}",
            other
        ))),
    }
}

/// Conditional config blocks: a map whose values are partial config objects.
fn nested_blocks<'de, D>(deserializer: D) -> Result<Vec<(String, DirectiveMap)>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    match value {
        Value::Null => Ok(Vec::new()),
        Value::Object(map) => map
            .into_iter()
            .map(|(key, block)| match block {
                Value::Object(partial) => Ok((key, partial)),
                other => Err(serde::de::Error::custom(format!(
                    "conditional config '{}' must be an object, got {}",
                    key, other
                ))),
            })
            .collect(),
        other => Err(serde::de::Error::custom(format!(
            "expected conditional config map, got {}",
            other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_shorthand_forms() {
        let ds = DirectiveSet::from_value(json!({
            "extend": "Widget.Base",
            "requires": "Util.Format",
            "alias": ["widget.a", "widget.a2"],
            "alternateClassName": "Legacy.A",
        }))
        .unwrap();
        assert_eq!(ds.extend.as_deref(), Some("Widget.Base"));
        assert_eq!(ds.requires, vec!["Util.Format"]);
        assert_eq!(ds.alias, vec!["widget.a", "widget.a2"]);
        assert_eq!(ds.alternate_class_name, vec!["Legacy.A"]);
    }

    #[test]
    fn test_mixins_map_preserves_order() {
        let ds = DirectiveSet::from_value(json!({
            "mixins": { "zed": "Mix.Zed", "alpha": "Mix.Alpha" }
        }))
        .unwrap();
        let names: Vec<&str> = ds.mixins.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["zed", "alpha"]);
        assert_eq!(ds.mixins[0].path, "Mix.Zed");
    }

    #[test]
    fn test_mixins_array_form() {
        let ds = DirectiveSet::from_value(json!({ "mixins": ["Mix.A", "Mix.B"] })).unwrap();
        assert_eq!(ds.mixins.len(), 2);
        assert_eq!(ds.mixins[1].name, "Mix.B");
        assert_eq!(ds.mixins[1].path, "Mix.B");
    }

    #[test]
    fn test_unknown_keys_become_members() {
        let ds = DirectiveSet::from_value(json!({
            "extend": "Widget.Base",
            "title": "Hello",
            "collapsible": true
        }))
        .unwrap();
        assert_eq!(ds.members.get("title"), Some(&json!("Hello")));
        assert_eq!(ds.members.get("collapsible"), Some(&json!(true)));
        assert!(ds.members.get("extend").is_none());
    }

    #[test]
    fn test_hard_dependencies_dedup_in_order() {
        let ds = DirectiveSet::from_value(json!({
            "extend": "Widget.Base",
            "mixins": { "m": "Mix.A" },
            "requires": ["Widget.Base", "Util.X"]
        }))
        .unwrap();
        assert_eq!(
            ds.hard_dependencies(),
            vec!["Widget.Base", "Mix.A", "Util.X"]
        );
    }

    #[test]
    fn test_validate_self_extend() {
        let mut ds = DirectiveSet::from_value(json!({ "extend": "A" })).unwrap();
        ds.path = "A".to_string();
        let err = ds.validate().unwrap_err();
        assert_eq!(err.kind(), "CyclicDependency");
    }

    #[test]
    fn test_validate_duplicate_mixin_name() {
        let mut ds = DirectiveSet::default();
        ds.path = "A".to_string();
        ds.mixins.push(MixinEntry {
            name: "m".to_string(),
            path: "Mix.A".to_string(),
        });
        ds.mixins.push(MixinEntry {
            name: "m".to_string(),
            path: "Mix.B".to_string(),
        });
        assert!(ds.validate().is_err());
    }

    #[test]
    fn test_conditional_blocks_ordered() {
        let ds = DirectiveSet::from_value(json!({
            "platformConfig": {
                "phone": { "color": "blue" },
                "tablet": { "color": "teal" }
            }
        }))
        .unwrap();
        assert_eq!(ds.platform_config[0].0, "phone");
        assert_eq!(ds.platform_config[1].0, "tablet");
    }

    #[test]
    fn test_override_body() {
        let ds = DirectiveSet::from_value(json!({
            "override": "Widget.A",
            "config": { "color": "green" }
        }))
        .unwrap();
        assert!(ds.is_override());
        assert_eq!(ds.override_target.as_deref(), Some("Widget.A"));
    }
}
