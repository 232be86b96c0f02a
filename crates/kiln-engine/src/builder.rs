//! Class finalization: the deterministic merge pass.
//!
//! Given a node whose hard dependencies are all finalized, [`ClassBuilder`]
//! synthesizes the immutable [`ClassDescriptor`]: merged member table,
//! merged statics, config accessor table with resolved defaults, and the
//! alias set. Precedence, lowest to highest: inherited members, each mixin
//! in declaration order, own members, then override bodies in arrival
//! order. Finalization is a pure function of the node's directive history
//! and its parents' descriptors, so re-finalizing without new overrides
//! reproduces a structurally identical descriptor.

use std::sync::Arc;

use rustc_hash::FxHashMap;
use serde_json::Value;

use crate::config::{self, ConfigProperty};
use crate::directive::DirectiveMap;
use crate::environment::Environment;
use crate::error::{EngineError, EngineResult};
use crate::registry::{ClassNode, ClassRegistry};

/// Where a merged member came from.
#[derive(Debug, Clone, PartialEq)]
pub enum MemberOrigin {
    /// Declared directly on the class.
    Own,
    /// Composed from the named mixin class.
    Mixin(String),
    /// Inherited from the named parent class.
    Inherited(String),
    /// Patched in by an override body.
    Override,
}

/// One entry in the merged member table.
#[derive(Debug, Clone, PartialEq)]
pub struct Member {
    /// The member's value (methods are opaque values to this runtime).
    pub value: Value,
    /// Which merge pass produced it.
    pub origin: MemberOrigin,
    /// Private members are visible on the declaring class only; they are
    /// excluded from inheritance and from mixin export.
    pub private: bool,
}

/// Immutable merged view of a finalized class.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassDescriptor {
    /// Fully-qualified class path.
    pub path: String,
    /// Parent class path, if any.
    pub extend: Option<String>,
    /// Merged member table (own + mixins + inherited + overrides).
    pub members: FxHashMap<String, Member>,
    /// Own statics, copied verbatim; never inherited.
    pub statics: DirectiveMap,
    /// Inheritable statics, merged with member precedence in their own
    /// static namespace.
    pub inheritable_statics: DirectiveMap,
    /// Config accessor table: declared key -> default + cached flag.
    pub configs: FxHashMap<String, ConfigProperty>,
    /// Inherited + own conditional platform blocks, declaration order.
    pub platform_config: Vec<(String, DirectiveMap)>,
    /// Inherited + own conditional responsive blocks, declaration order.
    pub responsive_config: Vec<(String, DirectiveMap)>,
    /// Per-instance defaults resolved under the finalization environment.
    pub resolved_defaults: DirectiveMap,
    /// Class-shared cached config values, resolved once here.
    pub cached_defaults: Arc<DirectiveMap>,
    /// Environment the conditionals were resolved under. The factory
    /// re-resolves at construction when the current environment differs.
    pub finalized_env: Environment,
    /// Lookup aliases owned by this class.
    pub aliases: Vec<String>,
    /// xtype name, if declared.
    pub xtype: Option<String>,
    /// Alternate class names resolving to this path.
    pub alternates: Vec<String>,
    /// Exactly one lazily-created instance.
    pub singleton: bool,
    /// Deprecation metadata, carried verbatim.
    pub deprecated: DirectiveMap,
}

impl ClassDescriptor {
    /// Members visible to subclasses and mixin consumers (privates hidden).
    pub fn exported_members(&self) -> impl Iterator<Item = (&str, &Member)> {
        self.members
            .iter()
            .filter(|(_, member)| !member.private)
            .map(|(name, member)| (name.as_str(), member))
    }

    /// Look up a member on the full (own) surface.
    pub fn member(&self, name: &str) -> Option<&Member> {
        self.members.get(name)
    }

    /// Whether the exported surface carries the member.
    pub fn exports_member(&self, name: &str) -> bool {
        self.members.get(name).is_some_and(|m| !m.private)
    }

    /// Whether the key is a declared config property.
    pub fn declares_config(&self, key: &str) -> bool {
        self.configs.contains_key(key)
    }
}

/// Synthesizes descriptors from resolvable nodes.
pub struct ClassBuilder<'a> {
    registry: &'a ClassRegistry,
    env: &'a Environment,
}

impl<'a> ClassBuilder<'a> {
    /// Create a builder over the registry, resolving conditionals against
    /// the given environment.
    pub fn new(registry: &'a ClassRegistry, env: &'a Environment) -> Self {
        Self { registry, env }
    }

    /// Produce the descriptor for a node whose hard dependencies are all
    /// finalized. Pure with respect to the node's directive history.
    pub fn finalize(&self, node: &ClassNode) -> EngineResult<ClassDescriptor> {
        let directives = &node.directives;
        let parent = match &directives.extend {
            Some(parent_path) => Some(self.finalized_descriptor(&node.path, parent_path)?),
            None => None,
        };

        let mut members: FxHashMap<String, Member> = FxHashMap::default();
        let mut configs: FxHashMap<String, ConfigProperty> = FxHashMap::default();
        let mut inheritable_statics = DirectiveMap::new();
        let mut platform_config = Vec::new();
        let mut responsive_config = Vec::new();

        // Pass 1: inherited surface, lowest precedence
        if let Some(parent) = &parent {
            for (name, member) in parent.exported_members() {
                members.insert(
                    name.to_string(),
                    Member {
                        value: member.value.clone(),
                        origin: MemberOrigin::Inherited(parent.path.clone()),
                        private: false,
                    },
                );
            }
            configs.extend(
                parent
                    .configs
                    .iter()
                    .map(|(k, v)| (k.clone(), v.clone())),
            );
            for (key, value) in &parent.inheritable_statics {
                inheritable_statics.insert(key.clone(), value.clone());
            }
            platform_config.extend(parent.platform_config.iter().cloned());
            responsive_config.extend(parent.responsive_config.iter().cloned());
        }

        // Pass 2: mixins in declaration order, later wins over earlier
        for mixin in &directives.mixins {
            let source = self.finalized_descriptor(&node.path, &mixin.path)?;
            for (name, member) in source.exported_members() {
                members.insert(
                    name.to_string(),
                    Member {
                        value: member.value.clone(),
                        origin: MemberOrigin::Mixin(source.path.clone()),
                        private: false,
                    },
                );
            }
            configs.extend(source.configs.iter().map(|(k, v)| (k.clone(), v.clone())));
            for (key, value) in &source.inheritable_statics {
                inheritable_statics.insert(key.clone(), value.clone());
            }
            platform_config.extend(source.platform_config.iter().cloned());
            responsive_config.extend(source.responsive_config.iter().cloned());
        }

        // Pass 3: own declarations win over everything inherited/composed
        for (name, value) in &directives.members {
            members.insert(
                name.clone(),
                Member {
                    value: value.clone(),
                    origin: MemberOrigin::Own,
                    private: false,
                },
            );
        }
        for (name, value) in &directives.privates {
            members.insert(
                name.clone(),
                Member {
                    value: value.clone(),
                    origin: MemberOrigin::Own,
                    private: true,
                },
            );
        }
        for (key, default) in &directives.config {
            configs.insert(
                key.clone(),
                ConfigProperty {
                    default: default.clone(),
                    cached: false,
                },
            );
        }
        for (key, default) in &directives.cached_config {
            configs.insert(
                key.clone(),
                ConfigProperty {
                    default: default.clone(),
                    cached: true,
                },
            );
        }
        for (key, value) in &directives.inheritable_statics {
            inheritable_statics.insert(key.clone(), value.clone());
        }
        platform_config.extend(directives.platform_config.iter().cloned());
        responsive_config.extend(directives.responsive_config.iter().cloned());

        let mut statics = directives.statics.clone();
        let mut aliases = directives.alias.clone();
        let mut xtype = directives.xtype.clone();
        let mut alternates = directives.alternate_class_name.clone();
        let mut deprecated = directives.deprecated.clone();

        // Pass 4: override bodies in arrival order, highest precedence
        for record in &node.overrides {
            let body = &record.body;
            for (name, value) in &body.members {
                members.insert(
                    name.clone(),
                    Member {
                        value: value.clone(),
                        origin: MemberOrigin::Override,
                        private: false,
                    },
                );
            }
            for (name, value) in &body.privates {
                members.insert(
                    name.clone(),
                    Member {
                        value: value.clone(),
                        origin: MemberOrigin::Override,
                        private: true,
                    },
                );
            }
            for (key, default) in &body.config {
                let cached = configs.get(key).map(|p| p.cached).unwrap_or(false);
                configs.insert(
                    key.clone(),
                    ConfigProperty {
                        default: default.clone(),
                        cached,
                    },
                );
            }
            for (key, default) in &body.cached_config {
                configs.insert(
                    key.clone(),
                    ConfigProperty {
                        default: default.clone(),
                        cached: true,
                    },
                );
            }
            for (key, value) in &body.statics {
                statics.insert(key.clone(), value.clone());
            }
            for (key, value) in &body.inheritable_statics {
                inheritable_statics.insert(key.clone(), value.clone());
            }
            platform_config.extend(body.platform_config.iter().cloned());
            responsive_config.extend(body.responsive_config.iter().cloned());
            for alias in &body.alias {
                if !aliases.contains(alias) {
                    aliases.push(alias.clone());
                }
            }
            if body.xtype.is_some() {
                xtype = body.xtype.clone();
            }
            for name in &body.alternate_class_name {
                if !alternates.contains(name) {
                    alternates.push(name.clone());
                }
            }
            for (key, value) in &body.deprecated {
                deprecated.insert(key.clone(), value.clone());
            }
        }

        let resolved_all =
            config::resolve_defaults(&configs, &platform_config, &responsive_config, self.env);
        let (resolved_defaults, cached) = config::split_cached(&resolved_all, &configs);

        Ok(ClassDescriptor {
            path: node.path.clone(),
            extend: directives.extend.clone(),
            members,
            statics,
            inheritable_statics,
            configs,
            platform_config,
            responsive_config,
            resolved_defaults,
            cached_defaults: Arc::new(cached),
            finalized_env: self.env.clone(),
            aliases,
            xtype,
            alternates,
            singleton: directives.singleton,
            deprecated,
        })
    }

    fn finalized_descriptor(
        &self,
        for_path: &str,
        dep_path: &str,
    ) -> EngineResult<Arc<ClassDescriptor>> {
        self.registry.descriptor(dep_path).ok_or_else(|| EngineError::Internal {
            path: for_path.to_string(),
            detail: format!("dependency '{}' is not finalized", dep_path),
        })
    }
}
