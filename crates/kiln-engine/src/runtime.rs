//! The process-scoped composition runtime.
//!
//! [`Runtime`] owns all shared state (registry, alias indexes, dependency
//! graph, override queue, singleton cache) and exposes the definition
//! surface: `define`, `create`, `get_alias`, `reset`. Everything is
//! synchronous: a `define` may return with its subject still pending, and
//! the finalization then happens inside whichever later call completes the
//! dependency — an explicit worklist, no background scheduling.

use std::collections::VecDeque;
use std::sync::Arc;

use rustc_hash::{FxHashMap, FxHashSet};
use serde_json::Value;

use crate::builder::{ClassBuilder, ClassDescriptor};
use crate::directive::{DirectiveMap, DirectiveSet};
use crate::environment::Environment;
use crate::error::{EngineError, EngineResult};
use crate::factory::{self, TemplateEngine};
use crate::instance::Instance;
use crate::overrides::{OverrideManager, OverrideRecord};
use crate::registry::{AliasIndex, ClassRegistry, LifecycleState};
use crate::resolver::DependencyResolver;

/// Hook run on every newly constructed instance.
pub type InitHook = Box<dyn Fn(&Instance) + Send + Sync>;

/// The composition runtime: class definition, resolution, and instantiation.
pub struct Runtime {
    registry: ClassRegistry,
    resolver: DependencyResolver,
    overrides: OverrideManager,
    aliases: AliasIndex,
    env: Environment,
    template: Option<TemplateEngine>,
    init_hook: Option<InitHook>,
    singletons: FxHashMap<String, Arc<Instance>>,
    /// Non-fatal reportable conditions (alias conflicts, rebuild failures)
    /// raised while processing some other subject.
    diagnostics: Vec<EngineError>,
    /// Warning-level signals (e.g. singleton config ignored).
    warnings: Vec<String>,
}

impl Runtime {
    /// Create a runtime with the default (desktop) environment.
    pub fn new() -> Self {
        Self::with_environment(Environment::default())
    }

    /// Create a runtime evaluating conditional configs against `env`.
    pub fn with_environment(env: Environment) -> Self {
        Self {
            registry: ClassRegistry::new(),
            resolver: DependencyResolver::new(),
            overrides: OverrideManager::new(),
            aliases: AliasIndex::new(),
            env,
            template: None,
            init_hook: None,
            singletons: FxHashMap::default(),
            diagnostics: Vec::new(),
            warnings: Vec::new(),
        }
    }

    /// Swap the environment. Classes already finalized keep their
    /// finalize-time resolution; construction re-resolves per instance.
    pub fn set_environment(&mut self, env: Environment) {
        self.env = env;
    }

    /// The current environment.
    pub fn environment(&self) -> &Environment {
        &self.env
    }

    /// Install the template collaborator used for `tpl`/`data` configs.
    pub fn set_template_engine(&mut self, engine: TemplateEngine) {
        self.template = Some(engine);
    }

    /// Install a hook run on every newly constructed instance.
    pub fn set_init_hook(&mut self, hook: InitHook) {
        self.init_hook = Some(hook);
    }

    /// Define a class (or submit an override body) at the given path.
    ///
    /// Returns without finalizing when hard dependencies are still
    /// pending; the node finalizes later, inside the `define` call that
    /// completes its dependencies.
    pub fn define(&mut self, path: &str, mut directives: DirectiveSet) -> EngineResult<()> {
        if !path.is_empty() {
            directives.path = path.to_string();
        }
        directives.validate()?;

        if let Some(target) = directives.override_target.clone() {
            return self.submit_override(&target, directives);
        }

        let inline_overrides = std::mem::take(&mut directives.overrides);
        let path = directives.path.clone();

        let mut replacing = false;
        if self.registry.contains(&path) {
            if !directives.replace {
                return Err(EngineError::DuplicateDefinition { path });
            }
            self.remove_definition(&path);
            replacing = true;
        }

        self.resolver.admit(&directives);
        let mut node = crate::registry::ClassNode::new(directives);

        let cycle = {
            let registry = &self.registry;
            self.resolver.find_cycle(&path, |p| registry.is_finalized(p))
        };
        if let Some(err) = cycle {
            node.error = Some(err.clone());
            self.registry.insert(node);
            return Err(err);
        }
        self.registry.insert(node);

        for (target, body) in inline_overrides {
            let body = DirectiveSet::from_value(body).map_err(|e| EngineError::Internal {
                path: path.clone(),
                detail: format!("invalid inline override for '{}': {}", target, e),
            })?;
            self.submit_override(&target, body)?;
        }

        self.run_worklist();

        // A replaced class's finalized dependents merged against the old
        // descriptor; rebuild them once the replacement is available
        if replacing && self.registry.is_finalized(&path) {
            self.rebuild_with_descendants(&path);
        }
        Ok(())
    }

    /// Define from a JSON body carrying its own `"path"` key.
    pub fn define_from_value(&mut self, value: Value) -> EngineResult<()> {
        let directives = DirectiveSet::from_value(value).map_err(|e| EngineError::Internal {
            path: String::new(),
            detail: format!("invalid directive body: {}", e),
        })?;
        let path = directives.path.clone();
        self.define(&path, directives)
    }

    /// Queue or apply an override body against `target`.
    pub fn submit_override(&mut self, target: &str, body: DirectiveSet) -> EngineResult<()> {
        let record = OverrideRecord {
            target: target.to_string(),
            body,
            sequence: self.overrides.next_sequence(),
        };
        if self.registry.is_finalized(target) {
            let node = self
                .registry
                .get_mut(target)
                .expect("finalized node must exist");
            node.overrides.push(record);
            self.rebuild_with_descendants(target);
        } else {
            self.overrides.queue(record);
        }
        Ok(())
    }

    /// Resolve an alias string through the alias table only.
    pub fn get_alias(&self, alias: &str) -> Option<&str> {
        self.aliases.resolve_alias(alias)
    }

    /// Resolve any name (path, alias, xtype, alternate) to a primary path.
    pub fn resolve_path(&self, name: &str) -> Option<String> {
        if self.registry.contains(name) {
            return Some(name.to_string());
        }
        self.aliases.resolve(name).map(|s| s.to_string())
    }

    /// Finalized descriptor for a path or any resolvable name.
    pub fn descriptor(&self, name: &str) -> Option<Arc<ClassDescriptor>> {
        let path = self.resolve_path(name)?;
        self.registry.descriptor(&path)
    }

    /// Construct an instance of a finalized class.
    pub fn create(
        &mut self,
        name: &str,
        config: Option<DirectiveMap>,
    ) -> EngineResult<Arc<Instance>> {
        let path = self
            .resolve_path(name)
            .ok_or_else(|| EngineError::UnknownType {
                name: name.to_string(),
            })?;

        let node = self.registry.get(&path).ok_or_else(|| EngineError::UnknownType {
            name: name.to_string(),
        })?;
        if let Some(err) = &node.error {
            return Err(err.clone());
        }
        let descriptor = match node.state {
            LifecycleState::Finalized => node
                .descriptor
                .clone()
                .ok_or_else(|| EngineError::Internal {
                    path: path.clone(),
                    detail: "finalized node has no descriptor".to_string(),
                })?,
            LifecycleState::Pending => {
                let registry = &self.registry;
                let missing = self
                    .resolver
                    .unresolved(&path, |p| registry.is_finalized(p));
                if missing.is_empty() {
                    return Err(EngineError::NotReady { path });
                }
                return Err(EngineError::UnresolvedDependency {
                    path,
                    missing: missing.join(", "),
                });
            }
            LifecycleState::Finalizing => {
                return Err(EngineError::NotReady { path });
            }
        };

        if descriptor.singleton {
            if let Some(existing) = self.singletons.get(&path) {
                if config.as_ref().is_some_and(|c| !c.is_empty()) {
                    self.warnings.push(format!(
                        "config ignored: '{}' is a singleton and already instantiated",
                        path
                    ));
                }
                return Ok(existing.clone());
            }
        }

        let instance = Arc::new(factory::construct(
            &descriptor,
            &self.env,
            self.template.as_ref(),
            config,
        ));
        if let Some(hook) = &self.init_hook {
            hook(&instance);
        }
        if descriptor.singleton {
            self.singletons.insert(path, instance.clone());
        }
        Ok(instance)
    }

    /// Path, lifecycle state, and sticky error of every registered class.
    pub fn class_states(&self) -> Vec<(String, LifecycleState, Option<EngineError>)> {
        let mut states: Vec<_> = self
            .registry
            .paths()
            .map(|p| {
                let node = self.registry.get(p).expect("path comes from registry");
                (p.to_string(), node.state, node.error.clone())
            })
            .collect();
        states.sort_by(|a, b| a.0.cmp(&b.0));
        states
    }

    /// Drain non-fatal reportable conditions collected so far.
    pub fn take_diagnostics(&mut self) -> Vec<EngineError> {
        std::mem::take(&mut self.diagnostics)
    }

    /// Drain warning-level signals collected so far.
    pub fn take_warnings(&mut self) -> Vec<String> {
        std::mem::take(&mut self.warnings)
    }

    /// Deprecation metadata for a resolvable name, if its class declares any.
    pub fn deprecation(&self, name: &str) -> Option<DirectiveMap> {
        let descriptor = self.descriptor(name)?;
        if descriptor.deprecated.is_empty() {
            None
        } else {
            Some(descriptor.deprecated.clone())
        }
    }

    /// Drop all state (test isolation). Environment, template engine, and
    /// init hook survive.
    pub fn reset(&mut self) {
        self.registry.clear();
        self.resolver.clear();
        self.overrides.clear();
        self.aliases.clear();
        self.singletons.clear();
        self.diagnostics.clear();
        self.warnings.clear();
    }

    /// Explicit replacement: drop the node, its alias registrations, and
    /// its graph edges. Finalized dependents are rebuilt after the
    /// replacement finalizes.
    fn remove_definition(&mut self, path: &str) {
        self.registry.remove(path);
        self.resolver.remove(path);
        self.aliases.unregister_path(path);
        self.singletons.remove(path);
    }

    /// Re-evaluate the ready set until fixpoint: every pending node whose
    /// hard dependencies are all finalized gets built, which may unlock
    /// further nodes.
    fn run_worklist(&mut self) {
        loop {
            let ready: Vec<String> = {
                let registry = &self.registry;
                let resolver = &self.resolver;
                registry
                    .paths()
                    .filter(|p| {
                        let node = registry.get(p).expect("path comes from registry");
                        node.state == LifecycleState::Pending
                            && node.error.is_none()
                            && resolver
                                .unresolved(p, |dep| registry.is_finalized(dep))
                                .is_empty()
                    })
                    .map(|p| p.to_string())
                    .collect()
            };
            if ready.is_empty() {
                break;
            }
            for path in ready {
                self.finalize_node(&path);
            }
        }
    }

    /// Build one ready node: drain queued overrides into its history,
    /// produce the descriptor, register its names.
    fn finalize_node(&mut self, path: &str) {
        {
            let node = match self.registry.get_mut(path) {
                Some(node) => node,
                None => return,
            };
            if node.state == LifecycleState::Finalizing {
                node.error = Some(EngineError::Internal {
                    path: path.to_string(),
                    detail: "re-entrant finalization".to_string(),
                });
                return;
            }
            node.state = LifecycleState::Finalizing;
            let mut drained = self.overrides.drain_for(path);
            node.overrides.append(&mut drained);
            node.overrides.sort_by_key(|r| r.sequence);
        }

        let snapshot = self.registry.get(path).cloned().expect("node exists");
        let built = ClassBuilder::new(&self.registry, &self.env).finalize(&snapshot);
        let node = self.registry.get_mut(path).expect("node exists");
        match built {
            Ok(descriptor) => {
                let descriptor = Arc::new(descriptor);
                node.descriptor = Some(descriptor.clone());
                node.state = LifecycleState::Finalized;
                self.register_names(&descriptor);

                // Overrides may have queued against this path mid-build
                if self.overrides.has_queued(path) {
                    let mut drained = self.overrides.drain_for(path);
                    let node = self.registry.get_mut(path).expect("node exists");
                    node.overrides.append(&mut drained);
                    node.overrides.sort_by_key(|r| r.sequence);
                    self.rebuild_with_descendants(path);
                }
            }
            Err(err) => {
                node.error = Some(err.clone());
                node.state = LifecycleState::Pending;
                self.diagnostics.push(err);
            }
        }
    }

    /// Rebuild a finalized node in place and propagate to every finalized
    /// class whose merge inputs include it.
    fn rebuild_with_descendants(&mut self, path: &str) {
        self.rebuild_finalized(path);

        let mut seen = FxHashSet::default();
        seen.insert(path.to_string());
        let mut queue = VecDeque::new();
        queue.push_back(path.to_string());
        while let Some(current) = queue.pop_front() {
            let dependents: Vec<String> = self
                .resolver
                .dependents_of(&current)
                .iter()
                .filter(|p| !seen.contains(*p) && self.registry.is_finalized(p))
                .cloned()
                .collect();
            for dependent in dependents {
                seen.insert(dependent.clone());
                self.rebuild_finalized(&dependent);
                queue.push_back(dependent);
            }
        }
    }

    fn rebuild_finalized(&mut self, path: &str) {
        let snapshot = match self.registry.get(path) {
            Some(node) if node.is_finalized() => node.clone(),
            _ => return,
        };
        let built = ClassBuilder::new(&self.registry, &self.env).finalize(&snapshot);
        match built {
            Ok(descriptor) => {
                let descriptor = Arc::new(descriptor);
                let node = self.registry.get_mut(path).expect("node exists");
                node.descriptor = Some(descriptor.clone());
                self.register_names(&descriptor);
            }
            Err(err) => {
                // Keep the previous descriptor; surface the failure
                let node = self.registry.get_mut(path).expect("node exists");
                node.error = Some(err.clone());
                self.diagnostics.push(err);
            }
        }
    }

    fn register_names(&mut self, descriptor: &ClassDescriptor) {
        for alias in &descriptor.aliases {
            if let Some(conflict) = self.aliases.register_alias(alias, &descriptor.path) {
                self.diagnostics.push(conflict);
            }
        }
        if let Some(xtype) = &descriptor.xtype {
            if let Some(conflict) = self.aliases.register_xtype(xtype, &descriptor.path) {
                self.diagnostics.push(conflict);
            }
        }
        for name in &descriptor.alternates {
            if let Some(conflict) = self.aliases.register_alternate(name, &descriptor.path) {
                self.diagnostics.push(conflict);
            }
        }
    }
}

impl Default for Runtime {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Runtime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Runtime")
            .field("classes", &self.registry.len())
            .field("environment", &self.env)
            .finish_non_exhaustive()
    }
}
