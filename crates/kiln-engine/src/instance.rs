//! Constructed instances and their config accessors.
//!
//! An [`Instance`] owns the config values resolved at its construction
//! time plus anything set since; it holds only a weak reference to its
//! class descriptor, so a late override that replaces the class does not
//! touch the instance's already-resolved values. Setters validate, apply,
//! and notify listeners synchronously; once the instance is destroyed the
//! accessors go inert: gets keep answering with the last value, sets are
//! rejected.

use std::sync::{Arc, Weak};

use parking_lot::{Mutex, RwLock};
use rustc_hash::FxHashMap;
use serde_json::Value;

use crate::builder::ClassDescriptor;
use crate::config::ConfigChange;
use crate::directive::DirectiveMap;
use crate::error::{EngineError, EngineResult};

/// Instance lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstanceState {
    /// Constructed, config resolved.
    Created,
    /// Handed to a renderer.
    Rendered,
    /// Destroyed; config accessors are inert.
    Destroyed,
}

/// Synchronous config change listener.
pub type ChangeListener = Box<dyn FnMut(&ConfigChange) + Send>;

/// Per-key setter validator; returns a rejection message on failure.
pub type ConfigValidator = Box<dyn Fn(&Value) -> Result<(), String> + Send + Sync>;

/// A constructed object of a finalized class.
pub struct Instance {
    path: String,
    descriptor: Weak<ClassDescriptor>,
    state: Mutex<InstanceState>,
    /// Per-instance values: construction-time resolved defaults overlaid
    /// with the caller's config object, plus later sets.
    values: RwLock<DirectiveMap>,
    /// Class-shared cached config defaults.
    cached: Arc<DirectiveMap>,
    listeners: Mutex<FxHashMap<String, Vec<ChangeListener>>>,
    validators: Mutex<FxHashMap<String, ConfigValidator>>,
    markup: Mutex<Option<String>>,
}

impl Instance {
    pub(crate) fn new(
        descriptor: &Arc<ClassDescriptor>,
        values: DirectiveMap,
        cached: Arc<DirectiveMap>,
    ) -> Self {
        Self {
            path: descriptor.path.clone(),
            descriptor: Arc::downgrade(descriptor),
            state: Mutex::new(InstanceState::Created),
            values: RwLock::new(values),
            cached,
            listeners: Mutex::new(FxHashMap::default()),
            validators: Mutex::new(FxHashMap::default()),
            markup: Mutex::new(None),
        }
    }

    /// Class path of the descriptor this instance was built from.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// The class descriptor, while the class still holds it. A replaced
    /// (re-finalized) class may leave this dangling; the instance's own
    /// config is unaffected either way.
    pub fn descriptor(&self) -> Option<Arc<ClassDescriptor>> {
        self.descriptor.upgrade()
    }

    /// Current lifecycle state.
    pub fn state(&self) -> InstanceState {
        *self.state.lock()
    }

    /// Mark as handed to the renderer.
    pub fn mark_rendered(&self) {
        let mut state = self.state.lock();
        if *state == InstanceState::Created {
            *state = InstanceState::Rendered;
        }
    }

    /// Transition to `Destroyed`. Idempotent; listeners and validators are
    /// dropped, the value store is kept so gets stay answerable.
    pub fn destroy(&self) {
        *self.state.lock() = InstanceState::Destroyed;
        self.listeners.lock().clear();
        self.validators.lock().clear();
    }

    /// Get a config value: instance store first, then the class-shared
    /// cached defaults. Still answers after destruction.
    pub fn get(&self, key: &str) -> EngineResult<Value> {
        if let Some(value) = self.values.read().get(key) {
            return Ok(value.clone());
        }
        if let Some(value) = self.cached.get(key) {
            return Ok(value.clone());
        }
        Err(EngineError::UnknownConfig {
            path: self.path.clone(),
            key: key.to_string(),
        })
    }

    /// Set a config value through the generated setter path: no-op on an
    /// identical value, validator check, apply, then synchronous listener
    /// notification before returning.
    pub fn set(&self, key: &str, value: Value) -> EngineResult<()> {
        if self.state() == InstanceState::Destroyed {
            return Err(EngineError::DestroyedInstance {
                path: self.path.clone(),
                key: key.to_string(),
            });
        }
        let old_value = match self.get(key) {
            Ok(value) => value,
            Err(_) => {
                // A key the construction-time store never saw is legal only
                // if the class declares it
                let declared = self
                    .descriptor
                    .upgrade()
                    .is_some_and(|d| d.declares_config(key));
                if !declared {
                    return Err(EngineError::UnknownConfig {
                        path: self.path.clone(),
                        key: key.to_string(),
                    });
                }
                Value::Null
            }
        };
        if old_value == value {
            return Ok(());
        }
        if let Some(validator) = self.validators.lock().get(key) {
            if let Err(detail) = validator(&value) {
                return Err(EngineError::InvalidConfigValue {
                    path: self.path.clone(),
                    key: key.to_string(),
                    detail,
                });
            }
        }
        self.values.write().insert(key.to_string(), value.clone());

        let change = ConfigChange {
            key: key.to_string(),
            old_value,
            new_value: value,
        };
        self.notify(&change);
        Ok(())
    }

    fn notify(&self, change: &ConfigChange) {
        // Listeners run outside the table lock so a callback may set other
        // keys without deadlocking
        let mut batch = match self.listeners.lock().remove(&change.key) {
            Some(batch) => batch,
            None => return,
        };
        for listener in batch.iter_mut() {
            listener(change);
        }
        let mut listeners = self.listeners.lock();
        match listeners.get_mut(&change.key) {
            Some(existing) => {
                batch.extend(existing.drain(..));
                *existing = batch;
            }
            None => {
                listeners.insert(change.key.clone(), batch);
            }
        }
    }

    /// Register a synchronous change listener for a key.
    pub fn on_change(&self, key: &str, listener: ChangeListener) {
        self.listeners.lock().entry(key.to_string()).or_default().push(listener);
    }

    /// Install (or replace) the validator for a key.
    pub fn set_validator(&self, key: &str, validator: ConfigValidator) {
        self.validators.lock().insert(key.to_string(), validator);
    }

    /// The full resolved config map: cached defaults overlaid with the
    /// instance's own values. This is the read-only view the renderer
    /// collaborator consumes.
    pub fn resolved_config(&self) -> DirectiveMap {
        let mut merged = (*self.cached).clone();
        for (key, value) in self.values.read().iter() {
            merged.insert(key.clone(), value.clone());
        }
        merged
    }

    /// Markup produced by the template collaborator at construction.
    pub fn markup(&self) -> Option<String> {
        self.markup.lock().clone()
    }

    pub(crate) fn set_markup(&self, markup: String) {
        *self.markup.lock() = Some(markup);
    }
}

impl std::fmt::Debug for Instance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Instance")
            .field("path", &self.path)
            .field("state", &self.state())
            .field("values", &*self.values.read())
            .finish_non_exhaustive()
    }
}
