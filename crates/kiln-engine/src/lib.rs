//! Kiln Class-Composition Engine
//!
//! This crate implements a declarative class-composition runtime: object
//! classes are assembled at runtime from directive-laden definitions —
//! inheritance (`extend`), trait composition (`mixins`), declared
//! dependencies (`requires`/`uses`), generated config accessors
//! (`config`/`cachedConfig`), conditional overrides (`platformConfig`/
//! `responsiveConfig`), post-hoc patches (`override`), and name-based
//! lookup (`alias`/`xtype`) for factory instantiation.
//!
//! - **Directives**: the declaration surface (`directive` module)
//! - **Resolution**: dependency graph, worklist, cycle detection
//!   (`resolver` module)
//! - **Finalization**: deterministic merge into immutable descriptors
//!   (`builder` module)
//! - **Configs**: accessor synthesis and conditional resolution
//!   (`config`, `rules`, `environment` modules)
//! - **Instantiation**: construction-time merge, singletons, template
//!   collaborator (`factory`, `instance` modules)
//!
//! # Example
//!
//! ```rust,ignore
//! use kiln_engine::{DirectiveSet, Runtime};
//! use serde_json::json;
//!
//! let mut rt = Runtime::new();
//! rt.define(
//!     "Widget.Panel",
//!     DirectiveSet::from_value(json!({
//!         "alias": "widget.panel",
//!         "config": { "title": "untitled", "collapsible": false }
//!     }))?,
//! )?;
//!
//! let panel = rt.create("widget.panel", None)?;
//! assert_eq!(panel.get("title")?, json!("untitled"));
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

/// Declarative directive surface: `DirectiveSet` and its serde model.
pub mod directive;

/// Structured error taxonomy.
pub mod error;

/// Class registry, node lifecycle, and alias indexes.
pub mod registry;

/// Dependency graph: hard/soft edges and cycle detection.
pub mod resolver;

/// Class finalization: the deterministic merge pass.
pub mod builder;

/// Config property synthesis and conditional resolution.
pub mod config;

/// Responsive rule expression language.
pub mod rules;

/// Platform/responsive environment snapshot.
pub mod environment;

/// Override queueing and sequencing.
pub mod overrides;

/// Constructed instances and config accessors.
pub mod instance;

/// Instance construction and the template collaborator.
pub mod factory;

/// The process-scoped runtime facade.
pub mod runtime;

pub use builder::{ClassDescriptor, Member, MemberOrigin};
pub use config::{ConfigChange, ConfigProperty};
pub use directive::{DirectiveMap, DirectiveSet, MixinEntry};
pub use environment::Environment;
pub use error::{EngineError, EngineResult};
pub use factory::TemplateEngine;
pub use instance::{ChangeListener, ConfigValidator, Instance, InstanceState};
pub use overrides::OverrideRecord;
pub use registry::LifecycleState;
pub use runtime::{InitHook, Runtime};
