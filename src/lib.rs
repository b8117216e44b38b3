//! # Bindery - Binding Registry and Object Assembly for Rust
//!
//! A small dependency-injection container: register interface-to-concrete
//! bindings, then assemble full object graphs on demand.
//!
//! ## Features
//!
//! - 🔗 **Interface bindings** - Bind `dyn Trait` to the concrete type that implements it
//! - 🌲 **Recursive assembly** - Constructor dependencies are resolved transitively
//! - ♻️ **Scoped instances** - Singleton (one shared instance) or NewInstance (fresh per request)
//! - 🔁 **Cycle detection** - Circular dependency graphs fail with the offending chain
//! - 🧩 **Explicit values** - Literal constructor arguments supplied at bind time
//! - 🗝️ **Property injection** - Fields filled from a flat key/value property store
//! - 🚀 **Lifecycle hook** - One post-construction callback per instance
//! - 📊 **Observable** - Optional tracing integration with JSON or pretty output
//!
//! ## Quick Start
//!
//! ```rust
//! use bindery::{ArgSet, Assembler, BindingRegistry, Blueprint, ParamSpec, PropertyStore, Result};
//! use std::sync::Arc;
//!
//! trait Repository: Send + Sync {
//!     fn get(&self, id: u32) -> String;
//! }
//!
//! struct MemoryRepository;
//!
//! impl Repository for MemoryRepository {
//!     fn get(&self, id: u32) -> String {
//!         format!("record-{id}")
//!     }
//! }
//!
//! impl Blueprint for MemoryRepository {
//!     fn construct(_args: &mut ArgSet) -> Result<Self> {
//!         Ok(MemoryRepository)
//!     }
//! }
//!
//! struct UserService {
//!     repo: Arc<dyn Repository>,
//! }
//!
//! impl Blueprint for UserService {
//!     fn parameters() -> Vec<ParamSpec> {
//!         vec![ParamSpec::new::<dyn Repository>("repo")]
//!     }
//!
//!     fn construct(args: &mut ArgSet) -> Result<Self> {
//!         Ok(Self {
//!             repo: args.handle::<dyn Repository>("repo")?,
//!         })
//!     }
//! }
//!
//! let registry = BindingRegistry::new();
//! registry.bind::<dyn Repository, MemoryRepository>(|c| c).unwrap();
//! registry.register::<UserService>();
//!
//! let assembler = Assembler::new(registry, PropertyStore::empty());
//! let service = assembler.assemble::<UserService>().unwrap();
//! assert_eq!(service.repo.get(7), "record-7");
//! ```
//!
//! ## Scopes
//!
//! Scope attaches to the concrete type: `Singleton` types are built once
//! per assembler and shared (also between different interfaces bound to
//! the same implementation); `NewInstance` types are rebuilt on every
//! request.
//!
//! ## Property injection and lifecycle
//!
//! A [`Blueprint`] may declare injected fields as `(key, setter)` pairs;
//! after construction each key is looked up in the [`PropertyStore`] and
//! written through the setter. A missing key aborts the assembly. When
//! all values are in place, [`Blueprint::activate`] runs exactly once
//! before the instance is returned or cached.

mod assembler;
mod binding;
mod blueprint;
mod error;
#[cfg(feature = "logging")]
pub mod logging;
mod properties;
mod registry;

pub use assembler::Assembler;
pub use binding::{ExplicitValues, Scope, TypeKey};
pub use blueprint::{ArgSet, Blueprint, FieldSpec, ParamSpec};
pub use error::{AssemblyError, Result};
pub use properties::{PropertyStore, PropertyStoreBuilder};
pub use registry::BindingRegistry;

// Re-export tracing macros for convenience when logging feature is enabled
#[cfg(feature = "logging")]
pub use tracing::{debug, error, info, trace, warn};

// Re-export for convenience
pub use std::sync::Arc;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::{
        ArgSet, Assembler, AssemblyError, BindingRegistry, Blueprint, ExplicitValues, FieldSpec,
        ParamSpec, PropertyStore, Result, Scope, TypeKey,
    };
    pub use std::sync::Arc;
}
