//! The assembly engine
//!
//! Given a binding registry and a property store, the `Assembler` builds
//! object graphs on demand: it resolves a requested type to its concrete
//! implementation, recursively assembles constructor dependencies,
//! injects property values, runs the lifecycle hook, and caches
//! singleton instances.

use crate::binding::{ErasedInstance, Scope, TypeKey};
use crate::blueprint::{ArgSet, Recipe};
use crate::error::{AssemblyError, Result};
use crate::properties::PropertyStore;
use crate::registry::BindingRegistry;
use ahash::RandomState;
use dashmap::DashMap;
use std::any::{Any, TypeId};
use std::sync::Arc;

#[cfg(feature = "logging")]
use tracing::{debug, trace};

// =============================================================================
// Cycle tracking
// =============================================================================

/// Ordered set of concrete types currently being built within one
/// top-level assembly. Created per call, discarded at its end, never
/// shared across concurrent assemblies.
#[derive(Default)]
struct AssemblyTrail {
    entries: Vec<TypeKey>,
}

impl AssemblyTrail {
    /// Record that `key` is now being built. Fails if it already is:
    /// a type may not depend on itself, directly or transitively.
    fn enter(&mut self, key: TypeKey) -> Result<()> {
        if let Some(pos) = self.entries.iter().position(|k| *k == key) {
            let chain = self.entries[pos..]
                .iter()
                .map(TypeKey::name)
                .chain(std::iter::once(key.name()))
                .collect::<Vec<_>>()
                .join(" -> ");
            return Err(AssemblyError::CircularDependency {
                type_name: key.name(),
                chain,
            });
        }
        self.entries.push(key);
        Ok(())
    }

    /// The most recent entry finished building; siblings may reuse it.
    fn leave(&mut self) {
        self.entries.pop();
    }
}

// =============================================================================
// Assembler
// =============================================================================

/// Resolution engine over one binding registry and one property store.
///
/// Owns the singleton instance cache, keyed by concrete type and never
/// evicted for the assembler's lifetime.
///
/// # Examples
///
/// ```rust
/// use bindery::{ArgSet, Assembler, BindingRegistry, Blueprint, PropertyStore, Result};
/// use std::sync::Arc;
///
/// trait Greeter: Send + Sync {
///     fn greet(&self) -> String;
/// }
///
/// struct EnglishGreeter;
///
/// impl Greeter for EnglishGreeter {
///     fn greet(&self) -> String { "hello".into() }
/// }
///
/// impl Blueprint for EnglishGreeter {
///     fn construct(_args: &mut ArgSet) -> Result<Self> {
///         Ok(EnglishGreeter)
///     }
/// }
///
/// let registry = BindingRegistry::new();
/// registry.bind::<dyn Greeter, EnglishGreeter>(|c| c).unwrap();
///
/// let assembler = Assembler::new(registry, PropertyStore::empty());
/// let greeter: Arc<dyn Greeter> = assembler.assemble::<dyn Greeter>().unwrap();
/// assert_eq!(greeter.greet(), "hello");
/// ```
pub struct Assembler {
    registry: Arc<BindingRegistry>,
    properties: PropertyStore,
    /// Singleton cache: concrete TypeId -> constructed instance
    instances: DashMap<TypeId, ErasedInstance, RandomState>,
}

impl Assembler {
    /// Create an assembler over a registry and a property store.
    #[inline]
    pub fn new(registry: BindingRegistry, properties: PropertyStore) -> Self {
        Self::with_shared(Arc::new(registry), properties)
    }

    /// Create an assembler over an already shared registry.
    #[inline]
    pub fn with_shared(registry: Arc<BindingRegistry>, properties: PropertyStore) -> Self {
        #[cfg(feature = "logging")]
        debug!(
            target: "bindery",
            bindings = registry.len(),
            properties = properties.len(),
            "Assembler created"
        );

        Self {
            registry,
            properties,
            instances: DashMap::with_capacity_and_hasher_and_shard_amount(
                0,
                RandomState::new(),
                8,
            ),
        }
    }

    /// The registry this assembler resolves against.
    #[inline]
    pub fn registry(&self) -> &BindingRegistry {
        &self.registry
    }

    /// The property store used for field injection.
    #[inline]
    pub fn properties(&self) -> &PropertyStore {
        &self.properties
    }

    /// Number of cached singleton instances.
    #[inline]
    pub fn cached_instances(&self) -> usize {
        self.instances.len()
    }

    // =========================================================================
    // Assembly
    // =========================================================================

    /// Assemble an instance of `I` (a bound interface, or a concrete type
    /// known to the registry), building its full dependency graph.
    ///
    /// Singleton-scoped concrete types are built at most once per
    /// assembler and returned from the cache afterwards, with no second
    /// lifecycle-hook invocation. NewInstance-scoped types are rebuilt on
    /// every request.
    pub fn assemble<I: ?Sized + Send + Sync + 'static>(&self) -> Result<Arc<I>> {
        let key = TypeKey::of::<I>();

        #[cfg(feature = "logging")]
        trace!(target: "bindery", requested = key.name(), "Assembly requested");

        let mut trail = AssemblyTrail::default();
        let boxed = self.assemble_key(key, &mut trail)?;
        boxed.downcast::<Arc<I>>().map(|b| *b).map_err(|_| {
            AssemblyError::Internal(format!(
                "binding for {} exposed a different surface type",
                key.name()
            ))
        })
    }

    /// Like [`assemble`](Self::assemble), returning `None` on any failure.
    #[inline]
    pub fn try_assemble<I: ?Sized + Send + Sync + 'static>(&self) -> Option<Arc<I>> {
        self.assemble::<I>().ok()
    }

    /// Resolve, build, and expose one requested key.
    fn assemble_key(
        &self,
        key: TypeKey,
        trail: &mut AssemblyTrail,
    ) -> Result<Box<dyn Any + Send + Sync>> {
        let (concrete, expose) = self.registry.resolution(key)?;
        let erased = self.build(concrete, trail)?;
        Ok(expose(&erased))
    }

    /// Build the concrete type, honoring scope, cycle tracking, and the
    /// singleton cache.
    fn build(&self, concrete: TypeKey, trail: &mut AssemblyTrail) -> Result<ErasedInstance> {
        let recipe = self.registry.recipe(&concrete)?;

        if recipe.scope == Scope::Singleton {
            if let Some(existing) = self.instances.get(&concrete.id) {
                #[cfg(feature = "logging")]
                trace!(
                    target: "bindery",
                    concrete = concrete.name(),
                    "Singleton served from instance cache"
                );
                return Ok(Arc::clone(existing.value()));
            }
        }

        trail.enter(concrete)?;
        let outcome = self.construct(&recipe, trail);
        trail.leave();
        let instance = outcome?;

        match recipe.scope {
            Scope::Singleton => {
                // First successful writer wins: a racing builder's extra
                // instance is dropped and every caller gets the retained one.
                let retained = self.instances.entry(concrete.id).or_insert(instance);
                Ok(Arc::clone(retained.value()))
            }
            Scope::NewInstance => Ok(instance),
        }
    }

    /// Resolve arguments, run the constructor adapter, inject properties,
    /// and fire the lifecycle hook.
    fn construct(&self, recipe: &Recipe, trail: &mut AssemblyTrail) -> Result<ErasedInstance> {
        #[cfg(feature = "logging")]
        debug!(
            target: "bindery",
            concrete = recipe.concrete.name(),
            scope = ?recipe.scope,
            "Constructing instance"
        );

        let params = (recipe.parameters)();
        let mut args = ArgSet::with_capacity(params.len());
        for param in &params {
            if let Some(producer) = recipe.explicit.producer(param.name) {
                args.put(param.name, producer());
            } else if let Some(default) = &param.default {
                args.put(param.name, default());
            } else {
                args.put(param.name, self.assemble_key(param.ty, trail)?);
            }
        }

        let mut boxed = (recipe.construct)(&mut args)?;
        (recipe.finalize)(&mut boxed, &self.properties)?;
        Ok(Arc::from(boxed))
    }
}

impl std::fmt::Debug for Assembler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Assembler")
            .field("registry", &self.registry)
            .field("cached_instances", &self.instances.len())
            .finish()
    }
}
