//! Binding registry
//!
//! Maps interface types to the concrete types that implement them.
//! Uses `DashMap` with `ahash` so `bind` and resolution are safe under
//! concurrent access without an outer lock.

use crate::binding::{downcast_arc_unchecked, Binding, ErasedInstance, ExplicitValues, ExposeFn, Scope, TypeKey};
use crate::blueprint::{Blueprint, Recipe};
use crate::error::{AssemblyError, Result};
use ahash::RandomState;
use dashmap::DashMap;
use std::any::TypeId;
use std::sync::Arc;

#[cfg(feature = "logging")]
use tracing::debug;

/// Registry of interface-to-concrete bindings.
///
/// Re-binding an interface overwrites the previous binding (last bind
/// wins). Scope and explicit values are recorded against the concrete
/// type: two interfaces bound to the same implementation share them.
///
/// # Examples
///
/// ```rust
/// use bindery::{ArgSet, Blueprint, BindingRegistry, Result};
///
/// trait Clock: Send + Sync {
///     fn now(&self) -> u64;
/// }
///
/// struct FixedClock;
///
/// impl Clock for FixedClock {
///     fn now(&self) -> u64 { 0 }
/// }
///
/// impl Blueprint for FixedClock {
///     fn construct(_args: &mut ArgSet) -> Result<Self> {
///         Ok(FixedClock)
///     }
/// }
///
/// let registry = BindingRegistry::new();
/// registry.bind::<dyn Clock, FixedClock>(|c| c).unwrap();
/// assert!(registry.is_bound::<dyn Clock>());
/// ```
pub struct BindingRegistry {
    /// Interface id -> binding
    bindings: DashMap<TypeId, Binding, RandomState>,
    /// Concrete id -> construction recipe (also marks known concrete types)
    recipes: DashMap<TypeId, Arc<Recipe>, RandomState>,
}

impl BindingRegistry {
    /// Create an empty registry.
    ///
    /// 8 shards: registries hold tens of bindings, not thousands, so the
    /// DashMap default of `num_cpus * 4` shards is overkill.
    #[inline]
    pub fn new() -> Self {
        Self {
            bindings: DashMap::with_capacity_and_hasher_and_shard_amount(0, RandomState::new(), 8),
            recipes: DashMap::with_capacity_and_hasher_and_shard_amount(0, RandomState::new(), 8),
        }
    }

    /// Create a registry with pre-allocated capacity.
    #[inline]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            bindings: DashMap::with_capacity_and_hasher_and_shard_amount(
                capacity,
                RandomState::new(),
                8,
            ),
            recipes: DashMap::with_capacity_and_hasher_and_shard_amount(
                capacity,
                RandomState::new(),
                8,
            ),
        }
    }

    // =========================================================================
    // Binding
    // =========================================================================

    /// Bind interface `I` to concrete type `C` with Singleton scope and
    /// no explicit values.
    ///
    /// `expose` turns a built `Arc<C>` into the interface handle callers
    /// receive; for trait-object interfaces the identity closure `|c| c`
    /// performs the coercion.
    #[inline]
    pub fn bind<I, C>(&self, expose: impl Fn(Arc<C>) -> Arc<I> + Send + Sync + 'static) -> Result<()>
    where
        I: ?Sized + Send + Sync + 'static,
        C: Blueprint,
    {
        self.bind_with::<I, C>(expose, Scope::Singleton, ExplicitValues::new())
    }

    /// Bind with an explicit scope.
    #[inline]
    pub fn bind_as<I, C>(
        &self,
        expose: impl Fn(Arc<C>) -> Arc<I> + Send + Sync + 'static,
        scope: Scope,
    ) -> Result<()>
    where
        I: ?Sized + Send + Sync + 'static,
        C: Blueprint,
    {
        self.bind_with::<I, C>(expose, scope, ExplicitValues::new())
    }

    /// Bind with an explicit scope and literal constructor values.
    ///
    /// Fails with [`AssemblyError::EqualBinding`] if `I` and `C` are the
    /// same type; nothing is registered in that case.
    pub fn bind_with<I, C>(
        &self,
        expose: impl Fn(Arc<C>) -> Arc<I> + Send + Sync + 'static,
        scope: Scope,
        values: ExplicitValues,
    ) -> Result<()>
    where
        I: ?Sized + Send + Sync + 'static,
        C: Blueprint,
    {
        let interface = TypeKey::of::<I>();
        let concrete = TypeKey::of::<C>();

        if interface == concrete {
            return Err(AssemblyError::equal_binding::<I>());
        }

        #[cfg(feature = "logging")]
        debug!(
            target: "bindery",
            interface = interface.name(),
            concrete = concrete.name(),
            scope = ?scope,
            explicit_values = values.len(),
            "Binding registered"
        );

        let erased_expose: ExposeFn = Arc::new(move |erased: &ErasedInstance| {
            // SAFETY: the assembler only hands this closure instances built
            // from C's recipe, verified by the concrete TypeId.
            let typed: Arc<C> = unsafe { downcast_arc_unchecked(Arc::clone(erased)) };
            Box::new(expose(typed))
        });

        self.recipes
            .insert(concrete.id, Arc::new(Recipe::of::<C>(scope, values)));
        self.bindings.insert(
            interface.id,
            Binding {
                concrete,
                expose: erased_expose,
            },
        );
        Ok(())
    }

    /// Register concrete type `C` without an interface binding, with
    /// Singleton scope, so it can be requested directly. Roots of an
    /// object graph often have no interface of their own.
    #[inline]
    pub fn register<C: Blueprint>(&self) {
        self.register_with::<C>(Scope::Singleton, ExplicitValues::new());
    }

    /// Register a concrete type with an explicit scope.
    #[inline]
    pub fn register_as<C: Blueprint>(&self, scope: Scope) {
        self.register_with::<C>(scope, ExplicitValues::new());
    }

    /// Register a concrete type with an explicit scope and literal
    /// constructor values.
    pub fn register_with<C: Blueprint>(&self, scope: Scope, values: ExplicitValues) {
        let concrete = TypeKey::of::<C>();

        #[cfg(feature = "logging")]
        debug!(
            target: "bindery",
            concrete = concrete.name(),
            scope = ?scope,
            explicit_values = values.len(),
            "Concrete type registered"
        );

        self.recipes
            .insert(concrete.id, Arc::new(Recipe::of::<C>(scope, values)));
    }

    // =========================================================================
    // Resolution
    // =========================================================================

    /// Resolve a type key to the concrete type that should be built.
    ///
    /// A bound interface resolves to its binding target; a known concrete
    /// type resolves to itself, so callers may request either.
    pub fn resolve(&self, key: TypeKey) -> Result<TypeKey> {
        if let Some(binding) = self.bindings.get(&key.id) {
            return Ok(binding.concrete);
        }
        if self.recipes.contains_key(&key.id) {
            return Ok(key);
        }
        Err(AssemblyError::NoBindingFound {
            type_name: key.name(),
            type_id: key.id,
        })
    }

    /// Typed convenience for [`resolve`](Self::resolve).
    #[inline]
    pub fn resolve_of<T: ?Sized + 'static>(&self) -> Result<TypeKey> {
        self.resolve(TypeKey::of::<T>())
    }

    /// Resolve to the concrete key plus the expose closure for the
    /// requested surface.
    pub(crate) fn resolution(&self, key: TypeKey) -> Result<(TypeKey, ExposeFn)> {
        if let Some(binding) = self.bindings.get(&key.id) {
            return Ok((binding.concrete, Arc::clone(&binding.expose)));
        }
        if let Some(recipe) = self.recipes.get(&key.id) {
            return Ok((key, Arc::clone(&recipe.self_expose)));
        }
        Err(AssemblyError::NoBindingFound {
            type_name: key.name(),
            type_id: key.id,
        })
    }

    /// Fetch the construction recipe for a concrete key.
    pub(crate) fn recipe(&self, concrete: &TypeKey) -> Result<Arc<Recipe>> {
        self.recipes
            .get(&concrete.id)
            .map(|r| Arc::clone(&r))
            .ok_or(AssemblyError::NoBindingFound {
                type_name: concrete.name(),
                type_id: concrete.id,
            })
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Whether `T` is a bound interface or a known concrete type.
    #[inline]
    pub fn is_bound<T: ?Sized + 'static>(&self) -> bool {
        let id = TypeId::of::<T>();
        self.bindings.contains_key(&id) || self.recipes.contains_key(&id)
    }

    /// Number of registered interface bindings.
    #[inline]
    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    /// Whether no bindings are registered.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

impl Default for BindingRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for BindingRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BindingRegistry")
            .field("bindings", &self.bindings.len())
            .field("concrete_types", &self.recipes.len())
            .finish()
    }
}
