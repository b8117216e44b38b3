//! Construction blueprints for concrete types
//!
//! Rust has no runtime reflection, so a concrete type describes its own
//! constructor to the engine: an ordered parameter list, an adapter that
//! consumes resolved arguments, an optional list of property-injected
//! fields, and an optional lifecycle hook.
//!
//! # Example
//!
//! ```rust
//! use bindery::{ArgSet, Blueprint, ParamSpec, Result};
//! use std::sync::Arc;
//!
//! trait Mailer: Send + Sync {
//!     fn send(&self, to: &str);
//! }
//!
//! struct Notifier {
//!     mailer: Arc<dyn Mailer>,
//!     retries: u32,
//! }
//!
//! impl Blueprint for Notifier {
//!     fn parameters() -> Vec<ParamSpec> {
//!         vec![
//!             ParamSpec::new::<dyn Mailer>("mailer"),
//!             ParamSpec::new::<u32>("retries").with_default(|| 3u32),
//!         ]
//!     }
//!
//!     fn construct(args: &mut ArgSet) -> Result<Self> {
//!         Ok(Self {
//!             mailer: args.handle::<dyn Mailer>("mailer")?,
//!             retries: args.take::<u32>("retries")?,
//!         })
//!     }
//! }
//! ```

use crate::binding::{
    downcast_arc_unchecked, ErasedInstance, ExplicitValues, ExposeFn, Scope, TypeKey, ValueProducer,
};
use crate::error::{AssemblyError, Result};
use crate::properties::PropertyStore;
use ahash::AHashMap;
use std::any::Any;
use std::sync::Arc;

// =============================================================================
// Parameter descriptors
// =============================================================================

/// Describes one constructor parameter: its name, its declared type
/// (interface or concrete, used for recursive resolution), and an
/// optional default value.
pub struct ParamSpec {
    pub(crate) name: &'static str,
    pub(crate) ty: TypeKey,
    pub(crate) default: Option<ValueProducer>,
}

impl ParamSpec {
    /// Declare a parameter of type `T`. For dependencies resolved through
    /// the registry, `T` is the interface (e.g. `dyn Mailer`) or a bound
    /// concrete type; for literal parameters it is the value type itself.
    #[inline]
    pub fn new<T: ?Sized + 'static>(name: &'static str) -> Self {
        Self {
            name,
            ty: TypeKey::of::<T>(),
            default: None,
        }
    }

    /// Attach a default value, used when no explicit value was supplied
    /// at bind time. An explicit value always wins when present.
    pub fn with_default<T, F>(mut self, default: F) -> Self
    where
        T: Send + Sync + 'static,
        F: Fn() -> T + Send + Sync + 'static,
    {
        self.default = Some(Arc::new(move || Box::new(default())));
        self
    }

    /// The parameter name.
    #[inline]
    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl std::fmt::Debug for ParamSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ParamSpec")
            .field("name", &self.name)
            .field("ty", &self.ty)
            .field("has_default", &self.default.is_some())
            .finish()
    }
}

// =============================================================================
// Resolved arguments
// =============================================================================

/// The resolved argument list handed to [`Blueprint::construct`],
/// keyed by parameter name.
///
/// Dependency parameters are stored as `Arc<T>` handles (extract with
/// [`handle`](ArgSet::handle)); literal and defaulted parameters are
/// stored as plain values (extract with [`take`](ArgSet::take)).
pub struct ArgSet {
    slots: AHashMap<&'static str, Box<dyn Any + Send + Sync>>,
}

impl ArgSet {
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: AHashMap::with_capacity(capacity),
        }
    }

    pub(crate) fn put(&mut self, name: &'static str, value: Box<dyn Any + Send + Sync>) {
        self.slots.insert(name, value);
    }

    /// Remove and return the named argument as a plain value of type `T`.
    pub fn take<T: Send + Sync + 'static>(&mut self, name: &str) -> Result<T> {
        let slot = self
            .slots
            .remove(name)
            .ok_or_else(|| AssemblyError::mismatched_argument::<T>(name))?;
        slot.downcast::<T>()
            .map(|boxed| *boxed)
            .map_err(|_| AssemblyError::mismatched_argument::<T>(name))
    }

    /// Remove and return the named dependency as an `Arc<I>` handle.
    #[inline]
    pub fn handle<I: ?Sized + Send + Sync + 'static>(&mut self, name: &str) -> Result<Arc<I>> {
        self.take::<Arc<I>>(name)
    }

    /// Number of arguments not yet consumed.
    #[inline]
    pub fn remaining(&self) -> usize {
        self.slots.len()
    }
}

// =============================================================================
// Property-injected fields
// =============================================================================

/// A `(property key, setter)` pair for one injectable field of `C`.
///
/// After construction the engine looks the key up in the property store
/// and writes the value through the setter. Fields are independent of
/// one another; application order is unspecified.
pub struct FieldSpec<C> {
    key: &'static str,
    apply: Arc<dyn Fn(&mut C, &PropertyStore) -> Result<()> + Send + Sync>,
}

impl<C: 'static> FieldSpec<C> {
    /// Inject the property stored under `key` (of type `T`) via `set`.
    pub fn new<T, F>(key: &'static str, set: F) -> Self
    where
        T: Clone + Send + Sync + 'static,
        F: Fn(&mut C, T) + Send + Sync + 'static,
    {
        Self {
            key,
            apply: Arc::new(move |target, props| {
                let raw = props
                    .raw(key)
                    .ok_or_else(|| AssemblyError::property_not_found::<C>(key))?;
                let value = raw.downcast_ref::<T>().cloned().ok_or_else(|| {
                    AssemblyError::PropertyTypeMismatch {
                        key,
                        type_name: std::any::type_name::<C>(),
                        expected: std::any::type_name::<T>(),
                    }
                })?;
                set(target, value);
                Ok(())
            }),
        }
    }

    /// The property-store key this field reads.
    #[inline]
    pub fn key(&self) -> &'static str {
        self.key
    }

    pub(crate) fn apply(&self, target: &mut C, props: &PropertyStore) -> Result<()> {
        (self.apply)(target, props)
    }
}

// =============================================================================
// Blueprint trait
// =============================================================================

/// How to build a concrete type: its constructor parameter list, the
/// constructor adapter itself, its property-injected fields, and its
/// post-construction lifecycle hook.
///
/// Only [`construct`](Blueprint::construct) is mandatory; the other
/// methods default to "no parameters", "no injected fields", and
/// "no lifecycle work".
pub trait Blueprint: Send + Sync + Sized + 'static {
    /// Constructor parameters in declaration order.
    fn parameters() -> Vec<ParamSpec> {
        Vec::new()
    }

    /// Build an instance from the resolved arguments.
    fn construct(args: &mut ArgSet) -> Result<Self>;

    /// Fields to fill from the property store after construction.
    fn injected_fields() -> Vec<FieldSpec<Self>> {
        Vec::new()
    }

    /// Lifecycle hook, invoked exactly once per constructed instance,
    /// after all injected values are visible and before the instance is
    /// returned or cached. A failure aborts the assembly.
    fn activate(&mut self) -> Result<()> {
        Ok(())
    }
}

// =============================================================================
// Erased recipe
// =============================================================================

type ConstructFn = Arc<dyn Fn(&mut ArgSet) -> Result<Box<dyn Any + Send + Sync>> + Send + Sync>;
type FinalizeFn =
    Arc<dyn Fn(&mut Box<dyn Any + Send + Sync>, &PropertyStore) -> Result<()> + Send + Sync>;

/// Type-erased construction record for one concrete type, built from its
/// [`Blueprint`] impl when a binding targeting it is registered.
pub(crate) struct Recipe {
    pub(crate) concrete: TypeKey,
    pub(crate) scope: Scope,
    pub(crate) explicit: ExplicitValues,
    pub(crate) parameters: fn() -> Vec<ParamSpec>,
    pub(crate) construct: ConstructFn,
    pub(crate) finalize: FinalizeFn,
    /// Hands out `Arc<C>` when the concrete type is requested directly
    pub(crate) self_expose: ExposeFn,
}

impl Recipe {
    pub(crate) fn of<C: Blueprint>(scope: Scope, explicit: ExplicitValues) -> Self {
        Self {
            concrete: TypeKey::of::<C>(),
            scope,
            explicit,
            parameters: C::parameters,
            construct: Arc::new(|args| {
                let instance = C::construct(args)?;
                Ok(Box::new(instance) as Box<dyn Any + Send + Sync>)
            }),
            finalize: Arc::new(|boxed, props| {
                let target = boxed.downcast_mut::<C>().ok_or_else(|| {
                    AssemblyError::Internal(format!(
                        "recipe for {} finalized a foreign instance",
                        std::any::type_name::<C>()
                    ))
                })?;
                for field in C::injected_fields() {
                    field.apply(target, props)?;
                }
                target.activate()
            }),
            self_expose: Arc::new(|erased: &ErasedInstance| {
                // SAFETY: the recipe only ever finalizes instances it
                // constructed itself, so the erased Arc holds a C.
                let typed: Arc<C> = unsafe { downcast_arc_unchecked(Arc::clone(erased)) };
                Box::new(typed)
            }),
        }
    }
}

impl std::fmt::Debug for Recipe {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Recipe")
            .field("concrete", &self.concrete)
            .field("scope", &self.scope)
            .field("explicit_values", &self.explicit.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Plain {
        n: u32,
    }

    impl Blueprint for Plain {
        fn parameters() -> Vec<ParamSpec> {
            vec![ParamSpec::new::<u32>("n").with_default(|| 5u32)]
        }

        fn construct(args: &mut ArgSet) -> Result<Self> {
            Ok(Self {
                n: args.take::<u32>("n")?,
            })
        }
    }

    #[test]
    fn test_arg_set_take() {
        let mut args = ArgSet::with_capacity(1);
        args.put("n", Box::new(9u32));

        assert_eq!(args.take::<u32>("n").unwrap(), 9);
        assert_eq!(args.remaining(), 0);
    }

    #[test]
    fn test_arg_set_missing_name() {
        let mut args = ArgSet::with_capacity(0);
        let err = args.take::<u32>("n").unwrap_err();
        assert!(matches!(err, AssemblyError::MismatchedArgument { .. }));
    }

    #[test]
    fn test_arg_set_wrong_type() {
        let mut args = ArgSet::with_capacity(1);
        args.put("n", Box::new("nine".to_string()));

        let err = args.take::<u32>("n").unwrap_err();
        assert!(matches!(err, AssemblyError::MismatchedArgument { .. }));
    }

    #[test]
    fn test_arg_set_handle() {
        trait Port: Send + Sync {
            fn id(&self) -> u32;
        }
        struct Adapter;
        impl Port for Adapter {
            fn id(&self) -> u32 {
                1
            }
        }

        let handle: Arc<dyn Port> = Arc::new(Adapter);
        let mut args = ArgSet::with_capacity(1);
        args.put("port", Box::new(handle));

        let got = args.handle::<dyn Port>("port").unwrap();
        assert_eq!(got.id(), 1);
    }

    #[test]
    fn test_recipe_construct_and_finalize() {
        let recipe = Recipe::of::<Plain>(Scope::Singleton, ExplicitValues::new());

        let mut args = ArgSet::with_capacity(1);
        args.put("n", Box::new(3u32));

        let mut boxed = (recipe.construct)(&mut args).unwrap();
        (recipe.finalize)(&mut boxed, &PropertyStore::empty()).unwrap();

        let plain = boxed.downcast::<Plain>().unwrap();
        assert_eq!(plain.n, 3);
    }

    #[test]
    fn test_field_spec_missing_property() {
        struct Configured {
            url: String,
        }
        let spec: FieldSpec<Configured> =
            FieldSpec::new("this.does.not.exist", |c: &mut Configured, v: String| c.url = v);

        let mut target = Configured { url: String::new() };
        let err = spec.apply(&mut target, &PropertyStore::empty()).unwrap_err();
        assert!(matches!(err, AssemblyError::PropertyNotFound { .. }));
    }

    #[test]
    fn test_field_spec_type_mismatch() {
        struct Configured {
            size: usize,
        }
        let spec: FieldSpec<Configured> = FieldSpec::new("cache.size", |c: &mut Configured, v: usize| c.size = v);

        let props = PropertyStore::builder()
            .set("cache.size", "not a number".to_string())
            .build();

        let mut target = Configured { size: 0 };
        let err = spec.apply(&mut target, &props).unwrap_err();
        assert!(matches!(err, AssemblyError::PropertyTypeMismatch { .. }));
    }

    #[test]
    fn test_field_spec_assigns() {
        struct Configured {
            url: String,
        }
        let spec: FieldSpec<Configured> = FieldSpec::new("db.url", |c: &mut Configured, v: String| c.url = v);

        let props = PropertyStore::builder()
            .set("db.url", "postgres://localhost".to_string())
            .build();

        let mut target = Configured { url: String::new() };
        spec.apply(&mut target, &props).unwrap();
        assert_eq!(target.url, "postgres://localhost");
    }
}
