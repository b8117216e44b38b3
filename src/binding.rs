//! Core binding vocabulary: type keys, scopes, and explicit values
//!
//! A binding associates an interface type with the concrete type that
//! implements it. Scope and explicit constructor values are recorded per
//! concrete type, so two interfaces bound to the same implementation
//! share them.

use ahash::AHashMap;
use std::any::{Any, TypeId};
use std::sync::Arc;

/// An erased, shareable constructed instance.
pub(crate) type ErasedInstance = Arc<dyn Any + Send + Sync>;

/// Converts an erased instance into a boxed typed handle (`Arc<I>` for
/// some interface or concrete `I`) for the caller that requested it.
pub(crate) type ExposeFn = Arc<dyn Fn(&ErasedInstance) -> Box<dyn Any + Send + Sync> + Send + Sync>;

/// Downcast an `Arc<dyn Any + Send + Sync>` to `Arc<T>` without runtime type checking.
///
/// # Safety
///
/// The `Arc` must have been created from a value of type `T`. In this
/// crate that holds because instances are stored and looked up under the
/// `TypeId` they were registered with, and every expose closure is built
/// at bind time where the concrete type is statically known.
#[inline]
pub(crate) unsafe fn downcast_arc_unchecked<T: Send + Sync + 'static>(
    arc: Arc<dyn Any + Send + Sync>,
) -> Arc<T> {
    let ptr = Arc::into_raw(arc);
    // SAFETY: ptr came from Arc::into_raw and the caller guarantees T is correct
    unsafe { Arc::from_raw(ptr as *const T) }
}

/// An opaque, equality-comparable token naming a type.
///
/// Works for sized types and trait objects alike:
///
/// ```rust
/// use bindery::TypeKey;
///
/// trait Logger: Send + Sync {}
/// struct ConsoleLogger;
///
/// let interface = TypeKey::of::<dyn Logger>();
/// let concrete = TypeKey::of::<ConsoleLogger>();
/// assert_ne!(interface, concrete);
/// assert_eq!(concrete, TypeKey::of::<ConsoleLogger>());
/// ```
#[derive(Clone, Copy)]
pub struct TypeKey {
    pub(crate) id: TypeId,
    pub(crate) name: &'static str,
}

impl TypeKey {
    /// Key for type `T` (which may be unsized, e.g. `dyn Trait`).
    #[inline]
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
        }
    }

    /// The type name this key was created with.
    #[inline]
    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl PartialEq for TypeKey {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TypeKey {}

impl std::hash::Hash for TypeKey {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl std::fmt::Debug for TypeKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "TypeKey({})", self.name)
    }
}

impl std::fmt::Display for TypeKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name)
    }
}

/// Lifetime/sharing policy for a concrete type's instances.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Scope {
    /// One shared instance per assembler, created on first request
    #[default]
    Singleton,

    /// Fresh instance on every request
    NewInstance,
}

/// Produces a fresh boxed copy of a literal argument value.
pub(crate) type ValueProducer = Arc<dyn Fn() -> Box<dyn Any + Send + Sync> + Send + Sync>;

/// Literal constructor-argument values supplied at bind time, keyed by
/// parameter name.
///
/// A key that is present always wins over a parameter's declared default,
/// whatever the stored value is. Values must be `Clone` so NewInstance
/// scoped types can be constructed repeatedly.
///
/// ```rust
/// use bindery::ExplicitValues;
///
/// let values = ExplicitValues::new()
///     .with("n", 42u32)
///     .with("pair", ('a', 'z'));
/// assert!(values.contains("n"));
/// assert_eq!(values.len(), 2);
/// ```
#[derive(Clone, Default)]
pub struct ExplicitValues {
    values: AHashMap<&'static str, ValueProducer>,
}

impl ExplicitValues {
    /// Create an empty value map.
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a literal value for the named constructor parameter.
    pub fn with<T: Clone + Send + Sync + 'static>(mut self, name: &'static str, value: T) -> Self {
        self.values
            .insert(name, Arc::new(move || Box::new(value.clone())));
        self
    }

    /// Whether a value for the parameter name is present.
    #[inline]
    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    /// Number of explicit values.
    #[inline]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether there are no explicit values.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Fetch the producer for a parameter name.
    #[inline]
    pub(crate) fn producer(&self, name: &str) -> Option<&ValueProducer> {
        self.values.get(name)
    }
}

impl std::fmt::Debug for ExplicitValues {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExplicitValues")
            .field("keys", &self.values.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// An interface-to-concrete association held by the registry.
pub(crate) struct Binding {
    /// The concrete type this interface resolves to
    pub(crate) concrete: TypeKey,
    /// Turns an erased concrete instance into the interface handle
    pub(crate) expose: ExposeFn,
}

#[cfg(test)]
mod tests {
    use super::*;

    trait Greeter: Send + Sync {}

    #[derive(Clone)]
    struct EnglishGreeter;

    impl Greeter for EnglishGreeter {}

    #[test]
    fn test_type_key_identity() {
        assert_eq!(TypeKey::of::<EnglishGreeter>(), TypeKey::of::<EnglishGreeter>());
        assert_ne!(TypeKey::of::<dyn Greeter>(), TypeKey::of::<EnglishGreeter>());
        assert_ne!(TypeKey::of::<u32>(), TypeKey::of::<u64>());
    }

    #[test]
    fn test_type_key_display_uses_name() {
        let key = TypeKey::of::<u32>();
        assert_eq!(format!("{key}"), "u32");
    }

    #[test]
    fn test_explicit_values_produce_fresh_boxes() {
        let values = ExplicitValues::new().with("n", 7u32);
        let producer = values.producer("n").unwrap();

        let a = producer().downcast::<u32>().unwrap();
        let b = producer().downcast::<u32>().unwrap();
        assert_eq!(*a, 7);
        assert_eq!(*b, 7);
    }

    #[test]
    fn test_explicit_values_overwrite_same_name() {
        let values = ExplicitValues::new().with("n", 1u32).with("n", 2u32);
        assert_eq!(values.len(), 1);

        let got = values.producer("n").unwrap()().downcast::<u32>().unwrap();
        assert_eq!(*got, 2);
    }

    #[test]
    fn test_unchecked_downcast_round_trip() {
        let erased: ErasedInstance = Arc::new(EnglishGreeter);
        let typed: Arc<EnglishGreeter> = unsafe { downcast_arc_unchecked(erased) };
        let _: &dyn Greeter = typed.as_ref();
    }

    #[test]
    fn test_scope_default_is_singleton() {
        assert_eq!(Scope::default(), Scope::Singleton);
    }
}
