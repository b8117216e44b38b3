//! Error types for binding and assembly

use std::any::TypeId;
use thiserror::Error;

/// Errors that can occur while binding types or assembling instances
#[derive(Error, Debug, Clone)]
pub enum AssemblyError {
    /// `bind` was called with the interface equal to the concrete type
    #[error("cannot bind {type_name} to itself")]
    EqualBinding { type_name: &'static str },

    /// A requested or transitively required type has no binding and is
    /// not itself a known concrete type
    #[error("no binding found for {type_name}")]
    NoBindingFound {
        type_name: &'static str,
        type_id: TypeId,
    },

    /// A type transitively depends on itself within one assembly
    #[error("circular dependency detected while assembling {type_name}: {chain}")]
    CircularDependency {
        type_name: &'static str,
        chain: String,
    },

    /// An injectable field's configuration key is missing from the property store
    #[error("property `{key}` required by {type_name} was not found")]
    PropertyNotFound {
        key: &'static str,
        type_name: &'static str,
    },

    /// The property exists but does not downcast to the declared field type
    #[error("property `{key}` for {type_name} is not a {expected}")]
    PropertyTypeMismatch {
        key: &'static str,
        type_name: &'static str,
        expected: &'static str,
    },

    /// A constructor adapter asked for an argument that is absent or of
    /// a different type than the parameter list declared
    #[error("argument `{name}` is missing or is not a {expected}")]
    MismatchedArgument {
        name: String,
        expected: &'static str,
    },

    /// The constructor or lifecycle hook itself failed
    #[error("failed to construct {type_name}: {reason}")]
    Construction {
        type_name: &'static str,
        reason: String,
    },

    /// Internal invariant violation
    #[error("internal assembly error: {0}")]
    Internal(String),
}

impl AssemblyError {
    /// Create an EqualBinding error for a type
    #[inline]
    pub fn equal_binding<T: ?Sized + 'static>() -> Self {
        Self::EqualBinding {
            type_name: std::any::type_name::<T>(),
        }
    }

    /// Create a NoBindingFound error for a type
    #[inline]
    pub fn no_binding<T: ?Sized + 'static>() -> Self {
        Self::NoBindingFound {
            type_name: std::any::type_name::<T>(),
            type_id: TypeId::of::<T>(),
        }
    }

    /// Create a Construction error
    #[inline]
    pub fn construction<T: ?Sized + 'static>(reason: impl Into<String>) -> Self {
        Self::Construction {
            type_name: std::any::type_name::<T>(),
            reason: reason.into(),
        }
    }

    /// Create a PropertyNotFound error
    #[inline]
    pub fn property_not_found<T: ?Sized + 'static>(key: &'static str) -> Self {
        Self::PropertyNotFound {
            key,
            type_name: std::any::type_name::<T>(),
        }
    }

    /// Create a MismatchedArgument error
    #[inline]
    pub fn mismatched_argument<T: 'static>(name: &str) -> Self {
        Self::MismatchedArgument {
            name: name.to_owned(),
            expected: std::any::type_name::<T>(),
        }
    }
}

/// Result type alias for binding and assembly operations
pub type Result<T> = std::result::Result<T, AssemblyError>;
