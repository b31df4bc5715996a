//! Runtime type descriptors and reflection traits.
//!
//! Component and resource types are identified at runtime by a [`Type`]
//! descriptor rather than by compile-time generics alone. This lets
//! storages, registries and serialization code operate on types they were
//! never compiled against.

mod fields;

pub use fields::{Field, FieldsTrait};

use std::any::TypeId;
use std::fmt;
use std::hash::{Hash, Hasher};

/// Descriptor identifying a reflected type.
///
/// Descriptors are cheap to copy and compare by identity: two descriptors
/// are equal exactly when they refer to the same Rust type, regardless of
/// structure. The [`TypeId`] is the canonical identity, so equality is
/// stable across compilation units.
#[derive(Clone, Copy, Debug)]
pub struct Type {
    id: TypeId,
    name: &'static str,
}

impl Type {
    /// Descriptor for the type `T`.
    pub fn of<T: 'static>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
        }
    }

    /// The canonical identity of the described type.
    pub fn id(&self) -> TypeId {
        self.id
    }

    /// Fully-qualified Rust name, used for diagnostics.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Whether this descriptor refers to `T`.
    pub fn is<T: 'static>(&self) -> bool {
        self.id == TypeId::of::<T>()
    }
}

impl PartialEq for Type {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Type {}

impl Hash for Type {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equality_is_by_identity() {
        assert_eq!(Type::of::<u32>(), Type::of::<u32>());
        assert_ne!(Type::of::<u32>(), Type::of::<i32>());
    }

    #[test]
    fn descriptor_knows_its_type() {
        let ty = Type::of::<String>();
        assert!(ty.is::<String>());
        assert!(!ty.is::<u32>());
        assert!(ty.name().contains("String"));
    }
}
