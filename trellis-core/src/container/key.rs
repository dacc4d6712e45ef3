// Abstract identifiers and type-erased instances

use crate::{Error, Result};
use std::any::{Any, TypeId};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// A type-erased shared instance. The payload is always an `Arc<T>` so that
/// unsized abstracts (`dyn Trait`) can be stored next to concrete types.
pub(crate) type AnyArc = Arc<dyn Any + Send + Sync>;

/// The "abstract" half of a binding: a type or a string name.
#[derive(Clone)]
pub enum Key {
    Type { id: TypeId, name: &'static str },
    Named(Arc<str>),
}

impl Key {
    /// Key for a (possibly unsized) type.
    pub fn of<T: ?Sized + 'static>() -> Self {
        Key::Type {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
        }
    }

    /// Key for a string abstract.
    pub fn named(name: impl Into<Arc<str>>) -> Self {
        Key::Named(name.into())
    }

    /// Human readable form used in logs and errors.
    pub fn name(&self) -> &str {
        match self {
            Key::Type { name, .. } => name,
            Key::Named(name) => name,
        }
    }
}

impl PartialEq for Key {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Key::Type { id: a, .. }, Key::Type { id: b, .. }) => a == b,
            (Key::Named(a), Key::Named(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Key {}

impl Hash for Key {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match self {
            Key::Type { id, .. } => {
                0u8.hash(state);
                id.hash(state);
            }
            Key::Named(name) => {
                1u8.hash(state);
                name.hash(state);
            }
        }
    }
}

impl fmt::Debug for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Type { name, .. } => write!(f, "Key::Type({})", name),
            Key::Named(name) => write!(f, "Key::Named({:?})", name),
        }
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl From<&str> for Key {
    fn from(name: &str) -> Self {
        Key::named(name)
    }
}

impl From<String> for Key {
    fn from(name: String) -> Self {
        Key::named(name)
    }
}

pub(crate) fn erase<T: ?Sized + Send + Sync + 'static>(value: Arc<T>) -> AnyArc {
    Arc::new(value)
}

pub(crate) fn downcast<T: ?Sized + Send + Sync + 'static>(key: &Key, value: &AnyArc) -> Result<Arc<T>> {
    value.downcast_ref::<Arc<T>>().cloned().ok_or_else(|| {
        Error::TypeMismatch(format!(
            "'{}' does not hold a {}",
            key,
            std::any::type_name::<T>()
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    trait Greeter: Send + Sync {
        fn greet(&self) -> String;
    }

    struct English;

    impl Greeter for English {
        fn greet(&self) -> String {
            "hello".into()
        }
    }

    #[test]
    fn test_type_and_named_keys_differ() {
        let mut keys = HashSet::new();
        keys.insert(Key::of::<String>());
        keys.insert(Key::named("alloc::string::String"));
        keys.insert(Key::of::<String>());
        assert_eq!(keys.len(), 2);
    }

    #[test]
    fn test_erase_and_downcast_unsized() {
        let greeter: Arc<dyn Greeter> = Arc::new(English);
        let key = Key::of::<dyn Greeter>();
        let erased = erase(greeter.clone());
        let back = downcast::<dyn Greeter>(&key, &erased).unwrap();
        assert!(Arc::ptr_eq(&greeter, &back));
        assert_eq!(back.greet(), "hello");
    }

    #[test]
    fn test_downcast_mismatch() {
        let key = Key::of::<u32>();
        let erased = erase(Arc::new(5u32));
        assert!(matches!(
            downcast::<String>(&key, &erased),
            Err(Error::TypeMismatch(_))
        ));
    }
}
