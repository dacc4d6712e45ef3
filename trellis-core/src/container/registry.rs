// Binding registry: abstract -> concrete mappings, instances and aliases

use super::key::{AnyArc, Key};
use super::resolver::Resolver;
use crate::Result;
use futures_util::future::BoxFuture;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::OnceCell;

/// Type-erased factory. Every concrete, sync or async, is reduced to this.
pub(crate) type FactoryFn =
    Arc<dyn Fn(Resolver) -> BoxFuture<'static, Result<AnyArc>> + Send + Sync>;

/// How long a resolved instance is kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Lifetime {
    /// A fresh instance on every resolution (`cached = false`).
    #[default]
    Transient,
    /// One instance for the lifetime of the container owning the binding.
    Singleton,
    /// One instance per scoped container.
    Scoped,
}

impl Lifetime {
    /// Map the `cached`/`scoped` flag pair onto a lifetime.
    pub fn from_flags(cached: bool, scoped: bool) -> Self {
        match (cached, scoped) {
            (_, true) => Lifetime::Scoped,
            (true, false) => Lifetime::Singleton,
            (false, false) => Lifetime::Transient,
        }
    }

    pub fn is_cached(&self) -> bool {
        !matches!(self, Lifetime::Transient)
    }
}

/// A registered way of producing an abstract.
#[derive(Clone)]
pub struct Binding {
    pub(crate) factory: FactoryFn,
    lifetime: Lifetime,
    asynchronous: bool,
    /// Singleton cache; unused for other lifetimes.
    pub(crate) cell: Arc<OnceCell<AnyArc>>,
}

impl Binding {
    pub(crate) fn new(factory: FactoryFn, lifetime: Lifetime, asynchronous: bool) -> Self {
        Self {
            factory,
            lifetime,
            asynchronous,
            cell: Arc::new(OnceCell::new()),
        }
    }

    pub fn lifetime(&self) -> Lifetime {
        self.lifetime
    }

    /// Whether the concrete was registered as an async factory.
    pub fn is_async(&self) -> bool {
        self.asynchronous
    }
}

impl std::fmt::Debug for Binding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Binding")
            .field("lifetime", &self.lifetime)
            .field("asynchronous", &self.asynchronous)
            .field("initialized", &self.cell.initialized())
            .finish()
    }
}

/// The tables of one container level.
#[derive(Default)]
pub(crate) struct Registry {
    bindings: HashMap<Key, Binding>,
    instances: HashMap<Key, AnyArc>,
    aliases: HashMap<Arc<str>, Key>,
}

impl Registry {
    /// Insert a binding, returning the one it replaced.
    pub fn bind(&mut self, key: Key, binding: Binding) -> Option<Binding> {
        self.bindings.insert(key, binding)
    }

    pub fn instance(&mut self, key: Key, value: AnyArc) -> Option<AnyArc> {
        self.instances.insert(key, value)
    }

    pub fn alias(&mut self, alias: Arc<str>, target: Key) {
        self.aliases.insert(alias, target);
    }

    pub fn binding(&self, key: &Key) -> Option<&Binding> {
        self.bindings.get(key)
    }

    pub fn instance_of(&self, key: &Key) -> Option<&AnyArc> {
        self.instances.get(key)
    }

    pub fn alias_target(&self, alias: &str) -> Option<&Key> {
        self.aliases.get(alias)
    }

    pub fn bound(&self, key: &Key) -> bool {
        self.bindings.contains_key(key) || self.instances.contains_key(key)
    }

    pub fn has_scoped(&self) -> bool {
        self.bindings
            .values()
            .any(|binding| binding.lifetime == Lifetime::Scoped)
    }

    pub fn forget_instance(&mut self, key: &Key) -> Option<AnyArc> {
        self.instances.remove(key)
    }

    /// Drop every binding, instance and alias.
    pub fn flush(&mut self) {
        self.bindings.clear();
        self.instances.clear();
        self.aliases.clear();
    }

    pub fn len(&self) -> usize {
        self.bindings.len() + self.instances.len()
    }
}
