// Recursive resolution of abstracts

use super::key::{AnyArc, Key, downcast};
use super::registry::{Binding, Lifetime};
use super::Container;
use crate::logging::{debug, trace, warn};
use crate::{Error, Result};
use futures_util::future::BoxFuture;
use std::sync::Arc;

/// Resolution context handed to factories and parameter extractors.
///
/// A resolver pairs the container that resolution starts from with the
/// chain of abstracts currently being constructed, so that a binding that
/// (directly or transitively) depends on itself fails with
/// [`Error::CircularDependency`] instead of recursing forever.
#[derive(Clone)]
pub struct Resolver {
    container: Container,
    path: Arc<Vec<Key>>,
}

impl Resolver {
    pub fn new(container: Container) -> Self {
        Self {
            container,
            path: Arc::new(Vec::new()),
        }
    }

    /// The container resolution starts from.
    pub fn container(&self) -> &Container {
        &self.container
    }

    /// Abstracts currently under construction, outermost first.
    pub fn path(&self) -> &[Key] {
        &self.path
    }

    /// Resolve `T` by type.
    pub fn get<T: ?Sized + Send + Sync + 'static>(&self) -> BoxFuture<'static, Result<Arc<T>>> {
        self.get_key(Key::of::<T>())
    }

    /// Resolve the value registered under the string abstract `name`.
    pub fn get_named<T: ?Sized + Send + Sync + 'static>(
        &self,
        name: &str,
    ) -> BoxFuture<'static, Result<Arc<T>>> {
        self.get_key(Key::named(name))
    }

    pub fn get_key<T: ?Sized + Send + Sync + 'static>(
        &self,
        key: Key,
    ) -> BoxFuture<'static, Result<Arc<T>>> {
        let pending = self.resolve(key.clone());
        Box::pin(async move {
            let value = pending.await?;
            downcast::<T>(&key, &value)
        })
    }

    /// Resolve an abstract to its type-erased value.
    pub fn resolve(&self, key: Key) -> BoxFuture<'static, Result<AnyArc>> {
        let resolver = self.clone();
        Box::pin(async move { resolver.resolve_inner(key).await })
    }

    /// A resolver for the dependencies of `key`, rooted at `container`.
    pub(crate) fn descend(&self, container: Container, key: Key) -> Resolver {
        let mut path = Vec::with_capacity(self.path.len() + 1);
        path.extend(self.path.iter().cloned());
        path.push(key);
        Resolver {
            container,
            path: Arc::new(path),
        }
    }

    fn cycle(&self, key: &Key) -> Error {
        let mut chain: Vec<String> = self.path.iter().map(|k| k.name().to_string()).collect();
        chain.push(key.name().to_string());
        Error::CircularDependency(chain)
    }

    async fn resolve_inner(self, key: Key) -> Result<AnyArc> {
        let key = self.container.canonical(key)?;

        if self.path.contains(&key) {
            let err = self.cycle(&key);
            warn!(abstract_name = %key, error = %err, "Circular dependency");
            return Err(err);
        }

        if self.container.is_terminated() {
            return Err(Error::ScopeTerminated);
        }

        if let Some(instance) = self.container.lookup_instance(&key) {
            trace!(abstract_name = %key, "Resolved registered instance");
            return Ok(instance);
        }

        let Some((binding, owner)) = self.container.lookup_binding(&key) else {
            debug!(abstract_name = %key, "No binding found");
            return Err(Error::UnboundAbstract(key.name().to_string()));
        };

        match binding.lifetime() {
            Lifetime::Transient => {
                let resolver = self.descend(self.container.clone(), key.clone());
                construct(&binding, resolver, &self.container, &key).await
            }
            Lifetime::Singleton => {
                // Dependencies of a singleton come from the container that
                // owns the binding, never from the requesting scope.
                let cell = binding.cell.clone();
                if let Some(value) = cell.get() {
                    trace!(abstract_name = %key, "Resolved cached singleton");
                    return Ok(value.clone());
                }
                let resolver = self.descend(owner, key.clone());
                let value = cell
                    .get_or_try_init(|| construct(&binding, resolver, &self.container, &key))
                    .await?;
                Ok(value.clone())
            }
            Lifetime::Scoped => {
                let cell = self.container.scoped_cell(&key);
                if let Some(value) = cell.get() {
                    trace!(abstract_name = %key, "Resolved cached scoped instance");
                    return Ok(value.clone());
                }
                let resolver = self.descend(self.container.clone(), key.clone());
                let value = cell
                    .get_or_try_init(|| construct(&binding, resolver, &self.container, &key))
                    .await?;
                Ok(value.clone())
            }
        }
    }
}

async fn construct(
    binding: &Binding,
    resolver: Resolver,
    requester: &Container,
    key: &Key,
) -> Result<AnyArc> {
    debug!(
        abstract_name = %key,
        lifetime = ?binding.lifetime(),
        asynchronous = binding.is_async(),
        "Constructing instance"
    );
    let value = (binding.factory)(resolver).await?;
    requester.fire_resolved(key, &value);
    Ok(value)
}

impl std::fmt::Debug for Resolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Resolver")
            .field("depth", &self.container.depth())
            .field("path", &self.path)
            .finish()
    }
}
