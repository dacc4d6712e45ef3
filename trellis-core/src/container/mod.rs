// Dependency injection container

mod dependency;
mod key;
mod registry;
mod resolver;
mod scope;

pub use dependency::{
    Arguments, Callable, Dependency, Injectable, Name, Named, Param, SyncCallable,
};
pub use key::Key;
pub use registry::{Binding, Lifetime};
pub use resolver::Resolver;
pub use scope::ScopedContainer;

pub(crate) use key::{AnyArc, downcast, erase};
pub(crate) use registry::FactoryFn;

use crate::logging::{debug, error, trace, warn};
use crate::{Error, Result};
use futures_util::FutureExt;
use futures_util::future::BoxFuture;
use parking_lot::{Mutex, RwLock};
use registry::Registry;
use std::collections::{HashMap, VecDeque};
use std::future::Future;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::OnceCell;

type ResolvingCallback = Arc<dyn Fn(&AnyArc, &Container) + Send + Sync>;

enum Terminator {
    Sync(Box<dyn FnOnce(&Container) + Send>),
    Async(Box<dyn FnOnce(Container) -> BoxFuture<'static, ()> + Send>),
}

/// The dependency injection container.
///
/// Cloning is cheap and yields a handle to the same container. Child
/// containers created with [`create_scoped_container`](Self::create_scoped_container)
/// see every binding and instance of their ancestors.
#[derive(Clone)]
pub struct Container {
    inner: Arc<Inner>,
}

struct Inner {
    parent: Option<Container>,
    depth: usize,
    registry: RwLock<Registry>,
    scoped_instances: Mutex<HashMap<Key, Arc<OnceCell<AnyArc>>>>,
    resolving: RwLock<HashMap<Key, Vec<ResolvingCallback>>>,
    terminating: Mutex<VecDeque<Terminator>>,
    terminated: AtomicBool,
}

impl Inner {
    fn new(parent: Option<Container>) -> Self {
        let depth = parent.as_ref().map_or(0, |p| p.depth() + 1);
        Self {
            parent,
            depth,
            registry: RwLock::new(Registry::default()),
            scoped_instances: Mutex::new(HashMap::new()),
            resolving: RwLock::new(HashMap::new()),
            terminating: Mutex::new(VecDeque::new()),
            terminated: AtomicBool::new(false),
        }
    }
}

impl Default for Container {
    fn default() -> Self {
        Self::new()
    }
}

fn sync_factory<T, Args, F>(concrete: F) -> FactoryFn
where
    T: Send + Sync + 'static,
    Args: 'static,
    F: SyncCallable<Args, Output = T>,
{
    Arc::new(move |resolver: Resolver| -> BoxFuture<'static, Result<AnyArc>> {
        let pending = concrete.invoke(&resolver, Arguments::new());
        Box::pin(async move { Ok(erase(Arc::new(pending.await?))) })
    })
}

fn shared_factory<T, Args, F>(concrete: F) -> FactoryFn
where
    T: ?Sized + Send + Sync + 'static,
    Args: 'static,
    F: SyncCallable<Args, Output = Arc<T>>,
{
    Arc::new(move |resolver: Resolver| -> BoxFuture<'static, Result<AnyArc>> {
        let pending = concrete.invoke(&resolver, Arguments::new());
        Box::pin(async move { Ok(erase(pending.await?)) })
    })
}

fn async_factory<T, Args, F>(concrete: F) -> FactoryFn
where
    T: Send + Sync + 'static,
    Args: 'static,
    F: Callable<Args, Output = Result<T>>,
{
    Arc::new(move |resolver: Resolver| -> BoxFuture<'static, Result<AnyArc>> {
        let pending = concrete.invoke(&resolver, Arguments::new());
        Box::pin(async move { Ok(erase(Arc::new(pending.await??))) })
    })
}

fn injectable_factory<T: Injectable>() -> FactoryFn {
    Arc::new(|resolver: Resolver| -> BoxFuture<'static, Result<AnyArc>> {
        Box::pin(async move { Ok(erase(Arc::new(T::inject(&resolver).await?))) })
    })
}

impl Container {
    pub fn new() -> Self {
        debug!("Creating new DI container");
        Self {
            inner: Arc::new(Inner::new(None)),
        }
    }

    // ========== Registration ==========

    /// Register a binding under `key`, replacing any binding already
    /// registered at this level.
    pub fn register(&self, key: Key, binding: Binding) {
        let lifetime = binding.lifetime();
        trace!(abstract_name = %key, "Acquiring write lock for registration");
        let replaced = self.inner.registry.write().bind(key.clone(), binding);
        debug!(
            abstract_name = %key,
            lifetime = ?lifetime,
            replaced = replaced.is_some(),
            "Binding registered"
        );
    }

    /// Bind `T` to a synchronous factory with the given lifetime. The
    /// factory's parameters are injected.
    pub fn bind_with<T, Args, F>(&self, lifetime: Lifetime, concrete: F)
    where
        T: Send + Sync + 'static,
        Args: 'static,
        F: SyncCallable<Args, Output = T>,
    {
        self.register(
            Key::of::<T>(),
            Binding::new(sync_factory(concrete), lifetime, false),
        );
    }

    /// Bind `T` to a factory producing a fresh instance on each resolution.
    pub fn bind<T, Args, F>(&self, concrete: F)
    where
        T: Send + Sync + 'static,
        Args: 'static,
        F: SyncCallable<Args, Output = T>,
    {
        self.bind_with(Lifetime::Transient, concrete);
    }

    pub fn transient<T, Args, F>(&self, concrete: F)
    where
        T: Send + Sync + 'static,
        Args: 'static,
        F: SyncCallable<Args, Output = T>,
    {
        self.bind_with(Lifetime::Transient, concrete);
    }

    /// Bind `T` to a factory that runs at most once per owning container.
    pub fn singleton<T, Args, F>(&self, concrete: F)
    where
        T: Send + Sync + 'static,
        Args: 'static,
        F: SyncCallable<Args, Output = T>,
    {
        self.bind_with(Lifetime::Singleton, concrete);
    }

    /// Bind `T` to a factory that runs at most once per scoped container.
    pub fn scoped<T, Args, F>(&self, concrete: F)
    where
        T: Send + Sync + 'static,
        Args: 'static,
        F: SyncCallable<Args, Output = T>,
    {
        self.bind_with(Lifetime::Scoped, concrete);
    }

    /// Bind `T` to an async factory. The factory's future is awaited on
    /// resolution; its error aborts the resolution.
    pub fn bind_async_with<T, Args, F>(&self, lifetime: Lifetime, concrete: F)
    where
        T: Send + Sync + 'static,
        Args: 'static,
        F: Callable<Args, Output = Result<T>>,
    {
        self.register(
            Key::of::<T>(),
            Binding::new(async_factory(concrete), lifetime, true),
        );
    }

    pub fn bind_async<T, Args, F>(&self, concrete: F)
    where
        T: Send + Sync + 'static,
        Args: 'static,
        F: Callable<Args, Output = Result<T>>,
    {
        self.bind_async_with(Lifetime::Transient, concrete);
    }

    pub fn singleton_async<T, Args, F>(&self, concrete: F)
    where
        T: Send + Sync + 'static,
        Args: 'static,
        F: Callable<Args, Output = Result<T>>,
    {
        self.bind_async_with(Lifetime::Singleton, concrete);
    }

    pub fn scoped_async<T, Args, F>(&self, concrete: F)
    where
        T: Send + Sync + 'static,
        Args: 'static,
        F: Callable<Args, Output = Result<T>>,
    {
        self.bind_async_with(Lifetime::Scoped, concrete);
    }

    /// Bind a trait object abstract. The factory returns the shared
    /// instance, e.g. `Arc::new(Postgres::new()) as Arc<dyn Database>`.
    pub fn bind_shared<T, Args, F>(&self, lifetime: Lifetime, concrete: F)
    where
        T: ?Sized + Send + Sync + 'static,
        Args: 'static,
        F: SyncCallable<Args, Output = Arc<T>>,
    {
        self.register(
            Key::of::<T>(),
            Binding::new(shared_factory(concrete), lifetime, false),
        );
    }

    /// Bind a value under a string abstract.
    pub fn bind_named<T, Args, F>(&self, name: impl Into<Arc<str>>, lifetime: Lifetime, concrete: F)
    where
        T: Send + Sync + 'static,
        Args: 'static,
        F: SyncCallable<Args, Output = T>,
    {
        self.register(
            Key::named(name),
            Binding::new(sync_factory(concrete), lifetime, false),
        );
    }

    /// Bind `T` to itself, constructed through its [`Injectable`] impl.
    pub fn bind_self<T: Injectable>(&self, lifetime: Lifetime) {
        self.register(
            Key::of::<T>(),
            Binding::new(injectable_factory::<T>(), lifetime, true),
        );
    }

    /// Register a pre-built value. Instances take priority over bindings.
    pub fn instance<T: Send + Sync + 'static>(&self, value: T) {
        self.instance_shared(Arc::new(value));
    }

    pub fn instance_shared<T: ?Sized + Send + Sync + 'static>(&self, value: Arc<T>) {
        self.insert_instance(Key::of::<T>(), erase(value));
    }

    pub fn instance_named<T: Send + Sync + 'static>(&self, name: impl Into<Arc<str>>, value: T) {
        self.insert_instance(Key::named(name), erase(Arc::new(value)));
    }

    fn insert_instance(&self, key: Key, value: AnyArc) {
        self.inner.registry.write().instance(key.clone(), value);
        debug!(abstract_name = %key, "Instance registered");
    }

    /// Make `alias` resolve to `T`.
    pub fn alias<T: ?Sized + 'static>(&self, alias: impl Into<Arc<str>>) {
        self.alias_key(Key::of::<T>(), alias);
    }

    pub fn alias_key(&self, target: Key, alias: impl Into<Arc<str>>) {
        let alias = alias.into();
        debug!(alias = %alias, target = %target, "Alias registered");
        self.inner.registry.write().alias(alias, target);
    }

    // ========== Queries ==========

    /// True if `T` has a binding or instance here or in an ancestor.
    pub fn has<T: ?Sized + 'static>(&self) -> bool {
        self.has_key(&Key::of::<T>())
    }

    pub fn bound<T: ?Sized + 'static>(&self) -> bool {
        self.has::<T>()
    }

    pub fn has_named(&self, name: &str) -> bool {
        self.has_key(&Key::named(name))
    }

    pub fn has_key(&self, key: &Key) -> bool {
        match self.canonical(key.clone()) {
            Ok(key) => self
                .ancestors()
                .any(|container| container.inner.registry.read().bound(&key)),
            Err(_) => false,
        }
    }

    /// True if any binding visible from this container is scoped.
    pub fn has_scoped_bindings(&self) -> bool {
        self.ancestors()
            .any(|container| container.inner.registry.read().has_scoped())
    }

    pub fn is_scoped(&self) -> bool {
        self.inner.parent.is_some()
    }

    pub fn parent(&self) -> Option<&Container> {
        self.inner.parent.as_ref()
    }

    /// Number of ancestors; 0 for a root container.
    pub fn depth(&self) -> usize {
        self.inner.depth
    }

    pub fn is_terminated(&self) -> bool {
        self.inner.terminated.load(Ordering::Acquire)
    }

    // ========== Resolution ==========

    pub fn resolver(&self) -> Resolver {
        Resolver::new(self.clone())
    }

    /// Resolve `T`.
    pub async fn make<T: ?Sized + Send + Sync + 'static>(&self) -> Result<Arc<T>> {
        self.resolver().get::<T>().await
    }

    pub async fn get<T: ?Sized + Send + Sync + 'static>(&self) -> Result<Arc<T>> {
        self.make::<T>().await
    }

    pub async fn make_named<T: ?Sized + Send + Sync + 'static>(&self, name: &str) -> Result<Arc<T>> {
        self.resolver().get_named::<T>(name).await
    }

    pub async fn make_key<T: ?Sized + Send + Sync + 'static>(&self, key: Key) -> Result<Arc<T>> {
        self.resolver().get_key::<T>(key).await
    }

    /// Resolve `T`, mapping an unbound abstract to `None`.
    pub async fn try_make<T: ?Sized + Send + Sync + 'static>(&self) -> Result<Option<Arc<T>>> {
        match self.make::<T>().await {
            Ok(value) => Ok(Some(value)),
            Err(Error::UnboundAbstract(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Resolve `T` if bound, otherwise construct it through its
    /// [`Injectable`] impl without caching.
    pub async fn build<T: Injectable>(&self) -> Result<Arc<T>> {
        if self.has::<T>() {
            return self.make::<T>().await;
        }
        trace!(abstract_name = std::any::type_name::<T>(), "Auto-wiring unbound type");
        let resolver = self.resolver().descend(self.clone(), Key::of::<T>());
        Ok(Arc::new(T::inject(&resolver).await?))
    }

    /// Resolve `T` from synchronous code by blocking on the resolution.
    pub fn make_blocking<T: ?Sized + Send + Sync + 'static>(&self) -> Result<Arc<T>> {
        futures_executor::block_on(self.make::<T>())
    }

    /// Peek at an already constructed instance of `T` without constructing.
    pub fn resolved<T: ?Sized + Send + Sync + 'static>(&self) -> Option<Arc<T>> {
        let key = self.canonical(Key::of::<T>()).ok()?;
        let value = self
            .lookup_instance(&key)
            .or_else(|| self.scoped_value(&key))
            .or_else(|| {
                self.lookup_binding(&key)
                    .and_then(|(binding, _)| binding.cell.get().cloned())
            })?;
        downcast::<T>(&key, &value).ok()
    }

    /// Invoke an async callable, injecting its parameters. Values in `args`
    /// are matched to parameters by type before the container is consulted.
    pub async fn call<Args, F: Callable<Args>>(&self, callable: F, args: Arguments) -> Result<F::Output> {
        callable.invoke(&self.resolver(), args).await
    }

    /// Invoke a synchronous callable, injecting its parameters.
    pub async fn call_sync<Args, F: SyncCallable<Args>>(
        &self,
        callable: F,
        args: Arguments,
    ) -> Result<F::Output> {
        callable.invoke(&self.resolver(), args).await
    }

    /// [`call_sync`](Self::call_sync) for synchronous call sites.
    pub fn call_blocking<Args, F: SyncCallable<Args>>(&self, callable: F, args: Arguments) -> Result<F::Output> {
        futures_executor::block_on(self.call_sync(callable, args))
    }

    // ========== Scopes ==========

    /// Create a child container for one unit of work.
    pub fn create_scoped_container(&self) -> ScopedContainer {
        let child = Container {
            inner: Arc::new(Inner::new(Some(self.clone()))),
        };
        debug!(depth = child.depth(), "Scoped container created");
        ScopedContainer::new(child)
    }

    /// Run `f` in a fresh scope and terminate the scope afterwards, also when
    /// `f` panics (the panic is resumed after teardown).
    pub async fn scope<F, Fut, R>(&self, f: F) -> R
    where
        F: FnOnce(Container) -> Fut,
        Fut: Future<Output = R>,
    {
        let scope = self.create_scoped_container();
        let outcome = AssertUnwindSafe(f(scope.container().clone()))
            .catch_unwind()
            .await;
        scope.terminate().await;
        match outcome {
            Ok(value) => value,
            Err(panic) => std::panic::resume_unwind(panic),
        }
    }

    /// Register a cleanup callback run when this container is terminated.
    pub fn terminating<F>(&self, callback: F)
    where
        F: FnOnce(&Container) + Send + 'static,
    {
        self.push_terminator(Terminator::Sync(Box::new(callback)));
    }

    pub fn terminating_async<F, Fut>(&self, callback: F)
    where
        F: FnOnce(Container) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.push_terminator(Terminator::Async(Box::new(
            move |container: Container| -> BoxFuture<'static, ()> { Box::pin(callback(container)) },
        )));
    }

    /// Register a cleanup callback receiving the scoped instance of `T`.
    /// Skipped when no instance was resolved in this scope.
    pub fn dispose<T, F, Fut>(&self, callback: F)
    where
        T: Send + Sync + 'static,
        F: FnOnce(Arc<T>) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.terminating_async(move |container: Container| async move {
            let key = Key::of::<T>();
            let instance = container
                .scoped_value(&key)
                .and_then(|value| downcast::<T>(&key, &value).ok());
            match instance {
                Some(instance) => callback(instance).await,
                None => trace!(abstract_name = %key, "Nothing to dispose"),
            }
        });
    }

    fn push_terminator(&self, terminator: Terminator) {
        if self.is_terminated() {
            warn!(depth = self.depth(), "Container already terminated, callback discarded");
            return;
        }
        self.inner.terminating.lock().push_back(terminator);
    }

    fn take_terminators(&self) -> Vec<Terminator> {
        self.inner.terminating.lock().drain(..).collect()
    }

    /// Run the terminating callbacks in registration order and release the
    /// scoped instances. Later calls are no-ops.
    ///
    /// Inside a tokio runtime the callbacks run on a spawned task, so
    /// cancelling this future does not cut a callback short.
    pub async fn terminate(&self) {
        if !self.inner.terminated.swap(true, Ordering::AcqRel) {
            debug!(depth = self.depth(), "Terminating container");
        }
        let teardown = run_teardown(self.clone(), self.take_terminators());
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                if let Err(err) = handle.spawn(teardown).await {
                    error!(depth = self.depth(), error = %err, "Teardown task failed");
                }
            }
            Err(_) => teardown.await,
        }
    }

    /// Teardown for a scope dropped without `terminate`. A no-op once
    /// `terminate` has started, since its task owns the callbacks.
    pub(crate) fn terminate_on_drop(&self) {
        if self.inner.terminated.swap(true, Ordering::AcqRel) {
            return;
        }
        let remaining = self.take_terminators();
        if remaining.is_empty() {
            self.inner.scoped_instances.lock().clear();
            return;
        }
        debug!(
            depth = self.depth(),
            callbacks = remaining.len(),
            "Scope dropped without terminate, running teardown"
        );

        if remaining.iter().all(|t| matches!(t, Terminator::Sync(_))) {
            for terminator in remaining {
                if let Terminator::Sync(callback) = terminator {
                    run_sync_terminator(self, callback);
                }
            }
            self.inner.scoped_instances.lock().clear();
            return;
        }

        let teardown = run_teardown(self.clone(), remaining);
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(teardown);
            }
            Err(_) => futures_executor::block_on(teardown),
        }
    }

    // ========== Hooks ==========

    /// Run `callback` after every construction of `T`.
    pub fn after_resolving<T, F>(&self, callback: F)
    where
        T: ?Sized + Send + Sync + 'static,
        F: Fn(&Arc<T>, &Container) + Send + Sync + 'static,
    {
        let key = Key::of::<T>();
        let typed = key.clone();
        let callback: ResolvingCallback = Arc::new(move |value: &AnyArc, container: &Container| {
            match downcast::<T>(&typed, value) {
                Ok(value) => callback(&value, container),
                Err(e) => warn!(error = %e, "Skipping after_resolving callback"),
            }
        });
        self.inner
            .resolving
            .write()
            .entry(key)
            .or_default()
            .push(callback);
    }

    pub fn on_resolved<T, F>(&self, callback: F)
    where
        T: ?Sized + Send + Sync + 'static,
        F: Fn(&Arc<T>, &Container) + Send + Sync + 'static,
    {
        self.after_resolving(callback);
    }

    /// Run the after-resolving callbacks for `key`, ancestors' first.
    pub(crate) fn fire_resolved(&self, key: &Key, value: &AnyArc) {
        let chain: Vec<&Container> = self.ancestors().collect();
        for container in chain.into_iter().rev() {
            let callbacks = container
                .inner
                .resolving
                .read()
                .get(key)
                .cloned()
                .unwrap_or_default();
            for callback in callbacks {
                callback(value, self);
            }
        }
    }

    // ========== Maintenance ==========

    /// Remove a registered instance of `T` from this level.
    pub fn forget_instance<T: ?Sized + 'static>(&self) -> bool {
        self.inner
            .registry
            .write()
            .forget_instance(&Key::of::<T>())
            .is_some()
    }

    /// Drop every binding, instance, alias, cached scoped instance and
    /// after-resolving callback at this level.
    pub fn flush(&self) {
        self.inner.registry.write().flush();
        self.inner.scoped_instances.lock().clear();
        self.inner.resolving.write().clear();
        debug!(depth = self.depth(), "Container flushed");
    }

    // ========== Lookup ==========

    fn ancestors(&self) -> impl Iterator<Item = &Container> {
        std::iter::successors(Some(self), |container| container.inner.parent.as_ref())
    }

    /// Follow aliases until a key that is not an alias.
    pub(crate) fn canonical(&self, key: Key) -> Result<Key> {
        let mut key = key;
        let mut seen: Vec<String> = Vec::new();
        loop {
            let Key::Named(name) = &key else {
                return Ok(key);
            };
            let target = self
                .ancestors()
                .find_map(|container| container.inner.registry.read().alias_target(name).cloned());
            let Some(target) = target else {
                return Ok(key);
            };
            let looped = seen.iter().any(|s| s.as_str() == &**name);
            seen.push(name.to_string());
            if looped {
                return Err(Error::CircularDependency(seen));
            }
            key = target;
        }
    }

    pub(crate) fn lookup_instance(&self, key: &Key) -> Option<AnyArc> {
        self.ancestors()
            .find_map(|container| container.inner.registry.read().instance_of(key).cloned())
    }

    /// The nearest binding for `key` and the container that owns it.
    pub(crate) fn lookup_binding(&self, key: &Key) -> Option<(Binding, Container)> {
        self.ancestors().find_map(|container| {
            container
                .inner
                .registry
                .read()
                .binding(key)
                .cloned()
                .map(|binding| (binding, container.clone()))
        })
    }

    pub(crate) fn scoped_cell(&self, key: &Key) -> Arc<OnceCell<AnyArc>> {
        self.inner
            .scoped_instances
            .lock()
            .entry(key.clone())
            .or_insert_with(|| Arc::new(OnceCell::new()))
            .clone()
    }

    fn scoped_value(&self, key: &Key) -> Option<AnyArc> {
        self.inner
            .scoped_instances
            .lock()
            .get(key)
            .and_then(|cell| cell.get().cloned())
    }
}

fn run_sync_terminator(container: &Container, callback: Box<dyn FnOnce(&Container) + Send>) {
    if catch_unwind(AssertUnwindSafe(|| callback(container))).is_err() {
        error!(depth = container.depth(), "Terminating callback panicked");
    }
}

async fn run_teardown(container: Container, terminators: Vec<Terminator>) {
    for terminator in terminators {
        run_terminator(&container, terminator).await;
    }
    container.inner.scoped_instances.lock().clear();
}

async fn run_terminator(container: &Container, terminator: Terminator) {
    match terminator {
        Terminator::Sync(callback) => run_sync_terminator(container, callback),
        Terminator::Async(callback) => {
            let pending = AssertUnwindSafe(callback(container.clone())).catch_unwind();
            if pending.await.is_err() {
                error!(depth = container.depth(), "Terminating callback panicked");
            }
        }
    }
}

impl std::fmt::Debug for Container {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Container")
            .field("depth", &self.depth())
            .field("registered", &self.inner.registry.read().len())
            .field("terminated", &self.is_terminated())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[derive(Debug)]
    struct Counter(usize);

    #[tokio::test]
    async fn test_instance_wins_over_binding() {
        let container = Container::new();
        container.bind(|| Counter(1));
        container.instance(Counter(2));
        assert_eq!(container.make::<Counter>().await.unwrap().0, 2);
    }

    #[tokio::test]
    async fn test_alias_loop_is_detected() {
        let container = Container::new();
        container.alias_key(Key::named("b"), "a");
        container.alias_key(Key::named("a"), "b");
        let err = container.make_named::<u8>("a").await.err().unwrap();
        assert!(matches!(err, Error::CircularDependency(_)));
    }

    #[tokio::test]
    async fn test_resolved_does_not_construct() {
        let container = Container::new();
        container.singleton(|| Counter(3));
        assert!(container.resolved::<Counter>().is_none());
        container.make::<Counter>().await.unwrap();
        assert_eq!(container.resolved::<Counter>().unwrap().0, 3);
    }

    #[tokio::test]
    async fn test_register_after_terminate_is_discarded() {
        let container = Container::new();
        container.terminate().await;
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = calls.clone();
        container.terminating(move |_| {
            seen.fetch_add(1, Ordering::SeqCst);
        });
        container.terminate().await;
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_panicking_terminator_does_not_stop_teardown() {
        let container = Container::new();
        let calls = Arc::new(AtomicUsize::new(0));
        container.terminating(|_| panic!("boom"));
        let seen = calls.clone();
        container.terminating(move |_| {
            seen.fetch_add(1, Ordering::SeqCst);
        });
        container.terminate().await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_flush_clears_bindings() {
        let container = Container::new();
        container.bind(|| Counter(0));
        assert!(container.has::<Counter>());
        container.flush();
        assert!(!container.has::<Counter>());
    }

    #[test]
    fn test_make_blocking() {
        let container = Container::new();
        container.singleton(|| Counter(9));
        assert_eq!(container.make_blocking::<Counter>().unwrap().0, 9);
    }
}
