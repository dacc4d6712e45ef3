//! Parameter injection.
//!
//! A callable's parameters are classified by their types. Each parameter type
//! implements [`Dependency`], which decides where its value comes from:
//!
//! - `Arc<T>`: caller-supplied if present in the [`Arguments`], otherwise
//!   resolved from the container.
//! - `Option<Arc<T>>`: like `Arc<T>`, but `None` when `T` is unbound.
//! - [`Param<T>`]: never injected; the caller must supply a `T`.
//! - [`Named<T, N>`]: resolved from the container under the string key `N::NAME`.
//! - [`Container`] / [`Resolver`]: the container performing the call.
//!
//! [`Callable`] and [`SyncCallable`] are implemented for every function and
//! closure of up to twelve `Dependency` parameters.

use super::resolver::Resolver;
use super::Container;
use crate::{Error, Result};
use async_trait::async_trait;
use futures_util::future::BoxFuture;
use std::any::Any;
use std::future::Future;
use std::marker::PhantomData;
use std::ops::Deref;
use std::sync::Arc;

/// Values supplied explicitly by the caller of [`Container::call`].
///
/// Values are matched to parameters by type; each value satisfies at most one
/// parameter, in declaration order.
#[derive(Default)]
pub struct Arguments {
    values: Vec<Box<dyn Any + Send>>,
}

impl Arguments {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style [`push`](Self::push).
    pub fn with<T: Send + 'static>(mut self, value: T) -> Self {
        self.push(value);
        self
    }

    pub fn push<T: Send + 'static>(&mut self, value: T) {
        self.values.push(Box::new(value));
    }

    /// Remove and return the first supplied value of type `T`.
    pub fn take<T: 'static>(&mut self) -> Option<T> {
        let index = self.values.iter().position(|value| value.is::<T>())?;
        self.values
            .remove(index)
            .downcast::<T>()
            .ok()
            .map(|value| *value)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl std::fmt::Debug for Arguments {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Arguments")
            .field("len", &self.values.len())
            .finish()
    }
}

/// A parameter type that knows how to obtain its value.
///
/// `extract` runs synchronously to claim caller-supplied arguments; the
/// returned future performs any container resolution.
pub trait Dependency: Sized + Send + 'static {
    fn extract(resolver: &Resolver, args: &mut Arguments) -> BoxFuture<'static, Result<Self>>;
}

fn ready<T: Send + 'static>(value: Result<T>) -> BoxFuture<'static, Result<T>> {
    Box::pin(async move { value })
}

impl<T: ?Sized + Send + Sync + 'static> Dependency for Arc<T> {
    fn extract(resolver: &Resolver, args: &mut Arguments) -> BoxFuture<'static, Result<Self>> {
        match args.take::<Arc<T>>() {
            Some(value) => ready(Ok(value)),
            None => resolver.get::<T>(),
        }
    }
}

impl<T: ?Sized + Send + Sync + 'static> Dependency for Option<Arc<T>> {
    fn extract(resolver: &Resolver, args: &mut Arguments) -> BoxFuture<'static, Result<Self>> {
        if let Some(value) = args.take::<Arc<T>>() {
            return ready(Ok(Some(value)));
        }
        let pending = resolver.get::<T>();
        Box::pin(async move {
            match pending.await {
                Ok(value) => Ok(Some(value)),
                Err(Error::UnboundAbstract(_)) => Ok(None),
                Err(e) => Err(e),
            }
        })
    }
}

impl Dependency for Container {
    fn extract(resolver: &Resolver, _args: &mut Arguments) -> BoxFuture<'static, Result<Self>> {
        ready(Ok(resolver.container().clone()))
    }
}

impl Dependency for Resolver {
    fn extract(resolver: &Resolver, _args: &mut Arguments) -> BoxFuture<'static, Result<Self>> {
        ready(Ok(resolver.clone()))
    }
}

/// A parameter the container never injects; it must be supplied by the
/// caller through [`Arguments`]. Use it for primitives and plain values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Param<T>(pub T);

impl<T> Param<T> {
    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T> Deref for Param<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.0
    }
}

impl<T: Send + 'static> Dependency for Param<T> {
    fn extract(_resolver: &Resolver, args: &mut Arguments) -> BoxFuture<'static, Result<Self>> {
        let value = args
            .take::<T>()
            .map(Param)
            .ok_or_else(|| Error::MissingArgument(std::any::type_name::<T>().to_string()));
        ready(value)
    }
}

/// Compile-time name of a string abstract, used with [`Named`].
pub trait Name: Send + Sync + 'static {
    const NAME: &'static str;
}

/// A dependency resolved under a string key instead of its type.
pub struct Named<T: ?Sized, N: Name> {
    value: Arc<T>,
    _name: PhantomData<N>,
}

impl<T: ?Sized, N: Name> Named<T, N> {
    pub fn into_inner(self) -> Arc<T> {
        self.value
    }
}

impl<T: ?Sized, N: Name> Deref for Named<T, N> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.value
    }
}

impl<T: ?Sized + Send + Sync + 'static, N: Name> Dependency for Named<T, N> {
    fn extract(resolver: &Resolver, _args: &mut Arguments) -> BoxFuture<'static, Result<Self>> {
        let pending = resolver.get_named::<T>(N::NAME);
        Box::pin(async move {
            Ok(Named {
                value: pending.await?,
                _name: PhantomData,
            })
        })
    }
}

/// Types that can construct themselves from the container
/// (the self-binding case of `bind`).
#[async_trait]
pub trait Injectable: Sized + Send + Sync + 'static {
    async fn inject(resolver: &Resolver) -> Result<Self>;
}

/// An async function whose parameters are all [`Dependency`] types.
pub trait Callable<Args>: Clone + Send + Sync + 'static {
    type Output: Send + 'static;

    fn invoke(&self, resolver: &Resolver, args: Arguments)
    -> BoxFuture<'static, Result<Self::Output>>;
}

/// A synchronous function whose parameters are all [`Dependency`] types.
/// The body runs inline once the parameters are resolved.
pub trait SyncCallable<Args>: Clone + Send + Sync + 'static {
    type Output: Send + 'static;

    fn invoke(&self, resolver: &Resolver, args: Arguments)
    -> BoxFuture<'static, Result<Self::Output>>;
}

macro_rules! impl_callables {
    ($($param:ident),*) => {
        impl<F, Fut, $($param,)*> Callable<($($param,)*)> for F
        where
            F: Fn($($param),*) -> Fut + Clone + Send + Sync + 'static,
            Fut: Future + Send + 'static,
            Fut::Output: Send + 'static,
            $($param: Dependency,)*
        {
            type Output = Fut::Output;

            #[allow(non_snake_case, unused_mut, unused_variables)]
            fn invoke(
                &self,
                resolver: &Resolver,
                mut args: Arguments,
            ) -> BoxFuture<'static, Result<Self::Output>> {
                $(let $param = <$param as Dependency>::extract(resolver, &mut args);)*
                let callable = self.clone();
                Box::pin(async move {
                    $(let $param = $param.await?;)*
                    Ok(callable($($param),*).await)
                })
            }
        }

        impl<F, R, $($param,)*> SyncCallable<($($param,)*)> for F
        where
            F: Fn($($param),*) -> R + Clone + Send + Sync + 'static,
            R: Send + 'static,
            $($param: Dependency,)*
        {
            type Output = R;

            #[allow(non_snake_case, unused_mut, unused_variables)]
            fn invoke(
                &self,
                resolver: &Resolver,
                mut args: Arguments,
            ) -> BoxFuture<'static, Result<Self::Output>> {
                $(let $param = <$param as Dependency>::extract(resolver, &mut args);)*
                let callable = self.clone();
                Box::pin(async move {
                    $(let $param = $param.await?;)*
                    Ok(callable($($param),*))
                })
            }
        }
    };
}

impl_callables!();
impl_callables!(A1);
impl_callables!(A1, A2);
impl_callables!(A1, A2, A3);
impl_callables!(A1, A2, A3, A4);
impl_callables!(A1, A2, A3, A4, A5);
impl_callables!(A1, A2, A3, A4, A5, A6);
impl_callables!(A1, A2, A3, A4, A5, A6, A7);
impl_callables!(A1, A2, A3, A4, A5, A6, A7, A8);
impl_callables!(A1, A2, A3, A4, A5, A6, A7, A8, A9);
impl_callables!(A1, A2, A3, A4, A5, A6, A7, A8, A9, A10);
impl_callables!(A1, A2, A3, A4, A5, A6, A7, A8, A9, A10, A11);
impl_callables!(A1, A2, A3, A4, A5, A6, A7, A8, A9, A10, A11, A12);
