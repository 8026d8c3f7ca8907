//! A promise with no rejection channel, for work that cannot fail or whose
//! failures are reported some other way.
//!
//! It is a facade over [`crate::Promise`] with an uninhabited error, so both
//! share one settlement state machine.
//!
//! # Examples
//!
//! ```
//! use promise_lite::resolve_only::Promise;
//! use std::sync::mpsc::channel;
//!
//! let (tx, rx) = channel();
//! let promise = Promise::<u8>::new(|resolve| resolve.resolve(42));
//! promise.then(move |value| tx.send(value).unwrap());
//! assert_eq!(rx.try_recv(), Ok(42));
//! ```
use std::{
    convert::Infallible,
    fmt,
    future::Future,
    pin::Pin,
    task::{Context, Poll},
};

use crate::{Configuration, Settlement};

pub struct Promise<T> {
    promise: crate::Promise<T, Infallible>,
}

pub struct Resolver<T> {
    resolver: crate::Resolver<T, Infallible>,
}

impl<T: Clone + Send + 'static> Resolver<T> {
    /// Only the first call has effect.
    pub fn resolve(&self, value: T) {
        self.resolver.resolve(value)
    }
}

impl<T: Clone + Send + 'static> Promise<T> {
    /// Creates a promise and runs `executor` on it before returning.
    pub fn new<F>(executor: F) -> Self
    where
        F: FnOnce(Resolver<T>),
    {
        Self::configured(&Configuration::default(), None, executor)
    }

    pub fn with_description<F>(description: &str, executor: F) -> Self
    where
        F: FnOnce(Resolver<T>),
    {
        Self::configured(&Configuration::default(), Some(description), executor)
    }

    pub fn configured<F>(configuration: &Configuration, description: Option<&str>, executor: F) -> Self
    where
        F: FnOnce(Resolver<T>),
    {
        let promise = crate::Promise::configured(configuration, description, |resolver, _| {
            executor(Resolver { resolver });
            Ok(())
        });
        Self { promise }
    }

    pub fn resolved(value: T) -> Self {
        Self {
            promise: crate::Promise::resolved(value),
        }
    }

    /// Runs `on_fulfilled` with the value: right away if already fulfilled,
    /// otherwise on the resolving call, after callbacks registered earlier.
    pub fn then<F>(&self, on_fulfilled: F)
    where
        F: FnOnce(T) + Send + 'static,
    {
        self.promise.observe(on_fulfilled, |never| match never {})
    }

    /// The value, once fulfilled.
    pub fn value(&self) -> Option<T> {
        match self.promise.state() {
            Settlement::Pending => None,
            Settlement::Fulfilled(value) => Some(value),
            Settlement::Rejected(never) => match never {},
        }
    }

    pub fn is_pending(&self) -> bool {
        self.promise.is_pending()
    }

    pub fn description(&self) -> Option<&str> {
        self.promise.description()
    }

    /// Lifts into the full promise so it can be chained with fallible
    /// continuations. The result fulfills when this does and never rejects
    /// on its own.
    pub fn into_promise<E>(self) -> crate::Promise<T, E>
    where
        E: Clone + Send + 'static,
    {
        crate::Promise::configured(self.promise.configuration(), None, |resolve, _| {
            self.then(move |value| resolve.resolve(value));
            Ok(())
        })
    }
}

impl<T: Clone> Future for Promise<T> {
    type Output = T;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match Pin::new(&mut self.get_mut().promise).poll(cx) {
            Poll::Ready(Ok(value)) => Poll::Ready(value),
            Poll::Ready(Err(never)) => match never {},
            Poll::Pending => Poll::Pending,
        }
    }
}

impl<T> Clone for Promise<T> {
    fn clone(&self) -> Self {
        Self {
            promise: self.promise.clone(),
        }
    }
}

impl<T> Clone for Resolver<T> {
    fn clone(&self) -> Self {
        Self {
            resolver: self.resolver.clone(),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Promise<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.promise, f)
    }
}

impl<T> fmt::Debug for Resolver<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.resolver, f)
    }
}

#[cfg(test)]
mod tests {
    use super::Promise;
    use crate::{Error, Settlement};
    use futures::executor::block_on;
    use std::{
        sync::{mpsc, Arc, Mutex},
        thread,
    };

    fn pending<T: Clone + Send + 'static>() -> (Promise<T>, super::Resolver<T>) {
        let (tx, rx) = mpsc::channel();
        let promise = Promise::new(move |resolve| tx.send(resolve).unwrap());
        (promise, rx.recv().unwrap())
    }

    #[test]
    fn test_then_is_queued_until_resolved() {
        let (promise, resolve) = pending::<&str>();
        let seen = Arc::new(Mutex::new(Vec::new()));
        for n in 0..3 {
            let seen = seen.clone();
            promise.then(move |value| seen.lock().unwrap().push(format!("{n}:{value}")));
        }
        assert!(promise.is_pending());
        assert_eq!(promise.value(), None);

        resolve.resolve("hi");
        resolve.resolve("again");
        assert_eq!(*seen.lock().unwrap(), vec!["0:hi", "1:hi", "2:hi"]);
        assert_eq!(promise.value(), Some("hi"));
    }

    #[test]
    fn test_then_after_resolve_runs_inline() {
        let promise = Promise::resolved(5);
        let seen = Arc::new(Mutex::new(None));
        let slot = seen.clone();
        promise.then(move |value| *slot.lock().unwrap() = Some(value));
        assert_eq!(*seen.lock().unwrap(), Some(5));
    }

    #[test]
    fn test_into_promise_chains() {
        let (promise, resolve) = pending::<i32>();
        let chained = promise
            .into_promise::<Error>()
            .flat_map(|value| Ok(crate::Promise::resolved(value * 2)));
        assert!(chained.is_pending());
        resolve.resolve(10);
        assert!(matches!(chained.state(), Settlement::Fulfilled(20)));
    }

    #[test]
    fn test_await_from_thread() {
        let (promise, resolve) = pending::<String>();
        let task1 = thread::spawn(move || block_on(promise));
        let task2 = thread::spawn(move || resolve.resolve(String::from("🍓")));
        task2.join().expect("The task2 thread has panicked");
        assert_eq!(task1.join().expect("The task1 thread has panicked"), "🍓");
    }

    #[test]
    fn test_description() {
        let promise = Promise::<()>::with_description("warmup", |resolve| resolve.resolve(()));
        assert_eq!(promise.description(), Some("warmup"));
        assert_eq!(promise.value(), Some(()));
    }
}
