use std::{
    fmt,
    future::Future,
    pin::Pin,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    task::{Context, Poll, Waker},
};

use crate::{
    config::Configuration,
    delivery::{self, Job},
    Error,
};

type Observer<T, E> = Box<dyn FnOnce(Result<T, E>) + Send>;

/// Where a promise is in its lifecycle. `Fulfilled` and `Rejected` are
/// terminal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Settlement<T, E = Error> {
    Pending,
    Fulfilled(T),
    Rejected(E),
}

impl<T, E> Settlement<T, E> {
    pub fn is_pending(&self) -> bool {
        matches!(self, Settlement::Pending)
    }

    /// `None` while pending.
    pub fn into_result(self) -> Option<Result<T, E>> {
        match self {
            Settlement::Pending => None,
            Settlement::Fulfilled(value) => Some(Ok(value)),
            Settlement::Rejected(error) => Some(Err(error)),
        }
    }
}

impl<T: Clone, E: Clone> Settlement<T, E> {
    fn outcome(&self) -> Option<Result<T, E>> {
        self.clone().into_result()
    }
}

struct Inner<T, E> {
    state: Settlement<T, E>,
    observers: Vec<Observer<T, E>>,
    wakers: Vec<Waker>,
}

struct Shared<T, E> {
    description: Option<Arc<str>>,
    configuration: Configuration,
    inner: Mutex<Inner<T, E>>,
}

impl<T, E> Shared<T, E> {
    fn lock(&self) -> MutexGuard<'_, Inner<T, E>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn label(&self) -> &str {
        self.description.as_deref().unwrap_or("<anonymous>")
    }
}

impl<T, E> Shared<T, E>
where
    T: Clone + Send + 'static,
    E: Clone + Send + 'static,
{
    /// First settlement wins; later calls are ignored.
    fn settle(&self, outcome: Result<T, E>) {
        let (observers, wakers) = {
            let mut inner = self.lock();
            if !inner.state.is_pending() {
                tracing::trace!(promise = self.label(), "ignoring repeated settlement");
                return;
            }
            inner.state = match &outcome {
                Ok(value) => Settlement::Fulfilled(value.clone()),
                Err(error) => Settlement::Rejected(error.clone()),
            };
            (
                std::mem::take(&mut inner.observers),
                std::mem::take(&mut inner.wakers),
            )
        };
        tracing::trace!(
            promise = self.label(),
            fulfilled = outcome.is_ok(),
            observers = observers.len(),
            "promise settled"
        );

        for waker in wakers {
            waker.wake()
        }
        delivery::deliver(observers.into_iter().map(|observer| {
            let outcome = outcome.clone();
            Box::new(move || observer(outcome)) as Job
        }));
    }
}

/// The eventual result of an asynchronous computation.
///
/// Cloning a `Promise` clones the handle, not the computation: every clone
/// observes the same settlement.
///
/// # Examples
///
/// ```
/// use promise_lite::{Promise, Settlement};
/// use std::thread;
///
/// let (tx, rx) = std::sync::mpsc::channel();
/// let promise = Promise::<String>::new(move |resolve, _| {
///     tx.send(resolve).unwrap();
///     Ok(())
/// });
/// assert!(promise.is_pending());
///
/// thread::spawn(move || rx.recv().unwrap().resolve("🍓".into()))
///     .join()
///     .expect("The resolver thread has panicked");
/// assert!(matches!(promise.state(), Settlement::Fulfilled(ref value) if value == "🍓"));
/// ```
pub struct Promise<T, E = Error> {
    shared: Arc<Shared<T, E>>,
}

/// Fulfills the promise it was handed out by. Only the first settlement of
/// that promise, through any resolver or rejecter, has effect.
pub struct Resolver<T, E = Error> {
    shared: Arc<Shared<T, E>>,
}

/// Rejects the promise it was handed out by. Only the first settlement of
/// that promise, through any resolver or rejecter, has effect.
pub struct Rejecter<T, E = Error> {
    shared: Arc<Shared<T, E>>,
}

impl<T, E> Resolver<T, E>
where
    T: Clone + Send + 'static,
    E: Clone + Send + 'static,
{
    pub fn resolve(&self, value: T) {
        self.shared.settle(Ok(value))
    }
}

impl<T, E> Rejecter<T, E>
where
    T: Clone + Send + 'static,
    E: Clone + Send + 'static,
{
    pub fn reject(&self, error: E) {
        self.shared.settle(Err(error))
    }
}

impl<T, E> Promise<T, E>
where
    T: Clone + Send + 'static,
    E: Clone + Send + 'static,
{
    /// Creates a promise and runs `executor` on it before returning.
    ///
    /// The executor may settle the promise right away or keep the resolver
    /// and rejecter to settle it later from anywhere. Returning `Err` rejects
    /// the promise with that error, unless it was already settled.
    pub fn new<F>(executor: F) -> Self
    where
        F: FnOnce(Resolver<T, E>, Rejecter<T, E>) -> Result<(), E>,
    {
        Self::configured(&Configuration::default(), None, executor)
    }

    /// Like [`new`](Self::new), labelled for diagnostics, e.g.
    /// `fetchUserProfile`.
    pub fn with_description<F>(description: &str, executor: F) -> Self
    where
        F: FnOnce(Resolver<T, E>, Rejecter<T, E>) -> Result<(), E>,
    {
        Self::configured(&Configuration::default(), Some(description), executor)
    }

    /// Like [`new`](Self::new), under an explicit [`Configuration`].
    ///
    /// The configuration's debugger, if any, is told about the creation
    /// before `executor` runs.
    pub fn configured<F>(configuration: &Configuration, description: Option<&str>, executor: F) -> Self
    where
        F: FnOnce(Resolver<T, E>, Rejecter<T, E>) -> Result<(), E>,
    {
        configuration.record_creation::<T>(description);

        let promise = Self {
            shared: Arc::new(Shared {
                description: description.map(Arc::from),
                configuration: configuration.clone(),
                inner: Mutex::new(Inner {
                    state: Settlement::Pending,
                    observers: vec![],
                    wakers: vec![],
                }),
            }),
        };
        let resolver = Resolver {
            shared: promise.shared.clone(),
        };
        let rejecter = Rejecter {
            shared: promise.shared.clone(),
        };
        if let Err(error) = executor(resolver, rejecter) {
            promise.shared.settle(Err(error));
        }
        promise
    }

    /// An already fulfilled promise.
    pub fn resolved(value: T) -> Self {
        Self::settled(&Configuration::default(), Ok(value))
    }

    /// An already rejected promise.
    pub fn rejected(error: E) -> Self {
        Self::settled(&Configuration::default(), Err(error))
    }

    fn settled(configuration: &Configuration, outcome: Result<T, E>) -> Self {
        Self::configured(configuration, None, |resolve, reject| {
            match outcome {
                Ok(value) => resolve.resolve(value),
                Err(error) => reject.reject(error),
            }
            Ok(())
        })
    }

    pub fn state(&self) -> Settlement<T, E> {
        self.shared.lock().state.clone()
    }

    pub fn is_pending(&self) -> bool {
        self.shared.lock().state.is_pending()
    }

    pub fn description(&self) -> Option<&str> {
        self.shared.description.as_deref()
    }

    pub fn configuration(&self) -> &Configuration {
        &self.shared.configuration
    }

    /// Registers a pair of callbacks for the settlement. On a settled promise
    /// the matching callback runs before this returns; otherwise it runs
    /// exactly once, on the settling call, after any pair registered earlier.
    pub(crate) fn observe<F, R>(&self, on_fulfilled: F, on_rejected: R)
    where
        F: FnOnce(T) + Send + 'static,
        R: FnOnce(E) + Send + 'static,
    {
        self.observe_settlement(move |outcome| match outcome {
            Ok(value) => on_fulfilled(value),
            Err(error) => on_rejected(error),
        })
    }

    fn observe_settlement<F>(&self, observer: F)
    where
        F: FnOnce(Result<T, E>) + Send + 'static,
    {
        let outcome = {
            let mut inner = self.shared.lock();
            match inner.state.outcome() {
                Some(outcome) => outcome,
                None => {
                    inner.observers.push(Box::new(observer));
                    return;
                }
            }
        };
        observer(outcome)
    }

    /// Chains a continuation run when this promise fulfills. A rejection
    /// skips it and rejects the returned promise with the same error.
    ///
    /// The returned promise settles the way the promise produced by
    /// `on_fulfilled` settles; an `Err` from `on_fulfilled` rejects it.
    ///
    /// # Examples
    ///
    /// ```
    /// use promise_lite::{Error, Promise, Settlement};
    ///
    /// let boom = Error::msg("boom");
    /// let skipped = Promise::<i32>::rejected(boom).flat_map(|value| -> Result<Promise<i32>, Error> {
    ///     unreachable!("got {value}")
    /// });
    /// assert!(matches!(skipped.state(), Settlement::Rejected(error) if error.to_string() == "boom"));
    /// ```
    pub fn flat_map<U, F>(&self, on_fulfilled: F) -> Promise<U, E>
    where
        U: Clone + Send + 'static,
        F: FnOnce(T) -> Result<Promise<U, E>, E> + Send + 'static,
    {
        self.flat_map_with(on_fulfilled, Err)
    }

    /// Chains a continuation for each outcome; `on_rejected` may recover.
    pub fn flat_map_with<U, F, R>(&self, on_fulfilled: F, on_rejected: R) -> Promise<U, E>
    where
        U: Clone + Send + 'static,
        F: FnOnce(T) -> Result<Promise<U, E>, E> + Send + 'static,
        R: FnOnce(E) -> Result<Promise<U, E>, E> + Send + 'static,
    {
        self.chain(move |outcome| match outcome {
            Ok(value) => on_fulfilled(value),
            Err(error) => on_rejected(error),
        })
    }

    /// The one link every combinator is built on: a promise settled by
    /// whatever promise `continuation` produces from this one's outcome.
    fn chain<U, C>(&self, continuation: C) -> Promise<U, E>
    where
        U: Clone + Send + 'static,
        C: FnOnce(Result<T, E>) -> Result<Promise<U, E>, E> + Send + 'static,
    {
        let configuration = self.shared.configuration.clone();
        Promise::configured(&self.shared.configuration, None, |resolve, reject| {
            self.observe_settlement(move |outcome| {
                let next = continuation(outcome)
                    .unwrap_or_else(|error| Promise::settled(&configuration, Err(error)));
                next.observe(move |value| resolve.resolve(value), move |error| reject.reject(error));
            });
            Ok(())
        })
    }

    /// Transforms the fulfilled value. An `Err` from `f` rejects the result.
    pub fn map<U, F>(&self, f: F) -> Promise<U, E>
    where
        U: Clone + Send + 'static,
        F: FnOnce(T) -> Result<U, E> + Send + 'static,
    {
        let configuration = self.shared.configuration.clone();
        self.flat_map(move |value| Ok(Promise::settled(&configuration, f(value))))
    }

    /// Recovers from a rejection with a promise. Fulfillment passes through.
    pub fn flat_catch<R>(&self, on_rejected: R) -> Promise<T, E>
    where
        R: FnOnce(E) -> Result<Promise<T, E>, E> + Send + 'static,
    {
        let configuration = self.shared.configuration.clone();
        self.flat_map_with(
            move |value| Ok(Promise::settled(&configuration, Ok(value))),
            on_rejected,
        )
    }

    /// Recovers from a rejection with a value, or a new error.
    ///
    /// # Examples
    ///
    /// ```
    /// use promise_lite::{Promise, Settlement};
    ///
    /// let recovered = Promise::<i32>::rejected("offline".into()).catch(|_| Ok(0));
    /// assert_eq!(recovered.state().into_result().map(Result::ok), Some(Some(0)));
    /// ```
    pub fn catch<R>(&self, on_rejected: R) -> Promise<T, E>
    where
        R: FnOnce(E) -> Result<T, E> + Send + 'static,
    {
        let configuration = self.shared.configuration.clone();
        self.flat_catch(move |error| Ok(Promise::settled(&configuration, on_rejected(error))))
    }

    /// Runs `handler` once this promise settles either way. The handler sees
    /// neither the value nor the error; its own result settles the returned
    /// promise.
    ///
    /// # Examples
    ///
    /// ```
    /// use promise_lite::{Promise, Settlement};
    ///
    /// let cleaned = Promise::<i32>::rejected("boom".into()).finally(|| Ok("cleaned up"));
    /// assert!(matches!(cleaned.state(), Settlement::Fulfilled("cleaned up")));
    /// ```
    pub fn finally<U, H>(&self, handler: H) -> Promise<U, E>
    where
        U: Clone + Send + 'static,
        H: FnOnce() -> Result<U, E> + Send + 'static,
    {
        let configuration = self.shared.configuration.clone();
        self.flat_finally(move || Ok(Promise::settled(&configuration, handler())))
    }

    /// Like [`finally`](Self::finally), with a handler that produces a
    /// promise, so the final stage may itself be asynchronous.
    pub fn flat_finally<U, H>(&self, handler: H) -> Promise<U, E>
    where
        U: Clone + Send + 'static,
        H: FnOnce() -> Result<Promise<U, E>, E> + Send + 'static,
    {
        self.chain(move |_| handler())
    }
}

impl<T, E> Future for Promise<T, E>
where
    T: Clone,
    E: Clone,
{
    type Output = Result<T, E>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let mut inner = self.shared.lock();
        match inner.state.outcome() {
            Some(outcome) => Poll::Ready(outcome),
            None => {
                if !inner.wakers.iter().any(|waker| waker.will_wake(cx.waker())) {
                    inner.wakers.push(cx.waker().clone());
                }
                Poll::Pending
            }
        }
    }
}

impl<T, E> Clone for Promise<T, E> {
    fn clone(&self) -> Self {
        Self {
            shared: self.shared.clone(),
        }
    }
}

impl<T, E> Clone for Resolver<T, E> {
    fn clone(&self) -> Self {
        Self {
            shared: self.shared.clone(),
        }
    }
}

impl<T, E> Clone for Rejecter<T, E> {
    fn clone(&self) -> Self {
        Self {
            shared: self.shared.clone(),
        }
    }
}

impl<T: fmt::Debug, E: fmt::Debug> fmt::Debug for Promise<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Promise")
            .field("description", &self.shared.description)
            .field("state", &self.shared.lock().state)
            .finish()
    }
}

impl<T, E> fmt::Debug for Resolver<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resolver")
            .field("promise", &self.shared.label())
            .finish_non_exhaustive()
    }
}

impl<T, E> fmt::Debug for Rejecter<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Rejecter")
            .field("promise", &self.shared.label())
            .finish_non_exhaustive()
    }
}
