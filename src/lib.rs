//! A single-assignment promise for rust.
//!
//! A [`Promise`] is settled exactly once, either fulfilled with a value or
//! rejected with an error, by whoever holds its [`Resolver`] or [`Rejecter`].
//! Observers attached before settlement are delivered in attachment order on
//! the settling call; observers attached afterwards run immediately. Nothing
//! here spawns or schedules work.
//!
//! # Examples
//!
//! ```
//! use promise_lite::{Promise, Settlement};
//!
//! let doubled = Promise::<i32>::new(|resolve, _| {
//!     resolve.resolve(10);
//!     Ok(())
//! })
//! .flat_map(|value| Ok(Promise::resolved(value * 2)));
//!
//! assert!(matches!(doubled.state(), Settlement::Fulfilled(20)));
//! ```
//!
//! Continuations that fail return `Err`, which rejects the chained promise:
//!
//! ```
//! use promise_lite::{Error, Promise, Settlement};
//!
//! let failed = Promise::resolved(5).flat_map(|_| Err::<Promise<i32>, _>(Error::msg("boom")));
//! match failed.state() {
//!     Settlement::Rejected(error) => assert_eq!(error.to_string(), "boom"),
//!     other => panic!("unexpected {other:?}"),
//! }
//! ```
use std::sync::Arc;
use thiserror::Error;

mod config;
mod debugger;
mod delivery;
mod promise;
pub mod resolve_only;

pub use config::{Configuration, TRACE_ENV};
pub use debugger::{Debugger, TracingDebugger};
pub use promise::{Promise, Rejecter, Resolver, Settlement};

/// The default rejection value.
///
/// Opaque to the promise machinery and cheap to clone, since a rejection is
/// handed to every observer of the rejected promise.
#[derive(Debug, Clone, Error)]
pub enum Error {
    #[error("{0}")]
    Message(Arc<str>),
    #[error(transparent)]
    Source(Arc<dyn std::error::Error + Send + Sync>),
}

impl Error {
    /// Wraps any error value.
    pub fn new<E>(error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Error::Source(Arc::new(error))
    }

    pub fn msg(message: impl std::fmt::Display) -> Self {
        Error::Message(message.to_string().into())
    }

    /// Returns the wrapped error if it is of type `E`.
    pub fn downcast_ref<E>(&self) -> Option<&E>
    where
        E: std::error::Error + 'static,
    {
        match self {
            Error::Source(source) => source.downcast_ref::<E>(),
            Error::Message(_) => None,
        }
    }
}

impl From<&str> for Error {
    fn from(message: &str) -> Self {
        Error::Message(message.into())
    }
}

impl From<String> for Error {
    fn from(message: String) -> Self {
        Error::Message(message.into())
    }
}

#[cfg(test)]
mod tests {
    use super::Error;

    #[derive(Debug, thiserror::Error)]
    #[error("disk full")]
    struct DiskFull;

    #[test]
    fn test_error_message() {
        let error = Error::msg("boom");
        assert_eq!(error.to_string(), "boom");
        assert!(error.downcast_ref::<DiskFull>().is_none());
    }

    #[test]
    fn test_error_wraps_source() {
        let error = Error::new(DiskFull);
        assert_eq!(error.to_string(), "disk full");
        assert!(error.clone().downcast_ref::<DiskFull>().is_some());
    }

    #[test]
    fn test_error_from_str() {
        let error: Error = "reject!!".into();
        assert!(matches!(error, Error::Message(ref message) if &**message == "reject!!"));
    }
}
