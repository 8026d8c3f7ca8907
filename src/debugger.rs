use std::{sync::Arc, time::SystemTime};

/// Hook told about every promise created under a [`Configuration`] that
/// carries it. It never influences settlement.
///
/// [`Configuration`]: crate::Configuration
pub trait Debugger: Send + Sync {
    /// `description` is the label given at construction, or
    /// `Promise<{value type}>` when none was given.
    fn promise_created(&self, description: &str, created_at: SystemTime);
}

impl<D: Debugger + ?Sized> Debugger for Arc<D> {
    fn promise_created(&self, description: &str, created_at: SystemTime) {
        (**self).promise_created(description, created_at)
    }
}

/// Emits a `debug` event through `tracing` for each created promise.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingDebugger;

impl Debugger for TracingDebugger {
    fn promise_created(&self, description: &str, created_at: SystemTime) {
        tracing::debug!(promise = description, created_at = ?created_at, "promise created");
    }
}
