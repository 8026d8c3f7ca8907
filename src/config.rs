use std::{any::type_name, env, fmt, sync::Arc, time::SystemTime};

use crate::debugger::{Debugger, TracingDebugger};

/// Environment variable read by [`Configuration::from_env`].
pub const TRACE_ENV: &str = "PROMISE_LITE_TRACE";

/// Settings handed to a promise at construction and inherited by every
/// promise chained from it.
///
/// The default carries no debugger, so construction reports nothing.
///
/// # Examples
///
/// ```
/// use promise_lite::{Configuration, Promise, TracingDebugger};
///
/// let configuration = Configuration::new().with_debugger(TracingDebugger);
/// let promise = Promise::<&str>::configured(&configuration, Some("fetchUserProfile"), |resolve, _| {
///     resolve.resolve("profile");
///     Ok(())
/// });
/// assert!(promise.configuration().debugger().is_some());
/// ```
#[derive(Clone, Default)]
pub struct Configuration {
    debugger: Option<Arc<dyn Debugger>>,
}

impl Configuration {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enables [`TracingDebugger`] when `PROMISE_LITE_TRACE` is set to a
    /// truthy value (`1`, `true`, `yes`, `on`).
    pub fn from_env() -> Self {
        let configuration = Self::new();
        if tracing_enabled(env::var(TRACE_ENV).ok().as_deref()) {
            configuration.with_debugger(TracingDebugger)
        } else {
            configuration
        }
    }

    pub fn with_debugger(mut self, debugger: impl Debugger + 'static) -> Self {
        self.debugger = Some(Arc::new(debugger));
        self
    }

    pub fn without_debugger(mut self) -> Self {
        self.debugger = None;
        self
    }

    pub fn debugger(&self) -> Option<&dyn Debugger> {
        self.debugger.as_deref()
    }

    pub(crate) fn record_creation<T>(&self, description: Option<&str>) {
        let Some(debugger) = &self.debugger else {
            return;
        };
        let created_at = SystemTime::now();
        match description {
            Some(description) => debugger.promise_created(description, created_at),
            None => debugger.promise_created(&format!("Promise<{}>", type_name::<T>()), created_at),
        }
    }
}

impl fmt::Debug for Configuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Configuration")
            .field("debugger", &self.debugger.is_some())
            .finish()
    }
}

fn tracing_enabled(value: Option<&str>) -> bool {
    matches!(
        value.map(|value| value.trim().to_ascii_lowercase()).as_deref(),
        Some("1" | "true" | "yes" | "on")
    )
}

#[cfg(test)]
mod tests {
    use super::{tracing_enabled, Configuration};
    use crate::Debugger;
    use std::{
        sync::{Arc, Mutex},
        time::SystemTime,
    };

    #[derive(Default)]
    struct Recorder(Mutex<Vec<String>>);

    impl Debugger for Recorder {
        fn promise_created(&self, description: &str, _created_at: SystemTime) {
            self.0.lock().unwrap().push(description.to_owned());
        }
    }

    #[test]
    fn test_default_has_no_debugger() {
        let configuration = Configuration::default();
        assert!(configuration.debugger().is_none());
        // Nothing to report to; must not panic.
        configuration.record_creation::<i32>(Some("ignored"));
    }

    #[test]
    fn test_record_creation_uses_type_name_by_default() {
        let recorder = Arc::new(Recorder::default());
        let configuration = Configuration::new().with_debugger(recorder.clone());
        configuration.record_creation::<bool>(None);
        configuration.record_creation::<bool>(Some("fetchUserProfile"));
        assert_eq!(
            *recorder.0.lock().unwrap(),
            vec!["Promise<bool>", "fetchUserProfile"]
        );
    }

    #[test]
    fn test_without_debugger() {
        let configuration = Configuration::new()
            .with_debugger(crate::TracingDebugger)
            .without_debugger();
        assert!(configuration.debugger().is_none());
    }

    #[test]
    fn test_tracing_enabled_values() {
        assert!(tracing_enabled(Some("1")));
        assert!(tracing_enabled(Some(" TRUE ")));
        assert!(tracing_enabled(Some("on")));
        assert!(!tracing_enabled(Some("0")));
        assert!(!tracing_enabled(Some("")));
        assert!(!tracing_enabled(None));
    }
}
