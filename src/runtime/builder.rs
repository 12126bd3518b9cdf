//! Per-coroutine settings.

use super::Handle;
use crate::Value;

/// Configures a coroutine before creating it.
///
/// ```
/// fibril::start(|| {
///     let handle = fibril::Builder::new()
///         .name("worker")
///         .stack_size(64 * 1024)
///         .create(|_| {})
///         .unwrap();
///
///     assert_eq!(fibril::name_of(handle).unwrap(), "worker");
/// })
/// .unwrap();
/// ```
#[derive(Debug, Default)]
pub struct Builder {
    name: Option<String>,
    stack_size: Option<usize>,
}

impl Builder {
    pub fn new() -> Self {
        Builder::default()
    }

    /// Diagnostic label, doesn't need to be unique.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Overrides the registry's [`Config::stack_size`](super::Config::stack_size).
    pub fn stack_size(mut self, bytes: usize) -> Self {
        self.stack_size = Some(bytes);
        self
    }

    /// Registers a [`Ready`](super::Status::Ready) coroutine that will run `entry` on its first resume.
    ///
    /// `entry` receives the value of that first resume.
    /// Returning from `entry` is the same as calling [`finish`](super::finish) with [`Value::NULL`].
    pub fn create<F: FnOnce(Value) + 'static>(self, entry: F) -> crate::Result<Handle> {
        super::create_record(self.name, self.stack_size, Box::new(entry))
    }
}
