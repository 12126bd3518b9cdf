//! Per-coroutine state owned by the registry.

use std::any::Any;
use std::marker;

use super::context_switch::Context;
use super::stack::Stack;
use crate::Value;

/// Lifecycle of a coroutine.
///
/// `Ready → Running → {Suspended, Dead}`, `Suspended → Running`, `Dead` is terminal.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Status {
    /// Created, never resumed.
    Ready,
    /// The one coroutine currently executing.
    Running,
    /// Waiting for a resume, or blocked inside its own call to [`resume`](crate::resume).
    Suspended,
    /// Finished, can't be resumed again.
    Dead,
}

/// Identifies a coroutine within this thread's registry.
///
/// Stays valid until the registry is torn down, even after the coroutine dies.
/// Handles of a torn down registry are never mistaken for records of a later one.
#[derive(Copy, Clone, PartialEq, Eq, Hash)]
pub struct Handle {
    pub(super) index: usize,
    /// Stamp of the registry that issued this handle.
    pub(super) registry: u64,
    _not_send: marker::PhantomData<*const ()>,
}

impl Handle {
    pub(super) const ROOT_INDEX: usize = 0;

    pub(super) const fn new(index: usize, registry: u64) -> Self {
        Handle {
            index,
            registry,
            _not_send: marker::PhantomData,
        }
    }

    /// The record standing for the thread's original stack.
    pub fn is_root(&self) -> bool {
        self.index == Handle::ROOT_INDEX
    }
}

impl std::fmt::Debug for Handle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Handle").field(&self.index).finish()
    }
}

pub(super) const ROOT_NAME: &str = "@main@";
pub(super) const UNNAMED: &str = "@null@";

pub(super) struct Record {
    pub(super) context: Context,
    /// `None` for the root, which runs on the thread's stack, and once collected.
    pub(super) stack: Option<Stack>,
    pub(super) entry: Option<Box<dyn FnOnce(Value)>>,
    pub(super) status: Status,
    pub(super) name: Option<Box<str>>,
    /// Last value yielded to this coroutine or resumed into it, never both at once.
    pub(super) exchange: Value,
    pub(super) panic: Option<Box<dyn Any + Send + 'static>>,
}

impl Record {
    pub(super) fn root() -> Self {
        Record {
            context: Context::default(),
            stack: None,
            entry: None,
            status: Status::Running,
            name: Some(ROOT_NAME.into()),
            exchange: Value::NULL,
            panic: None,
        }
    }

    pub(super) fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(UNNAMED)
    }
}

impl std::fmt::Debug for Record {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Record")
            .field("name", &self.display_name())
            .field("status", &self.status)
            .field("exchange", &self.exchange)
            .field("has_stack", &self.stack.is_some())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handle_implements_traits() {
        use impls::impls;
        use std::fmt::Debug;
        use std::hash::Hash;

        assert!(impls!(Handle: Debug & Copy & Eq & Hash & !Send & !Sync));
    }

    #[test]
    fn handle_debugs_as_index() {
        assert_eq!(format!("{:?}", Handle::new(3, 7)), "Handle(3)");
    }

    #[test]
    fn handles_differ_across_registries() {
        assert_ne!(Handle::new(1, 0), Handle::new(1, 1));
        assert!(Handle::new(Handle::ROOT_INDEX, 5).is_root());
    }

    #[test]
    fn root_runs_without_stack() {
        let root = Record::root();

        assert_eq!(root.status, Status::Running);
        assert!(root.stack.is_none());
        assert_eq!(root.display_name(), "@main@");
    }
}
