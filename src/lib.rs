//! Lua-style stackful coroutines for a single thread.
//!
//! Every coroutine runs on its own stack, control moves only when a coroutine asks for it:
//! [`resume`] enters a coroutine, [`yield_now`] hands control back to whoever resumed it,
//! [`finish`] does the same and marks the coroutine dead.
//!
//! # Examples
//!
//! ```
//! use fibril::Value;
//!
//! fibril::start(|| {
//!     let counter = fibril::create("counter", |limit| {
//!         for i in 0..limit.into_usize() {
//!             fibril::yield_now(Value::from(i)).unwrap();
//!         }
//!     })
//!     .unwrap();
//!
//!     assert_eq!(fibril::resume(counter, Value::from(2)).unwrap(), Value::from(0));
//!     assert_eq!(fibril::resume(counter, Value::NULL).unwrap(), Value::from(1));
//!     assert_eq!(fibril::resume(counter, Value::NULL).unwrap(), Value::NULL);
//!     assert_eq!(fibril::status_of(counter).unwrap(), fibril::Status::Dead);
//! })
//! .unwrap();
//! ```

#![cfg_attr(feature = "fast_thread_local", feature(thread_local))]

use std::io;

pub use runtime::{
    alive_count, collect, create, current, finish, init, init_with, name_of, resume,
    resume_value, resumer_depth, start, status_of, teardown, yield_now, yield_value, Builder,
    Config, Handle, Status, EXIT_NO_RESUMER,
};
pub use value::Value;

#[cfg(feature = "macros")]
pub use fibril_macros::start;

pub mod runtime;
mod value;

/// Reasons a coroutine operation was refused.
///
/// Every variant except [`Error::StackAllocation`] is an illegal transition:
/// nothing was changed and no context switch happened.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("no coroutine registry on this thread")]
    Uninitialized,

    #[error("this thread already has a coroutine registry")]
    AlreadyInitialized,

    #[error("{0:?} wasn't created by this registry")]
    UnknownHandle(Handle),

    #[error("can't resume {handle:?} while it's {status:?}")]
    NotResumable { handle: Handle, status: Status },

    #[error("{0:?} is suspended in its own resume, it regains control by being yielded to")]
    AwaitingReturn(Handle),

    #[error("current coroutine is {0:?} instead of running")]
    NotRunning(Status),

    #[error("current coroutine has nobody to return to")]
    NoResumer,

    #[error("resumer is {0:?} instead of suspended")]
    ResumerNotSuspended(Status),

    #[error("registry can only be torn down from the root coroutine")]
    NotRoot,

    #[error("failed to allocate coroutine stack")]
    StackAllocation(#[source] io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
