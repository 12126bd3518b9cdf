//! Thread local storage for the registry.
//! Keeps the choice between std's `thread_local!` and nightly `#[thread_local]` in one place.

use std::cell::RefCell;

use super::RuntimeState;
use crate::Error;

/// Cache padded to avoid potential performance hit due to false sharing.
#[repr(align(128))]
struct Runtime(RefCell<Option<RuntimeState>>);

#[cfg(not(feature = "fast_thread_local"))]
thread_local! {
    /// Each thread gets its own independent registry.
    static RUNTIME: Runtime = const { Runtime(RefCell::new(None)) };
}

/// Installs `state` unless the thread already has a registry, in which case it's handed back.
#[cfg(not(feature = "fast_thread_local"))]
pub(super) fn install(state: RuntimeState) -> Result<(), RuntimeState> {
    RUNTIME.with(|thread_local| install_into(&thread_local.0, state))
}

/// Removes the registry, the caller decides when it gets dropped.
#[cfg(not(feature = "fast_thread_local"))]
pub(super) fn uninstall() -> Option<RuntimeState> {
    RUNTIME.with(|thread_local| thread_local.0.borrow_mut().take())
}

/// Borrow the registry for the duration of `f`.
/// Must never be held across a context switch.
#[cfg(not(feature = "fast_thread_local"))]
pub(super) fn runtime<T>(f: impl FnOnce(&mut RuntimeState) -> T) -> Result<T, Error> {
    RUNTIME.with(|thread_local| borrow_from(&thread_local.0, f))
}

#[cfg(feature = "fast_thread_local")]
#[thread_local]
static RUNTIME: Runtime = Runtime(RefCell::new(None));

#[cfg(feature = "fast_thread_local")]
pub(super) fn install(state: RuntimeState) -> Result<(), RuntimeState> {
    install_into(&RUNTIME.0, state)
}

#[cfg(feature = "fast_thread_local")]
pub(super) fn uninstall() -> Option<RuntimeState> {
    RUNTIME.0.borrow_mut().take()
}

#[cfg(feature = "fast_thread_local")]
pub(super) fn runtime<T>(f: impl FnOnce(&mut RuntimeState) -> T) -> Result<T, Error> {
    borrow_from(&RUNTIME.0, f)
}

fn install_into(
    cell: &RefCell<Option<RuntimeState>>,
    state: RuntimeState,
) -> Result<(), RuntimeState> {
    let mut cell = cell.borrow_mut();
    if cell.is_some() {
        return Err(state);
    }
    *cell = Some(state);
    Ok(())
}

fn borrow_from<T>(
    cell: &RefCell<Option<RuntimeState>>,
    f: impl FnOnce(&mut RuntimeState) -> T,
) -> Result<T, Error> {
    let mut cell = cell.borrow_mut();
    let runtime = cell.as_mut().ok_or(Error::Uninitialized)?;
    Ok(f(runtime))
}
