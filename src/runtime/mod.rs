//! Coroutine registry and the resume/yield/finish protocol.
//!
//! Each thread has at most one registry, created by [`init`] (or [`start`]) and destroyed by [`teardown`].
//! The registry always contains the root coroutine, which stands for the thread's original stack.
//!
//! Control moves strictly in LIFO order:
//! [`resume`] pushes the caller onto the resumer stack before switching,
//! [`yield_now`] and [`finish`] pop it and switch back.

use std::convert::Infallible;
use std::sync::atomic::{AtomicU64, Ordering};
use std::{io, panic, process};

pub use builder::Builder;
pub use config::Config;
pub use record::{Handle, Status};

use crate::{Error, Result, Value};
use context_switch::Context;
use record::Record;

mod builder;
mod config;
mod context_switch;
mod record;
mod stack;
mod tls;

/// Process exit status when [`finish`] is called with nothing left to return to.
pub const EXIT_NO_RESUMER: i32 = 100;

/// Creates this thread's registry with the root coroutine running.
/// Does nothing if the thread already has one.
pub fn init() {
    init_with(Config::default());
}

/// Like [`init`] with custom defaults for the coroutines it creates.
/// `config` is ignored if the thread already has a registry.
pub fn init_with(config: Config) {
    match tls::install(RuntimeState::new(config)) {
        Ok(()) => log::debug!("created coroutine registry"),
        Err(_) => log::trace!("coroutine registry already exists"),
    }
}

/// Destroys this thread's registry, releasing every coroutine stack.
///
/// Only the root coroutine may do this.
/// Coroutines that are still suspended are abandoned: their stacks are unmapped without unwinding them.
/// Every [`Handle`] of the registry becomes meaningless.
pub fn teardown() -> Result<()> {
    let is_root = tls::runtime(|runtime| runtime.running.is_root())?;
    if !is_root {
        log::warn!("refused to tear down registry from a coroutine");
        return Err(Error::NotRoot);
    }

    // dropped outside of the thread local borrow, entry closures may have arbitrary destructors
    if let Some(state) = tls::uninstall() {
        log::debug!(
            "tearing down coroutine registry with {} coroutines, {} alive",
            state.records.len(),
            state.alive,
        );
        drop(state);
    }

    Ok(())
}

/// Runs `f` on the root coroutine of a fresh registry, then tears the registry down.
///
/// Fails if this thread already has a registry.
pub fn start<F: FnOnce() -> T, T>(f: F) -> Result<T> {
    if tls::install(RuntimeState::new(Config::default())).is_err() {
        return Err(Error::AlreadyInitialized);
    }
    log::debug!("created coroutine registry");

    // also tears down while unwinding, f can only return or unwind on the root's stack
    struct Teardown;

    impl Drop for Teardown {
        fn drop(&mut self) {
            drop(tls::uninstall());
        }
    }

    let _teardown = Teardown;
    Ok(f())
}

/// Registers a [`Ready`](Status::Ready) coroutine named `name`, see [`Builder::create`].
pub fn create<F: FnOnce(Value) + 'static>(name: &str, entry: F) -> Result<Handle> {
    Builder::new().name(name).create(entry)
}

fn create_record(
    name: Option<String>,
    stack_size: Option<usize>,
    entry: Box<dyn FnOnce(Value)>,
) -> Result<Handle> {
    let config = tls::runtime(|runtime| runtime.config.clone())?;

    let stack = stack::Stack::new(stack_size.unwrap_or(config.stack_size), config.guard_pages)
        .map_err(Error::StackAllocation)?;
    if config.reserved_bytes >= stack.usable_len() / 2 {
        let error = io::Error::new(
            io::ErrorKind::InvalidInput,
            "reserved bytes leave no room on the stack",
        );
        return Err(Error::StackAllocation(error));
    }

    let mut context = Context::default();
    // safety: reserved bytes plus the entry frame fit within the usable part of the stack
    unsafe { context.prime(stack.base(), config.reserved_bytes, trampoline) };

    let record = Record {
        context,
        stack: Some(stack),
        entry: Some(entry),
        status: Status::Ready,
        name: name.map(String::into_boxed_str),
        exchange: Value::NULL,
        panic: None,
    };

    tls::runtime(|runtime| {
        let handle = Handle::new(runtime.records.insert(record), runtime.registry);
        runtime.alive += 1;
        log::debug!(
            "created coroutine {:?} ({})",
            handle,
            runtime.records[handle.index].display_name(),
        );
        handle
    })
}

/// Transfers control to `target`, suspending the caller until control comes back.
///
/// If `target` never ran, `value` becomes the argument of its entry function.
/// Otherwise `value` is stored as its [`resume_value`] and returned from its [`yield_now`].
///
/// Returns once `target` (or whatever it resumed in turn) yields or finishes back to the caller,
/// with the value it passed, which is also the caller's [`yield_value`].
///
/// # Panics
/// Re-raises the panic of an entry function that panicked while running on behalf of this call.
pub fn resume(target: Handle, value: Value) -> Result<Value> {
    let (from, to) = tls::runtime(|runtime| runtime.begin_resume(target, value))??;

    // safety: the registry isn't borrowed, both contexts live in it until teardown
    unsafe { context_switch::switch(from, to) };

    let (exchange, panic) = tls::runtime(|runtime| {
        let exchange = runtime.running().exchange;
        let panic = runtime.records[target.index].panic.take();
        (exchange, panic)
    })?;

    if let Some(payload) = panic {
        panic::resume_unwind(payload);
    }

    Ok(exchange)
}

/// Suspends the current coroutine, handing `value` to whoever resumed it.
///
/// Returns the value of the [`resume`] that wakes this coroutine up again.
/// The root coroutine can't yield, nobody resumed it.
pub fn yield_now(value: Value) -> Result<Value> {
    let (from, to) = tls::runtime(|runtime| runtime.begin_yield(value))??;

    // safety: the registry isn't borrowed, both contexts live in it until teardown
    unsafe { context_switch::switch(from, to) };

    tls::runtime(|runtime| runtime.running().exchange)
}

/// Marks the current coroutine [`Dead`](Status::Dead), handing `value` to whoever resumed it.
///
/// Never returns on success. The coroutine's stack stays allocated until [`collect`] or [`teardown`],
/// and whatever lives on it is never dropped.
///
/// Calling this from the root exits the process with [`EXIT_NO_RESUMER`],
/// there's no caller to return to.
pub fn finish(value: Value) -> Result<Infallible> {
    let (from, to) = match tls::runtime(|runtime| runtime.begin_finish(value))? {
        Err(Error::NoResumer) => {
            log::error!("finished without a resumer, terminating process");
            process::exit(EXIT_NO_RESUMER);
        }
        pointers => pointers?,
    };

    // safety: the registry isn't borrowed, both contexts live in it until teardown
    unsafe { context_switch::switch(from, to) };

    unreachable!("dead coroutine was resumed");
}

/// First code every coroutine runs, the primed instruction pointer of a fresh [`Context`].
extern "C" fn trampoline(argument: Value) -> ! {
    if let Ok(Some(entry)) = tls::runtime(|runtime| runtime.running().entry.take()) {
        // unwinding must stop here, there's no caller frame on this stack
        let result = panic::catch_unwind(panic::AssertUnwindSafe(|| entry(argument)));

        if let Err(payload) = result {
            let _ = tls::runtime(|runtime| {
                let record = runtime.running();
                log::error!("coroutine {} panicked", record.display_name());
                record.panic = Some(payload);
            });
        }
    }

    match finish(Value::NULL) {
        Ok(never) => match never {},
        Err(error) => {
            log::error!("coroutine couldn't finish: {error}");
            process::abort();
        }
    }
}

/// Releases the stacks of dead coroutines, returns how many were released.
///
/// Handles of collected coroutines stay valid, they remain [`Dead`](Status::Dead).
pub fn collect() -> Result<usize> {
    tls::runtime(|runtime| {
        let mut collected = 0;
        for (_, record) in runtime.records.iter_mut() {
            if record.status == Status::Dead && record.stack.take().is_some() {
                collected += 1;
            }
        }
        log::debug!("collected {collected} coroutine stacks");
        collected
    })
}

/// Number of coroutines that aren't [`Dead`](Status::Dead), including the root.
pub fn alive_count() -> Result<usize> {
    tls::runtime(|runtime| runtime.alive)
}

/// Number of [`resume`] calls still waiting for their coroutine to yield or finish.
pub fn resumer_depth() -> Result<usize> {
    tls::runtime(|runtime| runtime.resumers.len())
}

/// The running coroutine.
pub fn current() -> Result<Handle> {
    tls::runtime(|runtime| runtime.running)
}

pub fn status_of(handle: Handle) -> Result<Status> {
    tls::runtime(|runtime| runtime.record(handle).map(|record| record.status))?
}

/// Diagnostic label, `"@null@"` for unnamed coroutines and `"@main@"` for the root.
pub fn name_of(handle: Handle) -> Result<String> {
    tls::runtime(|runtime| {
        runtime
            .record(handle)
            .map(|record| record.display_name().to_owned())
    })?
}

/// Last value passed into `handle` by [`resume`].
///
/// Shares its slot with [`yield_value`], whichever was written last wins.
pub fn resume_value(handle: Handle) -> Result<Value> {
    tls::runtime(|runtime| runtime.record(handle).map(|record| record.exchange))?
}

/// Last value handed back to `handle` by [`yield_now`] or [`finish`].
///
/// Shares its slot with [`resume_value`], whichever was written last wins.
pub fn yield_value(handle: Handle) -> Result<Value> {
    resume_value(handle)
}

/// Source of [`RuntimeState::registry`] stamps.
static REGISTRIES: AtomicU64 = AtomicU64::new(0);

/// Everything a thread's coroutines share.
struct RuntimeState {
    /// Distinct for every registry ever created in the process.
    registry: u64,
    config: Config,
    /// Records are never removed before teardown, so slab keys are never reused.
    records: slab::Slab<Record>,
    /// Who regains control when the running coroutine yields or finishes, innermost last.
    resumers: Vec<Handle>,
    running: Handle,
    alive: usize,
}

impl RuntimeState {
    fn new(config: Config) -> Self {
        let registry = REGISTRIES.fetch_add(1, Ordering::Relaxed);
        let mut records = slab::Slab::new();
        let root = records.insert(Record::root());
        debug_assert_eq!(root, Handle::ROOT_INDEX);

        RuntimeState {
            registry,
            config,
            records,
            resumers: Vec::new(),
            running: Handle::new(root, registry),
            alive: 1,
        }
    }

    fn record(&self, handle: Handle) -> Result<&Record> {
        if handle.registry != self.registry {
            return Err(Error::UnknownHandle(handle));
        }
        self.records
            .get(handle.index)
            .ok_or(Error::UnknownHandle(handle))
    }

    fn running(&mut self) -> &mut Record {
        &mut self.records[self.running.index]
    }

    fn contexts(&mut self, from: Handle, to: Handle) -> (*mut Context, *const Context) {
        let from = &mut self.records[from.index].context as *mut Context;
        let to = &self.records[to.index].context as *const Context;
        (from, to)
    }

    /// Validates the resumer stack's top without popping it.
    fn resumer(&self) -> Result<Handle> {
        let resumer = *self.resumers.last().ok_or(Error::NoResumer)?;
        match self.records[resumer.index].status {
            Status::Suspended => Ok(resumer),
            status => Err(Error::ResumerNotSuspended(status)),
        }
    }

    fn ensure_running(&self) -> Result<()> {
        match self.records[self.running.index].status {
            Status::Running => Ok(()),
            status => Err(Error::NotRunning(status)),
        }
    }

    fn begin_resume(
        &mut self,
        target: Handle,
        value: Value,
    ) -> Result<(*mut Context, *const Context)> {
        let status = self.record(target)?.status;
        match status {
            Status::Ready | Status::Suspended => {}
            status => return Err(Error::NotResumable { handle: target, status }),
        }
        if self.resumers.contains(&target) {
            return Err(Error::AwaitingReturn(target));
        }
        self.ensure_running()?;

        let record = &mut self.records[target.index];
        if status == Status::Ready {
            record.context.set_argument(value);
        } else {
            record.exchange = value;
        }
        record.status = Status::Running;

        let current = self.running;
        self.running().status = Status::Suspended;
        self.resumers.push(current);
        self.running = target;

        log::trace!("{current:?} resumes {target:?} with {value:?}");
        Ok(self.contexts(current, target))
    }

    fn begin_yield(&mut self, value: Value) -> Result<(*mut Context, *const Context)> {
        self.ensure_running()?;
        let resumer = self.resumer()?;

        let current = self.running;
        self.hand_back(resumer, value, Status::Suspended);

        log::trace!("{current:?} yields {value:?} to {resumer:?}");
        Ok(self.contexts(current, resumer))
    }

    fn begin_finish(&mut self, value: Value) -> Result<(*mut Context, *const Context)> {
        self.ensure_running()?;
        let resumer = self.resumer()?;

        let current = self.running;
        self.hand_back(resumer, value, Status::Dead);
        self.alive -= 1;

        log::trace!("{current:?} finishes with {value:?} to {resumer:?}");
        Ok(self.contexts(current, resumer))
    }

    /// Pops `resumer` and makes it the running coroutine, leaving the current one in `status`.
    fn hand_back(&mut self, resumer: Handle, value: Value, status: Status) {
        debug_assert_eq!(self.resumers.last(), Some(&resumer));
        self.resumers.pop();

        self.running().status = status;

        let record = &mut self.records[resumer.index];
        record.exchange = value;
        record.status = Status::Running;
        self.running = resumer;
    }
}
