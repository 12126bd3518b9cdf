//! Abstraction over userspace context switching.
//!
//! Provides an implementation for every supported CPU architecture.

use std::arch::global_asm;

use crate::Value;

/// Signature of the first function a fresh coroutine runs.
pub(super) type Entry = extern "C" fn(Value) -> !;

/// Machine state of a coroutine that isn't running.
///
/// Written only by [`switch`] and by [`Context::prime`], never interpreted elsewhere.
#[cfg(target_arch = "x86_64")]
#[repr(C)]
#[derive(Debug, Default)]
pub(super) struct Context {
    stack_pointer: usize,
    instruction_pointer: usize,
    /// rbx, rbp, r12, r13, r14, r15
    callee_saved: [usize; 6],
    argument: usize,
    mxcsr: u32,
    x87_control_word: u16,
}

/// Machine state of a coroutine that isn't running.
///
/// Written only by [`switch`] and by [`Context::prime`], never interpreted elsewhere.
#[cfg(target_arch = "aarch64")]
#[repr(C)]
#[derive(Debug, Default)]
pub(super) struct Context {
    stack_pointer: usize,
    instruction_pointer: usize,
    /// x19 to x28, the frame pointer x29, the link register x30
    callee_saved: [usize; 12],
    argument: usize,
    /// d8 to d15
    float_callee_saved: [u64; 8],
}

/// Stack alignment both ABIs require at a call boundary.
const STACK_ALIGNMENT: usize = 16;

impl Context {
    /// Sets up a context that starts executing `entry` on the stack ending at `stack_base`.
    /// The highest `reserved` bytes of the stack are left untouched.
    ///
    /// # Safety
    /// `stack_base` must be the upper end of a writable allocation larger than `reserved` plus a few words.
    pub(super) unsafe fn prime(&mut self, stack_base: *mut u8, reserved: usize, entry: Entry) {
        let top = (stack_base as usize - reserved) & !(STACK_ALIGNMENT - 1);

        *self = Context::default();
        self.instruction_pointer = entry as usize;

        #[cfg(target_arch = "x86_64")]
        {
            // entry sees the stack as if it was called: a return address slot below an aligned boundary
            let return_address = (top - std::mem::size_of::<usize>()) as *mut usize;
            return_address.write(0);
            self.stack_pointer = return_address as usize;
            self.mxcsr = 0x1F80;
            self.x87_control_word = 0x037F;
        }

        // a zero link register ends unwinding at entry
        #[cfg(target_arch = "aarch64")]
        {
            self.stack_pointer = top;
        }
    }

    /// Value delivered in the first argument register the next time this context is switched to.
    pub(super) fn set_argument(&mut self, value: Value) {
        self.argument = value.into_usize();
    }
}

extern "C" {
    /// Executes a context switch.
    ///
    /// Spills callee-saved registers into `from`, restores them from `to`,
    /// then continues wherever `to` last switched away (or at its entry if it never ran).
    /// Returns once some other coroutine switches back to `from`.
    #[link_name = "fibril_switch"]
    pub(super) fn switch(from: *mut Context, to: *const Context);
}

#[cfg(not(target_os = "linux"))]
compile_error!("fibril only supports Linux");

#[cfg(not(any(target_arch = "x86_64", target_arch = "aarch64")))]
compile_error!("fibril only supports x86_64 and aarch64");

#[cfg(target_arch = "x86_64")]
global_asm!(include_str!("assembly/x86_64.s"));

#[cfg(target_arch = "aarch64")]
global_asm!(include_str!("assembly/aarch64.s"));
