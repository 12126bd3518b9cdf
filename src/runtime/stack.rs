//! Memory that coroutines use as their machine stack.

use std::{ffi, io, ptr};

/// Anonymous private mapping, unmapped on drop.
#[derive(Debug)]
pub(super) struct Stack {
    pointer: *mut u8,
    length: usize,
    guard_length: usize,
}

impl Stack {
    /// Allocates a stack with at least `usable_bytes` of room, rounded up to whole pages.
    /// Demand paging ensures that physical memory is allocated only as necessary, during a page fault.
    /// With `guard_pages > 0` the lowest pages are inaccessible, so overflowing faults instead of corrupting memory.
    pub(super) fn new(usable_bytes: usize, guard_pages: usize) -> io::Result<Self> {
        let page_size = page_size();
        let usable_pages = usable_bytes.div_ceil(page_size).max(1);
        let length = guard_pages
            .checked_add(usable_pages)
            .and_then(|pages| pages.checked_mul(page_size))
            .ok_or_else(|| io::Error::from(io::ErrorKind::OutOfMemory))?;

        // kernel allocates an unused block of virtual memory
        let pointer = unsafe {
            libc::mmap(
                ptr::null_mut(),
                length,
                libc::PROT_READ | libc::PROT_WRITE,
                libc::MAP_PRIVATE | libc::MAP_ANONYMOUS,
                -1,
                0,
            )
        };
        if pointer == libc::MAP_FAILED {
            let error = io::Error::last_os_error();
            return Err(error);
        }

        // if guarding memory goes wrong then mmap gets cleaned up in Stack's drop
        let stack = Stack {
            pointer: pointer as *mut u8,
            length,
            guard_length: guard_pages * page_size,
        };

        // located at the lowest addresses since the stack grows downward
        if guard_pages > 0 {
            let result =
                unsafe { libc::mprotect(pointer, stack.guard_length, libc::PROT_NONE) };
            if result == -1 {
                let error = io::Error::last_os_error();
                return Err(error);
            }
        }

        Ok(stack)
    }

    /// Upper address of the stack memory, stacks grow downwards from here.
    pub(super) fn base(&self) -> *mut u8 {
        // safety: part of same allocation, can't overflow
        unsafe { self.pointer.add(self.length) }
    }

    #[cfg(test)]
    pub(super) fn len(&self) -> usize {
        self.length
    }

    /// Bytes between the guard pages and [`Stack::base`].
    pub(super) fn usable_len(&self) -> usize {
        self.length - self.guard_length
    }
}

impl Drop for Stack {
    fn drop(&mut self) {
        let result = unsafe { libc::munmap(self.pointer as *mut ffi::c_void, self.length) };
        debug_assert_eq!(result, 0);
    }
}

fn page_size() -> usize {
    match unsafe { libc::sysconf(libc::_SC_PAGESIZE) } {
        size if size > 0 => size as usize,
        _ => 4096,
    }
}
