//! Registry-wide defaults.

/// Settings applied to every coroutine created by a registry, see [`init_with`](crate::init_with).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Usable bytes of each coroutine stack, rounded up to whole pages.
    pub stack_size: usize,
    /// Bytes at the high end of each stack that are never used.
    pub reserved_bytes: usize,
    /// Inaccessible pages below each stack, zero means overflow goes undetected.
    pub guard_pages: usize,
}

impl Config {
    /// Leaves room for the panic hook, which symbolizes backtraces on the panicking coroutine's stack.
    pub const DEFAULT_STACK_SIZE: usize = 64 * 1024;
    pub const DEFAULT_RESERVED_BYTES: usize = 64;

    pub fn stack_size(mut self, bytes: usize) -> Self {
        self.stack_size = bytes;
        self
    }

    pub fn reserved_bytes(mut self, bytes: usize) -> Self {
        self.reserved_bytes = bytes;
        self
    }

    pub fn guard_pages(mut self, pages: usize) -> Self {
        self.guard_pages = pages;
        self
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            stack_size: Config::DEFAULT_STACK_SIZE,
            reserved_bytes: Config::DEFAULT_RESERVED_BYTES,
            guard_pages: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_sixty_four_kibibytes() {
        let config = Config::default();

        assert_eq!(config.stack_size, 64 * 1024);
        assert_eq!(config.reserved_bytes, 64);
        assert_eq!(config.guard_pages, 0);
    }

    #[test]
    fn chains_overrides() {
        let config = Config::default().stack_size(128 * 1024).guard_pages(1);

        assert_eq!(config.stack_size, 128 * 1024);
        assert_eq!(config.reserved_bytes, 64);
        assert_eq!(config.guard_pages, 1);
    }
}
