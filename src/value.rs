//! The word exchanged between coroutines.

/// Opaque pointer-sized word passed through [`resume`](crate::resume), [`yield_now`](crate::yield_now) and [`finish`](crate::finish).
///
/// [`Value`] is deliberately untyped, like a `void *`.
/// Interpreting it (integer, pointer to something that outlives the exchange) is up to both sides.
#[repr(transparent)]
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Value(usize);

impl Value {
    /// The value a coroutine receives when nothing in particular was exchanged.
    pub const NULL: Value = Value(0);

    pub fn into_usize(self) -> usize {
        self.0
    }

    pub fn from_ptr<T>(pointer: *const T) -> Self {
        Value(pointer as usize)
    }

    pub fn as_ptr<T>(self) -> *const T {
        self.0 as *const T
    }

    pub fn is_null(self) -> bool {
        self.0 == 0
    }
}

impl From<usize> for Value {
    fn from(word: usize) -> Self {
        Value(word)
    }
}

impl From<Value> for usize {
    fn from(value: Value) -> Self {
        value.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn implements_traits() {
        use impls::impls;
        use std::fmt::Debug;

        assert!(impls!(Value: Debug & Copy & Default & Send & Sync));
    }

    #[test]
    fn null_is_default() {
        assert_eq!(Value::default(), Value::NULL);
        assert!(Value::NULL.is_null());
        assert!(!Value::from(1).is_null());
    }

    #[test]
    fn carries_pointers() {
        static FRUIT: &str = "apple";

        let value = Value::from_ptr(&FRUIT);
        let pointer: *const &str = value.as_ptr();

        assert_eq!(unsafe { *pointer }, "apple");
    }
}
