//! Compute-once slot shared by the mount connection and per-handle file references.
//!
//! Unlike a bare `OnceLock`, initialisation here is fallible and exclusive: concurrent first
//! callers serialise on an init lock, so a side-effecting initialiser (creating a remote file)
//! runs at most once per slot. A failed initialiser leaves the slot empty for the next caller.

use std::fmt;
use std::sync::{Mutex, OnceLock, PoisonError};

pub struct OnceGuard<T> {
    value: OnceLock<T>,
    init: Mutex<()>,
}

impl<T> OnceGuard<T> {
    pub const fn new() -> Self {
        Self {
            value: OnceLock::new(),
            init: Mutex::new(()),
        }
    }

    /// Slot that is already initialised.
    pub fn with_value(value: T) -> Self {
        let guard = Self::new();
        let _ = guard.value.set(value);
        guard
    }

    pub fn get(&self) -> Option<&T> {
        self.value.get()
    }

    /// Returns the cached value, running `init` first if the slot is empty.
    pub fn get_or_try_init<E>(&self, init: impl FnOnce() -> Result<T, E>) -> Result<&T, E> {
        if let Some(value) = self.value.get() {
            return Ok(value);
        }

        let _init = self.init.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(value) = self.value.get() {
            return Ok(value);
        }

        let value = init()?;
        Ok(self.value.get_or_init(|| value))
    }
}

impl<T> Default for OnceGuard<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: fmt::Debug> fmt::Debug for OnceGuard<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.value.get() {
            Some(value) => f.debug_tuple("OnceGuard").field(value).finish(),
            None => f.write_str("OnceGuard(<uninit>)"),
        }
    }
}
