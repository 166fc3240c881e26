use std::sync::{Mutex, MutexGuard};

/// Locks `m`, recovering the guard if a previous holder panicked.
pub(crate) fn lock_or_recover<'a, T>(
    m: &'a Mutex<T>,
    what: &'static str,
) -> MutexGuard<'a, T> {
    match m.lock() {
        Ok(g) => g,
        Err(poisoned) => {
            tracing::warn!(lock = what, "lock was poisoned; recovering and continuing");
            poisoned.into_inner()
        }
    }
}
