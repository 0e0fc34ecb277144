//! Lock helpers for the in-memory store that survive poisoning.

use std::sync::{LockResult, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::warn;

pub(crate) fn rw_read<'a, T>(
    lock: &'a RwLock<T>,
    target: &'static str,
    op: &'static str,
) -> RwLockReadGuard<'a, T> {
    recover(lock.read(), target, op, "rwlock.read")
}

pub(crate) fn rw_write<'a, T>(
    lock: &'a RwLock<T>,
    target: &'static str,
    op: &'static str,
) -> RwLockWriteGuard<'a, T> {
    recover(lock.write(), target, op, "rwlock.write")
}

fn recover<G>(
    result: LockResult<G>,
    target: &'static str,
    op: &'static str,
    lock_kind: &'static str,
) -> G {
    result.unwrap_or_else(|poisoned| {
        warn!(
            op,
            target_module = target,
            lock_kind,
            result = "poisoned_recovered",
            hint = "entries written by the panicking thread may be partial",
            "Recovered from poisoned cache store lock"
        );
        poisoned.into_inner()
    })
}
