//! Shared adapter access
//!
//! Several banks, possibly on different threads, may sit on one adapter.
//! [`SharedBus`] hands out a guard that dereferences to the adapter; while a
//! thread holds it no other transaction can reach the wire. A sequence of
//! continuation reads must run under one guard.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, TryLockError};

/// Adapter shared between banks
#[derive(Debug, Default)]
pub struct SharedBus<A> {
    inner: Arc<Mutex<A>>,
}

impl<A> Clone for SharedBus<A> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<A> SharedBus<A> {
    /// Wrap an adapter
    pub fn new(adapter: A) -> Self {
        Self {
            inner: Arc::new(Mutex::new(adapter)),
        }
    }

    /// Take exclusive access, blocking until it is available
    ///
    /// A thread that panicked while holding the bus does not poison it for
    /// everyone else: banks renegotiate speed and presence after any failure,
    /// so the adapter's state is recovered by the next transaction.
    pub fn lock(&self) -> BusGuard<'_, A> {
        BusGuard {
            guard: self.inner.lock().unwrap_or_else(PoisonError::into_inner),
        }
    }

    /// Take exclusive access if nobody else holds it
    pub fn try_lock(&self) -> Option<BusGuard<'_, A>> {
        match self.inner.try_lock() {
            Ok(guard) => Some(BusGuard { guard }),
            Err(TryLockError::Poisoned(poisoned)) => Some(BusGuard {
                guard: poisoned.into_inner(),
            }),
            Err(TryLockError::WouldBlock) => None,
        }
    }

    /// Recover the adapter if this is the last handle
    pub fn into_inner(self) -> Option<A> {
        Arc::into_inner(self.inner).map(|m| m.into_inner().unwrap_or_else(PoisonError::into_inner))
    }
}

/// Exclusive access to a shared adapter
pub struct BusGuard<'a, A> {
    guard: MutexGuard<'a, A>,
}

impl<A> core::ops::Deref for BusGuard<'_, A> {
    type Target = A;

    fn deref(&self) -> &A {
        &self.guard
    }
}

impl<A> core::ops::DerefMut for BusGuard<'_, A> {
    fn deref_mut(&mut self) -> &mut A {
        &mut self.guard
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_try_lock_excludes() {
        let bus = SharedBus::new(0u32);
        let other = bus.clone();
        {
            let mut guard = bus.lock();
            *guard += 1;
            assert!(other.try_lock().is_none());
        }
        assert_eq!(*other.lock(), 1);
    }

    #[test]
    fn test_poison_recovered() {
        let bus = SharedBus::new(5u32);
        let other = bus.clone();
        let _ = std::thread::spawn(move || {
            let _guard = other.lock();
            panic!("holder panicked");
        })
        .join();
        assert_eq!(*bus.lock(), 5);
        assert_eq!(bus.into_inner(), Some(5));
    }
}
