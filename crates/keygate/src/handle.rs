//! Revocable ownership of decrypted bytes.
//!
//! A [`PlaintextHandle`] is the only owner of a decrypted buffer. Consumers
//! get [`PlaintextLease`]s, which hold a weak reference: a lease can read
//! the bytes while the handle is live but can never keep them alive. Once
//! the handle is revoked (or dropped) the buffer is zeroized and every lease
//! reports [`Revoked`].

use std::fmt;
use std::sync::{Arc, Weak};

use parking_lot::RwLock;
use thiserror::Error;
use zeroize::Zeroizing;

type Slot = RwLock<Option<Zeroizing<Vec<u8>>>>;

/// The plaintext has been revoked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("plaintext handle revoked")]
pub struct Revoked;

/// Exclusive owner of one decrypted buffer.
pub struct PlaintextHandle {
    slot: Arc<Slot>,
}

impl PlaintextHandle {
    pub(crate) fn new(plaintext: Zeroizing<Vec<u8>>) -> Self {
        Self {
            slot: Arc::new(RwLock::new(Some(plaintext))),
        }
    }

    /// A non-owning reader.
    pub fn lease(&self) -> PlaintextLease {
        PlaintextLease {
            slot: Arc::downgrade(&self.slot),
        }
    }

    pub fn is_live(&self) -> bool {
        self.slot.read().is_some()
    }

    /// Length of the buffer while live.
    pub fn len(&self) -> Option<usize> {
        self.slot.read().as_ref().map(|b| b.len())
    }

    /// Zeroize and release the buffer. Returns false if already revoked.
    pub fn revoke(&self) -> bool {
        let taken = self.slot.write().take();
        taken.is_some()
    }
}

impl Drop for PlaintextHandle {
    fn drop(&mut self) {
        self.revoke();
    }
}

impl fmt::Debug for PlaintextHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PlaintextHandle")
            .field("len", &self.len())
            .finish()
    }
}

/// Read access to a [`PlaintextHandle`] that ends when the handle is revoked.
#[derive(Clone)]
pub struct PlaintextLease {
    slot: Weak<Slot>,
}

impl PlaintextLease {
    /// Run `f` over the bytes while holding a read lock.
    pub fn read<R>(&self, f: impl FnOnce(&[u8]) -> R) -> Result<R, Revoked> {
        let slot = self.slot.upgrade().ok_or(Revoked)?;
        let guard = slot.read();
        let result = match guard.as_ref() {
            Some(bytes) => Ok(f(bytes)),
            None => Err(Revoked),
        };
        result
    }

    pub fn is_live(&self) -> bool {
        match self.slot.upgrade() {
            Some(slot) => {
                let live = slot.read().is_some();
                live
            }
            None => false,
        }
    }
}

impl fmt::Debug for PlaintextLease {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PlaintextLease")
            .field("live", &self.is_live())
            .finish()
    }
}
