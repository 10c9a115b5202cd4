//! Scripted wallet signers.
//!
//! Real wallets suspend on a human prompt. These signers let tests hold that
//! prompt open, count it, or make it take longer than an assertion lives.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::watch;

use keygate_core::{Address, ManualClock};
use keygate_identity::{LocalWallet, SignerError, WalletSignature, WalletSigner};

/// A signer whose prompts wait until the test opens the gate.
pub struct GatedSigner {
    wallet: LocalWallet,
    open: watch::Sender<bool>,
    prompts: watch::Sender<usize>,
}

impl GatedSigner {
    /// A closed gate in front of `wallet`.
    pub fn new(wallet: LocalWallet) -> Self {
        Self {
            wallet,
            open: watch::channel(false).0,
            prompts: watch::channel(0).0,
        }
    }

    /// Let every pending and future prompt through.
    pub fn open(&self) {
        self.open.send_replace(true);
    }

    /// Prompts shown so far, answered or not.
    pub fn prompts(&self) -> usize {
        *self.prompts.borrow()
    }

    /// Wait until at least `n` prompts have been shown.
    pub async fn wait_for_prompts(&self, n: usize) {
        let mut rx = self.prompts.subscribe();
        let _ = rx.wait_for(|count| *count >= n).await;
    }
}

#[async_trait]
impl WalletSigner for GatedSigner {
    async fn address(&self) -> Result<Address, SignerError> {
        Ok(self.wallet.account())
    }

    async fn sign_message(&self, message: &str) -> Result<WalletSignature, SignerError> {
        self.prompts.send_modify(|count| *count += 1);
        let mut rx = self.open.subscribe();
        let _ = rx.wait_for(|open| *open).await;
        Ok(self.wallet.sign(message.as_bytes()))
    }
}

/// A signer that moves the clock forward while it signs.
///
/// The first `slow` signatures each advance `clock` by `delay` after the
/// statement's timestamps are fixed, so assertions come back already stale.
pub struct LaggingSigner {
    wallet: LocalWallet,
    clock: ManualClock,
    delay: Duration,
    slow: AtomicUsize,
    signed: AtomicUsize,
}

impl LaggingSigner {
    pub fn new(wallet: LocalWallet, clock: ManualClock, delay: Duration, slow: usize) -> Self {
        Self {
            wallet,
            clock,
            delay,
            slow: AtomicUsize::new(slow),
            signed: AtomicUsize::new(0),
        }
    }

    /// Signatures produced so far.
    pub fn signed(&self) -> usize {
        self.signed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl WalletSigner for LaggingSigner {
    async fn address(&self) -> Result<Address, SignerError> {
        Ok(self.wallet.account())
    }

    async fn sign_message(&self, message: &str) -> Result<WalletSignature, SignerError> {
        let lagging = self
            .slow
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if lagging {
            self.clock.advance(self.delay.as_millis() as i64);
        }
        self.signed.fetch_add(1, Ordering::SeqCst);
        Ok(self.wallet.sign(message.as_bytes()))
    }
}

/// A signer that always refuses.
pub struct RefusingSigner {
    wallet: LocalWallet,
}

impl RefusingSigner {
    pub fn new(wallet: LocalWallet) -> Self {
        Self { wallet }
    }
}

#[async_trait]
impl WalletSigner for RefusingSigner {
    async fn address(&self) -> Result<Address, SignerError> {
        Ok(self.wallet.account())
    }

    async fn sign_message(&self, _message: &str) -> Result<WalletSignature, SignerError> {
        Err(SignerError::Rejected("user declined the signature request".into()))
    }
}
