//! Test fixtures and helpers.
//!
//! Common setup code for integration tests: a manual clock, an in-memory
//! network with the default ritual, a funded wallet, and an engine wired to
//! all three.

use std::sync::Arc;
use std::time::Duration;

use keygate::{Engine, EngineConfig, RetryPolicy};
use keygate_core::{Address, Amount, ChainId, Comparator, Condition, ManualClock};
use keygate_identity::{IdentityAssertion, IdentityProvider, LocalWallet, WalletSigner};
use keygate_network::{MemoryNetwork, PublicParameters};
use keygate_seal::EncryptedAsset;

/// Token contract used by fixture conditions.
pub const TOKEN: &str = "0x46abDF5aD1726ba700794539C3dB8fE591854729";

/// Shares the fixture ritual needs to release a key.
pub const RITUAL_THRESHOLD: u16 = 3;

/// Participants in the fixture ritual.
pub const RITUAL_PARTICIPANTS: u16 = 5;

/// Install a test-writer tracing subscriber once per process.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

/// An engine configuration with millisecond backoff so retry tests stay fast.
pub fn fast_config() -> EngineConfig {
    EngineConfig::default()
        .with_retry(
            RetryPolicy::exponential(2)
                .with_backoff(Duration::from_millis(1), Duration::from_millis(4)),
        )
        .with_fetch_timeout(Duration::from_secs(2))
        .with_petition_timeout(Duration::from_secs(2))
}

/// A fixture wallet, network and engine sharing one manual clock.
pub struct TestFixture {
    pub clock: ManualClock,
    pub network: MemoryNetwork,
    pub wallet: LocalWallet,
    pub params: PublicParameters,
    pub engine: Engine,
}

impl TestFixture {
    /// Create a fixture with a random wallet and the fast configuration.
    pub fn new() -> Self {
        Self::build(LocalWallet::generate(), fast_config(), None)
    }

    /// Create with a deterministic wallet from seed.
    pub fn with_seed(seed: [u8; 32]) -> Self {
        Self::build(LocalWallet::from_seed(&seed), fast_config(), None)
    }

    /// Create with a custom engine configuration.
    pub fn with_config(config: EngineConfig) -> Self {
        Self::build(LocalWallet::generate(), config, None)
    }

    /// Create with a scripted signer standing in for the wallet's own
    /// signing. `make` receives the fixture clock.
    ///
    /// The signer must answer for `wallet`'s address for balances to line up.
    pub fn with_signer<F>(wallet: LocalWallet, config: EngineConfig, make: F) -> Self
    where
        F: FnOnce(&ManualClock) -> Arc<dyn WalletSigner>,
    {
        let clock = ManualClock::default();
        let signer = make(&clock);
        Self::build_with_clock(clock, wallet, config, Some(signer))
    }

    fn build(wallet: LocalWallet, config: EngineConfig, signer: Option<Arc<dyn WalletSigner>>) -> Self {
        Self::build_with_clock(ManualClock::default(), wallet, config, signer)
    }

    fn build_with_clock(
        clock: ManualClock,
        wallet: LocalWallet,
        config: EngineConfig,
        signer: Option<Arc<dyn WalletSigner>>,
    ) -> Self {
        let network = MemoryNetwork::with_clock(Arc::new(clock.clone()));
        let params = network.create_ritual(
            config.domain,
            config.ritual_id,
            RITUAL_THRESHOLD,
            RITUAL_PARTICIPANTS,
        );

        let mut identity = IdentityProvider::new(Arc::new(clock.clone()));
        identity.attach(signer.unwrap_or_else(|| Arc::new(wallet.clone())));

        let engine = Engine::new(config, Arc::new(network.clone()), identity)
            .expect("fixture configuration is valid");

        Self {
            clock,
            network,
            wallet,
            params,
            engine,
        }
    }

    /// The fixture wallet's address.
    pub fn address(&self) -> Address {
        self.wallet.account()
    }

    /// Set the wallet's balance of [`TOKEN`] on the configured chain.
    pub fn fund(&self, amount: impl Into<Amount>) {
        self.network
            .ledger()
            .set_balance(ChainId::SEPOLIA, token(), self.address(), amount.into());
    }

    /// Assert identity for `asset` with the fixture wallet, bypassing the engine.
    pub async fn assertion_for(&self, asset: &EncryptedAsset) -> IdentityAssertion {
        let digest = blake3::hash(asset.header.condition_bytes());
        let template = self.engine.config().statement.for_condition(digest.as_bytes());
        self.engine
            .identity()
            .assert(&template)
            .await
            .expect("fixture signer is attached")
    }

    /// Move the shared clock forward.
    pub fn advance(&self, by: Duration) {
        self.clock.advance(by.as_millis() as i64);
    }
}

impl Default for TestFixture {
    fn default() -> Self {
        Self::new()
    }
}

/// The fixture token contract.
pub fn token() -> Address {
    Address::from_hex(TOKEN).expect("fixture token address is valid")
}

/// "Holds at least `min` units of [`TOKEN`] on Sepolia."
pub fn min_balance(min: impl Into<Amount>) -> Condition {
    Condition::fungible_balance(ChainId::SEPOLIA, token(), Comparator::Gte, min.into())
}

/// A deterministic plaintext of `len` bytes.
pub fn plaintext(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i.wrapping_mul(31) ^ (i >> 8)) as u8).collect()
}

/// Replace the first encoding of `from` in `asset_bytes` with `to`.
///
/// Both conditions must encode to the same length. Returns `None` if `from`
/// does not appear.
pub fn tamper_condition(asset_bytes: &[u8], from: &Condition, to: &Condition) -> Option<Vec<u8>> {
    let needle = from.encode();
    let replacement = to.encode();
    assert_eq!(needle.len(), replacement.len(), "conditions must encode to equal lengths");

    let at = asset_bytes
        .windows(needle.len())
        .position(|window| window == needle.as_slice())?;
    let mut out = asset_bytes.to_vec();
    out[at..at + needle.len()].copy_from_slice(&replacement);
    Some(out)
}

/// Deterministic wallets for multi-party scenarios.
pub fn wallets(count: usize) -> Vec<LocalWallet> {
    (0..count)
        .map(|i| {
            let mut seed = [0u8; 32];
            seed[0] = i as u8;
            seed[31] = 0xA5;
            LocalWallet::from_seed(&seed)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tamper_condition_swaps_in_place() {
        let from = min_balance(9u64);
        let to = min_balance(1u64);
        let mut bytes = vec![0xEE; 4];
        bytes.extend_from_slice(&from.encode());
        bytes.extend_from_slice(&[0xEE; 4]);

        let out = tamper_condition(&bytes, &from, &to).unwrap();
        assert_eq!(out.len(), bytes.len());
        assert_eq!(&out[4..4 + to.encode().len()], to.encode().as_slice());
        assert!(tamper_condition(&out, &from, &to).is_none());
    }

    #[test]
    fn test_wallets_are_deterministic_and_distinct() {
        let a = wallets(3);
        let b = wallets(3);
        assert_eq!(a[1].account(), b[1].account());
        assert_ne!(a[0].account(), a[1].account());
    }

    #[test]
    fn test_plaintext_is_deterministic() {
        assert_eq!(plaintext(1024), plaintext(1024));
        assert_eq!(plaintext(10).len(), 10);
    }
}
