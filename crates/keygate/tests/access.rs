//! End-to-end encrypt and decrypt against the in-memory network.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use proptest::prelude::*;
use tokio::sync::broadcast;

use keygate::core::{Address, Amount, ChainId, Comparator, Condition, Domain, RitualId};
use keygate::identity::{assert_with, IdentityProvider, LocalWallet};
use keygate::network::{Fault, MemoryNetwork};
use keygate::{
    AssetResolver, AttemptState, ContentStore, EncryptedAsset, Engine, EngineEvent, Error,
    ErrorCategory, MemoryContentStore, StoreResolver, TrackId,
};
use keygate_testkit::generators::payload;
use keygate_testkit::{
    fast_config, init_tracing, min_balance, plaintext, tamper_condition, wallets, GatedSigner,
    LaggingSigner, RefusingSigner, TestFixture,
};

fn drain(rx: &mut broadcast::Receiver<EngineEvent>) -> Vec<EngineEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

// ─────────────────────────────────────────────────────────────────────────────
// Grant and deny
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_holder_recovers_five_megabytes() {
    init_tracing();
    let fixture = TestFixture::new();
    fixture.fund(1u64);

    let original = plaintext(5 * 1024 * 1024);
    let asset = fixture.engine.encrypt(&original, &min_balance(1u64)).await.unwrap();
    assert!(asset.ciphertext.len() > original.len());

    let opened = fixture.engine.decrypt(&asset).await.unwrap();
    assert_eq!(opened.as_slice(), original.as_slice());
    assert_eq!(fixture.network.petition_count(), 1);
}

#[tokio::test]
async fn test_empty_wallet_is_denied() {
    init_tracing();
    let fixture = TestFixture::new();
    fixture.fund(0u64);

    let asset = fixture.engine.encrypt(b"track", &min_balance(1u64)).await.unwrap();
    let err = fixture.engine.decrypt(&asset).await.unwrap_err();

    assert!(err.is_access_denied());
    assert_eq!(err.category(), ErrorCategory::AccessDenied);
    // Denial is final: no retries.
    assert_eq!(fixture.network.petition_count(), 1);
}

#[tokio::test]
async fn test_holder_below_threshold_is_denied() {
    let fixture = TestFixture::new();
    fixture.fund(1u64);

    let asset = fixture.engine.encrypt(b"track", &min_balance(100u64)).await.unwrap();
    let err = fixture.engine.decrypt(&asset).await.unwrap_err();
    assert!(matches!(err, Error::AccessDenied(_)));

    fixture.fund(100u64);
    let opened = fixture.engine.decrypt(&asset).await.unwrap();
    assert_eq!(opened.as_slice(), b"track");
}

#[tokio::test]
async fn test_large_thresholds_compare_exactly() {
    let fixture = TestFixture::new();
    let threshold = Amount::parse("1000000000000000000000").unwrap();
    fixture.fund(Amount::parse("999999999999999999999").unwrap());

    let asset = fixture.engine.encrypt(b"x", &min_balance(threshold)).await.unwrap();
    assert!(fixture.engine.decrypt(&asset).await.unwrap_err().is_access_denied());

    fixture.fund(threshold);
    assert!(fixture.engine.decrypt(&asset).await.is_ok());
}

#[tokio::test]
async fn test_empty_plaintext() {
    let fixture = TestFixture::new();
    fixture.fund(1u64);

    let asset = fixture.engine.encrypt(b"", &min_balance(1u64)).await.unwrap();
    assert!(fixture.engine.decrypt(&asset).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_each_holder_is_judged_by_own_balance() {
    let fixture = TestFixture::new();
    let asset = fixture.engine.encrypt(b"shared", &min_balance(1u64)).await.unwrap();
    let holders = wallets(3);
    fixture.network.ledger().set_balance(
        ChainId::SEPOLIA,
        keygate_testkit::token(),
        holders[1].account(),
        Amount::from(1u64),
    );

    let digest = blake3::hash(asset.header.condition_bytes());
    let template = fixture.engine.config().statement.for_condition(digest.as_bytes());
    for (i, holder) in holders.iter().enumerate() {
        let assertion = assert_with(&template, holder, &fixture.clock).await.unwrap();
        let result = fixture
            .engine
            .gate()
            .decrypt(&asset, assertion, &fixture.network)
            .await;
        if i == 1 {
            assert_eq!(result.unwrap().as_slice(), b"shared");
        } else {
            assert!(result.unwrap_err().is_access_denied());
        }
    }
    assert_eq!(fixture.network.petition_count(), 3);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn test_holder_recovers_any_payload(data in payload()) {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        let opened = runtime.block_on(async {
            let fixture = TestFixture::new();
            fixture.fund(1u64);
            let asset = fixture.engine.encrypt(&data, &min_balance(1u64)).await.unwrap();
            fixture.engine.decrypt(&asset).await.unwrap()
        });
        prop_assert_eq!(opened.as_slice(), data.as_slice());
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Identity
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_expired_assertion_never_reaches_network() {
    let fixture = TestFixture::new();
    fixture.fund(1u64);
    let asset = fixture.engine.encrypt(b"track", &min_balance(1u64)).await.unwrap();

    let assertion = fixture.assertion_for(&asset).await;
    fixture.advance(fixture.engine.config().statement.ttl + Duration::from_secs(1));

    let err = fixture
        .engine
        .gate()
        .decrypt(&asset, assertion, &fixture.network)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::AssertionExpired));
    assert_eq!(err.category(), ErrorCategory::Identity);
    assert_eq!(fixture.network.petition_count(), 0);
}

#[tokio::test]
async fn test_stale_assertion_is_refreshed_once() {
    let wallet = LocalWallet::from_seed(&[7; 32]);
    let lag = fast_config().statement.ttl + Duration::from_secs(1);

    let signer = {
        let wallet = wallet.clone();
        move |clock: &keygate::core::ManualClock| {
            Arc::new(LaggingSigner::new(wallet, clock.clone(), lag, 1))
                as Arc<dyn keygate::identity::WalletSigner>
        }
    };
    let fixture = TestFixture::with_signer(wallet, fast_config(), signer);
    fixture.fund(1u64);

    let asset = fixture.engine.encrypt(b"track", &min_balance(1u64)).await.unwrap();
    let opened = fixture.engine.decrypt(&asset).await.unwrap();

    assert_eq!(opened.as_slice(), b"track");
    assert_eq!(fixture.network.petition_count(), 1);
}

#[tokio::test]
async fn test_assertion_stale_twice_fails() {
    let wallet = LocalWallet::from_seed(&[8; 32]);
    let lag = fast_config().statement.ttl + Duration::from_secs(1);

    let signer = {
        let wallet = wallet.clone();
        move |clock: &keygate::core::ManualClock| {
            Arc::new(LaggingSigner::new(wallet, clock.clone(), lag, 2))
                as Arc<dyn keygate::identity::WalletSigner>
        }
    };
    let fixture = TestFixture::with_signer(wallet, fast_config(), signer);
    fixture.fund(1u64);

    let asset = fixture.engine.encrypt(b"track", &min_balance(1u64)).await.unwrap();
    let err = fixture.engine.decrypt(&asset).await.unwrap_err();

    assert!(matches!(err, Error::AssertionExpired));
    assert_eq!(fixture.network.petition_count(), 0);
}

#[tokio::test]
async fn test_declined_signature() {
    let wallet = LocalWallet::from_seed(&[9; 32]);
    let signer = {
        let wallet = wallet.clone();
        move |_: &keygate::core::ManualClock| {
            Arc::new(RefusingSigner::new(wallet)) as Arc<dyn keygate::identity::WalletSigner>
        }
    };
    let fixture = TestFixture::with_signer(wallet, fast_config(), signer);
    fixture.fund(1u64);

    let asset = fixture.engine.encrypt(b"track", &min_balance(1u64)).await.unwrap();
    let err = fixture.engine.decrypt(&asset).await.unwrap_err();

    assert!(matches!(err, Error::IdentitySigningDenied(_)));
    assert_eq!(err.category(), ErrorCategory::Identity);
    assert_eq!(fixture.network.petition_count(), 0);
}

#[tokio::test]
async fn test_no_signer_attached() {
    let clock = keygate::core::ManualClock::default();
    let network = MemoryNetwork::with_clock(Arc::new(clock.clone()));
    network.create_ritual(Domain::Devnet, RitualId::DEFAULT, 3, 5);

    let identity = IdentityProvider::new(Arc::new(clock));
    let engine = Engine::new(fast_config(), Arc::new(network.clone()), identity).unwrap();

    let asset = engine.encrypt(b"track", &min_balance(1u64)).await.unwrap();
    let err = engine.decrypt(&asset).await.unwrap_err();
    assert!(matches!(err, Error::IdentityUnavailable));
    assert_eq!(network.petition_count(), 0);
}

#[tokio::test]
async fn test_assertion_cannot_be_replayed() {
    let fixture = TestFixture::new();
    fixture.fund(1u64);
    let asset = fixture.engine.encrypt(b"track", &min_balance(1u64)).await.unwrap();
    let assertion = fixture.assertion_for(&asset).await;

    let gate = fixture.engine.gate();
    assert!(gate.decrypt(&asset, assertion.clone(), &fixture.network).await.is_ok());

    let err = gate.decrypt(&asset, assertion, &fixture.network).await.unwrap_err();
    assert!(matches!(err, Error::AssertionRejected(_)));
    assert_eq!(err.category(), ErrorCategory::Identity);
}

#[tokio::test]
async fn test_assertion_scoped_to_other_condition_is_rejected() {
    let fixture = TestFixture::new();
    fixture.fund(5u64);
    let first = fixture.engine.encrypt(b"one", &min_balance(1u64)).await.unwrap();
    let second = fixture.engine.encrypt(b"two", &min_balance(2u64)).await.unwrap();

    let assertion = fixture.assertion_for(&first).await;
    let err = fixture
        .engine
        .gate()
        .decrypt(&second, assertion, &fixture.network)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::AssertionRejected(_)));
}

#[tokio::test]
async fn test_unscoped_assertion_never_reaches_network() {
    let fixture = TestFixture::new();
    fixture.fund(1u64);
    let strict = fixture.engine.encrypt(b"strict", &min_balance(100u64)).await.unwrap();
    let lenient = fixture.engine.encrypt(b"lenient", &min_balance(1u64)).await.unwrap();

    let unscoped = fixture
        .engine
        .identity()
        .assert(&fixture.engine.config().statement)
        .await
        .unwrap();
    let gate = fixture.engine.gate();

    for asset in [&strict, &lenient] {
        let err = gate
            .decrypt(asset, unscoped.clone(), &fixture.network)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::AssertionRejected(_)));
        assert_eq!(err.category(), ErrorCategory::Identity);
    }
    assert_eq!(fixture.network.petition_count(), 0);
}

#[tokio::test]
async fn test_denied_assertion_cannot_open_other_asset() {
    let fixture = TestFixture::new();
    fixture.fund(1u64);
    let strict = fixture.engine.encrypt(b"strict", &min_balance(100u64)).await.unwrap();
    let lenient = fixture.engine.encrypt(b"lenient", &min_balance(1u64)).await.unwrap();

    let assertion = fixture.assertion_for(&strict).await;
    let gate = fixture.engine.gate();

    let denied = gate
        .decrypt(&strict, assertion.clone(), &fixture.network)
        .await
        .unwrap_err();
    assert!(matches!(denied, Error::AccessDenied(_)));

    let err = gate
        .decrypt(&lenient, assertion, &fixture.network)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::AssertionRejected(_)));
    assert_eq!(fixture.network.petition_count(), 1);
}

// ─────────────────────────────────────────────────────────────────────────────
// Network failures
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_transient_failures_are_retried() {
    let fixture = TestFixture::new();
    fixture.fund(1u64);
    let asset = fixture.engine.encrypt(b"track", &min_balance(1u64)).await.unwrap();

    fixture.network.fail_next_petition(Fault::Unavailable);
    fixture.network.fail_next_petition(Fault::Unavailable);

    let mut rx = fixture.engine.subscribe();
    let opened = fixture.engine.decrypt(&asset).await.unwrap();
    assert_eq!(opened.as_slice(), b"track");
    assert_eq!(fixture.network.petition_count(), 3);

    let retries = drain(&mut rx)
        .into_iter()
        .filter(|e| matches!(e, EngineEvent::RetryScheduled { .. }))
        .count();
    assert_eq!(retries, 2);
}

#[tokio::test]
async fn test_retries_exhaust_as_unavailable() {
    let fixture = TestFixture::new();
    fixture.fund(1u64);
    let asset = fixture.engine.encrypt(b"track", &min_balance(1u64)).await.unwrap();

    for _ in 0..3 {
        fixture.network.fail_next_petition(Fault::Unavailable);
    }

    let err = fixture.engine.decrypt(&asset).await.unwrap_err();
    assert!(matches!(err, Error::DecryptionUnavailable { attempts: 3, .. }));
    assert_eq!(err.category(), ErrorCategory::Network);
    assert!(!err.is_access_denied());
    assert_eq!(fixture.network.petition_count(), 3);
}

#[tokio::test]
async fn test_short_share_set_is_retried() {
    let fixture = TestFixture::new();
    fixture.fund(1u64);
    let asset = fixture.engine.encrypt(b"track", &min_balance(1u64)).await.unwrap();

    fixture.network.fail_next_petition(Fault::ShortShares(2));

    let opened = fixture.engine.decrypt(&asset).await.unwrap();
    assert_eq!(opened.as_slice(), b"track");
    assert_eq!(fixture.network.petition_count(), 2);
}

#[tokio::test]
async fn test_petition_timeout_is_transient() {
    let config = fast_config().with_petition_timeout(Duration::from_millis(20));
    let fixture = TestFixture::with_config(config);
    fixture.fund(1u64);
    let asset = fixture.engine.encrypt(b"track", &min_balance(1u64)).await.unwrap();

    fixture.network.set_latency(Duration::from_millis(500));
    let err = fixture.engine.decrypt(&asset).await.unwrap_err();
    assert!(matches!(err, Error::DecryptionUnavailable { attempts: 3, .. }));
}

// ─────────────────────────────────────────────────────────────────────────────
// Corruption
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_tampered_condition_fails_authentication() {
    let fixture = TestFixture::new();
    fixture.fund(1u64);

    let strict = min_balance(9u64);
    let lenient = min_balance(1u64);
    let asset = fixture.engine.encrypt(b"premium track", &strict).await.unwrap();

    let tampered = tamper_condition(&asset.to_bytes(), &strict, &lenient).unwrap();
    let forged = EncryptedAsset::from_bytes(&tampered).unwrap();
    assert_eq!(forged.header.condition(), &lenient);

    let assertion = fixture.assertion_for(&forged).await;
    let err = fixture
        .engine
        .gate()
        .decrypt_bytes(&tampered, assertion, &fixture.network)
        .await
        .unwrap_err();

    // The network evaluates the forged condition and grants, but the key it
    // releases is bound to the forged bytes and cannot open the asset.
    assert_eq!(fixture.network.petition_count(), 1);
    assert!(matches!(err, Error::CorruptData(_)));
    assert_eq!(err.category(), ErrorCategory::CorruptData);
}

#[tokio::test]
async fn test_garbage_bytes_are_corrupt() {
    let fixture = TestFixture::new();
    let assertion = fixture
        .engine
        .identity()
        .assert(&fixture.engine.config().statement)
        .await
        .unwrap();

    let err = fixture
        .engine
        .gate()
        .decrypt_bytes(b"definitely not an asset", assertion, &fixture.network)
        .await
        .unwrap_err();
    assert_eq!(err.category(), ErrorCategory::CorruptData);
    assert_eq!(fixture.network.petition_count(), 0);
}

#[tokio::test]
async fn test_flipped_ciphertext_byte_is_corrupt() {
    let fixture = TestFixture::new();
    fixture.fund(1u64);
    let mut asset = fixture.engine.encrypt(b"track bytes", &min_balance(1u64)).await.unwrap();

    let mut ciphertext = asset.ciphertext.to_vec();
    ciphertext[0] ^= 0x01;
    asset.ciphertext = Bytes::from(ciphertext);

    let err = fixture.engine.decrypt(&asset).await.unwrap_err();
    assert!(matches!(err, Error::CorruptData(_)));
}

#[tokio::test]
async fn test_newer_condition_version_is_scoped_by_raw_bytes() {
    let fixture = TestFixture::new();
    fixture.fund(1u64);
    let condition = min_balance(1u64);
    let asset = fixture.engine.encrypt(b"track", &condition).await.unwrap();

    // Same condition, re-labelled as written by a version 2 encoder.
    let v1 = condition.encode();
    assert_eq!(&v1[..3], &[0xa6, 0x00, 0x01]);
    let mut v2 = v1.clone();
    v2[2] = 0x02;

    let mut bytes = asset.to_bytes();
    let at = bytes.windows(v1.len()).position(|w| w == v1.as_slice()).unwrap();
    bytes[at..at + v1.len()].copy_from_slice(&v2);
    let relabelled = EncryptedAsset::from_bytes(&bytes).unwrap();
    assert_eq!(relabelled.header.condition(), &condition);
    assert_ne!(relabelled.header.condition_bytes(), v1.as_slice());

    let assertion = fixture.assertion_for(&relabelled).await;
    let err = fixture
        .engine
        .gate()
        .decrypt(&relabelled, assertion, &fixture.network)
        .await
        .unwrap_err();

    // The assertion matches the header as stored, so the network is asked;
    // the key it releases is bound to the relabelled bytes.
    assert_eq!(fixture.network.petition_count(), 1);
    assert!(matches!(err, Error::CorruptData(_)));
}

// ─────────────────────────────────────────────────────────────────────────────
// Encryption
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_invalid_condition_fails_before_network() {
    let fixture = TestFixture::new();

    let unknown_chain = Condition::fungible_balance(
        ChainId(424_242),
        keygate_testkit::token(),
        Comparator::Gte,
        Amount::from(1u64),
    );
    let err = fixture.engine.encrypt(b"x", &unknown_chain).await.unwrap_err();
    assert!(matches!(err, Error::InvalidCondition(_)));
    assert_eq!(err.category(), ErrorCategory::Validation);

    let zero_contract = Condition::fungible_balance(
        ChainId::SEPOLIA,
        Address::ZERO,
        Comparator::Gte,
        Amount::from(1u64),
    );
    assert!(matches!(
        fixture.engine.encrypt(b"x", &zero_contract).await,
        Err(Error::InvalidCondition(_))
    ));

    assert_eq!(fixture.network.fetch_count(), 0);
}

#[tokio::test]
async fn test_inactive_ritual_is_policy_rejected() {
    let fixture = TestFixture::new();
    assert!(fixture
        .network
        .deactivate_ritual(Domain::Devnet, RitualId::DEFAULT));

    let err = fixture.engine.encrypt(b"x", &min_balance(1u64)).await.unwrap_err();
    assert!(matches!(err, Error::EncryptionPolicyRejected(_)));
    assert_eq!(fixture.network.fetch_count(), 1);
}

#[tokio::test]
async fn test_unknown_ritual_is_policy_rejected() {
    let network = MemoryNetwork::new();
    let identity = IdentityProvider::with_signer(Arc::new(LocalWallet::generate()));
    let engine = Engine::new(fast_config(), Arc::new(network.clone()), identity).unwrap();
    let err = engine.encrypt(b"x", &min_balance(1u64)).await.unwrap_err();
    assert!(matches!(err, Error::EncryptionPolicyRejected(_)));
    // Policy rejections are not retried.
    assert_eq!(network.fetch_count(), 1);
}

#[tokio::test]
async fn test_parameter_fetch_is_retried() {
    let fixture = TestFixture::new();
    fixture.network.fail_next_fetch(Fault::Unavailable);

    assert!(fixture.engine.encrypt(b"x", &min_balance(1u64)).await.is_ok());
    assert_eq!(fixture.network.fetch_count(), 2);

    for _ in 0..3 {
        fixture.network.fail_next_fetch(Fault::Unavailable);
    }
    let err = fixture.engine.encrypt(b"x", &min_balance(1u64)).await.unwrap_err();
    assert!(matches!(err, Error::EncryptionNetworkUnavailable(_)));
    assert_eq!(err.category(), ErrorCategory::Network);
    assert_eq!(fixture.network.fetch_count(), 5);
}

#[tokio::test]
async fn test_encryption_is_not_deterministic() {
    let fixture = TestFixture::new();
    let a = fixture.engine.encrypt(b"same", &min_balance(1u64)).await.unwrap();
    let b = fixture.engine.encrypt(b"same", &min_balance(1u64)).await.unwrap();
    assert_ne!(a.ciphertext, b.ciphertext);
    assert_eq!(a.header.condition(), b.header.condition());
}

// ─────────────────────────────────────────────────────────────────────────────
// Publish and events
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_publish_then_resolve_and_decrypt() {
    let fixture = TestFixture::new();
    fixture.fund(1u64);
    let store = Arc::new(MemoryContentStore::new());

    let mut rx = fixture.engine.subscribe();
    let cid = fixture
        .engine
        .publish(b"stored track", &min_balance(1u64), store.as_ref())
        .await
        .unwrap();
    assert_eq!(store.len(), 1);

    let events = drain(&mut rx);
    assert!(matches!(events.first(), Some(EngineEvent::ConditionValidated { .. })));
    assert_eq!(events.last(), Some(&EngineEvent::Uploaded { cid: cid.clone() }));

    let resolver = StoreResolver::new(store.clone());
    resolver.register(TrackId::new("stored"), cid.clone());
    let asset = resolver.resolve(&TrackId::new("stored")).await.unwrap();
    let opened = fixture.engine.decrypt(&asset).await.unwrap();
    assert_eq!(opened.as_slice(), b"stored track");

    let raw = store.get(&cid).await.unwrap().unwrap();
    assert_eq!(raw.as_ref(), asset.to_bytes().as_slice());
}

#[tokio::test]
async fn test_grant_emits_milestones_in_order() {
    let fixture = TestFixture::new();
    fixture.fund(1u64);
    let mut rx = fixture.engine.subscribe();

    let asset = fixture.engine.encrypt(b"track", &min_balance(1u64)).await.unwrap();
    fixture.engine.decrypt(&asset).await.unwrap();

    let events = drain(&mut rx);
    let names: Vec<&str> = events
        .iter()
        .map(|e| match e {
            EngineEvent::ConditionValidated { .. } => "validated",
            EngineEvent::FetchingParameters { .. } => "fetching",
            EngineEvent::ParametersFetched { .. } => "fetched",
            EngineEvent::Encrypting { .. } => "encrypting",
            EngineEvent::Encrypted { .. } => "encrypted",
            EngineEvent::RequestingIdentity => "identity",
            EngineEvent::IdentityAsserted { .. } => "asserted",
            EngineEvent::PetitioningNetwork { .. } => "petitioning",
            EngineEvent::Granted => "granted",
            _ => "other",
        })
        .collect();
    assert_eq!(
        names,
        [
            "validated",
            "fetching",
            "fetched",
            "encrypting",
            "encrypted",
            "identity",
            "asserted",
            "petitioning",
            "granted"
        ]
    );
    assert!(events.contains(&EngineEvent::IdentityAsserted {
        address: fixture.address()
    }));
}

// ─────────────────────────────────────────────────────────────────────────────
// Background attempts
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_background_attempt_completes() {
    let fixture = TestFixture::new();
    fixture.fund(1u64);
    let asset = fixture.engine.encrypt(b"track", &min_balance(1u64)).await.unwrap();

    let attempt = fixture.engine.begin_decrypt(asset);
    let mut states = attempt.subscribe();
    let opened = attempt.wait().await.unwrap();
    assert_eq!(opened.as_slice(), b"track");
    assert_eq!(*states.borrow_and_update(), AttemptState::Granted);
}

#[tokio::test]
async fn test_cancel_while_signing_sends_nothing() {
    let wallet = LocalWallet::from_seed(&[3; 32]);
    let gated = Arc::new(GatedSigner::new(wallet.clone()));
    let signer = {
        let gated = gated.clone();
        move |_: &keygate::core::ManualClock| gated as Arc<dyn keygate::identity::WalletSigner>
    };
    let fixture = TestFixture::with_signer(wallet, fast_config(), signer);
    fixture.fund(1u64);
    let asset = fixture.engine.encrypt(b"track", &min_balance(1u64)).await.unwrap();

    let mut attempt = fixture.engine.begin_decrypt(asset);
    gated.wait_for_prompts(1).await;
    assert_eq!(attempt.state(), AttemptState::RequestingIdentity);

    attempt.cancel().await;
    assert_eq!(attempt.state(), AttemptState::Idle);
    assert!(attempt.is_finished());

    gated.open();
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(fixture.network.petition_count(), 0);
    assert!(matches!(attempt.wait().await, Err(Error::Cancelled)));
}

#[tokio::test]
async fn test_cancel_finished_attempt_keeps_result_state() {
    let fixture = TestFixture::new();
    fixture.fund(0u64);
    let asset = fixture.engine.encrypt(b"track", &min_balance(1u64)).await.unwrap();

    let mut attempt = fixture.engine.begin_decrypt(asset);
    let mut states = attempt.subscribe();
    states.wait_for(AttemptState::is_terminal).await.unwrap();
    while !attempt.is_finished() {
        tokio::task::yield_now().await;
    }

    attempt.cancel().await;
    assert!(matches!(attempt.state(), AttemptState::Denied(_)));
}
