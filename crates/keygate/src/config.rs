//! Engine configuration.

use std::time::Duration;

use keygate_core::{ChainRegistry, Domain, RitualId};
use keygate_identity::{StatementTemplate, MAX_ASSERTION_TTL};

use crate::error::{Error, Result};
use crate::retry::RetryPolicy;

/// What to do when a track is activated while its decrypt is still running.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JoinPolicy {
    /// Hand back the session already in progress.
    #[default]
    Join,
    /// Fail with [`Error::AlreadyInProgress`].
    Reject,
}

/// Configuration for the engine.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Network deployment to encrypt against.
    pub domain: Domain,
    /// Ritual whose key protects new assets.
    pub ritual_id: RitualId,
    /// Deadline for one parameter fetch.
    pub fetch_timeout: Duration,
    /// Deadline for one decrypt petition.
    pub petition_timeout: Duration,
    /// Retry policy for transient network failures.
    pub retry: RetryPolicy,
    /// Fixed parts of the statement a wallet signs.
    pub statement: StatementTemplate,
    /// Hard bound on how long a decrypted buffer stays resident.
    pub plaintext_lifetime: Duration,
    pub join_policy: JoinPolicy,
    /// Capacity of the event broadcast channel.
    pub event_capacity: usize,
    /// Chains the network can evaluate conditions on.
    pub chains: ChainRegistry,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            domain: Domain::Devnet,
            ritual_id: RitualId::DEFAULT,
            fetch_timeout: Duration::from_secs(10),
            petition_timeout: Duration::from_secs(30),
            retry: RetryPolicy::default(),
            statement: StatementTemplate::default(),
            plaintext_lifetime: Duration::from_secs(60 * 60),
            join_policy: JoinPolicy::Join,
            event_capacity: 256,
            chains: ChainRegistry::default(),
        }
    }
}

impl EngineConfig {
    pub fn with_domain(mut self, domain: Domain) -> Self {
        self.domain = domain;
        self
    }

    pub fn with_ritual(mut self, ritual: RitualId) -> Self {
        self.ritual_id = ritual;
        self
    }

    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = timeout;
        self
    }

    pub fn with_petition_timeout(mut self, timeout: Duration) -> Self {
        self.petition_timeout = timeout;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_statement(mut self, statement: StatementTemplate) -> Self {
        self.statement = statement;
        self
    }

    pub fn with_plaintext_lifetime(mut self, lifetime: Duration) -> Self {
        self.plaintext_lifetime = lifetime;
        self
    }

    pub fn with_join_policy(mut self, policy: JoinPolicy) -> Self {
        self.join_policy = policy;
        self
    }

    pub fn with_event_capacity(mut self, capacity: usize) -> Self {
        self.event_capacity = capacity;
        self
    }

    pub fn with_chains(mut self, chains: ChainRegistry) -> Self {
        self.chains = chains;
        self
    }

    /// Check the configuration is usable.
    pub fn validate(&self) -> Result<()> {
        if self.ritual_id.0 == 0 {
            return Err(Error::InvalidConfig("ritual id must be non-zero".into()));
        }
        if self.fetch_timeout.is_zero() || self.petition_timeout.is_zero() {
            return Err(Error::InvalidConfig("timeouts must be non-zero".into()));
        }
        if self.plaintext_lifetime.is_zero() {
            return Err(Error::InvalidConfig(
                "plaintext lifetime must be non-zero".into(),
            ));
        }
        if self.event_capacity == 0 {
            return Err(Error::InvalidConfig("event capacity must be non-zero".into()));
        }
        if self.statement.ttl > MAX_ASSERTION_TTL {
            return Err(Error::InvalidConfig(format!(
                "assertion ttl {:?} exceeds {:?}",
                self.statement.ttl, MAX_ASSERTION_TTL
            )));
        }
        if self.retry.backoff_multiplier.is_nan() || self.retry.backoff_multiplier < 1.0 {
            return Err(Error::InvalidConfig(
                "backoff multiplier must be at least 1".into(),
            ));
        }
        self.statement
            .validate()
            .map_err(|e| Error::InvalidConfig(e.to_string()))
    }
}
