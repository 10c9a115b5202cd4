//! Sign-in statement templates.
//!
//! The signed text follows the sign-in-with-wallet layout so a human reading
//! the wallet prompt sees who is asking, for what, and until when:
//!
//! ```text
//! {domain} wants you to sign in with your account:
//! {address}
//!
//! {statement}
//!
//! URI: {uri}
//! Version: 1
//! Chain ID: {chain_id}
//! Nonce: {nonce}
//! Issued At: {issued_at}
//! Expiration Time: {expires_at}
//! Resources:
//! - {resource}
//! ```

use std::time::Duration;

use chrono::{SecondsFormat, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use keygate_core::{Address, ChainId};

use crate::error::{IdentityError, Result};

/// Longest validity window an assertion may request.
pub const MAX_ASSERTION_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Resource prefix that binds an assertion to one condition.
pub const CONDITION_RESOURCE_PREFIX: &str = "keygate:condition:";

/// The parts of a sign-in statement that do not change per assertion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatementTemplate {
    /// Requesting application's domain, e.g. `dsound.app`.
    pub domain: String,
    /// URI of the requesting resource.
    pub uri: String,
    /// Human-readable purpose line.
    pub statement: String,
    /// Chain the signing account lives on.
    pub chain_id: ChainId,
    /// How long an assertion stays valid after issuance.
    pub ttl: Duration,
    /// Resource URIs the assertion is scoped to.
    pub resources: Vec<String>,
}

impl Default for StatementTemplate {
    fn default() -> Self {
        Self {
            domain: "localhost".into(),
            uri: "http://localhost".into(),
            statement: "Sign in to decrypt gated content.".into(),
            chain_id: ChainId::SEPOLIA,
            ttl: Duration::from_secs(10 * 60),
            resources: Vec::new(),
        }
    }
}

impl StatementTemplate {
    pub fn new(domain: impl Into<String>, uri: impl Into<String>) -> Self {
        Self {
            domain: domain.into(),
            uri: uri.into(),
            ..Self::default()
        }
    }

    pub fn with_statement(mut self, statement: impl Into<String>) -> Self {
        self.statement = statement.into();
        self
    }

    pub fn with_chain(mut self, chain_id: ChainId) -> Self {
        self.chain_id = chain_id;
        self
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Scope a copy of this template to one condition digest.
    pub fn for_condition(&self, condition_digest: &[u8; 32]) -> Self {
        let mut scoped = self.clone();
        scoped
            .resources
            .retain(|r| !r.starts_with(CONDITION_RESOURCE_PREFIX));
        scoped.resources.push(condition_resource(condition_digest));
        scoped
    }

    /// The condition digest this template is scoped to, if any.
    pub fn condition_scope(&self) -> Option<&str> {
        self.resources
            .iter()
            .find_map(|r| r.strip_prefix(CONDITION_RESOURCE_PREFIX))
    }

    /// Check the template can render an unambiguous statement.
    pub fn validate(&self) -> Result<()> {
        if self.domain.is_empty() {
            return Err(IdentityError::InvalidTemplate("empty domain".into()));
        }
        if self.ttl.is_zero() {
            return Err(IdentityError::InvalidTemplate("zero ttl".into()));
        }
        if self.ttl > MAX_ASSERTION_TTL {
            return Err(IdentityError::InvalidTemplate(format!(
                "ttl {}s exceeds 24h",
                self.ttl.as_secs()
            )));
        }

        let fields = [&self.domain, &self.uri, &self.statement]
            .into_iter()
            .chain(self.resources.iter());
        for field in fields {
            if field.contains('\n') {
                return Err(IdentityError::InvalidTemplate(format!(
                    "field contains a line break: {field:?}"
                )));
            }
        }
        Ok(())
    }

    /// Render the exact text a wallet signs.
    pub fn render(&self, address: &Address, nonce: &str, issued_at: i64, expires_at: i64) -> String {
        let mut out = format!(
            "{} wants you to sign in with your account:\n{}\n\n{}\n\nURI: {}\nVersion: 1\nChain ID: {}\nNonce: {}\nIssued At: {}\nExpiration Time: {}",
            self.domain,
            address,
            self.statement,
            self.uri,
            self.chain_id,
            nonce,
            rfc3339(issued_at),
            rfc3339(expires_at),
        );
        if !self.resources.is_empty() {
            out.push_str("\nResources:");
            for resource in &self.resources {
                out.push_str("\n- ");
                out.push_str(resource);
            }
        }
        out
    }
}

/// Resource URI naming a condition digest.
pub fn condition_resource(condition_digest: &[u8; 32]) -> String {
    format!("{CONDITION_RESOURCE_PREFIX}{}", hex::encode(condition_digest))
}

fn rfc3339(millis: i64) -> String {
    match Utc.timestamp_millis_opt(millis).single() {
        Some(t) => t.to_rfc3339_opts(SecondsFormat::Millis, true),
        None => millis.to_string(),
    }
}
