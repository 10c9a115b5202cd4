//! # Keygate Network
//!
//! The protocol spoken with a decentralized threshold-decryption network.
//!
//! ## Overview
//!
//! The network holds a ritual key split across participants. Encrypting
//! needs only the ritual's public parameters. Decrypting needs the network
//! to evaluate a condition for an asserted identity and, if it holds,
//! release enough key shares to recover the wrap key.
//!
//! ## Message Flow
//!
//! ```text
//! Uploader                            Network
//!   |-------- fetch_parameters ------->|
//!   |<------- PublicParameters --------|
//!
//! Consumer                            Network
//!   |-------- petition_decrypt ------->|  (CiphertextRef + ConditionContext)
//!   |<------- Granted(ShareSet) -------|  or Denied { reason }
//! ```
//!
//! [`MemoryNetwork`] implements the protocol in process for tests and
//! local development.

pub mod error;
pub mod ledger;
pub mod memory;
pub mod messages;
pub mod network;

pub use error::{NetworkError, Result};
pub use ledger::BalanceLedger;
pub use memory::{Fault, MemoryNetwork};
pub use messages::{
    CiphertextRef, ConditionContext, PetitionOutcome, PublicParameters, USER_ADDRESS_PARAM,
};
pub use network::NetworkHandle;
