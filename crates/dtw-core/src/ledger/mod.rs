//! Contract with the on-chain program.
//!
//! Everything that reaches the chain goes through [`Ledger`]. The core never
//! builds or signs transactions itself; it only asks for records and submits
//! requests that come back as a [`TransactionHandle`] to be confirmed.

pub mod memory;

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::models::{AccountId, Profile, RawTweet};

pub use memory::{LedgerStats, MemoryLedger};

/// Identity of the connected wallet on whose behalf calls are made.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SignerContext {
    pub wallet: AccountId,
}

impl SignerContext {
    pub fn new(wallet: AccountId) -> Self {
        Self { wallet }
    }
}

/// Signature of a submitted transaction. Not durable until confirmed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TransactionHandle(pub String);

impl fmt::Display for TransactionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[allow(async_fn_in_trait)]
pub trait Ledger {
    /// All tweets, all-or-nothing. May be empty.
    async fn fetch_all_records(&self, signer: &SignerContext) -> Result<Vec<RawTweet>>;

    async fn fetch_profile(&self, signer: &SignerContext) -> Result<Option<Profile>>;

    async fn submit_like(&self, signer: &SignerContext, tweet_id: &AccountId) -> Result<TransactionHandle>;

    async fn submit_retweet(&self, signer: &SignerContext, tweet_id: &AccountId) -> Result<TransactionHandle>;

    async fn submit_tweet(&self, signer: &SignerContext, message: &str) -> Result<TransactionHandle>;

    async fn submit_create_profile(
        &self,
        signer: &SignerContext,
        raw_handle: &str,
        display_name: &str,
    ) -> Result<TransactionHandle>;

    async fn confirm_transaction(&self, handle: &TransactionHandle) -> Result<()>;

    async fn query_like_exists(&self, signer: &SignerContext, tweet_id: &AccountId) -> Result<bool>;

    async fn query_retweet_exists(&self, signer: &SignerContext, tweet_id: &AccountId) -> Result<bool>;
}
