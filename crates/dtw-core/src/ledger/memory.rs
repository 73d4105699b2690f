//! In-process ledger.
//!
//! Models the on-chain program closely enough to drive the feed end to end
//! without a network: account addresses are derived from seeds, submitted
//! transactions stay pending until confirmed, and like/retweet accounts can
//! only be created once per wallet and tweet. Faults and scripted fetch
//! responses can be injected to exercise the reconciliation paths.

use std::collections::{HashMap, HashSet, VecDeque};

use parking_lot::Mutex;
use uuid::Uuid;

use super::{Ledger, SignerContext, TransactionHandle};
use crate::constants::seeds;
use crate::error::{CoreError, Result};
use crate::models::{AccountId, Profile, RawTweet};

/// Call counters, for observing what the core asked for.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct LedgerStats {
    pub fetches: u64,
    pub profile_fetches: u64,
    pub submissions: u64,
    pub confirmations: u64,
    pub flag_queries: u64,
}

#[derive(Debug, Clone)]
struct TweetAccount {
    tweet_id: AccountId,
    profile_id: AccountId,
    wallet_id: AccountId,
    raw_handle: String,
    display_name: String,
    message: String,
    like_count: u64,
    retweet_count: u64,
}

#[derive(Debug, Clone)]
enum PendingTx {
    CreateProfile {
        wallet: AccountId,
        raw_handle: String,
        display_name: String,
    },
    Tweet {
        wallet: AccountId,
        message: String,
    },
    Like {
        wallet: AccountId,
        tweet_id: AccountId,
    },
    Retweet {
        wallet: AccountId,
        tweet_id: AccountId,
    },
}

#[derive(Default)]
struct LedgerInner {
    profiles: HashMap<AccountId, Profile>,
    tweets: Vec<TweetAccount>,
    likes: HashSet<AccountId>,
    retweets: HashSet<AccountId>,
    pending: HashMap<TransactionHandle, PendingTx>,
    scripted_fetches: VecDeque<Vec<RawTweet>>,
    fail_fetches: bool,
    fail_submissions: bool,
    fail_confirmations: bool,
    stats: LedgerStats,
}

#[derive(Default)]
pub struct MemoryLedger {
    inner: Mutex<LedgerInner>,
}

pub fn profile_address(wallet: &AccountId) -> AccountId {
    AccountId::derive(&[seeds::PROFILE, wallet.as_bytes()])
}

pub fn tweet_address(wallet: &AccountId, index: u64) -> AccountId {
    AccountId::derive(&[seeds::TWEET, wallet.as_bytes(), &index.to_le_bytes()])
}

fn like_address(wallet: &AccountId, tweet_id: &AccountId) -> AccountId {
    AccountId::derive(&[seeds::LIKE, tweet_id.as_bytes(), wallet.as_bytes()])
}

fn retweet_address(wallet: &AccountId, tweet_id: &AccountId) -> AccountId {
    AccountId::derive(&[seeds::RETWEET, tweet_id.as_bytes(), wallet.as_bytes()])
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stats(&self) -> LedgerStats {
        self.inner.lock().stats
    }

    pub fn set_fail_fetches(&self, fail: bool) {
        self.inner.lock().fail_fetches = fail;
    }

    pub fn set_fail_submissions(&self, fail: bool) {
        self.inner.lock().fail_submissions = fail;
    }

    pub fn set_fail_confirmations(&self, fail: bool) {
        self.inner.lock().fail_confirmations = fail;
    }

    /// Queue a response returned verbatim by the next fetch instead of the
    /// ledger contents.
    pub fn script_fetch(&self, records: Vec<RawTweet>) {
        self.inner.lock().scripted_fetches.push_back(records);
    }

    /// Create a profile directly, bypassing the transaction flow.
    pub fn seed_profile(&self, wallet: AccountId, raw_handle: &str, display_name: &str) -> Profile {
        let mut inner = self.inner.lock();
        let profile = Profile {
            wallet_id: wallet,
            profile_id: profile_address(&wallet),
            display_name: display_name.to_string(),
            raw_handle: raw_handle.to_string(),
            tweet_count: 0,
        };
        inner.profiles.insert(wallet, profile.clone());
        profile
    }

    /// Post a tweet directly, bypassing the transaction flow.
    pub fn seed_tweet(&self, wallet: AccountId, message: &str) -> Result<AccountId> {
        self.inner.lock().post_tweet(wallet, message)
    }

    pub fn tweet_count(&self) -> usize {
        self.inner.lock().tweets.len()
    }

    fn submit(&self, tx: PendingTx) -> Result<TransactionHandle> {
        let mut inner = self.inner.lock();
        inner.stats.submissions += 1;
        if inner.fail_submissions {
            return Err(CoreError::Transaction("wallet rejected the request".to_string()));
        }
        let handle = TransactionHandle(Uuid::new_v4().to_string());
        inner.pending.insert(handle.clone(), tx);
        Ok(handle)
    }
}

impl LedgerInner {
    fn post_tweet(&mut self, wallet: AccountId, message: &str) -> Result<AccountId> {
        let profile = self
            .profiles
            .get_mut(&wallet)
            .ok_or_else(|| CoreError::Transaction(format!("no profile for wallet {}", wallet)))?;

        let tweet_id = tweet_address(&wallet, profile.tweet_count);
        profile.tweet_count += 1;

        self.tweets.push(TweetAccount {
            tweet_id,
            profile_id: profile.profile_id,
            wallet_id: wallet,
            raw_handle: profile.raw_handle.clone(),
            display_name: profile.display_name.clone(),
            message: message.to_string(),
            like_count: 0,
            retweet_count: 0,
        });
        Ok(tweet_id)
    }

    fn tweet_mut(&mut self, tweet_id: &AccountId) -> Result<&mut TweetAccount> {
        self.tweets
            .iter_mut()
            .find(|t| t.tweet_id == *tweet_id)
            .ok_or_else(|| CoreError::Transaction(format!("tweet {} not found", tweet_id)))
    }

    fn apply(&mut self, tx: PendingTx) -> Result<()> {
        match tx {
            PendingTx::CreateProfile {
                wallet,
                raw_handle,
                display_name,
            } => {
                if self.profiles.contains_key(&wallet) {
                    return Err(CoreError::Transaction("profile account already in use".into()));
                }
                self.profiles.insert(
                    wallet,
                    Profile {
                        wallet_id: wallet,
                        profile_id: profile_address(&wallet),
                        display_name,
                        raw_handle,
                        tweet_count: 0,
                    },
                );
            }
            PendingTx::Tweet { wallet, message } => {
                self.post_tweet(wallet, &message)?;
            }
            PendingTx::Like { wallet, tweet_id } => {
                let address = like_address(&wallet, &tweet_id);
                if self.likes.contains(&address) {
                    return Err(CoreError::Transaction("like account already in use".into()));
                }
                self.tweet_mut(&tweet_id)?.like_count += 1;
                self.likes.insert(address);
            }
            PendingTx::Retweet { wallet, tweet_id } => {
                let address = retweet_address(&wallet, &tweet_id);
                if self.retweets.contains(&address) {
                    return Err(CoreError::Transaction("retweet account already in use".into()));
                }
                self.tweet_mut(&tweet_id)?.retweet_count += 1;
                self.retweets.insert(address);
            }
        }
        Ok(())
    }
}

impl Ledger for MemoryLedger {
    async fn fetch_all_records(&self, signer: &SignerContext) -> Result<Vec<RawTweet>> {
        tokio::task::yield_now().await;
        let mut inner = self.inner.lock();
        inner.stats.fetches += 1;

        if inner.fail_fetches {
            return Err(CoreError::RemoteFetch("rpc node unavailable".to_string()));
        }
        if let Some(scripted) = inner.scripted_fetches.pop_front() {
            return Ok(scripted);
        }

        let viewer = signer.wallet;
        Ok(inner
            .tweets
            .iter()
            .map(|t| RawTweet {
                tweet_id: t.tweet_id.into(),
                profile_id: t.profile_id.into(),
                wallet_id: t.wallet_id.into(),
                raw_handle: t.raw_handle.clone(),
                display_name: t.display_name.clone(),
                message: t.message.clone(),
                like_count: t.like_count,
                retweet_count: t.retweet_count,
                viewer_liked: inner.likes.contains(&like_address(&viewer, &t.tweet_id)),
                viewer_retweeted: inner.retweets.contains(&retweet_address(&viewer, &t.tweet_id)),
            })
            .collect())
    }

    async fn fetch_profile(&self, signer: &SignerContext) -> Result<Option<Profile>> {
        tokio::task::yield_now().await;
        let mut inner = self.inner.lock();
        inner.stats.profile_fetches += 1;
        if inner.fail_fetches {
            return Err(CoreError::RemoteFetch("rpc node unavailable".to_string()));
        }
        Ok(inner.profiles.get(&signer.wallet).cloned())
    }

    async fn submit_like(&self, signer: &SignerContext, tweet_id: &AccountId) -> Result<TransactionHandle> {
        tokio::task::yield_now().await;
        self.submit(PendingTx::Like {
            wallet: signer.wallet,
            tweet_id: *tweet_id,
        })
    }

    async fn submit_retweet(&self, signer: &SignerContext, tweet_id: &AccountId) -> Result<TransactionHandle> {
        tokio::task::yield_now().await;
        self.submit(PendingTx::Retweet {
            wallet: signer.wallet,
            tweet_id: *tweet_id,
        })
    }

    async fn submit_tweet(&self, signer: &SignerContext, message: &str) -> Result<TransactionHandle> {
        tokio::task::yield_now().await;
        self.submit(PendingTx::Tweet {
            wallet: signer.wallet,
            message: message.to_string(),
        })
    }

    async fn submit_create_profile(
        &self,
        signer: &SignerContext,
        raw_handle: &str,
        display_name: &str,
    ) -> Result<TransactionHandle> {
        tokio::task::yield_now().await;
        self.submit(PendingTx::CreateProfile {
            wallet: signer.wallet,
            raw_handle: raw_handle.to_string(),
            display_name: display_name.to_string(),
        })
    }

    async fn confirm_transaction(&self, handle: &TransactionHandle) -> Result<()> {
        tokio::task::yield_now().await;
        let mut inner = self.inner.lock();
        inner.stats.confirmations += 1;

        let tx = inner
            .pending
            .remove(handle)
            .ok_or_else(|| CoreError::Transaction(format!("unknown transaction {}", handle)))?;
        if inner.fail_confirmations {
            return Err(CoreError::Transaction(format!("transaction {} expired", handle)));
        }
        inner.apply(tx)
    }

    async fn query_like_exists(&self, signer: &SignerContext, tweet_id: &AccountId) -> Result<bool> {
        tokio::task::yield_now().await;
        let mut inner = self.inner.lock();
        inner.stats.flag_queries += 1;
        Ok(inner.likes.contains(&like_address(&signer.wallet, tweet_id)))
    }

    async fn query_retweet_exists(&self, signer: &SignerContext, tweet_id: &AccountId) -> Result<bool> {
        tokio::task::yield_now().await;
        let mut inner = self.inner.lock();
        inner.stats.flag_queries += 1;
        Ok(inner.retweets.contains(&retweet_address(&signer.wallet, tweet_id)))
    }
}
