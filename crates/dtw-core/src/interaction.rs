//! Like / retweet deduplication.
//!
//! The ledger refuses a second like or retweet account for the same wallet and
//! tweet; this guard keeps the client from even asking within a session. An
//! action is a no-op when the viewer flag is already set, either on the tweet
//! as last fetched, as last re-queried, or because this session already had the
//! same action confirmed.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::ledger::{Ledger, SignerContext};
use crate::models::AccountId;
use crate::reconciler::Reconciler;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InteractionKind {
    Like,
    Retweet,
}

impl InteractionKind {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Like => "like",
            Self::Retweet => "retweet",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InteractionOutcome {
    /// Submitted and confirmed; `flag` is the re-queried viewer flag
    Submitted { flag: bool },
    /// Flag already set, nothing was sent
    AlreadyApplied,
}

#[derive(Debug, Default)]
pub struct InteractionGuard {
    confirmed: HashSet<(InteractionKind, AccountId)>,
    observed: HashMap<(InteractionKind, AccountId), bool>,
}

impl InteractionGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Effective viewer flag for `tweet_id`.
    pub fn viewer_flag(&self, kind: InteractionKind, tweet_id: &AccountId, reconciler: &Reconciler) -> bool {
        let key = (kind, *tweet_id);
        if self.confirmed.contains(&key) || self.observed.get(&key).copied().unwrap_or(false) {
            return true;
        }
        reconciler
            .state()
            .find(tweet_id)
            .map(|t| match kind {
                InteractionKind::Like => t.viewer_liked,
                InteractionKind::Retweet => t.viewer_retweeted,
            })
            .unwrap_or(false)
    }

    pub async fn like<L: Ledger>(
        &mut self,
        ledger: &L,
        signer: &SignerContext,
        reconciler: &mut Reconciler,
        tweet_id: &AccountId,
    ) -> Result<InteractionOutcome> {
        self.perform(InteractionKind::Like, ledger, signer, reconciler, tweet_id)
            .await
    }

    pub async fn retweet<L: Ledger>(
        &mut self,
        ledger: &L,
        signer: &SignerContext,
        reconciler: &mut Reconciler,
        tweet_id: &AccountId,
    ) -> Result<InteractionOutcome> {
        self.perform(InteractionKind::Retweet, ledger, signer, reconciler, tweet_id)
            .await
    }

    /// Submit and confirm, then refresh the feed and re-query the flag.
    /// A failed submission or confirmation changes nothing locally.
    pub async fn perform<L: Ledger>(
        &mut self,
        kind: InteractionKind,
        ledger: &L,
        signer: &SignerContext,
        reconciler: &mut Reconciler,
        tweet_id: &AccountId,
    ) -> Result<InteractionOutcome> {
        if self.viewer_flag(kind, tweet_id, reconciler) {
            tracing::debug!("interaction: {} on {} already applied", kind.label(), tweet_id);
            return Ok(InteractionOutcome::AlreadyApplied);
        }

        let handle = match kind {
            InteractionKind::Like => ledger.submit_like(signer, tweet_id).await,
            InteractionKind::Retweet => ledger.submit_retweet(signer, tweet_id).await,
        }
        .map_err(|e| e.into_transaction())?;

        ledger
            .confirm_transaction(&handle)
            .await
            .map_err(|e| e.into_transaction())?;

        tracing::info!("interaction: {} on {} confirmed ({})", kind.label(), tweet_id, handle);
        self.confirmed.insert((kind, *tweet_id));

        if let Err(e) = reconciler.sync(ledger, signer).await {
            tracing::warn!("interaction: refresh after {} failed: {}", kind.label(), e);
        }

        let flag = match kind {
            InteractionKind::Like => ledger.query_like_exists(signer, tweet_id).await,
            InteractionKind::Retweet => ledger.query_retweet_exists(signer, tweet_id).await,
        }
        .unwrap_or_else(|e| {
            tracing::warn!("interaction: {} lookup failed: {}", kind.label(), e);
            false
        });

        self.observed.insert((kind, *tweet_id), flag);
        reconciler.observe_viewer_flag(*tweet_id, kind, flag);

        Ok(InteractionOutcome::Submitted { flag })
    }
}
