//! One connected wallet's view of the feed.
//!
//! A [`FeedSession`] owns everything the feed needs for its lifetime: the
//! reconciler and its cache slot, the interaction guard and the viewer's
//! profile. Collaborators are injected at construction; nothing is global.

use crate::config::CoreConfig;
use crate::constants::MODERATION_REJECTION;
use crate::error::{CoreError, Result};
use crate::handle;
use crate::interaction::{InteractionGuard, InteractionKind, InteractionOutcome};
use crate::ledger::{Ledger, SignerContext, TransactionHandle};
use crate::models::{AccountId, Profile, ProfileDraft, Tweet};
use crate::moderation::ContentModerator;
use crate::reconciler::{FetchOutcome, Reconciler};
use crate::store::FeedPhase;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublishOutcome {
    /// Blank message, nothing sent
    Ignored,
    Published(TransactionHandle),
}

pub struct FeedSession<L: Ledger, M: ContentModerator> {
    signer: SignerContext,
    ledger: L,
    moderator: M,
    reconciler: Reconciler,
    guard: InteractionGuard,
    profile: Option<Profile>,
}

impl<L: Ledger, M: ContentModerator> FeedSession<L, M> {
    pub fn new(config: &CoreConfig, signer: SignerContext, ledger: L, moderator: M) -> Self {
        Self {
            signer,
            ledger,
            moderator,
            reconciler: Reconciler::new(config.cache_store(), config.max_followup_fetches),
            guard: InteractionGuard::new(),
            profile: None,
        }
    }

    /// Show the cached feed, then load the profile and the live feed.
    ///
    /// Fetch failures are logged; the cached feed stays on display.
    pub async fn start(&mut self) {
        tracing::info!("session: starting for {}", self.signer.wallet.short());
        self.reconciler.mount();

        if let Err(e) = self.refresh_profile().await {
            tracing::warn!("session: profile fetch failed: {}", e);
        }
        if let Err(e) = self.reconciler.sync(&self.ledger, &self.signer).await {
            tracing::warn!("session: initial fetch failed: {}", e);
        }
    }

    /// User-initiated reload. Errors are returned for display.
    pub async fn refresh(&mut self) -> Result<FetchOutcome> {
        self.reconciler.sync(&self.ledger, &self.signer).await
    }

    pub async fn refresh_profile(&mut self) -> Result<Option<&Profile>> {
        self.profile = self.ledger.fetch_profile(&self.signer).await?;
        Ok(self.profile.as_ref())
    }

    pub async fn like(&mut self, tweet_id: &AccountId) -> Result<InteractionOutcome> {
        self.guard
            .like(&self.ledger, &self.signer, &mut self.reconciler, tweet_id)
            .await
    }

    pub async fn retweet(&mut self, tweet_id: &AccountId) -> Result<InteractionOutcome> {
        self.guard
            .retweet(&self.ledger, &self.signer, &mut self.reconciler, tweet_id)
            .await
    }

    pub fn viewer_flag(&self, kind: InteractionKind, tweet_id: &AccountId) -> bool {
        self.guard.viewer_flag(kind, tweet_id, &self.reconciler)
    }

    /// Moderate, submit and confirm a tweet, then reload the feed.
    pub async fn publish_tweet(&mut self, message: &str) -> Result<PublishOutcome> {
        if message.trim().is_empty() {
            return Ok(PublishOutcome::Ignored);
        }

        if self.moderator.check_content(message).await.flagged {
            tracing::info!("session: message rejected by moderation");
            return Err(CoreError::ContentRejected(MODERATION_REJECTION.to_string()));
        }

        let handle = self
            .ledger
            .submit_tweet(&self.signer, message)
            .await
            .map_err(|e| e.into_transaction())?;
        self.ledger
            .confirm_transaction(&handle)
            .await
            .map_err(|e| e.into_transaction())?;
        tracing::info!("session: tweet confirmed ({})", handle);

        if let Err(e) = self.reconciler.sync(&self.ledger, &self.signer).await {
            tracing::warn!("session: refresh after publish failed: {}", e);
        }
        if let Err(e) = self.refresh_profile().await {
            tracing::warn!("session: profile refresh after publish failed: {}", e);
        }

        Ok(PublishOutcome::Published(handle))
    }

    /// Validate the form, store the encoded handle on-chain and load the
    /// resulting profile.
    pub async fn create_profile(&mut self, draft: &ProfileDraft) -> Result<Profile> {
        draft.validate()?;
        let raw_handle = draft.encoded_handle();

        let handle = self
            .ledger
            .submit_create_profile(&self.signer, &raw_handle, draft.display_name.trim())
            .await
            .map_err(|e| e.into_transaction())?;
        self.ledger
            .confirm_transaction(&handle)
            .await
            .map_err(|e| e.into_transaction())?;
        tracing::info!("session: profile {} created ({})", raw_handle, handle);

        self.refresh_profile()
            .await?
            .cloned()
            .ok_or_else(|| CoreError::Transaction("profile missing after confirmation".into()))
    }

    pub fn tweets(&self) -> &[Tweet] {
        self.reconciler.tweets()
    }

    /// Tweets whose author picked any of `selected`; all of them when nothing
    /// is selected.
    pub fn filtered<S: AsRef<str>>(&self, selected: &[S]) -> Vec<&Tweet> {
        handle::filter_by_categories(self.reconciler.tweets(), selected)
    }

    pub fn phase(&self) -> FeedPhase {
        self.reconciler.state().phase()
    }

    pub fn profile(&self) -> Option<&Profile> {
        self.profile.as_ref()
    }

    pub fn signer(&self) -> &SignerContext {
        &self.signer
    }

    pub fn ledger(&self) -> &L {
        &self.ledger
    }

    pub fn reconciler(&self) -> &Reconciler {
        &self.reconciler
    }

    /// Late fetch results are ignored from here on.
    pub fn shutdown(&mut self) {
        tracing::info!("session: shutting down");
        self.reconciler.close();
    }
}
