use crate::error::Result;
use crate::interaction::InteractionKind;
use crate::ledger::{Ledger, SignerContext};
use crate::models::{normalize_tweets, AccountId, RawTweet, Tweet};
use crate::store::{CacheStore, Effect, FeedEvent, FeedState, FetchKind, FetchTicket};

/// What one completed fetch changed.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct FetchOutcome {
    /// The slot was overwritten
    pub persisted: bool,
    /// A follow-up fetch was requested
    pub refetch: bool,
}

/// Drives [`FeedState`]: loads the cache on mount, runs fetches against a
/// [`Ledger`] and carries out the resulting effects.
///
/// Fetches can be driven in one call with [`Reconciler::sync`], or split into
/// [`Reconciler::begin_fetch`] / [`Reconciler::complete_fetch`] by an event loop
/// that keeps several in flight.
pub struct Reconciler {
    state: FeedState,
    cache: CacheStore,
}

impl Reconciler {
    pub fn new(cache: CacheStore, max_followups: u32) -> Self {
        Self {
            state: FeedState::new(max_followups),
            cache,
        }
    }

    pub fn state(&self) -> &FeedState {
        &self.state
    }

    pub fn tweets(&self) -> &[Tweet] {
        self.state.tweets()
    }

    pub fn cache(&self) -> &CacheStore {
        &self.cache
    }

    /// Show whatever the slot holds while the first fetch is pending.
    pub fn mount(&mut self) {
        let cached = self.cache.load();
        self.run(FeedEvent::Mounted { cached });
    }

    pub fn begin_fetch(&mut self) -> FetchTicket {
        self.state.begin_fetch()
    }

    /// Apply the result of the fetch identified by `ticket`.
    ///
    /// Records with malformed identifiers are dropped before the result is
    /// applied. A failed fetch leaves the displayed set untouched and the error
    /// is handed back.
    pub fn complete_fetch(
        &mut self,
        ticket: FetchTicket,
        result: Result<Vec<RawTweet>>,
    ) -> Result<FetchOutcome> {
        match result {
            Ok(raw) => {
                let tweets = normalize_tweets(raw, "ledger");
                Ok(self.run(FeedEvent::FetchSucceeded { ticket, tweets }))
            }
            Err(e) => {
                self.run(FeedEvent::FetchFailed {
                    ticket,
                    error: e.to_string(),
                });
                Err(e)
            }
        }
    }

    /// Fetch, apply, and keep fetching while follow-ups are requested.
    ///
    /// Only a failure of the primary fetch is returned; follow-ups are best
    /// effort.
    pub async fn sync<L: Ledger>(&mut self, ledger: &L, signer: &SignerContext) -> Result<FetchOutcome> {
        let mut ticket = self.begin_fetch();
        let mut last = FetchOutcome::default();

        loop {
            let result = ledger.fetch_all_records(signer).await;
            match self.complete_fetch(ticket, result) {
                Ok(outcome) => {
                    last.persisted |= outcome.persisted;
                    if !outcome.refetch {
                        return Ok(last);
                    }
                }
                Err(e) if ticket.kind == FetchKind::FollowUp => {
                    tracing::warn!("reconciler: follow-up fetch failed: {}", e);
                    return Ok(last);
                }
                Err(e) => return Err(e),
            }
            ticket = self.state.begin_followup();
        }
    }

    pub fn observe_viewer_flag(&mut self, tweet_id: AccountId, kind: InteractionKind, value: bool) {
        self.run(FeedEvent::ViewerFlag {
            tweet_id,
            kind,
            value,
        });
    }

    /// Stop accepting results. Fetches still in flight are ignored when they
    /// complete and nothing further is written to the slot.
    pub fn close(&mut self) {
        self.run(FeedEvent::Closed);
    }

    fn run(&mut self, event: FeedEvent) -> FetchOutcome {
        let mut outcome = FetchOutcome::default();
        for effect in self.state.apply(event) {
            match effect {
                Effect::Persist(tweets) => match self.cache.save(&tweets) {
                    Ok(()) => outcome.persisted = true,
                    Err(e) => tracing::warn!("reconciler: failed to persist feed: {}", e),
                },
                Effect::Refetch => outcome.refetch = true,
            }
        }
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::CACHE_SLOT;
    use crate::error::CoreError;
    use crate::ledger::MemoryLedger;
    use crate::models::RawAccountId;
    use crate::store::FeedPhase;
    use tempfile::tempdir;

    fn wallet(n: u8) -> AccountId {
        AccountId::from_bytes([n; 32])
    }

    fn ledger_with_tweets(count: usize) -> MemoryLedger {
        let ledger = MemoryLedger::new();
        ledger.seed_profile(wallet(1), "@alice+elec,codi,farm+a@b.com", "Alice");
        for i in 0..count {
            ledger.seed_tweet(wallet(1), &format!("tweet {}", i)).unwrap();
        }
        ledger
    }

    #[tokio::test]
    async fn test_empty_cache_then_three_tweets() {
        let dir = tempdir().unwrap();
        let ledger = ledger_with_tweets(3);
        let signer = SignerContext::new(wallet(1));
        let mut reconciler = Reconciler::new(CacheStore::new(dir.path(), CACHE_SLOT), 3);

        std::fs::write(dir.path().join("tweetsCache.json"), "[]").unwrap();
        reconciler.mount();
        assert_eq!(reconciler.state().phase(), FeedPhase::Empty);

        let outcome = reconciler.sync(&ledger, &signer).await.unwrap();
        assert!(outcome.persisted);
        assert_eq!(reconciler.state().phase(), FeedPhase::Fresh);
        assert_eq!(reconciler.tweets().len(), 3);

        let persisted = CacheStore::new(dir.path(), CACHE_SLOT).load().unwrap();
        assert_eq!(persisted, reconciler.tweets());

        // 0 -> 3 triggered exactly one follow-up, which agreed on the count
        assert_eq!(ledger.stats().fetches, 2);
    }

    #[tokio::test]
    async fn test_cached_feed_is_shown_before_fetch() {
        let dir = tempdir().unwrap();
        let ledger = ledger_with_tweets(2);
        let signer = SignerContext::new(wallet(1));

        let mut first = Reconciler::new(CacheStore::new(dir.path(), CACHE_SLOT), 3);
        first.mount();
        first.sync(&ledger, &signer).await.unwrap();

        let mut second = Reconciler::new(CacheStore::new(dir.path(), CACHE_SLOT), 3);
        second.mount();
        assert_eq!(second.state().phase(), FeedPhase::StaleDisplay);
        assert_eq!(second.tweets(), first.tweets());
    }

    #[tokio::test]
    async fn test_empty_fetch_keeps_displayed_and_persisted() {
        let dir = tempdir().unwrap();
        let ledger = ledger_with_tweets(2);
        let signer = SignerContext::new(wallet(1));
        let mut reconciler = Reconciler::new(CacheStore::new(dir.path(), CACHE_SLOT), 3);
        reconciler.mount();
        reconciler.sync(&ledger, &signer).await.unwrap();
        let before = reconciler.tweets().to_vec();

        ledger.script_fetch(Vec::new());
        let outcome = reconciler.sync(&ledger, &signer).await.unwrap();

        assert!(!outcome.persisted);
        assert_eq!(reconciler.tweets(), before.as_slice());
        assert_eq!(reconciler.cache().load(), Some(before));
    }

    #[tokio::test]
    async fn test_fetch_failure_is_returned_and_state_kept() {
        let dir = tempdir().unwrap();
        let ledger = ledger_with_tweets(1);
        let signer = SignerContext::new(wallet(1));
        let mut reconciler = Reconciler::new(CacheStore::new(dir.path(), CACHE_SLOT), 3);
        reconciler.mount();
        reconciler.sync(&ledger, &signer).await.unwrap();

        ledger.set_fail_fetches(true);
        let err = reconciler.sync(&ledger, &signer).await.unwrap_err();
        assert!(matches!(err, CoreError::RemoteFetch(_)));
        assert_eq!(reconciler.tweets().len(), 1);
        assert_eq!(reconciler.state().phase(), FeedPhase::Fresh);
    }

    #[tokio::test]
    async fn test_malformed_remote_record_is_dropped() {
        let dir = tempdir().unwrap();
        let ledger = ledger_with_tweets(2);
        let signer = SignerContext::new(wallet(1));

        let mut records = ledger.fetch_all_records(&signer).await.unwrap();
        records[0].tweet_id = RawAccountId::Text("xyz".to_string());
        ledger.script_fetch(records);

        let mut reconciler = Reconciler::new(CacheStore::new(dir.path(), CACHE_SLOT), 3);
        reconciler.mount();
        reconciler.sync(&ledger, &signer).await.unwrap();

        // The scripted response held one usable record, the follow-up read both
        assert_eq!(reconciler.tweets().len(), 2);
        assert_eq!(ledger.stats().fetches, 4);
    }

    #[tokio::test]
    async fn test_overlapping_fetches_newest_request_wins() {
        let dir = tempdir().unwrap();
        let ledger = ledger_with_tweets(1);
        let signer = SignerContext::new(wallet(1));
        let mut reconciler = Reconciler::new(CacheStore::new(dir.path(), CACHE_SLOT), 0);
        reconciler.mount();

        let older = reconciler.begin_fetch();
        let older_result = ledger.fetch_all_records(&signer).await;

        ledger.seed_tweet(wallet(1), "newer").unwrap();
        let newer = reconciler.begin_fetch();
        let newer_result = ledger.fetch_all_records(&signer).await;

        reconciler.complete_fetch(newer, newer_result).unwrap();
        let outcome = reconciler.complete_fetch(older, older_result).unwrap();

        assert!(!outcome.persisted);
        assert_eq!(reconciler.tweets().len(), 2);
        assert_eq!(reconciler.cache().load().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_close_drops_late_results() {
        let dir = tempdir().unwrap();
        let ledger = ledger_with_tweets(2);
        let signer = SignerContext::new(wallet(1));
        let mut reconciler = Reconciler::new(CacheStore::new(dir.path(), CACHE_SLOT), 3);
        reconciler.mount();

        let ticket = reconciler.begin_fetch();
        let result = ledger.fetch_all_records(&signer).await;
        reconciler.close();
        let outcome = reconciler.complete_fetch(ticket, result).unwrap();

        assert_eq!(outcome, FetchOutcome::default());
        assert!(reconciler.tweets().is_empty());
        assert!(reconciler.cache().load().is_none());
    }
}
