//! Feed reconciliation state machine.
//!
//! `FeedState` is a pure transition function: it takes events (mount, fetch
//! result, fetch failure, viewer flag observed, close) and returns the effects
//! the driver must carry out (persist the new set, fetch again). It performs no
//! I/O, which keeps every ordering question testable without a ledger.
//!
//! # Phases
//! - `Empty`: nothing cached and no remote result yet.
//! - `StaleDisplay`: cached tweets are shown while the first fetch runs.
//! - `Fresh`: a fetch returned a non-empty list which replaced the set.
//!
//! An empty successful result carries no information and leaves the set (and
//! the slot) untouched. A fully emptied remote feed is therefore never
//! reflected locally.
//!
//! # Generations
//! Every fetch is issued a strictly increasing generation. A result is applied
//! only if it is newer than the newest result applied so far, so overlapping
//! fetches resolve to the most recently requested data instead of whichever
//! finished last. After `Closed`, all results are dropped.
//!
//! # Follow-up fetches
//! When an applied result changes the number of tweets held, one more fetch is
//! requested to pick up viewer flags that the first read may have missed. The
//! chain ends once two consecutive results agree on the count, or after
//! `max_followups` follow-ups.

use serde::Serialize;

use crate::interaction::InteractionKind;
use crate::models::{AccountId, Tweet};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum FeedPhase {
    Empty,
    StaleDisplay,
    Fresh,
}

impl FeedPhase {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Empty => "empty",
            Self::StaleDisplay => "stale",
            Self::Fresh => "fresh",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FetchKind {
    Primary,
    FollowUp,
}

/// Handle for one in-flight fetch.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FetchTicket {
    pub generation: u64,
    pub kind: FetchKind,
}

#[derive(Debug)]
pub enum FeedEvent {
    Mounted { cached: Option<Vec<Tweet>> },
    FetchSucceeded { ticket: FetchTicket, tweets: Vec<Tweet> },
    FetchFailed { ticket: FetchTicket, error: String },
    ViewerFlag { tweet_id: AccountId, kind: InteractionKind, value: bool },
    Closed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Overwrite the durable slot with this set
    Persist(Vec<Tweet>),
    /// Issue a follow-up fetch
    Refetch,
}

#[derive(Debug, Clone)]
pub struct FeedState {
    phase: FeedPhase,
    tweets: Vec<Tweet>,
    issued_generation: u64,
    applied_generation: u64,
    followups: u32,
    max_followups: u32,
    closed: bool,
}

impl FeedState {
    pub fn new(max_followups: u32) -> Self {
        Self {
            phase: FeedPhase::Empty,
            tweets: Vec::new(),
            issued_generation: 0,
            applied_generation: 0,
            followups: 0,
            max_followups,
            closed: false,
        }
    }

    // ===== Query Methods =====

    pub fn phase(&self) -> FeedPhase {
        self.phase
    }

    pub fn tweets(&self) -> &[Tweet] {
        &self.tweets
    }

    pub fn find(&self, tweet_id: &AccountId) -> Option<&Tweet> {
        self.tweets.iter().find(|t| t.tweet_id == *tweet_id)
    }

    pub fn is_fresh(&self) -> bool {
        self.phase == FeedPhase::Fresh
    }

    /// Nothing to show yet
    pub fn is_loading(&self) -> bool {
        self.phase == FeedPhase::Empty
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn issued_generation(&self) -> u64 {
        self.issued_generation
    }

    pub fn applied_generation(&self) -> u64 {
        self.applied_generation
    }

    // ===== Mutation Methods =====

    pub fn begin_fetch(&mut self) -> FetchTicket {
        self.issue(FetchKind::Primary)
    }

    pub fn begin_followup(&mut self) -> FetchTicket {
        self.issue(FetchKind::FollowUp)
    }

    fn issue(&mut self, kind: FetchKind) -> FetchTicket {
        self.issued_generation += 1;
        FetchTicket {
            generation: self.issued_generation,
            kind,
        }
    }

    pub fn apply(&mut self, event: FeedEvent) -> Vec<Effect> {
        if self.closed {
            tracing::debug!("feed: closed, ignoring {}", event_name(&event));
            return Vec::new();
        }

        match event {
            FeedEvent::Mounted { cached } => self.on_mounted(cached),
            FeedEvent::FetchSucceeded { ticket, tweets } => self.on_fetch_succeeded(ticket, tweets),
            FeedEvent::FetchFailed { ticket, error } => {
                tracing::warn!(
                    "feed: fetch generation {} failed, keeping {} displayed tweets: {}",
                    ticket.generation,
                    self.tweets.len(),
                    error
                );
                if ticket.kind == FetchKind::FollowUp {
                    self.followups = 0;
                }
                Vec::new()
            }
            FeedEvent::ViewerFlag {
                tweet_id,
                kind,
                value,
            } => {
                if let Some(tweet) = self.tweets.iter_mut().find(|t| t.tweet_id == tweet_id) {
                    match kind {
                        InteractionKind::Like => tweet.viewer_liked = value,
                        InteractionKind::Retweet => tweet.viewer_retweeted = value,
                    }
                }
                Vec::new()
            }
            FeedEvent::Closed => {
                self.closed = true;
                Vec::new()
            }
        }
    }

    fn on_mounted(&mut self, cached: Option<Vec<Tweet>>) -> Vec<Effect> {
        match cached {
            Some(tweets) if !tweets.is_empty() => {
                tracing::info!("feed: showing {} cached tweets", tweets.len());
                self.tweets = tweets;
                self.phase = FeedPhase::StaleDisplay;
            }
            _ => {
                tracing::info!("feed: no cached tweets");
                self.phase = FeedPhase::Empty;
            }
        }
        Vec::new()
    }

    fn on_fetch_succeeded(&mut self, ticket: FetchTicket, tweets: Vec<Tweet>) -> Vec<Effect> {
        if ticket.generation <= self.applied_generation {
            tracing::warn!(
                "feed: discarding stale result (generation {} <= applied {})",
                ticket.generation,
                self.applied_generation
            );
            return Vec::new();
        }
        self.applied_generation = ticket.generation;

        if ticket.kind == FetchKind::Primary {
            self.followups = 0;
        }

        if tweets.is_empty() {
            tracing::info!(
                "feed: empty result for generation {}, keeping {} tweets",
                ticket.generation,
                self.tweets.len()
            );
            self.followups = 0;
            return Vec::new();
        }

        let previous_count = self.tweets.len();
        self.tweets = tweets;
        self.phase = FeedPhase::Fresh;
        tracing::info!(
            "feed: fresh with {} tweets (generation {})",
            self.tweets.len(),
            ticket.generation
        );

        let mut effects = vec![Effect::Persist(self.tweets.clone())];

        if self.tweets.len() == previous_count {
            self.followups = 0;
        } else if self.followups < self.max_followups {
            self.followups += 1;
            effects.push(Effect::Refetch);
        } else {
            tracing::warn!(
                "feed: count still changing after {} follow-up fetches, giving up",
                self.followups
            );
            self.followups = 0;
        }

        effects
    }
}

fn event_name(event: &FeedEvent) -> &'static str {
    match event {
        FeedEvent::Mounted { .. } => "Mounted",
        FeedEvent::FetchSucceeded { .. } => "FetchSucceeded",
        FeedEvent::FetchFailed { .. } => "FetchFailed",
        FeedEvent::ViewerFlag { .. } => "ViewerFlag",
        FeedEvent::Closed => "Closed",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tweet(n: u8) -> Tweet {
        Tweet {
            tweet_id: AccountId::from_bytes([n; 32]),
            profile_id: AccountId::from_bytes([1; 32]),
            wallet_id: AccountId::from_bytes([2; 32]),
            raw_handle: "@a+codi+a@b.co".to_string(),
            display_name: "A".to_string(),
            message: format!("m{}", n),
            like_count: 0,
            retweet_count: 0,
            viewer_liked: false,
            viewer_retweeted: false,
        }
    }

    fn tweets(ns: &[u8]) -> Vec<Tweet> {
        ns.iter().map(|&n| tweet(n)).collect()
    }

    fn succeed(state: &mut FeedState, ticket: FetchTicket, ns: &[u8]) -> Vec<Effect> {
        state.apply(FeedEvent::FetchSucceeded {
            ticket,
            tweets: tweets(ns),
        })
    }

    #[test]
    fn test_mount_with_cache_is_stale_display() {
        let mut state = FeedState::new(3);
        let effects = state.apply(FeedEvent::Mounted {
            cached: Some(tweets(&[1, 2])),
        });
        assert!(effects.is_empty());
        assert_eq!(state.phase(), FeedPhase::StaleDisplay);
        assert_eq!(state.tweets().len(), 2);
        assert!(!state.is_loading());
    }

    #[test]
    fn test_mount_with_empty_cache_is_empty() {
        let mut state = FeedState::new(3);
        state.apply(FeedEvent::Mounted { cached: Some(Vec::new()) });
        assert_eq!(state.phase(), FeedPhase::Empty);
        assert!(state.is_loading());

        let mut state = FeedState::new(3);
        state.apply(FeedEvent::Mounted { cached: None });
        assert_eq!(state.phase(), FeedPhase::Empty);
    }

    #[test]
    fn test_non_empty_result_is_fresh_and_persisted() {
        let mut state = FeedState::new(3);
        state.apply(FeedEvent::Mounted { cached: None });
        let ticket = state.begin_fetch();
        let effects = succeed(&mut state, ticket, &[1, 2, 3]);

        assert_eq!(state.phase(), FeedPhase::Fresh);
        assert_eq!(effects[0], Effect::Persist(tweets(&[1, 2, 3])));
        // 0 -> 3 changed the count
        assert_eq!(effects[1], Effect::Refetch);
    }

    #[test]
    fn test_empty_result_keeps_previous_set() {
        let mut state = FeedState::new(3);
        state.apply(FeedEvent::Mounted {
            cached: Some(tweets(&[1, 2])),
        });
        let ticket = state.begin_fetch();
        let effects = succeed(&mut state, ticket, &[]);

        assert!(effects.is_empty());
        assert_eq!(state.phase(), FeedPhase::StaleDisplay);
        assert_eq!(state.tweets(), tweets(&[1, 2]).as_slice());
    }

    #[test]
    fn test_result_replaces_rather_than_merges() {
        let mut state = FeedState::new(3);
        state.apply(FeedEvent::Mounted {
            cached: Some(tweets(&[1, 2])),
        });
        let ticket = state.begin_fetch();
        succeed(&mut state, ticket, &[3, 4]);
        assert_eq!(state.tweets(), tweets(&[3, 4]).as_slice());
    }

    #[test]
    fn test_same_count_requests_no_followup() {
        let mut state = FeedState::new(3);
        state.apply(FeedEvent::Mounted {
            cached: Some(tweets(&[1, 2])),
        });
        let ticket = state.begin_fetch();
        let effects = succeed(&mut state, ticket, &[1, 2]);
        assert_eq!(effects, vec![Effect::Persist(tweets(&[1, 2]))]);
    }

    #[test]
    fn test_followup_chain_stops_when_count_stabilizes() {
        let mut state = FeedState::new(3);
        state.apply(FeedEvent::Mounted { cached: None });

        let first = state.begin_fetch();
        assert!(succeed(&mut state, first, &[1, 2, 3]).contains(&Effect::Refetch));

        let second = state.begin_followup();
        assert!(!succeed(&mut state, second, &[1, 2, 3]).contains(&Effect::Refetch));
    }

    #[test]
    fn test_followup_chain_is_capped() {
        let mut state = FeedState::new(2);
        state.apply(FeedEvent::Mounted { cached: None });

        let t = state.begin_fetch();
        assert!(succeed(&mut state, t, &[1]).contains(&Effect::Refetch));
        let t = state.begin_followup();
        assert!(succeed(&mut state, t, &[1, 2]).contains(&Effect::Refetch));
        let t = state.begin_followup();
        assert!(!succeed(&mut state, t, &[1, 2, 3]).contains(&Effect::Refetch));
        assert_eq!(state.tweets().len(), 3);
    }

    #[test]
    fn test_stale_generation_is_discarded() {
        let mut state = FeedState::new(3);
        state.apply(FeedEvent::Mounted { cached: None });

        let older = state.begin_fetch();
        let newer = state.begin_fetch();

        succeed(&mut state, newer, &[5, 6]);
        let effects = succeed(&mut state, older, &[1]);

        assert!(effects.is_empty());
        assert_eq!(state.tweets(), tweets(&[5, 6]).as_slice());
        assert_eq!(state.applied_generation(), newer.generation);
    }

    #[test]
    fn test_older_result_applies_if_newer_not_yet_arrived() {
        let mut state = FeedState::new(3);
        state.apply(FeedEvent::Mounted { cached: None });

        let older = state.begin_fetch();
        let newer = state.begin_fetch();

        succeed(&mut state, older, &[1]);
        assert_eq!(state.tweets().len(), 1);
        succeed(&mut state, newer, &[1, 2]);
        assert_eq!(state.tweets().len(), 2);
    }

    #[test]
    fn test_failure_leaves_state_untouched() {
        let mut state = FeedState::new(3);
        state.apply(FeedEvent::Mounted {
            cached: Some(tweets(&[1])),
        });
        let ticket = state.begin_fetch();
        let effects = state.apply(FeedEvent::FetchFailed {
            ticket,
            error: "rpc down".to_string(),
        });
        assert!(effects.is_empty());
        assert_eq!(state.phase(), FeedPhase::StaleDisplay);
        assert_eq!(state.tweets(), tweets(&[1]).as_slice());
    }

    #[test]
    fn test_results_after_close_are_dropped() {
        let mut state = FeedState::new(3);
        state.apply(FeedEvent::Mounted { cached: None });
        let ticket = state.begin_fetch();
        state.apply(FeedEvent::Closed);

        let effects = succeed(&mut state, ticket, &[1, 2]);
        assert!(effects.is_empty());
        assert!(state.tweets().is_empty());
        assert!(state.is_closed());
    }

    #[test]
    fn test_viewer_flag_patches_tweet() {
        let mut state = FeedState::new(3);
        state.apply(FeedEvent::Mounted {
            cached: Some(tweets(&[1, 2])),
        });
        state.apply(FeedEvent::ViewerFlag {
            tweet_id: tweet(2).tweet_id,
            kind: InteractionKind::Like,
            value: true,
        });
        assert!(state.find(&tweet(2).tweet_id).unwrap().viewer_liked);
        assert!(!state.find(&tweet(1).tweet_id).unwrap().viewer_liked);
    }
}
