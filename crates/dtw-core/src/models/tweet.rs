use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::handle::{self, DecodedHandle};
use crate::models::{AccountId, Badge, RawAccountId};

/// A tweet record with normalized identifiers.
///
/// Only the two counters and the two viewer flags ever change, and only by
/// re-fetching from the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tweet {
    pub tweet_id: AccountId,
    pub profile_id: AccountId,
    pub wallet_id: AccountId,
    pub raw_handle: String,
    pub display_name: String,
    pub message: String,
    pub like_count: u64,
    pub retweet_count: u64,
    pub viewer_liked: bool,
    pub viewer_retweeted: bool,
}

impl Tweet {
    pub fn handle(&self) -> DecodedHandle {
        handle::decode(&self.raw_handle)
    }

    pub fn badge(&self) -> Badge {
        Badge::for_message(&self.message)
    }
}

/// A tweet as it crosses a boundary (ledger response or cache slot), with
/// identifiers not yet normalized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawTweet {
    pub tweet_id: RawAccountId,
    pub profile_id: RawAccountId,
    pub wallet_id: RawAccountId,
    pub raw_handle: String,
    pub display_name: String,
    pub message: String,
    #[serde(default)]
    pub like_count: u64,
    #[serde(default)]
    pub retweet_count: u64,
    #[serde(default)]
    pub viewer_liked: bool,
    #[serde(default)]
    pub viewer_retweeted: bool,
}

impl RawTweet {
    pub fn normalize(self) -> Result<Tweet> {
        Ok(Tweet {
            tweet_id: self.tweet_id.normalize()?,
            profile_id: self.profile_id.normalize()?,
            wallet_id: self.wallet_id.normalize()?,
            raw_handle: self.raw_handle,
            display_name: self.display_name,
            message: self.message,
            like_count: self.like_count,
            retweet_count: self.retweet_count,
            viewer_liked: self.viewer_liked,
            viewer_retweeted: self.viewer_retweeted,
        })
    }
}

impl From<Tweet> for RawTweet {
    fn from(tweet: Tweet) -> Self {
        Self {
            tweet_id: tweet.tweet_id.into(),
            profile_id: tweet.profile_id.into(),
            wallet_id: tweet.wallet_id.into(),
            raw_handle: tweet.raw_handle,
            display_name: tweet.display_name,
            message: tweet.message,
            like_count: tweet.like_count,
            retweet_count: tweet.retweet_count,
            viewer_liked: tweet.viewer_liked,
            viewer_retweeted: tweet.viewer_retweeted,
        }
    }
}

/// Normalize a batch of boundary records, dropping any record whose
/// identifiers do not parse. Order of the surviving records is preserved.
pub fn normalize_tweets(raw: Vec<RawTweet>, source: &str) -> Vec<Tweet> {
    let total = raw.len();
    let tweets: Vec<Tweet> = raw
        .into_iter()
        .filter_map(|record| match record.normalize() {
            Ok(tweet) => Some(tweet),
            Err(e) => {
                tracing::warn!("{}: dropping record: {}", source, e);
                None
            }
        })
        .collect();

    if tweets.len() < total {
        tracing::warn!(
            "{}: kept {} of {} records after normalization",
            source,
            tweets.len(),
            total
        );
    }
    tweets
}
