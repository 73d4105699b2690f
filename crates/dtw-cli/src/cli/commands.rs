use anyhow::{bail, Context, Result};
use dtw_core::handle::{self, DecodedHandle};
use dtw_core::ledger::MemoryLedger;
use dtw_core::models::{Badge, CATEGORIES};
use dtw_core::{
    AccountId, AllowAllModerator, CoreConfig, FeedSession, HttpModerator, ProfileDraft, SignerContext, Tweet,
};
use serde::Serialize;
use serde_json::{json, Value};

/// Feed row as printed by `cache` and `demo`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TweetView {
    pub tweet_id: String,
    pub author: String,
    pub display_name: String,
    pub message: String,
    pub categories: Vec<String>,
    pub badge: Badge,
    pub like_count: u64,
    pub retweet_count: u64,
    pub viewer_liked: bool,
    pub viewer_retweeted: bool,
}

impl From<&Tweet> for TweetView {
    fn from(tweet: &Tweet) -> Self {
        let handle = tweet.handle();
        Self {
            tweet_id: tweet.tweet_id.to_string(),
            author: handle.display(),
            display_name: tweet.display_name.clone(),
            message: tweet.message.clone(),
            categories: handle.categories,
            badge: tweet.badge(),
            like_count: tweet.like_count,
            retweet_count: tweet.retweet_count,
            viewer_liked: tweet.viewer_liked,
            viewer_retweeted: tweet.viewer_retweeted,
        }
    }
}

pub fn encode_handle(username: &str, categories: &[String], email: &str) -> Value {
    json!({ "handle": handle::encode(username, categories, email) })
}

pub fn decode_handle(raw: &str) -> Result<Value> {
    let decoded: DecodedHandle = handle::decode(raw);
    serde_json::to_value(&decoded).context("Failed to serialize handle")
}

pub fn list_categories() -> Value {
    let categories: Vec<Value> = CATEGORIES
        .iter()
        .map(|c| json!({ "key": c.key, "label": c.label, "tag": handle::truncate_tag(c.key) }))
        .collect();
    Value::Array(categories)
}

/// Print the cached feed, optionally restricted to authors in `categories`.
pub fn show_cache(config: &CoreConfig, categories: &[String]) -> Result<Value> {
    for key in categories {
        if dtw_core::models::Category::find(key).is_none() {
            bail!("Unknown category: {}", key);
        }
    }

    let store = config.cache_store();
    let tweets = store.load().unwrap_or_default();
    tracing::info!(
        "cache: {} tweets in {}, filter {:?}",
        tweets.len(),
        store.path().display(),
        categories
    );
    let rows: Vec<TweetView> = handle::filter_by_categories(&tweets, categories)
        .into_iter()
        .map(TweetView::from)
        .collect();

    Ok(json!({
        "slot": store.path().display().to_string(),
        "total": tweets.len(),
        "tweets": rows,
    }))
}

pub fn validate_profile(display_name: &str, username: &str, categories: &[String], email: &str) -> Value {
    let draft = ProfileDraft::new(display_name, username, categories.to_vec(), email);
    match draft.validate() {
        Ok(()) => json!({ "valid": true, "handle": draft.encoded_handle() }),
        Err(e) => json!({ "valid": false, "error": e.to_string() }),
    }
}

/// Classify `text` with the configured service. Unlike posting, failures are
/// reported here instead of being waved through.
pub async fn moderate(config: &CoreConfig, text: &str) -> Result<Value> {
    let moderation = config
        .moderation
        .as_ref()
        .context("No moderation service configured")?;
    let moderator = HttpModerator::new(moderation)?;
    tracing::debug!("moderate: asking {}", moderator.endpoint());
    let verdict = moderator.classify(text).await?;
    Ok(json!({ "flagged": verdict.flagged }))
}

/// Run a complete session against an in-memory ledger: create a profile,
/// post, like someone else's tweet and read the feed back.
pub async fn demo(config: &CoreConfig, message: &str) -> Result<Value> {
    let viewer = AccountId::from_bytes([1; 32]);
    let neighbour = AccountId::from_bytes([2; 32]);

    tracing::info!("demo: running against in-memory ledger, data dir {}", config.data_dir.display());
    let ledger = MemoryLedger::new();
    ledger.seed_profile(neighbour, "@bob+farm,fash,cons+bob@example.com", "Bob");
    let neighbour_tweet = ledger.seed_tweet(neighbour, "Harvested the first crop of the season")?;

    let mut session = FeedSession::new(config, SignerContext::new(viewer), ledger, AllowAllModerator);
    session.start().await;

    let draft = ProfileDraft::new(
        "Alice",
        "alice",
        vec!["electrical".into(), "coding".into(), "farming".into()],
        "alice@example.com",
    );
    let profile = session.create_profile(&draft).await?;
    let published = session.publish_tweet(message).await?;
    let liked = session.like(&neighbour_tweet).await?;
    let liked_again = session.like(&neighbour_tweet).await?;

    let feed: Vec<TweetView> = session.tweets().iter().map(TweetView::from).collect();
    let result = json!({
        "profile": profile,
        "published": format!("{:?}", published),
        "like": format!("{:?}", liked),
        "likeAgain": format!("{:?}", liked_again),
        "phase": session.phase().label(),
        "ledger": {
            "submissions": session.ledger().stats().submissions,
            "fetches": session.ledger().stats().fetches,
        },
        "feed": feed,
    });
    session.shutdown();
    tracing::info!("demo: done, {} tweets in feed", result["feed"].as_array().map_or(0, Vec::len));
    Ok(result)
}

pub fn print_json(value: &Value, pretty: bool) -> Result<()> {
    let output = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    println!("{}", output);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use dtw_core::store::CacheStore;
    use tempfile::tempdir;

    fn categories(keys: &[&str]) -> Vec<String> {
        keys.iter().map(|k| k.to_string()).collect()
    }

    #[test]
    fn test_encode_and_decode_handle() {
        let encoded = encode_handle(
            "@alice",
            &categories(&["electrical", "coding", "farming"]),
            "a@b.com",
        );
        assert_eq!(encoded["handle"], "@alice+elec,codi,farm+a@b.com");

        let decoded = decode_handle("@alice+elec,codi,farm+a@b.com").unwrap();
        assert_eq!(decoded["username"], "alice");
        assert_eq!(decoded["categories"], json!(["elec", "codi", "farm"]));
        assert_eq!(decoded["email"], "a@b.com");
    }

    #[test]
    fn test_validate_profile() {
        let ok = validate_profile("Alice", "alice", &categories(&["coding", "fashion", "farming"]), "a@b.com");
        assert_eq!(ok["valid"], true);
        assert_eq!(ok["handle"], "@alice+codi,fash,farm+a@b.com");

        let bad = validate_profile("Alice", "alice", &categories(&["coding"]), "a@b.com");
        assert_eq!(bad["valid"], false);
        assert!(bad["error"].as_str().unwrap().contains("at least 3"));
    }

    #[test]
    fn test_list_categories() {
        let list = list_categories();
        assert_eq!(list.as_array().unwrap().len(), 6);
        assert_eq!(list[0]["tag"], "elec");
    }

    #[test]
    fn test_show_cache_missing_slot() {
        let dir = tempdir().unwrap();
        let config = CoreConfig::new(dir.path());
        let value = show_cache(&config, &[]).unwrap();
        assert_eq!(value["total"], 0);
        assert!(show_cache(&config, &categories(&["knitting"])).is_err());
    }

    #[tokio::test]
    async fn test_demo_then_filtered_cache() {
        let dir = tempdir().unwrap();
        let config = CoreConfig::new(dir.path());

        let result = demo(&config, "Debugging a circuit all night").await.unwrap();
        assert_eq!(result["phase"], "fresh");
        assert_eq!(result["likeAgain"], "AlreadyApplied");
        assert_eq!(result["feed"].as_array().unwrap().len(), 2);
        // profile + tweet + one like
        assert_eq!(result["ledger"]["submissions"], 3);

        assert_eq!(CacheStore::new(dir.path(), "tweetsCache").load().unwrap().len(), 2);

        let coding = show_cache(&config, &categories(&["coding"])).unwrap();
        assert_eq!(coding["total"], 2);
        let rows = coding["tweets"].as_array().unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["author"], "@alice");
        assert_eq!(rows[0]["badge"], "Electrical");
    }

    #[tokio::test]
    async fn test_moderate_requires_config() {
        let dir = tempdir().unwrap();
        let config = CoreConfig::new(dir.path());
        assert!(moderate(&config, "hello").await.is_err());
    }
}
