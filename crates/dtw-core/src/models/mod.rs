pub mod account_id;
pub mod category;
pub mod profile;
pub mod tweet;

pub use account_id::{normalize, AccountId, RawAccountId};
pub use category::{Badge, Category, CATEGORIES};
pub use profile::{Profile, ProfileDraft};
pub use tweet::{normalize_tweets, RawTweet, Tweet};
