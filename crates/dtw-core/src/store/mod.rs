pub mod cache_store;
pub mod feed_state;

pub use cache_store::CacheStore;
pub use feed_state::{Effect, FeedEvent, FeedPhase, FeedState, FetchKind, FetchTicket};
