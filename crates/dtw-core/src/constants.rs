//! Shared constants: storage slot names, handle codec characters, ledger
//! seeds and moderation defaults.

/// Name of the durable slot holding the last known tweet list
pub const CACHE_SLOT: &str = "tweetsCache";

/// Delimiter between the segments of a composite profile handle
pub const HANDLE_DELIM: char = '+';

/// Separator between category tags inside the second handle segment
pub const CATEGORY_SEP: char = ',';

/// Escape character used by the handle codec
pub const HANDLE_ESCAPE: char = '\\';

/// Category tags are stored truncated to this many characters
pub const CATEGORY_TAG_LEN: usize = 4;

/// Account creation requires at least this many categories
pub const MIN_PROFILE_CATEGORIES: usize = 3;

/// Length in bytes of an account identifier
pub const ACCOUNT_ID_LEN: usize = 32;

/// Characters of the identifier projection shown before eliding
pub const ACCOUNT_ID_SHORT_LEN: usize = 32;

/// Upper bound on count-triggered follow-up fetches per sync
pub const DEFAULT_MAX_FOLLOWUP_FETCHES: u32 = 3;

// Moderation defaults
pub const DEFAULT_MODERATION_API_VERSION: &str = "2023-06-01-preview";
pub const DEFAULT_MODERATION_TIMEOUT_SECS: u64 = 10;

/// Shown when a message is rejected by moderation
pub const MODERATION_REJECTION: &str = "Your message contains inappropriate content. Please write something aligned with office world, a bright future, SDGs, and uplifting others.";

// Account seeds for deterministic address derivation
pub mod seeds {
    pub const PROFILE: &[u8] = b"profile";
    pub const TWEET: &[u8] = b"tweet";
    pub const LIKE: &[u8] = b"like";
    pub const RETWEET: &[u8] = b"retweet";
}
