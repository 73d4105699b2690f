pub mod config;
pub mod constants;
pub mod error;
pub mod handle;
pub mod interaction;
pub mod ledger;
pub mod models;
pub mod moderation;
pub mod reconciler;
pub mod session;
pub mod store;

// Re-export the session surface at crate root for convenience
pub use config::{CoreConfig, ModerationConfig};
pub use error::{CoreError, Result};
pub use interaction::{InteractionKind, InteractionOutcome};
pub use ledger::{Ledger, MemoryLedger, SignerContext, TransactionHandle};
pub use models::{AccountId, Profile, ProfileDraft, Tweet};
pub use moderation::{AllowAllModerator, ContentModerator, HttpModerator, ModerationVerdict};
pub use session::{FeedSession, PublishOutcome};
