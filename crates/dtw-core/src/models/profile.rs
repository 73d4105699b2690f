use serde::{Deserialize, Serialize};

use crate::constants::MIN_PROFILE_CATEGORIES;
use crate::error::{CoreError, Result};
use crate::handle::{self, DecodedHandle};
use crate::models::AccountId;

/// A user profile, created once per wallet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub wallet_id: AccountId,
    pub profile_id: AccountId,
    pub display_name: String,
    pub raw_handle: String,
    pub tweet_count: u64,
}

impl Profile {
    pub fn handle(&self) -> DecodedHandle {
        handle::decode(&self.raw_handle)
    }

    pub fn email(&self) -> String {
        handle::extract_email(&self.raw_handle)
    }
}

/// Account creation form contents.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileDraft {
    pub display_name: String,
    pub username: String,
    pub categories: Vec<String>,
    pub email: String,
}

impl ProfileDraft {
    pub fn new(
        display_name: impl Into<String>,
        username: impl Into<String>,
        categories: Vec<String>,
        email: impl Into<String>,
    ) -> Self {
        Self {
            display_name: display_name.into(),
            username: username.into(),
            categories,
            email: email.into(),
        }
    }

    /// Username without any leading `@`
    pub fn base_username(&self) -> &str {
        self.username.trim_start_matches('@')
    }

    pub fn validate(&self) -> Result<()> {
        if self.display_name.trim().is_empty() {
            return Err(CoreError::InvalidProfile("display name is required".into()));
        }
        if self.base_username().trim().is_empty() {
            return Err(CoreError::InvalidProfile("handle is required".into()));
        }
        if self.categories.len() < MIN_PROFILE_CATEGORIES {
            return Err(CoreError::InvalidProfile(format!(
                "pick at least {} categories",
                MIN_PROFILE_CATEGORIES
            )));
        }
        if !looks_like_email(&self.email) {
            return Err(CoreError::InvalidProfile(format!(
                "invalid email address: {:?}",
                self.email
            )));
        }
        Ok(())
    }

    /// Composite handle to store on-chain
    pub fn encoded_handle(&self) -> String {
        handle::encode(self.base_username(), &self.categories, &self.email)
    }
}

/// Matches `\S+@\S+\.\S+` anywhere in the input.
fn looks_like_email(input: &str) -> bool {
    input.split_whitespace().any(|word| {
        word.char_indices().any(|(at, c)| {
            if c != '@' || at == 0 {
                return false;
            }
            let domain = &word[at + 1..];
            domain
                .char_indices()
                .any(|(dot, d)| d == '.' && dot > 0 && dot + 1 < domain.len())
        })
    })
}
