//! Account identifiers and their boundary representation.
//!
//! An [`AccountId`] is a fixed 32-byte value. Its canonical string projection is
//! lowercase hex. Records coming from the ledger carry identifiers in binary
//! form while records coming back from the cache carry the string form; both
//! cross into the core as a [`RawAccountId`] and are normalized exactly once.

use std::fmt;
use std::str::FromStr;

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};

use crate::constants::{ACCOUNT_ID_LEN, ACCOUNT_ID_SHORT_LEN};
use crate::error::{CoreError, Result};

#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AccountId([u8; ACCOUNT_ID_LEN]);

impl AccountId {
    pub const fn from_bytes(bytes: [u8; ACCOUNT_ID_LEN]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; ACCOUNT_ID_LEN] {
        &self.0
    }

    /// Parse the string projection. Accepts either hex case.
    pub fn parse(value: &str) -> Result<Self> {
        let chars = value.chars().count();
        if chars != ACCOUNT_ID_LEN * 2 {
            return Err(CoreError::malformed(
                value,
                format!("expected {} hex characters, got {}", ACCOUNT_ID_LEN * 2, chars),
            ));
        }

        let mut bytes = [0u8; ACCOUNT_ID_LEN];
        hex::decode_to_slice(value, &mut bytes)
            .map_err(|e| CoreError::malformed(value, e.to_string()))?;
        Ok(Self(bytes))
    }

    /// Derive a deterministic address from a list of seeds.
    pub fn derive(seeds: &[&[u8]]) -> Self {
        let mut hasher = Sha256::new();
        for seed in seeds {
            hasher.update(seed);
        }
        Self(hasher.finalize().into())
    }

    /// Elided projection for display, e.g. `3f2a...`
    pub fn short(&self) -> String {
        let full = self.to_string();
        format!("{}...", &full[..ACCOUNT_ID_SHORT_LEN])
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl fmt::Debug for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AccountId({})", self)
    }
}

impl FromStr for AccountId {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl Serialize for AccountId {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for AccountId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let value = String::deserialize(deserializer)?;
        Self::parse(&value).map_err(de::Error::custom)
    }
}

/// An identifier as it arrives at a boundary: either the binary form handed
/// out by the ledger or the string form read back from the cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawAccountId {
    Binary([u8; ACCOUNT_ID_LEN]),
    Text(String),
}

impl RawAccountId {
    pub fn normalize(&self) -> Result<AccountId> {
        match self {
            RawAccountId::Binary(bytes) => Ok(AccountId::from_bytes(*bytes)),
            RawAccountId::Text(text) => AccountId::parse(text),
        }
    }
}

impl From<AccountId> for RawAccountId {
    fn from(id: AccountId) -> Self {
        RawAccountId::Binary(id.0)
    }
}

impl From<[u8; ACCOUNT_ID_LEN]> for RawAccountId {
    fn from(bytes: [u8; ACCOUNT_ID_LEN]) -> Self {
        RawAccountId::Binary(bytes)
    }
}

impl From<String> for RawAccountId {
    fn from(text: String) -> Self {
        RawAccountId::Text(text)
    }
}

impl From<&str> for RawAccountId {
    fn from(text: &str) -> Self {
        RawAccountId::Text(text.to_string())
    }
}

/// Normalize any boundary representation into an [`AccountId`].
pub fn normalize(value: impl Into<RawAccountId>) -> Result<AccountId> {
    value.into().normalize()
}
