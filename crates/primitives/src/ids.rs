//! Identifier newtypes.
//!
//! All identifiers are kept in their textual form since that is how they appear on the wire and
//! in memos; ordering is therefore lexicographic, which is what deterministic iteration relies on.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::errors::{ParseError, ParseResult};

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
        pub struct $name(String);

        impl $name {
            /// Creates a new identifier from its textual form.
            pub fn new(s: impl Into<String>) -> Self {
                Self(s.into())
            }

            /// Returns the textual form.
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Returns whether the identifier is empty.
            pub fn is_empty(&self) -> bool {
                self.0.is_empty()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self::new(s)
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl AsRef<[u8]> for $name {
            fn as_ref(&self) -> &[u8] {
                self.0.as_bytes()
            }
        }
    };
}

string_id!(
    /// Account address of a validator node on the native chain.
    NodeAddress
);

string_id!(
    /// A public key, used both for validator consensus keys and for vault keys.
    PubKey
);

string_id!(
    /// An address on some chain.
    Address
);

/// Length of a transaction id in hex characters.
const TXID_HEX_LEN: usize = 64;

/// Identifier of a transaction on an external chain, as uppercase hex.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TxId(String);

impl TxId {
    /// The sentinel used for payments that are not tied to any inbound transaction.
    pub fn blank() -> Self {
        Self("0".repeat(TXID_HEX_LEN))
    }

    /// Creates a transaction id from raw bytes.
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(hex::encode_upper(bytes))
    }

    /// Parses a transaction id, normalizing it to uppercase.
    pub fn parse(s: &str) -> ParseResult<Self> {
        if s.len() != TXID_HEX_LEN || hex::decode(s).is_err() {
            return Err(ParseError::MalformedTxId(s.to_string()));
        }

        Ok(Self(s.to_ascii_uppercase()))
    }

    /// Returns whether this is the [`TxId::blank`] sentinel.
    pub fn is_blank(&self) -> bool {
        self.0.bytes().all(|b| b == b'0')
    }

    /// Returns whether the id is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns the textual form.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for TxId {
    fn default() -> Self {
        Self::blank()
    }
}

impl fmt::Display for TxId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<[u8]> for TxId {
    fn as_ref(&self) -> &[u8] {
        self.0.as_bytes()
    }
}
