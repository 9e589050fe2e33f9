//! Transaction memos.
//!
//! The custody core only cares about a memo's type tag and, for some types, a block height or a
//! referenced transaction id. Everything else in a memo is interpreted by downstream handlers.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    errors::ParseError,
    ids::TxId,
    types::BlockHeight,
};

/// The type tag of a memo.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum MemoKind {
    /// Swap to another asset.
    Swap,
    /// Add liquidity to a pool.
    AddLiquidity,
    /// Withdraw liquidity from a pool.
    Withdraw,
    /// Move funds from a retiring vault to a new one.
    Migrate,
    /// Return funds of a failed inbound.
    Refund,
    /// Payment produced by a processed inbound.
    Outbound,
    /// Vault-internal consolidation.
    Internal,
    /// Fund a per-node vault from a shared vault.
    YggdrasilFund,
    /// Return funds from a per-node vault to a shared vault.
    YggdrasilReturn,
    /// Sweep funds out of a chain being retired.
    Ragnarok,
    /// Donate to a pool.
    Donate,
    /// Do nothing beyond crediting the vault.
    Noop,
}

impl MemoKind {
    /// Returns whether the memo marks a payment produced by the network.
    pub const fn is_outbound(&self) -> bool {
        matches!(self, MemoKind::Outbound | MemoKind::Refund)
    }

    /// Returns whether the memo marks a vault-internal fund movement.
    pub const fn is_internal(&self) -> bool {
        matches!(
            self,
            MemoKind::Migrate
                | MemoKind::Internal
                | MemoKind::YggdrasilFund
                | MemoKind::YggdrasilReturn
                | MemoKind::Ragnarok
        )
    }

    /// Returns whether the memo is a user request into the network.
    pub const fn is_inbound(&self) -> bool {
        !self.is_outbound() && !self.is_internal()
    }

    /// Returns whether payments with this memo are exempt from the outbound fee and may carry a
    /// zero amount.
    pub const fn is_fee_exempt(&self) -> bool {
        matches!(
            self,
            MemoKind::Migrate
                | MemoKind::YggdrasilFund
                | MemoKind::YggdrasilReturn
                | MemoKind::Ragnarok
        )
    }

    /// Returns whether the scheduler throttles payments with this memo.
    pub const fn is_throttled(&self) -> bool {
        self.is_outbound()
    }
}

impl fmt::Display for MemoKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            MemoKind::Swap => "swap",
            MemoKind::AddLiquidity => "add-liquidity",
            MemoKind::Withdraw => "withdraw",
            MemoKind::Migrate => "migrate",
            MemoKind::Refund => "refund",
            MemoKind::Outbound => "outbound",
            MemoKind::Internal => "internal",
            MemoKind::YggdrasilFund => "yggdrasil-fund",
            MemoKind::YggdrasilReturn => "yggdrasil-return",
            MemoKind::Ragnarok => "ragnarok",
            MemoKind::Donate => "donate",
            MemoKind::Noop => "noop",
        };
        f.write_str(s)
    }
}

/// A parsed memo.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Memo {
    /// The type tag.
    pub kind: MemoKind,

    /// Block height carried by internal memos.
    pub block_height: Option<BlockHeight>,

    /// Transaction referenced by outbound and refund memos.
    pub tx_id: Option<TxId>,
}

impl Memo {
    /// Creates a memo with no extra fields.
    pub const fn new(kind: MemoKind) -> Self {
        Self {
            kind,
            block_height: None,
            tx_id: None,
        }
    }

    /// Memo text of an outbound paying out against `in_hash`.
    pub fn outbound(in_hash: &TxId) -> String {
        format!("OUT:{in_hash}")
    }

    /// Memo text of a refund of `in_hash`.
    pub fn refund(in_hash: &TxId) -> String {
        format!("REFUND:{in_hash}")
    }

    /// Memo text of a migration scheduled at `height`.
    pub fn migrate(height: BlockHeight) -> String {
        format!("MIGRATE:{height}")
    }

    /// Memo text of a per-node vault funding scheduled at `height`.
    pub fn yggdrasil_fund(height: BlockHeight) -> String {
        format!("YGGDRASIL+:{height}")
    }

    /// Memo text of a per-node vault return scheduled at `height`.
    pub fn yggdrasil_return(height: BlockHeight) -> String {
        format!("YGGDRASIL-:{height}")
    }

    /// Memo text of a chain-retirement sweep scheduled at `height`.
    pub fn ragnarok(height: BlockHeight) -> String {
        format!("RAGNAROK:{height}")
    }
}

/// Errors that can occur while parsing a memo.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MemoError {
    /// The memo is empty.
    #[error("empty memo")]
    Empty,

    /// The type tag is not recognized.
    #[error("unknown memo type: {0}")]
    UnknownType(String),

    /// A field required by the memo type is missing.
    #[error("memo {kind} is missing its {field}")]
    MissingField {
        /// The memo type.
        kind: MemoKind,
        /// The missing field.
        field: &'static str,
    },

    /// The block height field is not a number.
    #[error("invalid block height in memo: {0}")]
    InvalidHeight(String),

    /// The tx id field is malformed.
    #[error("invalid tx id in memo: {0}")]
    InvalidTxId(#[from] ParseError),
}

/// Parses raw memo text into a typed [`Memo`].
pub trait MemoParser {
    /// Parses `raw`.
    fn parse(&self, raw: &str) -> Result<Memo, MemoError>;
}

/// Parser for the colon-separated memo grammar, e.g. `SWAP:BTC.BTC:addr` or `OUT:<txid>`.
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardMemoParser;

impl StandardMemoParser {
    fn kind(tag: &str) -> Option<MemoKind> {
        let kind = match tag.to_ascii_uppercase().as_str() {
            "SWAP" | "=" | "S" => MemoKind::Swap,
            "ADD" | "+" | "A" => MemoKind::AddLiquidity,
            "WITHDRAW" | "-" | "WD" => MemoKind::Withdraw,
            "MIGRATE" => MemoKind::Migrate,
            "REFUND" => MemoKind::Refund,
            "OUT" => MemoKind::Outbound,
            "CONSOLIDATE" => MemoKind::Internal,
            "YGGDRASIL+" => MemoKind::YggdrasilFund,
            "YGGDRASIL-" => MemoKind::YggdrasilReturn,
            "RAGNAROK" => MemoKind::Ragnarok,
            "DONATE" | "D" => MemoKind::Donate,
            "NOOP" => MemoKind::Noop,
            _ => return None,
        };

        Some(kind)
    }
}

impl MemoParser for StandardMemoParser {
    fn parse(&self, raw: &str) -> Result<Memo, MemoError> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(MemoError::Empty);
        }

        let mut parts = raw.split(':');
        let tag = parts.next().unwrap_or_default();
        let kind = Self::kind(tag).ok_or_else(|| MemoError::UnknownType(tag.to_string()))?;
        let field = parts.next().filter(|f| !f.is_empty());

        let mut memo = Memo::new(kind);
        match kind {
            MemoKind::Migrate
            | MemoKind::YggdrasilFund
            | MemoKind::YggdrasilReturn
            | MemoKind::Ragnarok => {
                let field = field.ok_or(MemoError::MissingField {
                    kind,
                    field: "block height",
                })?;
                let height = field
                    .parse()
                    .map_err(|_| MemoError::InvalidHeight(field.to_string()))?;
                memo.block_height = Some(height);
            }
            MemoKind::Outbound | MemoKind::Refund => {
                let field = field.ok_or(MemoError::MissingField {
                    kind,
                    field: "tx id",
                })?;
                memo.tx_id = Some(TxId::parse(field)?);
            }
            _ => {}
        }

        Ok(memo)
    }
}
