//! Runtime overrides of protocol parameters.

use std::{collections::BTreeMap, fmt, path::Path};

use serde::{Deserialize, Serialize};

use crate::errors::ParamsResult;

/// Keys of the parameters that governance can override.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ParamKey {
    /// Numerator of the consensus threshold.
    ConsensusThresholdNum,
    /// Denominator of the consensus threshold.
    ConsensusThresholdDen,
    /// Blocks after consensus during which late matching observations are forgiven.
    ObservationDelayFlexibility,
    /// Points added per observation.
    ObserveSlashPoints,
    /// Points for not observing a transaction that reached consensus.
    LackOfObservationPenalty,
    /// Blocks a vault has to sign an outbound.
    SigningTransactionPeriod,
    /// Points for failing to sign.
    SigningSlashPoints,
    /// Jail time for a per-node vault owner that failed to sign.
    JailTimeSigning,
    /// Signing windows an outbound is retried for.
    MaxOutboundAttempts,
    /// Flat outbound fee.
    OutboundTransactionFee,
    /// Per-block value above which outbounds are delayed.
    MinTxOutVolumeThreshold,
    /// Release rate of queued outbound value.
    TxOutDelayRate,
    /// Future blocks inspected by the delay computation.
    TxOutDelayMax,
    /// Maximum outbound delay.
    MaxTxOutOffset,
    /// Slash multiplier.
    SlashPenalty,
    /// Slashed value at which a chain is halted.
    PauseOnSlashThreshold,
    /// Maximum age of double-sign evidence.
    DoubleSignMaxAge,
    /// Fraction of the bond burned for double signing.
    DoubleSignSlash,
    /// Blocks between slash point decays.
    SlashPointDecayInterval,
    /// Points removed per decay.
    SlashPointDecay,
}

impl ParamKey {
    /// All keys.
    pub const ALL: [ParamKey; 20] = [
        ParamKey::ConsensusThresholdNum,
        ParamKey::ConsensusThresholdDen,
        ParamKey::ObservationDelayFlexibility,
        ParamKey::ObserveSlashPoints,
        ParamKey::LackOfObservationPenalty,
        ParamKey::SigningTransactionPeriod,
        ParamKey::SigningSlashPoints,
        ParamKey::JailTimeSigning,
        ParamKey::MaxOutboundAttempts,
        ParamKey::OutboundTransactionFee,
        ParamKey::MinTxOutVolumeThreshold,
        ParamKey::TxOutDelayRate,
        ParamKey::TxOutDelayMax,
        ParamKey::MaxTxOutOffset,
        ParamKey::SlashPenalty,
        ParamKey::PauseOnSlashThreshold,
        ParamKey::DoubleSignMaxAge,
        ParamKey::DoubleSignSlash,
        ParamKey::SlashPointDecayInterval,
        ParamKey::SlashPointDecay,
    ];

    /// The name under which governance stores the key.
    pub const fn name(&self) -> &'static str {
        match self {
            ParamKey::ConsensusThresholdNum => "ConsensusThresholdNum",
            ParamKey::ConsensusThresholdDen => "ConsensusThresholdDen",
            ParamKey::ObservationDelayFlexibility => "ObservationDelayFlexibility",
            ParamKey::ObserveSlashPoints => "ObserveSlashPoints",
            ParamKey::LackOfObservationPenalty => "LackOfObservationPenalty",
            ParamKey::SigningTransactionPeriod => "SigningTransactionPeriod",
            ParamKey::SigningSlashPoints => "SigningSlashPoints",
            ParamKey::JailTimeSigning => "JailTimeSigning",
            ParamKey::MaxOutboundAttempts => "MaxOutboundAttempts",
            ParamKey::OutboundTransactionFee => "OutboundTransactionFee",
            ParamKey::MinTxOutVolumeThreshold => "MinTxOutVolumeThreshold",
            ParamKey::TxOutDelayRate => "TxOutDelayRate",
            ParamKey::TxOutDelayMax => "TxOutDelayMax",
            ParamKey::MaxTxOutOffset => "MaxTxOutOffset",
            ParamKey::SlashPenalty => "SlashPenalty",
            ParamKey::PauseOnSlashThreshold => "PauseOnSlashThreshold",
            ParamKey::DoubleSignMaxAge => "DoubleSignMaxAge",
            ParamKey::DoubleSignSlash => "DoubleSignSlash",
            ParamKey::SlashPointDecayInterval => "SlashPointDecayInterval",
            ParamKey::SlashPointDecay => "SlashPointDecay",
        }
    }

    /// Returns whether zero is a meaningful value for this key. For the other keys a zero
    /// override is treated as absent.
    pub const fn allows_zero(&self) -> bool {
        matches!(
            self,
            ParamKey::ObserveSlashPoints
                | ParamKey::LackOfObservationPenalty
                | ParamKey::MaxOutboundAttempts
                | ParamKey::OutboundTransactionFee
                | ParamKey::MinTxOutVolumeThreshold
                | ParamKey::TxOutDelayRate
                | ParamKey::PauseOnSlashThreshold
                | ParamKey::SlashPointDecayInterval
        )
    }

    /// Returns the override if it is valid for this key.
    pub fn validate(&self, value: i64) -> Option<u64> {
        let value = u64::try_from(value).ok()?;
        (value > 0 || self.allows_zero()).then_some(value)
    }
}

impl fmt::Display for ParamKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Read-only source of governance overrides.
pub trait GovernanceSource {
    /// Returns the raw override stored for `key`, if any.
    fn get(&self, key: ParamKey) -> Option<i64>;
}

/// A source without any overrides.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOverrides;

impl GovernanceSource for NoOverrides {
    fn get(&self, _key: ParamKey) -> Option<i64> {
        None
    }
}

/// Overrides keyed by [`ParamKey::name`], loadable from TOML.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MimirOverrides(BTreeMap<String, i64>);

impl MimirOverrides {
    /// Creates an empty set of overrides.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the override for `key`.
    pub fn set(&mut self, key: ParamKey, value: i64) {
        self.0.insert(key.name().to_string(), value);
    }

    /// Removes the override for `key`.
    pub fn remove(&mut self, key: ParamKey) {
        self.0.remove(key.name());
    }

    /// Parses overrides from a TOML document of `Name = value` pairs.
    pub fn from_toml_str(s: &str) -> ParamsResult<Self> {
        Ok(toml::from_str(s)?)
    }

    /// Loads overrides from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> ParamsResult<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }
}

impl GovernanceSource for MimirOverrides {
    fn get(&self, key: ParamKey) -> Option<i64> {
        self.0.get(key.name()).copied()
    }
}
