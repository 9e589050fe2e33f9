//! The full set of protocol parameters consumed by the custody core.

use std::path::Path;

use custody_primitives::{
    ids::Address,
    types::{supermajority_threshold, Amount},
};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    default::*,
    errors::{ParamsError, ParamsResult},
    governance::{GovernanceSource, ParamKey},
};

/// Protocol parameters.
///
/// Missing fields in a TOML document take their default values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProtocolParams {
    /// Numerator of the fraction of active validators needed for consensus.
    pub consensus_threshold_num: u64,

    /// Denominator of the fraction of active validators needed for consensus.
    pub consensus_threshold_den: u64,

    /// Blocks after consensus during which a late matching observation is forgiven.
    pub observation_delay_flexibility: u64,

    /// Points added per observation and refunded when the observation becomes canonical.
    pub observe_slash_points: u64,

    /// Points added for not observing a transaction that reached consensus.
    pub lack_of_observation_penalty: u64,

    /// Blocks a vault has to sign and broadcast an outbound.
    pub signing_transaction_period: u64,

    /// Points added to each owner of a vault that failed to sign in time.
    pub signing_slash_points: u64,

    /// Blocks a per-node vault owner is jailed for failing to sign.
    pub jail_time_signing: u64,

    /// Signing windows an outbound is retried for before it is abandoned; zero means forever.
    pub max_outbound_attempts: u64,

    /// Flat fee charged on every outbound, in the native asset.
    pub outbound_transaction_fee: Amount,

    /// Per-block outbound value above which payments get delayed; zero disables the delay.
    pub min_tx_out_volume_threshold: Amount,

    /// Queued outbound value released per block; zero disables the delay.
    pub tx_out_delay_rate: Amount,

    /// Future blocks inspected when computing the outbound delay.
    pub tx_out_delay_max: u64,

    /// Maximum number of blocks an outbound may be delayed by.
    pub max_tx_out_offset: u64,

    /// Multiplier on stolen value when slashing bonds, in basis points.
    pub slash_penalty_bps: u64,

    /// Slashed value at which the affected chain is halted; zero never halts.
    pub pause_on_slash_threshold: Amount,

    /// Age beyond which double-sign evidence is ignored.
    pub double_sign_max_age: u64,

    /// Fraction of the bond burned for double signing, in basis points.
    pub double_sign_slash_bps: u64,

    /// Blocks between slash point decays; zero disables decay.
    pub slash_point_decay_interval: u64,

    /// Points removed from each counter per decay.
    pub slash_point_decay: u64,

    /// Destinations that outbound payments are never sent to.
    pub outbound_blacklist: Vec<Address>,
}

impl Default for ProtocolParams {
    fn default() -> Self {
        Self {
            consensus_threshold_num: CONSENSUS_THRESHOLD_NUM,
            consensus_threshold_den: CONSENSUS_THRESHOLD_DEN,
            observation_delay_flexibility: OBSERVATION_DELAY_FLEXIBILITY,
            observe_slash_points: OBSERVE_SLASH_POINTS,
            lack_of_observation_penalty: LACK_OF_OBSERVATION_PENALTY,
            signing_transaction_period: SIGNING_TRANSACTION_PERIOD,
            signing_slash_points: SIGNING_SLASH_POINTS,
            jail_time_signing: JAIL_TIME_SIGNING,
            max_outbound_attempts: MAX_OUTBOUND_ATTEMPTS,
            outbound_transaction_fee: OUTBOUND_TRANSACTION_FEE,
            min_tx_out_volume_threshold: MIN_TX_OUT_VOLUME_THRESHOLD,
            tx_out_delay_rate: TX_OUT_DELAY_RATE,
            tx_out_delay_max: TX_OUT_DELAY_MAX,
            max_tx_out_offset: MAX_TX_OUT_OFFSET,
            slash_penalty_bps: SLASH_PENALTY_BPS,
            pause_on_slash_threshold: PAUSE_ON_SLASH_THRESHOLD,
            double_sign_max_age: DOUBLE_SIGN_MAX_AGE,
            double_sign_slash_bps: DOUBLE_SIGN_SLASH_BPS,
            slash_point_decay_interval: SLASH_POINT_DECAY_INTERVAL,
            slash_point_decay: SLASH_POINT_DECAY,
            outbound_blacklist: OUTBOUND_BLACKLIST.iter().copied().map(Address::from).collect(),
        }
    }
}

impl ProtocolParams {
    /// Parses the parameters from TOML and validates them.
    pub fn from_toml_str(s: &str) -> ParamsResult<Self> {
        let params: Self = toml::from_str(s)?;
        params.validate()?;

        Ok(params)
    }

    /// Loads the parameters from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> ParamsResult<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    /// Checks values that would make the protocol misbehave.
    pub fn validate(&self) -> ParamsResult<()> {
        if self.consensus_threshold_den == 0 {
            return Err(ParamsError::Invalid {
                key: ParamKey::ConsensusThresholdDen.name(),
                reason: "must be non-zero",
            });
        }
        if self.consensus_threshold_num == 0
            || self.consensus_threshold_num > self.consensus_threshold_den
        {
            return Err(ParamsError::Invalid {
                key: ParamKey::ConsensusThresholdNum.name(),
                reason: "must be within (0, denominator]",
            });
        }
        if self.signing_transaction_period == 0 {
            return Err(ParamsError::Invalid {
                key: ParamKey::SigningTransactionPeriod.name(),
                reason: "must be non-zero",
            });
        }

        Ok(())
    }

    /// Returns the current value of `key`.
    pub const fn value(&self, key: ParamKey) -> u64 {
        match key {
            ParamKey::ConsensusThresholdNum => self.consensus_threshold_num,
            ParamKey::ConsensusThresholdDen => self.consensus_threshold_den,
            ParamKey::ObservationDelayFlexibility => self.observation_delay_flexibility,
            ParamKey::ObserveSlashPoints => self.observe_slash_points,
            ParamKey::LackOfObservationPenalty => self.lack_of_observation_penalty,
            ParamKey::SigningTransactionPeriod => self.signing_transaction_period,
            ParamKey::SigningSlashPoints => self.signing_slash_points,
            ParamKey::JailTimeSigning => self.jail_time_signing,
            ParamKey::MaxOutboundAttempts => self.max_outbound_attempts,
            ParamKey::OutboundTransactionFee => self.outbound_transaction_fee,
            ParamKey::MinTxOutVolumeThreshold => self.min_tx_out_volume_threshold,
            ParamKey::TxOutDelayRate => self.tx_out_delay_rate,
            ParamKey::TxOutDelayMax => self.tx_out_delay_max,
            ParamKey::MaxTxOutOffset => self.max_tx_out_offset,
            ParamKey::SlashPenalty => self.slash_penalty_bps,
            ParamKey::PauseOnSlashThreshold => self.pause_on_slash_threshold,
            ParamKey::DoubleSignMaxAge => self.double_sign_max_age,
            ParamKey::DoubleSignSlash => self.double_sign_slash_bps,
            ParamKey::SlashPointDecayInterval => self.slash_point_decay_interval,
            ParamKey::SlashPointDecay => self.slash_point_decay,
        }
    }

    fn set(&mut self, key: ParamKey, value: u64) {
        let field = match key {
            ParamKey::ConsensusThresholdNum => &mut self.consensus_threshold_num,
            ParamKey::ConsensusThresholdDen => &mut self.consensus_threshold_den,
            ParamKey::ObservationDelayFlexibility => &mut self.observation_delay_flexibility,
            ParamKey::ObserveSlashPoints => &mut self.observe_slash_points,
            ParamKey::LackOfObservationPenalty => &mut self.lack_of_observation_penalty,
            ParamKey::SigningTransactionPeriod => &mut self.signing_transaction_period,
            ParamKey::SigningSlashPoints => &mut self.signing_slash_points,
            ParamKey::JailTimeSigning => &mut self.jail_time_signing,
            ParamKey::MaxOutboundAttempts => &mut self.max_outbound_attempts,
            ParamKey::OutboundTransactionFee => &mut self.outbound_transaction_fee,
            ParamKey::MinTxOutVolumeThreshold => &mut self.min_tx_out_volume_threshold,
            ParamKey::TxOutDelayRate => &mut self.tx_out_delay_rate,
            ParamKey::TxOutDelayMax => &mut self.tx_out_delay_max,
            ParamKey::MaxTxOutOffset => &mut self.max_tx_out_offset,
            ParamKey::SlashPenalty => &mut self.slash_penalty_bps,
            ParamKey::PauseOnSlashThreshold => &mut self.pause_on_slash_threshold,
            ParamKey::DoubleSignMaxAge => &mut self.double_sign_max_age,
            ParamKey::DoubleSignSlash => &mut self.double_sign_slash_bps,
            ParamKey::SlashPointDecayInterval => &mut self.slash_point_decay_interval,
            ParamKey::SlashPointDecay => &mut self.slash_point_decay,
        };
        *field = value;
    }

    /// Returns a copy with every valid override from `source` applied.
    ///
    /// If the overrides leave the parameters invalid as a whole, the defaults in `self` are kept.
    pub fn resolve(&self, source: &dyn GovernanceSource) -> Self {
        let mut resolved = self.clone();
        for key in ParamKey::ALL {
            let Some(raw) = source.get(key) else {
                continue;
            };

            match key.validate(raw) {
                Some(value) => resolved.set(key, value),
                None => debug!(%key, %raw, "ignoring invalid governance override"),
            }
        }

        if let Err(e) = resolved.validate() {
            debug!(%e, "governance overrides produce invalid params, keeping defaults");
            return self.clone();
        }

        resolved
    }

    /// Number of signers needed for consensus among `active` validators.
    pub const fn consensus_threshold(&self, active: usize) -> usize {
        supermajority_threshold(
            active,
            self.consensus_threshold_num,
            self.consensus_threshold_den,
        )
    }

    /// Returns whether outbound payments to `address` are refused.
    pub fn is_blacklisted(&self, address: &Address) -> bool {
        self.outbound_blacklist.contains(address)
    }
}
