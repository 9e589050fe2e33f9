//! Default values for the protocol parameters.

use custody_primitives::types::{Amount, ONE};

/// Default numerator of the consensus threshold.
pub(crate) const CONSENSUS_THRESHOLD_NUM: u64 = 2;

/// Default denominator of the consensus threshold.
pub(crate) const CONSENSUS_THRESHOLD_DEN: u64 = 3;

/// Default number of blocks after consensus during which a late but matching observation still
/// earns its observation points back.
pub(crate) const OBSERVATION_DELAY_FLEXIBILITY: u64 = 10;

/// Default points added for every observation, refunded once the observation turns out to be
/// canonical.
pub(crate) const OBSERVE_SLASH_POINTS: u64 = 1;

/// Default points added to an active validator that did not observe a transaction that reached
/// consensus.
pub(crate) const LACK_OF_OBSERVATION_PENALTY: u64 = 2;

/// Default number of blocks a vault has to sign and broadcast an outbound.
pub(crate) const SIGNING_TRANSACTION_PERIOD: u64 = 300;

/// Default points added to each owner of a vault that failed to sign in time.
pub(crate) const SIGNING_SLASH_POINTS: u64 = SIGNING_TRANSACTION_PERIOD * 2;

/// Default number of blocks a per-node vault owner is jailed for failing to sign.
pub(crate) const JAIL_TIME_SIGNING: u64 = SIGNING_TRANSACTION_PERIOD * 2;

/// Default number of signing windows an outbound may be retried for; zero retries forever.
pub(crate) const MAX_OUTBOUND_ATTEMPTS: u64 = 0;

/// Default flat fee charged on every outbound, in the native asset.
pub(crate) const OUTBOUND_TRANSACTION_FEE: Amount = 2_000_000;

/// Default per-block value above which outbound payments get delayed, in the native asset.
pub(crate) const MIN_TX_OUT_VOLUME_THRESHOLD: Amount = 1_000 * ONE;

/// Default release rate of queued outbound value per block, in the native asset.
pub(crate) const TX_OUT_DELAY_RATE: Amount = 25 * ONE;

/// Default number of future blocks inspected when computing the outbound delay.
pub(crate) const TX_OUT_DELAY_MAX: u64 = 17_280;

/// Default maximum number of blocks an outbound may be delayed by.
pub(crate) const MAX_TX_OUT_OFFSET: u64 = 720;

/// Default multiplier applied to the value of stolen funds when slashing bonds, in basis points.
pub(crate) const SLASH_PENALTY_BPS: u64 = 10_000;

/// Default slashed value at which the affected chain is halted, in the native asset.
pub(crate) const PAUSE_ON_SLASH_THRESHOLD: Amount = 100 * ONE;

/// Default age in blocks beyond which double-sign evidence is ignored.
pub(crate) const DOUBLE_SIGN_MAX_AGE: u64 = 24;

/// Default fraction of the bond burned for double signing, in basis points.
pub(crate) const DOUBLE_SIGN_SLASH_BPS: u64 = 500;

/// Default number of blocks between two slash point decays; zero disables decay.
pub(crate) const SLASH_POINT_DECAY_INTERVAL: u64 = 720;

/// Default points removed from each counter on every decay.
pub(crate) const SLASH_POINT_DECAY: u64 = 1;

/// Default outbound destinations that cannot process outbound memos.
pub(crate) const OUTBOUND_BLACKLIST: &[&str] = &["bnb136ns6lfw4zs5hg4n85vdthaad7hq5m4gtkgf23"];
