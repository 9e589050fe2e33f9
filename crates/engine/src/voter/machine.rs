//! The Observation Voter.
//!
//! One voter exists per external transaction id and direction. It collects the copies submitted
//! by validators, decides when a copy has reached consensus and when it is final, and keeps the
//! cross-references to the outbound payments produced for it.

use std::collections::BTreeSet;

use custody_primitives::{
    ids::{NodeAddress, TxId},
    tx::ObservedTx,
    txout::TxOutItem,
    types::BlockHeight,
};
use serde::{Deserialize, Serialize};

use crate::{
    state_machine::{SMOutput, StateMachine},
    voter::{
        config::VoterCfg,
        duties::VoterDuty,
        errors::VoterError,
        events::VoterEvent,
        state::{ObservationBucket, OutboundAction, VaultCredit, VoterState},
    },
};

/// The output of the Observation Voter after processing an event.
pub type VoterOutput = SMOutput<VoterDuty>;

/// The record kept for one observed external transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObservationVoter {
    tx_id: TxId,
    pub(super) state: VoterState,
    pub(super) buckets: Vec<ObservationBucket>,
    pub(super) canonical: Option<ObservedTx>,
    pub(super) credit: Option<VaultCredit>,
    actions: Vec<OutboundAction>,
    pub(super) out_txs: Vec<TxId>,
    outbound_height: Option<BlockHeight>,
}

impl StateMachine for ObservationVoter {
    type Config = VoterCfg;
    type Duty = VoterDuty;
    type Event = VoterEvent;
    type Error = VoterError;

    fn process_event(
        &mut self,
        cfg: &Self::Config,
        event: Self::Event,
    ) -> Result<VoterOutput, Self::Error> {
        match event {
            VoterEvent::Observe { signer, copy } => self.process_observe(cfg, signer, copy),
            VoterEvent::ChainHeight { height } => self.process_chain_height(cfg, height),
            VoterEvent::RecordCredit { credit } => self.process_record_credit(credit),
            VoterEvent::OutboundObserved { out_hash } => self.process_outbound_observed(out_hash),
            VoterEvent::Revert => self.process_revert(cfg),
            VoterEvent::MarkDone => self.process_mark_done(),
        }
    }
}

impl ObservationVoter {
    /// Creates an empty voter for `tx_id`.
    pub const fn new(tx_id: TxId) -> Self {
        Self {
            tx_id,
            state: VoterState::Pending,
            buckets: Vec::new(),
            canonical: None,
            credit: None,
            actions: Vec::new(),
            out_txs: Vec::new(),
            outbound_height: None,
        }
    }

    /// The id of the observed transaction.
    pub const fn tx_id(&self) -> &TxId {
        &self.tx_id
    }

    /// The current state.
    pub const fn state(&self) -> &VoterState {
        &self.state
    }

    /// The distinct copies submitted so far, in submission order.
    pub fn buckets(&self) -> &[ObservationBucket] {
        &self.buckets
    }

    /// The copy that reached consensus, replaced by the final copy once one is agreed on.
    pub const fn canonical(&self) -> Option<&ObservedTx> {
        self.canonical.as_ref()
    }

    /// The credit applied on consensus, if any.
    pub const fn credit(&self) -> Option<&VaultCredit> {
        self.credit.as_ref()
    }

    /// Outbound payments produced for this transaction.
    pub fn actions(&self) -> &[OutboundAction] {
        &self.actions
    }

    /// Outbound transactions observed for this transaction.
    pub fn out_txs(&self) -> &[TxId] {
        &self.out_txs
    }

    /// The height all outbound payments of this transaction are scheduled at, once chosen.
    pub const fn outbound_height(&self) -> Option<BlockHeight> {
        self.outbound_height
    }

    /// Returns whether `signer` already submitted exactly `copy`.
    pub fn has_signed(&self, signer: &NodeAddress, copy: &ObservedTx) -> bool {
        self.buckets
            .iter()
            .any(|b| b.tx == *copy && b.signers.contains(signer))
    }

    /// Returns whether `signer` already submitted a copy whose content differs from `copy`.
    pub fn conflicts_with(&self, signer: &NodeAddress, copy: &ObservedTx) -> bool {
        self.buckets
            .iter()
            .any(|b| b.signers.contains(signer) && !b.tx.same_content(copy))
    }

    /// Returns whether `signer` appears in any bucket.
    pub fn is_signer(&self, signer: &NodeAddress) -> bool {
        self.buckets.iter().any(|b| b.signers.contains(signer))
    }

    /// Signers of every copy with the same content as the canonical one.
    pub fn canonical_signers(&self) -> BTreeSet<NodeAddress> {
        let Some(canonical) = &self.canonical else {
            return BTreeSet::new();
        };

        self.buckets
            .iter()
            .filter(|b| b.tx.same_content(canonical))
            .flat_map(|b| b.signers.iter().cloned())
            .collect()
    }

    /// Returns whether every recorded outbound action has been observed.
    pub fn all_actions_observed(&self) -> bool {
        self.actions.len() <= self.out_txs.len()
    }

    /// Records an outbound payment produced for this transaction.
    pub(crate) fn record_action(&mut self, action: OutboundAction) {
        self.actions.push(action);
    }

    /// Replaces the action for the same payment as `old` with `new`.
    ///
    /// Returns whether a matching action was found.
    pub(crate) fn replace_action(&mut self, old: &OutboundAction, new: OutboundAction) -> bool {
        match self
            .actions
            .iter_mut()
            .find(|a| a.height == old.height && a.item.same_action(&old.item))
        {
            Some(action) => {
                *action = new;
                true
            }
            None => false,
        }
    }

    /// Updates the item of the action for the same payment as `item` at `height`.
    pub(crate) fn update_action_item(
        &mut self,
        height: BlockHeight,
        item: &TxOutItem,
    ) {
        if let Some(action) = self
            .actions
            .iter_mut()
            .find(|a| a.height == height && a.item.same_action(item))
        {
            action.item = item.clone();
        }
    }

    /// Returns the pinned outbound height, pinning `height` if none was chosen yet.
    pub(crate) fn pin_outbound_height(&mut self, height: BlockHeight) -> BlockHeight {
        *self.outbound_height.get_or_insert(height)
    }

    /// Adds `signer` to the bucket of `copy`, creating the bucket if needed.
    pub(super) fn record_signer(&mut self, signer: NodeAddress, copy: ObservedTx) {
        match self.buckets.iter_mut().find(|b| b.tx == copy) {
            Some(bucket) => {
                bucket.signers.insert(signer);
            }
            None => self.buckets.push(ObservationBucket {
                tx: copy,
                signers: BTreeSet::from([signer]),
            }),
        }
    }

    /// Finds a copy with the given finality whose content is backed by a consensus of active
    /// signers.
    ///
    /// Copies that differ only in their finalise height count toward each other. Returns the
    /// first such copy in submission order together with all signers of that content.
    pub(super) fn consensus_copy(
        &self,
        cfg: &VoterCfg,
        is_final: bool,
    ) -> Option<(ObservedTx, BTreeSet<NodeAddress>)> {
        self.buckets
            .iter()
            .filter(|b| b.tx.is_final() == is_final)
            .find_map(|candidate| {
                let group = self
                    .buckets
                    .iter()
                    .filter(|b| b.tx.is_final() == is_final && b.tx.same_content(&candidate.tx));

                let signers: BTreeSet<NodeAddress> =
                    group.flat_map(|b| b.signers.iter().cloned()).collect();
                let active = signers
                    .iter()
                    .filter(|s| cfg.active_signers.contains(*s))
                    .count();

                cfg.is_consensus(active)
                    .then(|| (candidate.tx.clone(), signers))
            })
    }

    /// Returns whether the external chain is deep enough past the canonical copy for it to be
    /// final.
    pub(super) fn depth_reached(&self, chain_height: BlockHeight) -> bool {
        let Some(tx) = &self.canonical else {
            return false;
        };
        if chain_height == 0 {
            return false;
        }

        let confirmations = tx.tx.chain.required_confirmations(tx.tx.gas_asset_value());
        chain_height >= tx.block_height.saturating_add(confirmations)
    }

    #[cfg(test)]
    pub(crate) fn with_state(tx_id: TxId, state: VoterState) -> Self {
        Self {
            state,
            ..Self::new(tx_id)
        }
    }
}
