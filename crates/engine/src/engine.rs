//! The facade embedders drive the custody core through.

use std::fmt;

use custody_db::{kv::KvStore, txn::StoreTxn};
use custody_params::prelude::{GovernanceSource, NoOverrides, ProtocolParams};
use custody_primitives::{
    asset::Coin,
    chain::Chain,
    ids::{NodeAddress, PubKey, TxId},
    memo::{MemoParser, StandardMemoParser},
    network_fee::NetworkFee,
    pool::Pool,
    tx::ObservedTx,
    txout::{TxOut, TxOutItem},
    types::{Amount, BlockHeight},
    validator::{SlashPoints, Validator},
    vault::{Vault, VaultStatus},
};
use tracing::{debug, warn};

use crate::{
    context::CustodyCtx,
    errors::{EngineError, EngineResult},
    events::CustodyEvent,
    handler::{InboundHandler, NoopHandler},
    ledger::SubmitOutcome,
    scheduler::ScheduledOutbound,
    slasher::{double_sign::DoubleSignEvidence, vault::VaultSlash},
    store::CustodyStore,
    voter::state::VoterState,
};

/// The custody core over a store.
///
/// Every write runs in its own store transaction. It is committed only if the operation
/// succeeds, and only then are the operation's audit events kept for [`Engine::drain_events`].
pub struct Engine<S: KvStore> {
    store: S,
    base_params: ProtocolParams,
    params: ProtocolParams,
    governance: Box<dyn GovernanceSource>,
    memo_parser: Box<dyn MemoParser>,
    handler: Box<dyn InboundHandler>,
    events: Vec<CustodyEvent>,
    height: BlockHeight,
}

impl<S: KvStore> fmt::Debug for Engine<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Engine")
            .field("height", &self.height)
            .field("params", &self.params)
            .field("events", &self.events.len())
            .finish_non_exhaustive()
    }
}

impl<S: KvStore> Engine<S> {
    /// Creates an engine with no governance overrides, the standard memo grammar and a handler
    /// that ignores finalised inbounds.
    pub fn new(store: S, params: ProtocolParams) -> Self {
        Self {
            store,
            params: params.clone(),
            base_params: params,
            governance: Box::new(NoOverrides),
            memo_parser: Box::new(StandardMemoParser),
            handler: Box::new(NoopHandler),
            events: Vec::new(),
            height: 0,
        }
    }

    /// Resolves parameters against `governance` overrides.
    pub fn with_governance(mut self, governance: Box<dyn GovernanceSource>) -> Self {
        self.governance = governance;
        self.params = self.base_params.resolve(self.governance.as_ref());
        self
    }

    /// Uses `memo_parser` to interpret memos.
    pub fn with_memo_parser(mut self, memo_parser: Box<dyn MemoParser>) -> Self {
        self.memo_parser = memo_parser;
        self
    }

    /// Hands finalised inbounds to `handler`.
    pub fn with_handler(mut self, handler: Box<dyn InboundHandler>) -> Self {
        self.handler = handler;
        self
    }

    /// The current native height.
    pub const fn height(&self) -> BlockHeight {
        self.height
    }

    /// The parameters in effect for the current block.
    pub const fn params(&self) -> &ProtocolParams {
        &self.params
    }

    /// The underlying store.
    pub const fn store(&self) -> &S {
        &self.store
    }

    /// Starts native block `height` and resolves the parameters for it.
    pub fn begin_block(&mut self, height: BlockHeight) {
        self.height = height;
        self.params = self.base_params.resolve(self.governance.as_ref());
        debug!(%height, "began block");
    }

    /// Runs the end-of-block checks: observation and signing deadlines, gas re-pricing and slash
    /// point decay.
    pub fn end_block(&mut self) -> EngineResult<()> {
        self.run(|ctx, _| {
            let flexibility = ctx.params().observation_delay_flexibility;
            let signing_period = ctx.params().signing_transaction_period;

            ctx.penalize_lack_of_observation(flexibility)?;
            ctx.penalize_lack_of_signing(signing_period)?;
            ctx.reprice_current_queue()?;
            ctx.decay_slash_points()
        })
    }

    /// Records `signer`'s copy of an inbound transaction.
    pub fn submit_observation(
        &mut self,
        signer: &NodeAddress,
        copy: ObservedTx,
    ) -> EngineResult<SubmitOutcome> {
        self.run(|ctx, handler| ctx.submit_observation(signer, copy, handler))
    }

    /// Records a batch of observations. Each one is applied on its own; a failing entry is logged
    /// and does not affect the others.
    pub fn submit_observations(
        &mut self,
        batch: Vec<(NodeAddress, ObservedTx)>,
    ) -> Vec<EngineResult<SubmitOutcome>> {
        batch
            .into_iter()
            .map(|(signer, copy)| {
                let tx_id = copy.tx.id.clone();
                let res = self.submit_observation(&signer, copy);
                if let Err(e) = &res {
                    warn!(%signer, %tx_id, %e, "observation in batch failed");
                }
                res
            })
            .collect()
    }

    /// Records `signer`'s copy of a transaction leaving a vault.
    pub fn submit_outbound_observation(
        &mut self,
        signer: &NodeAddress,
        copy: ObservedTx,
    ) -> EngineResult<SubmitOutcome> {
        self.run(|ctx, handler| ctx.submit_outbound_observation(signer, copy, handler))
    }

    /// Records `signer`'s vote that `tx_id` was dropped by its chain.
    pub fn submit_errata(
        &mut self,
        signer: &NodeAddress,
        tx_id: &TxId,
    ) -> EngineResult<SubmitOutcome> {
        self.run(|ctx, handler| ctx.submit_errata(signer, tx_id, handler))
    }

    /// Records the last observed height of `chain`.
    pub fn observe_chain_height(&mut self, chain: Chain, height: BlockHeight) -> EngineResult<()> {
        self.run(|ctx, handler| ctx.observe_chain_height(chain, height, handler))
    }

    /// Schedules an outbound payment.
    pub fn schedule(&mut self, item: TxOutItem, min_out: Amount) -> EngineResult<ScheduledOutbound> {
        self.run(|ctx, _| ctx.schedule(item, min_out))
    }

    /// Appends an outbound at the current height without selection, fees or delay.
    pub fn unsafe_schedule(&mut self, item: TxOutItem) -> EngineResult<BlockHeight> {
        self.run(|ctx, _| ctx.unsafe_schedule(item))
    }

    /// Burns bond of a validator that signed conflicting blocks.
    pub fn handle_double_sign(&mut self, evidence: &DoubleSignEvidence) -> EngineResult<Amount> {
        self.run(|ctx, _| ctx.handle_double_sign(evidence))
    }

    /// Slashes the members of `vault` for `coins` it lost.
    pub fn slash_vault(&mut self, vault: &PubKey, coins: &[Coin]) -> EngineResult<VaultSlash> {
        self.run(|ctx, _| ctx.slash_vault(vault, coins))
    }

    /// Adds or replaces a validator.
    pub fn upsert_validator(&mut self, validator: &Validator) -> EngineResult<()> {
        self.run(|ctx, _| Ok(ctx.store_mut().put_validator(validator)?))
    }

    /// Adds a new vault.
    pub fn insert_vault(&mut self, vault: &Vault) -> EngineResult<()> {
        self.run(|ctx, _| {
            if ctx.store().vault(&vault.pub_key)?.is_some() {
                return Err(EngineError::InvalidInput(format!(
                    "vault {} already exists",
                    vault.pub_key
                )));
            }

            Ok(ctx.store_mut().put_vault(vault)?)
        })
    }

    /// Moves a vault forward in its lifecycle.
    pub fn set_vault_status(&mut self, vault: &PubKey, status: VaultStatus) -> EngineResult<()> {
        self.run(|ctx, _| ctx.set_vault_status(vault, status))
    }

    /// Stores the balances of a pool.
    pub fn set_pool(&mut self, pool: &Pool) -> EngineResult<()> {
        self.run(|ctx, _| Ok(ctx.store_mut().put_pool(pool)?))
    }

    /// Stores the latest network fee of a chain.
    pub fn set_network_fee(&mut self, fee: &NetworkFee) -> EngineResult<()> {
        if !fee.is_valid() {
            return Err(EngineError::InvalidInput(format!(
                "invalid network fee for {}",
                fee.chain
            )));
        }

        self.run(|ctx, _| Ok(ctx.store_mut().put_network_fee(fee)?))
    }

    /// The state of the inbound voter of `tx_id`.
    pub fn observation_state(&self, tx_id: &TxId) -> EngineResult<Option<VoterState>> {
        Ok(self.store.voter(tx_id)?.map(|v| v.state().clone()))
    }

    /// A vault.
    pub fn vault(&self, pub_key: &PubKey) -> EngineResult<Option<Vault>> {
        Ok(self.store.vault(pub_key)?)
    }

    /// The outbound queue of `height`.
    pub fn scheduled_outbound(&self, height: BlockHeight) -> EngineResult<TxOut> {
        Ok(self.store.txout(height)?)
    }

    /// A validator's slash point counters.
    pub fn validator_slash_points(&self, node: &NodeAddress) -> EngineResult<Option<SlashPoints>> {
        Ok(self.store.validator(node)?.map(|v| v.slash_points))
    }

    /// The reserve balance.
    pub fn reserve(&self) -> EngineResult<Amount> {
        Ok(self.store.reserve()?)
    }

    /// Height at which `chain` was halted, if it is.
    pub fn chain_halt(&self, chain: Chain) -> EngineResult<Option<BlockHeight>> {
        Ok(self.store.chain_halt(chain)?)
    }

    /// Takes the audit events of every committed operation since the last call.
    pub fn drain_events(&mut self) -> Vec<CustodyEvent> {
        std::mem::take(&mut self.events)
    }

    fn run<T>(
        &mut self,
        f: impl FnOnce(&mut CustodyCtx<'_>, &dyn InboundHandler) -> EngineResult<T>,
    ) -> EngineResult<T> {
        let mut events = Vec::new();
        let mut txn = StoreTxn::new(&mut self.store);

        let res = {
            let mut ctx = CustodyCtx::new(
                self.height,
                &mut txn,
                &self.params,
                self.memo_parser.as_ref(),
                &mut events,
            );
            f(&mut ctx, self.handler.as_ref())
        };

        let out = res?;
        txn.commit()?;
        self.events.extend(events);

        Ok(out)
    }
}
