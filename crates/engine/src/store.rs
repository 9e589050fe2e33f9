//! The rows the engine keeps in its [`KvStore`] and typed accessors for them.

use custody_db::{
    errors::DbResult,
    kv::KvStore,
    row_spec::{encode_height, RowSpec, TypedStore},
};
use custody_primitives::{
    asset::Asset,
    chain::Chain,
    ids::{NodeAddress, PubKey, TxId},
    network_fee::NetworkFee,
    pool::Pool,
    txout::TxOut,
    types::{Amount, BlockHeight},
    validator::Validator,
    vault::Vault,
};

use crate::{errata::ErrataVoter, voter::machine::ObservationVoter};

macro_rules! row {
    ($(#[$meta:meta])* $name:ident, $prefix:literal, $key:ty => $value:ty, |$k:ident| $encode:expr) => {
        $(#[$meta])*
        #[derive(Debug)]
        pub struct $name;

        impl RowSpec for $name {
            const PREFIX: &'static [u8] = $prefix;
            type Key = $key;
            type Value = $value;

            fn encode_key($k: &Self::Key) -> Vec<u8> {
                $encode
            }
        }
    };
}

row!(
    /// Validators by node address.
    ValidatorRow, b"validator", NodeAddress => Validator, |key| key.as_ref().to_vec()
);

row!(
    /// Node addresses by validator public key.
    ValidatorByPubKeyRow, b"validator_pk", PubKey => NodeAddress, |key| key.as_ref().to_vec()
);

row!(
    /// Vaults by public key.
    VaultRow, b"vault", PubKey => Vault, |key| key.as_ref().to_vec()
);

row!(
    /// Voters of inbound observations by transaction id.
    VoterRow, b"voter", TxId => ObservationVoter, |key| key.as_ref().to_vec()
);

row!(
    /// Voters of outbound observations by transaction id.
    OutboundVoterRow, b"voter_out", TxId => ObservationVoter, |key| key.as_ref().to_vec()
);

row!(
    /// Errata voters by transaction id.
    ErrataVoterRow, b"errata", TxId => ErrataVoter, |key| key.as_ref().to_vec()
);

row!(
    /// Outbound queues by height.
    TxOutRow, b"txout", BlockHeight => TxOut, |key| encode_height(*key)
);

row!(
    /// Transactions that reached consensus, by consensus height.
    ConsensusIndexRow, b"consensus_idx", (BlockHeight, TxId) => TxId, |key| {
        let mut encoded = encode_height(key.0);
        encoded.extend_from_slice(key.1.as_ref());
        encoded
    }
);

row!(
    /// Inbound transactions in consensus that wait for their chain's depth, by chain.
    PendingFinalisationRow, b"pending_final", (Chain, TxId) => TxId, |key| {
        let mut encoded = chain_prefix(key.0);
        encoded.extend_from_slice(key.1.as_ref());
        encoded
    }
);

row!(
    /// Network fees by chain.
    NetworkFeeRow, b"network_fee", Chain => NetworkFee, |key| key.ticker().as_bytes().to_vec()
);

row!(
    /// Pools by asset.
    PoolRow, b"pool", Asset => Pool, |key| key.to_string().into_bytes()
);

row!(
    /// The native balance of the protocol reserve.
    ReserveRow, b"reserve", () => Amount, |_key| Vec::new()
);

row!(
    /// Heights at which chains were halted.
    ChainHaltRow, b"halt", Chain => BlockHeight, |key| key.ticker().as_bytes().to_vec()
);

row!(
    /// Last observed height of each external chain.
    LastChainHeightRow, b"chain_height", Chain => BlockHeight, |key| key.ticker().as_bytes().to_vec()
);

fn chain_prefix(chain: Chain) -> Vec<u8> {
    let mut prefix = chain.ticker().as_bytes().to_vec();
    prefix.push(b'/');
    prefix
}

/// Typed access to the engine's rows on any [`KvStore`].
pub trait CustodyStore: KvStore {
    /// Gets a validator.
    fn validator(&self, address: &NodeAddress) -> DbResult<Option<Validator>> {
        self.get_row::<ValidatorRow>(address)
    }

    /// Gets a validator by its public key.
    fn validator_by_pub_key(&self, pub_key: &PubKey) -> DbResult<Option<Validator>> {
        match self.get_row::<ValidatorByPubKeyRow>(pub_key)? {
            Some(address) => self.validator(&address),
            None => Ok(None),
        }
    }

    /// Stores a validator and indexes its public key.
    fn put_validator(&mut self, validator: &Validator) -> DbResult<()> {
        self.put_row::<ValidatorRow>(&validator.address, validator)?;
        self.put_row::<ValidatorByPubKeyRow>(&validator.pub_key, &validator.address)
    }

    /// Every validator, by node address.
    fn validators(&self) -> DbResult<Vec<Validator>> {
        self.scan_rows::<ValidatorRow>()
    }

    /// Every active validator, by node address.
    fn active_validators(&self) -> DbResult<Vec<Validator>> {
        Ok(self
            .validators()?
            .into_iter()
            .filter(Validator::is_active)
            .collect())
    }

    /// Gets a vault.
    fn vault(&self, pub_key: &PubKey) -> DbResult<Option<Vault>> {
        self.get_row::<VaultRow>(pub_key)
    }

    /// Stores a vault.
    fn put_vault(&mut self, vault: &Vault) -> DbResult<()> {
        self.put_row::<VaultRow>(&vault.pub_key, vault)
    }

    /// Every vault, by public key.
    fn vaults(&self) -> DbResult<Vec<Vault>> {
        self.scan_rows::<VaultRow>()
    }

    /// Gets the voter of an inbound observation.
    fn voter(&self, tx_id: &TxId) -> DbResult<Option<ObservationVoter>> {
        self.get_row::<VoterRow>(tx_id)
    }

    /// Stores the voter of an inbound observation.
    fn put_voter(&mut self, voter: &ObservationVoter) -> DbResult<()> {
        self.put_row::<VoterRow>(voter.tx_id(), voter)
    }

    /// Gets the voter of an outbound observation.
    fn outbound_voter(&self, tx_id: &TxId) -> DbResult<Option<ObservationVoter>> {
        self.get_row::<OutboundVoterRow>(tx_id)
    }

    /// Stores the voter of an outbound observation.
    fn put_outbound_voter(&mut self, voter: &ObservationVoter) -> DbResult<()> {
        self.put_row::<OutboundVoterRow>(voter.tx_id(), voter)
    }

    /// Gets an errata voter.
    fn errata_voter(&self, tx_id: &TxId) -> DbResult<Option<ErrataVoter>> {
        self.get_row::<ErrataVoterRow>(tx_id)
    }

    /// Stores an errata voter.
    fn put_errata_voter(&mut self, voter: &ErrataVoter) -> DbResult<()> {
        self.put_row::<ErrataVoterRow>(voter.tx_id(), voter)
    }

    /// The outbound queue at `height`, empty if nothing is scheduled.
    fn txout(&self, height: BlockHeight) -> DbResult<TxOut> {
        Ok(self
            .get_row::<TxOutRow>(&height)?
            .unwrap_or_else(|| TxOut::new(height)))
    }

    /// Stores an outbound queue.
    fn put_txout(&mut self, txout: &TxOut) -> DbResult<()> {
        self.put_row::<TxOutRow>(&txout.height, txout)
    }

    /// Non-empty outbound queues in `from..=to`, by height.
    fn scheduled_between(&self, from: BlockHeight, to: BlockHeight) -> DbResult<Vec<TxOut>> {
        if from > to {
            return Ok(Vec::new());
        }

        self.scan_rows_between::<TxOutRow>(&from, &to)
    }

    /// Records that `tx_id` reached consensus at `height`.
    fn index_consensus(&mut self, height: BlockHeight, tx_id: &TxId) -> DbResult<()> {
        self.put_row::<ConsensusIndexRow>(&(height, tx_id.clone()), tx_id)
    }

    /// Transactions that reached consensus at `height`.
    fn consensus_at(&self, height: BlockHeight) -> DbResult<Vec<TxId>> {
        self.scan_rows_with_prefix::<ConsensusIndexRow>(&encode_height(height))
    }

    /// Records that `tx_id` waits for the depth of `chain`.
    fn add_pending_finalisation(&mut self, chain: Chain, tx_id: &TxId) -> DbResult<()> {
        self.put_row::<PendingFinalisationRow>(&(chain, tx_id.clone()), tx_id)
    }

    /// Clears the wait of `tx_id`.
    fn remove_pending_finalisation(&mut self, chain: Chain, tx_id: &TxId) -> DbResult<()> {
        self.delete_row::<PendingFinalisationRow>(&(chain, tx_id.clone()))
    }

    /// Transactions waiting for the depth of `chain`.
    fn pending_finalisation(&self, chain: Chain) -> DbResult<Vec<TxId>> {
        self.scan_rows_with_prefix::<PendingFinalisationRow>(&chain_prefix(chain))
    }

    /// Gets the network fee of `chain`.
    fn network_fee(&self, chain: Chain) -> DbResult<Option<NetworkFee>> {
        self.get_row::<NetworkFeeRow>(&chain)
    }

    /// Stores a network fee.
    fn put_network_fee(&mut self, fee: &NetworkFee) -> DbResult<()> {
        self.put_row::<NetworkFeeRow>(&fee.chain, fee)
    }

    /// Gets the pool of `asset`.
    fn pool(&self, asset: &Asset) -> DbResult<Option<Pool>> {
        self.get_row::<PoolRow>(asset)
    }

    /// Stores a pool.
    fn put_pool(&mut self, pool: &Pool) -> DbResult<()> {
        self.put_row::<PoolRow>(&pool.asset, pool)
    }

    /// The reserve balance.
    fn reserve(&self) -> DbResult<Amount> {
        Ok(self.get_row::<ReserveRow>(&())?.unwrap_or_default())
    }

    /// Adds `amount` to the reserve.
    fn credit_reserve(&mut self, amount: Amount) -> DbResult<()> {
        if amount == 0 {
            return Ok(());
        }

        let balance = self.reserve()?.saturating_add(amount);
        self.put_row::<ReserveRow>(&(), &balance)
    }

    /// Height at which `chain` was halted, if it is.
    fn chain_halt(&self, chain: Chain) -> DbResult<Option<BlockHeight>> {
        self.get_row::<ChainHaltRow>(&chain)
    }

    /// Halts `chain` at `height`. An existing halt keeps its height.
    fn halt_chain(&mut self, chain: Chain, height: BlockHeight) -> DbResult<()> {
        if self.chain_halt(chain)?.is_some() {
            return Ok(());
        }

        self.put_row::<ChainHaltRow>(&chain, &height)
    }

    /// Last observed height of `chain`; zero if never observed.
    fn last_chain_height(&self, chain: Chain) -> DbResult<BlockHeight> {
        Ok(self
            .get_row::<LastChainHeightRow>(&chain)?
            .unwrap_or_default())
    }

    /// Stores the last observed height of `chain`.
    fn put_last_chain_height(&mut self, chain: Chain, height: BlockHeight) -> DbResult<()> {
        self.put_row::<LastChainHeightRow>(&chain, &height)
    }
}

impl<T: KvStore + ?Sized> CustodyStore for T {}
