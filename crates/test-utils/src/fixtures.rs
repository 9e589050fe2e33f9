//! Deterministic fixtures for validators, vaults and observations.

use custody_primitives::{
    asset::Coin,
    chain::Chain,
    ids::{Address, NodeAddress, PubKey, TxId},
    tx::{ObservedTx, Tx},
    types::{Amount, BlockHeight, ONE},
    validator::{NodeStatus, Validator},
    vault::{Vault, VaultStatus, VaultType},
};

/// Bond given to fixture validators.
pub const TEST_BOND: Amount = 1_000_000 * ONE;

/// Node address of the `idx`-th fixture validator.
pub fn node_address(idx: usize) -> NodeAddress {
    NodeAddress::new(format!("thor1node{idx:02}"))
}

/// Public key of the `idx`-th fixture validator.
pub fn node_pub_key(idx: usize) -> PubKey {
    PubKey::new(format!("thorpub-node{idx:02}"))
}

/// An active validator with [`TEST_BOND`] that became active at height 1.
pub fn active_validator(idx: usize) -> Validator {
    let mut validator = Validator::new(node_address(idx), node_pub_key(idx), TEST_BOND);
    validator.status = NodeStatus::Active;
    validator.active_since = 1;
    validator
}

/// `n` active validators.
pub fn active_validators(n: usize) -> Vec<Validator> {
    (0..n).map(active_validator).collect()
}

/// Address of the vault `name` on `chain`.
pub fn vault_address(name: &str, chain: Chain) -> Address {
    Address::new(format!("{}-{name}", chain.ticker().to_ascii_lowercase()))
}

/// A shared-custody vault owned by `members`, with an address on every external chain.
pub fn shared_vault(name: &str, status: VaultStatus, members: &[Validator]) -> Vault {
    with_addresses(
        Vault::new(
            PubKey::new(name),
            VaultType::SharedCustody,
            status,
            1,
            members.iter().map(|v| v.pub_key.clone()).collect(),
        ),
        name,
    )
}

/// A per-node-custody vault owned by `owner`, with an address on every external chain.
pub fn per_node_vault(owner: &Validator) -> Vault {
    let name = owner.pub_key.as_str().to_string();
    with_addresses(
        Vault::new(
            owner.pub_key.clone(),
            VaultType::PerNodeCustody,
            VaultStatus::Active,
            1,
            vec![owner.pub_key.clone()],
        ),
        &name,
    )
}

fn with_addresses(vault: Vault, name: &str) -> Vault {
    Chain::ALL
        .into_iter()
        .filter(|c| !c.is_native())
        .fold(vault, |vault, chain| {
            vault.with_address(chain, vault_address(name, chain))
        })
}

/// A user address on `chain`.
pub fn user_address(chain: Chain) -> Address {
    Address::new(format!("{}-user", chain.ticker().to_ascii_lowercase()))
}

/// Deterministic transaction id derived from `seed`.
pub fn txid(seed: u8) -> TxId {
    TxId::from_bytes([seed; 32])
}

/// Builder for observed transactions.
#[derive(Debug, Clone)]
pub struct ObservedTxBuilder {
    tx: ObservedTx,
}

impl ObservedTxBuilder {
    /// Starts an inbound of `coins` from the user into `vault` on the chain of the first coin,
    /// included at external height 100 and reported as final.
    pub fn inbound(id: TxId, vault: &Vault, coins: Vec<Coin>) -> Self {
        let chain = coins.first().map(|c| c.asset.chain).unwrap_or(Chain::Btc);
        let to_address = vault.address(chain).cloned().unwrap_or_default();

        Self {
            tx: ObservedTx {
                tx: Tx {
                    id,
                    chain,
                    from_address: user_address(chain),
                    to_address,
                    coins,
                    gas: vec![Coin::new(chain.gas_asset(), 10_000)],
                    memo: "SWAP:THOR.RUNE".to_string(),
                },
                observed_pub_key: vault.pub_key.clone(),
                block_height: 100,
                finalise_height: 100,
            },
        }
    }

    /// Starts an outbound of `coins` from `vault` to `to_address`.
    pub fn outbound(id: TxId, vault: &Vault, to_address: Address, coins: Vec<Coin>) -> Self {
        let chain = coins.first().map(|c| c.asset.chain).unwrap_or(Chain::Btc);
        let from_address = vault.address(chain).cloned().unwrap_or_default();

        Self {
            tx: ObservedTx {
                tx: Tx {
                    id,
                    chain,
                    from_address,
                    to_address,
                    coins,
                    gas: Vec::new(),
                    memo: String::new(),
                },
                observed_pub_key: vault.pub_key.clone(),
                block_height: 100,
                finalise_height: 100,
            },
        }
    }

    /// Sets the memo.
    pub fn memo(mut self, memo: impl Into<String>) -> Self {
        self.tx.tx.memo = memo.into();
        self
    }

    /// Sets the sender.
    pub fn from(mut self, from_address: Address) -> Self {
        self.tx.tx.from_address = from_address;
        self
    }

    /// Sets the gas paid.
    pub fn gas(mut self, gas: Vec<Coin>) -> Self {
        self.tx.tx.gas = gas;
        self
    }

    /// Sets the inclusion height; the observation stays final.
    pub fn at(mut self, block_height: BlockHeight) -> Self {
        self.tx.block_height = block_height;
        self.tx.finalise_height = block_height;
        self
    }

    /// Marks the observation as not yet final, to be final at `finalise_height`.
    pub fn pending_until(mut self, finalise_height: BlockHeight) -> Self {
        self.tx.finalise_height = finalise_height;
        self
    }

    /// Returns the observation.
    pub fn build(self) -> ObservedTx {
        self.tx
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixture_vaults_have_external_addresses() {
        let validators = active_validators(3);
        let vault = shared_vault("asgard", VaultStatus::Active, &validators);

        assert_eq!(vault.membership.len(), 3);
        assert!(vault.address(Chain::Btc).is_some());
        assert!(vault.address(Chain::Thor).is_none());
    }

    #[test]
    fn test_observed_tx_builder() {
        let validators = active_validators(1);
        let vault = shared_vault("asgard", VaultStatus::Active, &validators);
        let tx = ObservedTxBuilder::inbound(
            txid(1),
            &vault,
            vec![Coin::new(Chain::Btc.gas_asset(), ONE)],
        )
        .pending_until(106)
        .build();

        assert!(tx.validate().is_ok());
        assert!(!tx.is_final());
        assert_eq!(tx.tx.to_address, vault_address("asgard", Chain::Btc));
    }
}
