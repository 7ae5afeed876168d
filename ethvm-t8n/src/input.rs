use std::collections::BTreeMap;

use eyre::{Context, eyre};
use k256::ecdsa::SigningKey;
use serde::Deserialize;

use ethvm::{
    Address, MemoryState, Word,
    common::{
        Hex,
        account::Account,
        block::{AccessListItem, Env, Tx, TxGas},
        hash::keccak256,
    },
};

fn quantity(word: Word, name: &str) -> eyre::Result<u64> {
    word.to_u64()
        .ok_or_else(|| eyre!("{name} does not fit into 64 bits: {word}"))
}

#[derive(Debug, Default, Deserialize)]
pub struct AllocAccount {
    #[serde(default)]
    pub balance: Word,
    #[serde(default)]
    pub nonce: Word,
    #[serde(default)]
    pub code: Hex,
    #[serde(default)]
    pub storage: BTreeMap<Word, Word>,
}

pub type Alloc = BTreeMap<Address, AllocAccount>;

pub fn load_state(alloc: Alloc) -> eyre::Result<MemoryState> {
    let mut state = MemoryState::new();
    for (address, account) in alloc {
        let nonce = quantity(account.nonce, "nonce")?;
        state.insert(
            address,
            Account::new(nonce, account.balance, account.code.into_inner()),
            account.storage,
        );
    }
    Ok(state)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JsonEnv {
    pub current_coinbase: Address,
    pub current_gas_limit: Word,
    pub current_number: Word,
    pub current_timestamp: Word,
    #[serde(default)]
    pub current_difficulty: Option<Word>,
    #[serde(default)]
    pub current_random: Option<Word>,
    #[serde(default)]
    pub current_base_fee: Option<Word>,
    #[serde(default)]
    pub current_excess_blob_gas: Option<Word>,
    #[serde(default)]
    pub block_hashes: BTreeMap<String, Word>,
}

impl JsonEnv {
    pub fn into_env(self, chain_id: u64) -> eyre::Result<Env> {
        let mut block_hashes = BTreeMap::new();
        for (number, hash) in self.block_hashes {
            let number = match number.strip_prefix("0x") {
                Some(hex) => u64::from_str_radix(hex, 16),
                None => number.parse(),
            }
            .wrap_err_with(|| format!("invalid block number: {number}"))?;
            block_hashes.insert(number, hash);
        }
        let excess_blob_gas = self
            .current_excess_blob_gas
            .map(|excess| quantity(excess, "currentExcessBlobGas"))
            .transpose()?;
        Ok(Env {
            coinbase: self.current_coinbase,
            number: quantity(self.current_number, "currentNumber")?,
            timestamp: quantity(self.current_timestamp, "currentTimestamp")?,
            gas_limit: quantity(self.current_gas_limit, "currentGasLimit")?,
            difficulty: self.current_difficulty.unwrap_or_default(),
            prev_randao: self.current_random,
            base_fee: self.current_base_fee.unwrap_or_default(),
            chain_id,
            excess_blob_gas,
            block_hashes,
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JsonTx {
    #[serde(rename = "type", default)]
    pub tx_type: Option<Word>,
    pub nonce: Word,
    #[serde(default)]
    pub gas_price: Option<Word>,
    #[serde(default)]
    pub max_fee_per_gas: Option<Word>,
    #[serde(default)]
    pub max_priority_fee_per_gas: Option<Word>,
    #[serde(default)]
    pub max_fee_per_blob_gas: Option<Word>,
    #[serde(alias = "gasLimit")]
    pub gas: Word,
    #[serde(default)]
    pub to: Option<String>,
    #[serde(default)]
    pub value: Word,
    #[serde(alias = "data", default)]
    pub input: Hex,
    #[serde(default)]
    pub access_list: Option<Vec<AccessListItem>>,
    #[serde(default)]
    pub blob_versioned_hashes: Vec<Word>,
    #[serde(default)]
    pub sender: Option<Address>,
    #[serde(default)]
    pub secret_key: Option<Hex>,
}

/// Address owning `secret`: the last 20 bytes of keccak256 of the uncompressed public key.
pub fn address_of(secret: &[u8]) -> eyre::Result<Address> {
    let key = SigningKey::from_slice(secret).map_err(|e| eyre!("invalid secret key: {e}"))?;
    let point = key.verifying_key().to_encoded_point(false);
    let hash = keccak256(&point.as_bytes()[1..]);
    Address::try_from(&hash[12..]).map_err(|e| eyre!("{e}"))
}

impl JsonTx {
    /// EIP-2718 type; inferred from the fee fields when absent.
    pub fn tx_type(&self) -> eyre::Result<u8> {
        if let Some(tx_type) = self.tx_type {
            let tx_type = quantity(tx_type, "type")?;
            return u8::try_from(tx_type).map_err(|_| eyre!("invalid tx type: {tx_type}"));
        }
        let tx_type = if !self.blob_versioned_hashes.is_empty() {
            3
        } else if self.max_fee_per_gas.is_some() {
            2
        } else if self.access_list.is_some() {
            1
        } else {
            0
        };
        Ok(tx_type)
    }

    pub fn sender(&self) -> eyre::Result<Address> {
        match (&self.sender, &self.secret_key) {
            (Some(sender), _) => Ok(*sender),
            (None, Some(secret)) => address_of(secret.as_slice()),
            (None, None) => Err(eyre!("transaction has neither sender nor secretKey")),
        }
    }

    pub fn to_tx(&self) -> eyre::Result<Tx> {
        let to = match self.to.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(to) => Some(to.parse::<Address>().map_err(|e| eyre!("invalid to: {e}"))?),
        };
        Ok(Tx {
            sender: self.sender()?,
            to,
            nonce: quantity(self.nonce, "nonce")?,
            gas_limit: quantity(self.gas, "gas")?,
            value: self.value,
            data: self.input.as_slice().to_vec(),
            gas: TxGas {
                price: self.gas_price,
                max_fee: self.max_fee_per_gas,
                max_priority_fee: self.max_priority_fee_per_gas,
                max_fee_per_blob: self.max_fee_per_blob_gas,
            },
            access_list: self.access_list.clone().unwrap_or_default(),
            blob_versioned_hashes: self.blob_versioned_hashes.clone(),
        })
    }
}
