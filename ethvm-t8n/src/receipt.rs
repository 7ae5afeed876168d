use rlp::RlpStream;
use serde::Serialize;

use ethvm::{
    Address, Log,
    common::{Hex, hash::keccak256},
};

pub const BLOOM_BYTES: usize = 256;

pub type Bloom = [u8; BLOOM_BYTES];

/// Sets the three bits selected by the low 11 bits of the first three hash byte pairs.
fn accrue(bloom: &mut Bloom, input: &[u8]) {
    let hash = keccak256(input);
    for i in 0..3 {
        let bit = (((hash[2 * i] as usize) << 8) | hash[2 * i + 1] as usize) & 0x7ff;
        bloom[BLOOM_BYTES - 1 - bit / 8] |= 1 << (bit % 8);
    }
}

pub fn bloom<'a>(logs: impl IntoIterator<Item = &'a Log>) -> Bloom {
    let mut bloom = [0u8; BLOOM_BYTES];
    for log in logs {
        accrue(&mut bloom, &log.address.0);
        for topic in &log.topics {
            accrue(&mut bloom, &topic.into_bytes());
        }
    }
    bloom
}

fn append_log(stream: &mut RlpStream, log: &Log) {
    stream.begin_list(3);
    stream.append(&log.address.0.to_vec());
    stream.begin_list(log.topics.len());
    for topic in &log.topics {
        stream.append(&topic.into_bytes().to_vec());
    }
    stream.append(&log.data.as_slice().to_vec());
}

/// keccak256(rlp(logs)) over the logs of all included transactions.
pub fn logs_hash(logs: &[Log]) -> [u8; 32] {
    let mut stream = RlpStream::new_list(logs.len());
    for log in logs {
        append_log(&mut stream, log);
    }
    keccak256(&stream.out())
}

#[derive(Clone, Debug)]
pub struct Receipt {
    pub tx_type: u8,
    pub success: bool,
    /// Intermediate state root, pre-Byzantium only.
    pub root: Option<[u8; 32]>,
    pub cumulative_gas_used: u64,
    pub gas_used: u64,
    pub logs: Vec<Log>,
    pub contract_address: Option<Address>,
    pub index: usize,
}

impl Receipt {
    /// Consensus encoding: rlp([status|root, cumulative gas, bloom, logs]) behind the type byte.
    pub fn encode(&self) -> Vec<u8> {
        let mut stream = RlpStream::new_list(4);
        match &self.root {
            Some(root) => stream.append(&root.to_vec()),
            None => stream.append(&(self.success as u8)),
        };
        stream.append(&self.cumulative_gas_used);
        stream.append(&bloom(&self.logs).to_vec());
        stream.begin_list(self.logs.len());
        for log in &self.logs {
            append_log(&mut stream, log);
        }

        let payload = stream.out();
        if self.tx_type == 0 {
            return payload.to_vec();
        }
        let mut encoded = Vec::with_capacity(payload.len() + 1);
        encoded.push(self.tx_type);
        encoded.extend_from_slice(&payload);
        encoded
    }
}

fn quantity(n: u64) -> String {
    format!("{n:#x}")
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JsonLog {
    address: Address,
    topics: Vec<String>,
    data: Hex,
    block_number: String,
    transaction_index: String,
    log_index: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JsonReceipt {
    #[serde(rename = "type")]
    tx_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    root: Option<Hex>,
    status: String,
    cumulative_gas_used: String,
    logs_bloom: Hex,
    logs: Vec<JsonLog>,
    #[serde(skip_serializing_if = "Option::is_none")]
    contract_address: Option<Address>,
    gas_used: String,
    transaction_index: String,
}

impl JsonReceipt {
    /// `first_log` is the block-wide index of this receipt's first log.
    pub fn new(receipt: &Receipt, block_number: u64, first_log: usize) -> Self {
        let logs = receipt
            .logs
            .iter()
            .enumerate()
            .map(|(i, log)| JsonLog {
                address: log.address,
                topics: log
                    .topics
                    .iter()
                    .map(|topic| format!("0x{}", hex::encode(topic.into_bytes())))
                    .collect(),
                data: log.data.clone(),
                block_number: quantity(block_number),
                transaction_index: quantity(receipt.index as u64),
                log_index: quantity((first_log + i) as u64),
            })
            .collect();
        Self {
            tx_type: quantity(receipt.tx_type as u64),
            root: receipt.root.map(Hex::from),
            status: quantity(receipt.success as u64),
            cumulative_gas_used: quantity(receipt.cumulative_gas_used),
            logs_bloom: Hex::from(bloom(&receipt.logs)),
            logs,
            contract_address: receipt.contract_address,
            gas_used: quantity(receipt.gas_used),
            transaction_index: quantity(receipt.index as u64),
        }
    }
}
