//! Merkle-Patricia trie root computation over a complete key/value set.

use std::collections::HashMap;

use rlp::RlpStream;

use crate::common::{account::Account, address::Address, hash::keccak256, word::Word};

/// Root of the empty trie: keccak256(rlp("")).
pub const EMPTY_ROOT: [u8; 32] = [
    0x56, 0xe8, 0x1f, 0x17, 0x1b, 0xcc, 0x55, 0xa6, 0xff, 0x83, 0x45, 0xe6, 0x92, 0xc0, 0xf8, 0x6e,
    0x5b, 0x48, 0xe0, 0x1b, 0x99, 0x6c, 0xad, 0xc0, 0x01, 0x62, 0x2f, 0xb5, 0xe3, 0x63, 0xb4, 0x21,
];

type Entry = (Vec<u8>, Vec<u8>);

pub fn trie_root<K, V>(items: impl IntoIterator<Item = (K, V)>) -> [u8; 32]
where
    K: AsRef<[u8]>,
    V: AsRef<[u8]>,
{
    let mut entries: Vec<Entry> = items
        .into_iter()
        .map(|(key, value)| (nibbles(key.as_ref()), value.as_ref().to_vec()))
        .collect();
    entries.sort();
    entries.dedup_by(|a, b| a.0 == b.0);
    keccak256(&encode_node(&entries, 0))
}

/// Trie keyed by the RLP of each item's index, as used for receipts.
pub fn ordered_trie_root(values: &[Vec<u8>]) -> [u8; 32] {
    trie_root(
        values
            .iter()
            .enumerate()
            .map(|(index, value)| (rlp::encode(&(index as u64)).to_vec(), value)),
    )
}

pub fn storage_root(slots: Option<&HashMap<Word, Word>>) -> [u8; 32] {
    let Some(slots) = slots else {
        return EMPTY_ROOT;
    };
    trie_root(
        slots
            .iter()
            .filter(|(_, value)| !value.is_zero())
            .map(|(key, value)| {
                (
                    keccak256(&key.into_bytes()),
                    rlp::encode(&value.to_trimmed_bytes()).to_vec(),
                )
            }),
    )
}

/// rlp([nonce, balance, storage_root, code_hash])
pub fn encode_account(account: &Account, storage_root: &[u8; 32]) -> Vec<u8> {
    let mut stream = RlpStream::new_list(4);
    stream.append(&account.nonce);
    stream.append(&account.balance.to_trimmed_bytes());
    stream.append(&storage_root.to_vec());
    stream.append(&account.code_hash().to_vec());
    stream.out().to_vec()
}

pub fn state_root<'a>(
    accounts: impl Iterator<Item = (&'a Address, &'a Account, Option<&'a HashMap<Word, Word>>)>,
) -> [u8; 32] {
    trie_root(accounts.map(|(address, account, slots)| {
        let root = storage_root(slots);
        (keccak256(&address.0), encode_account(account, &root))
    }))
}

fn nibbles(key: &[u8]) -> Vec<u8> {
    key.iter().flat_map(|byte| [byte >> 4, byte & 0x0f]).collect()
}

/// Compact (hex-prefix) encoding of a nibble path.
fn hex_prefix(path: &[u8], leaf: bool) -> Vec<u8> {
    let flag = if leaf { 2u8 } else { 0u8 };
    let mut ret = Vec::with_capacity(path.len() / 2 + 1);
    let rest = if path.len() % 2 == 1 {
        ret.push(((flag + 1) << 4) | path[0]);
        &path[1..]
    } else {
        ret.push(flag << 4);
        path
    };
    ret.extend(rest.chunks(2).map(|pair| (pair[0] << 4) | pair[1]));
    ret
}

fn common_prefix(entries: &[Entry], depth: usize) -> usize {
    let (Some(first), Some(last)) = (entries.first(), entries.last()) else {
        return 0;
    };
    first.0[depth..]
        .iter()
        .zip(last.0[depth..].iter())
        .take_while(|(a, b)| a == b)
        .count()
}

fn append_child(stream: &mut RlpStream, node: &[u8]) {
    if node.len() < 32 {
        stream.append_raw(node, 1);
    } else {
        stream.append(&keccak256(node).to_vec());
    }
}

fn encode_node(entries: &[Entry], depth: usize) -> Vec<u8> {
    match entries {
        [] => rlp::NULL_RLP.to_vec(),
        [(key, value)] => {
            let mut stream = RlpStream::new_list(2);
            stream.append(&hex_prefix(&key[depth..], true));
            stream.append(value);
            stream.out().to_vec()
        }
        _ => {
            let prefix = common_prefix(entries, depth);
            if prefix > 0 {
                let child = encode_node(entries, depth + prefix);
                let mut stream = RlpStream::new_list(2);
                stream.append(&hex_prefix(&entries[0].0[depth..depth + prefix], false));
                append_child(&mut stream, &child);
                return stream.out().to_vec();
            }

            let mut stream = RlpStream::new_list(17);
            let mut index = 0;
            let mut value = None;
            if entries[0].0.len() == depth {
                value = Some(&entries[0].1);
                index = 1;
            }
            for nibble in 0..16u8 {
                let start = index;
                while index < entries.len() && entries[index].0[depth] == nibble {
                    index += 1;
                }
                if start == index {
                    stream.append_empty_data();
                } else {
                    let child = encode_node(&entries[start..index], depth + 1);
                    append_child(&mut stream, &child);
                }
            }
            match value {
                Some(value) => stream.append(value),
                None => stream.append_empty_data(),
            };
            stream.out().to_vec()
        }
    }
}
