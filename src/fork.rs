use std::collections::BTreeMap;
use std::str::FromStr;

use crate::common::{address::Address, error::Error};
use crate::gas::GasSchedule;
use crate::instructions::{self, InstructionTable};
use crate::precompiles::{self, Precompile};

/// Hard forks in activation order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Fork {
    Frontier,
    Homestead,
    TangerineWhistle,
    SpuriousDragon,
    Byzantium,
    Constantinople,
    Petersburg,
    Istanbul,
    Berlin,
    London,
    Paris,
    Shanghai,
    Cancun,
    Prague,
}

impl Fork {
    pub const ALL: [Fork; 14] = [
        Fork::Frontier,
        Fork::Homestead,
        Fork::TangerineWhistle,
        Fork::SpuriousDragon,
        Fork::Byzantium,
        Fork::Constantinople,
        Fork::Petersburg,
        Fork::Istanbul,
        Fork::Berlin,
        Fork::London,
        Fork::Paris,
        Fork::Shanghai,
        Fork::Cancun,
        Fork::Prague,
    ];

    pub fn latest() -> Fork {
        Fork::Prague
    }
}

impl std::fmt::Display for Fork {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Fork::Frontier => "Frontier",
            Fork::Homestead => "Homestead",
            Fork::TangerineWhistle => "EIP150",
            Fork::SpuriousDragon => "EIP158",
            Fork::Byzantium => "Byzantium",
            Fork::Constantinople => "Constantinople",
            Fork::Petersburg => "ConstantinopleFix",
            Fork::Istanbul => "Istanbul",
            Fork::Berlin => "Berlin",
            Fork::London => "London",
            Fork::Paris => "Merge",
            Fork::Shanghai => "Shanghai",
            Fork::Cancun => "Cancun",
            Fork::Prague => "Prague",
        };
        f.write_str(name)
    }
}

impl FromStr for Fork {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let fork = match s {
            "Frontier" => Fork::Frontier,
            "Homestead" => Fork::Homestead,
            "EIP150" | "TangerineWhistle" => Fork::TangerineWhistle,
            "EIP158" | "SpuriousDragon" => Fork::SpuriousDragon,
            "Byzantium" => Fork::Byzantium,
            "Constantinople" => Fork::Constantinople,
            "ConstantinopleFix" | "Petersburg" => Fork::Petersburg,
            "Istanbul" => Fork::Istanbul,
            "Berlin" => Fork::Berlin,
            "London" => Fork::London,
            "Merge" | "Paris" => Fork::Paris,
            "Shanghai" => Fork::Shanghai,
            "Cancun" => Fork::Cancun,
            "Prague" => Fork::Prague,
            _ => return Err(Error::UnknownFork(s.to_string())),
        };
        Ok(fork)
    }
}

/// How SSTORE is priced and refunded.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SstoreRegime {
    /// Set/reset pricing on the current value only.
    Legacy,
    /// EIP-2200 net metering against the original value.
    NetMetered,
}

/// Everything that differs between forks, as plain data.
pub struct Config {
    pub fork: Fork,
    pub gas: GasSchedule,
    pub instructions: InstructionTable,
    pub precompiles: BTreeMap<Address, Precompile>,

    /// EIP-150: forward all but one 64th of the remaining gas.
    pub all_but_one_64th: bool,
    /// EIP-161: empty accounts are treated as absent and pruned when touched.
    pub empty_account_semantics: bool,
    /// EIP-2929: warm and cold access sets.
    pub access_lists: bool,
    pub sstore: SstoreRegime,
    /// Divisor of gas used capping the refund.
    pub max_refund_quotient: u64,
    /// Homestead: failing to pay the code deposit fails the creation.
    pub code_deposit_oog_fails: bool,
    /// EIP-161: newly created contracts start with nonce 1.
    pub create_nonce: u64,
    /// EIP-170.
    pub max_code_size: Option<usize>,
    /// EIP-3860.
    pub max_initcode_size: Option<usize>,
    /// EIP-3541.
    pub reject_ef_code: bool,
    /// EIP-1559.
    pub base_fee: bool,
    /// EIP-3651.
    pub warm_coinbase: bool,
    /// EIP-6780: SELFDESTRUCT only deletes contracts created in the same transaction.
    pub selfdestruct_only_created: bool,
    /// EIP-4399: DIFFICULTY returns the beacon randomness.
    pub prev_randao: bool,
    /// EIP-4844 blob base fee update fraction.
    pub blob_base_fee_update_fraction: Option<u64>,
    pub max_blobs_per_block: usize,
    /// EIP-7623 calldata floor price.
    pub calldata_floor: bool,
}

impl Config {
    pub fn new(fork: Fork) -> Self {
        let gas = GasSchedule::new(fork);
        let instructions = instructions::table(fork);
        let precompiles = precompiles::table(fork);
        Self {
            fork,
            gas,
            instructions,
            precompiles,
            all_but_one_64th: fork >= Fork::TangerineWhistle,
            empty_account_semantics: fork >= Fork::SpuriousDragon,
            access_lists: fork >= Fork::Berlin,
            sstore: if fork >= Fork::Istanbul {
                SstoreRegime::NetMetered
            } else {
                SstoreRegime::Legacy
            },
            max_refund_quotient: if fork >= Fork::London { 5 } else { 2 },
            code_deposit_oog_fails: fork >= Fork::Homestead,
            create_nonce: if fork >= Fork::SpuriousDragon { 1 } else { 0 },
            max_code_size: (fork >= Fork::SpuriousDragon).then_some(0x6000),
            max_initcode_size: (fork >= Fork::Shanghai).then_some(2 * 0x6000),
            reject_ef_code: fork >= Fork::London,
            base_fee: fork >= Fork::London,
            warm_coinbase: fork >= Fork::Shanghai,
            selfdestruct_only_created: fork >= Fork::Cancun,
            prev_randao: fork >= Fork::Paris,
            blob_base_fee_update_fraction: match fork {
                Fork::Prague => Some(5007716),
                Fork::Cancun => Some(3338477),
                _ => None,
            },
            max_blobs_per_block: match fork {
                Fork::Prague => 9,
                Fork::Cancun => 6,
                _ => 0,
            },
            calldata_floor: fork >= Fork::Prague,
        }
    }

    pub fn is_precompile(&self, address: &Address) -> bool {
        self.precompiles.contains_key(address)
    }

    pub fn has_blobs(&self) -> bool {
        self.blob_base_fee_update_fraction.is_some()
    }
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("fork", &self.fork)
            .field("precompiles", &self.precompiles.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fork_names() {
        for fork in Fork::ALL {
            assert_eq!(fork.to_string().parse::<Fork>().unwrap(), fork);
        }
        assert_eq!("Paris".parse::<Fork>().unwrap(), Fork::Paris);
        assert!("Osaka".parse::<Fork>().is_err());
    }

    #[test]
    fn test_fork_order() {
        assert!(Fork::Frontier < Fork::Homestead);
        assert!(Fork::Cancun < Fork::Prague);
        assert_eq!(Fork::latest(), Fork::Prague);
    }

    #[test]
    fn test_opcode_availability() {
        let frontier = Config::new(Fork::Frontier);
        assert!(frontier.instructions[0x01].is_some());
        assert!(frontier.instructions[0xf4].is_none());
        assert!(frontier.instructions[0xfd].is_none());

        let byzantium = Config::new(Fork::Byzantium);
        assert!(byzantium.instructions[0xfd].is_some());
        assert!(byzantium.instructions[0xfa].is_some());
        assert!(byzantium.instructions[0x1b].is_none());

        let shanghai = Config::new(Fork::Shanghai);
        assert!(shanghai.instructions[0x5f].is_some());
        assert!(shanghai.instructions[0x5c].is_none());

        let cancun = Config::new(Fork::Cancun);
        assert!(cancun.instructions[0x5c].is_some());
        assert!(cancun.instructions[0x5e].is_some());
        assert!(cancun.instructions[0x0c].is_none());
    }

    #[test]
    fn test_precompile_availability() {
        let addr = |n: u8| {
            let mut bytes = [0u8; 20];
            bytes[19] = n;
            Address(bytes)
        };
        assert_eq!(Config::new(Fork::Frontier).precompiles.len(), 4);
        assert_eq!(Config::new(Fork::Byzantium).precompiles.len(), 8);
        assert_eq!(Config::new(Fork::Istanbul).precompiles.len(), 9);
        assert_eq!(Config::new(Fork::Cancun).precompiles.len(), 10);
        let prague = Config::new(Fork::Prague);
        assert_eq!(prague.precompiles.len(), 15);
        assert!(prague.is_precompile(&addr(0x0f)));
        assert!(!prague.is_precompile(&addr(0x10)));
    }

    #[test]
    fn test_feature_flags() {
        let frontier = Config::new(Fork::Frontier);
        assert!(!frontier.all_but_one_64th);
        assert_eq!(frontier.max_code_size, None);
        assert_eq!(frontier.max_refund_quotient, 2);

        let london = Config::new(Fork::London);
        assert!(london.access_lists);
        assert_eq!(london.max_refund_quotient, 5);
        assert_eq!(london.sstore, SstoreRegime::NetMetered);
        assert!(!london.warm_coinbase);
        assert_eq!(london.max_code_size, Some(24576));
    }
}
