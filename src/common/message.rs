use std::sync::Arc;

use crate::common::{address::Address, word::Word};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CallKind {
    Call,
    CallCode,
    DelegateCall,
    StaticCall,
    Create,
    Create2,
}

impl CallKind {
    pub fn is_create(&self) -> bool {
        matches!(self, CallKind::Create | CallKind::Create2)
    }
}

impl std::fmt::Display for CallKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            CallKind::Call => "CALL",
            CallKind::CallCode => "CALLCODE",
            CallKind::DelegateCall => "DELEGATECALL",
            CallKind::StaticCall => "STATICCALL",
            CallKind::Create => "CREATE",
            CallKind::Create2 => "CREATE2",
        };
        f.write_str(name)
    }
}

/// Immutable input of one frame.
///
/// For contract creation `target` is the derived address. `current_target` is the account
/// whose storage and balance the code operates on, `code_address` the account
/// the code was loaded from; they differ under DELEGATECALL and CALLCODE.
#[derive(Clone, Debug)]
pub struct Message {
    pub kind: CallKind,
    pub caller: Address,
    pub target: Option<Address>,
    pub current_target: Address,
    pub code_address: Address,
    pub code: Arc<[u8]>,
    pub data: Arc<[u8]>,
    pub gas: u64,
    pub value: Word,
    pub depth: usize,
    pub is_static: bool,
    pub should_transfer_value: bool,
}

impl Message {
    pub fn is_create(&self) -> bool {
        self.kind.is_create()
    }
}
