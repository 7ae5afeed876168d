use thiserror::Error;

use crate::common::{address::Address, word::Word};

/// Conditions that end a frame, consume all of its gas and roll back its
/// state changes.
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum ExceptionalHalt {
    #[error("stack overflow")]
    StackOverflow,
    #[error("stack underflow")]
    StackUnderflow,
    #[error("out of gas")]
    OutOfGas,
    #[error("invalid jump destination: {0}")]
    InvalidJump(usize),
    #[error("invalid opcode: 0x{0:02x}")]
    InvalidOpcode(u8),
    #[error("state modification in static context: 0x{0:02x}")]
    WriteInStaticContext(u8),
    #[error("return data out of bounds")]
    ReturnDataOutOfBounds,
    #[error("contract address collision")]
    AddressCollision,
    #[error("max code size exceeded")]
    CodeSizeLimit,
    #[error("max initcode size exceeded")]
    InitcodeSizeLimit,
    #[error("invalid code: must not begin with 0xef")]
    InvalidCodePrefix,
    #[error("precompile failed")]
    PrecompileFailure,
}

/// Reasons a transaction is rejected before any frame runs.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum TxError {
    #[error("nonce mismatch: sender {sender} has {expected}, tx has {got}")]
    NonceMismatch {
        sender: Address,
        expected: u64,
        got: u64,
    },
    #[error("nonce has max value: sender {0}")]
    NonceOverflow(Address),
    #[error("insufficient funds for gas * price + value: have {have}, want {want}")]
    InsufficientFunds { have: Word, want: Word },
    #[error("intrinsic gas too low: have {have}, want {want}")]
    IntrinsicGasTooLow { have: u64, want: u64 },
    #[error("gas limit {0} exceeds block gas limit {1}")]
    GasLimitExceedsBlock(u64, u64),
    #[error("sender {0} is not an EOA")]
    SenderNotEoa(Address),
    #[error("max fee per gas {max_fee} less than block base fee {base_fee}")]
    FeeCapTooLow { max_fee: Word, base_fee: Word },
    #[error("max priority fee per gas higher than max fee per gas")]
    TipAboveFeeCap,
    #[error("transaction type not supported")]
    TypeNotSupported,
    #[error("max initcode size exceeded: {0}")]
    InitcodeTooLarge(usize),
    #[error("blob transaction must have at least one blob")]
    NoBlobs,
    #[error("too many blobs: {0}")]
    TooManyBlobs(usize),
    #[error("blob transaction can not create contracts")]
    BlobCreate,
    #[error("invalid blob versioned hash")]
    InvalidBlobHash,
    #[error("max fee per blob gas less than blob base fee")]
    BlobFeeCapTooLow,
}

#[derive(Debug, Error)]
pub enum ExecutorError {
    #[error("invalid transaction: {0}")]
    Tx(#[from] TxError),
    #[error("internal: {0}")]
    Internal(&'static str),
}
