use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum Error {
    #[error("invalid address")]
    InvalidAddress,
    #[error("invalid word: '{0}'")]
    InvalidWord(String),
    #[error("invalid hex: '{0}'")]
    InvalidHex(String),
    #[error("unknown fork: '{0}'")]
    UnknownFork(String),
}
