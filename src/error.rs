//! Boundary error type.
//!
//! Consensus rules (`chain`, `consensus`, `mempool`) stay boolean — a
//! rejected block or transaction is a `false`, never an error. `LedgerError`
//! exists only for the I/O boundary: the CLI, the store, the transport and
//! key material loading.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("store error: {0}")]
    Store(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("key material error: {0}")]
    Crypto(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
