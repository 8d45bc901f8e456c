//! [`AddressOracle`](hd_account::AddressOracle) implementations that talk to a blockchain
//! indexer.

mod esplora;
mod retry;

pub use esplora::{is_used, EsploraError, EsploraOracle};
pub use retry::{RetryingOracle, DEFAULT_RETRY_COUNT, DEFAULT_RETRY_INTERVAL};
