//! Errors raised by chains, discovery and accounts.

use hd_key_deriv::DerivationError;
use thiserror::Error;

use crate::oracle::OracleError;

/// Errors from a single address chain.
#[derive(Debug, Error)]
pub enum ChainError {
    /// The chain has not derived any address yet.
    #[error("chain has no derived addresses")]
    EmptyChain,

    /// The index after `index` does not fit in a `u32`.
    #[error("no derivation index follows {index}")]
    IndexOverflow {
        /// The highest index in the chain.
        index: u32,
    },

    /// Deriving the next child key failed.
    #[error("derivation: {0}")]
    Derivation(#[from] DerivationError),
}

/// Errors from a gap-limit discovery scan.
///
/// Any of these aborts the scan and discards its working copy.
#[derive(Debug, Error)]
pub enum DiscoveryError {
    /// The gap limit must be at least one.
    #[error("gap limit must be positive")]
    InvalidGapLimit,

    /// The oracle reported a failure.
    #[error("oracle: {0}")]
    Oracle(#[from] OracleError),

    /// The oracle answered a batch without an entry for one of its addresses.
    #[error("oracle response is missing queried address {address}")]
    MalformedOracleResponse {
        /// The first queried address absent from the response.
        address: String,
    },

    /// The scan checked `bound` addresses without observing a clean gap.
    #[error("no clean gap found within {bound} addresses")]
    ScanBoundExceeded {
        /// The configured maximum number of addresses per scan.
        bound: u32,
    },

    /// The working chain failed to derive an address.
    #[error("chain: {0}")]
    Chain(#[from] ChainError),
}

/// Errors from account-level operations.
#[derive(Debug, Error)]
pub enum AccountError {
    /// The chain index is out of range.
    #[error("chain index {index} out of range for account with {len} chains")]
    InvalidChainIndex {
        /// The requested index.
        index: usize,
        /// Number of chains in the account.
        len: usize,
    },

    /// The chain was advanced or replaced while a discovery scan on it was in flight.
    #[error("chain {index} changed during discovery, scan discarded")]
    ChainModified {
        /// The chain index.
        index: usize,
    },

    /// The account has no chains.
    #[error("account has no chains")]
    EmptyAccount,

    /// A chain operation failed.
    #[error("chain: {0}")]
    Chain(#[from] ChainError),

    /// Discovery failed, the chain was left untouched.
    #[error("discovery: {0}")]
    Discovery(#[from] DiscoveryError),

    /// A persisted root node could not be parsed.
    #[error("derivation: {0}")]
    Derivation(#[from] DerivationError),

    /// Persisted account state is not valid JSON of the expected shape.
    #[error("json: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result alias for account operations.
pub type AccountResult<T> = Result<T, AccountError>;
