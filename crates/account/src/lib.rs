//! HD wallet accounts and gap-limit address discovery.
//!
//! An [`Account`] is an ordered set of [`Chain`]s, each deriving addresses from its own root
//! node. [`Account::discover_chain`] finds how far a chain has been used by asking an
//! [`AddressOracle`] about batches of addresses, and commits the advanced chain in one step once
//! the scan has succeeded.

mod account;
mod chain;
mod discovery;
mod errors;
mod oracle;
mod state;

pub use account::{Account, ChainSpec};
pub use chain::{AddressFn, Chain};
pub use discovery::{
    discover, Discovered, DiscoveryConfig, DiscoveryOutcome, DEFAULT_GAP_LIMIT,
    DEFAULT_SCAN_BOUND,
};
pub use errors::{AccountError, AccountResult, ChainError, DiscoveryError};
pub use oracle::{AddressOracle, OracleError, UsageMap};
pub use state::ChainState;
