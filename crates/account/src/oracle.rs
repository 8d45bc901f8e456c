//! The address-usage oracle consumed by discovery.
use std::{collections::HashMap, error::Error, fmt, sync::Arc};

use async_trait::async_trait;

/// Answer to an oracle query: whether each queried address has been used.
pub type UsageMap = HashMap<String, bool>;

type BoxedErr = Box<dyn Error + Send + Sync + 'static>;

/// A failure reported by an oracle. Discovery propagates it verbatim.
#[derive(Debug)]
pub struct OracleError(BoxedErr);

impl OracleError {
    /// Wraps anything that converts into a boxed error, including plain strings.
    pub fn new(err: impl Into<BoxedErr>) -> Self {
        Self(err.into())
    }

    /// The underlying error.
    pub fn inner(&self) -> &(dyn Error + Send + Sync + 'static) {
        self.0.as_ref()
    }
}

impl fmt::Display for OracleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl Error for OracleError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        self.0.source()
    }
}

/// Something that knows whether addresses have activity, e.g. a blockchain indexer.
///
/// Discovery issues one query per batch and awaits it before deriving anything further, so a
/// single scan never has two queries in flight. Implementations must answer every queried
/// address; a missing entry is treated as a malformed response rather than as unused.
#[async_trait]
pub trait AddressOracle: Send + Sync {
    /// Reports, for each address in `addresses`, whether it has been used.
    async fn query(&self, addresses: &[String]) -> Result<UsageMap, OracleError>;
}

#[async_trait]
impl<O: AddressOracle + ?Sized> AddressOracle for Arc<O> {
    async fn query(&self, addresses: &[String]) -> Result<UsageMap, OracleError> {
        (**self).query(addresses).await
    }
}

#[async_trait]
impl<O: AddressOracle + ?Sized> AddressOracle for Box<O> {
    async fn query(&self, addresses: &[String]) -> Result<UsageMap, OracleError> {
        (**self).query(addresses).await
    }
}

#[async_trait]
impl<O: AddressOracle + ?Sized> AddressOracle for &O {
    async fn query(&self, addresses: &[String]) -> Result<UsageMap, OracleError> {
        (**self).query(addresses).await
    }
}
