//! Package registry lookups used to expand `requirements.txt` one level.

mod pypi;

pub use pypi::{PypiRegistry, DEFAULT_PYPI_URL};

use crate::error::Result;
use async_trait::async_trait;

/// Looks up what an exact release of a package declares as requirements.
///
/// Implementations return the raw requirement strings as published (they
/// may carry environment markers such as `; extra == "socks"`). A release
/// the registry does not know is reported as
/// [`Error::PackageNotFound`](crate::Error::PackageNotFound).
#[async_trait]
pub trait RegistryLookup: Send + Sync {
    async fn requirements(&self, name: &str, version: &str) -> Result<Vec<String>>;
}
