pub mod http;
pub mod memory;
pub mod types;

pub use http::{HttpRegistry, build_client};
pub use memory::{FixtureComponent, MemoryRegistry};
pub use types::*;

use crate::Result;
use std::future::Future;

/// Outcome of asking the metadata store for one component.
#[derive(Clone, Debug, PartialEq)]
pub enum Lookup {
    Found(ComponentRecord),
    UserNotFound,
    ComponentNotFound,
}

/// Metadata store keyed by `author/slug`.
///
/// `Err` means the service itself could not be reached; a missing user or
/// component is an `Ok` outcome.
pub trait ComponentLookup: Send + Sync {
    fn lookup(&self, author: &str, slug: &str) -> impl Future<Output = Result<Lookup>> + Send;
}
