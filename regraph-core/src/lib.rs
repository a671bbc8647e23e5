pub mod cache;
pub mod config;
pub mod console;
pub mod error;
pub mod fetch;
pub mod flatten;
pub mod identifier;
pub mod operations;
pub mod registry;
pub mod resolve;
pub mod sandbox;
pub mod style;

#[cfg(test)]
mod test_server;

pub use config::RegraphConfig;
pub use error::RegraphError;
pub use fetch::{ArtifactFetcher, HttpFetcher};
pub use flatten::{FlatDependencySet, flatten};
pub use identifier::ComponentIdentifier;
pub use registry::{ComponentLookup, HttpRegistry, Lookup, MemoryRegistry};
pub use resolve::{Resolution, ResolveOptions, ResolvedComponent, Resolver};
pub use sandbox::{SandboxFiles, assemble};
pub use style::{ConflictPolicy, MergedStyleBundle, StyleFragment, StyleMerger, merge_styles};

pub type Result<T> = std::result::Result<T, RegraphError>;
