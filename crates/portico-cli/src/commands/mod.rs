pub mod list;
pub mod query;
pub mod write;

pub use list::ListCommand;
pub use query::{OpenCommand, SearchCommand};
pub use write::{RemoveCommand, SaveCommand};

use anyhow::Context;
use portico_query::{BackendRegistry, Site};
use portico_query_fs::FsSourceFactory;
use portico_query_memory::MemorySourceFactory;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

/// Every backend kind the CLI knows how to build
pub fn registry() -> BackendRegistry {
    BackendRegistry::new()
        .with_factory(Arc::new(MemorySourceFactory))
        .with_factory(Arc::new(FsSourceFactory))
}

pub async fn load_site(config: &Path) -> anyhow::Result<Site> {
    let registry = registry();
    debug!("Backends available: {:?}", registry.kinds());

    Site::load(config, &registry)
        .await
        .with_context(|| format!("Failed to load site from {}", config.display()))
}
