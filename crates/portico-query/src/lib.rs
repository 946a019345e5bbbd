//! # portico-query
//!
//! One query interface over heterogeneous storage backends.
//!
//! A [`Site`] is built from a configuration file listing named access
//! points. Each access point is created by the [`AccessPointFactory`]
//! registered for its backend kind, and clients then query any of them with
//! the same compact syntax:
//!
//! ```text
//! /jazz/artist=Monk/year>=1957/
//! ```
//!
//! ## Architecture
//!
//! - **AccessPoint**: trait every backend implements (search, save, remove)
//! - **AccessPointFactory**: builds an access point from its descriptor
//! - **BackendRegistry**: kind → factory table, filled at startup
//! - **Site**: name → access point map, query parsing and dispatch
//!
//! ## Example
//!
//! ```rust,no_run
//! use futures::TryStreamExt;
//! use portico_query::{BackendRegistry, Site};
//!
//! # async fn example() -> portico_query::Result<()> {
//! // Backend crates provide the factories
//! let registry = BackendRegistry::new();
//! // registry.register_factory(Arc::new(MemorySourceFactory));
//!
//! let site = Site::load("site.ini", &registry).await?;
//!
//! let people: Vec<_> = site.search("people", "/name=Ada/").await?.try_collect().await?;
//! let ada = site.open("people", "/1/").await?;
//! site.remove(&ada).await?;
//! # Ok(())
//! # }
//! ```
//!
//! Backend crates:
//! - `portico-query-memory` - in-process tables
//! - `portico-query-fs` - directory trees

pub mod config;
pub mod error;
pub mod grammar;
pub mod registry;
pub mod site;
pub mod traits;
pub mod types;

// Re-export commonly used items
pub use crate::config::load_descriptors;
pub use error::{DataError, NotOneObjectReturned, Result};
pub use grammar::{parse_query, parse_segment, Conditions};
pub use registry::{AccessPointFactory, BackendRegistry};
pub use site::Site;
pub use traits::{AccessPoint, ItemStream};
pub use types::{
    bind_positional, value_text, AccessPointDescriptor, Condition, DataRow, Item, Operator,
};
