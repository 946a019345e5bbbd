use crate::error::Result;
use crate::types::{Condition, Item};
use async_trait::async_trait;
use downcast_rs::{impl_downcast, DowncastSync};
use futures::stream::BoxStream;

/// Lazy, finite stream of search results.
///
/// Dropping the stream before it is exhausted must release whatever the
/// backend holds for it.
pub type ItemStream = BoxStream<'static, Result<Item>>;

/// Core trait that all access point backends must implement
#[async_trait]
pub trait AccessPoint: DowncastSync {
    /// Backend kind this access point was built from
    fn kind(&self) -> &'static str;

    /// Find items matching all `conditions`.
    ///
    /// Conditions arrive in query order; positional conditions are still
    /// unbound and their meaning is up to the backend.
    async fn search(&self, conditions: Vec<Condition>) -> Result<ItemStream>;

    /// Insert the item, or update the stored record it identifies
    async fn save(&self, item: &Item) -> Result<()>;

    /// Delete the stored record the item identifies
    async fn remove(&self, item: &Item) -> Result<()>;
}

impl_downcast!(sync AccessPoint);
