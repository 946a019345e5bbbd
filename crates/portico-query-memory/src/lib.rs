//! In-memory implementation of the portico-query AccessPoint trait
//!
//! Rows live in a process-local table and are lost when the process exits.
//!
//! ## Keys
//!
//! The `keys` parameter (default `id`) names the properties that identify a
//! row. Saving an item replaces the row with the same key values, or
//! appends it. Positional query segments match the keys in order:
//!
//! ```text
//! keys = id        /7/        is the same as   /id=7/
//! ```
//!
//! ## Example
//!
//! ```ini
//! [people]
//! kind = memory
//! keys = id
//! # optional JSON array of objects to start from
//! data = people.json
//! ```

use async_trait::async_trait;
use futures::{stream, StreamExt};
use portico_query::{
    bind_positional, value_text, AccessPoint, AccessPointDescriptor, AccessPointFactory,
    Condition, DataError, DataRow, Item, ItemStream, Result,
};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, error};

pub const KIND: &str = "memory";

/// In-memory access point
pub struct MemorySource {
    keys: Vec<String>,
    rows: RwLock<Vec<DataRow>>,
}

impl MemorySource {
    /// Create an empty table identified by `keys`
    pub fn new(keys: Vec<String>) -> Self {
        Self {
            keys,
            rows: RwLock::new(Vec::new()),
        }
    }

    pub fn with_rows(keys: Vec<String>, rows: Vec<DataRow>) -> Self {
        Self {
            keys,
            rows: RwLock::new(rows),
        }
    }

    pub fn keys(&self) -> &[String] {
        &self.keys
    }

    /// Number of stored rows
    pub async fn len(&self) -> usize {
        self.rows.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.rows.read().await.is_empty()
    }

    /// Key values of an item, in key order
    fn key_of(&self, item: &Item) -> Result<Vec<String>> {
        self.keys
            .iter()
            .map(|key| {
                item.text(key).ok_or_else(|| {
                    DataError::invalid_item(format!("missing key property '{}'", key))
                })
            })
            .collect()
    }

    fn has_key(&self, row: &DataRow, key: &[String]) -> bool {
        self.keys
            .iter()
            .zip(key)
            .all(|(name, value)| row.get(name).map(value_text).as_deref() == Some(value.as_str()))
    }
}

fn matches_all(conditions: &[Condition], item: &Item) -> Result<bool> {
    for condition in conditions {
        if !condition.matches(item)? {
            return Ok(false);
        }
    }
    Ok(true)
}

#[async_trait]
impl AccessPoint for MemorySource {
    fn kind(&self) -> &'static str {
        KIND
    }

    async fn search(&self, conditions: Vec<Condition>) -> Result<ItemStream> {
        let conditions = bind_positional(conditions, &self.keys)?;
        let snapshot = self.rows.read().await.clone();

        debug!(
            "Filtering {} rows with {} conditions",
            snapshot.len(),
            conditions.len()
        );

        let items = snapshot.into_iter().filter_map(move |row| {
            let item = Item::new(row);
            match matches_all(&conditions, &item) {
                Ok(true) => Some(Ok(item)),
                Ok(false) => None,
                Err(e) => Some(Err(e)),
            }
        });

        Ok(stream::iter(items).boxed())
    }

    async fn save(&self, item: &Item) -> Result<()> {
        let key = self.key_of(item)?;
        let mut rows = self.rows.write().await;

        match rows.iter().position(|row| self.has_key(row, &key)) {
            Some(index) => {
                debug!("Replacing row {:?}", key);
                rows[index] = item.properties().clone();
            }
            None => {
                debug!("Appending row {:?}", key);
                rows.push(item.properties().clone());
            }
        }

        Ok(())
    }

    async fn remove(&self, item: &Item) -> Result<()> {
        let key = self.key_of(item)?;
        let mut rows = self.rows.write().await;

        let index = rows
            .iter()
            .position(|row| self.has_key(row, &key))
            .ok_or_else(|| DataError::not_found(format!("no row with key {:?}", key)))?;

        rows.remove(index);
        debug!("Removed row {:?}", key);
        Ok(())
    }
}

/// Factory for the `memory` backend kind
pub struct MemorySourceFactory;

#[async_trait]
impl AccessPointFactory for MemorySourceFactory {
    fn kind(&self) -> &'static str {
        KIND
    }

    async fn create(&self, descriptor: &AccessPointDescriptor) -> Result<Arc<dyn AccessPoint>> {
        let keys = descriptor
            .list("keys")
            .unwrap_or_else(|| vec!["id".to_string()]);

        if keys.is_empty() {
            return Err(DataError::invalid_configuration(format!(
                "access point '{}' has an empty 'keys' list",
                descriptor.name
            )));
        }

        let rows = match descriptor.parameter("data") {
            Some(_) => {
                let path = descriptor.resolve_path("data")?;
                let raw = tokio::fs::read_to_string(&path).await.map_err(|e| {
                    error!("Failed to read seed data {}: {}", path.display(), e);
                    DataError::Io(format!("cannot read {}: {}", path.display(), e))
                })?;

                serde_json::from_str::<Vec<DataRow>>(&raw).map_err(|e| {
                    DataError::SerializationError(format!(
                        "{} is not a JSON array of objects: {}",
                        path.display(),
                        e
                    ))
                })?
            }
            None => Vec::new(),
        };

        debug!(
            "Memory access point {} keyed by {:?} with {} rows",
            descriptor.name,
            keys,
            rows.len()
        );

        Ok(Arc::new(MemorySource::with_rows(keys, rows)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::TryStreamExt;
    use portico_query::{parse_query, Operator};
    use serde_json::json;

    fn person(id: i64, name: &str) -> Item {
        Item::from_pairs([("id", json!(id)), ("name", json!(name))])
    }

    async fn people() -> MemorySource {
        let source = MemorySource::new(vec!["id".to_string()]);
        for (id, name) in [(1, "Ada"), (2, "Grace"), (3, "Ada")] {
            source.save(&person(id, name)).await.unwrap();
        }
        source
    }

    async fn search(source: &MemorySource, query: &str) -> Result<Vec<Item>> {
        source
            .search(parse_query(query).collect())
            .await?
            .try_collect()
            .await
    }

    #[test]
    fn test_kind() {
        let source = MemorySource::new(vec!["id".to_string()]);
        assert_eq!(source.kind(), "memory");
        assert_eq!(MemorySourceFactory.kind(), "memory");
    }

    #[tokio::test]
    async fn test_search_named_conditions() {
        let source = people().await;

        let found = search(&source, "/name=Ada/").await.unwrap();
        assert_eq!(found, vec![person(1, "Ada"), person(3, "Ada")]);

        let found = search(&source, "/name=Ada/id>1/").await.unwrap();
        assert_eq!(found, vec![person(3, "Ada")]);

        assert_eq!(search(&source, "/").await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_search_positional_binds_to_keys() {
        let source = people().await;

        let found = search(&source, "/2/").await.unwrap();
        assert_eq!(found, vec![person(2, "Grace")]);

        let err = search(&source, "/2/3/").await.unwrap_err();
        assert!(matches!(err, DataError::InvalidQuery(_)));
    }

    #[tokio::test]
    async fn test_bad_regex_is_reported() {
        let source = people().await;
        let stream = source
            .search(vec![Condition::new("name", Operator::Matches, "(")])
            .await
            .unwrap();

        let err = stream.try_collect::<Vec<_>>().await.unwrap_err();
        assert!(matches!(err, DataError::InvalidQuery(_)));
    }

    #[tokio::test]
    async fn test_save_replaces_by_key() {
        let source = people().await;
        source.save(&person(2, "Grace Hopper")).await.unwrap();

        assert_eq!(source.len().await, 3);
        let found = search(&source, "/2/").await.unwrap();
        assert_eq!(found, vec![person(2, "Grace Hopper")]);
    }

    #[tokio::test]
    async fn test_save_requires_keys() {
        let source = people().await;
        let err = source
            .save(&Item::from_pairs([("name", json!("Nobody"))]))
            .await
            .unwrap_err();
        assert!(matches!(err, DataError::InvalidItem(_)));
    }

    #[tokio::test]
    async fn test_remove() {
        let source = people().await;
        source.remove(&person(1, "Ada")).await.unwrap();
        assert_eq!(source.len().await, 2);

        let err = source.remove(&person(1, "Ada")).await.unwrap_err();
        assert!(matches!(err, DataError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_search_is_a_snapshot() {
        let source = people().await;
        let stream = source.search(Vec::new()).await.unwrap();

        source.save(&person(4, "Barbara")).await.unwrap();

        let items: Vec<Item> = stream.try_collect().await.unwrap();
        assert_eq!(items.len(), 3);
    }

    #[tokio::test]
    async fn test_factory_reads_seed_data() {
        let dir = tempfile::TempDir::new().unwrap();
        std::fs::write(
            dir.path().join("books.json"),
            r#"[{"isbn": "1", "title": "Dune"}, {"isbn": "2", "title": "Emma"}]"#,
        )
        .unwrap();

        let descriptor = AccessPointDescriptor::new("books", "memory")
            .with_base_dir(dir.path())
            .with_parameter("keys", "isbn")
            .with_parameter("data", "books.json");

        let source = MemorySourceFactory.create(&descriptor).await.unwrap();
        let source = source.as_ref().downcast_ref::<MemorySource>().unwrap();
        assert_eq!(source.keys(), ["isbn".to_string()]);
        assert_eq!(source.len().await, 2);
    }

    #[tokio::test]
    async fn test_factory_errors() {
        let dir = tempfile::TempDir::new().unwrap();

        let missing = AccessPointDescriptor::new("books", "memory")
            .with_base_dir(dir.path())
            .with_parameter("data", "missing.json");
        let err = MemorySourceFactory.create(&missing).await.err().unwrap();
        assert!(matches!(err, DataError::Io(_)));

        std::fs::write(dir.path().join("bad.json"), "{}").unwrap();
        let bad = missing.clone().with_parameter("data", "bad.json");
        let err = MemorySourceFactory.create(&bad).await.err().unwrap();
        assert!(matches!(err, DataError::SerializationError(_)));

        let no_keys = AccessPointDescriptor::new("books", "memory").with_parameter("keys", " , ");
        let err = MemorySourceFactory.create(&no_keys).await.err().unwrap();
        assert!(matches!(err, DataError::InvalidConfiguration(_)));
    }
}
