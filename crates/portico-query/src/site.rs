use crate::config::load_descriptors;
use crate::error::{DataError, NotOneObjectReturned, Result};
use crate::grammar::parse_query;
use crate::registry::BackendRegistry;
use crate::traits::{AccessPoint, ItemStream};
use crate::types::{AccessPointDescriptor, DataRow, Item};
use futures::{StreamExt, TryStreamExt};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

/// A set of named access points behind one query interface.
///
/// The access point map is fixed at construction, so a `Site` can be shared
/// between tasks without locking.
pub struct Site {
    access_points: HashMap<String, Arc<dyn AccessPoint>>,
    order: Vec<String>,
}

impl Site {
    /// Build a site from a configuration file.
    ///
    /// Fails on the first access point that cannot be created; no partially
    /// configured site is returned.
    pub async fn load(path: impl AsRef<Path>, registry: &BackendRegistry) -> Result<Self> {
        let descriptors = load_descriptors(path)?;
        Self::from_descriptors(descriptors, registry).await
    }

    /// Build a site from already parsed descriptors
    pub async fn from_descriptors(
        descriptors: impl IntoIterator<Item = AccessPointDescriptor>,
        registry: &BackendRegistry,
    ) -> Result<Self> {
        let mut access_points = HashMap::new();
        let mut order = Vec::new();

        for descriptor in descriptors {
            let source = registry.create(&descriptor).await?;
            if access_points
                .insert(descriptor.name.clone(), source)
                .is_none()
            {
                order.push(descriptor.name);
            }
        }

        info!("Site ready with {} access points", order.len());
        Ok(Self {
            access_points,
            order,
        })
    }

    /// Access point names in configuration order
    pub fn access_points(&self) -> &[String] {
        &self.order
    }

    /// Get the backend behind an access point
    pub fn access_point(&self, name: &str) -> Result<&Arc<dyn AccessPoint>> {
        self.access_points
            .get(name)
            .ok_or_else(|| DataError::UnknownAccessPoint(name.to_string()))
    }

    /// List all items in `access_point` matching `query`.
    ///
    /// See [`parse_query`] for the query syntax. Items come back bound to
    /// `access_point` so they can be passed to [`Site::save`] and
    /// [`Site::remove`].
    pub async fn search(&self, access_point: &str, query: &str) -> Result<ItemStream> {
        let source = self.access_point(access_point)?;
        let conditions: Vec<_> = parse_query(query).collect();

        debug!(
            "Searching {} with {} conditions: {:?}",
            access_point,
            conditions.len(),
            conditions
        );

        let name = access_point.to_string();
        let items = source.search(conditions).await?;

        Ok(items
            .map_ok(move |item| item.bound_to(name.clone()))
            .boxed())
    }

    /// Return the only item in `access_point` matching `query`.
    ///
    /// Fails with [`NotOneObjectReturned::ObjectDoesNotExist`] when nothing
    /// matches and [`NotOneObjectReturned::MultipleObjectsReturned`] when
    /// more than one item does.
    pub async fn open(&self, access_point: &str, query: &str) -> Result<Item> {
        let mut items = self.search(access_point, query).await?;

        let item = items
            .try_next()
            .await?
            .ok_or(NotOneObjectReturned::ObjectDoesNotExist)?;

        match items.try_next().await? {
            None => Ok(item),
            Some(_) => Err(NotOneObjectReturned::MultipleObjectsReturned.into()),
        }
    }

    /// New item bound to `access_point`, ready to be saved
    pub fn create_item(&self, access_point: &str, properties: DataRow) -> Result<Item> {
        self.access_point(access_point)?;
        Ok(Item::new(properties).bound_to(access_point))
    }

    /// Update or add the item in its access point
    pub async fn save(&self, item: &Item) -> Result<()> {
        let (name, source) = self.owner(item)?;
        debug!("Saving item in {}", name);
        source.save(item).await
    }

    /// Remove the item from its access point
    pub async fn remove(&self, item: &Item) -> Result<()> {
        let (name, source) = self.owner(item)?;
        debug!("Removing item from {}", name);
        source.remove(item).await
    }

    fn owner<'a>(&self, item: &'a Item) -> Result<(&'a str, &Arc<dyn AccessPoint>)> {
        let name = item.access_point().ok_or(DataError::UnboundItem)?;
        Ok((name, self.access_point(name)?))
    }
}
