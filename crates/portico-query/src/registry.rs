use crate::error::{DataError, Result};
use crate::traits::AccessPoint;
use crate::types::AccessPointDescriptor;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

/// Factory trait for creating access points from descriptors
#[async_trait]
pub trait AccessPointFactory: Send + Sync {
    /// Get the backend kind this factory handles
    fn kind(&self) -> &'static str;

    /// Create an access point, validating the parameters it needs
    async fn create(&self, descriptor: &AccessPointDescriptor) -> Result<Arc<dyn AccessPoint>>;
}

/// Table of backend kinds and their factories.
///
/// Filled once at startup and only read afterwards.
#[derive(Clone, Default)]
pub struct BackendRegistry {
    factories: HashMap<String, Arc<dyn AccessPointFactory>>,
}

impl BackendRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a factory for a backend kind
    pub fn register_factory(&mut self, factory: Arc<dyn AccessPointFactory>) {
        let kind = factory.kind();

        if self.factories.contains_key(kind) {
            warn!("Overwriting existing factory for backend: {}", kind);
        }

        self.factories.insert(kind.to_string(), factory);
        debug!("Registered factory for backend: {}", kind);
    }

    pub fn with_factory(mut self, factory: Arc<dyn AccessPointFactory>) -> Self {
        self.register_factory(factory);
        self
    }

    /// Create the access point a descriptor describes
    pub async fn create(&self, descriptor: &AccessPointDescriptor) -> Result<Arc<dyn AccessPoint>> {
        let factory = self
            .factories
            .get(&descriptor.kind)
            .ok_or_else(|| DataError::UnknownBackendKind(descriptor.kind.clone()))?;

        debug!(
            "Creating access point {} for backend: {}",
            descriptor.name, descriptor.kind
        );

        factory.create(descriptor).await
    }

    /// List registered backend kinds, sorted
    pub fn kinds(&self) -> Vec<String> {
        let mut kinds: Vec<String> = self.factories.keys().cloned().collect();
        kinds.sort();
        kinds
    }

    /// Check if a backend kind is registered
    pub fn has_kind(&self, kind: &str) -> bool {
        self.factories.contains_key(kind)
    }
}
