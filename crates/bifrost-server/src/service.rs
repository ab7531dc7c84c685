//! Endpoint service.
//!
//! The narrow surface the RPC layer calls: register an endpoint, list
//! endpoints. Provisioning the tunnel for a new endpoint is left to the
//! caller once `create_endpoint` returns.

use tracing::info;

use bifrost_core::Config;
use bifrost_store::{Endpoint, EnvelopeStore, StoreError};

use crate::bootstrap::bootstrap;

#[derive(Debug, Clone)]
pub struct EndpointService {
    store: EnvelopeStore,
}

impl EndpointService {
    pub const fn new(store: EnvelopeStore) -> Self {
        Self { store }
    }

    pub const fn store(&self) -> &EnvelopeStore {
        &self.store
    }

    /// Register an endpoint and return the acknowledgment message.
    pub async fn create_endpoint(&self, endpoint: Endpoint) -> Result<String, StoreError> {
        if endpoint.name.trim().is_empty() {
            return Err(StoreError::Validation("endpoint name is required".to_string()));
        }
        let stored = self.store.put(&endpoint.name, &endpoint, None).await?;
        info!(
            name = %endpoint.name,
            owner = %stored.owner_id,
            resource_tag = %stored.resource_tag,
            "Endpoint created"
        );
        Ok(format!("{} is a winner", stored.owner_id))
    }

    /// All registered endpoints, each tagged with its resource id.
    pub async fn list_endpoints(&self) -> Result<Vec<Endpoint>, StoreError> {
        self.store.list_by_type(None).await
    }
}

/// Wires an [`EndpointService`] from configuration.
pub struct ServiceFactory;

impl ServiceFactory {
    pub async fn create(config: &Config) -> anyhow::Result<EndpointService> {
        Ok(EndpointService::new(bootstrap(&config.store).await?))
    }
}
