//! Backend type to connector constructor table.

use super::{BlockingPool, DatabaseConnector};
use crate::models::{BackendType, ConnectionDescriptor};
use crate::{Result, error::SqlWardenError};
use std::collections::HashMap;
use std::sync::Arc;

/// Builds an unconnected connector for a descriptor.
pub type ConnectorConstructor = Arc<
    dyn Fn(&ConnectionDescriptor, &BlockingPool) -> Box<dyn DatabaseConnector> + Send + Sync,
>;

/// Closed table of connector constructors, built once at startup.
///
/// # Example
/// ```rust
/// use sqlwarden_core::connectors::ConnectorRegistry;
/// use sqlwarden_core::models::BackendType;
///
/// let registry = ConnectorRegistry::empty();
/// assert!(!registry.supports(BackendType::Oracle));
/// ```
#[derive(Clone, Default)]
pub struct ConnectorRegistry {
    constructors: HashMap<BackendType, ConnectorConstructor>,
}

impl std::fmt::Debug for ConnectorRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectorRegistry")
            .field("backends", &self.backends())
            .finish()
    }
}

impl ConnectorRegistry {
    /// Registry without any backend.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Registry with every backend compiled into this build.
    pub fn builtin() -> Self {
        #[allow(unused_mut)]
        let mut registry = Self::empty();

        #[cfg(feature = "postgresql")]
        {
            registry = registry.register(BackendType::Postgres, |descriptor, _| {
                Box::new(super::postgres::PostgresConnector::new(descriptor.clone()))
            });
        }

        #[cfg(feature = "mysql")]
        {
            registry = registry.register(BackendType::MySql, |descriptor, _| {
                Box::new(super::mysql::MySqlConnector::new(descriptor.clone()))
            });
        }

        #[cfg(feature = "oracle")]
        {
            registry = registry.register(BackendType::Oracle, |descriptor, pool| {
                Box::new(super::oracle::OracleConnector::new(
                    descriptor.clone(),
                    pool.clone(),
                ))
            });
        }

        registry
    }

    /// Adds or replaces the constructor for `backend`.
    pub fn register<F>(mut self, backend: BackendType, constructor: F) -> Self
    where
        F: Fn(&ConnectionDescriptor, &BlockingPool) -> Box<dyn DatabaseConnector>
            + Send
            + Sync
            + 'static,
    {
        self.constructors.insert(backend, Arc::new(constructor));
        self
    }

    /// Whether a constructor is registered for `backend`
    pub fn supports(&self, backend: BackendType) -> bool {
        self.constructors.contains_key(&backend)
    }

    /// Registered backends in declaration order
    pub fn backends(&self) -> Vec<BackendType> {
        BackendType::ALL
            .into_iter()
            .filter(|backend| self.supports(*backend))
            .collect()
    }

    /// Instantiates an unconnected connector for the descriptor's backend.
    ///
    /// # Errors
    /// Returns `UnsupportedBackend` when the backend is not registered, for
    /// instance because its cargo feature is disabled.
    pub fn create(
        &self,
        descriptor: &ConnectionDescriptor,
        pool: &BlockingPool,
    ) -> Result<Box<dyn DatabaseConnector>> {
        let constructor = self
            .constructors
            .get(&descriptor.backend_type)
            .ok_or_else(|| SqlWardenError::unsupported_backend(descriptor.backend_type.as_str()))?;

        Ok(constructor(descriptor, pool))
    }
}
