//! Provider handles handed to the ingestion workflow.

use replica_kernel::{KnowledgeBaseProvider, ProviderId};
use std::fmt;
use std::sync::Arc;

/// A knowledge base client together with the id its breaker is keyed by.
#[derive(Clone)]
pub struct ProviderHandle {
    pub id: ProviderId,
    /// Human-readable name for logs.
    pub name: String,
    pub client: Arc<dyn KnowledgeBaseProvider>,
}

impl ProviderHandle {
    pub fn new(
        id: ProviderId,
        name: impl Into<String>,
        client: Arc<dyn KnowledgeBaseProvider>,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            client,
        }
    }
}

impl fmt::Debug for ProviderHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderHandle")
            .field("id", &self.id)
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// Which provider(s) a job may use.
#[derive(Debug, Clone)]
pub enum ProviderConfig {
    Single(ProviderHandle),
    /// Entry creation falls back from primary to secondary; the remaining
    /// steps stay on whichever provider created the entry.
    Dual {
        primary: ProviderHandle,
        secondary: ProviderHandle,
    },
}

impl ProviderConfig {
    /// One provider, keyed by its name.
    pub fn single(name: impl Into<String>, client: Arc<dyn KnowledgeBaseProvider>) -> Self {
        let name = name.into();
        ProviderConfig::Single(ProviderHandle::new(
            ProviderId::new(name.clone()),
            name,
            client,
        ))
    }

    /// Two providers, keyed `PRIMARY` and `SECONDARY`.
    pub fn dual(
        primary_name: impl Into<String>,
        primary: Arc<dyn KnowledgeBaseProvider>,
        secondary_name: impl Into<String>,
        secondary: Arc<dyn KnowledgeBaseProvider>,
    ) -> Self {
        ProviderConfig::Dual {
            primary: ProviderHandle::new(ProviderId::primary(), primary_name, primary),
            secondary: ProviderHandle::new(ProviderId::secondary(), secondary_name, secondary),
        }
    }

    pub fn primary(&self) -> &ProviderHandle {
        match self {
            ProviderConfig::Single(handle) => handle,
            ProviderConfig::Dual { primary, .. } => primary,
        }
    }

    pub fn secondary(&self) -> Option<&ProviderHandle> {
        match self {
            ProviderConfig::Single(_) => None,
            ProviderConfig::Dual { secondary, .. } => Some(secondary),
        }
    }

    pub fn handle(&self, id: &ProviderId) -> Option<&ProviderHandle> {
        std::iter::once(self.primary())
            .chain(self.secondary())
            .find(|handle| &handle.id == id)
    }
}
