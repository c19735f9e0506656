//! Service container for dependency injection
//!
//! Wires up all services with their dependencies.

use std::sync::Arc;

use crate::application::services::{JobsService, TransferService, WaitOptions, WaitService};
use crate::config::Settings;
use crate::domain::{Credentials, DomainError, VaultAddress};
use crate::infrastructure::api::HttpJobApi;
use crate::infrastructure::error::InfraResult;
use crate::infrastructure::traits::{JobApi, Pacer, ThreadPacer};
use crate::infrastructure::vault::open_vault;

/// Container holding the resolved credentials and the shared I/O boundaries.
pub struct ServiceContainer {
    /// Application settings
    pub settings: Arc<Settings>,

    /// Credentials resolved for this invocation
    pub creds: Credentials,

    /// Job API gateway
    pub api: Arc<dyn JobApi>,

    /// Pacing between status polls
    pub pacer: Arc<dyn Pacer>,
}

impl ServiceContainer {
    /// Create a new service container with real implementations.
    pub fn new(settings: Settings, creds: Credentials) -> InfraResult<Self> {
        let api = HttpJobApi::new(creds.clone(), settings.request_timeout())?;
        Ok(Self::with_deps(
            settings,
            creds,
            Arc::new(api),
            Arc::new(ThreadPacer),
        ))
    }

    /// Create a service container with custom dependencies (for testing).
    pub fn with_deps(
        settings: Settings,
        creds: Credentials,
        api: Arc<dyn JobApi>,
        pacer: Arc<dyn Pacer>,
    ) -> Self {
        Self {
            settings: Arc::new(settings),
            creds,
            api,
            pacer,
        }
    }

    pub fn jobs_service(&self) -> JobsService {
        JobsService::new(Arc::clone(&self.api))
    }

    pub fn wait_service(&self, options: WaitOptions) -> WaitService {
        WaitService::new(Arc::clone(&self.api), Arc::clone(&self.pacer), options)
    }

    /// Vault to use: `explicit` if given, the configured one otherwise.
    pub fn vault_address(&self, explicit: Option<&str>) -> Result<VaultAddress, DomainError> {
        match explicit {
            Some(raw) => VaultAddress::parse(raw),
            None => self.settings.vault_address(),
        }
    }

    /// Open a session on `address` for transfers and listings.
    pub fn transfer_service(&self, address: &VaultAddress) -> InfraResult<TransferService> {
        let session = open_vault(address, &self.creds)?;
        Ok(TransferService::new(session))
    }
}
