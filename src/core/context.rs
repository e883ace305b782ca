//! Application context built once at startup and handed to every component.
//!
//! Nothing in the crate reaches for a global: the store, the registry, the mirror
//! manager and the Perforce workspace all hang off an [`AppContext`], so tests can
//! build as many isolated contexts as they like on temporary directories.

use crate::core::access::{HttpOriginVerifier, OriginGate, OriginPolicy, OriginVerifier};
use crate::core::config::{PerforceSettings, Settings};
use crate::core::dirs::AppPaths;
use crate::core::error::{Result, SourceBridgeError};
use crate::core::git_sync::GitSyncManager;
use crate::core::perforce::transport::P4Transport;
use crate::core::perforce::{CliTransport, PerforceManager};
use crate::core::registry::{AddMode, RegistryOptions, RepoRegistry};
use crate::core::store::JsonStore;
use parking_lot::RwLock;
use std::sync::Arc;

pub struct AppContext {
    pub paths: AppPaths,
    pub store: Arc<JsonStore>,
    pub registry: Arc<RepoRegistry>,
    pub git: GitSyncManager,
    pub origin_gate: OriginGate,
    settings: RwLock<Settings>,
    perforce: RwLock<Option<Arc<PerforceManager>>>,
}

impl AppContext {
    /// Open the store under `paths` and restore the registry. Must run inside a
    /// tokio runtime.
    pub fn init(paths: AppPaths) -> Result<Self> {
        let store = Arc::new(JsonStore::open(paths.store_file())?);
        Self::build(paths, store, Arc::new(HttpOriginVerifier::default()))
    }

    pub fn build(
        paths: AppPaths,
        store: Arc<JsonStore>,
        verifier: Arc<dyn OriginVerifier>,
    ) -> Result<Self> {
        let settings = Settings::load(&store);

        let options = RegistryOptions {
            add_mode: if settings.strict_add {
                AddMode::Strict
            } else {
                AddMode::Lenient
            },
            ..RegistryOptions::default()
        };
        let registry = Arc::new(RepoRegistry::load(Arc::clone(&store), options)?);
        let git = GitSyncManager::new(paths.git_mirror_root(), settings.bitbucket.clone());
        let origin_gate = OriginGate::new(
            OriginPolicy::default(),
            verifier,
            settings.skip_origin_verification,
        );

        log::debug!("Context ready at {}", paths.root.display());

        Ok(Self {
            paths,
            store,
            registry,
            git,
            origin_gate,
            settings: RwLock::new(settings),
            perforce: RwLock::new(None),
        })
    }

    pub fn settings(&self) -> Settings {
        self.settings.read().clone()
    }

    /// The connected workspace, if `connect_perforce` has succeeded
    pub fn perforce(&self) -> Result<Arc<PerforceManager>> {
        self.perforce
            .read()
            .clone()
            .ok_or(SourceBridgeError::PerforceNotConnected)
    }

    /// Persist new Perforce settings and reconnect with them. The previous
    /// workspace stays in place when the new settings do not connect.
    pub async fn update_perforce_settings(
        &self,
        settings: PerforceSettings,
    ) -> Result<Arc<PerforceManager>> {
        let transport = CliTransport::new(settings.clone());
        transport.check_cli_version().await?;
        let manager = self.connect_perforce_with(Arc::new(transport)).await?;

        let mut current = self.settings.write();
        current.perforce = Some(settings);
        current.save(&self.store)?;
        Ok(manager)
    }

    /// Connect with the persisted Perforce settings
    pub async fn connect_perforce(&self) -> Result<Arc<PerforceManager>> {
        let settings = self.settings().perforce.unwrap_or_default();
        let transport = CliTransport::new(settings);
        transport.check_cli_version().await?;
        self.connect_perforce_with(Arc::new(transport)).await
    }

    pub async fn connect_perforce_with(
        &self,
        transport: Arc<dyn P4Transport>,
    ) -> Result<Arc<PerforceManager>> {
        let manager = Arc::new(
            PerforceManager::connect(
                transport,
                Arc::clone(&self.registry),
                self.paths.perforce_root(),
            )
            .await?,
        );
        *self.perforce.write() = Some(Arc::clone(&manager));
        Ok(manager)
    }
}
