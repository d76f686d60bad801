//! Application state shared across all handlers.

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;

use crate::config::Config;
use crate::db;
use crate::file::{FileStorage, LocalFileStorage};
use crate::services::{AccountService, AdminService, AuthoringService, BrowseService};
use crate::store::{ContentStore, PgContentStore};
use crate::theme::ThemeEngine;

/// Shared application state.
///
/// Wrapped in Arc internally so Clone is cheap.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    /// Content and account storage.
    store: Arc<dyn ContentStore>,

    /// Tera theme engine.
    theme: ThemeEngine,

    browse: BrowseService,
    authoring: AuthoringService,
    admin: AdminService,
    accounts: AccountService,

    /// Site name shown in page titles.
    site_name: String,
}

impl AppState {
    /// Connect to PostgreSQL, apply migrations, and wire up the services.
    pub async fn new(config: &Config) -> Result<Self> {
        let pool = db::create_pool(config)
            .await
            .context("failed to create database pool")?;

        db::run_migrations(&pool)
            .await
            .context("failed to run migrations")?;
        info!("database migrations applied");

        let store: Arc<dyn ContentStore> = Arc::new(PgContentStore::new(pool));
        let files: Arc<dyn FileStorage> = Arc::new(LocalFileStorage::new(
            &config.uploads_dir,
            &config.files_url,
        ));

        Self::from_parts(
            store,
            files,
            config.templates_dir.as_deref(),
            &config.site_name,
        )
    }

    /// Assemble state from already-built backends.
    pub fn from_parts(
        store: Arc<dyn ContentStore>,
        files: Arc<dyn FileStorage>,
        templates_dir: Option<&std::path::Path>,
        site_name: &str,
    ) -> Result<Self> {
        let theme = ThemeEngine::new(templates_dir, files.clone())
            .context("failed to initialize theme engine")?;

        Ok(Self {
            inner: Arc::new(AppStateInner {
                browse: BrowseService::new(store.clone()),
                authoring: AuthoringService::new(store.clone(), files),
                admin: AdminService::new(store.clone()),
                accounts: AccountService::new(store.clone()),
                store,
                theme,
                site_name: site_name.to_string(),
            }),
        })
    }

    pub fn store(&self) -> &Arc<dyn ContentStore> {
        &self.inner.store
    }

    pub fn theme(&self) -> &ThemeEngine {
        &self.inner.theme
    }

    pub fn browse(&self) -> &BrowseService {
        &self.inner.browse
    }

    pub fn authoring(&self) -> &AuthoringService {
        &self.inner.authoring
    }

    pub fn admin(&self) -> &AdminService {
        &self.inner.admin
    }

    pub fn accounts(&self) -> &AccountService {
        &self.inner.accounts
    }

    pub fn site_name(&self) -> &str {
        &self.inner.site_name
    }

    /// Check if the content store is reachable.
    pub async fn store_healthy(&self) -> bool {
        self.inner.store.healthy().await
    }
}
