//! Organization directory lookups.
//!
//! The main organization signs every notification email. It changes rarely,
//! so it is read through a TTL cache.

use std::sync::Arc;

use chrono::Duration;
use sea_orm::{ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter};

use campus_core::cache::ReadThroughCache;
use campus_core::clock::Clock;
use campus_shared::CacheConfig;

use crate::entities::organizations;

/// Cached access to organization data.
#[derive(Clone)]
pub struct OrganizationDirectory {
    db: DatabaseConnection,
    main: ReadThroughCache<(), Option<organizations::Model>>,
}

impl OrganizationDirectory {
    /// Creates a directory with the given cache settings.
    #[must_use]
    pub fn new(db: DatabaseConnection, clock: Arc<dyn Clock>, config: &CacheConfig) -> Self {
        let ttl = Duration::from_std(std::time::Duration::from_secs(config.ttl_secs))
            .unwrap_or(Duration::MAX);
        Self {
            db,
            main: ReadThroughCache::with_config(clock, config.max_capacity, ttl),
        }
    }

    /// Returns the main organization, if one is flagged.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn main_organization(&self) -> Result<Option<organizations::Model>, DbErr> {
        let db = &self.db;
        self.main
            .get_or_try_insert_with((), || async move {
                organizations::Entity::find()
                    .filter(organizations::Column::IsMain.eq(true))
                    .one(db)
                    .await
            })
            .await
    }

    /// Display name of the main organization.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn main_organization_name(&self) -> Result<Option<String>, DbErr> {
        Ok(self.main_organization().await?.map(|o| o.name))
    }
}
