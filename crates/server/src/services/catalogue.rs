//! Public restaurant pages.
//!
//! A restaurant page (profile plus orderable menu) is cached with `moka`.
//! Anything that changes what customers see on the page must call
//! [`MenuCache::invalidate`].

use std::sync::Arc;
use std::time::Duration;

use gobble_core::RestaurantId;
use gobble_core::api::RestaurantDetail;
use moka::future::Cache;
use sqlx::PgPool;
use tracing::debug;

use crate::db::{MenuRepository, RepositoryError, RestaurantRepository};

/// Cache of restaurant pages keyed by restaurant.
#[derive(Clone)]
pub struct MenuCache {
    cache: Cache<RestaurantId, Arc<RestaurantDetail>>,
}

impl MenuCache {
    /// Create a cache whose entries live for `ttl`.
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        let cache = Cache::builder()
            .max_capacity(1000)
            .time_to_live(ttl)
            .build();
        Self { cache }
    }

    /// The page of an open restaurant, loading it on a miss.
    ///
    /// Returns `None` for unknown, unapproved, or banned restaurants; those
    /// are never cached.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if loading fails.
    pub async fn get_or_load(
        &self,
        pool: &PgPool,
        id: RestaurantId,
    ) -> Result<Option<Arc<RestaurantDetail>>, RepositoryError> {
        if let Some(detail) = self.cache.get(&id).await {
            debug!(restaurant_id = %id, "Restaurant page cache hit");
            return Ok(Some(detail));
        }

        let Some(restaurant) = RestaurantRepository::new(pool).get_open(id).await? else {
            return Ok(None);
        };
        let menu = MenuRepository::new(pool).list_available(id).await?;

        let detail = Arc::new(RestaurantDetail {
            restaurant: (&restaurant).into(),
            menu: menu.iter().map(Into::into).collect(),
        });
        self.cache.insert(id, Arc::clone(&detail)).await;
        Ok(Some(detail))
    }

    /// Drop a restaurant's cached page.
    pub async fn invalidate(&self, id: RestaurantId) {
        self.cache.invalidate(&id).await;
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use gobble_core::GeoPoint;
    use gobble_core::api::RestaurantView;

    use super::*;

    fn detail(id: RestaurantId) -> Arc<RestaurantDetail> {
        Arc::new(RestaurantDetail {
            restaurant: RestaurantView {
                id,
                name: "Pho Real".to_string(),
                description: String::new(),
                cuisine: "Vietnamese".to_string(),
                phone: "555-0100".to_string(),
                street: "1 Main St".to_string(),
                city: "Springfield".to_string(),
                location: GeoPoint::new(45.0, -122.0).unwrap(),
                delivery_radius_km: 5.0,
                approval_status: gobble_core::ApprovalStatus::Accepted,
            },
            menu: Vec::new(),
        })
    }

    #[tokio::test]
    async fn test_invalidate_removes_entry() {
        let cache = MenuCache::new(Duration::from_secs(60));
        let id = RestaurantId::new(1);
        cache.cache.insert(id, detail(id)).await;
        assert!(cache.cache.get(&id).await.is_some());

        cache.invalidate(id).await;
        assert!(cache.cache.get(&id).await.is_none());
    }
}
