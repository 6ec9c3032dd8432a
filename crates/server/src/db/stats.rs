//! Admin dashboard aggregates.

use gobble_core::Money;
use gobble_core::api::DashboardStats;
use sqlx::PgPool;

use super::RepositoryError;
use super::bans::ACTIVE_BAN_SQL;

#[derive(Debug, sqlx::FromRow)]
struct StatsRow {
    customers: i64,
    restaurants: i64,
    couriers: i64,
    pending_restaurants: i64,
    pending_couriers: i64,
    orders_today: i64,
    revenue_today: Money,
    active_bans: i64,
}

/// Repository for dashboard statistics.
pub struct StatsRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> StatsRepository<'a> {
    /// Create a new stats repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Counts for the admin dashboard. "Today" is the current UTC day;
    /// revenue excludes rejected and cancelled orders.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn dashboard(&self) -> Result<DashboardStats, RepositoryError> {
        let sql = format!(
            r"
            SELECT
                (SELECT COUNT(*) FROM gobble.customer) AS customers,
                (SELECT COUNT(*) FROM gobble.restaurant) AS restaurants,
                (SELECT COUNT(*) FROM gobble.courier) AS couriers,
                (SELECT COUNT(*) FROM gobble.restaurant WHERE approval_status = 'pending')
                    AS pending_restaurants,
                (SELECT COUNT(*) FROM gobble.courier WHERE approval_status = 'pending')
                    AS pending_couriers,
                (SELECT COUNT(*) FROM gobble.customer_order
                 WHERE created_at >= date_trunc('day', now() AT TIME ZONE 'UTC') AT TIME ZONE 'UTC')
                    AS orders_today,
                (SELECT COALESCE(SUM(total), 0)::NUMERIC(10, 2) FROM gobble.customer_order
                 WHERE created_at >= date_trunc('day', now() AT TIME ZONE 'UTC') AT TIME ZONE 'UTC'
                   AND status NOT IN ('rejected', 'cancelled'))
                    AS revenue_today,
                (SELECT COUNT(*) FROM gobble.ban b WHERE {ACTIVE_BAN_SQL}) AS active_bans
            "
        );
        let row = sqlx::query_as::<_, StatsRow>(&sql)
            .fetch_one(self.pool)
            .await?;

        Ok(DashboardStats {
            customers: row.customers,
            restaurants: row.restaurants,
            couriers: row.couriers,
            pending_restaurants: row.pending_restaurants,
            pending_couriers: row.pending_couriers,
            orders_today: row.orders_today,
            revenue_today: row.revenue_today,
            active_bans: row.active_bans,
        })
    }
}
