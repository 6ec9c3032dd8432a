//! Account models: customers, restaurants, couriers, admins, and the
//! authenticated principal.

use chrono::{DateTime, Utc};
use gobble_core::api::{AdminUserView, CourierView, RestaurantView, SessionInfo};
use gobble_core::checkout::DeliveryZone;
use gobble_core::{
    AccountRef, AccountRole, AdminRole, AdminUserId, ApprovalStatus, CourierId, CustomerId, Email,
    GeoPoint, RestaurantId,
};

/// A customer account.
#[derive(Debug, Clone)]
pub struct Customer {
    pub id: CustomerId,
    pub email: Email,
    pub name: String,
    pub phone: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A restaurant account and its public profile.
#[derive(Debug, Clone)]
pub struct Restaurant {
    pub id: RestaurantId,
    pub email: Email,
    pub name: String,
    pub description: String,
    pub cuisine: String,
    pub phone: String,
    pub street: String,
    pub city: String,
    pub location: GeoPoint,
    pub delivery_radius_km: f64,
    pub approval_status: ApprovalStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Restaurant {
    #[must_use]
    pub const fn delivery_zone(&self) -> DeliveryZone {
        DeliveryZone::new(self.location, self.delivery_radius_km)
    }
}

impl From<&Restaurant> for RestaurantView {
    fn from(r: &Restaurant) -> Self {
        Self {
            id: r.id,
            name: r.name.clone(),
            description: r.description.clone(),
            cuisine: r.cuisine.clone(),
            phone: r.phone.clone(),
            street: r.street.clone(),
            city: r.city.clone(),
            location: r.location,
            delivery_radius_km: r.delivery_radius_km,
            approval_status: r.approval_status,
        }
    }
}

/// A courier account.
#[derive(Debug, Clone)]
pub struct Courier {
    pub id: CourierId,
    pub email: Email,
    pub name: String,
    pub phone: String,
    pub vehicle: String,
    pub approval_status: ApprovalStatus,
    pub is_available: bool,
    pub location: Option<GeoPoint>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&Courier> for CourierView {
    fn from(c: &Courier) -> Self {
        Self {
            id: c.id,
            email: c.email.to_string(),
            name: c.name.clone(),
            phone: c.phone.clone(),
            vehicle: c.vehicle.clone(),
            approval_status: c.approval_status,
            is_available: c.is_available,
            location: c.location,
        }
    }
}

/// An admin user.
#[derive(Debug, Clone)]
pub struct AdminUser {
    pub id: AdminUserId,
    pub email: Email,
    pub name: String,
    pub role: AdminRole,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&AdminUser> for AdminUserView {
    fn from(a: &AdminUser) -> Self {
        Self {
            id: a.id,
            email: a.email.to_string(),
            name: a.name.clone(),
            role: a.role,
        }
    }
}

/// The account behind a valid bearer token.
///
/// Resolved once per request by the auth extractors.
#[derive(Debug, Clone)]
pub struct Principal {
    pub token_id: i64,
    pub account: AccountRef,
    pub name: String,
    pub email: String,
    pub approval_status: Option<ApprovalStatus>,
    pub admin_role: Option<AdminRole>,
    pub expires_at: DateTime<Utc>,
}

impl Principal {
    #[must_use]
    pub const fn role(&self) -> AccountRole {
        self.account.role
    }

    #[must_use]
    pub const fn customer_id(&self) -> CustomerId {
        CustomerId::new(self.account.id)
    }

    #[must_use]
    pub const fn restaurant_id(&self) -> RestaurantId {
        RestaurantId::new(self.account.id)
    }

    #[must_use]
    pub const fn courier_id(&self) -> CourierId {
        CourierId::new(self.account.id)
    }

    #[must_use]
    pub const fn admin_id(&self) -> AdminUserId {
        AdminUserId::new(self.account.id)
    }

    #[must_use]
    pub fn session_info(&self) -> SessionInfo {
        SessionInfo {
            role: self.account.role,
            account_id: self.account.id,
            name: self.name.clone(),
            email: self.email.clone(),
            approval_status: self.approval_status,
            admin_role: self.admin_role,
            expires_at: self.expires_at,
        }
    }
}
