//! Seed the database with restaurants, menus, coupons, and promotions.
//!
//! Reads a YAML file (see `crates/cli/seed/demo.yaml`), validates all of it
//! before connecting, then inserts what is not already there. Running the
//! same file twice is harmless: restaurants are matched by email, coupons by
//! code, and platform promotions by title.

use std::path::Path;

use gobble_core::api::{CouponInput, MenuItemInput, PromotionInput, RegisterRestaurant};
use gobble_core::pricing::normalize_coupon_code;
use gobble_core::{AccountRef, AccountRole, ApprovalStatus, Email, GeoPoint};
use gobble_server::db::{
    AccountRepository, CouponRepository, MenuRepository, PromotionRepository, RepositoryError,
    RestaurantRepository,
};
use gobble_server::services::auth::{AuthError, hash_password, validate_password};
use serde::Deserialize;
use sqlx::PgPool;
use thiserror::Error;
use tracing::{error, info};

use super::ConnectError;

#[derive(Debug, Error)]
pub enum SeedError {
    #[error(transparent)]
    Connect(#[from] ConnectError),

    #[error("Could not read {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },

    #[error("Invalid seed file: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("{0} validation errors found")]
    Invalid(usize),

    #[error("{0}")]
    Password(#[from] AuthError),

    #[error("Database error: {0}")]
    Repository(#[from] RepositoryError),
}

/// Top level of a seed file.
#[derive(Debug, Default, Deserialize)]
pub struct SeedFile {
    #[serde(default)]
    pub restaurants: Vec<SeedRestaurant>,
    #[serde(default)]
    pub coupons: Vec<CouponInput>,
    /// Platform-wide promotions.
    #[serde(default)]
    pub promotions: Vec<PromotionInput>,
}

#[derive(Debug, Deserialize)]
pub struct SeedRestaurant {
    #[serde(flatten)]
    pub account: RegisterRestaurant,
    /// Approve straight away so the restaurant shows up in listings.
    #[serde(default = "default_true")]
    pub approved: bool,
    #[serde(default)]
    pub menu: Vec<MenuItemInput>,
    #[serde(default)]
    pub promotions: Vec<PromotionInput>,
}

const fn default_true() -> bool {
    true
}

/// Counts reported at the end of a run.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct SeedReport {
    pub restaurants: usize,
    pub menu_items: usize,
    pub coupons: usize,
    pub promotions: usize,
    pub skipped: usize,
}

/// Every problem in the file, so they can be fixed in one go.
#[must_use]
pub fn validate(seed: &SeedFile) -> Vec<String> {
    let mut errors = Vec::new();

    for r in &seed.restaurants {
        let who = &r.account.email;
        if let Err(e) = Email::parse(who) {
            errors.push(format!("restaurant {who}: {e}"));
        }
        if let Err(e) = validate_password(&r.account.password) {
            errors.push(format!("restaurant {who}: {e}"));
        }
        if r.account.name.trim().is_empty() {
            errors.push(format!("restaurant {who}: name is required"));
        }
        let GeoPoint {
            latitude,
            longitude,
        } = r.account.location;
        if let Err(e) = GeoPoint::new(latitude, longitude) {
            errors.push(format!("restaurant {who}: {e}"));
        }
        let radius = r.account.delivery_radius_km;
        if radius.is_nan() || radius <= 0.0 {
            errors.push(format!("restaurant {who}: delivery radius must be positive"));
        }
        for item in &r.menu {
            if item.name.trim().is_empty() {
                errors.push(format!("restaurant {who}: menu item without a name"));
            }
            if item.price.is_zero() {
                errors.push(format!("restaurant {who}: {} has no price", item.name));
            }
        }
        for promo in &r.promotions {
            validate_promotion(promo, &mut errors);
        }
    }

    for coupon in &seed.coupons {
        if normalize_coupon_code(&coupon.code).is_empty() {
            errors.push("coupon without a code".to_owned());
        }
        if coupon.amount.is_zero() {
            errors.push(format!("coupon {}: amount must be positive", coupon.code));
        }
    }

    for promo in &seed.promotions {
        validate_promotion(promo, &mut errors);
    }

    errors
}

fn validate_promotion(promo: &PromotionInput, errors: &mut Vec<String>) {
    if promo.title.trim().is_empty() {
        errors.push("promotion without a title".to_owned());
    }
    if !(1..=100).contains(&promo.percentage) {
        errors.push(format!(
            "promotion {}: percentage must be between 1 and 100",
            promo.title
        ));
    }
}

/// Seed from a YAML file.
///
/// # Errors
///
/// Returns an error if the file cannot be read or is invalid, or a database
/// operation fails.
pub async fn from_file(path: &Path) -> Result<SeedReport, SeedError> {
    info!(path = %path.display(), "Loading seed data");
    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| SeedError::Read {
            path: path.display().to_string(),
            source,
        })?;
    let seed: SeedFile = serde_yaml::from_str(&content)?;

    let errors = validate(&seed);
    if !errors.is_empty() {
        error!("Seed file validation failed:");
        for err in &errors {
            error!("  - {err}");
        }
        return Err(SeedError::Invalid(errors.len()));
    }

    let pool = super::connect().await?;
    let report = apply(&pool, &seed).await?;

    info!("Seeding complete!");
    info!("  Restaurants created: {}", report.restaurants);
    info!("  Menu items created: {}", report.menu_items);
    info!("  Coupons created: {}", report.coupons);
    info!("  Promotions created: {}", report.promotions);
    info!("  Skipped (already exist): {}", report.skipped);
    Ok(report)
}

async fn apply(pool: &PgPool, seed: &SeedFile) -> Result<SeedReport, SeedError> {
    let mut report = SeedReport::default();
    let promotions = PromotionRepository::new(pool);

    for r in &seed.restaurants {
        let email = Email::parse(&r.account.email).map_err(AuthError::from)?;
        let password_hash = hash_password(&r.account.password)?;

        let restaurant = match RestaurantRepository::new(pool)
            .create(&email, &r.account, &password_hash)
            .await
        {
            Ok(restaurant) => restaurant,
            Err(RepositoryError::Conflict(_)) => {
                info!(%email, "Restaurant exists, skipping");
                report.skipped += 1;
                continue;
            }
            Err(e) => return Err(e.into()),
        };
        report.restaurants += 1;

        if r.approved {
            AccountRepository::new(pool)
                .set_approval(
                    AccountRef::new(AccountRole::Restaurant, restaurant.id.as_i32()),
                    ApprovalStatus::Accepted,
                )
                .await?;
        }

        let menu = MenuRepository::new(pool);
        for item in &r.menu {
            menu.create(restaurant.id, item).await?;
            report.menu_items += 1;
        }

        for promo in &r.promotions {
            let promo = PromotionInput {
                restaurant_id: Some(restaurant.id),
                ..promo.clone()
            };
            promotions.create(&promo).await?;
            report.promotions += 1;
        }
        info!(id = %restaurant.id, name = %restaurant.name, "Restaurant seeded");
    }

    let coupons = CouponRepository::new(pool);
    for coupon in &seed.coupons {
        match coupons.create(coupon).await {
            Ok(_) => report.coupons += 1,
            Err(RepositoryError::Conflict(_)) => report.skipped += 1,
            Err(e) => return Err(e.into()),
        }
    }

    let existing: Vec<String> = promotions
        .list(None)
        .await?
        .into_iter()
        .filter(|p| p.restaurant_id.is_none())
        .map(|p| p.title)
        .collect();
    for promo in &seed.promotions {
        if existing.iter().any(|title| title == promo.title.trim()) {
            report.skipped += 1;
            continue;
        }
        let promo = PromotionInput {
            restaurant_id: None,
            ..promo.clone()
        };
        promotions.create(&promo).await?;
        report.promotions += 1;
    }

    Ok(report)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use gobble_core::Money;

    use super::*;

    fn demo() -> SeedFile {
        serde_yaml::from_str(include_str!("../../seed/demo.yaml")).unwrap()
    }

    #[test]
    fn test_demo_file_is_valid() {
        let seed = demo();
        assert_eq!(seed.restaurants.len(), 3);
        assert!(validate(&seed).is_empty(), "{:?}", validate(&seed));
    }

    #[test]
    fn test_demo_defaults() {
        let seed = demo();
        let pho = seed.restaurants.first().unwrap();
        assert!(pho.approved);
        assert_eq!(pho.menu.first().unwrap().price, Money::from_cents(1350));
        assert!(pho.menu.iter().all(|item| item.is_available));

        let taco = seed.restaurants.last().unwrap();
        assert!(!taco.approved);
        assert!(taco.menu.is_empty());
    }

    #[test]
    fn test_validate_collects_every_problem() {
        let seed: SeedFile = serde_yaml::from_str(
            r#"
restaurants:
  - email: not-an-email
    password: short
    name: ""
    cuisine: Thai
    phone: "1"
    street: x
    city: y
    location: { latitude: 91.0, longitude: 0.0 }
    delivery_radius_km: 0
    menu:
      - name: Free lunch
        price: "0"
coupons:
  - code: "  "
    amount: "1.00"
promotions:
  - title: Too generous
    percentage: 150
"#,
        )
        .unwrap();

        let errors = validate(&seed);
        assert_eq!(errors.len(), 8, "{errors:?}");
        assert!(errors.iter().any(|e| e.contains("latitude")));
        assert!(errors.iter().any(|e| e.contains("Free lunch")));
    }
}
