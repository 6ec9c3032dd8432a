//! Cross-role account queries: registration, credentials, identities, and
//! the admin account lists.
//!
//! Each role lives in its own table; [`account_table`] is the only place that
//! maps a role to its table name.

use chrono::{DateTime, Utc};
use gobble_core::api::{AccountListQuery, AccountSummary};
use gobble_core::listing::Page;
use gobble_core::{
    AccountRef, AccountRole, AdminRole, AdminUserId, ApprovalStatus, CustomerId, Email,
};
use sqlx::{PgPool, Postgres, QueryBuilder};

use super::bans::ACTIVE_BAN_SQL;
use super::{RepositoryError, conflict_on_unique, count, parse_email};
use crate::models::{AdminUser, Customer};

const fn account_table(role: AccountRole) -> &'static str {
    match role {
        AccountRole::Customer => "gobble.customer",
        AccountRole::Restaurant => "gobble.restaurant",
        AccountRole::Courier => "gobble.courier",
        AccountRole::Admin => "gobble.admin_user",
    }
}

/// Columns selecting `approval_status` and `admin_role` uniformly across roles.
const fn identity_columns(role: AccountRole) -> &'static str {
    match role {
        AccountRole::Customer => {
            "NULL::gobble.approval_status AS approval_status, NULL::gobble.admin_role AS admin_role"
        }
        AccountRole::Restaurant | AccountRole::Courier => {
            "approval_status, NULL::gobble.admin_role AS admin_role"
        }
        AccountRole::Admin => "NULL::gobble.approval_status AS approval_status, role AS admin_role",
    }
}

// =============================================================================
// Internal Row Types
// =============================================================================

#[derive(Debug, sqlx::FromRow)]
struct CustomerRow {
    id: i32,
    email: String,
    name: String,
    phone: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<CustomerRow> for Customer {
    type Error = RepositoryError;

    fn try_from(row: CustomerRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: CustomerId::new(row.id),
            email: parse_email(&row.email)?,
            name: row.name,
            phone: row.phone,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct AdminUserRow {
    id: i32,
    email: String,
    name: String,
    role: AdminRole,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<AdminUserRow> for AdminUser {
    type Error = RepositoryError;

    fn try_from(row: AdminUserRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: AdminUserId::new(row.id),
            email: parse_email(&row.email)?,
            name: row.name,
            role: row.role,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Name, email, and role-specific status of any account.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct AccountIdentity {
    pub id: i32,
    pub name: String,
    pub email: String,
    pub approval_status: Option<ApprovalStatus>,
    pub admin_role: Option<AdminRole>,
}

#[derive(Debug, sqlx::FromRow)]
struct CredentialRow {
    id: i32,
    password_hash: String,
}

#[derive(Debug, sqlx::FromRow)]
struct AccountSummaryRow {
    id: i32,
    name: String,
    email: String,
    approval_status: Option<ApprovalStatus>,
    is_banned: bool,
    created_at: DateTime<Utc>,
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for account operations that span roles.
pub struct AccountRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> AccountRepository<'a> {
    /// Create a new account repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Create a customer.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the email already exists.
    pub async fn create_customer(
        &self,
        email: &Email,
        name: &str,
        phone: Option<&str>,
        password_hash: &str,
    ) -> Result<Customer, RepositoryError> {
        let row = sqlx::query_as::<_, CustomerRow>(
            r"
            INSERT INTO gobble.customer (email, name, phone, password_hash)
            VALUES ($1, $2, $3, $4)
            RETURNING id, email, name, phone, created_at, updated_at
            ",
        )
        .bind(email.as_str())
        .bind(name)
        .bind(phone)
        .bind(password_hash)
        .fetch_one(self.pool)
        .await
        .map_err(|e| conflict_on_unique(e, "email already exists"))?;

        row.try_into()
    }

    /// Create an admin user.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the email already exists.
    pub async fn create_admin(
        &self,
        email: &Email,
        name: &str,
        role: AdminRole,
        password_hash: &str,
    ) -> Result<AdminUser, RepositoryError> {
        let row = sqlx::query_as::<_, AdminUserRow>(
            r"
            INSERT INTO gobble.admin_user (email, name, role, password_hash)
            VALUES ($1, $2, $3, $4)
            RETURNING id, email, name, role, created_at, updated_at
            ",
        )
        .bind(email.as_str())
        .bind(name)
        .bind(role)
        .bind(password_hash)
        .fetch_one(self.pool)
        .await
        .map_err(|e| conflict_on_unique(e, "email already exists"))?;

        row.try_into()
    }

    /// Get a customer by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_customer(&self, id: CustomerId) -> Result<Option<Customer>, RepositoryError> {
        let row = sqlx::query_as::<_, CustomerRow>(
            r"
            SELECT id, email, name, phone, created_at, updated_at
            FROM gobble.customer
            WHERE id = $1
            ",
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        row.map(TryInto::try_into).transpose()
    }

    /// Account id and password hash for a login attempt.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn find_credentials(
        &self,
        role: AccountRole,
        email: &Email,
    ) -> Result<Option<(i32, String)>, RepositoryError> {
        let sql = format!(
            "SELECT id, password_hash FROM {} WHERE email = $1",
            account_table(role)
        );
        let row = sqlx::query_as::<_, CredentialRow>(&sql)
            .bind(email.as_str())
            .fetch_optional(self.pool)
            .await?;

        Ok(row.map(|r| (r.id, r.password_hash)))
    }

    /// Name, email, and status of an account.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn identity(
        &self,
        account: AccountRef,
    ) -> Result<Option<AccountIdentity>, RepositoryError> {
        let sql = format!(
            "SELECT id, name, email, {} FROM {} WHERE id = $1",
            identity_columns(account.role),
            account_table(account.role)
        );
        let row = sqlx::query_as::<_, AccountIdentity>(&sql)
            .bind(account.id)
            .fetch_optional(self.pool)
            .await?;

        Ok(row)
    }

    /// Whether an account exists.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn exists(&self, account: AccountRef) -> Result<bool, RepositoryError> {
        let sql = format!(
            "SELECT EXISTS (SELECT 1 FROM {} WHERE id = $1)",
            account_table(account.role)
        );
        let exists: bool = sqlx::query_scalar(&sql)
            .bind(account.id)
            .fetch_one(self.pool)
            .await?;
        Ok(exists)
    }

    /// Set the approval status of a restaurant or courier.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the account does not exist or is
    /// not a restaurant/courier.
    pub async fn set_approval(
        &self,
        account: AccountRef,
        status: ApprovalStatus,
    ) -> Result<(), RepositoryError> {
        if !matches!(account.role, AccountRole::Restaurant | AccountRole::Courier) {
            return Err(RepositoryError::NotFound);
        }
        let sql = format!(
            "UPDATE {} SET approval_status = $1, updated_at = now() WHERE id = $2",
            account_table(account.role)
        );
        let result = sqlx::query(&sql)
            .bind(status)
            .bind(account.id)
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// One page of the admin account list for `role`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(
        &self,
        role: AccountRole,
        query: &AccountListQuery,
    ) -> Result<Page<AccountSummary>, RepositoryError> {
        let page_request = query.page_request();
        let has_approval = matches!(role, AccountRole::Restaurant | AccountRole::Courier);

        let mut select: QueryBuilder<'_, Postgres> = QueryBuilder::new(format!(
            "SELECT t.id, t.name, t.email, {} AS approval_status, t.created_at, \
             EXISTS (SELECT 1 FROM gobble.ban b WHERE b.target_role = ",
            if has_approval {
                "t.approval_status"
            } else {
                "NULL::gobble.approval_status"
            },
        ));
        select.push_bind(role);
        select.push(format!(
            " AND b.target_id = t.id AND {ACTIVE_BAN_SQL}) AS is_banned FROM {} t",
            account_table(role)
        ));
        push_account_filters(&mut select, query, has_approval);
        select.push(format!(
            " ORDER BY t.{col} {dir}, t.id {dir} LIMIT ",
            col = query.sort.column(),
            dir = query.direction.as_sql()
        ));
        select.push_bind(page_request.limit());
        select.push(" OFFSET ");
        select.push_bind(page_request.offset());

        let rows: Vec<AccountSummaryRow> = select.build_query_as().fetch_all(self.pool).await?;

        let mut total_query: QueryBuilder<'_, Postgres> =
            QueryBuilder::new(format!("SELECT COUNT(*) FROM {} t", account_table(role)));
        push_account_filters(&mut total_query, query, has_approval);
        let total: i64 = total_query.build_query_scalar().fetch_one(self.pool).await?;

        let items = rows
            .into_iter()
            .map(|r| AccountSummary {
                account: AccountRef::new(role, r.id),
                name: r.name,
                email: r.email,
                approval_status: r.approval_status,
                is_banned: r.is_banned,
                created_at: r.created_at,
            })
            .collect();

        Ok(Page::new(items, page_request, count(total)))
    }
}

fn push_account_filters<'q>(
    builder: &mut QueryBuilder<'q, Postgres>,
    query: &'q AccountListQuery,
    has_approval: bool,
) {
    builder.push(" WHERE TRUE");
    if let Some(search) = query.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        let pattern = format!("%{search}%");
        builder.push(" AND (t.name ILIKE ");
        builder.push_bind(pattern.clone());
        builder.push(" OR t.email ILIKE ");
        builder.push_bind(pattern);
        builder.push(")");
    }
    if has_approval && let Some(status) = query.status {
        builder.push(" AND t.approval_status = ");
        builder.push_bind(status);
    }
}
