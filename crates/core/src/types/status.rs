//! Status and role enums.

use serde::{Deserialize, Serialize};

/// Approval state of a restaurant or courier account.
///
/// Assigned by admins. Only `Accepted` accounts can use their dashboards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "gobble.approval_status", rename_all = "snake_case")
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ApprovalStatus {
    #[default]
    Pending,
    Accepted,
    Rejected,
}

impl ApprovalStatus {
    /// Whether the account may use its dashboard.
    #[must_use]
    pub const fn is_accepted(self) -> bool {
        matches!(self, Self::Accepted)
    }
}

/// Lifecycle of an order.
///
/// ```text
/// PENDING -> ACCEPTED -> READY -> PICKED_UP -> DELIVERED
///    |  \
///    |   -> REJECTED   (restaurant)
///     ----> CANCELLED  (customer)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "gobble.order_status", rename_all = "snake_case")
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    #[default]
    Pending,
    Accepted,
    Ready,
    PickedUp,
    Delivered,
    Rejected,
    Cancelled,
}

impl OrderStatus {
    /// Whether `self -> next` is an allowed transition.
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Accepted | Self::Rejected | Self::Cancelled)
                | (Self::Accepted, Self::Ready)
                | (Self::Ready, Self::PickedUp)
                | (Self::PickedUp, Self::Delivered)
        )
    }

    /// Whether no further transitions are possible.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Delivered | Self::Rejected | Self::Cancelled)
    }

    /// Whether the order ended without being fulfilled. Discounts it used
    /// are given back.
    #[must_use]
    pub const fn is_void(self) -> bool {
        matches!(self, Self::Rejected | Self::Cancelled)
    }

    /// Whether a courier can still take the order.
    #[must_use]
    pub const fn is_dispatchable(self) -> bool {
        matches!(self, Self::Accepted | Self::Ready)
    }

    /// Database/wire name, e.g. `picked_up`.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Accepted => "accepted",
            Self::Ready => "ready",
            Self::PickedUp => "picked_up",
            Self::Delivered => "delivered",
            Self::Rejected => "rejected",
            Self::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The kind of account behind a principal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "gobble.account_role", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum AccountRole {
    Customer,
    Restaurant,
    Courier,
    Admin,
}

impl AccountRole {
    /// Whether admins can ban accounts of this role.
    #[must_use]
    pub const fn is_bannable(self) -> bool {
        !matches!(self, Self::Admin)
    }
}

impl std::fmt::Display for AccountRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Customer => write!(f, "customer"),
            Self::Restaurant => write!(f, "restaurant"),
            Self::Courier => write!(f, "courier"),
            Self::Admin => write!(f, "admin"),
        }
    }
}

impl std::str::FromStr for AccountRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "customer" => Ok(Self::Customer),
            "restaurant" => Ok(Self::Restaurant),
            "courier" => Ok(Self::Courier),
            "admin" => Ok(Self::Admin),
            _ => Err(format!("invalid account role: {s}")),
        }
    }
}

/// Admin role with different permission levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "gobble.admin_role", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum AdminRole {
    /// Full access, including creating other admins.
    SuperAdmin,
    /// Moderation: approvals, bans, coupons, promotions.
    Admin,
    /// Read-only access to dashboards and lists.
    Viewer,
}

impl AdminRole {
    /// Whether this role may change marketplace state.
    #[must_use]
    pub const fn can_moderate(self) -> bool {
        matches!(self, Self::SuperAdmin | Self::Admin)
    }
}

impl std::fmt::Display for AdminRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::SuperAdmin => write!(f, "super_admin"),
            Self::Admin => write!(f, "admin"),
            Self::Viewer => write!(f, "viewer"),
        }
    }
}

impl std::str::FromStr for AdminRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "super_admin" => Ok(Self::SuperAdmin),
            "admin" => Ok(Self::Admin),
            "viewer" => Ok(Self::Viewer),
            _ => Err(format!("invalid admin role: {s}")),
        }
    }
}

/// Reference to any account: its role plus the role-specific id.
///
/// Used where several account kinds share one column pair, such as message
/// senders, notification recipients and ban targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AccountRef {
    pub role: AccountRole,
    pub id: i32,
}

impl AccountRef {
    #[must_use]
    pub const fn new(role: AccountRole, id: i32) -> Self {
        Self { role, id }
    }
}

impl std::fmt::Display for AccountRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.role, self.id)
    }
}

/// What a notification is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "gobble.notification_kind", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    OrderPlaced,
    OrderAccepted,
    OrderRejected,
    OrderReady,
    CourierAssigned,
    OrderPickedUp,
    OrderDelivered,
    OrderCancelled,
    NewMessage,
    AccountUpdate,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_happy_path_transitions() {
        let path = [
            OrderStatus::Pending,
            OrderStatus::Accepted,
            OrderStatus::Ready,
            OrderStatus::PickedUp,
            OrderStatus::Delivered,
        ];
        for pair in path.windows(2) {
            if let [from, to] = pair {
                assert!(from.can_transition_to(*to), "{from} -> {to}");
            }
        }
    }

    #[test]
    fn test_order_rejects_skips_and_reversals() {
        assert!(!OrderStatus::Pending.can_transition_to(OrderStatus::Ready));
        assert!(!OrderStatus::Ready.can_transition_to(OrderStatus::Accepted));
        assert!(!OrderStatus::Accepted.can_transition_to(OrderStatus::Cancelled));
        assert!(!OrderStatus::Delivered.can_transition_to(OrderStatus::Pending));
    }

    #[test]
    fn test_terminal_states_have_no_exits() {
        let all = [
            OrderStatus::Pending,
            OrderStatus::Accepted,
            OrderStatus::Ready,
            OrderStatus::PickedUp,
            OrderStatus::Delivered,
            OrderStatus::Rejected,
            OrderStatus::Cancelled,
        ];
        for from in all.iter().filter(|s| s.is_terminal()) {
            for to in all {
                assert!(!from.can_transition_to(to));
            }
        }
    }

    #[test]
    fn test_void_states() {
        assert!(OrderStatus::Rejected.is_void());
        assert!(OrderStatus::Cancelled.is_void());
        assert!(!OrderStatus::Delivered.is_void());
        assert!(!OrderStatus::Pending.is_void());
    }

    #[test]
    fn test_approval_serializes_screaming() {
        let json = serde_json::to_string(&ApprovalStatus::Accepted).unwrap_or_default();
        assert_eq!(json, "\"ACCEPTED\"");
    }

    #[test]
    fn test_order_status_wire_name() {
        let json = serde_json::to_string(&OrderStatus::PickedUp).unwrap_or_default();
        assert_eq!(json, "\"PICKED_UP\"");
        assert_eq!(OrderStatus::PickedUp.as_str(), "picked_up");
    }

    #[test]
    fn test_account_role_roundtrip() {
        for role in [
            AccountRole::Customer,
            AccountRole::Restaurant,
            AccountRole::Courier,
            AccountRole::Admin,
        ] {
            assert_eq!(role.to_string().parse::<AccountRole>(), Ok(role));
        }
        assert!(!AccountRole::Admin.is_bannable());
    }

    #[test]
    fn test_account_ref_display() {
        let target = AccountRef::new(AccountRole::Courier, 42);
        assert_eq!(target.to_string(), "courier:42");
    }

    #[test]
    fn test_viewer_cannot_moderate() {
        assert!(!AdminRole::Viewer.can_moderate());
        assert!(AdminRole::Admin.can_moderate());
        assert_eq!("super_admin".parse::<AdminRole>(), Ok(AdminRole::SuperAdmin));
    }
}
