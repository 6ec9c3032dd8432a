//! In-app notifications for the signed-in account.

use axum::{
    Json,
    extract::{Path, Query, State},
};
use gobble_core::NotificationId;
use gobble_core::api::{NotificationView, UnreadCount, Updated};
use gobble_core::listing::Page;
use tracing::instrument;

use super::{PageQuery, not_found};
use crate::db::NotificationRepository;
use crate::error::Result;
use crate::middleware::Authenticated;
use crate::state::AppState;

/// GET /api/notifications
#[instrument(skip(state, principal), fields(account = %principal.account))]
pub async fn index(
    State(state): State<AppState>,
    Authenticated(principal): Authenticated,
    Query(query): Query<PageQuery>,
) -> Result<Json<Page<NotificationView>>> {
    let page = NotificationRepository::new(state.pool())
        .list(principal.account, query.page_request())
        .await?;
    Ok(Json(page.map(|n| NotificationView::from(&n))))
}

/// Polled by the client for the badge count.
///
/// GET /api/notifications/unread-count
pub async fn unread_count(
    State(state): State<AppState>,
    Authenticated(principal): Authenticated,
) -> Result<Json<UnreadCount>> {
    let unread = NotificationRepository::new(state.pool())
        .unread_count(principal.account)
        .await?;
    Ok(Json(UnreadCount { unread }))
}

/// POST /api/notifications/{id}/read
#[instrument(skip(state, principal), fields(account = %principal.account))]
pub async fn mark_read(
    State(state): State<AppState>,
    Authenticated(principal): Authenticated,
    Path(id): Path<NotificationId>,
) -> Result<Json<NotificationView>> {
    let notification = NotificationRepository::new(state.pool())
        .mark_read(principal.account, id)
        .await
        .map_err(not_found("Notification"))?;
    Ok(Json(NotificationView::from(&notification)))
}

/// POST /api/notifications/read-all
#[instrument(skip(state, principal), fields(account = %principal.account))]
pub async fn mark_all_read(
    State(state): State<AppState>,
    Authenticated(principal): Authenticated,
) -> Result<Json<Updated>> {
    let updated = NotificationRepository::new(state.pool())
        .mark_all_read(principal.account)
        .await?;
    Ok(Json(Updated { updated }))
}
