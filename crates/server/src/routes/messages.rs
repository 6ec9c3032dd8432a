//! Direct messages between accounts.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use gobble_core::MessageId;
use gobble_core::api::{MessageView, SendMessageRequest};
use gobble_core::listing::Page;
use tracing::{info, instrument};

use super::{PageQuery, check, not_found};
use crate::db::messages::Mailbox;
use crate::db::{AccountRepository, MessageRepository};
use crate::error::{AppError, Result};
use crate::middleware::Authenticated;
use crate::services::check_required;
use crate::services::notify::Notifier;
use crate::state::AppState;

const MAX_SUBJECT_LENGTH: usize = 200;
const MAX_BODY_LENGTH: usize = 5000;

fn validate(req: &SendMessageRequest) -> Result<()> {
    check(check_required("subject", &req.subject))?;
    check(check_required("body", &req.body))?;
    if req.subject.chars().count() > MAX_SUBJECT_LENGTH {
        return Err(AppError::BadRequest(format!(
            "subject cannot exceed {MAX_SUBJECT_LENGTH} characters"
        )));
    }
    if req.body.chars().count() > MAX_BODY_LENGTH {
        return Err(AppError::BadRequest(format!(
            "body cannot exceed {MAX_BODY_LENGTH} characters"
        )));
    }
    Ok(())
}

/// GET /api/messages
#[instrument(skip(state, principal), fields(account = %principal.account))]
pub async fn inbox(
    State(state): State<AppState>,
    Authenticated(principal): Authenticated,
    Query(query): Query<PageQuery>,
) -> Result<Json<Page<MessageView>>> {
    let page = MessageRepository::new(state.pool())
        .list(principal.account, Mailbox::Inbox, query.page_request())
        .await?;
    Ok(Json(page.map(|m| MessageView::from(&m))))
}

/// GET /api/messages/sent
#[instrument(skip(state, principal), fields(account = %principal.account))]
pub async fn sent(
    State(state): State<AppState>,
    Authenticated(principal): Authenticated,
    Query(query): Query<PageQuery>,
) -> Result<Json<Page<MessageView>>> {
    let page = MessageRepository::new(state.pool())
        .list(principal.account, Mailbox::Sent, query.page_request())
        .await?;
    Ok(Json(page.map(|m| MessageView::from(&m))))
}

/// Send a message and notify the recipient.
///
/// POST /api/messages
#[instrument(skip(state, principal, req), fields(account = %principal.account, recipient = %req.recipient))]
pub async fn send(
    State(state): State<AppState>,
    Authenticated(principal): Authenticated,
    Json(req): Json<SendMessageRequest>,
) -> Result<(StatusCode, Json<MessageView>)> {
    validate(&req)?;
    if req.recipient == principal.account {
        return Err(AppError::BadRequest(
            "cannot send a message to yourself".to_owned(),
        ));
    }
    if !AccountRepository::new(state.pool())
        .exists(req.recipient)
        .await?
    {
        return Err(AppError::NotFound("Recipient not found".to_owned()));
    }

    let message = MessageRepository::new(state.pool())
        .create(
            principal.account,
            req.recipient,
            req.subject.trim(),
            req.body.trim(),
        )
        .await?;
    info!(message_id = %message.id, "Message sent");

    Notifier::new(state.pool())
        .new_message(req.recipient, &message.subject)
        .await;
    Ok((StatusCode::CREATED, Json(MessageView::from(&message))))
}

/// POST /api/messages/{id}/read
#[instrument(skip(state, principal), fields(account = %principal.account))]
pub async fn mark_read(
    State(state): State<AppState>,
    Authenticated(principal): Authenticated,
    Path(id): Path<MessageId>,
) -> Result<Json<MessageView>> {
    let message = MessageRepository::new(state.pool())
        .mark_read(principal.account, id)
        .await
        .map_err(not_found("Message"))?;
    Ok(Json(MessageView::from(&message)))
}

#[cfg(test)]
mod tests {
    use gobble_core::{AccountRef, AccountRole};

    use super::*;

    fn request(subject: &str, body: &str) -> SendMessageRequest {
        SendMessageRequest {
            recipient: AccountRef::new(AccountRole::Restaurant, 3),
            subject: subject.to_owned(),
            body: body.to_owned(),
        }
    }

    #[test]
    fn test_validate_requires_subject_and_body() {
        assert!(validate(&request("Allergens", "Is the satay nut-free?")).is_ok());
        assert!(validate(&request("", "hello")).is_err());
        assert!(validate(&request("Hello", " ")).is_err());
    }

    #[test]
    fn test_validate_limits_subject_length() {
        let long = "x".repeat(MAX_SUBJECT_LENGTH + 1);
        assert!(matches!(
            validate(&request(&long, "body")),
            Err(AppError::BadRequest(msg)) if msg.contains("subject")
        ));
    }
}
