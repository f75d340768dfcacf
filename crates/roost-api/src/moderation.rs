use axum::extract::State;
use chrono::Utc;
use serde::Deserialize;
use tracing::{info, warn};
use uuid::Uuid;

use roost_db::models::{AdminActionRow, FlagRow, NotificationRow};
use roost_db::timestamp;
use roost_types::api::{AdminActionRequest, FlagListingRequest, StatusMessage};
use roost_types::models::{
    AdminAction, Flag, FlagStatus, FlagWithListing, ModerationAction, Notification,
};

use crate::convert::{self, parse_id};
use crate::default_limit;
use crate::error::ApiError;
use crate::extract::{Json, Path, Query};
use crate::state::{AppState, blocking};

#[derive(Debug, Deserialize)]
pub struct ReporterQuery {
    pub user_id: String,
}

#[derive(Debug, Deserialize)]
pub struct FlagsQuery {
    pub status: Option<FlagStatus>,
}

#[derive(Debug, Deserialize)]
pub struct AdminQuery {
    pub admin_id: String,
}

#[derive(Debug, Deserialize)]
pub struct ActionsQuery {
    #[serde(default = "default_limit")]
    pub limit: u32,
    #[serde(default)]
    pub skip: u32,
}

pub async fn flag_listing(
    State(state): State<AppState>,
    Path(listing_id): Path<String>,
    Query(reporter): Query<ReporterQuery>,
    Json(req): Json<FlagListingRequest>,
) -> Result<Json<Flag>, ApiError> {
    let listing_id = parse_id(&listing_id, "Listing not found")?;
    let reporter_id = parse_id(&reporter.user_id, "User not found")?;

    let row = FlagRow {
        id: Uuid::new_v4().to_string(),
        listing_id: listing_id.to_string(),
        reporter_id: reporter_id.to_string(),
        reason: req.reason.as_str().to_string(),
        description: convert::non_blank(req.description),
        status: FlagStatus::Pending.as_str().to_string(),
        created_at: timestamp(&Utc::now()),
    };

    let row = blocking(&state, move |db| {
        if db.get_listing(&row.listing_id)?.is_none() {
            return Err(ApiError::NotFound("Listing not found"));
        }
        if !db.user_exists(&row.reporter_id)? {
            return Err(ApiError::NotFound("User not found"));
        }
        if !db.insert_flag(&row)? {
            return Err(ApiError::Conflict("You have already flagged this listing"));
        }
        Ok(row)
    })
    .await?;

    info!("Listing {} flagged as {} by {}", row.listing_id, row.reason, row.reporter_id);
    Ok(Json(convert::flag(row)?))
}

/// Flags newest first, optionally only those with `status`.
pub async fn list_flags(
    State(state): State<AppState>,
    Query(query): Query<FlagsQuery>,
) -> Result<Json<Vec<FlagWithListing>>, ApiError> {
    let rows = blocking(&state, move |db| {
        Ok(db.list_flags(query.status.as_ref().map(FlagStatus::as_str))?)
    })
    .await?;

    rows.into_iter()
        .map(|row| {
            Ok(FlagWithListing {
                flag: convert::flag(row.flag)?,
                listing_title: row.listing_title.unwrap_or_else(|| "Unknown Listing".into()),
            })
        })
        .collect::<Result<Vec<_>, ApiError>>()
        .map(Json)
}

/// Applies a moderation decision to a listing. The listing update, flag
/// closure, audit row and owner notification are separate writes; a
/// failure part way leaves the earlier ones in place.
pub async fn take_action(
    State(state): State<AppState>,
    Path(listing_id): Path<String>,
    Query(admin): Query<AdminQuery>,
    Json(req): Json<AdminActionRequest>,
) -> Result<Json<AdminAction>, ApiError> {
    let listing_id = parse_id(&listing_id, "Listing not found")?.to_string();
    let admin_id = parse_id(&admin.admin_id, "User not found")?.to_string();
    let reason = convert::non_blank(req.reason);
    let action = req.action;

    let row = blocking(&state, move |db| {
        let listing = db
            .get_listing(&listing_id)?
            .ok_or(ApiError::NotFound("Listing not found"))?;
        let now = timestamp(&Utc::now());

        match action {
            ModerationAction::Deactivate => {
                db.set_listing_active(&listing.id, false, &now)?;
            }
            ModerationAction::Activate => {
                db.set_listing_active(&listing.id, true, &now)?;
            }
            ModerationAction::Dismiss => {}
        }

        let closed_as = match action {
            ModerationAction::Dismiss => FlagStatus::Dismissed,
            _ => FlagStatus::Resolved,
        };
        let closed = db.close_pending_flags(&listing.id, closed_as.as_str())?;

        let row = AdminActionRow {
            id: Uuid::new_v4().to_string(),
            admin_id,
            listing_id: listing.id.clone(),
            action: action.as_str().to_string(),
            reason: reason.clone(),
            created_at: now.clone(),
        };
        db.insert_admin_action(&row)?;

        if let Some(message) = owner_notice(action, &listing.title, reason.as_deref()) {
            db.insert_notification(&NotificationRow {
                id: Uuid::new_v4().to_string(),
                user_id: listing.user_id.clone(),
                listing_id: listing.id.clone(),
                message,
                read: false,
                created_at: now,
            })
            .inspect_err(|e| warn!("Action {} recorded but owner notice failed: {}", row.id, e))?;
        }

        info!(
            "Admin {} applied {} to listing {} ({} flags {})",
            row.admin_id, row.action, row.listing_id, closed, closed_as
        );
        Ok(row)
    })
    .await?;

    Ok(Json(convert::admin_action(row)?))
}

/// Audit log, newest first.
pub async fn list_actions(
    State(state): State<AppState>,
    Query(query): Query<ActionsQuery>,
) -> Result<Json<Vec<AdminAction>>, ApiError> {
    let (limit, skip) = convert::page(query.limit, query.skip);
    let rows = blocking(&state, move |db| Ok(db.list_admin_actions(limit, skip)?)).await?;

    rows.into_iter()
        .map(convert::admin_action)
        .collect::<Result<Vec<_>, _>>()
        .map(Json)
}

pub async fn notifications(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<Vec<Notification>>, ApiError> {
    let user_id = parse_id(&user_id, "User not found")?.to_string();
    let rows = blocking(&state, move |db| Ok(db.get_notifications(&user_id)?)).await?;
    Ok(Json(rows.into_iter().map(convert::notification).collect()))
}

pub async fn mark_notification_read(
    State(state): State<AppState>,
    Path(notification_id): Path<String>,
) -> Result<Json<StatusMessage>, ApiError> {
    let id = parse_id(&notification_id, "Notification not found")?.to_string();
    blocking(&state, move |db| {
        if !db.mark_notification_read(&id)? {
            return Err(ApiError::NotFound("Notification not found"));
        }
        Ok(())
    })
    .await?;
    Ok(Json(StatusMessage::new("Notification marked as read")))
}

/// Text sent to a listing's owner, if the action warrants one.
fn owner_notice(action: ModerationAction, title: &str, reason: Option<&str>) -> Option<String> {
    let verb = match action {
        ModerationAction::Deactivate => "deactivated",
        ModerationAction::Activate => "reactivated",
        ModerationAction::Dismiss => return None,
    };
    Some(match reason {
        Some(reason) => format!("Your listing \"{}\" was {} by a moderator: {}", title, verb, reason),
        None => format!("Your listing \"{}\" was {} by a moderator", title, verb),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dismissals_do_not_notify() {
        assert_eq!(owner_notice(ModerationAction::Dismiss, "Hens", None), None);
    }

    #[test]
    fn notice_includes_reason_when_given() {
        assert_eq!(
            owner_notice(ModerationAction::Deactivate, "Hens", Some("Duplicate post")).as_deref(),
            Some("Your listing \"Hens\" was deactivated by a moderator: Duplicate post")
        );
        assert_eq!(
            owner_notice(ModerationAction::Activate, "Hens", None).as_deref(),
            Some("Your listing \"Hens\" was reactivated by a moderator")
        );
    }
}
