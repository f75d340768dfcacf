use axum::extract::State;
use chrono::Utc;
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use roost_db::timestamp;
use roost_types::api::StatusMessage;
use roost_types::models::{FeedListing, FollowStats, Follower, Following};

use crate::convert::{self, parse_id, stored_id, stored_time};
use crate::default_limit;
use crate::error::ApiError;
use crate::extract::{Json, Path, Query};
use crate::state::{AppState, blocking};

#[derive(Debug, Deserialize)]
pub struct CurrentUserQuery {
    pub current_user_id: String,
}

#[derive(Debug, Deserialize)]
pub struct StatsQuery {
    pub current_user_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct FeedQuery {
    pub current_user_id: String,
    #[serde(default = "default_limit")]
    pub limit: u32,
    #[serde(default)]
    pub skip: u32,
}

/// Checked before anything else so that following yourself is always a
/// validation error, whatever the id looks like.
fn is_self(target: &str, current: &str) -> bool {
    target.trim().eq_ignore_ascii_case(current.trim())
}

pub async fn follow(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Query(current): Query<CurrentUserQuery>,
) -> Result<Json<StatusMessage>, ApiError> {
    if is_self(&user_id, &current.current_user_id) {
        return Err(ApiError::Validation("You cannot follow yourself"));
    }
    let target = parse_id(&user_id, "User not found")?.to_string();
    let follower = parse_id(&current.current_user_id, "User not found")?.to_string();

    blocking(&state, move |db| {
        if !db.user_exists(&target)? || !db.user_exists(&follower)? {
            return Err(ApiError::NotFound("User not found"));
        }
        let edge_id = Uuid::new_v4().to_string();
        if !db.insert_follow(&edge_id, &follower, &target, &timestamp(&Utc::now()))? {
            return Err(ApiError::Conflict("Already following this user"));
        }
        info!("{} now follows {}", follower, target);
        Ok(())
    })
    .await?;

    Ok(Json(StatusMessage::new("Successfully followed user")))
}

pub async fn unfollow(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Query(current): Query<CurrentUserQuery>,
) -> Result<Json<StatusMessage>, ApiError> {
    if is_self(&user_id, &current.current_user_id) {
        return Err(ApiError::Validation("You cannot unfollow yourself"));
    }
    let target = parse_id(&user_id, "Not following this user")?.to_string();
    let follower = parse_id(&current.current_user_id, "Not following this user")?.to_string();

    blocking(&state, move |db| {
        if !db.delete_follow(&follower, &target)? {
            return Err(ApiError::NotFound("Not following this user"));
        }
        Ok(())
    })
    .await?;

    Ok(Json(StatusMessage::new("Successfully unfollowed user")))
}

pub async fn followers(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<Vec<Follower>>, ApiError> {
    let user_id = parse_id(&user_id, "User not found")?.to_string();
    let rows = blocking(&state, move |db| Ok(db.get_followers(&user_id)?)).await?;

    Ok(Json(
        rows.into_iter()
            .map(|edge| Follower {
                id: stored_id(&edge.id),
                follower_id: stored_id(&edge.counterpart_id),
                created_at: stored_time(&edge.created_at),
                follower: convert::public_user(&edge.counterpart_id, edge.name, edge.location, edge.email),
            })
            .collect(),
    ))
}

pub async fn following(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<Vec<Following>>, ApiError> {
    let user_id = parse_id(&user_id, "User not found")?.to_string();
    let rows = blocking(&state, move |db| Ok(db.get_following(&user_id)?)).await?;

    Ok(Json(
        rows.into_iter()
            .map(|edge| Following {
                id: stored_id(&edge.id),
                following_id: stored_id(&edge.counterpart_id),
                created_at: stored_time(&edge.created_at),
                following: convert::public_user(&edge.counterpart_id, edge.name, edge.location, edge.email),
            })
            .collect(),
    ))
}

/// Counts for a profile. `is_following` says whether `current_user_id`
/// (if given) follows this user.
pub async fn follow_stats(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Query(query): Query<StatsQuery>,
) -> Result<Json<FollowStats>, ApiError> {
    let user_id = parse_id(&user_id, "User not found")?.to_string();
    let viewer = query
        .current_user_id
        .and_then(|raw| raw.trim().parse::<Uuid>().ok())
        .map(|id| id.to_string());

    let stats = blocking(&state, move |db| {
        let (followers, following) = db.follow_counts(&user_id)?;
        let is_following = match viewer {
            Some(viewer) => db.get_follow(&viewer, &user_id)?.is_some(),
            None => false,
        };
        Ok(FollowStats {
            followers_count: followers.max(0) as u64,
            following_count: following.max(0) as u64,
            is_following,
        })
    })
    .await?;

    Ok(Json(stats))
}

/// Active listings by the users `current_user_id` follows, newest first.
pub async fn following_feed(
    State(state): State<AppState>,
    Query(query): Query<FeedQuery>,
) -> Result<Json<Vec<FeedListing>>, ApiError> {
    let user_id = parse_id(&query.current_user_id, "User not found")?.to_string();
    let (limit, skip) = convert::page(query.limit, query.skip);

    let rows = blocking(&state, move |db| Ok(db.following_feed(&user_id, limit, skip)?)).await?;

    rows.into_iter()
        .map(|row| {
            Ok(FeedListing {
                listing: convert::listing(row.listing)?,
                seller_name: row.seller_name,
                seller_location: row.seller_location,
            })
        })
        .collect::<Result<Vec<_>, ApiError>>()
        .map(Json)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn self_check_ignores_case_and_padding() {
        let id = Uuid::new_v4().to_string();
        assert!(is_self(&id, &format!(" {} ", id.to_uppercase())));
        assert!(is_self("not-an-id", "not-an-id"));
        assert!(!is_self(&id, &Uuid::new_v4().to_string()));
    }
}
