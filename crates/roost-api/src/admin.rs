use std::collections::BTreeMap;

use axum::extract::State;
use chrono::{Duration, Utc};
use serde::Deserialize;
use tracing::warn;

use roost_db::search::{Direction, ListingFilter, SortKey};
use roost_db::timestamp;
use roost_types::models::{AdminStats, AdminUser, Category, Listing};

use crate::convert;
use crate::default_limit;
use crate::error::ApiError;
use crate::extract::{Json, Query};
use crate::state::{AppState, blocking};

/// Window for `recent_users` on the dashboard.
const RECENT_USER_DAYS: i64 = 30;

#[derive(Debug, Deserialize)]
pub struct AdminListingsQuery {
    #[serde(default = "default_limit")]
    pub limit: u32,
    #[serde(default)]
    pub skip: u32,
}

/// Every listing, inactive ones included, newest first.
pub async fn list_listings(
    State(state): State<AppState>,
    Query(query): Query<AdminListingsQuery>,
) -> Result<Json<Vec<Listing>>, ApiError> {
    let (limit, skip) = convert::page(query.limit, query.skip);
    let filter = ListingFilter {
        include_inactive: true,
        ..Default::default()
    };

    let rows = blocking(&state, move |db| {
        Ok(db.search_listings(&filter, SortKey::CreatedAt, Direction::Desc, limit, skip)?)
    })
    .await?;
    Ok(Json(convert::listings(rows.into_iter().map(|r| r.listing))?))
}

pub async fn list_users(State(state): State<AppState>) -> Result<Json<Vec<AdminUser>>, ApiError> {
    let rows = blocking(&state, |db| Ok(db.list_users_with_activity()?)).await?;

    Ok(Json(
        rows.into_iter()
            .map(|row| AdminUser {
                user: convert::user(row.user),
                listing_count: row.listing_count.max(0) as u64,
                message_count: row.message_count.max(0) as u64,
            })
            .collect(),
    ))
}

pub async fn stats(State(state): State<AppState>) -> Result<Json<AdminStats>, ApiError> {
    let since = timestamp(&(Utc::now() - Duration::days(RECENT_USER_DAYS)));

    let stats = blocking(&state, move |db| {
        Ok(AdminStats {
            total_users: count(db.count_users()?),
            active_listings: count(db.count_active_listings()?),
            total_messages: count(db.count_messages()?),
            recent_users: count(db.count_users_created_since(&since)?),
            pending_flags: count(db.count_pending_flags()?),
            listings_by_category: by_category(db.count_active_listings_by_category()?),
        })
    })
    .await?;

    Ok(Json(stats))
}

fn count(n: i64) -> u64 {
    n.max(0) as u64
}

/// Every category appears, zero when it has no active listings.
fn by_category(counts: Vec<(String, i64)>) -> BTreeMap<Category, u64> {
    let mut totals: BTreeMap<Category, u64> = Category::ALL.iter().map(|c| (*c, 0)).collect();
    for (category, n) in counts {
        match category.parse::<Category>() {
            Ok(category) => *totals.entry(category).or_default() += count(n),
            Err(e) => warn!("Skipping listings with {}", e),
        }
    }
    totals
}
