use std::collections::BTreeMap;

use axum::extract::State;
use chrono::Utc;
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use roost_db::timestamp;
use roost_types::api::CreateRatingRequest;
use roost_types::models::{Rating, RatingSummary, SellerRating};

use crate::convert::{self, parse_id};
use crate::default_limit;
use crate::error::ApiError;
use crate::extract::{Json, Path, Query};
use crate::state::{AppState, blocking};

#[derive(Debug, Deserialize)]
pub struct BuyerQuery {
    pub buyer_id: String,
}

#[derive(Debug, Deserialize)]
pub struct RatingsQuery {
    #[serde(default = "default_limit")]
    pub limit: u32,
    #[serde(default)]
    pub skip: u32,
}

const LISTING_MISMATCH: &str = "Listing not found or seller mismatch";

pub async fn create_rating(
    State(state): State<AppState>,
    Query(buyer): Query<BuyerQuery>,
    Json(req): Json<CreateRatingRequest>,
) -> Result<Json<Rating>, ApiError> {
    let buyer_id = parse_id(&buyer.buyer_id, "User not found")?;
    if !(1..=5).contains(&req.rating) {
        return Err(ApiError::Validation("Rating must be between 1 and 5"));
    }
    let seller_id = parse_id(&req.seller_id, LISTING_MISMATCH)?;
    if buyer_id == seller_id {
        return Err(ApiError::Validation("You cannot rate yourself"));
    }
    let listing_id = parse_id(&req.listing_id, LISTING_MISMATCH)?;

    let id = Uuid::new_v4();
    let now = Utc::now();
    let review = convert::non_blank(req.review);
    let stars = req.rating;

    let stored_review = review.clone();
    blocking(&state, move |db| {
        if !db.user_exists(&buyer_id.to_string())? {
            return Err(ApiError::NotFound("User not found"));
        }
        let listing = db
            .get_listing(&listing_id.to_string())?
            .filter(|l| l.user_id == seller_id.to_string())
            .ok_or(ApiError::NotFound(LISTING_MISMATCH))?;

        let inserted = db.insert_rating(
            &id.to_string(),
            &listing.user_id,
            &buyer_id.to_string(),
            &listing.id,
            stars,
            stored_review.as_deref(),
            &timestamp(&now),
        )?;
        if !inserted {
            return Err(ApiError::Conflict("You have already rated this seller for this listing"));
        }
        Ok(())
    })
    .await?;

    info!("Buyer {} rated seller {} {} stars", buyer_id, seller_id, stars);
    Ok(Json(Rating {
        id,
        seller_id,
        buyer_id,
        listing_id,
        rating: stars as u8,
        review,
        created_at: now,
    }))
}

/// A seller's ratings, newest first.
pub async fn seller_ratings(
    State(state): State<AppState>,
    Path(seller_id): Path<String>,
    Query(query): Query<RatingsQuery>,
) -> Result<Json<Vec<SellerRating>>, ApiError> {
    let seller_id = parse_id(&seller_id, "User not found")?.to_string();
    let (limit, skip) = convert::page(query.limit, query.skip);

    let rows = blocking(&state, move |db| {
        Ok(db.get_seller_ratings(&seller_id, limit, skip)?)
    })
    .await?;

    rows.into_iter()
        .map(|row| {
            Ok(SellerRating {
                rating: convert::rating(row.rating)?,
                buyer_name: row.buyer_name.unwrap_or_else(|| "Anonymous".into()),
            })
        })
        .collect::<Result<Vec<_>, ApiError>>()
        .map(Json)
}

pub async fn rating_summary(
    State(state): State<AppState>,
    Path(seller_id): Path<String>,
) -> Result<Json<RatingSummary>, ApiError> {
    let seller = parse_id(&seller_id, "User not found")?;
    let key = seller.to_string();
    let counts = blocking(&state, move |db| Ok(db.rating_counts(&key)?)).await?;
    Ok(Json(summarize(seller, &counts)))
}

/// Builds a summary from `(star, count)` pairs. The breakdown always holds
/// keys 1 through 5; the average is rounded to one decimal, halves away
/// from zero.
pub fn summarize(seller_id: Uuid, counts: &[(i64, i64)]) -> RatingSummary {
    let mut breakdown: BTreeMap<u8, u64> = (1..=5).map(|star| (star, 0)).collect();
    let mut total = 0u64;
    let mut sum = 0u64;

    for &(star, count) in counts {
        let (Ok(star), Ok(count)) = (u8::try_from(star), u64::try_from(count)) else {
            continue;
        };
        if let Some(bucket) = breakdown.get_mut(&star) {
            *bucket += count;
            total += count;
            sum += u64::from(star) * count;
        }
    }

    let average_rating = if total == 0 {
        0.0
    } else {
        (sum as f64 / total as f64 * 10.0).round() / 10.0
    };

    RatingSummary {
        seller_id,
        average_rating,
        total_ratings: total,
        rating_breakdown: breakdown,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unrated_seller_has_zeroed_summary() {
        let summary = summarize(Uuid::nil(), &[]);
        assert_eq!(summary.average_rating, 0.0);
        assert_eq!(summary.total_ratings, 0);
        assert_eq!(summary.rating_breakdown.len(), 5);
        assert!(summary.rating_breakdown.values().all(|&c| c == 0));
    }

    #[test]
    fn average_rounds_half_away_from_zero() {
        // 5 + 4 + 4 + 4 = 17 over 4 ratings = 4.25
        let summary = summarize(Uuid::nil(), &[(5, 1), (4, 3)]);
        assert_eq!(summary.average_rating, 4.3);
        assert_eq!(summary.total_ratings, 4);
        assert_eq!(summary.rating_breakdown[&4], 3);
        assert_eq!(summary.rating_breakdown[&1], 0);
    }

    #[test]
    fn thirds_round_to_one_decimal() {
        // 5 + 4 + 4 = 13 over 3 ratings
        let summary = summarize(Uuid::nil(), &[(4, 2), (5, 1)]);
        assert_eq!(summary.average_rating, 4.3);

        let summary = summarize(Uuid::nil(), &[(1, 2), (2, 1)]);
        assert_eq!(summary.average_rating, 1.3);
    }

    #[test]
    fn out_of_range_stars_are_ignored() {
        let summary = summarize(Uuid::nil(), &[(0, 4), (6, 1), (3, 2)]);
        assert_eq!(summary.total_ratings, 2);
        assert_eq!(summary.average_rating, 3.0);
    }
}
