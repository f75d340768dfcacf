use axum::extract::State;
use chrono::{Days, NaiveDate, Utc};
use serde::Deserialize;

use roost_db::models::RatedListingRow;
use roost_db::search::{Direction, EXTENDED_TEXT_COLUMNS, ListingFilter, SortKey};
use roost_types::api::{AdvancedSearchRequest, SortBy, SortOrder};
use roost_types::models::{Listing, RatedListing};

use crate::convert;
use crate::error::ApiError;
use crate::extract::{Json, Query};
use crate::state::{AppState, blocking};
use crate::{DEFAULT_PAGE_SIZE, default_limit};

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub q: Option<String>,
    /// Matched as stored text; an unknown category finds nothing.
    pub category: Option<String>,
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
    pub location: Option<String>,
    #[serde(default = "default_limit")]
    pub limit: u32,
    #[serde(default)]
    pub skip: u32,
}

/// `GET /search`: text over title, description and breed plus the simple
/// filters. Newest first.
pub async fn search(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<Vec<Listing>>, ApiError> {
    let (limit, skip) = convert::page(query.limit, query.skip);
    let filter = ListingFilter {
        text: query.q,
        category: query.category,
        min_price: query.min_price,
        max_price: query.max_price,
        location: query.location,
        ..Default::default()
    };

    let rows = blocking(&state, move |db| {
        Ok(db.search_listings(&filter, SortKey::CreatedAt, Direction::Desc, limit, skip)?)
    })
    .await?;
    Ok(Json(convert::listings(rows.into_iter().map(|r| r.listing))?))
}

/// `POST /advanced-search`: every listing carries its seller's average
/// rating.
pub async fn advanced_search(
    State(state): State<AppState>,
    Json(req): Json<AdvancedSearchRequest>,
) -> Result<Json<Vec<RatedListing>>, ApiError> {
    let (limit, skip) = convert::page(
        req.limit.unwrap_or(DEFAULT_PAGE_SIZE),
        req.skip.unwrap_or(0),
    );
    let (filter, key, direction) = advanced_filter(req, Utc::now().date_naive());

    let rows = blocking(&state, move |db| {
        Ok(db.search_listings(&filter, key, direction, limit, skip)?)
    })
    .await?;

    rows.into_iter()
        .map(rated_listing)
        .collect::<Result<Vec<_>, _>>()
        .map(Json)
}

/// Translates an advanced search body into a store filter. `today` anchors
/// the egg freshness window.
pub fn advanced_filter(req: AdvancedSearchRequest, today: NaiveDate) -> (ListingFilter, SortKey, Direction) {
    let eggs_laid_since = req
        .max_days_old
        .and_then(|days| today.checked_sub_days(Days::new(days.into())))
        .map(|cutoff| cutoff.format("%Y-%m-%d").to_string());

    let filter = ListingFilter {
        text: req.query,
        text_columns: EXTENDED_TEXT_COLUMNS,
        category: req.category.map(|c| c.as_str().to_string()),
        min_price: req.min_price,
        max_price: req.max_price,
        location: req.location,
        egg_type: req.egg_type,
        feed_type: req.feed_type,
        breed: req.breed,
        age: req.age_range,
        eggs_laid_since,
        min_rating: req.min_rating,
        ..Default::default()
    };

    let key = match req.sort_by {
        SortBy::CreatedAt => SortKey::CreatedAt,
        SortBy::Price => SortKey::Price,
        SortBy::Title => SortKey::Title,
        SortBy::Rating => SortKey::Rating,
    };
    let direction = match req.sort_order {
        SortOrder::Asc => Direction::Asc,
        SortOrder::Desc => Direction::Desc,
    };

    (filter, key, direction)
}

fn rated_listing(row: RatedListingRow) -> Result<RatedListing, ApiError> {
    Ok(RatedListing {
        listing: convert::listing(row.listing)?,
        seller_rating: (row.seller_rating * 10.0).round() / 10.0,
    })
}
