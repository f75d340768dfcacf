use axum::extract::State;
use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use roost_db::models::ListingRow;
use roost_db::search::{Direction, ListingFilter, SortKey};
use roost_db::timestamp;
use roost_types::api::{CreateListingRequest, StatusMessage, UpdateListingRequest};
use roost_types::models::{Listing, ListingDetails};

use crate::convert::{self, parse_id};
use crate::error::ApiError;
use crate::extract::{Json, Path, Query};
use crate::state::{AppState, blocking};
use crate::default_limit;

/// Most listings returned for a single owner.
const OWNER_LISTING_LIMIT: u32 = 100;

#[derive(Debug, Deserialize)]
pub struct ListingQuery {
    /// Matched as stored text; an unknown category finds nothing.
    pub category: Option<String>,
    #[serde(default = "default_limit")]
    pub limit: u32,
    #[serde(default)]
    pub skip: u32,
}

/// Identifies the acting user on write routes.
#[derive(Debug, Deserialize)]
pub struct OwnerQuery {
    pub user_id: String,
}

/// Active listings, newest first.
pub async fn list_listings(
    State(state): State<AppState>,
    Query(query): Query<ListingQuery>,
) -> Result<Json<Vec<Listing>>, ApiError> {
    let (limit, skip) = convert::page(query.limit, query.skip);
    let filter = ListingFilter {
        category: query.category,
        ..Default::default()
    };

    let rows = blocking(&state, move |db| {
        Ok(db.search_listings(&filter, SortKey::CreatedAt, Direction::Desc, limit, skip)?)
    })
    .await?;
    Ok(Json(convert::listings(rows.into_iter().map(|r| r.listing))?))
}

pub async fn get_listing(
    State(state): State<AppState>,
    Path(listing_id): Path<String>,
) -> Result<Json<Listing>, ApiError> {
    let listing_id = parse_id(&listing_id, "Listing not found")?.to_string();
    let row = blocking(&state, move |db| {
        db.get_listing(&listing_id)?
            .filter(|l| l.is_active)
            .ok_or(ApiError::NotFound("Listing not found"))
    })
    .await?;
    Ok(Json(convert::listing(row)?))
}

pub async fn create_listing(
    State(state): State<AppState>,
    Query(owner): Query<OwnerQuery>,
    Json(req): Json<CreateListingRequest>,
) -> Result<Json<Listing>, ApiError> {
    let owner_id = parse_id(&owner.user_id, "User not found")?;
    let title = req.title.trim().to_string();
    if title.is_empty() {
        return Err(ApiError::Validation("Title is required"));
    }
    validate_price(req.price)?;
    validate_details(&req.details)?;

    let now = timestamp(&Utc::now());
    let row = ListingRow {
        id: Uuid::new_v4().to_string(),
        user_id: owner_id.to_string(),
        title,
        description: req.description,
        category: req.category.as_str().to_string(),
        price: req.price,
        images: serde_json::to_string(&req.images).map_err(anyhow::Error::from)?,
        location: req.location.trim().to_string(),
        breed: None,
        age: None,
        health_status: None,
        size: None,
        material: None,
        condition: None,
        egg_type: None,
        laid_date: None,
        feed_type: None,
        quantity_available: None,
        farm_practices: None,
        is_active: true,
        created_at: now.clone(),
        updated_at: now,
    };
    let row = apply_details(row, req.details);

    let row = blocking(&state, move |db| {
        if !db.user_exists(&row.user_id)? {
            return Err(ApiError::NotFound("User not found"));
        }
        db.insert_listing(&row)?;
        Ok(row)
    })
    .await?;

    info!("User {} created listing {}", row.user_id, row.id);
    Ok(Json(convert::listing(row)?))
}

/// Owner-only partial update. Someone else's listing is reported as missing.
pub async fn update_listing(
    State(state): State<AppState>,
    Path(listing_id): Path<String>,
    Query(owner): Query<OwnerQuery>,
    Json(req): Json<UpdateListingRequest>,
) -> Result<Json<Listing>, ApiError> {
    let listing_id = parse_id(&listing_id, "Listing not found")?.to_string();
    let owner_id = parse_id(&owner.user_id, "Listing not found")?.to_string();

    let title = match req.title {
        Some(t) if t.trim().is_empty() => return Err(ApiError::Validation("Title is required")),
        Some(t) => Some(t.trim().to_string()),
        None => None,
    };
    if let Some(price) = req.price {
        validate_price(price)?;
    }
    validate_details(&req.details)?;
    let images = req
        .images
        .map(|images| serde_json::to_string(&images))
        .transpose()
        .map_err(anyhow::Error::from)?;

    let row = blocking(&state, move |db| {
        let mut row = owned_listing(db, &listing_id, &owner_id)?;
        if let Some(title) = title {
            row.title = title;
        }
        if let Some(description) = req.description {
            row.description = description;
        }
        if let Some(category) = req.category {
            row.category = category.as_str().to_string();
        }
        if let Some(price) = req.price {
            row.price = price;
        }
        if let Some(images) = images {
            row.images = images;
        }
        if let Some(location) = req.location {
            row.location = location.trim().to_string();
        }
        let mut row = apply_details(row, req.details);
        row.updated_at = timestamp(&Utc::now());

        if !db.update_listing(&row)? {
            return Err(ApiError::NotFound("Listing not found"));
        }
        Ok(row)
    })
    .await?;

    Ok(Json(convert::listing(row)?))
}

/// Owner-only soft delete.
pub async fn delete_listing(
    State(state): State<AppState>,
    Path(listing_id): Path<String>,
    Query(owner): Query<OwnerQuery>,
) -> Result<Json<StatusMessage>, ApiError> {
    let listing_id = parse_id(&listing_id, "Listing not found")?.to_string();
    let owner_id = parse_id(&owner.user_id, "Listing not found")?.to_string();

    blocking(&state, move |db| {
        let row = owned_listing(db, &listing_id, &owner_id)?;
        db.set_listing_active(&row.id, false, &timestamp(&Utc::now()))?;
        info!("Listing {} deactivated by its owner", row.id);
        Ok(())
    })
    .await?;

    Ok(Json(StatusMessage::new("Listing deleted successfully")))
}

/// A user's active listings, newest first.
pub async fn user_listings(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<Vec<Listing>>, ApiError> {
    let user_id = parse_id(&user_id, "User not found")?.to_string();
    let filter = ListingFilter {
        owner_id: Some(user_id),
        ..Default::default()
    };

    let rows = blocking(&state, move |db| {
        Ok(db.search_listings(&filter, SortKey::CreatedAt, Direction::Desc, OWNER_LISTING_LIMIT, 0)?)
    })
    .await?;
    Ok(Json(convert::listings(rows.into_iter().map(|r| r.listing))?))
}

fn owned_listing(db: &roost_db::Database, listing_id: &str, owner_id: &str) -> Result<ListingRow, ApiError> {
    db.get_listing(listing_id)?
        .filter(|l| l.is_active && l.user_id == owner_id)
        .ok_or(ApiError::NotFound("Listing not found"))
}

fn validate_price(price: f64) -> Result<(), ApiError> {
    if price.is_finite() && price >= 0.0 {
        Ok(())
    } else {
        Err(ApiError::Validation("Price must be a non-negative number"))
    }
}

fn validate_details(details: &ListingDetails) -> Result<(), ApiError> {
    if let Some(laid) = details.laid_date.as_deref().map(str::trim).filter(|d| !d.is_empty()) {
        NaiveDate::parse_from_str(laid, "%Y-%m-%d")
            .map_err(|_| ApiError::Validation("laid_date must be formatted YYYY-MM-DD"))?;
    }
    Ok(())
}

/// Overlays the present detail fields onto a row.
fn apply_details(mut row: ListingRow, details: ListingDetails) -> ListingRow {
    fn set(slot: &mut Option<String>, value: Option<String>) {
        if let Some(value) = convert::non_blank(value) {
            *slot = Some(value);
        }
    }

    set(&mut row.breed, details.breed);
    set(&mut row.age, details.age);
    set(&mut row.health_status, details.health_status);
    set(&mut row.size, details.size);
    set(&mut row.material, details.material);
    set(&mut row.condition, details.condition);
    set(&mut row.egg_type, details.egg_type);
    set(&mut row.laid_date, details.laid_date);
    set(&mut row.feed_type, details.feed_type);
    set(&mut row.quantity_available, details.quantity_available);
    set(&mut row.farm_practices, details.farm_practices);
    row
}
