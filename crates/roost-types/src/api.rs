use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{Category, FlagReason, ListingDetails, ModerationAction};

// -- JWT Claims --

/// Claims carried by the tokens issued at register/login.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub email: String,
    pub exp: usize,
}

// -- Auth --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    pub phone: String,
    pub location: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AuthResponse {
    pub message: String,
    pub token: String,
    pub user_id: Uuid,
}

/// Plain acknowledgement body, e.g. `{"message": "Successfully followed user"}`.
#[derive(Debug, Serialize, Deserialize)]
pub struct StatusMessage {
    pub message: String,
}

impl StatusMessage {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Health {
    pub message: String,
    pub status: String,
}

// -- Listings --

#[derive(Debug, Deserialize)]
pub struct CreateListingRequest {
    pub title: String,
    pub description: String,
    pub category: Category,
    pub price: f64,
    #[serde(default)]
    pub images: Vec<String>,
    pub location: String,
    #[serde(flatten)]
    pub details: ListingDetails,
}

/// Partial update: absent fields keep their stored value.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateListingRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub category: Option<Category>,
    pub price: Option<f64>,
    pub images: Option<Vec<String>>,
    pub location: Option<String>,
    #[serde(flatten)]
    pub details: ListingDetails,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortBy {
    #[default]
    CreatedAt,
    Price,
    Title,
    Rating,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

/// Body of `POST /advanced-search`. Every criterion is optional; present ones
/// are combined with AND.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct AdvancedSearchRequest {
    pub query: Option<String>,
    pub category: Option<Category>,
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
    pub location: Option<String>,
    /// Accepted for client compatibility; there is no geo index to use it.
    pub radius_miles: Option<u32>,
    pub egg_type: Option<String>,
    pub feed_type: Option<String>,
    pub max_days_old: Option<u32>,
    pub breed: Option<String>,
    pub age_range: Option<String>,
    pub min_rating: Option<f64>,
    pub sort_by: SortBy,
    pub sort_order: SortOrder,
    pub limit: Option<u32>,
    pub skip: Option<u32>,
}

// -- Messages --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SendMessageRequest {
    pub receiver_id: String,
    pub listing_id: String,
    pub content: String,
}

// -- Ratings --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateRatingRequest {
    pub seller_id: String,
    pub listing_id: String,
    pub rating: i64,
    #[serde(default)]
    pub review: Option<String>,
}

// -- Moderation --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FlagListingRequest {
    pub reason: FlagReason,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AdminActionRequest {
    pub action: ModerationAction,
    #[serde(default)]
    pub reason: Option<String>,
}
