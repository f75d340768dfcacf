//! Database row types. These map directly to SQLite rows and stay
//! independent of the API documents in roost-types; ids and timestamps are
//! kept as their stored text.

pub struct UserRow {
    pub id: String,
    pub name: String,
    pub email: String,
    pub password: String,
    pub phone: String,
    pub location: String,
    pub created_at: String,
    pub updated_at: String,
}

/// A user plus the activity counts shown on the admin user table.
pub struct UserActivityRow {
    pub user: UserRow,
    pub listing_count: i64,
    pub message_count: i64,
}

#[derive(Clone)]
pub struct ListingRow {
    pub id: String,
    pub user_id: String,
    pub title: String,
    pub description: String,
    pub category: String,
    pub price: f64,
    /// JSON array of strings.
    pub images: String,
    pub location: String,
    pub breed: Option<String>,
    pub age: Option<String>,
    pub health_status: Option<String>,
    pub size: Option<String>,
    pub material: Option<String>,
    pub condition: Option<String>,
    pub egg_type: Option<String>,
    pub laid_date: Option<String>,
    pub feed_type: Option<String>,
    pub quantity_available: Option<String>,
    pub farm_practices: Option<String>,
    pub is_active: bool,
    pub created_at: String,
    pub updated_at: String,
}

/// A listing joined with its author's name and location.
pub struct FeedRow {
    pub listing: ListingRow,
    pub seller_name: String,
    pub seller_location: String,
}

/// A listing with its owner's unrounded average rating (0 when unrated).
pub struct RatedListingRow {
    pub listing: ListingRow,
    pub seller_rating: f64,
}

#[derive(Debug)]
pub struct MessageRow {
    pub id: String,
    pub sender_id: String,
    pub receiver_id: String,
    pub listing_id: String,
    pub content: String,
    pub read: bool,
    pub created_at: String,
}

pub struct RatingRow {
    pub id: String,
    pub seller_id: String,
    pub buyer_id: String,
    pub listing_id: String,
    pub rating: i64,
    pub review: Option<String>,
    pub created_at: String,
}

/// A rating joined with the buyer's name, `None` when the buyer is gone.
pub struct RatingWithBuyerRow {
    pub rating: RatingRow,
    pub buyer_name: Option<String>,
}

pub struct FollowRow {
    pub id: String,
    pub follower_id: String,
    pub following_id: String,
    pub created_at: String,
}

/// A follow edge joined with the user on the other end of it.
pub struct FollowEdgeRow {
    pub id: String,
    pub counterpart_id: String,
    pub created_at: String,
    pub name: String,
    pub location: String,
    pub email: String,
}

pub struct FlagRow {
    pub id: String,
    pub listing_id: String,
    pub reporter_id: String,
    pub reason: String,
    pub description: Option<String>,
    pub status: String,
    pub created_at: String,
}

pub struct FlagWithListingRow {
    pub flag: FlagRow,
    pub listing_title: Option<String>,
}

pub struct AdminActionRow {
    pub id: String,
    pub admin_id: String,
    pub listing_id: String,
    pub action: String,
    pub reason: Option<String>,
    pub created_at: String,
}

pub struct NotificationRow {
    pub id: String,
    pub user_id: String,
    pub listing_id: String,
    pub message: String,
    pub read: bool,
    pub created_at: String,
}
