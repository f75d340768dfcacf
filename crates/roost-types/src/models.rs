use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
#[error("unknown {kind} '{value}'")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

/// Declares a lowercase string enum that round-trips through serde and the
/// text columns of the store.
macro_rules! string_enum {
    ($(#[$meta:meta])* $name:ident, $kind:literal { $($variant:ident => $text:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(rename_all = "snake_case")]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl FromStr for $name {
            type Err = UnknownVariant;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok($name::$variant),)+
                    other => Err(UnknownVariant { kind: $kind, value: other.to_string() }),
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

string_enum!(
    /// What a listing sells. Category-specific fields on [`ListingDetails`]
    /// are only meaningful for the matching category.
    Category, "category" {
        Poultry => "poultry",
        Coop => "coop",
        Cage => "cage",
        Eggs => "eggs",
    }
);

string_enum!(FlagReason, "flag reason" {
    Suspicious => "suspicious",
    Scam => "scam",
    Inappropriate => "inappropriate",
    Fake => "fake",
    Other => "other",
});

string_enum!(FlagStatus, "flag status" {
    Pending => "pending",
    Resolved => "resolved",
    Dismissed => "dismissed",
});

string_enum!(
    /// Moderation decision an admin applies to a flagged listing.
    ModerationAction, "moderation action" {
        Deactivate => "deactivate",
        Activate => "activate",
        Dismiss => "dismiss",
    }
);

// -- Users --

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub location: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// The profile fields exposed when a user shows up on someone else's
/// follower or following list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublicUser {
    pub id: Uuid,
    pub name: String,
    pub location: String,
    pub email: String,
}

// -- Listings --

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ListingDetails {
    // poultry
    pub breed: Option<String>,
    pub age: Option<String>,
    pub health_status: Option<String>,
    // coop / cage
    pub size: Option<String>,
    pub material: Option<String>,
    pub condition: Option<String>,
    // eggs
    pub egg_type: Option<String>,
    /// `YYYY-MM-DD` collection date.
    pub laid_date: Option<String>,
    pub feed_type: Option<String>,
    pub quantity_available: Option<String>,
    pub farm_practices: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Listing {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub description: String,
    pub category: Category,
    pub price: f64,
    pub images: Vec<String>,
    pub location: String,
    #[serde(flatten)]
    pub details: ListingDetails,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedListing {
    #[serde(flatten)]
    pub listing: Listing,
    pub seller_name: String,
    pub seller_location: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RatedListing {
    #[serde(flatten)]
    pub listing: Listing,
    pub seller_rating: f64,
}

// -- Messages --

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: Uuid,
    pub sender_id: Uuid,
    pub receiver_id: Uuid,
    pub listing_id: Uuid,
    pub content: String,
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

/// Derived view over messages, one per (listing, counterpart) pair. Never
/// stored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    /// `"{listing_id}_{other_user_id}"`
    pub id: String,
    pub listing_id: Uuid,
    pub listing_title: String,
    pub other_user_id: Uuid,
    pub other_user_name: String,
    pub last_message: String,
    pub last_message_time: DateTime<Utc>,
    pub unread_count: usize,
}

// -- Ratings --

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Rating {
    pub id: Uuid,
    pub seller_id: Uuid,
    pub buyer_id: Uuid,
    pub listing_id: Uuid,
    pub rating: u8,
    pub review: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SellerRating {
    #[serde(flatten)]
    pub rating: Rating,
    pub buyer_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RatingSummary {
    pub seller_id: Uuid,
    pub average_rating: f64,
    pub total_ratings: u64,
    /// Star value (1..=5) to count. Always carries all five keys.
    pub rating_breakdown: BTreeMap<u8, u64>,
}

// -- Follows --

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Follower {
    pub id: Uuid,
    pub follower_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub follower: PublicUser,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Following {
    pub id: Uuid,
    pub following_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub following: PublicUser,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FollowStats {
    pub followers_count: u64,
    pub following_count: u64,
    pub is_following: bool,
}

// -- Moderation --

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Flag {
    pub id: Uuid,
    pub listing_id: Uuid,
    pub reporter_id: Uuid,
    pub reason: FlagReason,
    pub description: Option<String>,
    pub status: FlagStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlagWithListing {
    #[serde(flatten)]
    pub flag: Flag,
    pub listing_title: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminAction {
    pub id: Uuid,
    pub admin_id: Uuid,
    pub listing_id: Uuid,
    pub action: ModerationAction,
    pub reason: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub id: Uuid,
    pub user_id: Uuid,
    pub listing_id: Uuid,
    pub message: String,
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminUser {
    #[serde(flatten)]
    pub user: User,
    pub listing_count: u64,
    pub message_count: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminStats {
    pub total_users: u64,
    pub active_listings: u64,
    pub total_messages: u64,
    pub recent_users: u64,
    pub pending_flags: u64,
    pub listings_by_category: BTreeMap<Category, u64>,
}
