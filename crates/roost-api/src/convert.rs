//! Row-to-document conversion. Stored ids and timestamps that fail to parse
//! are logged and replaced rather than failing the whole response; unknown
//! enum text is treated as corruption.

use anyhow::Context;
use chrono::{DateTime, Utc};
use tracing::warn;
use uuid::Uuid;

use roost_db::models::{
    AdminActionRow, FlagRow, ListingRow, MessageRow, NotificationRow, RatingRow, UserRow,
};
use roost_types::models::{
    AdminAction, Category, Flag, FlagReason, FlagStatus, Listing, ListingDetails, Message,
    ModerationAction, Notification, PublicUser, Rating, User,
};

use crate::error::ApiError;

/// Parses a client-supplied id. A malformed id cannot name an existing
/// record, so it is reported as `missing`.
pub fn parse_id(raw: &str, missing: &'static str) -> Result<Uuid, ApiError> {
    raw.trim().parse().map_err(|_| ApiError::NotFound(missing))
}

pub fn stored_id(raw: &str) -> Uuid {
    raw.parse().unwrap_or_else(|_| {
        warn!("Corrupt id in database: {}", raw);
        Uuid::nil()
    })
}

pub fn stored_time(raw: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc))
        .unwrap_or_else(|_| {
            warn!("Corrupt timestamp in database: {}", raw);
            DateTime::<Utc>::default()
        })
}

pub fn user(row: UserRow) -> User {
    User {
        id: stored_id(&row.id),
        name: row.name,
        email: row.email,
        phone: row.phone,
        location: row.location,
        created_at: stored_time(&row.created_at),
        updated_at: stored_time(&row.updated_at),
    }
}

pub fn public_user(id: &str, name: String, location: String, email: String) -> PublicUser {
    PublicUser {
        id: stored_id(id),
        name,
        location,
        email,
    }
}

pub fn listing(row: ListingRow) -> Result<Listing, ApiError> {
    let category = row
        .category
        .parse::<Category>()
        .with_context(|| format!("listing {}", row.id))?;
    let images = serde_json::from_str(&row.images).unwrap_or_else(|_| {
        warn!("Corrupt image list on listing {}", row.id);
        Vec::new()
    });

    Ok(Listing {
        id: stored_id(&row.id),
        user_id: stored_id(&row.user_id),
        title: row.title,
        description: row.description,
        category,
        price: row.price,
        images,
        location: row.location,
        details: ListingDetails {
            breed: row.breed,
            age: row.age,
            health_status: row.health_status,
            size: row.size,
            material: row.material,
            condition: row.condition,
            egg_type: row.egg_type,
            laid_date: row.laid_date,
            feed_type: row.feed_type,
            quantity_available: row.quantity_available,
            farm_practices: row.farm_practices,
        },
        is_active: row.is_active,
        created_at: stored_time(&row.created_at),
        updated_at: stored_time(&row.updated_at),
    })
}

pub fn listings(rows: impl IntoIterator<Item = ListingRow>) -> Result<Vec<Listing>, ApiError> {
    rows.into_iter().map(listing).collect()
}

pub fn message(row: MessageRow) -> Message {
    Message {
        id: stored_id(&row.id),
        sender_id: stored_id(&row.sender_id),
        receiver_id: stored_id(&row.receiver_id),
        listing_id: stored_id(&row.listing_id),
        content: row.content,
        read: row.read,
        created_at: stored_time(&row.created_at),
    }
}

pub fn rating(row: RatingRow) -> Result<Rating, ApiError> {
    let stars = u8::try_from(row.rating)
        .ok()
        .filter(|s| (1..=5).contains(s))
        .with_context(|| format!("rating {} has {} stars", row.id, row.rating))?;

    Ok(Rating {
        id: stored_id(&row.id),
        seller_id: stored_id(&row.seller_id),
        buyer_id: stored_id(&row.buyer_id),
        listing_id: stored_id(&row.listing_id),
        rating: stars,
        review: row.review,
        created_at: stored_time(&row.created_at),
    })
}

pub fn flag(row: FlagRow) -> Result<Flag, ApiError> {
    Ok(Flag {
        id: stored_id(&row.id),
        listing_id: stored_id(&row.listing_id),
        reporter_id: stored_id(&row.reporter_id),
        reason: row.reason.parse::<FlagReason>().with_context(|| format!("flag {}", row.id))?,
        description: row.description,
        status: row.status.parse::<FlagStatus>().with_context(|| format!("flag {}", row.id))?,
        created_at: stored_time(&row.created_at),
    })
}

pub fn admin_action(row: AdminActionRow) -> Result<AdminAction, ApiError> {
    Ok(AdminAction {
        id: stored_id(&row.id),
        admin_id: stored_id(&row.admin_id),
        listing_id: stored_id(&row.listing_id),
        action: row
            .action
            .parse::<ModerationAction>()
            .with_context(|| format!("admin action {}", row.id))?,
        reason: row.reason,
        created_at: stored_time(&row.created_at),
    })
}

pub fn notification(row: NotificationRow) -> Notification {
    Notification {
        id: stored_id(&row.id),
        user_id: stored_id(&row.user_id),
        listing_id: stored_id(&row.listing_id),
        message: row.message,
        read: row.read,
        created_at: stored_time(&row.created_at),
    }
}

/// Trimmed text, `None` when blank.
pub fn non_blank(text: Option<String>) -> Option<String> {
    text.map(|t| t.trim().to_string()).filter(|t| !t.is_empty())
}

/// Clamps paging parameters to the API bounds.
pub fn page(limit: u32, skip: u32) -> (u32, u32) {
    (limit.clamp(1, crate::MAX_PAGE_SIZE), skip)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn malformed_client_ids_read_as_missing() {
        let err = parse_id("not-a-uuid", "User not found").unwrap_err();
        assert!(matches!(err, ApiError::NotFound("User not found")));

        let id = Uuid::new_v4();
        assert_eq!(parse_id(&format!(" {} ", id), "x").unwrap(), id);
    }

    #[test]
    fn corrupt_stored_values_fall_back() {
        assert_eq!(stored_id("garbage"), Uuid::nil());
        assert_eq!(stored_time("yesterday"), DateTime::<Utc>::default());
        assert_eq!(
            stored_time("2025-03-01T08:00:00.000000Z").to_rfc3339(),
            "2025-03-01T08:00:00+00:00"
        );
    }

    #[test]
    fn unknown_category_is_an_internal_error() {
        let row = ListingRow {
            id: Uuid::new_v4().to_string(),
            user_id: Uuid::new_v4().to_string(),
            title: "Geese".into(),
            description: String::new(),
            category: "waterfowl".into(),
            price: 1.0,
            images: "[]".into(),
            location: String::new(),
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
            created_at: "2025-03-01T08:00:00Z".into(),
            updated_at: "2025-03-01T08:00:00Z".into(),
        };
        assert!(matches!(listing(row), Err(ApiError::Internal(_))));
    }

    #[test]
    fn page_caps_limit() {
        assert_eq!(page(500, 3), (100, 3));
        assert_eq!(page(0, 0), (1, 0));
        assert_eq!(page(20, 0), (20, 0));
    }
}
