mod follows;
mod listings;
mod messages;
mod moderation;
mod ratings;
mod users;

pub(crate) use listings::{LISTING_COLUMNS, LISTING_COLUMN_COUNT, listing_from_row};

use anyhow::Result;

/// Extension trait for optional query results
pub(crate) trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> Result<Option<T>> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

/// `?1, ?2, ..., ?n` for an `IN (...)` list.
fn placeholders(n: usize) -> String {
    (1..=n).map(|i| format!("?{}", i)).collect::<Vec<_>>().join(", ")
}

#[cfg(test)]
pub(crate) mod fixtures {
    use chrono::{Duration, TimeZone, Utc};

    use crate::models::{ListingRow, UserRow};
    use crate::{Database, timestamp};

    /// Deterministic timestamp `minutes` after a fixed epoch.
    pub fn at(minutes: i64) -> String {
        let base = Utc.with_ymd_and_hms(2025, 3, 1, 8, 0, 0).unwrap();
        timestamp(&(base + Duration::minutes(minutes)))
    }

    pub fn user(db: &Database, name: &str) -> String {
        let id = uuid::Uuid::new_v4().to_string();
        let row = UserRow {
            id: id.clone(),
            name: name.to_string(),
            email: format!("{}@example.com", name.to_lowercase()),
            password: "hash".into(),
            phone: "+1-555-0100".into(),
            location: format!("{} Farm, TX", name),
            created_at: at(0),
            updated_at: at(0),
        };
        assert!(db.create_user(&row).unwrap());
        id
    }

    pub fn listing_row(owner: &str, title: &str, category: &str, minutes: i64) -> ListingRow {
        ListingRow {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: owner.to_string(),
            title: title.to_string(),
            description: format!("{} for sale", title),
            category: category.to_string(),
            price: 10.0,
            images: "[]".into(),
            location: "Austin, TX".into(),
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
            created_at: at(minutes),
            updated_at: at(minutes),
        }
    }

    pub fn listing(db: &Database, owner: &str, title: &str, category: &str, minutes: i64) -> String {
        let row = listing_row(owner, title, category, minutes);
        db.insert_listing(&row).unwrap();
        row.id
    }
}
