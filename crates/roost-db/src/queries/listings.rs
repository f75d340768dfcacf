use anyhow::Result;
use rusqlite::Row;
use std::collections::HashMap;

use super::{OptionalExt, placeholders};
use crate::Database;
use crate::models::{FeedRow, ListingRow};

/// Listing columns in the order [`listing_from_row`] reads them, qualified
/// with the `l` alias so joins can append their own columns.
pub(crate) const LISTING_COLUMNS: &str = "l.id, l.user_id, l.title, l.description, l.category, l.price, l.images, l.location,
     l.breed, l.age, l.health_status, l.size, l.material, l.condition,
     l.egg_type, l.laid_date, l.feed_type, l.quantity_available, l.farm_practices,
     l.is_active, l.created_at, l.updated_at";

pub(crate) const LISTING_COLUMN_COUNT: usize = 22;

impl Database {
    pub fn insert_listing(&self, listing: &ListingRow) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO listings (id, user_id, title, description, category, price, images, location,
                                       breed, age, health_status, size, material, condition,
                                       egg_type, laid_date, feed_type, quantity_available, farm_practices,
                                       is_active, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14,
                         ?15, ?16, ?17, ?18, ?19, ?20, ?21, ?22)",
                rusqlite::params![
                    listing.id,
                    listing.user_id,
                    listing.title,
                    listing.description,
                    listing.category,
                    listing.price,
                    listing.images,
                    listing.location,
                    listing.breed,
                    listing.age,
                    listing.health_status,
                    listing.size,
                    listing.material,
                    listing.condition,
                    listing.egg_type,
                    listing.laid_date,
                    listing.feed_type,
                    listing.quantity_available,
                    listing.farm_practices,
                    listing.is_active,
                    listing.created_at,
                    listing.updated_at,
                ],
            )?;
            Ok(())
        })
    }

    /// Writes every mutable column of `listing` back. Returns `false` when
    /// the row no longer exists.
    pub fn update_listing(&self, listing: &ListingRow) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let changed = conn.execute(
                "UPDATE listings SET
                    title = ?2, description = ?3, category = ?4, price = ?5, images = ?6, location = ?7,
                    breed = ?8, age = ?9, health_status = ?10, size = ?11, material = ?12, condition = ?13,
                    egg_type = ?14, laid_date = ?15, feed_type = ?16, quantity_available = ?17,
                    farm_practices = ?18, is_active = ?19, updated_at = ?20
                 WHERE id = ?1",
                rusqlite::params![
                    listing.id,
                    listing.title,
                    listing.description,
                    listing.category,
                    listing.price,
                    listing.images,
                    listing.location,
                    listing.breed,
                    listing.age,
                    listing.health_status,
                    listing.size,
                    listing.material,
                    listing.condition,
                    listing.egg_type,
                    listing.laid_date,
                    listing.feed_type,
                    listing.quantity_available,
                    listing.farm_practices,
                    listing.is_active,
                    listing.updated_at,
                ],
            )?;
            Ok(changed == 1)
        })
    }

    pub fn set_listing_active(&self, id: &str, active: bool, updated_at: &str) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let changed = conn.execute(
                "UPDATE listings SET is_active = ?2, updated_at = ?3 WHERE id = ?1",
                rusqlite::params![id, active, updated_at],
            )?;
            Ok(changed == 1)
        })
    }

    /// Fetches a listing regardless of its active flag; read paths that must
    /// hide inactive listings check `is_active` themselves.
    pub fn get_listing(&self, id: &str) -> Result<Option<ListingRow>> {
        self.with_conn(|conn| {
            let sql = format!("SELECT {} FROM listings l WHERE l.id = ?1", LISTING_COLUMNS);
            let row = conn
                .query_row(&sql, [id], |row| listing_from_row(row, 0))
                .optional()?;
            Ok(row)
        })
    }

    /// Batch-resolve listing titles, including inactive listings.
    pub fn get_listing_titles(&self, ids: &[String]) -> Result<HashMap<String, String>> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }

        self.with_conn(|conn| {
            let sql = format!(
                "SELECT id, title FROM listings WHERE id IN ({})",
                placeholders(ids.len())
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(rusqlite::params_from_iter(ids), |row| {
                    Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
                })?
                .collect::<std::result::Result<HashMap<_, _>, _>>()?;
            Ok(rows)
        })
    }

    /// Active listings by authors `follower_id` follows, newest first.
    pub fn following_feed(&self, follower_id: &str, limit: u32, skip: u32) -> Result<Vec<FeedRow>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {}, u.name, u.location
                 FROM listings l
                 JOIN follows f ON f.following_id = l.user_id AND f.follower_id = ?1
                 JOIN users u ON u.id = l.user_id
                 WHERE l.is_active = 1
                 ORDER BY l.created_at DESC, l.rowid DESC
                 LIMIT ?2 OFFSET ?3",
                LISTING_COLUMNS
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(rusqlite::params![follower_id, limit, skip], |row| {
                    Ok(FeedRow {
                        listing: listing_from_row(row, 0)?,
                        seller_name: row.get(LISTING_COLUMN_COUNT)?,
                        seller_location: row.get(LISTING_COLUMN_COUNT + 1)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn count_active_listings(&self) -> Result<i64> {
        self.with_conn(|conn| {
            Ok(conn.query_row(
                "SELECT COUNT(*) FROM listings WHERE is_active = 1",
                [],
                |row| row.get(0),
            )?)
        })
    }

    /// Active listing counts per stored category. Categories with no
    /// listings are absent.
    pub fn count_active_listings_by_category(&self) -> Result<Vec<(String, i64)>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT category, COUNT(*) FROM listings WHERE is_active = 1 GROUP BY category",
            )?;
            let rows = stmt
                .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }
}

/// Reads a listing whose columns start at `offset`.
pub(crate) fn listing_from_row(row: &Row<'_>, offset: usize) -> rusqlite::Result<ListingRow> {
    Ok(ListingRow {
        id: row.get(offset)?,
        user_id: row.get(offset + 1)?,
        title: row.get(offset + 2)?,
        description: row.get(offset + 3)?,
        category: row.get(offset + 4)?,
        price: row.get(offset + 5)?,
        images: row.get(offset + 6)?,
        location: row.get(offset + 7)?,
        breed: row.get(offset + 8)?,
        age: row.get(offset + 9)?,
        health_status: row.get(offset + 10)?,
        size: row.get(offset + 11)?,
        material: row.get(offset + 12)?,
        condition: row.get(offset + 13)?,
        egg_type: row.get(offset + 14)?,
        laid_date: row.get(offset + 15)?,
        feed_type: row.get(offset + 16)?,
        quantity_available: row.get(offset + 17)?,
        farm_practices: row.get(offset + 18)?,
        is_active: row.get(offset + 19)?,
        created_at: row.get(offset + 20)?,
        updated_at: row.get(offset + 21)?,
    })
}

#[cfg(test)]
mod tests {
    use crate::Database;
    use crate::queries::fixtures::{at, listing, listing_row, user};

    #[test]
    fn update_rewrites_fields_and_keeps_owner() {
        let db = Database::open_in_memory().unwrap();
        let hen = user(&db, "Hen");
        let id = listing(&db, &hen, "Silkie pair", "poultry", 0);

        let mut row = db.get_listing(&id).unwrap().unwrap();
        row.price = 42.5;
        row.breed = Some("Silkie".into());
        row.updated_at = at(5);
        assert!(db.update_listing(&row).unwrap());

        let stored = db.get_listing(&id).unwrap().unwrap();
        assert_eq!(stored.price, 42.5);
        assert_eq!(stored.breed.as_deref(), Some("Silkie"));
        assert_eq!(stored.user_id, hen);
    }

    #[test]
    fn feed_only_contains_followed_active_listings() {
        let db = Database::open_in_memory().unwrap();
        let reader = user(&db, "Reader");
        let followed = user(&db, "Followed");
        let stranger = user(&db, "Stranger");
        db.insert_follow("f1", &reader, &followed, &at(0)).unwrap();

        let older = listing(&db, &followed, "Older", "poultry", 1);
        let newer = listing(&db, &followed, "Newer", "eggs", 2);
        let hidden = listing(&db, &followed, "Hidden", "coop", 3);
        db.set_listing_active(&hidden, false, &at(4)).unwrap();
        listing(&db, &stranger, "Stranger's", "cage", 5);

        let feed = db.following_feed(&reader, 20, 0).unwrap();
        let ids: Vec<_> = feed.iter().map(|r| r.listing.id.clone()).collect();
        assert_eq!(ids, vec![newer, older]);
        assert_eq!(feed[0].seller_name, "Followed");
        assert_eq!(feed[0].seller_location, "Followed Farm, TX");

        let page = db.following_feed(&reader, 1, 1).unwrap();
        assert_eq!(page.len(), 1);
        assert_eq!(page[0].listing.title, "Older");
    }

    #[test]
    fn feed_is_empty_without_follows() {
        let db = Database::open_in_memory().unwrap();
        let reader = user(&db, "Reader");
        let other = user(&db, "Other");
        listing(&db, &other, "Eggs", "eggs", 0);

        assert!(db.following_feed(&reader, 20, 0).unwrap().is_empty());
        assert!(db.following_feed(&reader, 5, 10).unwrap().is_empty());
    }

    #[test]
    fn category_counts_ignore_inactive() {
        let db = Database::open_in_memory().unwrap();
        let hen = user(&db, "Hen");
        listing(&db, &hen, "A", "eggs", 0);
        listing(&db, &hen, "B", "eggs", 1);
        let mut gone = listing_row(&hen, "C", "coop", 2);
        gone.is_active = false;
        db.insert_listing(&gone).unwrap();

        let mut counts = db.count_active_listings_by_category().unwrap();
        counts.sort();
        assert_eq!(counts, vec![("eggs".to_string(), 2)]);
        assert_eq!(db.count_active_listings().unwrap(), 2);
    }
}
