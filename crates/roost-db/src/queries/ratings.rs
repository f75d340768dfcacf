use anyhow::Result;

use crate::Database;
use crate::models::{RatingRow, RatingWithBuyerRow};

impl Database {
    /// Inserts a rating. Returns `false` when this buyer already rated this
    /// seller for this listing.
    #[allow(clippy::too_many_arguments)]
    pub fn insert_rating(
        &self,
        id: &str,
        seller_id: &str,
        buyer_id: &str,
        listing_id: &str,
        rating: i64,
        review: Option<&str>,
        created_at: &str,
    ) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let inserted = conn.execute(
                "INSERT OR IGNORE INTO ratings (id, seller_id, buyer_id, listing_id, rating, review, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                rusqlite::params![id, seller_id, buyer_id, listing_id, rating, review, created_at],
            )?;
            Ok(inserted == 1)
        })
    }

    /// `(star, count)` for each star value the seller has received.
    pub fn rating_counts(&self, seller_id: &str) -> Result<Vec<(i64, i64)>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT rating, COUNT(*) FROM ratings WHERE seller_id = ?1 GROUP BY rating",
            )?;
            let rows = stmt
                .query_map([seller_id], |row| Ok((row.get(0)?, row.get(1)?)))?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// A seller's ratings, newest first, with the buyer's name when the
    /// buyer still exists.
    pub fn get_seller_ratings(&self, seller_id: &str, limit: u32, skip: u32) -> Result<Vec<RatingWithBuyerRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT r.id, r.seller_id, r.buyer_id, r.listing_id, r.rating, r.review, r.created_at, u.name
                 FROM ratings r
                 LEFT JOIN users u ON u.id = r.buyer_id
                 WHERE r.seller_id = ?1
                 ORDER BY r.created_at DESC, r.rowid DESC
                 LIMIT ?2 OFFSET ?3",
            )?;
            let rows = stmt
                .query_map(rusqlite::params![seller_id, limit, skip], |row| {
                    Ok(RatingWithBuyerRow {
                        rating: RatingRow {
                            id: row.get(0)?,
                            seller_id: row.get(1)?,
                            buyer_id: row.get(2)?,
                            listing_id: row.get(3)?,
                            rating: row.get(4)?,
                            review: row.get(5)?,
                            created_at: row.get(6)?,
                        },
                        buyer_name: row.get(7)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }
}
