//! Listing filter and sort composition.
//!
//! A [`ListingFilter`] is a conjunction of independently optional criteria.
//! It renders to a `WHERE` fragment with positional `?` parameters, so the
//! same builder backs the category browse, per-user listings, simple search,
//! advanced search and the admin listing view.

use anyhow::Result;
use rusqlite::types::Value;

use crate::Database;
use crate::models::RatedListingRow;
use crate::queries::{LISTING_COLUMNS, LISTING_COLUMN_COUNT, listing_from_row};

/// Columns `GET /search` matches free text against.
pub const BASIC_TEXT_COLUMNS: &[&str] = &["title", "description", "breed"];

/// Columns advanced search matches free text against.
pub const EXTENDED_TEXT_COLUMNS: &[&str] = &["title", "description", "breed", "egg_type", "feed_type"];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortKey {
    #[default]
    CreatedAt,
    Price,
    Title,
    /// Owner's average rating; unrated owners sort as 0.
    Rating,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Direction {
    Asc,
    #[default]
    Desc,
}

#[derive(Debug, Clone)]
pub struct ListingFilter {
    pub text: Option<String>,
    pub text_columns: &'static [&'static str],
    pub category: Option<String>,
    pub owner_id: Option<String>,
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
    pub location: Option<String>,
    pub egg_type: Option<String>,
    pub feed_type: Option<String>,
    pub breed: Option<String>,
    pub age: Option<String>,
    /// `YYYY-MM-DD` cutoff applied to eggs listings only: they must carry a
    /// `laid_date` on or after it. Other categories are unaffected.
    pub eggs_laid_since: Option<String>,
    pub min_rating: Option<f64>,
    pub include_inactive: bool,
}

impl Default for ListingFilter {
    fn default() -> Self {
        Self {
            text: None,
            text_columns: BASIC_TEXT_COLUMNS,
            category: None,
            owner_id: None,
            min_price: None,
            max_price: None,
            location: None,
            egg_type: None,
            feed_type: None,
            breed: None,
            age: None,
            eggs_laid_since: None,
            min_rating: None,
            include_inactive: false,
        }
    }
}

/// A rendered `WHERE` fragment and the values bound to its `?` slots.
#[derive(Debug)]
pub struct SqlFilter {
    pub clause: String,
    pub params: Vec<Value>,
}

impl ListingFilter {
    pub fn to_sql(&self) -> SqlFilter {
        let mut clauses: Vec<String> = Vec::new();
        let mut params: Vec<Value> = Vec::new();

        if !self.include_inactive {
            clauses.push("l.is_active = 1".into());
        }

        if let Some(text) = non_empty(&self.text) {
            if !self.text_columns.is_empty() {
                let pattern = like_pattern(text);
                let any: Vec<String> = self
                    .text_columns
                    .iter()
                    .map(|column| {
                        params.push(Value::Text(pattern.clone()));
                        format!("l.{} LIKE ? ESCAPE '\\'", column)
                    })
                    .collect();
                clauses.push(format!("({})", any.join(" OR ")));
            }
        }

        if let Some(category) = non_empty(&self.category) {
            clauses.push("l.category = ?".into());
            params.push(Value::Text(category.to_string()));
        }

        if let Some(owner) = non_empty(&self.owner_id) {
            clauses.push("l.user_id = ?".into());
            params.push(Value::Text(owner.to_string()));
        }

        if let Some(min) = self.min_price {
            clauses.push("l.price >= ?".into());
            params.push(Value::Real(min));
        }

        if let Some(max) = self.max_price {
            clauses.push("l.price <= ?".into());
            params.push(Value::Real(max));
        }

        for (column, value) in [
            ("location", &self.location),
            ("egg_type", &self.egg_type),
            ("feed_type", &self.feed_type),
            ("breed", &self.breed),
            ("age", &self.age),
        ] {
            if let Some(value) = non_empty(value) {
                clauses.push(format!("l.{} LIKE ? ESCAPE '\\'", column));
                params.push(Value::Text(like_pattern(value)));
            }
        }

        if let Some(cutoff) = non_empty(&self.eggs_laid_since) {
            clauses.push(
                "(l.category <> 'eggs' OR (l.laid_date IS NOT NULL AND l.laid_date >= ?))".into(),
            );
            params.push(Value::Text(cutoff.to_string()));
        }

        if let Some(min) = self.min_rating {
            // Compared at the one-decimal precision sellers are shown with.
            clauses.push("ROUND(COALESCE(r.avg_rating, 0.0), 1) >= ?".into());
            params.push(Value::Real(min));
        }

        let clause = if clauses.is_empty() {
            "1 = 1".to_string()
        } else {
            clauses.join(" AND ")
        };

        SqlFilter { clause, params }
    }
}

pub fn order_by(key: SortKey, direction: Direction) -> String {
    let dir = match direction {
        Direction::Asc => "ASC",
        Direction::Desc => "DESC",
    };
    match key {
        SortKey::CreatedAt => format!("l.created_at {dir}, l.rowid {dir}"),
        SortKey::Price => format!("l.price {dir}, l.created_at DESC"),
        SortKey::Title => format!("l.title COLLATE NOCASE {dir}, l.created_at DESC"),
        SortKey::Rating => format!("seller_rating {dir}, l.created_at DESC"),
    }
}

impl Database {
    /// Listings matching `filter`, each with the owner's average rating.
    pub fn search_listings(
        &self,
        filter: &ListingFilter,
        key: SortKey,
        direction: Direction,
        limit: u32,
        skip: u32,
    ) -> Result<Vec<RatedListingRow>> {
        let SqlFilter { clause, mut params } = filter.to_sql();
        let sql = format!(
            "SELECT {}, COALESCE(r.avg_rating, 0.0) AS seller_rating
             FROM listings l
             LEFT JOIN (SELECT seller_id, AVG(rating) AS avg_rating FROM ratings GROUP BY seller_id) r
                ON r.seller_id = l.user_id
             WHERE {}
             ORDER BY {}
             LIMIT ? OFFSET ?",
            LISTING_COLUMNS,
            clause,
            order_by(key, direction)
        );
        params.push(Value::Integer(limit.into()));
        params.push(Value::Integer(skip.into()));

        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(rusqlite::params_from_iter(params), |row| {
                    Ok(RatedListingRow {
                        listing: listing_from_row(row, 0)?,
                        seller_rating: row.get(LISTING_COLUMN_COUNT)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

/// Substring pattern with LIKE wildcards in user text escaped.
fn like_pattern(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len() + 2);
    escaped.push('%');
    for c in text.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}
