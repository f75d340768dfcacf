use anyhow::Result;
use rusqlite::{Connection, Row};
use std::collections::HashMap;

use super::{OptionalExt, placeholders};
use crate::Database;
use crate::models::{UserActivityRow, UserRow};

const USER_COLUMNS: &str = "id, name, email, password, phone, location, created_at, updated_at";

impl Database {
    /// Inserts a user. Returns `false` when the email is already registered.
    pub fn create_user(&self, user: &UserRow) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let inserted = conn.execute(
                "INSERT OR IGNORE INTO users (id, name, email, password, phone, location, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                rusqlite::params![
                    user.id,
                    user.name,
                    user.email,
                    user.password,
                    user.phone,
                    user.location,
                    user.created_at,
                    user.updated_at,
                ],
            )?;
            Ok(inserted == 1)
        })
    }

    pub fn get_user_by_email(&self, email: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "email", email))
    }

    pub fn get_user_by_id(&self, id: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "id", id))
    }

    pub fn user_exists(&self, id: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let found: Option<i64> = conn
                .query_row("SELECT 1 FROM users WHERE id = ?1", [id], |row| row.get(0))
                .optional()?;
            Ok(found.is_some())
        })
    }

    /// Batch-resolve display names. Ids with no user are absent from the map.
    pub fn get_user_names(&self, ids: &[String]) -> Result<HashMap<String, String>> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }

        self.with_conn(|conn| {
            let sql = format!(
                "SELECT id, name FROM users WHERE id IN ({})",
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

    /// Every user with their active listing count and sent-or-received
    /// message count, newest registration first.
    pub fn list_users_with_activity(&self) -> Result<Vec<UserActivityRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT u.id, u.name, u.email, u.password, u.phone, u.location, u.created_at, u.updated_at,
                        (SELECT COUNT(*) FROM listings l WHERE l.user_id = u.id AND l.is_active = 1),
                        (SELECT COUNT(*) FROM messages m WHERE m.sender_id = u.id OR m.receiver_id = u.id)
                 FROM users u
                 ORDER BY u.created_at DESC",
            )?;
            let rows = stmt
                .query_map([], |row| {
                    Ok(UserActivityRow {
                        user: user_from_row(row)?,
                        listing_count: row.get(8)?,
                        message_count: row.get(9)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn count_users(&self) -> Result<i64> {
        self.with_conn(|conn| {
            Ok(conn.query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))?)
        })
    }

    pub fn count_users_created_since(&self, since: &str) -> Result<i64> {
        self.with_conn(|conn| {
            Ok(conn.query_row(
                "SELECT COUNT(*) FROM users WHERE created_at >= ?1",
                [since],
                |row| row.get(0),
            )?)
        })
    }
}

fn query_user(conn: &Connection, column: &str, value: &str) -> Result<Option<UserRow>> {
    let sql = format!("SELECT {} FROM users WHERE {} = ?1", USER_COLUMNS, column);
    let mut stmt = conn.prepare(&sql)?;
    let row = stmt.query_row([value], user_from_row).optional()?;
    Ok(row)
}

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<UserRow> {
    Ok(UserRow {
        id: row.get(0)?,
        name: row.get(1)?,
        email: row.get(2)?,
        password: row.get(3)?,
        phone: row.get(4)?,
        location: row.get(5)?,
        created_at: row.get(6)?,
        updated_at: row.get(7)?,
    })
}
