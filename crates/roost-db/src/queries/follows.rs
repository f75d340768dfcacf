use anyhow::Result;

use super::OptionalExt;
use crate::Database;
use crate::models::{FollowEdgeRow, FollowRow};

impl Database {
    /// Adds the edge `follower_id -> following_id`. Returns `false` when the
    /// edge already exists, including when a concurrent request won the race.
    pub fn insert_follow(&self, id: &str, follower_id: &str, following_id: &str, created_at: &str) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let inserted = conn.execute(
                "INSERT OR IGNORE INTO follows (id, follower_id, following_id, created_at)
                 VALUES (?1, ?2, ?3, ?4)",
                rusqlite::params![id, follower_id, following_id, created_at],
            )?;
            Ok(inserted == 1)
        })
    }

    /// Removes the edge. Returns `false` when there was none.
    pub fn delete_follow(&self, follower_id: &str, following_id: &str) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let removed = conn.execute(
                "DELETE FROM follows WHERE follower_id = ?1 AND following_id = ?2",
                [follower_id, following_id],
            )?;
            Ok(removed > 0)
        })
    }

    pub fn get_follow(&self, follower_id: &str, following_id: &str) -> Result<Option<FollowRow>> {
        self.with_conn(|conn| {
            let row = conn
                .query_row(
                    "SELECT id, follower_id, following_id, created_at FROM follows
                     WHERE follower_id = ?1 AND following_id = ?2",
                    [follower_id, following_id],
                    |row| {
                        Ok(FollowRow {
                            id: row.get(0)?,
                            follower_id: row.get(1)?,
                            following_id: row.get(2)?,
                            created_at: row.get(3)?,
                        })
                    },
                )
                .optional()?;
            Ok(row)
        })
    }

    /// Users following `user_id`, newest edge first. Edges whose follower no
    /// longer exists are skipped.
    pub fn get_followers(&self, user_id: &str) -> Result<Vec<FollowEdgeRow>> {
        self.follow_edges(user_id, "following_id", "follower_id")
    }

    /// Users `user_id` follows, newest edge first. Edges whose target no
    /// longer exists are skipped.
    pub fn get_following(&self, user_id: &str) -> Result<Vec<FollowEdgeRow>> {
        self.follow_edges(user_id, "follower_id", "following_id")
    }

    /// `(followers, following)` for a user.
    pub fn follow_counts(&self, user_id: &str) -> Result<(i64, i64)> {
        self.with_conn(|conn| {
            let counts = conn.query_row(
                "SELECT (SELECT COUNT(*) FROM follows WHERE following_id = ?1),
                        (SELECT COUNT(*) FROM follows WHERE follower_id = ?1)",
                [user_id],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )?;
            Ok(counts)
        })
    }

    fn follow_edges(&self, user_id: &str, own_column: &str, other_column: &str) -> Result<Vec<FollowEdgeRow>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT f.id, f.{other}, f.created_at, u.name, u.location, u.email
                 FROM follows f
                 JOIN users u ON u.id = f.{other}
                 WHERE f.{own} = ?1
                 ORDER BY f.created_at DESC, f.rowid DESC",
                own = own_column,
                other = other_column,
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([user_id], |row| {
                    Ok(FollowEdgeRow {
                        id: row.get(0)?,
                        counterpart_id: row.get(1)?,
                        created_at: row.get(2)?,
                        name: row.get(3)?,
                        location: row.get(4)?,
                        email: row.get(5)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }
}
