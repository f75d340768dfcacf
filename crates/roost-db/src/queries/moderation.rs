use anyhow::Result;

use crate::Database;
use crate::models::{AdminActionRow, FlagRow, FlagWithListingRow, NotificationRow};

impl Database {
    // -- Flags --

    /// Files a report. Returns `false` when the reporter already has a
    /// pending flag on this listing.
    pub fn insert_flag(&self, flag: &FlagRow) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let inserted = conn.execute(
                "INSERT OR IGNORE INTO listing_flags (id, listing_id, reporter_id, reason, description, status, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                rusqlite::params![
                    flag.id,
                    flag.listing_id,
                    flag.reporter_id,
                    flag.reason,
                    flag.description,
                    flag.status,
                    flag.created_at,
                ],
            )?;
            Ok(inserted == 1)
        })
    }

    /// Flags newest first, optionally narrowed to one status.
    pub fn list_flags(&self, status: Option<&str>) -> Result<Vec<FlagWithListingRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT f.id, f.listing_id, f.reporter_id, f.reason, f.description, f.status, f.created_at, l.title
                 FROM listing_flags f
                 LEFT JOIN listings l ON l.id = f.listing_id
                 WHERE ?1 IS NULL OR f.status = ?1
                 ORDER BY f.created_at DESC, f.rowid DESC",
            )?;
            let rows = stmt
                .query_map([status], |row| {
                    Ok(FlagWithListingRow {
                        flag: FlagRow {
                            id: row.get(0)?,
                            listing_id: row.get(1)?,
                            reporter_id: row.get(2)?,
                            reason: row.get(3)?,
                            description: row.get(4)?,
                            status: row.get(5)?,
                            created_at: row.get(6)?,
                        },
                        listing_title: row.get(7)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Closes every pending flag on a listing with `status`. Returns how
    /// many were closed.
    pub fn close_pending_flags(&self, listing_id: &str, status: &str) -> Result<usize> {
        self.with_conn_mut(|conn| {
            let changed = conn.execute(
                "UPDATE listing_flags SET status = ?2 WHERE listing_id = ?1 AND status = 'pending'",
                [listing_id, status],
            )?;
            Ok(changed)
        })
    }

    pub fn count_pending_flags(&self) -> Result<i64> {
        self.with_conn(|conn| {
            Ok(conn.query_row(
                "SELECT COUNT(*) FROM listing_flags WHERE status = 'pending'",
                [],
                |row| row.get(0),
            )?)
        })
    }

    // -- Admin actions --

    pub fn insert_admin_action(&self, action: &AdminActionRow) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO admin_actions (id, admin_id, listing_id, action, reason, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                rusqlite::params![
                    action.id,
                    action.admin_id,
                    action.listing_id,
                    action.action,
                    action.reason,
                    action.created_at,
                ],
            )?;
            Ok(())
        })
    }

    pub fn list_admin_actions(&self, limit: u32, skip: u32) -> Result<Vec<AdminActionRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, admin_id, listing_id, action, reason, created_at
                 FROM admin_actions
                 ORDER BY created_at DESC, rowid DESC
                 LIMIT ?1 OFFSET ?2",
            )?;
            let rows = stmt
                .query_map([limit, skip], |row| {
                    Ok(AdminActionRow {
                        id: row.get(0)?,
                        admin_id: row.get(1)?,
                        listing_id: row.get(2)?,
                        action: row.get(3)?,
                        reason: row.get(4)?,
                        created_at: row.get(5)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    // -- Notifications --

    pub fn insert_notification(&self, notification: &NotificationRow) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO admin_notifications (id, user_id, listing_id, message, read, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                rusqlite::params![
                    notification.id,
                    notification.user_id,
                    notification.listing_id,
                    notification.message,
                    notification.read,
                    notification.created_at,
                ],
            )?;
            Ok(())
        })
    }

    pub fn get_notifications(&self, user_id: &str) -> Result<Vec<NotificationRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, user_id, listing_id, message, read, created_at
                 FROM admin_notifications
                 WHERE user_id = ?1
                 ORDER BY created_at DESC, rowid DESC",
            )?;
            let rows = stmt
                .query_map([user_id], |row| {
                    Ok(NotificationRow {
                        id: row.get(0)?,
                        user_id: row.get(1)?,
                        listing_id: row.get(2)?,
                        message: row.get(3)?,
                        read: row.get(4)?,
                        created_at: row.get(5)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Returns `false` when no such notification exists.
    pub fn mark_notification_read(&self, id: &str) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let changed = conn.execute("UPDATE admin_notifications SET read = 1 WHERE id = ?1", [id])?;
            Ok(changed == 1)
        })
    }
}
