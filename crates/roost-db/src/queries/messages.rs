use anyhow::Result;
use rusqlite::Row;

use crate::Database;
use crate::models::MessageRow;

const MESSAGE_COLUMNS: &str = "id, sender_id, receiver_id, listing_id, content, read, created_at";

impl Database {
    pub fn insert_message(&self, message: &MessageRow) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO messages (id, sender_id, receiver_id, listing_id, content, read, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                rusqlite::params![
                    message.id,
                    message.sender_id,
                    message.receiver_id,
                    message.listing_id,
                    message.content,
                    message.read,
                    message.created_at,
                ],
            )?;
            Ok(())
        })
    }

    /// Every message `user_id` sent or received, newest first. Messages
    /// sharing a timestamp come back in reverse insertion order.
    pub fn get_messages_involving(&self, user_id: &str) -> Result<Vec<MessageRow>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {} FROM messages
                 WHERE sender_id = ?1 OR receiver_id = ?1
                 ORDER BY created_at DESC, rowid DESC",
                MESSAGE_COLUMNS
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([user_id], message_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// The thread between two users about one listing, oldest first.
    pub fn get_thread(&self, listing_id: &str, user_a: &str, user_b: &str) -> Result<Vec<MessageRow>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {} FROM messages
                 WHERE listing_id = ?1
                   AND ((sender_id = ?2 AND receiver_id = ?3) OR (sender_id = ?3 AND receiver_id = ?2))
                 ORDER BY created_at ASC, rowid ASC",
                MESSAGE_COLUMNS
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(rusqlite::params![listing_id, user_a, user_b], message_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Marks the thread's messages addressed to `receiver_id` as read.
    /// Returns how many changed.
    pub fn mark_thread_read(&self, listing_id: &str, receiver_id: &str, sender_id: &str) -> Result<usize> {
        self.with_conn_mut(|conn| {
            let changed = conn.execute(
                "UPDATE messages SET read = 1
                 WHERE listing_id = ?1 AND receiver_id = ?2 AND sender_id = ?3 AND read = 0",
                rusqlite::params![listing_id, receiver_id, sender_id],
            )?;
            Ok(changed)
        })
    }

    pub fn count_messages(&self) -> Result<i64> {
        self.with_conn(|conn| {
            Ok(conn.query_row("SELECT COUNT(*) FROM messages", [], |row| row.get(0))?)
        })
    }
}

fn message_from_row(row: &Row<'_>) -> rusqlite::Result<MessageRow> {
    Ok(MessageRow {
        id: row.get(0)?,
        sender_id: row.get(1)?,
        receiver_id: row.get(2)?,
        listing_id: row.get(3)?,
        content: row.get(4)?,
        read: row.get(5)?,
        created_at: row.get(6)?,
    })
}
