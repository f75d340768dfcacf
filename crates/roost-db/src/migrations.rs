use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);")?;

    let version: i64 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_version",
        [],
        |r| r.get(0),
    )?;

    if version < 1 {
        info!("Running migration v1 (marketplace schema)");
        conn.execute_batch(
            "
            CREATE TABLE users (
                id          TEXT PRIMARY KEY,
                name        TEXT NOT NULL,
                email       TEXT NOT NULL UNIQUE,
                password    TEXT NOT NULL,
                phone       TEXT NOT NULL,
                location    TEXT NOT NULL,
                created_at  TEXT NOT NULL,
                updated_at  TEXT NOT NULL
            );

            CREATE TABLE listings (
                id                  TEXT PRIMARY KEY,
                user_id             TEXT NOT NULL,
                title               TEXT NOT NULL,
                description         TEXT NOT NULL,
                category            TEXT NOT NULL,
                price               REAL NOT NULL,
                images              TEXT NOT NULL DEFAULT '[]',
                location            TEXT NOT NULL,
                breed               TEXT,
                age                 TEXT,
                health_status       TEXT,
                size                TEXT,
                material            TEXT,
                condition           TEXT,
                egg_type            TEXT,
                laid_date           TEXT,
                feed_type           TEXT,
                quantity_available  TEXT,
                farm_practices      TEXT,
                is_active           INTEGER NOT NULL DEFAULT 1,
                created_at          TEXT NOT NULL,
                updated_at          TEXT NOT NULL
            );

            CREATE INDEX idx_listings_active_created
                ON listings(is_active, created_at);
            CREATE INDEX idx_listings_user
                ON listings(user_id);

            CREATE TABLE messages (
                id          TEXT PRIMARY KEY,
                sender_id   TEXT NOT NULL,
                receiver_id TEXT NOT NULL,
                listing_id  TEXT NOT NULL,
                content     TEXT NOT NULL,
                read        INTEGER NOT NULL DEFAULT 0,
                created_at  TEXT NOT NULL
            );

            CREATE INDEX idx_messages_sender ON messages(sender_id, created_at);
            CREATE INDEX idx_messages_receiver ON messages(receiver_id, created_at);

            CREATE TABLE ratings (
                id          TEXT PRIMARY KEY,
                seller_id   TEXT NOT NULL,
                buyer_id    TEXT NOT NULL,
                listing_id  TEXT NOT NULL,
                rating      INTEGER NOT NULL CHECK (rating BETWEEN 1 AND 5),
                review      TEXT,
                created_at  TEXT NOT NULL,
                UNIQUE(seller_id, buyer_id, listing_id)
            );

            CREATE INDEX idx_ratings_seller ON ratings(seller_id, created_at);

            CREATE TABLE follows (
                id            TEXT PRIMARY KEY,
                follower_id   TEXT NOT NULL,
                following_id  TEXT NOT NULL,
                created_at    TEXT NOT NULL,
                UNIQUE(follower_id, following_id),
                CHECK (follower_id <> following_id)
            );

            CREATE INDEX idx_follows_following ON follows(following_id);

            CREATE TABLE listing_flags (
                id           TEXT PRIMARY KEY,
                listing_id   TEXT NOT NULL,
                reporter_id  TEXT NOT NULL,
                reason       TEXT NOT NULL,
                description  TEXT,
                status       TEXT NOT NULL DEFAULT 'pending',
                created_at   TEXT NOT NULL
            );

            -- One open report per reporter and listing
            CREATE UNIQUE INDEX idx_flags_pending
                ON listing_flags(listing_id, reporter_id) WHERE status = 'pending';

            CREATE TABLE admin_actions (
                id          TEXT PRIMARY KEY,
                admin_id    TEXT NOT NULL,
                listing_id  TEXT NOT NULL,
                action      TEXT NOT NULL,
                reason      TEXT,
                created_at  TEXT NOT NULL
            );

            CREATE TABLE admin_notifications (
                id          TEXT PRIMARY KEY,
                user_id     TEXT NOT NULL,
                listing_id  TEXT NOT NULL,
                message     TEXT NOT NULL,
                read        INTEGER NOT NULL DEFAULT 0,
                created_at  TEXT NOT NULL
            );

            CREATE INDEX idx_notifications_user ON admin_notifications(user_id, created_at);

            INSERT INTO schema_version (version) VALUES (1);
            ",
        )?;
    }

    info!("Database migrations complete");
    Ok(())
}
