//! SQLite schema management.

use rusqlite::Connection;

/// Initialize the database schema.
pub fn init_schema(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA)
}

const SCHEMA: &str = r#"
-- Item store: uid -> encoded payload
CREATE TABLE IF NOT EXISTS items (
    key TEXT NOT NULL,
    uid TEXT NOT NULL,
    payload BLOB NOT NULL,
    PRIMARY KEY (key, uid)
);

-- Ready queue: insertion sequence gives FIFO order
CREATE TABLE IF NOT EXISTS ready (
    seq INTEGER PRIMARY KEY AUTOINCREMENT,
    key TEXT NOT NULL,
    uid TEXT NOT NULL
);

-- Checkout ledger: scored by checkout time in microseconds
CREATE TABLE IF NOT EXISTS checkouts (
    key TEXT NOT NULL,
    uid TEXT NOT NULL,
    checkout_at INTEGER NOT NULL,
    PRIMARY KEY (key, uid)
);

CREATE INDEX IF NOT EXISTS idx_ready_key_seq ON ready(key, seq);
CREATE INDEX IF NOT EXISTS idx_checkouts_age ON checkouts(key, checkout_at);
"#;
