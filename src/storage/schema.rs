//! Database schema definitions
//!
//! The persisted dedup store keeps one row per (scope, url).

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- URLs already written (articles) or downloaded (media)
CREATE TABLE IF NOT EXISTS seen_urls (
    scope TEXT NOT NULL,
    url TEXT NOT NULL,
    first_seen_at TEXT NOT NULL,
    PRIMARY KEY (scope, url)
);

CREATE INDEX IF NOT EXISTS idx_seen_urls_scope ON seen_urls(scope);
"#;

/// Initializes the database schema
///
/// # Arguments
///
/// * `conn` - The database connection
///
/// # Returns
///
/// * `Ok(())` - Schema initialized successfully
/// * `Err(rusqlite::Error)` - Failed to initialize schema
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}
