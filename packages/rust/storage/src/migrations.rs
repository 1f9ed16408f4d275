//! SQL migration definitions for the skumap database.
//!
//! Migrations are applied in order on database open. Each migration has a
//! version number and a batch of SQL statements.

/// A database migration with a version and SQL statements.
pub(crate) struct Migration {
    pub version: u32,
    pub description: &'static str,
    pub sql: &'static str,
}

/// All migrations, in ascending version order.
pub(crate) fn all_migrations() -> Vec<Migration> {
    vec![Migration {
        version: 1,
        description: "Initial schema: processed_files, sku_mappings",
        sql: r#"
-- Schema version tracking
CREATE TABLE IF NOT EXISTS schema_migrations (
    version    INTEGER PRIMARY KEY,
    applied_at TEXT NOT NULL DEFAULT (datetime('now'))
);

-- One row per processed upload
CREATE TABLE IF NOT EXISTS processed_files (
    id            TEXT PRIMARY KEY,
    filename      TEXT NOT NULL,
    content_hash  TEXT NOT NULL,
    total_rows    INTEGER NOT NULL,
    columns_count INTEGER NOT NULL,
    columns_json  TEXT NOT NULL,
    processed_at  TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_processed_files_at ON processed_files(processed_at);
CREATE INDEX IF NOT EXISTS idx_processed_files_hash ON processed_files(content_hash);

-- Sample (original, resolved) pairs per processed upload
CREATE TABLE IF NOT EXISTS sku_mappings (
    id            INTEGER PRIMARY KEY AUTOINCREMENT,
    file_id       TEXT NOT NULL REFERENCES processed_files(id) ON DELETE CASCADE,
    position      INTEGER NOT NULL,
    source_column TEXT NOT NULL,
    original_sku  TEXT NOT NULL,
    mapped_msku   TEXT,
    created_at    TEXT NOT NULL,
    UNIQUE(file_id, position)
);

CREATE INDEX IF NOT EXISTS idx_sku_mappings_file ON sku_mappings(file_id);
CREATE INDEX IF NOT EXISTS idx_sku_mappings_original ON sku_mappings(original_sku);

INSERT INTO schema_migrations (version) VALUES (1);
"#,
    }]
}
