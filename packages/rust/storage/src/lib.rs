//! libSQL storage layer for processed uploads.
//!
//! The [`Storage`] struct wraps a local libSQL database holding one row per
//! processed file (`processed_files`) and the sample mappings captured from
//! it (`sku_mappings`).
//!
//! **Access rules:**
//! - upload pipeline: read-write via [`Storage::open`]
//! - reporting (`skumap results`, `skumap db status`): read-only via [`Storage::open_readonly`]

mod migrations;

use std::path::Path;

use chrono::{DateTime, Utc};
use libsql::{Connection, Database, params};
use serde::Serialize;

use skumap_shared::{
    FileId, MappingRecord, ProcessedFile, ProcessedFileRecord, Result, SkuMapError,
};

/// Primary storage handle wrapping a libSQL database.
pub struct Storage {
    #[allow(dead_code)]
    db: Database,
    conn: Connection,
    readonly: bool,
}

/// Row counts reported by [`Storage::status`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StorageStatus {
    pub files_processed: u64,
    pub sku_mappings: u64,
}

fn db_err(e: impl std::fmt::Display) -> SkuMapError {
    SkuMapError::Storage(e.to_string())
}

impl Storage {
    /// Open or create a database at `path` in read-write mode.
    pub async fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| SkuMapError::io(parent, e))?;
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(db_err)?;
        let conn = db.connect().map_err(db_err)?;

        let storage = Self {
            db,
            conn,
            readonly: false,
        };
        storage.run_migrations().await?;
        Ok(storage)
    }

    /// Open an existing database at `path` in read-only mode.
    pub async fn open_readonly(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(SkuMapError::Storage(format!(
                "database not found at {}",
                path.display()
            )));
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(db_err)?;
        let conn = db.connect().map_err(db_err)?;

        Ok(Self {
            db,
            conn,
            readonly: true,
        })
    }

    /// Run pending schema migrations.
    async fn run_migrations(&self) -> Result<()> {
        let current_version = self.get_schema_version().await;

        for migration in migrations::all_migrations() {
            if migration.version > current_version {
                tracing::info!(
                    version = migration.version,
                    description = migration.description,
                    "applying migration"
                );
                self.conn.execute_batch(migration.sql).await.map_err(|e| {
                    SkuMapError::Storage(format!("migration v{} failed: {e}", migration.version))
                })?;
            }
        }
        Ok(())
    }

    /// Get the current schema version, or 0 if no migrations have been applied.
    async fn get_schema_version(&self) -> u32 {
        let result = self
            .conn
            .query("SELECT MAX(version) FROM schema_migrations", params![])
            .await;

        match result {
            Ok(mut rows) => {
                if let Ok(Some(row)) = rows.next().await {
                    row.get::<u32>(0).unwrap_or(0)
                } else {
                    0
                }
            }
            Err(_) => 0, // Table doesn't exist yet
        }
    }

    /// Ensure we're in read-write mode before writing.
    fn check_writable(&self) -> Result<()> {
        if self.readonly {
            return Err(SkuMapError::Storage(
                "database is opened in read-only mode".into(),
            ));
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Processed files
    // -----------------------------------------------------------------------

    /// Record a processed upload and its sample mappings in one transaction.
    ///
    /// Either the file row and every sample row are stored, or nothing is.
    pub async fn record_processed_file(&self, file: &ProcessedFile) -> Result<FileId> {
        self.check_writable()?;
        let id = FileId::new();
        let id_str = id.to_string();
        let now = Utc::now().to_rfc3339();
        let columns_json = serde_json::to_string(&file.columns).map_err(db_err)?;

        let tx = self.conn.transaction().await.map_err(db_err)?;

        tx.execute(
            "INSERT INTO processed_files
               (id, filename, content_hash, total_rows, columns_count, columns_json, processed_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                id_str.as_str(),
                file.filename.as_str(),
                file.content_hash.as_str(),
                file.total_rows as i64,
                file.columns_count as i64,
                columns_json.as_str(),
                now.as_str(),
            ],
        )
        .await
        .map_err(db_err)?;

        for (position, sample) in file.samples.iter().enumerate() {
            tx.execute(
                "INSERT INTO sku_mappings
                   (file_id, position, source_column, original_sku, mapped_msku, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    id_str.as_str(),
                    position as i64,
                    sample.column.as_str(),
                    sample.original.as_token(),
                    sample.resolved.as_deref(),
                    now.as_str(),
                ],
            )
            .await
            .map_err(db_err)?;
        }

        tx.commit().await.map_err(db_err)?;

        tracing::debug!(
            file_id = %id,
            filename = %file.filename,
            samples = file.samples.len(),
            "recorded processed file"
        );
        Ok(id)
    }

    /// Get a processed file by ID.
    pub async fn get_processed_file(&self, id: &FileId) -> Result<Option<ProcessedFileRecord>> {
        let mut rows = self
            .conn
            .query(
                "SELECT id, filename, content_hash, total_rows, columns_count, columns_json, processed_at
                 FROM processed_files WHERE id = ?1",
                params![id.to_string()],
            )
            .await
            .map_err(db_err)?;

        match rows.next().await {
            Ok(Some(row)) => Ok(Some(row_to_processed_file(&row)?)),
            Ok(None) => Ok(None),
            Err(e) => Err(db_err(e)),
        }
    }

    /// Most recently processed files first.
    pub async fn list_processed_files(&self, limit: u32) -> Result<Vec<ProcessedFileRecord>> {
        let mut rows = self
            .conn
            .query(
                "SELECT id, filename, content_hash, total_rows, columns_count, columns_json, processed_at
                 FROM processed_files ORDER BY processed_at DESC, id DESC LIMIT ?1",
                params![limit],
            )
            .await
            .map_err(db_err)?;

        let mut results = Vec::new();
        while let Ok(Some(row)) = rows.next().await {
            results.push(row_to_processed_file(&row)?);
        }
        Ok(results)
    }

    /// Delete a processed file; its mappings go with it.
    pub async fn delete_processed_file(&self, id: &FileId) -> Result<()> {
        self.check_writable()?;
        let id_str = id.to_string();
        let tx = self.conn.transaction().await.map_err(db_err)?;
        tx.execute(
            "DELETE FROM sku_mappings WHERE file_id = ?1",
            params![id_str.as_str()],
        )
        .await
        .map_err(db_err)?;
        tx.execute(
            "DELETE FROM processed_files WHERE id = ?1",
            params![id_str.as_str()],
        )
        .await
        .map_err(db_err)?;
        tx.commit().await.map_err(db_err)?;
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Mappings
    // -----------------------------------------------------------------------

    /// Sample mappings for a file, in the order they were captured.
    pub async fn mappings_for_file(&self, id: &FileId) -> Result<Vec<MappingRecord>> {
        let mut rows = self
            .conn
            .query(
                "SELECT file_id, source_column, original_sku, mapped_msku, created_at
                 FROM sku_mappings WHERE file_id = ?1 ORDER BY position",
                params![id.to_string()],
            )
            .await
            .map_err(db_err)?;

        let mut results = Vec::new();
        while let Ok(Some(row)) = rows.next().await {
            results.push(row_to_mapping(&row)?);
        }
        Ok(results)
    }

    /// Counts of processed files and stored mappings.
    pub async fn status(&self) -> Result<StorageStatus> {
        Ok(StorageStatus {
            files_processed: self.count("SELECT COUNT(*) FROM processed_files").await?,
            sku_mappings: self.count("SELECT COUNT(*) FROM sku_mappings").await?,
        })
    }

    async fn count(&self, sql: &str) -> Result<u64> {
        let mut rows = self.conn.query(sql, params![]).await.map_err(db_err)?;
        match rows.next().await {
            Ok(Some(row)) => Ok(row.get::<i64>(0).map_err(db_err)? as u64),
            Ok(None) => Ok(0),
            Err(e) => Err(db_err(e)),
        }
    }
}

fn parse_timestamp(s: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| SkuMapError::Storage(format!("invalid date: {e}")))
}

fn parse_file_id(s: &str) -> Result<FileId> {
    s.parse()
        .map_err(|e| SkuMapError::Storage(format!("invalid file id '{s}': {e}")))
}

/// Convert a database row to a [`ProcessedFileRecord`].
fn row_to_processed_file(row: &libsql::Row) -> Result<ProcessedFileRecord> {
    let columns_json: String = row.get(5).map_err(db_err)?;
    Ok(ProcessedFileRecord {
        id: parse_file_id(&row.get::<String>(0).map_err(db_err)?)?,
        filename: row.get::<String>(1).map_err(db_err)?,
        content_hash: row.get::<String>(2).map_err(db_err)?,
        total_rows: row.get::<i64>(3).map_err(db_err)? as usize,
        columns_count: row.get::<i64>(4).map_err(db_err)? as usize,
        columns: serde_json::from_str(&columns_json).map_err(db_err)?,
        processed_at: parse_timestamp(&row.get::<String>(6).map_err(db_err)?)?,
    })
}

/// Convert a database row to a [`MappingRecord`].
fn row_to_mapping(row: &libsql::Row) -> Result<MappingRecord> {
    Ok(MappingRecord {
        file_id: parse_file_id(&row.get::<String>(0).map_err(db_err)?)?,
        source_column: row.get::<String>(1).map_err(db_err)?,
        original_sku: row.get::<String>(2).map_err(db_err)?,
        mapped_msku: row.get::<String>(3).ok(),
        created_at: parse_timestamp(&row.get::<String>(4).map_err(db_err)?)?,
    })
}
