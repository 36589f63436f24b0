//! DuckDB storage for regulation excerpts.

use std::path::Path;

use arrow::record_batch::RecordBatch;
use chrono::{NaiveDateTime, Utc};
use duckdb::{AccessMode, Config, Connection, params};
use regscope_core::Regulation;
use tracing::{debug, error, info, warn};

use crate::{StoreError, decode};

/// Rows written per transaction by [`RegulationStore::upsert_many`].
pub const COMMIT_BATCH_SIZE: usize = 100;

const SCHEMA_SQL: &str = "
    CREATE SEQUENCE IF NOT EXISTS regulations_id_seq START 1;
    CREATE TABLE IF NOT EXISTS regulations (
        id BIGINT PRIMARY KEY DEFAULT nextval('regulations_id_seq'),
        title VARCHAR,
        part VARCHAR,
        section VARCHAR,
        full_text VARCHAR,
        starts_on DATE,
        ends_on DATE,
        hierarchy VARCHAR,
        hierarchy_headings VARCHAR,
        headings VARCHAR,
        last_updated TIMESTAMP
    );
    CREATE INDEX IF NOT EXISTS idx_full_text ON regulations(full_text);
    CREATE INDEX IF NOT EXISTS idx_title ON regulations(title);
";

const INSERT_SQL: &str = "
    INSERT INTO regulations
        (title, part, section, full_text, starts_on, ends_on,
         hierarchy, hierarchy_headings, headings, last_updated)
    VALUES (?, ?, ?, ?, CAST(? AS DATE), CAST(? AS DATE), ?, ?, ?, CAST(? AS TIMESTAMP))
";

const DELETE_BY_NATURAL_KEY_SQL: &str = "
    DELETE FROM regulations
    WHERE title IS NOT DISTINCT FROM ?
      AND part IS NOT DISTINCT FROM ?
      AND section IS NOT DISTINCT FROM ?
      AND starts_on IS NOT DISTINCT FROM CAST(? AS DATE)
";

const COLUMNS: &str = "id, title, part, section, full_text, starts_on, ends_on, \
                       hierarchy, hierarchy_headings, headings, last_updated";

/// How [`RegulationStore::upsert_many`] treats a record that is already stored.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum UpsertMode {
    /// Always insert. The id is sequence-assigned, so re-ingesting the same
    /// source data appends a second copy of every row.
    #[default]
    Append,
    /// Replace rows sharing `(title, part, section, starts_on)`, comparing
    /// nulls as equal. Re-ingesting leaves the row count unchanged.
    NaturalKey,
}

/// Outcome of a batched write.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpsertReport {
    pub written: usize,
    pub skipped: usize,
}

/// One page of substring matches.
#[derive(Debug, Clone)]
pub struct SearchPage {
    pub regulations: Vec<Regulation>,
    pub total_count: u64,
    /// `ceil(total_count / per_page)`; zero when nothing matched.
    pub total_pages: u32,
    pub current_page: u32,
}

/// DuckDB store holding the `regulations` table.
///
/// Supports both in-memory (tests, throwaway runs) and persistent
/// (file-backed) modes. A store owns one connection; use
/// [`try_clone`](Self::try_clone) to get an independent connection to the
/// same database for each logical operation.
pub struct RegulationStore {
    conn: Connection,
}

impl RegulationStore {
    /// Open an in-memory DuckDB database.
    pub fn open() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        Ok(Self { conn })
    }

    /// Open or create a persistent DuckDB database at the given path.
    pub fn open_persistent(path: &Path) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        debug!(path = %path.display(), "opened regulation store");
        Ok(Self { conn })
    }

    /// Open an existing database file without taking the write lock.
    ///
    /// Several read-only handles may coexist, but none can be opened while
    /// another process holds the file read-write, and vice versa.
    pub fn open_read_only(path: &Path) -> Result<Self, StoreError> {
        let config = Config::default().access_mode(AccessMode::ReadOnly)?;
        let conn = Connection::open_with_flags(path, config)?;
        debug!(path = %path.display(), "opened regulation store read-only");
        Ok(Self { conn })
    }

    /// New connection to the same database.
    pub fn try_clone(&self) -> Result<Self, StoreError> {
        Ok(Self {
            conn: self.conn.try_clone()?,
        })
    }

    /// Create the table, its id sequence, and the `full_text`/`title` indexes.
    ///
    /// Safe to call on every startup.
    pub fn initialize(&self) -> Result<(), StoreError> {
        self.conn.execute_batch(SCHEMA_SQL)?;
        info!("regulation store initialized");
        Ok(())
    }

    /// Number of rows in the `regulations` table.
    pub fn count(&self) -> Result<u64, StoreError> {
        let n: i64 = self
            .conn
            .query_row("SELECT count(*) FROM regulations", [], |row| row.get(0))?;
        Ok(n as u64)
    }

    // ── Writes ──

    /// Write records in transactions of [`COMMIT_BATCH_SIZE`].
    ///
    /// Every row gets `last_updated` set to the current UTC time and a fresh
    /// id. When a batch fails it is rolled back and replayed one row at a
    /// time; rows that still fail are logged and counted as skipped, so
    /// earlier batches stay committed and one bad row never costs its
    /// neighbours.
    pub fn upsert_many(
        &mut self,
        records: &[Regulation],
        mode: UpsertMode,
    ) -> Result<UpsertReport, StoreError> {
        let mut report = UpsertReport::default();

        for chunk in records.chunks(COMMIT_BATCH_SIZE) {
            let now = Utc::now().naive_utc();
            match self.write_batch(chunk, mode, now) {
                Ok(()) => report.written += chunk.len(),
                Err(e) => {
                    warn!(error = %e, rows = chunk.len(), "batch write failed, replaying row by row");
                    for record in chunk {
                        match self.write_batch(std::slice::from_ref(record), mode, now) {
                            Ok(()) => report.written += 1,
                            Err(e) => {
                                error!(
                                    error = %e,
                                    title = ?record.title,
                                    part = ?record.part,
                                    section = ?record.section,
                                    "skipping record"
                                );
                                report.skipped += 1;
                            }
                        }
                    }
                }
            }
            debug!(written = report.written, skipped = report.skipped, "committed batch");
        }

        Ok(report)
    }

    fn write_batch(
        &mut self,
        records: &[Regulation],
        mode: UpsertMode,
        now: NaiveDateTime,
    ) -> Result<(), StoreError> {
        let tx = self.conn.transaction()?;
        for record in records {
            write_row(&tx, record, mode, now)?;
        }
        tx.commit()?;
        Ok(())
    }

    // ── Reads ──

    /// Case-insensitive substring search over `full_text`.
    ///
    /// Matches `full_text ILIKE '%query%'`: no tokenisation, no ranking, and
    /// `%`/`_` in `query` keep their LIKE meaning. Rows come back in insertion
    /// order. `page` is 1-based.
    pub fn search(&self, query: &str, page: u32, per_page: u32) -> Result<SearchPage, StoreError> {
        if page == 0 || per_page == 0 {
            return Err(StoreError::InvalidPagination { page, per_page });
        }
        let pattern = format!("%{query}%");

        let total_count: i64 = self.conn.query_row(
            "SELECT count(*) FROM regulations WHERE full_text ILIKE ?",
            params![pattern],
            |row| row.get(0),
        )?;
        let total_count = total_count as u64;

        let offset = u64::from(page - 1) * u64::from(per_page);
        let sql = format!(
            "SELECT {COLUMNS} FROM regulations WHERE full_text ILIKE ? \
             ORDER BY id LIMIT {per_page} OFFSET {offset}"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let batches: Vec<RecordBatch> = stmt.query_arrow(params![pattern])?.collect();
        let regulations = decode::regulations(&batches)?;

        debug!(query, page, per_page, total_count, rows = regulations.len(), "searched regulations");
        Ok(SearchPage {
            regulations,
            total_count,
            total_pages: total_pages(total_count, per_page),
            current_page: page,
        })
    }

    /// Every stored row in insertion order.
    pub fn all(&self) -> Result<Vec<Regulation>, StoreError> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT {COLUMNS} FROM regulations ORDER BY id"))?;
        let batches: Vec<RecordBatch> = stmt.query_arrow([])?.collect();
        decode::regulations(&batches)
    }
}

fn write_row(
    conn: &Connection,
    record: &Regulation,
    mode: UpsertMode,
    now: NaiveDateTime,
) -> Result<(), StoreError> {
    let starts_on = record.starts_on.map(|d| d.to_string());
    let ends_on = record.ends_on.map(|d| d.to_string());

    if mode == UpsertMode::NaturalKey {
        conn.execute(
            DELETE_BY_NATURAL_KEY_SQL,
            params![record.title, record.part, record.section, starts_on],
        )?;
    }

    conn.execute(
        INSERT_SQL,
        params![
            record.title,
            record.part,
            record.section,
            record.full_text,
            starts_on,
            ends_on,
            serde_json::to_string(&record.hierarchy)?,
            serde_json::to_string(&record.hierarchy_headings)?,
            serde_json::to_string(&record.headings)?,
            now.format("%Y-%m-%d %H:%M:%S%.6f").to_string(),
        ],
    )?;
    Ok(())
}

fn total_pages(total_count: u64, per_page: u32) -> u32 {
    total_count.div_ceil(u64::from(per_page)) as u32
}
