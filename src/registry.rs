use std::path::Path;

use rusqlite::{params, Connection};

use crate::canon::PatternDigest;
use crate::error::Result;
use crate::node::NodeOrigin;
use crate::result::DetectionResult;

/// Durable registry of canonical patterns and their concrete occurrences.
///
/// Interning is keyed by the canonical hash: the same shape always maps to
/// the same row no matter which snapshot or process discovered it.
/// Instances are never deduplicated; every recorded occurrence is a row.
pub trait PatternStore {
    /// Insert the pattern if its hash is new, and return the row id either
    /// way.
    fn intern_pattern(
        &mut self,
        dump: &str,
        digest: &PatternDigest,
        weight: usize,
        kind: &str,
    ) -> Result<i64>;

    /// Record one concrete occurrence of an interned pattern.
    fn record_instance(
        &mut self,
        pattern_id: i64,
        commit_id: Option<i64>,
        origin: &NodeOrigin,
    ) -> Result<i64>;

    /// Register a snapshot label, returning its existing id if seen before.
    fn record_commit(&mut self, label: &str) -> Result<i64>;

    /// Persist a detection run's clusters and their member origins.
    fn persist_result(&mut self, commit_id: Option<i64>, result: &DetectionResult) -> Result<()>;
}

/// SQLite-backed [`PatternStore`].
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Open (creating if needed) the database at `path`.
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        Self::from_connection(conn)
    }

    /// An in-memory store, used in tests and for dry runs.
    pub fn in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS commits (
                id INTEGER PRIMARY KEY,
                label TEXT NOT NULL UNIQUE
            );
            CREATE TABLE IF NOT EXISTS patterns (
                id INTEGER PRIMARY KEY,
                hash TEXT NOT NULL UNIQUE,
                dump TEXT NOT NULL,
                weight INTEGER NOT NULL,
                kind TEXT NOT NULL
            );
            CREATE TABLE IF NOT EXISTS pattern_instances (
                id INTEGER PRIMARY KEY,
                pattern_id INTEGER NOT NULL REFERENCES patterns(id),
                commit_id INTEGER REFERENCES commits(id),
                file TEXT NOT NULL,
                line INTEGER NOT NULL,
                col INTEGER NOT NULL
            );
            CREATE TABLE IF NOT EXISTS clusters (
                id INTEGER PRIMARY KEY,
                commit_id INTEGER REFERENCES commits(id),
                value TEXT NOT NULL,
                weight INTEGER NOT NULL
            );
            CREATE TABLE IF NOT EXISTS origins (
                id INTEGER PRIMARY KEY,
                cluster_id INTEGER NOT NULL REFERENCES clusters(id),
                file TEXT NOT NULL,
                line INTEGER NOT NULL,
                col INTEGER NOT NULL,
                similarity REAL NOT NULL
            );",
        )?;
        Ok(Self { conn })
    }

    /// Number of interned patterns, for reporting.
    pub fn pattern_count(&self) -> Result<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM patterns", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    /// Number of recorded instances, for reporting.
    pub fn instance_count(&self) -> Result<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM pattern_instances", [], |row| {
                row.get(0)
            })?;
        Ok(count as usize)
    }
}

impl PatternStore for SqliteStore {
    fn intern_pattern(
        &mut self,
        dump: &str,
        digest: &PatternDigest,
        weight: usize,
        kind: &str,
    ) -> Result<i64> {
        let hash = digest.to_hex();
        // Upsert-and-reselect: concurrent writers may race on the insert,
        // but the reselect always lands on the winning row.
        self.conn.execute(
            "INSERT INTO patterns (hash, dump, weight, kind) VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(hash) DO NOTHING",
            params![hash, dump, weight as i64, kind],
        )?;
        let id = self.conn.query_row(
            "SELECT id FROM patterns WHERE hash = ?1",
            params![hash],
            |row| row.get(0),
        )?;
        Ok(id)
    }

    fn record_instance(
        &mut self,
        pattern_id: i64,
        commit_id: Option<i64>,
        origin: &NodeOrigin,
    ) -> Result<i64> {
        self.conn.execute(
            "INSERT INTO pattern_instances (pattern_id, commit_id, file, line, col)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                pattern_id,
                commit_id,
                origin.file.to_string_lossy(),
                origin.line as i64,
                origin.column as i64
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn record_commit(&mut self, label: &str) -> Result<i64> {
        self.conn.execute(
            "INSERT INTO commits (label) VALUES (?1) ON CONFLICT(label) DO NOTHING",
            params![label],
        )?;
        let id = self.conn.query_row(
            "SELECT id FROM commits WHERE label = ?1",
            params![label],
            |row| row.get(0),
        )?;
        Ok(id)
    }

    fn persist_result(&mut self, commit_id: Option<i64>, result: &DetectionResult) -> Result<()> {
        let tx = self.conn.transaction()?;
        for clone in &result.clones {
            tx.execute(
                "INSERT INTO clusters (commit_id, value, weight) VALUES (?1, ?2, ?3)",
                params![commit_id, clone.value, clone.match_weight as i64],
            )?;
            let cluster_id = tx.last_insert_rowid();
            for (origin, similarity) in &clone.origins {
                tx.execute(
                    "INSERT INTO origins (cluster_id, file, line, col, similarity)
                     VALUES (?1, ?2, ?3, ?4, ?5)",
                    params![
                        cluster_id,
                        origin.file.to_string_lossy(),
                        origin.line as i64,
                        origin.column as i64,
                        similarity
                    ],
                )?;
            }
        }
        tx.commit()?;
        Ok(())
    }
}
