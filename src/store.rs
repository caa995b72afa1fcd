use crate::app_dirs::AppDirs;
use chrono::{DateTime, Local};
use rusqlite::{params, Connection, Result};
use serde::Serialize;
use std::collections::HashMap;
use std::error::Error;
use std::path::{Path, PathBuf};

/// One completed round, as logged for history and CSV export.
#[derive(Debug, Clone, Serialize)]
pub struct RoundRecord {
    pub difficulty: String,
    pub sightread: bool,
    pub elapsed_ms: u64,
    pub recorded_at: DateTime<Local>,
}

/// A stored best rolling average, as shown on the stats screen.
#[derive(Debug, Clone)]
pub struct BestEntry {
    pub key: String,
    pub value: String,
    pub updated_at: DateTime<Local>,
}

/// Key-value store used by the timing tracker. All operations degrade
/// silently; the tracker never learns whether persistence worked.
pub trait ScoreStore {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&mut self, key: &str, value: &str);
    /// Successful rounds are offered to the store for history. Ignoring
    /// them is a valid implementation.
    fn log_round(&mut self, _record: &RoundRecord) {}
}

/// In-memory store; the session-only fallback when the database cannot be
/// opened, and the store of choice in tests.
#[derive(Debug, Default)]
pub struct MemoryScoreStore {
    values: HashMap<String, String>,
    pub rounds: Vec<RoundRecord>,
}

impl ScoreStore for MemoryScoreStore {
    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) {
        self.values.insert(key.to_string(), value.to_string());
    }

    fn log_round(&mut self, record: &RoundRecord) {
        self.rounds.push(record.clone());
    }
}

/// SQLite-backed store for best averages and round history
#[derive(Debug)]
pub struct ScoreDb {
    conn: Connection,
}

impl ScoreDb {
    /// Open the database at the standard state path, creating tables as
    /// needed.
    pub fn new() -> Result<Self> {
        let db_path = Self::db_path().unwrap_or_else(|| PathBuf::from("kombo_scores.db"));

        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                rusqlite::Error::SqliteFailure(
                    rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_CANTOPEN),
                    Some(format!("Failed to create directory: {}", e)),
                )
            })?;
        }

        Self::open(Connection::open(&db_path)?)
    }

    pub fn with_path<P: AsRef<Path>>(p: P) -> Result<Self> {
        Self::open(Connection::open(p)?)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::open(Connection::open_in_memory()?)
    }

    fn open(conn: Connection) -> Result<Self> {
        conn.execute(
            r#"
            CREATE TABLE IF NOT EXISTS high_scores (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )
            "#,
            [],
        )?;

        conn.execute(
            r#"
            CREATE TABLE IF NOT EXISTS rounds (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                difficulty TEXT NOT NULL,
                sightread BOOLEAN NOT NULL,
                elapsed_ms INTEGER NOT NULL,
                recorded_at TEXT NOT NULL
            )
            "#,
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_rounds_recorded_at ON rounds(recorded_at)",
            [],
        )?;

        Ok(ScoreDb { conn })
    }

    fn db_path() -> Option<PathBuf> {
        AppDirs::db_path()
    }

    fn get_value(&self, key: &str) -> Result<Option<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT value FROM high_scores WHERE key = ?1")?;
        let mut rows = stmt.query_map([key], |row| row.get::<_, String>(0))?;
        rows.next().transpose()
    }

    fn set_value(&self, key: &str, value: &str) -> Result<()> {
        self.conn.execute(
            r#"
            INSERT INTO high_scores (key, value, updated_at)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                updated_at = excluded.updated_at
            "#,
            params![key, value, Local::now().to_rfc3339()],
        )?;
        Ok(())
    }

    fn insert_round(&self, record: &RoundRecord) -> Result<()> {
        self.conn.execute(
            r#"
            INSERT INTO rounds (difficulty, sightread, elapsed_ms, recorded_at)
            VALUES (?1, ?2, ?3, ?4)
            "#,
            params![
                record.difficulty,
                record.sightread,
                record.elapsed_ms,
                record.recorded_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// All stored best averages, most recently updated first.
    pub fn best_entries(&self) -> Result<Vec<BestEntry>> {
        let mut stmt = self.conn.prepare(
            "SELECT key, value, updated_at FROM high_scores ORDER BY updated_at DESC",
        )?;

        let entry_iter = stmt.query_map([], |row| {
            let updated_str: String = row.get(2)?;
            let updated_at = DateTime::parse_from_rfc3339(&updated_str)
                .map_err(|_| {
                    rusqlite::Error::InvalidColumnType(
                        2,
                        "updated_at".to_string(),
                        rusqlite::types::Type::Text,
                    )
                })?
                .with_timezone(&Local);

            Ok(BestEntry {
                key: row.get(0)?,
                value: row.get(1)?,
                updated_at,
            })
        })?;

        let mut entries = Vec::new();
        for entry in entry_iter {
            entries.push(entry?);
        }

        Ok(entries)
    }

    /// The most recent successful rounds, newest first.
    pub fn recent_rounds(&self, limit: usize) -> Result<Vec<RoundRecord>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT difficulty, sightread, elapsed_ms, recorded_at
            FROM rounds
            ORDER BY id DESC
            LIMIT ?1
            "#,
        )?;

        let round_iter = stmt.query_map([limit], |row| {
            let recorded_str: String = row.get(3)?;
            let recorded_at = DateTime::parse_from_rfc3339(&recorded_str)
                .map_err(|_| {
                    rusqlite::Error::InvalidColumnType(
                        3,
                        "recorded_at".to_string(),
                        rusqlite::types::Type::Text,
                    )
                })?
                .with_timezone(&Local);

            Ok(RoundRecord {
                difficulty: row.get(0)?,
                sightread: row.get(1)?,
                elapsed_ms: row.get(2)?,
                recorded_at,
            })
        })?;

        let mut rounds = Vec::new();
        for round in round_iter {
            rounds.push(round?);
        }

        Ok(rounds)
    }

    /// Write the full round history to `path` as CSV, oldest first.
    /// Returns the number of exported rows.
    pub fn export_rounds_csv<P: AsRef<Path>>(&self, path: P) -> std::result::Result<usize, Box<dyn Error>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT difficulty, sightread, elapsed_ms, recorded_at
            FROM rounds
            ORDER BY id ASC
            "#,
        )?;

        let round_iter = stmt.query_map([], |row| {
            let recorded_str: String = row.get(3)?;
            let recorded_at = DateTime::parse_from_rfc3339(&recorded_str)
                .map_err(|_| {
                    rusqlite::Error::InvalidColumnType(
                        3,
                        "recorded_at".to_string(),
                        rusqlite::types::Type::Text,
                    )
                })?
                .with_timezone(&Local);

            Ok(RoundRecord {
                difficulty: row.get(0)?,
                sightread: row.get(1)?,
                elapsed_ms: row.get(2)?,
                recorded_at,
            })
        })?;

        let mut writer = csv::Writer::from_path(path)?;
        let mut count = 0;
        for round in round_iter {
            writer.serialize(round?)?;
            count += 1;
        }
        writer.flush()?;

        Ok(count)
    }
}

impl ScoreStore for ScoreDb {
    fn get(&self, key: &str) -> Option<String> {
        self.get_value(key).ok().flatten()
    }

    fn set(&mut self, key: &str, value: &str) {
        let _ = self.set_value(key, value);
    }

    fn log_round(&mut self, record: &RoundRecord) {
        let _ = self.insert_round(record);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_round(elapsed_ms: u64) -> RoundRecord {
        RoundRecord {
            difficulty: "Easy".to_string(),
            sightread: false,
            elapsed_ms,
            recorded_at: Local::now(),
        }
    }

    #[test]
    fn test_memory_store_roundtrip() {
        let mut store = MemoryScoreStore::default();
        assert_eq!(store.get("Easy-5"), None);

        store.set("Easy-5", "1.234");
        assert_eq!(store.get("Easy-5"), Some("1.234".to_string()));

        store.set("Easy-5", "1.1");
        assert_eq!(store.get("Easy-5"), Some("1.1".to_string()));
    }

    #[test]
    fn test_db_get_set_roundtrip() {
        let mut db = ScoreDb::open_in_memory().unwrap();
        assert_eq!(db.get("Hard-5-sightread"), None);

        db.set("Hard-5-sightread", "2.5");
        assert_eq!(db.get("Hard-5-sightread"), Some("2.5".to_string()));

        db.set("Hard-5-sightread", "2.1");
        assert_eq!(db.get("Hard-5-sightread"), Some("2.1".to_string()));
    }

    #[test]
    fn test_db_keys_are_independent() {
        let mut db = ScoreDb::open_in_memory().unwrap();
        db.set("Easy-5", "1.0");
        db.set("Easy-5-sightread", "3.0");

        assert_eq!(db.get("Easy-5"), Some("1.0".to_string()));
        assert_eq!(db.get("Easy-5-sightread"), Some("3.0".to_string()));
        assert_eq!(db.get("Medium-5"), None);
    }

    #[test]
    fn test_log_and_query_rounds() {
        let mut db = ScoreDb::open_in_memory().unwrap();
        db.log_round(&sample_round(1200));
        db.log_round(&sample_round(900));
        db.log_round(&sample_round(1500));

        let rounds = db.recent_rounds(2).unwrap();
        assert_eq!(rounds.len(), 2);
        // newest first
        assert_eq!(rounds[0].elapsed_ms, 1500);
        assert_eq!(rounds[1].elapsed_ms, 900);
    }

    #[test]
    fn test_best_entries_listing() {
        let mut db = ScoreDb::open_in_memory().unwrap();
        db.set("Easy-5", "1.4");
        db.set("Medium-5", "2.8");

        let entries = db.best_entries().unwrap();
        assert_eq!(entries.len(), 2);
        let keys: Vec<&str> = entries.iter().map(|e| e.key.as_str()).collect();
        assert!(keys.contains(&"Easy-5"));
        assert!(keys.contains(&"Medium-5"));
    }

    #[test]
    fn test_csv_export() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("scores.db");
        let csv_path = dir.path().join("rounds.csv");

        let mut db = ScoreDb::with_path(&db_path).unwrap();
        db.log_round(&sample_round(1000));
        db.log_round(&sample_round(1100));

        let count = db.export_rounds_csv(&csv_path).unwrap();
        assert_eq!(count, 2);

        let contents = std::fs::read_to_string(&csv_path).unwrap();
        assert!(contents.contains("difficulty"));
        assert!(contents.contains("1000"));
        assert!(contents.contains("1100"));
    }

    #[test]
    fn test_persistence_across_connections() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("scores.db");

        {
            let mut db = ScoreDb::with_path(&db_path).unwrap();
            db.set("Easy-5", "1.111");
        }

        let db = ScoreDb::with_path(&db_path).unwrap();
        assert_eq!(db.get("Easy-5"), Some("1.111".to_string()));
    }
}
