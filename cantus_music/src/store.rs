// SQLite persistence for accepted melodies.
//
// One table, `melodies(id INTEGER PRIMARY KEY AUTOINCREMENT, intervals TEXT)`,
// with each melody stored as its comma-delimited interval list (the same
// text `Melody`'s Display produces). Saving a batch happens in a single
// transaction, so a failed save leaves the table as it was.
//
// The default file name encodes the search parameters:
// `melodies_{length}_{min_steps}.db`.

use cantus_core::melody::{ParseIntervalsError, format_intervals, parse_intervals};
use rusqlite::{Connection, params};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("stored melody {id} is malformed: {source}")]
    Malformed {
        id: i64,
        source: ParseIntervalsError,
    },
}

/// Default database file for a search with these parameters.
pub fn default_db_path(length: usize, min_steps: usize) -> PathBuf {
    PathBuf::from(format!("melodies_{length}_{min_steps}.db"))
}

pub struct MelodyStore {
    conn: Connection,
}

impl MelodyStore {
    /// Open (creating if needed) a database file.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        Self::init(Connection::open(path)?)
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self, StoreError> {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS melodies (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                intervals TEXT
            )",
            [],
        )?;
        Ok(MelodyStore { conn })
    }

    /// Append every melody. Returns the number of rows written.
    pub fn save_all<'a, I>(&mut self, melodies: I) -> Result<usize, StoreError>
    where
        I: IntoIterator<Item = &'a Vec<i32>>,
    {
        let tx = self.conn.transaction()?;
        let mut written = 0;
        {
            let mut stmt = tx.prepare("INSERT INTO melodies (intervals) VALUES (?1)")?;
            for intervals in melodies {
                stmt.execute(params![format_intervals(intervals)])?;
                written += 1;
            }
        }
        tx.commit()?;
        info!(written, "saved melodies");
        Ok(written)
    }

    /// Every stored melody, in insertion order.
    pub fn load_all(&self) -> Result<Vec<Vec<i32>>, StoreError> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, intervals FROM melodies ORDER BY id")?;
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, i64>(0)?, row.get::<_, Option<String>>(1)?))
        })?;

        let mut melodies = Vec::new();
        for row in rows {
            let (id, text) = row?;
            let intervals = parse_intervals(text.as_deref().unwrap_or_default())
                .map_err(|source| StoreError::Malformed { id, source })?;
            melodies.push(intervals);
        }
        Ok(melodies)
    }

    pub fn count(&self) -> Result<usize, StoreError> {
        let n: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM melodies", [], |row| row.get(0))?;
        Ok(n as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_db_path() {
        assert_eq!(default_db_path(8, 4), PathBuf::from("melodies_8_4.db"));
    }

    #[test]
    fn test_save_and_load_in_memory() {
        let mut store = MelodyStore::open_in_memory().unwrap();
        let melodies = vec![vec![-7, 3, -1, 2, 1, 1, 1], vec![1, -2, -1, -1, 1, 1, 1]];
        assert_eq!(store.save_all(&melodies).unwrap(), 2);
        assert_eq!(store.count().unwrap(), 2);
        assert_eq!(store.load_all().unwrap(), melodies);
    }

    #[test]
    fn test_rows_are_comma_delimited_text() {
        let mut store = MelodyStore::open_in_memory().unwrap();
        store.save_all(&[vec![1, 2, -3]]).unwrap();
        let (id, text): (i64, String) = store
            .conn
            .query_row("SELECT id, intervals FROM melodies", [], |row| {
                Ok((row.get(0)?, row.get(1)?))
            })
            .unwrap();
        assert_eq!(id, 1);
        assert_eq!(text, "1,2,-3");
    }

    #[test]
    fn test_malformed_row() {
        let store = MelodyStore::open_in_memory().unwrap();
        store
            .conn
            .execute("INSERT INTO melodies (intervals) VALUES ('1,x')", [])
            .unwrap();
        assert!(matches!(store.load_all(), Err(StoreError::Malformed { id: 1, .. })));
    }

    #[test]
    fn test_reopen_file_appends() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("melodies.db");
        {
            let mut store = MelodyStore::open(&path).unwrap();
            store.save_all(&[vec![1, -1]]).unwrap();
        }
        let mut store = MelodyStore::open(&path).unwrap();
        store.save_all(&[vec![-1, 1]]).unwrap();
        assert_eq!(store.load_all().unwrap(), vec![vec![1, -1], vec![-1, 1]]);
    }
}
