use rusqlite::{params, Connection, OptionalExtension};
use snafu::ResultExt;
use std::fs;
use std::path::Path;

use crate::errors::{DataDirIoSnafu, DbOpenSnafu, DbQuerySnafu, InvalidRecordFieldSnafu, Result};

const DB_FILE: &str = "lapdash.sqlite3";

/// Circuit master data shown in the circuit panel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CircuitInfo {
    pub circuit_name: String,
    pub picture_path: String,
    pub note: String,
}

/// All-time reference lap for a circuit and competition group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorldRecord {
    pub circuit_name: String,
    pub group_name: String,
    pub lap_time_ms: u64,
    pub sector1_ms: Option<u64>,
    pub sector2_ms: Option<u64>,
    pub sector3_ms: Option<u64>,
    pub holder: String,
}

/// One archived session best, as listed in the records panel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BestRecord {
    pub record_date: String,
    pub record_time: String,
    pub lap_time_ms: u64,
    pub car: String,
    pub weather: String,
}

/// Payload for archiving a finished session's fastest lap.
#[derive(Debug, Clone, Copy)]
pub struct NewBestRecord<'a> {
    pub circuit_name: &'a str,
    pub group_name: &'a str,
    pub record_date: &'a str,
    pub record_time: &'a str,
    pub weather: &'a str,
    pub car: &'a str,
    pub lap_time_ms: u64,
}

/// Database manager for circuits, groups and lap records
#[derive(Debug)]
pub struct LapDb {
    conn: Connection,
}

impl LapDb {
    /// Opens (or creates) the database under `data_dir` and applies the
    /// schema plus first-run seed data.
    pub fn open(data_dir: &Path) -> Result<Self> {
        fs::create_dir_all(data_dir).context(DataDirIoSnafu {
            path: data_dir.display().to_string(),
        })?;

        let conn = Connection::open(data_dir.join(DB_FILE)).context(DbOpenSnafu)?;
        Self::from_connection(conn)
    }

    /// In-memory database with the same schema and seed, for tests.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context(DbOpenSnafu)?;
        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        // journal_mode reports its new value as a row
        conn.query_row("PRAGMA journal_mode = WAL", [], |_row| Ok(()))
            .context(DbOpenSnafu)?;

        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS circuits (
                circuit_name TEXT PRIMARY KEY,
                picture_path TEXT NOT NULL DEFAULT '',
                note TEXT NOT NULL DEFAULT ''
            );

            CREATE TABLE IF NOT EXISTS competition_groups (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                circuit_name TEXT NOT NULL,
                group_name TEXT NOT NULL,
                UNIQUE(circuit_name, group_name),
                FOREIGN KEY(circuit_name) REFERENCES circuits(circuit_name)
            );

            CREATE TABLE IF NOT EXISTS world_records (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                circuit_name TEXT NOT NULL,
                group_name TEXT NOT NULL,
                lap_time_ms INTEGER NOT NULL,
                sector1_ms INTEGER,
                sector2_ms INTEGER,
                sector3_ms INTEGER,
                holder TEXT NOT NULL DEFAULT '',
                UNIQUE(circuit_name, group_name),
                FOREIGN KEY(circuit_name) REFERENCES circuits(circuit_name)
            );

            CREATE TABLE IF NOT EXISTS best_records (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                circuit_name TEXT NOT NULL,
                group_name TEXT NOT NULL,
                record_date TEXT NOT NULL,
                record_time TEXT NOT NULL,
                weather TEXT NOT NULL DEFAULT '',
                car TEXT NOT NULL DEFAULT '',
                lap_time_ms INTEGER NOT NULL,
                FOREIGN KEY(circuit_name) REFERENCES circuits(circuit_name)
            );

            CREATE INDEX IF NOT EXISTS idx_groups_circuit
                ON competition_groups (circuit_name);

            CREATE INDEX IF NOT EXISTS idx_world_records_circuit_group
                ON world_records (circuit_name, group_name);

            CREATE INDEX IF NOT EXISTS idx_best_records_circuit_group_time
                ON best_records (circuit_name, group_name, lap_time_ms);
            "#,
        )
        .context(DbOpenSnafu)?;

        let db = LapDb { conn };
        db.seed_if_empty()?;
        Ok(db)
    }

    // Minimal demo data so a first run has something to select.
    fn seed_if_empty(&self) -> Result<()> {
        let circuits: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM circuits", [], |row| row.get(0))
            .context(DbQuerySnafu)?;
        if circuits > 0 {
            return Ok(());
        }

        self.conn
            .execute(
                "INSERT INTO circuits (circuit_name, picture_path, note) VALUES (?1, ?2, ?3)",
                params!["Suzuka", "", "Seed data. Replace with your own circuits."],
            )
            .context(DbQuerySnafu)?;

        self.conn
            .execute(
                "INSERT INTO competition_groups (circuit_name, group_name) VALUES (?1, ?2)",
                params!["Suzuka", "F1"],
            )
            .context(DbQuerySnafu)?;

        self.conn
            .execute(
                r#"
                INSERT INTO world_records
                (circuit_name, group_name, lap_time_ms, sector1_ms, sector2_ms, sector3_ms, holder)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                ON CONFLICT(circuit_name, group_name) DO NOTHING
                "#,
                params!["Suzuka", "F1", 90_000, 30_000, 30_000, 30_000, "Demo"],
            )
            .context(DbQuerySnafu)?;

        Ok(())
    }

    pub fn list_circuits(&self) -> Result<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT circuit_name FROM circuits ORDER BY circuit_name ASC")
            .context(DbQuerySnafu)?;

        let names = stmt
            .query_map([], |row| row.get(0))
            .context(DbQuerySnafu)?
            .collect::<rusqlite::Result<Vec<String>>>()
            .context(DbQuerySnafu)?;

        Ok(names)
    }

    pub fn list_groups_for_circuit(&self, circuit_name: &str) -> Result<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare(
                r#"
                SELECT group_name
                FROM competition_groups
                WHERE circuit_name = ?1
                ORDER BY group_name ASC
                "#,
            )
            .context(DbQuerySnafu)?;

        let names = stmt
            .query_map([circuit_name], |row| row.get(0))
            .context(DbQuerySnafu)?
            .collect::<rusqlite::Result<Vec<String>>>()
            .context(DbQuerySnafu)?;

        Ok(names)
    }

    pub fn get_circuit(&self, circuit_name: &str) -> Result<Option<CircuitInfo>> {
        self.conn
            .query_row(
                r#"
                SELECT circuit_name, picture_path, note
                FROM circuits
                WHERE circuit_name = ?1
                "#,
                [circuit_name],
                |row| {
                    Ok(CircuitInfo {
                        circuit_name: row.get(0)?,
                        picture_path: row.get(1)?,
                        note: row.get(2)?,
                    })
                },
            )
            .optional()
            .context(DbQuerySnafu)
    }

    pub fn get_world_record(
        &self,
        circuit_name: &str,
        group_name: &str,
    ) -> Result<Option<WorldRecord>> {
        self.conn
            .query_row(
                r#"
                SELECT circuit_name, group_name, lap_time_ms,
                       sector1_ms, sector2_ms, sector3_ms, holder
                FROM world_records
                WHERE circuit_name = ?1 AND group_name = ?2
                "#,
                [circuit_name, group_name],
                |row| {
                    Ok(WorldRecord {
                        circuit_name: row.get(0)?,
                        group_name: row.get(1)?,
                        lap_time_ms: row.get(2)?,
                        sector1_ms: row.get(3)?,
                        sector2_ms: row.get(4)?,
                        sector3_ms: row.get(5)?,
                        holder: row.get(6)?,
                    })
                },
            )
            .optional()
            .context(DbQuerySnafu)
    }

    /// Slowest-first ordering is intentional for the records panel.
    pub fn list_best_records(
        &self,
        circuit_name: &str,
        group_name: &str,
        limit: u32,
    ) -> Result<Vec<BestRecord>> {
        let mut stmt = self
            .conn
            .prepare(
                r#"
                SELECT record_date, record_time, lap_time_ms, car, weather
                FROM best_records
                WHERE circuit_name = ?1 AND group_name = ?2
                ORDER BY lap_time_ms DESC
                LIMIT ?3
                "#,
            )
            .context(DbQuerySnafu)?;

        let records = stmt
            .query_map(params![circuit_name, group_name, limit], |row| {
                Ok(BestRecord {
                    record_date: row.get(0)?,
                    record_time: row.get(1)?,
                    lap_time_ms: row.get(2)?,
                    car: row.get(3)?,
                    weather: row.get(4)?,
                })
            })
            .context(DbQuerySnafu)?
            .collect::<rusqlite::Result<Vec<_>>>()
            .context(DbQuerySnafu)?;

        Ok(records)
    }

    /// Archives a session best. Rejects blank identifying fields before
    /// touching the table; returns the new row id.
    pub fn insert_best_record(&self, record: &NewBestRecord) -> Result<i64> {
        for (field, value) in [
            ("circuit_name", record.circuit_name),
            ("group_name", record.group_name),
            ("record_date", record.record_date),
            ("record_time", record.record_time),
        ] {
            snafu::ensure!(!value.is_empty(), InvalidRecordFieldSnafu { field });
        }

        self.conn
            .execute(
                r#"
                INSERT INTO best_records
                (circuit_name, group_name, record_date, record_time, weather, car, lap_time_ms)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                "#,
                params![
                    record.circuit_name,
                    record.group_name,
                    record.record_date,
                    record.record_time,
                    record.weather,
                    record.car,
                    record.lap_time_ms,
                ],
            )
            .context(DbQuerySnafu)?;

        Ok(self.conn.last_insert_rowid())
    }
}
