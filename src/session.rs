use chrono::{DateTime, Local, Utc};
use snafu::OptionExt;
use std::path::{Path, PathBuf};

use crate::db::{BestRecord, CircuitInfo, LapDb, NewBestRecord, WorldRecord};
use crate::errors::{NoCircuitSelectedSnafu, NoFastestLapSnafu, NoGroupSelectedSnafu, Result};
use crate::export::{self, PaceReport};
use crate::pace::PaceTable;
use crate::stats;

pub const DEFAULT_RECORDS_LIMIT: u32 = 10;

/// Result of archiving a session: where the report landed and the row id of
/// the stored best record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FinishOutcome {
    pub report_path: PathBuf,
    pub record_id: i64,
}

/// One timing session: the selected circuit and group, the live pace table,
/// and the reference records fetched for that selection.
#[derive(Debug)]
pub struct Session {
    pub circuit: Option<String>,
    pub group: Option<String>,
    pub circuit_info: Option<CircuitInfo>,
    pub weather: String,
    pub car: String,
    pub table: PaceTable,
    pub world_record: Option<WorldRecord>,
    pub best_records: Vec<BestRecord>,
    records_limit: u32,
}

impl Session {
    pub fn new(target_rows: usize, records_limit: u32, weather: String, car: String) -> Self {
        Self {
            circuit: None,
            group: None,
            circuit_info: None,
            weather,
            car,
            table: PaceTable::new(target_rows),
            world_record: None,
            best_records: Vec::new(),
            records_limit,
        }
    }

    /// How many ranks the records panel shows, filled or not.
    pub fn records_limit(&self) -> u32 {
        self.records_limit
    }

    /// First-launch selection: the first circuit alphabetically, with its
    /// first group.
    pub fn load_initial(&mut self, db: &LapDb) -> Result<()> {
        if let Some(first) = db.list_circuits()?.into_iter().next() {
            self.select_circuit(db, first)?;
        }
        Ok(())
    }

    /// Switches circuit, defaults to its first group and starts the table
    /// over. Lap rows never survive a selection change.
    pub fn select_circuit(&mut self, db: &LapDb, circuit_name: String) -> Result<()> {
        self.circuit_info = db.get_circuit(&circuit_name)?;
        self.group = db
            .list_groups_for_circuit(&circuit_name)?
            .into_iter()
            .next();
        self.circuit = Some(circuit_name);
        self.table.reset();
        self.refresh_records(db)
    }

    pub fn select_group(&mut self, db: &LapDb, group_name: String) -> Result<()> {
        self.group = Some(group_name);
        self.table.reset();
        self.refresh_records(db)
    }

    /// Refetches the world record and the archived bests for the current
    /// selection; clears them when the selection is incomplete.
    pub fn refresh_records(&mut self, db: &LapDb) -> Result<()> {
        let (Some(circuit), Some(group)) = (&self.circuit, &self.group) else {
            self.world_record = None;
            self.best_records.clear();
            return Ok(());
        };

        self.world_record = db.get_world_record(circuit, group)?;
        self.best_records = db.list_best_records(circuit, group, self.records_limit)?;
        Ok(())
    }

    /// Closes out the session: writes the pace report, archives the fastest
    /// lap, then resets the table and refetches records. Fails before any
    /// side effect when nothing is selected or no lap has a time, and keeps
    /// the rows intact if the export or the insert goes wrong.
    pub fn finish(
        &mut self,
        db: &LapDb,
        export_dir: &Path,
        now: DateTime<Local>,
    ) -> Result<FinishOutcome> {
        let circuit = self.circuit.clone().context(NoCircuitSelectedSnafu)?;
        let group = self.group.clone().context(NoGroupSelectedSnafu)?;
        let fastest = stats::fastest_lap(self.table.rows()).context(NoFastestLapSnafu)?;
        let lap_time_ms = fastest.row.lap_ms.context(NoFastestLapSnafu)?;

        let date_text = now.format("%Y-%m-%d").to_string();
        let time_text = now.format("%H:%M:%S").to_string();

        let report = PaceReport {
            circuit_name: &circuit,
            group_name: &group,
            date_text: &date_text,
            time_text: &time_text,
            weather: &self.weather,
            rows: self.table.rows(),
            world_record: self.world_record.as_ref(),
        };
        let report_path = export::save_pace_report(export_dir, &report, now.with_timezone(&Utc))?;

        let record_id = db.insert_best_record(&NewBestRecord {
            circuit_name: &circuit,
            group_name: &group,
            record_date: &date_text,
            record_time: &time_text,
            weather: &self.weather,
            car: &self.car,
            lap_time_ms,
        })?;

        self.table.reset();
        self.refresh_records(db)?;

        Ok(FinishOutcome {
            report_path,
            record_id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::LapdashError;
    use crate::lap::LapField;
    use crate::pace::MIN_LAP_ROWS;
    use assert_matches::assert_matches;
    use chrono::TimeZone;

    fn session() -> Session {
        Session::new(
            MIN_LAP_ROWS,
            DEFAULT_RECORDS_LIMIT,
            "Cloudy".to_string(),
            String::new(),
        )
    }

    fn test_now() -> DateTime<Local> {
        Local.with_ymd_and_hms(2024, 5, 6, 14, 30, 0).unwrap()
    }

    #[test]
    fn load_initial_selects_seeded_circuit_and_group() {
        let db = LapDb::open_in_memory().unwrap();
        let mut session = session();

        session.load_initial(&db).unwrap();

        assert_eq!(session.circuit.as_deref(), Some("Suzuka"));
        assert_eq!(session.group.as_deref(), Some("F1"));
        assert_eq!(
            session.world_record.as_ref().map(|wr| wr.lap_time_ms),
            Some(90_000)
        );
        assert!(session.best_records.is_empty());
        assert_eq!(
            session.circuit_info.as_ref().map(|c| c.note.as_str()),
            Some("Seed data. Replace with your own circuits.")
        );
    }

    #[test]
    fn selection_change_drops_lap_rows() {
        let db = LapDb::open_in_memory().unwrap();
        let mut session = session();
        session.load_initial(&db).unwrap();

        assert!(session.table.commit(0, LapField::Lap, "0130000"));
        session.select_group(&db, "F1".to_string()).unwrap();

        assert!(session.table.rows().iter().all(|r| r.is_empty()));
    }

    #[test]
    fn finish_without_selection_is_rejected() {
        let db = LapDb::open_in_memory().unwrap();
        let dir = tempfile::tempdir().unwrap();
        let mut session = session();

        assert_matches!(
            session.finish(&db, dir.path(), test_now()),
            Err(LapdashError::NoCircuitSelected)
        );
    }

    #[test]
    fn finish_without_a_lap_time_is_rejected() {
        let db = LapDb::open_in_memory().unwrap();
        let dir = tempfile::tempdir().unwrap();
        let mut session = session();
        session.load_initial(&db).unwrap();

        // sectors alone never finish a row
        assert!(session.table.commit(0, LapField::S1, "0030000"));
        assert_matches!(
            session.finish(&db, dir.path(), test_now()),
            Err(LapdashError::NoFastestLap)
        );

        assert_eq!(session.table.rows()[0].s1_ms, Some(30_000));
        assert!(session.best_records.is_empty());
    }

    #[test]
    fn finish_archives_fastest_lap_and_resets() {
        let db = LapDb::open_in_memory().unwrap();
        let dir = tempfile::tempdir().unwrap();
        let mut session = session();
        session.load_initial(&db).unwrap();

        assert!(session.table.commit(0, LapField::Lap, "0131000"));
        assert!(session.table.commit(1, LapField::Lap, "0130000"));

        let outcome = session.finish(&db, dir.path(), test_now()).unwrap();

        assert!(outcome.report_path.exists());
        assert!(outcome.record_id >= 1);

        let written = std::fs::read_to_string(&outcome.report_path).unwrap();
        assert!(written.contains("- Circuit: Suzuka"));
        assert!(written.contains("| Fastest_Lap | 01:30:000 |"));

        assert_eq!(session.best_records.len(), 1);
        assert_eq!(session.best_records[0].lap_time_ms, 90_000);
        assert_eq!(session.best_records[0].record_date, "2024-05-06");
        assert_eq!(session.best_records[0].weather, "Cloudy");

        assert!(session.table.rows().iter().all(|r| r.is_empty()));
        assert_eq!(session.table.rows().len(), MIN_LAP_ROWS);
    }

    #[test]
    fn repeated_finishes_accumulate_records() {
        let db = LapDb::open_in_memory().unwrap();
        let dir = tempfile::tempdir().unwrap();
        let mut session = session();
        session.load_initial(&db).unwrap();

        assert!(session.table.commit(0, LapField::Lap, "0130000"));
        session.finish(&db, dir.path(), test_now()).unwrap();

        assert!(session.table.commit(0, LapField::Lap, "0132000"));
        session.finish(&db, dir.path(), test_now()).unwrap();

        let times: Vec<u64> = session
            .best_records
            .iter()
            .map(|r| r.lap_time_ms)
            .collect();
        assert_eq!(times, vec![92_000, 90_000]);
    }
}
