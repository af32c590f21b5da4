use chrono::{DateTime, Local, TimeZone};

use lapdash::db::LapDb;
use lapdash::lap::LapField;
use lapdash::session::Session;

/// Integration tests for timing session workflows
/// These tests verify end-to-end behavior of data entry sessions, the
/// best-records archive, and pace report export.

fn fixed_now() -> DateTime<Local> {
    Local.with_ymd_and_hms(2024, 5, 6, 14, 30, 0).unwrap()
}

fn seeded_session(db: &LapDb) -> Session {
    let mut session = Session::new(7, 10, "Sunny".to_string(), "NSX".to_string());
    session.load_initial(db).unwrap();
    session
}

#[test]
fn single_session_exports_and_archives() {
    let db = LapDb::open_in_memory().unwrap();
    let dir = tempfile::tempdir().unwrap();
    let mut session = seeded_session(&db);

    // Key the sectors; the lap derives on the last one
    let mut row = 0;
    let mut field = LapField::S1;
    for raw in ["0030000", "0030000", "0030000"] {
        assert!(session.table.commit(row, field, raw));
        if let Some(target) = session.table.take_focus() {
            row = target.row;
            field = target.field;
        }
    }

    let outcome = session.finish(&db, dir.path(), fixed_now()).unwrap();

    let report = std::fs::read_to_string(&outcome.report_path).unwrap();
    assert!(report.starts_with("# Current_Pace\n"));
    assert!(report.contains("- Circuit: Suzuka"));
    assert!(report.contains("- Competition_group: F1"));
    assert!(report.contains("- Weather: Sunny"));
    assert!(
        report.contains("| Lap1 | 01:30:000 | 00:30:000 | 00:30:000 | 00:30:000 | 00:00:000 |")
    );
    assert!(report.contains("| World Record | 01:30:000 |"));

    assert_eq!(session.best_records.len(), 1);
    assert_eq!(session.best_records[0].lap_time_ms, 90_000);
    assert_eq!(session.best_records[0].car, "NSX");
    assert_eq!(session.best_records[0].record_date, "2024-05-06");
}

#[test]
fn repeated_sessions_rank_slowest_first() {
    let db = LapDb::open_in_memory().unwrap();
    let dir = tempfile::tempdir().unwrap();
    let mut session = seeded_session(&db);

    for lap in ["0130000", "0132000", "0129500"] {
        assert!(session.table.commit(0, LapField::Lap, lap));
        session.finish(&db, dir.path(), fixed_now()).unwrap();
    }

    let times: Vec<u64> = session
        .best_records
        .iter()
        .map(|r| r.lap_time_ms)
        .collect();
    assert_eq!(times, vec![92_000, 90_000, 89_500]);
}

#[test]
fn unknown_group_clears_reference_records() {
    let db = LapDb::open_in_memory().unwrap();
    let mut session = seeded_session(&db);
    assert!(session.world_record.is_some());

    session.select_group(&db, "GT3".to_string()).unwrap();

    assert!(session.world_record.is_none());
    assert!(session.best_records.is_empty());
}

#[test]
fn failed_finish_leaves_no_trace() {
    let db = LapDb::open_in_memory().unwrap();
    let dir = tempfile::tempdir().unwrap();
    let mut session = seeded_session(&db);

    // Sector times alone never produce a fastest lap
    assert!(session.table.commit(0, LapField::S1, "0030000"));
    assert!(session.finish(&db, dir.path(), fixed_now()).is_err());

    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    assert!(db
        .list_best_records("Suzuka", "F1", 10)
        .unwrap()
        .is_empty());
    assert_eq!(session.table.rows()[0].s1_ms, Some(30_000));
}

#[test]
fn file_database_persists_between_opens() {
    let dir = tempfile::tempdir().unwrap();

    {
        let db = LapDb::open(dir.path()).unwrap();
        let mut session = seeded_session(&db);
        assert!(session.table.commit(0, LapField::Lap, "0130000"));
        session.finish(&db, dir.path(), fixed_now()).unwrap();
    }

    let db = LapDb::open(dir.path()).unwrap();

    // Reopening neither reseeds nor loses the archived record
    assert_eq!(db.list_circuits().unwrap(), vec!["Suzuka".to_string()]);
    let records = db.list_best_records("Suzuka", "F1", 10).unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].lap_time_ms, 90_000);
    assert_eq!(records[0].weather, "Sunny");
}
