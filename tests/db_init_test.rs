mod helpers;

use memory_relay::db;
use tempfile::TempDir;

#[test]
fn open_creates_new_db_at_nonexistent_path() {
    let tmp = TempDir::new().unwrap();
    let db_path = tmp.path().join("subdir").join("relay.db");

    assert!(!db_path.exists());

    let conn = db::open_database(&db_path).unwrap();

    assert!(db_path.exists());

    let count: i64 = conn
        .query_row("SELECT COUNT(*) FROM exchanges", [], |row| row.get(0))
        .unwrap();
    assert_eq!(count, 0);
}

#[test]
fn open_sets_wal_and_busy_timeout() {
    let tmp = TempDir::new().unwrap();
    let conn = db::open_database(tmp.path().join("relay.db")).unwrap();

    let mode: String = conn
        .query_row("PRAGMA journal_mode", [], |row| row.get(0))
        .unwrap();
    assert_eq!(mode.to_lowercase(), "wal");

    let timeout: i64 = conn
        .query_row("PRAGMA busy_timeout", [], |row| row.get(0))
        .unwrap();
    assert_eq!(timeout, 5000);

    let fks: i64 = conn
        .query_row("PRAGMA foreign_keys", [], |row| row.get(0))
        .unwrap();
    assert_eq!(fks, 1);
}

#[test]
fn reopening_keeps_rows() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("relay.db");
    {
        let conn = db::open_database(&path).unwrap();
        helpers::seed_relational_subject(&conn);
    }
    let conn = db::open_database(&path).unwrap();
    let report = db::check_database_health(&conn).unwrap();
    assert_eq!(report.trigger_count, 1);
    assert_eq!(report.fact_count, 2);
}

#[test]
fn health_check_passes_on_valid_db() {
    let conn = helpers::test_db();

    let report = db::check_database_health(&conn).unwrap();
    assert!(report.integrity_ok);
    assert_eq!(report.schema_version, db::migrations::CURRENT_SCHEMA_VERSION);
    assert_eq!(report.trigger_count, 0);
    assert_eq!(report.fact_count, 0);
    assert_eq!(report.reflection_count, 0);
    assert_eq!(report.episode_count, 0);
    assert_eq!(report.exchange_count, 0);
}

#[test]
fn deleting_a_trigger_cascades_and_detaches_episodes() {
    let conn = helpers::test_db();
    let id = helpers::seed_relational_subject(&conn);
    memory_relay::memory::store::insert_episode(&conn, helpers::PROFILE, Some(id), "u", "a").unwrap();

    conn.execute("DELETE FROM triggers WHERE id = ?1", [id]).unwrap();

    let report = db::check_database_health(&conn).unwrap();
    assert_eq!(report.fact_count, 0);
    assert_eq!(report.episode_count, 1);
    let trigger_id: Option<i64> = conn
        .query_row("SELECT trigger_id FROM episodes", [], |row| row.get(0))
        .unwrap();
    assert!(trigger_id.is_none());
}
