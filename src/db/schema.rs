//! SQL DDL for all relay tables.
//!
//! Curated memory lives in `triggers`, `facts` and `reflections`. The request
//! path only ever appends to `episodes` and `exchanges` (the fallback history).
//! Every row carries the owning profile so table names never depend on input.

use rusqlite::Connection;

const SCHEMA_SQL: &str = r#"
-- Named memory topics, one namespace per profile
CREATE TABLE IF NOT EXISTS triggers (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    profile TEXT NOT NULL,
    name TEXT NOT NULL,
    normalized_name TEXT NOT NULL,
    created_at TEXT NOT NULL,
    UNIQUE(profile, normalized_name)
);

CREATE TABLE IF NOT EXISTS facts (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    trigger_id INTEGER NOT NULL REFERENCES triggers(id) ON DELETE CASCADE,
    name TEXT NOT NULL,
    content TEXT NOT NULL,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_facts_trigger ON facts(trigger_id);

CREATE TABLE IF NOT EXISTS reflections (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    trigger_id INTEGER NOT NULL REFERENCES triggers(id) ON DELETE CASCADE,
    content TEXT NOT NULL,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_reflections_trigger ON reflections(trigger_id);

-- Remembered exchanges; trigger_id is NULL when no topic was active
CREATE TABLE IF NOT EXISTS episodes (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    profile TEXT NOT NULL,
    trigger_id INTEGER REFERENCES triggers(id) ON DELETE SET NULL,
    user_message TEXT NOT NULL,
    model_reply TEXT NOT NULL,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_episodes_trigger ON episodes(trigger_id);

-- Every exchange, replayed as short-term context
CREATE TABLE IF NOT EXISTS exchanges (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    profile TEXT NOT NULL,
    user_message TEXT NOT NULL,
    model_reply TEXT NOT NULL,
    remember INTEGER NOT NULL DEFAULT 0 CHECK(remember IN (0, 1)),
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS schema_meta (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
);
"#;

/// Initialize all schema tables. Idempotent (uses IF NOT EXISTS).
pub fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(SCHEMA_SQL)?;

    conn.execute(
        "INSERT OR IGNORE INTO schema_meta (key, value) VALUES ('schema_version', '1')",
        [],
    )?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_creates_all_tables() {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();

        let tables: Vec<String> = conn
            .prepare("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<Result<Vec<_>, _>>()
            .unwrap();

        for table in ["triggers", "facts", "reflections", "episodes", "exchanges", "schema_meta"] {
            assert!(tables.contains(&table.to_string()), "missing table {table}");
        }
    }

    #[test]
    fn schema_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();
        init_schema(&conn).unwrap(); // second call should not error
    }

    #[test]
    fn normalized_trigger_names_are_unique_per_profile() {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();

        let insert = |profile: &str, name: &str| {
            conn.execute(
                "INSERT INTO triggers (profile, name, normalized_name, created_at) VALUES (?1, ?2, ?3, 'now')",
                [profile, name, "relational subject"],
            )
        };

        insert("nevan", "relational_subject").unwrap();
        assert!(insert("nevan", "Relational Subject").is_err());
        // same topic in another profile is fine
        insert("reon", "relational_subject").unwrap();
    }
}
