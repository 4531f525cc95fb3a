//! Row-store primitives over a SQLite connection.
//!
//! Synchronous, one statement per function. Async callers go through
//! [`crate::memory::backend::SqliteBackend`], which runs these on the blocking
//! pool.

use anyhow::Result;
use rusqlite::{params, Connection, OptionalExtension};

use crate::memory::types::{normalize_trigger_name, Episode, Exchange, Fact, Reflection, Trigger};

fn now() -> String {
    chrono::Utc::now().to_rfc3339()
}

/// Insert a trigger, or return the id of the one with the same normalized name.
pub fn upsert_trigger(conn: &Connection, profile: &str, name: &str) -> Result<i64> {
    let normalized = normalize_trigger_name(name);
    anyhow::ensure!(!normalized.is_empty(), "trigger name must not be empty");

    let existing: Option<i64> = conn
        .query_row(
            "SELECT id FROM triggers WHERE profile = ?1 AND normalized_name = ?2",
            params![profile, normalized],
            |row| row.get(0),
        )
        .optional()?;
    if let Some(id) = existing {
        return Ok(id);
    }

    conn.execute(
        "INSERT INTO triggers (profile, name, normalized_name, created_at) VALUES (?1, ?2, ?3, ?4)",
        params![profile, name.trim(), normalized, now()],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn insert_fact(conn: &Connection, trigger_id: i64, name: &str, content: &str) -> Result<i64> {
    conn.execute(
        "INSERT INTO facts (trigger_id, name, content, created_at) VALUES (?1, ?2, ?3, ?4)",
        params![trigger_id, name, content, now()],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn insert_reflection(conn: &Connection, trigger_id: i64, content: &str) -> Result<i64> {
    conn.execute(
        "INSERT INTO reflections (trigger_id, content, created_at) VALUES (?1, ?2, ?3)",
        params![trigger_id, content, now()],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn insert_episode(
    conn: &Connection,
    profile: &str,
    trigger_id: Option<i64>,
    user_message: &str,
    model_reply: &str,
) -> Result<i64> {
    conn.execute(
        "INSERT INTO episodes (profile, trigger_id, user_message, model_reply, created_at) \
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![profile, trigger_id, user_message, model_reply, now()],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Append one exchange to the fallback history.
pub fn insert_exchange(
    conn: &Connection,
    profile: &str,
    user_message: &str,
    model_reply: &str,
    remember: bool,
) -> Result<i64> {
    conn.execute(
        "INSERT INTO exchanges (profile, user_message, model_reply, remember, created_at) \
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![profile, user_message, model_reply, remember, now()],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Point lookup by normalized name. Anything other than exactly one row is `None`.
pub fn find_trigger(conn: &Connection, profile: &str, name: &str) -> Result<Option<Trigger>> {
    let mut stmt = conn.prepare(
        "SELECT id, name FROM triggers WHERE profile = ?1 AND normalized_name = ?2 LIMIT 2",
    )?;
    let mut rows: Vec<Trigger> = stmt
        .query_map(params![profile, normalize_trigger_name(name)], |row| {
            Ok(Trigger {
                id: row.get(0)?,
                name: row.get(1)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    if rows.len() == 1 {
        Ok(rows.pop())
    } else {
        if rows.len() > 1 {
            tracing::warn!(profile, name, "ambiguous trigger lookup");
        }
        Ok(None)
    }
}

pub fn facts_for_trigger(conn: &Connection, trigger_id: i64) -> Result<Vec<Fact>> {
    let mut stmt =
        conn.prepare("SELECT id, trigger_id, name, content FROM facts WHERE trigger_id = ?1 ORDER BY id")?;
    let facts = stmt
        .query_map(params![trigger_id], |row| {
            Ok(Fact {
                id: row.get(0)?,
                trigger_id: row.get(1)?,
                name: row.get(2)?,
                content: row.get(3)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(facts)
}

pub fn reflections_for_trigger(conn: &Connection, trigger_id: i64) -> Result<Vec<Reflection>> {
    let mut stmt = conn
        .prepare("SELECT id, trigger_id, content FROM reflections WHERE trigger_id = ?1 ORDER BY id")?;
    let reflections = stmt
        .query_map(params![trigger_id], |row| {
            Ok(Reflection {
                id: row.get(0)?,
                trigger_id: row.get(1)?,
                content: row.get(2)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(reflections)
}

pub fn episodes_for_trigger(conn: &Connection, trigger_id: i64) -> Result<Vec<Episode>> {
    let mut stmt = conn.prepare(
        "SELECT id, trigger_id, user_message, model_reply FROM episodes WHERE trigger_id = ?1 ORDER BY id",
    )?;
    let episodes = stmt
        .query_map(params![trigger_id], |row| {
            Ok(Episode {
                id: row.get(0)?,
                trigger_id: row.get(1)?,
                user_message: row.get(2)?,
                model_reply: row.get(3)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(episodes)
}

fn exchange_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Exchange> {
    Ok(Exchange {
        id: row.get(0)?,
        user_message: row.get(1)?,
        model_reply: row.get(2)?,
        remember: row.get(3)?,
        created_at: row.get(4)?,
    })
}

/// The `limit` most recent exchanges for a profile, newest first.
pub fn recent_exchanges(conn: &Connection, profile: &str, limit: usize) -> Result<Vec<Exchange>> {
    let mut stmt = conn.prepare(
        "SELECT id, user_message, model_reply, remember, created_at FROM exchanges \
         WHERE profile = ?1 ORDER BY id DESC LIMIT ?2",
    )?;
    let rows = stmt
        .query_map(params![profile, limit as i64], exchange_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Case-insensitive literal substring search over message and reply text, newest first.
///
/// Case is folded in Rust (`to_lowercase`) since SQLite's `lower()` only folds ASCII.
pub fn search_exchanges(
    conn: &Connection,
    profile: &str,
    query: &str,
    limit: usize,
) -> Result<Vec<Exchange>> {
    let needle = query.to_lowercase();
    let mut stmt = conn.prepare(
        "SELECT id, user_message, model_reply, remember, created_at FROM exchanges \
         WHERE profile = ?1 ORDER BY id DESC",
    )?;

    let mut hits = Vec::new();
    for row in stmt.query_map(params![profile], exchange_from_row)? {
        if hits.len() >= limit {
            break;
        }
        let row = row?;
        if row.user_message.to_lowercase().contains(&needle)
            || row.model_reply.to_lowercase().contains(&needle)
        {
            hits.push(row);
        }
    }
    Ok(hits)
}

/// Delete the whole fallback history of a profile. Returns the number of rows removed.
pub fn clear_exchanges(conn: &Connection, profile: &str) -> Result<usize> {
    let removed = conn.execute("DELETE FROM exchanges WHERE profile = ?1", params![profile])?;
    Ok(removed)
}
