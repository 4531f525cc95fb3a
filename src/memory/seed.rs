//! Curated memory import.
//!
//! Triggers, facts, reflections and episodes are never created by the chat
//! path; they are seeded from a JSON document of this shape:
//!
//! ```json
//! {
//!   "profile": "nevan",
//!   "triggers": [
//!     {
//!       "name": "relational_subject",
//!       "facts": [{ "name": "name", "content": "Nadine" }],
//!       "reflections": ["Trust grew slowly."],
//!       "episodes": [{ "user_message": "...", "model_reply": "..." }]
//!     }
//!   ]
//! }
//! ```

use anyhow::{Context, Result};
use rusqlite::Connection;
use serde::Deserialize;

use crate::memory::store;

#[derive(Debug, Deserialize)]
pub struct SeedFile {
    #[serde(default)]
    pub profile: Option<String>,
    pub triggers: Vec<SeedTrigger>,
}

#[derive(Debug, Deserialize)]
pub struct SeedTrigger {
    pub name: String,
    #[serde(default)]
    pub facts: Vec<SeedFact>,
    #[serde(default)]
    pub reflections: Vec<String>,
    #[serde(default)]
    pub episodes: Vec<SeedEpisode>,
}

#[derive(Debug, Deserialize)]
pub struct SeedFact {
    pub name: String,
    pub content: String,
}

#[derive(Debug, Deserialize)]
pub struct SeedEpisode {
    pub user_message: String,
    pub model_reply: String,
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct SeedSummary {
    pub triggers_created: usize,
    pub triggers_reused: usize,
    pub facts: usize,
    pub reflections: usize,
    pub episodes: usize,
}

impl SeedFile {
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).context("failed to parse seed JSON")
    }
}

/// Write a seed file into `profile` inside one transaction.
///
/// Existing triggers (same normalized name) are reused and their children
/// appended to.
pub fn import_seed(conn: &mut Connection, profile: &str, seed: &SeedFile) -> Result<SeedSummary> {
    let tx = conn.transaction()?;
    let mut summary = SeedSummary::default();

    for trigger in &seed.triggers {
        let existed = store::find_trigger(&tx, profile, &trigger.name)?.is_some();
        let trigger_id = store::upsert_trigger(&tx, profile, &trigger.name)
            .with_context(|| format!("invalid trigger `{}`", trigger.name))?;
        if existed {
            summary.triggers_reused += 1;
        } else {
            summary.triggers_created += 1;
        }

        for fact in &trigger.facts {
            store::insert_fact(&tx, trigger_id, &fact.name, &fact.content)?;
            summary.facts += 1;
        }
        for reflection in &trigger.reflections {
            store::insert_reflection(&tx, trigger_id, reflection)?;
            summary.reflections += 1;
        }
        for episode in &trigger.episodes {
            store::insert_episode(
                &tx,
                profile,
                Some(trigger_id),
                &episode.user_message,
                &episode.model_reply,
            )?;
            summary.episodes += 1;
        }
    }

    tx.commit()?;
    tracing::info!(
        profile,
        created = summary.triggers_created,
        reused = summary.triggers_reused,
        "seed imported"
    );
    Ok(summary)
}
