//! CLI `reset` command: delete a profile's fallback history after confirmation.

use anyhow::{bail, Result};
use std::io::Write;

use memory_relay::config::RelayConfig;
use memory_relay::memory::store;

/// Delete every exchange of the profile behind `model`.
///
/// Curated memory and episodes are kept.
pub fn reset(config: &RelayConfig, model: &str) -> Result<()> {
    let profile = super::profile_for_model(config, model)?;
    let db_path = config.resolved_db_path();

    println!("WARNING: This will permanently delete the chat history of profile `{profile}`.");
    println!("Database: {}", db_path.display());
    print!("\nType YES to confirm: ");
    std::io::stdout().flush()?;

    let mut input = String::new();
    std::io::stdin().read_line(&mut input)?;

    if input.trim() != "YES" {
        bail!("reset cancelled");
    }

    let conn = memory_relay::db::open_database(&db_path)?;
    let removed = store::clear_exchanges(&conn, &profile)?;

    println!("Deleted {removed} exchange(s) from `{profile}`.");
    Ok(())
}
