//! CLI `history` command: print a profile's recent exchanges.

use anyhow::Result;

use memory_relay::config::RelayConfig;
use memory_relay::memory::store;

/// Print the last `limit` exchanges of the profile behind `model`, oldest first.
pub fn history(config: &RelayConfig, model: &str, limit: Option<usize>) -> Result<()> {
    let profile = super::profile_for_model(config, model)?;
    let limit = limit
        .unwrap_or(config.memory.history_limit)
        .clamp(1, config.memory.max_history_limit.max(1));

    let conn = memory_relay::db::open_database(config.resolved_db_path())?;
    let mut rows = store::recent_exchanges(&conn, &profile, limit)?;
    rows.reverse();

    if rows.is_empty() {
        println!("No history for profile `{profile}`.");
        return Ok(());
    }

    println!("Last {} exchange(s) for `{profile}`:\n", rows.len());
    for row in &rows {
        let flag = if row.remember { " [remember]" } else { "" };
        println!("#{} {}{flag}", row.id, row.created_at);
        println!("  USER:      {}", row.user_message);
        println!("  ASSISTANT: {}", row.model_reply);
        println!();
    }

    Ok(())
}
