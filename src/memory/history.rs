//! Fallback history replay.

use anyhow::Result;

use crate::memory::backend::MemoryBackend;
use crate::memory::types::Turn;

/// Load the last `limit` exchanges of a profile as user/assistant turns, oldest first.
///
/// Yields at most `2 * limit` turns and an empty vector when there is no history.
pub async fn load_history(
    backend: &dyn MemoryBackend,
    profile: &str,
    limit: usize,
) -> Result<Vec<Turn>> {
    if limit == 0 {
        return Ok(Vec::new());
    }

    let mut rows = backend.recent_exchanges(profile, limit).await?;
    rows.reverse();

    Ok(rows
        .into_iter()
        .flat_map(|row| [Turn::user(row.user_message), Turn::assistant(row.model_reply)])
        .collect())
}
