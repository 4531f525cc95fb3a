//! Async access to the row store.
//!
//! [`MemoryBackend`] is the seam between the request pipeline and storage.
//! [`SqliteBackend`] runs the synchronous [`crate::memory::store`] functions on
//! tokio's blocking pool behind a shared connection.

use anyhow::Result;
use async_trait::async_trait;
use rusqlite::Connection;
use std::sync::{Arc, Mutex};

use crate::memory::store;
use crate::memory::types::{Episode, Exchange, Fact, Reflection, Trigger};

#[async_trait]
pub trait MemoryBackend: Send + Sync {
    async fn find_trigger(&self, profile: &str, name: &str) -> Result<Option<Trigger>>;

    async fn facts(&self, trigger_id: i64) -> Result<Vec<Fact>>;

    async fn reflections(&self, trigger_id: i64) -> Result<Vec<Reflection>>;

    async fn episodes(&self, trigger_id: i64) -> Result<Vec<Episode>>;

    /// Most recent exchanges for a profile, newest first.
    async fn recent_exchanges(&self, profile: &str, limit: usize) -> Result<Vec<Exchange>>;

    async fn search_exchanges(&self, profile: &str, query: &str, limit: usize)
        -> Result<Vec<Exchange>>;

    async fn record_exchange(
        &self,
        profile: &str,
        user_message: &str,
        model_reply: &str,
        remember: bool,
    ) -> Result<i64>;

    async fn record_episode(
        &self,
        profile: &str,
        trigger_id: Option<i64>,
        user_message: &str,
        model_reply: &str,
    ) -> Result<i64>;

    async fn clear_exchanges(&self, profile: &str) -> Result<usize>;
}

/// [`MemoryBackend`] over a single SQLite connection.
#[derive(Clone)]
pub struct SqliteBackend {
    db: Arc<Mutex<Connection>>,
}

impl SqliteBackend {
    pub fn new(db: Arc<Mutex<Connection>>) -> Self {
        Self { db }
    }

    pub fn from_connection(conn: Connection) -> Self {
        Self::new(Arc::new(Mutex::new(conn)))
    }

    /// Run a store call on the blocking pool with the connection locked.
    async fn with_conn<T, F>(&self, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> Result<T> + Send + 'static,
    {
        let db = Arc::clone(&self.db);
        tokio::task::spawn_blocking(move || {
            let conn = db
                .lock()
                .map_err(|e| anyhow::anyhow!("db lock poisoned: {e}"))?;
            f(&conn)
        })
        .await
        .map_err(|e| anyhow::anyhow!("db task failed: {e}"))?
    }
}

#[async_trait]
impl MemoryBackend for SqliteBackend {
    async fn find_trigger(&self, profile: &str, name: &str) -> Result<Option<Trigger>> {
        let (profile, name) = (profile.to_string(), name.to_string());
        self.with_conn(move |conn| store::find_trigger(conn, &profile, &name))
            .await
    }

    async fn facts(&self, trigger_id: i64) -> Result<Vec<Fact>> {
        self.with_conn(move |conn| store::facts_for_trigger(conn, trigger_id))
            .await
    }

    async fn reflections(&self, trigger_id: i64) -> Result<Vec<Reflection>> {
        self.with_conn(move |conn| store::reflections_for_trigger(conn, trigger_id))
            .await
    }

    async fn episodes(&self, trigger_id: i64) -> Result<Vec<Episode>> {
        self.with_conn(move |conn| store::episodes_for_trigger(conn, trigger_id))
            .await
    }

    async fn recent_exchanges(&self, profile: &str, limit: usize) -> Result<Vec<Exchange>> {
        let profile = profile.to_string();
        self.with_conn(move |conn| store::recent_exchanges(conn, &profile, limit))
            .await
    }

    async fn search_exchanges(
        &self,
        profile: &str,
        query: &str,
        limit: usize,
    ) -> Result<Vec<Exchange>> {
        let (profile, query) = (profile.to_string(), query.to_string());
        self.with_conn(move |conn| store::search_exchanges(conn, &profile, &query, limit))
            .await
    }

    async fn record_exchange(
        &self,
        profile: &str,
        user_message: &str,
        model_reply: &str,
        remember: bool,
    ) -> Result<i64> {
        let (profile, user_message, model_reply) = (
            profile.to_string(),
            user_message.to_string(),
            model_reply.to_string(),
        );
        self.with_conn(move |conn| {
            store::insert_exchange(conn, &profile, &user_message, &model_reply, remember)
        })
        .await
    }

    async fn record_episode(
        &self,
        profile: &str,
        trigger_id: Option<i64>,
        user_message: &str,
        model_reply: &str,
    ) -> Result<i64> {
        let (profile, user_message, model_reply) = (
            profile.to_string(),
            user_message.to_string(),
            model_reply.to_string(),
        );
        self.with_conn(move |conn| {
            store::insert_episode(conn, &profile, trigger_id, &user_message, &model_reply)
        })
        .await
    }

    async fn clear_exchanges(&self, profile: &str) -> Result<usize> {
        let profile = profile.to_string();
        self.with_conn(move |conn| store::clear_exchanges(conn, &profile))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;

    #[tokio::test]
    async fn sqlite_backend_round_trips_through_blocking_pool() {
        let backend = SqliteBackend::from_connection(db::open_memory_database().unwrap());

        let id = backend
            .record_exchange("nevan", "hi", "hello", true)
            .await
            .unwrap();
        assert!(id > 0);
        backend
            .record_episode("nevan", None, "hi", "hello")
            .await
            .unwrap();

        let rows = backend.recent_exchanges("nevan", 5).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert!(rows[0].remember);

        assert_eq!(backend.clear_exchanges("nevan").await.unwrap(), 1);
        assert!(backend.find_trigger("nevan", "nothing").await.unwrap().is_none());
    }
}
