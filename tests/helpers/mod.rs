#![allow(dead_code)]

use memory_relay::api::{self, AppState};
use memory_relay::chat::llm::{OpenAiCompatClient, ProviderKind, Providers};
use memory_relay::config::{MemoryConfig, ModelRouteConfig, ProfileConfig, ProviderConfig};
use memory_relay::db;
use memory_relay::memory::backend::SqliteBackend;
use memory_relay::memory::store;
use memory_relay::routing::ModelRoutes;
use rusqlite::Connection;
use std::sync::{Arc, Mutex};

pub const MODEL: &str = "chatgpt-4o-latest";
pub const PROFILE: &str = "nevan";

/// Open a fresh in-memory database with schema and migrations applied.
pub fn test_db() -> Connection {
    let conn = Connection::open_in_memory().unwrap();
    conn.pragma_update(None, "foreign_keys", "ON").unwrap();
    db::schema::init_schema(&conn).unwrap();
    db::migrations::run_migrations(&conn).unwrap();
    conn
}

/// Seed trigger "relational subject" with two facts. Returns the trigger id.
pub fn seed_relational_subject(conn: &Connection) -> i64 {
    let id = store::upsert_trigger(conn, PROFILE, "relational subject").unwrap();
    store::insert_fact(conn, id, "name", "Nadine").unwrap();
    store::insert_fact(conn, id, "met", "spring").unwrap();
    id
}

pub fn routes() -> ModelRoutes {
    ModelRoutes::from_config(
        &[ProfileConfig {
            name: PROFILE.into(),
            persona: "You are a relational AI agent.".into(),
            triggers: vec!["first_chats_general".into(), "relational_subject".into()],
        }],
        &[ModelRouteConfig {
            id: MODEL.into(),
            profile: PROFILE.into(),
            provider: ProviderKind::OpenAi,
            upstream_model: None,
        }],
    )
    .unwrap()
}

pub fn memory_config() -> MemoryConfig {
    MemoryConfig {
        history_limit: 20,
        max_history_limit: 200,
        search_limit: 50,
    }
}

/// App state whose OpenAI provider points at `upstream` (e.g. a wiremock URI).
pub fn app_state(upstream: &str, db: Arc<Mutex<Connection>>) -> AppState {
    let client = OpenAiCompatClient::new(
        ProviderKind::OpenAi,
        &ProviderConfig {
            base_url: upstream.to_string(),
            api_key: Some("sk-test".into()),
        },
    )
    .unwrap();
    let mut providers = Providers::default();
    providers.insert(ProviderKind::OpenAi, Arc::new(client));

    AppState::new(
        Arc::new(routes()),
        providers,
        Arc::new(SqliteBackend::new(db)),
        memory_config(),
    )
}

pub fn app(upstream: &str, db: Arc<Mutex<Connection>>) -> axum::Router {
    api::router(app_state(upstream, db))
}

pub fn shared(conn: Connection) -> Arc<Mutex<Connection>> {
    Arc::new(Mutex::new(conn))
}
