//! CLI `doctor` command: database diagnostics and routing summary.

use anyhow::{Context, Result};

use memory_relay::config::RelayConfig;
use memory_relay::db;

/// Print a health report for the database and the configured routes.
pub fn doctor(config: &RelayConfig) -> Result<()> {
    println!("Memory Relay Health Report");
    println!("==========================");
    println!();

    println!("Routing:");
    match super::load_routes(config) {
        Ok(routes) => {
            for route in routes.routes() {
                println!(
                    "  {:<24} -> profile {:<10} via {} ({})",
                    route.model, route.profile.name, route.provider, route.upstream_model
                );
            }
            for profile in routes.profiles() {
                let triggers: Vec<&str> = profile.matcher.names().collect();
                println!("  profile {:<10} triggers: {}", profile.name, triggers.len());
            }
            for kind in routes.providers_in_use() {
                let key = if config.providers.get(kind).api_key.is_some() {
                    "set"
                } else {
                    "MISSING"
                };
                println!("  provider {:<9} base {} (API key {key})", kind, config.providers.get(kind).base_url);
            }
        }
        Err(e) => println!("  INVALID: {e:#}"),
    }
    println!();

    let db_path = config.resolved_db_path();
    if !db_path.exists() {
        println!("Database: not found at {}", db_path.display());
        println!("Run `memory-relay serve` or `memory-relay import` to initialize.");
        return Ok(());
    }

    let file_size = std::fs::metadata(&db_path).map(|m| m.len()).unwrap_or(0);

    let conn = db::open_database(&db_path).context("failed to open database (may be corrupt)")?;
    let report = db::check_database_health(&conn).context("failed to run health check")?;

    println!("Database:          {}", db_path.display());
    println!("File size:         {}", format_bytes(file_size));
    println!("Schema version:    {}", report.schema_version);
    println!();
    println!("Row counts:");
    println!("  Triggers:        {}", report.trigger_count);
    println!("  Facts:           {}", report.fact_count);
    println!("  Reflections:     {}", report.reflection_count);
    println!("  Episodes:        {}", report.episode_count);
    println!("  Exchanges:       {}", report.exchange_count);
    println!();
    if report.integrity_ok {
        println!("Integrity check:   PASSED");
    } else {
        println!("Integrity check:   FAILED ({})", report.integrity_details);
        println!();
        println!("Recovery: restore the database file from a backup, then re-run");
        println!("`memory-relay import` for curated memory.");
    }

    Ok(())
}

fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{bytes} B")
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    }
}
