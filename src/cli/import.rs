//! CLI `import` command: seed curated memory from a JSON file.

use anyhow::{bail, Context, Result};
use std::path::Path;

use memory_relay::config::RelayConfig;
use memory_relay::memory::seed::{self, SeedFile};

/// Import triggers with their facts, reflections and episodes.
///
/// The target profile is `--profile` if given, else the file's `profile` field.
pub fn import(config: &RelayConfig, file: &Path, profile: Option<&str>) -> Result<()> {
    let json = std::fs::read_to_string(file)
        .with_context(|| format!("failed to read import file: {}", file.display()))?;
    let data = SeedFile::from_json(&json)?;

    let Some(profile) = profile.or(data.profile.as_deref()).map(str::trim) else {
        bail!("no profile given: pass --profile or set \"profile\" in the file");
    };

    let routes = super::load_routes(config)?;
    let Some(known) = routes.profile(profile) else {
        bail!("profile `{profile}` is not configured");
    };

    for trigger in &data.triggers {
        if known.matcher.resolve(&trigger.name).is_none() {
            println!(
                "Warning: trigger `{}` is not in profile `{profile}`'s trigger list and will never be detected",
                trigger.name
            );
        }
    }

    let mut conn = memory_relay::db::open_database(config.resolved_db_path())?;
    println!("Importing {} trigger(s) into `{profile}`...", data.triggers.len());
    let summary = seed::import_seed(&mut conn, profile, &data)?;

    println!("Import complete:");
    println!("  Triggers created:  {}", summary.triggers_created);
    println!("  Triggers reused:   {}", summary.triggers_reused);
    println!("  Facts:             {}", summary.facts);
    println!("  Reflections:       {}", summary.reflections);
    println!("  Episodes:          {}", summary.episodes);

    Ok(())
}
