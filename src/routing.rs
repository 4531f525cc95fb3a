//! Model → profile routing table.
//!
//! Built once from configuration and validated before the server starts.
//! Requests name a model id; the id is looked up here and never used to build
//! a storage identifier. Anything not in the table is rejected.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::sync::Arc;
use thiserror::Error;

use crate::chat::llm::ProviderKind;
use crate::chat::prompt::system_instructions;
use crate::config::{ModelRouteConfig, ProfileConfig};
use crate::memory::triggers::TriggerMatcher;
use crate::memory::types::normalize_trigger_name;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RoutingError {
    #[error("profile name must not be empty")]
    EmptyProfileName,

    #[error("profile `{0}` is defined more than once")]
    DuplicateProfile(String),

    #[error("profile `{profile}` has an empty trigger name")]
    EmptyTrigger { profile: String },

    #[error("profile `{profile}` lists trigger `{name}` twice (names are compared case-insensitively, `_` = space)")]
    DuplicateTrigger { profile: String, name: String },

    #[error("model id must not be empty")]
    EmptyModelId,

    #[error("model `{0}` is routed more than once")]
    DuplicateModel(String),

    #[error("model `{model}` references unknown profile `{profile}`")]
    UnknownProfile { model: String, profile: String },

    #[error("no models are configured")]
    NoModels,
}

/// A validated memory namespace.
#[derive(Debug)]
pub struct Profile {
    pub name: String,
    pub matcher: TriggerMatcher,
    instructions: String,
}

impl Profile {
    /// System instruction text listing this profile's triggers.
    pub fn instructions(&self) -> &str {
        &self.instructions
    }
}

/// Where a client model id goes.
#[derive(Debug, Clone)]
pub struct ModelRoute {
    pub model: String,
    pub upstream_model: String,
    pub provider: ProviderKind,
    pub profile: Arc<Profile>,
}

#[derive(Debug)]
pub struct ModelRoutes {
    routes: HashMap<String, ModelRoute>,
    profiles: BTreeMap<String, Arc<Profile>>,
}

impl ModelRoutes {
    pub fn from_config(
        profiles: &[ProfileConfig],
        models: &[ModelRouteConfig],
    ) -> Result<Self, RoutingError> {
        let mut by_name = BTreeMap::new();
        for profile in profiles {
            let name = profile.name.trim();
            if name.is_empty() {
                return Err(RoutingError::EmptyProfileName);
            }

            let mut seen = HashSet::new();
            for trigger in &profile.triggers {
                let normalized = normalize_trigger_name(trigger);
                if normalized.is_empty() {
                    return Err(RoutingError::EmptyTrigger {
                        profile: name.to_string(),
                    });
                }
                if !seen.insert(normalized) {
                    return Err(RoutingError::DuplicateTrigger {
                        profile: name.to_string(),
                        name: trigger.clone(),
                    });
                }
            }

            let matcher = TriggerMatcher::new(profile.triggers.iter().cloned());
            let instructions = system_instructions(&profile.persona, matcher.names());
            let compiled = Arc::new(Profile {
                name: name.to_string(),
                matcher,
                instructions,
            });
            if by_name.insert(name.to_string(), compiled).is_some() {
                return Err(RoutingError::DuplicateProfile(name.to_string()));
            }
        }

        if models.is_empty() {
            return Err(RoutingError::NoModels);
        }

        let mut routes = HashMap::new();
        for model in models {
            let id = model.id.trim();
            if id.is_empty() {
                return Err(RoutingError::EmptyModelId);
            }
            let profile = by_name
                .get(model.profile.trim())
                .cloned()
                .ok_or_else(|| RoutingError::UnknownProfile {
                    model: id.to_string(),
                    profile: model.profile.clone(),
                })?;
            let route = ModelRoute {
                model: id.to_string(),
                upstream_model: model
                    .upstream_model
                    .clone()
                    .unwrap_or_else(|| id.to_string()),
                provider: model.provider,
                profile,
            };
            if routes.insert(id.to_string(), route).is_some() {
                return Err(RoutingError::DuplicateModel(id.to_string()));
            }
        }

        Ok(Self {
            routes,
            profiles: by_name,
        })
    }

    /// Route for a client-supplied model id (exact match after trimming).
    pub fn resolve(&self, model: &str) -> Option<&ModelRoute> {
        self.routes.get(model.trim())
    }

    pub fn profile(&self, name: &str) -> Option<&Arc<Profile>> {
        self.profiles.get(name)
    }

    pub fn profiles(&self) -> impl Iterator<Item = &Arc<Profile>> {
        self.profiles.values()
    }

    /// All routes sorted by model id.
    pub fn routes(&self) -> Vec<&ModelRoute> {
        let mut routes: Vec<&ModelRoute> = self.routes.values().collect();
        routes.sort_by(|a, b| a.model.cmp(&b.model));
        routes
    }

    /// Providers referenced by at least one model.
    pub fn providers_in_use(&self) -> BTreeSet<ProviderKind> {
        self.routes.values().map(|r| r.provider).collect()
    }
}
