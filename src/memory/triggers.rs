//! Trigger detection over free text.
//!
//! A [`TriggerMatcher`] holds a profile's whitelist of trigger names in a fixed
//! order. [`TriggerMatcher::detect`] finds the first whitelisted name mentioned
//! in a message; [`TriggerMatcher::requested`] resolves an explicit
//! `<<memory_request: NAME>>` directive against the same whitelist.

use crate::memory::markers;
use crate::memory::types::normalize_trigger_name;

#[derive(Debug, Clone)]
struct Known {
    name: String,
    plain: String,
    spaced: String,
}

#[derive(Debug, Clone, Default)]
pub struct TriggerMatcher {
    known: Vec<Known>,
}

impl TriggerMatcher {
    /// Build a matcher. Names are trimmed; blank ones are skipped since they would match everything.
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let known = names
            .into_iter()
            .map(|name| Into::<String>::into(name).trim().to_string())
            .filter(|name| !name.is_empty())
            .map(|name| {
                let plain = name.to_lowercase();
                let spaced = plain.replace('_', " ");
                Known { name, plain, spaced }
            })
            .collect();
        Self { known }
    }

    /// Whitelisted names in match order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.known.iter().map(|k| k.name.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.known.is_empty()
    }

    /// First whitelisted trigger mentioned anywhere in `text`.
    ///
    /// Case-insensitive literal substring match, also trying the name with
    /// underscores replaced by spaces. Not word-boundary aware.
    pub fn detect(&self, text: &str) -> Option<&str> {
        if text.is_empty() {
            return None;
        }
        let lower = text.to_lowercase();
        self.known
            .iter()
            .find(|k| lower.contains(&k.plain) || lower.contains(&k.spaced))
            .map(|k| k.name.as_str())
    }

    /// Map a caller-supplied name onto the whitelist. Unknown names are `None`.
    pub fn resolve(&self, requested: &str) -> Option<&str> {
        let wanted = normalize_trigger_name(requested);
        if wanted.is_empty() {
            return None;
        }
        self.known
            .iter()
            .find(|k| k.spaced == wanted)
            .map(|k| k.name.as_str())
    }

    /// Whitelisted trigger named by the first memory-request directive in `text`.
    pub fn requested(&self, text: &str) -> Option<&str> {
        let parsed = markers::parse(text);
        let name = parsed.memory_requests.first()?;
        let resolved = self.resolve(name);
        if resolved.is_none() {
            tracing::debug!(requested = %name, "ignoring memory request for unknown trigger");
        }
        resolved
    }
}
