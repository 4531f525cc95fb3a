//! Memory bundle retrieval and formatting.
//!
//! [`retrieve`] resolves a trigger name to its row and loads the trigger's
//! facts, reflections and episodes concurrently. It never fails: a missing or
//! ambiguous trigger, or any failed child fetch, yields `None` so that a
//! partial bundle never reaches a prompt. [`format_bundle`] renders a bundle
//! into the text block placed in the prompt.

use std::fmt::Write as _;

use crate::memory::backend::MemoryBackend;
use crate::memory::types::{MemoryBundle, Trigger};

/// A trigger with its formatted memory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetrievedMemory {
    pub trigger: Trigger,
    pub bundle: MemoryBundle,
    pub block: String,
}

/// Fetch and format the memory behind `trigger_name`, or `None` if unavailable.
pub async fn retrieve(
    backend: &dyn MemoryBackend,
    profile: &str,
    trigger_name: &str,
) -> Option<RetrievedMemory> {
    let trigger = match backend.find_trigger(profile, trigger_name).await {
        Ok(Some(trigger)) => trigger,
        Ok(None) => {
            tracing::info!(profile, trigger = trigger_name, "trigger not found in store");
            return None;
        }
        Err(e) => {
            tracing::warn!(profile, trigger = trigger_name, error = %e, "trigger lookup failed");
            return None;
        }
    };

    let bundle = fetch_bundle(backend, trigger.id).await?;
    let block = format_bundle(&bundle);
    tracing::info!(
        trigger_id = trigger.id,
        facts = bundle.facts.len(),
        reflections = bundle.reflections.len(),
        episodes = bundle.episodes.len(),
        "memory bundle collected"
    );

    Some(RetrievedMemory {
        trigger,
        bundle,
        block,
    })
}

/// Load all three child collections of a trigger; all or nothing.
pub async fn fetch_bundle(backend: &dyn MemoryBackend, trigger_id: i64) -> Option<MemoryBundle> {
    let fetched = tokio::try_join!(
        backend.facts(trigger_id),
        backend.reflections(trigger_id),
        backend.episodes(trigger_id),
    );

    match fetched {
        Ok((facts, reflections, episodes)) => Some(MemoryBundle {
            facts,
            reflections,
            episodes,
        }),
        Err(e) => {
            tracing::warn!(trigger_id, error = %e, "bundle fetch failed, dropping memory");
            None
        }
    }
}

/// Render a bundle as `FACTS:`, `REFLECTIONS:` and `EPISODES:` sections.
///
/// Sections keep this order and skip when empty. Items keep storage order.
/// The result has no trailing whitespace.
pub fn format_bundle(bundle: &MemoryBundle) -> String {
    let mut text = String::new();

    if !bundle.facts.is_empty() {
        text.push_str("FACTS:\n");
        for fact in &bundle.facts {
            let _ = writeln!(text, "• {}: {}", fact.name, fact.content);
        }
        text.push('\n');
    }

    if !bundle.reflections.is_empty() {
        text.push_str("REFLECTIONS:\n");
        for reflection in &bundle.reflections {
            let _ = writeln!(text, "• {}", reflection.content);
        }
        text.push('\n');
    }

    if !bundle.episodes.is_empty() {
        text.push_str("EPISODES:\n");
        for episode in &bundle.episodes {
            let _ = write!(
                text,
                "USER: {}\nASSISTANT: {}\n\n",
                episode.user_message, episode.model_reply
            );
        }
    }

    text.trim_end().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::types::{Episode, Exchange, Fact, Reflection};
    use anyhow::{bail, Result};
    use async_trait::async_trait;

    fn fact(id: i64, name: &str, content: &str) -> Fact {
        Fact {
            id,
            trigger_id: 7,
            name: name.into(),
            content: content.into(),
        }
    }

    fn sample_bundle() -> MemoryBundle {
        MemoryBundle {
            facts: vec![fact(1, "name", "Nadine"), fact(2, "city", "Lviv")],
            reflections: vec![Reflection {
                id: 1,
                trigger_id: 7,
                content: "Trust grew slowly.".into(),
            }],
            episodes: vec![Episode {
                id: 1,
                trigger_id: Some(7),
                user_message: "Do you remember?".into(),
                model_reply: "I do.".into(),
            }],
        }
    }

    #[test]
    fn formats_sections_in_fixed_order() {
        let text = format_bundle(&sample_bundle());
        assert_eq!(
            text,
            "FACTS:\n• name: Nadine\n• city: Lviv\n\nREFLECTIONS:\n• Trust grew slowly.\n\nEPISODES:\nUSER: Do you remember?\nASSISTANT: I do."
        );
    }

    #[test]
    fn empty_sections_are_omitted() {
        let bundle = MemoryBundle {
            reflections: vec![Reflection {
                id: 1,
                trigger_id: 7,
                content: "only this".into(),
            }],
            ..Default::default()
        };
        let text = format_bundle(&bundle);
        assert_eq!(text, "REFLECTIONS:\n• only this");
        assert!(!text.contains("FACTS:"));
        assert!(!text.contains("EPISODES:"));

        assert_eq!(format_bundle(&MemoryBundle::default()), "");
    }

    #[test]
    fn formatting_is_deterministic() {
        let bundle = sample_bundle();
        assert_eq!(format_bundle(&bundle), format_bundle(&bundle));
        assert!(!format_bundle(&bundle).ends_with(char::is_whitespace));
    }

    /// Backend with a fixed trigger whose child fetches can be made to fail.
    struct StubBackend {
        fail_reflections: bool,
    }

    #[async_trait]
    impl MemoryBackend for StubBackend {
        async fn find_trigger(&self, _profile: &str, name: &str) -> Result<Option<Trigger>> {
            Ok((name == "relational_subject").then(|| Trigger {
                id: 7,
                name: "relational subject".into(),
            }))
        }
        async fn facts(&self, _trigger_id: i64) -> Result<Vec<Fact>> {
            Ok(vec![fact(1, "a", "b")])
        }
        async fn reflections(&self, _trigger_id: i64) -> Result<Vec<Reflection>> {
            if self.fail_reflections {
                bail!("reflections table unavailable");
            }
            Ok(vec![])
        }
        async fn episodes(&self, _trigger_id: i64) -> Result<Vec<Episode>> {
            Ok(vec![])
        }
        async fn recent_exchanges(&self, _profile: &str, _limit: usize) -> Result<Vec<Exchange>> {
            Ok(vec![])
        }
        async fn search_exchanges(
            &self,
            _profile: &str,
            _query: &str,
            _limit: usize,
        ) -> Result<Vec<Exchange>> {
            Ok(vec![])
        }
        async fn record_exchange(
            &self,
            _profile: &str,
            _user_message: &str,
            _model_reply: &str,
            _remember: bool,
        ) -> Result<i64> {
            Ok(1)
        }
        async fn record_episode(
            &self,
            _profile: &str,
            _trigger_id: Option<i64>,
            _user_message: &str,
            _model_reply: &str,
        ) -> Result<i64> {
            Ok(1)
        }
        async fn clear_exchanges(&self, _profile: &str) -> Result<usize> {
            Ok(0)
        }
    }

    #[tokio::test]
    async fn retrieve_returns_formatted_block() {
        let backend = StubBackend {
            fail_reflections: false,
        };
        let memory = retrieve(&backend, "nevan", "relational_subject").await.unwrap();
        assert_eq!(memory.trigger.id, 7);
        assert_eq!(memory.block, "FACTS:\n• a: b");
    }

    #[tokio::test]
    async fn any_failed_child_fetch_drops_the_whole_bundle() {
        let backend = StubBackend {
            fail_reflections: true,
        };
        assert!(fetch_bundle(&backend, 7).await.is_none());
        assert!(retrieve(&backend, "nevan", "relational_subject").await.is_none());
    }

    #[tokio::test]
    async fn unknown_trigger_is_not_found() {
        let backend = StubBackend {
            fail_reflections: false,
        };
        assert!(retrieve(&backend, "nevan", "other").await.is_none());
    }
}
