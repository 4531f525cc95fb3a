//! The chat request pipeline.
//!
//! One call to [`ChatOrchestrator::chat`] walks a single request through:
//! route lookup, trigger detection, memory fetch, history load, the first
//! LLM call, at most one model-requested memory round, marker parsing, and
//! the exchange/episode writes.

use std::sync::Arc;
use thiserror::Error;
use tracing::{info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::chat::llm::{ChatModel, LlmError, ProviderKind, Providers};
use crate::chat::prompt::PromptInputs;
use crate::memory::backend::MemoryBackend;
use crate::memory::bundle::{self, RetrievedMemory};
use crate::memory::history::load_history;
use crate::memory::markers;
use crate::routing::{ModelRoute, ModelRoutes};

#[derive(Debug, Error)]
pub enum ChatError {
    #[error("{0}")]
    Validation(String),

    #[error("unknown model `{0}`")]
    UnknownModel(String),

    #[error("no client configured for provider `{0}`")]
    ProviderUnavailable(ProviderKind),

    #[error(transparent)]
    Upstream(#[from] LlmError),

    #[error("storage error: {0:#}")]
    Storage(#[from] anyhow::Error),
}

/// Result of a completed chat request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatOutcome {
    /// Reply text with every marker removed.
    pub reply: String,
    pub remember: bool,
    /// Trigger active when the reply was finalized, if any.
    pub trigger_id: Option<i64>,
    pub exchange_id: i64,
    pub episode_id: Option<i64>,
    /// Number of upstream calls made (1 or 2).
    pub llm_calls: u8,
}

pub struct ChatOrchestrator {
    routes: Arc<ModelRoutes>,
    providers: Providers,
    backend: Arc<dyn MemoryBackend>,
    history_limit: usize,
}

impl ChatOrchestrator {
    pub fn new(
        routes: Arc<ModelRoutes>,
        providers: Providers,
        backend: Arc<dyn MemoryBackend>,
        history_limit: usize,
    ) -> Self {
        Self {
            routes,
            providers,
            backend,
            history_limit,
        }
    }

    pub fn routes(&self) -> &ModelRoutes {
        &self.routes
    }

    /// Run one chat request end to end.
    ///
    /// Nothing is written unless the LLM produces a reply with text left
    /// after markers are removed.
    pub async fn chat(&self, model: &str, user_message: &str) -> Result<ChatOutcome, ChatError> {
        if model.trim().is_empty() {
            return Err(ChatError::Validation("model is required".into()));
        }
        if user_message.trim().is_empty() {
            return Err(ChatError::Validation("userMessage is required".into()));
        }

        let route = self
            .routes
            .resolve(model)
            .ok_or_else(|| ChatError::UnknownModel(model.trim().to_string()))?;
        let client = self
            .providers
            .get(route.provider)
            .ok_or(ChatError::ProviderUnavailable(route.provider))?;

        let span = info_span!(
            "chat",
            request_id = %Uuid::now_v7(),
            model = %route.model,
            profile = %route.profile.name,
        );
        self.run(route, client.as_ref(), user_message)
            .instrument(span)
            .await
    }

    async fn run(
        &self,
        route: &ModelRoute,
        client: &dyn ChatModel,
        user_message: &str,
    ) -> Result<ChatOutcome, ChatError> {
        let profile = route.profile.as_ref();
        let backend = self.backend.as_ref();

        let auto = match profile.matcher.detect(user_message) {
            Some(name) => {
                info!(trigger = name, "trigger detected in user message");
                bundle::retrieve(backend, &profile.name, name).await
            }
            None => None,
        };

        let explicit = match profile.matcher.requested(user_message) {
            Some(name) if auto.as_ref().is_some_and(|m| same_trigger(&m.trigger.name, name)) => None,
            Some(name) => {
                info!(trigger = name, "memory requested in user message");
                bundle::retrieve(backend, &profile.name, name).await
            }
            None => None,
        };

        let history = load_history(backend, &profile.name, self.history_limit).await?;

        let mut inputs = PromptInputs::new(profile.instructions(), &history);
        inputs.auto_memory = auto.as_ref().map(|m| m.block.as_str());
        inputs.requested_memory = explicit.as_ref().map(|m| m.block.as_str());

        let first = client
            .complete(&route.upstream_model, &inputs.assemble(user_message))
            .await
            .inspect_err(|e| warn!(error = %e, "first LLM call failed"))?;
        let mut parsed = markers::parse(&first);
        let mut llm_calls = 1;
        let mut model_requested: Option<RetrievedMemory> = None;

        if let Some(name) = parsed
            .memory_requests
            .first()
            .and_then(|requested| profile.matcher.resolve(requested))
        {
            let retrieved = bundle::retrieve(backend, &profile.name, name).await;
            let already_loaded = |id: i64| {
                [&auto, &explicit]
                    .into_iter()
                    .flatten()
                    .any(|m| m.trigger.id == id)
            };

            match retrieved {
                Some(memory) if !already_loaded(memory.trigger.id) => {
                    info!(trigger = name, trigger_id = memory.trigger.id, "model requested memory, second round");
                    let requested_block = match &explicit {
                        Some(user) => format!("{}\n\n{}", user.block, memory.block),
                        None => memory.block.clone(),
                    };
                    let second_inputs = PromptInputs {
                        requested_memory: Some(&requested_block),
                        ..inputs
                    };

                    match client
                        .complete(&route.upstream_model, &second_inputs.assemble(user_message))
                        .await
                    {
                        Ok(second) => {
                            llm_calls = 2;
                            let second = markers::parse(&second);
                            if second.cleaned.is_empty() {
                                warn!("second reply is empty once markers are removed, keeping first reply");
                            } else {
                                parsed = second;
                                model_requested = Some(memory);
                            }
                        }
                        Err(e) => {
                            llm_calls = 2;
                            warn!(error = %e, "second LLM call failed, keeping first reply");
                        }
                    }
                }
                Some(_) => info!(trigger = name, "requested memory already in prompt"),
                None => {}
            }
        } else if let Some(requested) = parsed.memory_requests.first() {
            info!(requested = %requested, "model requested unknown trigger, ignoring");
        }

        // A reply that was only markers is never stored or replayed.
        if parsed.cleaned.is_empty() {
            warn!(llm_calls, "reply is empty once markers are removed");
            return Err(ChatError::Upstream(LlmError::EmptyReply));
        }

        let trigger_id = auto
            .as_ref()
            .or(explicit.as_ref())
            .or(model_requested.as_ref())
            .map(|m| m.trigger.id);

        let exchange_id = self
            .backend
            .record_exchange(&profile.name, user_message, &parsed.cleaned, parsed.remember)
            .await?;

        let episode_id = if parsed.remember {
            let id = self
                .backend
                .record_episode(&profile.name, trigger_id, user_message, &parsed.cleaned)
                .await?;
            info!(episode_id = id, trigger_id, "remember flag set, episode stored");
            Some(id)
        } else {
            None
        };

        Ok(ChatOutcome {
            reply: parsed.cleaned,
            remember: parsed.remember,
            trigger_id,
            exchange_id,
            episode_id,
            llm_calls,
        })
    }
}

fn same_trigger(stored: &str, name: &str) -> bool {
    crate::memory::types::normalize_trigger_name(stored)
        == crate::memory::types::normalize_trigger_name(name)
}
