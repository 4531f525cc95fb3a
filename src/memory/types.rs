//! Row and prompt types shared by the memory pipeline.
//!
//! [`Trigger`], [`Fact`], [`Reflection`] and [`Episode`] mirror the curated
//! memory tables; [`Exchange`] is a fallback history row. [`Turn`] is a single
//! role-tagged message as sent to the chat-completion API.

use serde::{Deserialize, Serialize};

/// A named memory topic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trigger {
    pub id: i64,
    pub name: String,
}

/// A durable attribute tied to a trigger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fact {
    pub id: i64,
    pub trigger_id: i64,
    pub name: String,
    pub content: String,
}

/// A durable free-text note tied to a trigger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reflection {
    pub id: i64,
    pub trigger_id: i64,
    pub content: String,
}

/// A remembered exchange. `trigger_id` is `None` when no topic was active.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Episode {
    pub id: i64,
    pub trigger_id: Option<i64>,
    pub user_message: String,
    pub model_reply: String,
}

/// A fallback history row. Every completed exchange is appended here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Exchange {
    pub id: i64,
    pub user_message: String,
    pub model_reply: String,
    pub remember: bool,
    pub created_at: String,
}

/// Facts, reflections and episodes for one trigger, in storage order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemoryBundle {
    pub facts: Vec<Fact>,
    pub reflections: Vec<Reflection>,
    pub episodes: Vec<Episode>,
}

impl MemoryBundle {
    pub fn is_empty(&self) -> bool {
        self.facts.is_empty() && self.reflections.is_empty() && self.episodes.is_empty()
    }
}

/// Message author as understood by chat-completion APIs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::System => "system",
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One role-tagged prompt message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub content: String,
}

impl Turn {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Lower-case a trigger name and treat underscores as spaces.
///
/// Two names with the same normalized form refer to the same topic.
pub fn normalize_trigger_name(name: &str) -> String {
    name.trim().to_lowercase().replace('_', " ")
}
