pub mod llm;
pub mod orchestrator;
pub mod prompt;
