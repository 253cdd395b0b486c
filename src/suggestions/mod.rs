//! Suggestions module for AI-powered critique and story rewrites

pub mod advisor;
pub mod applier;
pub mod client;
pub mod prompts;

pub use advisor::{AiAdvisor, AiCommentary};
pub use applier::{offer_apply, ImprovedStory};
pub use client::{is_ai_available, AiError, ChatBackend, ChatRequest, OpenAiClient};
pub use prompts::StoryPromptGenerator;
