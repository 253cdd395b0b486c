//! AI critique and rewrite with text fallback

use super::applier::ImprovedStory;
use super::client::{ChatBackend, OpenAiClient};
use super::prompts::StoryPromptGenerator;
use crate::config::AiConfig;
use crate::EvaluationReport;
use serde::Serialize;

/// AI output attached to an evaluation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AiCommentary {
    /// Free-form critique, or a fallback message
    pub analysis: String,
    /// Rewritten story with acceptance criteria, or a fallback message
    pub improved_story: String,
    /// `improved_story` split into sections, when it follows the requested format
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parsed: Option<ImprovedStory>,
}

/// Produces AI commentary. Never fails: backend errors become text.
pub struct AiAdvisor {
    backend: Box<dyn ChatBackend>,
    config: AiConfig,
    prompts: StoryPromptGenerator,
}

impl AiAdvisor {
    /// Advisor backed by the OpenAI-compatible client described by `config`
    pub fn from_config(config: &AiConfig) -> Self {
        Self::with_backend(Box::new(OpenAiClient::from_config(config)), config)
    }

    /// Advisor backed by an arbitrary chat backend
    pub fn with_backend(backend: Box<dyn ChatBackend>, config: &AiConfig) -> Self {
        Self {
            backend,
            config: config.clone(),
            prompts: StoryPromptGenerator::new(),
        }
    }

    /// Critique of the story
    pub fn analysis(&self, story: &str) -> String {
        let request = self.prompts.analysis_request(story, &self.config);
        match self.backend.complete(&request) {
            Ok(text) => text,
            Err(e) => format!("AI analysis unavailable: {e}. Please check your OpenAI API key."),
        }
    }

    /// Rewritten story with acceptance criteria
    pub fn improved_story(&self, story: &str, report: Option<&EvaluationReport>) -> String {
        let request = self
            .prompts
            .improvement_request(story, report, &self.config);
        match self.backend.complete(&request) {
            Ok(text) => text,
            Err(e) => {
                format!("Story improvement unavailable: {e}. Please check your OpenAI API key.")
            }
        }
    }

    /// Both AI calls, with the rewrite parsed when possible
    pub fn commentary(&self, story: &str, report: &EvaluationReport) -> AiCommentary {
        let analysis = self.analysis(story);
        let improved_story = self.improved_story(story, Some(report));
        let parsed = ImprovedStory::parse(&improved_story);
        AiCommentary {
            analysis,
            improved_story,
            parsed,
        }
    }
}
